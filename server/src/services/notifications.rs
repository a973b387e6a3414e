//! Customer-facing email bodies.

use super::background::Email;
use crate::config::Settings;
use crate::models::{Company, LogTimeStatus, Ticket, TicketComment};

pub fn comment_email(ticket: &Ticket, comment: &TicketComment) -> Email {
    Email {
        to: ticket.customer.email.clone(),
        subject: format!("[{}] New reply on ticket {}", ticket.company.name, ticket.code),
        body: format!(
            "Hello {},\n\n{} replied to \"{}\":\n\n{}\n\nStatus: {}\n",
            ticket.customer.name,
            comment.sender.name,
            ticket.subject,
            comment.content,
            comment.status,
        ),
    }
}

pub fn timer_email(ticket: &Ticket) -> Email {
    let state = match ticket.log_time.status {
        LogTimeStatus::Paused => "paused",
        LogTimeStatus::Running => "resumed",
        LogTimeStatus::Done => "stopped",
        LogTimeStatus::NotStarted => "reset",
    };

    Email {
        to: ticket.customer.email.clone(),
        subject: format!("[{}] Work on ticket {} {}", ticket.company.name, ticket.code, state),
        body: format!(
            "Hello {},\n\nWork on \"{}\" has been {}. Time logged so far: {} seconds.\n",
            ticket.customer.name, ticket.subject, state, ticket.log_time.duration_in_seconds,
        ),
    }
}

pub fn confirm_close_link(settings: &Settings, company: &Company, ticket: &Ticket) -> String {
    format!(
        "https://{}.{}/tickets/{}/confirm-close?token={}",
        company.subdomain, settings.portal_domain, ticket.id, ticket.token
    )
}

pub fn confirm_close_email(ticket: &Ticket, company: &Company, link: &str) -> Email {
    Email {
        to: ticket.customer.email.clone(),
        subject: format!("[{}] Ticket {} has been resolved", company.name, ticket.code),
        body: format!(
            "Hello {},\n\n\"{}\" was marked as resolved after {} seconds of work.\n\
             Please confirm it can be closed:\n{}\n",
            ticket.customer.name, ticket.subject, ticket.log_time.duration_in_seconds, link,
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::fixtures;

    #[test]
    fn test_confirm_close_link_uses_subdomain_and_token() {
        let company = fixtures::company("c1");
        let mut ticket = fixtures::ticket("t1", &company, "cu1");
        ticket.token = "abc".into();
        let settings = Settings {
            portal_domain: "support.example.com".into(),
            ..Settings::default()
        };

        assert_eq!(
            confirm_close_link(&settings, &company, &ticket),
            "https://c1.support.example.com/tickets/t1/confirm-close?token=abc"
        );
    }

    #[test]
    fn test_emails_go_to_ticket_customer() {
        let company = fixtures::company("c1");
        let ticket = fixtures::ticket("t1", &company, "cu1");
        let email = timer_email(&ticket);
        assert_eq!(email.to, ticket.customer.email);
    }
}
