use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use chrono::Utc;
use serde_json::{json, Value};
use tower::ServiceExt;

use helpdesk_server::config::Config;
use helpdesk_server::models::{
    Agent, AgentRole, Company, CompanyType, Customer, Order, OrderStatus, PackageSnapshot,
    PackageType, Subscription, Ticket, TicketStatus,
};
use helpdesk_server::routes::create_routes;
use helpdesk_server::services::background::OverflowPolicy;
use helpdesk_server::services::{BackgroundQueue, BackgroundWorker, LogMailer};
use helpdesk_server::state::AppState;
use helpdesk_server::store::{MemoryStore, Stores};

fn seed(store: &MemoryStore) {
    let now = Utc::now();
    let company = Company {
        id: "c1".into(),
        name: "Acme".into(),
        logo: None,
        subdomain: "acme".into(),
        company_type: CompanyType::B2B,
        created_at: now,
        updated_at: now,
        deleted_at: None,
    };
    let customer = Customer {
        id: "cu1".into(),
        company_id: "c1".into(),
        name: "Dana".into(),
        email: "dana@customers.test".into(),
        is_need_balance: false,
        subscription: Subscription::default(),
        created_at: now,
        updated_at: now,
        deleted_at: None,
    };
    store.put_agent(Agent {
        id: "a1".into(),
        company_id: "c1".into(),
        name: "Sam".into(),
        email: "sam@agents.test".into(),
        role: AgentRole::Agent,
        last_activity_at: None,
        created_at: now,
        updated_at: now,
        deleted_at: None,
    });
    store.put_ticket(Ticket {
        id: "t1".into(),
        code: "TCK-1".into(),
        subject: "VPN down".into(),
        content: "Cannot connect".into(),
        company: company.snapshot(),
        customer: customer.snapshot(),
        project: None,
        category: None,
        agents: Vec::new(),
        status: TicketStatus::Open,
        log_time: Default::default(),
        reminder_sent: false,
        token: String::new(),
        created_at: now,
        updated_at: now,
        deleted_at: None,
    });
    store.put_order(Order {
        id: "o1".into(),
        company_id: "c1".into(),
        customer_id: "cu1".into(),
        package: PackageSnapshot {
            id: "pkg-1".into(),
            name: "10 hours".into(),
            package_type: PackageType::Time,
            time_in_seconds: 36_000,
            validity_days: 30,
        },
        status: OrderStatus::Pending,
        paid_at: None,
        created_at: now,
        updated_at: now,
    });
    store.put_company(company);
    store.put_customer(customer);
}

fn app() -> (Router, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    seed(&store);

    let config = Config::from_lookup(|_| None);
    let stores = Stores::from_backend(store.clone());
    let (queue, receiver) = BackgroundQueue::channel(16, OverflowPolicy::Reject);
    BackgroundWorker::new(receiver, stores.clone(), Arc::new(LogMailer)).spawn();

    let state = AppState::with_stores(stores, queue, config.settings.clone());
    (create_routes(state, &config), store)
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

#[tokio::test]
async fn health_check_reports_ok() {
    let (app, _) = app();
    let (status, body) = send(&app, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["status"], "ok");
}

#[tokio::test]
async fn responses_carry_security_headers() {
    let (app, _) = app();
    let response = app
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(
        response.headers().get("x-content-type-options").unwrap(),
        "nosniff"
    );
    assert!(response.headers().get("strict-transport-security").is_none());
}

#[tokio::test]
async fn comment_then_pause_then_immediate_resume() {
    let (app, store) = app();

    let (status, body) = send(
        &app,
        "POST",
        "/api/v1/tickets/t1/comments",
        Some(json!({
            "agentId": "a1",
            "content": "Looking into it",
            "attachmentIds": [],
            "status": "in_progress"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["ticketId"], "t1");
    assert_eq!(body["data"]["status"], "in_progress");
    assert_eq!(store.ticket("t1").unwrap().status, TicketStatus::InProgress);

    let (status, body) = send(&app, "POST", "/api/v1/tickets/t1/pause", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["logTime"]["status"], "paused");

    let (status, body) = send(&app, "POST", "/api/v1/tickets/t1/resume", None).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], "INVALID_STATE");
}

#[tokio::test]
async fn comment_validation_errors_list_fields() {
    let (app, store) = app();
    let (status, body) = send(
        &app,
        "POST",
        "/api/v1/tickets/t1/comments",
        Some(json!({ "agentId": "a1", "content": "", "status": "" })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    assert_eq!(body["error"]["details"]["content"], "content is required");
    assert_eq!(body["error"]["details"]["status"], "status is required");
    assert!(store.comments().is_empty());
}

#[tokio::test]
async fn illegal_transition_is_unprocessable() {
    let (app, _) = app();
    let (status, body) = send(
        &app,
        "POST",
        "/api/v1/tickets/t1/comments",
        Some(json!({ "agentId": "a1", "content": "Done", "status": "resolve" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["code"], "INVALID_STATE");
}

#[tokio::test]
async fn pause_unknown_ticket_is_not_found() {
    let (app, _) = app();
    let (status, body) = send(&app, "POST", "/api/v1/tickets/nope/pause", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn company_rename_reaches_tickets() {
    let (app, store) = app();
    let (status, body) = send(
        &app,
        "PATCH",
        "/api/v1/companies/c1",
        Some(json!({ "name": "Acme Support" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["name"], "Acme Support");

    // Propagation runs on the background worker.
    for _ in 0..50 {
        if store.ticket("t1").unwrap().company.name == "Acme Support" {
            return;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
    panic!("company snapshot was not propagated");
}

#[tokio::test]
async fn paying_order_credits_balance() {
    let (app, store) = app();
    let (status, body) = send(&app, "POST", "/api/v1/orders/o1/pay", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "paid");

    let customer = store.customer("cu1").unwrap();
    assert_eq!(customer.subscription.balance.time.total, 36_000);

    let (status, _) = send(&app, "POST", "/api/v1/orders/o1/pay", None).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}
