use serde::Deserialize;
use tracing::{info, instrument};

use super::background::BackgroundTask;
use super::ServiceContext;
use crate::models::Company;
use crate::utils::error::AppError;
use crate::utils::validation::FieldErrors;

/// Partial profile update. Absent fields are left as they are; an empty
/// `logo` clears it.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateCompanyProfile {
    pub name: Option<String>,
    pub logo: Option<String>,
}

#[derive(Clone)]
pub struct CompanyService {
    ctx: ServiceContext,
}

impl CompanyService {
    pub fn new(ctx: ServiceContext) -> Self {
        Self { ctx }
    }

    /// Saves the profile, then rewrites the company snapshot embedded in
    /// its tickets in the background.
    #[instrument(skip(self, update))]
    pub async fn update_profile(
        &self,
        company_id: &str,
        update: UpdateCompanyProfile,
    ) -> Result<Company, AppError> {
        if let Some(name) = &update.name {
            let mut errors = FieldErrors::new();
            errors.require("name", name);
            if !errors.is_empty() {
                return Err(AppError::ValidationError(errors));
            }
        }

        let mut company = self
            .ctx
            .stores
            .companies
            .find_by_id(company_id)
            .await?
            .ok_or_else(|| AppError::not_found("company", company_id))?;

        if let Some(name) = update.name {
            company.name = name.trim().to_string();
        }
        if let Some(logo) = update.logo {
            company.logo = Some(logo).filter(|logo| !logo.trim().is_empty());
        }
        company.updated_at = self.ctx.clock.now();
        self.ctx.stores.companies.update(&company).await?;

        self.ctx
            .queue
            .submit(BackgroundTask::PropagateCompanySnapshot(company.snapshot()))
            .await;

        info!(company_id = %company.id, "Company profile updated");
        Ok(company)
    }
}
