use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompanyType {
    #[default]
    B2B,
    B2C,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Company {
    pub id: String,
    pub name: String,
    pub logo: Option<String>,
    pub subdomain: String,
    pub company_type: CompanyType,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Company {
    pub fn snapshot(&self) -> CompanySnapshot {
        CompanySnapshot {
            id: self.id.clone(),
            name: self.name.clone(),
            logo: self.logo.clone(),
            company_type: self.company_type,
        }
    }
}

/// Denormalized copy of the company's display fields stored on child documents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanySnapshot {
    pub id: String,
    pub name: String,
    pub logo: Option<String>,
    pub company_type: CompanyType,
}
