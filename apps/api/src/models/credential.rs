use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use uuid::Uuid;

/// How a certificate can be checked given the data extracted for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Verifiability {
    Auto,
    Manual,
    InsufficientData,
}

impl Verifiability {
    pub fn as_str(&self) -> &'static str {
        match self {
            Verifiability::Auto => "auto",
            Verifiability::Manual => "manual",
            Verifiability::InsufficientData => "insufficient-data",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CredentialRow {
    pub id: Uuid,
    pub resume_id: Option<Uuid>,
    pub name: String,
    pub issuer_name: String,
    pub issuer_id: Option<Uuid>,
    pub credential_id: Option<String>,
    pub credential_url: Option<String>,
    pub issue_date: Option<NaiveDate>,
    pub expiry_date: Option<NaiveDate>,
    pub extracted_data: Value,
    pub extraction_method: String,
    pub verifiability: String,
    pub status: String,
    pub notes: String,
    pub verified_at: Option<DateTime<Utc>>,
    pub verified_by: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Read-only reference data describing a known credential issuer.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct IssuerRow {
    pub id: Uuid,
    pub name: String,
    pub domain: String,
    pub verification_api_url: Option<String>,
    pub verification_method: String,
    pub is_verifiable: bool,
    pub credential_pattern: Option<String>,
}

impl IssuerRow {
    /// An issuer supports automatic verification only when it is marked
    /// verifiable, exposes an API endpoint, and its method is "api".
    pub fn supports_auto_verification(&self) -> bool {
        self.is_verifiable && self.verification_method == "api" && self.verification_api_url.is_some()
    }
}

pub async fn get_credential(
    pool: &sqlx::PgPool,
    id: Uuid,
) -> anyhow::Result<Option<CredentialRow>> {
    Ok(
        sqlx::query_as::<_, CredentialRow>("SELECT * FROM credentials WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await?,
    )
}
