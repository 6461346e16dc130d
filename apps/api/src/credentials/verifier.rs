//! Credential assessment and verification. `assess` is a pure decision table
//! over what was extracted for the certificate; `run_verification` drives a
//! credential from `pending` through the state machine, calling the issuer's
//! API when the assessment allows it. Automatic verification never rejects —
//! any failure escalates to human review with the reason recorded in notes.

use chrono::{DateTime, Utc};
use reqwest::Client;
use serde_json::{json, Value};
use sqlx::PgPool;
use std::time::Duration;
use uuid::Uuid;

use crate::clock::Clock;
use crate::credentials::registry;
use crate::credentials::state_machine::VerificationStatus;
use crate::errors::AppError;
use crate::models::credential::{get_credential, CredentialRow, IssuerRow, Verifiability};

const VERIFY_TIMEOUT: Duration = Duration::from_secs(15);
const AUTO_VERIFIED_BY: &str = "issuer-api";

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Assessment {
    pub verifiability: Verifiability,
    pub status: VerificationStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReviewDecision {
    Accept,
    Reject,
}

/// Decides how a certificate can be checked:
///   1. known issuer with API support and a credential id  -> auto
///   2. a credential URL to visit                          -> manual review
///   3. known issuer without API support                   -> manual review
///   4. credential id but unknown issuer                   -> manual review
///   5. nothing actionable                                 -> unverifiable
pub fn assess(credential: &CredentialRow, issuer: Option<&IssuerRow>) -> Assessment {
    let has_id = credential
        .credential_id
        .as_deref()
        .is_some_and(|s| !s.trim().is_empty());
    let has_url = credential
        .credential_url
        .as_deref()
        .is_some_and(|s| !s.trim().is_empty());

    if has_id && issuer.is_some_and(IssuerRow::supports_auto_verification) {
        return Assessment {
            verifiability: Verifiability::Auto,
            status: VerificationStatus::AutoVerifyPending,
        };
    }
    if has_url || issuer.is_some() || has_id {
        return Assessment {
            verifiability: Verifiability::Manual,
            status: VerificationStatus::HumanReview,
        };
    }
    Assessment {
        verifiability: Verifiability::InsufficientData,
        status: VerificationStatus::Unverifiable,
    }
}

/// Issuer responses confirm validity when any of the conventional markers is
/// present. Anything else counts as a failed check.
fn confirms_validity(body: &Value) -> bool {
    body.get("valid").and_then(Value::as_bool) == Some(true)
        || body.get("verified").and_then(Value::as_bool) == Some(true)
        || body.get("status").and_then(Value::as_str) == Some("valid")
}

fn escalation_note(reason: &str) -> String {
    format!("automatic verification failed: {reason}")
}

/// A requeued auto-verify job may find its issuer gone from the registry.
/// That is a verification failure like any other, not an internal error.
fn require_issuer(issuer: Option<IssuerRow>) -> Result<IssuerRow, String> {
    issuer.ok_or_else(|| "issuer could not be resolved from the registry".to_string())
}

async fn call_issuer_api(
    http: &Client,
    issuer: &IssuerRow,
    credential_id: &str,
) -> Result<(), String> {
    let url = issuer
        .verification_api_url
        .as_deref()
        .ok_or_else(|| "issuer has no verification endpoint".to_string())?;

    let response = http
        .post(url)
        .timeout(VERIFY_TIMEOUT)
        .json(&json!({ "credential_id": credential_id }))
        .send()
        .await
        .map_err(|e| format!("request to issuer failed: {e}"))?;

    let status = response.status();
    if !status.is_success() {
        return Err(format!("issuer returned HTTP {status}"));
    }
    let body: Value = response
        .json()
        .await
        .map_err(|e| format!("unreadable issuer response: {e}"))?;
    if confirms_validity(&body) {
        Ok(())
    } else {
        Err("issuer did not confirm the credential".to_string())
    }
}

fn current_status(credential: &CredentialRow) -> Result<VerificationStatus, AppError> {
    VerificationStatus::parse(&credential.status).ok_or_else(|| {
        AppError::Internal(anyhow::anyhow!(
            "credential {} has unknown status '{}'",
            credential.id,
            credential.status
        ))
    })
}

async fn persist_status(
    pool: &PgPool,
    credential_id: Uuid,
    status: VerificationStatus,
    notes: Option<&str>,
    verified_at: Option<DateTime<Utc>>,
    verified_by: Option<&str>,
) -> Result<CredentialRow, AppError> {
    let row = sqlx::query_as::<_, CredentialRow>(
        r#"
        UPDATE credentials SET
            status = $2,
            notes = COALESCE($3, notes),
            verified_at = COALESCE($4, verified_at),
            verified_by = COALESCE($5, verified_by)
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(credential_id)
    .bind(status.as_str())
    .bind(notes)
    .bind(verified_at)
    .bind(verified_by)
    .fetch_one(pool)
    .await?;
    Ok(row)
}

/// Runs the full verification flow for one credential: assessment, state
/// transition, and (when the issuer supports it) the automatic check.
pub async fn run_verification(
    pool: &PgPool,
    http: &Client,
    clock: &dyn Clock,
    credential_id: Uuid,
) -> Result<CredentialRow, AppError> {
    let credential = get_credential(pool, credential_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("credential {credential_id}")))?;
    let status = current_status(&credential)?;

    if status.is_terminal() || status == VerificationStatus::HumanReview {
        tracing::info!(credential_id = %credential_id, status = status.as_str(), "verification already settled, skipping");
        return Ok(credential);
    }

    let issuer = registry::find_issuer(pool, &credential.issuer_name).await?;

    // A requeued job may land here already past assessment.
    let assessed = if status == VerificationStatus::AutoVerifyPending {
        Assessment {
            verifiability: Verifiability::Auto,
            status: VerificationStatus::AutoVerifyPending,
        }
    } else {
        let assessment = assess(&credential, issuer.as_ref());
        status
            .transition_to(assessment.status)
            .map_err(|e| AppError::InvalidTransition(e.to_string()))?;
        sqlx::query(
            "UPDATE credentials SET verifiability = $2, status = $3, issuer_id = $4 WHERE id = $1",
        )
        .bind(credential_id)
        .bind(assessment.verifiability.as_str())
        .bind(assessment.status.as_str())
        .bind(issuer.as_ref().map(|i| i.id))
        .execute(pool)
        .await?;
        tracing::info!(
            credential_id = %credential_id,
            verifiability = assessment.verifiability.as_str(),
            status = assessment.status.as_str(),
            "credential assessed"
        );
        assessment
    };

    if assessed.status != VerificationStatus::AutoVerifyPending {
        return get_credential(pool, credential_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("credential {credential_id}")));
    }

    let extracted_id = credential.credential_id.as_deref().unwrap_or_default();
    let outcome = match require_issuer(issuer) {
        Ok(issuer) => call_issuer_api(http, &issuer, extracted_id)
            .await
            .map(|()| issuer.name),
        Err(reason) => Err(reason),
    };

    match outcome {
        Ok(issuer_name) => {
            tracing::info!(credential_id = %credential_id, issuer = %issuer_name, "credential verified by issuer");
            persist_status(
                pool,
                credential_id,
                VerificationStatus::Verified,
                Some("confirmed by issuer verification endpoint"),
                Some(clock.now()),
                Some(AUTO_VERIFIED_BY),
            )
            .await
        }
        Err(reason) => {
            tracing::warn!(credential_id = %credential_id, %reason, "escalating credential to human review");
            persist_status(
                pool,
                credential_id,
                VerificationStatus::HumanReview,
                Some(&escalation_note(&reason)),
                None,
                None,
            )
            .await
        }
    }
}

/// A reviewer's accept/reject decision. Only valid from `human-review`.
pub async fn review(
    pool: &PgPool,
    clock: &dyn Clock,
    credential_id: Uuid,
    decision: ReviewDecision,
    reviewer: &str,
    notes: Option<&str>,
) -> Result<CredentialRow, AppError> {
    let credential = get_credential(pool, credential_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("credential {credential_id}")))?;
    let status = current_status(&credential)?;

    let target = match decision {
        ReviewDecision::Accept => VerificationStatus::Verified,
        ReviewDecision::Reject => VerificationStatus::Rejected,
    };
    status
        .transition_to(target)
        .map_err(|e| AppError::InvalidTransition(e.to_string()))?;

    tracing::info!(
        credential_id = %credential_id,
        reviewer,
        decision = target.as_str(),
        "credential reviewed"
    );
    persist_status(
        pool,
        credential_id,
        target,
        notes,
        Some(clock.now()),
        Some(reviewer),
    )
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn credential(
        issuer_name: &str,
        credential_id: Option<&str>,
        credential_url: Option<&str>,
    ) -> CredentialRow {
        CredentialRow {
            id: Uuid::new_v4(),
            resume_id: None,
            name: "Certified Kubernetes Administrator".to_string(),
            issuer_name: issuer_name.to_string(),
            issuer_id: None,
            credential_id: credential_id.map(str::to_string),
            credential_url: credential_url.map(str::to_string),
            issue_date: None,
            expiry_date: None,
            extracted_data: json!({}),
            extraction_method: "pattern-extraction".to_string(),
            verifiability: "insufficient-data".to_string(),
            status: "pending".to_string(),
            notes: String::new(),
            verified_at: None,
            verified_by: None,
            created_at: Utc::now(),
        }
    }

    fn api_issuer() -> IssuerRow {
        IssuerRow {
            id: Uuid::new_v4(),
            name: "Linux Foundation".to_string(),
            domain: "linuxfoundation.org".to_string(),
            verification_api_url: Some("https://verify.linuxfoundation.org/api".to_string()),
            verification_method: "api".to_string(),
            is_verifiable: true,
            credential_pattern: None,
        }
    }

    fn manual_issuer() -> IssuerRow {
        IssuerRow {
            verification_api_url: None,
            verification_method: "manual".to_string(),
            is_verifiable: false,
            ..api_issuer()
        }
    }

    #[test]
    fn test_known_api_issuer_with_id_goes_auto() {
        let cred = credential("Linux Foundation", Some("LF-1234"), None);
        let a = assess(&cred, Some(&api_issuer()));
        assert_eq!(a.verifiability, Verifiability::Auto);
        assert_eq!(a.status, VerificationStatus::AutoVerifyPending);
    }

    #[test]
    fn test_credential_url_goes_to_human_review() {
        let cred = credential("Unknown Academy", None, Some("https://verify.example/abc"));
        let a = assess(&cred, None);
        assert_eq!(a.verifiability, Verifiability::Manual);
        assert_eq!(a.status, VerificationStatus::HumanReview);
    }

    #[test]
    fn test_known_issuer_without_api_goes_to_human_review() {
        let cred = credential("Linux Foundation", None, None);
        let a = assess(&cred, Some(&manual_issuer()));
        assert_eq!(a.verifiability, Verifiability::Manual);
        assert_eq!(a.status, VerificationStatus::HumanReview);
    }

    #[test]
    fn test_id_with_unknown_issuer_is_manual_human_review() {
        // Credential id present, issuer not in the registry, no URL.
        let cred = credential("Obscure Institute", Some("OB-778"), None);
        let a = assess(&cred, None);
        assert_eq!(a.verifiability, Verifiability::Manual);
        assert_eq!(a.status, VerificationStatus::HumanReview);
    }

    #[test]
    fn test_nothing_actionable_is_unverifiable() {
        let cred = credential("Obscure Institute", None, None);
        let a = assess(&cred, None);
        assert_eq!(a.verifiability, Verifiability::InsufficientData);
        assert_eq!(a.status, VerificationStatus::Unverifiable);
    }

    #[test]
    fn test_blank_credential_id_does_not_count() {
        let cred = credential("Linux Foundation", Some("   "), None);
        let a = assess(&cred, Some(&api_issuer()));
        assert_eq!(a.verifiability, Verifiability::Manual);
        assert_eq!(a.status, VerificationStatus::HumanReview);
    }

    #[test]
    fn test_validity_markers() {
        assert!(confirms_validity(&json!({ "valid": true })));
        assert!(confirms_validity(&json!({ "verified": true })));
        assert!(confirms_validity(&json!({ "status": "valid" })));
        assert!(!confirms_validity(&json!({ "valid": false })));
        assert!(!confirms_validity(&json!({ "status": "revoked" })));
        assert!(!confirms_validity(&json!({})));
    }

    #[test]
    fn test_missing_issuer_on_requeue_escalates_with_reason() {
        // The escalation path must carry a reason instead of erroring out and
        // leaving the credential stuck in auto-verify-pending.
        let reason = require_issuer(None).unwrap_err();
        let note = escalation_note(&reason);
        assert!(note.starts_with("automatic verification failed"));
        assert!(note.contains("registry"));
        assert!(VerificationStatus::AutoVerifyPending.can_transition_to(VerificationStatus::HumanReview));
    }

    #[test]
    fn test_escalation_note_carries_the_reason() {
        let note = escalation_note("issuer returned HTTP 503 Service Unavailable");
        assert!(note.contains("503"));
        assert!(note.starts_with("automatic verification failed"));
    }
}
