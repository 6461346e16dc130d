//! Issuer registry lookup. The registry is small, read-only reference data,
//! so matching happens in memory: case-folded equality first, then substring
//! containment in either direction on the issuer name or domain.

use sqlx::PgPool;

use crate::models::credential::IssuerRow;

pub async fn find_issuer(pool: &PgPool, issuer_name: &str) -> anyhow::Result<Option<IssuerRow>> {
    let needle = issuer_name.trim().to_lowercase();
    if needle.is_empty() {
        return Ok(None);
    }
    let issuers = sqlx::query_as::<_, IssuerRow>("SELECT * FROM issuers")
        .fetch_all(pool)
        .await?;
    Ok(best_match(&issuers, &needle).cloned())
}

fn best_match<'a>(issuers: &'a [IssuerRow], needle: &str) -> Option<&'a IssuerRow> {
    issuers
        .iter()
        .find(|i| i.name.to_lowercase() == needle || i.domain.to_lowercase() == needle)
        .or_else(|| {
            issuers.iter().find(|i| {
                let name = i.name.to_lowercase();
                let domain = i.domain.to_lowercase();
                name.contains(needle)
                    || needle.contains(&name)
                    || domain.contains(needle)
                    || needle.contains(&domain)
            })
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn issuer(name: &str, domain: &str) -> IssuerRow {
        IssuerRow {
            id: Uuid::new_v4(),
            name: name.to_string(),
            domain: domain.to_string(),
            verification_api_url: None,
            verification_method: "manual".to_string(),
            is_verifiable: false,
            credential_pattern: None,
        }
    }

    #[test]
    fn test_exact_name_match_wins_over_substring() {
        let issuers = vec![issuer("AWS Training", "aws.training"), issuer("AWS", "aws.amazon.com")];
        let found = best_match(&issuers, "aws").unwrap();
        assert_eq!(found.name, "AWS");
    }

    #[test]
    fn test_substring_match_either_direction() {
        let issuers = vec![issuer("Coursera", "coursera.org")];
        assert!(best_match(&issuers, "coursera inc").is_some());
        assert!(best_match(&issuers, "cours").is_some());
    }

    #[test]
    fn test_domain_match() {
        let issuers = vec![issuer("Linux Foundation", "training.linuxfoundation.org")];
        assert!(best_match(&issuers, "training.linuxfoundation.org").is_some());
    }

    #[test]
    fn test_unknown_issuer_is_none() {
        let issuers = vec![issuer("Coursera", "coursera.org")];
        assert!(best_match(&issuers, "udemy").is_none());
    }
}
