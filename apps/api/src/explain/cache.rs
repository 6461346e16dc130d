//! Redis-backed narrative cache. Keys are a hash of (context + prompt
//! version); entries expire after 24 hours. The cache is strictly
//! best-effort: any Redis failure is logged and treated as a miss.

use redis::AsyncCommands;
use serde_json::Value;
use sha2::{Digest, Sha256};
use tracing::warn;

use crate::explain::prompts::PROMPT_VERSION;

const CACHE_TTL_SECS: u64 = 24 * 60 * 60;

/// Hex digest of the context plus the prompt-template version.
pub fn cache_key(context: &Value) -> String {
    let mut hasher = Sha256::new();
    hasher.update(context.to_string().as_bytes());
    hasher.update(PROMPT_VERSION.as_bytes());
    hex::encode(hasher.finalize())
}

pub async fn get(client: &redis::Client, key: &str) -> Option<Value> {
    let mut conn = match client.get_multiplexed_async_connection().await {
        Ok(c) => c,
        Err(e) => {
            warn!("explanation cache unavailable: {e}");
            return None;
        }
    };
    match conn.get::<_, Option<String>>(format!("explain:{key}")).await {
        Ok(Some(raw)) => serde_json::from_str(&raw).ok(),
        Ok(None) => None,
        Err(e) => {
            warn!("explanation cache read failed: {e}");
            None
        }
    }
}

pub async fn put(client: &redis::Client, key: &str, narrative: &Value) {
    let mut conn = match client.get_multiplexed_async_connection().await {
        Ok(c) => c,
        Err(e) => {
            warn!("explanation cache unavailable: {e}");
            return;
        }
    };
    let payload = narrative.to_string();
    if let Err(e) = conn
        .set_ex::<_, _, ()>(format!("explain:{key}"), payload, CACHE_TTL_SECS)
        .await
    {
        warn!("explanation cache write failed: {e}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_same_context_same_key() {
        let ctx = json!({ "a": 1, "b": ["x"] });
        assert_eq!(cache_key(&ctx), cache_key(&ctx));
    }

    #[test]
    fn test_different_context_different_key() {
        assert_ne!(cache_key(&json!({ "a": 1 })), cache_key(&json!({ "a": 2 })));
    }

    #[test]
    fn test_key_is_hex_sha256() {
        let key = cache_key(&json!({}));
        assert_eq!(key.len(), 64);
        assert!(key.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
