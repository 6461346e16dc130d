//! Explanation Adapter — the only component allowed to talk to the LLM
//! client. It narrates scores that are already persisted; it never computes
//! one. Responses are cached for 24 hours keyed by a hash of the input
//! context and the prompt-template version, and a malformed response is kept
//! verbatim instead of failing the stage.

pub mod cache;
pub mod prompts;

use serde_json::{json, Map, Value};
use sqlx::PgPool;
use std::sync::Arc;
use uuid::Uuid;

use crate::clock::Clock;
use crate::errors::AppError;
use crate::llm_client::{strip_json_fences, LlmClient, MODEL};
use crate::models::job::get_job;
use crate::models::matching::{get_match, get_resume, get_score};

/// Keys the model is never allowed to introduce into a narrative. Anything
/// numeric or verdict-like is stripped before persisting.
const FORBIDDEN_KEYS: &[&str] = &["score", "scores", "level", "overall", "verdict", "rating"];

#[derive(Debug, Clone, PartialEq)]
pub struct Narrative {
    pub strengths: Vec<String>,
    pub gaps: Vec<String>,
    pub recommendations: Vec<String>,
}

pub struct ExplanationAdapter {
    pool: PgPool,
    redis: redis::Client,
    llm: LlmClient,
    clock: Arc<dyn Clock>,
}

impl ExplanationAdapter {
    pub fn new(pool: PgPool, redis: redis::Client, llm: LlmClient, clock: Arc<dyn Clock>) -> Self {
        Self {
            pool,
            redis,
            llm,
            clock,
        }
    }

    /// Narrates the persisted quality score of a resume.
    pub async fn explain_score(&self, resume_id: Uuid) -> Result<(), AppError> {
        let score = get_score(&self.pool, resume_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("score for resume {resume_id}")))?;
        let resume = get_resume(&self.pool, resume_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("resume {resume_id}")))?;
        let canonical = resume.canonical_resume();

        let context = json!({
            "kind": "resume-quality",
            "method": score.method,
            "breakdown": score.breakdown,
            "candidate": {
                "skills": canonical.as_ref().map(|c| c.skill_names()).unwrap_or_default(),
                "experience_titles": canonical
                    .as_ref()
                    .map(|c| c.experiences.iter().map(|e| e.title.clone()).collect::<Vec<_>>())
                    .unwrap_or_default(),
                "degrees": canonical
                    .as_ref()
                    .map(|c| c.education.iter().map(|e| e.degree.clone()).collect::<Vec<_>>())
                    .unwrap_or_default(),
            },
        });
        let hash = cache::cache_key(&context);

        // Row already narrated from the same input.
        if score.explain_input_hash.as_deref() == Some(hash.as_str()) {
            tracing::debug!(resume_id = %resume_id, "score narrative is current, skipping");
            return Ok(());
        }

        if let Some(cached) = cache::get(&self.redis, &hash).await {
            let narrative = narrative_from(&cached, "gaps");
            return self
                .persist_score_narrative(resume_id, &narrative, MODEL, &hash, None)
                .await;
        }

        let prompt = prompts::score_prompt(&context);
        let raw = self
            .llm
            .call_text(&prompt, prompts::SCORE_SYSTEM)
            .await
            .map_err(|e| AppError::Llm(e.to_string()))?;

        match parse_narrative(&raw, "gaps") {
            Some((narrative, sanitized)) => {
                cache::put(&self.redis, &hash, &sanitized).await;
                self.persist_score_narrative(resume_id, &narrative, MODEL, &hash, None)
                    .await
            }
            None => {
                tracing::warn!(resume_id = %resume_id, "unparseable score narrative, capturing raw");
                self.persist_score_narrative(
                    resume_id,
                    &Narrative::empty(),
                    &format!("raw:{MODEL}"),
                    &hash,
                    Some(&raw),
                )
                .await
            }
        }
    }

    /// Narrates the persisted compatibility assessment of a (resume, job) pair.
    pub async fn explain_compatibility(&self, resume_id: Uuid, job_id: Uuid) -> Result<(), AppError> {
        let matched = get_match(&self.pool, resume_id, job_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("match for resume {resume_id} and job {job_id}"))
            })?;
        let level = matched.level.clone().ok_or_else(|| {
            AppError::Validation("compatibility has not been computed for this pair".to_string())
        })?;
        let resume = get_resume(&self.pool, resume_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("resume {resume_id}")))?;
        let job = get_job(&self.pool, job_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("job {job_id}")))?;
        let canonical = resume.canonical_resume();

        let context = json!({
            "kind": "compatibility",
            "compatibility_level": level,
            "job": {
                "title": job.title,
                "required_skills": job.required_skills,
            },
            "candidate": {
                "skills": canonical.as_ref().map(|c| c.skill_names()).unwrap_or_default(),
                "experience_titles": canonical
                    .as_ref()
                    .map(|c| c.experiences.iter().map(|e| e.title.clone()).collect::<Vec<_>>())
                    .unwrap_or_default(),
            },
        });
        let hash = cache::cache_key(&context);

        if matched.explain_input_hash.as_deref() == Some(hash.as_str()) {
            tracing::debug!(resume_id = %resume_id, job_id = %job_id, "match narrative is current, skipping");
            return Ok(());
        }

        if let Some(cached) = cache::get(&self.redis, &hash).await {
            let narrative = narrative_from(&cached, "potential_gaps");
            return self
                .persist_match_narrative(resume_id, job_id, &narrative, MODEL, &hash, None)
                .await;
        }

        let prompt = prompts::compatibility_prompt(&context);
        let raw = self
            .llm
            .call_text(&prompt, prompts::COMPATIBILITY_SYSTEM)
            .await
            .map_err(|e| AppError::Llm(e.to_string()))?;

        match parse_narrative(&raw, "potential_gaps") {
            Some((narrative, sanitized)) => {
                cache::put(&self.redis, &hash, &sanitized).await;
                self.persist_match_narrative(resume_id, job_id, &narrative, MODEL, &hash, None)
                    .await
            }
            None => {
                tracing::warn!(resume_id = %resume_id, job_id = %job_id, "unparseable match narrative, capturing raw");
                self.persist_match_narrative(
                    resume_id,
                    job_id,
                    &Narrative::empty(),
                    &format!("raw:{MODEL}"),
                    &hash,
                    Some(&raw),
                )
                .await
            }
        }
    }

    async fn persist_score_narrative(
        &self,
        resume_id: Uuid,
        narrative: &Narrative,
        model_tag: &str,
        hash: &str,
        raw: Option<&str>,
    ) -> Result<(), AppError> {
        sqlx::query(
            r#"
            UPDATE resume_scores SET
                strengths = $2, gaps = $3, recommendations = $4,
                model_tag = $5, explained_at = $6, explain_input_hash = $7,
                explain_raw = $8
            WHERE resume_id = $1
            "#,
        )
        .bind(resume_id)
        .bind(&narrative.strengths)
        .bind(&narrative.gaps)
        .bind(&narrative.recommendations)
        .bind(model_tag)
        .bind(self.clock.now())
        .bind(hash)
        .bind(raw)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn persist_match_narrative(
        &self,
        resume_id: Uuid,
        job_id: Uuid,
        narrative: &Narrative,
        model_tag: &str,
        hash: &str,
        raw: Option<&str>,
    ) -> Result<(), AppError> {
        sqlx::query(
            r#"
            UPDATE compatibility_matches SET
                strengths = $3, potential_gaps = $4, recommendations = $5,
                model_tag = $6, explained_at = $7, explain_input_hash = $8,
                explain_raw = $9
            WHERE resume_id = $1 AND job_id = $2
            "#,
        )
        .bind(resume_id)
        .bind(job_id)
        .bind(&narrative.strengths)
        .bind(&narrative.gaps)
        .bind(&narrative.recommendations)
        .bind(model_tag)
        .bind(self.clock.now())
        .bind(hash)
        .bind(raw)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

impl Narrative {
    fn empty() -> Self {
        Narrative {
            strengths: Vec::new(),
            gaps: Vec::new(),
            recommendations: Vec::new(),
        }
    }
}

/// Parses a model response into a narrative. Returns the narrative together
/// with the sanitized JSON suitable for caching, or `None` when the response
/// is not a JSON object.
fn parse_narrative(raw: &str, gaps_key: &str) -> Option<(Narrative, Value)> {
    let value: Value = serde_json::from_str(strip_json_fences(raw)).ok()?;
    let object = value.as_object()?;
    let sanitized = sanitize(object);
    let narrative = narrative_from(&sanitized, gaps_key);
    Some((narrative, sanitized))
}

/// Drops any numeric or verdict-like keys the model may have added. The
/// narrative can describe fit, it can never restate or originate a score.
fn sanitize(object: &Map<String, Value>) -> Value {
    let kept: Map<String, Value> = object
        .iter()
        .filter(|(k, _)| !FORBIDDEN_KEYS.contains(&k.to_lowercase().as_str()))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    Value::Object(kept)
}

fn narrative_from(value: &Value, gaps_key: &str) -> Narrative {
    Narrative {
        strengths: string_list(value, "strengths"),
        gaps: string_list(value, gaps_key),
        recommendations: string_list(value, "recommendations"),
    }
}

fn string_list(value: &Value, key: &str) -> Vec<String> {
    value
        .get(key)
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_narrative_happy_path() {
        let raw = r#"{"strengths": ["Broad backend skills"], "gaps": ["No cloud exposure"], "recommendations": ["Add a certification"]}"#;
        let (n, _) = parse_narrative(raw, "gaps").unwrap();
        assert_eq!(n.strengths, vec!["Broad backend skills"]);
        assert_eq!(n.gaps, vec!["No cloud exposure"]);
        assert_eq!(n.recommendations, vec!["Add a certification"]);
    }

    #[test]
    fn test_parse_narrative_strips_fences() {
        let raw = "```json\n{\"strengths\": [\"x\"], \"potential_gaps\": [], \"recommendations\": []}\n```";
        let (n, _) = parse_narrative(raw, "potential_gaps").unwrap();
        assert_eq!(n.strengths, vec!["x"]);
    }

    #[test]
    fn test_sanitize_drops_score_and_level_keys() {
        let raw = r#"{"strengths": ["ok"], "gaps": [], "recommendations": [], "score": 95, "Level": "HIGH"}"#;
        let (_, sanitized) = parse_narrative(raw, "gaps").unwrap();
        assert!(sanitized.get("score").is_none());
        assert!(sanitized.get("Level").is_none());
        assert!(sanitized.get("strengths").is_some());
    }

    #[test]
    fn test_non_json_response_is_none() {
        assert!(parse_narrative("I think this resume is great!", "gaps").is_none());
        assert!(parse_narrative("[1, 2, 3]", "gaps").is_none());
    }

    #[test]
    fn test_missing_keys_become_empty_lists() {
        let (n, _) = parse_narrative(r#"{"strengths": ["a"]}"#, "gaps").unwrap();
        assert_eq!(n.strengths, vec!["a"]);
        assert!(n.gaps.is_empty());
        assert!(n.recommendations.is_empty());
    }

    #[test]
    fn test_non_string_items_are_dropped() {
        let (n, _) = parse_narrative(r#"{"strengths": ["a", 42, null]}"#, "gaps").unwrap();
        assert_eq!(n.strengths, vec!["a"]);
    }
}
