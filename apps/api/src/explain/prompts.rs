//! Prompt templates for score narration. The version tag participates in the
//! cache key, so editing a template automatically invalidates cached
//! narratives.

use serde_json::Value;

pub const PROMPT_VERSION: &str = "explain-v1";

pub const SCORE_SYSTEM: &str = "\
You are a career advisor narrating an already-computed resume quality score. \
You must not compute, change, or restate any numeric score, and you must not \
give a hiring verdict. Respond with ONLY a JSON object of the form \
{\"strengths\": [string], \"gaps\": [string], \"recommendations\": [string]}. \
Each entry is one plain-language sentence. No markdown, no extra keys, no numbers.";

pub const COMPATIBILITY_SYSTEM: &str = "\
You are a career advisor narrating an already-computed candidate-to-job \
compatibility assessment. The compatibility level has already been decided; \
do not contradict it, restate scores, or render a hiring verdict. Respond \
with ONLY a JSON object of the form {\"strengths\": [string], \
\"potential_gaps\": [string], \"recommendations\": [string]}. \
Each entry is one plain-language sentence. No markdown, no extra keys, no numbers.";

pub fn score_prompt(context: &Value) -> String {
    format!(
        "Here is the computed quality assessment of a resume, as JSON:\n\n{}\n\n\
         Narrate the candidate's strengths, the gaps in the resume, and concrete \
         recommendations for improving it.",
        context
    )
}

pub fn compatibility_prompt(context: &Value) -> String {
    format!(
        "Here is the computed compatibility assessment of a candidate against a \
         job, as JSON:\n\n{}\n\n\
         Narrate why the candidate fits, the potential gaps relative to the job's \
         requirements, and recommendations for closing them.",
        context
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_prompts_embed_the_context() {
        let ctx = json!({ "overall_band": "strong", "skills": ["Rust"] });
        assert!(score_prompt(&ctx).contains("overall_band"));
        assert!(compatibility_prompt(&ctx).contains("Rust"));
    }

    #[test]
    fn test_system_prompts_demand_json_only() {
        assert!(SCORE_SYSTEM.contains("ONLY a JSON object"));
        assert!(COMPATIBILITY_SYSTEM.contains("ONLY a JSON object"));
    }
}
