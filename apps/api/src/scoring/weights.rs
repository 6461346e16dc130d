//! Weight tables for the scoring engines. Weights are tunable policy, not
//! logic, so they live in named structs instead of scattered literals. Each
//! table sums to 100.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QualityWeights {
    pub skills: i32,
    pub experience: i32,
    pub education: i32,
    pub completeness: i32,
    pub consistency: i32,
}

impl Default for QualityWeights {
    fn default() -> Self {
        Self {
            skills: 25,
            experience: 30,
            education: 20,
            completeness: 15,
            consistency: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompatibilityWeights {
    pub skills: i32,
    pub experience: i32,
    pub education: i32,
}

impl Default for CompatibilityWeights {
    fn default() -> Self {
        Self {
            skills: 40,
            experience: 35,
            education: 25,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchWeights {
    pub exact_skills: i32,
    pub related_skills: i32,
    pub experience_years: i32,
    pub experience_relevance: i32,
    pub education: i32,
}

impl Default for MatchWeights {
    fn default() -> Self {
        Self {
            exact_skills: 30,
            related_skills: 15,
            experience_years: 25,
            experience_relevance: 15,
            education: 15,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_weight_tables_sum_to_100() {
        let q = QualityWeights::default();
        assert_eq!(
            q.skills + q.experience + q.education + q.completeness + q.consistency,
            100
        );
        let c = CompatibilityWeights::default();
        assert_eq!(c.skills + c.experience + c.education, 100);
        let m = MatchWeights::default();
        assert_eq!(
            m.exact_skills
                + m.related_skills
                + m.experience_years
                + m.experience_relevance
                + m.education,
            100
        );
    }
}
