//! Pattern-based field extraction over raw resume text: regex for email and
//! phone, a first-line name heuristic, keyword lists for skills, languages and
//! degrees, and a year-range matcher for experience spans.

use regex::Regex;
use std::sync::OnceLock;

fn email_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[A-Za-z0-9._%+\-]+@[A-Za-z0-9.\-]+\.[A-Za-z]{2,}").unwrap())
}

fn phone_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\+?\d[\d\s().\-]{7,}\d").unwrap())
}

fn year_range_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"((?:19|20)\d{2})\s*(?:[-–—]|to)\s*((?:19|20)\d{2}|[Pp]resent|[Cc]urrent)")
            .unwrap()
    })
}

/// Skills recognized by keyword scan. Matching is whole-word, case-insensitive.
const SKILL_KEYWORDS: &[&str] = &[
    "php", "laravel", "mysql", "postgresql", "python", "django", "sql", "rust", "go", "java",
    "kotlin", "swift", "javascript", "typescript", "react", "vue", "angular", "node.js", "c++",
    "c#", ".net", "ruby", "rails", "docker", "kubernetes", "aws", "azure", "gcp", "terraform",
    "git", "linux", "redis", "mongodb", "elasticsearch", "kafka", "rabbitmq", "graphql", "rest",
    "html", "css", "sass", "flutter", "scala", "spark", "hadoop", "pandas", "numpy", "tensorflow",
    "pytorch",
];

const LANGUAGE_KEYWORDS: &[&str] = &[
    "english", "spanish", "french", "german", "italian", "portuguese", "dutch", "russian",
    "mandarin", "cantonese", "japanese", "korean", "hindi", "arabic", "turkish", "polish",
];

/// Degree phrases in priority order: the first hit per line wins.
const DEGREE_KEYWORDS: &[(&str, &str)] = &[
    ("ph.d", "Doctorate"),
    ("phd", "Doctorate"),
    ("doctorate", "Doctorate"),
    ("doctoral", "Doctorate"),
    ("master", "Master's degree"),
    ("msc", "Master's degree"),
    ("m.sc", "Master's degree"),
    ("mba", "Master's degree"),
    ("bachelor", "Bachelor's degree"),
    ("bsc", "Bachelor's degree"),
    ("b.sc", "Bachelor's degree"),
    ("b.tech", "Bachelor's degree"),
    ("associate", "Associate degree"),
    ("diploma", "Diploma"),
];

#[derive(Debug, Clone, PartialEq)]
pub struct ExperienceSpan {
    pub title: String,
    pub start_year: i32,
    pub end_year: Option<i32>,
    pub is_current: bool,
}

#[derive(Debug, Clone, Default)]
pub struct PatternFields {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub skills: Vec<String>,
    pub languages: Vec<String>,
    pub degrees: Vec<String>,
    pub experience_spans: Vec<ExperienceSpan>,
}

pub fn extract_fields(text: &str) -> PatternFields {
    PatternFields {
        name: extract_name(text),
        email: email_re().find(text).map(|m| m.as_str().to_string()),
        phone: extract_phone(text),
        skills: keyword_scan(text, SKILL_KEYWORDS),
        languages: keyword_scan(text, LANGUAGE_KEYWORDS),
        degrees: extract_degrees(text),
        experience_spans: extract_spans(text),
    }
}

/// First non-empty line, if it plausibly looks like a person's name:
/// at most five words, no digits, no email marker.
fn extract_name(text: &str) -> Option<String> {
    let line = text.lines().map(str::trim).find(|l| !l.is_empty())?;
    let word_count = line.split_whitespace().count();
    if word_count == 0 || word_count > 5 {
        return None;
    }
    if line.chars().any(|c| c.is_ascii_digit()) || line.contains('@') {
        return None;
    }
    Some(line.to_string())
}

fn extract_phone(text: &str) -> Option<String> {
    // Skip matches that are really year ranges or id numbers: require 8-15 digits.
    phone_re()
        .find_iter(text)
        .map(|m| m.as_str().trim().to_string())
        .find(|candidate| {
            let digits = candidate.chars().filter(char::is_ascii_digit).count();
            (8..=15).contains(&digits) && !year_range_re().is_match(candidate)
        })
}

fn keyword_scan(text: &str, keywords: &[&str]) -> Vec<String> {
    let lower = text.to_lowercase();
    let mut found = Vec::new();
    for kw in keywords {
        if contains_word(&lower, kw) {
            found.push(canonical_case(kw));
        }
    }
    found
}

/// Word-boundary containment check that tolerates keywords with punctuation
/// (`c++`, `node.js`) which regex `\b` would mishandle.
fn contains_word(haystack: &str, needle: &str) -> bool {
    let mut start = 0;
    while let Some(pos) = haystack[start..].find(needle) {
        let abs = start + pos;
        let before_ok = abs == 0
            || !haystack[..abs]
                .chars()
                .next_back()
                .map(|c| c.is_alphanumeric())
                .unwrap_or(false);
        let after = abs + needle.len();
        let after_ok = after >= haystack.len()
            || !haystack[after..]
                .chars()
                .next()
                .map(|c| c.is_alphanumeric())
                .unwrap_or(false);
        if before_ok && after_ok {
            return true;
        }
        start = abs + needle.len();
        if start >= haystack.len() {
            break;
        }
    }
    false
}

fn canonical_case(keyword: &str) -> String {
    match keyword {
        "php" => "PHP".to_string(),
        "mysql" => "MySQL".to_string(),
        "postgresql" => "PostgreSQL".to_string(),
        "sql" => "SQL".to_string(),
        "aws" => "AWS".to_string(),
        "gcp" => "GCP".to_string(),
        "html" => "HTML".to_string(),
        "css" => "CSS".to_string(),
        "rest" => "REST".to_string(),
        "graphql" => "GraphQL".to_string(),
        ".net" => ".NET".to_string(),
        "c++" => "C++".to_string(),
        "c#" => "C#".to_string(),
        "javascript" => "JavaScript".to_string(),
        "typescript" => "TypeScript".to_string(),
        "node.js" => "Node.js".to_string(),
        "mongodb" => "MongoDB".to_string(),
        "rabbitmq" => "RabbitMQ".to_string(),
        other => {
            let mut c = other.chars();
            match c.next() {
                None => String::new(),
                Some(f) => f.to_uppercase().to_string() + c.as_str(),
            }
        }
    }
}

fn extract_degrees(text: &str) -> Vec<String> {
    let mut degrees = Vec::new();
    for line in text.lines() {
        let lower = line.to_lowercase();
        if let Some((_, label)) = DEGREE_KEYWORDS.iter().find(|(kw, _)| lower.contains(kw)) {
            if !degrees.contains(&label.to_string()) {
                degrees.push(label.to_string());
            }
        }
    }
    degrees
}

/// Year ranges like "2019 - 2023" or "2021 – present" become experience spans.
/// The surrounding line, minus the range itself, serves as a best-effort title.
fn extract_spans(text: &str) -> Vec<ExperienceSpan> {
    let mut spans = Vec::new();
    for line in text.lines() {
        for caps in year_range_re().captures_iter(line) {
            let start_year: i32 = match caps[1].parse() {
                Ok(y) => y,
                Err(_) => continue,
            };
            let end_raw = caps[2].to_lowercase();
            let is_current = end_raw == "present" || end_raw == "current";
            let end_year = if is_current {
                None
            } else {
                end_raw.parse::<i32>().ok()
            };
            if let Some(end) = end_year {
                if end < start_year {
                    continue;
                }
            }
            let title = year_range_re().replace_all(line, "").trim().trim_matches(|c: char| !c.is_alphanumeric()).to_string();
            spans.push(ExperienceSpan {
                title: if title.is_empty() {
                    "Experience".to_string()
                } else {
                    title
                },
                start_year,
                end_year,
                is_current,
            });
        }
    }
    spans
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
Maria Keller
maria.keller@example.org | +49 170 1234567
Senior PHP Developer, Acme GmbH 2019 - 2023
Backend Engineer, Widgets AG 2016 - 2019
Skills: PHP, Laravel, MySQL, Docker
Languages: English, German
Education: Bachelor of Science in Informatics
";

    #[test]
    fn test_email_and_phone() {
        let fields = extract_fields(SAMPLE);
        assert_eq!(fields.email.as_deref(), Some("maria.keller@example.org"));
        assert_eq!(fields.phone.as_deref(), Some("+49 170 1234567"));
    }

    #[test]
    fn test_first_line_name_heuristic() {
        let fields = extract_fields(SAMPLE);
        assert_eq!(fields.name.as_deref(), Some("Maria Keller"));
    }

    #[test]
    fn test_name_heuristic_rejects_headers_with_digits() {
        assert_eq!(extract_name("Resume 2024\nJo Doe"), None);
    }

    #[test]
    fn test_skill_keyword_scan() {
        let fields = extract_fields(SAMPLE);
        assert!(fields.skills.contains(&"PHP".to_string()));
        assert!(fields.skills.contains(&"Laravel".to_string()));
        assert!(fields.skills.contains(&"MySQL".to_string()));
        assert!(fields.skills.contains(&"Docker".to_string()));
    }

    #[test]
    fn test_language_scan() {
        let fields = extract_fields(SAMPLE);
        assert_eq!(fields.languages, vec!["English", "German"]);
    }

    #[test]
    fn test_degree_detection() {
        let fields = extract_fields(SAMPLE);
        assert_eq!(fields.degrees, vec!["Bachelor's degree"]);
    }

    #[test]
    fn test_year_ranges_become_spans() {
        let fields = extract_fields(SAMPLE);
        assert_eq!(fields.experience_spans.len(), 2);
        assert_eq!(fields.experience_spans[0].start_year, 2019);
        assert_eq!(fields.experience_spans[0].end_year, Some(2023));
        assert!(!fields.experience_spans[0].is_current);
    }

    #[test]
    fn test_present_span_is_current() {
        let fields = extract_fields("Platform Engineer 2021 – present");
        assert_eq!(fields.experience_spans.len(), 1);
        assert!(fields.experience_spans[0].is_current);
        assert_eq!(fields.experience_spans[0].end_year, None);
    }

    #[test]
    fn test_reversed_range_is_dropped() {
        let fields = extract_fields("Intern 2023 - 2019");
        assert!(fields.experience_spans.is_empty());
    }

    #[test]
    fn test_word_boundary_scan_avoids_substrings() {
        // "go" must not fire inside "Django".
        let fields = extract_fields("Django developer");
        assert!(fields.skills.contains(&"Django".to_string()));
        assert!(!fields.skills.contains(&"Go".to_string()));
    }

    #[test]
    fn test_cpp_and_csharp_detected() {
        let fields = extract_fields("Systems work in C++ and C#");
        assert!(fields.skills.contains(&"C++".to_string()));
        assert!(fields.skills.contains(&"C#".to_string()));
    }
}
