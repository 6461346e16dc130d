//! Extraction Chain — turns a raw document into a canonical resume.
//!
//! Strategies run in fixed priority order: the external structured-parsing
//! service, then local text extraction feeding the pattern extractor, then a
//! fallback that re-derives the canonical shape from previously stored
//! structured data. The first usable result wins; if none is usable, the last
//! attempt's output (even if minimal) is used and tagged with its source.
//! A strategy failure never propagates past the chain — it just means "this
//! strategy produced nothing".

pub mod mapper;
pub mod parser_api;
pub mod patterns;
pub mod text;

use bytes::Bytes;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::models::resume::{CanonicalResume, ResumeSource};

pub use parser_api::ParserApiClient;

/// Everything the chain may draw on for one extraction run.
pub struct DocumentInput<'a> {
    pub bytes: Option<Bytes>,
    pub file_name: Option<&'a str>,
    pub stored_profile: Option<&'a Value>,
}

pub struct ExtractionChain {
    parser: Option<ParserApiClient>,
}

impl ExtractionChain {
    pub fn new(parser: Option<ParserApiClient>) -> Self {
        Self { parser }
    }

    pub async fn extract(&self, input: &DocumentInput<'_>, clock: &dyn Clock) -> CanonicalResume {
        let now = clock.now();
        let mut last_attempt: Option<CanonicalResume> = None;

        // 1. External structured-parsing service, if configured and bytes exist.
        if let (Some(parser), Some(bytes)) = (&self.parser, &input.bytes) {
            let file_name = input.file_name.unwrap_or("resume");
            match parser.parse(bytes.clone(), file_name).await {
                Some(raw) => {
                    let resume = mapper::map_external(&raw, now);
                    if resume.is_usable() {
                        info!("extraction: external parser produced a usable resume");
                        return resume;
                    }
                    debug!("extraction: external parser result not usable, falling through");
                    last_attempt = Some(resume);
                }
                None => warn!("extraction: external parser produced nothing, falling through"),
            }
        }

        // 2. Local text extraction + pattern-based field extraction.
        if let Some(bytes) = &input.bytes {
            if let Some(raw_text) = text::extract_text(bytes, input.file_name) {
                let fields = patterns::extract_fields(&raw_text);
                let resume = mapper::from_patterns(fields, raw_text, now);
                if resume.is_usable() {
                    info!("extraction: pattern extractor produced a usable resume");
                    return resume;
                }
                debug!("extraction: pattern extraction not usable, falling through");
                last_attempt = Some(resume);
            } else {
                warn!(
                    "extraction: no local text extractor for {:?}, falling through",
                    input.file_name
                );
            }
        }

        // 3. Re-derive from previously stored structured data.
        if let Some(stored) = input.stored_profile {
            let resume = mapper::map_stored(stored, now);
            if resume.is_usable() {
                info!("extraction: stored-data fallback produced a usable resume");
                return resume;
            }
            last_attempt = Some(resume);
        }

        // Nothing usable: the last attempt (however minimal) is the result.
        last_attempt.unwrap_or_else(|| {
            warn!("extraction: every strategy came up empty");
            CanonicalResume::empty(ResumeSource::Manual, now)
        })
    }
}
