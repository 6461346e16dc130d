//! Local text extraction, one branch per file type. PDF goes through
//! `pdf-extract`; plain text is read directly. DOCX has no local codec in this
//! stack and is handled by the external parser branch of the chain, so it
//! yields nothing here.

use bytes::Bytes;
use tracing::{debug, warn};

pub fn extract_text(bytes: &Bytes, file_name: Option<&str>) -> Option<String> {
    match extension(file_name) {
        Some("pdf") => match pdf_extract::extract_text_from_mem(bytes) {
            Ok(text) if !text.trim().is_empty() => Some(text),
            Ok(_) => {
                debug!("pdf text extraction returned empty output");
                None
            }
            Err(e) => {
                warn!("pdf text extraction failed: {e}");
                None
            }
        },
        Some("docx") | Some("doc") => {
            debug!("no local extractor for word documents");
            None
        }
        // Everything else is treated as plain text.
        _ => {
            let text = String::from_utf8_lossy(bytes);
            let trimmed = text.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(text.into_owned())
            }
        }
    }
}

fn extension(file_name: Option<&str>) -> Option<&str> {
    file_name?.rsplit_once('.').map(|(_, ext)| ext)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_passthrough() {
        let bytes = Bytes::from_static(b"Jane Doe\njane@x.io");
        let text = extract_text(&bytes, Some("resume.txt")).unwrap();
        assert!(text.contains("Jane Doe"));
    }

    #[test]
    fn test_empty_input_yields_none() {
        let bytes = Bytes::from_static(b"   \n  ");
        assert_eq!(extract_text(&bytes, Some("resume.txt")), None);
    }

    #[test]
    fn test_docx_is_not_handled_locally() {
        let bytes = Bytes::from_static(b"PK\x03\x04fake-zip");
        assert_eq!(extract_text(&bytes, Some("resume.docx")), None);
    }

    #[test]
    fn test_garbage_pdf_swallowed() {
        let bytes = Bytes::from_static(b"not really a pdf");
        assert_eq!(extract_text(&bytes, Some("resume.pdf")), None);
    }
}
