//! Text extraction from uploaded files

use std::io::{Cursor, Read};

use crate::error::{Error, Result};
use crate::ingestion::markdown::html_to_markdown;

pub const DOCX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

/// MIME types accepted for upload
pub const SUPPORTED_CONTENT_TYPES: &[&str] = &[
    "text/plain",
    "text/markdown",
    "text/x-markdown",
    "text/html",
    "application/pdf",
    DOCX_CONTENT_TYPE,
];

/// Strip parameters such as `; charset=utf-8` and lowercase
fn essence(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase()
}

pub fn is_supported_content_type(content_type: &str) -> bool {
    SUPPORTED_CONTENT_TYPES.contains(&essence(content_type).as_str())
}

/// Guess a MIME type from a file extension
fn content_type_for_name(file_name: &str) -> Option<&'static str> {
    let extension = file_name.rsplit_once('.')?.1.to_ascii_lowercase();
    match extension.as_str() {
        "txt" | "text" => Some("text/plain"),
        "md" | "markdown" => Some("text/markdown"),
        "html" | "htm" => Some("text/html"),
        "pdf" => Some("application/pdf"),
        "docx" => Some(DOCX_CONTENT_TYPE),
        _ => None,
    }
}

/// Resolve the effective type of an upload
///
/// A missing or generic `application/octet-stream` type is replaced by the
/// one implied by the file name.
pub fn resolve_content_type(content_type: Option<&str>, file_name: Option<&str>) -> Option<String> {
    let declared = content_type
        .map(essence)
        .filter(|ct| !ct.is_empty() && ct != "application/octet-stream");

    declared.or_else(|| file_name.and_then(content_type_for_name).map(str::to_string))
}

/// Extract the text of an uploaded file
pub fn extract_text(
    content_type: Option<&str>,
    file_name: Option<&str>,
    bytes: &[u8],
) -> Result<String> {
    let resolved = resolve_content_type(content_type, file_name);
    let Some(content_type) = resolved.filter(|ct| is_supported_content_type(ct)) else {
        return Err(Error::UnsupportedFileType(
            content_type.unwrap_or("unknown").to_string(),
        ));
    };

    let text = match content_type.as_str() {
        "text/plain" | "text/markdown" | "text/x-markdown" => {
            String::from_utf8_lossy(bytes).into_owned()
        }
        "text/html" => html_to_markdown(&String::from_utf8_lossy(bytes)),
        "application/pdf" => extract_pdf_text(bytes)?,
        _ => extract_docx_text(bytes)?,
    };

    let text = text.trim().to_string();
    if text.is_empty() {
        return Err(Error::NoContent(
            "No text content could be extracted from the file".to_string(),
        ));
    }

    Ok(text)
}

fn extract_pdf_text(bytes: &[u8]) -> Result<String> {
    // pdf-extract panics on some malformed documents
    let result = std::panic::catch_unwind(|| pdf_extract::extract_text_from_mem(bytes));

    match result {
        Ok(Ok(text)) => Ok(text),
        Ok(Err(e)) => Err(Error::Ingestion(format!("Failed to read PDF: {}", e))),
        Err(_) => Err(Error::Ingestion(
            "Failed to read PDF: the document format is not supported".to_string(),
        )),
    }
}

fn extract_docx_text(bytes: &[u8]) -> Result<String> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| Error::Ingestion(format!("Invalid DOCX archive: {}", e)))?;

    let mut document = archive
        .by_name("word/document.xml")
        .map_err(|_| Error::Ingestion("No document.xml found in DOCX".to_string()))?;

    let mut xml = String::new();
    document
        .read_to_string(&mut xml)
        .map_err(|e| Error::Ingestion(format!("Failed to read document.xml: {}", e)))?;

    Ok(docx_xml_to_text(&xml))
}

/// Collect `<w:t>` runs, one line per `<w:p>` paragraph
fn docx_xml_to_text(xml: &str) -> String {
    let mut text = String::new();
    let mut in_run_text = false;
    let mut rest = xml;

    while let Some(start) = rest.find('<') {
        if in_run_text {
            text.push_str(&rest[..start]);
        }
        let Some(end) = rest[start..].find('>') else {
            break;
        };
        let tag = &rest[start + 1..start + end];
        rest = &rest[start + end + 1..];

        let self_closing = tag.ends_with('/');
        let name = tag
            .trim_end_matches('/')
            .split_whitespace()
            .next()
            .unwrap_or("");

        match name {
            "w:t" if !self_closing => in_run_text = true,
            "/w:t" => in_run_text = false,
            "w:tab" => text.push('\t'),
            "w:br" => text.push('\n'),
            "/w:p" => text.push('\n'),
            _ => {}
        }
    }

    text.replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    use pretty_assertions::assert_eq;

    fn docx_bytes(document_xml: &str) -> Vec<u8> {
        let mut buffer = Cursor::new(Vec::new());
        {
            let mut zip = zip::ZipWriter::new(&mut buffer);
            zip.start_file("word/document.xml", zip::write::FileOptions::default())
                .unwrap();
            zip.write_all(document_xml.as_bytes()).unwrap();
            zip.finish().unwrap();
        }
        buffer.into_inner()
    }

    #[test]
    fn test_supported_types() {
        assert!(is_supported_content_type("text/plain; charset=utf-8"));
        assert!(is_supported_content_type("APPLICATION/PDF"));
        assert!(is_supported_content_type(DOCX_CONTENT_TYPE));
        assert!(!is_supported_content_type("image/png"));
    }

    #[test]
    fn test_plain_and_markdown() {
        let text =
            extract_text(Some("text/markdown"), Some("notes.md"), b"# Notes\n\nBody").unwrap();
        assert_eq!(text, "# Notes\n\nBody");
    }

    #[test]
    fn test_html_is_converted() {
        let text = extract_text(
            Some("text/html"),
            None,
            b"<html><body><h2>Intro</h2><p>Hello <b>world</b></p></body></html>",
        )
        .unwrap();
        assert_eq!(text, "## Intro\n\nHello **world**");
    }

    #[test]
    fn test_octet_stream_uses_extension() {
        let text = extract_text(Some("application/octet-stream"), Some("a.TXT"), b"plain").unwrap();
        assert_eq!(text, "plain");
    }

    #[test]
    fn test_unsupported_type() {
        let err = extract_text(Some("image/png"), Some("x.png"), b"\x89PNG").unwrap_err();
        assert!(matches!(err, Error::UnsupportedFileType(ref t) if t == "image/png"));
    }

    #[test]
    fn test_empty_extraction() {
        let err = extract_text(Some("text/plain"), None, b"  \n ").unwrap_err();
        assert!(matches!(err, Error::NoContent(_)));
    }

    #[test]
    fn test_docx_paragraphs() {
        let xml = r#"<?xml version="1.0"?><w:document><w:body>
            <w:p><w:pPr/><w:r><w:t>Hello</w:t></w:r><w:r><w:t xml:space="preserve"> &amp; welcome</w:t></w:r></w:p>
            <w:p><w:r><w:t>Second</w:t><w:tab/><w:t>line</w:t></w:r></w:p>
            <w:tbl><w:tr><w:tc><w:p><w:r><w:t>Cell</w:t></w:r></w:p></w:tc></w:tr></w:tbl>
            </w:body></w:document>"#;

        let text = extract_text(Some(DOCX_CONTENT_TYPE), None, &docx_bytes(xml)).unwrap();
        assert_eq!(text, "Hello & welcome\nSecond\tline\nCell");
    }

    #[test]
    fn test_corrupt_docx() {
        let err = extract_text(Some(DOCX_CONTENT_TYPE), None, b"not a zip").unwrap_err();
        assert!(matches!(err, Error::Ingestion(_)));
    }

    #[test]
    fn test_corrupt_pdf() {
        let err = extract_text(Some("application/pdf"), None, b"%PDF-garbage").unwrap_err();
        assert!(matches!(err, Error::Ingestion(_)));
    }
}
