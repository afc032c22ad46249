//! Text extraction per [`DocumentKind`].
//!
//! | Kind | Method |
//! |------|--------|
//! | `.txt`, `.csv` | UTF-8 (lossy) |
//! | `.pdf` | `pdf-extract`, page by page |
//! | `.docx` | `word/document.xml` `<w:t>` runs, one line per paragraph |
//!
//! Malformed input returns [`DocQaError::Extraction`]. A document with no
//! text is not an error here: the caller decides what an empty collection
//! means.

use std::io::Read;

use quick_xml::events::Event;

use docqa_core::models::DocumentKind;
use docqa_core::DocQaError;

/// Maximum decompressed bytes read from `word/document.xml` (zip-bomb protection).
const MAX_XML_ENTRY_BYTES: u64 = 50 * 1024 * 1024;

pub fn extract_text(kind: DocumentKind, bytes: &[u8]) -> Result<String, DocQaError> {
    match kind {
        DocumentKind::Text | DocumentKind::Csv => Ok(String::from_utf8_lossy(bytes).into_owned()),
        DocumentKind::Pdf => extract_pdf(bytes),
        DocumentKind::Docx => extract_docx(bytes),
    }
}

/// Page texts in page order; pages without extractable text are skipped.
fn extract_pdf(bytes: &[u8]) -> Result<String, DocQaError> {
    let pages = pdf_extract::extract_text_from_mem_by_pages(bytes)
        .map_err(|e| DocQaError::Extraction(format!("PDF: {}", e)))?;
    let texts: Vec<&str> = pages
        .iter()
        .map(|page| page.trim())
        .filter(|page| !page.is_empty())
        .collect();
    Ok(texts.join("\n"))
}

fn extract_docx(bytes: &[u8]) -> Result<String, DocQaError> {
    let ooxml = |e: &dyn std::fmt::Display| DocQaError::Extraction(format!("DOCX: {}", e));

    let mut archive = zip::ZipArchive::new(std::io::Cursor::new(bytes)).map_err(|e| ooxml(&e))?;
    let entry = archive
        .by_name("word/document.xml")
        .map_err(|_| ooxml(&"word/document.xml not found"))?;

    let mut xml = Vec::new();
    entry
        .take(MAX_XML_ENTRY_BYTES)
        .read_to_end(&mut xml)
        .map_err(|e| ooxml(&e))?;
    if xml.len() as u64 >= MAX_XML_ENTRY_BYTES {
        return Err(ooxml(&"word/document.xml exceeds size limit"));
    }

    paragraphs_from_document_xml(&xml).map_err(|e| ooxml(&e))
}

/// Concatenate `<w:t>` runs, ending each `<w:p>` with a newline.
fn paragraphs_from_document_xml(xml: &[u8]) -> Result<String, quick_xml::Error> {
    let mut out = String::new();
    let mut reader = quick_xml::Reader::from_reader(xml);
    let mut buf = Vec::new();
    let mut in_text = false;

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) if e.local_name().as_ref() == b"t" => in_text = true,
            Event::Text(te) if in_text => {
                out.push_str(&te.unescape()?);
            }
            Event::End(e) => match e.local_name().as_ref() {
                b"t" => in_text = false,
                b"p" => out.push('\n'),
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(out.trim_end().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_is_decoded_lossily() {
        let text = extract_text(DocumentKind::Text, b"caf\xc3\xa9 \xff").unwrap();
        assert!(text.starts_with("café "));
    }

    #[test]
    fn csv_is_read_as_text() {
        let text = extract_text(DocumentKind::Csv, b"a,b\n1,2\n").unwrap();
        assert_eq!(text, "a,b\n1,2\n");
    }

    #[test]
    fn invalid_pdf_returns_error() {
        let err = extract_text(DocumentKind::Pdf, b"not a pdf").unwrap_err();
        assert!(matches!(err, DocQaError::Extraction(_)));
    }

    #[test]
    fn invalid_zip_returns_error_for_docx() {
        let err = extract_text(DocumentKind::Docx, b"not a zip").unwrap_err();
        assert!(matches!(err, DocQaError::Extraction(_)));
    }

    #[test]
    fn docx_paragraphs_become_lines() {
        let xml = br#"<?xml version="1.0"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">
  <w:body>
    <w:p><w:r><w:t>The sky </w:t></w:r><w:r><w:t>is blue.</w:t></w:r></w:p>
    <w:p><w:r><w:t>Grass &amp; trees are green.</w:t></w:r></w:p>
  </w:body>
</w:document>"#;
        let text = paragraphs_from_document_xml(xml).unwrap();
        assert_eq!(text, "The sky is blue.\nGrass & trees are green.");
    }
}
