//! Text extraction from Office Open XML packages (DOCX, PPTX).

use std::io::{Read, Seek};

use quick_xml::events::Event;
use quick_xml::Reader;
use zip::ZipArchive;

use super::LoadError;

/// Paragraph texts of `word/document.xml`, in document order.
pub fn extract_docx<R: Read + Seek>(reader: R) -> Result<Vec<String>, LoadError> {
    let mut archive = ZipArchive::new(reader)?;
    let xml = read_entry(&mut archive, "word/document.xml")?;
    paragraphs(&xml)
}

/// Text of each slide, ordered by slide number. Paragraphs are joined with
/// newlines; a slide without text yields an empty string.
pub fn extract_pptx<R: Read + Seek>(reader: R) -> Result<Vec<String>, LoadError> {
    let mut archive = ZipArchive::new(reader)?;

    let mut slides: Vec<(u32, String)> = archive
        .file_names()
        .filter_map(|name| slide_number(name).map(|n| (n, name.to_string())))
        .collect();
    slides.sort_by_key(|(n, _)| *n);

    let mut texts = Vec::with_capacity(slides.len());
    for (_, name) in slides {
        let xml = read_entry(&mut archive, &name)?;
        texts.push(paragraphs(&xml)?.join("\n"));
    }
    Ok(texts)
}

/// `ppt/slides/slide12.xml` -> 12
fn slide_number(name: &str) -> Option<u32> {
    name.strip_prefix("ppt/slides/slide")?
        .strip_suffix(".xml")?
        .parse()
        .ok()
}

fn read_entry<R: Read + Seek>(archive: &mut ZipArchive<R>, name: &str) -> Result<String, LoadError> {
    let mut entry = archive.by_name(name)?;
    let mut xml = String::new();
    entry
        .read_to_string(&mut xml)
        .map_err(|e| LoadError::Xml(format!("{}: {}", name, e)))?;
    Ok(xml)
}

/// Collect non-empty paragraph texts from DrawingML/WordprocessingML.
///
/// Both dialects use `<*:p>` for paragraphs and `<*:t>` for text runs, with
/// `<*:tab/>` and `<*:br/>` inside runs.
fn paragraphs(xml: &str) -> Result<Vec<String>, LoadError> {
    let mut reader = Reader::from_str(xml);
    let mut out = Vec::new();
    let mut current = String::new();
    let mut in_paragraph = false;
    let mut in_text = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"p" => {
                    in_paragraph = true;
                    current.clear();
                }
                b"t" => in_text = true,
                _ => {}
            },
            Ok(Event::Empty(e)) if in_paragraph => match e.local_name().as_ref() {
                b"tab" => current.push('\t'),
                b"br" => current.push('\n'),
                _ => {}
            },
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"p" => {
                    let text = current.trim();
                    if in_paragraph && !text.is_empty() {
                        out.push(text.to_string());
                    }
                    in_paragraph = false;
                }
                b"t" => in_text = false,
                _ => {}
            },
            Ok(Event::Text(e)) if in_text => {
                let text = e.unescape().map_err(|e| LoadError::Xml(e.to_string()))?;
                current.push_str(&text);
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(LoadError::Xml(format!(
                    "at position {}: {}",
                    reader.buffer_position(),
                    e
                )))
            }
            _ => {}
        }
    }

    Ok(out)
}


#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_docx_paragraphs() {
        let bytes = docx(&["第一段。", "Second &amp; last"]);
        let paragraphs = extract_docx(Cursor::new(bytes)).unwrap();
        assert_eq!(paragraphs, vec!["第一段。", "Second & last"]);
    }

    #[test]
    fn test_docx_tabs_and_breaks() {
        let xml = r#"<w:document xmlns:w="w"><w:body><w:p><w:r><w:t>a</w:t><w:tab/><w:t>b</w:t><w:br/><w:t>c</w:t></w:r></w:p></w:body></w:document>"#;
        assert_eq!(paragraphs(xml).unwrap(), vec!["a\tb\nc"]);
    }

    #[test]
    fn test_docx_missing_document_part() {
        let bytes = zip_bytes(&[("word/other.xml", "<x/>".to_string())]);
        assert!(matches!(
            extract_docx(Cursor::new(bytes)),
            Err(LoadError::Archive(_))
        ));
    }

    #[test]
    fn test_not_a_zip() {
        assert!(matches!(
            extract_docx(Cursor::new(b"plain text".to_vec())),
            Err(LoadError::Archive(_))
        ));
    }

    #[test]
    fn test_pptx_slides_in_numeric_order() {
        let bytes = zip_bytes(&[
            ("ppt/slides/slide10.xml", slide_xml(&["Ten"])),
            ("ppt/slides/slide2.xml", slide_xml(&["Two", "second line"])),
            ("ppt/slides/slide1.xml", slide_xml(&["One"])),
            ("ppt/slides/_rels/slide1.xml.rels", "<Relationships/>".to_string()),
            ("ppt/slides/slide3.xml", slide_xml(&[])),
        ]);

        let slides = extract_pptx(Cursor::new(bytes)).unwrap();
        assert_eq!(slides, vec!["One", "Two\nsecond line", "", "Ten"]);
    }

    #[test]
    fn test_slide_number() {
        assert_eq!(slide_number("ppt/slides/slide7.xml"), Some(7));
        assert_eq!(slide_number("ppt/slides/_rels/slide7.xml.rels"), None);
        assert_eq!(slide_number("ppt/slideLayouts/slideLayout1.xml"), None);
    }
}
