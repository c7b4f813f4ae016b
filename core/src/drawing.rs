//! DrawingML parsing for shape text boxes.
//!
//! Extracts the paragraph texts of every text box in a drawing part
//! (`xl/drawings/drawing*.xml`). Only `<xdr:txBody>` content is visited;
//! element names are matched on their local part because drawing XML uses
//! namespace prefixes throughout.

use crate::sheet_parser::SheetParseError;
use quick_xml::events::Event;
use quick_xml::Reader;

/// Collect one string per paragraph (`<a:p>`) inside each text body,
/// concatenating the paragraph's `<a:t>` runs in document order. Paragraphs
/// without any text run contribute nothing; a paragraph whose runs are all
/// empty contributes an empty string.
pub fn parse_textbox_texts(xml: &[u8]) -> Result<Vec<String>, SheetParseError> {
    let mut reader = Reader::from_reader(xml);
    reader.config_mut().trim_text(false);
    let mut buf = Vec::new();

    let mut texts = Vec::new();
    let mut in_body = false;
    let mut in_paragraph = false;
    let mut current = String::new();
    let mut saw_run = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"txBody" => in_body = true,
                b"p" if in_body => {
                    in_paragraph = true;
                    current.clear();
                    saw_run = false;
                }
                b"t" if in_paragraph => {
                    let text = reader
                        .read_text(e.name())
                        .map_err(|e| SheetParseError::Xml(e.to_string()))?;
                    current.push_str(&text);
                    saw_run = true;
                }
                _ => {}
            },
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"txBody" => in_body = false,
                b"p" if in_paragraph => {
                    if saw_run {
                        texts.push(std::mem::take(&mut current));
                    }
                    in_paragraph = false;
                }
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(SheetParseError::Xml(e.to_string())),
            _ => {}
        }
        buf.clear();
    }

    Ok(texts)
}
