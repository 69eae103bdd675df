//! DOCX parser over the raw `word/document.xml` part.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use super::{parse_error, DocumentParser, SectionTracker};
use crate::error::Result;
use crate::types::{BlockType, ParsedDocument};

#[derive(Debug, Default, Clone, Copy)]
pub struct DocxParser;

impl DocumentParser for DocxParser {
    fn parse(&self, path: &Path, doc_id: &str) -> Result<ParsedDocument> {
        let file = File::open(path)?;
        let mut zip = zip::ZipArchive::new(file).map_err(|e| parse_error(path, format!("not a valid .docx: {e}")))?;

        let body = read_part(&mut zip, "word/document.xml")
            .ok_or_else(|| parse_error(path, "missing word/document.xml"))?;
        let mut doc = parse_document_xml(&body, doc_id, &path.display().to_string())
            .map_err(|e| parse_error(path, e))?;

        if let Some(core) = read_part(&mut zip, "docProps/core.xml") {
            let (title, author) = parse_core_properties(&core);
            doc.title = title;
            doc.author = author;
        }
        Ok(doc)
    }
}

fn read_part(zip: &mut zip::ZipArchive<File>, name: &str) -> Option<String> {
    let mut part = zip.by_name(name).ok()?;
    let mut out = String::new();
    part.read_to_string(&mut out).ok()?;
    Some(out)
}

fn attr_val(e: &BytesStart<'_>, key_local: &[u8]) -> Option<String> {
    e.attributes()
        .with_checks(false)
        .flatten()
        .find(|a| a.key.local_name().as_ref() == key_local)
        .map(|a| String::from_utf8_lossy(&a.value).into_owned())
}

#[derive(Default)]
struct Paragraph {
    text: String,
    style: String,
    numbered: bool,
}

impl Paragraph {
    fn kind(&self) -> (BlockType, Option<u32>) {
        let style = self.style.to_ascii_lowercase();
        if let Some(rest) = style.strip_prefix("heading") {
            let digits: String = rest.chars().filter(|c| c.is_ascii_digit()).collect();
            return (BlockType::Heading, Some(digits.parse().unwrap_or(1)));
        }
        if style.starts_with("list") || self.numbered {
            return (BlockType::ListItem, None);
        }
        (BlockType::Paragraph, None)
    }
}

#[derive(Default)]
struct Table {
    depth: usize,
    rows: Vec<Vec<String>>,
    row: Vec<String>,
    cell: Vec<String>,
}

impl Table {
    fn render(&self) -> Option<String> {
        if self.rows.len() < 2 {
            return None;
        }
        Some(self.rows.iter().map(|r| r.join("\t")).collect::<Vec<_>>().join("\n"))
    }
}

/// Walk the body in reading order. Tables are emitted where they occur,
/// under the section lineage current at that point.
pub(crate) fn parse_document_xml(xml: &str, doc_id: &str, filename: &str) -> std::result::Result<ParsedDocument, String> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(false);
    let mut buf = Vec::new();

    let mut doc = ParsedDocument::new(doc_id, filename);
    let mut tracker = SectionTracker::default();
    let mut para: Option<Paragraph> = None;
    let mut table = Table::default();
    let mut in_t = false;

    loop {
        buf.clear();
        let event = reader.read_event_into(&mut buf).map_err(|e| e.to_string())?;
        // self-closing elements get no End event and must not open state
        let opens = matches!(event, Event::Start(_));
        match event {
            Event::Start(e) | Event::Empty(e) => match e.local_name().as_ref() {
                b"p" if opens => para = Some(Paragraph::default()),
                b"pStyle" => {
                    if let (Some(p), Some(val)) = (para.as_mut(), attr_val(&e, b"val")) {
                        p.style = val;
                    }
                }
                b"numPr" => {
                    if let Some(p) = para.as_mut() {
                        p.numbered = true;
                    }
                }
                b"t" if opens => in_t = true,
                b"tab" => {
                    if let Some(p) = para.as_mut() {
                        p.text.push('\t');
                    }
                }
                b"br" => {
                    if let Some(p) = para.as_mut() {
                        p.text.push('\n');
                    }
                }
                b"tbl" if opens => {
                    table.depth += 1;
                    if table.depth == 1 {
                        table.rows.clear();
                    }
                }
                b"tr" if table.depth == 1 => table.row.clear(),
                b"tc" if table.depth == 1 => table.cell.clear(),
                _ => {}
            },
            Event::Text(t) if in_t => {
                if let Some(p) = para.as_mut() {
                    p.text.push_str(&t.unescape().map_err(|e| e.to_string())?);
                }
            }
            Event::End(e) => match e.local_name().as_ref() {
                b"t" => in_t = false,
                b"p" => {
                    let Some(p) = para.take() else { continue };
                    let text = p.text.trim();
                    if table.depth > 0 {
                        table.cell.push(text.to_string());
                    } else if !text.is_empty() {
                        let (kind, level) = p.kind();
                        if let Some(level) = level {
                            tracker.enter_heading(text, level);
                        }
                        let mut block = tracker.block(text, kind, 0);
                        if !p.style.is_empty() {
                            block = block.with_meta("style", p.style.to_ascii_lowercase());
                        }
                        doc.blocks.push(block);
                    }
                }
                b"tc" if table.depth == 1 => {
                    let cell = table.cell.join("\n").trim().to_string();
                    table.row.push(cell);
                }
                b"tr" if table.depth == 1 => {
                    if table.row.iter().any(|c| !c.is_empty()) {
                        let row = std::mem::take(&mut table.row);
                        table.rows.push(row);
                    }
                }
                b"tbl" => {
                    table.depth = table.depth.saturating_sub(1);
                    if table.depth == 0 {
                        if let Some(rendered) = table.render() {
                            let num_cols = table.rows[0].len();
                            doc.blocks.push(
                                tracker
                                    .block(rendered, BlockType::Table, 0)
                                    .with_meta("num_rows", (table.rows.len() - 1).to_string())
                                    .with_meta("num_cols", num_cols.to_string()),
                            );
                        }
                    }
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(doc)
}

/// `(dc:title, dc:creator)` from `docProps/core.xml`; missing fields are empty.
pub(crate) fn parse_core_properties(xml: &str) -> (String, String) {
    let mut reader = Reader::from_str(xml);
    let mut buf = Vec::new();
    let (mut title, mut author) = (String::new(), String::new());
    let mut field: Option<bool> = None;

    loop {
        buf.clear();
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                field = match e.local_name().as_ref() {
                    b"title" => Some(true),
                    b"creator" => Some(false),
                    _ => None,
                };
            }
            Ok(Event::Text(t)) => {
                let target = match field {
                    Some(true) => &mut title,
                    Some(false) => &mut author,
                    None => continue,
                };
                if let Ok(s) = t.unescape() {
                    target.push_str(s.trim());
                }
            }
            Ok(Event::End(_)) => field = None,
            Ok(Event::Eof) | Err(_) => break,
            _ => {}
        }
    }
    (title, author)
}
