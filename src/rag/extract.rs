//! Plain-text extraction for uploaded documents (PDF, DOCX, TXT, XLSX).
//!
//! Dispatch is by the suffix of the lowercase filename. Whether the resulting
//! text is usable (non-blank) is decided by the caller.

use crate::types::{AppError, Result};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::collections::{BTreeMap, HashMap};
use std::io::{Cursor, Read};
use std::path::Path;

/// Maximum decompressed bytes read from a single ZIP entry (zip-bomb guard).
const MAX_XML_ENTRY_BYTES: u64 = 50 * 1024 * 1024;
/// Maximum sheets read from one workbook.
const XLSX_MAX_SHEETS: usize = 100;
/// Maximum non-empty cells read from one sheet; later cells are dropped.
const XLSX_MAX_CELLS_PER_SHEET: usize = 100_000;
/// Last column of a worksheet (`XFD`).
const XLSX_MAX_COLUMNS: usize = 16_384;
/// Last row of a worksheet.
const XLSX_MAX_ROWS: usize = 1_048_576;

type Archive<'a> = zip::ZipArchive<Cursor<&'a [u8]>>;

/// Supported document formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Pdf,
    Docx,
    Txt,
    Xlsx,
}

impl DocumentKind {
    /// Pick the format from a filename or file-type string (case-insensitive).
    pub fn from_file_type(file_type: &str) -> Result<Self> {
        let lower = file_type.to_lowercase();
        if lower.ends_with(".pdf") {
            Ok(DocumentKind::Pdf)
        } else if lower.ends_with(".docx") {
            Ok(DocumentKind::Docx)
        } else if lower.ends_with(".txt") {
            Ok(DocumentKind::Txt)
        } else if lower.ends_with(".xlsx") {
            Ok(DocumentKind::Xlsx)
        } else {
            let shown = Path::new(&lower)
                .extension()
                .map(|ext| format!(".{}", ext.to_string_lossy()))
                .unwrap_or(lower);
            Err(AppError::UnsupportedFileType(shown))
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            DocumentKind::Pdf => ".pdf",
            DocumentKind::Docx => ".docx",
            DocumentKind::Txt => ".txt",
            DocumentKind::Xlsx => ".xlsx",
        }
    }
}

/// Extract the text of the file at `path`, interpreting it according to `file_type`.
pub fn extract_text(path: &Path, file_type: &str) -> Result<String> {
    let kind = DocumentKind::from_file_type(file_type)?;
    let bytes = std::fs::read(path)
        .map_err(|e| AppError::Extraction(format!("failed to read {}: {}", path.display(), e)))?;
    extract_bytes(&bytes, kind)
}

/// Extract text from in-memory document bytes.
pub fn extract_bytes(bytes: &[u8], kind: DocumentKind) -> Result<String> {
    match kind {
        DocumentKind::Pdf => extract_pdf(bytes),
        DocumentKind::Docx => extract_docx(bytes),
        DocumentKind::Txt => String::from_utf8(bytes.to_vec())
            .map_err(|e| AppError::Extraction(format!("text file is not valid UTF-8: {}", e))),
        DocumentKind::Xlsx => extract_xlsx(bytes),
    }
}

fn extract_pdf(bytes: &[u8]) -> Result<String> {
    let pages = pdf_extract::extract_text_from_mem_by_pages(bytes)
        .map_err(|e| AppError::Extraction(format!("PDF extraction failed: {}", e)))?;
    Ok(pages.concat())
}

// ============= OOXML helpers =============

fn ooxml_error(e: impl std::fmt::Display) -> AppError {
    AppError::Extraction(format!("OOXML extraction failed: {}", e))
}

fn open_archive(bytes: &[u8]) -> Result<Archive<'_>> {
    zip::ZipArchive::new(Cursor::new(bytes)).map_err(ooxml_error)
}

/// Read a ZIP entry, `None` when the archive has no such entry.
fn read_entry(archive: &mut Archive<'_>, name: &str) -> Result<Option<Vec<u8>>> {
    let entry = match archive.by_name(name) {
        Ok(entry) => entry,
        Err(zip::result::ZipError::FileNotFound) => return Ok(None),
        Err(e) => return Err(ooxml_error(e)),
    };
    let mut out = Vec::new();
    entry
        .take(MAX_XML_ENTRY_BYTES)
        .read_to_end(&mut out)
        .map_err(ooxml_error)?;
    if out.len() as u64 >= MAX_XML_ENTRY_BYTES {
        return Err(ooxml_error(format!("ZIP entry {} exceeds size limit", name)));
    }
    Ok(Some(out))
}

fn require_entry(archive: &mut Archive<'_>, name: &str) -> Result<Vec<u8>> {
    read_entry(archive, name)?.ok_or_else(|| ooxml_error(format!("{} not found", name)))
}

fn attribute(e: &BytesStart<'_>, local: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|a| a.key.local_name().as_ref() == local)
        .and_then(|a| a.unescape_value().ok().map(|v| v.into_owned()))
}

// ============= DOCX =============

fn extract_docx(bytes: &[u8]) -> Result<String> {
    let mut archive = open_archive(bytes)?;
    let xml = require_entry(&mut archive, "word/document.xml")?;
    docx_paragraph_text(&xml)
}

/// Paragraph texts, each followed by a newline.
fn docx_paragraph_text(xml: &[u8]) -> Result<String> {
    let mut reader = Reader::from_reader(xml);
    let mut buf = Vec::new();
    let mut out = String::new();
    let mut in_run = false;
    let mut in_text = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"r" => in_run = true,
                b"t" if in_run => in_text = true,
                _ => {}
            },
            Ok(Event::Empty(e)) => match e.local_name().as_ref() {
                b"tab" if in_run => out.push('\t'),
                b"br" | b"cr" if in_run => out.push('\n'),
                b"p" => out.push('\n'),
                _ => {}
            },
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"r" => in_run = false,
                b"t" => in_text = false,
                b"p" => out.push('\n'),
                _ => {}
            },
            Ok(Event::Text(t)) if in_text => out.push_str(&t.unescape().map_err(ooxml_error)?),
            Ok(Event::CData(t)) if in_text => out.push_str(&String::from_utf8_lossy(&t)),
            Ok(Event::Eof) => break,
            Err(e) => return Err(ooxml_error(e)),
            _ => {}
        }
        buf.clear();
    }

    Ok(out)
}

// ============= XLSX =============

/// Row number → (column number → rendered value). Both 1-based.
type SheetCells = BTreeMap<usize, BTreeMap<usize, String>>;

fn extract_xlsx(bytes: &[u8]) -> Result<String> {
    match xlsx_workbook_rows(bytes) {
        Ok(text) => Ok(text),
        Err(primary) => {
            tracing::warn!(error = %primary, "workbook read failed, falling back to first-sheet table");
            xlsx_first_sheet_table(bytes).map_err(|fallback| {
                AppError::Extraction(format!(
                    "Unable to read Excel file (workbook: {}; table: {})",
                    primary, fallback
                ))
            })
        }
    }
}

/// Every sheet in workbook order, every row from 1 to the last row, every
/// column from A to the last column; absent cells render as "".
///
/// A sheet whose grid would exceed [`XLSX_MAX_CELLS_PER_SHEET`] is rendered
/// sparsely instead: only its non-empty rows, only their non-empty cells.
fn xlsx_workbook_rows(bytes: &[u8]) -> Result<String> {
    let mut archive = open_archive(bytes)?;
    let shared = shared_strings(&mut archive)?;
    let sheet_paths = workbook_sheet_paths(&mut archive)?;
    if sheet_paths.len() > XLSX_MAX_SHEETS {
        tracing::warn!(
            sheets = sheet_paths.len(),
            limit = XLSX_MAX_SHEETS,
            "workbook has too many sheets, extra sheets skipped"
        );
    }

    let mut out = String::new();
    for path in sheet_paths.into_iter().take(XLSX_MAX_SHEETS) {
        let xml = require_entry(&mut archive, &path)?;
        let cells = parse_sheet(&xml, &shared)?;
        let last_row = cells.keys().next_back().copied().unwrap_or(0);
        let last_col = last_column(&cells);

        let dense = last_row
            .checked_mul(last_col)
            .is_some_and(|grid| grid <= XLSX_MAX_CELLS_PER_SHEET);
        if dense {
            for row in 1..=last_row {
                out.push_str(&render_row(cells.get(&row), last_col));
                out.push('\n');
            }
        } else {
            tracing::warn!(
                sheet = %path,
                last_row,
                last_col,
                "sparse sheet rendered without padding"
            );
            for values in cells.values().filter(|v| !v.is_empty()) {
                out.push_str(&values.values().map(String::as_str).collect::<Vec<_>>().join(" "));
                out.push('\n');
            }
        }
    }
    Ok(out)
}

/// First worksheet read as a table: the first row is the header, every
/// following row contributes its column values joined by spaces.
fn xlsx_first_sheet_table(bytes: &[u8]) -> Result<String> {
    let mut archive = open_archive(bytes)?;
    let shared = shared_strings(&mut archive)?;

    let mut names: Vec<String> = archive
        .file_names()
        .filter(|n| n.starts_with("xl/worksheets/sheet") && n.ends_with(".xml"))
        .map(|s| s.to_string())
        .collect();
    names.sort_by_key(|name| {
        name.trim_start_matches("xl/worksheets/sheet")
            .trim_end_matches(".xml")
            .parse::<u32>()
            .unwrap_or(u32::MAX)
    });
    let first = names
        .into_iter()
        .next()
        .ok_or_else(|| ooxml_error("no worksheets found"))?;

    let xml = require_entry(&mut archive, &first)?;
    let cells = parse_sheet(&xml, &shared)?;
    let last_col = last_column(&cells);
    let padded = cells
        .len()
        .checked_mul(last_col)
        .is_some_and(|grid| grid <= XLSX_MAX_CELLS_PER_SHEET);

    let rows: Vec<String> = cells
        .values()
        .skip(1)
        .map(|values| {
            if padded {
                render_row(Some(values), last_col)
            } else {
                values.values().map(String::as_str).collect::<Vec<_>>().join(" ")
            }
        })
        .collect();
    Ok(rows.join("\n"))
}

fn last_column(cells: &SheetCells) -> usize {
    cells
        .values()
        .filter_map(|row| row.keys().next_back().copied())
        .max()
        .unwrap_or(0)
}

fn render_row(values: Option<&BTreeMap<usize, String>>, last_col: usize) -> String {
    (1..=last_col)
        .map(|col| {
            values
                .and_then(|v| v.get(&col))
                .map(String::as_str)
                .unwrap_or("")
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn shared_strings(archive: &mut Archive<'_>) -> Result<Vec<String>> {
    let Some(xml) = read_entry(archive, "xl/sharedStrings.xml")? else {
        return Ok(Vec::new());
    };

    let mut reader = Reader::from_reader(xml.as_slice());
    let mut buf = Vec::new();
    let mut strings = Vec::new();
    let mut current = String::new();
    let mut in_si = false;
    let mut in_phonetic = false;
    let mut in_text = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"si" => {
                    in_si = true;
                    current.clear();
                }
                b"rPh" => in_phonetic = true,
                b"t" if in_si && !in_phonetic => in_text = true,
                _ => {}
            },
            Ok(Event::Empty(e)) if e.local_name().as_ref() == b"si" => strings.push(String::new()),
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"si" => {
                    in_si = false;
                    strings.push(std::mem::take(&mut current));
                }
                b"rPh" => in_phonetic = false,
                b"t" => in_text = false,
                _ => {}
            },
            Ok(Event::Text(t)) if in_text => current.push_str(&t.unescape().map_err(ooxml_error)?),
            Ok(Event::Eof) => break,
            Err(e) => return Err(ooxml_error(e)),
            _ => {}
        }
        buf.clear();
    }

    Ok(strings)
}

/// Worksheet part paths in workbook order.
fn workbook_sheet_paths(archive: &mut Archive<'_>) -> Result<Vec<String>> {
    let workbook = require_entry(archive, "xl/workbook.xml")?;
    let rels = require_entry(archive, "xl/_rels/workbook.xml.rels")?;

    let mut targets = HashMap::new();
    let mut reader = Reader::from_reader(rels.as_slice());
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) | Ok(Event::Empty(e))
                if e.local_name().as_ref() == b"Relationship" =>
            {
                if let (Some(id), Some(target)) = (attribute(&e, b"Id"), attribute(&e, b"Target")) {
                    targets.insert(id, target);
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(ooxml_error(e)),
            _ => {}
        }
        buf.clear();
    }

    let mut paths = Vec::new();
    let mut reader = Reader::from_reader(workbook.as_slice());
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) if e.local_name().as_ref() == b"sheet" => {
                let id = attribute(&e, b"id")
                    .ok_or_else(|| ooxml_error("sheet without relationship id"))?;
                let target = targets
                    .get(&id)
                    .ok_or_else(|| ooxml_error(format!("relationship {} not found", id)))?;
                paths.push(match target.strip_prefix('/') {
                    Some(absolute) => absolute.to_string(),
                    None => format!("xl/{}", target),
                });
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(ooxml_error(e)),
            _ => {}
        }
        buf.clear();
    }

    if paths.is_empty() {
        return Err(ooxml_error("workbook lists no sheets"));
    }
    Ok(paths)
}

/// 1-based column number from a cell reference such as `AB12`.
///
/// `Ok(None)` when the reference has no column letters; an error when the
/// column lies beyond `XFD`.
fn column_number(reference: &str) -> Result<Option<usize>> {
    let mut column = 0usize;
    let mut seen = false;
    for b in reference.bytes().take_while(|b| b.is_ascii_alphabetic()) {
        seen = true;
        column = column
            .checked_mul(26)
            .and_then(|c| c.checked_add((b.to_ascii_uppercase() - b'A' + 1) as usize))
            .filter(|c| *c <= XLSX_MAX_COLUMNS)
            .ok_or_else(|| ooxml_error(format!("cell reference {} out of range", reference)))?;
    }
    Ok(seen.then_some(column))
}

fn row_number(attr: Option<String>, previous: usize) -> Result<usize> {
    let row = match attr {
        Some(r) => r
            .trim()
            .parse::<usize>()
            .map_err(|_| ooxml_error(format!("invalid row number {}", r)))?,
        None => previous + 1,
    };
    if row == 0 || row > XLSX_MAX_ROWS {
        return Err(ooxml_error(format!("row number {} out of range", row)));
    }
    Ok(row)
}

fn cell_column(attr: Option<String>, previous: usize) -> Result<usize> {
    let column = match attr {
        Some(r) => column_number(&r)?.unwrap_or(previous + 1),
        None => previous + 1,
    };
    if column > XLSX_MAX_COLUMNS {
        return Err(ooxml_error(format!("column number {} out of range", column)));
    }
    Ok(column)
}

fn parse_sheet(xml: &[u8], shared: &[String]) -> Result<SheetCells> {
    let mut reader = Reader::from_reader(xml);
    let mut buf = Vec::new();
    let mut cells = SheetCells::new();

    let mut row = 0usize;
    let mut col = 0usize;
    let mut cell_type = String::new();
    let mut raw: Option<String> = None;
    let mut inline = String::new();
    let mut in_value = false;
    let mut in_inline_text = false;
    let mut stored = 0usize;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"row" => {
                    row = row_number(attribute(&e, b"r"), row)?;
                    col = 0;
                    cells.entry(row).or_default();
                }
                b"c" => {
                    col = cell_column(attribute(&e, b"r"), col)?;
                    cell_type = attribute(&e, b"t").unwrap_or_default();
                    raw = None;
                    inline.clear();
                }
                b"v" => in_value = true,
                b"t" => in_inline_text = true,
                _ => {}
            },
            Ok(Event::Empty(e)) => match e.local_name().as_ref() {
                b"row" => {
                    row = row_number(attribute(&e, b"r"), row)?;
                    cells.entry(row).or_default();
                }
                b"c" => {
                    col = cell_column(attribute(&e, b"r"), col)?;
                }
                _ => {}
            },
            Ok(Event::Text(t)) if in_value || in_inline_text => {
                let text = t.unescape().map_err(ooxml_error)?;
                if in_value {
                    raw.get_or_insert_with(String::new).push_str(&text);
                } else {
                    inline.push_str(&text);
                }
            }
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"v" => in_value = false,
                b"t" => in_inline_text = false,
                b"c" => {
                    if let Some(value) = cell_value(&cell_type, raw.take(), &inline, shared) {
                        cells.entry(row).or_default().insert(col, value);
                        stored += 1;
                        if stored >= XLSX_MAX_CELLS_PER_SHEET {
                            tracing::warn!(
                                limit = XLSX_MAX_CELLS_PER_SHEET,
                                "sheet cell limit reached, remaining cells skipped"
                            );
                            break;
                        }
                    }
                }
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(ooxml_error(e)),
            _ => {}
        }
        buf.clear();
    }

    Ok(cells)
}

fn cell_value(cell_type: &str, raw: Option<String>, inline: &str, shared: &[String]) -> Option<String> {
    match cell_type {
        "s" => raw
            .and_then(|r| r.trim().parse::<usize>().ok())
            .and_then(|i| shared.get(i).cloned()),
        "inlineStr" => Some(inline.to_string()),
        "b" => raw.map(|r| if r.trim() == "1" { "True" } else { "False" }.to_string()),
        _ => raw,
    }
}
