//! Parsing of pasted or exported playlist text into (artist, title) entries.
//!
//! Two layouts are accepted: CSV or TSV exports with a header row naming
//! the artist and title columns, and plain `Artist - Title` lines.

use thiserror::Error;

use crate::normalize::strip_bom;

/// Header substrings that identify an artist column. "arist" is a
/// misspelling found in real exported files.
const ARTIST_HEADERS: &[&str] = &["artist", "arist"];

/// Header substrings that identify a title column.
const TITLE_HEADERS: &[&str] = &["track", "title", "song"];

/// Headers carrying identifiers rather than names ("Track URI", "Artist URI(s)").
const IDENTIFIER_HEADERS: &[&str] = &["uri", "url"];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("No songs found in the input")]
    Empty,

    #[error("Could not find artist/title columns in CSV header: {0}")]
    NoColumns(String),

    #[error("No entries with a title were found")]
    NoEntries,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputFormat {
    Csv,
    PlainText,
}

/// One parsed input line or row, before any search has run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedEntry {
    pub original_text: String,
    pub artist: String,
    pub title: String,
}

impl ParsedEntry {
    fn new(original_text: &str, artist: &str, title: &str) -> Self {
        Self {
            original_text: original_text.to_string(),
            artist: artist.to_string(),
            title: title.to_string(),
        }
    }
}

// ============================================================================
// Format Detection
// ============================================================================

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|n| haystack.contains(n))
}

/// Decide between CSV and plain text by looking at the first non-empty line.
pub fn detect_format(text: &str) -> InputFormat {
    let Some(first) = strip_bom(text).lines().map(str::trim).find(|l| !l.is_empty()) else {
        return InputFormat::PlainText;
    };
    let header = first.to_lowercase();
    let has_title = contains_any(&header, TITLE_HEADERS);
    let has_artist = contains_any(&header, ARTIST_HEADERS);

    if (header.contains(',') && has_title) || (has_artist && has_title) {
        InputFormat::Csv
    } else {
        InputFormat::PlainText
    }
}

// ============================================================================
// CSV
// ============================================================================

/// Field separator for a header row: tab for TSV exports, comma otherwise.
pub fn detect_delimiter(header: &str) -> char {
    if header.contains('\t') && !header.contains(',') {
        '\t'
    } else {
        ','
    }
}

/// Split one line on `delimiter` outside double quotes.
/// Quotes toggle quoting and are dropped; fields are trimmed.
pub fn split_delimited(line: &str, delimiter: char) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;

    for c in line.chars() {
        match c {
            '"' => in_quotes = !in_quotes,
            c if c == delimiter && !in_quotes => {
                fields.push(current.trim().to_string());
                current.clear();
            }
            _ => current.push(c),
        }
    }
    fields.push(current.trim().to_string());
    fields
}

pub fn split_csv_line(line: &str) -> Vec<String> {
    split_delimited(line, ',')
}

/// Index of the first header matching one of `needles`, skipping identifier columns.
fn find_column(headers: &[String], needles: &[&str]) -> Option<usize> {
    headers.iter().position(|h| {
        let h = h.to_lowercase();
        contains_any(&h, needles) && !contains_any(&h, IDENTIFIER_HEADERS)
    })
}

/// Resolve (artist column, title column) from a header row.
/// Falls back to columns 0 and 1 when nothing matches.
fn resolve_columns(headers: &[String]) -> Result<(Option<usize>, usize), ParseError> {
    if let Some(title) = find_column(headers, TITLE_HEADERS) {
        return Ok((find_column(headers, ARTIST_HEADERS), title));
    }
    if headers.len() >= 2 {
        return Ok((Some(0), 1));
    }
    Err(ParseError::NoColumns(headers.join(",")))
}

pub fn parse_csv(text: &str) -> Result<Vec<ParsedEntry>, ParseError> {
    // Lines keep their edge tabs so empty leading TSV fields stay in place
    let mut lines = strip_bom(text).lines().filter(|l| !l.trim().is_empty());
    let header_line = lines.next().ok_or(ParseError::Empty)?;
    let delimiter = detect_delimiter(header_line);
    let headers = split_delimited(header_line, delimiter);
    let (artist_col, title_col) = resolve_columns(&headers)?;

    let entries = lines
        .filter_map(|line| {
            let fields = split_delimited(line, delimiter);
            let title = fields.get(title_col).map(String::as_str).unwrap_or("");
            if title.is_empty() {
                return None;
            }
            // "Artist A;Artist B" keeps only the primary artist
            let artist = artist_col
                .and_then(|i| fields.get(i))
                .and_then(|cell| cell.split(';').next())
                .map(str::trim)
                .unwrap_or("");
            Some(ParsedEntry::new(line.trim(), artist, title))
        })
        .collect();
    Ok(entries)
}

// ============================================================================
// Plain Text
// ============================================================================

/// Parse `Artist - Title` lines. The first ` - ` separates artist from title,
/// so titles may contain further dashes. Lines without it are title-only.
pub fn parse_plain(text: &str) -> Vec<ParsedEntry> {
    strip_bom(text)
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .filter_map(|line| {
            let (artist, title) = match line.split_once(" - ") {
                Some((artist, title)) => (artist.trim(), title.trim()),
                None => ("", line),
            };
            (!title.is_empty()).then(|| ParsedEntry::new(line, artist, title))
        })
        .collect()
}

/// Detect the format and parse. Zero resulting entries is an error.
pub fn parse_input(text: &str) -> Result<Vec<ParsedEntry>, ParseError> {
    if strip_bom(text).trim().is_empty() {
        return Err(ParseError::Empty);
    }
    let entries = match detect_format(text) {
        InputFormat::Csv => parse_csv(text)?,
        InputFormat::PlainText => parse_plain(text),
    };
    if entries.is_empty() {
        return Err(ParseError::NoEntries);
    }
    Ok(entries)
}
