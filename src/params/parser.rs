// src/params/parser.rs — Parameter-definition source parser
//
// Finds `DEFPARAM (...)` records in definition source text (GCC's
// params.def format) and turns each into a ParameterDefinition. A record
// that cannot be understood is logged and skipped; the rest of the text is
// still parsed.

use crate::core::types::ParameterDefinition;
use crate::params::expr::{int_field, name_field, string_field, RecordError};
use crate::util::excerpt;

const MACRO: &str = "DEFPARAM";

/// A record that was found but could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordFailure {
    /// 1-based line of the macro name.
    pub line: usize,
    pub text: String,
    pub error: RecordError,
}

/// Raw record body between the macro's parentheses.
#[derive(Debug, Clone, PartialEq, Eq)]
struct RawRecord<'a> {
    line: usize,
    body: Result<&'a str, RecordError>,
}

#[derive(Debug, Default)]
pub struct DefinitionTextParser;

impl DefinitionTextParser {
    pub fn new() -> Self {
        Self
    }

    /// Parse every record, logging and dropping the malformed ones.
    pub fn parse(&self, text: &str) -> Vec<ParameterDefinition> {
        let (defs, failures) = self.parse_with_failures(text);
        for f in &failures {
            tracing::warn!(
                "Skipping parameter record at line {}: {} ({})",
                f.line,
                f.error,
                excerpt(&f.text, 120)
            );
        }
        defs
    }

    /// Parse every record, returning the failures alongside the successes.
    pub fn parse_with_failures(
        &self,
        text: &str,
    ) -> (Vec<ParameterDefinition>, Vec<RecordFailure>) {
        let mut defs = Vec::new();
        let mut failures = Vec::new();

        for raw in scan_records(text) {
            let parsed = raw.body.clone().and_then(parse_record);
            match parsed {
                Ok(def) => defs.push(def),
                Err(error) => failures.push(RecordFailure {
                    line: raw.line,
                    text: raw.body.unwrap_or_default().trim().to_string(),
                    error,
                }),
            }
        }

        tracing::debug!(
            "Parsed {} parameter definitions ({} skipped)",
            defs.len(),
            failures.len()
        );
        (defs, failures)
    }
}

/// Turn one record body into a definition.
///
/// Accepted shapes:
/// `name, "description", default, min, max` and GCC's
/// `ENUM_ID, "name", "description", default, min, max`.
fn parse_record(body: &str) -> Result<ParameterDefinition, RecordError> {
    let fields = split_fields(body);
    let fields: &[&str] = match fields.len() {
        5 => &fields,
        6 => &fields[1..],
        n => return Err(RecordError::FieldCount(n)),
    };

    let name = name_field(fields[0])?;
    let description = string_field(fields[1])?;
    let default = int_field(fields[2])?;
    let min = int_field(fields[3])?;
    let max = int_field(fields[4])?;

    if default < min {
        return Err(RecordError::DefaultBelowMin { default, min });
    }

    Ok(ParameterDefinition {
        name,
        description,
        default,
        min,
        max,
    })
}

/// Split on commas that sit outside string literals and parentheses.
fn split_fields(body: &str) -> Vec<&str> {
    let bytes = body.as_bytes();
    let mut fields = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'"' | b'\'' => i = skip_quoted(bytes, i),
            b'(' => {
                depth += 1;
                i += 1;
            }
            b')' => {
                depth = depth.saturating_sub(1);
                i += 1;
            }
            b',' if depth == 0 => {
                fields.push(&body[start..i]);
                i += 1;
                start = i;
            }
            _ => i += 1,
        }
    }
    fields.push(&body[start..]);
    fields
}

/// Index just past the quoted literal opening at `open`. An unterminated
/// literal runs to the end of input.
fn skip_quoted(bytes: &[u8], open: usize) -> usize {
    let quote = bytes[open];
    let mut i = open + 1;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b if b == quote => return i + 1,
            _ => i += 1,
        }
    }
    bytes.len()
}

fn is_ident_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

/// Locate every `DEFPARAM (` ... `)` outside comments and string literals.
fn scan_records(text: &str) -> Vec<RawRecord<'_>> {
    let bytes = text.as_bytes();
    let mut records = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'/' if bytes.get(i + 1) == Some(&b'*') => {
                i = text[i + 2..]
                    .find("*/")
                    .map(|p| i + 2 + p + 2)
                    .unwrap_or(bytes.len());
            }
            b'/' if bytes.get(i + 1) == Some(&b'/') => {
                i = text[i..].find('\n').map(|p| i + p).unwrap_or(bytes.len());
            }
            b'"' => i = skip_quoted(bytes, i),
            _ if bytes[i..].starts_with(MACRO.as_bytes())
                && (i == 0 || !is_ident_byte(bytes[i - 1]))
                && !bytes.get(i + MACRO.len()).copied().is_some_and(is_ident_byte) =>
            {
                let line = text[..i].matches('\n').count() + 1;
                let mut j = i + MACRO.len();
                while j < bytes.len() && bytes[j].is_ascii_whitespace() {
                    j += 1;
                }
                if bytes.get(j) != Some(&b'(') {
                    // A mention of the macro name, not a call
                    i = j;
                    continue;
                }
                let (body, end) = record_body(text, j);
                // An unbalanced record swallows the rest of the input; rescan
                // from just inside it so later records are still found.
                i = if body.is_ok() { end } else { j + 1 };
                records.push(RawRecord { line, body });
            }
            _ => i += 1,
        }
    }

    records
}

/// Body of the parenthesised argument list opening at `open`, and the index
/// after its closing parenthesis.
fn record_body(text: &str, open: usize) -> (Result<&str, RecordError>, usize) {
    let bytes = text.as_bytes();
    let mut depth = 0usize;
    let mut i = open;

    while i < bytes.len() {
        match bytes[i] {
            b'"' | b'\'' => {
                i = skip_quoted(bytes, i);
                continue;
            }
            b'(' => depth += 1,
            b')' => {
                depth -= 1;
                if depth == 0 {
                    return (Ok(&text[open + 1..i]), i + 1);
                }
            }
            _ => {}
        }
        i += 1;
    }

    (Err(RecordError::Unterminated), bytes.len())
}
