// src/extract/help.rs — Help-text scanners
//
// Compiler help lists one option per line: two spaces of indent, the option
// token, at least one space, then the description. Only tokens made purely
// of `[a-z0-9-]` after their prefix count; anything taking an argument
// (`-falign-functions=`, `-march=<cpu>`) is left out.

use std::collections::HashSet;

use crate::core::types::{CandidateFlag, FlagCategory};

const INDENT: &str = "  ";

fn is_token_char(c: char) -> bool {
    c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-'
}

/// Token at the start of an indented help line, if it is followed by a space
/// and every character after `prefix` is a token character.
fn indented_token<'a>(line: &'a str, prefix: &str) -> Option<&'a str> {
    let rest = line.strip_prefix(INDENT)?;
    let tail = rest.strip_prefix(prefix)?;
    let len = tail.find(|c: char| !is_token_char(c)).unwrap_or(tail.len());
    if len == 0 || !tail[len..].starts_with(' ') {
        return None;
    }
    Some(&rest[..prefix.len() + len])
}

/// Distinct flags of `category` listed in `help`, in first-seen order.
pub fn scan_flags(help: &str, category: FlagCategory) -> Vec<CandidateFlag> {
    let prefix = category.prefix();
    let mut seen = HashSet::new();
    help.lines()
        .filter_map(|line| indented_token(line, prefix))
        .filter(|flag| seen.insert(*flag))
        .map(CandidateFlag::new)
        .collect()
}

/// Distinct parameter names listed by the compiler's parameter help.
pub fn scan_param_names(help: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    help.lines()
        .filter_map(|line| indented_token(line, ""))
        .filter(|name| seen.insert(*name))
        .map(str::to_string)
        .collect()
}
