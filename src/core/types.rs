// src/core/types.rs — Core domain types

use serde::Serialize;
use std::fmt;
use std::time::Duration;

/// Upper probing bound and replacement for "unbounded" symbolic maxima.
///
/// One below the 32-bit signed maximum so generated flag values never
/// overflow inside the compiler's own option parsing.
pub const SENTINEL_CEILING: i64 = 2_147_483_646;

/// Syntactic category of a flag, decided by its leading characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum FlagCategory {
    /// `-f...` switches; these have a `-fno-...` inverse.
    Optimizer,
    /// `-m...` switches.
    Target,
    /// Anything else, e.g. `--param name=value`.
    Param,
}

impl FlagCategory {
    pub fn of(flag: &str) -> Self {
        if flag.starts_with("-f") {
            Self::Optimizer
        } else if flag.starts_with("-m") {
            Self::Target
        } else {
            Self::Param
        }
    }

    /// Help-text prefix that introduces flags of this category.
    pub fn prefix(&self) -> &'static str {
        match self {
            Self::Optimizer => "-f",
            Self::Target => "-m",
            Self::Param => "--param",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Optimizer => "optimizer",
            Self::Target => "target",
            Self::Param => "param",
        }
    }
}

impl fmt::Display for FlagCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A flag found by scanning help text, not yet validated.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CandidateFlag {
    pub text: String,
    pub category: FlagCategory,
}

impl CandidateFlag {
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        let category = FlagCategory::of(&text);
        Self { text, category }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CompilerVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl CompilerVersion {
    /// Find the first `N.N.N` triple in `text` (typically `--version` output).
    pub fn scan(text: &str) -> Option<Self> {
        let bytes = text.as_bytes();
        let mut i = 0;
        while i < bytes.len() {
            if bytes[i].is_ascii_digit() && (i == 0 || !bytes[i - 1].is_ascii_digit()) {
                if let Some(v) = Self::parse_at(&text[i..]) {
                    return Some(v);
                }
            }
            i += 1;
        }
        None
    }

    fn parse_at(s: &str) -> Option<Self> {
        let mut parts = [0u32; 3];
        let mut rest = s;
        for (idx, slot) in parts.iter_mut().enumerate() {
            let digits = rest.bytes().take_while(|b| b.is_ascii_digit()).count();
            if digits == 0 {
                return None;
            }
            *slot = rest[..digits].parse().ok()?;
            rest = &rest[digits..];
            if idx < 2 {
                rest = rest.strip_prefix('.')?;
            }
        }
        Some(Self {
            major: parts[0],
            minor: parts[1],
            patch: parts[2],
        })
    }
}

impl fmt::Display for CompilerVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// A resolved compiler: identity, version and captured help text.
/// Read-only for the rest of the run.
#[derive(Debug, Clone)]
pub struct Compiler {
    pub path: String,
    pub version: Option<CompilerVersion>,
    pub target_help: String,
    pub optimizer_help: String,
    pub params_help: String,
}

/// One parameter record from definition source text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterDefinition {
    pub name: String,
    pub description: String,
    pub default: i64,
    pub min: i64,
    pub max: i64,
}

impl ParameterDefinition {
    /// A declared max that does not exceed min is a placeholder ("no real
    /// maximum"); the true bound has to be probed.
    pub fn needs_range_resolution(&self) -> bool {
        self.min >= self.max
    }
}

/// Outcome of one bounded trial execution.
#[derive(Debug, Clone)]
pub struct ProbeResult {
    pub exit_code: Option<i32>,
    pub signal: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    /// `Duration::MAX` when the trial was killed at its deadline.
    pub elapsed: Duration,
    pub timed_out: bool,
}

impl ProbeResult {
    pub fn success(&self) -> bool {
        !self.timed_out && self.exit_code == Some(0)
    }

    pub fn elapsed_secs(&self) -> f64 {
        if self.timed_out {
            f64::INFINITY
        } else {
            self.elapsed.as_secs_f64()
        }
    }
}

/// Result of a range search over one parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedRange {
    pub name: String,
    pub min: i64,
    pub max: i64,
    /// False when no value in the search interval validated.
    pub resolved: bool,
}

/// A flag proven usable, in the shape the autotuner configuration expects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type")]
pub enum ValidatedFlag {
    #[serde(rename = "on-off")]
    OnOff {
        name: String,
        #[serde(rename = "on-prefix")]
        on_prefix: String,
        #[serde(rename = "off-prefix")]
        off_prefix: String,
    },
    #[serde(rename = "range")]
    Range {
        name: String,
        prefix: String,
        separator: String,
        min: i64,
        max: i64,
    },
}

impl ValidatedFlag {
    /// Split a switch like `-ffoo-bar` into name `foo-bar`, on-prefix `-f`
    /// and off-prefix `-fno-`.
    pub fn on_off(flag: &str) -> Self {
        let split = flag
            .char_indices()
            .nth(2)
            .map(|(i, _)| i)
            .unwrap_or(flag.len());
        let (prefix, name) = flag.split_at(split);
        ValidatedFlag::OnOff {
            name: name.to_string(),
            on_prefix: prefix.to_string(),
            off_prefix: format!("{prefix}no-"),
        }
    }

    /// Range entry; `None` unless `max > min`.
    pub fn range(range: &ResolvedRange, prefix: &str, separator: &str) -> Option<Self> {
        if range.max <= range.min {
            return None;
        }
        Some(ValidatedFlag::Range {
            name: range.name.clone(),
            prefix: prefix.to_string(),
            separator: separator.to_string(),
            min: range.min,
            max: range.max,
        })
    }

    pub fn name(&self) -> &str {
        match self {
            ValidatedFlag::OnOff { name, .. } | ValidatedFlag::Range { name, .. } => name.as_str(),
        }
    }

    pub fn is_range(&self) -> bool {
        matches!(self, ValidatedFlag::Range { .. })
    }

    /// Ordering used for stable output: optimizer, target, then ranges.
    pub fn sort_key(&self) -> (FlagCategory, &str) {
        match self {
            ValidatedFlag::OnOff {
                on_prefix, name, ..
            } => (FlagCategory::of(on_prefix), name.as_str()),
            ValidatedFlag::Range { name, .. } => (FlagCategory::Param, name.as_str()),
        }
    }
}

/// Render `prefix + name + separator + value`.
pub fn render_param(prefix: &str, name: &str, separator: &str, value: i64) -> String {
    format!("{prefix}{name}{separator}{value}")
}
