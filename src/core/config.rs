use anyhow::{anyhow, Result};
use std::str::FromStr;

/// Tunables for statement reconstruction. `Default` matches what most
/// 10-Q/10-K filings need; `from_env` lets the binary override them.
#[derive(Clone, Debug, PartialEq)]
pub struct ExtractorConfig {
    /// How far below the statement's entry count a context's fact count may
    /// fall and still be considered relevant.
    pub context_tolerance: usize,
    /// A context must be referenced by strictly more facts than this.
    pub min_context_occurrences: usize,
    /// Facts with longer text (text blocks, footnotes) are ignored when
    /// inferring contexts.
    pub max_fact_text_len: usize,
    /// Concept names are compared case-insensitively after truncation to
    /// this many characters.
    pub name_match_len: usize,
    /// Synthesize a total-liabilities line when the balance sheet lacks one.
    pub repair_liabilities: bool,
    /// Longest duration (in days) a non cash-flow context may span and still
    /// be picked as the default.
    pub max_quarter_days: i64,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            context_tolerance: 10,
            min_context_occurrences: 3,
            max_fact_text_len: 50,
            name_match_len: 90,
            repair_liabilities: true,
            max_quarter_days: 100,
        }
    }
}

impl ExtractorConfig {
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let context_tolerance = env_or("XBRL_CONTEXT_TOLERANCE", defaults.context_tolerance)?;
        let max_fact_text_len = env_or("XBRL_MAX_FACT_TEXT_LEN", defaults.max_fact_text_len)?;

        let repair_liabilities = match std::env::var("XBRL_REPAIR_LIABILITIES") {
            Ok(raw) => parse_flag(&raw)
                .ok_or_else(|| anyhow!("XBRL_REPAIR_LIABILITIES must be a boolean, got {}", raw))?,
            Err(_) => defaults.repair_liabilities,
        };

        Ok(Self {
            context_tolerance,
            max_fact_text_len,
            repair_liabilities,
            ..defaults
        })
    }
}

fn env_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow!("invalid value for {}: {} ({})", key, raw, e)),
        Err(_) => Ok(default),
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
