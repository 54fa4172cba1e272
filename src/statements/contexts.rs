use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use super::hierarchy::FlatEntry;
use super::Statement;
use crate::core::config::ExtractorConfig;
use crate::xbrl::document::TaxonomySource;
use crate::xbrl::types::{Context, Fact, Period};

/// The context a statement is shown in unless the caller asks otherwise.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DefaultContext {
    pub id: String,
    /// No context met the selection rule; `id` is the most recent one.
    pub fallback: bool,
}

/// Facts whose concept matches one of the entries, short enough to be
/// numeric, one per (concept, context).
fn matching_facts<'a, S>(
    source: &'a S,
    entries: &[FlatEntry],
    config: &ExtractorConfig,
) -> Vec<(usize, &'a Fact)>
where
    S: TaxonomySource + ?Sized,
{
    let keys: HashMap<String, usize> = entries
        .iter()
        .enumerate()
        .rev()
        .map(|(i, e)| (e.concept.match_key(config.name_match_len), i))
        .collect();

    let mut seen: HashSet<(usize, &str)> = HashSet::new();
    source
        .facts()
        .iter()
        .filter(|f| f.value.chars().count() <= config.max_fact_text_len)
        .filter_map(|f| {
            let entry = *keys.get(&f.concept.match_key(config.name_match_len))?;
            seen.insert((entry, f.context_ref.as_str())).then_some((entry, f))
        })
        .collect()
}

/// Context ids relevant to a statement, in first-seen order.
///
/// Entries whose facts are all dimensionally qualified are skipped until
/// one entry has a consolidated (segment-free) fact; without one the
/// statement has no relevant contexts. Contexts are then counted over all
/// matching facts and kept when their count is within `tolerance` of the
/// entry count and above `min_context_occurrences`.
pub fn relevant_contexts<S>(
    source: &S,
    entries: &[FlatEntry],
    tolerance: usize,
    config: &ExtractorConfig,
) -> Vec<String>
where
    S: TaxonomySource + ?Sized,
{
    let facts = matching_facts(source, entries, config);

    let consolidated = (0..entries.len()).find(|entry| {
        facts.iter().any(|(i, f)| {
            *i == *entry && source.context(&f.context_ref).is_some_and(|c| !c.has_segment)
        })
    });
    match consolidated {
        Some(entry) => log::debug!(
            "First consolidated fact found for {} (entry {})",
            entries[entry].concept,
            entry
        ),
        None => {
            log::debug!("No consolidated facts for {} entries", entries.len());
            return Vec::new();
        }
    }

    let mut order: Vec<&str> = Vec::new();
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for (_, fact) in &facts {
        let count = counts.entry(fact.context_ref.as_str()).or_insert(0);
        if *count == 0 {
            order.push(fact.context_ref.as_str());
        }
        *count += 1;
    }

    let floor = entries.len().saturating_sub(tolerance);
    order
        .into_iter()
        .filter(|id| {
            let count = counts[id];
            count >= floor && count > config.min_context_occurrences
        })
        .map(String::from)
        .collect()
}

/// Picks the default context among the relevant ones: the latest instant,
/// or a duration ending on the document period end date. Durations longer
/// than `max_quarter_days` only qualify for the cash-flow statement, which
/// reports year-to-date figures. Later qualifying contexts replace earlier
/// ones.
pub fn default_context(
    statement: Statement,
    contexts: &[&Context],
    period_end: Option<NaiveDate>,
    config: &ExtractorConfig,
) -> Option<DefaultContext> {
    let mut best: Option<&Context> = None;
    let mut latest_instant: Option<NaiveDate> = None;

    for context in contexts {
        match context.period {
            Period::Instant(date) => {
                if latest_instant.map_or(true, |latest| date >= latest) {
                    latest_instant = Some(date);
                    best = Some(*context);
                }
            }
            Period::Duration { end, .. } => {
                let span = context.period.span_days();
                if span > config.max_quarter_days && statement != Statement::CashFlows {
                    continue;
                }
                if Some(end) == period_end {
                    best = Some(*context);
                }
            }
        }
    }

    if let Some(context) = best {
        return Some(DefaultContext {
            id: context.id.clone(),
            fallback: false,
        });
    }

    let recent = contexts.iter().max_by_key(|c| c.period.end_date())?;
    log::warn!(
        "No context of the {} statement matches the reporting period; falling back to {}",
        statement,
        recent.id
    );
    Some(DefaultContext {
        id: recent.id.clone(),
        fallback: true,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xbrl::document::FilingDocuments;
    use crate::statements::hierarchy::PathAddress;
    use crate::xbrl::types::Concept;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn instant(id: &str, d: NaiveDate, has_segment: bool) -> Context {
        Context {
            id: id.to_string(),
            period: Period::Instant(d),
            has_segment,
        }
    }

    fn duration(id: &str, start: NaiveDate, end: NaiveDate) -> Context {
        Context {
            id: id.to_string(),
            period: Period::Duration { start, end },
            has_segment: false,
        }
    }

    fn entries(names: &[&str]) -> Vec<FlatEntry> {
        names
            .iter()
            .map(|n| FlatEntry::new(Concept::new(*n), 0, PathAddress::root(Concept::new(*n))))
            .collect()
    }

    fn filing_with(contexts: &[(&str, usize)], names: &[&str]) -> FilingDocuments {
        let mut filing = FilingDocuments::default();
        for (i, (id, count)) in contexts.iter().enumerate() {
            filing = filing.with_context(instant(id, date(2023, 9, 30 - i as u32), false));
            for name in names.iter().take(*count) {
                filing = filing.with_fact(Fact::new(*name, id, "100"));
            }
        }
        filing
    }

    const NAMES: [&str; 6] = ["a:A", "a:B", "a:C", "a:D", "a:E", "a:F"];

    #[test]
    fn test_relevant_contexts_tolerance() {
        let filing = filing_with(&[("full", 6), ("most", 5), ("few", 4)], &NAMES);
        let config = ExtractorConfig::default();
        let flat = entries(&NAMES);

        assert_eq!(relevant_contexts(&filing, &flat, 0, &config), vec!["full"]);
        assert_eq!(relevant_contexts(&filing, &flat, 1, &config), vec!["full", "most"]);
        assert_eq!(
            relevant_contexts(&filing, &flat, 10, &config),
            vec!["full", "most", "few"]
        );
    }

    #[test]
    fn test_relevant_contexts_monotonic_in_tolerance() {
        let filing = filing_with(&[("a", 6), ("b", 5), ("c", 4), ("d", 2)], &NAMES);
        let config = ExtractorConfig::default();
        let flat = entries(&NAMES);

        let mut previous: Vec<String> = Vec::new();
        for tolerance in 0..8 {
            let current = relevant_contexts(&filing, &flat, tolerance, &config);
            assert!(previous.iter().all(|c| current.contains(c)));
            previous = current;
        }
    }

    #[test]
    fn test_minimum_occurrences() {
        let names = ["a:A", "a:B", "a:C"];
        let filing = filing_with(&[("small", 3)], &names);
        let config = ExtractorConfig::default();
        assert!(relevant_contexts(&filing, &entries(&names), 10, &config).is_empty());
    }

    #[test]
    fn test_segment_only_statement_has_no_contexts() {
        let mut filing = FilingDocuments::default().with_context(instant("seg", date(2023, 9, 30), true));
        for name in NAMES {
            filing = filing.with_fact(Fact::new(name, "seg", "1"));
        }
        let config = ExtractorConfig::default();
        assert!(relevant_contexts(&filing, &entries(&NAMES), 10, &config).is_empty());
    }

    #[test]
    fn test_segment_only_entries_are_skipped() {
        let mut filing = FilingDocuments::default()
            .with_context(instant("seg", date(2023, 9, 30), true))
            .with_context(instant("full", date(2023, 9, 30), false));
        for name in &NAMES[..4] {
            filing = filing.with_fact(Fact::new(*name, "seg", "1"));
        }
        for name in &NAMES[1..] {
            filing = filing.with_fact(Fact::new(*name, "full", "1"));
        }
        let config = ExtractorConfig::default();
        let flat = entries(&NAMES);

        // a:A only has segmented facts; a:B opens the gate and every
        // entry's facts are tallied, a:A's included.
        assert_eq!(relevant_contexts(&filing, &flat, 10, &config), vec!["seg", "full"]);
        assert_eq!(relevant_contexts(&filing, &flat, 1, &config), vec!["full"]);
    }

    #[test]
    fn test_long_text_facts_ignored() {
        let mut filing = filing_with(&[("full", 6)], &NAMES);
        filing = filing.with_context(instant("text", date(2023, 9, 30), false));
        for name in NAMES {
            filing = filing.with_fact(Fact::new(name, "text", &"x".repeat(80)));
        }
        let config = ExtractorConfig::default();
        assert_eq!(relevant_contexts(&filing, &entries(&NAMES), 10, &config), vec!["full"]);
    }

    #[test]
    fn test_default_prefers_latest_instant() {
        let q3 = instant("q3", date(2023, 9, 30), false);
        let fy = instant("fy", date(2022, 12, 31), false);
        let config = ExtractorConfig::default();

        let chosen = default_context(Statement::BalanceSheet, &[&fy, &q3], None, &config).unwrap();
        assert_eq!(chosen, DefaultContext { id: "q3".into(), fallback: false });

        let chosen = default_context(Statement::BalanceSheet, &[&q3, &fy], None, &config).unwrap();
        assert_eq!(chosen.id, "q3");
    }

    #[test]
    fn test_default_duration_rules() {
        let end = date(2023, 9, 30);
        let quarter = duration("qtd", date(2023, 7, 1), end);
        let ytd = duration("ytd", date(2023, 1, 1), end);
        let prior = duration("prior", date(2022, 7, 1), date(2022, 9, 30));
        let config = ExtractorConfig::default();

        let ops = default_context(Statement::Operations, &[&quarter, &ytd, &prior], Some(end), &config);
        assert_eq!(ops.unwrap().id, "qtd");

        let cash = default_context(Statement::CashFlows, &[&ytd, &prior], Some(end), &config);
        assert_eq!(cash.unwrap().id, "ytd");
    }

    #[test]
    fn test_default_falls_back_to_most_recent() {
        let ytd = duration("ytd", date(2023, 1, 1), date(2023, 9, 30));
        let prior = duration("prior", date(2022, 1, 1), date(2022, 9, 30));
        let config = ExtractorConfig::default();

        let chosen = default_context(
            Statement::Operations,
            &[&prior, &ytd],
            Some(date(2023, 9, 30)),
            &config,
        )
        .unwrap();
        assert_eq!(chosen, DefaultContext { id: "ytd".into(), fallback: true });

        assert!(default_context(Statement::Operations, &[], None, &config).is_none());
    }
}
