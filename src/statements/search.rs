use regex::Regex;
use serde::Serialize;
use std::collections::HashSet;

use super::hierarchy::{split_words, FlatEntry, PathAddress};
use super::tree::StatementTree;

/// Keyword search over a statement's flat list.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SearchQuery {
    pub words: Vec<String>,
    pub level: Option<usize>,
    pub exclude: Vec<String>,
    pub base: Option<PathAddress>,
    pub context: Option<String>,
}

impl SearchQuery {
    pub fn new<I, W>(words: I) -> Self
    where
        I: IntoIterator<Item = W>,
        W: AsRef<str>,
    {
        Self {
            words: words.into_iter().map(|w| w.as_ref().to_lowercase()).collect(),
            ..Default::default()
        }
    }

    /// Whitespace separated words, e.g. `"net cash provided by operating activities"`.
    pub fn phrase(phrase: &str) -> Self {
        Self::new(phrase.split_whitespace())
    }

    pub fn level(mut self, level: usize) -> Self {
        self.level = Some(level);
        self
    }

    pub fn exclude<I, W>(mut self, words: I) -> Self
    where
        I: IntoIterator<Item = W>,
        W: AsRef<str>,
    {
        self.exclude
            .extend(words.into_iter().map(|w| w.as_ref().to_lowercase()));
        self
    }

    /// Only consider the subtree rooted at `base` (including `base` itself).
    pub fn within(mut self, base: PathAddress) -> Self {
        self.base = Some(base);
        self
    }

    pub fn in_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }
}

/// A resolved search or lookup.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SearchHit<'a> {
    pub entry: &'a FlatEntry,
    pub context: &'a str,
    pub node: &'a StatementTree,
}

impl SearchHit<'_> {
    pub fn value(&self) -> f64 {
        self.node.value.unwrap_or_default()
    }
}

/// Number of entry tokens that appear among the search words.
fn score(entry: &FlatEntry, words: &HashSet<&str>) -> usize {
    entry
        .search_tokens
        .iter()
        .filter(|token| words.contains(token.as_str()))
        .count()
}

/// Depth closest to `requested` among `depths`; the shallower one on a tie.
fn nearest_depth(depths: &[usize], requested: usize) -> Option<usize> {
    depths
        .iter()
        .copied()
        .min_by_key(|depth| (depth.abs_diff(requested), *depth))
}

/// Best matching entry: most tokens found among the query words, first
/// entry in flat-list order on ties. Entries sharing a token with the
/// exclusion list never match. With a level, only entries at that depth
/// compete, or at the nearest depth that has matches.
pub fn best_match<'a>(entries: &'a [FlatEntry], query: &SearchQuery) -> Option<&'a FlatEntry> {
    let words: HashSet<&str> = query.words.iter().map(String::as_str).collect();
    let excluded: HashSet<&str> = query.exclude.iter().map(String::as_str).collect();

    let scored: Vec<(&FlatEntry, usize)> = entries
        .iter()
        .filter(|e| query.base.as_ref().map_or(true, |base| e.address.starts_with(base)))
        .filter(|e| !e.search_tokens.iter().any(|t| excluded.contains(t.as_str())))
        .map(|e| (e, score(e, &words)))
        .filter(|(_, hits)| *hits > 0)
        .collect();

    let depth = match query.level {
        Some(requested) => {
            let depths: Vec<usize> = scored.iter().map(|(e, _)| e.depth).collect();
            Some(nearest_depth(&depths, requested)?)
        }
        None => None,
    };

    let mut best: Option<(&FlatEntry, usize)> = None;
    for (entry, hits) in scored {
        if depth.is_some_and(|d| d != entry.depth) {
            continue;
        }
        if hits > best.map_or(0, |(_, top)| top) {
            best = Some((entry, hits));
        }
    }
    best.map(|(entry, _)| entry)
}

/// Address of the entry named `local_name` under any prefix, or of the
/// entry sharing the most words with it.
pub fn address_of<'a>(entries: &'a [FlatEntry], local_name: &str) -> Option<&'a PathAddress> {
    if let Some(entry) = entries.iter().find(|e| e.concept.local_name() == local_name) {
        return Some(&entry.address);
    }
    let query = SearchQuery::new(split_words(local_name));
    best_match(entries, &query).map(|e| &e.address)
}

/// Entries left out of `sum_items`.
#[derive(Clone, Debug)]
pub enum Exclusion {
    /// Address contains this text.
    Text(String),
    /// Address matches this expression.
    Pattern(Regex),
}

impl Exclusion {
    pub fn matches(&self, address: &str) -> bool {
        match self {
            Exclusion::Text(text) => address.contains(text.as_str()),
            Exclusion::Pattern(pattern) => pattern.is_match(address),
        }
    }
}

/// Sum of the leaf values under `root` (the root itself when it is a leaf),
/// skipping entries whose address matches an exclusion.
pub fn sum_items(
    entries: &[FlatEntry],
    tree: &StatementTree,
    root: &PathAddress,
    exclusions: &[Exclusion],
) -> f64 {
    entries
        .iter()
        .filter(|e| e.address.starts_with(root))
        .filter(|e| {
            let address = e.address.to_string();
            !exclusions.iter().any(|x| x.matches(&address))
        })
        .filter_map(|e| tree.get(&e.address))
        .filter(|node| node.is_leaf())
        .map(|node| node.value.unwrap_or_default())
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::statements::tree::{fill, FactIndex};
    use crate::xbrl::types::Fact;

    fn entry(address: &str) -> FlatEntry {
        let address = PathAddress::from(address);
        let concept = address.leaf().cloned().unwrap();
        let depth = address.segments().len() - 1;
        FlatEntry::new(concept, depth, address)
    }

    fn balance_entries() -> Vec<FlatEntry> {
        vec![
            entry("a:Assets"),
            entry("a:Assets/a:AssetsCurrent"),
            entry("a:Assets/a:AssetsNoncurrent"),
            entry("a:Assets/a:AssetsCurrent/a:CashAndCashEquivalents"),
            entry("a:Assets/a:AssetsCurrent/a:AccountsReceivable"),
            entry("a:Assets/a:AssetsNoncurrent/a:Goodwill"),
        ]
    }

    #[test]
    fn test_search_examples() {
        let entries = vec![entry("a:CashAndEquivalents"), entry("a:AccountsReceivable")];

        let hit = best_match(&entries, &SearchQuery::new(["cash"])).unwrap();
        assert_eq!(hit.concept.as_str(), "a:CashAndEquivalents");

        let query = SearchQuery::new(["cash"]).exclude(["equivalents"]);
        assert!(best_match(&entries, &query).is_none());
    }

    #[test]
    fn test_search_whole_words_only() {
        let entries = vec![entry("a:Cashflow")];
        assert!(best_match(&entries, &SearchQuery::new(["cash"])).is_none());
    }

    #[test]
    fn test_search_ties_keep_first() {
        let entries = balance_entries();
        let hit = best_match(&entries, &SearchQuery::phrase("assets")).unwrap();
        assert_eq!(hit.concept.as_str(), "a:Assets");
    }

    #[test]
    fn test_search_level_clamps() {
        let entries = balance_entries();

        let exact = best_match(&entries, &SearchQuery::phrase("assets").level(1)).unwrap();
        assert_eq!(exact.concept.as_str(), "a:AssetsCurrent");

        let above = best_match(&entries, &SearchQuery::phrase("assets").level(7)).unwrap();
        assert_eq!(above.concept.as_str(), "a:AssetsCurrent");

        let deep = best_match(&entries, &SearchQuery::phrase("goodwill").level(0)).unwrap();
        assert_eq!(deep.concept.as_str(), "a:Goodwill");
    }

    #[test]
    fn test_search_within_base() {
        let entries = balance_entries();
        let query = SearchQuery::phrase("assets").within("a:Assets/a:AssetsNoncurrent".into());
        let hit = best_match(&entries, &query).unwrap();
        assert_eq!(hit.concept.as_str(), "a:AssetsNoncurrent");
    }

    #[test]
    fn test_address_of() {
        let entries = balance_entries();
        let exact = address_of(&entries, "Goodwill").unwrap();
        assert_eq!(exact.to_string(), "a:Assets/a:AssetsNoncurrent/a:Goodwill");

        let fuzzy = address_of(&entries, "CashCashEquivalents").unwrap();
        assert_eq!(fuzzy.leaf().unwrap().as_str(), "a:CashAndCashEquivalents");

        assert!(address_of(&entries, "Revenue").is_none());
    }

    fn filled(entries: &[FlatEntry]) -> StatementTree {
        let facts = vec![
            Fact::new("a:Assets", "X", "999"),
            Fact::new("a:AssetsCurrent", "X", "30"),
            Fact::new("a:CashAndCashEquivalents", "X", "10"),
            Fact::new("a:AccountsReceivable", "X", "20"),
            Fact::new("a:Goodwill", "X", "5"),
        ];
        let index = FactIndex::new(&facts, 90);
        fill(&StatementTree::template(entries), entries, "X", &index)
    }

    #[test]
    fn test_sum_items_leaves() {
        let entries = balance_entries();
        let tree = filled(&entries);

        assert_eq!(sum_items(&entries, &tree, &"a:Assets".into(), &[]), 35.0);
        assert_eq!(sum_items(&entries, &tree, &"a:Assets/a:AssetsCurrent".into(), &[]), 30.0);
        assert_eq!(
            sum_items(&entries, &tree, &"a:Assets/a:AssetsNoncurrent/a:Goodwill".into(), &[]),
            5.0
        );
    }

    #[test]
    fn test_sum_items_exclusions() {
        let entries = balance_entries();
        let tree = filled(&entries);
        let root = PathAddress::from("a:Assets");

        let by_text = [Exclusion::Text("a:AssetsNoncurrent".into())];
        assert_eq!(sum_items(&entries, &tree, &root, &by_text), 30.0);

        let by_pattern = [Exclusion::Pattern(Regex::new(r"Receivable$").unwrap())];
        assert_eq!(sum_items(&entries, &tree, &root, &by_pattern), 15.0);
    }

    #[test]
    fn test_sum_items_equity_example() {
        let entries = vec![
            entry("a:Equity"),
            entry("a:Equity/a:Common"),
            entry("a:Equity/a:Retained"),
        ];
        let facts = vec![Fact::new("a:Common", "X", "100"), Fact::new("a:Retained", "X", "50")];
        let index = FactIndex::new(&facts, 90);
        let tree = fill(&StatementTree::template(&entries), &entries, "X", &index);

        assert_eq!(tree.get(&"a:Equity/a:Common".into()).unwrap().value, Some(100.0));
        assert_eq!(sum_items(&entries, &tree, &"a:Equity".into(), &[]), 150.0);
    }
}
