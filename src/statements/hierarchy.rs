use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;

use super::graph::ArcGraph;
use crate::core::error::StructuralError;
use crate::xbrl::types::Concept;

static CAMEL_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"[A-Z][^A-Z]*").unwrap());

/// Concepts from a statement root down to one line item.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub struct PathAddress(Vec<Concept>);

impl PathAddress {
    pub fn root(concept: Concept) -> Self {
        PathAddress(vec![concept])
    }

    pub fn child(&self, concept: Concept) -> Self {
        let mut segments = self.0.clone();
        segments.push(concept);
        PathAddress(segments)
    }

    pub fn segments(&self) -> &[Concept] {
        &self.0
    }

    pub fn leaf(&self) -> Option<&Concept> {
        self.0.last()
    }

    /// True for the address itself and everything below it.
    pub fn starts_with(&self, ancestor: &PathAddress) -> bool {
        self.0.starts_with(&ancestor.0)
    }
}

impl fmt::Display for PathAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for concept in &self.0 {
            if !first {
                write!(f, "/")?;
            }
            write!(f, "{}", concept)?;
            first = false;
        }
        Ok(())
    }
}

impl From<PathAddress> for String {
    fn from(address: PathAddress) -> String {
        address.to_string()
    }
}

impl From<String> for PathAddress {
    fn from(raw: String) -> Self {
        PathAddress::from(raw.as_str())
    }
}

impl From<&str> for PathAddress {
    fn from(raw: &str) -> Self {
        PathAddress(
            raw.split('/')
                .filter(|segment| !segment.is_empty())
                .map(Concept::new)
                .collect(),
        )
    }
}

impl FromIterator<Concept> for PathAddress {
    fn from_iter<I: IntoIterator<Item = Concept>>(iter: I) -> Self {
        PathAddress(iter.into_iter().collect())
    }
}

/// One line item of a reconstructed statement.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FlatEntry {
    pub concept: Concept,
    pub depth: usize,
    pub address: PathAddress,
    pub search_tokens: Vec<String>,
}

impl FlatEntry {
    pub fn new(concept: Concept, depth: usize, address: PathAddress) -> Self {
        let search_tokens = split_words(concept.local_name());
        Self {
            concept,
            depth,
            address,
            search_tokens,
        }
    }
}

/// Lower-cased camel-case words of a local name:
/// `CashAndCashEquivalents` -> `cash and cash equivalents`.
pub fn split_words(local_name: &str) -> Vec<String> {
    CAMEL_WORD
        .find_iter(local_name)
        .map(|m| m.as_str().to_lowercase())
        .collect()
}

/// Flattens the graph level by level. Roots (no incoming arc) sit at depth
/// 0; each following level takes the children of the previous one in parent
/// order. A concept reachable from several parents is placed once, at the
/// length of its shortest chain from a root, under the first of its parents
/// in arc order that sits on the level above.
pub fn level(graph: &ArcGraph) -> Result<Vec<FlatEntry>, StructuralError> {
    if let Some(concept) = graph.find_cycle() {
        return Err(StructuralError::Cycle(concept));
    }

    let mut placed: HashSet<&Concept> = HashSet::new();
    let mut flat: Vec<FlatEntry> = Vec::with_capacity(graph.len());
    let mut current: Vec<(&Concept, PathAddress)> = Vec::new();

    for root in graph.roots() {
        placed.insert(root);
        current.push((root, PathAddress::root(root.clone())));
    }
    flat.extend(
        current
            .iter()
            .map(|(concept, address)| FlatEntry::new((*concept).clone(), 0, address.clone())),
    );

    let mut depth = 0;
    while placed.len() < graph.len() {
        depth += 1;
        let level_addresses: HashMap<&Concept, &PathAddress> =
            current.iter().map(|(concept, address)| (*concept, address)).collect();
        let mut next = Vec::new();
        for (parent, address) in &current {
            for child in graph.children(parent) {
                if placed.insert(child) {
                    // First parent in arc order that sits on the previous level.
                    let parent_address = graph
                        .node(child)
                        .and_then(|node| node.from.iter().find_map(|p| level_addresses.get(p)))
                        .copied()
                        .unwrap_or(address);
                    let child_address = parent_address.child(child.clone());
                    flat.push(FlatEntry::new(child.clone(), depth, child_address.clone()));
                    next.push((child, child_address));
                }
            }
        }

        // Nothing new reachable while concepts remain: those sit on a cycle
        // with no root above them.
        if next.is_empty() || depth > graph.len() {
            let stuck = graph
                .concepts()
                .find(|c| !placed.contains(c))
                .cloned()
                .unwrap_or_else(|| Concept::new(""));
            return Err(StructuralError::Cycle(stuck));
        }
        current = next;
    }

    Ok(flat)
}
