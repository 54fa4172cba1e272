use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use super::hierarchy::{FlatEntry, PathAddress};
use crate::xbrl::types::{Concept, Fact};

/// Nested line items of one statement in one context. The top level node is
/// a container for the statement roots and carries no value.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct StatementTree {
    pub children: BTreeMap<Concept, StatementTree>,
    pub value: Option<f64>,
}

impl StatementTree {
    /// Empty tree with one node per entry address.
    pub fn template(entries: &[FlatEntry]) -> Self {
        let mut tree = StatementTree::default();
        for entry in entries {
            tree.get_or_create(&entry.address);
        }
        tree
    }

    pub fn get(&self, address: &PathAddress) -> Option<&StatementTree> {
        address
            .segments()
            .iter()
            .try_fold(self, |node, concept| node.children.get(concept))
    }

    pub fn get_mut(&mut self, address: &PathAddress) -> Option<&mut StatementTree> {
        address
            .segments()
            .iter()
            .try_fold(self, |node, concept| node.children.get_mut(concept))
    }

    pub fn get_or_create(&mut self, address: &PathAddress) -> &mut StatementTree {
        address
            .segments()
            .iter()
            .fold(self, |node, concept| node.children.entry(concept.clone()).or_default())
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

/// Instance facts keyed by concept and context id. A fact tagged with the
/// exact concept wins; otherwise facts are matched on the lower-cased local
/// name, so an extension `acme:Revenues` can stand in for `us-gaap:Revenues`.
/// The first fact wins when a filing repeats one.
pub struct FactIndex<'a> {
    exact: HashMap<(&'a str, &'a str), &'a Fact>,
    by_name: HashMap<(String, &'a str), &'a Fact>,
    name_len: usize,
}

impl<'a> FactIndex<'a> {
    pub fn new(facts: &'a [Fact], name_len: usize) -> Self {
        let mut exact = HashMap::with_capacity(facts.len());
        let mut by_name = HashMap::with_capacity(facts.len());
        for fact in facts {
            let context = fact.context_ref.as_str();
            exact.entry((fact.concept.as_str(), context)).or_insert(fact);
            by_name
                .entry((fact.concept.match_key(name_len), context))
                .or_insert(fact);
        }
        Self {
            exact,
            by_name,
            name_len,
        }
    }

    pub fn get(&self, concept: &Concept, context: &str) -> Option<&'a Fact> {
        self.exact
            .get(&(concept.as_str(), context))
            .or_else(|| self.by_name.get(&(concept.match_key(self.name_len), context)))
            .copied()
    }
}

/// Numeric value of a fact. Empty or non-numeric text yields `None`; a
/// fact flagged as negated gets its minus sign back.
pub fn parse_fact_value(fact: &Fact) -> Option<f64> {
    let text: String = fact
        .value
        .trim()
        .chars()
        .filter(|c| *c != ',' && !c.is_whitespace())
        .collect();
    if text.is_empty() {
        return None;
    }

    let text = if fact.is_negated() && !text.starts_with('-') {
        format!("-{}", text)
    } else {
        text
    };

    match text.parse::<f64>() {
        Ok(value) => Some(value),
        Err(_) => {
            log::debug!("Non-numeric value for {}: {:?}", fact.concept, fact.value);
            None
        }
    }
}

/// Copies the template and assigns every entry its value in `context`.
/// Missing facts are filled with zero.
pub fn fill(
    template: &StatementTree,
    entries: &[FlatEntry],
    context: &str,
    index: &FactIndex,
) -> StatementTree {
    let mut tree = template.clone();
    let mut missing = 0;
    for entry in entries {
        let value = index.get(&entry.concept, context).and_then(parse_fact_value);
        if value.is_none() {
            missing += 1;
        }
        tree.get_or_create(&entry.address).value = Some(value.unwrap_or(0.0));
    }
    log::debug!(
        "Filled {} entries for context {} ({} without a value)",
        entries.len(),
        context,
        missing
    );
    tree
}
