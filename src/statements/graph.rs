use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::xbrl::types::{CalculationArc, Concept};

pub const LIABILITIES: &str = "Liabilities";
pub const LIABILITIES_AND_EQUITY: &str = "LiabilitiesAndStockholdersEquity";
pub const EQUITY_PREFIX: &str = "StockholdersEquity";

/// Adjacency of one concept. Both lists keep first-seen arc order and hold
/// no duplicates.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ConceptNode {
    pub from: Vec<Concept>,
    pub to: Vec<Concept>,
}

/// Outcome of the balance-sheet liabilities repair.
#[derive(Clone, Debug, PartialEq)]
pub enum LiabilitiesRepair {
    Applied {
        liabilities: Concept,
        reparented: Vec<Concept>,
    },
    AlreadyPresent,
    NoTotal,
}

/// Directed graph of calculation arcs for one statement role.
#[derive(Clone, Debug, Default)]
pub struct ArcGraph {
    order: Vec<Concept>,
    nodes: HashMap<Concept, ConceptNode>,
}

fn push_unique(list: &mut Vec<Concept>, concept: &Concept) {
    if !list.contains(concept) {
        list.push(concept.clone());
    }
}

impl ArcGraph {
    pub fn from_arcs(arcs: &[CalculationArc]) -> Self {
        let mut graph = ArcGraph::default();
        for arc in arcs {
            graph.add_edge(&arc.from, &arc.to);
        }
        graph
    }

    fn touch(&mut self, concept: &Concept) -> &mut ConceptNode {
        if !self.nodes.contains_key(concept) {
            self.order.push(concept.clone());
        }
        self.nodes.entry(concept.clone()).or_default()
    }

    pub fn add_edge(&mut self, from: &Concept, to: &Concept) {
        push_unique(&mut self.touch(from).to, to);
        push_unique(&mut self.touch(to).from, from);
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Concepts in discovery order (arc order, `from` before `to`).
    pub fn concepts(&self) -> impl Iterator<Item = &Concept> {
        self.order.iter()
    }

    pub fn node(&self, concept: &Concept) -> Option<&ConceptNode> {
        self.nodes.get(concept)
    }

    pub fn children(&self, concept: &Concept) -> &[Concept] {
        self.nodes.get(concept).map(|n| n.to.as_slice()).unwrap_or(&[])
    }

    pub fn find_local(&self, local_name: &str) -> Option<&Concept> {
        self.order.iter().find(|c| c.local_name() == local_name)
    }

    pub fn roots(&self) -> impl Iterator<Item = &Concept> {
        self.order.iter().filter(|c| self.nodes[*c].from.is_empty())
    }

    /// Some concept that is its own descendant, if any.
    pub fn find_cycle(&self) -> Option<Concept> {
        #[derive(Clone, Copy, PartialEq)]
        enum Mark {
            Open,
            Done,
        }

        let mut marks: HashMap<&Concept, Mark> = HashMap::new();
        for start in &self.order {
            if marks.contains_key(start) {
                continue;
            }
            // (concept, index of the next child to visit)
            let mut stack: Vec<(&Concept, usize)> = vec![(start, 0)];
            marks.insert(start, Mark::Open);

            while let Some((concept, next)) = stack.last_mut() {
                let concept: &Concept = *concept;
                let children = self.children(concept);
                if let Some(child) = children.get(*next) {
                    *next += 1;
                    match marks.get(child) {
                        Some(Mark::Open) => return Some(child.clone()),
                        Some(Mark::Done) => {}
                        None => {
                            marks.insert(child, Mark::Open);
                            stack.push((child, 0));
                        }
                    }
                } else {
                    marks.insert(concept, Mark::Done);
                    stack.pop();
                }
            }
        }
        None
    }

    /// Inserts a total-liabilities concept under the liabilities-and-equity
    /// total when the filer left it out. Every child of that total whose local
    /// name does not start with `StockholdersEquity` moves under the new
    /// concept.
    pub fn repair_liabilities(&mut self) -> LiabilitiesRepair {
        if self.find_local(LIABILITIES).is_some() {
            return LiabilitiesRepair::AlreadyPresent;
        }
        let Some(total) = self.find_local(LIABILITIES_AND_EQUITY).cloned() else {
            return LiabilitiesRepair::NoTotal;
        };
        let liabilities = total.sibling(LIABILITIES);

        let (equity, reparented): (Vec<Concept>, Vec<Concept>) = self.nodes[&total]
            .to
            .iter()
            .cloned()
            .partition(|c| c.local_name().starts_with(EQUITY_PREFIX));

        for child in &reparented {
            if let Some(node) = self.nodes.get_mut(child) {
                for parent in node.from.iter_mut().filter(|p| **p == total) {
                    *parent = liabilities.clone();
                }
            }
        }

        if let Some(node) = self.nodes.get_mut(&total) {
            node.to = equity;
            node.to.push(liabilities.clone());
        }
        self.order.push(liabilities.clone());
        self.nodes.insert(
            liabilities.clone(),
            ConceptNode {
                from: vec![total],
                to: reparented.clone(),
            },
        );

        LiabilitiesRepair::Applied {
            liabilities,
            reparented,
        }
    }
}
