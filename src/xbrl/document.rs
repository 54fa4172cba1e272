use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::types::{CalculationArc, Concept, Context, Fact, RoleType};

/// Read-only view over an already parsed filing: schema roles, linkbases and
/// the instance document. Reconstruction only ever reads through this trait.
pub trait TaxonomySource {
    fn roles(&self) -> &[RoleType];

    fn calculation_arcs(&self, role_uri: &str) -> &[CalculationArc];

    /// Non-abstract presentation locators of a role, in document order.
    fn presentation_concepts(&self, role_uri: &str) -> &[Concept];

    fn facts(&self) -> &[Fact];

    fn context(&self, id: &str) -> Option<&Context>;

    fn document_period_end(&self) -> Option<NaiveDate>;
}

/// In-memory filing produced by the parsers in `xbrl::parser`.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct FilingDocuments {
    pub roles: Vec<RoleType>,
    pub calculation: HashMap<String, Vec<CalculationArc>>,
    pub presentation: HashMap<String, Vec<Concept>>,
    pub facts: Vec<Fact>,
    pub contexts: HashMap<String, Context>,
    pub period_end: Option<NaiveDate>,
}

impl FilingDocuments {
    pub fn with_role(mut self, uri: &str, definition: &str) -> Self {
        self.roles.push(RoleType {
            uri: uri.to_string(),
            definition: definition.to_string(),
        });
        self
    }

    pub fn with_arcs(mut self, role_uri: &str, arcs: &[(&str, &str)]) -> Self {
        self.calculation
            .entry(role_uri.to_string())
            .or_default()
            .extend(arcs.iter().map(|(from, to)| CalculationArc::new(*from, *to)));
        self
    }

    pub fn with_locators(mut self, role_uri: &str, concepts: &[&str]) -> Self {
        self.presentation
            .entry(role_uri.to_string())
            .or_default()
            .extend(concepts.iter().map(|c| Concept::new(*c)));
        self
    }

    pub fn with_context(mut self, context: Context) -> Self {
        self.contexts.insert(context.id.clone(), context);
        self
    }

    pub fn with_fact(mut self, fact: Fact) -> Self {
        self.facts.push(fact);
        self
    }

    pub fn with_period_end(mut self, date: NaiveDate) -> Self {
        self.period_end = Some(date);
        self
    }
}

impl TaxonomySource for FilingDocuments {
    fn roles(&self) -> &[RoleType] {
        &self.roles
    }

    fn calculation_arcs(&self, role_uri: &str) -> &[CalculationArc] {
        self.calculation
            .get(role_uri)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    fn presentation_concepts(&self, role_uri: &str) -> &[Concept] {
        self.presentation
            .get(role_uri)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    fn facts(&self) -> &[Fact] {
        &self.facts
    }

    fn context(&self, id: &str) -> Option<&Context> {
        self.contexts.get(id)
    }

    fn document_period_end(&self) -> Option<NaiveDate> {
        self.period_end
    }
}
