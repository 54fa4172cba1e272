use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::statements::financials::Root;
use crate::statements::hierarchy::PathAddress;
use crate::statements::Statement;
use crate::xbrl::types::Concept;

/// Failures that prevent a single statement from being reconstructed. Other
/// statements of the same filing are unaffected.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StructuralError {
    #[error("no taxonomy role matched the {0} statement")]
    Unclassified(Statement),

    #[error("calculation graph contains a cycle through {0}")]
    Cycle(Concept),

    #[error("role {role} has no usable arcs or locators")]
    EmptyRole { role: String },
}

/// "No data" answers from lookups and searches. Never fatal.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LookupError {
    #[error("the {0} statement was not extracted")]
    StatementUnavailable(Statement),

    #[error("context {context} is not relevant to the {statement} statement")]
    UnknownContext { statement: Statement, context: String },

    #[error("the {0} statement has no default context")]
    NoDefaultContext(Statement),

    #[error("no line item at {0}")]
    PathNotFound(PathAddress),

    #[error("no line item matched {0:?}")]
    NoMatch(Vec<String>),

    #[error("the {0} root was not found in its statement")]
    UnresolvedRoot(Root),
}
