pub mod contexts;
pub mod financials;
pub mod graph;
pub mod hierarchy;
pub mod roles;
pub mod search;
pub mod tree;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

pub use financials::{Financials, Root, StatementReport};
pub use hierarchy::{FlatEntry, PathAddress};
pub use search::{Exclusion, SearchHit, SearchQuery};
pub use tree::StatementTree;

#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Statement {
    BalanceSheet,
    CashFlows,
    Operations,
    EquityChange,
    Parenthetical,
}

impl Statement {
    /// Statements that get a populated tree, in build order. The
    /// parenthetical borrows the balance sheet's contexts, so it comes last.
    pub const MATERIALIZED: [Statement; 4] = [
        Statement::BalanceSheet,
        Statement::CashFlows,
        Statement::Operations,
        Statement::Parenthetical,
    ];

    /// Keyword stems scored against role definitions.
    pub fn keywords(self) -> &'static [&'static str] {
        match self {
            Statement::BalanceSheet => &["balance", "sheet", "sheets", "financial", "position"],
            Statement::CashFlows => &["cash", "flow", "flows"],
            Statement::Operations => &["income", "statement", "operations", "loss"],
            Statement::EquityChange => &["changes", "change", "in", "stockholders", "equity"],
            Statement::Parenthetical => &["balance", "sheet", "parenthetical", "condensed"],
        }
    }
}
