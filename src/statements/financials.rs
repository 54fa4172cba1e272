use anyhow::Result;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use strum::{Display, EnumIter, EnumString, IntoEnumIterator};

use super::contexts::{default_context, relevant_contexts};
use super::graph::{ArcGraph, LiabilitiesRepair};
use super::hierarchy::{self, FlatEntry, PathAddress};
use super::roles;
use super::search::{self, Exclusion, SearchHit, SearchQuery};
use super::tree::{fill, FactIndex, StatementTree};
use super::Statement;
use crate::core::config::ExtractorConfig;
use crate::core::error::{LookupError, StructuralError};
use crate::xbrl::document::TaxonomySource;
use crate::xbrl::filing::load_filing;
use crate::xbrl::types::{Concept, Context};

/// One reconstructed statement: its line items, the contexts it is
/// reported in and a filled tree per context.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StatementReport {
    pub statement: Statement,
    pub role: String,
    pub flatlist: Vec<FlatEntry>,
    /// Relevant context ids in first-seen order.
    pub contexts: Vec<String>,
    pub default_context: Option<String>,
    /// Set when no context matched the reporting period and the most recent
    /// one was taken instead.
    pub default_context_fallback: bool,
    pub trees: BTreeMap<String, StatementTree>,
    /// Address of the synthesized total liabilities line, if one was added.
    pub liabilities_repaired: Option<PathAddress>,
}

impl StatementReport {
    /// The stored context id for `context`, or the default context.
    fn resolve_context(&self, context: Option<&str>) -> Result<&str, LookupError> {
        match context {
            Some(id) => self
                .trees
                .get_key_value(id)
                .map(|(key, _)| key.as_str())
                .ok_or_else(|| LookupError::UnknownContext {
                    statement: self.statement,
                    context: id.to_string(),
                }),
            None => self
                .default_context
                .as_deref()
                .ok_or(LookupError::NoDefaultContext(self.statement)),
        }
    }

    pub fn tree(&self, context: Option<&str>) -> Result<&StatementTree, LookupError> {
        let context = self.resolve_context(context)?;
        self.trees
            .get(context)
            .ok_or(LookupError::NoDefaultContext(self.statement))
    }

    /// Node at `address`. Every segment of the address must exist.
    pub fn lookup(
        &self,
        context: Option<&str>,
        address: &PathAddress,
    ) -> Result<SearchHit<'_>, LookupError> {
        let context = self.resolve_context(context)?;
        let not_found = || LookupError::PathNotFound(address.clone());

        let entry = self
            .flatlist
            .iter()
            .find(|e| e.address == *address)
            .ok_or_else(not_found)?;
        let node = self
            .trees
            .get(context)
            .and_then(|tree| tree.get(address))
            .ok_or_else(not_found)?;

        Ok(SearchHit {
            entry,
            context,
            node,
        })
    }

    pub fn search(&self, query: &SearchQuery) -> Result<SearchHit<'_>, LookupError> {
        let entry = search::best_match(&self.flatlist, query)
            .ok_or_else(|| LookupError::NoMatch(query.words.clone()))?;
        self.lookup(query.context.as_deref(), &entry.address)
    }

    pub fn sum_items(
        &self,
        context: Option<&str>,
        root: &PathAddress,
        exclusions: &[Exclusion],
    ) -> Result<f64, LookupError> {
        let tree = self.tree(context)?;
        Ok(search::sum_items(&self.flatlist, tree, root, exclusions))
    }
}

/// Well known line items, located once per filing so callers can search
/// beneath them.
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
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Root {
    Assets,
    CurrentAssets,
    Liabilities,
    CurrentLiabilities,
    StockholdersEquity,
    Cash,
    Operating,
    Financing,
    Investing,
    CashChange,
    PretaxIncome,
    NetIncome,
    SharesOutstanding,
    SharesAuthorized,
    SharesIssued,
}

impl Root {
    pub fn statement(self) -> Statement {
        match self {
            Root::Assets
            | Root::CurrentAssets
            | Root::Liabilities
            | Root::CurrentLiabilities
            | Root::StockholdersEquity
            | Root::Cash => Statement::BalanceSheet,
            Root::Operating | Root::Financing | Root::Investing | Root::CashChange => {
                Statement::CashFlows
            }
            Root::PretaxIncome | Root::NetIncome => Statement::Operations,
            Root::SharesOutstanding | Root::SharesAuthorized | Root::SharesIssued => {
                Statement::Parenthetical
            }
        }
    }

    /// US-GAAP local name the root is located by.
    pub fn concept(self) -> &'static str {
        match self {
            Root::Assets => "Assets",
            Root::CurrentAssets => "AssetsCurrent",
            Root::Liabilities => "Liabilities",
            Root::CurrentLiabilities => "LiabilitiesCurrent",
            Root::StockholdersEquity => "StockholdersEquity",
            Root::Cash => "CashCashEquivalentsAndShortTermInvestments",
            Root::Operating => "NetCashProvidedByUsedInOperatingActivities",
            Root::Financing => "NetCashProvidedByUsedInFinancingActivities",
            Root::Investing => "NetCashProvidedByUsedInInvestingActivities",
            Root::CashChange => "CashCashEquivalentsRestrictedCashAndRestrictedCashEquivalentsPeriodIncreaseDecreaseIncludingExchangeRateEffect",
            Root::PretaxIncome => "IncomeLossFromContinuingOperationsBeforeIncomeTaxesMinorityInterestAndIncomeLossFromEquityMethodInvestments",
            Root::NetIncome => "NetIncomeLoss",
            Root::SharesOutstanding => "CommonStockSharesOutstanding",
            Root::SharesAuthorized => "CommonStockSharesAuthorized",
            Root::SharesIssued => "CommonStockSharesIssued",
        }
    }

    /// Search words used by the convenience accessors.
    pub fn default_phrase(self) -> &'static str {
        match self {
            Root::Assets => "assets",
            Root::CurrentAssets => "assets current",
            Root::Liabilities => "liabilities",
            Root::CurrentLiabilities => "liabilities current",
            Root::StockholdersEquity => "stockholders equity",
            Root::Cash => "cash",
            Root::Operating => "net cash provided by used in operating activities",
            Root::Financing => "net cash provided by used in financing activities",
            Root::Investing => "net cash provided by used in investing activities",
            Root::CashChange => "cash equivalents restricted period increase decrease including exchange rate effect",
            Root::PretaxIncome => "income loss from continuing operations before income taxes",
            Root::NetIncome => "net income loss",
            Root::SharesOutstanding => "common stock shares outstanding",
            Root::SharesAuthorized => "common stock shares authorized",
            Root::SharesIssued => "common stock shares issued",
        }
    }
}

/// Every statement that could be reconstructed from one filing. Statements
/// that failed are listed in `failures` and do not affect the others.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Financials {
    pub period_end: Option<NaiveDate>,
    /// Role uri classified for each statement, including ones that are not
    /// materialized.
    pub roles: BTreeMap<Statement, String>,
    pub reports: BTreeMap<Statement, StatementReport>,
    pub failures: BTreeMap<Statement, StructuralError>,
    pub roots: BTreeMap<Root, PathAddress>,
}

impl Financials {
    /// Reads the filing files in `dir` and reconstructs its statements.
    pub fn from_dir(dir: &Path, config: &ExtractorConfig) -> Result<Self> {
        let documents = load_filing(dir)?;
        Ok(Self::extract(&documents, config))
    }

    pub fn extract<S>(source: &S, config: &ExtractorConfig) -> Self
    where
        S: TaxonomySource + ?Sized,
    {
        let roles = roles::classify_all(source.roles());
        let index = FactIndex::new(source.facts(), config.name_match_len);

        let mut financials = Financials {
            period_end: source.document_period_end(),
            roles,
            ..Default::default()
        };

        for statement in Statement::MATERIALIZED {
            let balance_contexts = financials
                .reports
                .get(&Statement::BalanceSheet)
                .map(|report| report.contexts.as_slice());
            let built = match financials.roles.get(&statement) {
                Some(role) => build_report(source, statement, role, balance_contexts, &index, config),
                None => Err(StructuralError::Unclassified(statement)),
            };

            match built {
                Ok(report) => {
                    log::info!(
                        "Built {} from {}: {} line items, {} contexts",
                        statement,
                        report.role,
                        report.flatlist.len(),
                        report.contexts.len()
                    );
                    financials.reports.insert(statement, report);
                }
                Err(err) => {
                    log::warn!("Skipping the {} statement: {}", statement, err);
                    financials.failures.insert(statement, err);
                }
            }
        }

        financials.roots = locate_roots(&financials.reports);
        financials
    }

    pub fn statement(&self, statement: Statement) -> Result<&StatementReport, LookupError> {
        self.reports
            .get(&statement)
            .ok_or(LookupError::StatementUnavailable(statement))
    }

    /// Why a statement could not be built, if it failed.
    pub fn failure(&self, statement: Statement) -> Option<&StructuralError> {
        self.failures.get(&statement)
    }

    pub fn lookup(
        &self,
        statement: Statement,
        context: Option<&str>,
        address: &PathAddress,
    ) -> Result<SearchHit<'_>, LookupError> {
        self.statement(statement)?.lookup(context, address)
    }

    pub fn search(
        &self,
        statement: Statement,
        query: &SearchQuery,
    ) -> Result<SearchHit<'_>, LookupError> {
        self.statement(statement)?.search(query)
    }

    pub fn sum_items(
        &self,
        statement: Statement,
        context: Option<&str>,
        root: &PathAddress,
        exclusions: &[Exclusion],
    ) -> Result<f64, LookupError> {
        self.statement(statement)?
            .sum_items(context, root, exclusions)
    }

    pub fn root(&self, root: Root) -> Result<&PathAddress, LookupError> {
        self.roots.get(&root).ok_or(LookupError::UnresolvedRoot(root))
    }

    /// Searches beneath a root in the statement's default context.
    pub fn search_root(&self, root: Root, phrase: &str) -> Result<f64, LookupError> {
        let base = self.root(root)?.clone();
        let query = SearchQuery::phrase(phrase).within(base);
        Ok(self.search(root.statement(), &query)?.value())
    }

    fn root_value(&self, root: Root) -> Result<f64, LookupError> {
        self.search_root(root, root.default_phrase())
    }

    pub fn asset(&self) -> Result<f64, LookupError> {
        self.root_value(Root::Assets)
    }

    pub fn current_assets(&self) -> Result<f64, LookupError> {
        self.root_value(Root::CurrentAssets)
    }

    pub fn liability(&self) -> Result<f64, LookupError> {
        self.root_value(Root::Liabilities)
    }

    pub fn current_liability(&self) -> Result<f64, LookupError> {
        self.root_value(Root::CurrentLiabilities)
    }

    pub fn equity(&self) -> Result<f64, LookupError> {
        self.root_value(Root::StockholdersEquity)
    }

    pub fn cash(&self) -> Result<f64, LookupError> {
        self.root_value(Root::Cash)
    }

    pub fn cash_from_operations(&self) -> Result<f64, LookupError> {
        self.root_value(Root::Operating)
    }

    pub fn cash_from_financing(&self) -> Result<f64, LookupError> {
        self.root_value(Root::Financing)
    }

    pub fn cash_from_investing(&self) -> Result<f64, LookupError> {
        self.root_value(Root::Investing)
    }

    pub fn cash_change(&self) -> Result<f64, LookupError> {
        self.root_value(Root::CashChange)
    }

    pub fn net_income(&self) -> Result<f64, LookupError> {
        self.root_value(Root::NetIncome)
    }

    pub fn pretax_income(&self) -> Result<f64, LookupError> {
        self.root_value(Root::PretaxIncome)
    }
}

fn build_report<S>(
    source: &S,
    statement: Statement,
    role: &str,
    balance_contexts: Option<&[String]>,
    index: &FactIndex,
    config: &ExtractorConfig,
) -> Result<StatementReport, StructuralError>
where
    S: TaxonomySource + ?Sized,
{
    let mut liabilities = None;
    let flatlist = if statement == Statement::Parenthetical {
        locator_entries(source.presentation_concepts(role))
    } else {
        let mut graph = ArcGraph::from_arcs(source.calculation_arcs(role));
        if statement == Statement::BalanceSheet {
            liabilities = repair_balance_sheet(&mut graph, config);
        }
        hierarchy::level(&graph)?
    };
    if flatlist.is_empty() {
        return Err(StructuralError::EmptyRole {
            role: role.to_string(),
        });
    }

    let contexts = match (statement, balance_contexts) {
        (Statement::Parenthetical, Some(contexts)) => contexts.to_vec(),
        (Statement::Parenthetical, None) => {
            relevant_contexts(source, &flatlist, flatlist.len() / 2, config)
        }
        _ => relevant_contexts(source, &flatlist, config.context_tolerance, config),
    };

    let catalogue: Vec<&Context> = contexts.iter().filter_map(|id| source.context(id)).collect();
    let default = default_context(statement, &catalogue, source.document_period_end(), config);

    let template = StatementTree::template(&flatlist);
    let mut trees: BTreeMap<String, StatementTree> = contexts
        .iter()
        .map(|id| (id.clone(), fill(&template, &flatlist, id, index)))
        .collect();

    let liabilities_repaired = liabilities.and_then(|concept| {
        flatlist
            .iter()
            .find(|e| e.concept == concept)
            .map(|e| e.address.clone())
    });
    if let Some(address) = &liabilities_repaired {
        for tree in trees.values_mut() {
            let total = search::sum_items(&flatlist, tree, address, &[]);
            tree.get_or_create(address).value = Some(total);
        }
    }

    Ok(StatementReport {
        statement,
        role: role.to_string(),
        flatlist,
        contexts,
        default_context_fallback: default.as_ref().is_some_and(|d| d.fallback),
        default_context: default.map(|d| d.id),
        trees,
        liabilities_repaired,
    })
}

fn repair_balance_sheet(graph: &mut ArcGraph, config: &ExtractorConfig) -> Option<Concept> {
    if !config.repair_liabilities {
        log::info!("Liabilities repair disabled");
        return None;
    }
    match graph.repair_liabilities() {
        LiabilitiesRepair::Applied {
            liabilities,
            reparented,
        } => {
            log::info!(
                "Synthesized {} over {} line items",
                liabilities,
                reparented.len()
            );
            Some(liabilities)
        }
        LiabilitiesRepair::AlreadyPresent => None,
        LiabilitiesRepair::NoTotal => {
            log::info!("No liabilities and equity total; liabilities repair skipped");
            None
        }
    }
}

/// Depth-0 entries for presentation locators, first occurrence kept.
fn locator_entries(concepts: &[Concept]) -> Vec<FlatEntry> {
    let mut seen = HashSet::new();
    concepts
        .iter()
        .filter(|c| seen.insert(*c))
        .map(|c| FlatEntry::new(c.clone(), 0, PathAddress::root(c.clone())))
        .collect()
}

fn locate_roots(reports: &BTreeMap<Statement, StatementReport>) -> BTreeMap<Root, PathAddress> {
    Root::iter()
        .filter_map(|root| {
            let report = reports.get(&root.statement())?;
            let address = search::address_of(&report.flatlist, root.concept());
            if address.is_none() {
                log::debug!("No line item for the {} root", root);
            }
            address.map(|a| (root, a.clone()))
        })
        .collect()
}
