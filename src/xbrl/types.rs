use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A taxonomy item identifier such as `us-gaap:Assets`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Concept(String);

impl Concept {
    pub fn new(name: impl Into<String>) -> Self {
        Concept(name.into())
    }

    /// Builds a concept from a locator href fragment (`us-gaap_Assets`).
    pub fn from_fragment(fragment: &str) -> Self {
        match fragment.split_once('_') {
            Some((prefix, name)) if !prefix.is_empty() && !name.is_empty() => {
                Concept(format!("{}:{}", prefix, name))
            }
            _ => Concept(fragment.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn prefix(&self) -> Option<&str> {
        self.0.split_once(':').map(|(prefix, _)| prefix)
    }

    pub fn local_name(&self) -> &str {
        self.0.rsplit_once(':').map_or(self.0.as_str(), |(_, name)| name)
    }

    /// A sibling concept in the same namespace, e.g. `us-gaap:Liabilities`
    /// next to `us-gaap:LiabilitiesAndStockholdersEquity`.
    pub fn sibling(&self, local_name: &str) -> Concept {
        match self.prefix() {
            Some(prefix) => Concept(format!("{}:{}", prefix, local_name)),
            None => Concept(local_name.to_string()),
        }
    }

    /// Key used to match instance facts against linkbase concepts.
    pub fn match_key(&self, max_len: usize) -> String {
        self.local_name()
            .chars()
            .take(max_len)
            .collect::<String>()
            .to_lowercase()
    }
}

impl fmt::Display for Concept {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Concept {
    fn from(name: &str) -> Self {
        Concept::new(name)
    }
}

/// An extension role declared in the taxonomy schema.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RoleType {
    pub uri: String,
    pub definition: String,
}

/// `from` is the total that `to` contributes to.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CalculationArc {
    pub from: Concept,
    pub to: Concept,
}

impl CalculationArc {
    pub fn new(from: impl Into<Concept>, to: impl Into<Concept>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Period {
    Instant(NaiveDate),
    Duration { start: NaiveDate, end: NaiveDate },
}

impl Period {
    pub fn end_date(&self) -> NaiveDate {
        match self {
            Period::Instant(date) => *date,
            Period::Duration { end, .. } => *end,
        }
    }

    pub fn span_days(&self) -> i64 {
        match self {
            Period::Instant(_) => 0,
            Period::Duration { start, end } => end.signed_duration_since(*start).num_days(),
        }
    }
}

/// A reporting period plus whether it is narrowed to a sub-entity.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Context {
    pub id: String,
    pub period: Period,
    pub has_segment: bool,
}

/// A tagged value from the instance document.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Fact {
    pub concept: Concept,
    pub context_ref: String,
    pub value: String,
    /// Precision as filed. Kept for callers; values are read as written.
    pub decimals: Option<String>,
    /// `-` when the value is presented without its minus sign.
    pub sign: Option<String>,
}

impl Fact {
    pub fn new(concept: impl Into<Concept>, context_ref: &str, value: &str) -> Self {
        Self {
            concept: concept.into(),
            context_ref: context_ref.to_string(),
            value: value.to_string(),
            decimals: None,
            sign: None,
        }
    }

    /// True when the source presents the magnitude without its minus sign.
    pub fn is_negated(&self) -> bool {
        self.sign.as_deref().map(str::trim) == Some("-")
    }
}
