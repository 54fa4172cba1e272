use std::collections::BTreeMap;
use strum::IntoEnumIterator;

use super::Statement;
use crate::xbrl::types::RoleType;

/// HTML-unescapes a role definition, drops everything but letters, digits
/// and spaces, and lower-cases the result.
pub fn normalize_definition(definition: &str) -> String {
    html_escape::decode_html_entities(definition)
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == ' ')
        .collect::<String>()
        .to_lowercase()
}

/// Keyword hits of a definition for one statement, or 0 if the definition is
/// not eligible. Only statement roles count, and only the parenthetical key
/// accepts parenthetical roles.
pub fn score(definition: &str, statement: Statement) -> usize {
    let normalized = normalize_definition(definition);
    if !normalized.contains("statement") {
        return 0;
    }

    let parenthetical = normalized.contains("parenthetical");
    if parenthetical != (statement == Statement::Parenthetical) {
        return 0;
    }

    let keywords = statement.keywords();
    normalized
        .split_whitespace()
        .map(|word| keywords.iter().filter(|k| **k == word).count())
        .sum()
}

/// Best scoring role for a statement; the first role wins ties.
pub fn classify<'a>(roles: &'a [RoleType], statement: Statement) -> Option<&'a RoleType> {
    let mut best: Option<(&RoleType, usize)> = None;
    for role in roles {
        let hits = score(&role.definition, statement);
        if hits > best.map_or(0, |(_, top)| top) {
            best = Some((role, hits));
        }
    }

    if let Some((role, hits)) = best {
        log::debug!("{} -> {} ({} hits)", statement, role.uri, hits);
    }
    best.map(|(role, _)| role)
}

/// Classifies every statement independently. One role may win several
/// statements; no exclusivity is enforced.
pub fn classify_all(roles: &[RoleType]) -> BTreeMap<Statement, String> {
    let assignments: BTreeMap<Statement, String> = Statement::iter()
        .filter_map(|statement| classify(roles, statement).map(|r| (statement, r.uri.clone())))
        .collect();

    let mut seen: BTreeMap<&str, Statement> = BTreeMap::new();
    for (statement, uri) in &assignments {
        if let Some(previous) = seen.insert(uri.as_str(), *statement) {
            log::warn!("Role {} classified as both {} and {}", uri, previous, statement);
        }
    }

    assignments
}
