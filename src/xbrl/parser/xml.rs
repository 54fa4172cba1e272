use anyhow::{Context as _, Result};
use chrono::NaiveDate;
use itertools::Itertools;
use roxmltree::{Document, Node};
use std::collections::HashMap;
use unicode_normalization::UnicodeNormalization;

use crate::xbrl::types::{CalculationArc, Concept, Context, Fact, Period, RoleType};

const XLINK_NS: &str = "http://www.w3.org/1999/xlink";

// Root children of an instance that never carry facts
const NON_FACT_ELEMENTS: [&str; 7] = [
    "context",
    "unit",
    "schemaRef",
    "linkbaseRef",
    "roleRef",
    "arcroleRef",
    "footnoteLink",
];

/// Contexts, facts and the reporting date read from an instance document.
#[derive(Clone, Debug, Default)]
pub struct Instance {
    pub facts: Vec<Fact>,
    pub contexts: HashMap<String, Context>,
    pub period_end: Option<NaiveDate>,
}

fn xlink<'a>(node: &Node<'a, '_>, name: &str) -> Option<&'a str> {
    node.attribute((XLINK_NS, name))
}

/// Reads every `link:roleType` of a taxonomy schema.
pub fn parse_schema_roles(content: &str) -> Result<Vec<RoleType>> {
    let xml_tree = Document::parse(content).context("Error parsing taxonomy schema")?;

    let roles = xml_tree
        .descendants()
        .filter(|n| n.has_tag_name("roleType"))
        .filter_map(|role| {
            let uri = role.attribute("roleURI")?;
            let definition = role
                .children()
                .find(|n| n.has_tag_name("definition"))
                .and_then(|n| n.text())
                .unwrap_or("");
            log::debug!("Role {} -- {}", uri, definition);
            Some(RoleType {
                uri: uri.to_string(),
                definition: definition.trim().to_string(),
            })
        })
        .collect();

    Ok(roles)
}

/// Maps `xlink:label` to the concept its locator points at.
fn locator_map<'a>(link: Node<'a, '_>) -> HashMap<&'a str, Concept> {
    link.children()
        .filter(|n| n.has_tag_name("loc"))
        .filter_map(|loc| {
            let label = xlink(&loc, "label")?;
            let href = xlink(&loc, "href")?;
            let fragment = href.rsplit('#').next().unwrap_or(href);
            Some((label, Concept::from_fragment(fragment)))
        })
        .collect()
}

/// Calculation arcs grouped by the extended link role they belong to.
pub fn parse_calculation_linkbase(content: &str) -> Result<HashMap<String, Vec<CalculationArc>>> {
    let xml_tree = Document::parse(content).context("Error parsing calculation linkbase")?;
    let mut arcs: HashMap<String, Vec<CalculationArc>> = HashMap::new();

    for link in xml_tree
        .descendants()
        .filter(|n| n.has_tag_name("calculationLink"))
    {
        let Some(role) = xlink(&link, "role") else {
            continue;
        };
        let locators = locator_map(link);

        for arc in link.children().filter(|n| n.has_tag_name("calculationArc")) {
            let from = xlink(&arc, "from").and_then(|label| locators.get(label));
            let to = xlink(&arc, "to").and_then(|label| locators.get(label));
            match (from, to) {
                (Some(from), Some(to)) => {
                    arcs.entry(role.to_string())
                        .or_default()
                        .push(CalculationArc::new(from.clone(), to.clone()));
                }
                _ => log::debug!("Skipping calculation arc with unresolved locator in {}", role),
            }
        }
    }

    Ok(arcs)
}

/// Non-abstract locator concepts per presentation role, in document order.
pub fn parse_presentation_linkbase(content: &str) -> Result<HashMap<String, Vec<Concept>>> {
    let xml_tree = Document::parse(content).context("Error parsing presentation linkbase")?;
    let mut concepts: HashMap<String, Vec<Concept>> = HashMap::new();

    for link in xml_tree
        .descendants()
        .filter(|n| n.has_tag_name("presentationLink"))
    {
        let Some(role) = xlink(&link, "role") else {
            continue;
        };
        let entry = concepts.entry(role.to_string()).or_default();

        let locs = link
            .children()
            .filter(|n| n.has_tag_name("loc"))
            .filter_map(|loc| xlink(&loc, "href"))
            .map(|href| Concept::from_fragment(href.rsplit('#').next().unwrap_or(href)))
            .filter(|concept| !concept.local_name().to_lowercase().contains("abstract"));

        for concept in locs {
            if !entry.contains(&concept) {
                entry.push(concept);
            }
        }
    }

    Ok(concepts)
}

fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    let head = raw.get(..10).unwrap_or(raw);
    NaiveDate::parse_from_str(head, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(raw, "%B %d, %Y"))
        .ok()
}

fn parse_context(node: Node) -> Option<Context> {
    let id = node.attribute("id")?;
    let period = node.children().find(|n| n.has_tag_name("period"))?;

    let child_date = |name: &str| {
        period
            .children()
            .find(|n| n.has_tag_name(name))
            .and_then(|n| n.text())
            .and_then(parse_date)
    };

    let period = match child_date("instant") {
        Some(date) => Period::Instant(date),
        None => Period::Duration {
            start: child_date("startDate")?,
            end: child_date("endDate")?,
        },
    };

    let has_segment = node.descendants().any(|n| n.has_tag_name("segment"));

    Some(Context {
        id: id.to_string(),
        period,
        has_segment,
    })
}

/// Reads contexts and facts from an XBRL instance document.
pub fn parse_instance(content: &str) -> Result<Instance> {
    let xml_tree = Document::parse(content).context("Error parsing instance document")?;
    let root = xml_tree.root_element();

    let mut instance = Instance::default();

    for node in root.children().filter(|n| n.has_tag_name("context")) {
        match parse_context(node) {
            Some(context) => {
                log::debug!("Context {} {:?}", context.id, context.period);
                instance.contexts.insert(context.id.clone(), context);
            }
            None => log::debug!("Skipping malformed context {:?}", node.attribute("id")),
        }
    }

    let fact_nodes = root.children().filter(|n| {
        n.is_element()
            && n.tag_name().namespace().is_some()
            && !NON_FACT_ELEMENTS.contains(&n.tag_name().name())
    });

    for node in fact_nodes {
        let Some(context_ref) = node.attribute("contextRef") else {
            continue;
        };
        let name = node.tag_name().name();
        let namespace = node.tag_name().namespace().unwrap_or("");
        let prefix = node.lookup_prefix(namespace).unwrap_or("");
        let value = node
            .text()
            .unwrap_or("")
            .nfkc()
            .collect::<String>()
            .trim()
            .to_string();

        if name == "DocumentPeriodEndDate" {
            instance.period_end = parse_date(&value);
        }

        let concept = if prefix.is_empty() {
            Concept::new(name)
        } else {
            Concept::new(format!("{}:{}", prefix, name))
        };

        instance.facts.push(Fact {
            concept,
            context_ref: context_ref.to_string(),
            value,
            decimals: node.attribute("decimals").map(String::from),
            sign: node.attribute("sign").map(String::from),
        });
    }

    log::debug!(
        "Instance has {} facts over {} contexts ({})",
        instance.facts.len(),
        instance.contexts.len(),
        instance.contexts.keys().sorted().join(", ")
    );

    Ok(instance)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCHEMA: &str = r#"<?xml version="1.0"?>
<xsd:schema xmlns:xsd="http://www.w3.org/2001/XMLSchema" xmlns:link="http://www.xbrl.org/2003/linkbase">
  <xsd:annotation><xsd:appinfo>
    <link:roleType roleURI="http://acme.com/role/BalanceSheet" id="BalanceSheet">
      <link:definition>2101 - Statement - Condensed Balance Sheets</link:definition>
    </link:roleType>
    <link:roleType roleURI="http://acme.com/role/Cover" id="Cover">
      <link:definition>0001 - Document - Cover</link:definition>
    </link:roleType>
  </xsd:appinfo></xsd:annotation>
</xsd:schema>"#;

    const CALCULATION: &str = r#"<?xml version="1.0"?>
<link:linkbase xmlns:link="http://www.xbrl.org/2003/linkbase" xmlns:xlink="http://www.w3.org/1999/xlink">
  <link:calculationLink xlink:type="extended" xlink:role="http://acme.com/role/BalanceSheet">
    <link:loc xlink:type="locator" xlink:href="us-gaap.xsd#us-gaap_Assets" xlink:label="loc_Assets"/>
    <link:loc xlink:type="locator" xlink:href="us-gaap.xsd#us-gaap_AssetsCurrent" xlink:label="loc_AssetsCurrent"/>
    <link:calculationArc xlink:type="arc" xlink:from="loc_Assets" xlink:to="loc_AssetsCurrent" weight="1"/>
    <link:calculationArc xlink:type="arc" xlink:from="loc_Assets" xlink:to="loc_Missing" weight="1"/>
  </link:calculationLink>
</link:linkbase>"#;

    const PRESENTATION: &str = r#"<?xml version="1.0"?>
<link:linkbase xmlns:link="http://www.xbrl.org/2003/linkbase" xmlns:xlink="http://www.w3.org/1999/xlink">
  <link:presentationLink xlink:type="extended" xlink:role="http://acme.com/role/Parenthetical">
    <link:loc xlink:type="locator" xlink:href="us-gaap.xsd#us-gaap_StatementOfFinancialPositionAbstract" xlink:label="a"/>
    <link:loc xlink:type="locator" xlink:href="us-gaap.xsd#us-gaap_CommonStockSharesIssued" xlink:label="b"/>
    <link:loc xlink:type="locator" xlink:href="us-gaap.xsd#us-gaap_CommonStockSharesIssued" xlink:label="c"/>
  </link:presentationLink>
</link:linkbase>"#;

    const INSTANCE: &str = r#"<?xml version="1.0"?>
<xbrli:xbrl xmlns:xbrli="http://www.xbrl.org/2003/instance" xmlns:us-gaap="http://fasb.org/us-gaap/2023" xmlns:dei="http://xbrl.sec.gov/dei/2023" xmlns:xbrldi="http://xbrl.org/2006/xbrldi">
  <xbrli:context id="c1">
    <xbrli:entity><xbrli:identifier scheme="http://www.sec.gov/CIK">0000001</xbrli:identifier></xbrli:entity>
    <xbrli:period><xbrli:instant>2023-09-30</xbrli:instant></xbrli:period>
  </xbrli:context>
  <xbrli:context id="c2">
    <xbrli:entity>
      <xbrli:identifier scheme="http://www.sec.gov/CIK">0000001</xbrli:identifier>
      <xbrli:segment><xbrldi:explicitMember dimension="us-gaap:StatementBusinessSegmentsAxis">acme:WidgetsMember</xbrldi:explicitMember></xbrli:segment>
    </xbrli:entity>
    <xbrli:period><xbrli:startDate>2023-07-01</xbrli:startDate><xbrli:endDate>2023-09-30</xbrli:endDate></xbrli:period>
  </xbrli:context>
  <dei:DocumentPeriodEndDate contextRef="c2">2023-09-30</dei:DocumentPeriodEndDate>
  <us-gaap:Assets contextRef="c1" unitRef="usd" decimals="-6">1000</us-gaap:Assets>
  <us-gaap:AssetsCurrent contextRef="c1" unitRef="usd" decimals="-6" sign="-"> 400 </us-gaap:AssetsCurrent>
</xbrli:xbrl>"#;

    #[test]
    fn test_parse_schema_roles() {
        let roles = parse_schema_roles(SCHEMA).unwrap();
        assert_eq!(roles.len(), 2);
        assert_eq!(roles[0].uri, "http://acme.com/role/BalanceSheet");
        assert_eq!(roles[0].definition, "2101 - Statement - Condensed Balance Sheets");
    }

    #[test]
    fn test_parse_calculation_linkbase_skips_unresolved() {
        let arcs = parse_calculation_linkbase(CALCULATION).unwrap();
        let arcs = &arcs["http://acme.com/role/BalanceSheet"];
        assert_eq!(arcs, &vec![CalculationArc::new("us-gaap:Assets", "us-gaap:AssetsCurrent")]);
    }

    #[test]
    fn test_parse_presentation_linkbase_drops_abstracts() {
        let concepts = parse_presentation_linkbase(PRESENTATION).unwrap();
        assert_eq!(
            concepts["http://acme.com/role/Parenthetical"],
            vec![Concept::new("us-gaap:CommonStockSharesIssued")]
        );
    }

    #[test]
    fn test_parse_instance() {
        let instance = parse_instance(INSTANCE).unwrap();

        assert_eq!(instance.period_end, NaiveDate::from_ymd_opt(2023, 9, 30));
        assert!(!instance.contexts["c1"].has_segment);
        assert!(instance.contexts["c2"].has_segment);
        assert_eq!(instance.contexts["c2"].period.span_days(), 91);

        let current = instance
            .facts
            .iter()
            .find(|f| f.concept.as_str() == "us-gaap:AssetsCurrent")
            .unwrap();
        assert_eq!(current.value, "400");
        assert!(current.is_negated());
        assert_eq!(current.decimals.as_deref(), Some("-6"));
        assert_eq!(instance.facts.len(), 3);
    }
}
