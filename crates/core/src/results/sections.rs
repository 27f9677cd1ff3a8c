//! # Result Sections
//!
//! Turns a [`Contract`] into the ordered list of sections a live result page
//! shows. The order is fixed by [`SECTION_ORDER`]; payload content decides
//! only whether an optional section is present.

use serde::{Deserialize, Serialize};

use super::contract::{
    Contract, LeverageAction, Orientation, SignalRow, TeaserCounts, TOP_MATCH_LIMIT,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionKind {
    TopMatches,
    Misaligned,
    Orientation,
    Leverage,
    Teaser,
    Diagnostics,
}

/// Render order of a live page
pub const SECTION_ORDER: [SectionKind; 6] = [
    SectionKind::TopMatches,
    SectionKind::Misaligned,
    SectionKind::Orientation,
    SectionKind::Leverage,
    SectionKind::Teaser,
    SectionKind::Diagnostics,
];

/// A rendered section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum Section {
    TopMatches(Vec<SignalRow>),
    Misaligned(Vec<SignalRow>),
    Orientation(Orientation),
    Leverage(Vec<LeverageAction>),
    Teaser(TeaserCounts),
    Diagnostics(serde_json::Value),
}

impl Section {
    pub fn kind(&self) -> SectionKind {
        match self {
            Section::TopMatches(_) => SectionKind::TopMatches,
            Section::Misaligned(_) => SectionKind::Misaligned,
            Section::Orientation(_) => SectionKind::Orientation,
            Section::Leverage(_) => SectionKind::Leverage,
            Section::Teaser(_) => SectionKind::Teaser,
            Section::Diagnostics(_) => SectionKind::Diagnostics,
        }
    }
}

/// Build the sections for `contract` in [`SECTION_ORDER`].
pub fn render_sections(contract: &Contract) -> Vec<Section> {
    SECTION_ORDER
        .iter()
        .filter_map(|kind| section_for(*kind, contract))
        .collect()
}

fn section_for(kind: SectionKind, contract: &Contract) -> Option<Section> {
    match kind {
        SectionKind::TopMatches => non_empty(ranked(&contract.top_matches)).map(Section::TopMatches),
        SectionKind::Misaligned => non_empty(contract.misaligned.clone()).map(Section::Misaligned),
        SectionKind::Orientation => contract
            .orientation
            .as_ref()
            .filter(|o| !o.is_empty())
            .cloned()
            .map(Section::Orientation),
        SectionKind::Leverage => contract
            .leverage
            .as_ref()
            .and_then(|actions| non_empty(actions.clone()))
            .map(Section::Leverage),
        SectionKind::Teaser => contract
            .teaser
            .filter(|t| !t.is_empty())
            .map(Section::Teaser),
        SectionKind::Diagnostics => contract
            .diagnostics
            .as_ref()
            .filter(|d| !is_blank(d))
            .cloned()
            .map(Section::Diagnostics),
    }
}

/// Strongest signal first, capped at [`TOP_MATCH_LIMIT`]. Ties keep payload order.
fn ranked(rows: &[SignalRow]) -> Vec<SignalRow> {
    let mut rows = rows.to_vec();
    rows.sort_by(|a, b| b.signal.total_cmp(&a.signal));
    rows.truncate(TOP_MATCH_LIMIT);
    rows
}

fn non_empty<T>(items: Vec<T>) -> Option<Vec<T>> {
    (!items.is_empty()).then_some(items)
}

fn is_blank(value: &serde_json::Value) -> bool {
    match value {
        serde_json::Value::Null => true,
        serde_json::Value::Object(map) => map.is_empty(),
        serde_json::Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::results::contract::fixtures::{contract, row};
    use crate::results::contract::FitTier;
    use serde_json::json;

    fn kinds(sections: &[Section]) -> Vec<SectionKind> {
        sections.iter().map(Section::kind).collect()
    }

    #[test]
    fn test_top_and_misaligned_only() {
        let sections = render_sections(&contract(5, 3));
        assert_eq!(
            kinds(&sections),
            vec![SectionKind::TopMatches, SectionKind::Misaligned]
        );
    }

    #[test]
    fn test_full_contract_keeps_fixed_order() {
        let mut full = contract(2, 1);
        // Populate in a different order than rendered
        full.diagnostics = Some(json!({"model": "signals-v3"}));
        full.teaser = Some(TeaserCounts {
            locked_matches: 12,
            locked_signals: 40,
        });
        full.leverage = Some(vec![LeverageAction {
            title: "Lead with net revenue retention".to_string(),
            detail: None,
        }]);
        full.orientation = Some(Orientation {
            statements: vec!["Reads as infra, not SaaS".to_string()],
            trust_summary: None,
        });

        assert_eq!(kinds(&render_sections(&full)), SECTION_ORDER.to_vec());
    }

    #[test]
    fn test_empty_optional_sections_are_omitted() {
        let mut partial = contract(1, 0);
        partial.orientation = Some(Orientation::default());
        partial.leverage = Some(vec![]);
        partial.teaser = Some(TeaserCounts::default());
        partial.diagnostics = Some(json!({}));

        assert_eq!(kinds(&render_sections(&partial)), vec![SectionKind::TopMatches]);
    }

    #[test]
    fn test_top_matches_ranked_and_capped() {
        let mut c = contract(0, 0);
        c.top_matches = vec![
            row("a", 40.0, FitTier::Moderate),
            row("b", 95.0, FitTier::Strong),
            row("c", 70.0, FitTier::Good),
            row("d", 10.0, FitTier::Weak),
            row("e", 88.0, FitTier::Strong),
            row("f", 55.0, FitTier::Good),
        ];

        let sections = render_sections(&c);
        let Section::TopMatches(rows) = &sections[0] else {
            panic!("expected top matches first");
        };
        let ids: Vec<&str> = rows.iter().map(|r| r.investor.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "e", "c", "f", "a"]);
    }

    #[test]
    fn test_section_serialization() {
        let section = Section::Teaser(TeaserCounts {
            locked_matches: 3,
            locked_signals: 0,
        });
        let json = serde_json::to_string(&section).unwrap();
        assert!(json.contains("\"kind\":\"teaser\""));
        assert!(json.contains("\"locked_matches\":3"));
    }
}
