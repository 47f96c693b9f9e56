//! Compliance aggregation over a clause store.
//!
//! Summary points and recommendations are driven by ordered rule tables of
//! `(predicate, message)` pairs; every rule is evaluated independently, in
//! table order.

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::clauses::{ClauseStore, EmptyInput, RiskDistribution, RiskLevel};

pub const GDPR_MARKER: &str = "GDPR";
pub const HIPAA_MARKER: &str = "HIPAA";
pub const LIABILITY_MARKER: &str = "liability";

pub const FALLBACK_RECOMMENDATION: &str = "All clauses appear to be in good standing.";

/// Raw signals the rule tables are evaluated against.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FindingCounts {
    /// Records whose `regulation` contains `GDPR` (substring, case-sensitive).
    pub gdpr_issues: usize,
    /// Records whose `regulation` contains `HIPAA` (substring, case-sensitive).
    pub hipaa_issues: usize,
    pub high_risk: usize,
    /// Records whose `key_clauses` mention liability (case-insensitive).
    pub liability_tagged: usize,
}

impl FindingCounts {
    pub fn from_store(store: &ClauseStore) -> Self {
        let mut counts = Self::default();
        for record in store {
            if record.regulation.contains(GDPR_MARKER) {
                counts.gdpr_issues += 1;
            }
            if record.regulation.contains(HIPAA_MARKER) {
                counts.hipaa_issues += 1;
            }
            if record.risk_level == RiskLevel::High {
                counts.high_risk += 1;
            }
            if record.key_clauses.to_lowercase().contains(LIABILITY_MARKER) {
                counts.liability_tagged += 1;
            }
        }
        counts
    }
}

/// A conditional message: emitted when `applies` holds.
#[derive(Clone, Copy)]
pub struct MessageRule {
    pub applies: fn(&FindingCounts) -> bool,
    pub message: &'static str,
}

impl MessageRule {
    const fn new(applies: fn(&FindingCounts) -> bool, message: &'static str) -> Self {
        Self { applies, message }
    }
}

pub const SUMMARY_RULES: &[MessageRule] = &[
    MessageRule::new(
        |c| c.gdpr_issues > 0,
        "Data retention terms conflict with GDPR.",
    ),
    MessageRule::new(
        |c| c.hipaa_issues > 0,
        "Access control and encryption measures are compliant.",
    ),
    MessageRule::new(
        |c| c.high_risk > 0,
        "Liability clause is missing, which may increase legal risks.",
    ),
];

pub const RECOMMENDATION_RULES: &[MessageRule] = &[
    MessageRule::new(
        |c| c.gdpr_issues > 0,
        "Update retention policy to match GDPR timelines.",
    ),
    MessageRule::new(
        |c| c.liability_tagged > 0,
        "Include liability clause to reduce legal exposure.",
    ),
];

/// Evaluate a rule table in order, collecting the messages of matching rules.
pub fn evaluate_rules(rules: &[MessageRule], counts: &FindingCounts) -> Vec<String> {
    rules
        .iter()
        .filter(|rule| (rule.applies)(counts))
        .map(|rule| rule.message.to_string())
        .collect()
}

/// Derived compliance statistics; recomputed on every render, never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregatedSummary {
    pub gdpr_issues: usize,
    pub hipaa_issues: usize,
    pub high_risk: usize,
    pub total: usize,
    pub distribution: RiskDistribution,
    pub summary_points: Vec<String>,
    pub recommendations: Vec<String>,
}

impl AggregatedSummary {
    /// True when only the fallback recommendation was produced.
    pub fn in_good_standing(&self) -> bool {
        self.recommendations.len() == 1 && self.recommendations[0] == FALLBACK_RECOMMENDATION
    }
}

#[instrument(name = "aggregate_store", skip(store), fields(clauses = store.len()))]
pub fn aggregate(store: &ClauseStore) -> Result<AggregatedSummary, EmptyInput> {
    let store = store.require_non_empty()?;
    let counts = FindingCounts::from_store(store);
    let summary_points = evaluate_rules(SUMMARY_RULES, &counts);
    let mut recommendations = evaluate_rules(RECOMMENDATION_RULES, &counts);
    if recommendations.is_empty() {
        recommendations.push(FALLBACK_RECOMMENDATION.to_string());
    }
    debug!(
        gdpr = counts.gdpr_issues,
        hipaa = counts.hipaa_issues,
        high = counts.high_risk,
        "aggregated compliance counts"
    );

    Ok(AggregatedSummary {
        gdpr_issues: counts.gdpr_issues,
        hipaa_issues: counts.hipaa_issues,
        high_risk: counts.high_risk,
        total: store.len(),
        distribution: store.distribution(),
        summary_points,
        recommendations,
    })
}
