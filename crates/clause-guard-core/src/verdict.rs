use std::fmt;

use serde::{Deserialize, Serialize};

use crate::clauses::RiskDistribution;

/// Overall accept/revise/reject recommendation for a contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Reject,
    ReviseRecommended,
    Acceptable,
}

/// How loudly a presenter should surface a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Success,
}

impl Verdict {
    pub fn message(self) -> &'static str {
        match self {
            Verdict::Reject => {
                "Do NOT accept this contract in current form. Review highlighted clauses before approval."
            }
            Verdict::ReviseRecommended => {
                "Review recommended changes before proceeding with contract approval."
            }
            Verdict::Acceptable => "Contract appears acceptable with minor considerations.",
        }
    }

    pub fn severity(self) -> Severity {
        match self {
            Verdict::Reject => Severity::Error,
            Verdict::ReviseRecommended => Severity::Warning,
            Verdict::Acceptable => Severity::Success,
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// Apply the decision policy; the first matching rule wins.
///
/// 1. Any High-risk clause rejects the contract.
/// 2. Medium-risk clauses forming a strict majority (`medium > total / 2`)
///    call for revision. An exact 50% split does not.
/// 3. Otherwise the contract is acceptable.
pub fn decide(distribution: &RiskDistribution) -> Verdict {
    if distribution.high > 0 {
        Verdict::Reject
    } else if distribution.medium * 2 > distribution.total() {
        Verdict::ReviseRecommended
    } else {
        Verdict::Acceptable
    }
}
