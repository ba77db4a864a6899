use serde::{Deserialize, Serialize};

use partsdesk_core::{Decision, ValidatedDecision};

/// Body of `POST /approvals/part-request/{id}`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionBody {
    pub status: Decision,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comments: Option<String>,
}

impl From<&ValidatedDecision> for DecisionBody {
    fn from(decision: &ValidatedDecision) -> Self {
        Self { status: decision.decision, comments: decision.comments.clone() }
    }
}

/// Header carrying the acting user on every mutating call.
pub const ACTING_USER_HEADER: &str = "userId";
