//! # Validation Stages
//!
//! ```text
//! Received -> HeaderChecked -> EligibilityChecked -> TransactionsApplied -> Accepted
//!     \             \                  \                      \
//!      +-------------+------------------+----------------------+--> Rejected
//! ```
//!
//! `Accepted` and `Rejected` are terminal.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValidationStage {
    Received,
    HeaderChecked,
    EligibilityChecked,
    TransactionsApplied,
    Accepted,
    Rejected,
}

impl ValidationStage {
    /// Whether no further transition is possible.
    pub fn is_terminal(self) -> bool {
        matches!(self, ValidationStage::Accepted | ValidationStage::Rejected)
    }

    /// The stage a successful check moves to.
    pub fn next(self) -> Option<ValidationStage> {
        match self {
            ValidationStage::Received => Some(ValidationStage::HeaderChecked),
            ValidationStage::HeaderChecked => Some(ValidationStage::EligibilityChecked),
            ValidationStage::EligibilityChecked => Some(ValidationStage::TransactionsApplied),
            ValidationStage::TransactionsApplied => Some(ValidationStage::Accepted),
            ValidationStage::Accepted | ValidationStage::Rejected => None,
        }
    }

    /// Whether `self -> to` is a legal transition.
    pub fn can_transition_to(self, to: ValidationStage) -> bool {
        if self.is_terminal() {
            return false;
        }
        to == ValidationStage::Rejected || self.next() == Some(to)
    }
}

impl std::fmt::Display for ValidationStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ValidationStage::Received => "received",
            ValidationStage::HeaderChecked => "header-checked",
            ValidationStage::EligibilityChecked => "eligibility-checked",
            ValidationStage::TransactionsApplied => "transactions-applied",
            ValidationStage::Accepted => "accepted",
            ValidationStage::Rejected => "rejected",
        };
        f.write_str(name)
    }
}
