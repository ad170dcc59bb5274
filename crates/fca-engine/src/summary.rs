//! Compliance-step summarizer
//!
//! Pure derivation of the human-facing progress indicator. Milestone order is
//! fixed; "all complete" is its own terminal display state rather than an
//! index past the end.

use serde::{Deserialize, Serialize};

/// The five named compliance milestones, in fixed process order.
pub const MILESTONES: [&str; 5] = [
    "Conditional Offer",
    "Individualized Assessment",
    "Preliminary Revocation Notice",
    "Candidate Reassessment",
    "Final Decision",
];

/// Named-milestone completion flags from the authoritative store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MilestoneFlags {
    pub offer_letter: bool,
    pub assessment: bool,
    pub revocation_notice: bool,
    pub reassessment: bool,
    pub final_revocation: bool,
}

impl MilestoneFlags {
    fn as_array(self) -> [bool; 5] {
        [
            self.offer_letter,
            self.assessment,
            self.revocation_notice,
            self.reassessment,
            self.final_revocation,
        ]
    }
}

/// Either per-milestone flags or a legacy cached step number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressInput {
    Flags(MilestoneFlags),
    /// Cached 1-based step number from an older client.
    LegacyStep(u8),
}

/// Derived progress indicator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressSummary {
    /// Completed milestone labels, in fixed order.
    pub completed: Vec<&'static str>,
    /// The milestone currently in progress; `None` once all are complete.
    pub current: Option<&'static str>,
    pub all_complete: bool,
}

/// Derive the progress summary from either input shape.
#[must_use]
pub fn summarize(input: ProgressInput) -> ProgressSummary {
    let done: [bool; 5] = match input {
        ProgressInput::Flags(flags) => flags.as_array(),
        ProgressInput::LegacyStep(step) => {
            let mut done = [false; 5];
            for (index, slot) in done.iter_mut().enumerate() {
                // Step N means milestones 1..N-1 are behind us.
                *slot = (index as u8) < step.saturating_sub(1);
            }
            done
        }
    };

    let completed: Vec<&'static str> = MILESTONES
        .iter()
        .zip(done)
        .filter_map(|(label, complete)| complete.then_some(*label))
        .collect();
    let current = MILESTONES
        .iter()
        .zip(done)
        .find_map(|(label, complete)| (!complete).then_some(*label));

    ProgressSummary {
        completed,
        all_complete: current.is_none(),
        current,
    }
}
