//! Transition table for the pipeline.
//!
//! `CheckExisting` and `QualityCheck` are the only branch points; every other
//! edge is unconditional. The predicates are pure so they can be tested
//! against synthetic states.

use crate::quality::QualityGate;
use crate::state::{Step, WorkflowState};

/// Branch taken after `CheckExisting`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Discover,
    /// Extract and Index pass through; synthesis uses stored content.
    SkipToSynthesize,
}

/// Branch taken after `QualityCheck`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Continue,
    End,
}

pub fn should_discover_papers(state: &WorkflowState) -> Route {
    if state.skip_discovery {
        Route::SkipToSynthesize
    } else {
        Route::Discover
    }
}

/// Loop back to discovery iff the score is below 50 and retries remain.
///
/// Applies even when the pass synthesized from stored content.
pub fn should_continue(state: &WorkflowState, gate: &QualityGate) -> Decision {
    if gate.should_continue(state.metadata.quality_score, state.metadata.retry_count) {
        Decision::Continue
    } else {
        Decision::End
    }
}

/// The step following `current`.
pub fn next_step(current: Step, state: &WorkflowState, gate: &QualityGate) -> Step {
    match current {
        Step::CheckExisting => match should_discover_papers(state) {
            Route::Discover => Step::Discover,
            Route::SkipToSynthesize => Step::Extract,
        },
        Step::Discover => Step::Extract,
        Step::Extract => Step::Index,
        Step::Index => Step::Synthesize,
        Step::Synthesize => Step::QualityCheck,
        Step::QualityCheck => match should_continue(state, gate) {
            Decision::Continue => Step::Discover,
            Decision::End => Step::Done,
        },
        Step::Done => Step::Done,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> WorkflowState {
        WorkflowState::new("req", "query")
    }

    #[test]
    fn check_existing_branches_on_skip_flag() {
        let gate = QualityGate::default();
        let mut s = state();
        assert_eq!(next_step(Step::CheckExisting, &s, &gate), Step::Discover);
        s.skip_discovery = true;
        assert_eq!(should_discover_papers(&s), Route::SkipToSynthesize);
        assert_eq!(next_step(Step::CheckExisting, &s, &gate), Step::Extract);
    }

    #[test]
    fn linear_edges() {
        let gate = QualityGate::default();
        let s = state();
        assert_eq!(next_step(Step::Discover, &s, &gate), Step::Extract);
        assert_eq!(next_step(Step::Extract, &s, &gate), Step::Index);
        assert_eq!(next_step(Step::Index, &s, &gate), Step::Synthesize);
        assert_eq!(next_step(Step::Synthesize, &s, &gate), Step::QualityCheck);
        assert_eq!(next_step(Step::Done, &s, &gate), Step::Done);
    }

    #[test]
    fn quality_check_loops_until_retries_spent() {
        let gate = QualityGate::default();
        let mut s = state();
        s.metadata.quality_score = 25;

        assert_eq!(next_step(Step::QualityCheck, &s, &gate), Step::Discover);
        s.metadata.retry_count = 2;
        assert_eq!(next_step(Step::QualityCheck, &s, &gate), Step::Done);

        s.metadata.retry_count = 0;
        s.metadata.quality_score = 50;
        assert_eq!(should_continue(&s, &gate), Decision::End);
    }

    #[test]
    fn low_quality_after_skip_still_rediscovers() {
        let gate = QualityGate::default();
        let mut s = state();
        s.skip_discovery = true;
        s.metadata.used_existing_docs = true;
        s.metadata.quality_score = 0;
        assert_eq!(next_step(Step::QualityCheck, &s, &gate), Step::Discover);
    }
}
