//! Navigation resolver: pure functions from (step, answer, history) to a
//! destination. Nothing here mutates history or the cache.

use serde::Serialize;

use crate::config::RouteConfig;
use crate::session::model::{ProfilePatch, SessionEntity};

use super::history::{HistoryStack, Previous};
use super::registry::{StepId, Transition};

/// Abstract navigation instruction emitted by the core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "step", rename_all = "snake_case")]
pub enum Destination {
    /// The flow's landing page.
    EntryPoint,
    Step(StepId),
    /// Questionnaire finished; continue outside the flow.
    Completion,
}

impl Destination {
    /// Concrete route for this destination.
    pub fn route(&self, routes: &RouteConfig) -> String {
        match self {
            Self::EntryPoint => routes.entry_route.clone(),
            Self::Step(step) => format!("{}/{step}", routes.question_prefix.trim_end_matches('/')),
            Self::Completion => routes.completion_route.clone(),
        }
    }
}

impl From<Transition> for Destination {
    fn from(t: Transition) -> Self {
        match t {
            Transition::Step(step) => Self::Step(step),
            Transition::Complete => Self::Completion,
        }
    }
}

impl From<Previous> for Destination {
    fn from(p: Previous) -> Self {
        match p {
            Previous::EntryPoint => Self::EntryPoint,
            Previous::Step(step) => Self::Step(step),
        }
    }
}

/// Where "next" goes from `step`.
///
/// With no `answer` (the unchanged, not-resubmitted path) the last known
/// value from `cached` is used, so the result matches what the original
/// submission produced.
pub fn compute_next(
    step: StepId,
    answer: Option<&ProfilePatch>,
    cached: &SessionEntity,
) -> Destination {
    let transition = match answer {
        Some(answer) => step.next(Some(answer)),
        None => {
            let last_known = cached.project(step.fields());
            step.next(Some(&last_known))
        }
    };
    transition.into()
}

/// Where "back" goes from `step`.
pub fn compute_back(step: StepId, history: &HistoryStack) -> Destination {
    history.previous_of(step).into()
}

/// Whether "back" leads to another question rather than the entry point.
pub fn is_back_allowed(step: StepId, history: &HistoryStack) -> bool {
    matches!(history.previous_of(step), Previous::Step(_))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::model::Religion;

    #[test]
    fn scenario_a_empty_history_goes_to_entry_point() {
        let history = HistoryStack::new();
        assert_eq!(compute_back(StepId::Gender, &history), Destination::EntryPoint);
        assert!(!is_back_allowed(StepId::Gender, &history));
    }

    #[test]
    fn scenario_b_found_step_goes_to_predecessor() {
        let history = HistoryStack::from_steps([StepId::Gender, StepId::Age]);
        assert_eq!(
            compute_back(StepId::Age, &history),
            Destination::Step(StepId::Gender)
        );
        assert!(is_back_allowed(StepId::Age, &history));
        assert!(!is_back_allowed(StepId::Gender, &history));
    }

    #[test]
    fn scenario_c_unpushed_step_falls_back() {
        let history = HistoryStack::from_steps([StepId::Gender]);
        assert_eq!(
            compute_back(StepId::Location, &history),
            Destination::Step(StepId::Gender)
        );
        assert!(is_back_allowed(StepId::Location, &history));
    }

    #[test]
    fn next_without_answer_uses_cached_value() {
        let cached = SessionEntity {
            religion: Some(Religion::NotApplicable),
            ..Default::default()
        };
        assert_eq!(
            compute_next(StepId::Religion, None, &cached),
            Destination::Step(StepId::LgbtqPreference)
        );
        assert_eq!(
            compute_next(StepId::Religion, None, &SessionEntity::default()),
            Destination::Step(StepId::ReligiousImportance)
        );
    }

    #[test]
    fn next_prefers_submitted_answer() {
        let cached = SessionEntity {
            religion: Some(Religion::NotApplicable),
            ..Default::default()
        };
        let answer = ProfilePatch {
            religion: Some(Religion::Hindu),
            ..Default::default()
        };
        assert_eq!(
            compute_next(StepId::Religion, Some(&answer), &cached),
            Destination::Step(StepId::ReligiousImportance)
        );
    }

    #[test]
    fn last_step_completes() {
        assert_eq!(
            compute_next(StepId::TherapyNeeds, None, &SessionEntity::default()),
            Destination::Completion
        );
    }

    #[test]
    fn routes_render() {
        let routes = RouteConfig::default();
        assert_eq!(Destination::EntryPoint.route(&routes), "/");
        assert_eq!(
            Destination::Step(StepId::ReligiousImportance).route(&routes),
            "/questions/religious-importance"
        );
        assert_eq!(
            Destination::Completion.route(&routes),
            "/personality-tests/introduction?type=patient"
        );
    }

    #[test]
    fn computing_back_does_not_mutate_history() {
        let history = HistoryStack::from_steps([StepId::Gender, StepId::Age]);
        let before = history.clone();
        for step in StepId::ALL {
            let _ = compute_back(step, &history);
            let _ = is_back_allowed(step, &history);
        }
        assert_eq!(history, before);
    }
}
