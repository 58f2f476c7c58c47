//! Intake flow: the branching questionnaire a patient answers before
//! being matched with a therapist.
//!
//! Steps live in a static registry. Answers are written to the remote
//! session store through an optimistic cache, and a persisted history of
//! completed steps makes "back" well defined regardless of the branch taken.

pub mod flow;
pub mod history;
pub mod navigation;
pub mod registry;
pub mod routes;
pub mod sync;

pub use flow::{FlowStatus, IntakeFlow, StepView};
pub use history::{HistoryStack, HistoryTracker, Previous};
pub use navigation::{Destination, compute_back, compute_next, is_back_allowed};
pub use registry::{InputKind, StepDefinition, StepId, StepInput, Transition, lookup};
pub use routes::{IntakeRouteState, intake_routes};
pub use sync::{AnswerSynchronizer, SubmitOutcome};
