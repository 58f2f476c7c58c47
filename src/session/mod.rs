//! Session entity: the remote-backed patient profile and its local cache.

pub mod cache;
pub mod model;

pub use cache::{OptimisticContext, ReadTicket, SessionCache};
pub use model::{ChoiceOption, Field, Gender, ProfilePatch, Religion, SessionEntity, TherapyNeed};
