//! Route audit trail: lifecycle-triggered, append-only history of every
//! route's field-level changes, kept in `route_logs` independently of the
//! route document itself.

pub mod diff;
pub mod engine;
pub mod fields;

pub use diff::{diff, FieldChange};
pub use engine::AuditLogEngine;
pub use fields::{project, Actor, TRACKED_FIELDS};
