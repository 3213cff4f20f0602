//! Periodic synchronization with the remote clearing house

pub mod client;
pub mod engine;
pub mod guard;
pub mod reconcile;
pub mod report;

#[cfg(test)]
pub(crate) mod testing;

pub use client::{Credentials, OchpClient};
pub use engine::{JobKind, JobSettings, SyncEngine, SyncSettings, TickOutcome};
pub use guard::{FlightPermit, SingleFlight};
pub use reconcile::OperatorFilter;
pub use report::{
    Change, Counters, Diagnostic, DiagnosticKind, DiagnosticSink, OperatorCounters, SyncReport,
    TracingDiagnostics,
};
