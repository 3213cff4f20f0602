pub mod ports;
pub mod sync;

// Re-export key types for convenience
pub use ports::{SharedSoapTransport, SoapTransport};
pub use sync::{
    Credentials, DiagnosticSink, JobKind, OchpClient, OperatorFilter, SyncEngine, SyncReport,
    SyncSettings, TickOutcome,
};
