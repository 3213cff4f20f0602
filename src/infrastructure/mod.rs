//! Infrastructure layer - external concerns

pub mod storage;
pub mod transport;

pub use storage::{InMemoryRoamingNetwork, NetworkSize};
pub use transport::HttpSoapTransport;
