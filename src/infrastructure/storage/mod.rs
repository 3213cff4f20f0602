//! Local roaming network implementations

mod memory;

pub use memory::{InMemoryRoamingNetwork, NetworkSize};
