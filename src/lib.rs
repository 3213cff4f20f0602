//! # OCHP Bridge
//!
//! OCHP 1.4 client for EV roaming clearing houses.
//!
//! ## Architecture
//!
//! - **protocol**: SOAP envelope, WS-Security and the OCHP message codec
//! - **domain**: Local charging network entities and repository traits
//! - **application**: Remote client, reconciliation and the sync engine
//! - **infrastructure**: HTTP transport and in-memory storage
//! - **service**: Process lifecycle, tracing and metrics setup

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod protocol;
pub mod service;
pub mod support;

pub use config::{default_config_path, AppConfig};

pub use application::{JobKind, OchpClient, SyncEngine, SyncReport, SyncSettings, TickOutcome};
pub use infrastructure::{HttpSoapTransport, InMemoryRoamingNetwork};
pub use service::{init_tracing, BridgeHandle, BridgeOptions};
