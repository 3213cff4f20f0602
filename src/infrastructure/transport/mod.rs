//! SOAP transports

mod http;

pub use http::HttpSoapTransport;
