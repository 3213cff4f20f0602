pub mod outbound;

pub use outbound::{SharedSoapTransport, SoapTransport};
