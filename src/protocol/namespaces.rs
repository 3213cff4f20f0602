//! XML namespaces spoken on the wire and the prefixes used when writing them.

/// OCHP 1.4 default namespace
pub const OCHP: &str = "http://ochp.eu/1.4";
/// OCHP direct extension namespace
pub const OCHP_DIRECT: &str = "http://ochp.eu/direct/0.2/";
/// SOAP 1.1 envelope
pub const SOAP_ENVELOPE: &str = "http://schemas.xmlsoap.org/soap/envelope/";
/// OASIS WSS 1.0 secext
pub const WSSE: &str =
    "http://docs.oasis-open.org/wss/2004/01/oasis-200401-wss-wssecurity-secext-1.0.xsd";
/// OASIS WSS 1.0 utility
pub const WSU: &str =
    "http://docs.oasis-open.org/wss/2004/01/oasis-200401-wss-wssecurity-utility-1.0.xsd";

pub const PASSWORD_TEXT_TYPE: &str =
    "http://docs.oasis-open.org/wss/2004/01/oasis-200401-wss-username-token-profile-1.0#PasswordText";
pub const BASE64_BINARY_ENCODING: &str =
    "http://docs.oasis-open.org/wss/2004/01/oasis-200401-wss-soap-message-security-1.0#Base64Binary";

pub(crate) fn preferred_prefix(namespace: &str) -> Option<&'static str> {
    match namespace {
        SOAP_ENVELOPE => Some("soapenv"),
        OCHP => Some("ns"),
        OCHP_DIRECT => Some("dir"),
        WSSE => Some("wsse"),
        WSU => Some("wsu"),
        _ => None,
    }
}
