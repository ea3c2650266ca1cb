use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::Utc;
use quick_xml::events::Event;
use quick_xml::Reader;
use rand::RngCore;
use sha1::Digest;
use sha1::Sha1;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SoapError {
    #[error("Failed in HTTP transport")]
    Http(#[from] reqwest::Error),

    #[error("Device answered with HTTP status {0}")]
    Status(u16),

    #[error("Device answered with a SOAP fault: {0}")]
    Fault(String),

    #[error("Malformed XML in a response")]
    Xml(#[from] quick_xml::Error),

    #[error("Expected element `{0}` is missing from a response")]
    MissingElement(&'static str),

    #[error("Element `{0}` holds an unexpected value")]
    UnexpectedValue(&'static str),
}

#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

/// Wraps an operation body in a SOAP 1.2 envelope carrying a WS-Security
/// header. Kept on one line because some device firmwares reject whitespace
/// before the XML declaration.
pub fn build_envelope(credentials: &Credentials, body: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?><s:Envelope xmlns:s="http://www.w3.org/2003/05/soap-envelope"><s:Header>{}</s:Header><s:Body>{}</s:Body></s:Envelope>"#,
        security_header(credentials),
        body
    )
}

fn security_header(credentials: &Credentials) -> String {
    let mut nonce = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut nonce);
    let created = Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string();
    build_security_header(&credentials.username, &credentials.password, &nonce, &created)
}

/// WS-Security UsernameToken with a digested password:
/// `Base64(SHA1(nonce + created + password))`.
fn build_security_header(username: &str, password: &str, nonce: &[u8], created: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(nonce);
    hasher.update(created.as_bytes());
    hasher.update(password.as_bytes());
    let digest = STANDARD.encode(hasher.finalize());
    let nonce = STANDARD.encode(nonce);
    format!(
        r#"<wsse:Security xmlns:wsse="http://docs.oasis-open.org/wss/2004/01/oasis-200401-wss-wssecurity-secext-1.0.xsd" xmlns:wsu="http://docs.oasis-open.org/wss/2004/01/oasis-200401-wss-wssecurity-utility-1.0.xsd"><wsse:UsernameToken><wsse:Username>{}</wsse:Username><wsse:Password Type="http://docs.oasis-open.org/wss/2004/01/oasis-200401-wss-username-token-profile-1.0#PasswordDigest">{}</wsse:Password><wsse:Nonce EncodingType="http://docs.oasis-open.org/wss/2004/01/oasis-200401-wss-soap-message-security-1.0#Base64Binary">{}</wsse:Nonce><wsu:Created>{}</wsu:Created></wsse:UsernameToken></wsse:Security>"#,
        username, digest, nonce, created
    )
}

/// Returns the text of the first element with the given local name,
/// whatever namespace prefix the device chose.
pub fn find_text(xml: &str, element: &str) -> Option<String> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);
    let mut inside = false;
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) if e.local_name().as_ref() == element.as_bytes() => inside = true,
            Ok(Event::End(e)) if e.local_name().as_ref() == element.as_bytes() => inside = false,
            Ok(Event::Text(text)) if inside => {
                return text.unescape().ok().map(|text| text.into_owned())
            }
            Ok(Event::Eof) => return None,
            Err(_) => return None,
            _ => {}
        }
    }
}

pub fn contains_element(xml: &str, element: &str) -> bool {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) | Ok(Event::Empty(e))
                if e.local_name().as_ref() == element.as_bytes() =>
            {
                return true
            }
            Ok(Event::Eof) => return false,
            Err(_) => return false,
            _ => {}
        }
    }
}

/// Extracts the human-readable reason of a SOAP fault, or [None] when the
/// response carries no fault. Handles both SOAP 1.2 (`Reason/Text`) and
/// legacy 1.1 (`faultstring`) shapes.
pub fn fault_reason(xml: &str) -> Option<String> {
    if !contains_element(xml, "Fault") {
        return None;
    }
    let reason = find_text(xml, "Text")
        .or_else(|| find_text(xml, "faultstring"))
        .unwrap_or_else(|| "Unknown SOAP fault".to_string());
    Some(reason)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn build_security_header() {
        let nonce = [0u8; 16];

        // When
        let header =
            super::build_security_header("admin", "secret", &nonce, "2024-01-01T00:00:00Z");

        // Then
        assert!(header.contains("<wsse:Username>admin</wsse:Username>"));
        assert!(header.contains("AAAAAAAAAAAAAAAAAAAAAA=="), "Base64 of a zero nonce");
        assert!(header.contains("<wsu:Created>2024-01-01T00:00:00Z</wsu:Created>"));
        assert!(!header.contains("secret"), "The password must never appear in clear");
    }

    #[test]
    fn build_envelope_wraps_body_and_security() {
        let credentials = Credentials {
            username: "admin".to_string(),
            password: "secret".to_string(),
        };

        // When
        let envelope = super::build_envelope(&credentials, "<tds:GetHostname/>");

        // Then
        assert!(envelope.starts_with(r#"<?xml version="1.0""#));
        assert!(envelope.contains("<wsse:Security"));
        assert!(envelope.contains("<s:Body><tds:GetHostname/></s:Body>"));
    }

    #[test]
    fn find_text_ignores_namespace_prefixes() {
        let xml = "<tds:Response xmlns:tds=\"urn:x\"><tds:Model>X200</tds:Model></tds:Response>";

        assert_eq!(super::find_text(xml, "Model").unwrap(), "X200");
        assert_eq!(super::find_text(xml, "Serial"), None);
    }

    #[test]
    fn contains_element_sees_empty_elements() {
        let xml = "<tt:Capabilities xmlns:tt=\"urn:x\"><tt:PTZ/></tt:Capabilities>";

        assert!(super::contains_element(xml, "PTZ"));
        assert!(!super::contains_element(xml, "Analytics"));
    }

    #[test]
    fn fault_reason_of_a_soap12_fault() {
        let xml = r#"<env:Envelope xmlns:env="http://www.w3.org/2003/05/soap-envelope"><env:Body><env:Fault><env:Code><env:Value>env:Sender</env:Value></env:Code><env:Reason><env:Text xml:lang="en">Sender not authorized</env:Text></env:Reason></env:Fault></env:Body></env:Envelope>"#;

        assert_eq!(
            super::fault_reason(xml).unwrap(),
            "Sender not authorized"
        );
    }

    #[test]
    fn no_fault_reason_in_a_plain_response() {
        let xml = "<tds:Response xmlns:tds=\"urn:x\"><tds:Model>X200</tds:Model></tds:Response>";

        assert_eq!(super::fault_reason(xml), None);
    }
}
