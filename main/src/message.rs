use crate::probe::ServiceRecord;
use quick_xml::events::BytesStart;
use quick_xml::events::Event;
use quick_xml::Reader;
use std::collections::HashMap;
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum MessageError {
    #[error("Reply is not valid UTF-8")]
    Encoding(#[from] std::str::Utf8Error),

    #[error("Malformed XML in a reply")]
    Xml(#[from] quick_xml::Error),
}

/// Builds a WS-Discovery Probe envelope.
///
/// The probe is untyped so every discoverable service answers; type
/// filtering happens on the replies. Kept on one line because some device
/// firmwares reject whitespace before the XML declaration.
pub fn build_probe(message_id: Uuid) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?><soap:Envelope xmlns:soap="http://www.w3.org/2003/05/soap-envelope" xmlns:wsa="http://schemas.xmlsoap.org/ws/2004/08/addressing" xmlns:wsd="http://schemas.xmlsoap.org/ws/2005/04/discovery"><soap:Header><wsa:Action>http://schemas.xmlsoap.org/ws/2005/04/discovery/Probe</wsa:Action><wsa:MessageID>urn:uuid:{}</wsa:MessageID><wsa:To>urn:schemas-xmlsoap-org:ws:2005:04:discovery</wsa:To></soap:Header><soap:Body><wsd:Probe/></soap:Body></soap:Envelope>"#,
        message_id
    )
}

/// Parses every ProbeMatch in one reply datagram into a [ServiceRecord].
pub fn parse_probe_matches(datagram: &[u8]) -> Result<Vec<ServiceRecord>, MessageError> {
    let xml = std::str::from_utf8(datagram)?;
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut namespaces = HashMap::new();
    let mut records = Vec::new();
    let mut current: Option<ServiceRecord> = None;
    let mut field = None;
    loop {
        match reader.read_event()? {
            Event::Start(element) => {
                collect_namespaces(&mut namespaces, &element)?;
                match element.local_name().as_ref() {
                    b"ProbeMatch" => current = Some(ServiceRecord::default()),
                    b"Types" if current.is_some() => field = Some(Field::Types),
                    b"XAddrs" if current.is_some() => field = Some(Field::XAddrs),
                    _ => {}
                }
            }
            Event::Empty(element) => collect_namespaces(&mut namespaces, &element)?,
            Event::Text(text) => {
                if let (Some(record), Some(field)) = (&mut current, field) {
                    let text = text.unescape()?;
                    match field {
                        Field::Types => record
                            .types
                            .extend(text.split_whitespace().map(|t| expand_qname(&namespaces, t))),
                        Field::XAddrs => record
                            .addresses
                            .extend(text.split_whitespace().map(str::to_string)),
                    }
                }
            }
            Event::End(element) => match element.local_name().as_ref() {
                b"ProbeMatch" => records.extend(current.take()),
                b"Types" | b"XAddrs" => field = None,
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(records)
}

#[derive(Clone, Copy)]
enum Field {
    Types,
    XAddrs,
}

fn collect_namespaces(
    namespaces: &mut HashMap<String, String>,
    element: &BytesStart,
) -> Result<(), MessageError> {
    for attribute in element.attributes() {
        let attribute = attribute.map_err(quick_xml::Error::from)?;
        if let Some(prefix) = attribute.key.as_ref().strip_prefix(b"xmlns:") {
            namespaces.insert(
                String::from_utf8_lossy(prefix).into_owned(),
                String::from_utf8_lossy(&attribute.value).into_owned(),
            );
        }
    }
    Ok(())
}

/// Expands `dn:NetworkVideoTransmitter` to
/// `{http://www.onvif.org/ver10/network/wsdl}NetworkVideoTransmitter`.
///
/// Devices choose their own prefixes, so type filtering must see the
/// namespace URI rather than whatever prefix a firmware picked.
fn expand_qname(namespaces: &HashMap<String, String>, qname: &str) -> String {
    match qname.split_once(':') {
        Some((prefix, local)) => match namespaces.get(prefix) {
            Some(namespace) => format!("{{{}}}{}", namespace, local),
            None => qname.to_string(),
        },
        None => qname.to_string(),
    }
}
