use crate::probe::DiscoveryProbe;
use crate::probe::ProbeError;
use crate::probe::ServiceRecord;
use crate::probe::WsDiscoveryProbe;
use crate::scope::NetifScopeResolver;
use crate::scope::ScopeError;
use crate::scope::ScopeResolver;
use regex::Regex;
use std::sync::OnceLock;
use thiserror::Error;

/// Discovers ONVIF cameras on the local subnets.
///
/// With no explicit `scope`, the two-octet prefixes of every local IPv4
/// interface are used. Returns the matching addresses in ascending
/// lexicographic order; an empty list means nothing was found and is not an
/// error.
pub async fn discover(scope: Option<Vec<String>>) -> Result<Vec<String>, DiscoverError> {
    discover_internal(scope, NetifScopeResolver, WsDiscoveryProbe).await
}

async fn discover_internal(
    scope: Option<Vec<String>>,
    scope_resolver: impl ScopeResolver,
    probe: impl DiscoveryProbe,
) -> Result<Vec<String>, DiscoverError> {
    let scope = match scope {
        Some(scope) => scope,
        None => scope_resolver.resolve().await?,
    };
    let records = probe.search().await?;
    log::debug!("{} service record(s) probed", records.len());

    let mut addresses: Vec<_> = records
        .iter()
        .filter(|record| is_onvif(record))
        .flat_map(|record| &record.addresses)
        .flat_map(|address| extract_ipv4_literals(address))
        .filter(|address| scope.iter().any(|prefix| address.starts_with(prefix.as_str())))
        .collect();
    addresses.sort();
    Ok(addresses)
}

#[derive(Error, Debug)]
pub enum DiscoverError {
    #[error("Failed to resolve a default discovery scope")]
    Scope(#[from] ScopeError),

    #[error("Failed to probe the network for services")]
    Probe(#[from] ProbeError),
}

fn is_onvif(record: &ServiceRecord) -> bool {
    record.types.iter().any(|t| t.contains("onvif"))
}

/// Extracts every dotted-quad literal from an advertised address, which is
/// usually a URL carrying a port or path around the host.
fn extract_ipv4_literals(address: &str) -> Vec<String> {
    ipv4_pattern()
        .find_iter(address)
        .map(|literal| literal.as_str().to_string())
        .collect()
}

fn ipv4_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\d+\.\d+\.\d+\.\d+").expect("Invalid IPv4 pattern"))
}
