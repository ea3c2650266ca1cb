use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use local_ip_address::list_afinet_netifas;
use mockall::automock;
use std::net::IpAddr;
use std::net::Ipv4Addr;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScopeError {
    #[error("Failed to enumerate network interfaces")]
    InterfaceEnumeration(#[from] local_ip_address::Error),
}

#[automock]
pub trait ScopeResolver {
    fn resolve(&self) -> BoxFuture<'static, Result<Vec<String>, ScopeError>>;
}

/// Derives the default discovery scope from the local network interfaces.
pub struct NetifScopeResolver;

impl ScopeResolver for NetifScopeResolver {
    fn resolve(&self) -> BoxFuture<'static, Result<Vec<String>, ScopeError>> {
        async {
            let interfaces = list_afinet_netifas()?;
            Ok(derive_scope(interfaces))
        }
        .boxed()
    }
}

/// Maps every interface with an IPv4 assignment to the first two octets of
/// its address, preserving enumeration order. Interfaces without IPv4 are
/// skipped. Duplicate prefixes are kept; the downstream scope test is a
/// prefix match, so uniqueness buys nothing.
fn derive_scope(interfaces: Vec<(String, IpAddr)>) -> Vec<String> {
    interfaces
        .into_iter()
        .filter_map(|(name, address)| match address {
            IpAddr::V4(address) => Some((name, address)),
            IpAddr::V6(_) => None,
        })
        .map(|(name, address)| {
            let prefix = subnet_prefix(address);
            log::debug!("Interface {} contributes scope prefix {}", name, prefix);
            prefix
        })
        .collect()
}

fn subnet_prefix(address: Ipv4Addr) -> String {
    let octets = address.octets();
    format!("{}.{}", octets[0], octets[1])
}
