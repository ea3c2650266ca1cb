use crate::message;
use crate::multicast::MulticastProbeSocket;
use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use mockall::automock;
use std::time::Duration;
use thiserror::Error;
use tokio::time::timeout_at;
use tokio::time::Instant;
use uuid::Uuid;

/// How long a probe keeps listening for replies after sending.
///
/// Replies arrive within a couple of seconds on a healthy subnet; the window
/// is fixed and not exposed to callers.
const PROBE_LISTEN_WINDOW: Duration = Duration::from_secs(3);

const PROBE_BUFFER_SIZE: usize = 8192;

/// One advertised service, as inspected from a WS-Discovery reply.
///
/// `types` holds namespace-expanded QNames; `addresses` holds the raw
/// transport addresses the service advertises, usually URLs.
#[derive(Debug, PartialEq, Eq, Clone, Default)]
pub struct ServiceRecord {
    pub types: Vec<String>,
    pub addresses: Vec<String>,
}

#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("Failed in multicast I/O")]
    Multicast(#[from] std::io::Error),
}

#[automock]
pub trait DiscoveryProbe {
    fn search(&self) -> BoxFuture<'static, Result<Vec<ServiceRecord>, ProbeError>>;
}

/// Probes the local subnet over WS-Discovery multicast.
#[derive(Default)]
pub struct WsDiscoveryProbe;

impl DiscoveryProbe for WsDiscoveryProbe {
    fn search(&self) -> BoxFuture<'static, Result<Vec<ServiceRecord>, ProbeError>> {
        Self::search().boxed()
    }
}

impl WsDiscoveryProbe {
    async fn search() -> Result<Vec<ServiceRecord>, ProbeError> {
        let socket = MulticastProbeSocket::new(PROBE_BUFFER_SIZE)?;
        let probe = message::build_probe(Uuid::new_v4());
        socket
            .send(crate::get_discovery_address(), probe.as_bytes())
            .await?;

        let deadline = Instant::now() + PROBE_LISTEN_WINDOW;
        let mut records = Vec::new();
        loop {
            let (datagram, remote_address) = match timeout_at(deadline, socket.receive()).await {
                Ok(received) => received?,
                Err(_) => break,
            };
            match message::parse_probe_matches(&datagram) {
                Ok(mut matches) => {
                    log::debug!(
                        "{} service record(s) in a reply from {}",
                        matches.len(),
                        remote_address
                    );
                    records.append(&mut matches);
                }
                Err(e) => log::debug!("Dropping a malformed reply from {}: {}", remote_address, e),
            }
        }
        Ok(records)
    }
}
