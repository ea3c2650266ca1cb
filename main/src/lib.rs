mod camera;
mod device;
mod message;
mod multicast;
mod probe;
mod scanner;
mod scope;
mod soap;
mod transport;

use std::net::SocketAddrV4;

pub use camera::Camera;
pub use camera::CameraError;
pub use probe::ServiceRecord;
pub use scanner::discover;
pub use scanner::DiscoverError;
pub use soap::SoapError;

/// IPv4 multicast address used in WS-Discovery.
///
/// Both the address and the port are fixed by the specification and are
/// shared with other SOAP-over-UDP discovery protocols on the same subnet.
fn get_discovery_address() -> SocketAddrV4 {
    "239.255.255.250:3702"
        .parse()
        .expect("Invalid multicast address")
}

#[cfg(test)]
pub mod test {
    pub fn init() {
        let _ = env_logger::builder().is_test(true).try_init();
    }
}
