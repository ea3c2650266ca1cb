use socket2::Domain;
use socket2::Protocol;
use socket2::Socket;
use socket2::Type;
use std::net::Ipv4Addr;
use std::net::SocketAddr;
use std::net::SocketAddrV4;
use std::net::UdpSocket as StdUdpSocket;
use tokio::net::UdpSocket;

/// UDP socket used to send one multicast probe and collect the unicast
/// replies it provokes. One instance per search; never shared.
pub struct MulticastProbeSocket {
    socket: UdpSocket,
    buffer_size: usize,
}

impl MulticastProbeSocket {
    pub fn new(buffer_size: usize) -> std::io::Result<Self> {
        let socket = new_multicast_socket()?;
        let local_address = SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, 0);
        socket.bind(&SocketAddr::V4(local_address).into())?;
        let socket = new_async_socket(socket)?;
        log::debug!("Probe socket bound at {}", socket.local_addr()?);
        Ok(Self {
            socket,
            buffer_size,
        })
    }

    pub async fn send(&self, destination: SocketAddrV4, data: &[u8]) -> std::io::Result<()> {
        self.socket.send_to(data, SocketAddr::V4(destination)).await?;
        Ok(())
    }

    pub async fn receive(&self) -> std::io::Result<(Vec<u8>, SocketAddr)> {
        let mut buffer = Vec::default();
        buffer.resize(self.buffer_size, 0);
        let (receive_size, remote_address) = self.socket.recv_from(&mut buffer).await?;
        buffer.resize(receive_size, 0);
        Ok((buffer, remote_address))
    }
}

fn new_multicast_socket() -> std::io::Result<Socket> {
    let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))?;
    socket.set_reuse_address(true)?;
    socket.set_multicast_ttl_v4(1)?;
    socket.set_nonblocking(true)?;
    Ok(socket)
}

fn new_async_socket(socket: Socket) -> std::io::Result<UdpSocket> {
    let socket: StdUdpSocket = socket.into();
    socket.try_into()
}
