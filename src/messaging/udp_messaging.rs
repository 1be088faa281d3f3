use std::fmt::{Debug, Formatter};
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};

use anyhow::{anyhow, Context};
use async_trait::async_trait;
use bytes::BytesMut;
use socket2::{Domain, Protocol, Socket, Type};
use tokio::net::{lookup_host, UdpSocket};
use tokio::sync::Mutex;
use tracing::{debug, trace};

use crate::messaging::messages::WildfireMessage;
use crate::messaging::messaging::MessageSender;

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum AddressFamily {
    Ipv4,
    Ipv6,
}
impl AddressFamily {
    pub fn matches(&self, addr: &SocketAddr) -> bool {
        match self {
            AddressFamily::Ipv4 => addr.is_ipv4(),
            AddressFamily::Ipv6 => addr.is_ipv6(),
        }
    }

    pub fn unspecified(&self, port: u16) -> SocketAddr {
        match self {
            AddressFamily::Ipv4 => SocketAddr::from((Ipv4Addr::UNSPECIFIED, port)),
            AddressFamily::Ipv6 => SocketAddr::from((Ipv6Addr::UNSPECIFIED, port)),
        }
    }

    pub fn default_server_host(&self) -> &'static str {
        match self {
            AddressFamily::Ipv4 => "127.0.0.1",
            AddressFamily::Ipv6 => "::1",
        }
    }
}

/// Datagram messaging over a single UDP socket. The socket is read by exactly one receive loop,
///  while any number of tasks may send: sends are serialized through a lock so that each
///  datagram goes out as a unit.
pub struct UdpMessaging {
    socket: UdpSocket,
    send_lock: Mutex<()>,
}
impl Debug for UdpMessaging {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "UdpMessaging{{{:?}}}", self.socket.local_addr().ok())
    }
}

impl UdpMessaging {
    pub fn new(socket: UdpSocket) -> UdpMessaging {
        UdpMessaging {
            socket,
            send_lock: Mutex::new(()),
        }
    }

    pub async fn bind(addr: SocketAddr) -> anyhow::Result<UdpMessaging> {
        let socket = UdpSocket::bind(addr).await
            .with_context(|| format!("error binding UDP socket to {:?}", addr))?;
        Ok(Self::new(socket))
    }

    /// Binds the server's well-known port on all interfaces. For IPv6, the socket is made
    ///  dual-stack so that IPv4 clients can reach it through mapped addresses.
    pub fn bind_server(family: AddressFamily, port: u16) -> anyhow::Result<UdpMessaging> {
        let addr = family.unspecified(port);
        let domain = match family {
            AddressFamily::Ipv4 => Domain::IPV4,
            AddressFamily::Ipv6 => Domain::IPV6,
        };

        let socket = Socket::new(domain, Type::DGRAM, Some(Protocol::UDP))
            .context("error creating UDP socket")?;
        if family == AddressFamily::Ipv6 {
            socket.set_only_v6(false)
                .context("error enabling dual-stack mode")?;
        }
        socket.set_nonblocking(true)?;
        socket.bind(&addr.into())
            .with_context(|| format!("error binding UDP socket to {:?}", addr))?;

        let socket = UdpSocket::from_std(socket.into())?;
        debug!("server socket bound to {:?}", socket.local_addr()?);
        Ok(Self::new(socket))
    }

    /// Binds an ephemeral port for a client of the given address family
    pub async fn bind_client(family: AddressFamily) -> anyhow::Result<UdpMessaging> {
        Self::bind(family.unspecified(0)).await
    }

    pub fn local_addr(&self) -> anyhow::Result<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }

    pub async fn recv_datagram(&self, buf: &mut [u8]) -> anyhow::Result<(usize, SocketAddr)> {
        let (len, from) = self.socket.recv_from(buf).await?;
        trace!("received {} bytes from {:?}", len, from);
        Ok((len, from))
    }
}

#[async_trait]
impl MessageSender for UdpMessaging {
    async fn try_send(&self, to: SocketAddr, msg: &WildfireMessage) -> anyhow::Result<()> {
        let mut buf = BytesMut::new();
        msg.ser(&mut buf);

        let _guard = self.send_lock.lock().await;
        trace!(?to, "sending {:?}", msg);
        self.socket.send_to(&buf, to).await?;
        Ok(())
    }
}

/// Resolves `host` to the first address of the requested family
pub async fn resolve_server_addr(host: &str, port: u16, family: AddressFamily) -> anyhow::Result<SocketAddr> {
    let mut candidates = lookup_host((host, port)).await
        .with_context(|| format!("error resolving {:?}", host))?;
    candidates.find(|addr| family.matches(addr))
        .ok_or_else(|| anyhow!("{:?} has no {:?} address", host, family))
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;
    use crate::messaging::messages::{AckKind, AssignmentData};

    #[tokio::test]
    async fn test_send_and_receive() {
        let a = UdpMessaging::bind("127.0.0.1:0".parse().unwrap()).await.unwrap();
        let b = UdpMessaging::bind("127.0.0.1:0".parse().unwrap()).await.unwrap();

        let msg = WildfireMessage::TeamOrder(AssignmentData { city_id: 5, team_id: 2 });
        a.try_send(b.local_addr().unwrap(), &msg).await.unwrap();

        let mut buf = [0u8; 2048];
        let (len, from) = b.recv_datagram(&mut buf).await.unwrap();
        assert_eq!(from, a.local_addr().unwrap());
        assert_eq!(WildfireMessage::deser(&buf[..len]).unwrap(), msg);
    }

    #[tokio::test]
    async fn test_bind_server_ipv4() {
        let server = UdpMessaging::bind_server(AddressFamily::Ipv4, 0).unwrap();
        let port = server.local_addr().unwrap().port();
        let client = UdpMessaging::bind_client(AddressFamily::Ipv4).await.unwrap();

        client.try_send(SocketAddr::from((Ipv4Addr::LOCALHOST, port)), &WildfireMessage::Ack(AckKind::Telemetry)).await.unwrap();

        let mut buf = [0u8; 2048];
        let (len, _) = server.recv_datagram(&mut buf).await.unwrap();
        assert_eq!(WildfireMessage::deser(&buf[..len]).unwrap(), WildfireMessage::Ack(AckKind::Telemetry));
    }

    #[tokio::test]
    async fn test_resolve_localhost_ipv4() {
        let addr = resolve_server_addr("127.0.0.1", 8080, AddressFamily::Ipv4).await.unwrap();
        assert_eq!(addr, "127.0.0.1:8080".parse().unwrap());
    }

    #[tokio::test]
    async fn test_resolve_wrong_family() {
        assert!(resolve_server_addr("127.0.0.1", 8080, AddressFamily::Ipv6).await.is_err());
    }

    #[rstest]
    #[case::v4(AddressFamily::Ipv4, "0.0.0.0:8080", "127.0.0.1")]
    #[case::v6(AddressFamily::Ipv6, "[::]:8080", "::1")]
    fn test_address_family(#[case] family: AddressFamily, #[case] unspecified: &str, #[case] default_host: &str) {
        let unspecified: SocketAddr = unspecified.parse().unwrap();
        assert_eq!(family.unspecified(8080), unspecified);
        assert!(family.matches(&unspecified));
        assert_eq!(family.default_server_host(), default_host);
    }
}
