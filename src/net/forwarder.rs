//! Outbound datagram sender used by the relay

use std::io;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::net::UdpSocket;

use crate::net::packet::{encode, EyeSample};

/// Forwarding errors
#[derive(Debug, thiserror::Error)]
pub enum ForwardError {
    #[error("failed to bind forwarding socket: {0}")]
    Bind(#[source] io::Error),

    #[error("failed to encode eye sample: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("failed to send datagram to {target}: {source}")]
    Send {
        target: SocketAddr,
        #[source]
        source: io::Error,
    },
}

/// Sends one datagram per eye sample to a fixed target
pub struct UdpForwarder {
    socket: UdpSocket,
    target: SocketAddr,
    forwarded: AtomicU64,
}

impl UdpForwarder {
    pub async fn bind(target: SocketAddr) -> Result<Self, ForwardError> {
        let bind_addr: SocketAddr = match target {
            SocketAddr::V4(_) => (Ipv4Addr::UNSPECIFIED, 0).into(),
            SocketAddr::V6(_) => (Ipv6Addr::UNSPECIFIED, 0).into(),
        };
        let socket = UdpSocket::bind(bind_addr).await.map_err(ForwardError::Bind)?;

        Ok(Self {
            socket,
            target,
            forwarded: AtomicU64::new(0),
        })
    }

    pub fn target(&self) -> SocketAddr {
        self.target
    }

    /// Number of datagrams sent so far
    pub fn forwarded(&self) -> u64 {
        self.forwarded.load(Ordering::Relaxed)
    }

    /// Re-serialize a sample and send it as one datagram
    pub async fn forward(&self, sample: &EyeSample) -> Result<usize, ForwardError> {
        let payload = encode(sample)?;
        let sent = self
            .socket
            .send_to(&payload, self.target)
            .await
            .map_err(|source| ForwardError::Send {
                target: self.target,
                source,
            })?;

        self.forwarded.fetch_add(1, Ordering::Relaxed);
        Ok(sent)
    }
}
