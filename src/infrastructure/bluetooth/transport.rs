//! L2CAP transport: one listening socket per HID channel role.
//!
//! HID over BR/EDR runs on two SEQPACKET L2CAP channels with fixed PSMs;
//! the host connects control first, then interrupt. Each listener accepts
//! one peer at a time and the resulting channel is a plain datagram pipe.

use bluer::l2cap::{SeqPacket, SeqPacketListener, SocketAddr};
use bluer::{Address, AddressType};
use std::fmt;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChannelRole {
    Control,
    Interrupt,
}

impl fmt::Display for ChannelRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChannelRole::Control => write!(f, "control"),
            ChannelRole::Interrupt => write!(f, "interrupt"),
        }
    }
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("failed to bind {role} listener on PSM {psm}: {source}")]
    Bind {
        role: ChannelRole,
        psm: u16,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to accept on {role} listener: {source}")]
    Accept {
        role: ChannelRole,
        #[source]
        source: std::io::Error,
    },
    /// The peer reset or hung up the channel. Recoverable: the supervisor
    /// returns to the matching awaiting state.
    #[error("{0} channel connection lost")]
    ConnectionLost(ChannelRole),
}

/// Listening socket for one channel role.
pub struct L2capListener {
    role: ChannelRole,
    psm: u16,
    inner: SeqPacketListener,
}

impl L2capListener {
    pub async fn bind(role: ChannelRole, psm: u16) -> Result<Self, TransportError> {
        let address = SocketAddr::new(Address::any(), AddressType::BrEdr, psm);
        let inner = SeqPacketListener::bind(address)
            .await
            .map_err(|source| TransportError::Bind { role, psm, source })?;
        info!("L2CAP {} listener bound on PSM {}", role, psm);
        Ok(Self { role, psm, inner })
    }

    /// Suspend until a peer connects on this role.
    pub async fn accept(&self) -> Result<Channel, TransportError> {
        let (socket, peer) = self.inner.accept().await.map_err(|source| {
            TransportError::Accept {
                role: self.role,
                source,
            }
        })?;
        info!("{} channel connected from {}", self.role, peer.addr);
        Ok(Channel {
            role: self.role,
            peer: peer.addr,
            socket,
        })
    }

    pub fn role(&self) -> ChannelRole {
        self.role
    }

    pub fn psm(&self) -> u16 {
        self.psm
    }
}

/// One live connection. Dropped on disconnect or supervisor shutdown,
/// which closes the underlying socket.
pub struct Channel {
    role: ChannelRole,
    peer: Address,
    socket: SeqPacket,
}

impl Channel {
    /// Write one whole report datagram.
    pub async fn send(&self, bytes: &[u8]) -> Result<(), TransportError> {
        match self.socket.send(bytes).await {
            Ok(sent) if sent == bytes.len() => Ok(()),
            Ok(sent) => {
                warn!(
                    "short write on {} channel: {} of {} bytes",
                    self.role,
                    sent,
                    bytes.len()
                );
                Err(TransportError::ConnectionLost(self.role))
            }
            Err(_) => Err(TransportError::ConnectionLost(self.role)),
        }
    }

    /// Read one datagram from the peer. A zero-length read is the peer
    /// hanging up and reports as `ConnectionLost`.
    pub async fn recv(&self, buf: &mut [u8]) -> Result<usize, TransportError> {
        match self.socket.recv(buf).await {
            Ok(0) => Err(TransportError::ConnectionLost(self.role)),
            Ok(received) => Ok(received),
            Err(_) => Err(TransportError::ConnectionLost(self.role)),
        }
    }

    pub fn role(&self) -> ChannelRole {
        self.role
    }

    pub fn peer(&self) -> Address {
        self.peer
    }
}
