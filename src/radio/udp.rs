//! UDP radio emulation
//!
//! Each datagram is the 5-byte pipe address followed by the payload.
//! Datagrams addressed to any pipe other than the reading pipe are dropped.

use async_trait::async_trait;
use bytes::{BufMut, Bytes, BytesMut};
use std::net::SocketAddr;
use tokio::net::UdpSocket;

use super::{check_payload, PipeAddress, Radio, RadioConfig, RadioResult, MAX_PAYLOAD_LEN};
use crate::protocol::PIPE_ADDRESS_LEN;

/// Radio carried over a UDP socket
pub struct UdpRadio {
    config: RadioConfig,
    socket: UdpSocket,
    peer: SocketAddr,
    recv_buf: Vec<u8>,
}

impl UdpRadio {
    /// Bind `local` and transmit towards `peer`
    pub async fn bind(config: RadioConfig, local: SocketAddr, peer: SocketAddr) -> RadioResult<Self> {
        let socket = UdpSocket::bind(local).await?;
        tracing::info!(
            "UDP radio on {} -> {} (write pipe {}, read pipe {})",
            socket.local_addr()?,
            peer,
            config.writing_pipe,
            config.reading_pipe
        );

        Ok(Self {
            config,
            socket,
            peer,
            recv_buf: vec![0u8; PIPE_ADDRESS_LEN + MAX_PAYLOAD_LEN + 1],
        })
    }

    pub fn local_addr(&self) -> RadioResult<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }

    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    pub fn set_peer(&mut self, peer: SocketAddr) {
        self.peer = peer;
    }
}

/// Split a datagram into its pipe address and payload
fn split_datagram(datagram: &[u8]) -> Option<(PipeAddress, &[u8])> {
    if datagram.len() < PIPE_ADDRESS_LEN {
        return None;
    }
    let (addr, payload) = datagram.split_at(PIPE_ADDRESS_LEN);
    let addr: [u8; PIPE_ADDRESS_LEN] = addr.try_into().ok()?;
    Some((PipeAddress(addr), payload))
}

#[async_trait]
impl Radio for UdpRadio {
    fn config(&self) -> &RadioConfig {
        &self.config
    }

    async fn send(&mut self, payload: &[u8]) -> RadioResult<()> {
        check_payload(payload)?;

        let mut datagram = BytesMut::with_capacity(PIPE_ADDRESS_LEN + payload.len());
        datagram.put_slice(self.config.writing_pipe.as_bytes());
        datagram.put_slice(payload);

        self.socket.send_to(&datagram, self.peer).await?;
        Ok(())
    }

    async fn recv(&mut self) -> RadioResult<Bytes> {
        loop {
            let (n, from) = self.socket.recv_from(&mut self.recv_buf).await?;

            match split_datagram(&self.recv_buf[..n]) {
                Some((pipe, payload)) if pipe == self.config.reading_pipe => {
                    if payload.len() > MAX_PAYLOAD_LEN {
                        tracing::warn!("Oversized payload from {} dropped", from);
                        continue;
                    }
                    return Ok(Bytes::copy_from_slice(payload));
                }
                Some((pipe, _)) => {
                    tracing::trace!("Filtered datagram from {} on pipe {}", from, pipe);
                }
                None => {
                    tracing::debug!("Runt datagram ({} bytes) from {}", n, from);
                }
            }
        }
    }
}
