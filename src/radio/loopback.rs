//! In-memory radio pair
//!
//! Two radios joined by channels. Frames carry their pipe address so the
//! receiving side filters exactly as a transceiver would.

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::mpsc;

use super::{check_payload, PipeAddress, Radio, RadioConfig, RadioError, RadioResult};

type Frame = (PipeAddress, Bytes);

/// One end of an in-memory radio link
pub struct LoopbackRadio {
    config: RadioConfig,
    tx: mpsc::Sender<Frame>,
    rx: mpsc::Receiver<Frame>,
    drop_sends: u32,
    sent: u64,
}

impl LoopbackRadio {
    /// Create two radios wired to each other
    pub fn pair(a: RadioConfig, b: RadioConfig) -> (Self, Self) {
        let (a_tx, b_rx) = mpsc::channel(64);
        let (b_tx, a_rx) = mpsc::channel(64);
        (Self::new(a, a_tx, a_rx), Self::new(b, b_tx, b_rx))
    }

    /// Interface and robot radios with the default pipes
    pub fn interface_robot_pair() -> (Self, Self) {
        Self::pair(RadioConfig::interface(), RadioConfig::robot())
    }

    fn new(config: RadioConfig, tx: mpsc::Sender<Frame>, rx: mpsc::Receiver<Frame>) -> Self {
        Self {
            config,
            tx,
            rx,
            drop_sends: 0,
            sent: 0,
        }
    }

    /// Silently lose the next `count` transmissions
    pub fn drop_next_sends(&mut self, count: u32) {
        self.drop_sends = count;
    }

    /// Payloads handed to `send`, lost ones included
    pub fn sent(&self) -> u64 {
        self.sent
    }
}

#[async_trait]
impl Radio for LoopbackRadio {
    fn config(&self) -> &RadioConfig {
        &self.config
    }

    async fn send(&mut self, payload: &[u8]) -> RadioResult<()> {
        check_payload(payload)?;
        self.sent += 1;

        if self.drop_sends > 0 {
            self.drop_sends -= 1;
            tracing::debug!("Loopback dropped {} byte payload", payload.len());
            return Ok(());
        }

        self.tx
            .send((self.config.writing_pipe, Bytes::copy_from_slice(payload)))
            .await
            .map_err(|_| RadioError::Closed)
    }

    async fn recv(&mut self) -> RadioResult<Bytes> {
        loop {
            let (pipe, payload) = self.rx.recv().await.ok_or(RadioError::Closed)?;
            if pipe == self.config.reading_pipe {
                return Ok(payload);
            }
            tracing::trace!("Filtered payload on pipe {}", pipe);
        }
    }
}
