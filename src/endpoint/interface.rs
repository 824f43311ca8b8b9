//! Interface endpoint
//!
//! Sends programs to a robot and waits for them to be acknowledged.

use tokio::time::Instant;

use super::{EndpointError, EndpointResult, EndpointStats, LinkConfig};
use crate::protocol::{
    AckMessage, ChecksumKind, CommandsMessage, Decoder, Direction, Encoder, FunctionInstructions,
    MainInstructions, Packet,
};
use crate::radio::Radio;
use crate::session::{AckStatus, InterfaceSession};

/// Outcome of a successful program transmission
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Delivered {
    /// The packet the robot acknowledged
    pub message: CommandsMessage,
    /// The acknowledgment itself
    pub ack: AckMessage,
    /// How the ack counter moved
    pub status: AckStatus,
    /// Transmissions it took, the first included
    pub attempts: u32,
}

/// Sending side of the link
pub struct Interface<R: Radio> {
    radio: R,
    link: LinkConfig,
    encoder: Encoder,
    decoder: Decoder,
    session: InterfaceSession,
    stats: EndpointStats,
}

impl<R: Radio> Interface<R> {
    pub fn new(radio: R, link: LinkConfig, checksum: ChecksumKind) -> Self {
        Self {
            radio,
            link,
            encoder: Encoder::new(checksum),
            decoder: Decoder::new(checksum, Direction::CubettoToInterface),
            session: InterfaceSession::new(),
            stats: EndpointStats::default(),
        }
    }

    pub fn session(&self) -> &InterfaceSession {
        &self.session
    }

    pub fn stats(&self) -> &EndpointStats {
        &self.stats
    }

    pub fn radio_mut(&mut self) -> &mut R {
        &mut self.radio
    }

    /// Start a new session carrying this program and wait for its ack
    pub async fn send_program(
        &mut self,
        main: MainInstructions,
        function: FunctionInstructions,
    ) -> EndpointResult<Delivered> {
        let message = self.session.begin_run(main, function);
        self.deliver(message).await
    }

    /// Transmit `message` until an ack confirms it or the attempts run out
    pub async fn deliver(&mut self, message: CommandsMessage) -> EndpointResult<Delivered> {
        if self.session.session_id() != Some(message.session_id) {
            self.session.begin_run_with_id(
                message.session_id,
                message.main_instructions,
                message.function_instructions,
            );
        }

        let payload = self.encoder.to_bytes(&Packet::Commands(message));
        let max_attempts = self.link.max_attempts();

        for attempt in 1..=max_attempts {
            if attempt > 1 {
                self.stats.retransmissions += 1;
                tracing::debug!(
                    "Retransmitting session {:#010x} (attempt {}/{})",
                    message.session_id,
                    attempt,
                    max_attempts
                );
            }

            self.radio.send(&payload).await?;
            self.stats.packets_sent += 1;

            if let Some((ack, status)) = self.await_ack().await? {
                tracing::info!(
                    "Session {:#010x} acknowledged (counter {}, attempt {})",
                    ack.session_id,
                    ack.message_counter,
                    attempt
                );
                return Ok(Delivered {
                    message,
                    ack,
                    status,
                    attempts: attempt,
                });
            }
        }

        tracing::warn!(
            "Session {:#010x} not acknowledged after {} attempts",
            message.session_id,
            max_attempts
        );
        Err(EndpointError::NoAck {
            attempts: max_attempts,
        })
    }

    /// Wait up to the ack timeout for an ack confirming the current session
    async fn await_ack(&mut self) -> EndpointResult<Option<(AckMessage, AckStatus)>> {
        let deadline = Instant::now() + self.link.ack_timeout;

        loop {
            let payload = match tokio::time::timeout_at(deadline, self.radio.recv()).await {
                Ok(result) => result?,
                Err(_) => return Ok(None),
            };

            let ack = match self.decoder.decode_payload(&payload) {
                Ok(Packet::Ack(ack)) => ack,
                Ok(other) => {
                    self.stats.packets_rejected += 1;
                    tracing::warn!("Ignoring unexpected packet: {:?}", other);
                    continue;
                }
                Err(e) => {
                    self.stats.packets_rejected += 1;
                    tracing::warn!("Dropping invalid packet: {}", e);
                    continue;
                }
            };
            self.stats.packets_received += 1;

            let status = self.session.record_ack(&ack);
            if status.confirms() {
                if let AckStatus::Missed { missed } = status {
                    tracing::warn!("{} acknowledgments missed before counter {}", missed, ack.message_counter);
                }
                return Ok(Some((ack, status)));
            }
            tracing::debug!("Ignoring ack {:?}: {:?}", ack, status);
        }
    }
}
