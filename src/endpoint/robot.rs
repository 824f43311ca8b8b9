//! Robot endpoint
//!
//! Receives programs, drops anything that fails validation and acknowledges
//! everything that passes, retransmissions included.

use tokio::sync::mpsc;

use super::{EndpointResult, EndpointStats};
use crate::protocol::{ChecksumKind, CommandsMessage, Decoder, Direction, Encoder, Packet};
use crate::radio::{Radio, RadioError};
use crate::session::{Delivery, RobotSession};

/// Events emitted by a running robot
#[derive(Debug, Clone)]
pub enum RobotEvent {
    /// A new program arrived and was acknowledged
    ProgramReceived { message: CommandsMessage },
    /// A retransmitted program was acknowledged again
    Reacknowledged { session_id: u32, counter: u32 },
    /// A payload failed validation
    Rejected { reason: String },
}

/// Receiving side of the link
pub struct Robot<R: Radio> {
    radio: R,
    encoder: Encoder,
    decoder: Decoder,
    session: RobotSession,
    stats: EndpointStats,
}

impl<R: Radio> Robot<R> {
    pub fn new(radio: R, checksum: ChecksumKind) -> Self {
        Self {
            radio,
            encoder: Encoder::new(checksum),
            decoder: Decoder::new(checksum, Direction::InterfaceToCubetto),
            session: RobotSession::new(),
            stats: EndpointStats::default(),
        }
    }

    pub fn session(&self) -> &RobotSession {
        &self.session
    }

    pub fn stats(&self) -> &EndpointStats {
        &self.stats
    }

    pub fn radio_mut(&mut self) -> &mut R {
        &mut self.radio
    }

    /// Wait for the next new program, acknowledging every valid packet on the way
    pub async fn recv_program(&mut self) -> EndpointResult<CommandsMessage> {
        loop {
            if let RobotEvent::ProgramReceived { message } = self.next_event().await? {
                return Ok(message);
            }
        }
    }

    /// Handle one incoming payload
    pub async fn next_event(&mut self) -> EndpointResult<RobotEvent> {
        let payload = self.radio.recv().await?;

        let message = match self.decoder.decode_payload(&payload) {
            Ok(Packet::Commands(message)) => message,
            Ok(other) => {
                self.stats.packets_rejected += 1;
                tracing::warn!("Ignoring unexpected packet: {:?}", other);
                return Ok(RobotEvent::Rejected {
                    reason: "unexpected packet kind".to_string(),
                });
            }
            Err(e) => {
                self.stats.packets_rejected += 1;
                tracing::warn!("Dropping invalid packet: {}", e);
                return Ok(RobotEvent::Rejected {
                    reason: e.to_string(),
                });
            }
        };
        self.stats.packets_received += 1;

        let delivery = self.session.on_commands(&message);
        let ack = self.session.next_ack(message.session_id);
        self.radio.send(&self.encoder.to_bytes(&Packet::Ack(ack))).await?;
        self.stats.packets_sent += 1;

        match delivery {
            Delivery::New => {
                tracing::info!(
                    "Program for session {:#010x}: main {} function {} (ack {})",
                    message.session_id,
                    message.main_instructions,
                    message.function_instructions,
                    ack.message_counter
                );
                Ok(RobotEvent::ProgramReceived { message })
            }
            Delivery::Retransmission => {
                tracing::debug!(
                    "Re-acknowledged session {:#010x} (ack {})",
                    message.session_id,
                    ack.message_counter
                );
                Ok(RobotEvent::Reacknowledged {
                    session_id: message.session_id,
                    counter: ack.message_counter,
                })
            }
        }
    }

    /// Serve until `shutdown` fires or the radio closes, forwarding events
    pub async fn run(
        &mut self,
        events: mpsc::Sender<RobotEvent>,
        mut shutdown: mpsc::Receiver<()>,
    ) -> EndpointResult<()> {
        tracing::info!(
            "Robot listening on pipe {}, acknowledging on {}",
            self.radio.config().reading_pipe,
            self.radio.config().writing_pipe
        );

        loop {
            tokio::select! {
                result = self.next_event() => {
                    match result {
                        Ok(event) => {
                            if events.send(event).await.is_err() {
                                tracing::debug!("Event receiver dropped");
                                break;
                            }
                        }
                        Err(super::EndpointError::Radio(RadioError::Closed)) => {
                            tracing::info!("Radio closed");
                            break;
                        }
                        Err(e) => return Err(e),
                    }
                }
                _ = shutdown.recv() => {
                    tracing::info!("Robot shutdown requested");
                    break;
                }
            }
        }

        Ok(())
    }
}
