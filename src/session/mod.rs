//! Session state for both ends of a link
//!
//! Each endpoint owns one of these contexts:
//! - `InterfaceSession` opens a fresh session id for every program run and
//!   checks the acknowledgments that come back
//! - `RobotSession` counts the acknowledgments it sends and recognises
//!   retransmitted programs

use serde::Serialize;

use crate::protocol::{AckMessage, CommandsMessage, FunctionInstructions, MainInstructions};

/// Generate a session id that is non-zero and differs from `previous`
pub fn new_session_id(previous: Option<u32>) -> u32 {
    loop {
        let id = uuid::Uuid::new_v4().as_u128() as u32;
        if id != 0 && Some(id) != previous {
            return id;
        }
    }
}

/// How an incoming acknowledgment relates to the ones seen before
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AckStatus {
    /// First ack, or the counter moved forward by one
    Fresh,
    /// Counter did not advance
    Duplicate,
    /// Counter jumped; `missed` acks never arrived
    Missed { missed: u32 },
    /// Ack belongs to another session
    WrongSession { expected: Option<u32>, actual: u32 },
}

impl AckStatus {
    /// Whether the ack confirms the current program
    pub fn confirms(&self) -> bool {
        matches!(self, AckStatus::Fresh | AckStatus::Missed { .. })
    }
}

/// Interface-side session context
#[derive(Debug, Clone, Default)]
pub struct InterfaceSession {
    session_id: Option<u32>,
    last_ack_counter: Option<u32>,
    run_confirmed: bool,
    runs: u64,
}

impl InterfaceSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current session id, if a run has begun
    pub fn session_id(&self) -> Option<u32> {
        self.session_id
    }

    /// Counter of the last accepted ack, carried across runs
    pub fn last_ack_counter(&self) -> Option<u32> {
        self.last_ack_counter
    }

    /// Number of runs begun so far
    pub fn runs(&self) -> u64 {
        self.runs
    }

    /// Start a new run and build the packet carrying its program
    pub fn begin_run(
        &mut self,
        main: MainInstructions,
        function: FunctionInstructions,
    ) -> CommandsMessage {
        let session_id = new_session_id(self.session_id);
        self.begin_run_with_id(session_id, main, function)
    }

    /// Start a new run under a caller-chosen session id
    pub fn begin_run_with_id(
        &mut self,
        session_id: u32,
        main: MainInstructions,
        function: FunctionInstructions,
    ) -> CommandsMessage {
        self.session_id = Some(session_id);
        self.run_confirmed = false;
        self.runs += 1;
        tracing::debug!("Session {:#010x} started (run {})", session_id, self.runs);
        CommandsMessage::new(session_id, main, function)
    }

    /// Classify an ack and remember its counter when it confirms the run
    pub fn record_ack(&mut self, ack: &AckMessage) -> AckStatus {
        if self.session_id != Some(ack.session_id) {
            return AckStatus::WrongSession {
                expected: self.session_id,
                actual: ack.session_id,
            };
        }

        // Forward distances up to half the counter space count as progress
        let distance = self
            .last_ack_counter
            .map(|last| ack.message_counter.wrapping_sub(last));
        let forward = distance.filter(|d| *d != 0 && *d <= u32::MAX / 2);

        let status = match (self.run_confirmed, forward) {
            (_, Some(1)) => AckStatus::Fresh,
            (_, Some(d)) => AckStatus::Missed { missed: d - 1 },
            (true, None) => AckStatus::Duplicate,
            (false, None) => {
                // First ack of the run without progress: the robot's counter restarted
                if distance.is_some() {
                    tracing::debug!("Robot ack counter restarted at {}", ack.message_counter);
                }
                AckStatus::Fresh
            }
        };

        if status.confirms() {
            self.last_ack_counter = Some(ack.message_counter);
            self.run_confirmed = true;
        }
        status
    }
}

/// What the robot should do with a received program
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// First copy of a run; execute it
    New,
    /// Resent copy of the run already executed; acknowledge only
    Retransmission,
}

/// Robot-side session context
#[derive(Debug, Clone, Default)]
pub struct RobotSession {
    ack_message_count: u32,
    last_program: Option<CommandsMessage>,
    programs_received: u64,
}

impl RobotSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of acks sent so far
    pub fn ack_message_count(&self) -> u32 {
        self.ack_message_count
    }

    /// Session of the last program delivered
    pub fn current_session(&self) -> Option<u32> {
        self.last_program.map(|msg| msg.session_id)
    }

    /// Number of distinct programs delivered
    pub fn programs_received(&self) -> u64 {
        self.programs_received
    }

    /// Register a validated program
    ///
    /// Only an exact repeat of the last program, same session and same
    /// instructions, is a retransmission.
    pub fn on_commands(&mut self, msg: &CommandsMessage) -> Delivery {
        if self.last_program.as_ref() == Some(msg) {
            return Delivery::Retransmission;
        }
        self.last_program = Some(*msg);
        self.programs_received += 1;
        Delivery::New
    }

    /// Build the next ack for `session_id`, advancing the counter
    pub fn next_ack(&mut self, session_id: u32) -> AckMessage {
        self.ack_message_count = self.ack_message_count.wrapping_add(1);
        AckMessage::new(session_id, self.ack_message_count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn program() -> (MainInstructions, FunctionInstructions) {
        (
            MainInstructions::parse_program("FFX").unwrap(),
            FunctionInstructions::parse_program("LR").unwrap(),
        )
    }

    #[test]
    fn test_session_ids_change_per_run() {
        let mut session = InterfaceSession::new();
        let (main, function) = program();
        let first = session.begin_run(main, function);
        let second = session.begin_run(main, function);
        assert_ne!(first.session_id, 0);
        assert_ne!(first.session_id, second.session_id);
        assert_eq!(session.session_id(), Some(second.session_id));
        assert_eq!(session.runs(), 2);
    }

    #[test]
    fn test_ack_classification() {
        let mut session = InterfaceSession::new();
        let (main, function) = program();
        session.begin_run_with_id(42, main, function);

        assert_eq!(session.record_ack(&AckMessage::new(42, 10)), AckStatus::Fresh);
        assert_eq!(session.record_ack(&AckMessage::new(42, 10)), AckStatus::Duplicate);
        assert_eq!(session.record_ack(&AckMessage::new(42, 11)), AckStatus::Fresh);
        assert_eq!(
            session.record_ack(&AckMessage::new(42, 14)),
            AckStatus::Missed { missed: 2 }
        );
        assert_eq!(session.last_ack_counter(), Some(14));
        assert_eq!(
            session.record_ack(&AckMessage::new(7, 15)),
            AckStatus::WrongSession { expected: Some(42), actual: 7 }
        );
    }

    #[test]
    fn test_counter_tracked_across_runs() {
        let mut session = InterfaceSession::new();
        let (main, function) = program();
        session.begin_run_with_id(1, main, function);
        session.record_ack(&AckMessage::new(1, 5));

        session.begin_run_with_id(2, main, function);
        assert_eq!(session.last_ack_counter(), Some(5));
        assert_eq!(session.record_ack(&AckMessage::new(2, 6)), AckStatus::Fresh);

        session.begin_run_with_id(3, main, function);
        assert_eq!(
            session.record_ack(&AckMessage::new(3, 8)),
            AckStatus::Missed { missed: 1 }
        );
    }

    #[test]
    fn test_counter_restart_confirms_new_run() {
        let mut session = InterfaceSession::new();
        let (main, function) = program();
        session.begin_run_with_id(1, main, function);
        session.record_ack(&AckMessage::new(1, 40));

        session.begin_run_with_id(2, main, function);
        assert_eq!(session.record_ack(&AckMessage::new(2, 1)), AckStatus::Fresh);
        assert_eq!(session.record_ack(&AckMessage::new(2, 1)), AckStatus::Duplicate);
        assert_eq!(session.last_ack_counter(), Some(1));
    }

    #[test]
    fn test_counter_wraparound() {
        let mut session = InterfaceSession::new();
        let (main, function) = program();
        session.begin_run_with_id(1, main, function);

        assert_eq!(session.record_ack(&AckMessage::new(1, u32::MAX)), AckStatus::Fresh);
        assert_eq!(session.record_ack(&AckMessage::new(1, 0)), AckStatus::Fresh);
        assert_eq!(
            session.record_ack(&AckMessage::new(1, 3)),
            AckStatus::Missed { missed: 2 }
        );
        assert_eq!(session.record_ack(&AckMessage::new(1, u32::MAX)), AckStatus::Duplicate);
    }

    #[test]
    fn test_robot_counter_wraps() {
        let mut robot = RobotSession::new();
        robot.ack_message_count = u32::MAX;
        assert_eq!(robot.next_ack(1).message_counter, 0);
    }

    #[test]
    fn test_robot_counter_and_dedup() {
        let mut robot = RobotSession::new();
        let (main, function) = program();
        let msg = CommandsMessage::new(9, main, function);

        assert_eq!(robot.on_commands(&msg), Delivery::New);
        assert_eq!(robot.next_ack(9).message_counter, 1);
        assert_eq!(robot.on_commands(&msg), Delivery::Retransmission);
        assert_eq!(robot.next_ack(9).message_counter, 2);

        let next = CommandsMessage::new(10, main, function);
        assert_eq!(robot.on_commands(&next), Delivery::New);
        assert_eq!(robot.programs_received(), 2);
        assert_eq!(robot.ack_message_count(), 2);
        assert_eq!(robot.current_session(), Some(10));
    }

    #[test]
    fn test_reused_session_with_new_program_is_delivered() {
        let mut robot = RobotSession::new();
        let (main, function) = program();
        let first = CommandsMessage::new(3, main, function);
        let changed =
            CommandsMessage::new(3, MainInstructions::parse_program("LL").unwrap(), function);

        assert_eq!(robot.on_commands(&first), Delivery::New);
        assert_eq!(robot.on_commands(&changed), Delivery::New);
        assert_eq!(robot.on_commands(&changed), Delivery::Retransmission);
        assert_eq!(robot.programs_received(), 2);
    }
}
