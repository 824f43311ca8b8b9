//! Primo - Cubetto playset radio protocol
//!
//! Wire format, validation and session handling for the link between a
//! handheld Interface and a Cubetto Robot.

pub mod config;
pub mod endpoint;
pub mod protocol;
pub mod radio;
pub mod session;
