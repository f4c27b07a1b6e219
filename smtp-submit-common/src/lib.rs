//! Shared building blocks for the `smtp-submit` client: the pure
//! finite-state-machine trait used by the conversation driver, the
//! crate-wide error taxonomy, and the `tracing` logging setup shared by
//! every connection.

pub mod error;
pub mod fsm;
pub mod logging;

pub use error::{ConfigError, SmtpError};
pub use fsm::FiniteStateMachine;
