//! Client for the remote-debug wire protocol.
//!
//! The [`Debugger`] facade owns a connection to a debug target: it
//! enables the protocol domains in order, correlates command responses,
//! tracks scripts and pause state, and resolves call frames into
//! renderable views. Consumers observe the session through typed
//! [`SessionEvent`]s or by subscribing to topics on the shared router.

mod client;
mod debugger;
mod enrich;
mod events;
mod internals;
mod session;
pub mod state;
pub mod types;

pub use debugger::{ConnectOptions, Debugger};
pub use events::{PausedEventBody, ProtocolEvent};
pub use session::{SessionEvent, SessionEventReceiver};
pub use state::{ExecutionState, SessionState};
