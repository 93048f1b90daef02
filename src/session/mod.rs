//! Session state machine and controller

pub mod controller;
pub mod state;

pub use controller::{SessionCommand, SessionController, SessionHandle, StatusSnapshot};
pub use state::{Action, Event, SessionState};
