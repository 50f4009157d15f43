//! Notify module: push events and how they reach players.
//!
//! This module implements:
//! - `GameEvent`: the push surface as a single serializable enum
//! - `PlayerCallback`: what a client connection implements to receive pushes
//! - `CallbackHandle`: the weak reference a session keeps to a callback
//! - `NotificationDispatcher`: isolated, ordered delivery lanes per player

pub mod callback;
pub mod dispatcher;
pub mod events;

pub use callback::{
    CallbackError, CallbackHandle, CallbackResult, ChannelCallback, PlayerCallback, deliver,
};
pub use dispatcher::{DispatchReport, Notification, NotificationDispatcher};
pub use events::{GameEvent, ScoreEntry, TurnView};
