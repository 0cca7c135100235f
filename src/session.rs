//! Communication session management
//!
//! This module defines the trait for tunneling messages between the room
//! engine and connected clients. One tunnel corresponds to one accepted
//! connection; a player reconnecting from several tabs owns several
//! tunnels at once. The abstraction keeps the engine independent of the
//! actual transport (WebSockets or otherwise).

use super::{StateMessage, UpdateMessage};

/// Trait for sending messages through a communication tunnel
///
/// Sends are fire-and-forget: a slow or dead peer must never stall the
/// room, so implementations are expected to buffer or drop rather than
/// block.
pub trait Tunnel {
    /// Sends a discrete event message to the client
    ///
    /// Event messages carry alerts, reactions, and guess results that are
    /// not part of the periodic full-state broadcast.
    ///
    /// # Arguments
    ///
    /// * `message` - The event message to send
    fn send_message(&self, message: &UpdateMessage);

    /// Sends a full room-state projection to the client
    ///
    /// State messages replace whatever view the client currently renders;
    /// they are sent on every tick, on join, and on drawing updates.
    ///
    /// # Arguments
    ///
    /// * `state` - The state message to send
    fn send_state(&self, state: &StateMessage);

    /// Closes the communication tunnel
    ///
    /// Called by the hosting environment when the connection is no longer
    /// needed, e.g. on room teardown.
    fn close(self);
}
