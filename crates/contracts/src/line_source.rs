//! LineSource trait - Transport abstraction
//!
//! Decouples the pull loop from the concrete byte stream (tty device,
//! serial-over-TCP bridge, stdin, capture replay, scripted test input).

use crate::{Line, TransportFault};

/// Lazy, potentially unbounded sequence of decoded lines.
///
/// A returned `TransportFault` is terminal for the current connection. The
/// source never reconnects on its own: the supervisor decides whether to
/// call [`LineSource::reconnect`] or shut down.
#[trait_variant::make(LineSource: Send)]
pub trait LocalLineSource {
    /// Endpoint description (device path, address, ...) for logs
    fn endpoint(&self) -> &str;

    /// Pull the next line.
    ///
    /// Suspends until a line is available. `Ok(None)` signals a clean end of
    /// stream.
    async fn next_line(&mut self) -> Result<Option<Line>, TransportFault>;

    /// Drop the current connection and open a new one
    async fn reconnect(&mut self) -> Result<(), TransportFault>;

    /// Release the connection
    async fn close(&mut self) -> Result<(), TransportFault>;
}
