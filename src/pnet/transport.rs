//! Bus transport abstraction: a half-duplex, line-oriented channel.
//!
//! Concrete implementations:
//! - RS-485 UART with a driver-enable pin (`adapters::rs485`)
//! - scripted child network in the integration tests
//!
//! The session layer is generic over `BusTransport`, so the protocol
//! logic never touches a UART directly.

use super::codec::Line;

/// Half-duplex line channel shared by all children.
pub trait BusTransport {
    /// Error type for this transport.
    type Error: core::fmt::Debug;

    /// Drive the bus (`true`) or release it for the reply (`false`).
    fn set_transmit(&mut self, enable: bool);

    /// Send one request line, terminator included.
    fn send_line(&mut self, line: &str) -> Result<(), Self::Error>;

    /// Wait up to `timeout_ms` for one CR-terminated line.  The
    /// terminator is stripped.  `None` on timeout.
    fn receive_line(&mut self, timeout_ms: u32) -> Option<Line>;
}
