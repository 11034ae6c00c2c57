//! Unified error types for the parent controller firmware.
//!
//! A single `Error` enum that every subsystem converts into, so the
//! resource manager handles failures uniformly.  All variants are `Copy`
//! so they can be returned from a bus transaction, stored in a step
//! report and emitted as an event without allocation.
//!
//! Every protocol and decision failure also carries a stable negative
//! code (see [`PnetError::code`] / [`DecisionError::code`]) for display
//! on the front panel and in the serial trace.

use core::fmt;

use crate::nodes::{OutputSelector, ResourceKind};

// ---------------------------------------------------------------------------
// Top-level firmware error
// ---------------------------------------------------------------------------

/// Every fallible resource-manager operation funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// A PNet transaction with a child failed.
    Pnet(PnetError),
    /// The decision engine has no rule for the resource/output pairing.
    Decision(DecisionError),
    /// Peripheral initialisation failed.
    Init(&'static str),
    /// A configuration change was rejected.
    Config(&'static str),
}

impl Error {
    /// Negative code as shown on the panel and in the serial trace.
    pub fn code(&self) -> i16 {
        match self {
            Self::Pnet(e) => e.code(),
            Self::Decision(e) => e.code(),
            Self::Init(_) => -20,
            Self::Config(_) => -21,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pnet(e) => write!(f, "pnet: {e}"),
            Self::Decision(e) => write!(f, "decision: {e}"),
            Self::Init(msg) => write!(f, "init: {msg}"),
            Self::Config(msg) => write!(f, "config: {msg}"),
        }
    }
}

// ---------------------------------------------------------------------------
// PNet protocol errors
// ---------------------------------------------------------------------------

/// Failure of a single request/response exchange on the bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PnetError {
    /// No line arrived within the protocol timeout.
    NoResponse,
    /// First character is not the expected response opcode.
    WrongOpcode,
    /// Second character is not the `k` acknowledgement.
    WrongAck,
    /// The response names a different node.
    WrongNode,
    /// The handshake echoed a different protocol version.
    WrongVersion,
    /// Response is truncated, too long, or a field does not parse.
    Malformed,
    /// Value parsed but lies outside the plausible sensor range.
    OutOfRange,
    /// A command echo carried a different selector or polarity.
    EchoMismatch,
    /// The transport refused the request line.
    SendFailed,
}

/// Coarse classification of a [`PnetError`] used by callers that only
/// care about severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PnetErrorClass {
    Timeout,
    ProtocolViolation,
    OutOfRange,
}

impl PnetError {
    pub const fn code(self) -> i16 {
        match self {
            Self::NoResponse => -1,
            Self::WrongOpcode => -2,
            Self::WrongAck => -3,
            Self::WrongNode => -4,
            Self::WrongVersion => -5,
            Self::Malformed => -6,
            Self::OutOfRange => -7,
            Self::EchoMismatch => -8,
            Self::SendFailed => -9,
        }
    }

    pub const fn class(self) -> PnetErrorClass {
        match self {
            Self::NoResponse | Self::SendFailed => PnetErrorClass::Timeout,
            Self::OutOfRange => PnetErrorClass::OutOfRange,
            Self::WrongOpcode
            | Self::WrongAck
            | Self::WrongNode
            | Self::WrongVersion
            | Self::Malformed
            | Self::EchoMismatch => PnetErrorClass::ProtocolViolation,
        }
    }
}

impl fmt::Display for PnetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoResponse => write!(f, "no response"),
            Self::WrongOpcode => write!(f, "wrong opcode"),
            Self::WrongAck => write!(f, "missing ack"),
            Self::WrongNode => write!(f, "wrong node id"),
            Self::WrongVersion => write!(f, "protocol version mismatch"),
            Self::Malformed => write!(f, "malformed response"),
            Self::OutOfRange => write!(f, "value out of range"),
            Self::EchoMismatch => write!(f, "command echo mismatch"),
            Self::SendFailed => write!(f, "send failed"),
        }
    }
}

impl From<PnetError> for Error {
    fn from(e: PnetError) -> Self {
        Self::Pnet(e)
    }
}

// ---------------------------------------------------------------------------
// Decision errors
// ---------------------------------------------------------------------------

/// The decision engine was asked about a pairing it has no rule for.
/// Never expected with a sane configuration; no command is sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecisionError {
    /// The resource is not allowed on this kind of output
    /// (e.g. an internal fan on a relay).
    UnsupportedOutput(ResourceKind, OutputSelector),
    /// The resource has no actuation rule at all (`Free`).
    NoRule(ResourceKind),
}

impl DecisionError {
    pub const fn code(self) -> i16 {
        match self {
            Self::UnsupportedOutput(..) => -10,
            Self::NoRule(_) => -11,
        }
    }
}

impl fmt::Display for DecisionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnsupportedOutput(kind, output) => {
                write!(f, "{} not supported on {}", kind.label(), output.label())
            }
            Self::NoRule(kind) => write!(f, "no rule for {}", kind.label()),
        }
    }
}

impl From<DecisionError> for Error {
    fn from(e: DecisionError) -> Self {
        Self::Decision(e)
    }
}

// ---------------------------------------------------------------------------
// System faults
// ---------------------------------------------------------------------------

/// User-visible fault bits, accumulated by the fault tracker in a `u16`
/// bitfield so several faults can be shown and cleared independently.
/// Bit positions match the panel's fault word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum SystemFault {
    /// A child missed the maximum number of consecutive handshakes.
    LostNode = 0x8000,
    /// A child reported liquid on its flood sensor.  Latched.
    FloodDetected = 0x2000,
    /// Filtered secondary ("boiler") temperature is below the limit.
    SecondaryTempLow = 0x0400,
    /// Too much of the day spent outside the temperature band.
    CannotControlTemperature = 0x0080,
    /// Too much of the day spent outside the humidity band.
    CannotControlHumidity = 0x0040,
    /// Persisting the node table or counters failed.
    Storage = 0x0020,
}

impl SystemFault {
    pub const ALL: [Self; 6] = [
        Self::LostNode,
        Self::FloodDetected,
        Self::SecondaryTempLow,
        Self::CannotControlTemperature,
        Self::CannotControlHumidity,
        Self::Storage,
    ];

    /// Return the bitmask for this fault.
    pub const fn mask(self) -> u16 {
        self as u16
    }
}

impl fmt::Display for SystemFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LostNode => write!(f, "lost child node"),
            Self::FloodDetected => write!(f, "flood detected"),
            Self::SecondaryTempLow => write!(f, "secondary temperature low"),
            Self::CannotControlTemperature => write!(f, "cannot control temperature"),
            Self::CannotControlHumidity => write!(f, "cannot control humidity"),
            Self::Storage => write!(f, "storage failure"),
        }
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Firmware-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
