//! PNet line codec.
//!
//! Wire format (all lines CR-terminated, no LF):
//! ```text
//! Request          Response
//! AT<n>            ak<n><ver><hi><lo>      handshake, status byte as hex
//! T?<n>            tk<n><float, ≤7 chars>  local temperature (°F)
//! H?<n>            hk<n><float, ≤7 chars>  local relative humidity (%)
//! S?<n>            sk<n><float, ≤7 chars>  secondary temperature (°F)
//! K<n><a|b><+|->   kk<n><a|b><+|->         relay command echo
//! P<n><a|b><+|->   pk<n><a|b><+|->         switched-power command echo
//! ```
//!
//! Parsing is pure and strict: every character position is checked and
//! the first deviation decides the error.  [`LineAssembler`] turns a raw
//! byte stream into lines for transports that receive piecemeal.

use core::fmt::Write;

use crate::error::PnetError;
use crate::nodes::{Channel, ChildId};

/// Longest line either side sends, terminator excluded.
pub const LINE_CAPACITY: usize = 16;

/// One protocol line, terminator stripped.
pub type Line = heapless::String<LINE_CAPACITY>;

/// Line terminator.
pub const CR: u8 = b'\r';

/// Width of the numeric field in reading responses.
const FLOAT_FIELD_MAX: usize = 7;

/// Plausible temperature range (°F) for any probe.
pub const TEMPERATURE_RANGE_F: (f32, f32) = (-50.0, 120.0);
/// Plausible relative humidity range (%).
pub const HUMIDITY_RANGE: (f32, f32) = (0.0, 100.0);

// ── Requests ──────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Request {
    Attention(ChildId),
    AskTemperature(ChildId),
    AskHumidity(ChildId),
    AskSecondaryTemperature(ChildId),
    Relay { node: ChildId, channel: Channel, on: bool },
    SwitchedPower { node: ChildId, channel: Channel, on: bool },
}

const fn polarity(on: bool) -> u8 {
    if on { b'+' } else { b'-' }
}

impl Request {
    pub const fn node(&self) -> ChildId {
        match *self {
            Self::Attention(n)
            | Self::AskTemperature(n)
            | Self::AskHumidity(n)
            | Self::AskSecondaryTemperature(n)
            | Self::Relay { node: n, .. }
            | Self::SwitchedPower { node: n, .. } => n,
        }
    }

    /// First character of a valid response to this request.
    pub const fn response_opcode(&self) -> u8 {
        match self {
            Self::Attention(_) => b'a',
            Self::AskTemperature(_) => b't',
            Self::AskHumidity(_) => b'h',
            Self::AskSecondaryTemperature(_) => b's',
            Self::Relay { .. } => b'k',
            Self::SwitchedPower { .. } => b'p',
        }
    }

    /// Render the request line, CR included.
    pub fn encode(&self) -> Line {
        let mut out = Line::new();
        let n = self.node().wire_char() as char;
        // At most five characters plus CR.
        let _ = match *self {
            Self::Attention(_) => write!(out, "AT{n}\r"),
            Self::AskTemperature(_) => write!(out, "T?{n}\r"),
            Self::AskHumidity(_) => write!(out, "H?{n}\r"),
            Self::AskSecondaryTemperature(_) => write!(out, "S?{n}\r"),
            Self::Relay { channel, on, .. } => write!(
                out,
                "K{n}{}{}\r",
                channel.wire_char() as char,
                polarity(on) as char
            ),
            Self::SwitchedPower { channel, on, .. } => write!(
                out,
                "P{n}{}{}\r",
                channel.wire_char() as char,
                polarity(on) as char
            ),
        };
        out
    }
}

// ── Responses ─────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Response {
    /// Handshake accepted; low status byte as reported.
    Attention { status: u8 },
    /// A validated reading.
    Reading(f32),
    /// Command echoed exactly.
    Echo,
}

/// Check one response line (terminator already stripped) against the
/// request it answers.
pub fn parse_response(request: &Request, line: &str, version: u8) -> Result<Response, PnetError> {
    let b = line.as_bytes();
    if b.is_empty() {
        return Err(PnetError::NoResponse);
    }
    expect_at(b, 0, request.response_opcode(), PnetError::WrongOpcode)?;
    expect_at(b, 1, b'k', PnetError::WrongAck)?;
    expect_at(b, 2, request.node().wire_char(), PnetError::WrongNode)?;
    let body = &b[3..];

    match *request {
        Request::Attention(_) => parse_attention(body, version),
        Request::AskTemperature(_) | Request::AskSecondaryTemperature(_) => {
            parse_reading(body, TEMPERATURE_RANGE_F).map(Response::Reading)
        }
        Request::AskHumidity(_) => parse_reading(body, HUMIDITY_RANGE).map(Response::Reading),
        Request::Relay { channel, on, .. } | Request::SwitchedPower { channel, on, .. } => {
            parse_echo(body, channel, on)
        }
    }
}

fn expect_at(b: &[u8], idx: usize, want: u8, err: PnetError) -> Result<(), PnetError> {
    match b.get(idx) {
        Some(&c) if c == want => Ok(()),
        Some(_) => Err(err),
        None => Err(PnetError::Malformed),
    }
}

fn parse_attention(body: &[u8], version: u8) -> Result<Response, PnetError> {
    match body.first() {
        None => return Err(PnetError::Malformed),
        Some(&v) if v != version => return Err(PnetError::WrongVersion),
        Some(_) => {}
    }
    let [_, hi, lo] = body else {
        return Err(PnetError::Malformed);
    };
    let status = (hex_nibble(*hi)? << 4) | hex_nibble(*lo)?;
    Ok(Response::Attention { status })
}

fn hex_nibble(c: u8) -> Result<u8, PnetError> {
    match c {
        b'0'..=b'9' => Ok(c - b'0'),
        b'A'..=b'F' => Ok(c - b'A' + 10),
        b'a'..=b'f' => Ok(c - b'a' + 10),
        _ => Err(PnetError::Malformed),
    }
}

fn parse_reading(field: &[u8], (min, max): (f32, f32)) -> Result<f32, PnetError> {
    if field.is_empty() || field.len() > FLOAT_FIELD_MAX {
        return Err(PnetError::Malformed);
    }
    let text = core::str::from_utf8(field).map_err(|_| PnetError::Malformed)?;
    let value: f32 = text.trim().parse().map_err(|_| PnetError::Malformed)?;
    if !value.is_finite() {
        return Err(PnetError::Malformed);
    }
    if value < min || value > max {
        return Err(PnetError::OutOfRange);
    }
    Ok(value)
}

fn parse_echo(body: &[u8], channel: Channel, on: bool) -> Result<Response, PnetError> {
    let [sel, pol] = body else {
        return Err(PnetError::Malformed);
    };
    if *sel != channel.wire_char() || *pol != polarity(on) {
        return Err(PnetError::EchoMismatch);
    }
    Ok(Response::Echo)
}

// ── Stream framing ────────────────────────────────────────────

/// Accumulates received bytes and yields complete CR-terminated lines.
///
/// A line longer than [`LINE_CAPACITY`] is dropped whole; the assembler
/// resynchronises at the next CR.  LF is ignored.
pub struct LineAssembler {
    buf: Line,
    overflowed: bool,
}

impl Default for LineAssembler {
    fn default() -> Self {
        Self::new()
    }
}

impl LineAssembler {
    pub const fn new() -> Self {
        Self {
            buf: Line::new(),
            overflowed: false,
        }
    }

    /// Feed one byte.  Returns a line when `byte` completes one.
    pub fn push(&mut self, byte: u8) -> Option<Line> {
        match byte {
            CR => {
                let line = core::mem::take(&mut self.buf);
                let overflowed = core::mem::replace(&mut self.overflowed, false);
                (!overflowed).then_some(line)
            }
            b'\n' => None,
            _ if self.overflowed => None,
            _ => {
                if !byte.is_ascii() || self.buf.push(byte as char).is_err() {
                    self.buf.clear();
                    self.overflowed = true;
                }
                None
            }
        }
    }

    /// Discard any partial line (e.g. before a new request).
    pub fn reset(&mut self) {
        self.buf.clear();
        self.overflowed = false;
    }
}
