//! Simulated PNet child network for integration tests.
//!
//! Every request written to the bus is answered by the addressed
//! [`SimChild`] the way real child firmware would: handshakes report the
//! live status byte, readings come from the child's sensors, and output
//! commands are applied and echoed.  Children can be taken offline or
//! made to misbehave per test.

use ccs_parent::nodes::status;
use ccs_parent::pnet::codec::Line;
use ccs_parent::pnet::transport::BusTransport;

#[derive(Debug, Clone)]
pub struct SimChild {
    pub online: bool,
    pub version: char,
    pub liquid: bool,
    pub temperature_f: f32,
    pub rel_humidity: f32,
    pub secondary_f: f32,
    /// Echo the opposite polarity to output commands (and don't apply them).
    pub wrong_polarity: bool,
    /// Raw reply override for the next request, if set.
    pub next_reply: Option<String>,
    /// Output bits as applied by commands.
    pub outputs: u8,
}

impl Default for SimChild {
    fn default() -> Self {
        Self {
            online: true,
            version: 'A',
            liquid: false,
            temperature_f: 72.0,
            rel_humidity: 45.0,
            secondary_f: 65.0,
            wrong_polarity: false,
            next_reply: None,
            outputs: 0,
        }
    }
}

impl SimChild {
    pub fn status_byte(&self) -> u8 {
        let mut s = self.outputs | status::TEMP1_OK | status::RHUMID_OK;
        if self.liquid {
            s |= status::LIQUID_DETECTED;
        }
        s
    }

    fn output_bit(relay: bool, channel: char) -> u8 {
        match (relay, channel) {
            (true, 'a') => status::RELAY1_ON,
            (true, _) => status::RELAY2_ON,
            (false, 'a') => status::SWITCHED_POWER1_ON,
            (false, _) => status::SWITCHED_POWER2_ON,
        }
    }

    fn answer(&mut self, n: char, request: SimRequest) -> String {
        if let Some(reply) = self.next_reply.take() {
            return reply;
        }
        match request {
            SimRequest::Attention => format!("ak{}{}{:02X}", n, self.version, self.status_byte()),
            SimRequest::Temperature => format!("tk{}{:.1}", n, self.temperature_f),
            SimRequest::Humidity => format!("hk{}{:.1}", n, self.rel_humidity),
            SimRequest::Secondary => format!("sk{}{:.1}", n, self.secondary_f),
            SimRequest::Output { relay, channel, on } => {
                let bit = Self::output_bit(relay, channel);
                let echoed_on = if self.wrong_polarity {
                    !on
                } else {
                    if on {
                        self.outputs |= bit;
                    } else {
                        self.outputs &= !bit;
                    }
                    on
                };
                format!(
                    "{}k{}{}{}",
                    if relay { 'k' } else { 'p' },
                    n,
                    channel,
                    if echoed_on { '+' } else { '-' }
                )
            }
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum SimRequest {
    Attention,
    Temperature,
    Humidity,
    Secondary,
    Output { relay: bool, channel: char, on: bool },
}

/// Split a request line into its node digit and meaning.
fn parse_request(line: &str) -> Option<(char, SimRequest)> {
    let c: Vec<char> = line.chars().collect();
    match c.as_slice() {
        ['A', 'T', n] => Some((*n, SimRequest::Attention)),
        ['T', '?', n] => Some((*n, SimRequest::Temperature)),
        ['H', '?', n] => Some((*n, SimRequest::Humidity)),
        ['S', '?', n] => Some((*n, SimRequest::Secondary)),
        [op @ ('K' | 'P'), n, channel @ ('a' | 'b'), pol @ ('+' | '-')] => Some((
            *n,
            SimRequest::Output {
                relay: *op == 'K',
                channel: *channel,
                on: *pol == '+',
            },
        )),
        _ => None,
    }
}

/// Eight simulated children on one bus.
pub struct SimBus {
    pub children: [SimChild; 8],
    /// Every request line as sent (terminator stripped).
    pub sent: Vec<String>,
    /// Every reply put on the wire.
    pub replies: Vec<String>,
    /// `true` while the parent drives the bus.
    pub transmitting: bool,
    /// Lines written while the driver was not enabled.
    pub sent_without_driver: usize,
    pending: Option<String>,
}

#[allow(dead_code)]
impl SimBus {
    pub fn new() -> Self {
        Self {
            children: Default::default(),
            sent: Vec::new(),
            replies: Vec::new(),
            transmitting: false,
            sent_without_driver: 0,
            pending: None,
        }
    }

    pub fn child(&mut self, n: u8) -> &mut SimChild {
        &mut self.children[usize::from(n - 1)]
    }

    pub fn last_sent(&self) -> Option<&str> {
        self.sent.last().map(String::as_str)
    }

    pub fn clear_log(&mut self) {
        self.sent.clear();
        self.replies.clear();
    }
}

impl Default for SimBus {
    fn default() -> Self {
        Self::new()
    }
}

impl BusTransport for SimBus {
    type Error = ();

    fn set_transmit(&mut self, enable: bool) {
        self.transmitting = enable;
    }

    fn send_line(&mut self, line: &str) -> Result<(), ()> {
        if !self.transmitting {
            self.sent_without_driver += 1;
        }
        let request = line.trim_end_matches('\r').to_string();
        self.pending = None;

        if let Some((n, req)) = parse_request(&request) {
            if let Some(slot) = n.to_digit(10).filter(|d| (1..=8).contains(d)) {
                let child = &mut self.children[(slot - 1) as usize];
                if child.online {
                    self.pending = Some(child.answer(n, req));
                }
            }
        }
        self.sent.push(request);
        Ok(())
    }

    fn receive_line(&mut self, _timeout_ms: u32) -> Option<Line> {
        let reply = self.pending.take()?;
        self.replies.push(reply.clone());
        Line::try_from(reply.as_str()).ok()
    }
}
