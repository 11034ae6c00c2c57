//! Node session: one request/response transaction per call, applied to
//! the node table.
//!
//! Each operation writes the request with the bus driven, releases the
//! bus, waits for the reply and validates it through the codec.  On
//! failure the stored values stay untouched; only the handshake changes
//! node state on failure (it clears `active`).

use log::{debug, warn};

use super::codec::{self, Request, Response};
use super::transport::BusTransport;
use crate::config::ProtocolConfig;
use crate::error::PnetError;
use crate::nodes::{Channel, ChildId, NodeTable, OutputSelector};

pub struct NodeSession<'a, B: BusTransport> {
    bus: &'a mut B,
    timeout_ms: u32,
    version: u8,
}

impl<'a, B: BusTransport> NodeSession<'a, B> {
    pub fn new(bus: &'a mut B, protocol: &ProtocolConfig) -> Self {
        Self {
            bus,
            timeout_ms: protocol.response_timeout_ms,
            version: protocol.version,
        }
    }

    fn transact(&mut self, request: &Request) -> Result<Response, PnetError> {
        let line = request.encode();
        self.bus.set_transmit(true);
        let sent = self.bus.send_line(&line);
        self.bus.set_transmit(false);
        if let Err(e) = sent {
            warn!("PNET: send to node {} failed: {:?}", request.node(), e);
            return Err(PnetError::SendFailed);
        }

        let Some(reply) = self.bus.receive_line(self.timeout_ms) else {
            debug!("PNET: node {} silent", request.node());
            return Err(PnetError::NoResponse);
        };
        codec::parse_response(request, &reply, self.version).inspect_err(|e| {
            debug!("PNET: node {} replied {:?}: {}", request.node(), reply.as_str(), e);
        })
    }

    /// Handshake.  Success records the status byte and marks the node
    /// active; any failure marks it inactive.  The miss counter is the
    /// caller's business.
    pub fn attention(&mut self, nodes: &mut NodeTable, id: ChildId) -> Result<ChildId, PnetError> {
        let child = nodes.child_mut(id);
        child.active = false;
        match self.transact(&Request::Attention(id))? {
            Response::Attention { status } => {
                child.status = status;
                child.active = true;
                Ok(id)
            }
            _ => Err(PnetError::Malformed),
        }
    }

    fn ask(&mut self, request: Request) -> Result<f32, PnetError> {
        match self.transact(&request)? {
            Response::Reading(v) => Ok(v),
            _ => Err(PnetError::Malformed),
        }
    }

    /// Local temperature; also feeds the exterior reading when the node
    /// is the exterior reference.
    pub fn ask_temperature(&mut self, nodes: &mut NodeTable, id: ChildId) -> Result<f32, PnetError> {
        let value = self.ask(Request::AskTemperature(id))?;
        let child = nodes.child_mut(id);
        child.local_temperature_f = Some(value);
        if child.config.is_exterior_reference {
            nodes.exterior.temperature_f = Some(value);
        }
        Ok(value)
    }

    pub fn ask_humidity(&mut self, nodes: &mut NodeTable, id: ChildId) -> Result<f32, PnetError> {
        let value = self.ask(Request::AskHumidity(id))?;
        let child = nodes.child_mut(id);
        child.local_rel_humidity = Some(value);
        if child.config.is_exterior_reference {
            nodes.exterior.rel_humidity = Some(value);
        }
        Ok(value)
    }

    /// Secondary temperature, folded into the node's filtered value with
    /// `filtered += coefficient * (reading - filtered)`.  The first valid
    /// reading seeds the filter.  Returns the filtered value.
    pub fn ask_secondary_temperature(
        &mut self,
        nodes: &mut NodeTable,
        id: ChildId,
        coefficient: f32,
    ) -> Result<f32, PnetError> {
        let value = self.ask(Request::AskSecondaryTemperature(id))?;
        let child = nodes.child_mut(id);
        let filtered = match child.secondary_temperature_f {
            Some(prev) => prev + coefficient * (value - prev),
            None => value,
        };
        child.secondary_temperature_f = Some(filtered);
        Ok(filtered)
    }

    pub fn command_relay(
        &mut self,
        nodes: &mut NodeTable,
        id: ChildId,
        channel: Channel,
        on: bool,
    ) -> Result<ChildId, PnetError> {
        let selector = match channel {
            Channel::A => OutputSelector::Relay1,
            Channel::B => OutputSelector::Relay2,
        };
        self.command(nodes, id, selector, Request::Relay { node: id, channel, on }, on)
    }

    pub fn command_switched_power(
        &mut self,
        nodes: &mut NodeTable,
        id: ChildId,
        channel: Channel,
        on: bool,
    ) -> Result<ChildId, PnetError> {
        let selector = match channel {
            Channel::A => OutputSelector::SwitchedPower1,
            Channel::B => OutputSelector::SwitchedPower2,
        };
        self.command(nodes, id, selector, Request::SwitchedPower { node: id, channel, on }, on)
    }

    /// Dispatch on the output kind.
    pub fn command_output(
        &mut self,
        nodes: &mut NodeTable,
        id: ChildId,
        output: OutputSelector,
        on: bool,
    ) -> Result<ChildId, PnetError> {
        if output.is_relay() {
            self.command_relay(nodes, id, output.channel(), on)
        } else {
            self.command_switched_power(nodes, id, output.channel(), on)
        }
    }

    fn command(
        &mut self,
        nodes: &mut NodeTable,
        id: ChildId,
        selector: OutputSelector,
        request: Request,
        on: bool,
    ) -> Result<ChildId, PnetError> {
        match self.transact(&request)? {
            Response::Echo => {
                nodes.child_mut(id).record_commanded(selector, on);
                Ok(id)
            }
            _ => Err(PnetError::Malformed),
        }
    }
}
