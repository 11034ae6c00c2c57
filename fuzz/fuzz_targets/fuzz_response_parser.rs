//! Fuzz target: `LineAssembler::push` + `parse_response`
//!
//! Streams arbitrary bytes through the line assembler and parses every
//! line it yields against each request shape.  Neither may panic, and an
//! accepted reading must be finite.
//!
//! cargo fuzz run fuzz_response_parser

#![no_main]

use ccs_parent::nodes::{Channel, ChildId};
use ccs_parent::pnet::codec::{LINE_CAPACITY, LineAssembler, Request, Response, parse_response};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Some((&selector, stream)) = data.split_first() else {
        return;
    };
    let Some(node) = ChildId::new(selector % 8 + 1) else {
        return;
    };
    let requests = [
        Request::Attention(node),
        Request::AskTemperature(node),
        Request::AskHumidity(node),
        Request::AskSecondaryTemperature(node),
        Request::Relay { node, channel: Channel::A, on: selector & 0x80 != 0 },
        Request::SwitchedPower { node, channel: Channel::B, on: selector & 0x40 != 0 },
    ];

    let mut assembler = LineAssembler::new();
    for &byte in stream {
        let Some(line) = assembler.push(byte) else {
            continue;
        };
        assert!(line.len() <= LINE_CAPACITY);
        for request in &requests {
            if let Ok(Response::Reading(v)) = parse_response(request, &line, b'A') {
                assert!(v.is_finite());
            }
        }
    }
});
