//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing structured application events to
//! the ESP-IDF logger (which goes to UART0 / USB-CDC in production).
//! A display or telemetry adapter would implement the same trait.

use log::{debug, info, warn};

use crate::app::events::{AppEvent, StatusSnapshot};
use crate::app::ports::EventSink;

/// Adapter that logs every [`AppEvent`] to the serial console.
#[derive(Debug, Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }

    /// One-line JSON status, for the periodic status print.
    pub fn log_status(&mut self, status: &StatusSnapshot) {
        match serde_json::to_string(status) {
            Ok(json) => info!("STATUS | {}", json),
            Err(e) => warn!("STATUS | encode failed: {}", e),
        }
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::Started { defined_children } => {
                info!("START | {} child node(s) defined", defined_children);
            }
            AppEvent::NodeLost(id) => {
                info!("NODE | child {} lost", id);
            }
            AppEvent::NodeRecovered(id) => {
                info!("NODE | child {} recovered", id);
            }
            AppEvent::Actuated { node, output, resource, on } => {
                debug!(
                    "ACT | child {} {} ({}) -> {}",
                    node,
                    output.label(),
                    resource.label(),
                    if *on { "ON" } else { "OFF" },
                );
            }
            AppEvent::ParentRelaySet { relay, resource, on } => {
                debug!(
                    "ACT | parent {:?} ({}) -> {}",
                    relay,
                    resource.label(),
                    if *on { "ON" } else { "OFF" },
                );
            }
            AppEvent::FaultRaised(fault) => {
                info!("FAULT | raised: {} (0x{:04X})", fault, fault.mask());
            }
            AppEvent::FaultCleared(fault) => {
                info!("FAULT | cleared: {} (0x{:04X})", fault, fault.mask());
            }
            AppEvent::DailyReport(report) => match serde_json::to_string(report) {
                Ok(json) => info!("DAILY | {}", json),
                Err(e) => warn!("DAILY | encode failed: {}", e),
            },
            AppEvent::Suspended(on) => {
                info!("SUSPEND | {}", if *on { "held" } else { "resumed" });
            }
        }
    }
}
