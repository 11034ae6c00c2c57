//! Resource manager: the hexagonal core.
//!
//! [`ResourceManager`] owns the node table, the sequencer, the decision
//! engine and the fault tracker.  All I/O flows through port traits
//! injected at call sites, making the whole manager testable with mock
//! adapters.
//!
//! ```text
//!  BusTransport ──▶ ┌──────────────────────────────┐ ──▶ EventSink
//!                   │       ResourceManager         │
//!  InteriorSensor ─▶│  Sequencer · Decision ·       │
//!  ClockPort ──────▶│  Tracker · NodeTable          │
//! ParentRelayPort ◀─└──────────────────────────────┘
//! ```
//!
//! Each [`tick`](ResourceManager::tick) performs exactly one sequencer
//! action.  Failures are returned in the [`StepReport`] and logged; they
//! never stop the loop.

use log::{debug, info, warn};

use crate::climate::{
    ClimateState, RelativeClimate, classify_exterior_relative, classify_interior,
};
use crate::config::{PersistedState, SystemConfig, validate_comfort_zone};
use crate::decision::{ClimateContext, DecisionEngine};
use crate::error::{Error, Result};
use crate::nodes::{ChildId, ChildNode, NodeTable, OutputSelector, ParentRelay, ResourceKind};
use crate::pnet::session::NodeSession;
use crate::sequencer::{Action, Sequencer, Step};
use crate::tracker::{EffectivenessCounters, EffectivenessReport, FaultTracker, SystemFaults};

use super::commands::AppCommand;
use super::events::{AppEvent, StatusSnapshot};
use super::ports::{
    BusTransport, ClockPort, EventSink, InteriorSample, InteriorSensorPort, ParentRelayPort,
    StateError, StatePort,
};

/// Seconds a change may sit unsaved before auto-save flushes it.
const AUTO_SAVE_DELAY_SECS: f32 = 5.0;

/// What one tick did.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepReport {
    pub step: Step,
    pub result: Result<()>,
}

impl StepReport {
    /// Node number on success (0 for the parent), negative code on failure.
    pub fn code(&self) -> i16 {
        match self.result {
            Ok(()) => self.step.action.node().map_or(0, |n| i16::from(n.get())),
            Err(e) => e.code(),
        }
    }
}

// ───────────────────────────────────────────────────────────────
// ResourceManager
// ───────────────────────────────────────────────────────────────

pub struct ResourceManager {
    config: SystemConfig,
    nodes: NodeTable,
    sequencer: Sequencer,
    engine: DecisionEngine,
    tracker: FaultTracker,
    suspended: bool,
    last_interior: Option<(InteriorSample, ClimateState)>,
    /// Fault word as last announced through the event sink.
    reported_faults: SystemFaults,
    /// Seconds per tick (derived from config).
    tick_secs: f32,
    tick_count: u64,
    state_dirty: bool,
    save_requested: bool,
    dirty_since_tick: u64,
}

impl ResourceManager {
    /// Fresh manager with no children defined.
    pub fn new(config: SystemConfig) -> Self {
        Self::restore(PersistedState {
            config,
            ..PersistedState::default()
        })
    }

    /// Rebuild from persisted state (node configs, parent relays, counters).
    pub fn restore(state: PersistedState) -> Self {
        let config = state.config;
        let tracker = FaultTracker::new(
            config.mia_max,
            config.effectiveness_floor_ticks,
            config.effectiveness_criterion,
            config.secondary_low_limit_f,
        )
        .with_counters(state.counters);

        Self {
            nodes: NodeTable::with_configs(state.parent, &state.children),
            sequencer: Sequencer::new(),
            engine: DecisionEngine::new(config.fan_humidity_threshold),
            tracker,
            suspended: false,
            last_interior: None,
            reported_faults: SystemFaults::default(),
            tick_secs: config.step_period_ms as f32 / 1000.0,
            tick_count: 0,
            state_dirty: false,
            save_requested: false,
            dirty_since_tick: 0,
            config,
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────

    pub fn start(&mut self, sink: &mut impl EventSink) {
        let defined_children = self.nodes.children().filter(|(_, c)| c.config.defined).count() as u8;
        sink.emit(&AppEvent::Started { defined_children });
        info!(
            "ResourceManager started: {} children defined, parent relays {}/{}",
            defined_children,
            self.nodes.parent.relay1.label(),
            self.nodes.parent.relay2.label()
        );
    }

    // ── Per-tick orchestration ────────────────────────────────

    /// Run one sequencer action: classify the interior, count it, do the
    /// next step, re-evaluate liveness.
    ///
    /// `hw` carries all three parent-local ports.  Returns `None` while
    /// suspended.
    pub fn tick(
        &mut self,
        bus: &mut impl BusTransport,
        hw: &mut (impl InteriorSensorPort + ParentRelayPort + ClockPort),
        sink: &mut impl EventSink,
    ) -> Option<StepReport> {
        self.tick_count += 1;

        // 1. Midnight bookkeeping runs even while suspended
        if hw.is_midnight_tick() {
            let report = self.tracker.midnight_reset();
            sink.emit(&AppEvent::DailyReport(report));
            self.mark_state_dirty();
        }

        if self.suspended {
            return None;
        }

        // 2. Interior classification and effectiveness counting
        let sample = hw.current_interior_sample();
        let interior = classify_interior(sample.temperature_f, sample.rel_humidity, &self.config.comfort);
        self.last_interior = Some((sample, interior));
        self.tracker.record_interior(interior);

        // 3. Exactly one sequencer action
        let step = self.sequencer.step(&self.nodes);
        if step.starts_pass {
            self.engine.begin_pass();
        }
        let ctx = ClimateContext {
            interior,
            exterior: self.exterior_relative(&sample),
            local_rel_humidity: None,
        };
        let result = self.run_action(step.action, &ctx, &sample, bus, hw, sink);
        if let Err(e) = result {
            debug!("Step {} {:?} -> {} ({})", step.index, step.action, e.code(), e);
        }

        // 4. Liveness and fault reporting
        self.tracker.evaluate_liveness(&self.nodes);
        self.report_fault_changes(sink);

        Some(StepReport { step, result })
    }

    fn exterior_relative(&self, interior: &InteriorSample) -> RelativeClimate {
        match self.nodes.exterior_sample() {
            Some((ext_t, ext_rh)) => classify_exterior_relative(
                ext_t,
                ext_rh,
                interior.temperature_f,
                interior.rel_humidity,
                &self.config.comfort,
            ),
            None => RelativeClimate::Indeterminate,
        }
    }

    fn run_action(
        &mut self,
        action: Action,
        ctx: &ClimateContext,
        sample: &InteriorSample,
        bus: &mut impl BusTransport,
        relays: &mut impl ParentRelayPort,
        sink: &mut impl EventSink,
    ) -> Result<()> {
        match action {
            Action::ServiceParent => self.service_parent(ctx, sample, relays, sink),
            Action::Attention(id) => self.attention(id, bus, sink),
            Action::AskHumidity(id) => {
                NodeSession::new(bus, &self.config.protocol).ask_humidity(&mut self.nodes, id)?;
                Ok(())
            }
            Action::AskTemperature(id) => {
                NodeSession::new(bus, &self.config.protocol).ask_temperature(&mut self.nodes, id)?;
                Ok(())
            }
            Action::AskSecondaryTemperature(id) => {
                let filtered = NodeSession::new(bus, &self.config.protocol).ask_secondary_temperature(
                    &mut self.nodes,
                    id,
                    self.config.secondary_filter_coefficient,
                )?;
                self.tracker.evaluate_secondary(filtered);
                Ok(())
            }
            Action::Actuate {
                node,
                output,
                resource,
            } => self.actuate(node, output, resource, ctx, bus, sink),
        }
    }

    /// Decide and apply the parent's own relays.  Unassigned relays are
    /// held off.
    fn service_parent(
        &mut self,
        ctx: &ClimateContext,
        sample: &InteriorSample,
        relays: &mut impl ParentRelayPort,
        sink: &mut impl EventSink,
    ) -> Result<()> {
        let local = ClimateContext {
            local_rel_humidity: Some(sample.rel_humidity),
            ..*ctx
        };
        let mut first_err = None;
        for relay in ParentRelay::ALL {
            let resource = self.nodes.parent.relay(relay);
            if resource == ResourceKind::Free {
                relays.set_relay(relay, false);
                continue;
            }
            match self.engine.decide(resource, relay.as_output(), &local) {
                Ok(on) => {
                    relays.set_relay(relay, on);
                    sink.emit(&AppEvent::ParentRelaySet { relay, resource, on });
                }
                Err(e) => {
                    warn!("DECIDE: parent {:?} ({}): {}", relay, resource.label(), e);
                    first_err.get_or_insert(e);
                }
            }
        }
        first_err.map_or(Ok(()), |e| Err(e.into()))
    }

    fn attention(
        &mut self,
        id: ChildId,
        bus: &mut impl BusTransport,
        sink: &mut impl EventSink,
    ) -> Result<()> {
        let mia_max = self.config.mia_max;
        let outcome = NodeSession::new(bus, &self.config.protocol).attention(&mut self.nodes, id);
        let child = self.nodes.child_mut(id);
        let was_lost = child.is_lost(mia_max);

        match outcome {
            Ok(_) => {
                child.missed_attention_count = 0;
                if was_lost {
                    info!("PNET: node {} back online", id);
                    sink.emit(&AppEvent::NodeRecovered(id));
                }
                if child.liquid_detected() {
                    warn!("PNET: node {} reports liquid", id);
                    self.tracker.raise_flood();
                }
                Ok(())
            }
            Err(e) => {
                let misses = child.record_miss(mia_max);
                if !was_lost && misses >= mia_max {
                    warn!("PNET: node {} lost after {} missed handshakes", id, misses);
                    sink.emit(&AppEvent::NodeLost(id));
                }
                Err(e.into())
            }
        }
    }

    fn actuate(
        &mut self,
        node: ChildId,
        output: OutputSelector,
        resource: ResourceKind,
        ctx: &ClimateContext,
        bus: &mut impl BusTransport,
        sink: &mut impl EventSink,
    ) -> Result<()> {
        let local = ClimateContext {
            local_rel_humidity: self.nodes.child(node).local_rel_humidity,
            ..*ctx
        };
        let on = self.engine.decide(resource, output, &local).inspect_err(|e| {
            warn!("DECIDE: node {} {}: {}", node, output.label(), e);
        })?;
        NodeSession::new(bus, &self.config.protocol).command_output(&mut self.nodes, node, output, on)?;
        sink.emit(&AppEvent::Actuated {
            node,
            output,
            resource,
            on,
        });
        Ok(())
    }

    fn report_fault_changes(&mut self, sink: &mut impl EventSink) {
        let now = self.tracker.faults();
        for fault in now.raised_since(self.reported_faults) {
            sink.emit(&AppEvent::FaultRaised(fault));
        }
        for fault in self.reported_faults.raised_since(now) {
            sink.emit(&AppEvent::FaultCleared(fault));
        }
        self.reported_faults = now;
    }

    // ── Command handling ──────────────────────────────────────

    /// Apply an operator command between ticks.  Rejected changes leave
    /// the manager untouched.
    pub fn handle_command(&mut self, cmd: AppCommand, sink: &mut impl EventSink) -> Result<()> {
        match cmd {
            AppCommand::AcknowledgeFaults => {
                self.tracker.acknowledge(&mut self.nodes);
                self.tracker.evaluate_liveness(&self.nodes);
                info!("Faults acknowledged, miss counters reset");
            }
            AppCommand::UpdateComfortZone(zone) => {
                validate_comfort_zone(&zone).map_err(rejected)?;
                self.config.comfort = zone;
                self.mark_state_dirty();
                info!(
                    "Comfort zone updated: {:.1}F ±{:.1}, {:.0}% ±{:.0}",
                    zone.setpoint_temp_f,
                    zone.tolerance_temp_f,
                    zone.setpoint_rel_humidity,
                    zone.tolerance_rel_humidity
                );
            }
            AppCommand::ConfigureNode { node, config } => {
                if config.defined && config.is_exterior_reference {
                    let taken = self.nodes.children().any(|(id, c)| {
                        id != node && c.config.defined && c.config.is_exterior_reference
                    });
                    if taken {
                        return Err(Error::Config("another child is already the exterior reference"));
                    }
                }
                self.nodes.configure(node, config);
                self.mark_state_dirty();
                info!("Node {} configured (defined={})", node, config.defined);
            }
            AppCommand::AssignParentRelay { relay, resource } => {
                if resource == ResourceKind::InternalFan {
                    return Err(Error::Config("internal fan needs a switched-power output"));
                }
                self.nodes.parent.assign(relay, resource);
                self.mark_state_dirty();
                info!("Parent {:?} assigned to {}", relay, resource.label());
            }
            AppCommand::SetSuspended(suspended) => {
                if suspended != self.suspended {
                    self.suspended = suspended;
                    sink.emit(&AppEvent::Suspended(suspended));
                    info!("Resource manager {}", if suspended { "suspended" } else { "resumed" });
                }
            }
            AppCommand::SaveState => {
                self.mark_state_dirty();
                self.save_requested = true;
                info!("Explicit state save requested (will flush on next auto-save check)");
            }
        }
        self.report_fault_changes(sink);
        Ok(())
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn system_faults(&self) -> SystemFaults {
        self.tracker.faults()
    }

    pub fn nodes(&self) -> &NodeTable {
        &self.nodes
    }

    pub fn child(&self, id: ChildId) -> &ChildNode {
        self.nodes.child(id)
    }

    pub fn counters(&self) -> &EffectivenessCounters {
        self.tracker.counters()
    }

    pub fn effectiveness_report(&self) -> EffectivenessReport {
        self.tracker.counters().report()
    }

    pub fn config(&self) -> &SystemConfig {
        &self.config
    }

    pub fn is_suspended(&self) -> bool {
        self.suspended
    }

    pub fn exchange_active(&self) -> bool {
        self.engine.exchange_active()
    }

    /// Interior classification from the most recent tick.
    pub fn interior_climate(&self) -> Option<ClimateState> {
        self.last_interior.map(|(_, state)| state)
    }

    /// Next sequencer row.
    pub fn sequencer_cursor(&self) -> usize {
        self.sequencer.cursor()
    }

    /// Total ticks since startup.
    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    pub fn status_snapshot(&self) -> StatusSnapshot {
        let (defined, active) = self.nodes.children().fold((0u8, 0u8), |(d, a), (_, c)| {
            (
                d + u8::from(c.config.defined),
                a + u8::from(c.config.defined && c.active),
            )
        });
        StatusSnapshot {
            faults: self.tracker.faults().bits(),
            active_children: active,
            defined_children: defined,
            exchange_active: self.engine.exchange_active(),
            interior_temp_f: self.last_interior.map(|(s, _)| s.temperature_f),
            interior_rel_humidity: self.last_interior.map(|(s, _)| s.rel_humidity),
            effectiveness: self.effectiveness_report(),
        }
    }

    /// Everything that survives a power cycle.
    pub fn persisted_state(&self) -> PersistedState {
        PersistedState {
            config: self.config,
            parent: self.nodes.parent,
            children: self.nodes.configs(),
            counters: *self.tracker.counters(),
        }
    }

    // ── State dirty-flag management ───────────────────────────

    pub fn mark_state_dirty(&mut self) {
        if !self.state_dirty {
            self.state_dirty = true;
            self.dirty_since_tick = self.tick_count;
        }
    }

    /// Save if a change has been pending for the auto-save delay, or a
    /// save was requested.  Returns `true` if the state was saved.
    pub fn auto_save_if_needed(&mut self, storage: &impl StatePort) -> bool {
        if !self.state_dirty {
            return false;
        }
        let ticks_since_dirty = self.tick_count.saturating_sub(self.dirty_since_tick);
        let secs_since_dirty = ticks_since_dirty as f32 * self.tick_secs;
        if !self.save_requested && secs_since_dirty < AUTO_SAVE_DELAY_SECS {
            return false;
        }
        self.save(storage, "auto-saved")
    }

    /// Force-save if dirty (call before a controlled restart).
    pub fn force_save_if_dirty(&mut self, storage: &impl StatePort) {
        if self.state_dirty {
            self.save(storage, "force-saved");
        }
    }

    fn save(&mut self, storage: &impl StatePort, how: &str) -> bool {
        match storage.save_state(&self.persisted_state()) {
            Ok(()) => {
                self.state_dirty = false;
                self.save_requested = false;
                self.tracker.set_storage_fault(false);
                info!("State {} to NVS", how);
                true
            }
            Err(e) => {
                self.save_requested = false;
                self.tracker.set_storage_fault(true);
                warn!("State save failed: {}", e);
                false
            }
        }
    }

    /// Whether the state has unsaved changes.
    pub fn is_state_dirty(&self) -> bool {
        self.state_dirty
    }
}

fn rejected(e: StateError) -> Error {
    match e {
        StateError::ValidationFailed(msg) => Error::Config(msg),
        _ => Error::Config("rejected"),
    }
}
