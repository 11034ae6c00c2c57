//! Fault and effectiveness tracker.
//!
//! Owns the system fault word and the daily discomfort counters.
//! Faults fall into two groups:
//!
//! - **Re-evaluated** every invocation: lost node, secondary temperature
//!   low, and the two effectiveness faults.
//! - **Latched** until the operator acknowledges: flood detected and
//!   storage failure.

use log::{error, info};
use serde::{Deserialize, Serialize};

use crate::climate::ClimateState;
use crate::error::SystemFault;
use crate::nodes::NodeTable;

// ── Fault word ────────────────────────────────────────────────

/// Bitfield of active [`SystemFault`]s.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SystemFaults(u16);

impl SystemFaults {
    pub const fn bits(self) -> u16 {
        self.0
    }

    pub const fn contains(self, fault: SystemFault) -> bool {
        self.0 & fault.mask() != 0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Faults present in `self` but not in `earlier`.
    pub fn raised_since(self, earlier: Self) -> impl Iterator<Item = SystemFault> {
        SystemFault::ALL
            .into_iter()
            .filter(move |&f| self.contains(f) && !earlier.contains(f))
    }

    pub fn iter(self) -> impl Iterator<Item = SystemFault> {
        SystemFault::ALL.into_iter().filter(move |&f| self.contains(f))
    }
}

// ── Effectiveness ─────────────────────────────────────────────

/// Ticks spent outside the comfort band since midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EffectivenessCounters {
    pub day_total: u32,
    pub too_hot: u32,
    pub too_cold: u32,
    pub too_damp: u32,
    pub too_dry: u32,
}

impl EffectivenessCounters {
    /// Count one classification.  Compound states count on both axes.
    pub fn record(&mut self, state: ClimateState) {
        self.day_total = self.day_total.saturating_add(1);
        if state.is_hot() {
            self.too_hot = self.too_hot.saturating_add(1);
        }
        if state.is_cold() {
            self.too_cold = self.too_cold.saturating_add(1);
        }
        if state.is_damp() {
            self.too_damp = self.too_damp.saturating_add(1);
        }
        if state.is_dry() {
            self.too_dry = self.too_dry.saturating_add(1);
        }
    }

    pub fn report(&self) -> EffectivenessReport {
        let ratio = |n: u32| {
            if self.day_total == 0 {
                0.0
            } else {
                n as f32 / self.day_total as f32
            }
        };
        EffectivenessReport {
            day_total: self.day_total,
            hot_ratio: ratio(self.too_hot),
            cold_ratio: ratio(self.too_cold),
            damp_ratio: ratio(self.too_damp),
            dry_ratio: ratio(self.too_dry),
        }
    }
}

/// Fractions of today spent outside the band, per axis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EffectivenessReport {
    pub day_total: u32,
    pub hot_ratio: f32,
    pub cold_ratio: f32,
    pub damp_ratio: f32,
    pub dry_ratio: f32,
}

// ── Tracker ───────────────────────────────────────────────────

pub struct FaultTracker {
    faults: SystemFaults,
    counters: EffectivenessCounters,
    mia_max: u8,
    floor_ticks: u32,
    criterion: f32,
    secondary_low_limit_f: f32,
}

impl FaultTracker {
    pub fn new(
        mia_max: u8,
        floor_ticks: u32,
        criterion: f32,
        secondary_low_limit_f: f32,
    ) -> Self {
        Self {
            faults: SystemFaults::default(),
            counters: EffectivenessCounters::default(),
            mia_max,
            floor_ticks,
            criterion,
            secondary_low_limit_f,
        }
    }

    pub fn with_counters(mut self, counters: EffectivenessCounters) -> Self {
        self.counters = counters;
        self
    }

    pub fn faults(&self) -> SystemFaults {
        self.faults
    }

    pub fn has_fault(&self, fault: SystemFault) -> bool {
        self.faults.contains(fault)
    }

    pub fn counters(&self) -> &EffectivenessCounters {
        &self.counters
    }

    /// Any defined child at the miss limit raises `LostNode`; the fault
    /// clears as soon as none are.
    pub fn evaluate_liveness(&mut self, nodes: &NodeTable) {
        self.eval_fault(SystemFault::LostNode, nodes.any_lost(self.mia_max));
    }

    /// Count the current interior state and judge the day so far.
    pub fn record_interior(&mut self, state: ClimateState) {
        self.counters.record(state);
        self.evaluate_effectiveness();
    }

    fn evaluate_effectiveness(&mut self) {
        if self.counters.day_total > self.floor_ticks {
            let report = self.counters.report();
            self.eval_fault(
                SystemFault::CannotControlTemperature,
                report.hot_ratio > self.criterion || report.cold_ratio > self.criterion,
            );
            self.eval_fault(
                SystemFault::CannotControlHumidity,
                report.damp_ratio > self.criterion || report.dry_ratio > self.criterion,
            );
        } else {
            self.clear_fault(SystemFault::CannotControlTemperature);
            self.clear_fault(SystemFault::CannotControlHumidity);
        }
    }

    /// Zero the counters.  Returns the report for the day just ended.
    pub fn midnight_reset(&mut self) -> EffectivenessReport {
        let report = self.counters.report();
        info!(
            "TRACKER: midnight, {} ticks, hot {:.2} cold {:.2} damp {:.2} dry {:.2}",
            report.day_total, report.hot_ratio, report.cold_ratio, report.damp_ratio, report.dry_ratio
        );
        self.counters = EffectivenessCounters::default();
        report
    }

    pub fn evaluate_secondary(&mut self, filtered_f: f32) {
        self.eval_fault(SystemFault::SecondaryTempLow, filtered_f < self.secondary_low_limit_f);
    }

    /// Latch the flood fault.
    pub fn raise_flood(&mut self) {
        self.set_fault(SystemFault::FloodDetected);
    }

    pub fn set_storage_fault(&mut self, failed: bool) {
        if failed {
            self.set_fault(SystemFault::Storage);
        } else {
            self.clear_fault(SystemFault::Storage);
        }
    }

    /// Operator acknowledgment: forget missed handshakes and drop the
    /// latched faults.  Re-evaluated faults come back on their own.
    pub fn acknowledge(&mut self, nodes: &mut NodeTable) {
        nodes.reset_miss_counters();
        self.clear_fault(SystemFault::LostNode);
        self.clear_fault(SystemFault::FloodDetected);
        self.clear_fault(SystemFault::Storage);
    }

    // ── Internal ──────────────────────────────────────────────

    fn eval_fault(&mut self, fault: SystemFault, condition: bool) {
        if condition {
            self.set_fault(fault);
        } else {
            self.clear_fault(fault);
        }
    }

    fn set_fault(&mut self, fault: SystemFault) {
        if !self.faults.contains(fault) {
            error!("FAULT SET: {fault}");
        }
        self.faults.0 |= fault.mask();
    }

    fn clear_fault(&mut self, fault: SystemFault) {
        if self.faults.contains(fault) {
            info!("FAULT CLEARED: {fault}");
        }
        self.faults.0 &= !fault.mask();
    }
}
