//! Mock parent hardware, event sink and state store for integration tests.
//!
//! Records every relay call so tests can assert on the full command
//! history without touching real GPIO.

use std::cell::{Cell, RefCell};

use ccs_parent::app::events::AppEvent;
use ccs_parent::app::ports::{
    ClockPort, EventSink, InteriorSample, InteriorSensorPort, ParentRelayPort, StateError, StatePort,
};
use ccs_parent::config::{PersistedState, validate_state};
use ccs_parent::nodes::ParentRelay;

// ── MockHardware ──────────────────────────────────────────────

pub struct MockHardware {
    pub interior: InteriorSample,
    pub relay_calls: Vec<(ParentRelay, bool)>,
    /// Consumed by the next `is_midnight_tick`.
    pub midnight_pending: bool,
}

#[allow(dead_code)]
impl MockHardware {
    pub fn new(temperature_f: f32, rel_humidity: f32) -> Self {
        Self {
            interior: InteriorSample {
                temperature_f,
                rel_humidity,
            },
            relay_calls: Vec::new(),
            midnight_pending: false,
        }
    }

    pub fn set_interior(&mut self, temperature_f: f32, rel_humidity: f32) {
        self.interior = InteriorSample {
            temperature_f,
            rel_humidity,
        };
    }

    /// Last commanded level of a parent relay (off if never commanded).
    pub fn relay_on(&self, relay: ParentRelay) -> bool {
        self.relay_calls
            .iter()
            .rev()
            .find_map(|&(r, on)| (r == relay).then_some(on))
            .unwrap_or(false)
    }
}

impl InteriorSensorPort for MockHardware {
    fn current_interior_sample(&mut self) -> InteriorSample {
        self.interior
    }
}

impl ParentRelayPort for MockHardware {
    fn set_relay(&mut self, relay: ParentRelay, on: bool) {
        self.relay_calls.push((relay, on));
    }
}

impl ClockPort for MockHardware {
    fn is_midnight_tick(&mut self) -> bool {
        std::mem::take(&mut self.midnight_pending)
    }
}

// ── RecordingSink ─────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingSink {
    pub events: Vec<AppEvent>,
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self, pred: impl Fn(&AppEvent) -> bool) -> usize {
        self.events.iter().filter(|e| pred(e)).count()
    }

    pub fn contains(&self, event: &AppEvent) -> bool {
        self.events.contains(event)
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &AppEvent) {
        self.events.push(*event);
    }
}

// ── MockStateStore ────────────────────────────────────────────

#[derive(Default)]
pub struct MockStateStore {
    pub stored: RefCell<Option<PersistedState>>,
    pub saves: Cell<usize>,
    pub fail_writes: Cell<bool>,
}

#[allow(dead_code)]
impl MockStateStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StatePort for MockStateStore {
    fn load_state(&self) -> Result<PersistedState, StateError> {
        Ok(self.stored.borrow().unwrap_or_default())
    }

    fn save_state(&self, state: &PersistedState) -> Result<(), StateError> {
        validate_state(state)?;
        if self.fail_writes.get() {
            return Err(StateError::IoError);
        }
        *self.stored.borrow_mut() = Some(*state);
        self.saves.set(self.saves.get() + 1);
        Ok(())
    }
}
