//! Table-driven round-robin resource sequencer.
//!
//! One pass is a fixed table of steps:
//!
//! ```text
//! ┌───────┬───────────────────────────────────────────────────────────┐
//! │ index │ step                                                      │
//! ├───────┼───────────────────────────────────────────────────────────┤
//! │ 0     │ service parent                                            │
//! │ 1..8  │ child 1: attention, humidity?, temperature?, secondary?,  │
//! │       │          relay1, relay2, swpwr1, swpwr2                   │
//! │ 9..16 │ child 2: ...                                              │
//! │ ...   │                                                           │
//! └───────┴───────────────────────────────────────────────────────────┘
//! ```
//!
//! Each row carries a plain `fn` predicate.  [`Sequencer::step`] advances
//! the cursor past rows whose predicate is false and returns the first
//! runnable one, so every call yields exactly one action.  The parent row
//! is always runnable, which bounds the search to one pass.
//!
//! When a child's attention row runs, its configuration is snapshotted as
//! the visit plan; the rest of that child's rows are judged against the
//! snapshot, and against live `active` so a failed handshake skips them.

use crate::nodes::{
    ChildConfig, ChildId, ChildNode, NUM_CHILDREN, NodeTable, OutputSelector, ResourceKind,
};

/// Rows per child: attention, three queries, four outputs.
pub const STEPS_PER_CHILD: usize = 8;

/// Rows in one pass.
pub const STEP_COUNT: usize = 1 + NUM_CHILDREN * STEPS_PER_CHILD;

// ---------------------------------------------------------------------------
// Actions
// ---------------------------------------------------------------------------

/// The unit of work handed to the resource manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    ServiceParent,
    Attention(ChildId),
    AskHumidity(ChildId),
    AskTemperature(ChildId),
    AskSecondaryTemperature(ChildId),
    Actuate {
        node: ChildId,
        output: OutputSelector,
        resource: ResourceKind,
    },
}

impl Action {
    pub const fn node(&self) -> Option<ChildId> {
        match *self {
            Self::ServiceParent => None,
            Self::Attention(n)
            | Self::AskHumidity(n)
            | Self::AskTemperature(n)
            | Self::AskSecondaryTemperature(n)
            | Self::Actuate { node: n, .. } => Some(n),
        }
    }
}

/// One call's result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Step {
    /// Row that produced the action.
    pub index: usize,
    pub action: Action,
    /// The cursor wrapped: this is the first action of a new pass.
    pub starts_pass: bool,
}

// ---------------------------------------------------------------------------
// Step table
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StepKind {
    ServiceParent,
    Attention,
    AskHumidity,
    AskTemperature,
    AskSecondaryTemperature,
    Output(OutputSelector),
}

/// Row predicate: live node state and the visit plan.
type StepPredicate = fn(&ChildNode, &ChildConfig) -> bool;

struct StepDescriptor {
    node: Option<ChildId>,
    kind: StepKind,
    predicate: StepPredicate,
}

fn always(_: &ChildNode, _: &ChildConfig) -> bool {
    true
}

fn node_defined(child: &ChildNode, _: &ChildConfig) -> bool {
    child.config.defined
}

fn visit_live(child: &ChildNode) -> bool {
    child.config.defined && child.active
}

fn wants_humidity(child: &ChildNode, plan: &ChildConfig) -> bool {
    visit_live(child) && plan.needs_humidity()
}

fn wants_temperature(child: &ChildNode, plan: &ChildConfig) -> bool {
    visit_live(child) && plan.needs_temperature()
}

fn wants_secondary(child: &ChildNode, plan: &ChildConfig) -> bool {
    visit_live(child) && plan.has_secondary_temperature
}

fn relay1_assigned(child: &ChildNode, plan: &ChildConfig) -> bool {
    visit_live(child) && plan.relay1 != ResourceKind::Free
}

fn relay2_assigned(child: &ChildNode, plan: &ChildConfig) -> bool {
    visit_live(child) && plan.relay2 != ResourceKind::Free
}

fn switched_power1_assigned(child: &ChildNode, plan: &ChildConfig) -> bool {
    visit_live(child) && plan.switched_power1 != ResourceKind::Free
}

fn switched_power2_assigned(child: &ChildNode, plan: &ChildConfig) -> bool {
    visit_live(child) && plan.switched_power2 != ResourceKind::Free
}

fn child_row(slot: usize) -> (StepKind, StepPredicate) {
    match slot {
        0 => (StepKind::Attention, node_defined),
        1 => (StepKind::AskHumidity, wants_humidity),
        2 => (StepKind::AskTemperature, wants_temperature),
        3 => (StepKind::AskSecondaryTemperature, wants_secondary),
        4 => (StepKind::Output(OutputSelector::Relay1), relay1_assigned),
        5 => (StepKind::Output(OutputSelector::Relay2), relay2_assigned),
        6 => (StepKind::Output(OutputSelector::SwitchedPower1), switched_power1_assigned),
        _ => (StepKind::Output(OutputSelector::SwitchedPower2), switched_power2_assigned),
    }
}

/// Build the pass table.  Called once at construction.
fn build_step_table() -> [StepDescriptor; STEP_COUNT] {
    core::array::from_fn(|index| {
        if index == 0 {
            return StepDescriptor {
                node: None,
                kind: StepKind::ServiceParent,
                predicate: always,
            };
        }
        let child_index = (index - 1) / STEPS_PER_CHILD;
        let (kind, predicate) = child_row((index - 1) % STEPS_PER_CHILD);
        StepDescriptor {
            node: ChildId::new(child_index as u8 + 1),
            kind,
            predicate,
        }
    })
}

// ---------------------------------------------------------------------------
// Sequencer
// ---------------------------------------------------------------------------

pub struct Sequencer {
    table: [StepDescriptor; STEP_COUNT],
    cursor: usize,
    visit: Option<(ChildId, ChildConfig)>,
    passes: u32,
}

impl Default for Sequencer {
    fn default() -> Self {
        Self::new()
    }
}

impl Sequencer {
    pub fn new() -> Self {
        Self {
            table: build_step_table(),
            cursor: 0,
            visit: None,
            passes: 0,
        }
    }

    /// Next row to be considered.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Completed wraps since construction.
    pub fn passes(&self) -> u32 {
        self.passes
    }

    /// Child being visited and its snapshotted configuration.
    pub fn visit_plan(&self) -> Option<(ChildId, ChildConfig)> {
        self.visit
    }

    /// Advance to the next runnable row and return its action.
    pub fn step(&mut self, nodes: &NodeTable) -> Step {
        loop {
            let index = self.cursor;
            self.cursor = (index + 1) % STEP_COUNT;
            let desc = &self.table[index];

            let Some(id) = desc.node else {
                self.passes = self.passes.wrapping_add(1);
                self.visit = None;
                return Step {
                    index,
                    action: Action::ServiceParent,
                    starts_pass: true,
                };
            };
            let child = nodes.child(id);

            if desc.kind == StepKind::Attention {
                if (desc.predicate)(child, &child.config) {
                    self.visit = Some((id, child.config));
                    return Step {
                        index,
                        action: Action::Attention(id),
                        starts_pass: false,
                    };
                }
                self.visit = None;
                continue;
            }

            let Some((visiting, plan)) = self.visit else {
                continue;
            };
            if visiting != id || !(desc.predicate)(child, &plan) {
                continue;
            }
            let action = match desc.kind {
                StepKind::AskHumidity => Action::AskHumidity(id),
                StepKind::AskTemperature => Action::AskTemperature(id),
                StepKind::AskSecondaryTemperature => Action::AskSecondaryTemperature(id),
                StepKind::Output(output) => Action::Actuate {
                    node: id,
                    output,
                    resource: plan.output(output),
                },
                StepKind::ServiceParent | StepKind::Attention => continue,
            };
            return Step {
                index,
                action,
                starts_pass: false,
            };
        }
    }
}
