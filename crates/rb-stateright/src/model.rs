//! Stateright model of the ring buffer.
//!
//! The model state holds the real `RingBuffer<u8>` together with the
//! produced/consumed histories. Every reachable state within the write
//! bound is explored breadth-first and judged by the same invariants the
//! DST runner uses, so the model checks the implementation itself rather
//! than a separate abstraction of it.

use rb_buffer::{RingBuffer, RingBufferError};
use rb_core::{PropertyChecker, RingBufferProperties, RingBufferPropertyChecker};
use serde::Serialize;
use stateright::{Checker, Model, Property};
use tracing::{debug, info};

/// Invariants checked in every reachable state.
pub const INVARIANTS: [&str; 6] = [
    "BoundedCapacity",
    "StatusConsistency",
    "IndexBounds",
    "SlotOccupancy",
    "NoLostMessages",
    "FIFO_Order",
];

/// States that must be reachable, or the model is too weak to be useful.
pub const REACHABILITY: [&str; 3] = ["can become full", "wraps around", "batch rejected"];

/// Bounds for model checking.
#[derive(Debug, Clone, Serialize)]
pub struct ModelConfig {
    /// Capacity of the modelled buffer
    pub capacity: usize,
    /// Accepted writes after which exploration stops (at most 255)
    pub writes_max: usize,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            capacity: 3,
            writes_max: 6,
        }
    }
}

impl ModelConfig {
    /// Quick check for unit tests.
    pub fn quick() -> Self {
        Self {
            capacity: 2,
            writes_max: 4,
        }
    }

    /// Thorough check.
    pub fn thorough() -> Self {
        Self {
            capacity: 4,
            writes_max: 10,
        }
    }
}

/// Actions the checker may take from any state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RingBufferAction {
    Write,
    /// Batch of `n` consecutive values
    WriteBatch(usize),
    Read,
    Clear,
    Dump,
}

/// Model state: the buffer plus what went in and came out.
///
/// Values written are the running count of accepted writes, so every
/// produced value is distinct.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RingBufferState {
    pub buffer: RingBuffer<u8>,
    pub produced: Vec<u8>,
    pub consumed: Vec<u8>,
    /// Sticky: some batch has been rejected on the path to this state
    pub batch_rejected: bool,
}

impl RingBufferState {
    fn new(buffer: RingBuffer<u8>) -> Self {
        Self {
            buffer,
            produced: Vec::new(),
            consumed: Vec::new(),
            batch_rejected: false,
        }
    }

    fn next_value(&self) -> u8 {
        self.produced.len() as u8
    }

    /// Whether the named `rb-core` invariant holds in this state.
    pub fn invariant_holds(&self, name: &str) -> bool {
        RingBufferPropertyChecker::new(self)
            .check_all()
            .into_iter()
            .find(|r| r.name == name)
            .map_or(true, |r| r.holds)
    }

    /// The stored elements straddle the end of the slot array.
    pub fn wraps(&self) -> bool {
        !self.buffer.is_empty() && self.buffer.head() + self.buffer.len() > self.buffer.capacity()
    }
}

impl RingBufferProperties for RingBufferState {
    fn produced_messages(&self) -> Vec<u64> {
        self.produced.iter().map(|&v| u64::from(v)).collect()
    }

    fn consumed_messages(&self) -> Vec<u64> {
        self.consumed.iter().map(|&v| u64::from(v)).collect()
    }

    fn current_contents(&self) -> Vec<u64> {
        self.buffer.iter().map(|&v| u64::from(v)).collect()
    }

    fn capacity(&self) -> u64 {
        self.buffer.capacity() as u64
    }

    fn len(&self) -> u64 {
        self.buffer.len() as u64
    }

    fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    fn is_full(&self) -> bool {
        self.buffer.is_full()
    }

    fn head(&self) -> u64 {
        self.buffer.head() as u64
    }

    fn tail(&self) -> u64 {
        self.buffer.tail() as u64
    }

    fn slot_occupancy(&self) -> Vec<bool> {
        self.buffer.slots().iter().map(Option::is_some).collect()
    }
}

/// Stateright model driving a real `RingBuffer<u8>`.
#[derive(Debug, Clone)]
pub struct RingBufferModel {
    initial: RingBuffer<u8>,
    writes_max: usize,
}

impl RingBufferModel {
    pub fn new(config: &ModelConfig) -> Result<Self, RingBufferError> {
        debug_assert!(
            config.writes_max <= usize::from(u8::MAX),
            "writes_max too large for u8 values: {}",
            config.writes_max
        );
        Ok(Self {
            initial: RingBuffer::new(config.capacity)?,
            writes_max: config.writes_max,
        })
    }

    pub fn capacity(&self) -> usize {
        self.initial.capacity()
    }
}

impl Model for RingBufferModel {
    type State = RingBufferState;
    type Action = RingBufferAction;

    fn init_states(&self) -> Vec<Self::State> {
        vec![RingBufferState::new(self.initial.clone())]
    }

    fn actions(&self, _state: &Self::State, actions: &mut Vec<Self::Action>) {
        actions.push(RingBufferAction::Write);
        // one past capacity so oversized batches are always on the table
        for n in 0..=self.capacity() + 1 {
            actions.push(RingBufferAction::WriteBatch(n));
        }
        actions.push(RingBufferAction::Read);
        actions.push(RingBufferAction::Clear);
        actions.push(RingBufferAction::Dump);
    }

    fn next_state(&self, last_state: &Self::State, action: Self::Action) -> Option<Self::State> {
        let mut next = last_state.clone();
        match action {
            RingBufferAction::Write => {
                let value = next.next_value();
                if next.buffer.write(value) {
                    next.produced.push(value);
                }
            }
            RingBufferAction::WriteBatch(n) => {
                let start = next.next_value();
                let values: Vec<u8> = (0..n).map(|i| start.wrapping_add(i as u8)).collect();
                if next.buffer.write_all(values.iter().copied()) {
                    next.produced.extend(values);
                } else {
                    next.batch_rejected = true;
                }
            }
            RingBufferAction::Read => {
                if let Some(value) = next.buffer.read() {
                    next.consumed.push(value);
                }
            }
            RingBufferAction::Clear => {
                let discarded = next.buffer.data();
                next.buffer.clear();
                next.consumed.extend(discarded);
            }
            RingBufferAction::Dump => {
                let drained = next.buffer.dump();
                next.consumed.extend(drained);
            }
        }
        Some(next)
    }

    fn properties(&self) -> Vec<Property<Self>> {
        vec![
            Property::always("BoundedCapacity", |_, s: &RingBufferState| {
                s.invariant_holds("BoundedCapacity")
            }),
            Property::always("StatusConsistency", |_, s: &RingBufferState| {
                s.invariant_holds("StatusConsistency")
            }),
            Property::always("IndexBounds", |_, s: &RingBufferState| {
                s.invariant_holds("IndexBounds")
            }),
            Property::always("SlotOccupancy", |_, s: &RingBufferState| {
                s.invariant_holds("SlotOccupancy")
            }),
            Property::always("NoLostMessages", |_, s: &RingBufferState| {
                s.invariant_holds("NoLostMessages")
            }),
            Property::always("FIFO_Order", |_, s: &RingBufferState| {
                s.invariant_holds("FIFO_Order")
            }),
            Property::sometimes("can become full", |_, s: &RingBufferState| s.buffer.is_full()),
            Property::sometimes("wraps around", |_, s: &RingBufferState| s.wraps()),
            Property::sometimes("batch rejected", |_, s: &RingBufferState| s.batch_rejected),
        ]
    }

    fn within_boundary(&self, state: &Self::State) -> bool {
        state.produced.len() <= self.writes_max
    }
}

/// Outcome of an exhaustive model check.
#[derive(Debug, Clone, Serialize)]
pub struct ModelCheckResult {
    pub passed: bool,
    pub capacity: usize,
    pub writes_max: usize,
    pub unique_state_count: usize,
    /// First invariant with a counterexample, in `INVARIANTS` order
    pub violated_invariant: Option<String>,
    /// Actions leading from the initial state to the violation
    pub counterexample: Vec<String>,
    pub reachable: Vec<String>,
    pub unreachable: Vec<String>,
}

impl ModelCheckResult {
    pub fn format(&self) -> String {
        let status = if self.passed { "PASS" } else { "FAIL" };
        let mut result = format!(
            "[{}] capacity={} writes_max={} states={}",
            status, self.capacity, self.writes_max, self.unique_state_count
        );
        if let Some(name) = &self.violated_invariant {
            result.push_str(&format!("\n  VIOLATION: {} via {:?}", name, self.counterexample));
        }
        for name in &self.unreachable {
            result.push_str(&format!("\n  UNREACHABLE: {}", name));
        }
        result
    }
}

/// Exhaustively check the model within `config`'s bounds.
pub fn verify_model(config: &ModelConfig) -> Result<ModelCheckResult, RingBufferError> {
    let model = RingBufferModel::new(config)?;
    debug!(capacity = config.capacity, writes_max = config.writes_max, "model check started");

    let checker = model.checker().spawn_bfs().join();

    let mut violated_invariant = None;
    let mut counterexample = Vec::new();
    for name in INVARIANTS {
        if let Some(path) = checker.discovery(name) {
            violated_invariant = Some(name.to_string());
            counterexample = path
                .into_actions()
                .iter()
                .map(|action| format!("{:?}", action))
                .collect();
            break;
        }
    }

    let mut reachable = Vec::new();
    let mut unreachable = Vec::new();
    for name in REACHABILITY {
        if checker.discovery(name).is_some() {
            reachable.push(name.to_string());
        } else {
            unreachable.push(name.to_string());
        }
    }

    let result = ModelCheckResult {
        passed: violated_invariant.is_none() && unreachable.is_empty(),
        capacity: config.capacity,
        writes_max: config.writes_max,
        unique_state_count: checker.unique_state_count(),
        violated_invariant,
        counterexample,
        reachable,
        unreachable,
    };
    info!(
        passed = result.passed,
        states = result.unique_state_count,
        "model check finished"
    );
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model() -> RingBufferModel {
        RingBufferModel::new(&ModelConfig::quick()).unwrap()
    }

    #[test]
    fn test_quick_model_passes() {
        let result = verify_model(&ModelConfig::quick()).unwrap();

        assert!(result.passed, "{}", result.format());
        assert!(result.unique_state_count > 1);
        assert_eq!(result.reachable.len(), REACHABILITY.len());
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let config = ModelConfig {
            capacity: 0,
            writes_max: 3,
        };
        assert_eq!(verify_model(&config).unwrap_err(), RingBufferError::ZeroCapacity);
    }

    #[test]
    fn test_actions_include_oversized_batch() {
        let model = model();
        let state = model.init_states().remove(0);
        let mut actions = Vec::new();
        model.actions(&state, &mut actions);

        assert!(actions.contains(&RingBufferAction::WriteBatch(3)));
        assert!(actions.contains(&RingBufferAction::WriteBatch(0)));
    }

    #[test]
    fn test_next_state_tracks_histories() {
        let model = model();
        let s0 = model.init_states().remove(0);

        let s1 = model.next_state(&s0, RingBufferAction::WriteBatch(2)).unwrap();
        assert_eq!(s1.produced, vec![0, 1]);
        assert!(s1.buffer.is_full());

        let s2 = model.next_state(&s1, RingBufferAction::Write).unwrap();
        assert_eq!(s2, s1);

        let s3 = model.next_state(&s2, RingBufferAction::WriteBatch(3)).unwrap();
        assert!(s3.batch_rejected);
        assert_eq!(s3.buffer, s2.buffer);

        let s4 = model.next_state(&s3, RingBufferAction::Read).unwrap();
        let s5 = model.next_state(&s4, RingBufferAction::Write).unwrap();
        assert_eq!(s5.consumed, vec![0]);
        assert_eq!(s5.buffer.data(), vec![1, 2]);
        assert!(s5.wraps());

        let s6 = model.next_state(&s5, RingBufferAction::Dump).unwrap();
        assert_eq!(s6.consumed, vec![0, 1, 2]);
        assert!(s6.buffer.is_empty());
        for name in INVARIANTS {
            assert!(s6.invariant_holds(name), "{} should hold", name);
        }
    }

    #[test]
    fn test_invariant_detects_forged_history() {
        let model = model();
        let mut state = model.init_states().remove(0);
        state.buffer.write(9);

        assert!(!state.invariant_holds("NoLostMessages"));
        assert!(!state.invariant_holds("FIFO_Order"));
        assert!(state.invariant_holds("BoundedCapacity"));
    }

    #[test]
    fn test_boundary() {
        let model = model();
        let mut state = model.init_states().remove(0);
        state.produced = vec![0; 5];
        assert!(!model.within_boundary(&state));
    }
}
