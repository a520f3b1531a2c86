//! DST integration tests for the ring buffer.
//!
//! Runs `RingBuffer` through the DST runner and harness with fault
//! injection and verifies the invariants from rb-core.

use rb_buffer::{RingBuffer, TrackedRingBuffer};
use rb_core::{PropertyChecker, RingBufferPropertyChecker};
use rb_dst::{
    generate_operations, get_iterations, get_or_generate_seed, run_dst_scenario, DstEnv,
    DstHarness, DstOp, DstRunner, FaultConfig, FaultType, HarnessConfig,
};

#[test]
fn test_dst_tracked_buffer() {
    let seed = get_or_generate_seed();
    let mut env = DstEnv::with_fault_config(seed, FaultConfig::none());
    let capacity = env.rng().gen_range(1..=8_usize);
    let mut rb = TrackedRingBuffer::new(capacity).unwrap();

    let mut values: Vec<u64> = (1..=200).collect();
    env.rng().shuffle(&mut values);
    let mut next = values.iter().copied().cycle();

    for _ in 0..get_iterations(1000) {
        match env.rng().gen_range(0..10_u8) {
            0..=3 => {
                let value = next.next().unwrap_or(0);
                rb.write(value);
            }
            4 => {
                let len = env.rng().gen_range(0..=capacity + 1);
                let batch: Vec<u64> = next.by_ref().take(len).collect();
                rb.write_all(&batch);
            }
            5..=7 => {
                rb.read();
            }
            8 => {
                if env.rng().gen_bool(0.5) {
                    rb.clear();
                } else {
                    rb.dump();
                }
            }
            _ => {
                let checker = RingBufferPropertyChecker::new(&rb).with_seed(seed);
                assert!(
                    checker.all_hold(),
                    "Invariant violated at {}: {:?}",
                    env.format_seed(),
                    checker.violations()
                );
            }
        }
    }

    let checker = RingBufferPropertyChecker::new(&rb).with_seed(seed);
    assert!(
        checker.all_hold(),
        "Final invariant check failed at {}",
        env.format_seed()
    );

    println!("DST completed: {}", env.stats());
}

#[test]
fn test_dst_runner_with_faults() {
    let seed = get_or_generate_seed();
    let mut env = DstEnv::new(seed);
    let mut runner = DstRunner::with_fault_config(
        RingBuffer::<u64>::new(4).unwrap(),
        seed,
        FaultConfig::aggressive(),
    );

    let mut caller_crashes = 0;
    let mut lost_results = 0;

    for op in generate_operations(env.rng(), get_iterations(1000) as usize, 6) {
        match runner.apply(op) {
            Ok(()) => {}
            Err(FaultType::CallerCrash) => caller_crashes += 1,
            Err(FaultType::ResultLost) => lost_results += 1,
        }
    }

    if let Err(violation) = runner.check_invariants() {
        panic!("{}", violation);
    }

    let stats = runner.stats();
    assert_eq!(stats.abandoned_operations, caller_crashes);
    assert_eq!(stats.faults_injected, caller_crashes + lost_results);
    println!("DST with faults completed: {}", stats.format());
}

#[test]
fn test_dst_harness_many_seeds() {
    let base = get_or_generate_seed();
    let iterations = get_iterations(20);

    for i in 0..iterations {
        let seed = base.wrapping_add(i).max(1);
        let config = HarnessConfig {
            capacity: 1 + (i as usize % 6),
            operations_count: 300,
            fault_config: FaultConfig::aggressive(),
            ..HarnessConfig::default()
        };
        let buffer = RingBuffer::<u64>::new(config.capacity).unwrap();

        let result = DstHarness::new(seed, config).run_buffer(buffer);

        assert!(result.all_invariants_held, "{}", result.format());
    }
}

#[test]
fn test_overflow_scenario_with_faults() {
    let seed = get_or_generate_seed();
    let ops = vec![
        DstOp::WriteBatch(vec![0x2A, 0x2B, 0x2C, 0x2D]),
        DstOp::Write(0x2E),
        DstOp::WriteBatch(vec![0x2F]),
        DstOp::Peek,
        DstOp::Read,
        DstOp::WriteBatch(vec![0x30, 0x31]),
        DstOp::Write(0x32),
        DstOp::Dump,
        DstOp::Read,
        DstOp::Clear,
    ];

    let result = run_dst_scenario(
        RingBuffer::<u64>::new(4).unwrap(),
        seed,
        FaultConfig::aggressive(),
        ops,
    );

    assert!(result.passed, "DST failed: {}", result.format());
}

#[test]
fn test_canonical_overflow_without_faults() {
    let ops = vec![
        DstOp::WriteBatch(vec![0x2A, 0x2B, 0x2C, 0x2D]),
        DstOp::Write(0x2E),
        DstOp::WriteBatch(vec![0x2A, 0x2B, 0x2C, 0x2D, 0x2E]),
        DstOp::Read,
    ];

    let result = run_dst_scenario(RingBuffer::<u64>::new(4).unwrap(), 1, FaultConfig::none(), ops);

    assert!(result.passed, "{}", result.format());
    assert_eq!(result.stats.rejected_writes, 2);
    assert_eq!(result.stats.operations_count, 4);
    assert!(result.fault_errors.is_empty());

    let json = serde_json::to_value(&result).unwrap();
    assert_eq!(json["passed"], true);
    assert_eq!(json["stats"]["rejected_writes"], 2);
}
