//! Shot loop shared by both engines
//!
//! Each shot clones the initial state, walks the circuit and yields one
//! [`OutcomeKey`]. Shot `i` draws from its own `ChaCha8Rng` seeded with
//! `base_seed + i`, so sequential and parallel runs produce the same
//! histogram for the same seed. The reported final state is the state of
//! the highest-index successful shot.

use crate::execution::AbortHandle;
use crate::stats::{StatsCollector, StatsTable};
use log::{debug, warn};
use qexec_core::{Circuit, GateOp, MeasureTarget, Operation, OutcomeKey, QexecError, QexecResult, QubitId};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;

/// Register the shot loop can drive
pub(crate) trait ShotState: Clone + Send + Sync {
    fn apply_gate(&mut self, gate: &GateOp);

    fn measure(&mut self, qubit: QubitId, rng: &mut ChaCha8Rng) -> QexecResult<u8>;

    fn reset(&mut self, qubit: QubitId, rng: &mut ChaCha8Rng) -> QexecResult<()>;
}

/// How a run should proceed
#[derive(Debug, Clone, Copy)]
pub(crate) struct ShotPlan {
    pub shots: u64,
    pub base_seed: u64,
    pub parallel: bool,
    pub max_retries: u32,
}

/// Everything a run produced
#[derive(Debug)]
pub(crate) struct ShotRun<S> {
    pub stats: StatsTable,
    pub final_state: S,
    pub completed: u64,
    pub degenerate: u64,
    pub retried: u64,
    pub aborted: bool,
}

enum Shot<S> {
    Completed { key: OutcomeKey, state: S, retries: u32 },
    Degenerate { error: QexecError, retries: u32 },
}

/// Walk `circuit` once from `initial`
fn run_circuit<S: ShotState>(
    circuit: &Circuit,
    initial: &S,
    rng: &mut ChaCha8Rng,
) -> QexecResult<(OutcomeKey, S)> {
    let mut state = initial.clone();
    let mut key = OutcomeKey::empty();

    for op in circuit {
        match op {
            Operation::Gate(gate) => state.apply_gate(gate),
            Operation::Measure(MeasureTarget::Qubit(q)) => key.push(state.measure(*q, rng)?),
            Operation::Measure(MeasureTarget::All) => {
                for q in 0..circuit.num_qubits() {
                    key.push(state.measure(q, rng)?);
                }
            }
            Operation::Reset(q) => state.reset(*q, rng)?,
        }
    }

    Ok((key, state))
}

/// One shot with its retry budget
fn run_shot<S: ShotState>(
    circuit: &Circuit,
    initial: &S,
    plan: &ShotPlan,
    index: u64,
) -> QexecResult<Shot<S>> {
    let mut rng = ChaCha8Rng::seed_from_u64(plan.base_seed.wrapping_add(index));
    let mut retries = 0;

    loop {
        match run_circuit(circuit, initial, &mut rng) {
            Ok((key, state)) => return Ok(Shot::Completed { key, state, retries }),
            Err(error) if error.is_recoverable() => {
                if retries >= plan.max_retries {
                    return Ok(Shot::Degenerate { error, retries });
                }
                retries += 1;
                debug!("shot {}: {}; retry {}/{}", index, error, retries, plan.max_retries);
            }
            Err(error) => return Err(error),
        }
    }
}

struct Accumulator<S> {
    collector: StatsCollector,
    last: Option<(u64, S)>,
    completed: u64,
    degenerate: u64,
    retried: u64,
    last_error: Option<QexecError>,
    aborted: bool,
}

impl<S> Accumulator<S> {
    fn new() -> Self {
        Self {
            collector: StatsCollector::new(),
            last: None,
            completed: 0,
            degenerate: 0,
            retried: 0,
            last_error: None,
            aborted: false,
        }
    }

    fn absorb(mut self, index: u64, shot: Shot<S>) -> Self {
        match shot {
            Shot::Completed { key, state, retries } => {
                self.collector.record(key);
                self.completed += 1;
                if retries > 0 {
                    self.retried += 1;
                }
                if self.last.as_ref().map_or(true, |(i, _)| index > *i) {
                    self.last = Some((index, state));
                }
            }
            Shot::Degenerate { error, retries } => {
                warn!("shot {} dropped after {} retries: {}", index, retries, error);
                self.degenerate += 1;
                if retries > 0 {
                    self.retried += 1;
                }
                self.last_error = Some(error);
            }
        }
        self
    }

    fn merge(mut self, other: Self) -> Self {
        self.collector.merge(other.collector);
        self.completed += other.completed;
        self.degenerate += other.degenerate;
        self.retried += other.retried;
        self.aborted |= other.aborted;
        self.last_error = self.last_error.or(other.last_error);
        self.last = match (self.last, other.last) {
            (Some(a), Some(b)) => Some(if a.0 >= b.0 { a } else { b }),
            (a, b) => a.or(b),
        };
        self
    }
}

/// Run every shot of `plan`
///
/// Fails only on a non-recoverable error, or when no shot succeeded and at
/// least one was degenerate (the last degeneracy error is returned). An
/// abort before the first shot yields `initial` as the final state.
pub(crate) fn run_shots<S: ShotState>(
    circuit: &Circuit,
    initial: &S,
    plan: ShotPlan,
    abort: &AbortHandle,
) -> QexecResult<ShotRun<S>> {
    let acc = if plan.parallel {
        (0..plan.shots)
            .into_par_iter()
            .try_fold(Accumulator::new, |mut acc, index| -> QexecResult<Accumulator<S>> {
                if abort.is_aborted() {
                    acc.aborted = true;
                    return Ok(acc);
                }
                let shot = run_shot(circuit, initial, &plan, index)?;
                Ok(acc.absorb(index, shot))
            })
            .try_reduce(Accumulator::new, |a, b| -> QexecResult<Accumulator<S>> {
                Ok(a.merge(b))
            })?
    } else {
        let mut acc = Accumulator::new();
        for index in 0..plan.shots {
            if abort.is_aborted() {
                acc.aborted = true;
                break;
            }
            let shot = run_shot(circuit, initial, &plan, index)?;
            acc = acc.absorb(index, shot);
        }
        acc
    };

    if acc.aborted {
        warn!("run aborted after {} of {} shots", acc.completed, plan.shots);
    }

    let final_state = match (acc.last, acc.last_error) {
        (Some((_, state)), _) => state,
        (None, Some(error)) => return Err(error),
        (None, None) => initial.clone(),
    };

    Ok(ShotRun {
        stats: acc.collector.into_table(),
        final_state,
        completed: acc.completed,
        degenerate: acc.degenerate,
        retried: acc.retried,
        aborted: acc.aborted,
    })
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use qexec_core::CircuitBuilder;
    use rand::Rng;

    /// Classical bit register whose measurements fail with a fixed chance
    #[derive(Debug, Clone, PartialEq)]
    struct FlakyBits {
        bits: Vec<u8>,
        failure_rate: f64,
    }

    impl FlakyBits {
        fn new(n: usize, failure_rate: f64) -> Self {
            Self {
                bits: vec![0; n],
                failure_rate,
            }
        }
    }

    impl ShotState for FlakyBits {
        fn apply_gate(&mut self, gate: &GateOp) {
            for &q in gate.targets() {
                self.bits[q] ^= 1;
            }
        }

        fn measure(&mut self, qubit: QubitId, rng: &mut ChaCha8Rng) -> QexecResult<u8> {
            if rng.gen::<f64>() < self.failure_rate {
                return Err(QexecError::NumericDegeneracy {
                    qubit,
                    outcome: self.bits[qubit],
                    probability: 0.0,
                });
            }
            Ok(self.bits[qubit])
        }

        fn reset(&mut self, qubit: QubitId, _rng: &mut ChaCha8Rng) -> QexecResult<()> {
            self.bits[qubit] = 0;
            Ok(())
        }
    }

    fn plan(shots: u64, parallel: bool, max_retries: u32) -> ShotPlan {
        ShotPlan {
            shots,
            base_seed: 42,
            parallel,
            max_retries,
        }
    }

    fn flip_circuit() -> Circuit {
        CircuitBuilder::new(2).x(1).measure_all().build().unwrap()
    }

    #[test]
    fn test_deterministic_register() {
        let circuit = flip_circuit();
        let run = run_shots(&circuit, &FlakyBits::new(2, 0.0), plan(50, false, 3), &AbortHandle::new())
            .unwrap();

        assert_eq!(run.stats.len(), 1);
        assert_eq!(run.stats.get(&OutcomeKey::parse("01").unwrap()), 50);
        assert_eq!(run.final_state.bits, vec![0, 1]);
        assert_eq!(run.completed, 50);
        assert_eq!(run.degenerate, 0);
        assert!(!run.aborted);
    }

    #[test]
    fn test_reset_and_measure_order() {
        let circuit = CircuitBuilder::new(2)
            .x(0)
            .measure(0)
            .reset(0)
            .measure(0)
            .x(1)
            .measure(1)
            .build()
            .unwrap();
        let run = run_shots(&circuit, &FlakyBits::new(2, 0.0), plan(3, false, 0), &AbortHandle::new())
            .unwrap();

        assert_eq!(run.stats.get(&OutcomeKey::parse("101").unwrap()), 3);
    }

    #[test]
    fn test_degenerate_shots_are_retried_then_dropped() {
        let circuit = flip_circuit();
        let initial = FlakyBits::new(2, 0.3);

        let run = run_shots(&circuit, &initial, plan(400, false, 0), &AbortHandle::new()).unwrap();
        assert!(run.degenerate > 0);
        assert_eq!(run.retried, 0);
        assert_eq!(run.completed + run.degenerate, 400);
        assert_eq!(run.stats.total(), run.completed);

        let retried = run_shots(&circuit, &initial, plan(400, false, 5), &AbortHandle::new()).unwrap();
        assert!(retried.retried > 0);
        assert!(retried.degenerate < run.degenerate);
        assert_eq!(retried.completed + retried.degenerate, 400);
    }

    #[test]
    fn test_all_degenerate_reports_error() {
        let circuit = flip_circuit();
        for parallel in [false, true] {
            let err = run_shots(&circuit, &FlakyBits::new(2, 1.0), plan(5, parallel, 2), &AbortHandle::new())
                .unwrap_err();
            assert!(err.is_recoverable());
        }
    }

    #[test]
    fn test_no_measurement_means_no_randomness_needed() {
        // Failing measurements never fire without measure ops
        let circuit = CircuitBuilder::new(1).x(0).build().unwrap();
        let run = run_shots(&circuit, &FlakyBits::new(1, 1.0), plan(10, false, 0), &AbortHandle::new())
            .unwrap();
        assert_eq!(run.stats.get(&OutcomeKey::empty()), 10);
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let circuit = flip_circuit();
        let initial = FlakyBits::new(2, 0.2);

        let seq = run_shots(&circuit, &initial, plan(500, false, 1), &AbortHandle::new()).unwrap();
        let par = run_shots(&circuit, &initial, plan(500, true, 1), &AbortHandle::new()).unwrap();

        assert_eq!(seq.stats, par.stats);
        assert_eq!(seq.completed, par.completed);
        assert_eq!(seq.degenerate, par.degenerate);
        assert_eq!(seq.retried, par.retried);
        assert_eq!(seq.final_state, par.final_state);
    }

    #[test]
    fn test_abort_before_start() {
        let circuit = flip_circuit();
        let initial = FlakyBits::new(2, 0.0);
        let abort = AbortHandle::new();
        abort.abort();

        for parallel in [false, true] {
            let run = run_shots(&circuit, &initial, plan(100, parallel, 0), &abort).unwrap();
            assert!(run.aborted);
            assert_eq!(run.completed, 0);
            assert!(run.stats.is_empty());
            assert_eq!(run.final_state, initial);
        }
    }
}
