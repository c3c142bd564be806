//! Statevector backend
//!
//! Evolves a 2^n amplitude vector per shot. Measurements collapse the
//! vector stochastically; the register left by the last shot is reported.

use crate::execution::{AbortHandle, Backend, BackendOptions, ExecutionMetadata, ExecutionResult, FinalState};
use crate::mode::SimulatorMode;
use crate::shots::{run_shots, ShotPlan, ShotRun, ShotState};
use crate::stats::StatsTable;
use log::{debug, info};
use qexec_core::limits::{effective_shots, MAX_STATEVECTOR_QUBITS};
use qexec_core::{Circuit, GateOp, QexecError, QexecResult, QubitId};
use qexec_state::PureState;
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use std::time::Instant;

impl ShotState for PureState {
    fn apply_gate(&mut self, gate: &GateOp) {
        PureState::apply_gate(self, gate);
    }

    fn measure(&mut self, qubit: QubitId, rng: &mut ChaCha8Rng) -> QexecResult<u8> {
        PureState::measure(self, qubit, rng)
    }

    fn reset(&mut self, qubit: QubitId, rng: &mut ChaCha8Rng) -> QexecResult<()> {
        PureState::reset(self, qubit, rng)
    }
}

/// Pure-state simulator
#[derive(Debug, Clone)]
pub struct StatevectorBackend {
    /// Backend name
    name: String,

    /// Seed, parallelism and retry budget
    options: BackendOptions,

    /// Register cap
    max_qubits: usize,

    /// Starting state for every shot (|0...0⟩ when `None`)
    initial_state: Option<PureState>,

    /// Between-shot abort flag
    abort: AbortHandle,
}

impl Default for StatevectorBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl StatevectorBackend {
    // ========================================================================
    // Constructors
    // ========================================================================

    /// Create backend with default options
    pub fn new() -> Self {
        Self {
            name: "qexec_statevector".to_string(),
            options: BackendOptions::default(),
            max_qubits: MAX_STATEVECTOR_QUBITS,
            initial_state: None,
            abort: AbortHandle::new(),
        }
    }

    /// Replace all run options
    pub fn with_options(mut self, options: BackendOptions) -> Self {
        self.options = options;
        self
    }

    /// Set seed for reproducibility
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.options.seed = Some(seed);
        self
    }

    /// Run shots on the rayon pool
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.options.parallel = parallel;
        self
    }

    /// Set retry budget for degenerate shots
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.options.max_retries = max_retries;
        self
    }

    /// Override the register cap
    pub fn with_max_qubits(mut self, max_qubits: usize) -> Self {
        self.max_qubits = max_qubits;
        self
    }

    /// Start every shot from `state` instead of |0...0⟩
    pub fn with_initial_state(mut self, state: PureState) -> Self {
        self.initial_state = Some(state);
        self
    }

    /// Share an existing abort flag
    pub fn with_abort_handle(mut self, abort: AbortHandle) -> Self {
        self.abort = abort;
        self
    }

    /// Set backend name
    pub fn with_name(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    /// Current options
    pub fn options(&self) -> &BackendOptions {
        &self.options
    }

    // ========================================================================
    // Simulation
    // ========================================================================

    /// Run `shots` shots and return the histogram and last register
    pub fn simulate(&self, circuit: &Circuit, shots: u64) -> QexecResult<(StatsTable, PureState)> {
        let (run, _) = self.run(circuit, shots)?;
        Ok((run.stats, run.final_state))
    }

    fn initial_for(&self, circuit: &Circuit) -> QexecResult<PureState> {
        let n = circuit.num_qubits();
        if n > self.max_qubits {
            return Err(QexecError::TooManyQubits {
                requested: n,
                max: self.max_qubits,
                mode: SimulatorMode::Statevector.name().to_string(),
            });
        }

        match &self.initial_state {
            Some(state) if state.num_qubits() != n => Err(QexecError::InvalidInitialState(format!(
                "initial state has {} qubits, circuit has {}",
                state.num_qubits(),
                n
            ))),
            Some(state) => Ok(state.clone()),
            None => Ok(PureState::new(n)),
        }
    }

    fn run(&self, circuit: &Circuit, shots: u64) -> QexecResult<(ShotRun<PureState>, ShotPlan)> {
        let initial = self.initial_for(circuit)?;
        let plan = ShotPlan {
            shots: effective_shots(shots),
            base_seed: self.options.seed.unwrap_or_else(|| rand::thread_rng().gen()),
            parallel: self.options.parallel,
            max_retries: self.options.max_retries,
        };

        debug!(
            "{}: {} qubits, {} ops, {} shots, seed {}",
            self.name,
            circuit.num_qubits(),
            circuit.operations().len(),
            plan.shots,
            plan.base_seed
        );

        let run = run_shots(circuit, &initial, plan, &self.abort)?;
        Ok((run, plan))
    }
}

impl Backend for StatevectorBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn mode(&self) -> SimulatorMode {
        SimulatorMode::Statevector
    }

    fn max_qubits(&self) -> usize {
        self.max_qubits
    }

    fn abort_handle(&self) -> AbortHandle {
        self.abort.clone()
    }

    fn execute(&self, circuit: &Circuit, shots: u64) -> QexecResult<ExecutionResult> {
        let start = Instant::now();
        let (run, plan) = self.run(circuit, shots)?;
        let elapsed = start.elapsed().as_millis() as u64;

        info!(
            "{}: {}/{} shots in {} ms ({} outcomes, {} degenerate)",
            self.name,
            run.completed,
            plan.shots,
            elapsed,
            run.stats.len(),
            run.degenerate
        );

        Ok(ExecutionResult {
            stats: run.stats,
            final_state: FinalState::Pure(run.final_state),
            shots: plan.shots,
            metadata: ExecutionMetadata {
                backend: self.name.clone(),
                mode: SimulatorMode::Statevector,
                seed: plan.base_seed,
                parallel: plan.parallel,
                shots_completed: run.completed,
                degenerate_shots: run.degenerate,
                retried_shots: run.retried,
                aborted: run.aborted,
                execution_time_ms: Some(elapsed),
            },
        })
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use qexec_core::{CircuitBuilder, OutcomeKey};
    use std::f64::consts::PI;

    fn key(s: &str) -> OutcomeKey {
        OutcomeKey::parse(s).unwrap()
    }

    #[test]
    fn test_bell_state() {
        let backend = StatevectorBackend::new().with_seed(42);
        let circuit = CircuitBuilder::new(2).h(0).cnot(0, 1).measure_all().build().unwrap();

        let result = backend.execute(&circuit, 1000).unwrap();

        let p00 = result.probability(&key("00"));
        let p11 = result.probability(&key("11"));
        assert!(p00 > 0.4 && p00 < 0.6, "P(00) = {}", p00);
        assert!(p11 > 0.4 && p11 < 0.6, "P(11) = {}", p11);
        assert_eq!(result.stats.get(&key("01")) + result.stats.get(&key("10")), 0);

        // Final register is one of the collapsed branches
        let amps = result.final_state.amplitudes().unwrap();
        let collapsed = amps[0b00].norm_sqr() + amps[0b11].norm_sqr();
        assert_abs_diff_eq!(collapsed, 1.0, epsilon = 1e-12);
        assert!(amps[0b00].norm_sqr() < 1e-12 || amps[0b11].norm_sqr() < 1e-12);
    }

    #[test]
    fn test_rz_gate() {
        let backend = StatevectorBackend::new().with_seed(42);

        // H-Rz(π)-H is X up to phase
        let circuit = CircuitBuilder::new(1).h(0).rz(0, PI).h(0).measure(0).build().unwrap();

        let (stats, _) = backend.simulate(&circuit, 1000).unwrap();
        assert_eq!(stats.get(&key("1")), 1000);
    }

    #[test]
    fn test_measurement_order_defines_key() {
        let backend = StatevectorBackend::new().with_seed(1);
        let circuit = CircuitBuilder::new(3)
            .x(2)
            .measure(2)
            .measure(0)
            .measure(1)
            .build()
            .unwrap();

        let (stats, _) = backend.simulate(&circuit, 10).unwrap();
        assert_eq!(stats.get(&key("100")), 10);
    }

    #[test]
    fn test_reset_returns_to_zero() {
        let backend = StatevectorBackend::new().with_seed(3);
        let circuit = CircuitBuilder::new(2).h(0).cnot(0, 1).reset(0).reset(1).build().unwrap();

        let (stats, state) = backend.simulate(&circuit, 20).unwrap();
        assert_eq!(stats.get(&OutcomeKey::empty()), 20);
        assert_abs_diff_eq!(state.amplitude(0).norm_sqr(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_qubit_limit() {
        let backend = StatevectorBackend::new().with_max_qubits(3);
        let circuit = CircuitBuilder::new(5).build().unwrap();

        let err = backend.execute(&circuit, 100).unwrap_err();
        assert!(matches!(err, QexecError::TooManyQubits { requested: 5, max: 3, .. }));
        assert!(err.is_configuration());
    }

    #[test]
    fn test_initial_state() {
        let backend = StatevectorBackend::new()
            .with_seed(5)
            .with_initial_state(PureState::basis(2, 0b10).unwrap());
        let circuit = CircuitBuilder::new(2).cnot(0, 1).measure_all().build().unwrap();

        let (stats, _) = backend.simulate(&circuit, 8).unwrap();
        assert_eq!(stats.get(&key("11")), 8);

        let wrong = CircuitBuilder::new(3).build().unwrap();
        let err = backend.simulate(&wrong, 8).unwrap_err();
        assert!(matches!(err, QexecError::InvalidInitialState(_)));
    }

    #[test]
    fn test_seed_reproducibility() {
        let circuit = CircuitBuilder::new(3).h_layer().measure_all().build().unwrap();

        let a = StatevectorBackend::new().with_seed(42).execute(&circuit, 200).unwrap();
        let b = StatevectorBackend::new().with_seed(42).execute(&circuit, 200).unwrap();
        assert_eq!(a.stats, b.stats);
        assert_eq!(a.final_state, b.final_state);
        assert_eq!(a.metadata.seed, 42);
    }

    #[test]
    fn test_unseeded_run_reports_seed() {
        let circuit = CircuitBuilder::new(2).h_layer().measure_all().build().unwrap();
        let first = StatevectorBackend::new().execute(&circuit, 100).unwrap();

        let replay = StatevectorBackend::new()
            .with_seed(first.metadata.seed)
            .execute(&circuit, 100)
            .unwrap();
        assert_eq!(first.stats, replay.stats);
    }
}
