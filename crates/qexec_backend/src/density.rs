//! Density-matrix backend
//!
//! Evolves the full density operator per shot: gates conjugate ρ, and a
//! measurement replaces ρ by the normalized projection onto the sampled
//! branch. Costs 4^n memory but can start from, and report, mixed states.

use crate::execution::{AbortHandle, Backend, BackendOptions, ExecutionMetadata, ExecutionResult, FinalState};
use crate::mode::SimulatorMode;
use crate::shots::{run_shots, ShotPlan, ShotRun, ShotState};
use crate::stats::StatsTable;
use log::{debug, info};
use qexec_core::limits::{effective_shots, MAX_DENSITY_QUBITS};
use qexec_core::{Circuit, GateOp, QexecError, QexecResult, QubitId};
use qexec_state::{MixedState, PureState};
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use std::time::Instant;

impl ShotState for MixedState {
    fn apply_gate(&mut self, gate: &GateOp) {
        MixedState::apply_gate(self, gate);
    }

    fn measure(&mut self, qubit: QubitId, rng: &mut ChaCha8Rng) -> QexecResult<u8> {
        MixedState::measure(self, qubit, rng)
    }

    fn reset(&mut self, qubit: QubitId, _rng: &mut ChaCha8Rng) -> QexecResult<()> {
        MixedState::reset(self, qubit);
        Ok(())
    }
}

/// Mixed-state simulator
#[derive(Debug, Clone)]
pub struct DensityMatrixBackend {
    name: String,
    options: BackendOptions,
    max_qubits: usize,
    initial_state: Option<MixedState>,
    abort: AbortHandle,
}

impl Default for DensityMatrixBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl DensityMatrixBackend {
    /// Create backend with default options
    pub fn new() -> Self {
        Self {
            name: "qexec_density_matrix".to_string(),
            options: BackendOptions::default(),
            max_qubits: MAX_DENSITY_QUBITS,
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

    /// Start every shot from `state` instead of |0...0⟩⟨0...0|
    pub fn with_initial_state(mut self, state: MixedState) -> Self {
        self.initial_state = Some(state);
        self
    }

    /// Start every shot from |ψ⟩⟨ψ|
    pub fn with_initial_pure(self, state: &PureState) -> Self {
        self.with_initial_state(MixedState::from_pure(state))
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

    /// Run `shots` shots and return the histogram and last density matrix
    pub fn simulate(&self, circuit: &Circuit, shots: u64) -> QexecResult<(StatsTable, MixedState)> {
        let (run, _) = self.run(circuit, shots)?;
        Ok((run.stats, run.final_state))
    }

    fn initial_for(&self, circuit: &Circuit) -> QexecResult<MixedState> {
        let n = circuit.num_qubits();
        if n > self.max_qubits {
            return Err(QexecError::TooManyQubits {
                requested: n,
                max: self.max_qubits,
                mode: SimulatorMode::DensityMatrix.name().to_string(),
            });
        }

        match &self.initial_state {
            Some(state) if state.num_qubits() != n => Err(QexecError::InvalidInitialState(format!(
                "initial density matrix has {} qubits, circuit has {}",
                state.num_qubits(),
                n
            ))),
            Some(state) => Ok(state.clone()),
            None => Ok(MixedState::new(n)),
        }
    }

    fn run(&self, circuit: &Circuit, shots: u64) -> QexecResult<(ShotRun<MixedState>, ShotPlan)> {
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

impl Backend for DensityMatrixBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn mode(&self) -> SimulatorMode {
        SimulatorMode::DensityMatrix
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
            "{}: {}/{} shots in {} ms ({} outcomes, purity {:.4})",
            self.name,
            run.completed,
            plan.shots,
            elapsed,
            run.stats.len(),
            run.final_state.purity()
        );

        Ok(ExecutionResult {
            stats: run.stats,
            final_state: FinalState::Mixed(run.final_state),
            shots: plan.shots,
            metadata: ExecutionMetadata {
                backend: self.name.clone(),
                mode: SimulatorMode::DensityMatrix,
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

    fn key(s: &str) -> OutcomeKey {
        OutcomeKey::parse(s).unwrap()
    }

    #[test]
    fn test_ghz_correlations() {
        let backend = DensityMatrixBackend::new().with_seed(42);
        let circuit = CircuitBuilder::new(3).h(0).cx_chain().measure_all().build().unwrap();

        let (stats, rho) = backend.simulate(&circuit, 500).unwrap();

        assert_eq!(stats.get(&key("000")) + stats.get(&key("111")), 500);
        assert!(stats.get(&key("000")) > 150);
        assert!(stats.get(&key("111")) > 150);
        assert_abs_diff_eq!(rho.trace(), 1.0, epsilon = 1e-9);
        assert_abs_diff_eq!(rho.purity(), 1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_unmeasured_state_is_coherent() {
        let backend = DensityMatrixBackend::new().with_seed(1);
        let circuit = CircuitBuilder::new(2).h(0).cnot(0, 1).build().unwrap();

        let (stats, rho) = backend.simulate(&circuit, 10).unwrap();
        assert_eq!(stats.get(&OutcomeKey::empty()), 10);

        // (|00⟩ + |11⟩)/√2 has coherences of 1/2
        assert_abs_diff_eq!(rho.entry(0b00, 0b11).re, 0.5, epsilon = 1e-12);
        assert_abs_diff_eq!(rho.entry(0b11, 0b00).re, 0.5, epsilon = 1e-12);
    }

    #[test]
    fn test_reset_of_entangled_qubit_leaves_mixture() {
        let backend = DensityMatrixBackend::new().with_seed(1);
        let circuit = CircuitBuilder::new(2).h(0).cnot(0, 1).reset(0).build().unwrap();

        let (_, rho) = backend.simulate(&circuit, 1).unwrap();
        assert_abs_diff_eq!(rho.purity(), 0.5, epsilon = 1e-9);
        assert_abs_diff_eq!(rho.entry(0b00, 0b00).re, 0.5, epsilon = 1e-9);
        assert_abs_diff_eq!(rho.entry(0b01, 0b01).re, 0.5, epsilon = 1e-9);
    }

    #[test]
    fn test_mixed_initial_state_statistics() {
        // Maximally mixed qubit measures 50/50 with no gates at all
        let backend = DensityMatrixBackend::new()
            .with_seed(9)
            .with_initial_state(MixedState::maximally_mixed(1));
        let circuit = CircuitBuilder::new(1).measure(0).build().unwrap();

        let (stats, _) = backend.simulate(&circuit, 4000).unwrap();
        let p1 = stats.probability(&key("1"));
        assert!((p1 - 0.5).abs() < 0.04, "P(1) = {}", p1);
    }

    #[test]
    fn test_initial_pure_state() {
        let backend = DensityMatrixBackend::new()
            .with_seed(2)
            .with_initial_pure(&PureState::basis(2, 0b10).unwrap());
        let circuit = CircuitBuilder::new(2).cnot(0, 1).measure_all().build().unwrap();

        let (stats, _) = backend.simulate(&circuit, 5).unwrap();
        assert_eq!(stats.get(&key("11")), 5);
    }

    #[test]
    fn test_qubit_limit() {
        let backend = DensityMatrixBackend::new();
        let circuit = CircuitBuilder::new(MAX_DENSITY_QUBITS + 1).build().unwrap();

        let err = backend.execute(&circuit, 1).unwrap_err();
        assert!(matches!(err, QexecError::TooManyQubits { mode, .. } if mode == "density_matrix"));
    }
}
