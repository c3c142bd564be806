//! Circuit builder for qexec
//!
//! Fluent builder for constructing circuits. Operations are collected as-is
//! and validated together by [`CircuitBuilder::build`].

use crate::circuit::{Circuit, MeasureTarget, Operation};
use crate::error::QexecResult;
use crate::gate::{GateMatrix, GateOp, StandardGate};
use crate::types::{Angle, QubitId};

/// Fluent circuit builder (consuming self pattern)
#[derive(Debug, Clone)]
pub struct CircuitBuilder {
    num_qubits: usize,
    operations: Vec<Operation>,
}

impl CircuitBuilder {
    // ========================================================================
    // Constructor
    // ========================================================================

    /// Create a new circuit builder
    pub fn new(num_qubits: usize) -> Self {
        Self {
            num_qubits,
            operations: Vec::new(),
        }
    }

    fn push_gate(mut self, op: GateOp) -> Self {
        self.operations.push(Operation::Gate(op));
        self
    }

    fn single(self, gate: StandardGate, qubit: QubitId) -> Self {
        self.push_gate(GateOp::standard(gate, vec![qubit]))
    }

    // ========================================================================
    // Single-Qubit Gates (Non-Parameterized)
    // ========================================================================

    /// Add Hadamard gate
    pub fn h(self, qubit: QubitId) -> Self {
        self.single(StandardGate::H, qubit)
    }

    /// Add Pauli-X gate
    pub fn x(self, qubit: QubitId) -> Self {
        self.single(StandardGate::X, qubit)
    }

    /// Add Pauli-Y gate
    pub fn y(self, qubit: QubitId) -> Self {
        self.single(StandardGate::Y, qubit)
    }

    /// Add Pauli-Z gate
    pub fn z(self, qubit: QubitId) -> Self {
        self.single(StandardGate::Z, qubit)
    }

    /// Add S gate
    pub fn s(self, qubit: QubitId) -> Self {
        self.single(StandardGate::S, qubit)
    }

    /// Add S-dagger gate
    pub fn sdg(self, qubit: QubitId) -> Self {
        self.single(StandardGate::Sdg, qubit)
    }

    /// Add T gate
    pub fn t(self, qubit: QubitId) -> Self {
        self.single(StandardGate::T, qubit)
    }

    /// Add T-dagger gate
    pub fn tdg(self, qubit: QubitId) -> Self {
        self.single(StandardGate::Tdg, qubit)
    }

    /// Add SX gate
    pub fn sx(self, qubit: QubitId) -> Self {
        self.single(StandardGate::Sx, qubit)
    }

    /// Add identity gate
    pub fn id(self, qubit: QubitId) -> Self {
        self.single(StandardGate::I, qubit)
    }

    // ========================================================================
    // Single-Qubit Parameterized Gates
    // ========================================================================

    /// Add Rx rotation
    pub fn rx(self, qubit: QubitId, angle: Angle) -> Self {
        self.single(StandardGate::Rx(angle), qubit)
    }

    /// Add Ry rotation
    pub fn ry(self, qubit: QubitId, angle: Angle) -> Self {
        self.single(StandardGate::Ry(angle), qubit)
    }

    /// Add Rz rotation
    pub fn rz(self, qubit: QubitId, angle: Angle) -> Self {
        self.single(StandardGate::Rz(angle), qubit)
    }

    /// Add phase gate
    pub fn p(self, qubit: QubitId, lambda: Angle) -> Self {
        self.single(StandardGate::P(lambda), qubit)
    }

    /// Add generic U(θ, φ, λ)
    pub fn u(self, qubit: QubitId, theta: Angle, phi: Angle, lambda: Angle) -> Self {
        self.single(StandardGate::U(theta, phi, lambda), qubit)
    }

    // ========================================================================
    // Multi-Qubit Gates
    // ========================================================================

    /// Add CNOT (CX) gate
    pub fn cnot(self, control: QubitId, target: QubitId) -> Self {
        self.controlled(StandardGate::X, &[control], &[target])
    }

    /// Add CZ gate
    pub fn cz(self, control: QubitId, target: QubitId) -> Self {
        self.controlled(StandardGate::Z, &[control], &[target])
    }

    /// Add CY gate
    pub fn cy(self, control: QubitId, target: QubitId) -> Self {
        self.controlled(StandardGate::Y, &[control], &[target])
    }

    /// Add controlled-Rz
    pub fn crz(self, control: QubitId, target: QubitId, angle: Angle) -> Self {
        self.controlled(StandardGate::Rz(angle), &[control], &[target])
    }

    /// Add SWAP gate
    pub fn swap(self, q1: QubitId, q2: QubitId) -> Self {
        self.push_gate(GateOp::standard(StandardGate::Swap, vec![q1, q2]))
    }

    /// Add Toffoli (CCX) gate
    pub fn ccx(self, c1: QubitId, c2: QubitId, target: QubitId) -> Self {
        self.controlled(StandardGate::X, &[c1, c2], &[target])
    }

    /// Add Fredkin (CSWAP) gate
    pub fn cswap(self, control: QubitId, q1: QubitId, q2: QubitId) -> Self {
        self.controlled(StandardGate::Swap, &[control], &[q1, q2])
    }

    /// Add any standard gate with control qubits
    pub fn controlled(self, gate: StandardGate, controls: &[QubitId], targets: &[QubitId]) -> Self {
        self.push_gate(GateOp::controlled(gate, controls.to_vec(), targets.to_vec()))
    }

    /// Add an arbitrary unitary on `targets`
    pub fn unitary(self, name: &str, matrix: GateMatrix, targets: &[QubitId]) -> Self {
        self.push_gate(GateOp::custom(name, matrix, targets.to_vec()))
    }

    /// Add a prepared gate operation
    pub fn gate(self, op: GateOp) -> Self {
        self.push_gate(op)
    }

    // ========================================================================
    // Layers
    // ========================================================================

    /// Hadamard on every qubit
    pub fn h_layer(mut self) -> Self {
        for q in 0..self.num_qubits {
            self = self.h(q);
        }
        self
    }

    /// CNOT chain 0→1→…→n-1
    pub fn cx_chain(mut self) -> Self {
        for q in 0..self.num_qubits.saturating_sub(1) {
            self = self.cnot(q, q + 1);
        }
        self
    }

    // ========================================================================
    // Measurement and Reset
    // ========================================================================

    /// Measure a single qubit
    pub fn measure(mut self, qubit: QubitId) -> Self {
        self.operations
            .push(Operation::Measure(MeasureTarget::Qubit(qubit)));
        self
    }

    /// Measure every qubit in index order
    pub fn measure_all(mut self) -> Self {
        self.operations.push(Operation::Measure(MeasureTarget::All));
        self
    }

    /// Reset a qubit to |0⟩
    pub fn reset(mut self, qubit: QubitId) -> Self {
        self.operations.push(Operation::Reset(qubit));
        self
    }

    // ========================================================================
    // Build
    // ========================================================================

    /// Number of operations added so far
    pub fn len(&self) -> usize {
        self.operations.len()
    }

    /// Check if no operation was added
    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// Validate and build the circuit
    pub fn build(self) -> QexecResult<Circuit> {
        Circuit::new(self.num_qubits, self.operations)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::QexecError;
    use crate::gate::GateKind;

    #[test]
    fn test_bell_circuit() {
        let circuit = CircuitBuilder::new(2)
            .h(0)
            .cnot(0, 1)
            .measure_all()
            .build()
            .unwrap();

        assert_eq!(circuit.gate_count(), 2);
        assert_eq!(circuit.measurement_count(), 2);
    }

    #[test]
    fn test_layers() {
        let circuit = CircuitBuilder::new(4).h_layer().cx_chain().build().unwrap();
        assert_eq!(circuit.gate_count(), 4 + 3);
        assert!(!circuit.has_measurements());
    }

    #[test]
    fn test_controlled_wiring() {
        let circuit = CircuitBuilder::new(3).ccx(0, 1, 2).build().unwrap();
        match &circuit.operations()[0] {
            Operation::Gate(op) => {
                assert_eq!(op.controls(), &[0, 1]);
                assert_eq!(op.targets(), &[2]);
                assert_eq!(op.kind(), &GateKind::Standard(StandardGate::X));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_build_defers_validation() {
        let builder = CircuitBuilder::new(2).h(0).cnot(0, 7);
        assert_eq!(builder.len(), 2);
        assert!(matches!(
            builder.build(),
            Err(QexecError::QubitOutOfRange { qubit: 7, .. })
        ));
    }

    #[test]
    fn test_reset_and_measure() {
        let circuit = CircuitBuilder::new(1)
            .x(0)
            .reset(0)
            .measure(0)
            .build()
            .unwrap();
        assert_eq!(circuit.operations().len(), 3);
        assert_eq!(circuit.measured_qubits(), vec![0]);
    }
}
