//! Quantum circuit structure for qexec
//!
//! A [`Circuit`] is validated once at construction and is read-only
//! afterwards, so one instance can be shared by every shot and every worker
//! without synchronization.

use crate::error::{QexecError, QexecResult};
use crate::gate::GateOp;
use crate::types::QubitId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Target of a measurement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MeasureTarget {
    /// Single qubit
    Qubit(QubitId),
    /// Every qubit, in index order
    All,
}

/// One step of a circuit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Operation {
    /// Unitary gate
    Gate(GateOp),
    /// Projective measurement in the computational basis
    Measure(MeasureTarget),
    /// Reset a qubit to |0⟩ without recording an outcome
    Reset(QubitId),
}

impl Operation {
    /// Check if operation is a measurement
    pub fn is_measurement(&self) -> bool {
        matches!(self, Operation::Measure(_))
    }

    /// Check if operation is a gate
    pub fn is_gate(&self) -> bool {
        matches!(self, Operation::Gate(_))
    }

    /// Qubits touched by this operation (empty for a measure-all)
    pub fn qubits(&self) -> Vec<QubitId> {
        match self {
            Operation::Gate(gate) => gate.qubits().collect(),
            Operation::Measure(MeasureTarget::Qubit(q)) | Operation::Reset(q) => vec![*q],
            Operation::Measure(MeasureTarget::All) => vec![],
        }
    }

    fn validate(&self, num_qubits: usize) -> QexecResult<()> {
        match self {
            Operation::Gate(gate) => gate.validate(num_qubits),
            Operation::Measure(MeasureTarget::Qubit(q)) | Operation::Reset(q) => {
                if *q >= num_qubits {
                    Err(QexecError::QubitOutOfRange {
                        qubit: *q,
                        num_qubits,
                    })
                } else {
                    Ok(())
                }
            }
            Operation::Measure(MeasureTarget::All) => Ok(()),
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Gate(gate) => write!(f, "{}", gate),
            Operation::Measure(MeasureTarget::Qubit(q)) => write!(f, "measure q[{}]", q),
            Operation::Measure(MeasureTarget::All) => write!(f, "measure q"),
            Operation::Reset(q) => write!(f, "reset q[{}]", q),
        }
    }
}

/// Validated, immutable quantum circuit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawCircuit")]
pub struct Circuit {
    num_qubits: usize,
    operations: Vec<Operation>,
}

/// Unvalidated wire form used for deserialization
#[derive(Deserialize)]
struct RawCircuit {
    num_qubits: usize,
    operations: Vec<Operation>,
}

impl TryFrom<RawCircuit> for Circuit {
    type Error = QexecError;

    fn try_from(raw: RawCircuit) -> Result<Self, Self::Error> {
        Circuit::new(raw.num_qubits, raw.operations)
    }
}

impl Circuit {
    // ========================================================================
    // Constructors
    // ========================================================================

    /// Create and validate a circuit
    ///
    /// Fails with a structural error if any operation references a qubit
    /// `>= num_qubits` or a gate matrix does not match its target count, and
    /// with [`QexecError::InvalidQubitCount`] for an empty register.
    pub fn new(num_qubits: usize, operations: Vec<Operation>) -> QexecResult<Self> {
        if num_qubits == 0 {
            return Err(QexecError::InvalidQubitCount(num_qubits));
        }
        for op in &operations {
            op.validate(num_qubits)?;
        }
        Ok(Self {
            num_qubits,
            operations,
        })
    }

    /// Circuit with no operations
    pub fn empty(num_qubits: usize) -> QexecResult<Self> {
        Self::new(num_qubits, Vec::new())
    }

    /// Parse from JSON (validated)
    pub fn from_json(json: &str) -> QexecResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Serialize to JSON
    pub fn to_json(&self) -> QexecResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    /// Register size
    pub fn num_qubits(&self) -> usize {
        self.num_qubits
    }

    /// Operations in execution order
    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    /// Iterate over operations
    pub fn iter(&self) -> std::slice::Iter<'_, Operation> {
        self.operations.iter()
    }

    /// Check if circuit has no operations
    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    // ========================================================================
    // Circuit Analysis
    // ========================================================================

    /// Number of gate operations
    pub fn gate_count(&self) -> usize {
        self.operations.iter().filter(|op| op.is_gate()).count()
    }

    /// Number of recorded bits per shot (a measure-all counts every qubit)
    pub fn measurement_count(&self) -> usize {
        self.measured_qubits().len()
    }

    /// Check if any operation records an outcome
    pub fn has_measurements(&self) -> bool {
        self.operations.iter().any(|op| op.is_measurement())
    }

    /// Qubits in the order their outcomes appear in an outcome key
    pub fn measured_qubits(&self) -> Vec<QubitId> {
        let mut order = Vec::new();
        for op in &self.operations {
            match op {
                Operation::Measure(MeasureTarget::Qubit(q)) => order.push(*q),
                Operation::Measure(MeasureTarget::All) => order.extend(0..self.num_qubits),
                _ => {}
            }
        }
        order
    }

    /// Circuit depth (longest path over qubit timelines)
    pub fn depth(&self) -> usize {
        let mut qubit_depths = vec![0usize; self.num_qubits];

        for op in &self.operations {
            let qubits = op.qubits();
            if qubits.is_empty() {
                let max_depth = qubit_depths.iter().copied().max().unwrap_or(0);
                qubit_depths.iter_mut().for_each(|d| *d = max_depth + 1);
            } else {
                let max_depth = qubits
                    .iter()
                    .map(|&q| qubit_depths[q])
                    .max()
                    .unwrap_or(0);
                for &q in &qubits {
                    qubit_depths[q] = max_depth + 1;
                }
            }
        }

        qubit_depths.into_iter().max().unwrap_or(0)
    }
}

impl<'a> IntoIterator for &'a Circuit {
    type Item = &'a Operation;
    type IntoIter = std::slice::Iter<'a, Operation>;

    fn into_iter(self) -> Self::IntoIter {
        self.operations.iter()
    }
}

impl fmt::Display for Circuit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Circuit({} qubits, {} ops, depth {})",
            self.num_qubits,
            self.operations.len(),
            self.depth()
        )?;
        for op in &self.operations {
            writeln!(f, "  {}", op)?;
        }
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
