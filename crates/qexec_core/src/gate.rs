//! Quantum gate definitions for qexec
//!
//! A gate in a circuit is a unitary matrix bound to an ordered list of target
//! qubits and an optional list of control qubits. Named standard gates are
//! resolved to their matrices once, at construction.
//!
//! Matrices use the same big-endian convention as the state containers: the
//! first target qubit is the most significant bit of the local gate index.

use crate::constants::numerics::{FRAC_1_SQRT_2, UNITARY_TOLERANCE};
use crate::error::{QexecError, QexecResult};
use crate::types::{Amplitude, Angle, QubitId};
use num_complex::Complex64;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

const ZERO: Complex64 = Complex64::new(0.0, 0.0);
const ONE: Complex64 = Complex64::new(1.0, 0.0);
const I: Complex64 = Complex64::new(0.0, 1.0);

// ============================================================================
// GateMatrix
// ============================================================================

/// Square complex matrix stored row-major
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GateMatrix {
    dim: usize,
    data: Vec<Amplitude>,
}

impl GateMatrix {
    /// Create from a dimension and row-major entries
    pub fn new(dim: usize, data: Vec<Amplitude>) -> QexecResult<Self> {
        if dim == 0 || data.len() != dim * dim {
            return Err(QexecError::NonSquareMatrix {
                rows: dim,
                cols: if dim == 0 { data.len() } else { data.len() / dim },
            });
        }
        Ok(Self { dim, data })
    }

    /// Create from nested rows
    pub fn from_rows(rows: Vec<Vec<Amplitude>>) -> QexecResult<Self> {
        let dim = rows.len();
        if let Some(bad) = rows.iter().find(|r| r.len() != dim) {
            return Err(QexecError::NonSquareMatrix {
                rows: dim,
                cols: bad.len(),
            });
        }
        Self::new(dim, rows.into_iter().flatten().collect())
    }

    /// Identity of dimension `dim`
    pub fn identity(dim: usize) -> Self {
        let mut data = vec![ZERO; dim * dim];
        for i in 0..dim {
            data[i * dim + i] = ONE;
        }
        Self { dim, data }
    }

    fn from_2x2(a: Amplitude, b: Amplitude, c: Amplitude, d: Amplitude) -> Self {
        Self {
            dim: 2,
            data: vec![a, b, c, d],
        }
    }

    /// Matrix dimension (rows == cols)
    #[inline]
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Row-major entries
    #[inline]
    pub fn data(&self) -> &[Amplitude] {
        &self.data
    }

    /// Entry at (row, col)
    #[inline]
    pub fn get(&self, row: usize, col: usize) -> Amplitude {
        self.data[row * self.dim + col]
    }

    /// Number of qubits this matrix acts on, if dim is a power of two
    pub fn num_qubits(&self) -> Option<usize> {
        if self.dim.is_power_of_two() {
            Some(self.dim.trailing_zeros() as usize)
        } else {
            None
        }
    }

    /// Element-wise complex conjugate
    pub fn conj(&self) -> Self {
        Self {
            dim: self.dim,
            data: self.data.iter().map(|z| z.conj()).collect(),
        }
    }

    /// Conjugate transpose
    pub fn adjoint(&self) -> Self {
        let n = self.dim;
        let mut data = vec![ZERO; n * n];
        for r in 0..n {
            for c in 0..n {
                data[c * n + r] = self.data[r * n + c].conj();
            }
        }
        Self { dim: n, data }
    }

    /// Matrix product `self * other`
    pub fn mul(&self, other: &GateMatrix) -> QexecResult<Self> {
        if self.dim != other.dim {
            return Err(QexecError::MatrixDimensionMismatch {
                expected: self.dim,
                actual: other.dim,
            });
        }
        let n = self.dim;
        let mut data = vec![ZERO; n * n];
        for r in 0..n {
            for k in 0..n {
                let a = self.data[r * n + k];
                if a == ZERO {
                    continue;
                }
                for c in 0..n {
                    data[r * n + c] += a * other.data[k * n + c];
                }
            }
        }
        Ok(Self { dim: n, data })
    }

    /// Check U†U = I within `tol`
    pub fn is_unitary(&self, tol: f64) -> bool {
        match self.adjoint().mul(self) {
            Ok(product) => product
                .data
                .iter()
                .zip(Self::identity(self.dim).data.iter())
                .all(|(a, b)| (a - b).norm() <= tol),
            Err(_) => false,
        }
    }

    /// Check whether entries and dimension agree
    fn is_well_formed(&self) -> bool {
        self.dim > 0 && self.data.len() == self.dim * self.dim
    }
}

// ============================================================================
// Standard Gates
// ============================================================================

/// Named standard gate
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum StandardGate {
    /// Identity
    I,
    /// Hadamard
    H,
    /// Pauli-X
    X,
    /// Pauli-Y
    Y,
    /// Pauli-Z
    Z,
    /// sqrt(Z)
    S,
    /// S-dagger
    Sdg,
    /// fourth root of Z
    T,
    /// T-dagger
    Tdg,
    /// sqrt(X)
    Sx,
    /// SX-dagger
    Sxdg,
    /// Rotation around X
    Rx(Angle),
    /// Rotation around Y
    Ry(Angle),
    /// Rotation around Z
    Rz(Angle),
    /// Phase gate diag(1, e^{iλ})
    P(Angle),
    /// Generic single-qubit U(θ, φ, λ)
    U(Angle, Angle, Angle),
    /// Two-qubit swap
    Swap,
    /// Two-qubit iSWAP
    ISwap,
}

impl StandardGate {
    /// Number of target qubits
    pub fn arity(&self) -> usize {
        match self {
            StandardGate::Swap | StandardGate::ISwap => 2,
            _ => 1,
        }
    }

    /// Lower-case gate name
    pub fn name(&self) -> &'static str {
        match self {
            StandardGate::I => "id",
            StandardGate::H => "h",
            StandardGate::X => "x",
            StandardGate::Y => "y",
            StandardGate::Z => "z",
            StandardGate::S => "s",
            StandardGate::Sdg => "sdg",
            StandardGate::T => "t",
            StandardGate::Tdg => "tdg",
            StandardGate::Sx => "sx",
            StandardGate::Sxdg => "sxdg",
            StandardGate::Rx(_) => "rx",
            StandardGate::Ry(_) => "ry",
            StandardGate::Rz(_) => "rz",
            StandardGate::P(_) => "p",
            StandardGate::U(_, _, _) => "u",
            StandardGate::Swap => "swap",
            StandardGate::ISwap => "iswap",
        }
    }

    /// Check if gate takes angle parameters
    pub fn is_parameterized(&self) -> bool {
        matches!(
            self,
            StandardGate::Rx(_)
                | StandardGate::Ry(_)
                | StandardGate::Rz(_)
                | StandardGate::P(_)
                | StandardGate::U(_, _, _)
        )
    }

    /// Inverse gate, when it is itself a standard gate
    pub fn inverse(&self) -> Option<StandardGate> {
        let inv = match *self {
            StandardGate::S => StandardGate::Sdg,
            StandardGate::Sdg => StandardGate::S,
            StandardGate::T => StandardGate::Tdg,
            StandardGate::Tdg => StandardGate::T,
            StandardGate::Sx => StandardGate::Sxdg,
            StandardGate::Sxdg => StandardGate::Sx,
            StandardGate::Rx(theta) => StandardGate::Rx(-theta),
            StandardGate::Ry(theta) => StandardGate::Ry(-theta),
            StandardGate::Rz(theta) => StandardGate::Rz(-theta),
            StandardGate::P(lambda) => StandardGate::P(-lambda),
            StandardGate::U(theta, phi, lambda) => StandardGate::U(-theta, -lambda, -phi),
            StandardGate::ISwap => return None,
            g => g,
        };
        Some(inv)
    }

    /// Unitary matrix of this gate
    pub fn matrix(&self) -> GateMatrix {
        let h = FRAC_1_SQRT_2;
        match *self {
            StandardGate::I => GateMatrix::identity(2),
            StandardGate::H => GateMatrix::from_2x2(
                Complex64::new(h, 0.0),
                Complex64::new(h, 0.0),
                Complex64::new(h, 0.0),
                Complex64::new(-h, 0.0),
            ),
            StandardGate::X => GateMatrix::from_2x2(ZERO, ONE, ONE, ZERO),
            StandardGate::Y => GateMatrix::from_2x2(ZERO, -I, I, ZERO),
            StandardGate::Z => GateMatrix::from_2x2(ONE, ZERO, ZERO, -ONE),
            StandardGate::S => GateMatrix::from_2x2(ONE, ZERO, ZERO, I),
            StandardGate::Sdg => GateMatrix::from_2x2(ONE, ZERO, ZERO, -I),
            StandardGate::T => {
                GateMatrix::from_2x2(ONE, ZERO, ZERO, Complex64::from_polar(1.0, std::f64::consts::FRAC_PI_4))
            }
            StandardGate::Tdg => {
                GateMatrix::from_2x2(ONE, ZERO, ZERO, Complex64::from_polar(1.0, -std::f64::consts::FRAC_PI_4))
            }
            StandardGate::Sx => {
                let a = Complex64::new(0.5, 0.5);
                let b = Complex64::new(0.5, -0.5);
                GateMatrix::from_2x2(a, b, b, a)
            }
            StandardGate::Sxdg => {
                let a = Complex64::new(0.5, -0.5);
                let b = Complex64::new(0.5, 0.5);
                GateMatrix::from_2x2(a, b, b, a)
            }
            StandardGate::Rx(theta) => {
                let c = Complex64::new((theta / 2.0).cos(), 0.0);
                let s = Complex64::new(0.0, -(theta / 2.0).sin());
                GateMatrix::from_2x2(c, s, s, c)
            }
            StandardGate::Ry(theta) => {
                let c = (theta / 2.0).cos();
                let s = (theta / 2.0).sin();
                GateMatrix::from_2x2(
                    Complex64::new(c, 0.0),
                    Complex64::new(-s, 0.0),
                    Complex64::new(s, 0.0),
                    Complex64::new(c, 0.0),
                )
            }
            StandardGate::Rz(theta) => GateMatrix::from_2x2(
                Complex64::from_polar(1.0, -theta / 2.0),
                ZERO,
                ZERO,
                Complex64::from_polar(1.0, theta / 2.0),
            ),
            StandardGate::P(lambda) => {
                GateMatrix::from_2x2(ONE, ZERO, ZERO, Complex64::from_polar(1.0, lambda))
            }
            StandardGate::U(theta, phi, lambda) => {
                let c = (theta / 2.0).cos();
                let s = (theta / 2.0).sin();
                GateMatrix::from_2x2(
                    Complex64::new(c, 0.0),
                    -Complex64::from_polar(s, lambda),
                    Complex64::from_polar(s, phi),
                    Complex64::from_polar(c, phi + lambda),
                )
            }
            StandardGate::Swap => {
                let mut m = GateMatrix {
                    dim: 4,
                    data: vec![ZERO; 16],
                };
                m.data[0] = ONE;
                m.data[4 + 2] = ONE;
                m.data[2 * 4 + 1] = ONE;
                m.data[15] = ONE;
                m
            }
            StandardGate::ISwap => {
                let mut m = GateMatrix {
                    dim: 4,
                    data: vec![ZERO; 16],
                };
                m.data[0] = ONE;
                m.data[4 + 2] = I;
                m.data[2 * 4 + 1] = I;
                m.data[15] = ONE;
                m
            }
        }
    }
}

impl fmt::Display for StandardGate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StandardGate::Rx(a) | StandardGate::Ry(a) | StandardGate::Rz(a) | StandardGate::P(a) => {
                write!(f, "{}({})", self.name(), a)
            }
            StandardGate::U(t, p, l) => write!(f, "u({},{},{})", t, p, l),
            _ => write!(f, "{}", self.name()),
        }
    }
}

// ============================================================================
// Gate Operation
// ============================================================================

/// Origin of a gate's matrix
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GateKind {
    /// Named standard gate
    Standard(StandardGate),
    /// User-supplied unitary
    Custom(String),
}

/// Gate bound to its target and control qubits
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GateOp {
    kind: GateKind,
    matrix: GateMatrix,
    targets: Vec<QubitId>,
    controls: Vec<QubitId>,
}

impl GateOp {
    /// Standard gate on `targets`
    pub fn standard(gate: StandardGate, targets: Vec<QubitId>) -> Self {
        Self {
            kind: GateKind::Standard(gate),
            matrix: gate.matrix(),
            targets,
            controls: Vec::new(),
        }
    }

    /// Standard gate on `targets`, applied only where every control is 1
    pub fn controlled(gate: StandardGate, controls: Vec<QubitId>, targets: Vec<QubitId>) -> Self {
        Self::standard(gate, targets).with_controls(controls)
    }

    /// Arbitrary unitary on `targets`
    pub fn custom(name: impl Into<String>, matrix: GateMatrix, targets: Vec<QubitId>) -> Self {
        Self {
            kind: GateKind::Custom(name.into()),
            matrix,
            targets,
            controls: Vec::new(),
        }
    }

    /// Replace control qubits
    pub fn with_controls(mut self, controls: Vec<QubitId>) -> Self {
        self.controls = controls;
        self
    }

    /// Gate kind
    pub fn kind(&self) -> &GateKind {
        &self.kind
    }

    /// Gate matrix (2^k x 2^k, k = target count)
    pub fn matrix(&self) -> &GateMatrix {
        &self.matrix
    }

    /// Target qubits, first is the most significant in the matrix
    pub fn targets(&self) -> &[QubitId] {
        &self.targets
    }

    /// Control qubits
    pub fn controls(&self) -> &[QubitId] {
        &self.controls
    }

    /// Controls followed by targets
    pub fn qubits(&self) -> impl Iterator<Item = QubitId> + '_ {
        self.controls.iter().chain(self.targets.iter()).copied()
    }

    /// Total number of qubits touched
    pub fn width(&self) -> usize {
        self.controls.len() + self.targets.len()
    }

    /// Gate name with one `c` prefix per control (e.g. `cx`, `ccx`)
    pub fn name(&self) -> String {
        let base = match &self.kind {
            GateKind::Standard(g) => g.name().to_string(),
            GateKind::Custom(name) => name.clone(),
        };
        format!("{}{}", "c".repeat(self.controls.len()), base)
    }

    /// Inverse operation: adjoint matrix on the same wiring
    pub fn inverse(&self) -> Self {
        let kind = match &self.kind {
            GateKind::Standard(g) => match g.inverse() {
                Some(inv) => GateKind::Standard(inv),
                None => GateKind::Custom(format!("{}dg", g.name())),
            },
            GateKind::Custom(name) => GateKind::Custom(format!("{}dg", name)),
        };
        Self {
            kind,
            matrix: self.matrix.adjoint(),
            targets: self.targets.clone(),
            controls: self.controls.clone(),
        }
    }

    /// Check if the matrix is unitary
    pub fn is_unitary(&self) -> bool {
        self.matrix.is_unitary(UNITARY_TOLERANCE)
    }

    /// Structural validation against a register of `num_qubits`
    pub fn validate(&self, num_qubits: usize) -> QexecResult<()> {
        if self.targets.is_empty() {
            return Err(QexecError::EmptyTargets);
        }
        if !self.matrix.is_well_formed() {
            return Err(QexecError::NonSquareMatrix {
                rows: self.matrix.dim,
                cols: self.matrix.data.len() / self.matrix.dim.max(1),
            });
        }

        let expected = 1usize
            .checked_shl(self.targets.len() as u32)
            .unwrap_or(usize::MAX);
        if self.matrix.dim != expected {
            return Err(QexecError::MatrixDimensionMismatch {
                expected,
                actual: self.matrix.dim,
            });
        }

        let mut seen = HashSet::new();
        for qubit in self.qubits() {
            if qubit >= num_qubits {
                return Err(QexecError::QubitOutOfRange { qubit, num_qubits });
            }
            if !seen.insert(qubit) {
                return Err(QexecError::DuplicateQubit(qubit));
            }
        }
        Ok(())
    }
}

impl fmt::Display for GateOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match &self.kind {
            GateKind::Standard(g) => format!("{}{}", "c".repeat(self.controls.len()), g),
            GateKind::Custom(_) => self.name(),
        };
        let qubits: Vec<String> = self.qubits().map(|q| format!("q[{}]", q)).collect();
        write!(f, "{} {}", label, qubits.join(","))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use std::f64::consts::PI;

    fn all_standard() -> Vec<StandardGate> {
        vec![
            StandardGate::I,
            StandardGate::H,
            StandardGate::X,
            StandardGate::Y,
            StandardGate::Z,
            StandardGate::S,
            StandardGate::Sdg,
            StandardGate::T,
            StandardGate::Tdg,
            StandardGate::Sx,
            StandardGate::Sxdg,
            StandardGate::Rx(0.3),
            StandardGate::Ry(1.1),
            StandardGate::Rz(-0.7),
            StandardGate::P(PI / 3.0),
            StandardGate::U(0.4, 1.2, -0.5),
            StandardGate::Swap,
            StandardGate::ISwap,
        ]
    }

    #[test]
    fn test_standard_gates_unitary() {
        for gate in all_standard() {
            let m = gate.matrix();
            assert_eq!(m.dim(), 1 << gate.arity(), "{}", gate);
            assert!(m.is_unitary(1e-12), "{} is not unitary", gate);
        }
    }

    #[test]
    fn test_standard_inverse() {
        for gate in all_standard() {
            if let Some(inv) = gate.inverse() {
                let product = inv.matrix().mul(&gate.matrix()).unwrap();
                let id = GateMatrix::identity(product.dim());
                for (a, b) in product.data().iter().zip(id.data()) {
                    assert_abs_diff_eq!(a.re, b.re, epsilon = 1e-12);
                    assert_abs_diff_eq!(a.im, b.im, epsilon = 1e-12);
                }
            }
        }
    }

    #[test]
    fn test_sx_squared_is_x() {
        let sx = StandardGate::Sx.matrix();
        let x = sx.mul(&sx).unwrap();
        assert_abs_diff_eq!(x.get(0, 1).re, 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(x.get(0, 0).norm(), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_matrix_from_rows() {
        let ok = GateMatrix::from_rows(vec![vec![ONE, ZERO], vec![ZERO, ONE]]);
        assert!(ok.is_ok());

        let bad = GateMatrix::from_rows(vec![vec![ONE, ZERO], vec![ZERO]]);
        assert!(matches!(bad, Err(QexecError::NonSquareMatrix { .. })));
    }

    #[test]
    fn test_gate_op_validation() {
        let cx = GateOp::controlled(StandardGate::X, vec![0], vec![1]);
        assert!(cx.validate(2).is_ok());
        assert_eq!(cx.name(), "cx");
        assert_eq!(cx.width(), 2);

        assert!(matches!(
            cx.validate(1),
            Err(QexecError::QubitOutOfRange { qubit: 1, .. })
        ));

        let dup = GateOp::controlled(StandardGate::X, vec![1], vec![1]);
        assert_eq!(dup.validate(2), Err(QexecError::DuplicateQubit(1)));

        let wrong_dim = GateOp::custom("m", GateMatrix::identity(2), vec![0, 1]);
        assert_eq!(
            wrong_dim.validate(2),
            Err(QexecError::MatrixDimensionMismatch {
                expected: 4,
                actual: 2
            })
        );

        let none = GateOp::custom("m", GateMatrix::identity(1), vec![]);
        assert_eq!(none.validate(2), Err(QexecError::EmptyTargets));
    }

    #[test]
    fn test_gate_op_inverse() {
        let t = GateOp::standard(StandardGate::T, vec![0]);
        assert_eq!(t.inverse().kind(), &GateKind::Standard(StandardGate::Tdg));

        let iswap = GateOp::standard(StandardGate::ISwap, vec![0, 1]);
        assert_eq!(iswap.inverse().kind(), &GateKind::Custom("iswapdg".into()));
        assert!(iswap.inverse().is_unitary());
    }

    #[test]
    fn test_gate_op_display() {
        let ccx = GateOp::controlled(StandardGate::X, vec![0, 1], vec![2]);
        assert_eq!(ccx.to_string(), "ccx q[0],q[1],q[2]");
    }
}
