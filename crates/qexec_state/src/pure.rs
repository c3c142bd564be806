//! Pure statevector
//!
//! Complex amplitudes over the computational basis of an n-qubit register,
//! big-endian (qubit 0 is the most significant bit of the index).

use crate::kernel::{apply_operator, bit_mask, register_dimension};
use num_complex::Complex64;
use qexec_core::numerics::{DEGENERACY_TOLERANCE, NORMALIZATION_TOLERANCE};
use qexec_core::{GateOp, QexecError, QexecResult, QubitId, StandardGate};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Pure quantum state of `num_qubits` qubits
///
/// Deserialization goes through [`PureState::from_amplitudes`], so a decoded
/// state always has 2^n unit-norm amplitudes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawPureState")]
pub struct PureState {
    num_qubits: usize,
    amplitudes: Vec<Complex64>,
}

#[derive(Deserialize)]
struct RawPureState {
    num_qubits: usize,
    amplitudes: Vec<Complex64>,
}

impl TryFrom<RawPureState> for PureState {
    type Error = QexecError;

    fn try_from(raw: RawPureState) -> Result<Self, Self::Error> {
        let state = PureState::from_amplitudes(raw.amplitudes)?;
        if state.num_qubits != raw.num_qubits {
            return Err(QexecError::InvalidInitialState(format!(
                "{} amplitudes do not describe {} qubits",
                state.amplitudes.len(),
                raw.num_qubits
            )));
        }
        Ok(state)
    }
}

impl PureState {
    // ========================================================================
    // Constructors
    // ========================================================================

    /// |0...0⟩
    pub fn new(num_qubits: usize) -> Self {
        let mut amplitudes = vec![Complex64::new(0.0, 0.0); 1 << num_qubits];
        amplitudes[0] = Complex64::new(1.0, 0.0);
        Self {
            num_qubits,
            amplitudes,
        }
    }

    /// Computational basis state |index⟩
    pub fn basis(num_qubits: usize, index: usize) -> QexecResult<Self> {
        let dim = register_dimension(num_qubits)?;
        if index >= dim {
            return Err(QexecError::InvalidInitialState(format!(
                "basis index {} out of range for {} qubits",
                index, num_qubits
            )));
        }
        let mut amplitudes = vec![Complex64::new(0.0, 0.0); dim];
        amplitudes[index] = Complex64::new(1.0, 0.0);
        Ok(Self {
            num_qubits,
            amplitudes,
        })
    }

    /// From explicit amplitudes (length 2^n, n >= 1, unit norm)
    pub fn from_amplitudes(amplitudes: Vec<Complex64>) -> QexecResult<Self> {
        let len = amplitudes.len();
        if len < 2 || !len.is_power_of_two() {
            return Err(QexecError::InvalidInitialState(format!(
                "amplitude count {} is not a power of two >= 2",
                len
            )));
        }
        let norm_sqr: f64 = amplitudes.iter().map(|a| a.norm_sqr()).sum();
        if (norm_sqr - 1.0).abs() > NORMALIZATION_TOLERANCE {
            return Err(QexecError::InvalidInitialState(format!(
                "norm² is {} (expected 1)",
                norm_sqr
            )));
        }
        Ok(Self {
            num_qubits: len.trailing_zeros() as usize,
            amplitudes,
        })
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    /// Number of qubits
    #[inline]
    pub fn num_qubits(&self) -> usize {
        self.num_qubits
    }

    /// Vector length (2^n)
    #[inline]
    pub fn dimension(&self) -> usize {
        self.amplitudes.len()
    }

    /// Amplitudes in basis-index order
    #[inline]
    pub fn amplitudes(&self) -> &[Complex64] {
        &self.amplitudes
    }

    /// Amplitude of basis state `index`
    #[inline]
    pub fn amplitude(&self, index: usize) -> Complex64 {
        self.amplitudes[index]
    }

    /// Consume into the amplitude vector
    pub fn into_amplitudes(self) -> Vec<Complex64> {
        self.amplitudes
    }

    /// Σ |a_i|²
    pub fn norm_sqr(&self) -> f64 {
        self.amplitudes.iter().map(|a| a.norm_sqr()).sum()
    }

    /// Born-rule probabilities per basis state
    pub fn probabilities(&self) -> Vec<f64> {
        self.amplitudes.iter().map(|a| a.norm_sqr()).collect()
    }

    /// Marginal probability that `qubit` reads 1
    pub fn probability_of_one(&self, qubit: QubitId) -> f64 {
        let (p0, p1) = self.branch_masses(qubit);
        let total = p0 + p1;
        if total > 0.0 {
            p1 / total
        } else {
            0.0
        }
    }

    /// ⟨self|other⟩
    pub fn inner(&self, other: &PureState) -> Complex64 {
        self.amplitudes
            .iter()
            .zip(&other.amplitudes)
            .map(|(a, b)| a.conj() * b)
            .sum()
    }

    /// |⟨self|other⟩|²
    pub fn fidelity(&self, other: &PureState) -> f64 {
        self.inner(other).norm_sqr()
    }

    // ========================================================================
    // Evolution
    // ========================================================================

    /// Apply a (possibly controlled) gate in place
    pub fn apply_gate(&mut self, gate: &GateOp) {
        apply_operator(
            &mut self.amplitudes,
            self.num_qubits,
            gate.matrix(),
            gate.targets(),
            gate.controls(),
        );
    }

    /// Rescale to unit norm, returning the previous norm
    pub fn renormalize(&mut self) -> f64 {
        let norm = self.norm_sqr().sqrt();
        if norm > 0.0 {
            let inv = 1.0 / norm;
            self.amplitudes.iter_mut().for_each(|a| *a *= inv);
        }
        norm
    }

    // ========================================================================
    // Measurement
    // ========================================================================

    /// Projective measurement of `qubit` with stochastic collapse
    ///
    /// Draws u ∈ [0, 1) and reads 1 iff u < p1. On a degenerate branch the
    /// state is left untouched and [`QexecError::NumericDegeneracy`] is
    /// returned.
    pub fn measure<R: Rng + ?Sized>(&mut self, qubit: QubitId, rng: &mut R) -> QexecResult<u8> {
        let p1 = self.probability_of_one(qubit);
        let u: f64 = rng.gen();
        let outcome = u8::from(u < p1);
        self.collapse(qubit, outcome)?;
        Ok(outcome)
    }

    /// Project `qubit` onto `outcome` and renormalize, returning the branch
    /// probability
    pub fn collapse(&mut self, qubit: QubitId, outcome: u8) -> QexecResult<f64> {
        let (p0, p1) = self.branch_masses(qubit);
        let kept = if outcome == 1 { p1 } else { p0 };
        let total = p0 + p1;
        let probability = if total > 0.0 { kept / total } else { 0.0 };

        if probability < DEGENERACY_TOLERANCE {
            return Err(QexecError::NumericDegeneracy {
                qubit,
                outcome,
                probability,
            });
        }

        let mask = bit_mask(self.num_qubits, qubit);
        let keep_set = outcome == 1;
        let scale = 1.0 / kept.sqrt();
        for (i, a) in self.amplitudes.iter_mut().enumerate() {
            if (i & mask != 0) == keep_set {
                *a *= scale;
            } else {
                *a = Complex64::new(0.0, 0.0);
            }
        }
        Ok(probability)
    }

    /// Reset `qubit` to |0⟩: measure without recording, flip on 1
    pub fn reset<R: Rng + ?Sized>(&mut self, qubit: QubitId, rng: &mut R) -> QexecResult<()> {
        if self.measure(qubit, rng)? == 1 {
            self.apply_gate(&GateOp::standard(StandardGate::X, vec![qubit]));
        }
        Ok(())
    }

    /// (mass with qubit = 0, mass with qubit = 1)
    fn branch_masses(&self, qubit: QubitId) -> (f64, f64) {
        let mask = bit_mask(self.num_qubits, qubit);
        self.amplitudes
            .iter()
            .enumerate()
            .fold((0.0, 0.0), |(p0, p1), (i, a)| {
                if i & mask != 0 {
                    (p0, p1 + a.norm_sqr())
                } else {
                    (p0 + a.norm_sqr(), p1)
                }
            })
    }
}

impl fmt::Display for PureState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = self.num_qubits;
        let terms: Vec<String> = self
            .amplitudes
            .iter()
            .enumerate()
            .filter(|(_, a)| a.norm_sqr() > 1e-12)
            .map(|(i, a)| format!("({:.4}{:+.4}i)|{:0width$b}⟩", a.re, a.im, i, width = width))
            .collect();
        write!(f, "{}", terms.join(" + "))
    }
}

// ============================================================================
// Tests
// ============================================================================
