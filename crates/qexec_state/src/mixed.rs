//! Density matrix
//!
//! Row-major 2^n x 2^n complex matrix. Gate conjugation ρ → UρU† reuses the
//! subspace kernel on the row-major vectorisation of ρ, which is a 2n-qubit
//! vector whose first n qubits index rows and last n qubits index columns:
//! U acts on the row qubits and U* on the column qubits.
//!
//! Every mutating step ends with [`MixedState::symmetrize`] and
//! [`MixedState::renormalize`] to keep ρ Hermitian with unit trace.

use crate::kernel::{apply_operator, bit_mask, register_dimension};
use crate::pure::PureState;
use num_complex::Complex64;
use qexec_core::numerics::{DEGENERACY_TOLERANCE, HERMITIAN_TOLERANCE, NORMALIZATION_TOLERANCE};
use qexec_core::{GateOp, QexecError, QexecResult, QubitId};
use rand::Rng;
use serde::{Deserialize, Serialize};

const ZERO: Complex64 = Complex64::new(0.0, 0.0);

/// Mixed quantum state of `num_qubits` qubits
///
/// Deserialization goes through [`MixedState::from_matrix`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawMixedState")]
pub struct MixedState {
    num_qubits: usize,
    data: Vec<Complex64>,
}

#[derive(Deserialize)]
struct RawMixedState {
    num_qubits: usize,
    data: Vec<Complex64>,
}

impl TryFrom<RawMixedState> for MixedState {
    type Error = QexecError;

    fn try_from(raw: RawMixedState) -> Result<Self, Self::Error> {
        MixedState::from_matrix(raw.num_qubits, raw.data)
    }
}

impl MixedState {
    // ========================================================================
    // Constructors
    // ========================================================================

    /// |0...0⟩⟨0...0|
    pub fn new(num_qubits: usize) -> Self {
        let dim = 1usize << num_qubits;
        let mut data = vec![ZERO; dim * dim];
        data[0] = Complex64::new(1.0, 0.0);
        Self { num_qubits, data }
    }

    /// |ψ⟩⟨ψ|
    pub fn from_pure(state: &PureState) -> Self {
        let amps = state.amplitudes();
        let dim = amps.len();
        let mut data = vec![ZERO; dim * dim];
        for (r, a) in amps.iter().enumerate() {
            for (c, b) in amps.iter().enumerate() {
                data[r * dim + c] = a * b.conj();
            }
        }
        Self {
            num_qubits: state.num_qubits(),
            data,
        }
    }

    /// I / 2^n
    pub fn maximally_mixed(num_qubits: usize) -> Self {
        let dim = 1usize << num_qubits;
        let mut data = vec![ZERO; dim * dim];
        let weight = 1.0 / dim as f64;
        for i in 0..dim {
            data[i * dim + i] = Complex64::new(weight, 0.0);
        }
        Self { num_qubits, data }
    }

    /// Σ p_i |ψ_i⟩⟨ψ_i|
    pub fn from_ensemble(ensemble: &[(f64, PureState)]) -> QexecResult<Self> {
        let first = ensemble
            .first()
            .ok_or_else(|| QexecError::InvalidInitialState("empty ensemble".into()))?;
        let num_qubits = first.1.num_qubits();
        let dim = 1usize << num_qubits;

        let mut total = 0.0;
        let mut data = vec![ZERO; dim * dim];
        for (p, state) in ensemble {
            if *p < 0.0 {
                return Err(QexecError::InvalidInitialState(format!(
                    "negative ensemble weight {}",
                    p
                )));
            }
            if state.num_qubits() != num_qubits {
                return Err(QexecError::InvalidInitialState(format!(
                    "ensemble mixes {} and {} qubit states",
                    num_qubits,
                    state.num_qubits()
                )));
            }
            total += p;
            let projector = Self::from_pure(state);
            for (d, e) in data.iter_mut().zip(&projector.data) {
                *d += *e * *p;
            }
        }

        if (total - 1.0).abs() > NORMALIZATION_TOLERANCE {
            return Err(QexecError::InvalidInitialState(format!(
                "ensemble weights sum to {} (expected 1)",
                total
            )));
        }
        Ok(Self { num_qubits, data })
    }

    /// From explicit row-major entries
    ///
    /// Checks size, Hermiticity, unit trace and a non-negative diagonal.
    pub fn from_matrix(num_qubits: usize, data: Vec<Complex64>) -> QexecResult<Self> {
        let dim = register_dimension(num_qubits)?;
        let entries = dim.checked_mul(dim).ok_or_else(|| {
            QexecError::InvalidInitialState(format!("{} qubits exceed the address space", num_qubits))
        })?;
        if num_qubits == 0 || data.len() != entries {
            return Err(QexecError::InvalidInitialState(format!(
                "expected {} entries for {} qubits, got {}",
                entries,
                num_qubits,
                data.len()
            )));
        }
        let state = Self { num_qubits, data };
        if !state.is_hermitian(HERMITIAN_TOLERANCE) {
            return Err(QexecError::InvalidInitialState("matrix is not Hermitian".into()));
        }
        if (state.trace() - 1.0).abs() > NORMALIZATION_TOLERANCE {
            return Err(QexecError::InvalidInitialState(format!(
                "trace is {} (expected 1)",
                state.trace()
            )));
        }
        if state.probabilities().iter().any(|&p| p < -NORMALIZATION_TOLERANCE) {
            return Err(QexecError::InvalidInitialState("negative diagonal entry".into()));
        }
        Ok(state)
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    /// Number of qubits
    #[inline]
    pub fn num_qubits(&self) -> usize {
        self.num_qubits
    }

    /// Side length (2^n)
    #[inline]
    pub fn dimension(&self) -> usize {
        1usize << self.num_qubits
    }

    /// Entry ρ[row][col]
    #[inline]
    pub fn entry(&self, row: usize, col: usize) -> Complex64 {
        self.data[row * self.dimension() + col]
    }

    /// Row-major entries
    pub fn data(&self) -> &[Complex64] {
        &self.data
    }

    /// Rows in order
    pub fn rows(&self) -> std::slice::Chunks<'_, Complex64> {
        self.data.chunks(self.dimension())
    }

    /// Consume into row-major entries
    pub fn into_data(self) -> Vec<Complex64> {
        self.data
    }

    /// Real part of tr(ρ)
    pub fn trace(&self) -> f64 {
        let dim = self.dimension();
        (0..dim).map(|i| self.data[i * dim + i].re).sum()
    }

    /// tr(ρ²)
    pub fn purity(&self) -> f64 {
        self.data.iter().map(|z| z.norm_sqr()).sum()
    }

    /// Check ρ = ρ† within `tol`
    pub fn is_hermitian(&self, tol: f64) -> bool {
        let dim = self.dimension();
        (0..dim).all(|r| {
            (r..dim).all(|c| (self.data[r * dim + c] - self.data[c * dim + r].conj()).norm() <= tol)
        })
    }

    /// Diagonal: probability of each basis state
    pub fn probabilities(&self) -> Vec<f64> {
        let dim = self.dimension();
        (0..dim).map(|i| self.data[i * dim + i].re).collect()
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

    /// ⟨ψ|ρ|ψ⟩, the fidelity with a pure state
    pub fn expectation_pure(&self, state: &PureState) -> f64 {
        let amps = state.amplitudes();
        let dim = self.dimension();
        let mut acc = ZERO;
        for (r, a) in amps.iter().enumerate() {
            let row = &self.data[r * dim..(r + 1) * dim];
            let row_dot: Complex64 = row.iter().zip(amps).map(|(rho, b)| rho * b).sum();
            acc += a.conj() * row_dot;
        }
        acc.re
    }

    // ========================================================================
    // Evolution
    // ========================================================================

    /// ρ → UρU†
    pub fn apply_gate(&mut self, gate: &GateOp) {
        let n = self.num_qubits;
        let shift = |qs: &[QubitId]| qs.iter().map(|q| q + n).collect::<Vec<_>>();

        apply_operator(
            &mut self.data,
            2 * n,
            gate.matrix(),
            gate.targets(),
            gate.controls(),
        );
        apply_operator(
            &mut self.data,
            2 * n,
            &gate.matrix().conj(),
            &shift(gate.targets()),
            &shift(gate.controls()),
        );

        self.symmetrize();
        self.renormalize();
    }

    /// ρ → (ρ + ρ†) / 2
    pub fn symmetrize(&mut self) {
        let dim = self.dimension();
        for r in 0..dim {
            let diag = &mut self.data[r * dim + r];
            diag.im = 0.0;
            for c in (r + 1)..dim {
                let avg = (self.data[r * dim + c] + self.data[c * dim + r].conj()) * 0.5;
                self.data[r * dim + c] = avg;
                self.data[c * dim + r] = avg.conj();
            }
        }
    }

    /// Rescale to unit trace, returning the previous trace
    pub fn renormalize(&mut self) -> f64 {
        let trace = self.trace();
        if trace > 0.0 {
            let inv = 1.0 / trace;
            self.data.iter_mut().for_each(|z| *z *= inv);
        }
        trace
    }

    // ========================================================================
    // Measurement
    // ========================================================================

    /// Projective measurement of `qubit` with stochastic collapse
    ///
    /// p1 = tr(P1 ρ P1); the sampled branch replaces ρ by PρP† / tr(PρP†).
    pub fn measure<R: Rng + ?Sized>(&mut self, qubit: QubitId, rng: &mut R) -> QexecResult<u8> {
        let p1 = self.probability_of_one(qubit);
        let u: f64 = rng.gen();
        let outcome = u8::from(u < p1);
        self.collapse(qubit, outcome)?;
        Ok(outcome)
    }

    /// Project `qubit` onto `outcome` and renormalize, returning the branch
    /// probability. A degenerate branch leaves ρ untouched.
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

        let dim = self.dimension();
        let mask = bit_mask(self.num_qubits, qubit);
        let keep_set = outcome == 1;
        let inv = 1.0 / kept;
        for r in 0..dim {
            let row_kept = (r & mask != 0) == keep_set;
            for c in 0..dim {
                let z = &mut self.data[r * dim + c];
                if row_kept && (c & mask != 0) == keep_set {
                    *z *= inv;
                } else {
                    *z = ZERO;
                }
            }
        }

        self.symmetrize();
        self.renormalize();
        Ok(probability)
    }

    /// Reset `qubit` to |0⟩: ρ → P0ρP0 + X P1ρP1 X
    ///
    /// Deterministic; the outcome is traced out instead of sampled.
    pub fn reset(&mut self, qubit: QubitId) {
        let dim = self.dimension();
        let mask = bit_mask(self.num_qubits, qubit);
        let mut next = vec![ZERO; dim * dim];
        for r in (0..dim).filter(|r| r & mask == 0) {
            for c in (0..dim).filter(|c| c & mask == 0) {
                next[r * dim + c] = self.data[r * dim + c] + self.data[(r | mask) * dim + (c | mask)];
            }
        }
        self.data = next;

        self.symmetrize();
        self.renormalize();
    }

    /// (mass with qubit = 0, mass with qubit = 1)
    fn branch_masses(&self, qubit: QubitId) -> (f64, f64) {
        let mask = bit_mask(self.num_qubits, qubit);
        self.probabilities()
            .into_iter()
            .enumerate()
            .fold((0.0, 0.0), |(p0, p1), (i, p)| {
                if i & mask != 0 {
                    (p0, p1 + p)
                } else {
                    (p0 + p, p1)
                }
            })
    }
}

impl From<&PureState> for MixedState {
    fn from(state: &PureState) -> Self {
        Self::from_pure(state)
    }
}

// ============================================================================
// Tests
// ============================================================================
