//! Subspace operator kernel
//!
//! Applies a 2^k x 2^k matrix to k target qubits of a 2^n amplitude vector
//! without materializing the full operator. Each pass visits one base index
//! with every target bit cleared (and every control bit set), gathers the
//! 2^k amplitudes that differ only in target bits, multiplies and scatters
//! them back. Cost is O(2^n · 2^k).

use num_complex::Complex64;
use qexec_core::{GateMatrix, QexecError, QexecResult, QubitId};

/// Hilbert-space dimension 2^n, or `InvalidInitialState` if it overflows
pub fn register_dimension(num_qubits: usize) -> QexecResult<usize> {
    u32::try_from(num_qubits)
        .ok()
        .and_then(|n| 1usize.checked_shl(n))
        .ok_or_else(|| {
            QexecError::InvalidInitialState(format!("{} qubits exceed the address space", num_qubits))
        })
}

/// Bit mask of `qubit` in a big-endian register of `num_qubits`
#[inline]
pub fn bit_mask(num_qubits: usize, qubit: QubitId) -> usize {
    debug_assert!(qubit < num_qubits);
    1usize << (num_qubits - 1 - qubit)
}

/// Combined mask of several qubits
#[inline]
pub fn combined_mask(num_qubits: usize, qubits: &[QubitId]) -> usize {
    qubits
        .iter()
        .fold(0, |acc, &q| acc | bit_mask(num_qubits, q))
}

/// Apply `matrix` to `targets`, restricted to basis states where every
/// qubit in `controls` is 1
///
/// `amps.len()` must be `2^num_qubits` and `matrix.dim()` must be
/// `2^targets.len()`; both are guaranteed by circuit validation.
pub fn apply_operator(
    amps: &mut [Complex64],
    num_qubits: usize,
    matrix: &GateMatrix,
    targets: &[QubitId],
    controls: &[QubitId],
) {
    let k = targets.len();
    let dim = 1usize << k;
    debug_assert_eq!(amps.len(), 1usize << num_qubits);
    debug_assert_eq!(matrix.dim(), dim);

    let target_masks: Vec<usize> = targets.iter().map(|&q| bit_mask(num_qubits, q)).collect();
    let target_mask = target_masks.iter().fold(0, |acc, &m| acc | m);
    let control_mask = combined_mask(num_qubits, controls);

    // offsets[l]: index displacement for local basis state l (first target = MSB)
    let offsets: Vec<usize> = (0..dim)
        .map(|l| {
            (0..k)
                .filter(|&j| (l >> (k - 1 - j)) & 1 == 1)
                .map(|j| target_masks[j])
                .sum()
        })
        .collect();

    let m = matrix.data();
    let mut buf = vec![Complex64::new(0.0, 0.0); dim];

    for base in 0..amps.len() {
        if base & target_mask != 0 || base & control_mask != control_mask {
            continue;
        }

        for (slot, &off) in buf.iter_mut().zip(&offsets) {
            *slot = amps[base | off];
        }

        for (r, &off) in offsets.iter().enumerate() {
            let row = &m[r * dim..(r + 1) * dim];
            amps[base | off] = row.iter().zip(&buf).map(|(a, b)| a * b).sum();
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
