//! Core types for qexec
//!
//! Type aliases and the measurement outcome key shared across crates.

use crate::error::{QexecError, QexecResult};
use num_complex::Complex64;
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Type Aliases
// ============================================================================

/// Qubit identifier (0-indexed, qubit 0 is the most significant bit)
pub type QubitId = usize;

/// Rotation angle in radians
pub type Angle = f64;

/// Complex amplitude
pub type Amplitude = Complex64;

// ============================================================================
// OutcomeKey
// ============================================================================

/// Ordered classical bits recorded during one shot, in measurement order
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OutcomeKey {
    bits: Vec<u8>,
}

impl OutcomeKey {
    /// Create from a vector of bits (each 0 or 1)
    pub fn new(bits: Vec<u8>) -> Self {
        debug_assert!(bits.iter().all(|&b| b <= 1));
        Self { bits }
    }

    /// Key of a shot that recorded nothing
    pub fn empty() -> Self {
        Self { bits: Vec::new() }
    }

    /// Parse from a bit string such as "0110"
    pub fn parse(s: &str) -> QexecResult<Self> {
        let bits: Result<Vec<u8>, _> = s
            .chars()
            .map(|c| match c {
                '0' => Ok(0),
                '1' => Ok(1),
                _ => Err(QexecError::InvalidConfig(format!(
                    "invalid outcome key '{}'",
                    s
                ))),
            })
            .collect();
        Ok(Self { bits: bits? })
    }

    /// Append one measured bit
    pub fn push(&mut self, bit: u8) {
        debug_assert!(bit <= 1);
        self.bits.push(bit);
    }

    /// Number of recorded bits
    pub fn len(&self) -> usize {
        self.bits.len()
    }

    /// Check if no bit was recorded
    pub fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }

    /// Bits in measurement order
    pub fn bits(&self) -> &[u8] {
        &self.bits
    }

    /// Bit at position `index`
    pub fn get(&self, index: usize) -> Option<u8> {
        self.bits.get(index).copied()
    }

    /// Count number of 1s
    pub fn popcount(&self) -> usize {
        self.bits.iter().filter(|&&b| b == 1).count()
    }

    /// +1 for even parity, -1 for odd
    pub fn parity_sign(&self) -> i32 {
        if self.popcount() % 2 == 0 {
            1
        } else {
            -1
        }
    }
}

impl fmt::Display for OutcomeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for &b in &self.bits {
            write!(f, "{}", b)?;
        }
        Ok(())
    }
}

impl From<Vec<u8>> for OutcomeKey {
    fn from(bits: Vec<u8>) -> Self {
        Self::new(bits)
    }
}

// ============================================================================
// Tests
// ============================================================================
