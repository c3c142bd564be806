//! Constants for qexec
//!
//! Numerical tolerances and register-size limits shared by the state
//! containers and both engines.

// ============================================================================
// Numerics
// ============================================================================

pub mod numerics {
    //! Floating-point tolerances

    /// Branch probability below which a measurement collapse is degenerate
    pub const DEGENERACY_TOLERANCE: f64 = 1e-12;

    /// Tolerance on norm² (pure) or trace (mixed) when validating a state
    pub const NORMALIZATION_TOLERANCE: f64 = 1e-9;

    /// Element-wise tolerance for Hermiticity checks
    pub const HERMITIAN_TOLERANCE: f64 = 1e-9;

    /// Element-wise tolerance for unitarity checks
    pub const UNITARY_TOLERANCE: f64 = 1e-9;

    /// 1/sqrt(2)
    pub const FRAC_1_SQRT_2: f64 = std::f64::consts::FRAC_1_SQRT_2;
}

// ============================================================================
// Limits
// ============================================================================

pub mod limits {
    //! Register and run limits

    /// Default qubit cap for the statevector engine (2^28 amplitudes)
    pub const MAX_STATEVECTOR_QUBITS: usize = 28;

    /// Default qubit cap for the density-matrix engine (2^14 x 2^14 entries)
    pub const MAX_DENSITY_QUBITS: usize = 14;

    /// Minimum number of shots per run; a request of 0 is raised to this
    pub const MIN_SHOTS: u64 = 1;

    /// Default number of retries for a degenerate shot
    pub const DEFAULT_MAX_RETRIES: u32 = 3;

    /// Normalize a requested shot count (0 becomes [`MIN_SHOTS`])
    #[inline]
    pub const fn effective_shots(requested: u64) -> u64 {
        if requested < MIN_SHOTS {
            MIN_SHOTS
        } else {
            requested
        }
    }
}
