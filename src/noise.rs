//! Decoherence noise model
//!
//! Maps the time a symbol spends in the queue to a per-bit flip probability,
//! and provides the binary entropy used to turn that probability into a
//! capacity estimate.

/// Bit-flip probability after waiting `wait` time units at decoherence rate `kappa`.
///
/// p = 0.5 * (1 - exp(-kappa * wait))
///
/// Zero at `wait = 0`, rising monotonically towards 0.5 (a uniformly random
/// bit) as the wait grows.
pub fn flip_probability(wait: f64, kappa: f64) -> f64 {
    // -exp_m1(-x) == 1 - exp(-x) without cancellation for small x
    let p = -0.5 * (-kappa * wait).exp_m1();
    p.clamp(0.0, 0.5)
}

/// Shannon binary entropy in bits.
///
/// H(p) = -p log2 p - (1 - p) log2 (1 - p), taken as 0 outside (0, 1).
pub fn binary_entropy(p: f64) -> f64 {
    if p <= 0.0 || p >= 1.0 {
        return 0.0;
    }
    let h = -p * p.log2() - (1.0 - p) * (1.0 - p).log2();
    h.clamp(0.0, 1.0)
}
