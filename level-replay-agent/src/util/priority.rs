//! Priorities of sampled transitions.

/// Added to absolute TD errors so that no transition ends with zero priority.
pub const TD_PRIORITY_EPS: f32 = 1e-10;

/// Returns $(|\delta| + \epsilon)^\alpha$ for each TD error $\delta$.
pub fn td_priority(td_errs: &[f32], alpha: f32) -> Vec<f32> {
    td_errs
        .iter()
        .map(|d| (d.abs() + TD_PRIORITY_EPS).powf(alpha))
        .collect()
}

/// Uses per-sample losses as priorities, bounded below by `min_priority`.
///
/// Non-finite losses are mapped to `min_priority`.
pub fn loss_priority(losses: &[f32], min_priority: f32) -> Vec<f32> {
    losses
        .iter()
        .map(|&l| {
            if l.is_finite() {
                l.max(min_priority)
            } else {
                min_priority
            }
        })
        .collect()
}

/// Discount of the bootstrapped value of an `n`-step transition.
pub fn n_step_discount(gamma: f32, n: usize) -> f32 {
    gamma.powi(n as i32)
}
