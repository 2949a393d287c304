//! Utilities.
mod cross_entropy;
mod priority;
pub use cross_entropy::{cross_entropy, cross_entropy_batch};
pub use priority::{loss_priority, n_step_discount, td_priority, TD_PRIORITY_EPS};
