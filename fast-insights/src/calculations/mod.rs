//! Statistics computed on an encoded model.
//!
//! - [`calculate_dependence`] scores every segment against the binary target.
//! - [`compare_intervals`] projects the effect of swapping one segment's
//!   behaviour for a sibling's.

pub mod compare;
pub mod dependence;

pub use compare::{compare_intervals, CentralMetric, CentralValue, IntervalComparison};
pub use dependence::{calculate_dependence, DependenceMetric, DependenceReport, DependenceRow};
