//! Percent-complete aggregation for key results and objectives
//!
//! Both functions are pure and cheap; callers recompute on every change
//! instead of caching.

use super::KeyResult;

/// Percent complete of one key result, always within `0.0..=100.0`.
///
/// A zero target reads as 0% rather than dividing by zero. Non-finite
/// inputs also read as 0%.
pub fn key_result_percent(kr: &KeyResult) -> f64 {
    if kr.target_value == 0.0 {
        return 0.0;
    }
    let percent = kr.current_value / kr.target_value * 100.0;
    if !percent.is_finite() {
        return 0.0;
    }
    percent.clamp(0.0, 100.0)
}

/// Objective progress as the rounded mean of its key results' percents.
///
/// Zero-target key results add 0 to the sum but still count in the divisor.
/// An empty list is 0.
pub fn goal_progress(key_results: &[KeyResult]) -> u8 {
    if key_results.is_empty() {
        return 0;
    }
    let total: f64 = key_results.iter().map(key_result_percent).sum();
    let mean = total / key_results.len() as f64;
    // mean is within 0..=100, so half-up and half-away-from-zero agree
    mean.round().clamp(0.0, 100.0) as u8
}
