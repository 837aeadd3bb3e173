//! Median of a sample buffer.

/// Median of `values`, reordering the buffer in place.
///
/// Even-length buffers average the two middle samples. An empty buffer
/// has no median and yields `NaN`.
pub fn median_in_place(values: &mut [f32]) -> f32 {
    let n = values.len();
    if n == 0 {
        return f32::NAN;
    }

    let mid = n / 2;
    let (lower, upper, _) = values.select_nth_unstable_by(mid, f32::total_cmp);
    let upper = *upper;
    if n % 2 == 1 {
        return upper;
    }

    let lower = lower.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    (lower + upper) / 2.0
}
