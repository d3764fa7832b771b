//! Confidence scoring for forecasts

/// Returned when there is no historical basis to measure deviation against
pub const NEUTRAL_CONFIDENCE: f64 = 0.5;

/// Lowest confidence the model-backed tier can report
pub const CONFIDENCE_FLOOR: f64 = 0.5;

/// Confidence of a model prediction relative to the category's history
///
/// `1 - 0.5 * |predicted - average| / average`, floored at [`CONFIDENCE_FLOOR`].
/// The floor means a wildly divergent prediction never scores below the best
/// heuristic guess. That may be an artifact of the formula rather than intent;
/// it is kept so scores stay comparable with previously reported numbers.
pub fn confidence_from_deviation(predicted: f64, historical_average: f64) -> f64 {
    // Negated comparison also catches NaN
    if !(historical_average > 0.0) {
        return NEUTRAL_CONFIDENCE;
    }

    let deviation = (predicted - historical_average).abs() / historical_average;
    let confidence = 1.0 - deviation * 0.5;

    // NaN.max(x) == x, so a NaN prediction lands on the floor
    confidence.max(CONFIDENCE_FLOOR).min(1.0)
}

/// Fixed confidence for the short-history heuristic tier
pub fn heuristic_confidence(months_of_data: usize) -> f64 {
    match months_of_data {
        1 => 0.3,
        2 => 0.5,
        _ => 0.6,
    }
}
