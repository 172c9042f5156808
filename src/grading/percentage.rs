/// `earned / total * 100`, or `None` unless both scores exist and `total > 0`.
pub fn percentage(earned: Option<f64>, total: Option<f64>) -> Option<f64> {
    match (earned, total) {
        (Some(earned), Some(total)) if total > 0.0 => Some(earned / total * 100.0),
        _ => None,
    }
}
