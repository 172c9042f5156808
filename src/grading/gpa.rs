/// Quality points for a letter grade on the 4.0 scale. Unknown labels are worth 0.
pub fn grade_points(label: &str) -> f64 {
    match label {
        "A" => 4.0,
        "A-" => 3.667,
        "B+" => 3.333,
        "B" => 3.0,
        "B-" => 2.667,
        "C+" => 2.333,
        "C" => 2.0,
        "C-" => 1.667,
        "D+" => 1.333,
        "D" => 1.0,
        "D-" => 0.667,
        "F" => 0.0,
        _ => 0.0,
    }
}

/// Credit-weighted GPA over `(letter grade, credits)` pairs.
///
/// Pairs without a grade are left out of both sums. `None` when no credits remain.
/// A single pair gives the per-course GPA equivalent.
pub fn weighted_gpa(entries: &[(Option<&str>, f64)]) -> Option<f64> {
    let (points, credits) = entries
        .iter()
        .filter_map(|(grade, credits)| grade.map(|g| (grade_points(g) * credits, *credits)))
        .fold((0.0, 0.0), |(p, c), (gp, gc)| (p + gp, c + gc));

    if credits == 0.0 {
        None
    } else {
        Some(points / credits)
    }
}
