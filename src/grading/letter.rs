use crate::models::GradeScale;

/// Maps a percentage onto a course's grade scale.
///
/// The highest threshold not above `percentage` wins. Below every threshold the
/// lowest entry is used as the catch-all. No scale (or an empty one) gives `None`.
pub fn letter_grade(percentage: f64, scale: Option<&GradeScale>) -> Option<String> {
    let sorted = scale?.sorted_desc();
    sorted
        .iter()
        .find(|entry| percentage >= entry.min_percentage)
        .or_else(|| sorted.last())
        .map(|entry| entry.label.clone())
}
