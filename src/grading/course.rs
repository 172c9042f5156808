use crate::models::{AssignmentGroup, Task};

use super::group_average;

/// Overall percentage of a course.
///
/// Regular group averages are weighted and re-normalised by the weight that actually
/// has grades, then extra credit is added on top, so the result can exceed 100.
/// `None` when the course has no groups, or when nothing is graded and there is no
/// extra credit.
pub fn course_percentage(course_id: &str, tasks: &[Task], groups: &[AssignmentGroup]) -> Option<f64> {
    let course_groups: Vec<&AssignmentGroup> =
        groups.iter().filter(|g| g.course_id == course_id).collect();

    if course_groups.is_empty() {
        return None;
    }

    let (extra_credit, regular): (Vec<&AssignmentGroup>, Vec<&AssignmentGroup>) =
        course_groups.into_iter().partition(|g| g.is_extra_credit);

    let mut weighted_sum = 0.0;
    let mut total_weight = 0.0;
    for group in regular {
        // non-positive weights never enter the normalisation pool
        if group.weight.is_nan() || group.weight <= 0.0 {
            continue;
        }
        if let Some(average) = group_average(group, tasks) {
            weighted_sum += average * group.weight / 100.0;
            total_weight += group.weight;
        }
    }

    let extra_credit_total: f64 = extra_credit
        .into_iter()
        .filter_map(|g| group_average(g, tasks))
        .sum();

    if total_weight == 0.0 {
        if extra_credit_total == 0.0 {
            None
        } else {
            Some(extra_credit_total)
        }
    } else {
        Some(weighted_sum / total_weight * 100.0 + extra_credit_total)
    }
}
