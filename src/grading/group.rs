use crate::models::{AssignmentGroup, Task};

use super::percentage;

/// Average percentage of a regular group, or the summed bonus of an extra-credit group.
///
/// Regular groups average the percentage of every scored, non opted-out task and are
/// `None` until one exists. Extra-credit groups add up `earned_score` of completed tasks
/// (those values are already percentage points) and are `Some(0.0)` when empty.
pub fn group_average(group: &AssignmentGroup, tasks: &[Task]) -> Option<f64> {
    let members = tasks
        .iter()
        .filter(|t| t.group_id.as_deref() == Some(group.id.as_str()) && !t.deleted);

    if group.is_extra_credit {
        let bonus = members
            .filter(|t| t.completed)
            .filter_map(|t| t.earned_score)
            .sum();
        return Some(bonus);
    }

    let scores: Vec<f64> = members
        .filter(|t| !t.opt_out)
        .filter_map(|t| percentage(t.earned_score, t.total_score))
        .collect();

    if scores.is_empty() {
        None
    } else {
        Some(scores.iter().sum::<f64>() / scores.len() as f64)
    }
}
