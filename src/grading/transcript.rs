use serde::Serialize;

use crate::models::{AssignmentGroup, Course, Semester, Task};

use super::{course_percentage, group_average, letter_grade, weighted_gpa};

pub const UNASSIGNED_SEMESTER_NAME: &str = "Other Courses";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupGrade {
    pub group_id: String,
    pub name: String,
    pub weight: f64,
    pub is_extra_credit: bool,
    pub average: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CourseGrade {
    pub course_id: String,
    pub percentage: Option<f64>,
    pub letter_grade: Option<String>,
    pub groups: Vec<GroupGrade>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CourseSummary {
    pub course_id: String,
    pub name: String,
    pub credits: f64,
    pub percentage: Option<f64>,
    pub letter_grade: Option<String>,
    pub gpa: Option<f64>,
    pub quality_points: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SemesterSummary {
    pub semester_id: Option<String>,
    pub name: String,
    pub courses: Vec<CourseSummary>,
    pub total_credits: f64,
    pub gpa: Option<f64>,
    pub quality_points: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TranscriptTotals {
    pub total_credits: f64,
    pub gpa: Option<f64>,
    pub quality_points: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Transcript {
    pub semesters: Vec<SemesterSummary>,
    pub unassigned: Option<SemesterSummary>,
    pub overall: TranscriptTotals,
}

/// Percentage, letter grade and per-group breakdown for one course.
pub fn course_grade(course: &Course, tasks: &[Task], groups: &[AssignmentGroup]) -> CourseGrade {
    let percentage = course_percentage(&course.id, tasks, groups);
    let letter_grade = percentage.and_then(|p| letter_grade(p, course.grade_scale.as_ref()));

    let groups = groups
        .iter()
        .filter(|g| g.course_id == course.id)
        .map(|g| GroupGrade {
            group_id: g.id.clone(),
            name: g.name.clone(),
            weight: g.weight,
            is_extra_credit: g.is_extra_credit,
            average: group_average(g, tasks),
        })
        .collect();

    CourseGrade {
        course_id: course.id.clone(),
        percentage,
        letter_grade,
        groups,
    }
}

pub fn course_summary(course: &Course, tasks: &[Task], groups: &[AssignmentGroup]) -> CourseSummary {
    let credits = course.effective_credits();
    let percentage = course_percentage(&course.id, tasks, groups);
    let letter_grade = percentage.and_then(|p| letter_grade(p, course.grade_scale.as_ref()));
    let gpa = weighted_gpa(&[(letter_grade.as_deref(), credits)]);

    CourseSummary {
        course_id: course.id.clone(),
        name: course.name.clone(),
        credits,
        percentage,
        letter_grade,
        gpa,
        quality_points: gpa.map(|g| g * credits),
    }
}

fn summarize(semester_id: Option<String>, name: String, courses: Vec<CourseSummary>) -> SemesterSummary {
    let entries: Vec<(Option<&str>, f64)> = courses
        .iter()
        .map(|c| (c.letter_grade.as_deref(), c.credits))
        .collect();

    SemesterSummary {
        total_credits: courses.iter().map(|c| c.credits).sum(),
        gpa: weighted_gpa(&entries),
        quality_points: courses.iter().filter_map(|c| c.quality_points).sum(),
        semester_id,
        name,
        courses,
    }
}

/// Rolls every active course up into per-semester and overall GPA.
///
/// Courses whose semester is missing or unknown land in `unassigned`. The overall
/// block only counts courses that have a letter grade.
pub fn build_transcript(
    semesters: &[Semester],
    courses: &[Course],
    tasks: &[Task],
    groups: &[AssignmentGroup],
) -> Transcript {
    let summaries: Vec<(Option<&str>, CourseSummary)> = courses
        .iter()
        .filter(|c| !c.deleted)
        .map(|c| (c.semester_id.as_deref(), course_summary(c, tasks, groups)))
        .collect();

    let semester_rows = semesters
        .iter()
        .map(|s| {
            let courses = summaries
                .iter()
                .filter(|(sid, _)| *sid == Some(s.id.as_str()))
                .map(|(_, c)| c.clone())
                .collect();
            summarize(Some(s.id.clone()), s.name.clone(), courses)
        })
        .collect();

    let unassigned_courses: Vec<CourseSummary> = summaries
        .iter()
        .filter(|(sid, _)| match sid {
            None => true,
            Some(id) => !semesters.iter().any(|s| s.id == *id),
        })
        .map(|(_, c)| c.clone())
        .collect();
    let unassigned = if unassigned_courses.is_empty() {
        None
    } else {
        Some(summarize(None, UNASSIGNED_SEMESTER_NAME.to_string(), unassigned_courses))
    };

    let graded: Vec<&CourseSummary> = summaries
        .iter()
        .map(|(_, c)| c)
        .filter(|c| c.letter_grade.is_some())
        .collect();
    let entries: Vec<(Option<&str>, f64)> = graded
        .iter()
        .map(|c| (c.letter_grade.as_deref(), c.credits))
        .collect();

    Transcript {
        semesters: semester_rows,
        unassigned,
        overall: TranscriptTotals {
            total_credits: graded.iter().map(|c| c.credits).sum(),
            gpa: weighted_gpa(&entries),
            quality_points: graded.iter().filter_map(|c| c.quality_points).sum(),
        },
    }
}
