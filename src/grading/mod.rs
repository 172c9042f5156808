//! Grade aggregation: score percentages, group averages, course percentages,
//! letter grades and credit-weighted GPA.
//!
//! Everything here is a pure function over borrowed snapshots. "Not yet graded"
//! is always `None`, never `0.0`, because zero is a legitimate grade.

pub mod course;
pub mod gpa;
pub mod group;
pub mod letter;
pub mod percentage;
pub mod transcript;

pub use course::course_percentage;
pub use gpa::{grade_points, weighted_gpa};
pub use group::group_average;
pub use letter::letter_grade;
pub use percentage::percentage;
pub use transcript::{
    build_transcript, course_grade, course_summary, CourseGrade, CourseSummary, GroupGrade,
    SemesterSummary, Transcript, TranscriptTotals,
};
