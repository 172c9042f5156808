pub mod course;
pub mod grade_scale;
pub mod group;
pub mod import;
pub mod note;
pub mod semester;
pub mod task;

pub use course::{Course, NewCourseRequest, UpdateCourseRequest, DEFAULT_CREDITS};
pub(crate) use course::CourseRow;
pub use grade_scale::{GradeScale, GradeThreshold};
pub use group::{AssignmentGroup, NewGroupRequest, UpdateGroupRequest};
pub use import::{AcceptImportRequest, ImportCandidate};
pub use note::{NewNoteRequest, Note, UpdateNoteRequest};
pub use semester::{NewSemesterRequest, Semester, UpdateSemesterRequest};
pub use task::{NewTaskRequest, Task, UpdateTaskRequest};
