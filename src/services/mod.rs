pub mod grade_service;
pub mod import_service;
pub mod scheduler;

pub use grade_service::GradeService;
pub use import_service::{ImportService, ImportSettings, ImportStats};
pub use scheduler::ImportScheduler;
