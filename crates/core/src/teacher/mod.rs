//! The teacher: delivers lessons along a loaded learning path and tracks the
//! learner's position in it.

pub mod agent;
pub mod memory;
pub mod prompt;
pub mod tools;

pub use agent::{Lesson, QuizQuestion, TeacherAgent, TeacherPrompts, TeacherResponse};
pub use memory::{DifficultyLevel, FeedbackUpdate, PreferredStyle, Progress, TeacherMemory, UserFeedback};
pub use tools::TeacherToolService;
