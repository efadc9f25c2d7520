//! Teacher prompt assembly.

use crate::teacher::memory::{DifficultyLevel, PreferredStyle, TeacherMemory};

/// Instruction block placed before the live context.
pub const TEACHER_BASE_PROMPT: &str = "You are an expert teacher who guides students through a learning path.

Your job: Present lessons and test understanding.

Response Types:
1. \"text\" - For casual communication, answering questions, or encouragement
   - Just provide helpful content to guide the student

2. \"lesson\" - For teaching new concepts (always include ALL fields)
   - title: The lesson name
   - content: Detailed explanation of the concept
   - examples: Array of 2-3 practical code/real-world examples
   - keyTakeaways: Array of 3-5 important points to remember
   - question: A single multiple-choice question to test understanding
     * id: unique identifier
     * question: the test question
     * options: array of 4 answer choices
     * correctAnswer: the correct option text
     * explanation: why this answer is correct";

/// Guidelines placed after the live context.
pub const LESSON_GUIDELINES: &str = "Teaching Guidelines:
- Start with a lesson when user is ready to learn
- Each lesson MUST include a quiz question to test understanding
- Use real-world examples
- Keep explanations clear and concise
- Adapt based on feedback (boring → more examples, too hard → simpler explanations)
- Always be encouraging

Return responses as JSON matching the schema.";

pub const TEACHER_GENERIC_WELCOME: &str = "Hi! I'm your learning teacher. Share your learning path with me, and I'll guide you through it with lessons, examples, and practice questions!";

pub fn welcome_message(memory: &TeacherMemory) -> String {
    match &memory.learning_path {
        Some(path) => {
            let first = path
                .milestones
                .first()
                .map(|m| m.title.as_str())
                .unwrap_or("the first milestone");
            format!(
                "Welcome! I'm your teacher for \"{}\". We'll work through {} milestones together. Ready to start with \"{}\"?",
                path.title,
                path.milestones.len(),
                first
            )
        }
        None => TEACHER_GENERIC_WELCOME.to_string(),
    }
}

pub fn context_parts(memory: &TeacherMemory) -> Vec<String> {
    let Some(path) = &memory.learning_path else {
        return vec!["No learning path loaded yet".to_string()];
    };

    let milestone = memory
        .current_milestone()
        .map(|m| m.title.as_str())
        .unwrap_or("None");
    let course = memory
        .current_course()
        .map(|c| c.title.as_str())
        .unwrap_or("None");

    let mut parts = vec![
        format!("Learning Path: {}", path.title),
        format!(
            "Current Milestone: {milestone} ({}/{})",
            memory.current_milestone_index + 1,
            path.milestones.len()
        ),
        format!("Current Course: {course}"),
        format!(
            "Completed: {} courses, {} milestones",
            memory.completed_courses.len(),
            memory.completed_milestones.len()
        ),
    ];

    let feedback = &memory.user_feedback;
    if feedback.is_boring {
        parts.push("⚠️ User finds content boring - add more practical examples".to_string());
    }
    match feedback.difficulty_level {
        Some(DifficultyLevel::TooHard) => {
            parts.push("⚠️ Content is too difficult - simplify and add foundations".to_string())
        }
        Some(DifficultyLevel::TooEasy) => {
            parts.push("⚠️ Content is too easy - add advanced challenges".to_string())
        }
        _ => {}
    }
    match feedback.preferred_style {
        Some(PreferredStyle::Theory) => {
            parts.push("User prefers theory - lean on concepts and explanations".to_string())
        }
        Some(PreferredStyle::Practical) => {
            parts.push("User prefers practice - lean on hands-on exercises".to_string())
        }
        Some(PreferredStyle::Mixed) => {
            parts.push("User prefers a mix of theory and practice".to_string())
        }
        None => {}
    }
    parts
}

/// `base`, the live context, then `guidelines`.
pub fn build_system_prompt(base: &str, guidelines: &str, memory: &TeacherMemory) -> String {
    let context = context_parts(memory)
        .iter()
        .map(|p| format!("- {p}"))
        .collect::<Vec<_>>()
        .join("\n");
    format!("{base}\n\nCurrent Context:\n{context}\n\n{guidelines}")
}
