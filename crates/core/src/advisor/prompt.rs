//! Advisor prompt assembly.
//!
//! The system prompt is a pure function of the base instructions and the
//! current memory, rebuilt before every model call.

use crate::advisor::memory::AdvisorMemory;
use crate::transcript::ChatMessage;

pub const ADVISOR_BASE_PROMPT: &str = "You are an expert AI learning advisor that helps users build personalized learning paths.

Your conversation goal:
1. Understand what they want to achieve (objective)
2. Assess their current knowledge and experience
3. Understand constraints (time, budget, learning style)
4. Create a practical, actionable learning path

Guidelines:
- Be conversational and natural - don't follow a rigid script
- Ask follow-up questions when you need clarity for what they are missing to achieve their goal
- If they provide rich information upfront, don't ask redundant questions
- Move to creating the learning path when you have enough context
- The learning path should have 3-6 milestones with specific projects and resources
- Keep the questions to a minimum and only ask for missing information that is essential to creating the minimum learning path";

pub const ADVISOR_WELCOME_MESSAGE: &str = "Hi! I'm here to help you create a personalized learning path. To get started, could you tell me a bit about yourself and what you're looking to learn?";

/// The single directive telling the model what to do next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NextFocus {
    /// Objective and/or experience are still unknown.
    Gather(Vec<&'static str>),
    /// Core profile known, no time or deadline yet.
    AskConstraints,
    /// Enough is known to produce the learning path.
    ReadyToCreate,
    /// The path already exists.
    PathCreated,
}

impl NextFocus {
    pub fn for_memory(memory: &AdvisorMemory) -> Self {
        if memory.learning_path_created {
            return NextFocus::PathCreated;
        }
        let mut missing = Vec::new();
        if memory.objective.is_none() {
            missing.push("learning objective");
        }
        if memory.relevant_experience.is_none() {
            missing.push("experience level");
        }
        if !missing.is_empty() {
            NextFocus::Gather(missing)
        } else if memory.constraints.is_empty() {
            NextFocus::AskConstraints
        } else {
            NextFocus::ReadyToCreate
        }
    }

    pub fn directive(&self) -> String {
        match self {
            NextFocus::Gather(missing) => format!("Focus on understanding: {}", missing.join(", ")),
            NextFocus::AskConstraints => "Consider asking about time availability or constraints".to_string(),
            NextFocus::ReadyToCreate => "Ready to create learning path!".to_string(),
            NextFocus::PathCreated => "✓ Learning path has been created".to_string(),
        }
    }
}

/// Renders what is known, what is missing, and the next focus as bullet text.
pub fn context_parts(memory: &AdvisorMemory) -> Vec<String> {
    let mut parts = Vec::new();

    if let Some(context) = &memory.enterprise_context {
        parts.extend(context.lines().map(str::to_string));
    }

    parts.push(match &memory.objective {
        Some(objective) => format!("Objective: {objective}"),
        None => "Still need: Clear learning objective".to_string(),
    });
    parts.push(match &memory.relevant_experience {
        Some(experience) => format!("Experience: {experience}"),
        None => "Still need: Current skill level and experience".to_string(),
    });

    if let Some(background) = &memory.background {
        parts.push(format!("Background: {background}"));
    }
    if let Some(level) = &memory.skill_level {
        parts.push(format!("Skill Level: {level}"));
    }
    if !memory.interests.is_empty() {
        parts.push(format!("Interests: {}", memory.interests.join(", ")));
    }
    if !memory.relevant_skills.is_empty() {
        parts.push(format!(
            "Skills User Already Has: {}",
            memory.relevant_skills.join(", ")
        ));
    }
    if !memory.required_skills.is_empty() {
        parts.push(format!(
            "Required Skills to Learn: {}",
            memory.required_skills.join(", ")
        ));
        parts.push(
            "IMPORTANT: Focus the learning path on the required skills. Do NOT include skills the user already has."
                .to_string(),
        );
    }

    if !memory.constraints.is_empty() {
        let mut constraints = Vec::new();
        if let Some(time) = &memory.constraints.time_per_week {
            constraints.push(format!("Time: {time}"));
        }
        if let Some(deadline) = &memory.constraints.deadline {
            constraints.push(format!("Deadline: {deadline}"));
        }
        parts.push(format!("Constraints: {}", constraints.join(", ")));
    }

    parts.push(NextFocus::for_memory(memory).directive());
    parts
}

/// `base` followed by the bullet-rendered memory context.
pub fn build_system_prompt(base: &str, memory: &AdvisorMemory) -> String {
    let bullets = context_parts(memory)
        .iter()
        .map(|p| format!("- {p}"))
        .collect::<Vec<_>>()
        .join("\n");
    format!("{base}\n\nCurrent context:\n{bullets}")
}

pub const PATH_GENERATION_INSTRUCTIONS: &str = "You turn a learner profile into a structured learning path.
Produce 3-6 milestones in order. Each milestone has 1-4 concrete courses from real providers with working URLs.
Focus on the required skills and skip what the learner already knows.
Fit the total duration to the learner's time constraints when they are known.";

/// Messages for the structured path generation call.
pub fn path_generation_messages(memory: &AdvisorMemory) -> Vec<ChatMessage> {
    let directive = NextFocus::for_memory(memory).directive();
    let profile = context_parts(memory)
        .into_iter()
        .filter(|p| !p.starts_with("Still need") && *p != directive)
        .map(|p| format!("- {p}"))
        .collect::<Vec<_>>()
        .join("\n");
    vec![
        ChatMessage::system(PATH_GENERATION_INSTRUCTIONS),
        ChatMessage::user(format!("Learner profile:\n{profile}\n\nCreate the learning path now.")),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::advisor::memory::Constraints;

    #[test]
    fn test_fresh_memory_asks_for_both_core_facts() {
        let memory = AdvisorMemory::new();
        assert_eq!(
            NextFocus::for_memory(&memory),
            NextFocus::Gather(vec!["learning objective", "experience level"])
        );
        let prompt = build_system_prompt(ADVISOR_BASE_PROMPT, &memory);
        assert!(prompt.starts_with(ADVISOR_BASE_PROMPT));
        assert!(prompt.contains("- Still need: Clear learning objective"));
        assert!(prompt.ends_with("- Focus on understanding: learning objective, experience level"));
    }

    #[test]
    fn test_objective_only_asks_for_experience() {
        let memory = AdvisorMemory {
            objective: Some("learn backend development".into()),
            ..Default::default()
        };
        let prompt = build_system_prompt("base", &memory);
        assert!(prompt.contains("- Objective: learn backend development"));
        assert!(prompt.ends_with("- Focus on understanding: experience level"));
    }

    #[test]
    fn test_core_profile_without_constraints_suggests_asking() {
        let memory = AdvisorMemory {
            objective: Some("x".into()),
            relevant_experience: Some("y".into()),
            ..Default::default()
        };
        assert_eq!(NextFocus::for_memory(&memory), NextFocus::AskConstraints);
    }

    #[test]
    fn test_ready_and_created_directives() {
        let mut memory = AdvisorMemory {
            objective: Some("x".into()),
            relevant_experience: Some("y".into()),
            constraints: Constraints {
                time_per_week: None,
                deadline: Some("March".into()),
            },
            ..Default::default()
        };
        assert_eq!(NextFocus::for_memory(&memory), NextFocus::ReadyToCreate);
        let prompt = build_system_prompt("base", &memory);
        assert!(prompt.contains("- Constraints: Deadline: March"));

        memory.learning_path_created = true;
        assert_eq!(NextFocus::for_memory(&memory), NextFocus::PathCreated);
    }

    #[test]
    fn test_skill_sections_render_in_order() {
        let memory = AdvisorMemory {
            relevant_skills: vec!["Python".into()],
            required_skills: vec!["ML".into(), "Statistics".into()],
            interests: vec!["robotics".into()],
            ..Default::default()
        };
        let parts = context_parts(&memory);
        let interests = parts.iter().position(|p| p == "Interests: robotics").unwrap();
        let known = parts
            .iter()
            .position(|p| p == "Skills User Already Has: Python")
            .unwrap();
        let needed = parts
            .iter()
            .position(|p| p == "Required Skills to Learn: ML, Statistics")
            .unwrap();
        assert!(interests < known && known < needed);
        assert!(parts[needed + 1].starts_with("IMPORTANT"));
    }

    #[test]
    fn test_prompt_is_deterministic() {
        let memory = AdvisorMemory {
            objective: Some("x".into()),
            ..Default::default()
        };
        assert_eq!(
            build_system_prompt("b", &memory),
            build_system_prompt("b", &memory)
        );
    }

    #[test]
    fn test_generation_messages_carry_known_profile_only() {
        let memory = AdvisorMemory {
            objective: Some("learn ML".into()),
            required_skills: vec!["PyTorch".into()],
            ..Default::default()
        };
        let messages = path_generation_messages(&memory);
        assert_eq!(messages.len(), 2);
        let body = &messages[1].content;
        assert!(body.contains("- Objective: learn ML"));
        assert!(body.contains("Required Skills to Learn: PyTorch"));
        assert!(!body.contains("Still need"));
        assert!(!body.contains("Focus on understanding"));
    }
}
