//! Advisor memory model.
//!
//! Everything the advisor has learned about the user so far. Memory only ever
//! grows during a session: scalar facts keep the first value they receive,
//! list facts are unions in order of first appearance, and the two flags
//! (`learning_path_created`, `scheduled_actions`) are monotonic. The only way
//! back is [`AdvisorMemory::reset`].

use crate::advisor::persona::Persona;
use crate::learning_path::LearningPath;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Constraints {
    pub time_per_week: Option<String>,
    pub deadline: Option<String>,
}

impl Constraints {
    pub fn is_empty(&self) -> bool {
        self.time_per_week.is_none() && self.deadline.is_none()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AdvisorMemory {
    pub objective: Option<String>,
    pub relevant_experience: Option<String>,
    pub background: Option<String>,
    pub skill_level: Option<String>,
    pub relevant_skills: Vec<String>,
    pub required_skills: Vec<String>,
    pub constraints: Constraints,
    pub interests: Vec<String>,
    pub learning_path_created: bool,
    pub scheduled_actions: Vec<String>,
    /// Structured path produced by the generation call, when one was made.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub learning_path: Option<LearningPath>,
    /// Role/focus block seeded by a persona reset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enterprise_context: Option<String>,
}

/// The fixed-shape object returned by the extraction call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractionData {
    #[serde(default)]
    pub objective: Option<String>,
    #[serde(default)]
    pub relevant_experience: Option<String>,
    #[serde(default)]
    pub background: Option<String>,
    #[serde(default)]
    pub skill_level: Option<String>,
    #[serde(default)]
    pub relevant_skills: Vec<String>,
    #[serde(default)]
    pub required_skills: Vec<String>,
    #[serde(default)]
    pub interests: Vec<String>,
    #[serde(default)]
    pub constraints: Constraints,
    #[serde(default)]
    pub learning_path_detected: bool,
}

/// Sets `slot` from `incoming` only when the slot is empty and the incoming
/// value carries information.
fn fill_once(slot: &mut Option<String>, incoming: &Option<String>) -> bool {
    match (slot.as_ref(), incoming.as_deref().map(str::trim)) {
        (None, Some(value)) if !value.is_empty() => {
            *slot = Some(value.to_string());
            true
        }
        _ => false,
    }
}

/// Appends each non-blank item not already present. Items are trimmed before
/// the exact-match comparison.
fn union_into(target: &mut Vec<String>, incoming: &[String]) -> bool {
    let mut changed = false;
    for item in incoming.iter().map(|item| item.trim()) {
        if item.is_empty() || target.iter().any(|existing| existing == item) {
            continue;
        }
        target.push(item.to_string());
        changed = true;
    }
    changed
}

impl AdvisorMemory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Folds one extraction result into memory. Returns whether anything changed.
    ///
    /// Empty strings and empty arrays count as "no information". Applying the
    /// same extraction twice is a no-op the second time.
    pub fn merge_extraction(&mut self, data: &ExtractionData) -> bool {
        let mut changed = false;
        changed |= fill_once(&mut self.objective, &data.objective);
        changed |= fill_once(&mut self.relevant_experience, &data.relevant_experience);
        changed |= fill_once(&mut self.background, &data.background);
        changed |= fill_once(&mut self.skill_level, &data.skill_level);

        changed |= union_into(&mut self.relevant_skills, &data.relevant_skills);
        changed |= union_into(&mut self.required_skills, &data.required_skills);
        changed |= union_into(&mut self.interests, &data.interests);

        changed |= fill_once(&mut self.constraints.time_per_week, &data.constraints.time_per_week);
        changed |= fill_once(&mut self.constraints.deadline, &data.constraints.deadline);

        if data.learning_path_detected && !self.learning_path_created {
            self.learning_path_created = true;
            changed = true;
        }
        changed
    }

    /// Records a structured learning path and flips the created flag.
    pub fn record_learning_path(&mut self, path: LearningPath) {
        self.learning_path = Some(path);
        self.learning_path_created = true;
    }

    pub fn has_scheduled(&self, tag: &str) -> bool {
        self.scheduled_actions.iter().any(|t| t == tag)
    }

    pub fn mark_scheduled(&mut self, tag: &str) {
        if !self.has_scheduled(tag) {
            self.scheduled_actions.push(tag.to_string());
        }
    }

    /// Swaps the user context for `persona`.
    ///
    /// Every learned field is cleared, including `learning_path_created` and
    /// `scheduled_actions`, so one-shot actions can fire again for the new
    /// persona. The objective and known skills are then seeded from the
    /// profile.
    pub fn reset(&mut self, persona: &Persona) {
        *self = Self {
            objective: persona.objective.clone().filter(|o| !o.trim().is_empty()),
            relevant_skills: persona.skills.clone(),
            enterprise_context: Some(persona.signal()),
            ..Self::default()
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::advisor::persona::PersonaDirectory;

    fn extraction() -> ExtractionData {
        ExtractionData {
            objective: Some("learn ML".into()),
            relevant_experience: None,
            background: Some("".into()),
            skill_level: None,
            relevant_skills: vec!["Python".into(), "".into()],
            required_skills: vec!["ML".into()],
            interests: vec![],
            constraints: Constraints {
                time_per_week: Some("5 hours".into()),
                deadline: None,
            },
            learning_path_detected: false,
        }
    }

    #[test]
    fn test_init_is_empty() {
        let memory = AdvisorMemory::new();
        assert!(memory.objective.is_none());
        assert!(memory.relevant_skills.is_empty());
        assert!(memory.constraints.is_empty());
        assert!(!memory.learning_path_created);
        assert!(memory.scheduled_actions.is_empty());
    }

    #[test]
    fn test_merge_is_idempotent() {
        let mut memory = AdvisorMemory::new();
        assert!(memory.merge_extraction(&extraction()));
        let snapshot = memory.clone();

        assert!(!memory.merge_extraction(&extraction()));
        assert_eq!(memory, snapshot);
        assert_eq!(memory.relevant_skills, vec!["Python".to_string()]);
        assert_eq!(memory.required_skills, vec!["ML".to_string()]);
    }

    #[test]
    fn test_scalar_first_write_wins() {
        let mut memory = AdvisorMemory::new();
        memory.merge_extraction(&extraction());

        let later = ExtractionData {
            objective: Some("learn web development".into()),
            constraints: Constraints {
                time_per_week: Some("20 hours".into()),
                deadline: Some("June".into()),
            },
            ..Default::default()
        };
        memory.merge_extraction(&later);

        assert_eq!(memory.objective.as_deref(), Some("learn ML"));
        assert_eq!(memory.constraints.time_per_week.as_deref(), Some("5 hours"));
        assert_eq!(memory.constraints.deadline.as_deref(), Some("June"));
    }

    #[test]
    fn test_empty_values_never_fill() {
        let mut memory = AdvisorMemory::new();
        memory.merge_extraction(&extraction());
        assert!(memory.background.is_none());

        let blank = ExtractionData {
            objective: Some("   ".into()),
            ..Default::default()
        };
        let mut fresh = AdvisorMemory::new();
        assert!(!fresh.merge_extraction(&blank));
        assert!(fresh.objective.is_none());
    }

    #[test]
    fn test_array_union_keeps_first_appearance_order() {
        let mut memory = AdvisorMemory::new();
        memory.merge_extraction(&ExtractionData {
            interests: vec!["games".into(), "music".into()],
            ..Default::default()
        });
        memory.merge_extraction(&ExtractionData {
            interests: vec!["art".into(), "games".into(), "Games".into()],
            ..Default::default()
        });
        assert_eq!(memory.interests, vec!["games", "music", "art", "Games"]);
    }

    #[test]
    fn test_array_items_are_trimmed_and_blanks_dropped() {
        let mut memory = AdvisorMemory::new();
        memory.merge_extraction(&ExtractionData {
            relevant_skills: vec!["Python".into(), " ".into(), "".into()],
            ..Default::default()
        });
        let changed = memory.merge_extraction(&ExtractionData {
            relevant_skills: vec!["Python ".into(), "  SQL".into(), "\t".into()],
            ..Default::default()
        });
        assert!(changed);
        assert_eq!(memory.relevant_skills, vec!["Python", "SQL"]);
        assert!(!memory.merge_extraction(&ExtractionData {
            relevant_skills: vec![" Python".into()],
            ..Default::default()
        }));
    }

    #[test]
    fn test_learning_path_flag_is_monotonic() {
        let mut memory = AdvisorMemory::new();
        memory.merge_extraction(&ExtractionData {
            learning_path_detected: true,
            ..Default::default()
        });
        assert!(memory.learning_path_created);

        memory.merge_extraction(&ExtractionData::default());
        assert!(memory.learning_path_created);
    }

    #[test]
    fn test_mark_scheduled_is_set_semantics() {
        let mut memory = AdvisorMemory::new();
        memory.mark_scheduled("save_learning_path");
        memory.mark_scheduled("save_learning_path");
        assert_eq!(memory.scheduled_actions.len(), 1);
        assert!(memory.has_scheduled("save_learning_path"));
    }

    #[test]
    fn test_reset_clears_and_seeds_from_persona() {
        let directory = PersonaDirectory::builtin();
        let mut memory = AdvisorMemory::new();
        memory.merge_extraction(&extraction());
        memory.relevant_experience = Some("5 years".into());
        memory.learning_path_created = true;
        memory.mark_scheduled("save_learning_path");

        memory.reset(directory.resolve("backend-ai-789"));

        assert!(memory.objective.as_deref().unwrap().starts_with("Specialize in AI Engineering"));
        assert_eq!(memory.relevant_skills, vec!["Node.js", "Go", "Docker", "PostgreSQL"]);
        assert!(memory.required_skills.is_empty());
        assert!(memory.relevant_experience.is_none());
        assert!(memory.constraints.is_empty());
        assert!(!memory.learning_path_created);
        assert!(memory.scheduled_actions.is_empty());
        assert!(memory.enterprise_context.as_deref().unwrap().contains("Backend Engineer"));
    }

    #[test]
    fn test_reset_with_default_persona_leaves_objective_empty() {
        let directory = PersonaDirectory::builtin();
        let mut memory = AdvisorMemory::new();
        memory.objective = Some("old".into());
        memory.reset(directory.resolve("default"));
        assert!(memory.objective.is_none());
    }

    #[test]
    fn test_extraction_tolerates_missing_fields() {
        let data: ExtractionData = serde_json::from_str(r#"{"objective": "x"}"#).unwrap();
        assert_eq!(data.objective.as_deref(), Some("x"));
        assert!(data.relevant_skills.is_empty());
        assert!(!data.learning_path_detected);
    }
}
