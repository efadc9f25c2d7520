//! Enterprise personas.
//!
//! A persona stands in for a profile fetched from an internal company
//! directory. Applying one swaps the advisor's user context wholesale; see
//! [`crate::advisor::memory::AdvisorMemory::reset`].

use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Persona {
    pub id: String,
    pub role: String,
    pub focus: String,
    pub certifications: Vec<String>,
    pub objective: Option<String>,
    pub skills: Vec<String>,
}

impl Persona {
    /// The enterprise context block rendered into the advisor system prompt.
    pub fn signal(&self) -> String {
        format!(
            "Current Role: {}\nGrowth Focus: {}\nInternal Certifications: {}",
            self.role,
            self.focus,
            self.certifications.join(", ")
        )
    }
}

pub const DEFAULT_PERSONA_ID: &str = "default";

/// The built-in catalogue of company profiles.
#[derive(Debug, Clone)]
pub struct PersonaDirectory {
    personas: Vec<Persona>,
}

impl Default for PersonaDirectory {
    fn default() -> Self {
        Self::builtin()
    }
}

fn persona(
    id: &str,
    role: &str,
    focus: &str,
    certifications: &[&str],
    objective: &str,
    skills: &[&str],
) -> Persona {
    Persona {
        id: id.to_string(),
        role: role.to_string(),
        focus: focus.to_string(),
        certifications: certifications.iter().map(|s| s.to_string()).collect(),
        objective: (!objective.is_empty()).then(|| objective.to_string()),
        skills: skills.iter().map(|s| s.to_string()).collect(),
    }
}

impl PersonaDirectory {
    pub fn builtin() -> Self {
        Self {
            personas: vec![
                persona(
                    "sr-frontend-123",
                    "Senior Frontend Developer",
                    "Transitioning into Technical Leadership and mastering System Design",
                    &[
                        "Cloud Architecture 101",
                        "Security Best Practices",
                        "Team Management Essentials",
                    ],
                    "Step into a Staff Engineer role by mastering distributed systems and leading cross-functional teams.",
                    &["React", "TypeScript", "Next.js", "Performance Optimization"],
                ),
                persona(
                    "jr-ux-456",
                    "Junior UI/UX Designer",
                    "Mastering Design Systems and Interactive Prototyping in Figma",
                    &["Accessibility Standards", "Typography & Layout"],
                    "To become a Lead Product Designer specialized in accessible and inclusive design systems.",
                    &["Figma", "Sketch", "Prototyping", "User Research"],
                ),
                persona(
                    "backend-ai-789",
                    "Backend Engineer",
                    "Integrating LLMs into existing microservices and learning PyTorch",
                    &["Advanced Python", "Kubernetes Certified"],
                    "Specialize in AI Engineering to bridge the gap between traditional backend and machine learning models.",
                    &["Node.js", "Go", "Docker", "PostgreSQL"],
                ),
                persona(
                    "cs-manager-000",
                    "Customer Success Manager",
                    "Learning SQL and Data Visualization to build automated client reports",
                    &["Relationship Management", "Product Analytics"],
                    "Master data analytics to drive proactive customer success strategies and reduce churn.",
                    &["Salesforce", "Intercom", "Customer Journey Mapping"],
                ),
                persona(
                    DEFAULT_PERSONA_ID,
                    "Employee",
                    "General Professional Development",
                    &[],
                    "",
                    &[],
                ),
            ],
        }
    }

    pub fn all(&self) -> &[Persona] {
        &self.personas
    }

    pub fn get(&self, id: &str) -> Option<&Persona> {
        self.personas.iter().find(|p| p.id == id)
    }

    /// Looks up `id`, falling back to the default profile.
    pub fn resolve(&self, id: &str) -> &Persona {
        self.get(id)
            .or_else(|| self.get(DEFAULT_PERSONA_ID))
            .unwrap_or(&self.personas[0])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_falls_back_to_default() {
        let directory = PersonaDirectory::builtin();
        assert_eq!(directory.resolve("backend-ai-789").role, "Backend Engineer");
        let fallback = directory.resolve("nobody");
        assert_eq!(fallback.id, DEFAULT_PERSONA_ID);
        assert!(fallback.objective.is_none());
        assert!(fallback.skills.is_empty());
    }

    #[test]
    fn test_signal_block() {
        let directory = PersonaDirectory::builtin();
        let signal = directory.resolve("jr-ux-456").signal();
        assert!(signal.starts_with("Current Role: Junior UI/UX Designer\n"));
        assert!(signal.ends_with("Internal Certifications: Accessibility Standards, Typography & Layout"));
    }
}
