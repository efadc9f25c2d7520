//! Learning path structures.
//!
//! A path owns an ordered list of milestones and each milestone owns an
//! ordered list of courses. Nothing is shared between branches of the tree.
//! Serialized field names follow the camelCase layout used by the stored data
//! and the structured-generation schema.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CourseType {
    Video,
    Article,
    Course,
    Documentation,
    Practice,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    pub id: String,
    pub title: String,
    pub provider: String,
    pub url: String,
    pub duration: String,
    #[serde(rename = "type")]
    pub course_type: CourseType,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Milestone {
    pub id: String,
    pub title: String,
    pub description: String,
    pub estimated_weeks: u32,
    pub courses: Vec<Course>,
    #[serde(default)]
    pub outcomes: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub projects: Option<Vec<String>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CreatedBy {
    Advisor,
    Curated,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LearningPath {
    pub id: String,
    pub title: String,
    pub description: String,
    pub objective: String,
    pub difficulty: String,
    pub total_duration: String,
    #[serde(default)]
    pub prerequisites: Vec<String>,
    pub milestones: Vec<Milestone>,
    pub created_by: CreatedBy,
    pub created_at: DateTime<Utc>,
}

impl LearningPath {
    pub fn total_courses(&self) -> usize {
        self.milestones.iter().map(|m| m.courses.len()).sum()
    }

    pub fn milestone(&self, index: usize) -> Option<&Milestone> {
        self.milestones.get(index)
    }

    pub fn course(&self, milestone_index: usize, course_index: usize) -> Option<&Course> {
        self.milestones
            .get(milestone_index)
            .and_then(|m| m.courses.get(course_index))
    }

    /// Every course id in path order.
    pub fn course_ids(&self) -> impl Iterator<Item = &str> {
        self.milestones
            .iter()
            .flat_map(|m| m.courses.iter().map(|c| c.id.as_str()))
    }

    /// Overwrites every id in the tree with ids derived from `path_id`:
    /// `{path_id}_m{i}` for milestones and `{path_id}_m{i}_c{j}` for courses.
    pub fn assign_ids(&mut self, path_id: &str) {
        self.id = path_id.to_string();
        for (i, milestone) in self.milestones.iter_mut().enumerate() {
            milestone.id = format!("{path_id}_m{i}");
            for (j, course) in milestone.courses.iter_mut().enumerate() {
                course.id = format!("{path_id}_m{i}_c{j}");
            }
        }
    }

    /// Checks the tree-shape invariants the teacher cursor relies on.
    pub fn validate(&self) -> Result<(), String> {
        if self.milestones.is_empty() {
            return Err("a learning path needs at least one milestone".into());
        }
        if self.milestones[0].courses.is_empty() {
            return Err(format!(
                "the first milestone '{}' has no courses",
                self.milestones[0].title
            ));
        }
        let mut seen = HashSet::new();
        for milestone in &self.milestones {
            if !seen.insert(milestone.id.as_str()) {
                return Err(format!("duplicate id '{}'", milestone.id));
            }
            for course in &milestone.courses {
                if !seen.insert(course.id.as_str()) {
                    return Err(format!("duplicate id '{}'", course.id));
                }
            }
        }
        Ok(())
    }
}

// --- Generated drafts ---

/// A course as returned by the generation call, before ids are assigned.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseDraft {
    pub title: String,
    pub provider: String,
    pub url: String,
    pub duration: String,
    #[serde(rename = "type")]
    pub course_type: CourseType,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MilestoneDraft {
    pub title: String,
    pub description: String,
    pub estimated_weeks: u32,
    pub courses: Vec<CourseDraft>,
    #[serde(default)]
    pub outcomes: Vec<String>,
    #[serde(default)]
    pub projects: Option<Vec<String>>,
}

/// The body of a `learning_path` structured reply.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LearningPathDraft {
    pub title: String,
    pub description: String,
    pub objective: String,
    pub difficulty: String,
    pub total_duration: String,
    #[serde(default)]
    pub prerequisites: Vec<String>,
    pub milestones: Vec<MilestoneDraft>,
}

impl LearningPathDraft {
    /// Builds the full tree with ids derived from `path_id`.
    pub fn into_path(self, path_id: &str, created_by: CreatedBy, created_at: DateTime<Utc>) -> LearningPath {
        let milestones = self
            .milestones
            .into_iter()
            .map(|m| Milestone {
                id: String::new(),
                title: m.title,
                description: m.description,
                estimated_weeks: m.estimated_weeks,
                courses: m
                    .courses
                    .into_iter()
                    .map(|c| Course {
                        id: String::new(),
                        title: c.title,
                        provider: c.provider,
                        url: c.url,
                        duration: c.duration,
                        course_type: c.course_type,
                        description: c.description,
                    })
                    .collect(),
                outcomes: m.outcomes,
                projects: m.projects,
            })
            .collect();

        let mut path = LearningPath {
            id: String::new(),
            title: self.title,
            description: self.description,
            objective: self.objective,
            difficulty: self.difficulty,
            total_duration: self.total_duration,
            prerequisites: self.prerequisites,
            milestones,
            created_by,
            created_at,
        };
        path.assign_ids(path_id);
        path
    }
}

/// Strict schema for the `learning_path` structured reply.
pub fn learning_path_schema() -> Value {
    let strings = json!({ "type": "array", "items": { "type": "string" } });
    let course = json!({
        "type": "object",
        "additionalProperties": false,
        "properties": {
            "title": { "type": "string" },
            "provider": { "type": "string" },
            "url": { "type": "string" },
            "duration": { "type": "string" },
            "type": {
                "type": "string",
                "enum": ["video", "article", "course", "documentation", "practice"]
            },
            "description": { "type": "string" }
        },
        "required": ["title", "provider", "url", "duration", "type", "description"]
    });
    let milestone = json!({
        "type": "object",
        "additionalProperties": false,
        "properties": {
            "title": { "type": "string" },
            "description": { "type": "string" },
            "estimatedWeeks": { "type": "integer" },
            "courses": { "type": "array", "items": course },
            "outcomes": strings,
            "projects": { "type": ["array", "null"], "items": { "type": "string" } }
        },
        "required": ["title", "description", "estimatedWeeks", "courses", "outcomes", "projects"]
    });
    json!({
        "type": "object",
        "additionalProperties": false,
        "properties": {
            "title": { "type": "string" },
            "description": { "type": "string" },
            "objective": { "type": "string" },
            "difficulty": { "type": "string" },
            "totalDuration": { "type": "string" },
            "prerequisites": strings,
            "milestones": { "type": "array", "items": milestone }
        },
        "required": [
            "title",
            "description",
            "objective",
            "difficulty",
            "totalDuration",
            "prerequisites",
            "milestones"
        ]
    })
}


#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;

    #[test]
    fn test_total_courses_and_lookup() {
        let path = two_milestone_path();
        assert_eq!(path.total_courses(), 3);
        assert_eq!(path.course(0, 1).unwrap().id, "c1");
        assert!(path.course(1, 1).is_none());
        assert_eq!(path.course_ids().collect::<Vec<_>>(), vec!["c0", "c1", "c2"]);
    }

    #[test]
    fn test_assign_ids_is_tree_derived() {
        let mut path = two_milestone_path();
        path.assign_ids("path_42");
        assert_eq!(path.id, "path_42");
        assert_eq!(path.milestones[1].id, "path_42_m1");
        assert_eq!(path.milestones[0].courses[1].id, "path_42_m0_c1");
        assert!(path.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_duplicates_and_empty() {
        let mut path = two_milestone_path();
        path.milestones[1].courses[0].id = "c0".to_string();
        assert!(path.validate().unwrap_err().contains("duplicate"));

        let mut empty = two_milestone_path();
        empty.milestones.clear();
        assert!(empty.validate().is_err());
    }

    #[test]
    fn test_camel_case_layout() {
        let path = two_milestone_path();
        let json = serde_json::to_value(&path).unwrap();
        assert!(json.get("totalDuration").is_some());
        assert_eq!(json["createdBy"], "curated");
        assert_eq!(json["milestones"][0]["estimatedWeeks"], 2);
        assert_eq!(json["milestones"][0]["courses"][0]["type"], "video");
        assert!(json["milestones"][0].get("projects").is_none());
    }

    #[test]
    fn test_draft_gets_tree_ids() {
        let draft: LearningPathDraft = serde_json::from_value(json!({
            "title": "Rust",
            "description": "Systems programming",
            "objective": "learn Rust",
            "difficulty": "intermediate",
            "totalDuration": "8 weeks",
            "prerequisites": [],
            "milestones": [{
                "title": "Ownership",
                "description": "Borrowing and lifetimes",
                "estimatedWeeks": 2,
                "courses": [{
                    "title": "The Book",
                    "provider": "rust-lang",
                    "url": "https://doc.rust-lang.org/book/",
                    "duration": "10h",
                    "type": "documentation",
                    "description": "Chapters 4 and 10"
                }],
                "outcomes": ["Explain borrowing"],
                "projects": null
            }]
        }))
        .unwrap();

        let path = draft.into_path("path_7_abc", CreatedBy::Advisor, Utc::now());
        assert_eq!(path.milestones[0].id, "path_7_abc_m0");
        assert_eq!(path.milestones[0].courses[0].id, "path_7_abc_m0_c0");
        assert_eq!(path.created_by, CreatedBy::Advisor);
        assert!(path.validate().is_ok());
    }

    #[test]
    fn test_schema_requires_every_property() {
        let schema = learning_path_schema();
        let milestone = &schema["properties"]["milestones"]["items"];
        assert_eq!(
            milestone["required"].as_array().unwrap().len(),
            milestone["properties"].as_object().unwrap().len()
        );
        assert_eq!(schema["additionalProperties"], false);
    }
}
