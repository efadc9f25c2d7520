//! Teacher memory and cursor.
//!
//! The cursor `(current_milestone_index, current_course_index)` always names
//! an existing course once a valid path is loaded. Completing the final course
//! leaves it in place; the path counts as finished when every course id is in
//! `completed_courses`.

use crate::learning_path::{Course, LearningPath, Milestone};
use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum DifficultyLevel {
    TooEasy,
    JustRight,
    TooHard,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum PreferredStyle {
    Theory,
    Practical,
    Mixed,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserFeedback {
    pub is_boring: bool,
    pub difficulty_level: Option<DifficultyLevel>,
    pub preferred_style: Option<PreferredStyle>,
}

/// A partial feedback change. Absent fields keep their current value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackUpdate {
    #[serde(default)]
    pub is_boring: Option<bool>,
    #[serde(default)]
    pub difficulty_level: Option<DifficultyLevel>,
    #[serde(default)]
    pub preferred_style: Option<PreferredStyle>,
}

impl UserFeedback {
    pub fn apply(&mut self, update: &FeedbackUpdate) {
        if let Some(is_boring) = update.is_boring {
            self.is_boring = is_boring;
        }
        if update.difficulty_level.is_some() {
            self.difficulty_level = update.difficulty_level;
        }
        if update.preferred_style.is_some() {
            self.preferred_style = update.preferred_style;
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeacherMemory {
    pub learning_path: Option<LearningPath>,
    pub current_milestone_index: usize,
    pub current_course_index: usize,
    pub completed_courses: Vec<String>,
    pub completed_milestones: Vec<String>,
    #[serde(default)]
    pub user_feedback: UserFeedback,
    pub session_started: Option<DateTime<Utc>>,
}

/// Snapshot of where the learner stands.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Progress {
    pub current_milestone: Option<Milestone>,
    pub current_course: Option<Course>,
    pub completion_percentage: u32,
    pub total_courses: usize,
    pub completed_count: usize,
    pub finished: bool,
}

fn push_unique(target: &mut Vec<String>, id: &str) {
    if !target.iter().any(|existing| existing == id) {
        target.push(id.to_string());
    }
}

impl TeacherMemory {
    pub fn new(learning_path: Option<LearningPath>) -> Self {
        Self {
            learning_path,
            ..Self::default()
        }
    }

    /// Installs `path` and starts over from its first course.
    pub fn start_path(&mut self, path: LearningPath, now: DateTime<Utc>) {
        self.learning_path = Some(path);
        self.current_milestone_index = 0;
        self.current_course_index = 0;
        self.completed_courses.clear();
        self.completed_milestones.clear();
        self.session_started = Some(now);
    }

    pub fn current_milestone(&self) -> Option<&Milestone> {
        self.learning_path
            .as_ref()?
            .milestone(self.current_milestone_index)
    }

    pub fn current_course(&self) -> Option<&Course> {
        self.learning_path
            .as_ref()?
            .course(self.current_milestone_index, self.current_course_index)
    }

    /// Completes the course under the cursor and advances it.
    ///
    /// Moves to the next course in the milestone, otherwise records the
    /// milestone and moves to the first course of the next milestone that has
    /// any. At the end of the path the cursor stays put. Returns whether the
    /// cursor moved.
    pub fn mark_complete(&mut self) -> bool {
        let Some(path) = self.learning_path.as_ref() else {
            return false;
        };
        let Some(milestone) = path.milestone(self.current_milestone_index) else {
            return false;
        };

        if let Some(course) = milestone.courses.get(self.current_course_index) {
            push_unique(&mut self.completed_courses, &course.id);
        }

        if self.current_course_index + 1 < milestone.courses.len() {
            self.current_course_index += 1;
            return true;
        }

        let next = path
            .milestones
            .iter()
            .enumerate()
            .skip(self.current_milestone_index + 1)
            .find(|(_, m)| !m.courses.is_empty())
            .map(|(i, _)| i);

        let Some(next) = next else {
            debug!(milestone = %milestone.id, "Reached the end of the learning path");
            return false;
        };

        let passed: Vec<String> = path.milestones[self.current_milestone_index..next]
            .iter()
            .map(|m| m.id.clone())
            .collect();
        for id in &passed {
            push_unique(&mut self.completed_milestones, id);
        }
        self.current_milestone_index = next;
        self.current_course_index = 0;
        true
    }

    /// Whether every course in the path has been completed.
    pub fn is_path_complete(&self) -> bool {
        match &self.learning_path {
            Some(path) if path.total_courses() > 0 => path
                .course_ids()
                .all(|id| self.completed_courses.iter().any(|c| c == id)),
            _ => false,
        }
    }

    pub fn progress(&self) -> Progress {
        let Some(path) = &self.learning_path else {
            return Progress {
                current_milestone: None,
                current_course: None,
                completion_percentage: 0,
                total_courses: 0,
                completed_count: 0,
                finished: false,
            };
        };

        let total_courses = path.total_courses();
        let completed_count = self.completed_courses.len();
        let completion_percentage = if total_courses > 0 {
            (completed_count as f64 / total_courses as f64 * 100.0).round() as u32
        } else {
            0
        };

        Progress {
            current_milestone: self.current_milestone().cloned(),
            current_course: self.current_course().cloned(),
            completion_percentage,
            total_courses,
            completed_count,
            finished: self.is_path_complete(),
        }
    }
}
