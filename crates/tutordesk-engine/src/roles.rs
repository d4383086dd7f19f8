// SPDX-FileCopyrightText: 2026 TutorDesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Role classification from platform user tags.
//!
//! Students carry a `<Course>_<digits>` tag (for example `HardDE_12`), staff
//! carry one of the configured literal expert or curator tags. When several
//! kinds of tag are present, staff tags win: Curator > Expert > Student.

use regex::Regex;
use tutordesk_config::model::RolesConfig;
use tutordesk_core::TutorDeskError;

/// Role of the user behind an inbound event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserRole {
    /// A student enrolled in the named course.
    Student(String),
    Expert,
    Curator,
    Unknown,
}

impl UserRole {
    /// Whether replies and reactions from this user resolve pending questions.
    pub fn can_resolve(&self) -> bool {
        matches!(self, Self::Expert | Self::Curator)
    }

    /// Course of a student, `None` for every other role.
    pub fn course(&self) -> Option<&str> {
        match self {
            Self::Student(course) => Some(course),
            _ => None,
        }
    }
}

/// Pure tag classifier built once from configuration.
#[derive(Debug, Clone)]
pub struct RoleClassifier {
    /// One `^<course>_\d+$` pattern per configured course, in config order.
    courses: Vec<(String, Regex)>,
    expert_tags: Vec<String>,
    curator_tags: Vec<String>,
}

impl RoleClassifier {
    pub fn new(config: &RolesConfig) -> Result<Self, TutorDeskError> {
        let courses = config
            .courses
            .iter()
            .map(|course| {
                let pattern = format!(r"^{}_\d+$", regex::escape(course));
                Regex::new(&pattern)
                    .map(|re| (course.clone(), re))
                    .map_err(|e| TutorDeskError::Config(format!("course `{course}`: {e}")))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            courses,
            expert_tags: config.expert_tags.clone(),
            curator_tags: config.curator_tags.clone(),
        })
    }

    /// Course of the first tag matching a student pattern.
    pub fn student_course(&self, tags: &[String]) -> Option<&str> {
        tags.iter().find_map(|tag| {
            self.courses
                .iter()
                .find(|(_, re)| re.is_match(tag))
                .map(|(course, _)| course.as_str())
        })
    }

    pub fn is_student(&self, tags: &[String]) -> bool {
        self.student_course(tags).is_some()
    }

    /// True if any tag is an expert or curator tag.
    pub fn is_expert(&self, tags: &[String]) -> bool {
        tags.iter()
            .any(|t| self.expert_tags.contains(t) || self.curator_tags.contains(t))
    }

    pub fn classify(&self, tags: &[String]) -> UserRole {
        if tags.iter().any(|t| self.curator_tags.contains(t)) {
            UserRole::Curator
        } else if tags.iter().any(|t| self.expert_tags.contains(t)) {
            UserRole::Expert
        } else if let Some(course) = self.student_course(tags) {
            UserRole::Student(course.to_string())
        } else {
            UserRole::Unknown
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classifier() -> RoleClassifier {
        RoleClassifier::new(&RolesConfig::default()).unwrap()
    }

    fn tags(list: &[&str]) -> Vec<String> {
        list.iter().map(|t| t.to_string()).collect()
    }

    #[test]
    fn student_tags_need_course_and_digits() {
        let c = classifier();
        assert_eq!(
            c.classify(&tags(&["HardDE_12"])),
            UserRole::Student("HardDE".into())
        );
        assert_eq!(
            c.classify(&tags(&["other", "StartDE_3"])),
            UserRole::Student("StartDE".into())
        );
        assert_eq!(c.classify(&tags(&["HardDE_"])), UserRole::Unknown);
        assert_eq!(c.classify(&tags(&["HardDE_1a"])), UserRole::Unknown);
        assert_eq!(c.classify(&tags(&["xHardDE_1"])), UserRole::Unknown);
        assert_eq!(c.classify(&tags(&["SoftDE_1"])), UserRole::Unknown);
    }

    #[test]
    fn staff_tags_take_precedence() {
        let c = classifier();
        assert_eq!(c.classify(&tags(&["HardDE_1", "expert"])), UserRole::Expert);
        assert_eq!(
            c.classify(&tags(&["expert", "curator", "HardDE_1"])),
            UserRole::Curator
        );
        assert!(c.is_student(&tags(&["HardDE_1", "expert"])));
        assert!(c.is_expert(&tags(&["curator"])));
    }

    #[test]
    fn only_staff_can_resolve() {
        assert!(UserRole::Expert.can_resolve());
        assert!(UserRole::Curator.can_resolve());
        assert!(!UserRole::Student("HardDE".into()).can_resolve());
        assert!(!UserRole::Unknown.can_resolve());
    }

    #[test]
    fn course_names_are_matched_literally() {
        let config = RolesConfig {
            courses: vec!["C++".into()],
            ..RolesConfig::default()
        };
        let c = RoleClassifier::new(&config).unwrap();
        assert_eq!(c.classify(&tags(&["C++_4"])), UserRole::Student("C++".into()));
        assert_eq!(c.classify(&tags(&["CC_4"])), UserRole::Unknown);
    }

    #[test]
    fn empty_tags_are_unknown() {
        assert_eq!(classifier().classify(&[]), UserRole::Unknown);
    }
}
