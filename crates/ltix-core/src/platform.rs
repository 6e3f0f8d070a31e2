//! Platform records a launch is built from.

use crate::ids::{ActivityId, CourseId, ToolTypeId};
use serde::{Deserialize, Serialize};

/// A course, published to tools as the LTI context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Course {
    pub id: CourseId,
    pub short_name: String,
    pub full_name: String,
}

/// An external-tool activity placed in a course.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LtiActivity {
    pub id: ActivityId,
    pub course_id: CourseId,
    pub type_id: ToolTypeId,
    pub name: String,
    #[serde(default)]
    pub intro: String,
    /// Overrides the tool's launch URL when set.
    #[serde(default)]
    pub tool_url: Option<String>,
    /// Activity-level `name=value` lines, applied after the tool's.
    #[serde(default)]
    pub custom_parameters: Option<String>,
}

/// A platform user as seen by launched tools.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformUser {
    pub id: String,
    #[serde(default)]
    pub given_name: String,
    #[serde(default)]
    pub family_name: String,
    #[serde(default)]
    pub email: String,
    /// LIS role URNs (e.g. `urn:lti:role:ims/lis/Learner`).
    #[serde(default)]
    pub roles: Vec<String>,
}

impl PlatformUser {
    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{} {}", self.given_name, self.family_name)
            .trim()
            .to_string()
    }
}
