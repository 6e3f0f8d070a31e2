//! Launch hints.
//!
//! A hint is written to the user's session when a 1.3 login is initiated and
//! taken back (exactly once) when the tool calls the auth endpoint.

use crate::error::CoreError;
use crate::ids::{ActivityId, CourseId, ToolTypeId};
use base64::{engine::general_purpose::STANDARD, Engine};
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};

/// LTI message types the platform sends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MessageType {
    #[serde(rename = "basic-lti-launch-request")]
    BasicLaunch,
    #[serde(rename = "ContentItemSelectionRequest")]
    ContentItemSelection,
}

impl MessageType {
    /// LTI 1.1 name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::BasicLaunch => "basic-lti-launch-request",
            Self::ContentItemSelection => "ContentItemSelectionRequest",
        }
    }

    /// LTI 1.3 name.
    #[must_use]
    pub const fn lti13_name(&self) -> &'static str {
        match self {
            Self::BasicLaunch => "LtiResourceLinkRequest",
            Self::ContentItemSelection => "LtiDeepLinkingRequest",
        }
    }

    /// Parse an LTI 1.1 message type name.
    pub fn from_lti1_name(s: &str) -> Option<Self> {
        match s {
            "basic-lti-launch-request" => Some(Self::BasicLaunch),
            "ContentItemSelectionRequest" => Some(Self::ContentItemSelection),
            _ => None,
        }
    }
}

/// Session entry tying a launch id to what is being launched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchHint {
    pub course_id: CourseId,
    pub type_id: ToolTypeId,
    /// Activity being launched; `None` for content-item selection.
    pub activity_id: Option<ActivityId>,
    pub message_type: MessageType,
    /// User the launch is on behalf of, when different from the viewer.
    pub for_user_id: Option<String>,
    title_b64: String,
    text_b64: String,
}

impl LaunchHint {
    /// Hint for launching an existing activity.
    #[must_use]
    pub fn activity(course_id: CourseId, type_id: ToolTypeId, activity_id: ActivityId) -> Self {
        Self {
            course_id,
            type_id,
            activity_id: Some(activity_id),
            message_type: MessageType::BasicLaunch,
            for_user_id: None,
            title_b64: String::new(),
            text_b64: String::new(),
        }
    }

    /// Hint for a content-item selection carrying a default title and text.
    #[must_use]
    pub fn content_item(course_id: CourseId, type_id: ToolTypeId, title: &str, text: &str) -> Self {
        Self {
            course_id,
            type_id,
            activity_id: None,
            message_type: MessageType::ContentItemSelection,
            for_user_id: None,
            title_b64: STANDARD.encode(title),
            text_b64: STANDARD.encode(text),
        }
    }

    /// Sets the user the launch is made for.
    #[must_use]
    pub fn for_user(mut self, user_id: impl Into<String>) -> Self {
        self.for_user_id = Some(user_id.into());
        self
    }

    /// Decoded content-item title.
    #[must_use]
    pub fn title(&self) -> String {
        decode_b64(&self.title_b64)
    }

    /// Decoded content-item text.
    #[must_use]
    pub fn text(&self) -> String {
        decode_b64(&self.text_b64)
    }

    /// Random launch id used as the session key and echoed by the tool.
    #[must_use]
    pub fn new_launch_id() -> String {
        let mut bytes = [0u8; 16];
        OsRng.fill_bytes(&mut bytes);
        format!("ltilaunch_{}", hex::encode(bytes))
    }

    /// Serializes as the seven comma-separated session fields.
    #[must_use]
    pub fn to_session_value(&self) -> String {
        format!(
            "{},{},{},{},{},{},{}",
            self.course_id,
            self.type_id,
            self.activity_id.map(|a| a.to_string()).unwrap_or_default(),
            self.message_type.as_str(),
            self.for_user_id.as_deref().unwrap_or_default(),
            self.title_b64,
            self.text_b64,
        )
    }

    /// Parses [`LaunchHint::to_session_value`] output.
    pub fn from_session_value(value: &str) -> Result<Self, CoreError> {
        let fields: Vec<&str> = value.splitn(7, ',').collect();
        let [course, type_id, activity, message_type, for_user, title, text] = fields[..] else {
            return Err(CoreError::MalformedLaunchHint(format!(
                "expected 7 fields, found {}",
                fields.len()
            )));
        };

        let malformed = |e: crate::ids::ParseIdError| CoreError::MalformedLaunchHint(e.to_string());
        Ok(Self {
            course_id: course.parse().map_err(malformed)?,
            type_id: type_id.parse().map_err(malformed)?,
            activity_id: if activity.is_empty() {
                None
            } else {
                Some(activity.parse().map_err(malformed)?)
            },
            message_type: MessageType::from_lti1_name(message_type).ok_or_else(|| {
                CoreError::MalformedLaunchHint(format!("unknown message type '{message_type}'"))
            })?,
            for_user_id: Some(for_user.to_string()).filter(|u| !u.is_empty()),
            title_b64: title.to_string(),
            text_b64: text.to_string(),
        })
    }
}

fn decode_b64(value: &str) -> String {
    STANDARD
        .decode(value)
        .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
        .unwrap_or_default()
}
