//! Strongly Typed Identifiers
//!
//! Registry records (tools, proxies, courses, activities) are keyed by integer
//! ids owned by the platform database. Sessions are keyed by random UUIDs.
//!
//! # Example
//!
//! ```
//! use ltix_core::{CourseId, ToolTypeId};
//!
//! let tool: ToolTypeId = "12".parse().unwrap();
//! assert_eq!(tool.get(), 12);
//!
//! // Type safety: cannot pass a CourseId where a ToolTypeId is expected
//! fn requires_tool(id: ToolTypeId) -> i64 {
//!     id.get()
//! }
//! assert_eq!(requires_tool(tool), 12);
//! // requires_tool(CourseId::new(3)); // This would not compile!
//! ```

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use uuid::Uuid;

/// Id of the site-level course; tools owned by it are available everywhere.
pub const SITE_COURSE_ID: i64 = 1;

/// Error type for ID parsing failures
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseIdError {
    /// The type of ID that failed to parse
    pub id_type: &'static str,
    /// The underlying parse error message
    pub message: String,
}

impl Display for ParseIdError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "Failed to parse {}: {}", self.id_type, self.message)
    }
}

impl std::error::Error for ParseIdError {}

/// Macro to define an integer record id owned by the registry.
macro_rules! define_record_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            /// Wraps a raw record id.
            #[must_use]
            pub const fn new(id: i64) -> Self {
                Self(id)
            }

            /// Returns the raw record id.
            #[must_use]
            pub const fn get(&self) -> i64 {
                self.0
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = ParseIdError;

            fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
                s.trim().parse::<i64>().map(Self).map_err(|e| ParseIdError {
                    id_type: stringify!($name),
                    message: e.to_string(),
                })
            }
        }
    };
}

define_record_id!(
    /// Identifier of a registered tool type.
    ///
    /// Also published to tools as the LTI 1.3 deployment id.
    ToolTypeId
);

define_record_id!(
    /// Identifier of a legacy LTI 2 tool proxy registration.
    ToolProxyId
);

define_record_id!(
    /// Identifier of a course (the LTI context).
    CourseId
);

define_record_id!(
    /// Identifier of an external-tool activity placed in a course.
    ActivityId
);

impl CourseId {
    /// The site-level course.
    #[must_use]
    pub const fn site() -> Self {
        Self(SITE_COURSE_ID)
    }

    /// Returns true for the site course or the unset (zero) course.
    #[must_use]
    pub const fn is_site(&self) -> bool {
        self.0 == SITE_COURSE_ID || self.0 == 0
    }
}

/// Identifier of a platform browser session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(Uuid);

impl SessionId {
    /// Creates a new random session id.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a session id from an existing UUID.
    #[must_use]
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns a reference to the underlying UUID.
    #[must_use]
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for SessionId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for SessionId {
    type Err = ParseIdError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self).map_err(|e| ParseIdError {
            id_type: "SessionId",
            message: e.to_string(),
        })
    }
}
