//! Dashboard role and the session context handed to components that need it.
//!
//! Nothing here decides what a role is allowed to see; the backend does that.
//! The role only picks which statistics endpoint the dashboard reads.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unknown role: {0:?} (expected admin, teacher or student)")]
pub struct UnknownRole(pub String);

/// A cacheable remote read: where it lives in the cache and where it comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resource {
    pub key: &'static str,
    pub path: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Admin,
    Teacher,
    Student,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Admin, Role::Teacher, Role::Student];

    pub fn title(&self) -> &'static str {
        match self {
            Role::Admin => "Admin",
            Role::Teacher => "Teacher",
            Role::Student => "Student",
        }
    }

    pub fn resource(&self) -> Resource {
        match self {
            Role::Admin => Resource {
                key: "admin_statistics",
                path: "/admin/statistics",
            },
            Role::Teacher => Resource {
                key: "teacher_statistics",
                path: "/teacher/statistics",
            },
            Role::Student => Resource {
                key: "student_statistics",
                path: "/student/statistics",
            },
        }
    }

    /// Get the next role (wrapping around)
    pub fn next(&self) -> Self {
        match self {
            Role::Admin => Role::Teacher,
            Role::Teacher => Role::Student,
            Role::Student => Role::Admin,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.title())
    }
}

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "teacher" => Ok(Role::Teacher),
            "student" => Ok(Role::Student),
            _ => Err(UnknownRole(s.to_string())),
        }
    }
}

/// Who is looking at the dashboard. Passed explicitly instead of living in a
/// global store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionContext {
    pub role: Role,
    pub token: Option<String>,
}

impl SessionContext {
    pub fn new(role: Role, token: Option<String>) -> Self {
        Self { role, token }
    }

    pub fn with_role(&self, role: Role) -> Self {
        Self {
            role,
            token: self.token.clone(),
        }
    }
}
