use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of forge account a run is collecting from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Organization,
    User,
}

impl EntityKind {
    /// Path segment of the repository-listing endpoint family.
    pub fn path_segment(&self) -> &'static str {
        match self {
            EntityKind::Organization => "orgs",
            EntityKind::User => "users",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityKind::Organization => write!(f, "organization"),
            EntityKind::User => write!(f, "user"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entity {
    pub name: String,
    pub kind: EntityKind,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Repository {
    pub full_name: String,
}
