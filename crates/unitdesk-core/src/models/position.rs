use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// How the console filters personnel under a position menu entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub enum PositionFilter {
    /// Filter by agency / unit
    #[serde(rename = "CO_QUAN_DON_VI")]
    Unit,
    /// Filter by job title
    #[serde(rename = "CHUC_VU")]
    JobTitle,
    #[serde(rename = "N_A")]
    None,
    #[serde(other)]
    Unknown,
}

/// An entry in the position hierarchy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(rename_all = "camelCase")]
pub struct Position {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub parent_id: Option<String>,
    pub level: Option<String>,
    #[serde(default = "default_active")]
    pub is_active: bool,
    #[serde(default)]
    pub display_order: i32,
    pub filter_by: Option<PositionFilter>,
    pub parent_name: Option<String>,
    pub children_count: Option<i32>,
    pub created_at: Option<NaiveDateTime>,
    pub updated_at: Option<NaiveDateTime>,
}

fn default_active() -> bool {
    true
}

impl Position {
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }

    pub fn is_child_of(&self, parent_id: &str) -> bool {
        self.parent_id.as_deref() == Some(parent_id)
    }

    /// Display name for the position level, falling back to the raw code
    pub fn level_display(&self) -> &str {
        match self.level.as_deref() {
            Some("INTERN") => "Intern",
            Some("JUNIOR") => "Staff",
            Some("SENIOR") => "Senior staff",
            Some("LEAD") => "Team lead",
            Some("MANAGER") => "Manager",
            Some("DIRECTOR") => "Director",
            Some("EXECUTIVE") => "Executive",
            Some(other) => other,
            None => "",
        }
    }
}

/// Create/update payload for a position.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(rename_all = "camelCase")]
pub struct NewPosition {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_order: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter_by: Option<PositionFilter>,
}
