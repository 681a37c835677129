use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// An organizational unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(rename_all = "camelCase")]
pub struct Department {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub parent_id: Option<String>,
    pub manager_id: Option<String>,
    pub employee_count: Option<i32>,
    pub parent_name: Option<String>,
    pub manager_name: Option<String>,
    pub created_at: Option<NaiveDateTime>,
    pub updated_at: Option<NaiveDateTime>,
}

impl Department {
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }

    pub fn display_employee_count(&self) -> String {
        match self.employee_count {
            Some(1) => "1 employee".to_string(),
            Some(count) => format!("{} employees", count),
            None => "Unknown".to_string(),
        }
    }
}

/// Create/update payload for a department.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(rename_all = "camelCase")]
pub struct NewDepartment {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manager_id: Option<String>,
}
