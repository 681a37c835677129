use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use super::VehicleType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
    Other,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub enum EmployeeStatus {
    /// On duty
    #[serde(rename = "HOAT_DONG")]
    Active,
    /// Short personal leave
    #[serde(rename = "TRANH_THU")]
    ShortLeave,
    /// Regular leave
    #[serde(rename = "PHEP")]
    OnLeave,
    /// Absent for another reason
    #[serde(rename = "LY_DO_KHAC")]
    OtherReason,
    /// Status codes the console does not know about yet
    #[serde(other)]
    Unknown,
}

impl std::fmt::Display for EmployeeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EmployeeStatus::Active => write!(f, "Active"),
            EmployeeStatus::ShortLeave => write!(f, "Short leave"),
            EmployeeStatus::OnLeave => write!(f, "On leave"),
            EmployeeStatus::OtherReason => write!(f, "Other reason"),
            EmployeeStatus::Unknown => write!(f, "Unknown"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(rename_all = "lowercase")]
pub enum AccessLevel {
    #[default]
    General,
    Restricted,
    Admin,
    #[serde(other)]
    Unknown,
}

/// A personnel record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(rename_all = "camelCase")]
pub struct Employee {
    pub id: String,
    /// Service number shown in the console, distinct from the record id
    pub employee_id: String,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub department: Option<String>,
    pub department_id: Option<String>,
    pub position: Option<String>,
    pub rank: Option<String>,
    pub job_title: Option<String>,
    pub military_civilian: Option<String>,
    pub hire_date: Option<NaiveDate>,
    pub birth_date: Option<NaiveDate>,
    pub gender: Option<Gender>,
    pub address: Option<String>,
    pub status: Option<EmployeeStatus>,
    #[serde(default)]
    pub access_level: AccessLevel,
    #[serde(default)]
    pub permissions: Vec<String>,
    pub vehicle_type: Option<VehicleType>,
    pub created_at: Option<NaiveDateTime>,
    pub updated_at: Option<NaiveDateTime>,
}

impl Employee {
    pub fn display_status(&self) -> String {
        self.status
            .map(|s| s.to_string())
            .unwrap_or_else(|| "-".to_string())
    }

    /// Case-insensitive match against name, service number, department and email
    pub fn matches(&self, query: &str) -> bool {
        let query = query.to_lowercase();
        let contains = |value: &str| value.to_lowercase().contains(&query);

        contains(&self.name)
            || contains(&self.employee_id)
            || self.department.as_deref().is_some_and(contains)
            || self.email.as_deref().is_some_and(contains)
    }
}

/// Create/update payload for an employee.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(rename_all = "camelCase")]
pub struct NewEmployee {
    pub employee_id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub department_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rank: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hire_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<EmployeeStatus>,
    pub access_level: AccessLevel,
}
