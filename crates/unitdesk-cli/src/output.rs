//! Tab-separated and JSON rendering of collections.

use std::io::{self, Write};

use anyhow::Result;
use serde::Serialize;
use unitdesk_core::models::{Department, Employee, EntryExitRequest, Position, Vehicle};
use unitdesk_core::CacheStatus;

/// A value printable as one tab-separated row.
pub trait TableRow {
    const HEADERS: &'static [&'static str];

    fn columns(&self) -> Vec<String>;
}

fn or_dash(value: Option<&str>) -> String {
    match value {
        Some(v) if !v.is_empty() => v.to_string(),
        _ => "-".to_string(),
    }
}

impl TableRow for Department {
    const HEADERS: &'static [&'static str] = &["ID", "NAME", "PARENT", "MANAGER", "EMPLOYEES"];

    fn columns(&self) -> Vec<String> {
        vec![
            self.id.clone(),
            self.name.clone(),
            or_dash(self.parent_name.as_deref()),
            or_dash(self.manager_name.as_deref()),
            self.display_employee_count(),
        ]
    }
}

impl TableRow for Position {
    const HEADERS: &'static [&'static str] = &["ID", "NAME", "PARENT", "LEVEL", "ORDER"];

    fn columns(&self) -> Vec<String> {
        vec![
            self.id.clone(),
            self.name.clone(),
            or_dash(self.parent_name.as_deref()),
            or_dash(Some(self.level_display())),
            self.display_order.to_string(),
        ]
    }
}

impl TableRow for Employee {
    const HEADERS: &'static [&'static str] =
        &["ID", "SERVICE NO", "NAME", "DEPARTMENT", "POSITION", "STATUS"];

    fn columns(&self) -> Vec<String> {
        vec![
            self.id.clone(),
            self.employee_id.clone(),
            self.name.clone(),
            or_dash(self.department.as_deref()),
            or_dash(self.position.as_deref()),
            self.display_status(),
        ]
    }
}

impl TableRow for Vehicle {
    const HEADERS: &'static [&'static str] = &["ID", "VEHICLE", "TYPE", "OWNER"];

    fn columns(&self) -> Vec<String> {
        vec![
            self.id.clone(),
            self.display_name(),
            self.vehicle_type.to_string(),
            or_dash(self.employee_name.as_deref()),
        ]
    }
}

impl TableRow for EntryExitRequest {
    const HEADERS: &'static [&'static str] = &["ID", "PLATE", "TYPE", "STATUS", "REQUESTED"];

    fn columns(&self) -> Vec<String> {
        vec![
            self.id.clone(),
            self.license_plate.clone(),
            self.request_type.to_string(),
            self.status.to_string(),
            self.request_time
                .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
                .unwrap_or_else(|| "-".to_string()),
        ]
    }
}

impl TableRow for CacheStatus {
    const HEADERS: &'static [&'static str] = &["RESOURCE", "STATE", "UPDATED"];

    fn columns(&self) -> Vec<String> {
        vec![self.kind.to_string(), self.state.to_string(), self.age.clone()]
    }
}

pub fn render_table<R: TableRow>(rows: &[R]) -> String {
    let mut out = R::HEADERS.join("\t");
    out.push('\n');
    for row in rows {
        out.push_str(&row.columns().join("\t"));
        out.push('\n');
    }
    out
}

/// Print `rows` as JSON or as a table, depending on `json`.
pub fn print_rows<R: TableRow + Serialize>(rows: &[R], json: bool) -> Result<()> {
    let text = if json {
        let mut text = serde_json::to_string_pretty(rows)?;
        text.push('\n');
        text
    } else {
        render_table(rows)
    };
    io::stdout().lock().write_all(text.as_bytes())?;
    Ok(())
}
