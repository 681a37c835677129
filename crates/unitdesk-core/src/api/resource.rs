//! Resource collections exposed by the backend.
//!
//! Each collection is described once by a marker type implementing
//! `Resource`, which ties together its REST path, item model and
//! create/update payload.

use std::fmt;
use std::str::FromStr;

use serde::{de::DeserializeOwned, Serialize};

use crate::models::{
    Department, Employee, EntryExitRequest, NewDepartment, NewEmployee, NewEntryExitRequest,
    NewPosition, NewVehicle, Position, Vehicle,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResourceKind {
    Departments,
    Positions,
    Employees,
    Vehicles,
    EntryExitRequests,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 5] = [
        ResourceKind::Departments,
        ResourceKind::Positions,
        ResourceKind::Employees,
        ResourceKind::Vehicles,
        ResourceKind::EntryExitRequests,
    ];

    /// Collection path relative to the API base URL
    pub const fn path(self) -> &'static str {
        match self {
            ResourceKind::Departments => "departments",
            ResourceKind::Positions => "positions",
            ResourceKind::Employees => "employees",
            ResourceKind::Vehicles => "vehicles",
            ResourceKind::EntryExitRequests => "entry-exit-requests",
        }
    }

    /// Other collections that embed data from this one and go stale when
    /// it changes (names, counts, plates copied into their rows).
    pub fn dependents(self) -> &'static [ResourceKind] {
        match self {
            ResourceKind::Departments => &[ResourceKind::Employees],
            ResourceKind::Positions => &[ResourceKind::Employees],
            ResourceKind::Employees => &[ResourceKind::Departments, ResourceKind::Vehicles],
            ResourceKind::Vehicles => &[ResourceKind::EntryExitRequests],
            ResourceKind::EntryExitRequests => &[],
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

impl FromStr for ResourceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "departments" | "department" | "units" => Ok(ResourceKind::Departments),
            "positions" | "position" => Ok(ResourceKind::Positions),
            "employees" | "employee" | "personnel" => Ok(ResourceKind::Employees),
            "vehicles" | "vehicle" => Ok(ResourceKind::Vehicles),
            "entry-exit-requests" | "requests" | "gate" => Ok(ResourceKind::EntryExitRequests),
            other => Err(format!(
                "Unknown resource '{}'. Valid resources: departments, positions, employees, vehicles, requests",
                other
            )),
        }
    }
}

/// A backend collection: its kind, item model and write payload.
pub trait Resource: Send + Sync + 'static {
    type Item: DeserializeOwned + Serialize + Send + Sync + 'static;
    type Payload: Serialize + Send + Sync;

    const KIND: ResourceKind;
}

pub struct Departments;
pub struct Positions;
pub struct Employees;
pub struct Vehicles;
pub struct EntryExitRequests;

impl Resource for Departments {
    type Item = Department;
    type Payload = NewDepartment;
    const KIND: ResourceKind = ResourceKind::Departments;
}

impl Resource for Positions {
    type Item = Position;
    type Payload = NewPosition;
    const KIND: ResourceKind = ResourceKind::Positions;
}

impl Resource for Employees {
    type Item = Employee;
    type Payload = NewEmployee;
    const KIND: ResourceKind = ResourceKind::Employees;
}

impl Resource for Vehicles {
    type Item = Vehicle;
    type Payload = NewVehicle;
    const KIND: ResourceKind = ResourceKind::Vehicles;
}

impl Resource for EntryExitRequests {
    type Item = EntryExitRequest;
    type Payload = NewEntryExitRequest;
    const KIND: ResourceKind = ResourceKind::EntryExitRequests;
}
