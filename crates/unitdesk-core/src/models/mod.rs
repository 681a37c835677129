//! Data models for backend entities.
//!
//! This module contains the structures exchanged with the REST backend:
//!
//! - `Department`: organizational units, optionally nested via `parent_id`
//! - `Position`: position hierarchy entries
//! - `Employee`: personnel records
//! - `Vehicle`, `EntryExitRequest`: registered vehicles and gate requests
//!
//! Each entity has a matching `New*` payload used for create and update
//! calls. Wire names are camelCase; timestamps are the backend's local
//! date-times without an offset.

pub mod department;
pub mod employee;
pub mod position;
pub mod vehicle;

pub use department::{Department, NewDepartment};
pub use employee::{AccessLevel, Employee, EmployeeStatus, Gender, NewEmployee};
pub use position::{NewPosition, Position, PositionFilter};
pub use vehicle::{
    EntryExitRequest, FuelType, NewEntryExitRequest, NewVehicle, RequestStatus, RequestType,
    Vehicle, VehicleStatus, VehicleType,
};
