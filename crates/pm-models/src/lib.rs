//! # pm-models
//!
//! Domain models for Project Manager RS.
//!
//! Entities map to the relational tables, DTOs are what services accept and
//! return, and view-models are the presentation-shaped copies. [`Mapper`]
//! translates between the three, field by field.

pub use pm_core::traits::{Entity, Id, Identifiable};

pub mod dto;
pub mod employee;
pub mod mapping;
pub mod objective;
pub mod project;
pub mod view_model;

pub use dto::{EmployeeDto, ObjectiveDto, ProjectDto};
pub use employee::{Employee, EmployeeInclude};
pub use mapping::Mapper;
pub use objective::{Objective, ObjectiveInclude, ObjectiveStatus, UnknownStatus};
pub use project::{Project, ProjectInclude};
pub use view_model::{EmployeeViewModel, ObjectiveViewModel, ProjectViewModel};
