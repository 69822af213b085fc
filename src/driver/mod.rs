//! Tabular GCP editing
//!
//! `GcpDriver` presents control points as a table whose error columns are
//! recomputed from equations every time an input cell changes.

mod completion;
mod equation;
mod events;
mod gcp_driver;
mod layout;
mod table;

pub use self::completion::{RequiredInput, RowCompletion};
pub use self::equation::{variable_name, Equation};
pub use self::events::{DriverEvent, EventEmitter};
pub use self::gcp_driver::{parse_point_geometry, point_geometry, GcpDriver, CALCULATION_ERROR};
pub use self::layout::{Axis, Column, ColumnRole, DriverLayout, Side};
pub use self::table::GcpTable;
