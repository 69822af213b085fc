//! Ground control points
//!
//! Value types for paired source/destination coordinates, the list that
//! groups them with their reference systems, and text file persistence.

mod point;
mod list;
mod loader;

pub use self::point::{GroundControlPoint, GroundControlPointExtended};
pub use self::list::GcpList;
pub use self::loader::{keys, TextFileGcpLoader, COMMENT_PREFIX, DISABLED_TOKEN, ENABLED_TOKEN};
