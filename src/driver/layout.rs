//! Column sets of the GCP table
//!
//! The warp side holds the GCP source coordinates (pixel/line of the image
//! being aligned); the base side holds the destination (pixel/line of the
//! reference image when co-registering, E/N when georeferencing).

use super::completion::{RequiredInput, RowCompletion};
use super::equation::{variable_name, Equation};

/// Side of a control point a column belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    /// GCP source
    Warp,
    /// GCP destination
    Base,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
}

/// What a column holds
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnRole {
    /// `ON`/`OFF` flag
    Enabled,
    /// Numeric coordinate entered by the user
    Coordinate { side: Side, axis: Axis },
    /// `POINT(x y)` text mirroring the coordinate columns of one side
    Geometry { side: Side },
    /// Value derived from other columns
    Calculated { equation: Equation, requires: RowCompletion },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: &'static str,
    pub role: ColumnRole,
}

impl Column {
    fn new(name: &'static str, role: ColumnRole) -> Self {
        Column { name, role }
    }

    pub fn is_calculated(&self) -> bool {
        matches!(self.role, ColumnRole::Calculated { .. })
    }

    /// Input this column marks as set on the pending row
    pub fn required_input(&self) -> Option<RequiredInput> {
        match self.role {
            ColumnRole::Coordinate { side: Side::Base, axis: Axis::X } => Some(RequiredInput::PixelBase),
            ColumnRole::Coordinate { side: Side::Base, axis: Axis::Y } => Some(RequiredInput::LineBase),
            ColumnRole::Coordinate { side: Side::Warp, axis: Axis::X } => Some(RequiredInput::PixelWarp),
            ColumnRole::Coordinate { side: Side::Warp, axis: Axis::Y } => Some(RequiredInput::LineWarp),
            ColumnRole::Geometry { side: Side::Base } => Some(RequiredInput::GeometryBase),
            ColumnRole::Geometry { side: Side::Warp } => Some(RequiredInput::GeometryWarp),
            _ => None,
        }
    }
}

/// Table layout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverLayout {
    /// Image to image, both sides in pixel/line
    Coregister,
    /// Image to map, base side in E/N
    Georeference,
}

impl DriverLayout {
    /// Columns of the layout, in display order
    pub fn columns(&self) -> Vec<Column> {
        use ColumnRole::*;

        let mut columns = vec![Column::new("enabled", Enabled)];
        match self {
            DriverLayout::Coregister => columns.extend([
                Column::new("pixel_warp", Coordinate { side: Side::Warp, axis: Axis::X }),
                Column::new("line_warp", Coordinate { side: Side::Warp, axis: Axis::Y }),
                Column::new("geometry_warp", Geometry { side: Side::Warp }),
                Column::new("pixel_base", Coordinate { side: Side::Base, axis: Axis::X }),
                Column::new("line_base", Coordinate { side: Side::Base, axis: Axis::Y }),
                Column::new("geometry_base", Geometry { side: Side::Base }),
            ]),
            DriverLayout::Georeference => columns.extend([
                Column::new("pixel", Coordinate { side: Side::Warp, axis: Axis::X }),
                Column::new("line", Coordinate { side: Side::Warp, axis: Axis::Y }),
                Column::new("x", Coordinate { side: Side::Base, axis: Axis::X }),
                Column::new("y", Coordinate { side: Side::Base, axis: Axis::Y }),
                Column::new("geometry", Geometry { side: Side::Base }),
            ]),
        }

        let index_of = |side: Side, axis: Axis| {
            let role = Coordinate { side, axis };
            columns.iter().position(|c| c.role == role).unwrap_or_default()
        };
        let warp_x = variable_name(index_of(Side::Warp, Axis::X));
        let warp_y = variable_name(index_of(Side::Warp, Axis::Y));
        let base_x = variable_name(index_of(Side::Base, Axis::X));
        let base_y = variable_name(index_of(Side::Base, Axis::Y));

        use RequiredInput::*;
        let mut calculated = vec![
            Column::new("error_x", Calculated {
                equation: Equation::new(&format!("{} - {}", warp_x, base_x)),
                requires: RowCompletion::of(&[PixelWarp, LineWarp, PixelBase]),
            }),
            Column::new("error_y", Calculated {
                equation: Equation::new(&format!("{} - {}", warp_y, base_y)),
                requires: RowCompletion::of(&[PixelWarp, LineWarp, LineBase]),
            }),
            Column::new("error_quadratic", Calculated {
                equation: Equation::new(&format!(
                    "sqrt(({} - {})^2 + ({} - {})^2)", warp_x, base_x, warp_y, base_y)),
                requires: RowCompletion::of(&[PixelWarp, LineWarp, PixelBase, LineBase]),
            }),
        ];
        if *self == DriverLayout::Coregister {
            calculated.push(Column::new("model_x", Calculated {
                equation: Equation::new(&warp_x),
                requires: RowCompletion::of(&[PixelWarp, LineWarp]),
            }));
            calculated.push(Column::new("model_y", Calculated {
                equation: Equation::new(&warp_y),
                requires: RowCompletion::of(&[PixelWarp, LineWarp]),
            }));
        }

        columns.extend(calculated);
        columns
    }

    /// Inputs that must be set before a new row can follow the last one
    pub fn required_inputs(&self) -> RowCompletion {
        use RequiredInput::*;
        match self {
            DriverLayout::Coregister => RowCompletion::all(),
            DriverLayout::Georeference => RowCompletion::of(&[PixelBase, LineBase, PixelWarp, LineWarp]),
        }
    }
}
