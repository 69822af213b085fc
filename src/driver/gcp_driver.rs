//! Editable GCP table with recomputed error columns
//!
//! The driver keeps three things consistent: the text table the user edits,
//! the `GcpList` built from its complete rows, and the polynomial fitted
//! from the enabled points of that list. Every accepted edit runs
//! `update_gcp_list`, `update_model` and the calculated-column refresh in
//! that order.

use std::collections::HashMap;

use lazy_static::lazy_static;
use log::{debug, info, trace};
use regex::Regex;

use crate::coordinate::Coordinates;
use crate::gcp::{GcpList, GroundControlPointExtended, DISABLED_TOKEN, ENABLED_TOKEN};
use crate::transformation::{
    keys, CoordinatesTransformation, ParameterCollection, ParameterValue, TransformationFactory,
    TransformationKind,
};
use super::completion::RowCompletion;
use super::equation::Equation;
use super::events::{DriverEvent, EventEmitter};
use super::layout::{Axis, ColumnRole, DriverLayout, Side};
use super::table::GcpTable;

/// Text shown in a calculated cell that could not be evaluated
pub const CALCULATION_ERROR: &str = "#ERROR: No se puede calcular el valor";

lazy_static! {
    static ref POINT_PATTERN: Regex = Regex::new(
        r"(?i)^\s*POINT\s*\(\s*([-+0-9.eE]+)\s+([-+0-9.eE]+)\s*\)\s*$"
    ).expect("valid point pattern");
}

/// Encode a coordinate pair as a WKT point
pub fn point_geometry(x: f64, y: f64) -> String {
    format!("POINT({} {})", x, y)
}

/// Decode a WKT point into its coordinates
pub fn parse_point_geometry(text: &str) -> Option<(f64, f64)> {
    let captures = POINT_PATTERN.captures(text)?;
    let x = captures[1].parse::<f64>().ok()?;
    let y = captures[2].parse::<f64>().ok()?;
    if x.is_finite() && y.is_finite() { Some((x, y)) } else { None }
}

/// GCP table model
pub struct GcpDriver {
    layout: DriverLayout,
    table: GcpTable,
    gcp_list: GcpList,
    order: u32,
    factory: TransformationFactory,
    transformation: Option<CoordinatesTransformation>,
    completion: RowCompletion,
    events: EventEmitter,
}

impl GcpDriver {
    /// Create an empty driver fitting polynomials of the given order
    pub fn new(layout: DriverLayout, order: u32) -> Self {
        GcpDriver {
            layout,
            table: GcpTable::new(layout.columns()),
            gcp_list: GcpList::new(),
            order,
            factory: TransformationFactory::build(),
            transformation: None,
            completion: RowCompletion::default(),
            events: EventEmitter::new(),
        }
    }

    pub fn layout(&self) -> DriverLayout {
        self.layout
    }

    pub fn order(&self) -> u32 {
        self.order
    }

    /// Change the polynomial order and refit
    pub fn set_order(&mut self, order: u32) {
        if order != self.order {
            self.order = order;
            self.update_model(true);
        }
    }

    /// Register a handler for driver events
    pub fn subscribe<F>(&mut self, handler: F)
    where
        F: FnMut(&DriverEvent) + 'static,
    {
        self.events.subscribe(handler);
    }

    pub fn gcp_list(&self) -> &GcpList {
        &self.gcp_list
    }

    /// Currently fitted transformation, if any
    pub fn transformation(&self) -> Option<&CoordinatesTransformation> {
        self.transformation.as_ref()
    }

    /// Mean residual of the current model, 0 without one
    pub fn rmse(&self) -> f64 {
        self.transformation.as_ref().map(|t| t.rmse()).unwrap_or(0.0)
    }

    pub fn row_count(&self) -> usize {
        self.table.row_count()
    }

    pub fn column_count(&self) -> usize {
        self.table.column_count()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.table.column_index(name)
    }

    pub fn column_name(&self, column: usize) -> Option<&'static str> {
        self.table.column(column).map(|c| c.name)
    }

    pub fn cell(&self, row: usize, column: usize) -> Option<&str> {
        self.table.cell(row, column)
    }

    /// Inputs already set on the last row
    pub fn completion(&self) -> RowCompletion {
        self.completion
    }

    /// Set the spatial references carried by the GCP list
    pub fn set_references(&mut self, source_wkt: &str, destination_wkt: &str) {
        self.gcp_list.source_srs_wkt = source_wkt.to_string();
        self.gcp_list.destination_srs_wkt = destination_wkt.to_string();
    }

    /// Whether the last row has every input the layout requires
    pub fn is_row_available(&self) -> bool {
        self.table.row_count() == 0 || self.completion.satisfies(&self.layout.required_inputs())
    }

    /// Append an empty, enabled row
    ///
    /// Refused (returns `false`) while the current last row is missing a
    /// required input.
    pub fn append_row(&mut self) -> bool {
        if !self.is_row_available() {
            debug!("Last row is incomplete, not appending");
            return false;
        }
        let row = self.push_row();
        self.completion.reset();
        self.events.emit(&DriverEvent::RowAppended(row));
        true
    }

    fn push_row(&mut self) -> usize {
        let row = self.table.append_row();
        if let Some(column) = self.enabled_column() {
            self.table.set_cell(row, column, ENABLED_TOKEN);
        }
        row
    }

    /// Remove a row and refit
    pub fn delete_row(&mut self, row: usize) -> bool {
        if !self.table.delete_row(row) {
            return false;
        }
        // the new last row was an earlier, complete one
        if self.table.row_count() == 0 {
            self.completion.reset();
        } else if row == self.table.row_count() {
            self.completion = RowCompletion::all();
        }
        self.events.emit(&DriverEvent::RowDeleted(row));
        self.update_gcp_list();
        self.update_model(true);
        true
    }

    /// Enable or disable the point of a row
    pub fn set_enabled(&mut self, row: usize, enabled: bool) -> bool {
        match self.enabled_column() {
            Some(column) => self.set_cell(row, column, if enabled { ENABLED_TOKEN } else { DISABLED_TOKEN }),
            None => false,
        }
    }

    /// Edit a cell
    ///
    /// Returns `false` when the cell does not exist, is calculated, or the
    /// value does not parse for the column type. Coordinate edits refresh
    /// the geometry cell of the same side and geometry edits push their
    /// coordinates back.
    pub fn set_cell(&mut self, row: usize, column: usize, value: &str) -> bool {
        let role = match self.table.column(column) {
            Some(c) if row < self.table.row_count() => c.role.clone(),
            _ => return false,
        };

        match role {
            ColumnRole::Calculated { .. } => return false,
            ColumnRole::Enabled => {
                let token = if value.trim() == ENABLED_TOKEN { ENABLED_TOKEN } else { DISABLED_TOKEN };
                self.write(row, column, token);
            }
            ColumnRole::Coordinate { side, .. } => {
                let number = match value.trim().parse::<f64>() {
                    Ok(n) if n.is_finite() => n,
                    _ => return false,
                };
                self.write(row, column, &number.to_string());
                self.refresh_geometry(row, side);
            }
            ColumnRole::Geometry { side } => {
                let (x, y) = match parse_point_geometry(value) {
                    Some(point) => point,
                    None => return false,
                };
                self.write(row, column, &point_geometry(x, y));
                if let Some(x_column) = self.coordinate_column(side, Axis::X) {
                    self.write(row, x_column, &x.to_string());
                }
                if let Some(y_column) = self.coordinate_column(side, Axis::Y) {
                    self.write(row, y_column, &y.to_string());
                }
            }
        }

        self.update_gcp_list();
        self.update_model(true);
        true
    }

    // Stores a value, tracks completion of the last row and reports changes
    fn write(&mut self, row: usize, column: usize, value: &str) {
        if row + 1 == self.table.row_count() {
            if let Some(input) = self.table.column(column).and_then(|c| c.required_input()) {
                self.completion.mark(input);
            }
        }
        if self.table.cell(row, column) != Some(value) {
            self.table.set_cell(row, column, value);
            self.events.emit(&DriverEvent::CellChanged { row, column });
        }
    }

    fn refresh_geometry(&mut self, row: usize, side: Side) {
        let geometry_column = match self.geometry_column(side) {
            Some(column) => column,
            None => return,
        };
        let x = self.coordinate_column(side, Axis::X).and_then(|c| self.table.numeric(row, c));
        let y = self.coordinate_column(side, Axis::Y).and_then(|c| self.table.numeric(row, c));
        if let (Some(x), Some(y)) = (x, y) {
            self.write(row, geometry_column, &point_geometry(x, y));
        }
    }

    fn enabled_column(&self) -> Option<usize> {
        self.table.columns().iter().position(|c| c.role == ColumnRole::Enabled)
    }

    fn coordinate_column(&self, side: Side, axis: Axis) -> Option<usize> {
        self.table.columns().iter().position(|c| c.role == ColumnRole::Coordinate { side, axis })
    }

    fn geometry_column(&self, side: Side) -> Option<usize> {
        self.table.columns().iter().position(|c| c.role == ColumnRole::Geometry { side })
    }

    fn side_point(&self, row: usize, side: Side) -> Option<Coordinates> {
        let x = self.table.numeric(row, self.coordinate_column(side, Axis::X)?)?;
        let y = self.table.numeric(row, self.coordinate_column(side, Axis::Y)?)?;
        Some(Coordinates::new(x, y))
    }

    /// Rebuild the GCP list from every row with all four coordinates
    pub fn update_gcp_list(&mut self) {
        self.gcp_list.clear();
        let enabled_column = self.enabled_column();
        for row in 0..self.table.row_count() {
            let (source, destination) = match (self.side_point(row, Side::Warp), self.side_point(row, Side::Base)) {
                (Some(source), Some(destination)) => (source, destination),
                _ => continue,
            };
            let enabled = enabled_column
                .map(|c| self.table.cell(row, c) != Some(DISABLED_TOKEN))
                .unwrap_or(true);
            self.gcp_list.add(GroundControlPointExtended::with_enabled(source, destination, enabled));
        }
        trace!("GCP list rebuilt with {} points", self.gcp_list.len());
    }

    /// Refit the polynomial from the enabled points
    ///
    /// Replaces the previous model (dropping it when the fit fails), then
    /// recomputes every calculated cell unless `update_values` is false.
    /// Always reports the new RMSE. Returns whether a model is available.
    pub fn update_model(&mut self, update_values: bool) -> bool {
        let mut params = ParameterCollection::new();
        params.add_value(keys::GCPS, ParameterValue::Gcps(self.gcp_list.adapted_points()))
            .add_value(keys::ORDER, ParameterValue::Integer(self.order as i64))
            .add_value(keys::SR_WKT_IN, ParameterValue::Text(self.gcp_list.source_srs_wkt.clone()))
            .add_value(keys::SR_WKT_OUT, ParameterValue::Text(self.gcp_list.destination_srs_wkt.clone()));

        self.transformation = self.factory.create(TransformationKind::Polynomial.type_name(), &params);

        if update_values {
            for row in 0..self.table.row_count() {
                self.update_calculated_data(row);
            }
        }

        let rmse = self.rmse();
        debug!("Model updated, RMSE {}", rmse);
        self.events.emit(&DriverEvent::RmseChanged(rmse));
        self.transformation.is_some()
    }

    /// Recompute the calculated cells of one row
    pub fn update_calculated_data(&mut self, row: usize) {
        let calculated: Vec<(usize, Equation)> = self.table.columns().iter().enumerate()
            .filter_map(|(index, column)| match &column.role {
                ColumnRole::Calculated { equation, .. } => Some((index, equation.clone())),
                _ => None,
            })
            .collect();

        for (column, equation) in calculated {
            let text = if !self.has_valid_calculation_data(column, row) {
                String::new()
            } else {
                match self.calculate(row, &equation) {
                    Ok(value) => value.to_string(),
                    Err(reason) => {
                        debug!("Row {} column {}: {}", row, column, reason);
                        CALCULATION_ERROR.to_string()
                    }
                }
            };
            self.write(row, column, &text);
        }
    }

    /// Whether the inputs a calculated column needs are present
    ///
    /// Rows before the last one are always ready.
    pub fn has_valid_calculation_data(&self, column: usize, row: usize) -> bool {
        if row >= self.table.row_count() {
            return false;
        }
        let requires = match self.table.column(column).map(|c| &c.role) {
            Some(ColumnRole::Calculated { requires, .. }) => requires,
            _ => return false,
        };
        row + 1 < self.table.row_count() || self.completion.satisfies(requires)
    }

    fn calculate(&self, row: usize, equation: &Equation) -> Result<f64, String> {
        let mut bindings = HashMap::new();
        let mut transformed_source: Option<Coordinates> = None;

        for (name, column) in equation.variables().zip(equation.columns()) {
            let role = self.table.column(column)
                .map(|c| c.role.clone())
                .ok_or_else(|| format!("Variable {} refers to a missing column", name))?;

            let value = match role {
                ColumnRole::Coordinate { side: Side::Warp, axis } => {
                    // errors are measured in destination space
                    let point = match transformed_source {
                        Some(point) => point,
                        None => {
                            let mut point = self.side_point(row, Side::Warp)
                                .ok_or_else(|| format!("Variable {} has no value", name))?;
                            let transformation = self.transformation.as_ref()
                                .ok_or_else(|| "No fitted model".to_string())?;
                            if !transformation.transform(&mut point, false) {
                                return Err("Model could not transform the point".to_string());
                            }
                            transformed_source = Some(point);
                            point
                        }
                    };
                    match axis {
                        Axis::X => point.x,
                        Axis::Y => point.y,
                    }
                }
                _ => self.table.numeric(row, column)
                    .ok_or_else(|| format!("Variable {} has no value", name))?,
            };
            bindings.insert(name.to_string(), value);
        }

        equation.evaluate(&bindings)
    }

    /// Replace the table contents with the points of a list
    pub fn load_gcps(&mut self, list: &GcpList) {
        info!("Loading {} control points into the table", list.len());
        self.table.clear();
        self.completion.reset();

        let enabled_column = self.enabled_column();
        for point in list.points() {
            let row = self.push_row();
            self.completion.reset();
            if let Some(column) = enabled_column {
                self.write(row, column, if point.is_enabled() { ENABLED_TOKEN } else { DISABLED_TOKEN });
            }
            for (side, coordinates) in [(Side::Warp, point.source()), (Side::Base, point.destination())] {
                if let Some(column) = self.coordinate_column(side, Axis::X) {
                    self.write(row, column, &coordinates.x.to_string());
                }
                if let Some(column) = self.coordinate_column(side, Axis::Y) {
                    self.write(row, column, &coordinates.y.to_string());
                }
                self.refresh_geometry(row, side);
            }
            self.events.emit(&DriverEvent::RowAppended(row));
        }

        let mut attributes = list.clone();
        attributes.clear();
        self.gcp_list = attributes;
        self.update_gcp_list();
        self.update_model(true);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn fill_row(driver: &mut GcpDriver, row: usize, warp: (f64, f64), base: (f64, f64)) {
        let columns = ["pixel_warp", "line_warp", "pixel_base", "line_base"];
        let values = [warp.0, warp.1, base.0, base.1];
        for (name, value) in columns.iter().zip(values) {
            let column = driver.column_index(name).unwrap();
            assert!(driver.set_cell(row, column, &value.to_string()));
        }
    }

    #[test]
    fn test_row_gating_requires_all_six_inputs_in_any_order() {
        let mut driver = GcpDriver::new(DriverLayout::Coregister, 1);
        assert!(driver.append_row());
        assert!(!driver.append_row());

        let geometry_base = driver.column_index("geometry_base").unwrap();
        let pixel_warp = driver.column_index("pixel_warp").unwrap();
        let line_warp = driver.column_index("line_warp").unwrap();

        assert!(driver.set_cell(0, geometry_base, "POINT(3 4)"));
        assert!(driver.completion().pixel_base && driver.completion().line_base);
        assert!(!driver.append_row());

        assert!(driver.set_cell(0, line_warp, "7"));
        assert!(!driver.completion().geometry_warp);
        assert!(!driver.append_row());

        assert!(driver.set_cell(0, pixel_warp, "5"));
        assert_eq!(driver.completion(), RowCompletion::all());
        assert!(driver.append_row());
        assert_eq!(driver.row_count(), 2);
        assert_eq!(driver.completion(), RowCompletion::default());
    }

    #[test]
    fn test_georeference_gating_needs_four_inputs() {
        let mut driver = GcpDriver::new(DriverLayout::Georeference, 1);
        assert!(driver.append_row());
        for (name, value) in [("y", "-34.6"), ("pixel", "10"), ("x", "-58.1")] {
            let column = driver.column_index(name).unwrap();
            assert!(driver.set_cell(0, column, value));
            assert!(!driver.append_row());
        }
        let line = driver.column_index("line").unwrap();
        assert!(driver.set_cell(0, line, "20"));
        assert!(driver.append_row());
    }

    #[test]
    fn test_geometry_round_trip() {
        let mut driver = GcpDriver::new(DriverLayout::Coregister, 1);
        driver.append_row();
        let pixel_base = driver.column_index("pixel_base").unwrap();
        let line_base = driver.column_index("line_base").unwrap();
        let geometry_base = driver.column_index("geometry_base").unwrap();

        assert!(driver.set_cell(0, pixel_base, "12.5"));
        assert_eq!(driver.cell(0, geometry_base), Some(""));
        assert!(driver.set_cell(0, line_base, "-3.25"));
        assert_eq!(driver.cell(0, geometry_base), Some("POINT(12.5 -3.25)"));

        assert!(driver.set_cell(0, geometry_base, "point( 100  200.75 )"));
        assert_eq!(driver.cell(0, pixel_base), Some("100"));
        assert_eq!(driver.cell(0, line_base), Some("200.75"));
        assert_eq!(driver.cell(0, geometry_base), Some("POINT(100 200.75)"));

        // writing back the same geometry changes nothing
        let geometry = driver.cell(0, geometry_base).unwrap().to_string();
        assert!(driver.set_cell(0, geometry_base, &geometry));
        assert_eq!(driver.cell(0, pixel_base), Some("100"));

        assert!(!driver.set_cell(0, geometry_base, "LINESTRING(0 0, 1 1)"));
        assert!(!driver.set_cell(0, pixel_base, "abc"));
    }

    #[test]
    fn test_georeference_map_geometry() {
        let mut driver = GcpDriver::new(DriverLayout::Georeference, 1);
        driver.append_row();
        let x = driver.column_index("x").unwrap();
        let y = driver.column_index("y").unwrap();
        let geometry = driver.column_index("geometry").unwrap();

        assert!(driver.set_cell(0, x, "-58.5"));
        assert!(driver.set_cell(0, y, "-34.25"));
        assert_eq!(driver.cell(0, geometry), Some("POINT(-58.5 -34.25)"));

        assert!(driver.set_cell(0, geometry, "POINT(10 20)"));
        assert_eq!(driver.cell(0, x), Some("10"));
        assert_eq!(driver.cell(0, y), Some("20"));
        // the map point alone does not complete the row
        assert!(!driver.append_row());
    }

    #[test]
    fn test_model_and_calculated_columns() {
        let mut driver = GcpDriver::new(DriverLayout::Coregister, 1);
        let events = Rc::new(RefCell::new(Vec::new()));
        let sink = events.clone();
        driver.subscribe(move |event| {
            if let DriverEvent::RmseChanged(rmse) = event {
                sink.borrow_mut().push(*rmse);
            }
        });

        let points = [((0.0, 0.0), (10.0, 20.0)), ((100.0, 0.0), (110.0, 20.0)), ((0.0, 100.0), (10.0, 120.0))];
        for (row, (warp, base)) in points.iter().enumerate() {
            assert!(driver.append_row());
            fill_row(&mut driver, row, *warp, *base);
        }

        assert!(driver.transformation().is_some());
        assert!(driver.rmse() < 1e-9);
        assert!(!events.borrow().is_empty());

        let error_x = driver.column_index("error_x").unwrap();
        let error_quadratic = driver.column_index("error_quadratic").unwrap();
        let model_x = driver.column_index("model_x").unwrap();
        for row in 0..3 {
            let value: f64 = driver.cell(row, error_quadratic).unwrap().parse().unwrap();
            assert!(value.abs() < 1e-6);
            let value: f64 = driver.cell(row, error_x).unwrap().parse().unwrap();
            assert!(value.abs() < 1e-6);
        }
        let model: f64 = driver.cell(1, model_x).unwrap().parse().unwrap();
        assert!((model - 110.0).abs() < 1e-6);
    }

    #[test]
    fn test_calculation_error_without_model() {
        let mut driver = GcpDriver::new(DriverLayout::Georeference, 1);
        driver.append_row();
        fill_row_georeference(&mut driver, 0);
        let error_x = driver.column_index("error_x").unwrap();
        assert_eq!(driver.cell(0, error_x), Some(CALCULATION_ERROR));
        assert_eq!(driver.rmse(), 0.0);
    }

    fn fill_row_georeference(driver: &mut GcpDriver, row: usize) {
        for (name, value) in [("pixel", "1"), ("line", "2"), ("x", "3"), ("y", "4")] {
            let column = driver.column_index(name).unwrap();
            assert!(driver.set_cell(row, column, value));
        }
    }

    #[test]
    fn test_pending_row_has_no_calculated_values_until_ready() {
        let mut driver = GcpDriver::new(DriverLayout::Georeference, 1);
        driver.append_row();
        let pixel = driver.column_index("pixel").unwrap();
        let error_quadratic = driver.column_index("error_quadratic").unwrap();
        driver.set_cell(0, pixel, "1");
        assert!(!driver.has_valid_calculation_data(error_quadratic, 0));
        assert_eq!(driver.cell(0, error_quadratic), Some(""));
        assert!(!driver.has_valid_calculation_data(pixel, 0));
    }

    #[test]
    fn test_disable_and_delete_refit() {
        let mut driver = GcpDriver::new(DriverLayout::Coregister, 1);
        let points = [
            ((0.0, 0.0), (0.0, 0.0)),
            ((10.0, 0.0), (10.0, 0.0)),
            ((0.0, 10.0), (0.0, 10.0)),
            ((10.0, 10.0), (13.0, 10.0)),
        ];
        for (row, (warp, base)) in points.iter().enumerate() {
            assert!(driver.append_row());
            fill_row(&mut driver, row, *warp, *base);
        }
        assert!(driver.rmse() > 0.0);
        assert_eq!(driver.gcp_list().enabled_count(), 4);

        assert!(driver.set_enabled(3, false));
        assert_eq!(driver.gcp_list().enabled_count(), 3);
        assert!(driver.rmse() < 1e-9);

        assert!(driver.delete_row(0));
        assert_eq!(driver.row_count(), 3);
        assert!(driver.transformation().is_none());
        assert!(driver.append_row());
    }

    #[test]
    fn test_load_gcps() {
        let mut list = GcpList::new();
        list.destination_srs_wkt = "LOCAL_CS[\"base\"]".to_string();
        for (s, d) in [((0.0, 0.0), (5.0, 5.0)), ((1.0, 0.0), (6.0, 5.0)), ((0.0, 1.0), (5.0, 6.0))] {
            list.add(GroundControlPointExtended::new(Coordinates::new(s.0, s.1), Coordinates::new(d.0, d.1)));
        }
        let mut driver = GcpDriver::new(DriverLayout::Coregister, 1);
        driver.load_gcps(&list);

        assert_eq!(driver.row_count(), 3);
        assert_eq!(driver.gcp_list(), &list);
        assert!(driver.transformation().is_some());
        let geometry_warp = driver.column_index("geometry_warp").unwrap();
        assert_eq!(driver.cell(2, geometry_warp), Some("POINT(0 1)"));
        assert!(driver.append_row());
    }

    #[test]
    fn test_parse_point_geometry() {
        assert_eq!(parse_point_geometry("POINT(1 2)"), Some((1.0, 2.0)));
        assert_eq!(parse_point_geometry("  point ( -1.5e2   3 ) "), Some((-150.0, 3.0)));
        assert_eq!(parse_point_geometry("POINT(1)"), None);
        assert_eq!(parse_point_geometry("POINT(a b)"), None);
    }
}
