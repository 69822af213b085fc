//! Raster model parameters and their WKT encoding

use log::debug;

use crate::coordinate::Coordinates;
use crate::errors::{GeorefError, GeorefResult};
use crate::utils::wkt::{WktNode, WktValue};

/// Index of each coefficient inside the affine matrix
pub mod matrix_index {
    /// X of the origin
    pub const AX0: usize = 0;
    /// X increment per pixel
    pub const AXP: usize = 1;
    /// X increment per line
    pub const AXL: usize = 2;
    /// Y of the origin
    pub const AY0: usize = 3;
    /// Y increment per pixel
    pub const AYP: usize = 4;
    /// Y increment per line
    pub const AYL: usize = 5;
}

use matrix_index::*;

/// Pixel-size/rotation description of a raster model
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PixelModel {
    /// World size of one pixel along the raster rows
    pub pixel_size_x: f64,
    /// World size of one line (usually negative for north-up images)
    pub pixel_size_y: f64,
    /// Clockwise rotation in degrees around the tie point
    pub rotation_degrees: f64,
    /// Tie point in pixel/line space
    pub tie_point_pl: Coordinates,
    /// Tie point in world space
    pub tie_point_xy: Coordinates,
}

impl PixelModel {
    /// Affine matrix `[Ax0, AxP, AxL, Ay0, AyP, AyL]` for this pixel model
    pub fn to_matrix(&self) -> [f64; 6] {
        let theta = self.rotation_degrees.to_radians();
        let (sin, cos) = theta.sin_cos();

        let mut matrix = [0.0; 6];
        matrix[AXP] = self.pixel_size_x * cos;
        matrix[AXL] = self.pixel_size_y * sin;
        matrix[AYP] = -self.pixel_size_x * sin;
        matrix[AYL] = self.pixel_size_y * cos;
        matrix[AX0] = self.tie_point_xy.x - matrix[AXP] * self.tie_point_pl.x - matrix[AXL] * self.tie_point_pl.y;
        matrix[AY0] = self.tie_point_xy.y - matrix[AYP] * self.tie_point_pl.x - matrix[AYL] * self.tie_point_pl.y;
        matrix
    }

    fn is_valid(&self) -> bool {
        self.pixel_size_x.is_finite() && self.pixel_size_x != 0.0
            && self.pixel_size_y.is_finite() && self.pixel_size_y != 0.0
            && self.rotation_degrees.is_finite()
            && self.tie_point_pl.is_finite() && self.tie_point_xy.is_finite()
    }
}

/// Parameters of a raster spatial model
///
/// Either form may be present. When both are, a valid matrix wins over the
/// pixel model.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Parameters {
    /// Affine matrix `[Ax0, AxP, AxL, Ay0, AyP, AyL]`
    pub matrix: Option<[f64; 6]>,
    /// Pixel size / rotation / tie point description
    pub pixel_model: Option<PixelModel>,
}

impl Parameters {
    /// Parameters given as an affine matrix
    pub fn from_matrix(matrix: [f64; 6]) -> Self {
        Parameters { matrix: Some(matrix), pixel_model: None }
    }

    /// Parameters given as a pixel model
    pub fn from_pixel_model(pixel_model: PixelModel) -> Self {
        Parameters { matrix: None, pixel_model: Some(pixel_model) }
    }

    /// The effective affine matrix, if any form is valid
    pub fn effective_matrix(&self) -> Option<[f64; 6]> {
        if let Some(matrix) = self.matrix {
            if matrix.iter().all(|v| v.is_finite()) {
                return Some(matrix);
            }
            debug!("Ignoring non-finite affine matrix {:?}", matrix);
        }
        self.pixel_model.filter(PixelModel::is_valid).map(|pm| pm.to_matrix())
    }

    /// Collapse to matrix-only form, making the matrix authoritative
    pub fn resolved(&self) -> Option<Parameters> {
        self.effective_matrix().map(Parameters::from_matrix)
    }
}

/// Encode parameters as a `PARAM_MT["Affine", ...]` WKT string
pub fn parameters_to_wkt(parameters: &Parameters) -> GeorefResult<String> {
    let matrix = parameters.effective_matrix()
        .ok_or_else(|| GeorefError::Model("Parameters do not describe an affine model".to_string()))?;

    let mut root = WktNode::new("PARAM_MT");
    root.values.push(WktValue::Text("Affine".to_string()));
    root.values.push(parameter("num_row", 3.0));
    root.values.push(parameter("num_col", 3.0));
    root.values.push(parameter("elt_0_0", matrix[AXP]));
    root.values.push(parameter("elt_0_1", matrix[AXL]));
    root.values.push(parameter("elt_0_2", matrix[AX0]));
    root.values.push(parameter("elt_1_0", matrix[AYP]));
    root.values.push(parameter("elt_1_1", matrix[AYL]));
    root.values.push(parameter("elt_1_2", matrix[AY0]));

    Ok(root.to_string())
}

/// Decode a `PARAM_MT["Affine", ...]` WKT string into matrix parameters
///
/// Missing elements take the identity matrix value, as in the OGC
/// coordinate transformation WKT.
pub fn wkt_to_parameters(wkt: &str) -> GeorefResult<Parameters> {
    let root = WktNode::parse(wkt)?;
    if !root.keyword.eq_ignore_ascii_case("PARAM_MT") {
        return Err(GeorefError::Wkt(format!("Expected PARAM_MT, found {}", root.keyword)));
    }
    if !root.name().map(|n| n.eq_ignore_ascii_case("Affine")).unwrap_or(false) {
        return Err(GeorefError::Wkt("Only Affine raster models are supported".to_string()));
    }

    // elt_i_j for a 3x3 homogeneous matrix; the last row must stay 0 0 1
    let mut elements = [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]];
    for node in root.children().filter(|n| n.keyword.eq_ignore_ascii_case("PARAMETER")) {
        let name = node.name().unwrap_or_default();
        let value = node.numbers().first().copied()
            .ok_or_else(|| GeorefError::Wkt(format!("Parameter {} has no value", name)))?;

        if let Some(indices) = name.strip_prefix("elt_") {
            let mut parts = indices.split('_').map(|p| p.parse::<usize>());
            match (parts.next(), parts.next()) {
                (Some(Ok(row)), Some(Ok(col))) if row < 3 && col < 3 => elements[row][col] = value,
                _ => return Err(GeorefError::Wkt(format!("Invalid matrix element {}", name))),
            }
        } else if (name == "num_row" || name == "num_col") && value != 3.0 {
            return Err(GeorefError::Wkt(format!("Unsupported matrix size {}={}", name, value)));
        }
    }

    if elements[2] != [0.0, 0.0, 1.0] {
        return Err(GeorefError::Wkt("Raster model is not affine".to_string()));
    }

    let mut matrix = [0.0; 6];
    matrix[AXP] = elements[0][0];
    matrix[AXL] = elements[0][1];
    matrix[AX0] = elements[0][2];
    matrix[AYP] = elements[1][0];
    matrix[AYL] = elements[1][1];
    matrix[AY0] = elements[1][2];
    Ok(Parameters::from_matrix(matrix))
}

fn parameter(name: &str, value: f64) -> WktValue {
    let mut node = WktNode::new("PARAMETER");
    node.values.push(WktValue::Text(name.to_string()));
    node.values.push(WktValue::Number(value));
    WktValue::Node(node)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wkt_round_trip_is_exact() {
        let matrices = [
            [500000.0, 30.0, 0.0, 6200000.0, 0.0, -30.0],
            [-58.123456789, 0.000277777777, 1.5e-7, -34.987654321, -2.25e-7, -0.000277777777],
            [0.1, 1.0 / 3.0, -2.0 / 7.0, 1e300, 5e-300, -1.0],
        ];
        for matrix in matrices {
            let wkt = parameters_to_wkt(&Parameters::from_matrix(matrix)).unwrap();
            let decoded = wkt_to_parameters(&wkt).unwrap();
            assert_eq!(decoded.matrix, Some(matrix));
        }
    }

    #[test]
    fn test_matrix_wins_over_pixel_model() {
        let pixel_model = PixelModel {
            pixel_size_x: 10.0,
            pixel_size_y: -10.0,
            rotation_degrees: 0.0,
            tie_point_pl: Coordinates::new(0.0, 0.0),
            tie_point_xy: Coordinates::new(100.0, 200.0),
        };
        let matrix = [1.0, 2.0, 0.0, 3.0, 0.0, -2.0];
        let both = Parameters { matrix: Some(matrix), pixel_model: Some(pixel_model) };
        assert_eq!(both.effective_matrix(), Some(matrix));

        let only_pixel = Parameters::from_pixel_model(pixel_model);
        assert_eq!(only_pixel.effective_matrix(), Some([100.0, 10.0, 0.0, 200.0, -0.0, -10.0]));
    }

    #[test]
    fn test_rotation_is_clockwise_about_tie_point() {
        let pixel_model = PixelModel {
            pixel_size_x: 1.0,
            pixel_size_y: -1.0,
            rotation_degrees: 90.0,
            tie_point_pl: Coordinates::new(10.0, 10.0),
            tie_point_xy: Coordinates::new(1000.0, 1000.0),
        };
        let m = pixel_model.to_matrix();
        // the tie point maps onto itself
        let x = m[AX0] + m[AXP] * 10.0 + m[AXL] * 10.0;
        let y = m[AY0] + m[AYP] * 10.0 + m[AYL] * 10.0;
        assert!((x - 1000.0).abs() < 1e-9 && (y - 1000.0).abs() < 1e-9);
        // one pixel east of the tie point ends up one unit south after a clockwise quarter turn
        let x = m[AX0] + m[AXP] * 11.0 + m[AXL] * 10.0;
        let y = m[AY0] + m[AYP] * 11.0 + m[AYL] * 10.0;
        assert!((x - 1000.0).abs() < 1e-9 && (y - 999.0).abs() < 1e-9);
    }

    #[test]
    fn test_rejects_non_affine_wkt() {
        assert!(wkt_to_parameters("GEOGCS[\"WGS 84\"]").is_err());
        assert!(wkt_to_parameters("PARAM_MT[\"Affine\",PARAMETER[\"elt_2_0\",1]]").is_err());
        assert!(wkt_to_parameters("PARAM_MT[\"Affine\",PARAMETER[\"elt_5_0\",1]]").is_err());
        assert!(wkt_to_parameters("PARAM_MT[\"Projective\"]").is_err());
        assert_eq!(
            wkt_to_parameters("PARAM_MT[\"Affine\"]").unwrap().matrix,
            Some([0.0, 1.0, 0.0, 0.0, 0.0, 1.0])
        );
    }
}
