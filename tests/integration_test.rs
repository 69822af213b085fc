//! End-to-end tests for the georeference and reprojection pipeline

use approx::assert_abs_diff_eq;

use georefkit::coordinate::{is_same_reference, wgs84_to_web_mercator, Coordinates, SrsCatalog};
use georefkit::gcp::{GcpList, GroundControlPointExtended, TextFileGcpLoader};
use georefkit::raster::gtiff::GeoTiffReader;
use georefkit::raster::{DataType, Dataset, RasterDriver};
use georefkit::warp::{keys, GeoreferenceProcess, Process, ProcessHistory, ReprojectionProcess};

fn gradient(width: usize, height: usize) -> Dataset {
    let mut dataset = Dataset::new(width, height, 1, DataType::Byte);
    let band = dataset.band_mut(0).unwrap();
    for (i, value) in band.data_mut().iter_mut().enumerate() {
        *value = (i % 251) as f64;
    }
    dataset
}

#[test]
fn test_hand_built_tiff() {
    let mut buffer = Vec::new();

    // TIFF header (little-endian)
    buffer.extend_from_slice(b"II");
    buffer.extend_from_slice(&[42, 0]);
    buffer.extend_from_slice(&[8, 0, 0, 0]);

    // IFD with six entries, image data right after it at offset 86
    buffer.extend_from_slice(&[6, 0]);
    buffer.extend_from_slice(&[0, 1, 3, 0, 1, 0, 0, 0, 2, 0, 0, 0]);  // ImageWidth = 2
    buffer.extend_from_slice(&[1, 1, 3, 0, 1, 0, 0, 0, 2, 0, 0, 0]);  // ImageLength = 2
    buffer.extend_from_slice(&[2, 1, 3, 0, 1, 0, 0, 0, 8, 0, 0, 0]);  // BitsPerSample = 8
    buffer.extend_from_slice(&[17, 1, 4, 0, 1, 0, 0, 0, 86, 0, 0, 0]); // StripOffsets
    buffer.extend_from_slice(&[22, 1, 3, 0, 1, 0, 0, 0, 2, 0, 0, 0]); // RowsPerStrip = 2
    buffer.extend_from_slice(&[23, 1, 4, 0, 1, 0, 0, 0, 4, 0, 0, 0]); // StripByteCounts = 4
    buffer.extend_from_slice(&[0, 0, 0, 0]);
    assert_eq!(buffer.len(), 86);
    buffer.extend_from_slice(&[10, 20, 30, 40]);

    let dataset = GeoTiffReader::read_bytes(buffer).unwrap();
    assert_eq!((dataset.width(), dataset.height()), (2, 2));
    assert_eq!(dataset.data_type(), DataType::Byte);
    assert_eq!(dataset.band(0).unwrap().data(), &[10.0, 20.0, 30.0, 40.0]);
    assert!(dataset.geotransform().is_none());
    assert!(dataset.gcps().is_empty());
}

#[test]
fn test_identity_reprojection_keeps_grid() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("input.tif");
    let output = dir.path().join("output.tif");
    let mercator = SrsCatalog::lookup(3857).unwrap().wkt;

    let mut source = gradient(20, 10);
    source.set_geotransform([500000.0, 10.0, 0.0, 4000000.0, 0.0, -10.0]);
    source.srs_wkt = mercator.clone();
    RasterDriver::by_name("GTiff").unwrap().create_copy(&source, &input).unwrap();

    let mut process = ReprojectionProcess::new(&input, &output, "");
    let mut reports = Vec::new();
    process.run(&mut |p| reports.push(p)).unwrap();
    assert_eq!(reports.last().copied(), Some(1.0));
    assert!(reports.windows(2).all(|w| w[0] <= w[1]));

    let warped = RasterDriver::open(&output).unwrap();
    assert_eq!((warped.width(), warped.height()), (20, 10));
    let gt = warped.geotransform().unwrap();
    for (actual, expected) in gt.iter().zip([500000.0, 10.0, 0.0, 4000000.0, 0.0, -10.0]) {
        assert_abs_diff_eq!(*actual, expected, epsilon = 1e-6);
    }
    assert!(is_same_reference(&warped.srs_wkt, &mercator));
    assert_eq!(warped.band(0).unwrap().data(), source.band(0).unwrap().data());

    let history = ProcessHistory::from_dataset(&warped).unwrap().unwrap();
    assert_eq!(history.name, "Reproyeccion");
    assert_eq!(history.get(keys::PIXELS), Some("20"));
    assert_eq!(history.get(keys::LINES), Some("10"));
}

#[test]
fn test_georeference_from_gcp_file() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("scan.tif");
    let output = dir.path().join("scan_geo.tif");
    let gcp_file = dir.path().join("scan.gcp");
    let mercator = SrsCatalog::lookup(3857).unwrap().wkt;

    RasterDriver::by_name("GTiff").unwrap().create_copy(&gradient(100, 50), &input).unwrap();

    let mut list = GcpList::new();
    list.destination_srs_wkt = mercator.clone();
    for (px, py) in [(0.0, 0.0), (100.0, 0.0), (0.0, 50.0), (100.0, 50.0), (50.0, 25.0)] {
        list.add(GroundControlPointExtended::new(
            Coordinates::new(px, py),
            Coordinates::new(1000.0 + px * 2.0, 2000.0 - py * 2.0),
        ));
    }
    // Outlier that must not take part in the fit
    list.add(GroundControlPointExtended::with_enabled(
        Coordinates::new(10.0, 10.0),
        Coordinates::new(0.0, 0.0),
        false,
    ));
    TextFileGcpLoader::save(&gcp_file, &list).unwrap();

    let mut process = GeoreferenceProcess::new(&input, &output, &gcp_file);
    assert!(process.execute());

    let warped = RasterDriver::open(&output).unwrap();
    assert_eq!((warped.width(), warped.height()), (100, 50));
    let gt = warped.geotransform().unwrap();
    assert_abs_diff_eq!(gt[0], 1000.0, epsilon = 1e-6);
    assert_abs_diff_eq!(gt[1], 2.0, epsilon = 1e-6);
    assert_abs_diff_eq!(gt[3], 2000.0, epsilon = 1e-6);
    assert_abs_diff_eq!(gt[5], -2.0, epsilon = 1e-6);
    assert!(is_same_reference(&warped.srs_wkt, &mercator));
    assert_eq!(warped.band(0).unwrap().get(7, 3), Some(((3 * 100 + 7) % 251) as f64));

    let history = ProcessHistory::from_dataset(&warped).unwrap().unwrap();
    assert_eq!(history.name, "Georreferenciacion");
    assert_eq!(history.get(keys::ORDER), Some("1"));
    let rmse: f64 = history.get(keys::RMSE).unwrap().parse().unwrap();
    assert!(rmse < 1e-6);
}

#[test]
fn test_georeference_into_other_reference() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("scan.tif");
    let output = dir.path().join("scan_3857.tif");
    let gcp_file = dir.path().join("scan.gcp");
    let geographic = SrsCatalog::lookup(4326).unwrap().wkt;
    let mercator = SrsCatalog::lookup(3857).unwrap().wkt;

    RasterDriver::by_name("GTiff").unwrap().create_copy(&gradient(100, 50), &input).unwrap();

    // Control points in degrees, output requested in meters
    let mut list = GcpList::new();
    list.destination_srs_wkt = geographic.clone();
    for (px, py) in [(0.0, 0.0), (100.0, 0.0), (0.0, 50.0), (100.0, 50.0), (50.0, 25.0)] {
        list.add(GroundControlPointExtended::new(
            Coordinates::new(px, py),
            Coordinates::new(10.0 + px * 0.01, 20.0 - py * 0.01),
        ));
    }
    TextFileGcpLoader::save(&gcp_file, &list).unwrap();

    let mut process = GeoreferenceProcess::new(&input, &output, &gcp_file);
    process.parameters.set_sr_wkt_out(&mercator);
    process.run(&mut |_| {}).unwrap();

    let warped = RasterDriver::open(&output).unwrap();
    assert!(is_same_reference(&warped.srs_wkt, &mercator));
    assert!(!is_same_reference(&warped.srs_wkt, &geographic));

    let corner = wgs84_to_web_mercator(10.0, 20.0);
    let gt = warped.geotransform().unwrap();
    assert_abs_diff_eq!(gt[0], corner.x, epsilon = 1e-3);
    assert_abs_diff_eq!(gt[3], corner.y, epsilon = 1e-3);
    // 0.01 degrees is roughly 1.1 km
    assert!(gt[1] > 1000.0 && gt[1] < 1200.0);
    assert!(gt[5] < 0.0);

    let far = wgs84_to_web_mercator(11.0, 19.5);
    assert!(gt[0] + warped.width() as f64 * gt[1] >= far.x - 1e-3);
    assert!(gt[3] + warped.height() as f64 * gt[5] <= far.y + 1e-3);
}

#[test]
fn test_georeference_needs_enough_points() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("scan.tif");
    let output = dir.path().join("scan_geo.tif");
    let gcp_file = dir.path().join("scan.gcp");

    RasterDriver::by_name("GTiff").unwrap().create_copy(&gradient(10, 10), &input).unwrap();
    let mut list = GcpList::new();
    for (px, py) in [(0.0, 0.0), (10.0, 0.0), (0.0, 10.0)] {
        list.add(GroundControlPointExtended::new(Coordinates::new(px, py), Coordinates::new(px, -py)));
    }
    TextFileGcpLoader::save(&gcp_file, &list).unwrap();

    let mut process = GeoreferenceProcess::new(&input, &output, &gcp_file);
    process.parameters.order = 2;
    assert!(process.run(&mut |_| {}).is_err());
    assert!(!output.exists());
}

#[test]
fn test_reprojection_to_png_drops_georeferencing() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("input.tif");
    let output = dir.path().join("output.png");

    let mut source = gradient(8, 8);
    source.set_geotransform([0.0, 1.0, 0.0, 8.0, 0.0, -1.0]);
    RasterDriver::by_name("GTiff").unwrap().create_copy(&source, &input).unwrap();

    let mut process = ReprojectionProcess::new(&input, &output, "");
    process.parameters.output_format = RasterDriver::Png;
    process.parameters.width = Some(4);
    process.run(&mut |_| {}).unwrap();

    let png = RasterDriver::open(&output).unwrap();
    assert_eq!((png.width(), png.height()), (4, 4));
    assert!(png.geotransform().is_none());
}
