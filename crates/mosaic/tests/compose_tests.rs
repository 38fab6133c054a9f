//! Compositing behavior against a stub decoder.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use mosaic::{
    compose, Composite, CompositeBuilder, DecodedScan, Grid2d, MosaicError, QcRange,
    ScanDecoder,
};
use radar_common::ElevationAngle;

const NAN: f32 = f32::NAN;

fn angle(deg: f64) -> ElevationAngle {
    ElevationAngle::from_degrees(deg).unwrap()
}

fn scan_2x2(values: [f32; 4]) -> DecodedScan {
    DecodedScan {
        reflectivity: Grid2d::from_vec(2, 2, values.to_vec()).unwrap(),
        latitude: Grid2d::from_vec(2, 2, vec![40.0, 40.0, 39.99, 39.99]).unwrap(),
        longitude: Grid2d::from_vec(2, 2, vec![230.0, 230.01, 230.0, 230.01]).unwrap(),
        valid_min: -30.0,
        valid_max: 80.0,
    }
}

fn cells(composite: &Composite) -> Vec<f32> {
    composite.reflectivity.as_slice().to_vec()
}

/// Stub for the external binary decoder: canned scans keyed by path.
struct StubDecoder {
    scans: BTreeMap<PathBuf, DecodedScan>,
}

impl StubDecoder {
    fn new(scans: impl IntoIterator<Item = (PathBuf, DecodedScan)>) -> Self {
        Self {
            scans: scans.into_iter().collect(),
        }
    }
}

impl ScanDecoder for StubDecoder {
    fn decode(&self, path: &Path) -> Result<DecodedScan, MosaicError> {
        self.scans
            .get(path)
            .cloned()
            .ok_or_else(|| MosaicError::Decode(format!("corrupt file: {}", path.display())))
    }
}

#[test]
fn lower_elevation_wins_and_gaps_fill_from_above() {
    let mut builder = CompositeBuilder::new(QcRange::default());
    builder
        .fold(angle(0.5), scan_2x2([5.0, NAN, NAN, 10.0]))
        .unwrap();
    builder
        .fold(angle(1.0), scan_2x2([NAN, 7.0, 3.0, NAN]))
        .unwrap();

    let composite = builder.finish().unwrap();
    assert_eq!(cells(&composite), vec![5.0, 7.0, 3.0, 10.0]);
    assert_eq!(composite.elevations, vec![angle(0.5), angle(1.0)]);
}

#[test]
fn populated_cells_never_overwritten_by_higher_layers() {
    let mut builder = CompositeBuilder::new(QcRange::default());
    builder
        .fold(angle(0.5), scan_2x2([5.0, NAN, NAN, 10.0]))
        .unwrap();
    builder
        .fold(angle(1.0), scan_2x2([99.0, 7.0, 3.0, 99.0]))
        .unwrap();
    // A third layer only reaches the one cell still missing after layer two
    builder
        .fold(angle(1.5), scan_2x2([50.0, 50.0, 50.0, 50.0]))
        .unwrap();

    let composite = builder.finish().unwrap();
    assert_eq!(cells(&composite), vec![5.0, 7.0, 3.0, 10.0]);
}

#[test]
fn cells_missing_everywhere_stay_missing() {
    let mut builder = CompositeBuilder::new(QcRange::default());
    builder
        .fold(angle(0.5), scan_2x2([5.0, NAN, NAN, NAN]))
        .unwrap();
    builder
        .fold(angle(1.0), scan_2x2([NAN, 7.0, NAN, NAN]))
        .unwrap();

    let composite = builder.finish().unwrap();
    assert_eq!(composite.valid_cells(), 2);
    assert!(composite.reflectivity.get(1, 0).unwrap().is_nan());
    assert!(composite.reflectivity.get(1, 1).unwrap().is_nan());
}

#[test]
fn quality_control_runs_before_the_fill() {
    let mut builder = CompositeBuilder::new(QcRange::default());
    // 85 is outside [-30, 80] and must behave like a gap; -30 is a valid
    // boundary value and must survive.
    builder
        .fold(angle(0.5), scan_2x2([85.0, -30.0, NAN, 10.0]))
        .unwrap();
    builder
        .fold(angle(1.0), scan_2x2([12.0, 99.0, 3.0, NAN]))
        .unwrap();

    let composite = builder.finish().unwrap();
    assert_eq!(cells(&composite), vec![12.0, -30.0, 3.0, 10.0]);
}

#[test]
fn longitudes_normalize_to_signed_convention() {
    let mut builder = CompositeBuilder::new(QcRange::default());
    builder
        .fold(angle(0.5), scan_2x2([5.0, 6.0, 7.0, 8.0]))
        .unwrap();

    let composite = builder.finish().unwrap();
    for lon in composite.longitude.as_slice() {
        assert!((-180.0..=180.0).contains(lon), "longitude {lon} not normalized");
    }
    assert!((composite.longitude.get(0, 0).unwrap() - -130.0).abs() < 1e-9);
}

#[test]
fn shape_mismatch_is_fatal_for_the_cycle() {
    let mut builder = CompositeBuilder::new(QcRange::default());
    builder
        .fold(angle(0.5), scan_2x2([5.0, NAN, NAN, 10.0]))
        .unwrap();

    let narrow = DecodedScan {
        reflectivity: Grid2d::from_vec(1, 2, vec![1.0, 2.0]).unwrap(),
        latitude: Grid2d::from_vec(1, 2, vec![40.0, 40.0]).unwrap(),
        longitude: Grid2d::from_vec(1, 2, vec![230.0, 230.01]).unwrap(),
        valid_min: -30.0,
        valid_max: 80.0,
    };
    assert!(matches!(
        builder.fold(angle(1.0), narrow),
        Err(MosaicError::ShapeMismatch { .. })
    ));
}

#[test]
fn out_of_order_layers_rejected() {
    let mut builder = CompositeBuilder::new(QcRange::default());
    builder
        .fold(angle(1.0), scan_2x2([5.0, NAN, NAN, 10.0]))
        .unwrap();
    assert!(matches!(
        builder.fold(angle(0.5), scan_2x2([1.0, 2.0, 3.0, 4.0])),
        Err(MosaicError::OutOfOrderLayer { .. })
    ));
}

#[test]
fn empty_builder_fails() {
    let builder = CompositeBuilder::new(QcRange::default());
    assert!(matches!(builder.finish(), Err(MosaicError::NoLayers)));
}

#[test]
fn compose_walks_paths_ascending_and_skips_decode_failures() {
    let decoder = StubDecoder::new([
        (PathBuf::from("low.grib2"), scan_2x2([5.0, NAN, NAN, 10.0])),
        (PathBuf::from("high.grib2"), scan_2x2([NAN, 7.0, 3.0, NAN])),
    ]);

    let mut paths = BTreeMap::new();
    paths.insert(angle(0.5), PathBuf::from("low.grib2"));
    paths.insert(angle(1.0), PathBuf::from("corrupt.grib2")); // decode fails
    paths.insert(angle(1.5), PathBuf::from("high.grib2"));

    let composite = compose(&decoder, &paths, QcRange::default()).unwrap();
    assert_eq!(cells(&composite), vec![5.0, 7.0, 3.0, 10.0]);
    assert_eq!(composite.elevations, vec![angle(0.5), angle(1.5)]);
}

#[test]
fn compose_single_layer_degenerate_case() {
    let decoder = StubDecoder::new([(
        PathBuf::from("only.grib2"),
        scan_2x2([85.0, 6.0, NAN, 8.0]),
    )]);

    let mut paths = BTreeMap::new();
    paths.insert(angle(0.5), PathBuf::from("only.grib2"));

    let composite = compose(&decoder, &paths, QcRange::default()).unwrap();
    // Still QC'd and normalized
    assert!(composite.reflectivity.get(0, 0).unwrap().is_nan());
    assert_eq!(composite.reflectivity.get(0, 1), Some(&6.0));
    assert!(*composite.longitude.get(0, 0).unwrap() < 0.0);
}

#[test]
fn compose_with_nothing_decodable_fails() {
    let decoder = StubDecoder::new([]);
    let mut paths = BTreeMap::new();
    paths.insert(angle(0.5), PathBuf::from("corrupt.grib2"));

    assert!(matches!(
        compose(&decoder, &paths, QcRange::default()),
        Err(MosaicError::NoLayers)
    ));
}
