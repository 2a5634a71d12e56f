use focuskit_core::{HeightSurface, JsonSurfaceStore, SurfaceError, SurfacePoint, SurfaceStore};
use proptest::prelude::*;

fn scanned(width: u32, height: u32, step: u32) -> HeightSurface {
    let mut surface = HeightSurface::create_zero_surface(width, height, step, 0).unwrap();
    for i in 0..surface.len() {
        surface.update_point(i, SurfacePoint::new(0.0, 0.0, i as f32 * 0.25));
    }
    surface.sort_points();
    surface
}

#[test]
fn test_save_then_load_reproduces_surface() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("surface.json");
    let surface = scanned(40, 30, 10);

    surface.save_to_file(&path).unwrap();
    let loaded = HeightSurface::load_from_file(&path).unwrap();

    assert_eq!(loaded.points(), surface.points());
    assert_eq!(loaded.sorted().unwrap(), surface.sorted().unwrap());
    assert_eq!((loaded.rows(), loaded.cols()), (4, 5));
}

#[test]
fn test_persisted_format_is_flat_point_array() {
    let surface = scanned(10, 0, 10);
    assert_eq!(
        surface.to_json().unwrap(),
        r#"[{"x":0.0,"y":0.0,"z":0.0},{"x":10.0,"y":0.0,"z":0.25}]"#
    );
}

#[test]
fn test_store_creates_parent_directory() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = JsonSurfaceStore::new(dir.path().join("machines/laser-1/surface.json"));
    store.save(&scanned(20, 10, 10)).unwrap();
    let loaded = store.load().unwrap();
    assert!(loaded.is_sorted());
    assert_eq!(loaded.len(), 6);
}

#[test]
fn test_load_missing_file_is_persistence_failure() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = JsonSurfaceStore::new(dir.path().join("missing.json"));
    let err = store.load().unwrap_err();
    assert!(err.is_persistence_failure());
}

#[test]
fn test_load_garbage_is_persistence_failure() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("surface.json");
    std::fs::write(&path, "{not json").unwrap();
    assert!(matches!(
        HeightSurface::load_from_file(&path),
        Err(SurfaceError::Json(_))
    ));
}

#[test]
fn test_failed_save_keeps_previous_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("surface.json");
    scanned(20, 10, 10).save_to_file(&path).unwrap();

    // a directory squatting on the temp name makes the next save fail
    std::fs::create_dir(dir.path().join("surface.json.tmp")).unwrap();
    assert!(scanned(40, 10, 10).save_to_file(&path).is_err());

    let loaded = HeightSurface::load_from_file(&path).unwrap();
    assert_eq!(loaded.len(), 6);
}

#[test]
fn test_interpolation_after_load() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("surface.json");
    let surface = scanned(20, 10, 10);
    surface.save_to_file(&path).unwrap();
    let loaded = HeightSurface::load_from_file(&path).unwrap();

    for (x, y) in [(0.0, 0.0), (5.0, 5.0), (17.5, 2.5), (20.0, 10.0)] {
        assert_eq!(loaded.interpolate(x, y).unwrap(), surface.interpolate(x, y).unwrap());
    }
}

proptest! {
    #[test]
    fn prop_sort_points_is_idempotent(cols in 1u32..8, rows in 1u32..8, step in 1u32..20) {
        let mut surface = scanned((cols - 1) * step, (rows - 1) * step, step);
        let once = surface.sorted().unwrap().to_vec();
        surface.sort_points();
        prop_assert_eq!(surface.sorted().unwrap(), once.as_slice());
    }

    #[test]
    fn prop_sorted_is_row_major(cols in 1u32..8, rows in 1u32..8, step in 1u32..20) {
        let surface = scanned((cols - 1) * step, (rows - 1) * step, step);
        let sorted = surface.sorted().unwrap();
        for row in sorted.chunks(surface.cols()) {
            prop_assert!(row.windows(2).all(|w| w[0].x < w[1].x && w[0].y == w[1].y));
        }
        prop_assert!(sorted.windows(2).all(|w| w[0].y <= w[1].y));
    }
}
