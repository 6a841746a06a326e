//! Tests for coordinate references and views

use super::*;

fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 1e-9,
        "expected {} but got {}",
        expected,
        actual
    );
}

#[test]
fn test_identity_is_noop() {
    let crs = CoordinateReference::identity();
    assert_close(crs.block_x(12.5), 12.5);
    assert_close(crs.native_z(-3.0), -3.0);
}

#[test]
fn test_scale_and_offset_maps_into_block_space() {
    // 4 blocks per native cell, native origin shifted by -10 cells
    let crs = CoordinateReference::scale_and_offset(4.0, 2.0, -10.0, 5.0);

    assert_close(crs.block_x(10.0), 0.0);
    assert_close(crs.block_x(11.0), 4.0);
    assert_close(crs.block_z(0.0), 10.0);
    assert_close(crs.native_x(4.0), 11.0);
    assert_close(crs.native_z(10.0), 0.0);
}

#[test]
fn test_invalid_scale_is_rejected() {
    let result = CoordinateReference::try_scale_and_offset(0.0, 1.0, 0.0, 0.0);
    assert!(matches!(result, Err(CoordError::InvalidScale(_))));

    let result = CoordinateReference::try_scale_and_offset(1.0, f64::NAN, 0.0, 0.0);
    assert!(matches!(result, Err(CoordError::InvalidScale(_))));

    let result = CoordinateReference::try_scale_and_offset(1.0, 1.0, f64::INFINITY, 0.0);
    assert!(matches!(result, Err(CoordError::InvalidOffset(_))));
}

#[test]
#[should_panic(expected = "Invalid scale")]
fn test_zero_scale_panics() {
    let _ = CoordinateReference::scale(0.0, 1.0);
}

#[test]
fn test_inverse_undoes_transform() {
    let crs = CoordinateReference::scale_and_offset(3.7, 0.25, -2160.0, 1080.0);
    let roundtrip = crs.compose(&crs.inverse());
    assert!(roundtrip.approx_eq(&CoordinateReference::identity(), 1e-12));
}

#[test]
fn test_compose_is_associative() {
    let a = CoordinateReference::scale_and_offset(2.0, 3.0, 1.0, -4.0);
    let b = CoordinateReference::scale_and_offset(0.5, 7.0, -3.0, 2.5);
    let c = CoordinateReference::scale_and_offset(11.0, 0.1, 8.0, 0.0);

    let left = a.compose(&b).compose(&c);
    let right = a.compose(&b.compose(&c));
    assert!(left.approx_eq(&right, 1e-9));
}

#[test]
fn test_coordinate_roundtrip_between_references() {
    let landcover = CoordinateReference::scale_and_offset(3.09, 3.09, -64800.0, -32400.0);
    let climate = CoordinateReference::scale_and_offset(92.7, 92.7, -2160.0, -1080.0);

    let original = Coordinate::block(1234.5, -987.25);
    let through = original.to(&landcover).to(&climate);
    let back = through.to(&CoordinateReference::identity());

    assert!(original.approx_eq(&back, 1e-6));
    assert_close(back.x(), 1234.5);
}

#[test]
fn test_coordinate_to_preserves_block_position() {
    let crs = CoordinateReference::scale_and_offset(0.5, 0.5, 8.0, 8.0);
    let coordinate = Coordinate::new(crs, 3.0, 1.0);
    let block = coordinate.to(&CoordinateReference::identity());

    assert_close(block.x(), 5.5);
    assert_close(block.z(), 4.5);
    assert!(coordinate.approx_eq(&block, 1e-12));
}

#[test]
fn test_coordinate_min_max_across_references() {
    let crs = CoordinateReference::scale(2.0, 2.0);
    let a = Coordinate::block(10.0, 2.0);
    let b = Coordinate::new(crs, 1.0, 4.0); // block (2, 8)

    let min = a.min(&b);
    let max = a.max(&b);
    assert_close(min.x(), 2.0);
    assert_close(min.z(), 2.0);
    assert_close(max.x(), 10.0);
    assert_close(max.z(), 8.0);
}

#[test]
fn test_view_grow() {
    let view = DataView::square(0, 0, 16);
    let grown = view.grow(1, 2, 3, 4);

    assert_eq!(grown, DataView::rect(-1, -2, 20, 22));

    let shrunk = view.grow(-10, 0, -10, 0);
    assert_eq!(shrunk.width(), 0);
    assert!(shrunk.is_empty());
}

#[test]
fn test_view_intersect() {
    let a = DataView::rect(0, 0, 10, 10);
    let b = DataView::rect(5, -5, 10, 10);

    assert_eq!(a.intersect(&b), Some(DataView::rect(5, 0, 5, 5)));
    assert_eq!(a.intersect(&DataView::rect(10, 0, 4, 4)), None);
}

#[test]
fn test_view_corners() {
    let view = DataView::rect(-16, 32, 16, 8);
    assert_close(view.min_coordinate().x(), -16.0);
    assert_close(view.max_coordinate().x(), 0.0);
    assert_close(view.max_coordinate().z(), 40.0);
    assert!(view.contains(-1, 39));
    assert!(!view.contains(0, 39));
}

#[test]
fn test_column_view() {
    let view = DataView::of_column(ColumnPos::new(-1, 2));
    assert_eq!(view, DataView::square(-16, 32, 16));
    assert_eq!(ColumnPos::containing_block(-1, 47), ColumnPos::new(-1, 2));
}

#[test]
fn test_tiles_covering_orders_corners() {
    let crs = CoordinateReference::scale(1.0, -1.0);
    let view = DataView::rect(0, 0, 20, 20);

    let (min, max) = tiles_covering(&view, &crs, 10.0, 10.0);
    assert!(min.tile_x <= max.tile_x);
    assert!(min.tile_z <= max.tile_z);
    assert_eq!(min, DataTilePos::new(0, -2));
    assert_eq!(max, DataTilePos::new(2, 0));
}

#[test]
fn test_tile_component_min_max_mixes_axes() {
    let a = DataTilePos::new(0, 5);
    let b = DataTilePos::new(3, 1);

    assert_eq!(a.component_min(&b), DataTilePos::new(0, 1));
    assert_eq!(a.component_max(&b), DataTilePos::new(3, 5));
    assert_eq!(b.component_min(&a), DataTilePos::new(0, 1));
}
