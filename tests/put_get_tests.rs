//! Tests for scalar and sequence put/get
//!
//! These tests verify:
//! - Round-trip of every supported scalar kind
//! - Round-trip of sequences of every element kind and length
//! - Dimension reversal for reshaped sequences
//! - Overwrite semantics
//! - Rejection of unsupported kinds and mismatched dimensions

use arrayvault::{Archive, ElementType, MarshalError, TypeDescriptor};

// =============================================================================
// Helper Functions
// =============================================================================

fn assert_no_open_handles(archive: &Archive) {
    assert_eq!(archive.store().open_type_count(), 0, "type handles leaked");
    assert_eq!(archive.store().open_array_count(), 0, "array handles leaked");
}

/// Put a value, get it into a default destination, compare
macro_rules! round_trip {
    ($archive:expr, $name:expr, $value:expr, $ty:ty) => {{
        let value: $ty = $value;
        $archive.put($name, &value).unwrap();
        let mut out: $ty = Default::default();
        $archive.get($name, &mut out).unwrap();
        assert_eq!(out, value, "round trip of {}", $name);
    }};
}

// =============================================================================
// Scalar Tests
// =============================================================================

#[test]
fn test_scalar_round_trip_all_kinds() {
    let archive = Archive::in_memory();

    round_trip!(archive, "i8", -12, i8);
    round_trip!(archive, "u8", 250, u8);
    round_trip!(archive, "i16", -3000, i16);
    round_trip!(archive, "u16", 60000, u16);
    round_trip!(archive, "i32", i32::MIN, i32);
    round_trip!(archive, "u32", u32::MAX, u32);
    round_trip!(archive, "i64", -(1 << 40), i64);
    round_trip!(archive, "u64", 1 << 63, u64);
    round_trip!(archive, "isize", -77, isize);
    round_trip!(archive, "usize", 77, usize);
    round_trip!(archive, "f32", 1.25, f32);
    round_trip!(archive, "f64", std::f64::consts::PI, f64);

    assert_eq!(archive.len(), 12);
    assert_no_open_handles(&archive);
}

#[test]
fn test_scalar_is_one_element_array() {
    let archive = Archive::in_memory();
    archive.put("x", &5u32).unwrap();

    assert_eq!(
        archive.describe("x").unwrap(),
        TypeDescriptor::Array {
            element: ElementType::U32,
            dims: vec![1]
        }
    );
    assert_eq!(archive.dimensions("x").unwrap(), vec![1]);
}

#[test]
fn test_platform_word_maps_to_pointer_width() {
    let archive = Archive::in_memory();
    archive.put("w", &1usize).unwrap();

    let expected = if cfg!(target_pointer_width = "64") {
        ElementType::U64
    } else {
        ElementType::U32
    };
    assert_eq!(archive.describe("w").unwrap().as_array(), Some((expected, 1)));
}

#[test]
fn test_unsupported_scalar_rejected() {
    let archive = Archive::in_memory();

    let result = archive.put("flag", &true);
    assert!(matches!(result, Err(MarshalError::UnsupportedType(_))));

    let result = archive.put("letter", &'a');
    assert!(matches!(result, Err(MarshalError::UnsupportedType(_))));

    assert!(archive.is_empty());
    assert_no_open_handles(&archive);
}

// =============================================================================
// Sequence Tests
// =============================================================================

#[test]
fn test_sequence_round_trip_all_lengths() {
    let archive = Archive::in_memory();

    for len in 0..12usize {
        round_trip!(archive, "i8", (0..len).map(|i| i as i8 - 5).collect(), Vec<i8>);
        round_trip!(archive, "u8", (0..len).map(|i| i as u8).collect(), Vec<u8>);
        round_trip!(archive, "i16", (0..len).map(|i| -(i as i16)).collect(), Vec<i16>);
        round_trip!(archive, "u16", (0..len).map(|i| i as u16 * 300).collect(), Vec<u16>);
        round_trip!(archive, "i32", (0..len).map(|i| i as i32 - 100).collect(), Vec<i32>);
        round_trip!(archive, "u32", (0..len).map(|i| i as u32 * 7).collect(), Vec<u32>);
        round_trip!(archive, "i64", (0..len).map(|i| i as i64 * -9).collect(), Vec<i64>);
        round_trip!(archive, "u64", (0..len).map(|i| (i as u64) << 33).collect(), Vec<u64>);
        round_trip!(archive, "f32", (0..len).map(|i| i as f32 / 4.0).collect(), Vec<f32>);
        round_trip!(archive, "f64", (0..len).map(|i| i as f64 * 1.5).collect(), Vec<f64>);
    }

    assert_no_open_handles(&archive);
}

#[test]
fn test_empty_sequence_clears_destination() {
    let archive = Archive::in_memory();
    archive.put("empty", &Vec::<f64>::new()).unwrap();

    let mut out = vec![1.0f64, 2.0];
    archive.get("empty", &mut out).unwrap();
    assert!(out.is_empty());
    assert_eq!(archive.dimensions("empty").unwrap(), vec![0]);
}

#[test]
fn test_slice_and_fixed_array_sources() {
    let archive = Archive::in_memory();
    let data = [3i16, 1, 4, 1, 5];

    archive.put("slice", &data[1..4]).unwrap();
    let mut out: Vec<i16> = Vec::new();
    archive.get("slice", &mut out).unwrap();
    assert_eq!(out, vec![1, 4, 1]);

    archive.put("fixed", &data).unwrap();
    let mut fixed = [0i16; 5];
    archive.get("fixed", &mut fixed).unwrap();
    assert_eq!(fixed, data);
}

#[test]
fn test_fixed_destination_length_must_match() {
    let archive = Archive::in_memory();
    archive.put("v", &vec![1u8, 2, 3]).unwrap();

    let mut short = [0u8; 2];
    let result = archive.get("v", &mut short);
    assert!(matches!(result, Err(MarshalError::DimensionMismatch(_))));
    assert_eq!(short, [0, 0]);
    assert_no_open_handles(&archive);
}

// =============================================================================
// Dimension Tests
// =============================================================================

#[test]
fn test_dimensions_reversed_at_store_boundary() {
    let archive = Archive::in_memory();
    let values: Vec<f64> = (0..24).map(|i| i as f64).collect();

    archive.put_with_dims("cube", &values, &[2, 3, 4]).unwrap();

    match archive.describe("cube").unwrap() {
        TypeDescriptor::Array { element, dims } => {
            assert_eq!(element, ElementType::F64);
            assert_eq!(dims, vec![4, 3, 2]);
        }
        other => panic!("Expected array type, got {}", other),
    }
    assert_eq!(archive.dimensions("cube").unwrap(), vec![2, 3, 4]);

    let mut flat: Vec<f64> = Vec::new();
    archive.get("cube", &mut flat).unwrap();
    assert_eq!(flat, values);
}

#[test]
fn test_dimension_mismatch_creates_nothing() {
    let archive = Archive::in_memory();
    let values: Vec<i32> = (0..10).collect();

    let result = archive.put_with_dims("bad", &values, &[3, 3]);
    assert!(matches!(result, Err(MarshalError::DimensionMismatch(_))));
    assert!(!archive.contains("bad"));

    let result = archive.put_with_dims("zero", &values, &[10, 0]);
    assert!(matches!(result, Err(MarshalError::DimensionMismatch(_))));
    assert!(archive.is_empty());
    assert_no_open_handles(&archive);
}

#[test]
fn test_dims_rejected_for_scalar() {
    let archive = Archive::in_memory();
    let result = archive.put_with_dims("s", &1.0f32, &[1]);
    assert!(matches!(result, Err(MarshalError::DimensionMismatch(_))));
    assert!(!archive.contains("s"));
}

// =============================================================================
// Overwrite and Lookup Tests
// =============================================================================

#[test]
fn test_overwrite_replaces_value_and_type() {
    let archive = Archive::in_memory();

    archive.put("x", &vec![1u8, 2, 3]).unwrap();
    archive.put("x", &2.5f64).unwrap();

    let mut out = 0.0f64;
    archive.get("x", &mut out).unwrap();
    assert_eq!(out, 2.5);
    assert_eq!(archive.names(), vec!["x".to_string()]);
    assert_no_open_handles(&archive);
}

#[test]
fn test_get_missing_array() {
    let archive = Archive::in_memory();
    let mut out = 0i32;

    let result = archive.get("nothing", &mut out);
    assert!(matches!(
        result,
        Err(MarshalError::StoreOperationFailed { operation: "open array", .. })
    ));
    assert_no_open_handles(&archive);
}

#[test]
fn test_get_wrong_element_kind() {
    let archive = Archive::in_memory();
    archive.put("v", &vec![1.0f32, 2.0]).unwrap();

    let mut out: Vec<f64> = vec![9.0];
    let result = archive.get("v", &mut out);
    assert!(matches!(result, Err(MarshalError::TypeMismatch { .. })));
    assert_eq!(out, vec![9.0]);
    assert_no_open_handles(&archive);
}

#[test]
fn test_delete() {
    let archive = Archive::in_memory();
    archive.put("a", &1u8).unwrap();
    archive.put("b", &2u8).unwrap();

    archive.delete("a").unwrap();
    assert_eq!(archive.names(), vec!["b".to_string()]);
    assert!(archive.delete("a").is_err());
}
