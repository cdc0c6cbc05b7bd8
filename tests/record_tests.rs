//! Tests for record put/get
//!
//! These tests verify:
//! - Flat and nested records round-trip
//! - Sequence fields travel through indirections
//! - Layout of stored records
//! - Field matching by name (missing fields skipped, mismatches rejected)

use arrayvault::{record, Archive, MarshalError, TypeDescriptor};

// =============================================================================
// Record Declarations
// =============================================================================

record! {
    #[derive(Debug, Default, Clone, PartialEq)]
    pub struct Point {
        pub x: f64,
        pub y: f64,
    }
}

record! {
    #[derive(Debug, Default, Clone, PartialEq)]
    pub struct Track {
        pub id: u16,
        pub origin: Point,
        pub samples: Vec<f32>,
        pub flags: [u8; 3],
        pub tags: Vec<i64>,
    }
}

record! {
    #[derive(Debug, Default, Clone, PartialEq)]
    pub struct Survey {
        pub year: i32,
        pub primary: Track,
        pub backup: Track,
    }
}

record! {
    #[derive(Debug, Default, PartialEq)]
    pub struct WithPrivate {
        pub visible: i32,
        note: String,
        pub(crate) scratch: Vec<u8>,
    }
}

record! {
    #[derive(Debug, Default, PartialEq)]
    pub struct Renamed {
        pub visible: i32,
        pub extra: u64,
    }
}

record! {
    #[derive(Debug, Default, PartialEq)]
    pub struct WrongKind {
        pub visible: f32,
    }
}

record! {
    #[derive(Debug, Default, Clone, PartialEq)]
    pub struct Reading {
        pub a: i32,
        pub xs: Vec<f64>,
        pub b: i32,
    }
}

record! {
    #[derive(Debug, Default, Clone, PartialEq)]
    pub struct ReadingAsFloat {
        pub a: i32,
        pub xs: Vec<f64>,
        pub b: f32,
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

fn sample_track(id: u16, len: usize) -> Track {
    Track {
        id,
        origin: Point {
            x: id as f64,
            y: -(id as f64),
        },
        samples: (0..len).map(|i| i as f32 * 0.5).collect(),
        flags: [1, 2, id as u8],
        tags: (0..len as i64).rev().collect(),
    }
}

fn assert_no_open_handles(archive: &Archive) {
    assert_eq!(archive.store().open_type_count(), 0, "type handles leaked");
    assert_eq!(archive.store().open_array_count(), 0, "array handles leaked");
}

// =============================================================================
// Round Trip Tests
// =============================================================================

#[test]
fn test_flat_record_round_trip() {
    let archive = Archive::in_memory();
    let point = Point { x: 1.5, y: -2.5 };

    archive.put("p", &point).unwrap();
    let mut out = Point::default();
    archive.get("p", &mut out).unwrap();

    assert_eq!(out, point);
    assert_no_open_handles(&archive);
}

#[test]
fn test_record_with_sequences_round_trip() {
    let archive = Archive::in_memory();
    let track = sample_track(9, 5);

    archive.put("t", &track).unwrap();
    let mut out = Track::default();
    archive.get("t", &mut out).unwrap();

    assert_eq!(out, track);
    assert_no_open_handles(&archive);
}

#[test]
fn test_nested_records_round_trip() {
    let archive = Archive::in_memory();
    let survey = Survey {
        year: 2024,
        primary: sample_track(1, 3),
        backup: sample_track(2, 0),
    };

    archive.put("survey", &survey).unwrap();
    let mut out = Survey::default();
    archive.get("survey", &mut out).unwrap();

    assert_eq!(out, survey);
    assert_no_open_handles(&archive);
}

#[test]
fn test_destination_sequences_are_replaced() {
    let archive = Archive::in_memory();
    archive.put("t", &sample_track(3, 2)).unwrap();

    let mut out = sample_track(0, 40);
    archive.get("t", &mut out).unwrap();
    assert_eq!(out.samples.len(), 2);
    assert_eq!(out.tags, vec![1, 0]);
}

// =============================================================================
// Layout Tests
// =============================================================================

#[test]
fn test_stored_layout() {
    let archive = Archive::in_memory();
    archive.put("t", &sample_track(4, 2)).unwrap();

    let ty = archive.describe("t").unwrap();
    let offsets: Vec<(String, usize)> = match &ty {
        TypeDescriptor::Record { fields, .. } => {
            fields.iter().map(|f| (f.name.clone(), f.offset)).collect()
        }
        other => panic!("Expected record type, got {}", other),
    };

    assert_eq!(
        offsets,
        vec![
            ("id".to_string(), 0),
            ("origin".to_string(), 8),
            ("samples".to_string(), 24),
            ("flags".to_string(), 40),
            ("tags".to_string(), 48),
        ]
    );
    assert_eq!(ty.size(), 64);
    assert!(matches!(ty.field("samples").unwrap().ty, TypeDescriptor::VarLen(_)));
    assert!(matches!(ty.field("flags").unwrap().ty, TypeDescriptor::Array { .. }));
}

#[test]
fn test_record_matches_repr_c_for_plain_fields() {
    #[repr(C)]
    struct Native {
        a: i8,
        b: f64,
        c: i16,
    }

    record! {
        struct Plain {
            pub a: i8,
            pub b: f64,
            pub c: i16,
        }
    }

    let archive = Archive::in_memory();
    archive.put("n", &Plain { a: 1, b: 2.0, c: 3 }).unwrap();

    let ty = archive.describe("n").unwrap();
    assert_eq!(ty.size(), std::mem::size_of::<Native>());
    assert_eq!(ty.field("b").unwrap().offset, std::mem::offset_of!(Native, b));
    assert_eq!(ty.field("c").unwrap().offset, std::mem::offset_of!(Native, c));
}

#[test]
fn test_private_fields_not_stored() {
    let archive = Archive::in_memory();
    let value = WithPrivate {
        visible: 5,
        note: "local".to_string(),
        scratch: vec![1, 2, 3],
    };
    archive.put("w", &value).unwrap();

    let ty = archive.describe("w").unwrap();
    assert!(ty.field("visible").is_some());
    assert!(ty.field("note").is_none());
    assert!(ty.field("scratch").is_none());

    let mut out = WithPrivate::default();
    archive.get("w", &mut out).unwrap();
    assert_eq!(out.visible, 5);
    assert!(out.note.is_empty());
    assert!(out.scratch.is_empty());
}

// =============================================================================
// Field Matching Tests
// =============================================================================

#[test]
fn test_missing_fields_are_skipped() {
    let archive = Archive::in_memory();
    archive
        .put("w", &WithPrivate { visible: 8, ..Default::default() })
        .unwrap();

    let mut out = Renamed {
        visible: 0,
        extra: 99,
    };
    archive.get("w", &mut out).unwrap();
    assert_eq!(out, Renamed { visible: 8, extra: 99 });
    assert_no_open_handles(&archive);
}

#[test]
fn test_field_kind_mismatch() {
    let archive = Archive::in_memory();
    archive
        .put("w", &WithPrivate { visible: 8, ..Default::default() })
        .unwrap();

    let mut out = WrongKind::default();
    match archive.get("w", &mut out) {
        Err(MarshalError::TypeMismatch { field, found, .. }) => {
            assert_eq!(field, "w.visible");
            assert_eq!(found, "i32[1]");
        }
        other => panic!("Expected type mismatch, got {:?}", other),
    }
    assert_no_open_handles(&archive);
}

#[test]
fn test_late_field_mismatch_leaves_destination_untouched() {
    let archive = Archive::in_memory();
    archive
        .put("r", &Reading { a: 5, xs: vec![1.0, 2.0], b: 6 })
        .unwrap();

    let mut out = ReadingAsFloat {
        a: -1,
        xs: vec![9.0; 4],
        b: 0.5,
    };
    match archive.get("r", &mut out) {
        Err(MarshalError::TypeMismatch { field, .. }) => assert_eq!(field, "r.b"),
        other => panic!("Expected type mismatch, got {:?}", other),
    }

    assert_eq!(
        out,
        ReadingAsFloat {
            a: -1,
            xs: vec![9.0; 4],
            b: 0.5,
        }
    );
    assert_no_open_handles(&archive);
}

#[test]
fn test_nested_late_field_mismatch_leaves_destination_untouched() {
    record! {
        #[derive(Debug, Default, Clone, PartialEq)]
        struct Holder {
            pub head: u16,
            pub reading: Reading,
        }
    }

    record! {
        #[derive(Debug, Default, Clone, PartialEq)]
        struct HolderAsFloat {
            pub head: u16,
            pub reading: ReadingAsFloat,
        }
    }

    let archive = Archive::in_memory();
    let stored = Holder {
        head: 2,
        reading: Reading { a: 1, xs: vec![3.0], b: 4 },
    };
    archive.put("h", &stored).unwrap();

    let before = HolderAsFloat {
        head: 9,
        reading: ReadingAsFloat { a: 8, xs: vec![7.0, 7.0], b: 6.5 },
    };
    let mut out = before.clone();
    match archive.get("h", &mut out) {
        Err(MarshalError::TypeMismatch { field, .. }) => assert_eq!(field, "h.reading.b"),
        other => panic!("Expected type mismatch, got {:?}", other),
    }
    assert_eq!(out, before);
}

#[test]
fn test_record_into_sequence_fails() {
    let archive = Archive::in_memory();
    archive.put("p", &Point { x: 1.0, y: 2.0 }).unwrap();

    let mut out: Vec<f64> = Vec::new();
    let result = archive.get("p", &mut out);
    assert!(matches!(result, Err(MarshalError::TypeMismatch { .. })));
    assert_no_open_handles(&archive);
}

#[test]
fn test_sequence_into_record_fails() {
    let archive = Archive::in_memory();
    archive.put("v", &vec![1.0f64, 2.0]).unwrap();

    let mut out = Point::default();
    let result = archive.get("v", &mut out);
    assert!(matches!(result, Err(MarshalError::TypeMismatch { .. })));
    assert_eq!(out, Point::default());
}

#[test]
fn test_unsupported_field_rejected() {
    record! {
        struct Flagged {
            pub id: u32,
            pub on: bool,
        }
    }

    let archive = Archive::in_memory();
    let result = archive.put("f", &Flagged { id: 1, on: true });
    assert!(matches!(result, Err(MarshalError::UnsupportedType(_))));
    assert!(archive.is_empty());
    assert_no_open_handles(&archive);
}
