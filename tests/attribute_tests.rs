//! Tests for typed attribute reads

use gridfold::attributes::{
    get, AttributeClass, AttributeData, AttributeMap, AttributeSource, RawAttribute,
};
use gridfold::errors::{GridFoldError, Result};
use netcdf::{create, open};
use tempfile::tempdir;

fn block() -> AttributeMap {
    AttributeMap::new("block")
        .with("origin", AttributeData::F64(vec![0.5, 1.5, 2.5]))
        .with("iorigin", AttributeData::I32(vec![1, 2, 3]))
        .with("units", AttributeData::Text(vec!["m".to_string()]))
}

#[test]
fn test_vector_read() -> Result<()> {
    let origin: Vec<f64> = get(&block(), "origin")?;
    assert_eq!(origin, vec![0.5, 1.5, 2.5]);

    let iorigin: Vec<i32> = get(&block(), "iorigin")?;
    assert_eq!(iorigin, vec![1, 2, 3]);
    Ok(())
}

#[test]
fn test_array_read() -> Result<()> {
    let origin: [f64; 3] = get(&block(), "origin")?;
    assert_eq!(origin, [0.5, 1.5, 2.5]);

    let iorigin: [i32; 3] = get(&block(), "iorigin")?;
    assert_eq!(iorigin, [1, 2, 3]);
    Ok(())
}

#[test]
fn test_missing_attribute() {
    match get::<Vec<f64>, _>(&block(), "delta") {
        Err(GridFoldError::AttributeNotFound { attribute, location }) => {
            assert_eq!(attribute, "delta");
            assert_eq!(location, "block");
        }
        other => panic!("Expected AttributeNotFound error, got {other:?}"),
    }
}

#[test]
fn test_declared_extent_disagrees_with_byte_size() {
    let mut attrs = AttributeMap::new("block");
    attrs.insert(RawAttribute::with_extent(
        "origin",
        AttributeData::F64(vec![0.0, 0.0, 0.0]),
        4,
    ));

    match get::<Vec<f64>, _>(&attrs, "origin") {
        Err(GridFoldError::SizeMismatch {
            count,
            recorded,
            expected,
            ..
        }) => {
            assert_eq!(count, 3);
            assert_eq!(recorded, 4);
            assert_eq!(expected, None);
        }
        other => panic!("Expected SizeMismatch error, got {other:?}"),
    }
}

#[test]
fn test_array_length_must_match() {
    let attrs = AttributeMap::new("block").with("origin", AttributeData::F64(vec![0.0; 4]));

    // the vector form accepts any consistent length
    assert_eq!(get::<Vec<f64>, _>(&attrs, "origin").map(|v| v.len()).ok(), Some(4));

    match get::<[f64; 3], _>(&attrs, "origin") {
        Err(e @ GridFoldError::SizeMismatch { .. }) => {
            let message = e.to_string();
            assert!(message.contains("'origin' on 'block'"), "{message}");
            assert!(message.contains("requested datatype is 4"), "{message}");
            assert!(message.contains("recorded size is 4 (expected 3)"), "{message}");
        }
        other => panic!("Expected SizeMismatch error, got {other:?}"),
    }
}

#[test]
fn test_element_width_drives_count() {
    // twelve bytes of i32 read as f64 are one and a half doubles
    match get::<[f64; 3], _>(&block(), "iorigin") {
        Err(GridFoldError::SizeMismatch {
            count, recorded, ..
        }) => {
            assert_eq!(count, 1);
            assert_eq!(recorded, 3);
        }
        other => panic!("Expected SizeMismatch error, got {other:?}"),
    }

    // eight-byte values read as four-byte elements count double
    assert!(matches!(
        get::<Vec<f32>, _>(&block(), "origin"),
        Err(GridFoldError::SizeMismatch { count: 6, recorded: 3, .. })
    ));
}

#[test]
fn test_string_attribute_is_unsupported() {
    match get::<Vec<f64>, _>(&block(), "units") {
        Err(GridFoldError::UnsupportedAttributeType { attribute, kind, .. }) => {
            assert_eq!(attribute, "units");
            assert_eq!(kind, "string");
        }
        other => panic!("Expected UnsupportedAttributeType error, got {other:?}"),
    }
}

#[test]
fn test_reads_are_not_cached() -> Result<()> {
    let mut attrs = AttributeMap::new("block");
    attrs.insert(RawAttribute::new("delta", AttributeData::F64(vec![1.0; 3])));
    assert_eq!(get::<[f64; 3], _>(&attrs, "delta")?, [1.0; 3]);

    attrs.insert(RawAttribute::new("delta", AttributeData::F64(vec![2.0; 3])));
    assert_eq!(get::<[f64; 3], _>(&attrs, "delta")?, [2.0; 3]);
    assert_eq!(attrs.attribute_names(), vec!["delta"]);
    Ok(())
}

#[test]
fn test_attribute_data_properties() {
    let doubles = AttributeData::F64(vec![0.5, 1.0, 2.0]);
    assert_eq!(doubles.len(), 3);
    assert_eq!(doubles.byte_size(), 24);
    assert_eq!(doubles.class(), AttributeClass::Float);
    assert_eq!(doubles.display_values(), "0.5  1  2");

    let shorts = AttributeData::I16(vec![-1, 7]);
    assert_eq!(shorts.byte_size(), 4);
    assert_eq!(shorts.class().to_string(), "INTEGER");

    let text = AttributeData::Text(vec!["cells".to_string()]);
    assert_eq!(text.byte_size(), 5);
    assert_eq!(text.class(), AttributeClass::String);
    assert!(!text.is_empty());
}

#[test]
fn test_netcdf_variable_attributes() -> Result<()> {
    let temp_dir = tempdir().expect("Failed to create temp dir");
    let file_path = temp_dir.path().join("attrs.nc");

    {
        let mut file = create(&file_path)?;
        file.add_dimension("x", 2)?;
        let mut var = file.add_variable::<f32>("density", &["x"])?;
        var.put_attribute("origin", vec![0.25f64, 0.5, 0.75])?;
        var.put_attribute("iorigin", vec![4i32, 5, 6])?;
        var.put_attribute("scale", 2.0f32)?;
    }

    let file = open(&file_path)?;
    let var = file.variable("density").expect("Variable not found");

    assert_eq!(var.location(), "density");
    let names = var.attribute_names();
    assert!(names.contains(&"origin".to_string()));
    assert!(names.contains(&"iorigin".to_string()));

    assert_eq!(get::<[f64; 3], _>(&var, "origin")?, [0.25, 0.5, 0.75]);
    assert_eq!(get::<[i32; 3], _>(&var, "iorigin")?, [4, 5, 6]);
    assert_eq!(get::<[f32; 1], _>(&var, "scale")?, [2.0]);
    assert!(matches!(
        get::<[f64; 3], _>(&var, "delta"),
        Err(GridFoldError::AttributeNotFound { .. })
    ));
    Ok(())
}
