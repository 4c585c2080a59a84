//! Container inspection
//!
//! Renders the group/dataset tree of a container, optionally with per-dataset
//! type, attributes and extents. Functions return the text instead of printing
//! it so the caller decides where it goes.

use crate::attributes::AttributeSource;
use crate::errors::Result;
use crate::netcdf_io::join_path;
use netcdf::{File, Group, Variable};
use regex::Regex;

const SPACING: &str = "\t";

/// Describe every object whose path matches `pattern`
///
/// Objects are listed as `name  ->  group` or `name  ->  dataset`, indented
/// one tab per nesting level. `pattern` is matched against the full
/// slash-joined path, as for conversion. A group is listed when its own path
/// matches or anything below it is listed. With `detail`, datasets are
/// followed by their type, attributes and dimensions.
///
/// # Errors
///
/// Any error reading attribute values.
pub fn describe_container(file: &File, pattern: &Regex, detail: bool) -> Result<String> {
    let mut out = String::new();
    match file.root() {
        Some(root) => describe_group(&root, "", "", detail, pattern, &mut out)?,
        None => {
            for var in file.variables() {
                let path = var.name().to_string();
                describe_object(&var, &path, "", detail, pattern, &mut out)?;
            }
        }
    }
    Ok(out)
}

fn describe_group(
    group: &Group,
    path: &str,
    prefix: &str,
    detail: bool,
    pattern: &Regex,
    out: &mut String,
) -> Result<()> {
    for var in group.variables() {
        let var_path = join_path(path, &var.name());
        describe_object(&var, &var_path, prefix, detail, pattern, out)?;
    }

    for sub in group.groups() {
        let name = sub.name().to_string();
        let sub_path = join_path(path, &name);
        let mut inner = String::new();
        describe_group(&sub, &sub_path, &format!("{prefix}{SPACING}"), detail, pattern, &mut inner)?;
        if !inner.is_empty() || pattern.is_match(&sub_path) {
            out.push_str(&format!("{prefix}{name}  ->  group\n"));
            out.push_str(&inner);
        }
    }
    Ok(())
}

fn describe_object(
    var: &Variable,
    path: &str,
    prefix: &str,
    detail: bool,
    pattern: &Regex,
    out: &mut String,
) -> Result<()> {
    if pattern.is_match(path) {
        out.push_str(&format!("{prefix}{}  ->  dataset\n", var.name()));
        if detail {
            out.push_str(&describe_dataset(var, &format!("{prefix}{SPACING}"))?);
        }
    }
    Ok(())
}

/// Type, attributes, element count and dimensions of one dataset
///
/// # Errors
///
/// Any error reading attribute values.
pub fn describe_dataset(var: &Variable, prefix: &str) -> Result<String> {
    let mut out = String::new();
    let data_type = format!("{:?}", var.vartype()).to_lowercase();
    let attribute_count = var.attribute_names().len();

    out.push_str(&format!("{prefix}type: {data_type}\n"));
    out.push_str(&format!("{prefix}attrs: {attribute_count}\n"));
    out.push_str(&describe_attributes(var, &format!("{prefix}{SPACING}"))?);

    let dimensions = var.dimensions();
    let npoints: usize = dimensions.iter().map(|d| d.len()).product();
    out.push_str(&format!("{prefix}npoints: {npoints}\n"));
    out.push_str(&format!("{prefix}dims: {}\n", dimensions.len()));

    for (a, dim) in dimensions.iter().enumerate() {
        out.push_str(&format!("{prefix}{SPACING}dim #{a}:\n"));
        out.push_str(&format!(
            "{prefix}{SPACING}{SPACING}name={}   dim={}   unlimited={}\n",
            dim.name(),
            dim.len(),
            dim.is_unlimited()
        ));
    }
    Ok(out)
}

/// One line per attribute: `name (CLASS, bytes)  =  values`
///
/// # Errors
///
/// Any error opening an attribute listed by the source.
pub fn describe_attributes<S: AttributeSource + ?Sized>(source: &S, prefix: &str) -> Result<String> {
    let mut out = String::new();
    for name in source.attribute_names() {
        let attribute = source.open_attribute(&name)?;
        out.push_str(&format!(
            "{prefix}{name} ({}, {})  =  {}\n",
            attribute.data.class(),
            attribute.byte_size(),
            attribute.data.display_values()
        ));
    }
    Ok(out)
}
