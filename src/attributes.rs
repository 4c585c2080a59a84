//! Typed access to numeric metadata attributes
//!
//! Attributes are fetched by name from an [`AttributeSource`] (a NetCDF
//! variable, or an in-memory [`AttributeMap`]) and converted into either a
//! `Vec<E>` or a fixed-size `[E; N]`. The element count implied by the stored
//! byte size and the declared extent are checked independently before any
//! value is trusted.

use crate::errors::{GridFoldError, Result};
use netcdf::AttributeValue;
use std::collections::HashMap;
use std::mem::size_of;

/// Values of a stored attribute, tagged with their on-disk element type
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeData {
    I8(Vec<i8>),
    U8(Vec<u8>),
    I16(Vec<i16>),
    U16(Vec<u16>),
    I32(Vec<i32>),
    U32(Vec<u32>),
    I64(Vec<i64>),
    U64(Vec<u64>),
    F32(Vec<f32>),
    F64(Vec<f64>),
    Text(Vec<String>),
}

/// Coarse type class of an attribute, as shown by the inspector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeClass {
    Integer,
    Float,
    String,
}

impl AttributeClass {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Integer => "INTEGER",
            Self::Float => "FLOAT",
            Self::String => "STRING",
        }
    }
}

impl std::fmt::Display for AttributeClass {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

macro_rules! for_each_numeric {
    ($data:expr, $values:ident => $body:expr, $text:ident => $text_body:expr) => {
        match $data {
            AttributeData::I8($values) => $body,
            AttributeData::U8($values) => $body,
            AttributeData::I16($values) => $body,
            AttributeData::U16($values) => $body,
            AttributeData::I32($values) => $body,
            AttributeData::U32($values) => $body,
            AttributeData::I64($values) => $body,
            AttributeData::U64($values) => $body,
            AttributeData::F32($values) => $body,
            AttributeData::F64($values) => $body,
            AttributeData::Text($text) => $text_body,
        }
    };
}

impl AttributeData {
    /// Number of stored elements
    #[must_use]
    pub fn len(&self) -> usize {
        for_each_numeric!(self, v => v.len(), t => t.len())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// In-memory size of the stored values in bytes
    #[must_use]
    pub fn byte_size(&self) -> usize {
        match self {
            AttributeData::Text(t) => t.iter().map(String::len).sum(),
            other => other.len() * other.element_width(),
        }
    }

    /// Width in bytes of one stored element (1 for text)
    #[must_use]
    pub fn element_width(&self) -> usize {
        match self {
            AttributeData::I8(_) | AttributeData::U8(_) | AttributeData::Text(_) => 1,
            AttributeData::I16(_) | AttributeData::U16(_) => 2,
            AttributeData::I32(_) | AttributeData::U32(_) | AttributeData::F32(_) => 4,
            AttributeData::I64(_) | AttributeData::U64(_) | AttributeData::F64(_) => 8,
        }
    }

    #[must_use]
    pub fn class(&self) -> AttributeClass {
        match self {
            AttributeData::F32(_) | AttributeData::F64(_) => AttributeClass::Float,
            AttributeData::Text(_) => AttributeClass::String,
            _ => AttributeClass::Integer,
        }
    }

    /// Name of the stored element type
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            AttributeData::I8(_) => "i8",
            AttributeData::U8(_) => "u8",
            AttributeData::I16(_) => "i16",
            AttributeData::U16(_) => "u16",
            AttributeData::I32(_) => "i32",
            AttributeData::U32(_) => "u32",
            AttributeData::I64(_) => "i64",
            AttributeData::U64(_) => "u64",
            AttributeData::F32(_) => "f32",
            AttributeData::F64(_) => "f64",
            AttributeData::Text(_) => "string",
        }
    }

    /// Values rendered for display, separated by two spaces
    #[must_use]
    pub fn display_values(&self) -> String {
        for_each_numeric!(
            self,
            v => v.iter().map(ToString::to_string).collect::<Vec<_>>().join("  "),
            t => t.join("  ")
        )
    }
}

impl From<AttributeValue> for AttributeData {
    fn from(value: AttributeValue) -> Self {
        match value {
            AttributeValue::Schar(v) => AttributeData::I8(vec![v]),
            AttributeValue::Schars(v) => AttributeData::I8(v),
            AttributeValue::Uchar(v) => AttributeData::U8(vec![v]),
            AttributeValue::Uchars(v) => AttributeData::U8(v),
            AttributeValue::Short(v) => AttributeData::I16(vec![v]),
            AttributeValue::Shorts(v) => AttributeData::I16(v),
            AttributeValue::Ushort(v) => AttributeData::U16(vec![v]),
            AttributeValue::Ushorts(v) => AttributeData::U16(v),
            AttributeValue::Int(v) => AttributeData::I32(vec![v]),
            AttributeValue::Ints(v) => AttributeData::I32(v),
            AttributeValue::Uint(v) => AttributeData::U32(vec![v]),
            AttributeValue::Uints(v) => AttributeData::U32(v),
            AttributeValue::Longlong(v) => AttributeData::I64(vec![v]),
            AttributeValue::Longlongs(v) => AttributeData::I64(v),
            AttributeValue::Ulonglong(v) => AttributeData::U64(vec![v]),
            AttributeValue::Ulonglongs(v) => AttributeData::U64(v),
            AttributeValue::Float(v) => AttributeData::F32(vec![v]),
            AttributeValue::Floats(v) => AttributeData::F32(v),
            AttributeValue::Double(v) => AttributeData::F64(vec![v]),
            AttributeValue::Doubles(v) => AttributeData::F64(v),
            AttributeValue::Str(v) => AttributeData::Text(vec![v]),
            AttributeValue::Strs(v) => AttributeData::Text(v),
            #[allow(unreachable_patterns)]
            other => AttributeData::Text(vec![format!("{other:?}")]),
        }
    }
}

/// A named attribute as returned by the storage layer
///
/// `extent` is the element count declared by the attribute's dataspace. For
/// well-formed attributes it equals `data.len()`, but the two are tracked
/// separately so that a disagreeing store is caught rather than trusted.
#[derive(Debug, Clone, PartialEq)]
pub struct RawAttribute {
    pub name: String,
    pub data: AttributeData,
    pub extent: usize,
}

impl RawAttribute {
    pub fn new(name: impl Into<String>, data: AttributeData) -> Self {
        let extent = data.len();
        Self {
            name: name.into(),
            data,
            extent,
        }
    }

    /// Attribute whose declared extent is given explicitly
    pub fn with_extent(name: impl Into<String>, data: AttributeData, extent: usize) -> Self {
        Self {
            name: name.into(),
            data,
            extent,
        }
    }

    #[must_use]
    pub fn byte_size(&self) -> usize {
        self.data.byte_size()
    }
}

/// Anything that attributes can be opened on
pub trait AttributeSource {
    /// Human-readable name of the location, used in error messages
    fn location(&self) -> String;

    /// Open an attribute by name
    ///
    /// # Errors
    ///
    /// Returns [`GridFoldError::AttributeNotFound`] if no attribute has that name.
    fn open_attribute(&self, name: &str) -> Result<RawAttribute>;

    /// Names of all attributes at this location, in storage order
    fn attribute_names(&self) -> Vec<String>;
}

impl AttributeSource for netcdf::Variable<'_> {
    fn location(&self) -> String {
        self.name().to_string()
    }

    fn open_attribute(&self, name: &str) -> Result<RawAttribute> {
        let attr = self
            .attribute(name)
            .ok_or_else(|| GridFoldError::AttributeNotFound {
                attribute: name.to_string(),
                location: self.name().to_string(),
            })?;
        Ok(RawAttribute::new(name, attr.value()?.into()))
    }

    fn attribute_names(&self) -> Vec<String> {
        self.attributes().map(|a| a.name().to_string()).collect()
    }
}

/// In-memory attribute store
///
/// Useful for building descriptors without a backing file and for exercising
/// malformed attributes that a real container would refuse to write.
#[derive(Debug, Clone, Default)]
pub struct AttributeMap {
    location: String,
    order: Vec<String>,
    attributes: HashMap<String, RawAttribute>,
}

impl AttributeMap {
    pub fn new(location: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            ..Self::default()
        }
    }

    /// Insert (or replace) an attribute
    pub fn insert(&mut self, attribute: RawAttribute) -> &mut Self {
        if !self.attributes.contains_key(&attribute.name) {
            self.order.push(attribute.name.clone());
        }
        self.attributes.insert(attribute.name.clone(), attribute);
        self
    }

    /// Builder-style insert of a well-formed attribute
    #[must_use]
    pub fn with(mut self, name: &str, data: AttributeData) -> Self {
        self.insert(RawAttribute::new(name, data));
        self
    }
}

impl AttributeSource for AttributeMap {
    fn location(&self) -> String {
        self.location.clone()
    }

    fn open_attribute(&self, name: &str) -> Result<RawAttribute> {
        self.attributes
            .get(name)
            .cloned()
            .ok_or_else(|| GridFoldError::AttributeNotFound {
                attribute: name.to_string(),
                location: self.location.clone(),
            })
    }

    fn attribute_names(&self) -> Vec<String> {
        self.order.clone()
    }
}

/// Numeric element types an attribute can be read as
pub trait AttributeElement: Copy {
    /// Convert stored values, `None` for non-numeric data
    fn convert(data: &AttributeData) -> Option<Vec<Self>>;
}

macro_rules! impl_attribute_element {
    ($($t:ty),*) => {
        $(
            impl AttributeElement for $t {
                #[allow(clippy::cast_possible_truncation, clippy::cast_lossless, clippy::cast_sign_loss)]
                fn convert(data: &AttributeData) -> Option<Vec<Self>> {
                    for_each_numeric!(
                        data,
                        v => Some(v.iter().map(|&x| x as $t).collect()),
                        _t => None
                    )
                }
            }
        )*
    };
}

impl_attribute_element!(i8, u8, i16, u16, i32, u32, i64, u64, f32, f64);

/// Types that can be produced from a stored attribute
pub trait FromAttribute: Sized {
    /// # Errors
    ///
    /// Returns [`GridFoldError::SizeMismatch`] if the counts disagree, or
    /// [`GridFoldError::UnsupportedAttributeType`] for non-numeric data.
    fn from_attribute(attribute: &RawAttribute, location: &str) -> Result<Self>;
}

fn unsupported(attribute: &RawAttribute, location: &str) -> GridFoldError {
    GridFoldError::UnsupportedAttributeType {
        attribute: attribute.name.clone(),
        location: location.to_string(),
        kind: attribute.data.kind().to_string(),
    }
}

fn requested_count<E>(attribute: &RawAttribute) -> usize {
    attribute.byte_size() / size_of::<E>()
}

impl<E: AttributeElement> FromAttribute for Vec<E> {
    fn from_attribute(attribute: &RawAttribute, location: &str) -> Result<Self> {
        if attribute.data.class() == AttributeClass::String {
            return Err(unsupported(attribute, location));
        }

        let count = requested_count::<E>(attribute);
        let recorded = attribute.extent;
        if count != recorded {
            return Err(GridFoldError::SizeMismatch {
                attribute: attribute.name.clone(),
                location: location.to_string(),
                count,
                recorded,
                expected: None,
            });
        }

        let mut values = E::convert(&attribute.data).ok_or_else(|| unsupported(attribute, location))?;
        // stored buffer may be longer than the declared extent
        values.truncate(count);
        if values.len() != count {
            return Err(GridFoldError::SizeMismatch {
                attribute: attribute.name.clone(),
                location: location.to_string(),
                count: values.len(),
                recorded,
                expected: Some(count),
            });
        }
        Ok(values)
    }
}

impl<E: AttributeElement, const N: usize> FromAttribute for [E; N] {
    fn from_attribute(attribute: &RawAttribute, location: &str) -> Result<Self> {
        if attribute.data.class() == AttributeClass::String {
            return Err(unsupported(attribute, location));
        }

        let count = requested_count::<E>(attribute);
        let recorded = attribute.extent;
        let mismatch = || GridFoldError::SizeMismatch {
            attribute: attribute.name.clone(),
            location: location.to_string(),
            count,
            recorded,
            expected: Some(N),
        };
        if count != N || recorded != N {
            return Err(mismatch());
        }

        let values = E::convert(&attribute.data).ok_or_else(|| unsupported(attribute, location))?;
        <[E; N]>::try_from(values).map_err(|_| mismatch())
    }
}

/// Fetch attribute `name` from `source` as `T`
///
/// The attribute is re-opened on every call; nothing is cached.
///
/// # Errors
///
/// Propagates [`GridFoldError::AttributeNotFound`] from the source, and
/// [`GridFoldError::SizeMismatch`] when the byte size, declared extent and (for
/// arrays) the requested length do not all agree.
pub fn get<T: FromAttribute, S: AttributeSource + ?Sized>(source: &S, name: &str) -> Result<T> {
    let attribute = source.open_attribute(name)?;
    T::from_attribute(&attribute, &source.location())
}
