use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;

use anyhow::{Context, Result, bail, ensure};

// ---------------------------------------------------------------------------
// DType – the element type of a loaded array
// ---------------------------------------------------------------------------

/// Closed set of element types the reporter understands.
///
/// Widths are in bytes. Records hold scalar fields only; nested records are
/// rejected when the array is built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DType {
    Bool,
    Int { width: usize, signed: bool },
    Float { width: usize },
    Record(Vec<Field>),
}

/// One named field of a record element type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub name: String,
    pub dtype: DType,
    /// Sub-array shape; empty for a plain scalar field.
    pub shape: Vec<usize>,
}

impl Field {
    pub fn new(name: impl Into<String>, dtype: DType) -> Self {
        Field {
            name: name.into(),
            dtype,
            shape: Vec::new(),
        }
    }

    pub fn with_shape(mut self, shape: Vec<usize>) -> Self {
        self.shape = shape;
        self
    }

    /// Number of scalars stored in this field per record.
    pub fn count(&self) -> usize {
        self.shape.iter().product()
    }

    pub fn itemsize(&self) -> usize {
        self.dtype.itemsize() * self.count()
    }
}

impl DType {
    /// Bytes per element.
    pub fn itemsize(&self) -> usize {
        match self {
            DType::Bool => 1,
            DType::Int { width, .. } | DType::Float { width } => *width,
            DType::Record(fields) => fields.iter().map(Field::itemsize).sum(),
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, DType::Int { .. } | DType::Float { .. })
    }

    pub fn is_record(&self) -> bool {
        matches!(self, DType::Record(_))
    }

    /// Declared fields; empty unless this is a record type.
    pub fn fields(&self) -> &[Field] {
        match self {
            DType::Record(fields) => fields,
            _ => &[],
        }
    }

    /// NumPy's name for the type, e.g. `float64`, `uint8`, `bool`.
    /// Records are named by their descriptor list.
    pub fn name(&self) -> String {
        match self {
            DType::Bool => "bool".to_string(),
            DType::Int {
                width,
                signed: true,
            } => format!("int{}", width * 8),
            DType::Int {
                width,
                signed: false,
            } => format!("uint{}", width * 8),
            DType::Float { width } => format!("float{}", width * 8),
            DType::Record(_) => self.descr(),
        }
    }

    /// Array-protocol descriptor as it appears in a container header.
    /// Multi-byte types are always little endian.
    pub fn descr(&self) -> String {
        match self {
            DType::Bool => "|b1".to_string(),
            DType::Int { width, signed } => {
                let kind = if *signed { 'i' } else { 'u' };
                let order = if *width == 1 { '|' } else { '<' };
                format!("{order}{kind}{width}")
            }
            DType::Float { width } => format!("<f{width}"),
            DType::Record(fields) => {
                let parts: Vec<String> = fields
                    .iter()
                    .map(|f| {
                        if f.shape.is_empty() {
                            format!("('{}', '{}')", f.name, f.dtype.descr())
                        } else {
                            format!(
                                "('{}', '{}', {})",
                                f.name,
                                f.dtype.descr(),
                                shape_text(&f.shape)
                            )
                        }
                    })
                    .collect();
                format!("[{}]", parts.join(", "))
            }
        }
    }

    /// Reject widths and layouts that cannot be decoded.
    pub fn validate(&self) -> Result<()> {
        match self {
            DType::Bool => Ok(()),
            DType::Int { width, .. } => {
                ensure!(
                    matches!(width, 1 | 2 | 4 | 8),
                    "unsupported integer width: {width} bytes"
                );
                Ok(())
            }
            DType::Float { width } => {
                ensure!(
                    matches!(width, 2 | 4 | 8),
                    "unsupported float width: {width} bytes"
                );
                Ok(())
            }
            DType::Record(fields) => {
                ensure!(!fields.is_empty(), "record type declares no fields");
                let mut seen = BTreeSet::new();
                for field in fields {
                    if field.dtype.is_record() {
                        bail!("field '{}': nested record types are not supported", field.name);
                    }
                    if !seen.insert(field.name.as_str()) {
                        bail!("duplicate field name '{}'", field.name);
                    }
                    field.dtype.validate()?;
                }
                Ok(())
            }
        }
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Render a shape the way Python prints a tuple: `()`, `(5,)`, `(2, 3)`.
pub fn shape_text(shape: &[usize]) -> String {
    match shape {
        [] => "()".to_string(),
        [n] => format!("({n},)"),
        dims => {
            let parts: Vec<String> = dims.iter().map(|d| d.to_string()).collect();
            format!("({})", parts.join(", "))
        }
    }
}

/// Product of the shape entries, `None` on overflow.
pub fn element_count(shape: &[usize]) -> Option<usize> {
    shape.iter().try_fold(1usize, |acc, &d| acc.checked_mul(d))
}

// ---------------------------------------------------------------------------
// Scalar – one decoded element
// ---------------------------------------------------------------------------

/// A decoded element value.
///
/// `Float32` keeps single and half precision values narrow so they print
/// at their own precision.
#[derive(Debug, Clone)]
pub enum Scalar {
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    Float32(f32),
    Record(Vec<FieldValue>),
}

/// The value of one record field.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum FieldValue {
    One(Scalar),
    /// Flattened contents of a sub-array field.
    Many(Vec<Scalar>),
}

// -- Manual Eq/Ord so we can put Scalar in BTreeSet --

impl PartialEq for Scalar {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Scalar {}

impl PartialOrd for Scalar {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Scalar {
    fn cmp(&self, other: &Self) -> Ordering {
        use Scalar::*;
        fn discriminant(v: &Scalar) -> u8 {
            match v {
                Bool(_) => 0,
                Int(_) => 1,
                UInt(_) => 2,
                Float32(_) => 3,
                Float(_) => 4,
                Record(_) => 5,
            }
        }
        let da = discriminant(self);
        let db = discriminant(other);
        if da != db {
            return da.cmp(&db);
        }
        match (self, other) {
            (Bool(a), Bool(b)) => a.cmp(b),
            (Int(a), Int(b)) => a.cmp(b),
            (UInt(a), UInt(b)) => a.cmp(b),
            (Float32(a), Float32(b)) => a.total_cmp(b),
            (Float(a), Float(b)) => a.total_cmp(b),
            (Record(a), Record(b)) => a.cmp(b),
            _ => Ordering::Equal,
        }
    }
}

impl Scalar {
    /// Numeric value widened to `f64`; `None` for booleans and records.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Scalar::Int(i) => Some(*i as f64),
            Scalar::UInt(u) => Some(*u as f64),
            Scalar::Float(v) => Some(*v),
            Scalar::Float32(v) => Some(*v as f64),
            Scalar::Bool(_) | Scalar::Record(_) => None,
        }
    }

    /// Representative used for deduplication: `-0.0` folds into `0.0` and
    /// every NaN into one NaN, so equal floats compare equal under `Ord`.
    pub fn canonical(self) -> Scalar {
        match self {
            Scalar::Float(v) if v.is_nan() => Scalar::Float(f64::NAN),
            Scalar::Float(v) if v == 0.0 => Scalar::Float(0.0),
            Scalar::Float32(v) if v.is_nan() => Scalar::Float32(f32::NAN),
            Scalar::Float32(v) if v == 0.0 => Scalar::Float32(0.0),
            other => other,
        }
    }

    /// A NaN of the same float flavour; integers have no NaN and widen.
    pub fn nan_like(&self) -> Scalar {
        match self {
            Scalar::Float32(_) => Scalar::Float32(f32::NAN),
            _ => Scalar::Float(f64::NAN),
        }
    }
}

// ---------------------------------------------------------------------------
// Element – primitive types that can seed a LoadedArray
// ---------------------------------------------------------------------------

/// Rust primitives with a direct container representation.
pub trait Element: Copy {
    fn dtype() -> DType;
    fn write_le(self, out: &mut Vec<u8>);
}

macro_rules! impl_element {
    ($ty:ty, $dtype:expr) => {
        impl Element for $ty {
            fn dtype() -> DType {
                $dtype
            }

            fn write_le(self, out: &mut Vec<u8>) {
                out.extend_from_slice(&self.to_le_bytes());
            }
        }
    };
}

impl_element!(i8, DType::Int { width: 1, signed: true });
impl_element!(i16, DType::Int { width: 2, signed: true });
impl_element!(i32, DType::Int { width: 4, signed: true });
impl_element!(i64, DType::Int { width: 8, signed: true });
impl_element!(u8, DType::Int { width: 1, signed: false });
impl_element!(u16, DType::Int { width: 2, signed: false });
impl_element!(u32, DType::Int { width: 4, signed: false });
impl_element!(u64, DType::Int { width: 8, signed: false });
impl_element!(f32, DType::Float { width: 4 });
impl_element!(f64, DType::Float { width: 8 });

impl Element for bool {
    fn dtype() -> DType {
        DType::Bool
    }

    fn write_le(self, out: &mut Vec<u8>) {
        out.push(self as u8);
    }
}

// ---------------------------------------------------------------------------
// LoadedArray – the immutable array every report stage reads
// ---------------------------------------------------------------------------

/// An n-dimensional array held as little-endian, row-major element bytes.
#[derive(Debug, Clone)]
pub struct LoadedArray {
    dtype: DType,
    shape: Vec<usize>,
    data: Vec<u8>,
}

impl LoadedArray {
    /// Build an array from raw little-endian, row-major element bytes.
    pub fn new(dtype: DType, shape: Vec<usize>, data: Vec<u8>) -> Result<Self> {
        dtype.validate()?;
        let expected = element_count(&shape)
            .and_then(|count| count.checked_mul(dtype.itemsize()))
            .with_context(|| format!("shape {} is too large", shape_text(&shape)))?;
        ensure!(
            data.len() == expected,
            "shape {} of {} needs {expected} bytes, got {}",
            shape_text(&shape),
            dtype,
            data.len()
        );
        Ok(LoadedArray { dtype, shape, data })
    }

    /// Build an array of primitive values in row-major order.
    pub fn from_elements<T: Element>(shape: Vec<usize>, values: &[T]) -> Result<Self> {
        let mut data = Vec::with_capacity(values.len() * T::dtype().itemsize());
        for &v in values {
            v.write_le(&mut data);
        }
        Self::new(T::dtype(), shape, data)
    }

    pub fn dtype(&self) -> &DType {
        &self.dtype
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn ndim(&self) -> usize {
        self.shape.len()
    }

    /// Number of elements: 1 for a scalar, 0 if any axis is empty.
    pub fn len(&self) -> usize {
        self.shape.iter().product()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Total bytes occupied by the element data.
    pub fn nbytes(&self) -> usize {
        self.data.len()
    }

    pub fn fields(&self) -> &[Field] {
        self.dtype.fields()
    }

    /// Raw element bytes, little endian, row-major.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Decode the element at a flat row-major index.
    ///
    /// Returns `None` if the index is out of range or the element type
    /// has no decoder.
    pub fn element(&self, index: usize) -> Option<Scalar> {
        let size = self.dtype.itemsize();
        let start = index.checked_mul(size)?;
        let bytes = self.data.get(start..start.checked_add(size)?)?;
        decode(&self.dtype, bytes)
    }
}

fn le<const N: usize>(bytes: &[u8]) -> Option<[u8; N]> {
    bytes.get(..N)?.try_into().ok()
}

fn decode(dtype: &DType, bytes: &[u8]) -> Option<Scalar> {
    let value = match dtype {
        DType::Bool => Scalar::Bool(*bytes.first()? != 0),
        DType::Int { width, signed: true } => Scalar::Int(match width {
            1 => i8::from_le_bytes(le(bytes)?).into(),
            2 => i16::from_le_bytes(le(bytes)?).into(),
            4 => i32::from_le_bytes(le(bytes)?).into(),
            8 => i64::from_le_bytes(le(bytes)?),
            _ => return None,
        }),
        DType::Int { width, signed: false } => Scalar::UInt(match width {
            1 => u8::from_le_bytes(le(bytes)?).into(),
            2 => u16::from_le_bytes(le(bytes)?).into(),
            4 => u32::from_le_bytes(le(bytes)?).into(),
            8 => u64::from_le_bytes(le(bytes)?),
            _ => return None,
        }),
        DType::Float { width: 2 } => {
            Scalar::Float32(f16_to_f32(u16::from_le_bytes(le(bytes)?)))
        }
        DType::Float { width: 4 } => Scalar::Float32(f32::from_le_bytes(le(bytes)?)),
        DType::Float { width: 8 } => Scalar::Float(f64::from_le_bytes(le(bytes)?)),
        DType::Record(fields) => {
            let mut offset = 0;
            let mut values = Vec::with_capacity(fields.len());
            for field in fields {
                let width = field.dtype.itemsize();
                if field.shape.is_empty() {
                    let slice = bytes.get(offset..offset + width)?;
                    values.push(FieldValue::One(decode(&field.dtype, slice)?));
                } else {
                    let items = (0..field.count())
                        .map(|k| {
                            let at = offset + k * width;
                            decode(&field.dtype, bytes.get(at..at + width)?)
                        })
                        .collect::<Option<Vec<_>>>()?;
                    values.push(FieldValue::Many(items));
                }
                offset += field.itemsize();
            }
            Scalar::Record(values)
        }
        DType::Float { .. } => return None,
    };
    Some(value)
}

/// IEEE 754 binary16 → binary32. Every half value is exactly representable.
fn f16_to_f32(bits: u16) -> f32 {
    let sign = u32::from(bits >> 15) << 31;
    let exp = u32::from((bits >> 10) & 0x1f);
    let frac = u32::from(bits & 0x3ff);
    let magnitude = match exp {
        0 => frac as f32 * 2f32.powi(-24),
        0x1f if frac == 0 => f32::INFINITY,
        0x1f => f32::NAN,
        _ => return f32::from_bits(sign | ((exp + 112) << 23) | (frac << 13)),
    };
    if sign != 0 { -magnitude } else { magnitude }
}
