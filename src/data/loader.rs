use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail, ensure};
use thiserror::Error;

use super::header::{PyLiteral, parse_literal, read_preamble};
use super::model::{DType, Field, LoadedArray, element_count};

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Why a container could not be loaded.
#[derive(Debug, Error)]
pub enum LoadError {
    /// The path does not exist or cannot be read.
    #[error("File '{}' not found", path.display())]
    NotFound {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// The file was read but is not a single well-formed array.
    #[error("Error loading file '{}': {reason}", path.display())]
    Malformed { path: PathBuf, reason: String },
}

/// Load a `.npy` container into memory.
///
/// The whole file is read and the handle released before decoding starts.
pub fn load_file(path: &Path) -> Result<LoadedArray, LoadError> {
    let bytes = std::fs::read(path).map_err(|source| LoadError::NotFound {
        path: path.to_path_buf(),
        source,
    })?;
    parse_container(&bytes).map_err(|err| LoadError::Malformed {
        path: path.to_path_buf(),
        reason: format!("{err:#}"),
    })
}

/// Decode an in-memory container.
pub fn parse_container(bytes: &[u8]) -> Result<LoadedArray> {
    let preamble = read_preamble(bytes)?;
    log::debug!(
        "npy v{}.{} header: {}",
        preamble.version.0,
        preamble.version.1,
        preamble.header.trim_end()
    );

    let dict = parse_literal(&preamble.header).context("parsing header dictionary")?;
    ensure!(
        matches!(dict, PyLiteral::Dict(_)),
        "header is not a dictionary"
    );

    let layout = parse_descr(dict.get("descr").context("header missing 'descr'")?)?;
    let fortran_order = match dict
        .get("fortran_order")
        .context("header missing 'fortran_order'")?
    {
        PyLiteral::Bool(b) => *b,
        other => bail!("'fortran_order' must be True or False, got {other:?}"),
    };
    let shape = parse_shape(dict.get("shape").context("header missing 'shape'")?)
        .context("invalid 'shape'")?;

    let itemsize = layout.dtype.itemsize();
    let size = element_count(&shape)
        .and_then(|n| n.checked_mul(itemsize))
        .context("shape is too large")?;
    let body = &bytes[preamble.data_offset..];
    ensure!(
        body.len() >= size,
        "data section holds {} bytes, shape needs {size}",
        body.len()
    );
    if body.len() > size {
        log::debug!("ignoring {} trailing bytes", body.len() - size);
    }

    let mut data = body[..size].to_vec();
    if !layout.swaps.is_empty() {
        swap_to_little(&mut data, itemsize, &layout.swaps);
    }
    if fortran_order && shape.len() > 1 {
        log::debug!("reordering Fortran-ordered data to row-major");
        data = fortran_to_c(&data, &shape, itemsize);
    }

    LoadedArray::new(layout.dtype, shape, data)
}

// ---------------------------------------------------------------------------
// descr / shape decoding
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
enum ByteOrder {
    Little,
    Big,
}

const NATIVE: ByteOrder = if cfg!(target_endian = "big") {
    ByteOrder::Big
} else {
    ByteOrder::Little
};

/// Element type plus the big-endian scalars that need swapping.
#[derive(Debug)]
struct Layout {
    dtype: DType,
    /// `(offset, width)` within one element.
    swaps: Vec<(usize, usize)>,
}

fn parse_descr(descr: &PyLiteral) -> Result<Layout> {
    match descr {
        PyLiteral::Str(s) => {
            let (dtype, order) = parse_type_str(s)?;
            let width = dtype.itemsize();
            let swaps = if order == ByteOrder::Big && width > 1 {
                vec![(0, width)]
            } else {
                Vec::new()
            };
            Ok(Layout { dtype, swaps })
        }
        PyLiteral::List(items) => {
            let mut fields = Vec::with_capacity(items.len());
            let mut swaps = Vec::new();
            let mut offset = 0;
            for item in items {
                let (field, order) = parse_field(item)?;
                let width = field.dtype.itemsize();
                if order == ByteOrder::Big && width > 1 {
                    swaps.extend((0..field.count()).map(|k| (offset + k * width, width)));
                }
                offset += field.itemsize();
                fields.push(field);
            }
            Ok(Layout {
                dtype: DType::Record(fields),
                swaps,
            })
        }
        other => bail!("'descr' must be a string or a list of fields, got {other:?}"),
    }
}

fn parse_field(item: &PyLiteral) -> Result<(Field, ByteOrder)> {
    let PyLiteral::Tuple(parts) = item else {
        bail!("record field must be a tuple, got {item:?}");
    };
    let (name, descr, shape) = match parts.as_slice() {
        [name, descr] => (name, descr, None),
        [name, descr, shape] => (name, descr, Some(shape)),
        _ => bail!("record field must have 2 or 3 entries, got {}", parts.len()),
    };
    let name = name
        .as_str()
        .with_context(|| format!("field name must be a string, got {name:?}"))?;
    let (dtype, order) = match descr {
        PyLiteral::Str(s) => parse_type_str(s).with_context(|| format!("field '{name}'"))?,
        PyLiteral::List(_) => bail!("field '{name}': nested record types are not supported"),
        other => bail!("field '{name}': invalid type {other:?}"),
    };
    let mut field = Field::new(name, dtype);
    if let Some(shape) = shape {
        field.shape = parse_shape(shape).with_context(|| format!("field '{name}' shape"))?;
    }
    Ok((field, order))
}

/// Parse a type string such as `<f8`, `|b1`, `>i4`.
fn parse_type_str(s: &str) -> Result<(DType, ByteOrder)> {
    let (order, rest) = match s.chars().next() {
        Some('<') | Some('|') => (ByteOrder::Little, &s[1..]),
        Some('>') => (ByteOrder::Big, &s[1..]),
        Some('=') => (NATIVE, &s[1..]),
        _ => (NATIVE, s),
    };
    let mut chars = rest.chars();
    let kind = chars.next().context("empty element type")?;
    let width: usize = chars
        .as_str()
        .parse()
        .ok()
        .with_context(|| format!("unsupported element type '{s}'"))?;
    let dtype = match kind {
        'b' | '?' => DType::Bool,
        'i' => DType::Int {
            width,
            signed: true,
        },
        'u' => DType::Int {
            width,
            signed: false,
        },
        'f' => DType::Float { width },
        _ => bail!("unsupported element type '{s}'"),
    };
    if dtype == DType::Bool {
        ensure!(width == 1, "unsupported element type '{s}'");
    }
    dtype.validate()?;
    Ok((dtype, order))
}

fn parse_shape(shape: &PyLiteral) -> Result<Vec<usize>> {
    match shape {
        PyLiteral::Tuple(dims) | PyLiteral::List(dims) => dims
            .iter()
            .map(|d| match d {
                PyLiteral::Int(n) if *n >= 0 => Ok(*n as usize),
                other => bail!("dimension must be a non-negative integer, got {other:?}"),
            })
            .collect(),
        PyLiteral::Int(n) if *n >= 0 => Ok(vec![*n as usize]),
        other => bail!("expected a tuple of dimensions, got {other:?}"),
    }
}

// ---------------------------------------------------------------------------
// Byte order and memory order normalisation
// ---------------------------------------------------------------------------

fn swap_to_little(data: &mut [u8], itemsize: usize, spans: &[(usize, usize)]) {
    if itemsize == 0 {
        return;
    }
    for item in data.chunks_exact_mut(itemsize) {
        for &(offset, width) in spans {
            item[offset..offset + width].reverse();
        }
    }
}

/// Reorder column-major element bytes into row-major order.
fn fortran_to_c(data: &[u8], shape: &[usize], itemsize: usize) -> Vec<u8> {
    if itemsize == 0 {
        return data.to_vec();
    }
    let count = data.len() / itemsize;

    // Column-major strides in elements: the first axis varies fastest.
    let mut strides = Vec::with_capacity(shape.len());
    let mut acc = 1;
    for &dim in shape {
        strides.push(acc);
        acc *= dim;
    }

    let mut out = Vec::with_capacity(data.len());
    let mut index = vec![0usize; shape.len()];
    for _ in 0..count {
        let src: usize = index.iter().zip(&strides).map(|(i, s)| i * s).sum();
        out.extend_from_slice(&data[src * itemsize..(src + 1) * itemsize]);
        for axis in (0..shape.len()).rev() {
            index[axis] += 1;
            if index[axis] < shape[axis] {
                break;
            }
            index[axis] = 0;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::header::MAGIC;
    use crate::data::model::Scalar;

    fn container(header: &str, data: &[u8]) -> Vec<u8> {
        let mut bytes = MAGIC.to_vec();
        bytes.extend_from_slice(&[1, 0]);
        bytes.extend_from_slice(&(header.len() as u16).to_le_bytes());
        bytes.extend_from_slice(header.as_bytes());
        bytes.extend_from_slice(data);
        bytes
    }

    fn values(array: &LoadedArray) -> Vec<Scalar> {
        (0..array.len()).map(|i| array.element(i).unwrap()).collect()
    }

    #[test]
    fn loads_little_endian_floats() {
        let data: Vec<u8> = [1.5f64, -2.0, 3.25]
            .iter()
            .flat_map(|v| v.to_le_bytes())
            .collect();
        let bytes = container(
            "{'descr': '<f8', 'fortran_order': False, 'shape': (3,), }\n",
            &data,
        );
        let array = parse_container(&bytes).unwrap();
        assert_eq!(array.dtype(), &DType::Float { width: 8 });
        assert_eq!(array.shape(), &[3]);
        assert_eq!(
            values(&array),
            vec![Scalar::Float(1.5), Scalar::Float(-2.0), Scalar::Float(3.25)]
        );
    }

    #[test]
    fn big_endian_matches_little_endian() {
        let big: Vec<u8> = [1i32, -2, 300].iter().flat_map(|v| v.to_be_bytes()).collect();
        let bytes = container(
            "{'descr': '>i4', 'fortran_order': False, 'shape': (3,), }\n",
            &big,
        );
        let array = parse_container(&bytes).unwrap();
        assert_eq!(
            values(&array),
            vec![Scalar::Int(1), Scalar::Int(-2), Scalar::Int(300)]
        );
    }

    #[test]
    fn fortran_order_is_reordered() {
        // [[1, 2, 3], [4, 5, 6]] stored column-major.
        let data = [1u8, 4, 2, 5, 3, 6];
        let bytes = container(
            "{'descr': '|u1', 'fortran_order': True, 'shape': (2, 3), }\n",
            &data,
        );
        let array = parse_container(&bytes).unwrap();
        let got: Vec<Scalar> = values(&array);
        let want: Vec<Scalar> = (1..=6).map(Scalar::UInt).collect();
        assert_eq!(got, want);
    }

    #[test]
    fn loads_record_with_big_endian_field() {
        let mut data = Vec::new();
        for (id, mag) in [(7i16, 1.5f32), (-1, 2.5)] {
            data.extend_from_slice(&id.to_be_bytes());
            data.extend_from_slice(&mag.to_le_bytes());
        }
        let bytes = container(
            "{'descr': [('id', '>i2'), ('mag', '<f4')], 'fortran_order': False, 'shape': (2,), }\n",
            &data,
        );
        let array = parse_container(&bytes).unwrap();
        assert_eq!(array.fields().len(), 2);
        assert_eq!(array.fields()[0].name, "id");
        assert_eq!(array.nbytes(), 12);
        let Some(Scalar::Record(second)) = array.element(1) else {
            panic!("expected record");
        };
        assert_eq!(
            second[0],
            crate::data::model::FieldValue::One(Scalar::Int(-1))
        );
    }

    #[test]
    fn missing_shape_is_malformed() {
        let bytes = container("{'descr': '<f8', 'fortran_order': False}\n", &[]);
        let err = parse_container(&bytes).unwrap_err();
        assert!(format!("{err:#}").contains("missing 'shape'"));
    }

    #[test]
    fn truncated_data_is_malformed() {
        let bytes = container(
            "{'descr': '<i8', 'fortran_order': False, 'shape': (4,), }\n",
            &[0u8; 16],
        );
        let err = parse_container(&bytes).unwrap_err();
        assert!(err.to_string().contains("shape needs 32"));
    }

    #[test]
    fn unsupported_types_are_malformed() {
        for descr in ["<U5", "|S3", "<c16", "|O", "<M8[ns]", "<i3"] {
            let header =
                format!("{{'descr': '{descr}', 'fortran_order': False, 'shape': (1,), }}\n");
            let bytes = container(&header, &[0u8; 64]);
            assert!(parse_container(&bytes).is_err(), "{descr} should be rejected");
        }
    }

    #[test]
    fn nested_records_are_malformed() {
        let bytes = container(
            "{'descr': [('outer', [('x', '<f4')])], 'fortran_order': False, 'shape': (1,), }\n",
            &[0u8; 4],
        );
        let err = parse_container(&bytes).unwrap_err();
        assert!(format!("{err:#}").contains("nested record"));
    }

    #[test]
    fn missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_file(&dir.path().join("missing.npy")).unwrap_err();
        assert!(matches!(err, LoadError::NotFound { .. }));
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn deeply_nested_header_is_malformed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("deep.npy");
        let header = format!("{{'descr': {}\n", "[".repeat(60_000));
        std::fs::write(&path, container(&header, &[])).unwrap();
        let err = load_file(&path).unwrap_err();
        assert!(matches!(err, LoadError::Malformed { .. }));
        assert!(err.to_string().contains("nests deeper"));
    }

    #[test]
    fn garbage_file_is_malformed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("garbage.npy");
        std::fs::write(&path, b"definitely not an array").unwrap();
        let err = load_file(&path).unwrap_err();
        assert!(matches!(err, LoadError::Malformed { .. }));
    }
}
