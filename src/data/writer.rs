use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};

use super::header::MAGIC;
use super::model::{LoadedArray, shape_text};

/// Header blocks are padded so element data starts on this boundary.
const ALIGNMENT: usize = 64;

/// Encode an array as a container (little endian, C order).
///
/// Version 1.0 is used while the header length fits in a `u16`; longer
/// headers, e.g. wide record descriptors, switch to version 2.0.
pub fn to_npy_bytes(array: &LoadedArray) -> Result<Vec<u8>> {
    let dict = format!(
        "{{'descr': {}, 'fortran_order': False, 'shape': {}, }}",
        descr_literal(array),
        shape_text(array.shape())
    );
    let v1 = padded_header(&dict, 2);
    let (version, header, length) = match u16::try_from(v1.len()) {
        Ok(len) => (1, v1, len.to_le_bytes().to_vec()),
        Err(_) => {
            let v2 = padded_header(&dict, 4);
            let len = u32::try_from(v2.len()).context("header does not fit in a u32 length")?;
            (2, v2, len.to_le_bytes().to_vec())
        }
    };

    let mut bytes =
        Vec::with_capacity(MAGIC.len() + 2 + length.len() + header.len() + array.nbytes());
    bytes.extend_from_slice(MAGIC);
    bytes.extend_from_slice(&[version, 0]);
    bytes.extend_from_slice(&length);
    bytes.extend_from_slice(header.as_bytes());
    bytes.extend_from_slice(array.data());
    Ok(bytes)
}

/// Dict text padded with spaces and a final `'\n'` so the data section
/// starts on an [`ALIGNMENT`] boundary, given a `length_bytes` wide length field.
fn padded_header(dict: &str, length_bytes: usize) -> String {
    // magic + version + length + dict + '\n'
    let unpadded = MAGIC.len() + 2 + length_bytes + dict.len() + 1;
    let padding = (ALIGNMENT - unpadded % ALIGNMENT) % ALIGNMENT;
    format!("{dict}{}\n", " ".repeat(padding))
}

/// Write an array to `path`, creating parent directories as needed.
pub fn write_npy(path: &Path, array: &LoadedArray) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating {}", parent.display()))?;
    }
    let mut file = std::fs::File::create(path)
        .with_context(|| format!("creating {}", path.display()))?;
    file.write_all(&to_npy_bytes(array)?)
        .with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}

fn descr_literal(array: &LoadedArray) -> String {
    if array.dtype().is_record() {
        array.dtype().descr()
    } else {
        format!("'{}'", array.dtype().descr())
    }
}
