/// Data layer: container decoding, the in-memory array model, and writing.
///
/// Architecture:
/// ```text
///       .npy
///        │
///        ▼
///   ┌──────────┐
///   │  header   │  magic, version, Python dict literal → descr / order / shape
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  validate, byte-swap, Fortran → C order
///   └──────────┘
///        │
///        ▼
///   ┌─────────────┐
///   │ LoadedArray  │  DType, shape, little-endian row-major bytes
///   └─────────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  writer   │  LoadedArray → .npy (sample generator, tests)
///   └──────────┘
/// ```

pub mod header;
pub mod loader;
pub mod model;
pub mod writer;
