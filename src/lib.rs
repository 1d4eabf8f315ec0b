//! Inspect NumPy `.npy` array containers.
//!
//! The library loads a container into an immutable [`LoadedArray`], derives
//! size and type facts plus numeric statistics from it, and renders a
//! bounded, dimensionality-aware preview of its contents.

pub mod app;
pub mod cli;
pub mod data;
pub mod report;

pub use data::loader::{LoadError, load_file};
pub use data::model::{DType, Field, LoadedArray, Scalar};
pub use report::{ReportError, ReportOptions, write_report};
