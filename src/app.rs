use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};

use crate::cli::Args;
use crate::data::loader::load_file;
use crate::report::write_report;

// ---------------------------------------------------------------------------
// One invocation: load → summarize → preview
// ---------------------------------------------------------------------------

/// Expected container suffix, compared case-insensitively.
pub const EXTENSION: &str = "npy";

/// Load the file named by `args` and write its report to `out`.
///
/// Load failures are returned before anything has been written.
pub fn run<W: Write>(args: &Args, out: &mut W) -> Result<()> {
    let path = args.path.as_path();
    let array = load_file(path)?;
    log::info!(
        "loaded {} array of {} elements from {}",
        array.dtype(),
        array.len(),
        path.display()
    );

    if !has_npy_extension(path) {
        log::debug!("extension check failed for {}", path.display());
        writeln!(
            out,
            "Warning: File '{}' does not have .{EXTENSION} extension.",
            path.display()
        )?;
    }

    write_report(out, path, &array, &args.report_options()).context("writing report")?;
    Ok(())
}

pub fn has_npy_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(EXTENSION))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_check_ignores_case() {
        assert!(has_npy_extension(Path::new("a/b.npy")));
        assert!(has_npy_extension(Path::new("B.NPY")));
        assert!(!has_npy_extension(Path::new("b.npz")));
        assert!(!has_npy_extension(Path::new("npy")));
    }
}
