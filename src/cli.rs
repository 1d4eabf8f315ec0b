//! Command-line arguments.

use std::path::PathBuf;

use clap::Parser;
use clap::builder::RangedU64ValueParser;

use crate::report::ReportOptions;
use crate::report::preview::DEFAULT_MAX_ELEMENTS;

/// View contents of NumPy .npy files
///
/// Prints the element type, shape and memory footprint of the array, basic
/// statistics for numeric data, and a bounded sample of its contents.
#[derive(Parser, Debug, Clone)]
#[command(name = "npy-peek", version)]
#[command(about, long_about = None)]
pub struct Args {
    /// Path to the .npy file
    pub path: PathBuf,

    /// Maximum number of elements to display
    #[arg(
        short = 'n',
        long,
        default_value_t = DEFAULT_MAX_ELEMENTS,
        value_parser = RangedU64ValueParser::<usize>::new().range(1..)
    )]
    pub max_elements: usize,

    /// Don't show statistical information
    #[arg(long)]
    pub no_stats: bool,

    /// Don't show sample data
    #[arg(long)]
    pub no_sample: bool,
}

impl Args {
    pub fn report_options(&self) -> ReportOptions {
        ReportOptions {
            max_elements: self.max_elements,
            show_stats: !self.no_stats,
            show_sample: !self.no_sample,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_defaults() {
        let args =
            Args::try_parse_from(["npy-peek", "stars.npy"]).expect("default args should parse");
        assert_eq!(args.path, PathBuf::from("stars.npy"));
        assert_eq!(args.max_elements, 10);
        assert_eq!(args.report_options(), ReportOptions::default());
    }

    #[test]
    fn parses_flags() {
        let argv = ["npy-peek", "-n", "25", "--no-stats", "--no-sample", "a.npy"];
        let args = Args::try_parse_from(argv).expect("flagged args should parse");
        let options = args.report_options();
        assert_eq!(options.max_elements, 25);
        assert!(!options.show_stats);
        assert!(!options.show_sample);

        let args = Args::try_parse_from(["npy-peek", "--max-elements", "3", "a.npy"]).unwrap();
        assert_eq!(args.max_elements, 3);
    }

    #[test]
    fn rejects_non_positive_max_elements() {
        assert!(Args::try_parse_from(["npy-peek", "-n", "0", "a.npy"]).is_err());
        assert!(Args::try_parse_from(["npy-peek", "-n", "-4", "a.npy"]).is_err());
    }

    #[test]
    fn path_is_required() {
        assert!(Args::try_parse_from(["npy-peek"]).is_err());
    }
}
