use std::fmt;
use std::ops::Range;

use crate::data::model::{LoadedArray, Scalar, shape_text};

use super::ReportError;
use super::format::{block, sequence};

/// Default number of elements (or 2-D rows) shown.
pub const DEFAULT_MAX_ELEMENTS: usize = 10;
/// Elements shown after the marker of a truncated 1-D preview.
pub const TAIL_LEN: usize = 5;
/// Columns shown for 2-D arrays.
pub const MAX_COLUMNS: usize = 10;

// ---------------------------------------------------------------------------
// Preview – a bounded sample of an array's contents
// ---------------------------------------------------------------------------

/// Sample content chosen by dimensionality.
#[derive(Debug, Clone, PartialEq)]
pub enum Preview {
    /// The array has no elements.
    Empty,
    /// 1-D: a head and, when truncated, the last few elements.
    Sequence {
        head: Vec<Scalar>,
        tail: Option<Vec<Scalar>>,
    },
    /// 2-D: the top-left corner only.
    Block {
        rows: Vec<Vec<Scalar>>,
        columns: usize,
        truncated: bool,
    },
    /// 0-D and N-D (N > 2): the head of the row-major flattening.
    Flattened {
        shape: Vec<usize>,
        head: Vec<Scalar>,
        truncated: bool,
    },
}

/// Pick the sample to show for `array`.
///
/// `max_elements` bounds the 1-D/N-D head and the 2-D row count; zero is
/// treated as one.
pub fn preview(array: &LoadedArray, max_elements: usize) -> Result<Preview, ReportError> {
    let max = max_elements.max(1);
    if array.is_empty() {
        return Ok(Preview::Empty);
    }

    match *array.shape() {
        [len] => {
            let head = elements(array, 0..max.min(len))?;
            let tail = if len > max {
                let count = TAIL_LEN.min(len - max);
                Some(elements(array, len - count..len)?)
            } else {
                None
            };
            Ok(Preview::Sequence { head, tail })
        }
        [rows, cols] => {
            let shown_rows = max.min(rows);
            let shown_cols = MAX_COLUMNS.min(cols);
            let block = (0..shown_rows)
                .map(|r| elements(array, r * cols..r * cols + shown_cols))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Preview::Block {
                rows: block,
                columns: shown_cols,
                truncated: rows > max || cols > MAX_COLUMNS,
            })
        }
        _ => {
            let len = array.len();
            Ok(Preview::Flattened {
                shape: array.shape().to_vec(),
                head: elements(array, 0..max.min(len))?,
                truncated: len > max,
            })
        }
    }
}

fn elements(array: &LoadedArray, range: Range<usize>) -> Result<Vec<Scalar>, ReportError> {
    range
        .map(|i| {
            array
                .element(i)
                .ok_or_else(|| ReportError::unsupported(array.dtype()))
        })
        .collect()
}

impl fmt::Display for Preview {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Preview::Empty => write!(f, "Array is empty"),
            Preview::Sequence { head, tail } => {
                write!(f, "First {} elements:\n{}", head.len(), sequence(head))?;
                if let Some(tail) = tail {
                    write!(
                        f,
                        "\n...\nLast {} elements:\n{}",
                        tail.len(),
                        sequence(tail)
                    )?;
                }
                Ok(())
            }
            Preview::Block {
                rows,
                columns,
                truncated,
            } => {
                write!(
                    f,
                    "First {} rows, {columns} columns:\n{}",
                    rows.len(),
                    block(rows)
                )?;
                if *truncated {
                    write!(f, "\n...")?;
                }
                Ok(())
            }
            Preview::Flattened {
                shape,
                head,
                truncated,
            } => {
                write!(
                    f,
                    "Shape: {}\nFirst {} elements (flattened):\n{}",
                    shape_text(shape),
                    head.len(),
                    sequence(head)
                )?;
                if *truncated {
                    write!(f, "\n...")?;
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ints(range: Range<i64>) -> Vec<Scalar> {
        range.map(Scalar::Int).collect()
    }

    fn int_array(shape: Vec<usize>) -> LoadedArray {
        let len: usize = shape.iter().product();
        let values: Vec<i64> = (0..len as i64).collect();
        LoadedArray::from_elements(shape, &values).unwrap()
    }

    #[test]
    fn long_sequence_shows_head_and_tail() {
        let p = preview(&int_array(vec![25]), 10).unwrap();
        assert_eq!(
            p,
            Preview::Sequence {
                head: ints(0..10),
                tail: Some(ints(20..25)),
            }
        );
        let text = p.to_string();
        assert!(text.starts_with("First 10 elements:\n[0 1 2 3 4 5 6 7 8 9]"));
        assert!(text.ends_with("...\nLast 5 elements:\n[20 21 22 23 24]"));
    }

    #[test]
    fn short_tail_is_clipped() {
        let p = preview(&int_array(vec![12]), 10).unwrap();
        let Preview::Sequence { tail, .. } = p else {
            panic!("expected a sequence");
        };
        assert_eq!(tail, Some(ints(10..12)));
    }

    #[test]
    fn short_sequence_is_shown_whole() {
        let p = preview(&int_array(vec![8]), 10).unwrap();
        assert_eq!(
            p,
            Preview::Sequence {
                head: ints(0..8),
                tail: None,
            }
        );
        assert!(!p.to_string().contains("..."));
    }

    #[test]
    fn block_shows_top_left_corner() {
        let p = preview(&int_array(vec![50, 20]), 10).unwrap();
        let Preview::Block {
            ref rows,
            columns,
            truncated,
        } = p
        else {
            panic!("expected a block");
        };
        assert_eq!(rows.len(), 10);
        assert_eq!(columns, 10);
        assert!(truncated);
        assert_eq!(rows[0], ints(0..10));
        assert_eq!(rows[9], ints(180..190));
        let text = p.to_string();
        assert!(text.starts_with("First 10 rows, 10 columns:\n[[  0   1"));
        assert!(text.ends_with("]]\n..."));
    }

    #[test]
    fn block_truncates_on_columns_alone() {
        let p = preview(&int_array(vec![3, 12]), 10).unwrap();
        assert!(matches!(p, Preview::Block { truncated: true, columns: 10, .. }));

        let p = preview(&int_array(vec![3, 4]), 10).unwrap();
        assert!(matches!(p, Preview::Block { truncated: false, columns: 4, .. }));
        assert!(!p.to_string().contains("..."));
    }

    #[test]
    fn higher_dimensions_flatten_without_tail() {
        let p = preview(&int_array(vec![2, 3, 4]), 10).unwrap();
        assert_eq!(
            p,
            Preview::Flattened {
                shape: vec![2, 3, 4],
                head: ints(0..10),
                truncated: true,
            }
        );
        let text = p.to_string();
        assert!(text.starts_with("Shape: (2, 3, 4)\nFirst 10 elements (flattened):"));
        assert!(text.ends_with("\n..."));
        assert!(!text.contains("Last"));
    }

    #[test]
    fn scalar_goes_through_flattening() {
        let array = LoadedArray::from_elements(vec![], &[2.5f64]).unwrap();
        let p = preview(&array, 10).unwrap();
        assert_eq!(
            p,
            Preview::Flattened {
                shape: vec![],
                head: vec![Scalar::Float(2.5)],
                truncated: false,
            }
        );
    }

    #[test]
    fn empty_arrays_show_marker() {
        let array = LoadedArray::from_elements::<f64>(vec![0, 3], &[]).unwrap();
        let p = preview(&array, 10).unwrap();
        assert_eq!(p, Preview::Empty);
        assert_eq!(p.to_string(), "Array is empty");
    }

    #[test]
    fn max_elements_bounds_rows() {
        let p = preview(&int_array(vec![6, 2]), 3).unwrap();
        let Preview::Block { rows, truncated, .. } = p else {
            panic!("expected a block");
        };
        assert_eq!(rows.len(), 3);
        assert!(truncated);
    }
}
