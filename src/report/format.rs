use std::fmt;

use crate::data::model::{FieldValue, Scalar};

/// Wrap printed sequences before this column, as NumPy does.
pub const LINE_WIDTH: usize = 75;

// ---------------------------------------------------------------------------
// Single values
// ---------------------------------------------------------------------------

/// Text of one element inside a printed array: `1.`, `0.25`, `True`, `(3, 1.5)`.
pub fn element_text(value: &Scalar) -> String {
    match value {
        Scalar::Bool(b) => bool_text(*b).to_string(),
        Scalar::Int(i) => i.to_string(),
        Scalar::UInt(u) => u.to_string(),
        Scalar::Float(v) => float_cell(*v),
        Scalar::Float32(v) => float_cell(*v),
        Scalar::Record(fields) => record_text(fields),
    }
}

/// Text of a value printed on its own, e.g. a minimum: floats keep a
/// trailing zero (`1.0`).
pub fn scalar_text(value: &Scalar) -> String {
    let text = element_text(value);
    match value {
        Scalar::Float(_) | Scalar::Float32(_) if text.ends_with('.') => text + "0",
        _ => text,
    }
}

/// Fixed six-decimal text for derived statistics.
pub fn fixed6(v: f64) -> String {
    if v.is_nan() {
        "nan".to_string()
    } else if v.is_infinite() {
        infinity_text(v).to_string()
    } else {
        format!("{v:.6}")
    }
}

fn bool_text(b: bool) -> &'static str {
    if b { "True" } else { "False" }
}

fn infinity_text(v: f64) -> &'static str {
    if v > 0.0 { "inf" } else { "-inf" }
}

fn float_cell<F>(v: F) -> String
where
    F: Into<f64> + fmt::Display + fmt::LowerExp + Copy,
{
    let wide: f64 = v.into();
    if wide.is_nan() {
        return "nan".to_string();
    }
    if wide.is_infinite() {
        return infinity_text(wide).to_string();
    }
    let magnitude = wide.abs();
    if magnitude != 0.0 && !(1e-4..1e16).contains(&magnitude) {
        return signed_exponent(&format!("{v:e}"));
    }
    if wide.fract() == 0.0 {
        format!("{wide:.0}.")
    } else {
        format!("{v}")
    }
}

/// `1e20` -> `1e+20`, `1.5e-5` -> `1.5e-05`.
fn signed_exponent(text: &str) -> String {
    match text.split_once('e') {
        Some((mantissa, exponent)) => {
            let (sign, digits) = match exponent.strip_prefix('-') {
                Some(digits) => ('-', digits),
                None => ('+', exponent),
            };
            format!("{mantissa}e{sign}{digits:0>2}")
        }
        None => text.to_string(),
    }
}

fn record_text(fields: &[FieldValue]) -> String {
    let parts: Vec<String> = fields
        .iter()
        .map(|field| match field {
            FieldValue::One(value) => element_text(value),
            FieldValue::Many(values) => sequence(values),
        })
        .collect();
    format!("({})", parts.join(", "))
}

// ---------------------------------------------------------------------------
// Sequences and blocks
// ---------------------------------------------------------------------------

/// `[a b c]`, cells right-aligned to a common width and wrapped.
pub fn sequence(values: &[Scalar]) -> String {
    let cells: Vec<String> = values.iter().map(element_text).collect();
    let width = cell_width(values.iter(), &cells);
    let mut out = wrap(&pad(cells, width), "[", 1);
    out.push(']');
    out
}

/// Rows printed as a nested bracket block sharing one column width.
pub fn block(rows: &[Vec<Scalar>]) -> String {
    let cells: Vec<Vec<String>> = rows
        .iter()
        .map(|row| row.iter().map(element_text).collect())
        .collect();
    let width = cell_width(rows.iter().flatten(), cells.iter().flatten());

    let lines: Vec<String> = cells
        .into_iter()
        .enumerate()
        .map(|(i, row)| {
            let prefix = if i == 0 { "[[" } else { " [" };
            let mut line = wrap(&pad(row, width), prefix, 2);
            line.push(']');
            line
        })
        .collect();
    if lines.is_empty() {
        return "[]".to_string();
    }
    format!("{}]", lines.join("\n"))
}

/// Common column width; records are left unpadded.
fn cell_width<'a>(
    values: impl IntoIterator<Item = &'a Scalar>,
    cells: impl IntoIterator<Item = &'a String>,
) -> usize {
    if values
        .into_iter()
        .any(|v| matches!(v, Scalar::Record(_)))
    {
        return 0;
    }
    cells.into_iter().map(String::len).max().unwrap_or(0)
}

fn pad(cells: Vec<String>, width: usize) -> Vec<String> {
    cells
        .into_iter()
        .map(|cell| format!("{cell:>width$}"))
        .collect()
}

fn wrap(cells: &[String], prefix: &str, indent: usize) -> String {
    let mut out = prefix.to_string();
    let mut column = prefix.len();
    for (i, cell) in cells.iter().enumerate() {
        if i > 0 {
            // +2 leaves room for the separator and a closing bracket.
            if column + cell.len() + 2 > LINE_WIDTH {
                out.push('\n');
                out.push_str(&" ".repeat(indent));
                column = indent;
            } else {
                out.push(' ');
                column += 1;
            }
        }
        out.push_str(cell);
        column += cell.len();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn floats_print_like_numpy() {
        assert_eq!(element_text(&Scalar::Float(1.0)), "1.");
        assert_eq!(element_text(&Scalar::Float(0.25)), "0.25");
        assert_eq!(element_text(&Scalar::Float32(0.1)), "0.1");
        assert_eq!(element_text(&Scalar::Float(f64::NAN)), "nan");
        assert_eq!(element_text(&Scalar::Float(f64::NEG_INFINITY)), "-inf");
        assert_eq!(scalar_text(&Scalar::Float(3.0)), "3.0");
        assert_eq!(scalar_text(&Scalar::Float(3.5)), "3.5");
    }

    #[test]
    fn exponents_carry_a_sign_and_two_digits() {
        assert_eq!(element_text(&Scalar::Float(1e20)), "1e+20");
        assert_eq!(element_text(&Scalar::Float(-2.5e100)), "-2.5e+100");
        assert_eq!(element_text(&Scalar::Float(1.5e-5)), "1.5e-05");
        assert_eq!(element_text(&Scalar::Float32(3e-7)), "3e-07");
    }

    #[test]
    fn bools_and_records() {
        assert_eq!(element_text(&Scalar::Bool(true)), "True");
        let record = Scalar::Record(vec![
            FieldValue::One(Scalar::Int(4)),
            FieldValue::Many(vec![Scalar::Float(1.0), Scalar::Float(2.5)]),
        ]);
        assert_eq!(element_text(&record), "(4, [ 1. 2.5])");
    }

    #[test]
    fn sequence_right_aligns_cells() {
        let values: Vec<Scalar> = [1, 20, 300].into_iter().map(Scalar::Int).collect();
        assert_eq!(sequence(&values), "[  1  20 300]");
        assert_eq!(sequence(&[]), "[]");
    }

    #[test]
    fn long_sequences_wrap() {
        let values: Vec<Scalar> = (1000..1030).map(Scalar::Int).collect();
        let text = sequence(&values);
        let lines: Vec<&str> = text.lines().collect();
        assert!(lines.len() > 1);
        assert!(lines.iter().all(|l| l.len() <= LINE_WIDTH));
        assert!(lines[1].starts_with(' '));
        assert!(text.ends_with("1029]"));
    }

    #[test]
    fn block_nests_rows() {
        let rows = vec![
            vec![Scalar::Int(1), Scalar::Int(2)],
            vec![Scalar::Int(30), Scalar::Int(4)],
        ];
        assert_eq!(block(&rows), "[[ 1  2]\n [30  4]]");
    }

    #[test]
    fn fixed6_handles_non_finite() {
        assert_eq!(fixed6(2.5), "2.500000");
        assert_eq!(fixed6(f64::NAN), "nan");
        assert_eq!(fixed6(f64::INFINITY), "inf");
    }
}
