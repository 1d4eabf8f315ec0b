use anyhow::{Context, Result, bail, ensure};

// ---------------------------------------------------------------------------
// Container preamble
// ---------------------------------------------------------------------------

pub const MAGIC: &[u8] = b"\x93NUMPY";

/// Location and text of the header dictionary in a container.
#[derive(Debug, Clone, PartialEq)]
pub struct Preamble {
    pub version: (u8, u8),
    pub header: String,
    /// Byte offset where element data begins.
    pub data_offset: usize,
}

/// Read magic, version and header length, and return the header text.
///
/// Version 1.x stores a `u16` header length, 2.x and 3.x a `u32`; both
/// little endian.
pub fn read_preamble(bytes: &[u8]) -> Result<Preamble> {
    ensure!(
        bytes.len() >= MAGIC.len() + 2 && bytes.starts_with(MAGIC),
        "missing NUMPY magic string"
    );
    let version = (bytes[6], bytes[7]);
    let (header_len, header_start) = match version.0 {
        1 => {
            let raw = bytes.get(8..10).context("truncated header length")?;
            (u16::from_le_bytes([raw[0], raw[1]]) as usize, 10)
        }
        2 | 3 => {
            let raw = bytes.get(8..12).context("truncated header length")?;
            (
                u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]) as usize,
                12,
            )
        }
        major => bail!("unsupported format version {major}.{}", version.1),
    };
    let data_offset = header_start + header_len;
    let raw = bytes
        .get(header_start..data_offset)
        .with_context(|| format!("header declares {header_len} bytes but file is shorter"))?;
    let header = std::str::from_utf8(raw)
        .context("header is not valid text")?
        .to_string();
    Ok(Preamble {
        version,
        header,
        data_offset,
    })
}

// ---------------------------------------------------------------------------
// PyLiteral – the subset of Python literal syntax used by headers
// ---------------------------------------------------------------------------

/// A parsed Python literal.
#[derive(Debug, Clone, PartialEq)]
pub enum PyLiteral {
    Str(String),
    Int(i64),
    Bool(bool),
    None,
    Tuple(Vec<PyLiteral>),
    List(Vec<PyLiteral>),
    Dict(Vec<(PyLiteral, PyLiteral)>),
}

impl PyLiteral {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            PyLiteral::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Look up a string key in a dict literal.
    pub fn get(&self, key: &str) -> Option<&PyLiteral> {
        match self {
            PyLiteral::Dict(entries) => entries
                .iter()
                .find(|(k, _)| k.as_str() == Some(key))
                .map(|(_, v)| v),
            _ => None,
        }
    }
}

/// Parse one literal occupying the whole input (surrounding whitespace allowed).
pub fn parse_literal(text: &str) -> Result<PyLiteral> {
    let mut parser = Parser {
        chars: text.char_indices().peekable(),
        text,
        depth: 0,
    };
    let value = parser.value()?;
    parser.skip_ws();
    if let Some((pos, c)) = parser.chars.peek() {
        bail!("unexpected '{c}' at offset {pos} after header literal");
    }
    Ok(value)
}

/// Nesting limit for header literals. Real headers go four levels deep at
/// most (dict, field list, field tuple, sub-array shape).
const MAX_DEPTH: usize = 32;

struct Parser<'a> {
    chars: std::iter::Peekable<std::str::CharIndices<'a>>,
    text: &'a str,
    depth: usize,
}

impl Parser<'_> {
    fn skip_ws(&mut self) {
        while self.chars.next_if(|(_, c)| c.is_whitespace()).is_some() {}
    }

    fn peek(&mut self) -> Option<char> {
        self.skip_ws();
        self.chars.peek().map(|&(_, c)| c)
    }

    fn expect(&mut self, want: char) -> Result<()> {
        match self.peek() {
            Some(c) if c == want => {
                self.chars.next();
                Ok(())
            }
            Some(c) => bail!("expected '{want}', found '{c}'"),
            None => bail!("expected '{want}', found end of header"),
        }
    }

    fn value(&mut self) -> Result<PyLiteral> {
        match self.peek() {
            Some('\'') | Some('"') => self.string().map(PyLiteral::Str),
            Some('(') => self.nested(|p| p.sequence(')').map(PyLiteral::Tuple)),
            Some('[') => self.nested(|p| p.sequence(']').map(PyLiteral::List)),
            Some('{') => self.nested(Self::dict),
            Some(c) if c == '-' || c.is_ascii_digit() => self.int(),
            Some(c) if c.is_ascii_alphabetic() => self.word(),
            Some(c) => bail!("unexpected '{c}' in header"),
            None => bail!("unexpected end of header"),
        }
    }

    /// Consume an opening bracket and parse its contents one level deeper.
    fn nested(
        &mut self,
        inner: impl FnOnce(&mut Self) -> Result<PyLiteral>,
    ) -> Result<PyLiteral> {
        ensure!(
            self.depth < MAX_DEPTH,
            "header literal nests deeper than {MAX_DEPTH} levels"
        );
        self.chars.next();
        self.depth += 1;
        let value = inner(self);
        self.depth -= 1;
        value
    }

    fn string(&mut self) -> Result<String> {
        let Some((_, quote)) = self.chars.next() else {
            bail!("unexpected end of header");
        };
        let mut out = String::new();
        loop {
            match self.chars.next() {
                Some((_, c)) if c == quote => return Ok(out),
                Some((_, '\\')) => match self.chars.next() {
                    Some((_, c)) => out.push(c),
                    None => bail!("unterminated string in header"),
                },
                Some((_, c)) => out.push(c),
                None => bail!("unterminated string in header"),
            }
        }
    }

    fn int(&mut self) -> Result<PyLiteral> {
        let start = self.chars.peek().map_or(self.text.len(), |&(i, _)| i);
        let mut end = start;
        if let Some((i, '-')) = self.chars.peek().copied() {
            self.chars.next();
            end = i + 1;
        }
        while let Some((i, c)) = self.chars.next_if(|(_, c)| c.is_ascii_digit()) {
            end = i + c.len_utf8();
        }
        // Python 2 headers may carry a long suffix: `(3L,)`.
        self.chars.next_if(|&(_, c)| c == 'L');
        let digits = &self.text[start..end];
        digits
            .parse::<i64>()
            .map(PyLiteral::Int)
            .with_context(|| format!("invalid integer '{digits}' in header"))
    }

    fn word(&mut self) -> Result<PyLiteral> {
        let mut word = String::new();
        while let Some((_, c)) = self.chars.next_if(|(_, c)| c.is_ascii_alphanumeric()) {
            word.push(c);
        }
        match word.as_str() {
            "True" => Ok(PyLiteral::Bool(true)),
            "False" => Ok(PyLiteral::Bool(false)),
            "None" => Ok(PyLiteral::None),
            other => bail!("unexpected name '{other}' in header"),
        }
    }

    /// Comma-separated items up to `close`; trailing comma allowed.
    fn sequence(&mut self, close: char) -> Result<Vec<PyLiteral>> {
        let mut items = Vec::new();
        loop {
            if self.peek() == Some(close) {
                self.chars.next();
                return Ok(items);
            }
            items.push(self.value()?);
            match self.peek() {
                Some(',') => {
                    self.chars.next();
                }
                Some(c) if c == close => {}
                Some(c) => bail!("expected ',' or '{close}', found '{c}'"),
                None => bail!("unterminated sequence in header"),
            }
        }
    }

    fn dict(&mut self) -> Result<PyLiteral> {
        let mut entries = Vec::new();
        loop {
            if self.peek() == Some('}') {
                self.chars.next();
                return Ok(PyLiteral::Dict(entries));
            }
            let key = self.value()?;
            self.expect(':')?;
            let value = self.value()?;
            entries.push((key, value));
            match self.peek() {
                Some(',') => {
                    self.chars.next();
                }
                Some('}') => {}
                Some(c) => bail!("expected ',' or '}}', found '{c}'"),
                None => bail!("unterminated dict in header"),
            }
        }
    }
}
