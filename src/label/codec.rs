use std::fmt;
use thiserror::Error;

/// Errors produced when building a charset
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CharsetError {
    #[error("charset cannot be empty")]
    Empty,

    #[error("charset contains duplicate symbol '{0}'")]
    Duplicate(char),
}

/// An ordered set of unique label symbols
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Charset {
    symbols: Vec<char>,
}

impl Charset {
    /// Builds a charset from its symbols in order
    ///
    /// # Examples
    ///
    /// ```
    /// use dom4in_collector::label::Charset;
    ///
    /// let charset = Charset::new("abc").unwrap();
    /// assert_eq!(charset.len(), 3);
    /// assert!(Charset::new("aba").is_err());
    /// ```
    pub fn new(symbols: &str) -> Result<Self, CharsetError> {
        let mut seen = Vec::new();
        for c in symbols.chars() {
            if seen.contains(&c) {
                return Err(CharsetError::Duplicate(c));
            }
            seen.push(c);
        }
        if seen.is_empty() {
            return Err(CharsetError::Empty);
        }
        Ok(Self { symbols: seen })
    }

    /// Number of symbols (the base C)
    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// Position of a symbol in the charset
    pub fn position(&self, symbol: char) -> Option<usize> {
        self.symbols.iter().position(|&c| c == symbol)
    }

    fn symbol(&self, position: usize) -> char {
        self.symbols[position]
    }
}

impl fmt::Display for Charset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for c in &self.symbols {
            write!(f, "{}", c)?;
        }
        Ok(())
    }
}

/// Number of labels of `length` symbols over a charset of `charset_len` symbols
///
/// Returns `None` when `charset_len^length` does not fit in a `u64`.
pub fn space_size(charset_len: usize, length: u32) -> Option<u64> {
    (charset_len as u64).checked_pow(length)
}

/// Encodes `index` as a label of exactly `length` symbols
///
/// Repeatedly takes `index mod C`, then integer-divides by C, and reverses
/// the collected symbols. Indices at or beyond `C^length` wrap silently, so
/// callers keep `index` inside the length space.
///
/// # Examples
///
/// ```
/// use dom4in_collector::label::{encode_label, Charset};
///
/// let charset = Charset::new("abcdefghijklmnopqrstuvwxyz").unwrap();
/// assert_eq!(encode_label(0, 3, &charset), "aaa");
/// assert_eq!(encode_label(27, 2, &charset), "bb");
/// ```
pub fn encode_label(index: u64, length: u32, charset: &Charset) -> String {
    let base = charset.len() as u64;
    let mut remaining = index;
    let mut symbols = Vec::with_capacity(length as usize);
    for _ in 0..length {
        symbols.push(charset.symbol((remaining % base) as usize));
        remaining /= base;
    }
    symbols.iter().rev().collect()
}

/// Decodes a label back to its index, the inverse of [`encode_label`]
///
/// Returns `None` if the label contains a symbol outside the charset or its
/// index overflows a `u64`.
pub fn decode_label(label: &str, charset: &Charset) -> Option<u64> {
    let base = charset.len() as u64;
    label.chars().try_fold(0u64, |acc, c| {
        let digit = charset.position(c)? as u64;
        acc.checked_mul(base)?.checked_add(digit)
    })
}
