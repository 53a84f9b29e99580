use std::str::FromStr;
use std::str::Utf8Error;

use thiserror::Error;

pub type ParseResult<T> = Result<T, ParseError>;

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("Unexpected end of input, expected '{exp}'")]
    UnexpectedEof { exp: char },

    #[error("Expected \"{exp}\", but got \"{got}\"")]
    UnexpectedSlice { exp: String, got: String },
}

/// Consumes the slice until a non-ascii whitespace character is reached.
pub fn take_ws(bytes: &[u8]) -> &[u8] {
    let mut i = bytes.len();
    for (j, b) in bytes.iter().enumerate() {
        if b.is_ascii_whitespace() {
            continue;
        }

        i = j;
        break;
    }

    &bytes[i..]
}

/// Like `take_ws`, but trims both ends of the slice.
pub fn trim_ws(bytes: &[u8]) -> &[u8] {
    let bytes = take_ws(bytes);

    let mut end = bytes.len();
    while let [.., b] = &bytes[..end] {
        if !b.is_ascii_whitespace() {
            break;
        }

        end -= 1;
    }

    &bytes[..end]
}

/// Takes the next character from the slice. If none is found, the slice is left as-is.
pub const fn take_1(bytes: &[u8]) -> (Option<u8>, &[u8]) {
    let [b, bytes @ ..] = bytes else {
        return (None, bytes);
    };

    (Some(*b), bytes)
}

/// Expects `bytes` to start with `bs`, and consumes it. Otherwise, returns the mismatch.
pub fn expect_slice<'a>(bs: &[u8], bytes: &'a [u8]) -> ParseResult<&'a [u8]> {
    if let Some(rest) = bytes.strip_prefix(bs) {
        return Ok(rest);
    }

    if bytes.is_empty() {
        return Err(ParseError::UnexpectedEof {
            exp: bs.first().copied().unwrap_or_default() as char,
        });
    }

    let n = bs.len().min(bytes.len());

    Err(ParseError::UnexpectedSlice {
        exp: String::from_utf8_lossy(bs).to_string(),
        got: String::from_utf8_lossy(&bytes[..n]).to_string(),
    })
}

/// Removes every leading `open` and every trailing `close` byte, ignoring surrounding whitespace.
///
/// Both delimiters are optional, so `(3,7)`, `3,7)` and `3,7` all yield `3,7`.
pub fn strip_enclosing(open: u8, close: u8, bytes: &[u8]) -> &[u8] {
    let mut bytes = trim_ws(bytes);

    while let [b, rest @ ..] = bytes {
        if *b != open {
            break;
        }

        bytes = rest;
    }

    while let [rest @ .., b] = bytes {
        if *b != close {
            break;
        }

        bytes = rest;
    }

    bytes
}

/// Iterates over the fields of `bytes` separated by `sep`.
///
/// An empty slice still yields a single, empty field.
pub fn split_fields(sep: u8, bytes: &[u8]) -> impl Iterator<Item = &[u8]> {
    bytes.split(move |&b| b == sep)
}

#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("Error parsing bytes from UTF-8: {0}")]
    InvalidUtf8(#[from] Utf8Error),

    #[error("Failed to convert \"{str}\"")]
    ParseError { str: String },
}

/// Converts `&[u8]` to `T` if `T: FromStr`. Surrounding whitespace is ignored.
pub fn convert<T: FromStr>(bytes: &[u8]) -> Result<T, ConvertError> {
    let str = std::str::from_utf8(trim_ws(bytes))?;

    let Ok(res) = str.parse::<T>() else {
        return Err(ConvertError::ParseError {
            str: str.to_string(),
        });
    };

    Ok(res)
}
