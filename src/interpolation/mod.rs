//! The one place SQL text meets caller values.
//!
//! The shell driver has no prepared statements, so collaborators render values into SQL
//! text through these helpers instead of hand-rolled quote doubling. This narrows the
//! injection surface; it does not remove it the way real binding would.

use std::borrow::Cow;

mod scanner;

use scanner::{
    State, is_block_comment_end, is_block_comment_start, is_line_comment_start, scan_digits,
};

use crate::error::StoreDbError;
use crate::types::RowValues;

/// Quote text as a single-quoted SQL string literal, doubling embedded quotes.
///
/// # Errors
/// Returns `StoreDbError::ParameterError` if the text contains a NUL byte.
pub fn quote_literal(text: &str) -> Result<String, StoreDbError> {
    if text.contains('\0') {
        return Err(StoreDbError::ParameterError(
            "text literal contains NUL byte".into(),
        ));
    }
    let mut out = String::with_capacity(text.len() + 2);
    out.push('\'');
    for ch in text.chars() {
        if ch == '\'' {
            out.push('\'');
        }
        out.push(ch);
    }
    out.push('\'');
    Ok(out)
}

/// Quote an identifier with double quotes, doubling embedded quotes.
#[must_use]
pub fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

/// Replace `?` and `?N` placeholders with escaped literals.
///
/// Numbering follows SQLite: `?N` is 1-based, and a bare `?` takes one more than the
/// largest index seen so far. Placeholders inside string literals, quoted identifiers,
/// and comments are left alone.
///
/// ```rust
/// use sqlcli_store::interpolation::inline_params;
/// use sqlcli_store::prelude::*;
///
/// let sql = inline_params(
///     "SELECT * FROM sessions WHERE id = ? AND notes <> '?'",
///     &[RowValues::Text("a'b".into())],
/// )
/// .unwrap();
/// assert_eq!(sql, "SELECT * FROM sessions WHERE id = 'a''b' AND notes <> '?'");
/// ```
///
/// Returns a borrowed `Cow` when nothing was substituted.
///
/// # Errors
/// Returns `StoreDbError::ParameterError` when a placeholder refers past the supplied
/// values or a value has no literal form.
pub fn inline_params<'a>(
    sql: &'a str,
    params: &[RowValues],
) -> Result<Cow<'a, str>, StoreDbError> {
    if params.is_empty() {
        return Ok(Cow::Borrowed(sql));
    }

    let bytes = sql.as_bytes();
    let mut out: Option<String> = None;
    let mut copied = 0;
    let mut highest = 0usize;
    let mut state = State::Normal;
    let mut idx = 0;

    while idx < bytes.len() {
        let b = bytes[idx];
        match state {
            State::Normal => match b {
                b'\'' => state = State::SingleQuoted,
                b'"' => state = State::DoubleQuoted,
                b'`' => state = State::Backticked,
                b'[' => state = State::Bracketed,
                _ if is_line_comment_start(bytes, idx) => {
                    state = State::LineComment;
                    idx += 1;
                }
                _ if is_block_comment_start(bytes, idx) => {
                    state = State::BlockComment;
                    idx += 1;
                }
                b'?' => {
                    let (end, position) = match scan_digits(bytes, idx + 1) {
                        Some((end, digits)) => {
                            let position = digits.parse::<usize>().map_err(|e| {
                                StoreDbError::ParameterError(format!(
                                    "placeholder ?{digits} is not a valid index: {e}"
                                ))
                            })?;
                            (end, position)
                        }
                        None => (idx + 1, highest + 1),
                    };
                    let value = position
                        .checked_sub(1)
                        .and_then(|i| params.get(i))
                        .ok_or_else(|| {
                            StoreDbError::ParameterError(format!(
                                "placeholder ?{position} has no value ({} supplied)",
                                params.len()
                            ))
                        })?;
                    highest = highest.max(position);

                    let buf = out.get_or_insert_with(|| String::with_capacity(sql.len() + 16));
                    buf.push_str(&sql[copied..idx]);
                    buf.push_str(&value.to_sql_literal()?);
                    copied = end;
                    idx = end;
                    continue;
                }
                _ => {}
            },
            State::SingleQuoted | State::DoubleQuoted | State::Backticked => {
                let close = match state {
                    State::SingleQuoted => b'\'',
                    State::DoubleQuoted => b'"',
                    _ => b'`',
                };
                if b == close {
                    if bytes.get(idx + 1) == Some(&close) {
                        idx += 1; // doubled quote stays inside
                    } else {
                        state = State::Normal;
                    }
                }
            }
            State::Bracketed => {
                if b == b']' {
                    state = State::Normal;
                }
            }
            State::LineComment => {
                if b == b'\n' {
                    state = State::Normal;
                }
            }
            State::BlockComment => {
                if is_block_comment_end(bytes, idx) {
                    state = State::Normal;
                    idx += 1;
                }
            }
        }
        idx += 1;
    }

    match out {
        Some(mut buf) => {
            buf.push_str(&sql[copied..]);
            Ok(Cow::Owned(buf))
        }
        None => Ok(Cow::Borrowed(sql)),
    }
}
