//! Typed reads over text cells.
//!
//! The reader never guesses types; callers pick one per column and convert with
//! [`TextRow::scan`](crate::results::TextRow::scan). The conversion is one-way and lossy
//! in one spot: the shell prints SQL NULL and `''` identically, so an empty field reads as
//! `None` for every `Option<T>` and as `""` for a plain `String`. Columns where that
//! difference matters should be stored with a sentinel or selected through `quote()`.

use chrono::{NaiveDate, NaiveDateTime};

use crate::types::TIMESTAMP_FORMAT;

/// Conversion from one shell output field.
pub trait FromCell: Sized {
    /// Type name used in scan errors.
    const TARGET: &'static str;

    /// `None` on a field that does not parse. `cell` is `None` when the field was absent.
    fn from_cell(cell: Option<&str>) -> Option<Self>;
}

impl FromCell for String {
    const TARGET: &'static str = "text";

    fn from_cell(cell: Option<&str>) -> Option<Self> {
        Some(cell.unwrap_or_default().to_string())
    }
}

macro_rules! impl_from_cell_parse {
    ($($ty:ty => $name:literal),* $(,)?) => {
        $(
            impl FromCell for $ty {
                const TARGET: &'static str = $name;

                fn from_cell(cell: Option<&str>) -> Option<Self> {
                    cell?.trim().parse().ok()
                }
            }
        )*
    };
}

impl_from_cell_parse!(
    i64 => "i64",
    i32 => "i32",
    u32 => "u32",
    u64 => "u64",
    usize => "usize",
    f64 => "f64",
);

impl FromCell for bool {
    const TARGET: &'static str = "bool";

    fn from_cell(cell: Option<&str>) -> Option<Self> {
        match cell?.trim() {
            "1" | "true" | "TRUE" => Some(true),
            "0" | "false" | "FALSE" => Some(false),
            other => other.parse::<i64>().ok().map(|n| n != 0),
        }
    }
}

impl FromCell for NaiveDateTime {
    const TARGET: &'static str = "timestamp";

    fn from_cell(cell: Option<&str>) -> Option<Self> {
        let text = cell?.trim();
        NaiveDateTime::parse_from_str(text, TIMESTAMP_FORMAT)
            .or_else(|_| NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S%.f"))
            .or_else(|_| NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f"))
            .ok()
    }
}

impl FromCell for NaiveDate {
    const TARGET: &'static str = "date";

    fn from_cell(cell: Option<&str>) -> Option<Self> {
        NaiveDate::parse_from_str(cell?.trim(), "%Y-%m-%d").ok()
    }
}

impl<T: FromCell> FromCell for Option<T> {
    const TARGET: &'static str = T::TARGET;

    fn from_cell(cell: Option<&str>) -> Option<Self> {
        match cell {
            None | Some("") => Some(None),
            Some(text) => T::from_cell(Some(text)).map(Some),
        }
    }
}
