use std::collections::VecDeque;
use std::sync::Arc;

use super::row::TextRow;

/// Outcome of advancing a [`Rows`] cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fetch {
    /// The destination buffer now holds the next row.
    Row,
    /// No rows remain. Not an error.
    Exhausted,
}

/// Forward-only cursor over a query's rows.
#[derive(Debug, Clone)]
pub struct Rows {
    columns: Arc<Vec<String>>,
    pending: VecDeque<TextRow>,
}

impl Rows {
    pub(crate) fn new(columns: Arc<Vec<String>>, rows: Vec<TextRow>) -> Self {
        Self {
            columns,
            pending: rows.into(),
        }
    }

    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Move to the next row, writing its fields into `dest` by position.
    ///
    /// Positions past the end of the row are set to `None`; fields past the end of
    /// `dest` are dropped. `dest` is left untouched once the cursor is exhausted.
    pub fn advance(&mut self, dest: &mut [Option<String>]) -> Fetch {
        let Some(row) = self.pending.pop_front() else {
            return Fetch::Exhausted;
        };
        let mut fields = row.values.into_iter();
        for slot in dest.iter_mut() {
            *slot = fields.next().flatten();
        }
        Fetch::Row
    }
}

impl Iterator for Rows {
    type Item = TextRow;

    fn next(&mut self) -> Option<TextRow> {
        self.pending.pop_front()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.pending.len(), Some(self.pending.len()))
    }
}
