use std::marker::PhantomData;

use prettytable::{format, Row, Table};

/// One table line per value, with a fixed header
pub trait ToRow {
    fn columns() -> Row;
    fn to_row(&self) -> Row;
}

pub struct OutputTable<T: ToRow> {
    inner: Table,
    row_type: PhantomData<T>,
}

impl<T> OutputTable<T>
where
    T: ToRow,
{
    pub fn new() -> Self {
        let mut inner = Table::new();
        inner.set_format(
            format::FormatBuilder::new()
                .padding(1, 1)
                .separator(
                    format::LinePosition::Title,
                    format::LineSeparator::new('-', '+', '+', '+'),
                )
                .build(),
        );
        inner.set_titles(T::columns());
        Self {
            inner,
            row_type: PhantomData,
        }
    }

    pub fn from_rows<I: IntoIterator<Item = T>>(rows: I) -> Self {
        let mut table = Self::new();
        for row in rows {
            table.add_row(&row);
        }
        table
    }

    pub fn add_row(&mut self, row: &T) {
        self.inner.add_row(row.to_row());
    }

    pub fn is_empty(&self) -> bool {
        self.inner.len() == 0
    }

    /// Print to stdout, or a placeholder when there are no rows
    pub fn print(&self) {
        if self.is_empty() {
            println!("(none)");
        } else {
            self.inner.printstd();
        }
    }
}
