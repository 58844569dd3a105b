// Copyright 2026 the SISCONI authors
// Licensed under the Apache License, Version 2.0

use crate::value::CellValue;

/// Describes one displayable/searchable field of a record: a stable key, a
/// human-readable header, and the accessor producing the cell value. Each
/// screen supplies its own column set, so the pipeline stays generic over the
/// record shape.
pub struct Column<R> {
    pub key: &'static str,
    pub header: &'static str,
    accessor: fn(&R) -> CellValue,
}

impl<R> Column<R> {
    pub const fn new(key: &'static str, header: &'static str, accessor: fn(&R) -> CellValue) -> Self {
        Self {
            key,
            header,
            accessor,
        }
    }

    pub fn value(&self, record: &R) -> CellValue {
        (self.accessor)(record)
    }
}

impl<R> Clone for Column<R> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<R> Copy for Column<R> {}

impl<R> std::fmt::Debug for Column<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Column")
            .field("key", &self.key)
            .field("header", &self.header)
            .finish()
    }
}
