// Copyright 2026 the SISCONI authors
// Licensed under the Apache License, Version 2.0

use crate::column::Column;
use crate::filter::fold_text;
use crate::value::CellValue;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }
}

/// A sort request: the column key plus a direction. When none is active the
/// insertion order coming from the API is preserved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortSpec {
    pub key: &'static str,
    pub direction: SortDirection,
}

/// Stable sort of a borrowed view over the records.
///
/// When every value under the column is numeric the comparison is numeric;
/// otherwise all values compare by their folded string forms (absent values as
/// the empty string, which sorts first ascending). Mixed-type columns
/// therefore get one consistent total order instead of a pairwise fallback
/// that could cycle. Descending is exactly the reverse of the ascending
/// result, ties included.
pub fn sort_by<'a, R>(
    rows: Vec<&'a R>,
    column: &Column<R>,
    direction: SortDirection,
) -> Vec<&'a R> {
    let mut decorated: Vec<(SortKey, &'a R)> = rows
        .into_iter()
        .map(|row| (SortKey::for_value(&column.value(row)), row))
        .collect();

    let all_numeric = decorated.iter().all(|(key, _)| key.number.is_some());
    if all_numeric {
        decorated.sort_by(|(left, _), (right, _)| {
            left.number
                .unwrap_or_default()
                .total_cmp(&right.number.unwrap_or_default())
        });
    } else {
        decorated.sort_by(|(left, _), (right, _)| left.text.cmp(&right.text));
    }

    let mut sorted: Vec<&'a R> = decorated.into_iter().map(|(_, row)| row).collect();
    if direction == SortDirection::Desc {
        sorted.reverse();
    }
    sorted
}

struct SortKey {
    number: Option<f64>,
    text: String,
}

impl SortKey {
    fn for_value(value: &CellValue) -> Self {
        Self {
            number: value.as_number(),
            text: fold_text(&value.to_text()),
        }
    }
}
