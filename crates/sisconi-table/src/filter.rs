// Copyright 2026 the SISCONI authors
// Licensed under the Apache License, Version 2.0

use crate::column::Column;

/// Free-text filtering across the given columns.
///
/// A query that trims to nothing returns every record in the original order.
/// Otherwise a record survives when at least one column's string form contains
/// the query, compared case-insensitively and with Latin diacritics folded
/// ("Jose" finds "José"). Relative order is preserved and records are never
/// mutated.
pub fn filter_by_query<'a, R>(records: &'a [R], query: &str, columns: &[Column<R>]) -> Vec<&'a R> {
    let needle = fold_text(query.trim());
    if needle.is_empty() {
        return records.iter().collect();
    }

    records
        .iter()
        .filter(|&record| matches_query(record, &needle, columns))
        .collect()
}

pub(crate) fn matches_query<R>(record: &R, folded_needle: &str, columns: &[Column<R>]) -> bool {
    columns
        .iter()
        .any(|column| fold_text(&column.value(record).to_text()).contains(folded_needle))
}

/// Lowercases and strips the accents common in Spanish-language records, the
/// closest cheap equivalent of locale collation at "base" sensitivity.
pub(crate) fn fold_text(raw: &str) -> String {
    raw.chars().flat_map(char::to_lowercase).map(fold_char).collect()
}

fn fold_char(ch: char) -> char {
    match ch {
        'á' | 'à' | 'ä' | 'â' | 'ã' => 'a',
        'é' | 'è' | 'ë' | 'ê' => 'e',
        'í' | 'ì' | 'ï' | 'î' => 'i',
        'ó' | 'ò' | 'ö' | 'ô' | 'õ' => 'o',
        'ú' | 'ù' | 'ü' | 'û' => 'u',
        'ñ' => 'n',
        'ç' => 'c',
        _ => ch,
    }
}
