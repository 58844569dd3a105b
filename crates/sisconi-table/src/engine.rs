// Copyright 2026 the SISCONI authors
// Licensed under the Apache License, Version 2.0

use anyhow::Result;

use crate::column::Column;
use crate::export::to_csv;
use crate::filter::{fold_text, matches_query};
use crate::page::paginate;
use crate::sort::{SortDirection, SortSpec, sort_by};

/// Per-screen view state composing the whole pipeline: screen predicates,
/// then the free-text query, then the optional sort, then pagination.
///
/// The engine owns only the controls. Records stay with the caller, are
/// borrowed per [`TableEngine::view`] call, and are never mutated; recomputing
/// a view is idempotent and side-effect free. Changing the query, any named
/// predicate, or the page size snaps back to page 1 so a shrinking result set
/// cannot strand the user on an empty page.
pub struct TableEngine<R> {
    columns: Vec<Column<R>>,
    query: String,
    sort: Option<SortSpec>,
    page: i64,
    page_size: usize,
    filters: Vec<NamedFilter<R>>,
}

struct NamedFilter<R> {
    name: &'static str,
    predicate: Box<dyn Fn(&R) -> bool>,
}

/// What a screen renders: the served page plus the full filtered+sorted set
/// (for "N of M" footers and CSV export of everything that matched, not just
/// the visible page).
#[derive(Debug)]
pub struct TableView<'a, R> {
    pub page: usize,
    pub pages: usize,
    pub total: usize,
    pub rows: Vec<&'a R>,
    pub matched: Vec<&'a R>,
}

impl<R> TableEngine<R> {
    pub fn new(columns: Vec<Column<R>>, page_size: usize) -> Self {
        Self {
            columns,
            query: String::new(),
            sort: None,
            page: 1,
            page_size: page_size.max(1),
            filters: Vec::new(),
        }
    }

    pub fn columns(&self) -> &[Column<R>] {
        &self.columns
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn set_query(&mut self, query: &str) {
        self.query = query.to_owned();
        self.page = 1;
    }

    pub fn sort(&self) -> Option<SortSpec> {
        self.sort
    }

    pub fn set_sort(&mut self, key: &'static str, direction: SortDirection) {
        self.sort = Some(SortSpec { key, direction });
    }

    pub fn clear_sort(&mut self) {
        self.sort = None;
    }

    /// Rotates one column through asc -> desc -> unsorted; picking a different
    /// column starts over at ascending.
    pub fn cycle_sort(&mut self, key: &'static str) {
        self.sort = match self.sort {
            Some(spec) if spec.key == key => match spec.direction {
                SortDirection::Asc => Some(SortSpec {
                    key,
                    direction: SortDirection::Desc,
                }),
                SortDirection::Desc => None,
            },
            _ => Some(SortSpec {
                key,
                direction: SortDirection::Asc,
            }),
        };
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn set_page_size(&mut self, page_size: usize) {
        self.page_size = page_size.max(1);
        self.page = 1;
    }

    pub fn requested_page(&self) -> i64 {
        self.page
    }

    /// Any integer is accepted; the view clamps into the valid range.
    pub fn set_page(&mut self, page: i64) {
        self.page = page;
    }

    /// Installs (or replaces) a named screen predicate, e.g. "sexo" or
    /// "solo atrasadas".
    pub fn set_filter(&mut self, name: &'static str, predicate: impl Fn(&R) -> bool + 'static) {
        self.filters.retain(|filter| filter.name != name);
        self.filters.push(NamedFilter {
            name,
            predicate: Box::new(predicate),
        });
        self.page = 1;
    }

    pub fn clear_filter(&mut self, name: &'static str) {
        let before = self.filters.len();
        self.filters.retain(|filter| filter.name != name);
        if self.filters.len() != before {
            self.page = 1;
        }
    }

    pub fn has_filter(&self, name: &'static str) -> bool {
        self.filters.iter().any(|filter| filter.name == name)
    }

    pub fn view<'a>(&self, records: &'a [R]) -> TableView<'a, R> {
        let needle = fold_text(self.query.trim());

        let mut matched: Vec<&'a R> = records
            .iter()
            .filter(|record| self.filters.iter().all(|filter| (filter.predicate)(record)))
            .filter(|record| needle.is_empty() || matches_query(*record, &needle, &self.columns))
            .collect();

        if let Some(spec) = self.sort
            && let Some(column) = self.columns.iter().find(|column| column.key == spec.key)
        {
            matched = sort_by(matched, column, spec.direction);
        }

        let result = paginate(&matched, self.page, self.page_size);
        TableView {
            page: result.page,
            pages: result.pages,
            total: result.total,
            rows: result.slice,
            matched,
        }
    }

    /// CSV of everything that matched the current controls, ignoring
    /// pagination.
    pub fn export_csv(&self, records: &[R]) -> Result<String> {
        let view = self.view(records);
        to_csv(&view.matched, &self.columns)
    }
}
