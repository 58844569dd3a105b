// Copyright 2026 the SISCONI authors
// Licensed under the Apache License, Version 2.0

use sisconi_app::{Child, NextDose, Sex};
use sisconi_table::{Column, SortDirection, TableEngine, filter_by_query, paginate, sort_by};
use sisconi_testkit::{sample_children, sample_next_doses};

fn child_columns() -> Vec<Column<Child>> {
    vec![
        Column::new("id", "ID", |child: &Child| child.id.get().into()),
        Column::new("numero_documento", "Documento", |child: &Child| {
            child.document_number.as_str().into()
        }),
        Column::new("nombres", "Nombres", |child: &Child| {
            child.first_names.as_str().into()
        }),
        Column::new("apellidos", "Apellidos", |child: &Child| {
            child.last_names.as_str().into()
        }),
        Column::new("fecha_nacimiento", "F. nacimiento", |child: &Child| {
            child.birth_date.to_string().into()
        }),
    ]
}

fn dose_columns() -> Vec<Column<NextDose>> {
    vec![
        Column::new("vacuna", "Vacuna", |dose: &NextDose| {
            dose.vaccine_name.as_str().into()
        }),
        Column::new("dosis", "Dosis", |dose: &NextDose| dose.dose_number.into()),
        Column::new("edad", "Edad (m)", |dose: &NextDose| {
            dose.target_age_months.into()
        }),
        Column::new("estado", "Estado", |dose: &NextDose| {
            dose.status.as_str().into()
        }),
    ]
}

#[test]
fn roster_search_narrows_across_all_columns() {
    let children = sample_children(10);
    let columns = child_columns();

    let by_surname = filter_by_query(&children, "cedeño", &columns);
    assert!(!by_surname.is_empty());
    assert!(
        by_surname
            .iter()
            .all(|child| child.last_names.contains("Cedeño"))
    );

    // Same match without the accent.
    let folded = filter_by_query(&children, "cedeno", &columns);
    assert_eq!(by_surname.len(), folded.len());

    let by_document = filter_by_query(&children, "0900020013", &columns);
    assert_eq!(by_document.len(), 1);
}

#[test]
fn roster_pages_hold_together_under_search_and_sort() {
    let children = sample_children(25);
    let mut engine = TableEngine::new(child_columns(), 10);

    let full = engine.view(&children);
    assert_eq!(full.total, 25);
    assert_eq!(full.pages, 3);
    assert_eq!(full.rows.len(), 10);

    engine.set_page(5);
    let clamped = engine.view(&children);
    assert_eq!(clamped.page, 3);
    assert_eq!(clamped.rows.len(), 5);

    engine.cycle_sort("apellidos");
    let sorted = engine.view(&children);
    let surnames: Vec<&str> = sorted
        .matched
        .iter()
        .map(|child| child.last_names.as_str())
        .collect();
    let mut expected = surnames.clone();
    expected.sort_by_key(|name| name.to_lowercase().replace('á', "a").replace('é', "e"));
    assert_eq!(surnames.len(), 25);
    assert_eq!(surnames, expected);
}

#[test]
fn overdue_predicate_matches_server_status_only() {
    let doses = sample_next_doses();
    let overdue_count = doses.iter().filter(|dose| dose.is_overdue()).count();

    let mut engine = TableEngine::new(dose_columns(), 50);
    engine.set_filter("solo atrasadas", NextDose::is_overdue);

    let view = engine.view(&doses);
    assert_eq!(view.total, overdue_count);
    assert!(view.rows.iter().all(|dose| dose.status == "ATRASADA"));

    engine.clear_filter("solo atrasadas");
    assert_eq!(engine.view(&doses).total, doses.len());
}

#[test]
fn schedule_export_reflects_the_filtered_set() {
    let doses = sample_next_doses();
    let mut engine = TableEngine::new(dose_columns(), 2);
    engine.set_query("pentavalente");
    engine.set_sort("edad", SortDirection::Asc);

    let view = engine.view(&doses);
    let csv = engine.export_csv(&doses).expect("csv should serialize");
    let lines: Vec<&str> = csv.lines().collect();

    assert_eq!(lines[0], "vacuna,dosis,edad,estado");
    // Header plus every match, not just the two visible rows.
    assert_eq!(lines.len(), view.matched.len() + 1);
    assert!(view.matched.len() > view.rows.len());
    assert!(lines[1..].iter().all(|line| line.starts_with("Pentavalente")));
}

#[test]
fn standalone_utilities_compose_like_the_engine() {
    let children = sample_children(9);
    let columns = child_columns();

    let filtered = filter_by_query(&children, "", &columns);
    let sorted = sort_by(filtered, &columns[3], SortDirection::Desc);
    let paged = paginate(&sorted, 2, 4);

    assert_eq!(paged.total, 9);
    assert_eq!(paged.pages, 3);
    assert_eq!(paged.page, 2);
    assert_eq!(paged.slice.len(), 4);

    let mut engine = TableEngine::new(columns, 4);
    engine.set_sort("apellidos", SortDirection::Desc);
    engine.set_page(2);
    let view = engine.view(&children);

    let by_hand: Vec<i64> = paged.slice.iter().map(|child| child.id.get()).collect();
    let by_engine: Vec<i64> = view.rows.iter().map(|child| child.id.get()).collect();
    assert_eq!(by_hand, by_engine);
}

#[test]
fn sex_filter_composes_with_query_like_the_clinic_screen() {
    let children = sample_children(12);
    let mut engine = TableEngine::new(child_columns(), 50);
    engine.set_filter("sexo", |child: &Child| child.sex == Sex::Female);

    let females = engine.view(&children);
    assert!(females.total > 0);
    assert!(females.rows.iter().all(|child| child.sex == Sex::Female));

    engine.set_query("zzz-no-match");
    let none = engine.view(&children);
    assert_eq!(none.total, 0);
    assert!(none.rows.is_empty());
}
