// Copyright 2026 the SISCONI authors
// Licensed under the Apache License, Version 2.0

use sisconi_app::{Child, HistoryEntry};
use time::Date;

/// Plain-text rendition of the printable vaccination record. The browser
/// print-to-PDF step of the web dashboard becomes a file the user can print
/// from anywhere; layout follows the clinic's card: header, patient block,
/// applied-dose table, signature lines.
pub fn render_cartilla(child: &Child, entries: &[HistoryEntry], printed_on: Date) -> String {
    let mut out = String::new();
    out.push_str("CARTILLA DE VACUNACIÓN INFANTIL\n");
    out.push_str("Subcentro de Salud \u{2014} SISCONI\n");
    out.push_str(&format!("Fecha de impresión: {printed_on}\n"));
    out.push('\n');

    out.push_str("Datos del niño/a\n");
    out.push_str(&format!("  Nombres:    {}\n", child.first_names));
    out.push_str(&format!("  Apellidos:  {}\n", child.last_names));
    out.push_str(&format!("  Documento:  {}\n", child.document_number));
    out.push_str(&format!("  Sexo:       {}\n", child.sex.as_str()));
    out.push_str(&format!("  Nacimiento: {}\n", child.birth_date));
    out.push('\n');

    out.push_str("Información del establecimiento\n");
    out.push_str("  Unidad:  Subcentro / Centro de Salud\n");
    out.push_str("  Ciudad:  Manta, Ecuador\n");
    out.push_str("  Sistema: SISCONI\n");
    out.push('\n');

    out.push_str("Historial de vacunas aplicadas\n");
    out.push_str(&render_history_table(entries));
    out.push('\n');

    out.push_str("____________________________________    ____________________________________\n");
    out.push_str("Firma y sello del establecimiento       Firma del representante\n");
    out.push('\n');
    out.push_str("Nota: esta cartilla es un respaldo de la información registrada en el sistema.\n");
    out
}

fn render_history_table(entries: &[HistoryEntry]) -> String {
    if entries.is_empty() {
        return "  (sin registros aún)\n".to_owned();
    }

    let headers = ["#", "Vacuna", "Dosis", "Fecha", "Observación"];
    let rows: Vec<[String; 5]> = entries
        .iter()
        .enumerate()
        .map(|(index, entry)| {
            [
                (index + 1).to_string(),
                entry.vaccine_name.clone(),
                entry
                    .dose_number
                    .map(|dose| dose.to_string())
                    .unwrap_or_else(|| "-".to_owned()),
                entry
                    .applied_on
                    .map(|date| date.to_string())
                    .unwrap_or_else(|| "-".to_owned()),
                entry.note.clone().unwrap_or_else(|| "-".to_owned()),
            ]
        })
        .collect();

    let mut widths: [usize; 5] = headers.map(str::len);
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row.iter()) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let mut out = String::new();
    out.push_str("  ");
    for (index, header) in headers.iter().enumerate() {
        out.push_str(&pad(header, widths[index]));
        out.push_str("  ");
    }
    out.push('\n');

    for row in &rows {
        out.push_str("  ");
        for (index, cell) in row.iter().enumerate() {
            out.push_str(&pad(cell, widths[index]));
            out.push_str("  ");
        }
        out.push('\n');
    }
    out
}

fn pad(text: &str, width: usize) -> String {
    let len = text.chars().count();
    let mut padded = text.to_owned();
    for _ in len..width {
        padded.push(' ');
    }
    padded
}

#[cfg(test)]
mod tests {
    use super::render_cartilla;
    use sisconi_app::{Child, ChildId, HistoryEntry, Sex};
    use time::macros::date;

    fn sample_child() -> Child {
        Child {
            id: ChildId::new(3),
            document_number: "0912345678".to_owned(),
            first_names: "Luis".to_owned(),
            last_names: "Vera".to_owned(),
            birth_date: date!(2024 - 11 - 03),
            sex: Sex::Male,
        }
    }

    #[test]
    fn cartilla_carries_child_header_and_rows() {
        let entries = vec![
            HistoryEntry {
                vaccine_name: "BCG".to_owned(),
                dose_number: Some(1),
                applied_on: Some(date!(2024 - 11 - 04)),
                note: Some("lote L-200".to_owned()),
            },
            HistoryEntry {
                vaccine_name: "Pentavalente".to_owned(),
                dose_number: Some(2),
                applied_on: None,
                note: None,
            },
        ];

        let rendered = render_cartilla(&sample_child(), &entries, date!(2026 - 08 - 07));
        assert!(rendered.contains("CARTILLA DE VACUNACIÓN INFANTIL"));
        assert!(rendered.contains("Nombres:    Luis"));
        assert!(rendered.contains("Documento:  0912345678"));
        assert!(rendered.contains("Fecha de impresión: 2026-08-07"));
        assert!(rendered.contains("BCG"));
        assert!(rendered.contains("lote L-200"));
        assert!(rendered.contains("Pentavalente"));
        assert!(rendered.contains("Firma del representante"));
    }

    #[test]
    fn empty_history_renders_a_placeholder_line() {
        let rendered = render_cartilla(&sample_child(), &[], date!(2026 - 08 - 07));
        assert!(rendered.contains("sin registros aún"));
        assert!(!rendered.contains("Vacuna  "));
    }

    #[test]
    fn table_columns_align_across_rows() {
        let entries = vec![
            HistoryEntry {
                vaccine_name: "BCG".to_owned(),
                dose_number: Some(1),
                applied_on: Some(date!(2024 - 11 - 04)),
                note: None,
            },
            HistoryEntry {
                vaccine_name: "Pentavalente".to_owned(),
                dose_number: Some(1),
                applied_on: Some(date!(2025 - 01 - 15)),
                note: None,
            },
        ];
        let rendered = render_cartilla(&sample_child(), &entries, date!(2026 - 08 - 07));

        let table_lines: Vec<&str> = rendered
            .lines()
            .filter(|line| line.contains("BCG") || line.contains("Pentavalente"))
            .collect();
        assert_eq!(table_lines.len(), 2);
        let date_col_a = table_lines[0].find("2024-11-04").expect("date in first row");
        let date_col_b = table_lines[1].find("2025-01-15").expect("date in second row");
        assert_eq!(date_col_a, date_col_b);
    }
}
