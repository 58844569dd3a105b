// Copyright 2026 the SISCONI authors
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow};

use crate::column::Column;

/// Serializes the given records to CSV text.
///
/// The header line carries the column keys in declaration order; each record
/// becomes one line of the columns' string forms. Quoting follows the CSV
/// convention (fields containing commas, quotes, or newlines are wrapped and
/// inner quotes doubled), so a standard parser recovers the original strings.
/// Absent values flatten to empty fields -- that coercion is lossy by design,
/// a re-import cannot distinguish `Null` from an empty string. An empty record
/// list produces an empty string: there is nothing to export.
pub fn to_csv<R>(records: &[&R], columns: &[Column<R>]) -> Result<String> {
    if records.is_empty() {
        return Ok(String::new());
    }

    let mut writer = csv::Writer::from_writer(Vec::new());
    writer
        .write_record(columns.iter().map(|column| column.key))
        .context("write csv header")?;
    for record in records {
        writer
            .write_record(columns.iter().map(|column| column.value(record).to_text()))
            .context("write csv record")?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|error| anyhow!("flush csv buffer: {error}"))?;
    String::from_utf8(bytes).context("csv output is not utf-8")
}

#[cfg(test)]
mod tests {
    use super::to_csv;
    use crate::column::Column;

    struct Row {
        a: &'static str,
        b: &'static str,
    }

    fn columns() -> Vec<Column<Row>> {
        vec![
            Column::new("a", "A", |row: &Row| row.a.into()),
            Column::new("b", "B", |row: &Row| row.b.into()),
        ]
    }

    #[test]
    fn escapes_commas_and_quotes() {
        let rows = vec![Row {
            a: "x,y",
            b: "He said \"hi\"",
        }];
        let refs: Vec<&Row> = rows.iter().collect();
        let csv = to_csv(&refs, &columns()).expect("csv should serialize");

        let mut lines = csv.lines();
        assert_eq!(lines.next(), Some("a,b"));
        assert_eq!(lines.next(), Some("\"x,y\",\"He said \"\"hi\"\"\""));
        assert_eq!(lines.next(), None);
    }

    #[test]
    fn empty_input_produces_no_output() {
        let refs: Vec<&Row> = Vec::new();
        let csv = to_csv(&refs, &columns()).expect("csv should serialize");
        assert!(csv.is_empty());
    }

    #[test]
    fn plain_fields_stay_unquoted() {
        let rows = vec![
            Row { a: "BCG", b: "1" },
            Row {
                a: "Polio",
                b: "2",
            },
        ];
        let refs: Vec<&Row> = rows.iter().collect();
        let csv = to_csv(&refs, &columns()).expect("csv should serialize");
        assert_eq!(csv, "a,b\nBCG,1\nPolio,2\n");
    }

    #[test]
    fn round_trips_through_a_standard_parser() {
        struct Tricky {
            name: &'static str,
            note: Option<&'static str>,
        }
        let columns = vec![
            Column::new("nombre", "Nombre", |row: &Tricky| row.name.into()),
            Column::new("nota", "Nota", |row: &Tricky| row.note.into()),
        ];
        let rows = vec![
            Tricky {
                name: "línea\npartida",
                note: Some("con, coma"),
            },
            Tricky {
                name: "simple",
                note: None,
            },
        ];
        let refs: Vec<&Tricky> = rows.iter().collect();
        let csv = to_csv(&refs, &columns).expect("csv should serialize");

        let mut reader = csv::Reader::from_reader(csv.as_bytes());
        let parsed: Vec<Vec<String>> = reader
            .records()
            .map(|record| {
                record
                    .expect("parse produced csv")
                    .iter()
                    .map(str::to_owned)
                    .collect()
            })
            .collect();

        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0], vec!["línea\npartida", "con, coma"]);
        // Null flattened to "" -- the documented lossy coercion.
        assert_eq!(parsed[1], vec!["simple", ""]);
    }
}
