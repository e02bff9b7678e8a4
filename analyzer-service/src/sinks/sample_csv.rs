use std::io::Write;

use charge_client::domain::Column;
use serde::Serialize;

use super::csv_export::ExportError;
use crate::sources::charge_sessions_csv_file::REQUIRED_COLUMNS;

pub const SAMPLE_FILE_NAME: &str = "ChargeMEtransactions-sample.csv";

/// Header row of a full ChargeME transaction export, in export order.
pub fn sample_headers() -> [&'static str; 25] {
    [
        Column::SessionId.header(),
        Column::StartTime.header(),
        "Gestartet (UTC)",
        Column::EndTime.header(),
        "Beendet (UTC)",
        Column::MeterStart.header(),
        Column::MeterStop.header(),
        "Ladepunkt-ID",
        "Typ",
        "Ad-Hoc Typ",
        "signierte Lade Daten",
        "EVSE-ID",
        "Ladepunkt Zugriff",
        Column::Location.header(),
        "Adresse",
        "Rückerstattung (EUR)",
        "Währung",
        "Zugriffsschlüssel ID",
        "Zugriffsschlüssel Typ",
        "Zugriffsschlüssel Name",
        "Zugriffsschlüssel Kartenaufdruck",
        Column::Duration.header(),
        Column::PaidDuration.header(),
        Column::ParkingDuration.header(),
        Column::Consumption.header(),
    ]
}

/// Write a header-only `;`-delimited template of the export format.
pub fn write_sample_csv<W: Write>(writer: W) -> Result<(), ExportError> {
    let mut wtr = csv::WriterBuilder::new().delimiter(b';').from_writer(writer);
    wtr.write_record(sample_headers())?;
    wtr.flush()?;
    Ok(())
}

pub fn sample_csv_bytes() -> Result<Vec<u8>, ExportError> {
    let mut buf = Vec::new();
    write_sample_csv(&mut buf)?;
    Ok(buf)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnHelp {
    pub header: &'static str,
    pub description: &'static str,
    pub required: bool,
}

/// What the loader expects from an uploaded export.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExpectedFormat {
    pub delimiter: char,
    pub decimal_separator: char,
    pub columns: Vec<ColumnHelp>,
    pub sample_file: &'static str,
}

fn describe(column: Column) -> &'static str {
    match column {
        Column::SessionId => "Unique id of the charging session",
        Column::StartTime => "Start of the session",
        Column::EndTime => "End of the session",
        Column::Location => "Name of the charging station",
        Column::MeterStart => "Meter reading at start",
        Column::MeterStop => "Meter reading at end",
        Column::Consumption => "Energy delivered",
        Column::Duration => "Charging duration in minutes",
        Column::PaidDuration => "Billed duration",
        Column::ParkingDuration => "Parking duration",
    }
}

pub fn expected_format() -> ExpectedFormat {
    ExpectedFormat {
        delimiter: ';',
        decimal_separator: ',',
        columns: Column::ALL
            .into_iter()
            .map(|column| ColumnHelp {
                header: column.header(),
                description: describe(column),
                required: REQUIRED_COLUMNS.contains(&column),
            })
            .collect(),
        sample_file: SAMPLE_FILE_NAME,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::load_sessions_from_reader;
    use std::io::Cursor;

    #[test]
    fn template_is_a_single_semicolon_header_row() {
        let text = String::from_utf8(sample_csv_bytes().unwrap()).unwrap();
        let lines: Vec<_> = text.lines().collect();

        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].split(';').count(), 25);
        assert!(lines[0].starts_with("Ladevorgangs-ID;Gestartet;Gestartet (UTC);Beendet;"));
        assert!(lines[0].ends_with(";paidDuration;parkingDuration;Verbrauch (kWh)"));
    }

    #[test]
    fn template_loads_as_empty_table_with_every_known_column() {
        let outcome = load_sessions_from_reader(Cursor::new(sample_csv_bytes().unwrap()), 0.49).unwrap();

        assert!(outcome.table.is_empty());
        assert!(outcome.skipped_columns.is_empty());
        assert!(outcome.coercion.is_empty());
        assert_eq!(outcome.table.extra_columns().len(), 15);
        for column in Column::ALL {
            assert!(outcome.table.has_column(column), "{}", column.header());
        }
    }

    #[test]
    fn expected_format_marks_required_columns() {
        let format = expected_format();
        assert_eq!(format.columns.len(), Column::ALL.len());

        let required: Vec<_> = format.columns.iter().filter(|c| c.required).map(|c| c.header).collect();
        assert_eq!(required, vec!["Gestartet", "Verbrauch (kWh)"]);
        assert_eq!(format.sample_file, "ChargeMEtransactions-sample.csv");
    }
}
