use std::{
    collections::HashMap,
    fs::File,
    io::Read,
    path::{Path, PathBuf},
};

use charge_client::domain::{Column, ColumnSlot, SessionTable};
use csv::StringRecord;

use crate::transform::{coerce_decimal, coerce_timestamp, derive_session, CoercionReport, RawSession};

/// Columns without which no derived field can be computed.
pub const REQUIRED_COLUMNS: [Column; 2] = [Column::StartTime, Column::Consumption];

#[derive(thiserror::Error, Debug)]
pub enum DataLoadError {
    #[error("failed to open CSV file '{path}': {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed CSV: {0}")]
    Csv(#[from] csv::Error),
    #[error("CSV file has no header row")]
    Empty,
    #[error("required column '{}' not found in CSV header", .0.header())]
    MissingColumn(Column),
}

/// Result of a successful load.
#[derive(Debug, Clone)]
pub struct LoadOutcome {
    pub table: SessionTable,
    pub coercion: CoercionReport,
    /// Known optional columns the export did not include.
    pub skipped_columns: Vec<Column>,
}

/// Loader for ChargeME transaction exports.
///
/// The export is `;`-delimited and uses `,` as decimal separator. Expected
/// header columns (by name, verbatim):
/// - Gestartet, Verbrauch (kWh) (required)
/// - Ladevorgangs-ID, Beendet, Standort
/// - meterValueStart (kWh), meterValueStop (kWh)
/// - Ladedauer (in Minuten), paidDuration, parkingDuration
///
/// Any other column is carried through untouched.
pub struct ChargeSessionsCsvFileSource {
    path: PathBuf,
    tariff_eur_per_kwh: f64,
}

impl ChargeSessionsCsvFileSource {
    pub fn new<P: Into<PathBuf>>(path: P, tariff_eur_per_kwh: f64) -> Self {
        Self {
            path: path.into(),
            tariff_eur_per_kwh,
        }
    }

    pub fn load(&self) -> Result<LoadOutcome, DataLoadError> {
        let file = File::open(&self.path).map_err(|source| DataLoadError::Open {
            path: self.path.clone(),
            source,
        })?;
        let outcome = load_sessions_from_reader(file, self.tariff_eur_per_kwh)?;

        tracing::info!(
            path = %self.path.display(),
            sessions = outcome.table.len(),
            extra_columns = outcome.table.extra_columns().len(),
            coercion_failures = outcome.coercion.total(),
            "charge sessions loaded"
        );
        Ok(outcome)
    }
}

/// Convenience wrapper around [`ChargeSessionsCsvFileSource::load`].
pub fn load_sessions<P: AsRef<Path>>(path: P, tariff_eur_per_kwh: f64) -> Result<LoadOutcome, DataLoadError> {
    ChargeSessionsCsvFileSource::new(path.as_ref(), tariff_eur_per_kwh).load()
}

/// Where each column lives in the header row.
struct HeaderLayout {
    known: HashMap<Column, usize>,
    slots: Vec<ColumnSlot>,
    extra_names: Vec<String>,
    extra_positions: Vec<usize>,
}

impl HeaderLayout {
    fn resolve(headers: &StringRecord) -> Result<Self, DataLoadError> {
        if headers.iter().all(|h| h.trim().is_empty()) {
            return Err(DataLoadError::Empty);
        }

        let mut known = HashMap::new();
        let mut slots = Vec::with_capacity(headers.len());
        let mut extra_names = Vec::new();
        let mut extra_positions = Vec::new();

        for (idx, raw) in headers.iter().enumerate() {
            let name = raw.trim();
            match Column::from_header(name) {
                // A repeated known header is kept as an extra column; the first one wins.
                Some(column) if !known.contains_key(&column) => {
                    known.insert(column, idx);
                    slots.push(ColumnSlot::Known(column));
                }
                _ => {
                    slots.push(ColumnSlot::Extra(extra_names.len()));
                    extra_names.push(name.to_string());
                    extra_positions.push(idx);
                }
            }
        }

        for column in REQUIRED_COLUMNS {
            if !known.contains_key(&column) {
                return Err(DataLoadError::MissingColumn(column));
            }
        }

        Ok(Self {
            known,
            slots,
            extra_names,
            extra_positions,
        })
    }

    fn skipped(&self) -> Vec<Column> {
        Column::ALL
            .into_iter()
            .filter(|c| !self.known.contains_key(c))
            .collect()
    }

    /// Cell of a known column; `None` when the column is absent from the export.
    fn cell<'r>(&self, record: &'r StringRecord, column: Column) -> Option<&'r str> {
        self.known
            .get(&column)
            .map(|&idx| record.get(idx).unwrap_or(""))
    }
}

fn parse_optional_string(s: &str) -> Option<String> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn record_to_raw_session(record: &StringRecord, layout: &HeaderLayout, report: &mut CoercionReport) -> RawSession {
    let text = |column: Column| layout.cell(record, column).and_then(parse_optional_string);
    let mut timestamp = |column: Column| {
        let raw = layout.cell(record, column)?;
        report.absorb(coerce_timestamp(column, raw))
    };
    let start_time = timestamp(Column::StartTime);
    let end_time = timestamp(Column::EndTime);

    let mut number = |column: Column| {
        let raw = layout.cell(record, column)?;
        report.absorb(coerce_decimal(column, raw))
    };
    let meter_start_kwh = number(Column::MeterStart);
    let meter_stop_kwh = number(Column::MeterStop);
    let consumption_kwh = number(Column::Consumption);
    let duration_minutes = number(Column::Duration);
    let paid_duration = number(Column::PaidDuration);
    let parking_duration = number(Column::ParkingDuration);

    let extra = layout
        .extra_positions
        .iter()
        .map(|&idx| record.get(idx).unwrap_or("").to_string())
        .collect();

    RawSession {
        session_id: text(Column::SessionId),
        start_time,
        end_time,
        location: text(Column::Location),
        meter_start_kwh,
        meter_stop_kwh,
        consumption_kwh,
        duration_minutes,
        paid_duration,
        parking_duration,
        extra,
    }
}

fn log_coercion_report(report: &CoercionReport) {
    for (column, failures) in report.iter() {
        tracing::warn!(column, failures, "values could not be coerced and were treated as missing");
    }
    metrics::counter!("charge_sessions_coercion_failures_total").increment(report.total() as u64);
}

/// Load a ChargeME export from any reader.
///
/// Individual malformed cells never fail the load; they become null and are
/// counted in the returned [`CoercionReport`].
pub fn load_sessions_from_reader<R: Read>(reader: R, tariff_eur_per_kwh: f64) -> Result<LoadOutcome, DataLoadError> {
    let mut rdr = csv::ReaderBuilder::new()
        .delimiter(b';')
        .flexible(true)
        .from_reader(reader);
    // Undecodable bytes are replaced with U+FFFD.
    let headers = StringRecord::from_byte_record_lossy(rdr.byte_headers()?.clone());
    let layout = HeaderLayout::resolve(&headers)?;

    let mut report = CoercionReport::default();
    let mut sessions = Vec::new();
    for result in rdr.byte_records() {
        // Rows whose cells are all empty stay in the table as all-null sessions.
        let record = StringRecord::from_byte_record_lossy(result?);
        let raw = record_to_raw_session(&record, &layout, &mut report);
        sessions.push(derive_session(raw, tariff_eur_per_kwh));
    }

    let skipped_columns = layout.skipped();
    if !skipped_columns.is_empty() {
        let names: Vec<_> = skipped_columns.iter().map(|c| c.header()).collect();
        tracing::info!(columns = ?names, "optional columns not present in export");
    }
    log_coercion_report(&report);
    metrics::counter!("charge_sessions_loaded_total").increment(sessions.len() as u64);

    let table = SessionTable::new(layout.slots, layout.extra_names, tariff_eur_per_kwh, sessions);
    Ok(LoadOutcome {
        table,
        coercion: report,
        skipped_columns,
    })
}
