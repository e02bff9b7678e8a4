use std::io::Write;

use charge_client::domain::{
    ChargeSession, Column, ColumnSlot, LocationSummary, MonthlySummary, SessionTable, WeekdaySummary,
};
use time::{format_description::BorrowedFormatItem, macros::format_description, PrimitiveDateTime};

#[derive(thiserror::Error, Debug)]
pub enum ExportError {
    #[error("csv write error: {0}")]
    Csv(#[from] csv::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json write error: {0}")]
    Json(#[from] serde_json::Error),
}

const TIMESTAMP_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");
const TIMESTAMP_SUBSECOND_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day] [hour]:[minute]:[second].[subsecond]");

/// Derived columns appended after the source columns of a session export.
pub const DERIVED_SESSION_HEADERS: [&str; 10] = [
    "Year",
    "Month",
    "Day",
    "Weekday",
    "Weekday_name",
    "Hour",
    "YearMonth",
    "Charging_Hours",
    "Charging_Rate_kWh_per_hour",
    "Cost_EUR",
];

/// Shortest representation that parses back to the same `f64`.
fn push_f64(out: &mut Vec<String>, value: f64) {
    out.push(value.to_string());
}

fn push_opt_f64(out: &mut Vec<String>, value: Option<f64>) {
    out.push(value.map(|v| v.to_string()).unwrap_or_default());
}

fn push_opt<T: ToString>(out: &mut Vec<String>, value: Option<T>) {
    out.push(value.map(|v| v.to_string()).unwrap_or_default());
}

fn push_timestamp(out: &mut Vec<String>, ts: Option<PrimitiveDateTime>) {
    let format = |t: PrimitiveDateTime| {
        let description = if t.nanosecond() == 0 {
            TIMESTAMP_FORMAT
        } else {
            TIMESTAMP_SUBSECOND_FORMAT
        };
        t.format(description).ok()
    };
    out.push(ts.and_then(format).unwrap_or_default());
}

/// A summary row that can be written as one CSV record.
pub trait CsvEncode {
    const HEADER: &'static [&'static str];
    fn write_csv_fields(&self, out: &mut Vec<String>);
}

impl CsvEncode for MonthlySummary {
    const HEADER: &'static [&'static str] = &[
        "Month",
        "Consumption (kWh)",
        "Cost (€)",
        "Sessions",
        "Duration (min)",
        "Duration (hours)",
        "Avg kWh per Session",
        "Avg Charging Rate (kWh/h)",
    ];

    fn write_csv_fields(&self, out: &mut Vec<String>) {
        out.push(self.month.clone());
        push_f64(out, self.consumption_kwh);
        push_f64(out, self.cost_eur);
        out.push(self.sessions.to_string());
        push_opt_f64(out, self.duration_minutes);
        push_opt_f64(out, self.duration_hours);
        push_opt_f64(out, self.avg_kwh_per_session);
        push_opt_f64(out, self.avg_rate_kwh_per_hour);
    }
}

impl CsvEncode for LocationSummary {
    const HEADER: &'static [&'static str] = &[
        "Location",
        "Consumption (kWh)",
        "Cost (€)",
        "Sessions",
        "Duration (min)",
        "Duration (hours)",
        "Avg kWh per Session",
        "Avg Charging Rate (kWh/h)",
    ];

    fn write_csv_fields(&self, out: &mut Vec<String>) {
        out.push(self.location.clone());
        push_f64(out, self.consumption_kwh);
        push_f64(out, self.cost_eur);
        out.push(self.sessions.to_string());
        push_opt_f64(out, self.duration_minutes);
        push_opt_f64(out, self.duration_hours);
        push_opt_f64(out, self.avg_kwh_per_session);
        push_opt_f64(out, self.avg_rate_kwh_per_hour);
    }
}

impl CsvEncode for WeekdaySummary {
    const HEADER: &'static [&'static str] = &[
        "Day",
        "Consumption (kWh)",
        "Cost (€)",
        "Sessions",
        "Avg kWh per Session",
    ];

    fn write_csv_fields(&self, out: &mut Vec<String>) {
        out.push(self.day.to_string());
        push_f64(out, self.consumption_kwh);
        push_f64(out, self.cost_eur);
        out.push(self.sessions.to_string());
        push_opt_f64(out, self.avg_kwh_per_session);
    }
}

/// Write summary rows as comma-delimited CSV with a header row.
pub fn write_summary_csv<W: Write, T: CsvEncode>(writer: W, rows: &[T]) -> Result<(), ExportError> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(T::HEADER)?;

    let mut fields = Vec::with_capacity(T::HEADER.len());
    for row in rows {
        fields.clear();
        row.write_csv_fields(&mut fields);
        wtr.write_record(&fields)?;
    }
    wtr.flush()?;
    metrics::counter!("csv_exports_total").increment(1);
    Ok(())
}

pub fn summary_csv_bytes<T: CsvEncode>(rows: &[T]) -> Result<Vec<u8>, ExportError> {
    let mut buf = Vec::new();
    write_summary_csv(&mut buf, rows)?;
    Ok(buf)
}

fn session_source_field(s: &ChargeSession, slot: ColumnSlot, out: &mut Vec<String>) {
    match slot {
        ColumnSlot::Extra(idx) => out.push(s.extra.get(idx).cloned().unwrap_or_default()),
        ColumnSlot::Known(column) => match column {
            Column::SessionId => push_opt(out, s.session_id.as_deref()),
            Column::StartTime => push_timestamp(out, s.start_time),
            Column::EndTime => push_timestamp(out, s.end_time),
            Column::Location => push_opt(out, s.location.as_deref()),
            Column::MeterStart => push_opt_f64(out, s.meter_start_kwh),
            Column::MeterStop => push_opt_f64(out, s.meter_stop_kwh),
            Column::Consumption => push_opt_f64(out, s.consumption_kwh),
            Column::Duration => push_opt_f64(out, s.duration_minutes),
            Column::PaidDuration => push_opt_f64(out, s.paid_duration),
            Column::ParkingDuration => push_opt_f64(out, s.parking_duration),
        },
    }
}

/// Write a session table: the source columns in their original order, with
/// normalized values, followed by the derived columns.
pub fn write_sessions_csv<W: Write>(writer: W, table: &SessionTable) -> Result<(), ExportError> {
    let mut wtr = csv::Writer::from_writer(writer);

    let mut header: Vec<&str> = table
        .layout()
        .iter()
        .map(|slot| match *slot {
            ColumnSlot::Known(column) => column.header(),
            ColumnSlot::Extra(idx) => table.extra_columns().get(idx).map(String::as_str).unwrap_or(""),
        })
        .collect();
    header.extend(DERIVED_SESSION_HEADERS);
    wtr.write_record(&header)?;

    let mut fields = Vec::with_capacity(header.len());
    for s in table.sessions() {
        fields.clear();
        for slot in table.layout() {
            session_source_field(s, *slot, &mut fields);
        }
        let d = &s.derived;
        push_opt(&mut fields, d.year);
        push_opt(&mut fields, d.month);
        push_opt(&mut fields, d.day);
        push_opt(&mut fields, d.weekday_index);
        push_opt(&mut fields, d.weekday_name);
        push_opt(&mut fields, d.hour);
        push_opt(&mut fields, d.year_month.as_deref());
        push_opt_f64(&mut fields, d.charging_hours);
        push_opt_f64(&mut fields, d.charging_rate_kwh_per_hour);
        push_opt_f64(&mut fields, d.cost_eur);
        wtr.write_record(&fields)?;
    }
    wtr.flush()?;
    metrics::counter!("csv_exports_total").increment(1);
    Ok(())
}

pub fn sessions_csv_bytes(table: &SessionTable) -> Result<Vec<u8>, ExportError> {
    let mut buf = Vec::new();
    write_sessions_csv(&mut buf, table)?;
    Ok(buf)
}
