use std::collections::BTreeMap;

use charge_client::domain::{ChargeSession, Column, DerivedFields};
use time::{
    format_description::{well_known::Rfc3339, BorrowedFormatItem},
    macros::format_description,
    Date, OffsetDateTime, PrimitiveDateTime,
};

/// A non-empty cell that could not be coerced to its column's type.
///
/// Recovered as a null value; counted in a [`CoercionReport`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("could not coerce '{value}' in column '{}'", .column.header())]
pub struct FieldCoercionWarning {
    pub column: Column,
    pub value: String,
}

/// Per-column count of coercion failures seen during one load.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct CoercionReport {
    failures: BTreeMap<&'static str, usize>,
}

impl CoercionReport {
    pub fn record(&mut self, warning: &FieldCoercionWarning) {
        *self.failures.entry(warning.column.header()).or_insert(0) += 1;
    }

    pub fn count(&self, column: Column) -> usize {
        self.failures.get(column.header()).copied().unwrap_or(0)
    }

    pub fn total(&self) -> usize {
        self.failures.values().sum()
    }

    pub fn is_empty(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, usize)> + '_ {
        self.failures.iter().map(|(k, v)| (*k, *v))
    }

    /// Unwrap a coerced value, recording the failure and substituting null.
    pub fn absorb<T>(&mut self, coerced: Result<Option<T>, FieldCoercionWarning>) -> Option<T> {
        coerced.unwrap_or_else(|warning| {
            self.record(&warning);
            None
        })
    }
}

/// Parse a comma-decimal number such as `12,345`.
///
/// Blank cells are null without a warning. Non-finite results are rejected.
pub fn coerce_decimal(column: Column, raw: &str) -> Result<Option<f64>, FieldCoercionWarning> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }

    trimmed
        .replace(',', ".")
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .map(Some)
        .ok_or_else(|| FieldCoercionWarning {
            column,
            value: trimmed.to_string(),
        })
}

const DATETIME_FORMATS: &[&[BorrowedFormatItem<'static>]] = &[
    format_description!("[year]-[month]-[day] [hour]:[minute]:[second]"),
    format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]"),
    format_description!("[year]-[month]-[day] [hour]:[minute]:[second].[subsecond]"),
    format_description!("[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond]"),
    format_description!("[year]-[month]-[day] [hour]:[minute]"),
    format_description!("[year]-[month]-[day]T[hour]:[minute]"),
    format_description!("[day].[month].[year] [hour]:[minute]:[second]"),
    format_description!("[day].[month].[year] [hour]:[minute]"),
    format_description!("[day padding:none].[month padding:none].[year] [hour padding:none]:[minute]:[second]"),
    format_description!("[day padding:none].[month padding:none].[year] [hour padding:none]:[minute]"),
    format_description!("[year]/[month]/[day] [hour]:[minute]:[second]"),
    format_description!("[year]/[month]/[day] [hour]:[minute]"),
    // Slashes with the year last are month-first.
    format_description!("[month padding:none]/[day padding:none]/[year] [hour padding:none]:[minute]:[second]"),
    format_description!("[month padding:none]/[day padding:none]/[year] [hour padding:none]:[minute]"),
];

const OFFSET_FORMATS: &[&[BorrowedFormatItem<'static>]] = &[
    format_description!(
        "[year]-[month]-[day] [hour]:[minute]:[second][offset_hour sign:mandatory]:[offset_minute]"
    ),
    format_description!(
        "[year]-[month]-[day] [hour]:[minute]:[second] [offset_hour sign:mandatory]:[offset_minute]"
    ),
];

const DATE_FORMATS: &[&[BorrowedFormatItem<'static>]] = &[
    format_description!("[year]-[month]-[day]"),
    format_description!("[day].[month].[year]"),
    format_description!("[day padding:none].[month padding:none].[year]"),
    format_description!("[year]/[month]/[day]"),
    format_description!("[month padding:none]/[day padding:none]/[year]"),
];

/// Parse an export timestamp leniently.
///
/// Timestamps carrying a UTC offset keep their local wall-clock time, which is
/// what the date parts and hour-of-day are derived from.
pub fn coerce_timestamp(column: Column, raw: &str) -> Result<Option<PrimitiveDateTime>, FieldCoercionWarning> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }

    let wall_clock = |odt: OffsetDateTime| PrimitiveDateTime::new(odt.date(), odt.time());

    let parsed = OffsetDateTime::parse(trimmed, &Rfc3339)
        .ok()
        .map(wall_clock)
        .or_else(|| {
            OFFSET_FORMATS
                .iter()
                .find_map(|f| OffsetDateTime::parse(trimmed, f).ok())
                .map(wall_clock)
        })
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|f| PrimitiveDateTime::parse(trimmed, f).ok())
        })
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|f| Date::parse(trimmed, f).ok())
                .map(Date::midnight)
        });

    parsed.map(Some).ok_or_else(|| FieldCoercionWarning {
        column,
        value: trimmed.to_string(),
    })
}

/// Raw values of one export row, already coerced to their column types.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawSession {
    pub session_id: Option<String>,
    pub start_time: Option<PrimitiveDateTime>,
    pub end_time: Option<PrimitiveDateTime>,
    pub location: Option<String>,
    pub meter_start_kwh: Option<f64>,
    pub meter_stop_kwh: Option<f64>,
    pub consumption_kwh: Option<f64>,
    pub duration_minutes: Option<f64>,
    pub paid_duration: Option<f64>,
    pub parking_duration: Option<f64>,
    pub extra: Vec<String>,
}

/// Attach the derived fields to a coerced row.
pub fn derive_session(raw: RawSession, tariff_eur_per_kwh: f64) -> ChargeSession {
    let derived = DerivedFields::derive(
        raw.start_time,
        raw.consumption_kwh,
        raw.duration_minutes,
        tariff_eur_per_kwh,
    );

    ChargeSession {
        session_id: raw.session_id,
        start_time: raw.start_time,
        end_time: raw.end_time,
        location: raw.location,
        meter_start_kwh: raw.meter_start_kwh,
        meter_stop_kwh: raw.meter_stop_kwh,
        consumption_kwh: raw.consumption_kwh,
        duration_minutes: raw.duration_minutes,
        paid_duration: raw.paid_duration,
        parking_duration: raw.parking_duration,
        extra: raw.extra,
        derived,
    }
}
