use time::{Date, Month, PrimitiveDateTime};

/// Canonical display order of weekdays; index matches `weekday_index`.
pub const WEEKDAY_ORDER: [&str; 7] = [
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
    "Sunday",
];

/// Known columns of a ChargeME transaction export.
///
/// Header texts are part of the export format and are matched verbatim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Column {
    SessionId,
    StartTime,
    EndTime,
    Location,
    MeterStart,
    MeterStop,
    Consumption,
    Duration,
    PaidDuration,
    ParkingDuration,
}

impl Column {
    pub const ALL: [Column; 10] = [
        Column::SessionId,
        Column::StartTime,
        Column::EndTime,
        Column::Location,
        Column::MeterStart,
        Column::MeterStop,
        Column::Consumption,
        Column::Duration,
        Column::PaidDuration,
        Column::ParkingDuration,
    ];

    pub fn header(self) -> &'static str {
        match self {
            Column::SessionId => "Ladevorgangs-ID",
            Column::StartTime => "Gestartet",
            Column::EndTime => "Beendet",
            Column::Location => "Standort",
            Column::MeterStart => "meterValueStart (kWh)",
            Column::MeterStop => "meterValueStop (kWh)",
            Column::Consumption => "Verbrauch (kWh)",
            Column::Duration => "Ladedauer (in Minuten)",
            Column::PaidDuration => "paidDuration",
            Column::ParkingDuration => "parkingDuration",
        }
    }

    pub fn from_header(header: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.header() == header)
    }
}

/// A column the caller needed is not part of the loaded export.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("missing column '{}'", .0.header())]
pub struct MissingColumn(pub Column);

/// Fields computed once from the raw values when a session is loaded.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct DerivedFields {
    pub year: Option<i32>,
    pub month: Option<u8>,
    pub day: Option<u8>,
    /// 0 = Monday .. 6 = Sunday
    pub weekday_index: Option<u8>,
    pub weekday_name: Option<&'static str>,
    pub hour: Option<u8>,
    /// `YYYY-MM`
    pub year_month: Option<String>,
    pub charging_hours: Option<f64>,
    pub charging_rate_kwh_per_hour: Option<f64>,
    pub cost_eur: Option<f64>,
}

impl DerivedFields {
    /// Compute the derived fields of one session.
    ///
    /// The charging rate is only defined for a strictly positive duration; a
    /// zero, negative or missing duration leaves it `None`.
    pub fn derive(
        start_time: Option<PrimitiveDateTime>,
        consumption_kwh: Option<f64>,
        duration_minutes: Option<f64>,
        tariff_eur_per_kwh: f64,
    ) -> Self {
        let charging_hours = duration_minutes.map(|m| m / 60.0);
        let charging_rate_kwh_per_hour = match (consumption_kwh, duration_minutes, charging_hours) {
            (Some(kwh), Some(minutes), Some(hours)) if minutes > 0.0 => {
                Some(kwh / hours).filter(|r| r.is_finite())
            }
            _ => None,
        };
        let cost_eur = consumption_kwh.map(|kwh| kwh * tariff_eur_per_kwh);

        let mut fields = DerivedFields {
            charging_hours,
            charging_rate_kwh_per_hour,
            cost_eur,
            ..DerivedFields::default()
        };

        if let Some(ts) = start_time {
            let weekday = ts.weekday().number_days_from_monday();
            fields.year = Some(ts.year());
            fields.month = Some(u8::from(ts.month()));
            fields.day = Some(ts.day());
            fields.weekday_index = Some(weekday);
            fields.weekday_name = Some(WEEKDAY_ORDER[weekday as usize]);
            fields.hour = Some(ts.hour());
            fields.year_month = Some(format!("{:04}-{:02}", ts.year(), u8::from(ts.month())));
        }

        fields
    }

    /// First day of the session's month; the chronological sort key of monthly rollups.
    pub fn month_start(&self) -> Option<Date> {
        let month = Month::try_from(self.month?).ok()?;
        Date::from_calendar_date(self.year?, month, 1).ok()
    }
}

/// One charging transaction from plug-in to plug-out.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ChargeSession {
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
    /// Values of unrecognised columns, aligned with `SessionTable::extra_columns`.
    pub extra: Vec<String>,
    pub derived: DerivedFields,
}

impl ChargeSession {
    pub fn start_date(&self) -> Option<Date> {
        self.start_time.map(|ts| ts.date())
    }
}

/// Position of a source column in the original header row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnSlot {
    Known(Column),
    /// Index into `SessionTable::extra_columns`.
    Extra(usize),
}

/// The loaded session table. Never mutated after load; filters build new tables.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionTable {
    layout: Vec<ColumnSlot>,
    extra_columns: Vec<String>,
    tariff_eur_per_kwh: f64,
    sessions: Vec<ChargeSession>,
}

impl SessionTable {
    pub fn new(
        layout: Vec<ColumnSlot>,
        extra_columns: Vec<String>,
        tariff_eur_per_kwh: f64,
        sessions: Vec<ChargeSession>,
    ) -> Self {
        Self {
            layout,
            extra_columns,
            tariff_eur_per_kwh,
            sessions,
        }
    }

    /// A table with the given known columns in order and no extra columns.
    pub fn with_columns(columns: &[Column], tariff_eur_per_kwh: f64, sessions: Vec<ChargeSession>) -> Self {
        let layout = columns.iter().copied().map(ColumnSlot::Known).collect();
        Self::new(layout, Vec::new(), tariff_eur_per_kwh, sessions)
    }

    /// Same schema, different rows.
    pub fn with_sessions(&self, sessions: Vec<ChargeSession>) -> Self {
        Self {
            layout: self.layout.clone(),
            extra_columns: self.extra_columns.clone(),
            tariff_eur_per_kwh: self.tariff_eur_per_kwh,
            sessions,
        }
    }

    pub fn sessions(&self) -> &[ChargeSession] {
        &self.sessions
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn layout(&self) -> &[ColumnSlot] {
        &self.layout
    }

    pub fn extra_columns(&self) -> &[String] {
        &self.extra_columns
    }

    pub fn tariff_eur_per_kwh(&self) -> f64 {
        self.tariff_eur_per_kwh
    }

    pub fn has_column(&self, column: Column) -> bool {
        self.layout.contains(&ColumnSlot::Known(column))
    }

    pub fn require(&self, column: Column) -> Result<(), MissingColumn> {
        if self.has_column(column) {
            Ok(())
        } else {
            Err(MissingColumn(column))
        }
    }

    /// Earliest and latest start date, ignoring sessions without a start.
    pub fn start_date_range(&self) -> Option<(Date, Date)> {
        let mut dates = self.sessions.iter().filter_map(ChargeSession::start_date);
        let first = dates.next()?;
        Some(dates.fold((first, first), |(lo, hi), d| (lo.min(d), hi.max(d))))
    }

    /// Sessions ordered by start time, latest first; sessions without a start go last.
    pub fn newest_first(&self) -> SessionTable {
        let mut sessions = self.sessions.clone();
        sessions.sort_by(|a, b| match (a.start_time, b.start_time) {
            (Some(x), Some(y)) => y.cmp(&x),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => std::cmp::Ordering::Equal,
        });
        self.with_sessions(sessions)
    }
}
