use time::Date;

/// Sessions rolled up per calendar month.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct MonthlySummary {
    /// `YYYY-MM`
    pub month: String,
    /// Sort key; rows are ordered by this date, not by the label.
    pub month_start: Date,
    pub consumption_kwh: f64,
    pub cost_eur: f64,
    pub sessions: usize,
    /// `None` when the export has no duration column.
    pub duration_minutes: Option<f64>,
    pub duration_hours: Option<f64>,
    pub avg_kwh_per_session: Option<f64>,
    pub avg_rate_kwh_per_hour: Option<f64>,
}

/// Sessions rolled up per charging site.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct LocationSummary {
    pub location: String,
    pub consumption_kwh: f64,
    pub cost_eur: f64,
    pub sessions: usize,
    pub duration_minutes: Option<f64>,
    pub duration_hours: Option<f64>,
    pub avg_kwh_per_session: Option<f64>,
    pub avg_rate_kwh_per_hour: Option<f64>,
}

/// Sessions rolled up per day of week.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct WeekdaySummary {
    pub day: &'static str,
    /// 0 = Monday .. 6 = Sunday
    pub weekday_index: u8,
    pub consumption_kwh: f64,
    pub cost_eur: f64,
    pub sessions: usize,
    pub avg_kwh_per_session: Option<f64>,
}

/// Headline figures over a whole table.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct DashboardMetrics {
    pub total_consumption_kwh: f64,
    pub total_cost_eur: f64,
    pub sessions: usize,
    pub avg_kwh_per_session: Option<f64>,
    pub total_duration_hours: Option<f64>,
    pub avg_rate_kwh_per_hour: Option<f64>,
    pub first_session: Option<Date>,
    pub last_session: Option<Date>,
    pub tariff_eur_per_kwh: f64,
}
