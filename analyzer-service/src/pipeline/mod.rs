use std::path::Path;

use charge_client::{
    domain::{DashboardMetrics, LocationSummary, MonthlySummary, SessionTable, WeekdaySummary},
    queries::{summarize_by_location, summarize_by_month, summarize_by_weekday, summarize_dashboard},
};
use serde::Serialize;

use crate::{
    charts::{
        hourly_distribution_chart, monthly_consumption_chart, rate_analysis, weekday_distribution_chart, Chart,
        RateAnalysis,
    },
    config::AnalysisConfig,
    sources::{ChargeSessionsCsvFileSource, LoadOutcome},
    transform::CoercionReport,
};

/// A dashboard part that may be unavailable because its input column is missing.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Panel<T> {
    Ready { data: T },
    Unavailable { reason: String },
}

impl<T, E: std::fmt::Display> From<Result<T, E>> for Panel<T> {
    fn from(result: Result<T, E>) -> Self {
        match result {
            Ok(data) => Panel::Ready { data },
            Err(e) => {
                tracing::info!(reason = %e, "dashboard panel unavailable");
                Panel::Unavailable { reason: e.to_string() }
            }
        }
    }
}

impl<T> Panel<T> {
    pub fn ready(&self) -> Option<&T> {
        match self {
            Panel::Ready { data } => Some(data),
            Panel::Unavailable { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardCharts {
    pub monthly_consumption: Chart,
    pub weekday_distribution: Chart,
    pub hourly_distribution: Chart,
    pub rate_analysis: Panel<RateAnalysis>,
}

/// Everything the presentation layer shows for one table, computed fresh.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardBundle {
    pub metrics: DashboardMetrics,
    pub monthly: Vec<MonthlySummary>,
    pub locations: Panel<Vec<LocationSummary>>,
    pub weekdays: Vec<WeekdaySummary>,
    pub charts: DashboardCharts,
}

pub fn build_dashboard(table: &SessionTable, analysis: &AnalysisConfig) -> DashboardBundle {
    let monthly = summarize_by_month(table);
    let weekdays = summarize_by_weekday(table);

    let charts = DashboardCharts {
        monthly_consumption: monthly_consumption_chart(&monthly, analysis.monthly_window_months),
        weekday_distribution: weekday_distribution_chart(&weekdays),
        hourly_distribution: hourly_distribution_chart(table),
        rate_analysis: rate_analysis(table, &analysis.rate_band(), analysis.histogram_bins).into(),
    };

    DashboardBundle {
        metrics: summarize_dashboard(table),
        monthly,
        locations: summarize_by_location(table).into(),
        weekdays,
        charts,
    }
}

/// The loaded export, or why there is none. The dashboard runs in either state.
#[derive(Debug, Clone)]
pub enum DashboardState {
    Loaded {
        table: SessionTable,
        coercion: CoercionReport,
    },
    NoData {
        error: String,
    },
}

impl DashboardState {
    pub fn no_data(error: impl Into<String>) -> Self {
        DashboardState::NoData { error: error.into() }
    }
}

impl From<LoadOutcome> for DashboardState {
    fn from(outcome: LoadOutcome) -> Self {
        DashboardState::Loaded {
            table: outcome.table,
            coercion: outcome.coercion,
        }
    }
}

/// Load the export at `path`; a failed load degrades to [`DashboardState::NoData`].
pub fn load_dashboard_state(path: &Path, analysis: &AnalysisConfig) -> DashboardState {
    match ChargeSessionsCsvFileSource::new(path, analysis.tariff_eur_per_kwh).load() {
        Ok(outcome) => outcome.into(),
        Err(e) => {
            tracing::error!(error = %e, path = %path.display(), "failed to load charge sessions");
            DashboardState::no_data(format!("Error loading data: {e}"))
        }
    }
}
