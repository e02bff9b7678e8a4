use charge_client::domain::{Column, SessionTable};
use serde::Serialize;

use super::{Axis, AxisRole, Chart, ChartError, ColorEncoding, Point, Series, XValue};

/// Open interval of plausible charging rates. Rates outside it are left out of
/// the histogram and its statistics, never out of the session table.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RateBand {
    pub min_kwh_per_hour: f64,
    pub max_kwh_per_hour: f64,
}

impl Default for RateBand {
    fn default() -> Self {
        Self {
            min_kwh_per_hour: 0.0,
            max_kwh_per_hour: 50.0,
        }
    }
}

impl RateBand {
    pub fn contains(&self, rate: f64) -> bool {
        rate > self.min_kwh_per_hour && rate < self.max_kwh_per_hour
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RateAnalysis {
    pub histogram: Chart,
    pub scatter: Chart,
    pub band: RateBand,
    pub mean_rate_kwh_per_hour: Option<f64>,
    pub median_rate_kwh_per_hour: Option<f64>,
    /// Sessions inside the band.
    pub included: usize,
    /// Sessions without a rate or with a rate outside the band.
    pub excluded: usize,
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

fn median(values: &[f64]) -> Option<f64> {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let n = sorted.len();
    match n {
        0 => None,
        _ if n % 2 == 1 => Some(sorted[n / 2]),
        _ => Some((sorted[n / 2 - 1] + sorted[n / 2]) / 2.0),
    }
}

/// Charging-rate histogram with mean/median over the in-band subset, plus a
/// duration-vs-consumption scatter over every session that has both values.
pub fn rate_analysis(table: &SessionTable, band: &RateBand, bins: usize) -> Result<RateAnalysis, ChartError> {
    table.require(Column::Duration)?;
    table.require(Column::Consumption)?;

    let rates: Vec<f64> = table
        .sessions()
        .iter()
        .filter_map(|s| s.derived.charging_rate_kwh_per_hour)
        .filter(|&r| band.contains(r))
        .collect();

    let scatter_points: Vec<Point> = table
        .sessions()
        .iter()
        .filter_map(|s| {
            Some(Point {
                x: XValue::Number(s.duration_minutes?),
                y: s.consumption_kwh?,
                color: s.derived.charging_rate_kwh_per_hour,
            })
        })
        .collect();

    let histogram = Chart {
        id: "rate_histogram",
        title: "Distribution of Charging Rates",
        x_axis: Axis::linear(AxisRole::X, "Charging Rate (kWh/hour)"),
        y_axes: vec![Axis::linear(AxisRole::Primary, "Count")],
        series: vec![Series::Histogram {
            name: "Charging Rate (kWh/hour)",
            bins,
            values: rates.clone(),
        }],
        color: None,
    };

    let scatter = Chart {
        id: "duration_vs_consumption",
        title: "Charging Duration vs. Consumption",
        x_axis: Axis::linear(AxisRole::X, "Charging Duration (minutes)"),
        y_axes: vec![Axis::linear(AxisRole::Primary, "Consumption (kWh)")],
        series: vec![Series::Scatter {
            name: "Sessions",
            points: scatter_points,
        }],
        color: Some(ColorEncoding {
            title: "Charging Rate (kWh/h)",
            scale: "Viridis",
        }),
    };

    Ok(RateAnalysis {
        histogram,
        scatter,
        band: *band,
        mean_rate_kwh_per_hour: mean(&rates),
        median_rate_kwh_per_hour: median(&rates),
        included: rates.len(),
        excluded: table.len() - rates.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use charge_client::domain::{ChargeSession, DerivedFields, MissingColumn};
    use time::macros::datetime;

    fn session(kwh: f64, minutes: Option<f64>) -> ChargeSession {
        let start = Some(datetime!(2024-05-01 12:00:00));
        ChargeSession {
            start_time: start,
            consumption_kwh: Some(kwh),
            duration_minutes: minutes,
            derived: DerivedFields::derive(start, Some(kwh), minutes, 0.49),
            ..ChargeSession::default()
        }
    }

    fn table(sessions: Vec<ChargeSession>) -> SessionTable {
        SessionTable::with_columns(
            &[Column::StartTime, Column::Consumption, Column::Duration],
            0.49,
            sessions,
        )
    }

    #[test]
    fn histogram_excludes_out_of_band_and_undefined_rates() {
        let t = table(vec![
            session(10.0, Some(60.0)),  // 10 kWh/h
            session(11.0, Some(60.0)),  // 11 kWh/h
            session(3.0, Some(0.0)),    // undefined
            session(60.0, Some(60.0)),  // 60 kWh/h, outlier
            session(50.0, Some(60.0)),  // exactly 50, excluded
            session(0.0, Some(60.0)),   // exactly 0, excluded
            session(4.0, None),         // no duration
        ]);

        let analysis = rate_analysis(&t, &RateBand::default(), 30).unwrap();
        let Series::Histogram { values, bins, .. } = &analysis.histogram.series[0] else {
            panic!("expected histogram");
        };
        assert_eq!(values, &vec![10.0, 11.0]);
        assert_eq!(*bins, 30);
        assert_eq!(analysis.included, 2);
        assert_eq!(analysis.excluded, 5);
        assert_eq!(analysis.mean_rate_kwh_per_hour, Some(10.5));
        assert_eq!(analysis.median_rate_kwh_per_hour, Some(10.5));

        // The source table is untouched.
        assert_eq!(t.len(), 7);
    }

    #[test]
    fn scatter_uses_unfiltered_sessions_with_both_values() {
        let t = table(vec![
            session(10.0, Some(60.0)),
            session(3.0, Some(0.0)),
            session(60.0, Some(60.0)),
            session(4.0, None),
        ]);

        let analysis = rate_analysis(&t, &RateBand::default(), 30).unwrap();
        let Series::Scatter { points, .. } = &analysis.scatter.series[0] else {
            panic!("expected scatter");
        };
        assert_eq!(points.len(), 3);
        assert_eq!(points[1].x, XValue::Number(0.0));
        assert_eq!(points[1].y, 3.0);
        assert_eq!(points[1].color, None);
        assert_eq!(points[2].color, Some(60.0));
    }

    #[test]
    fn median_of_odd_sample_is_middle_value() {
        assert_eq!(median(&[5.0, 1.0, 3.0]), Some(3.0));
        assert_eq!(median(&[]), None);
        assert_eq!(mean(&[]), None);
    }

    #[test]
    fn missing_duration_column_is_reported() {
        let t = SessionTable::with_columns(&[Column::StartTime, Column::Consumption], 0.49, vec![session(1.0, None)]);

        let err = rate_analysis(&t, &RateBand::default(), 30).unwrap_err();
        assert_eq!(err, ChartError::MissingColumn(MissingColumn(Column::Duration)));
    }
}
