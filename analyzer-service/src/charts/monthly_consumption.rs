use charge_client::domain::MonthlySummary;

use super::{Axis, AxisRole, Chart, Point, Series, XValue};

/// Consumption bars with a cost line on a secondary axis, limited to the most
/// recent `window` months.
///
/// `monthly` must already be in chronological order, as returned by
/// `summarize_by_month`; the window keeps that order.
pub fn monthly_consumption_chart(monthly: &[MonthlySummary], window: usize) -> Chart {
    let recent = &monthly[monthly.len().saturating_sub(window)..];

    let point = |m: &MonthlySummary, y: f64| Point {
        x: XValue::Category(m.month.clone()),
        y,
        color: None,
    };

    Chart {
        id: "monthly_consumption",
        title: "Monthly Consumption and Cost",
        x_axis: Axis::category(AxisRole::X, "Month"),
        y_axes: vec![
            Axis::linear(AxisRole::Primary, "Consumption (kWh)"),
            Axis::linear(AxisRole::Secondary, "Cost (€)"),
        ],
        series: vec![
            Series::Bar {
                name: "Consumption (kWh)",
                axis: AxisRole::Primary,
                points: recent.iter().map(|m| point(m, m.consumption_kwh)).collect(),
            },
            Series::Line {
                name: "Cost (€)",
                axis: AxisRole::Secondary,
                points: recent.iter().map(|m| point(m, m.cost_eur)).collect(),
            },
        ],
        color: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::{Date, Month};

    fn month(year: i32, m: u8, kwh: f64) -> MonthlySummary {
        let month = Month::try_from(m).unwrap();
        MonthlySummary {
            month: format!("{year:04}-{m:02}"),
            month_start: Date::from_calendar_date(year, month, 1).unwrap(),
            consumption_kwh: kwh,
            cost_eur: kwh * 0.49,
            sessions: 1,
            duration_minutes: Some(60.0),
            duration_hours: Some(1.0),
            avg_kwh_per_session: Some(kwh),
            avg_rate_kwh_per_hour: Some(kwh),
        }
    }

    fn labels(series: &Series) -> Vec<String> {
        match series {
            Series::Bar { points, .. } | Series::Line { points, .. } => points
                .iter()
                .map(|p| match &p.x {
                    XValue::Category(c) => c.clone(),
                    XValue::Number(n) => n.to_string(),
                })
                .collect(),
            _ => panic!("unexpected series kind"),
        }
    }

    #[test]
    fn keeps_last_months_in_chronological_order() {
        let monthly: Vec<_> = (1..=12)
            .map(|m| month(2023, m, m as f64))
            .chain((1..=3).map(|m| month(2024, m, 100.0 + m as f64)))
            .collect();

        let chart = monthly_consumption_chart(&monthly, 12);
        let bars = labels(&chart.series[0]);
        assert_eq!(bars.len(), 12);
        assert_eq!(bars.first().map(String::as_str), Some("2023-04"));
        assert_eq!(bars.last().map(String::as_str), Some("2024-03"));
        assert_eq!(bars, labels(&chart.series[1]));
    }

    #[test]
    fn short_history_is_shown_whole() {
        let monthly = vec![month(2024, 1, 15.0), month(2024, 2, 5.0)];

        let chart = monthly_consumption_chart(&monthly, 12);
        assert_eq!(labels(&chart.series[0]), vec!["2024-01", "2024-02"]);

        let Series::Line { axis, points, .. } = &chart.series[1] else {
            panic!("cost should be a line");
        };
        assert_eq!(*axis, AxisRole::Secondary);
        assert!((points[0].y - 7.35).abs() < 1e-9);
        assert_eq!(chart.y_axes[1].role, AxisRole::Secondary);
    }

    #[test]
    fn empty_summary_gives_empty_series() {
        let chart = monthly_consumption_chart(&[], 12);
        assert!(labels(&chart.series[0]).is_empty());
    }
}
