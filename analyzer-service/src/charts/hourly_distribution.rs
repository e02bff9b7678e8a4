use charge_client::domain::SessionTable;

use super::{Axis, AxisRole, Chart, Point, Series, XValue};

/// Session starts per hour of day, always 24 slots; hours without sessions
/// are present with a zero count.
pub fn hourly_distribution_chart(table: &SessionTable) -> Chart {
    let mut counts = [0usize; 24];
    for hour in table.sessions().iter().filter_map(|s| s.derived.hour) {
        if let Some(slot) = counts.get_mut(hour as usize) {
            *slot += 1;
        }
    }

    let points = counts
        .iter()
        .enumerate()
        .map(|(hour, &n)| Point {
            x: XValue::Number(hour as f64),
            y: n as f64,
            color: None,
        })
        .collect();

    let mut x_axis = Axis::linear(AxisRole::X, "Hour of Day (0-23)");
    x_axis.ticks = Some((0..24).map(f64::from).collect());

    Chart {
        id: "hourly_distribution",
        title: "Charging Start Times by Hour of Day",
        x_axis,
        y_axes: vec![Axis::linear(AxisRole::Primary, "Number of Charging Sessions")],
        series: vec![Series::Bar {
            name: "Sessions",
            axis: AxisRole::Primary,
            points,
        }],
        color: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use charge_client::domain::{ChargeSession, Column, DerivedFields};
    use time::{macros::datetime, PrimitiveDateTime};

    fn at(ts: Option<PrimitiveDateTime>) -> ChargeSession {
        ChargeSession {
            start_time: ts,
            consumption_kwh: Some(1.0),
            derived: DerivedFields::derive(ts, Some(1.0), Some(30.0), 0.49),
            ..ChargeSession::default()
        }
    }

    #[test]
    fn every_hour_slot_is_present() {
        let table = SessionTable::with_columns(
            &[Column::StartTime, Column::Consumption],
            0.49,
            vec![
                at(Some(datetime!(2024-01-01 07:10:00))),
                at(Some(datetime!(2024-01-02 07:50:00))),
                at(Some(datetime!(2024-01-02 23:05:00))),
                at(None),
            ],
        );

        let chart = hourly_distribution_chart(&table);
        let Series::Bar { points, .. } = &chart.series[0] else {
            panic!("expected bars");
        };
        assert_eq!(points.len(), 24);
        assert_eq!(points[7].y, 2.0);
        assert_eq!(points[23].y, 1.0);
        assert_eq!(points[0].y, 0.0);
        assert_eq!(points.iter().map(|p| p.y).sum::<f64>(), 3.0);
        assert_eq!(chart.x_axis.ticks.as_ref().map(Vec::len), Some(24));
    }
}
