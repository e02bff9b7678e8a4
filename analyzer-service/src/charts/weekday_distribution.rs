use charge_client::domain::WeekdaySummary;

use super::{Axis, AxisRole, Chart, ColorEncoding, Point, Series, XValue};

/// Sessions per weekday, coloured by total consumption. Bars follow the order
/// of `weekdays`, which `summarize_by_weekday` returns Monday first.
pub fn weekday_distribution_chart(weekdays: &[WeekdaySummary]) -> Chart {
    let points = weekdays
        .iter()
        .map(|w| Point {
            x: XValue::Category(w.day.to_string()),
            y: w.sessions as f64,
            color: Some(w.consumption_kwh),
        })
        .collect();

    Chart {
        id: "weekday_distribution",
        title: "Charging Sessions by Day of Week",
        x_axis: Axis::category(AxisRole::X, ""),
        y_axes: vec![Axis::linear(AxisRole::Primary, "Number of Sessions")],
        series: vec![Series::Bar {
            name: "Sessions",
            axis: AxisRole::Primary,
            points,
        }],
        color: Some(ColorEncoding {
            title: "Total kWh",
            scale: "Blues",
        }),
    }
}
