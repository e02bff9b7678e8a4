//! Declarative chart descriptions.
//!
//! Builders here only map tables to series and axis bindings; rendering is left
//! to whatever consumes the serialized [`Chart`].

pub mod hourly_distribution;
pub mod monthly_consumption;
pub mod rate_analysis;
pub mod weekday_distribution;

use charge_client::domain::MissingColumn;
use serde::Serialize;

pub use hourly_distribution::hourly_distribution_chart;
pub use monthly_consumption::monthly_consumption_chart;
pub use rate_analysis::{rate_analysis, RateAnalysis, RateBand};
pub use weekday_distribution::weekday_distribution_chart;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ChartError {
    #[error(transparent)]
    MissingColumn(#[from] MissingColumn),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AxisRole {
    X,
    Primary,
    Secondary,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AxisScale {
    Category,
    Linear,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Axis {
    pub role: AxisRole,
    pub title: &'static str,
    pub scale: AxisScale,
    /// Fixed tick positions for linear axes that must show every slot.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ticks: Option<Vec<f64>>,
}

impl Axis {
    pub fn category(role: AxisRole, title: &'static str) -> Self {
        Self {
            role,
            title,
            scale: AxisScale::Category,
            ticks: None,
        }
    }

    pub fn linear(role: AxisRole, title: &'static str) -> Self {
        Self {
            role,
            title,
            scale: AxisScale::Linear,
            ticks: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum XValue {
    Category(String),
    Number(f64),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Point {
    pub x: XValue,
    pub y: f64,
    /// Value mapped through the chart's colour encoding, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Series {
    Bar {
        name: &'static str,
        axis: AxisRole,
        points: Vec<Point>,
    },
    Line {
        name: &'static str,
        axis: AxisRole,
        points: Vec<Point>,
    },
    Histogram {
        name: &'static str,
        bins: usize,
        values: Vec<f64>,
    },
    Scatter {
        name: &'static str,
        points: Vec<Point>,
    },
}

/// Continuous colour scale bound to `Point::color`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColorEncoding {
    pub title: &'static str,
    pub scale: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Chart {
    pub id: &'static str,
    pub title: &'static str,
    pub x_axis: Axis,
    pub y_axes: Vec<Axis>,
    pub series: Vec<Series>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<ColorEncoding>,
}
