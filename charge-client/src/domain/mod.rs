pub mod charge_session;
pub mod session_summary;

pub use charge_session::{
    ChargeSession, Column, ColumnSlot, DerivedFields, MissingColumn, SessionTable, WEEKDAY_ORDER,
};
pub use session_summary::{DashboardMetrics, LocationSummary, MonthlySummary, WeekdaySummary};
