pub mod session_summary_queries;

pub use session_summary_queries::{
    filter_by_start_date, summarize_by_location, summarize_by_month, summarize_by_weekday,
    summarize_dashboard,
};
