pub mod csv_export;
pub mod dashboard_json;
pub mod sample_csv;

pub use csv_export::{
    sessions_csv_bytes, summary_csv_bytes, write_sessions_csv, write_summary_csv, CsvEncode, ExportError,
};
pub use dashboard_json::{write_dashboard_json, DashboardDocument};
pub use sample_csv::{expected_format, sample_csv_bytes, write_sample_csv, ExpectedFormat, SAMPLE_FILE_NAME};
