use std::io::Write;

use serde::Serialize;

use crate::{pipeline::DashboardBundle, transform::CoercionReport};

use super::{
    csv_export::ExportError,
    sample_csv::{expected_format, ExpectedFormat},
};

/// Document written by the export binary and served at `/api/dashboard`.
#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DashboardDocument<'a> {
    Ready {
        #[serde(flatten)]
        bundle: &'a DashboardBundle,
        coercion_failures: &'a CoercionReport,
    },
    /// Carries the expected input format so the caller can fix the upload.
    NoData {
        error: &'a str,
        expected_format: ExpectedFormat,
    },
}

impl<'a> DashboardDocument<'a> {
    pub fn no_data(error: &'a str) -> Self {
        DashboardDocument::NoData {
            error,
            expected_format: expected_format(),
        }
    }
}

pub fn write_dashboard_json<W: Write>(writer: W, document: &DashboardDocument<'_>) -> Result<(), ExportError> {
    serde_json::to_writer_pretty(writer, document)?;
    Ok(())
}
