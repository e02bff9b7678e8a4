pub mod charge_sessions_csv_file;
pub mod flat_csv_file;

pub use charge_sessions_csv_file::{
    load_sessions, load_sessions_from_reader, ChargeSessionsCsvFileSource, DataLoadError, LoadOutcome,
};
pub use flat_csv_file::{read_flat_table, FlatTable};
