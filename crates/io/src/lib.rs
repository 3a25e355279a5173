// File I/O: tables in, report out

pub mod csv;
pub mod table;
pub mod xlsx;

pub use table::load_table;
pub use xlsx::{export_report, ExportResult};
