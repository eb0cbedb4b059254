pub mod report;

pub use report::{write_report, write_report_to, ReportStats};
