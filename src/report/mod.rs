//! Console output and summary files.

mod generator;

pub use generator::{console_summary, write_json_report, write_text_summary};
