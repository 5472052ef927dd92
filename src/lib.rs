pub mod analyzers;
pub mod category;
pub mod error;
pub mod output;
pub mod source;
pub mod time;

pub use analyzers::aggregate::{Aggregation, aggregate};
pub use analyzers::report::{Report, ReportRequest, ReportRow, build_report};
pub use error::{ReportError, Result};
