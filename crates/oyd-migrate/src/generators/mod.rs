//! Text artifacts: the feature comparison, client samples and run reports.

pub mod comparison;
pub mod report;
pub mod samples;

pub use comparison::{ComparisonFormat, Feature, Support, FEATURES};
pub use report::{generate_report, ReportFormat};
pub use samples::{generate_curl_commands, generate_python_sample, sample_file_name};
