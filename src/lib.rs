pub mod config;
pub mod engine;
pub mod error;
pub mod geo;
pub mod lexer;
pub mod logging;
pub mod matcher;
pub mod mcid;
pub mod metadata;
pub mod parse;
pub mod plan;
pub mod report;
pub mod rewriter;
pub mod structure;
pub mod tagger;

pub use crate::config::TaggerConfig;
pub use crate::engine::apply_plan;
pub use crate::error::{Result, TaggingError};
pub use crate::plan::Plan;
pub use crate::report::TagReport;

use std::path::Path;

/// Load a plan from disk and apply it.
///
/// # Arguments
/// * `plan_path` - Path to the plan JSON
/// * `config` - Matching and output settings
///
/// # Returns
/// * `TagReport` - The run outcome. A plan that cannot be read or parsed
///   produces an unsuccessful report without touching any PDF.
pub fn tag_pdf<P: AsRef<Path>>(plan_path: P, config: &TaggerConfig) -> TagReport {
    match Plan::from_path(plan_path) {
        Ok(plan) => apply_plan(&plan, config),
        Err(e) => {
            let mut report = TagReport::new();
            report.fail(format!("Fatal error: {e}"));
            report
        }
    }
}
