use std::path::PathBuf;
use tracing::Level;
use tracing_appender::{
    non_blocking::WorkerGuard,
    rolling::{RollingFileAppender, Rotation},
};
use tracing_subscriber::{
    filter::EnvFilter, fmt::format::FmtSpan, layer::SubscriberExt, util::SubscriberInitExt, Layer,
};
use tracing_tree::HierarchicalLayer;

// Log targets
pub const PDF_OPERATIONS: &str = "pdf_ops";
pub const TAG_MATCH: &str = "tag_match";
pub const TAG_STRUCT: &str = "tag_struct";
pub const TAG_RUN: &str = "tag_run";

const DEBUG_TARGETS: &[&str] = &[PDF_OPERATIONS, TAG_MATCH, TAG_STRUCT];

pub const LOG_FILE_NAME: &str = "pdf-ua-tagger.log";

fn base_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
}

fn debug_filter() -> EnvFilter {
    let mut filter = base_filter();
    let directives = DEBUG_TARGETS
        .iter()
        .map(|target| format!("{target}=debug"))
        .chain(std::iter::once(format!("{TAG_RUN}=info")));
    for directive in directives {
        if let Ok(directive) = directive.parse() {
            filter = filter.add_directive(directive);
        }
    }
    filter
}

/// Log to stderr. Stdout carries the JSON result and must stay clean.
///
/// With `debug_ops` the matcher, rewriter and structure writer log at debug
/// level through an indented span tree.
pub fn init_logging(debug_ops: bool) -> WorkerGuard {
    let (writer, guard) = tracing_appender::non_blocking(std::io::stderr());

    let result = if debug_ops {
        tracing_subscriber::registry()
            .with(
                HierarchicalLayer::new(2)
                    .with_writer(writer)
                    .with_targets(true)
                    .with_bracketed_fields(true)
                    .with_filter(debug_filter()),
            )
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(
                tracing_subscriber::fmt::layer()
                    .with_writer(writer)
                    .with_target(true)
                    .with_filter(base_filter()),
            )
            .try_init()
    };
    if let Err(e) = result {
        eprintln!("logging already initialised: {e}");
    }

    guard
}

/// Log to `<log_dir>/pdf-ua-tagger.log` instead of stderr.
pub fn init_logging_with_dir(debug_ops: bool, log_dir: PathBuf) -> std::io::Result<WorkerGuard> {
    std::fs::create_dir_all(&log_dir)?;

    let file_appender = RollingFileAppender::new(Rotation::NEVER, log_dir, LOG_FILE_NAME);
    let (non_blocking_appender, guard) = tracing_appender::non_blocking(file_appender);

    let filter = if debug_ops {
        debug_filter()
    } else {
        base_filter().add_directive(Level::INFO.into())
    };

    let file_layer = tracing_subscriber::fmt::layer()
        .with_ansi(false)
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .with_span_events(if debug_ops {
            FmtSpan::NEW | FmtSpan::CLOSE
        } else {
            FmtSpan::NONE
        })
        .with_writer(non_blocking_appender)
        .with_filter(filter);

    if let Err(e) = tracing_subscriber::registry().with(file_layer).try_init() {
        eprintln!("logging already initialised: {e}");
    }

    Ok(guard)
}
