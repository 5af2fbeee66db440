use std::path::PathBuf;

use anyhow::Context;
use clap::error::ErrorKind;
use clap::Parser;

use pdf_ua_tagger::plan::expand_path;
use pdf_ua_tagger::{tag_pdf, TagReport, TaggerConfig};

#[derive(Parser, Debug)]
#[clap(
    author,
    version,
    about,
    long_about = "Apply accessibility structure tags to a PDF as described by a tagging plan. \
                  The result is printed to stdout as JSON."
)]
pub struct Args {
    /// Path to the tagging plan (JSON)
    pub plan: PathBuf,

    /// Distance in points a text position may lie outside an element's box
    #[clap(long)]
    pub tolerance: Option<f64>,

    /// Print the result as a single line of JSON
    #[clap(long)]
    pub compact: bool,

    /// Enable detailed logging of PDF content stream operations
    #[clap(long)]
    pub debug_ops: bool,

    /// Directory for log output. Logs go to stderr when omitted.
    #[clap(long)]
    pub log_dir: Option<PathBuf>,
}

fn main() {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => e.exit(),
        Err(e) => {
            let mut report = TagReport::new();
            report.fail(format!(
                "Usage: pdf-ua-tagger <plan.json> ({})",
                e.kind().as_str().unwrap_or("invalid arguments")
            ));
            println!("{}", report.to_json(true));
            std::process::exit(1);
        }
    };
    let pretty = !args.compact;

    let report = match run(args) {
        Ok(report) => report,
        Err(e) => {
            let mut report = TagReport::new();
            report.fail(format!("Fatal error: {e:#}"));
            report
        }
    };

    println!("{}", report.to_json(pretty));
    std::process::exit(if report.success { 0 } else { 1 });
}

fn run(args: Args) -> anyhow::Result<TagReport> {
    // Keep the guard alive until the run is over so buffered logs are flushed.
    let _guard = match args.log_dir {
        Some(dir) => {
            let dir = expand_path(&dir).context("invalid log directory")?;
            pdf_ua_tagger::logging::init_logging_with_dir(args.debug_ops, dir)
                .context("cannot create log directory")?
        }
        None => pdf_ua_tagger::logging::init_logging(args.debug_ops),
    };

    let mut config = TaggerConfig::default();
    if let Some(tolerance) = args.tolerance {
        config = config.with_tolerance(tolerance);
    }

    Ok(tag_pdf(&args.plan, &config))
}
