use anyhow::Result;
use tracing::info;

use crate::cli::QaArgs;
use crate::config::load_pipeline_config;
use crate::structure::{PatternRules, QaSource, run_dual_qa};
use crate::util::{read_text_file, write_json_stdout};

pub fn run(args: QaArgs) -> Result<()> {
    let config = load_pipeline_config(args.config.as_deref())?;
    let rules = PatternRules::new()?;
    let reference = read_text_file(&args.reference)?;
    let processed = read_text_file(&args.processed)?;

    let report = run_dual_qa(
        &rules,
        &reference,
        &processed,
        QaSource::from(args.source),
        &config.qa,
    );
    info!(
        reference = %args.reference.display(),
        processed = %args.processed.display(),
        matched = report.matched.len(),
        is_pass = report.is_pass,
        "dual QA completed"
    );

    write_json_stdout(&report)
}
