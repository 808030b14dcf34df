use bourse_core::{DateWindow, Pipeline, WindowReport};

use crate::cli::IngestArgs;
use crate::envelope::EnvelopeError;
use crate::error::CliError;

use super::{CommandResult, Context};

pub fn run(args: &IngestArgs, context: &Context) -> Result<CommandResult, CliError> {
    let window = DateWindow::parse(&args.window.start, &args.window.end)?;

    let mut config = context.pipeline.clone();
    config.write_mode = args.write_mode.into();
    config.gap_fill = !args.no_gap_fill;
    config.reload = args.reload;
    if let Some(workers) = args.workers {
        if workers == 0 {
            return Err(CliError::Validation(String::from("--workers must be at least 1")));
        }
        config.workers = workers;
    }
    if let Some(limit_ms) = args.file_timeout_ms {
        config.file_timeout_ms = limit_ms;
    }

    let pipeline = Pipeline::new(context.open_warehouse()?, config);
    let report = match args.source {
        Some(source) => {
            let batch = pipeline.run_source(source.into(), &window)?;
            let gap_fill = if pipeline.config().gap_fill {
                Some(pipeline.fill_gaps(&window)?)
            } else {
                None
            };
            WindowReport {
                window,
                batches: vec![batch],
                gap_fill,
            }
        }
        None => pipeline.run_window(&window)?,
    };

    summarize(&report)
}

fn summarize(report: &WindowReport) -> Result<CommandResult, CliError> {
    let mut result = CommandResult::ok(serde_json::to_value(report)?);

    let mut errors = Vec::new();
    for batch in &report.batches {
        if batch.no_input() {
            result = result.with_warning(format!(
                "{}: no pending file in the window ({} seen, {} already done, {} out of window)",
                batch.source, batch.files_seen, batch.files_already_done, batch.files_out_of_window
            ));
        }
        errors.extend(batch.failures.iter().map(|failure| EnvelopeError {
            code: failure.kind.as_str().to_string(),
            message: failure.message.clone(),
            file: Some(failure.file.clone()),
        }));
    }
    result = result.with_errors(errors);

    if report.all_failed() {
        let (failed, attempted) = report
            .batches
            .iter()
            .fold((0, 0), |(failed, attempted), batch| {
                (
                    failed + batch.files_failed.total(),
                    attempted + batch.files_attempted(),
                )
            });
        result = result.with_failure(CliError::AllFilesFailed { failed, attempted });
    }
    Ok(result)
}
