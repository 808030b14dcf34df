use bourse_core::{DateWindow, Pipeline};

use crate::cli::WindowArgs;
use crate::error::CliError;

use super::{CommandResult, Context};

pub fn run(args: &WindowArgs, context: &Context) -> Result<CommandResult, CliError> {
    let window = DateWindow::parse(&args.start, &args.end)?;
    let pipeline = Pipeline::new(context.open_warehouse()?, context.pipeline.clone());
    let report = pipeline.fill_gaps(&window)?;

    let mut result = CommandResult::ok(serde_json::json!({
        "window": window,
        "gap_fill": report,
    }));
    if report.missing_pairs > report.filled {
        result = result.with_warning(format!(
            "{} company-days have neither a daily bar nor intraday samples",
            report.missing_pairs - report.filled
        ));
    }
    Ok(result)
}
