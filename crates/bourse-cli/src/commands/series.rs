use bourse_core::{DateWindow, SeriesQuery};

use crate::cli::SeriesArgs;
use crate::error::CliError;

use super::{CommandResult, Context};

pub fn run(args: &SeriesArgs, context: &Context) -> Result<CommandResult, CliError> {
    let window = DateWindow::parse(&args.window.start, &args.window.end)?;
    let query = SeriesQuery {
        symbols: args.symbols.clone(),
        start: window.start(),
        end: window.end(),
        granularity: args.granularity.into(),
    };

    let points = context.open_warehouse()?.series(&query)?;
    let mut result = CommandResult::ok(serde_json::json!({
        "window": window,
        "granularity": query.granularity,
        "points": points,
    }));
    if points.is_empty() {
        result = result.with_warning("no stored point matches the query");
    }
    Ok(result)
}
