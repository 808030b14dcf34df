use crate::error::CliError;

use super::{CommandResult, Context};

pub fn run(context: &Context) -> Result<CommandResult, CliError> {
    let warehouse = context.open_warehouse()?;
    let counts = warehouse.counts()?;

    Ok(CommandResult::ok(serde_json::json!({
        "db_path": warehouse.db_path().display().to_string(),
        "data_root": context.pipeline.data_root.display().to_string(),
        "counts": counts,
    })))
}
