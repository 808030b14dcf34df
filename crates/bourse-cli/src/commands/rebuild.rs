use std::fs::File;
use std::path::Path;

use bourse_core::CompanySeed;

use crate::cli::RebuildArgs;
use crate::error::CliError;

use super::{CommandResult, Context};

pub fn run(args: &RebuildArgs, context: &Context) -> Result<CommandResult, CliError> {
    if !args.confirm {
        return Err(CliError::Validation(String::from(
            "rebuild-registry deletes every stored series and the ledger; pass --confirm",
        )));
    }

    let seeds = match &args.seed {
        Some(path) => read_seeds(path)?,
        None => Vec::new(),
    };

    let warehouse = context.open_warehouse()?;
    let report = warehouse.rebuild_registry(&seeds)?;
    tracing::warn!(
        companies_loaded = report.companies_loaded,
        intraday_removed = report.intraday_removed,
        daily_removed = report.daily_removed,
        "registry rebuilt"
    );

    Ok(CommandResult::ok(serde_json::to_value(report)?))
}

fn read_seeds(path: &Path) -> Result<Vec<CompanySeed>, CliError> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(File::open(path)?);
    let seeds = reader
        .deserialize::<CompanySeed>()
        .collect::<Result<Vec<_>, _>>()?;
    Ok(seeds)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_seed_rows_with_optional_identifiers() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("companies.csv");
        std::fs::write(
            &path,
            "name,symbol,isin,euronext,boursorama\n\
             Airbus,AIR,NL0000235190,AIR,1rPAIR\n\
             Unknown,XYZ,,,\n",
        )
        .expect("write");

        let seeds = read_seeds(&path).expect("seeds");
        assert_eq!(seeds.len(), 2);
        assert_eq!(seeds[0].boursorama.as_deref(), Some("1rPAIR"));
        assert_eq!(seeds[1].isin, None);
    }

    #[test]
    fn refuses_to_run_without_confirmation() {
        let args = RebuildArgs {
            confirm: false,
            seed: None,
        };
        let context = Context {
            warehouse: bourse_core::WarehouseConfig::default(),
            pipeline: bourse_core::PipelineConfig::default(),
        };
        let error = run(&args, &context).err().expect("refused");
        assert_eq!(error.exit_code(), 2);
    }
}
