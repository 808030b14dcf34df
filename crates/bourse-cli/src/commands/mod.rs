mod gap_fill;
mod ingest;
mod rebuild;
mod series;
mod status;

use std::time::Instant;

use bourse_core::{PipelineConfig, Warehouse, WarehouseConfig};
use serde_json::Value;

use crate::cli::{Cli, Command};
use crate::envelope::{Envelope, EnvelopeError, EnvelopeMeta};
use crate::error::CliError;

pub struct CommandResult {
    pub data: Value,
    pub warnings: Vec<String>,
    pub errors: Vec<EnvelopeError>,
    /// Raised after the envelope is printed.
    pub failure: Option<CliError>,
}

impl CommandResult {
    pub fn ok(data: Value) -> Self {
        Self {
            data,
            warnings: Vec::new(),
            errors: Vec::new(),
            failure: None,
        }
    }

    pub fn with_warning(mut self, warning: impl Into<String>) -> Self {
        self.warnings.push(warning.into());
        self
    }

    pub fn with_errors(mut self, errors: Vec<EnvelopeError>) -> Self {
        self.errors.extend(errors);
        self
    }

    pub fn with_failure(mut self, failure: CliError) -> Self {
        self.failure = Some(failure);
        self
    }
}

/// Printed envelope plus the error that decides the exit code, if any.
pub struct Completed {
    pub envelope: Envelope,
    pub failure: Option<CliError>,
}

/// Store and input locations resolved from global flags and the environment.
pub struct Context {
    pub warehouse: WarehouseConfig,
    pub pipeline: PipelineConfig,
}

impl Context {
    pub fn from_cli(cli: &Cli) -> Self {
        let mut warehouse = WarehouseConfig::default();
        if let Some(db_path) = &cli.db_path {
            warehouse.db_path.clone_from(db_path);
        }

        let mut pipeline = PipelineConfig::default();
        if let Some(data_root) = &cli.data_root {
            pipeline.data_root.clone_from(data_root);
        }

        Self {
            warehouse,
            pipeline,
        }
    }

    pub fn open_warehouse(&self) -> Result<Warehouse, CliError> {
        Ok(Warehouse::open(self.warehouse.clone())?)
    }
}

pub fn run(cli: &Cli) -> Result<Completed, CliError> {
    let started = Instant::now();
    let context = Context::from_cli(cli);

    let (name, command_result) = match &cli.command {
        Command::Ingest(args) => ("ingest", ingest::run(args, &context)?),
        Command::GapFill(args) => ("gap-fill", gap_fill::run(args, &context)?),
        Command::RebuildRegistry(args) => ("rebuild-registry", rebuild::run(args, &context)?),
        Command::Status => ("status", status::run(&context)?),
        Command::Series(args) => ("series", series::run(args, &context)?),
    };

    let CommandResult {
        data,
        warnings,
        errors,
        failure,
    } = command_result;

    let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
    let mut meta = EnvelopeMeta::new(name, elapsed_ms);
    for warning in warnings {
        meta.push_warning(warning);
    }

    Ok(Completed {
        envelope: Envelope { meta, data, errors },
        failure,
    })
}
