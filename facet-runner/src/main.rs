//! facet-runner — submit a state-changing call to a deployed facet, wait for
//! it to finalize, then read the updated value back.
//!
//! Configured entirely through the environment (a `.env` file is honoured).
//! Defaults reproduce the calculator run: `subtract(8, 1)` then `getResult()`.

mod abi;
mod config;
mod endpoint;
mod error;
mod op_log;
mod wallet;
mod workflow;

use std::path::Path;

use abi::FacetAbi;
use config::{env_vars, Config};
use endpoint::{EvmResolver, OperationCall};
use error::WorkflowError;
use op_log::{create_operation_log, OperationLog};
use workflow::WorkflowPlan;

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();
    env_logger::init();

    let result = match Config::from_env() {
        Ok(config) => execute(&config).await,
        Err(e) => Err(e),
    };
    std::process::exit(exit_code(&result));
}

/// 0 on success; otherwise the error goes to the log and stderr and the code is 1
fn exit_code(result: &Result<(), WorkflowError>) -> i32 {
    match result {
        Ok(()) => 0,
        Err(e) => {
            log::error!("{}", e);
            eprintln!("{}", e);
            1
        }
    }
}

async fn execute(config: &Config) -> Result<(), WorkflowError> {
    log::info!("Loading ABI '{}' from {}", config.facet_abi, config.abis_dir.display());
    let facet = FacetAbi::load(&config.abis_dir, &config.facet_abi).map_err(WorkflowError::Config)?;

    let address = match &config.facet_address {
        Some(address) => address.clone(),
        None => facet
            .resolve_address(&config.network)
            .map(str::to_string)
            .ok_or_else(|| {
                WorkflowError::config(format!(
                    "{} not set and ABI '{}' has no address for network '{}'",
                    env_vars::FACET_ADDRESS, config.facet_abi, config.network
                ))
            })?,
    };

    let wallet_provider = wallet::create_wallet_provider(config)?;
    let plan = WorkflowPlan::new(
        facet.name.clone(),
        OperationCall::new(&config.submit_function, config.submit_args.clone())
            .with_value(config.submit_value.clone()),
        OperationCall::new(&config.query_function, config.query_args.clone()),
    );

    log::info!(
        "Running {} then {} against {} on {} ({})",
        plan.submit, plan.query, address, config.network, config.rpc_url
    );

    let resolver = EvmResolver::new(config, facet, wallet_provider)?;
    let ops = create_operation_log();
    let result = workflow::run(&resolver, &address, &plan, &ops).await;

    if let Some(path) = &config.report_path {
        write_report(path, &ops);
    }

    result.map(|_| ())
}

/// Persist the report of the latest run; failures are logged, not fatal
fn write_report(path: &Path, ops: &OperationLog) {
    let Some(record) = ops.list_recent(1).into_iter().next() else {
        log::warn!("No run was recorded, skipping report at {}", path.display());
        return;
    };

    let report = record.to_report();
    match serde_json::to_string_pretty(&report) {
        Ok(json) => match std::fs::write(path, json) {
            Ok(()) => log::info!("Run report ({}) written to {}", report.status, path.display()),
            Err(e) => log::error!("Failed to write run report to {}: {}", path.display(), e),
        },
        Err(e) => log::error!("Failed to serialize run report: {}", e),
    }
}
