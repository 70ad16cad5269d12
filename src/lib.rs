pub mod application;
pub mod domain;
pub mod infrastructure;

use application::bootstrap::bootstrap_workspace;
use application::console::ConsoleController;
use infrastructure::error::InfraError;
use infrastructure::logging::init_logging;
use infrastructure::task_store::ReqwestTaskStore;
use std::io::BufReader;
use std::path::Path;
use std::sync::Arc;

pub fn run_in(workspace_root: &Path) -> Result<(), InfraError> {
    let bootstrap = bootstrap_workspace(workspace_root)?;
    let _logging = init_logging(&bootstrap.logs_dir)?;
    tracing::info!(
        base_url = %bootstrap.config.base_url,
        persist_reorder = bootstrap.config.persist_reorder,
        "client configured"
    );

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    let store = Arc::new(ReqwestTaskStore::new(&bootstrap.config));
    let controller = ConsoleController::new(
        store,
        &bootstrap.config,
        BufReader::new(std::io::stdin()),
        std::io::stdout(),
    )?;
    runtime.block_on(controller.run())
}

pub fn run() {
    let workspace_root = std::env::current_dir().expect("failed to resolve current directory");
    if let Err(error) = run_in(&workspace_root) {
        eprintln!("minimaldo: {error}");
        std::process::exit(1);
    }
}
