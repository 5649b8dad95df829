//! Switchcloud CLI entrypoint.
//!
//! This is the main entrypoint for the switchcloud command-line tool.

use std::future::Future;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use switchcloud::cli::{Cli, Commands, OutputFormatter, StateCommands};
use switchcloud::config::{ConfigParser, ConfigValidator, Manifest, find_config_file};
use switchcloud::error::{Result, SwitchcloudError};
use switchcloud::model::ResourceAddress;
use switchcloud::planner::{ApplyPlan, DiffEngine, PlanExecutor, ReplaceOrder};
use switchcloud::provider::ProviderContext;
use switchcloud::state::{
    HistoryEntry, LocalStateStore, Operation, ProviderState, STATE_DIR, StateStore,
    generate_holder_id,
};

use clap::Parser;
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

/// Main entrypoint.
fn main() -> ExitCode {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Failed to create async runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    let formatter = OutputFormatter::new(cli.output);
    match runtime.block_on(run(cli, &formatter)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", formatter.format_diagnostic(&e.diagnostic()));
            ExitCode::FAILURE
        }
    }
}

/// Initializes the logging system.
fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Main async entry point.
async fn run(cli: Cli, formatter: &OutputFormatter) -> Result<()> {
    let config = cli.config.as_deref();

    match cli.command {
        Commands::Validate { warnings } => cmd_validate(config, warnings),
        Commands::Plan { detailed } => cmd_plan(config, detailed, formatter).await,
        Commands::Apply {
            yes,
            continue_on_error,
            create_before_destroy,
        } => {
            let order = if create_before_destroy {
                ReplaceOrder::CreateFirst
            } else {
                ReplaceOrder::DestroyFirst
            };
            let workspace = Workspace::load(config)?;
            workspace
                .locked(
                    "apply",
                    cmd_apply(&workspace, yes, continue_on_error, order, formatter),
                )
                .await
        }
        Commands::Refresh => {
            let workspace = Workspace::load(config)?;
            workspace
                .locked("refresh", cmd_refresh(&workspace, formatter))
                .await
        }
        Commands::Import { address, id } => {
            let address: ResourceAddress = address.parse()?;
            let workspace = Workspace::load(config)?;
            workspace
                .locked("import", cmd_import(&workspace, &address, &id, formatter))
                .await
        }
        Commands::Destroy { yes } => {
            let workspace = Workspace::load(config)?;
            workspace
                .locked("destroy", cmd_destroy(&workspace, yes, formatter))
                .await
        }
        Commands::Lookup { name } => cmd_lookup(config, &name, formatter).await,
        Commands::State { command } => cmd_state(config, command, formatter).await,
    }
}

/// Validate the manifest.
fn cmd_validate(config_path: Option<&Path>, show_warnings: bool) -> Result<()> {
    let (config_file, manifest) = load_manifest(config_path)?;
    let result = ConfigValidator::new().validate(&manifest)?;

    eprintln!("Configuration is valid: {}", config_file.display());
    if show_warnings && !result.warnings.is_empty() {
        eprintln!("\nWarnings:");
        for warning in &result.warnings {
            eprintln!("  - {warning}");
        }
    }

    eprintln!("\nConfiguration summary:");
    eprintln!("  Endpoint: {}", manifest.provider.endpoint);
    eprintln!("  Projects: {}", manifest.projects.len());
    eprintln!("  Members: {}", manifest.members.len());

    Ok(())
}

/// Show the apply plan.
async fn cmd_plan(
    config_path: Option<&Path>,
    detailed: bool,
    formatter: &OutputFormatter,
) -> Result<()> {
    let workspace = Workspace::load(config_path)?;
    let state = workspace.load_state().await?;

    let diff = DiffEngine::new().compute_diff(&workspace.manifest, &state);
    let plan = ApplyPlan::from_diff(&diff, ReplaceOrder::default());

    println!("{}", formatter.format_plan(&plan));
    if detailed && diff.has_changes() {
        println!("{}", formatter.format_diff(&diff));
    }

    Ok(())
}

/// Apply the manifest.
async fn cmd_apply(
    workspace: &Workspace,
    auto_approve: bool,
    continue_on_error: bool,
    replace_order: ReplaceOrder,
    formatter: &OutputFormatter,
) -> Result<()> {
    let mut state = workspace.load_state().await?;

    let diff = DiffEngine::new().compute_diff(&workspace.manifest, &state);
    let plan = ApplyPlan::from_diff(&diff, replace_order);

    if plan.is_empty() {
        eprintln!("No changes to apply.");
        return Ok(());
    }

    println!("{}", formatter.format_plan(&plan));

    if !auto_approve && !confirm("Do you want to apply this plan? [y/N]: ", "y")? {
        eprintln!("Apply cancelled.");
        return Ok(());
    }

    let provider = workspace.connect()?;
    let result = PlanExecutor::new(&provider)
        .with_continue_on_error(continue_on_error)
        .execute(&plan, &mut state)
        .await;

    workspace.store.save(&state).await?;
    println!("{}", formatter.format_execution(&result));

    if result.all_successful() {
        Ok(())
    } else {
        Err(SwitchcloudError::internal(format!(
            "apply incomplete: {} failed, {} skipped",
            result.failed, result.skipped
        )))
    }
}

/// Re-read every recorded object.
async fn cmd_refresh(workspace: &Workspace, formatter: &OutputFormatter) -> Result<()> {
    let mut state = workspace.load_state().await?;
    if state.resource_count() == 0 {
        eprintln!("No recorded objects to refresh.");
        return Ok(());
    }

    let provider = workspace.connect()?;
    let report = PlanExecutor::new(&provider).refresh(&mut state).await;

    workspace.store.save(&state).await?;
    println!("{}", formatter.format_refresh(&report));
    Ok(())
}

/// Adopt an existing object.
async fn cmd_import(
    workspace: &Workspace,
    address: &ResourceAddress,
    external_id: &str,
    formatter: &OutputFormatter,
) -> Result<()> {
    let mut state = workspace.load_state().await?;

    let provider = workspace.connect()?;
    let object = PlanExecutor::new(&provider)
        .import(address, external_id, &mut state)
        .await?;

    workspace.store.save(&state).await?;
    println!(
        "{}",
        formatter.format_object(&format!("Imported {address}"), &object)
    );
    Ok(())
}

/// Delete every recorded object.
async fn cmd_destroy(
    workspace: &Workspace,
    auto_approve: bool,
    formatter: &OutputFormatter,
) -> Result<()> {
    let mut state = workspace.load_state().await?;
    let addresses = state.addresses_for_teardown();

    if addresses.is_empty() {
        eprintln!("No objects to destroy.");
        return Ok(());
    }

    eprintln!("The following objects will be destroyed:");
    for address in &addresses {
        eprintln!("  - {address}");
    }

    if !auto_approve
        && !confirm(
            "\nThis action is IRREVERSIBLE. Type 'destroy' to confirm: ",
            "destroy",
        )?
    {
        eprintln!("Destruction cancelled.");
        return Ok(());
    }

    let provider = workspace.connect()?;
    let result = PlanExecutor::new(&provider).destroy(&mut state).await;

    workspace.store.save(&state).await?;
    println!("{}", formatter.format_execution(&result));

    if state.resource_count() > 0 {
        warn!(
            "{} objects remain in state and must be removed on the API side",
            state.resource_count()
        );
    }
    Ok(())
}

/// Find a project by name.
async fn cmd_lookup(
    config_path: Option<&Path>,
    name: &str,
    formatter: &OutputFormatter,
) -> Result<()> {
    let workspace = Workspace::load(config_path)?;
    let provider = workspace.connect()?;
    let project = provider.project_lookup().find_by_name(name).await?;

    println!("{}", formatter.format_object(&format!("Project '{name}'"), &project));
    Ok(())
}

/// State management commands.
async fn cmd_state(
    config_path: Option<&Path>,
    command: StateCommands,
    formatter: &OutputFormatter,
) -> Result<()> {
    let workspace = Workspace::load(config_path)?;
    let store = &workspace.store;

    match command {
        StateCommands::Show => {
            if let Some(state) = store.load().await? {
                println!("{}", formatter.format_state(&state));
            } else {
                eprintln!("No state found at {}.", store.location());
            }
        }
        StateCommands::Lock { holder } => {
            let holder = holder.unwrap_or_else(generate_holder_id);
            let lock = store.acquire_lock(&holder, "manual").await?;
            eprintln!(
                "State locked: {} (expires in {}s)",
                lock.lock_id,
                lock.remaining_secs()
            );
        }
        StateCommands::Unlock { lock_id, force } => {
            if force {
                store.force_unlock().await?;
                eprintln!("State forcefully unlocked.");
            } else if let Some(id) = lock_id {
                store.release_lock(&id).await?;
                eprintln!("State unlocked.");
            } else {
                eprintln!("Please provide --lock-id or use --force");
            }
        }
        StateCommands::Rm { address } => {
            let address: ResourceAddress = address.parse()?;
            workspace
                .locked("forget", forget(&workspace, &address))
                .await?;
        }
    }

    Ok(())
}

/// Removes a record without touching the API.
async fn forget(workspace: &Workspace, address: &ResourceAddress) -> Result<()> {
    let mut state = workspace.load_state().await?;
    if state.remove(address).is_none() {
        return Err(SwitchcloudError::State(
            switchcloud::error::StateError::UnknownResource {
                address: address.to_string(),
            },
        ));
    }

    state.add_history(HistoryEntry::new(
        Operation::Forget,
        vec![address.to_string()],
        None,
    ));
    workspace.store.save(&state).await?;
    eprintln!("Removed {address} from state. The remote object was not changed.");
    Ok(())
}

// ============================================================================
// Helper Functions
// ============================================================================

/// A loaded manifest and the state store next to it.
struct Workspace {
    manifest: Manifest,
    store: LocalStateStore,
}

impl Workspace {
    /// Loads and validates the manifest and opens its state store.
    fn load(config_path: Option<&Path>) -> Result<Self> {
        let (config_file, manifest) = load_manifest(config_path)?;
        ConfigValidator::new().validate(&manifest)?;

        let state_dir = manifest.state.path.as_ref().map_or_else(
            || manifest_dir(&config_file).join(STATE_DIR),
            PathBuf::from,
        );
        debug!("Using state directory: {}", state_dir.display());

        Ok(Self {
            manifest,
            store: LocalStateStore::with_base_dir(state_dir),
        })
    }

    /// Loads recorded state, or starts an empty one.
    async fn load_state(&self) -> Result<ProviderState> {
        let endpoint = &self.manifest.provider.endpoint;
        match self.store.load().await? {
            Some(state) => {
                if state.endpoint != *endpoint {
                    warn!(
                        "State was recorded against {} but the manifest targets {endpoint}",
                        state.endpoint
                    );
                }
                Ok(state)
            }
            None => Ok(ProviderState::new(endpoint)),
        }
    }

    /// Connects to the API and cancels in-flight calls on Ctrl-C.
    fn connect(&self) -> Result<ProviderContext> {
        let provider = ProviderContext::connect(&self.manifest.provider)?;

        let token = provider.cancellation_token();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupted, cancelling in-flight requests");
                token.cancel();
            }
        });

        Ok(provider)
    }

    /// Runs a state-changing command while holding the state lock.
    async fn locked<T>(
        &self,
        operation: &str,
        command: impl Future<Output = Result<T>>,
    ) -> Result<T> {
        let lock = self
            .store
            .acquire_lock(&generate_holder_id(), operation)
            .await?;
        let outcome = command.await;
        self.store.release_lock(&lock.lock_id).await?;
        outcome
    }
}

/// Resolves, loads and applies environment overrides to the manifest.
fn load_manifest(config_path: Option<&Path>) -> Result<(PathBuf, Manifest)> {
    let config_file = match config_path {
        Some(path) => path.to_path_buf(),
        None => find_config_file(std::env::current_dir()?)?,
    };
    debug!("Loading configuration from: {}", config_file.display());

    let parser = ConfigParser::new().with_base_path(manifest_dir(&config_file));
    parser.load_dotenv()?;
    let manifest = parser.load_with_env(&config_file)?;

    Ok((config_file, manifest))
}

fn manifest_dir(config_file: &Path) -> PathBuf {
    config_file
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map_or_else(|| PathBuf::from("."), Path::to_path_buf)
}

/// Prompts on stderr and compares the answer.
fn confirm(prompt: &str, expected: &str) -> Result<bool> {
    eprint!("{prompt}");
    std::io::stderr().flush()?;

    let mut input = String::new();
    std::io::stdin().read_line(&mut input)?;
    Ok(input.trim().eq_ignore_ascii_case(expected))
}

#[cfg(test)]
mod tests {
    use super::*;
    use switchcloud::cli::OutputFormat;

    #[test]
    fn test_manifest_dir_of_bare_file_name() {
        assert_eq!(manifest_dir(Path::new("switchcloud.yaml")), PathBuf::from("."));
        assert_eq!(
            manifest_dir(Path::new("/srv/infra/switchcloud.yaml")),
            PathBuf::from("/srv/infra")
        );
    }

    #[test]
    fn test_output_flag_defaults_to_text() {
        let cli = Cli::parse_from(["switchcloud", "refresh"]);
        assert!(matches!(cli.output, OutputFormat::Text));
    }
}
