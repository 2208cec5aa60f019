#![forbid(unsafe_code)]

mod cli;

use anyhow::{Context, Result, anyhow, bail};
use clap::Parser;
use std::io::BufRead;
use std::path::Path;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{Level as TraceLevel, error, info, warn};
use tracing_subscriber::FmtSubscriber;

use cardsmith::blueprint::BlueprintDocument;
use cardsmith::config::{ConfigurationDocument, DocumentStore, JsonFileStore, SharedConfig, ViewPreferences};
use cardsmith::engine::{Dashboard, Engine, ResolvedView, View};
use cardsmith::event_handler::{self, ReloadSignal, handle_signal, run_reload_loop};
use cardsmith::ipc::{self, ConfigClient, ConfigRequest, ConfigResponse, handler::run_request_loop};
use cardsmith::registry::RegistrySnapshot;
use cardsmith::reorder::DragGesture;
use cli::{BlueprintAction, Cli, Command, ViewArgs};

fn init_logging() -> Result<()> {
    // Parse log level from environment variable
    let log_level = match std::env::var("LOG_LEVEL")
        .unwrap_or_else(|_| "info".to_string())
        .to_lowercase()
        .as_str()
    {
        "trace" => TraceLevel::TRACE,
        "debug" => TraceLevel::DEBUG,
        "warn" => TraceLevel::WARN,
        "error" => TraceLevel::ERROR,
        _ => TraceLevel::INFO,
    };

    // Logs go to stderr so stdout stays valid JSON
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber).context("Failed to install log subscriber")
}

/// Stored preferences with the command-line grouping override applied
fn preferences_for(store: &dyn DocumentStore, args: &ViewArgs) -> Result<ViewPreferences> {
    let mut preferences = ViewPreferences::load(store)?;
    if let Some(grouped) = args.grouping_override()
        && let Some(axis) = args.view.grouping_axis()
    {
        preferences.set_grouped(axis, grouped);
    }
    Ok(preferences)
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    let text = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    println!("{text}");
    Ok(())
}

fn expect_ok(response: ConfigResponse) -> Result<()> {
    match response {
        ConfigResponse::Ok => Ok(()),
        ConfigResponse::Error(message) => bail!("{message}"),
        ConfigResponse::Configuration(_) => bail!("Unexpected configuration response"),
    }
}

/// Start the request handler; it stops once every client is dropped
fn spawn_handler(
    config: SharedConfig,
) -> (ConfigClient, JoinHandle<()>, tokio::sync::broadcast::Receiver<ReloadSignal>) {
    let (client, requests) = ipc::channel();
    let (signals, reloads) = event_handler::signal_channel();
    let handle = tokio::spawn(run_request_loop(requests, config, signals));
    (client, handle, reloads)
}

async fn fetch_configuration(client: &ConfigClient) -> Result<ConfigurationDocument> {
    match client.request(ConfigRequest::GetConfiguration).await? {
        ConfigResponse::Configuration(document) => Ok(*document),
        ConfigResponse::Error(message) => bail!("{message}"),
        ConfigResponse::Ok => bail!("Configuration handler sent no document"),
    }
}

fn resolve(store: Arc<dyn DocumentStore>, args: &ViewArgs) -> Result<()> {
    let snapshot = RegistrySnapshot::load(&args.registry)?;
    let document = ConfigurationDocument::load(store.as_ref())?;
    let preferences = preferences_for(store.as_ref(), args)?;

    let engine = Engine::new(Arc::new(snapshot), Arc::new(document));
    print_json(&engine.resolve(&args.view, &preferences))
}

async fn reorder(store: Arc<dyn DocumentStore>, args: &ViewArgs, gesture: DragGesture) -> Result<()> {
    let snapshot = Arc::new(RegistrySnapshot::load(&args.registry)?);
    let config = SharedConfig::load(store.clone())?;
    let preferences = preferences_for(store.as_ref(), args)?;
    let engine = Engine::new(snapshot, Arc::new(config.clone()));

    let request = engine.plan_reorder(&args.view, &preferences, &gesture)?;
    let (client, handler, mut reloads) = spawn_handler(config);
    client.submit(request).await.context("Reorder task failed")?;
    drop(client);
    handler.await.context("Configuration handler failed")?;

    // The handler only signals after a successful write
    let signal = reloads
        .try_recv()
        .map_err(|_| anyhow!("Reorder was not persisted"))?;
    let mut dashboard = Dashboard::default();
    handle_signal(signal, &engine, &mut dashboard, &args.view, &preferences);
    if let Some(resolved) = dashboard.current() {
        print_order(resolved);
    }
    Ok(())
}

fn print_order(resolved: &ResolvedView) {
    for group in &resolved.groups {
        if let Some(key) = &group.key {
            println!("[{key}]");
        }
        for (index, spec) in group.specs.iter().enumerate() {
            println!("{index:>3}  {}", spec.target_id);
        }
    }
}

async fn watch(store: Arc<dyn DocumentStore>, args: ViewArgs) -> Result<()> {
    let snapshot = Arc::new(RegistrySnapshot::load(&args.registry)?);
    let config = SharedConfig::load(store.clone())?;
    let preferences = preferences_for(store.as_ref(), &args)?;
    let engine = Engine::new(snapshot, Arc::new(config.clone()));
    let view: View = args.view;

    let mut dashboard = Dashboard::default();
    let generation = dashboard.begin_pass();
    dashboard.publish(generation, engine.resolve(&view, &preferences));
    if let Some(resolved) = dashboard.current() {
        print_json(resolved)?;
    }

    let (client, _handler, reloads) = spawn_handler(config);
    let runtime = tokio::runtime::Handle::current();
    let input = tokio::task::spawn_blocking(move || -> Result<()> {
        let _runtime = runtime.enter();
        for line in std::io::stdin().lock().lines() {
            let line = line.context("Failed to read stdin")?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<ConfigRequest>(&line) {
                Ok(request) => {
                    info!(verb = request.verb(), "Submitting request");
                    client.submit(request);
                }
                Err(e) => warn!(error = %e, "Ignoring line that is not a request"),
            }
        }
        Ok(())
    });
    tokio::spawn(async move {
        match input.await {
            Ok(Err(e)) => error!(error = ?e, "Input reader stopped"),
            Err(e) => error!(error = ?e, "Input reader panicked"),
            Ok(Ok(())) => info!("End of input"),
        }
    });

    run_reload_loop(reloads, |signal| {
        if handle_signal(signal, &engine, &mut dashboard, &view, &preferences)
            && let Some(resolved) = dashboard.current()
            && let Err(e) = print_json(resolved)
        {
            error!(error = ?e, "Failed to print view");
        }
    })
    .await;
    Ok(())
}

async fn blueprint(store: Arc<dyn DocumentStore>, action: BlueprintAction) -> Result<()> {
    let config = SharedConfig::load(store)?;
    let (client, _handler, _reloads) = spawn_handler(config);

    match action {
        BlueprintAction::Install { file } => {
            let document = read_blueprint(&file)?;
            let name = document.name().to_string();
            expect_ok(
                client
                    .request(ConfigRequest::InstallBlueprint {
                        document: Box::new(document),
                    })
                    .await?,
            )?;
            println!("Installed blueprint '{name}'");
        }
        BlueprintAction::List => {
            let document = fetch_configuration(&client).await?;
            for blueprint in document.blueprints.iter() {
                let meta = &blueprint.blueprint;
                println!("{:<24} {:<8} {:<13} {}", meta.name, meta.version, meta.kind.to_string(), meta.description);
            }
        }
        BlueprintAction::Delete { name } => {
            expect_ok(client.request(ConfigRequest::DeleteBlueprint { name: name.clone() }).await?)?;
            println!("Deleted blueprint '{name}'");
        }
    }
    Ok(())
}

fn read_blueprint(path: &Path) -> Result<BlueprintDocument> {
    let contents =
        std::fs::read_to_string(path).with_context(|| format!("Failed to read blueprint from {:?}", path))?;
    serde_json::from_str(&contents).with_context(|| format!("Failed to parse blueprint from {:?}", path))
}

fn preferences(store: &dyn DocumentStore, group_entities: Option<bool>, group_areas_by_floor: Option<bool>) -> Result<()> {
    let mut preferences = ViewPreferences::load(store)?;
    if group_entities.is_some() || group_areas_by_floor.is_some() {
        if let Some(grouped) = group_entities {
            preferences.group_entities = grouped;
        }
        if let Some(grouped) = group_areas_by_floor {
            preferences.group_areas_by_floor = grouped;
        }
        preferences.save(store)?;
        info!(preferences = ?preferences, "Saved view preferences");
    }
    print_json(&preferences)
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    init_logging()?;
    let cli = Cli::parse();

    let dir = cli.config_dir.unwrap_or_else(JsonFileStore::default_dir);
    info!(config_dir = ?dir, "Using configuration directory");
    let store: Arc<dyn DocumentStore> = Arc::new(JsonFileStore::new(dir));

    match cli.command {
        Command::Resolve { view } => resolve(store, &view),
        Command::Reorder { view, group, from, to } => {
            let gesture = DragGesture {
                group_key: group,
                old_index: from,
                new_index: to,
            };
            reorder(store, &view, gesture).await
        }
        Command::Watch { view } => watch(store, view).await,
        Command::Blueprint { action } => blueprint(store, action).await,
        Command::Preferences {
            group_entities,
            group_areas_by_floor,
        } => preferences(store.as_ref(), group_entities, group_areas_by_floor),
        Command::Config => {
            let config = SharedConfig::load(store)?;
            let (client, _handler, _reloads) = spawn_handler(config);
            print_json(&fetch_configuration(&client).await?)
        }
    }
}
