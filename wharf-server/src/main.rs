//! Wharf's reference driver: loads configuration, builds and starts the
//! Warehouse, then runs the control loop handling `SIGHUP`/`SIGTERM`/
//! `SIGINT`/`SIGUSR2` and the optional `--max-run-time-sec` deadline, per
//! `spec.md` §6. Exit codes: 0 clean, 1 configuration error or uncaught
//! failure, 2 usage error.

#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;

use wharf_component::{init_root, start_tree, stop_tree, Component, ComponentRegistry, ControlContext};
use wharf_core::config::GatewayConfig;
use wharf_server::signals::{ControlEvent, SignalListener};
use wharf_server::{builtin_registry, default_logger, Cli, Warehouse, WarehouseOptions};
use wharf_store::ConfigSource;

enum RunOutcome {
    Clean,
    Failure(anyhow::Error),
    Usage(String),
}

#[tokio::main(flavor = "multi_thread")]
async fn main() -> ExitCode {
    match run().await {
        RunOutcome::Clean => ExitCode::SUCCESS,
        RunOutcome::Failure(err) => {
            eprintln!("wharf: {err:#}");
            ExitCode::from(1)
        }
        RunOutcome::Usage(msg) => {
            eprintln!("wharf: {msg}");
            ExitCode::from(2)
        }
    }
}

/// A live, started warehouse generation: the typed handle (for
/// `dump_tree`), the `Arc<dyn Component>` view `start_tree`/`stop_tree`
/// want, and the root context it was built against.
struct Generation {
    warehouse: Arc<Warehouse>,
    component: Arc<dyn Component>,
}

async fn start_generation(
    config: GatewayConfig,
    registry: Arc<ComponentRegistry>,
    options: WarehouseOptions,
    tag_index: u32,
    is_reload: bool,
) -> wharf_core::Result<Generation> {
    let warehouse = Warehouse::new(config, registry, options);
    let root_ctx = ControlContext::root(default_logger(tag_index));
    let component = warehouse.clone() as Arc<dyn Component>;
    init_root(&root_ctx, component.clone()).await?;
    start_tree(&component, is_reload).await?;
    Ok(Generation { warehouse, component })
}

async fn run() -> RunOutcome {
    let cli = Cli::parse();
    init_tracing(cli.log_to_stdout);

    let source = match cli.config_source() {
        Ok(source) => source,
        Err(e) => return RunOutcome::Usage(e.0),
    };

    let config = match source.load().await {
        Ok(config) => config,
        Err(e) => return RunOutcome::Failure(anyhow::anyhow!(e)),
    };

    let options = WarehouseOptions { early_errors: cli.early_errors };

    if cli.dry_run {
        return match wire_only(config, options).await {
            Ok(()) => {
                println!("configuration OK: component tree wired with no sockets bound (--dry-run)");
                RunOutcome::Clean
            }
            Err(e) => RunOutcome::Failure(anyhow::anyhow!(e)),
        };
    }

    let registry = builtin_registry();
    let mut generation = match start_generation(config, registry.clone(), options, 0, false).await {
        Ok(g) => g,
        Err(e) => return RunOutcome::Failure(anyhow::anyhow!(e)),
    };
    tracing::info!("wharf started");

    let mut listener = match SignalListener::install() {
        Ok(listener) => listener,
        Err(e) => return RunOutcome::Failure(anyhow::anyhow!(e)),
    };

    let deadline = cli
        .max_run_time_sec
        .map(|secs| tokio::time::Instant::now() + Duration::from_secs(secs));
    let mut tag_index: u32 = 1;

    loop {
        let event = match deadline {
            Some(at) => {
                tokio::select! {
                    event = listener.next() => event,
                    _ = tokio::time::sleep_until(at) => ControlEvent::Shutdown,
                }
            }
            None => listener.next().await,
        };

        match event {
            ControlEvent::Shutdown => {
                tracing::info!("shutting down");
                stop_tree(&generation.component, false).await.ok();
                return RunOutcome::Clean;
            }
            ControlEvent::DumpTree => {
                for path in generation.warehouse.dump_tree() {
                    tracing::info!(component = %path, "component tree dump");
                }
            }
            ControlEvent::Reload => {
                tracing::info!("SIGHUP received; reloading");
                if let Err(e) = stop_tree(&generation.component, true).await {
                    tracing::warn!(error = %e, "reload: stop of previous warehouse reported an error; continuing");
                }
                let new_config = match source.load().await {
                    Ok(config) => config,
                    Err(e) => {
                        tracing::error!(error = %e, "reload: failed to re-read configuration; nothing is running until the next reload");
                        continue;
                    }
                };
                match start_generation(new_config, registry.clone(), options, tag_index, true).await {
                    Ok(new_generation) => {
                        tag_index += 1;
                        generation = new_generation;
                        tracing::info!("reload complete");
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "reload: failed to start the new warehouse; nothing is running until the next reload");
                    }
                }
            }
        }
    }
}

/// `--dry-run`: build and initialize the component tree (validating every
/// mount, service reference, and TLS entry) but never call `start_tree`, so
/// no socket is bound.
async fn wire_only(config: GatewayConfig, options: WarehouseOptions) -> wharf_core::Result<()> {
    let registry = builtin_registry();
    let warehouse = Warehouse::new(config, registry, options);
    let root_ctx = ControlContext::root(Arc::new(wharf_component::NoopLogger));
    let component = warehouse as Arc<dyn Component>;
    init_root(&root_ctx, component).await
}

fn init_tracing(log_to_stdout: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    if log_to_stdout {
        tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();
    } else {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    }
}
