use anyhow::{Context, Result};
use blockstage::cli::CliOverrides;
use blockstage::config::AppConfig;
use blockstage::project::Project;
use blockstage::runtime::Runtime;
use blockstage::runtime_host::RuntimeHost;
use tokio::task::LocalSet;
use tracing::{info, warn};

fn main() {
    let cli = match CliOverrides::parse_from_env() {
        Ok(parsed) => parsed,
        Err(err) => {
            eprintln!("[cli] {err}");
            std::process::exit(2);
        }
    };
    let (mut config, load_error) = match AppConfig::load(cli.config_path()) {
        Ok(config) => (config, None),
        Err(err) => (AppConfig::default(), Some(err)),
    };
    let overrides = cli.config_overrides();
    config.apply_overrides(&overrides);
    init_logging(&config.logging.level);
    if let Some(err) = load_error {
        warn!("Config load error: {err:?}. Falling back to defaults.");
    }
    if !overrides.is_empty() {
        info!(fields = ?overrides.applied_fields(), "CLI overrides applied");
    }

    if let Err(err) = play(&cli, &config) {
        eprintln!("Application error: {err:?}");
        std::process::exit(1);
    }
}

fn init_logging(level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(level))
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).with_target(true).try_init();
}

fn play(cli: &CliOverrides, config: &AppConfig) -> Result<()> {
    let runtime = match cli.project() {
        Some(path) => Runtime::from_project(config, &Project::load_from_path(path)?)?,
        None => Runtime::new(config),
    };
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Building script runtime")?;
    LocalSet::new().block_on(&rt, async {
        let started = runtime.start_run();
        info!(scripts = started, "green flag");
        let limit = async {
            match cli.run_for() {
                Some(duration) => tokio::time::sleep(duration).await,
                None => std::future::pending::<()>().await,
            }
        };
        tokio::select! {
            _ = runtime.settle() => info!("all scripts finished"),
            _ = tokio::signal::ctrl_c() => info!("interrupted"),
            _ = limit => info!("run time elapsed"),
        }
        runtime.stop_run();
        runtime.settle().await;
    });

    for line in runtime.console_lines() {
        println!("{line}");
    }
    for entity in runtime.world().sprites() {
        println!(
            "{} {:<12} x={:.1} y={:.1} direction={:.1}",
            entity.id, entity.name, entity.position.x, entity.position.y, entity.direction
        );
    }
    Ok(())
}
