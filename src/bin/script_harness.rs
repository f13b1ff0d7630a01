use std::env;
use std::fs::{self, File};
use std::path::PathBuf;

use anyhow::{anyhow, bail, Context, Result};
use blockstage::config::AppConfig;
use blockstage::script_harness::{load_fixture, run_fixture_with_config, HarnessOutput};

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();
    if let Err(err) = run_cli() {
        eprintln!("[script-harness] error: {err:?}");
        std::process::exit(1);
    }
}

fn run_cli() -> Result<()> {
    let opts = parse_args()?;
    let config = match &opts.config {
        Some(path) => AppConfig::load(path)?,
        None => AppConfig::default(),
    };
    let fixture = load_fixture(&opts.fixture)?;
    let output = run_fixture_with_config(&fixture, &config)?;

    if let Some(path) = &opts.write_output {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("creating output directory '{}'", parent.display()))?;
            }
        }
        let file = File::create(path)
            .with_context(|| format!("writing harness output to '{}'", path.display()))?;
        serde_json::to_writer_pretty(file, &output).with_context(|| "serializing harness output")?;
        println!("[script-harness] wrote {}", path.display());
    }

    if let Some(path) = &opts.check_golden {
        let file = File::open(path)
            .with_context(|| format!("opening golden file '{}'", path.display()))?;
        let expected: HarnessOutput =
            serde_json::from_reader(file).with_context(|| "parsing golden JSON")?;
        if expected != output {
            bail!(
                "golden mismatch for {} (use --write-output to refresh):\nexpected: {}\nactual:   {}",
                opts.fixture.display(),
                serde_json::to_string(&expected).unwrap_or_default(),
                serde_json::to_string(&output).unwrap_or_default(),
            );
        }
        println!("[script-harness] matched golden {}", path.display());
    } else if opts.write_output.is_none() {
        serde_json::to_writer_pretty(std::io::stdout(), &output)?;
        println!();
    }

    Ok(())
}

#[derive(Default)]
struct CliOptions {
    fixture: PathBuf,
    config: Option<PathBuf>,
    write_output: Option<PathBuf>,
    check_golden: Option<PathBuf>,
}

const USAGE: &str = "Usage: script_harness --fixture <path> [--config <path>] [--golden <path>] [--write-output <path>]";

/// Same `--flag value` form as the player; the last occurrence of a flag wins.
fn parse_args() -> Result<CliOptions> {
    let mut fixture = None;
    let mut options = CliOptions::default();
    let mut args = env::args().skip(1);
    while let Some(flag) = args.next() {
        if flag == "--help" {
            println!("{USAGE}");
            std::process::exit(0);
        }
        let Some(key) = flag.strip_prefix("--") else {
            bail!("Unexpected argument '{flag}'. Flags take the form --name value.");
        };
        let value = PathBuf::from(args.next().ok_or_else(|| anyhow!("Expected a value after '{flag}'"))?);
        match key {
            "fixture" => fixture = Some(value),
            "config" => options.config = Some(value),
            "write-output" => options.write_output = Some(value),
            "golden" => options.check_golden = Some(value),
            _ => bail!("Unknown flag '{flag}'. Supported flags: --fixture, --config, --golden, --write-output."),
        }
    }
    options.fixture = fixture.ok_or_else(|| anyhow!("--fixture <path> is required\n{USAGE}"))?;
    Ok(options)
}
