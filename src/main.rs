use std::fs;
use std::io::{self, IsTerminal, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use clap::{Args, Parser, Subcommand};
use serde_json::Value as Json;
use tracing_subscriber::EnvFilter;
use yansi::Paint;

use chartops::config::Config;
use chartops::datum::{Datum, load_dataset};
use chartops::library::{Session, builtins};
use chartops::plan::{Plan, ResultStore};
use chartops::registry::Registry;
use chartops::{Error, parser, render, run_script};

#[derive(Parser)]
#[command(name = "chartops")]
#[command(about = "Run chart command scripts and evaluate data operations over chart data.")]
struct Cli {
    /// Config file (default: <config dir>/chartops/config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(flatten)]
    fields: FieldArgs,

    #[command(subcommand)]
    command: Command,
}

/// Dataset column names, overriding the config file.
#[derive(Args)]
struct FieldArgs {
    /// Column holding the category key
    #[arg(long, global = true)]
    category: Option<String>,

    /// Column holding the series key
    #[arg(long, global = true)]
    series: Option<String>,

    /// Column holding the measure
    #[arg(long, global = true)]
    measure: Option<String>,
}

#[derive(Subcommand)]
enum Command {
    /// Parse a script and print its stages
    Parse {
        /// Script, e.g. "A(1) + B(2) -> C(3)"
        script: String,

        /// Output as JSON
        #[arg(short = 'j', long = "json")]
        json: bool,
    },
    /// Run a script against the built-in actions
    Run {
        script: String,

        /// Dataset for `evaluate` (CSV with a header row, or a JSON array)
        #[arg(long)]
        data: Option<PathBuf>,

        /// Bind a name to a JSON value for use as a script argument
        #[arg(long = "bind", value_name = "NAME=JSON")]
        bindings: Vec<String>,

        /// Output as JSON
        #[arg(short = 'j', long = "json")]
        json: bool,
    },
    /// Evaluate an operation spec, a chain of specs or a keyed plan
    Eval {
        /// JSON file, or inline JSON
        spec: String,

        /// Dataset (CSV with a header row, or a JSON array)
        #[arg(long)]
        data: PathBuf,

        /// Output as JSON
        #[arg(short = 'j', long = "json")]
        json: bool,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match load_config(&cli) {
        Ok(c) => c,
        Err(e) => exit_with(e),
    };
    init_tracing(&config.log_filter);

    if let Err(e) = run(cli.command, config).await {
        exit_with(e);
    }
}

fn exit_with(e: anyhow::Error) -> ! {
    eprintln!("{} {:#}", "error:".red().bold(), e);
    std::process::exit(1);
}

fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(category) = &cli.fields.category {
        config.fields.category = category.clone();
    }
    if let Some(series) = &cli.fields.series {
        config.fields.series = Some(series.clone());
    }
    if let Some(measure) = &cli.fields.measure {
        config.fields.measure = measure.clone();
    }
    Ok(config)
}

/// Log to stderr. `RUST_LOG` wins over the configured filter.
fn init_tracing(default_filter: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

async fn run(command: Command, config: Config) -> Result<()> {
    let stdout = io::stdout();
    let use_color = stdout.is_terminal();
    let mut out = stdout.lock();

    match command {
        Command::Parse { script, json } => {
            let parsed = parser::parse_script(&script).map_err(|e| anyhow!(e.render(&script)))?;
            if json {
                serde_json::to_writer_pretty(&mut out, &parsed)?;
                writeln!(out)?;
            } else {
                render::write_script(&mut out, &parsed)?;
            }
        }
        Command::Run {
            script,
            data,
            bindings,
            json,
        } => {
            let data = match data {
                Some(path) => load_dataset(&path, &config.fields)?,
                None => Vec::new(),
            };
            let session = Arc::new(Session::new(data, config.fields.clone()));
            let mut library = builtins(session);
            for binding in &bindings {
                let (name, value) = parse_binding(binding)?;
                library = library.value(name, value);
            }

            let report = run_script(&script, &library, config.engine_config())
                .await
                .map_err(|e| match e {
                    Error::Syntax(syntax) => anyhow!(syntax.render(&script)),
                    Error::Stage(stage) if stage.has_unknown_action() => {
                        let registry = Registry::build(&library);
                        anyhow!("{}\navailable actions: {}", stage, registry.names().join(", "))
                    }
                    other => anyhow!(other),
                })?;

            if json {
                serde_json::to_writer_pretty(&mut out, &report.outputs)?;
                writeln!(out)?;
            } else {
                for (i, outputs) in report.outputs.iter().enumerate() {
                    writeln!(out, "stage {}:", i + 1)?;
                    for output in outputs {
                        write!(out, "  ")?;
                        render::write_json_highlighted(&mut out, output, use_color)?;
                        writeln!(out)?;
                    }
                }
            }
        }
        Command::Eval { spec, data, json } => {
            let data: Vec<Datum> = load_dataset(&data, &config.fields)?;
            let plan = Plan::from_json(read_spec(&spec)?).context("invalid operation spec")?;
            let report = plan.run(&data, &config.fields, &mut ResultStore::new());

            if json {
                let value = serde_json::to_value(&report)?;
                render::write_json_highlighted(&mut out, &value, use_color)?;
                writeln!(out)?;
            } else {
                for step in &report.steps {
                    for result in &step.results {
                        let heading = format!("{}:", result.id);
                        writeln!(out, "{}", if use_color { heading.bold().to_string() } else { heading })?;
                        render::write_result(&mut out, &result.result)?;
                    }
                }
            }
        }
    }
    Ok(())
}

/// A spec argument is a path to a JSON file, or the JSON itself.
fn read_spec(spec: &str) -> Result<Json> {
    let path = Path::new(spec);
    let text = if path.is_file() {
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?
    } else {
        spec.to_string()
    };
    serde_json::from_str(&text).context("spec is not valid JSON")
}

/// `NAME=JSON`. A value that is not JSON is taken as a string.
fn parse_binding(binding: &str) -> Result<(String, Json)> {
    let (name, raw) = binding
        .split_once('=')
        .ok_or_else(|| anyhow!("binding must look like NAME=JSON, got \"{}\"", binding))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(anyhow!("binding \"{}\" has no name", binding));
    }
    let value = serde_json::from_str(raw).unwrap_or_else(|_| Json::String(raw.to_string()));
    Ok((name.to_string(), value))
}
