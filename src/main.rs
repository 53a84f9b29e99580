use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use clap::ValueEnum;
use tracing_subscriber::EnvFilter;

use logviz::config::Config;
use logviz::pipeline;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Preset {
    /// 1000x1000 SIR grid
    Sir,
    /// 20x20 black and white grid with gridlines
    Gate,
    /// 100x100 black and red grid
    Infection,
}

/// Render a grid simulation log as a video
#[derive(Parser, Debug)]
#[command(name = "logviz", version)]
struct Args {
    /// Semicolon delimited simulation log
    log: Option<PathBuf>,

    /// TOML config file, applied on top of the preset
    #[arg(long, short)]
    config: Option<PathBuf>,

    /// Starting point for the config
    #[arg(long, value_enum, default_value = "sir")]
    preset: Preset,

    /// Output video
    #[arg(long, short)]
    output: Option<PathBuf>,

    /// Output resolution
    #[arg(long)]
    dpi: Option<u32>,

    /// Playback time of a frame, in milliseconds
    #[arg(long)]
    interval_ms: Option<u32>,

    /// Don't draw the progress bar
    #[arg(long, short)]
    quiet: bool,

    /// Print the effective config as TOML and exit
    #[arg(long)]
    print_config: bool,
}

impl Args {
    fn config(&self) -> anyhow::Result<Config> {
        let mut config = match &self.config {
            Some(path) => {
                let text = std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read config {}", path.display()))?;

                // the file only lists what it changes, everything else comes from the preset
                let base = toml::Value::try_from(preset(self.preset))?;
                let overrides: toml::Value = toml::from_str(&text)
                    .with_context(|| format!("Failed to parse config {}", path.display()))?;

                merge(base, overrides).try_into::<Config>()?
            }
            None => preset(self.preset),
        };

        if let Some(output) = &self.output {
            config.output = output.clone();
        }

        if let Some(dpi) = self.dpi {
            config.dpi = dpi;
        }

        if let Some(interval_ms) = self.interval_ms {
            config.interval_ms = interval_ms;
        }

        config.validate()?;

        Ok(config)
    }
}

fn preset(preset: Preset) -> Config {
    match preset {
        Preset::Sir => Config::sir(),
        Preset::Gate => Config::gate(),
        Preset::Infection => Config::infection(),
    }
}

/// Recursively overlays the tables of `top` onto `base`. Anything that isn't a table replaces.
fn merge(base: toml::Value, top: toml::Value) -> toml::Value {
    match (base, top) {
        (toml::Value::Table(mut base), toml::Value::Table(top)) => {
            for (key, value) in top {
                let merged = match base.remove(&key) {
                    Some(old) => merge(old, value),
                    None => value,
                };

                base.insert(key, merged);
            }

            toml::Value::Table(base)
        }
        (_, top) => top,
    }
}

fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("logviz=info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = args.config()?;

    if args.print_config {
        print!("{}", config.to_toml()?);
        return Ok(());
    }

    let Some(log) = &args.log else {
        anyhow::bail!("A log file is required");
    };

    pipeline::run(&config, log, !args.quiet)
        .with_context(|| format!("Failed to render {}", log.display()))?;

    Ok(())
}
