//! CLI commands for achor-breaks

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::warn;
use tracing_subscriber::EnvFilter;

use crate::config::ClassifyConfig;
use crate::features::{FeatureSet, LoadOptions};
use crate::method::Method;
use crate::pipeline::{classify, Classification, RunStatus};
use crate::suggest::{suggest_sweep, sweep_is_reasonable};
use crate::sweep::DEFAULT_MAX_STEPS;

#[derive(Parser)]
#[command(name = "achor-breaks")]
#[command(about = "Spatially significant classification breaks for choropleth maps", long_about = None)]
pub struct Cli {
    /// Log output format (logs go to stderr)
    #[arg(long, value_enum, default_value = "text", global = true)]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// One break per line in discovery order
    Csv,
    /// Full classification result
    Json,
}

fn parse_method(s: &str) -> std::result::Result<Method, String> {
    s.parse::<Method>().map_err(|e| e.to_string())
}

#[derive(Subcommand)]
pub enum Commands {
    /// Compute classification breaks for a polygon layer
    Breaks {
        /// Input GeoJSON FeatureCollection of polygons
        input: PathBuf,

        /// Attribute field to classify
        #[arg(short, long)]
        field: String,

        /// Number of classes
        #[arg(short, long, default_value = "5")]
        classes: usize,

        /// Sweep interval (suggested from the value range when omitted)
        #[arg(short, long)]
        sweep: Option<f64>,

        /// Method name or code (1-6, 71, 72, 73, 8)
        #[arg(short, long, default_value = "local-extreme", value_parser = parse_method)]
        method: Method,

        /// Category field for the cluster and nested methods
        #[arg(long)]
        category_field: Option<String>,

        /// Getis-Ord bin field for the hotspot method
        #[arg(long, default_value = "Gi_Bin")]
        hotspot_field: String,

        /// Unique feature id field
        #[arg(long, default_value = "UNISTR")]
        id_field: String,

        /// Output file (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Output format
        #[arg(long, value_enum, default_value = "csv")]
        format: OutputFormat,

        /// Most sweep samples per pass
        #[arg(long, default_value_t = DEFAULT_MAX_STEPS)]
        max_sweep_steps: u64,

        /// Abort the sweep after this many seconds
        #[arg(long)]
        timeout_secs: Option<u64>,

        /// Fail when the data yields no breaks
        #[arg(long)]
        strict: bool,
    },

    /// Print the suggested sweep interval for an attribute
    SuggestSweep {
        /// Input GeoJSON FeatureCollection of polygons
        input: PathBuf,

        /// Attribute field to inspect
        #[arg(short, long)]
        field: String,

        /// Unique feature id field
        #[arg(long, default_value = "UNISTR")]
        id_field: String,
    },
}

/// Install the tracing subscriber; `RUST_LOG` overrides the default `info`
pub fn init_logging(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr);
    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

fn load(input: &Path, options: &LoadOptions) -> Result<FeatureSet> {
    FeatureSet::from_geojson_path(input, options)
        .with_context(|| format!("Failed to load {}", input.display()))
}

/// Write breaks as CSV or the whole classification as JSON
pub fn write_classification<W: Write>(
    out: &mut W,
    result: &Classification,
    format: OutputFormat,
) -> Result<()> {
    match format {
        OutputFormat::Csv => {
            for b in &result.breaks {
                writeln!(out, "{b}")?;
            }
        }
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut *out, result)?;
            writeln!(out)?;
        }
    }
    out.flush()?;
    Ok(())
}

impl Cli {
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Breaks {
                input,
                field,
                classes,
                sweep,
                method,
                category_field,
                hotspot_field,
                id_field,
                output,
                format,
                max_sweep_steps,
                timeout_secs,
                strict,
            } => {
                let options = LoadOptions {
                    id_field,
                    value_field: field,
                    category_field,
                    hotspot_field: Some(hotspot_field),
                };
                eprintln!("📂 Loading {}", input.display());
                let features = load(&input, &options)?;
                eprintln!("  ✓ {} features", features.len());

                let range = features.value_range().map(|(lo, hi)| hi - lo).unwrap_or(0.0);
                let sweep = match sweep {
                    Some(s) => s,
                    None => {
                        let s = suggest_sweep(range);
                        eprintln!("  ✓ Suggested sweep interval {s}");
                        s
                    }
                };

                let mut config =
                    ClassifyConfig::new(classes, sweep, method).with_max_steps(max_sweep_steps);
                if let Some(secs) = timeout_secs {
                    config = config.with_timeout(Duration::from_secs(secs));
                }

                eprintln!("🧮 Classifying with {method}, {classes} classes, sweep {sweep}");
                let mut result = classify(&features, &config)
                    .with_context(|| format!("Classification of '{}' failed", options.value_field))?;

                let status = result.status;
                match status {
                    RunStatus::Complete => eprintln!("  ✓ {} breaks", result.breaks.len()),
                    RunStatus::Interpolated { natural, filled } => {
                        eprintln!(
                            "  ✓ {} breaks ({natural} natural, {filled} interpolated)",
                            result.breaks.len()
                        )
                    }
                    RunStatus::InsufficientData(shortfall) => {
                        if strict {
                            result = result.require_complete()?;
                        } else {
                            warn!(reason = shortfall.describe(), "no breaks produced");
                        }
                    }
                }
                eprintln!("  ✓ Done in {} ms", result.stats.elapsed_ms);

                match output {
                    Some(path) => {
                        let file = File::create(&path)
                            .with_context(|| format!("Failed to create {}", path.display()))?;
                        let mut writer = BufWriter::new(file);
                        write_classification(&mut writer, &result, format)?;
                        eprintln!("💾 Wrote {}", path.display());
                    }
                    None => {
                        let stdout = io::stdout();
                        let mut lock = stdout.lock();
                        write_classification(&mut lock, &result, format)?;
                    }
                }
                Ok(())
            }

            Commands::SuggestSweep {
                input,
                field,
                id_field,
            } => {
                let options = LoadOptions {
                    id_field,
                    value_field: field,
                    category_field: None,
                    hotspot_field: None,
                };
                let features = load(&input, &options)?;
                let Some((lo, hi)) = features.value_range() else {
                    bail!("Field '{}' has no numeric values", options.value_field);
                };
                let range = hi - lo;
                let sweep = suggest_sweep(range);
                if !sweep_is_reasonable(range, sweep) {
                    warn!(range, sweep, "value range too narrow for a fine sweep");
                }
                println!("{sweep}");
                Ok(())
            }
        }
    }
}
