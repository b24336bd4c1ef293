use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use log::{info, LevelFilter};
use radar_report::{sample, ChartFormat, Config, ReportError, ReportPipeline};
use serde_json::Value;

/// Renders radar charts and report documents from aptitude result records.
///
/// Logging defaults to `info` and follows `RUST_LOG` when set. Raster output
/// needs fonts under `assets/fonts` or the directory named by
/// `RADAR_REPORT_FONTS_DIR`.
#[derive(Parser)]
#[command(author, version, about = "Radar chart and report generator")]
struct Cli {
    /// TOML configuration file; built-in defaults are used when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render the radar chart of a record and write each encoding to disk.
    Chart {
        #[arg(long)]
        input: PathBuf,

        /// Encodings to produce (svg, png, webp); repeatable.
        #[arg(long = "format")]
        formats: Vec<ChartFormat>,

        /// Directory for the chart files; overrides `images_dir`.
        #[arg(long)]
        out_dir: Option<PathBuf>,
    },

    /// Write the record enriched with the chart field as JSON.
    Prepare {
        #[arg(long)]
        input: PathBuf,

        #[arg(long)]
        output: PathBuf,
    },

    /// Enrich a record and render it with the external renderer.
    Render {
        #[arg(long)]
        input: PathBuf,

        #[arg(long)]
        output: PathBuf,

        /// Renderer time limit in seconds; overrides `renderer.timeout_secs`.
        #[arg(long)]
        timeout: Option<u64>,
    },

    /// Render the bundled sample record.
    Sample {
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

fn main() {
    pretty_env_logger::formatted_builder()
        .filter_level(LevelFilter::Info)
        .parse_default_env()
        .init();

    let cli = Cli::parse();

    if let Err(err) = run(cli) {
        eprintln!("Error: {}", err);
        print_error_sources(err.as_ref());
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    let mut config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };

    match cli.command {
        Commands::Chart {
            input,
            formats,
            out_dir,
        } => {
            if let Some(dir) = out_dir {
                config.images_dir = dir;
            }
            if !formats.is_empty() {
                config.formats = formats;
            }
            let pipeline = ReportPipeline::new(&config)?;
            write_chart_files(&pipeline, &read_record(&input)?)?;
        }
        Commands::Prepare { input, output } => {
            let pipeline = ReportPipeline::new(&config)?;
            let prepared = pipeline.prepare(read_record(&input)?)?;
            let text = serde_json::to_string_pretty(&prepared)?;
            fs::write(&output, text).map_err(|source| ReportError::Resource {
                path: output.clone(),
                source,
            })?;
            info!("Prepared record written to {}", output.display());
        }
        Commands::Render {
            input,
            output,
            timeout,
        } => {
            if let Some(secs) = timeout {
                config.renderer.timeout_secs = secs;
            }
            let pipeline = ReportPipeline::new(&config)?;
            info!(
                "Rendering with `{}` (timeout {:?})",
                pipeline.invoker().program(),
                pipeline.invoker().timeout()
            );
            pipeline.generate_document(read_record(&input)?, &output)?;
        }
        Commands::Sample { output } => {
            let pipeline = ReportPipeline::new(&config)?;
            let output = output.unwrap_or_else(|| pipeline.default_output_path());
            pipeline.generate_document(sample::sample_record()?, &output)?;
        }
    }

    Ok(())
}

/// Writes every exported encoding that was not already persisted by the exporter.
fn write_chart_files(pipeline: &ReportPipeline, record: &Value) -> Result<(), Box<dyn Error>> {
    let assembler = pipeline.assembler();
    let series = assembler.extract_series(record)?;
    let chart = assembler.chart().generate(&series, assembler.formats())?;

    for payload in chart.payloads() {
        let path = match &payload.file {
            Some(path) => path.clone(),
            None => {
                let path = assembler
                    .images_dir()
                    .join(format!("radar_chart.{}", payload.format));
                fs::write(&path, payload.decode()?).map_err(|source| ReportError::Resource {
                    path: path.clone(),
                    source,
                })?;
                path
            }
        };
        println!("{}", path.display());
    }
    Ok(())
}

fn read_record(path: &Path) -> Result<Value, ReportError> {
    let text = fs::read_to_string(path).map_err(|source| ReportError::Resource {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(serde_json::from_str(&text)?)
}

fn print_error_sources(mut error: &(dyn Error + 'static)) {
    while let Some(source) = error.source() {
        eprintln!("  caused by: {}", source);
        error = source;
    }
}
