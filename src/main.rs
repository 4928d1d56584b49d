use clap::{Parser, Subcommand};
use iiif_static::{config, index, output, pipeline};
use std::path::{Path, PathBuf};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "iiif-static")]
#[command(about = "Static IIIF Presentation 3.0 manifests from a headless CMS")]
#[command(long_about = "\
Static IIIF Presentation 3.0 manifests from a headless CMS

Fetches every published record of a CMS collection, writes one manifest per
record, and lists the output directory on a paginated index page.

Output structure:

  docs/
  ├── CNAME                        # Hosting control file (kept, never listed)
  ├── styles.css                   # Index stylesheet (kept, never listed)
  ├── index.html                   # Generated listing
  ├── bath-abbey.json              # One manifest per record, named after its image
  └── ...

Image URLs follow the IIIF Image API:
  Service:   <image_service.base_url>/<identifier>
  Full:      <service>/full/max/0/default.jpg
  Thumbnail: <service>/full/256,/0/default.jpg

Log verbosity follows RUST_LOG (default: iiif_static=info).

Run 'iiif-static gen-config' to generate a documented config.toml.")]
#[command(version)]
struct Cli {
    /// Configuration file (stock defaults when absent)
    #[arg(long, default_value = "config.toml", global = true)]
    config: PathBuf,

    /// Output directory (overrides output_dir from config)
    #[arg(long, global = true)]
    output: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Fetch CMS records and write one manifest per record
    Generate,
    /// Write index.html listing the output directory
    Index,
    /// Run both stages: generate → index
    Build,
    /// Print a stock config.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if let Command::GenConfig = cli.command {
        print!("{}", config::stock_config_toml());
        return Ok(());
    }

    init_logging();
    let config = config::load_config(&cli.config)?;
    let output_dir = cli
        .output
        .clone()
        .unwrap_or_else(|| PathBuf::from(&config.output_dir));

    match cli.command {
        Command::Generate => generate(&config, &output_dir)?,
        Command::Index => write_index(&config, &output_dir)?,
        Command::Build => {
            println!("==> Stage 1: Generating manifests → {}", output_dir.display());
            generate(&config, &output_dir)?;
            println!();
            println!("==> Stage 2: Writing index");
            write_index(&config, &output_dir)?;
            println!("==> Build complete: {}", output_dir.display());
        }
        Command::GenConfig => {}
    }

    Ok(())
}

/// Logs go to stderr so stdout carries only the reports.
fn init_logging() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "iiif_static=info".into()))
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn generate(config: &config::PipelineConfig, output_dir: &Path) -> Result<(), pipeline::PipelineError> {
    let report = pipeline::run(config, output_dir)?;
    output::print_run_report(&report);
    Ok(())
}

fn write_index(config: &config::PipelineConfig, output_dir: &Path) -> Result<(), index::IndexError> {
    let document = index::write_index(output_dir, config)?;
    output::print_index_report(&document, &output_dir.join(&config.index.output_file));
    Ok(())
}
