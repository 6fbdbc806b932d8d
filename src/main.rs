use std::fs::File;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::Parser;
use log::{error, info};
use simplelog::{Config, LevelFilter, WriteLogger};

use pdfcanvas::panic_handler::initialize_panic_handler;
use pdfcanvas::pdf::DocumentFetcher;
use pdfcanvas::settings::{FailurePolicy, MissingElementPolicy};
use pdfcanvas::{HostPage, Settings, Viewer};

/// Render the first page of the PDF referenced by a page's viewer canvas
#[derive(Parser, Debug)]
#[command(version, about)]
struct Cli {
    /// Host HTML page, as a path or URL
    page: String,

    /// Where to write the rendered canvas
    #[arg(short, long, default_value = "page-1.png")]
    output: PathBuf,

    /// Id of the viewer canvas element
    #[arg(long)]
    element_id: Option<String>,

    /// Scale applied to the page's native size
    #[arg(long)]
    scale: Option<f32>,

    /// Fail when the viewer element is missing or rendering fails
    #[arg(long)]
    strict: bool,

    /// Settings file (defaults to the per-user config file)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Write the effective settings to this file and exit
    #[arg(long, value_name = "PATH")]
    save_config: Option<PathBuf>,

    #[arg(long, default_value = "pdfcanvas.log")]
    log_file: PathBuf,

    #[arg(long, default_value_t = LevelFilter::Info)]
    log_level: LevelFilter,
}

fn effective_settings(cli: &Cli) -> Result<Settings> {
    let mut settings =
        Settings::load_or_default(cli.config.as_deref()).context("Failed to load settings")?;
    if let Some(id) = &cli.element_id {
        settings.element_id = id.clone();
    }
    if let Some(scale) = cli.scale {
        settings.scale = scale;
    }
    if cli.strict {
        settings.on_missing_element = MissingElementPolicy::Error;
        settings.on_failure = FailurePolicy::Propagate;
    }
    settings.validate()?;
    Ok(settings)
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    initialize_panic_handler();

    WriteLogger::init(
        cli.log_level,
        Config::default(),
        File::create(&cli.log_file)
            .with_context(|| format!("Failed to create log file {:?}", cli.log_file))?,
    )?;
    info!("Starting pdfcanvas for {}", cli.page);

    let settings = effective_settings(&cli)?;
    if let Some(path) = &cli.save_config {
        settings.save(path)?;
        println!("Saved settings to {}", path.display());
        return Ok(());
    }

    let fetcher = Arc::new(DocumentFetcher::new(&settings.user_agent)?);
    let mut page = HostPage::load(&cli.page, fetcher.as_ref())
        .with_context(|| format!("Failed to load host page {}", cli.page))?;

    let viewer = Viewer::from_settings(&settings, fetcher);
    let outcome = match viewer.on_content_loaded(&mut page) {
        Ok(outcome) => outcome,
        Err(e) => {
            error!("Render failed: {e}");
            bail!("Render failed: {e}");
        }
    };

    let Some(outcome) = outcome else {
        println!("Nothing rendered for #{}", settings.element_id);
        info!("Shutting down pdfcanvas");
        return Ok(());
    };

    let canvas = page
        .element_by_id(&settings.element_id)
        .and_then(|el| el.canvas())
        .context("Viewer canvas vanished after rendering")?;
    canvas
        .save_png(&cli.output)
        .with_context(|| format!("Failed to write {:?}", cli.output))?;

    let (width, height) = outcome.surface_size;
    let title = outcome.document.title.as_deref().unwrap_or("untitled");
    println!(
        "Rendered page 1 of {} ({title}, {} pages) at {width}x{height} to {}",
        outcome.url,
        outcome.document.page_count,
        cli.output.display()
    );
    info!("Shutting down pdfcanvas");
    Ok(())
}
