use std::{
    fs::{self, File},
    io::{self, BufWriter, Write},
    path::{Path, PathBuf},
    time::{Duration, Instant},
};

use anyhow::{Context, Result};
use clap::Args;
use gisview_core::{
    input::InputFile,
    registry::LayerRegistry,
    settings::{file::FileSettingsStore, load_settings, SettingsUpdate},
    surface::{GeoJsonSurface, RenderSync},
    util::bounds::bounds,
    worker::IngestWorker,
};
use humantime::format_duration;
use itertools::Itertools;
use tracing::info;

use super::upload_error::{format_failures, UploadError};

/// Load shape files or GeoJSON files and write them as styled layers
#[derive(Args, Debug)]
pub struct ImportArgs {
    /// Files to load. Shape file components are grouped by base name.
    #[arg(name = "FILE", required = true)]
    pub(super) files: Vec<PathBuf>,

    /// Write the layers to this file instead of stdout
    #[arg(long, short)]
    pub(super) output: Option<PathBuf>,

    /// Print a table of the loaded layers instead of the layer document
    #[arg(long, short)]
    pub(super) list: bool,

    /// Override the simplification tolerance for this run
    #[arg(long, value_parser = parse_tolerance)]
    pub(super) tolerance: Option<f64>,

    /// Override the number of features above which layers are simplified
    #[arg(long)]
    pub(super) max_features: Option<usize>,
}

fn parse_tolerance(s: &str) -> Result<f64, String> {
    SettingsUpdate::parse("simplifyTolerance", s)
        .map(|u| u.simplify_tolerance.unwrap_or_default())
        .map_err(|e| e.to_string())
}

fn read_file(path: &Path) -> Result<InputFile> {
    let name = path
        .file_name()
        .with_context(|| format!("Not a file: `{}'", path.display()))?
        .to_string_lossy()
        .into_owned();
    let bytes = fs::read(path).with_context(|| format!("Unable to read `{}'", path.display()))?;
    Ok(InputFile::new(name, bytes))
}

fn print_layers(registry: &LayerRegistry) {
    for l in registry.list() {
        let b = bounds(&l.collection)
            .map(|r| {
                format!(
                    "[{:.5}, {:.5}, {:.5}, {:.5}]",
                    r.min().x,
                    r.min().y,
                    r.max().x,
                    r.max().y
                )
            })
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{}\t{}\t{} features\t{}\t{}\t{}",
            l.id,
            l.name,
            l.collection.feature_count,
            l.color,
            b,
            l.collection.fields.iter().join(", ")
        );
    }
}

/// Run the `import` command
pub fn run_import(args: ImportArgs, settings_dir: &Path) -> Result<()> {
    let store = FileSettingsStore::new(settings_dir);
    let settings = SettingsUpdate {
        simplify_tolerance: args.tolerance,
        max_features_without_simplify: args.max_features,
        ..Default::default()
    }
    .apply(&load_settings(&store));

    let files = args
        .files
        .iter()
        .map(|p| read_file(p))
        .collect::<Result<Vec<_>>>()?;

    let start = Instant::now();

    // decode in the background
    let worker = IngestWorker::spawn();
    let handle = worker.submit(files)?;
    let mut registry = LayerRegistry::new();
    let summary = handle.wait(&mut registry);
    worker.shutdown()?;

    eprint!("{}", format_failures(&summary));
    if !summary.is_success() {
        return Err(UploadError::from(&summary).into());
    }

    let features: usize = registry
        .list()
        .iter()
        .map(|l| l.collection.feature_count)
        .sum();
    eprintln!(
        "{} ({} features in {})",
        summary.message(),
        features,
        format_duration(Duration::from_millis(start.elapsed().as_millis() as u64))
    );

    let mut surface = GeoJsonSurface::new();
    RenderSync::new().sync(&mut registry, &settings, &mut surface);

    if args.list {
        print_layers(&registry);
        if args.output.is_none() {
            return Ok(());
        }
    }

    match &args.output {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Unable to create `{}'", path.display()))?;
            let mut writer = BufWriter::new(file);
            surface.write_to(&mut writer)?;
            writer.flush()?;
            info!("Layers written to `{}'", path.display());
        }
        None => {
            let mut writer = BufWriter::new(io::stdout().lock());
            surface.write_to(&mut writer)?;
            writeln!(writer)?;
            writer.flush()?;
        }
    }

    Ok(())
}
