use std::fs;
use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use foundation::Crs;
use formats::Resolution;
use layers::{JsonRenderer, RenderAdapter};
use serde::Serialize;
use tools::{ConfigOverrides, project_point, region_catalog, region_dir_from_env, run};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "atlas")]
#[command(about = "Locality maps over reference country outlines")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full pipeline and write the figure as JSON
    Figure {
        /// CSV with lon, lat, label and a category column
        #[arg(long)]
        localities: Option<PathBuf>,

        /// Category column name (default: first non lon/lat/label column)
        #[arg(long)]
        category_column: Option<String>,

        /// Field delimiter of the locality file
        #[arg(long)]
        delimiter: Option<char>,

        /// `world`, a continent name, or `country:<name>`
        #[arg(long)]
        region: Option<String>,

        /// small (110m), medium (50m) or large (10m)
        #[arg(long)]
        resolution: Option<String>,

        /// Directory holding Natural Earth ne_<scale>_admin_0_countries.geojson files
        #[arg(long)]
        region_dir: Option<PathBuf>,

        /// EPSG code or +proj string
        #[arg(long)]
        target_crs: Option<String>,

        /// xmin,ymin,xmax,ymax in degrees
        #[arg(long, allow_hyphen_values = true)]
        viewport: Option<String>,

        /// Number of random points drawn over the region
        #[arg(long)]
        samples: Option<usize>,

        #[arg(long)]
        seed: Option<u64>,

        /// tableau10, category10, set1 or dark2
        #[arg(long)]
        palette: Option<String>,

        /// Output file path (stdout when omitted)
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Project one longitude/latitude pair
    Project {
        #[arg(long, default_value = "EPSG:3035")]
        crs: String,

        #[arg(allow_hyphen_values = true)]
        lon: f64,

        #[arg(allow_hyphen_values = true)]
        lat: f64,
    },

    /// List the countries of a region source, grouped by continent
    Regions {
        #[arg(long, default_value = "small")]
        resolution: String,

        #[arg(long)]
        region_dir: Option<PathBuf>,
    },
}

#[derive(Serialize)]
struct ProjectedPoint<'a> {
    crs: &'a str,
    x: f64,
    y: f64,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = real_main() {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}

fn real_main() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Figure {
            localities,
            category_column,
            delimiter,
            region,
            resolution,
            region_dir,
            target_crs,
            viewport,
            samples,
            seed,
            palette,
            output,
        } => {
            let flags = ConfigOverrides {
                target_crs,
                viewport,
                sample_count: samples,
                random_seed: seed,
                region,
                resolution,
                region_dir,
                localities,
                category_column,
                delimiter,
                palette,
            };
            cmd_figure(flags, output)
        }
        Commands::Project { crs, lon, lat } => cmd_project(&crs, lon, lat),
        Commands::Regions {
            resolution,
            region_dir,
        } => cmd_regions(&resolution, region_dir),
    }
}

fn cmd_figure(flags: ConfigOverrides, output: Option<PathBuf>) -> Result<()> {
    let config = ConfigOverrides::from_env()?
        .merge(flags)
        .resolve()
        .context("invalid configuration")?;

    if let Some(path) = &config.localities {
        let bytes = fs::read(path).with_context(|| format!("read {}", path.display()))?;
        info!(path = %path.display(), blake3 = %blake3::hash(&bytes).to_hex(), "locality input");
    }

    let result = run(&config)?;
    let rendered = JsonRenderer::default().render(&result.figure)?;

    match output {
        Some(path) => {
            let file = fs::File::create(&path).with_context(|| format!("create {}", path.display()))?;
            let mut writer = HashingWriter::new(file);
            writer.write_all(&rendered.body)?;
            writer.flush()?;
            eprintln!("wrote {} (blake3={})", path.display(), writer.finalize_hex());
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(&rendered.body)?;
            writeln!(stdout)?;
        }
    }
    Ok(())
}

fn cmd_project(crs: &str, lon: f64, lat: f64) -> Result<()> {
    let crs = Crs::parse(crs)?;
    let p = project_point(&crs, lon, lat)?;
    let out = ProjectedPoint {
        crs: crs.id(),
        x: p.x,
        y: p.y,
    };
    println!("{}", serde_json::to_string(&out)?);
    Ok(())
}

fn cmd_regions(resolution: &str, region_dir: Option<PathBuf>) -> Result<()> {
    let resolution: Resolution = resolution.parse()?;
    let region_dir = region_dir.or_else(region_dir_from_env);
    let groups = region_catalog(region_dir.as_deref(), resolution)?;

    let mut stdout = std::io::stdout().lock();
    for (continent, names) in groups {
        let heading = if continent.is_empty() {
            "(no continent)"
        } else {
            continent.as_str()
        };
        writeln!(stdout, "{heading} ({})", names.len())?;
        for name in names {
            writeln!(stdout, "  {name}")?;
        }
    }
    Ok(())
}

struct HashingWriter<W> {
    inner: W,
    hasher: blake3::Hasher,
}

impl<W> HashingWriter<W> {
    fn new(inner: W) -> Self {
        Self {
            inner,
            hasher: blake3::Hasher::new(),
        }
    }

    fn finalize_hex(&self) -> String {
        self.hasher.finalize().to_hex().to_string()
    }
}

impl<W: Write> Write for HashingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let n = self.inner.write(buf)?;
        if n > 0 {
            self.hasher.update(&buf[..n]);
        }
        Ok(n)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.inner.flush()
    }
}
