use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use wardrobe_catalog::catalog::{self, BuildOptions};
use wardrobe_catalog::config::{self, CatalogConfig, OutputFormat};
use wardrobe_catalog::imaging::RustBackend;
use wardrobe_catalog::{artifact, output};

/// Flags for the build command.
#[derive(clap::Args, Clone)]
struct BuildArgs {
    /// Disable the image cache and re-encode every photo
    #[arg(long)]
    no_cache: bool,

    /// Ignore the previous catalog's values when an override has none
    #[arg(long)]
    no_prior_fallback: bool,

    /// Local JSON overrides file (replaces [overrides] json)
    #[arg(long)]
    overrides: Option<PathBuf>,

    /// Exported spreadsheet values grid (replaces [overrides] sheet)
    #[arg(long)]
    sheet: Option<PathBuf>,

    /// Output image format (replaces [output] format)
    #[arg(long, value_parser = parse_format)]
    format: Option<OutputFormat>,
}

fn parse_format(s: &str) -> Result<OutputFormat, String> {
    match s.to_ascii_lowercase().as_str() {
        "jpeg" | "jpg" => Ok(OutputFormat::Jpeg),
        "avif" => Ok(OutputFormat::Avif),
        other => Err(format!("unknown format '{other}' (expected jpeg or avif)")),
    }
}

fn version_string() -> &'static str {
    let on_tag = env!("ON_RELEASE_TAG");
    if on_tag == "true" {
        env!("CARGO_PKG_VERSION")
    } else {
        let hash = env!("GIT_HASH");
        if hash.is_empty() {
            "dev@unknown"
        } else {
            Box::leak(format!("dev@{hash}").into_boxed_str())
        }
    }
}

#[derive(Parser)]
#[command(name = "wardrobe-catalog")]
#[command(about = "Catalog generator for a photographed wardrobe")]
#[command(long_about = "\
Catalog generator for a photographed wardrobe

Each directory under the source root is a category; each photo in it is an
item. A build renders a thumbnail and a full view per photo and writes
wardrobe_data.json, the catalog a static viewer reads.

Source structure:

  photos/
  ├── catalog.toml          # Config (optional)
  ├── wardrobe_data.json    # Local overrides (optional)
  ├── Shirts/
  │   ├── IMG_7053.HEIC     # → id shirts-img-7053
  │   └── IMG_7055.jpg
  └── Shoes/
      └── boots.png

Output structure:

  site/
  ├── wardrobe_data.json
  └── images/
      ├── thumbs/<id>.jpg
      └── full/<id>.jpg

Metadata resolution (first non-empty wins):
  Title, category, notes:  override → previous catalog → filename/directory
  Tags:                    override tags, then previous tags (union)

Run 'wardrobe-catalog gen-config' to generate a documented catalog.toml.
Run 'wardrobe-catalog export-sheet' to seed a spreadsheet from the catalog.")]
#[command(version = version_string())]
struct Cli {
    /// Photo source directory
    #[arg(long, default_value = "photos", global = true)]
    source: PathBuf,

    /// Output directory
    #[arg(long, default_value = "site", global = true)]
    output: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Render images and write the catalog
    Build(BuildArgs),
    /// Scan photos and resolve ids without writing anything
    Check,
    /// Write the current catalog as a spreadsheet values grid
    ExportSheet {
        /// Destination file, `{"values": [[...], ...]}`
        #[arg(default_value = "sheet_values.json")]
        path: PathBuf,
    },
    /// Print a stock catalog.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "wardrobe_catalog=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Build(args) => {
            let settings = apply_build_args(config::load_config(&cli.source)?, &args)?;
            let mut options = BuildOptions::from_config(&settings);
            options.process.use_cache = !args.no_cache;

            let backend = RustBackend::new(settings.heic.command.clone());
            let chain = catalog::source_chain(&cli.source, &settings.overrides);

            println!("==> Building {} → {}", cli.source.display(), cli.output.display());
            let (tx, rx) = std::sync::mpsc::channel();
            let printer = std::thread::spawn(move || {
                for event in rx {
                    for line in output::format_process_event(&event) {
                        println!("{}", line);
                    }
                }
            });
            let result = catalog::generate(
                &backend,
                &cli.source,
                &cli.output,
                &chain,
                &options,
                Some(tx),
            );
            printer
                .join()
                .map_err(|_| "progress printer thread panicked")?;
            let (artifact, report) = result?;

            output::print_build_summary(&artifact, &report);
            println!(
                "==> Wrote {}",
                artifact::artifact_path(&cli.output).display()
            );
        }
        Command::Check => {
            let settings = config::load_config(&cli.source)?;
            println!("==> Checking {}", cli.source.display());
            let prior = artifact::read_prior(&artifact::artifact_path(&cli.output));
            let fetched = catalog::source_chain(&cli.source, &settings.overrides).fetch();
            let (planned, mut warnings) =
                catalog::check(&cli.source, &fetched.overrides, prior.as_ref())?;
            output::print_check_output(&planned);

            warnings.splice(0..0, fetched.warnings);
            for warning in &warnings {
                println!("warning: {}", warning);
            }
            println!("==> {} photos, ids are unique", planned.len());
        }
        Command::ExportSheet { path } => {
            let catalog_path = artifact::artifact_path(&cli.output);
            let Some(current) = artifact::read_prior(&catalog_path) else {
                return Err(format!(
                    "no readable catalog at {}; run 'wardrobe-catalog build' first",
                    catalog_path.display()
                )
                .into());
            };
            artifact::write_sheet_values(&current, &path)?;
            println!(
                "==> Wrote {} rows to {}",
                current.items.len(),
                path.display()
            );
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// Apply command-line replacements on top of the loaded config.
///
/// Paths given on the command line are relative to the working directory,
/// not the source root.
fn apply_build_args(mut config: CatalogConfig, args: &BuildArgs) -> std::io::Result<CatalogConfig> {
    if args.no_prior_fallback {
        config.merge.prior_fallback = false;
    }
    if let Some(path) = &args.overrides {
        config.overrides.json = Some(std::path::absolute(path)?);
    }
    if let Some(path) = &args.sheet {
        config.overrides.sheet = Some(std::path::absolute(path)?);
    }
    if let Some(format) = args.format {
        config.output.format = format;
    }
    Ok(config)
}

