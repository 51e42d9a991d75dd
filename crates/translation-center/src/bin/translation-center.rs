use std::{path::PathBuf, process};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use translation_center::{
    Layout, Seeder, ServiceConfig,
    daemon::{
        logging,
        serve::{self, ServeArgs},
    },
    default_root,
};

#[derive(Parser, Debug)]
#[command(name = "translation-center", version, about = "Tagged translation catalog service")]
struct Cli {
    /// Override the workspace root directory.
    #[arg(long, global = true, value_name = "DIR")]
    root: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create the workspace layout and a default service.toml.
    Init,

    /// Run the HTTP API until Ctrl+C.
    Serve(ServeArgs),

    /// Fill the catalog with generated tags and translations.
    ///
    /// Stop `serve` first: the catalog files belong to one process at a time,
    /// and a running server would overwrite what this writes. Use
    /// `POST /api/seeder/seed` against a live server instead.
    Seed(SeedArgs),

    /// Print every translation grouped by locale as JSON.
    Export,

    /// Inspect tags.
    Tags {
        #[command(subcommand)]
        command: TagsCommand,
    },
}

#[derive(Args, Debug)]
struct SeedArgs {
    /// Number of translations to generate (overrides [seed] translation_count).
    #[arg(long, value_name = "N")]
    count: Option<u32>,
}

#[derive(Subcommand, Debug)]
enum TagsCommand {
    /// List all tags.
    List,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(err) = run(cli).await {
        eprintln!("error: {err:#}");
        process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let layout = resolve_layout(cli.root)?;
    match cli.command {
        Command::Serve(args) => serve::run(layout, args).await,
        Command::Init => handle_init(&layout),
        Command::Seed(args) => {
            logging::init_cli_tracing();
            handle_seed(&layout, args)
        }
        Command::Export => {
            logging::init_cli_tracing();
            handle_export(&layout)
        }
        Command::Tags { command: TagsCommand::List } => {
            logging::init_cli_tracing();
            handle_tags_list(&layout)
        }
    }
}

fn resolve_layout(root_override: Option<PathBuf>) -> Result<Layout> {
    let root = match root_override {
        Some(path) => expand_tilde(path)?,
        None => default_root()?,
    };
    Ok(Layout::new(root))
}

fn expand_tilde(path: PathBuf) -> Result<PathBuf> {
    if let Some(stripped) = path.to_str().and_then(|value| value.strip_prefix('~')) {
        let home = std::env::var_os("HOME")
            .filter(|home| !home.is_empty())
            .map(PathBuf::from)
            .context("cannot expand '~', HOME unset")?;
        let stripped = stripped.strip_prefix('/').unwrap_or(stripped);
        return Ok(if stripped.is_empty() { home } else { home.join(stripped) });
    }
    Ok(path)
}

fn handle_init(layout: &Layout) -> Result<()> {
    layout.ensure()?;
    let config_path = layout.service_config_path();
    if config_path.exists() {
        println!("Workspace already initialized at {}", layout.root().display());
        return Ok(());
    }
    ServiceConfig::default().save(&config_path)?;
    println!("Initialized workspace at {}", layout.root().display());
    println!("Service config written to {}", config_path.display());
    Ok(())
}

fn load_config(layout: &Layout) -> Result<ServiceConfig> {
    ServiceConfig::load_or_default(layout.service_config_path())
}

fn handle_seed(layout: &Layout, args: SeedArgs) -> Result<()> {
    layout.ensure()?;
    let config = load_config(layout)?;
    let mut seed = config.seed;
    if let Some(count) = args.count {
        seed.translation_count = count;
    }

    let catalog = serve::open_catalog(layout, &config)?;
    let report = Seeder::new(catalog.clone()).run(seed)?;
    catalog.store().compact()?;
    if report.skipped {
        println!("Catalog already holds {} or more translations; nothing to do", seed.translation_count);
    } else {
        println!(
            "Seeded {} tags and {} translations",
            report.tags_created, report.translations_created
        );
    }
    Ok(())
}

fn handle_export(layout: &Layout) -> Result<()> {
    let config = load_config(layout)?;
    let catalog = serve::open_catalog(layout, &config)?;
    let export = catalog.export().export_all();
    let rendered = serde_json::to_string_pretty(&export).context("failed to render export")?;
    println!("{rendered}");
    Ok(())
}

fn handle_tags_list(layout: &Layout) -> Result<()> {
    let config = load_config(layout)?;
    let catalog = serve::open_catalog(layout, &config)?;
    let tags = catalog.tags().all_tags();
    if tags.is_empty() {
        println!("No tags defined");
        return Ok(());
    }
    for tag in tags {
        println!("{}\t{}", tag.id, tag.name);
    }
    Ok(())
}
