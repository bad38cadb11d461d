//! ldshape: bind RDF resources to nested shape trees
//!
//! Usage:
//!   ldshape bind shape.toml https://example.org/card   → resolve and print the tree
//!   ldshape bind shape.toml card.ttl --snapshot        → also print the bound triples
//!   ldshape bind shape.toml <url> --watch              → keep timers running, reprint on change
//!   ldshape check shape.toml                           → validate a shape document
//!   ldshape dump-config                                → print default engine settings

use clap::{Parser, Subcommand};
use ldshape::logging::init_tracing;
use ldshape::source::{bind_source, Source};
use ldshape_core::{EngineConfig, Shape, ShapeDocument};
use ldshape_engine::{Engine, MemorySurface, TreeNode};
use ldshape_fetch::HttpFetcher;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

#[derive(Parser)]
#[command(
    name = "ldshape",
    about = "Bind linked-data resources to nested shape trees",
    version = env!("CARGO_PKG_VERSION")
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Also write logs to a daily rolling file in this directory
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve a resource against a shape document and print the result
    Bind {
        /// Shape document (TOML)
        shape: PathBuf,
        /// http(s) URL or local RDF file
        source: String,
        /// Focus resource inside the document (default: the document itself)
        #[arg(short, long)]
        resource: Option<String>,
        /// Print the bound triples as N-Triples
        #[arg(long, default_value_t = false)]
        snapshot: bool,
        /// Print the bound tree as JSON
        #[arg(long, default_value_t = false)]
        json: bool,
        /// Keep refresh and inbox timers running until Ctrl-C
        #[arg(short, long, default_value_t = false)]
        watch: bool,
        /// Engine settings file (TOML), overrides the document's [engine] table
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Validate a shape document and print its compiled tree
    Check {
        /// Shape document (TOML)
        shape: PathBuf,
    },
    /// Print the default engine settings
    DumpConfig,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let _guard = init_tracing(cli.log_dir.as_deref());

    match cli.command {
        Commands::Bind {
            shape,
            source,
            resource,
            snapshot,
            json,
            watch,
            config,
        } => {
            let options = BindOptions {
                resource,
                snapshot,
                json,
                watch,
            };
            run_bind(&shape, &Source::parse(&source), config.as_deref(), options).await?;
        }
        Commands::Check { shape } => {
            let document = ShapeDocument::load(&shape)?;
            let compiled = document.compile()?;
            println!("{} is valid", shape.display());
            let mut out = String::new();
            describe(&compiled, 0, &mut out);
            print!("{out}");
        }
        Commands::DumpConfig => {
            print!("{}", EngineConfig::default().to_toml());
        }
    }

    Ok(())
}

struct BindOptions {
    resource: Option<String>,
    snapshot: bool,
    json: bool,
    watch: bool,
}

async fn run_bind(
    shape_path: &Path,
    source: &Source,
    config: Option<&Path>,
    options: BindOptions,
) -> anyhow::Result<()> {
    let mut document = ShapeDocument::load(shape_path)?;
    if let Some(path) = config {
        document.engine = EngineConfig::load(path);
    }
    let shape = Arc::new(document.compile()?);

    let fetcher = Arc::new(HttpFetcher::new(&document.engine.http)?);
    let surface = Arc::new(MemorySurface::new());
    let engine = Engine::new(fetcher, surface.clone(), document.engine.clone());

    info!(source = %source, shape = %shape_path.display(), "Binding");
    let root = bind_source(&engine, shape, source, options.resource.as_deref()).await?;

    print_tree(&surface, &root, &options)?;

    if options.watch {
        watch(&surface).await;
    }

    engine.shutdown();
    root.dispose();
    Ok(())
}

fn print_tree(surface: &MemorySurface, root: &TreeNode, options: &BindOptions) -> anyhow::Result<()> {
    print!("{}", surface.render());
    if options.snapshot {
        println!();
        print!("{}", root.snapshot());
    }
    if options.json {
        println!();
        println!("{}", serde_json::to_string_pretty(&surface.to_json())?);
    }
    Ok(())
}

/// Reprint the rendered tree whenever timers change it, until Ctrl-C.
async fn watch(surface: &MemorySurface) {
    info!("Watching for changes, Ctrl-C to stop");
    let mut last = surface.render();
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted, shutting down");
                break;
            }
            _ = tokio::time::sleep(Duration::from_secs(1)) => {
                let current = surface.render();
                if current != last {
                    println!("---");
                    print!("{current}");
                    last = current;
                }
            }
        }
    }
}

fn describe(shape: &Shape, depth: usize, out: &mut String) {
    let indent = "  ".repeat(depth);
    let head = match (&shape.path, &shape.target_class) {
        (Some(path), _) => path.to_string(),
        (None, Some(class)) => format!("container a {class}"),
        (None, None) => "container".to_string(),
    };

    let mut flags = Vec::new();
    if let Some(sort) = &shape.sort_path {
        flags.push(format!("sort {sort} {:?}", shape.sort_direction));
    }
    if let (Some(_), Some(class)) = (&shape.path, &shape.target_class) {
        flags.push(format!("class {class}"));
    }
    if let Some(bind) = &shape.bind {
        flags.push(format!("bind {bind}"));
    }
    if shape.singleton {
        flags.push("singleton".into());
    }
    if shape.hide_when_empty {
        flags.push("hide-empty".into());
    }
    if let Some(refresh) = shape.refresh {
        flags.push(format!("refresh {}s", refresh.as_secs()));
    }
    if let Some(inbox) = shape.inbox_target() {
        flags.push(format!("inbox {inbox}"));
    }

    out.push_str(&indent);
    out.push_str(&head);
    if !flags.is_empty() {
        out.push_str(" (");
        out.push_str(&flags.join(", "));
        out.push(')');
    }
    out.push('\n');
    for child in &shape.children {
        describe(child, depth + 1, out);
    }
}
