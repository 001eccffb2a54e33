//! Load a data directory and report what it contains. Exits non-zero when
//! the directory cannot be opened or loaded, so it doubles as a CI check for
//! configuration trees.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use atlas_datadir::{FileServiceLoader, ResourceTree, ServerLoaderBuilder, ServiceLoader};

#[derive(Parser, Debug)]
#[command(name = "datadir-check", about = "Validate and summarize a data directory")]
struct Args {
    /// Root of the data directory to load.
    #[arg(long, env = "ATLAS_DATA_DIR")]
    data_dir: PathBuf,

    /// Service types to look for, repeatable.
    #[arg(long = "service", default_values_t = ["wms".to_string(), "wfs".to_string(), "wcs".to_string()])]
    services: Vec<String>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let args = Args::parse();
    let tree = ResourceTree::open(&args.data_dir)
        .with_context(|| format!("cannot open data directory {}", args.data_dir.display()))?;

    let codec = Arc::new(std::sync::Mutex::new(atlas_datadir::Codec::new()));
    let mut builder = ServerLoaderBuilder::new(tree);
    for service in &args.services {
        let loader: Arc<dyn ServiceLoader> =
            Arc::new(FileServiceLoader::new(service.clone(), codec.clone()));
        builder = builder.service_loader(loader);
    }

    let server = builder.build();
    server.load().context("load failed")?;

    let stats = server.catalog().stats();
    println!("workspaces:   {}", stats.workspaces);
    println!("namespaces:   {}", stats.namespaces);
    println!("stores:       {}", stats.stores);
    println!("resources:    {}", stats.resources);
    println!("layers:       {}", stats.layers);
    println!("styles:       {}", stats.styles);
    println!("layer groups: {}", stats.layer_groups);
    println!("services:     {}", server.config().services().len());
    if let Some(ws) = server.catalog().default_workspace() {
        println!("default workspace: {}", ws.name);
    }
    Ok(())
}
