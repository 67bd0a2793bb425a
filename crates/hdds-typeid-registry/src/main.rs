// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! HDDS Type ID Registry CLI
//!
//! Inspect and maintain a node's local type ID store.
//!
//! # Usage
//!
//! ```bash
//! # List local bindings
//! hdds-typeid --work-dir work/marshaller list
//!
//! # Show one binding
//! hdds-typeid --config registry.toml get 42
//!
//! # Report torn or empty files, remove leftover temp files
//! hdds-typeid check --fix
//!
//! # Two-node walkthrough against an in-process cluster store
//! hdds-typeid --work-dir /tmp/typeid-demo demo
//! ```

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use hdds_typeid_registry::{LocalStore, MemoryClusterStore, RegistryConfig, TypeRegistry};
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// HDDS Type ID Registry tool
#[derive(Parser, Debug)]
#[command(name = "hdds-typeid")]
#[command(about = "HDDS Type ID Registry - inspect and maintain local type name bindings")]
#[command(version)]
struct Args {
    /// Configuration file path (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Local store directory (overrides the config file)
    #[arg(short, long)]
    work_dir: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List all local bindings
    List,

    /// Print the name bound to a type ID
    Get {
        /// Type ID
        type_id: u32,
    },

    /// Check the local store for empty, malformed and temp files
    Check {
        /// Remove leftover temp files
        #[arg(long)]
        fix: bool,
    },

    /// Generate an example configuration file
    GenConfig {
        /// Output file path
        #[arg(short, long, default_value = "registry.toml")]
        output: PathBuf,
    },

    /// Run a two-node scenario against an in-process cluster store
    Demo,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let filter = EnvFilter::try_new(&args.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let config = load_config(&args)?;

    match args.command {
        Commands::List => cmd_list(&config),
        Commands::Get { type_id } => cmd_get(&config, type_id),
        Commands::Check { fix } => cmd_check(&config, fix),
        Commands::GenConfig { output } => cmd_gen_config(&config, output),
        Commands::Demo => cmd_demo(&config),
    }
}

fn load_config(args: &Args) -> Result<RegistryConfig> {
    let mut config = match &args.config {
        Some(path) => RegistryConfig::from_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => RegistryConfig::default(),
    };

    if let Some(dir) = &args.work_dir {
        config.work_dir = dir.clone();
    }

    config.validate()?;
    Ok(config)
}

fn open_store(config: &RegistryConfig) -> Result<LocalStore> {
    // Inspection must not mutate the store.
    let mut config = config.clone();
    config.cleanup_temp_on_open = false;
    LocalStore::open(&config).with_context(|| format!("opening {}", config.work_dir.display()))
}

fn cmd_list(config: &RegistryConfig) -> Result<()> {
    let store = open_store(config)?;
    let entries = store.entries()?;

    println!("{} binding(s) in {}:", entries.len(), store.directory().display());
    for (type_id, name) in &entries {
        println!("  {:>10}  {}", type_id, name);
    }
    Ok(())
}

fn cmd_get(config: &RegistryConfig, type_id: u32) -> Result<()> {
    let store = open_store(config)?;
    match store.read(type_id)? {
        Some(name) => {
            println!("{}", name);
            Ok(())
        }
        None => bail!(
            "type ID {} not found in {}",
            type_id,
            store.directory().display()
        ),
    }
}

fn cmd_check(config: &RegistryConfig, fix: bool) -> Result<()> {
    let store = open_store(config)?;
    let scan = store.scan()?;

    println!("Bindings:   {}", scan.bindings.len());
    println!("Empty:      {}", scan.empty.len());
    for path in &scan.empty {
        println!("  {}", path.display());
    }
    println!("Malformed:  {}", scan.malformed.len());
    for path in &scan.malformed {
        println!("  {}", path.display());
    }
    println!("Temp files: {}", scan.temp_files.len());
    for path in &scan.temp_files {
        println!("  {}", path.display());
    }

    if fix && !scan.temp_files.is_empty() {
        let removed = store.cleanup_temp_files()?;
        println!("Removed {} temp file(s).", removed);
    }

    if !scan.empty.is_empty() || !scan.malformed.is_empty() {
        tracing::warn!("Unreadable bindings fall back to the distributed store on resolve");
    }
    Ok(())
}

fn cmd_gen_config(config: &RegistryConfig, output: PathBuf) -> Result<()> {
    let header = "# HDDS Type ID Registry configuration\n\n";
    std::fs::write(&output, format!("{}{}", header, config.to_toml()?))
        .with_context(|| format!("writing {}", output.display()))?;
    println!("Configuration written to {}", output.display());
    Ok(())
}

fn cmd_demo(config: &RegistryConfig) -> Result<()> {
    let node_config = |node: &str| {
        let mut c = config.clone();
        c.work_dir = config.work_dir.join(node);
        c
    };

    let cluster = Arc::new(MemoryClusterStore::new());

    let node_a: TypeRegistry<MemoryClusterStore> = TypeRegistry::new(node_config("node-a"))?;
    node_a.start(Arc::clone(&cluster));
    tracing::info!("node-a started");

    let registered = node_a.register(42, "com.acme.Order")?;
    println!("node-a register(42, com.acme.Order) -> {}", registered);

    // node-b resolves before its store handle is installed.
    let node_b: Arc<TypeRegistry<MemoryClusterStore>> =
        Arc::new(TypeRegistry::new(node_config("node-b"))?);
    node_b.on_store_started(&cluster);
    let reader = {
        let node_b = Arc::clone(&node_b);
        thread::spawn(move || node_b.resolve(42))
    };
    thread::sleep(Duration::from_millis(50));
    tracing::info!("node-b installing store handle");
    node_b.on_store_ready(Arc::clone(&cluster));

    let name = reader
        .join()
        .map_err(|_| anyhow::anyhow!("resolver thread panicked"))??;
    println!("node-b resolve(42) -> {}", name);

    let collision = node_b.register(42, "com.acme.Invoice");
    println!("node-b register(42, com.acme.Invoice) -> {:?}", collision);

    tracing::info!("Simulating cluster-wide cache reset");
    cluster.clear();
    // node-b joined after 42 was inserted, so only node-a has it on disk.
    let lost = node_b.resolve(42);
    println!("node-b resolve(42) after reset -> {:?}", lost);

    let healed = node_a.resolve(42)?;
    println!(
        "node-a resolve(42) after reset -> {} (cluster has it again: {})",
        healed,
        cluster_has(&cluster, 42)
    );
    println!("node-b resolve(42) after re-seed -> {}", node_b.resolve(42)?);
    println!(
        "node-b local store now holds: {:?}",
        node_b.local_store().read(42)?
    );

    println!("node-a stats: {:?}", node_a.stats());
    println!("node-b stats: {:?}", node_b.stats());
    Ok(())
}

fn cluster_has(cluster: &MemoryClusterStore, type_id: u32) -> bool {
    use hdds_typeid_registry::DistributedStore;
    cluster.get(type_id).is_some()
}
