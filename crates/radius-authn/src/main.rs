use clap::Parser;
use radius_authn::{AuditLogger, Dictionary, RadiusConfig};
use std::path::Path;
use std::process;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Validate a RADIUS login configuration and print its summary
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(name = "radius-authn")]
struct Cli {
    /// Path to configuration file
    #[arg(value_name = "CONFIG", default_value = "radius-authn.json")]
    config_path: String,

    /// Write an example configuration with the documented defaults and exit
    #[arg(long)]
    init: bool,

    /// Overwrite an existing file with --init
    #[arg(long, requires = "init")]
    force: bool,
}

fn init_tracing(level: &str) {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn write_example(path: &str) {
    info!("Creating example configuration at: {}", path);
    if let Err(e) = RadiusConfig::example().to_file(path) {
        error!("Error creating example config: {}", e);
        process::exit(1);
    }
    info!("Please edit {} and set the RADIUS server and shared secret", path);
}

fn main() {
    let cli = Cli::parse();

    if cli.init {
        init_tracing("info");
        if Path::new(&cli.config_path).exists() && !cli.force {
            error!("{} already exists (use --force to overwrite)", cli.config_path);
            process::exit(1);
        }
        write_example(&cli.config_path);
        process::exit(0);
    }

    if !Path::new(&cli.config_path).exists() {
        init_tracing("info");
        warn!("Config file {} not found", cli.config_path);
        write_example(&cli.config_path);
        process::exit(0);
    }

    let config = match RadiusConfig::from_file(&cli.config_path) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("❌ Configuration validation failed!");
            eprintln!("   Error: {}", e);
            process::exit(1);
        }
    };

    init_tracing(config.log_level.as_deref().unwrap_or("info"));

    let mut problems = Vec::new();
    if let Some(ref path) = config.dictionary_path
        && let Err(e) = Dictionary::load(path)
    {
        problems.push(e.to_string());
    }
    if let Some(ref path) = config.audit_log_path
        && let Err(e) = AuditLogger::new(Some(path.clone()))
    {
        problems.push(format!("Cannot open audit log {}: {}", path, e));
    }

    if !problems.is_empty() {
        eprintln!("❌ Configuration validation failed!");
        for problem in &problems {
            eprintln!("   Error: {}", problem);
        }
        process::exit(1);
    }

    println!("✓ Configuration validated successfully!");
    println!();
    println!("Configuration summary:");
    println!("  RADIUS server: {}", config.server_address());
    println!("  Shared secret: ********");
    println!("  Timeout: {}s, retries: {}", config.timeout, config.retries);
    println!("  Worst-case wait: {}s", config.worst_case_wait().as_secs());
    println!("  UID field: {}", config.uid_field);
    println!("  Login field: {}", config.primary_key());
    println!(
        "  Case-insensitive fields: {}",
        if config.case_insensitive_keys.is_empty() {
            "(none)".to_string()
        } else {
            config.case_insensitive_keys.join(", ")
        }
    );
    println!("  Timeout counts as failure: {}", config.handle_timeout_as_failure);
    if let Some(ref path) = config.dictionary_path {
        println!("  Dictionary: {}", path.display());
    }
    if let Some(ref path) = config.audit_log_path {
        println!("  Audit log: {}", path);
    }
}
