use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use tracing::{error, info};

use zfsbeat::config::{LogFormat, LoggingConfig};
use zfsbeat::error::EXIT_CONFIG;
use zfsbeat::{
    init_logging, BeatCollector, BeatController, LogOverrides, LogPublisher, LogSink, ZfsbeatConfig,
};

#[derive(Parser, Debug)]
#[command(name = "zfsbeat")]
#[command(about = "Lightweight shipper that periodically collects ZFS pool and dataset state")]
#[command(version)]
#[command(long_about = "zfsbeat runs as a long-lived collector: it validates its configuration, \
initializes the collector, logs '<name> is running' once ready and shuts down gracefully on \
SIGTERM or SIGINT.")]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "zfsbeat.toml", help = "Path to TOML configuration file")]
    config: String,

    /// Enable debug logging (most verbose)
    #[arg(short, long, help = "Enable debug level logging")]
    debug: bool,

    /// Enable quiet mode (errors only)
    #[arg(short, long, help = "Enable quiet mode - only log errors")]
    quiet: bool,

    /// Validate configuration and exit
    #[arg(long, help = "Validate configuration file and exit without starting the beat")]
    validate_config: bool,

    /// Print default configuration and exit
    #[arg(long, help = "Print an example configuration in TOML format and exit")]
    print_config: bool,

    /// Override log format (json, pretty, compact)
    #[arg(long, value_name = "FORMAT", help = "Log output format: json, pretty, or compact")]
    log_format: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if args.print_config {
        print_default_config()?;
        return Ok(());
    }

    let config = match ZfsbeatConfig::load_from_file(&args.config) {
        Ok(config) => config,
        Err(e) => {
            // The [logging] section never loaded, so report through a default console subscriber
            let message = format!("Failed to load configuration from {}: {}", args.config, e);
            match init_logging(&LoggingConfig::default(), &overrides(&args)) {
                Ok(_) => error!("{}", message),
                Err(_) => eprintln!("{}", message),
            }
            std::process::exit(EXIT_CONFIG);
        }
    };

    let guard = match init_logging(&config.logging, &overrides(&args)) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to set up logging: {}", e);
            std::process::exit(e.exit_code());
        }
    };

    info!("Configuration file: {}", args.config);

    if args.validate_config {
        match config.validate() {
            Ok(()) => {
                info!("Configuration validation successful");
                println!("✓ Configuration is valid");
                return Ok(());
            }
            Err(e) => {
                error!("Configuration validation failed: {}", e);
                eprintln!("✗ Configuration validation failed: {}", e);
                drop(guard);
                std::process::exit(EXIT_CONFIG);
            }
        }
    }

    let sink = Arc::new(LogSink::new());
    let collector = BeatCollector::new(&config.beat, Arc::new(LogPublisher::new()));
    let mut controller = BeatController::new(config, Box::new(collector), sink);

    let exit_code = controller.run().await;
    info!("zfsbeat exited with code: {}", exit_code);

    // Flush the file writer before exiting
    drop(controller);
    drop(guard);
    std::process::exit(exit_code);
}

fn overrides(args: &Args) -> LogOverrides {
    let level = if args.debug {
        Some("debug".to_string())
    } else if args.quiet {
        Some("error".to_string())
    } else {
        None
    };

    let format = args.log_format.as_deref().and_then(|format| match format.parse::<LogFormat>() {
        Ok(format) => Some(format),
        Err(e) => {
            eprintln!("Warning: {}, using configured format", e);
            None
        }
    });

    LogOverrides {
        level,
        format,
        verbose_fields: args.debug,
    }
}

/// Print an example configuration in TOML format
fn print_default_config() -> Result<()> {
    println!("# zfsbeat configuration file");
    println!("# beat.path is required; every other value shown is the default");
    println!();
    println!("{}", toml::to_string_pretty(&ZfsbeatConfig::example())?);
    Ok(())
}
