//! PreBuilder CLI
//!
//! Entry point for the `prebuild` command-line tool.

use clap::Parser;
use prebuild::config::{targets, LogSettings};
use prebuild::logging::LoggingGuard;
use prebuild::{
    logging, ConfigLoader, KeypathError, Normalizer, ProvisioningProfileResolver, ResolvedConfig,
};
use std::path::PathBuf;
use std::process;
use tracing::{info, warn};

const EX_OK: i32 = 0;
/// Command line usage error (sysexits `EX_USAGE`)
const EX_USAGE: i32 = 64;
/// Configuration error (sysexits `EX_CONFIG`)
const EX_CONFIG: i32 = 78;
/// `--get` found nothing at the keypath
const EXIT_ABSENT: i32 = 1;

#[derive(Parser)]
#[command(name = "prebuild")]
#[command(about = "Resolve layered pre-build configuration", version)]
struct Cli {
    /// Configuration file; repeat to layer several, later files win
    #[arg(long, short = 'c', value_name = "FILE", required = true)]
    config: Vec<PathBuf>,

    /// Configuration merged underneath all others
    #[arg(long, short = 'f', value_name = "FILE")]
    fallback_config: Option<PathBuf>,

    /// Print the merged configuration as JSON and exit
    #[arg(long, short = 'd')]
    dump_config: bool,

    /// Log progress to the console
    #[arg(long, short = 'v')]
    verbose: bool,

    /// Print the value at a keypath (e.g. "PreBuilder.Targets.App.Configurations.Release") as JSON
    #[arg(long, value_name = "KEYPATH")]
    get: Option<String>,

    /// Print the environment exported to build hooks as NAME=value lines
    #[arg(long)]
    print_env: bool,

    /// Copy provisioning profiles into this directory while resolving them
    #[arg(long, value_name = "DIR")]
    profile_install_dir: Option<PathBuf>,

    /// Leave provisioning profile paths as they are
    #[arg(long)]
    no_normalize: bool,
}

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        // --help and --version
        Err(e) if !e.use_stderr() => e.exit(),
        Err(e) => {
            let _ = e.print();
            process::exit(EX_USAGE);
        }
    };

    process::exit(run(cli));
}

/// Returns the exit code. Logs are flushed before it is returned.
fn run(cli: Cli) -> i32 {
    let config = match ConfigLoader::new().load(cli.config.as_slice(), cli.fallback_config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error loading config: {}", e);
            return EX_USAGE;
        }
    };

    // Queries print to stdout and never open the log files.
    let query = cli.dump_config || cli.get.is_some() || cli.print_env;
    let _guard = if query {
        if let Err(e) = logging::init_console(cli.verbose) {
            eprintln!("Error setting up logging: {}", e);
            return EX_CONFIG;
        }
        None
    } else {
        match start_file_logging(&config, cli.verbose) {
            Ok(guard) => Some(guard),
            Err(code) => return code,
        }
    };

    for source in &config.sources {
        info!(path = %source.path, origin = ?source.origin, digest = %source.digest, "configuration source");
    }

    let config = if cli.no_normalize {
        config
    } else {
        match normalize(config, cli.profile_install_dir) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Error normalizing provisioning profiles: {}", e);
                return EX_CONFIG;
            }
        }
    };

    if cli.dump_config {
        run_dump(&config)
    } else if let Some(keypath) = cli.get {
        run_get(&config, &keypath)
    } else if cli.print_env {
        run_print_env(&config)
    } else {
        info!(
            configurations = targets(&config.tree).len(),
            "configuration ready"
        );
        EX_OK
    }
}

fn start_file_logging(config: &ResolvedConfig, verbose: bool) -> Result<LoggingGuard, i32> {
    let log_settings = LogSettings::from_config(&config.tree).map_err(|e| {
        eprintln!("Error in config: {}", e);
        EX_CONFIG
    })?;

    logging::init(&log_settings, verbose).map_err(|e| {
        eprintln!("Error setting up logging: {}", e);
        EX_CONFIG
    })
}

fn normalize(
    config: ResolvedConfig,
    install_dir: Option<PathBuf>,
) -> Result<ResolvedConfig, KeypathError> {
    let mut resolver = ProvisioningProfileResolver::new();
    if let Some(dir) = install_dir {
        resolver = resolver.with_install_dir(dir);
    }

    let (config, report) = config.normalize(&Normalizer::new(resolver))?;
    if report.unresolved > 0 {
        warn!(
            unresolved = report.unresolved,
            "some provisioning profiles are neither UUIDs nor readable profile files"
        );
    }
    Ok(config)
}

fn run_dump(config: &ResolvedConfig) -> i32 {
    match config.dump() {
        Ok(json) => {
            println!("{}", json);
            EX_OK
        }
        Err(e) => {
            eprintln!("Error serializing config: {}", e);
            EX_CONFIG
        }
    }
}

fn run_get(config: &ResolvedConfig, keypath: &str) -> i32 {
    match config.get(keypath) {
        Ok(Some(value)) => {
            println!("{}", value);
            EX_OK
        }
        Ok(None) => EXIT_ABSENT,
        Err(e) => {
            eprintln!("Invalid keypath: {}", e);
            EX_USAGE
        }
    }
}

fn run_print_env(config: &ResolvedConfig) -> i32 {
    for (name, value) in config.exported_environment() {
        println!("{}={}", name, value);
    }
    EX_OK
}
