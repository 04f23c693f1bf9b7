use clap::Parser;
use env_logger::Env;
use log::{debug, error};
use std::path::{Path, PathBuf};
use std::process::exit;

use certexpchk::config::{Config, ConfigError, OutputFormat, Settings, DEFAULT_CONFIG_FILE};
use certexpchk::report::{json_report, summary_table};
use certexpchk::{problem_count, Coordinator, TextReporter, TlsProber};

mod metrics;

/// Checks whether the TLS certificates served by each host are inside their
/// validity window.
#[derive(Parser, Debug)]
#[command(
    version,
    about,
    after_help = "Exit status is the number of problems found: hosts that could not be \
                  reached plus certificates that have expired or are not yet valid."
)]
struct Args {
    /// Hosts to check; the port defaults to 443
    #[arg(value_name = "HOSTNAME[:PORT]")]
    addresses: Vec<String>,

    /// Show progress and valid certificates
    #[arg(long)]
    verbose: bool,

    /// Connect and handshake timeout in seconds [default: 10]
    #[arg(long, value_name = "SECS")]
    timeout: Option<u64>,

    /// Maximum number of hosts probed at the same time [default: unbounded]
    #[arg(long, value_name = "N")]
    max_concurrency: Option<usize>,

    /// Output format: text, summary or json [default: text]
    #[arg(short, long)]
    output: Option<String>,

    /// Configuration file [default: ./certexpchk.toml when present]
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Print an example configuration file and exit
    #[arg(long)]
    example_config: bool,

    /// Push per-host metrics to a Prometheus Push Gateway
    #[arg(long)]
    prometheus: bool,

    /// Prometheus Push Gateway address [default: http://localhost:9091]
    #[arg(long, value_name = "URL")]
    prometheus_address: Option<String>,
}

fn main() {
    let args = Args::parse();

    if args.example_config {
        println!("{}", Config::example_toml());
        exit(0);
    }

    let settings = match load_settings(&args, Path::new(DEFAULT_CONFIG_FILE)) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("certexpchk: {}", e);
            eprintln!("Usage: certexpchk [--verbose] HOSTNAME[:PORT] ...");
            exit(2);
        }
    };
    init_logger(settings.verbose);
    debug!("resolved settings: {:?}", settings);

    let coordinator = Coordinator::new(
        TlsProber::new(settings.timeout),
        TextReporter::new(settings.verbose),
    )
    .with_max_concurrency(settings.max_concurrency);
    let reports = coordinator.probe_all(&settings.hosts);

    match settings.output {
        OutputFormat::Text => {}
        OutputFormat::Summary => eprintln!("{}", summary_table(&reports)),
        OutputFormat::Json => match json_report(&reports) {
            Ok(json) => println!("{}", json),
            Err(e) => error!("failed to render JSON report: {}", e),
        },
    }

    if let Some(address) = &settings.prometheus_address {
        metrics::prom::prometheus_metrics(&reports, address);
    }

    exit(exit_status(problem_count(&reports)));
}

/// `default_config` is read when no `--config` is given and the file exists.
fn load_settings(args: &Args, default_config: &Path) -> Result<Settings, ConfigError> {
    let file_config = match &args.config {
        Some(path) => Config::from_file(path)?,
        None if default_config.exists() => Config::from_file(default_config)?,
        None => Config::default(),
    };

    let hosts = if args.addresses.is_empty() {
        None
    } else {
        Some(args.addresses.clone())
    };
    let cli_config = Config::from_cli_args(
        hosts,
        if args.verbose { Some(true) } else { None },
        args.timeout,
        args.max_concurrency,
        args.output.clone(),
        if args.prometheus { Some(true) } else { None },
        args.prometheus_address.clone(),
    );

    Config::defaults()
        .merge_with(file_config)
        .merge_with(cli_config)
        .resolve()
}

fn init_logger(verbose: bool) {
    let filter = if verbose {
        "warn,certexpchk=debug"
    } else {
        "warn"
    };
    env_logger::Builder::from_env(Env::default().filter_or("RUST_LOG", filter)).init();
}

/// Process exit statuses are truncated to 8 bits; saturate so that a problem
/// count never wraps around to 0.
fn exit_status(problems: usize) -> i32 {
    problems.min(255) as i32
}
