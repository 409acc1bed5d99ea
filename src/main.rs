use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};

use linktester::config::{LinktesterConfig, LoggingConfig};
use linktester::link::LinkTest;
use linktester::stats::EthtoolCapture;
use linktester::system::environment::check_environment;
use linktester::system::interfaces::InterfaceLister;
use linktester::throughput::report::format_summary;
use linktester::throughput::{Client, Server};
use linktester::{LinkTestError, EXIT_LINK_PROBLEM};

#[derive(Parser)]
#[command(
    name = "linktester",
    about = "Test the quality of a network link between two servers using iperf3 and ethtool",
    version,
    long_about = None
)]
struct Cli {
    /// Configuration file (TOML)
    #[arg(long, global = true, env = "LINKTESTER_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose mode
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run iperf3 against a remote server and check NIC error counters
    Client {
        /// The remote server that is running `iperf3 --server`
        #[arg(long)]
        remote_server: String,

        /// Override the configured iperf3 port
        #[arg(long)]
        port: Option<u16>,

        /// Test duration in seconds
        #[arg(long)]
        duration: Option<u64>,

        /// Interface to monitor (default: first usable interface)
        #[arg(long)]
        interface: Option<String>,

        /// Local address for iperf3 to bind
        #[arg(long)]
        bind_address: Option<String>,

        /// Reverse the direction (server sends)
        #[arg(long)]
        reverse: bool,

        /// JSON output for machine parsing
        #[arg(long)]
        json: bool,
    },

    /// Run a local iperf3 server
    Server {
        /// Bind address
        #[arg(long)]
        bind_address: Option<String>,

        /// Listen port
        #[arg(long)]
        port: Option<u16>,

        /// Keep serving tests instead of exiting after the first one
        #[arg(long)]
        forever: bool,
    },

    /// List the network interfaces usable for a link test
    Interfaces,

    /// Show the watched NIC error counters of an interface
    Stats {
        /// Interface to inspect (default: first usable interface)
        #[arg(long)]
        interface: Option<String>,

        /// JSON output for machine parsing
        #[arg(long)]
        json: bool,
    },

    /// Verify that ethtool, iperf3 and ip are installed
    CheckEnv,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    // the configured logging settings are not known until the config is loaded
    let bootstrap = tracing_subscriber::fmt()
        .with_env_filter(env_filter(cli.verbose, "info"))
        .with_writer(std::io::stderr)
        .finish();
    let config = tracing::subscriber::with_default(bootstrap, || {
        LinktesterConfig::resolve(cli.config.as_deref())
    })?;
    init_tracing(&config.logging, cli.verbose);

    let binaries = match check_environment(&config.binaries) {
        Ok(binaries) => binaries,
        Err(e) => return Ok(environment_failure(&e)),
    };

    let lister = InterfaceLister::new(&config.binaries.ip, config.interfaces.filter()?);

    match cli.command {
        Commands::CheckEnv => {
            for binary in binaries {
                println!("{:<10} {}", binary.name, binary.path.display());
            }
        }
        Commands::Interfaces => {
            for iface in lister.list_interfaces()? {
                println!("{}", iface);
            }
        }
        Commands::Stats { interface, json } => {
            let interface = match resolve_interface(&lister, interface) {
                Ok(iface) => iface,
                Err(e) if e.is_environment() => return Ok(environment_failure(&e)),
                Err(e) => return Err(e.into()),
            };
            let snapshot = EthtoolCapture::new(&config.binaries.ethtool, &interface)
                .capture()
                .await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&snapshot)?);
            } else {
                println!("NIC statistics for {}:", interface);
                for (key, value) in snapshot.iter() {
                    println!("  {:<14} {}", key, value);
                }
            }
        }
        Commands::Server {
            bind_address,
            port,
            forever,
        } => {
            let server = Server {
                iperf3_path: config.binaries.iperf3.clone(),
                bind_address: bind_address.unwrap_or(config.iperf3.server_bind_address.clone()),
                port: port.unwrap_or(config.iperf3.port),
                verbose: cli.verbose,
                forever,
            };
            tracing::info!(%server, "Starting server");
            server.start().await?;
        }
        Commands::Client {
            remote_server,
            port,
            duration,
            interface,
            bind_address,
            reverse,
            json,
        } => {
            let interface = match resolve_interface(&lister, interface) {
                Ok(iface) => iface,
                Err(e) if e.is_environment() => return Ok(environment_failure(&e)),
                Err(e) => return Err(e.into()),
            };
            let client = Client {
                iperf3_path: config.binaries.iperf3.clone(),
                server_hostname: remote_server,
                port: port.unwrap_or(config.iperf3.port),
                duration_secs: duration.unwrap_or(config.iperf3.duration_sec),
                bind_address,
                verbose: cli.verbose,
                reverse,
                zerocopy: config.iperf3.zerocopy,
            };

            let report = LinkTest::new(&config.binaries.ethtool, &interface, client)
                .run()
                .await?;

            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("\n=== Link Test: {} ===", report.interface);
                println!("{}", format_summary(&report.throughput));
                if report.is_clean() {
                    println!("No NIC error counters changed during the test.");
                } else {
                    println!("The following counters had problems:");
                    println!("{:<14} | {:>8} | {:>8} | Delta", "Counter", "Before", "After");
                    println!("{:-<14}-|-{:->8}-|-{:->8}-|-{:-<8}", "", "", "", "");
                    for (key, delta) in report.changed_counters.iter() {
                        println!(
                            "{:<14} | {:>8} | {:>8} | {}",
                            key,
                            report.before.get(key).unwrap_or_default(),
                            report.after.get(key).unwrap_or_default(),
                            delta
                        );
                    }
                }
                println!();
            }

            if !report.is_clean() {
                return Ok(ExitCode::from(EXIT_LINK_PROBLEM));
            }
        }
    }

    Ok(ExitCode::SUCCESS)
}

fn env_filter(verbose: bool, fallback: &str) -> tracing_subscriber::EnvFilter {
    if verbose {
        tracing_subscriber::EnvFilter::new("debug")
    } else {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(fallback))
    }
}

fn init_tracing(logging: &LoggingConfig, verbose: bool) {
    // stderr keeps stdout clean for --json output
    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter(verbose, &logging.level))
        .with_writer(std::io::stderr);
    if logging.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn resolve_interface(
    lister: &InterfaceLister,
    interface: Option<String>,
) -> linktester::Result<String> {
    match interface {
        Some(iface) => Ok(iface),
        None => lister.default_interface(),
    }
}

fn environment_failure(err: &LinkTestError) -> ExitCode {
    tracing::error!(error = %err, "broken test environment");
    eprintln!("Error: {}", err);
    ExitCode::from(EXIT_LINK_PROBLEM)
}
