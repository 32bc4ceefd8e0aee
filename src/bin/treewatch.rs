//! treewatch command line entry point
//!
//! Watches a directory and wires the stock consumers: a change logger and an
//! audit log on every topic, plus a logger for one "important" prefix.

use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use treewatch::{
    stop, AuditLog, Broker, ChangeLogger, FileMonitor, LoopErrorPolicy, StopHandle, WatcherConfig,
};

/// CLI configuration
struct Config {
    /// Directory to watch
    root: PathBuf,
    /// Poll interval
    interval: Duration,
    /// Audit log destination
    audit_log: PathBuf,
    /// Prefix routed to the important-files logger
    important_prefix: String,
    continue_on_error: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            root: PathBuf::from("./file-server"),
            interval: Duration::from_secs(1),
            audit_log: PathBuf::from("audit.log"),
            important_prefix: "important_stuff/".to_string(),
            continue_on_error: false,
        }
    }
}

fn value_for(args: &[String], i: usize, flag: &str) -> String {
    match args.get(i + 1) {
        Some(v) => v.clone(),
        None => {
            eprintln!("error: {flag} requires a value");
            std::process::exit(1);
        }
    }
}

fn parse_args() -> Config {
    let args: Vec<String> = std::env::args().collect();
    let mut config = Config::default();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--root" | "-r" => {
                config.root = PathBuf::from(value_for(&args, i, "--root"));
                i += 2;
            }
            "--interval-ms" | "-i" => {
                let raw = value_for(&args, i, "--interval-ms");
                let ms: u64 = raw.parse().unwrap_or_else(|_| {
                    eprintln!("error: invalid interval: {raw}");
                    std::process::exit(1);
                });
                config.interval = Duration::from_millis(ms);
                i += 2;
            }
            "--audit-log" | "-a" => {
                config.audit_log = PathBuf::from(value_for(&args, i, "--audit-log"));
                i += 2;
            }
            "--important" => {
                config.important_prefix = value_for(&args, i, "--important");
                i += 2;
            }
            "--continue-on-error" => {
                config.continue_on_error = true;
                i += 1;
            }
            "--help" | "-h" => {
                println!("treewatch - publish structured file change events");
                println!();
                println!("USAGE:");
                println!("    treewatch [OPTIONS]");
                println!();
                println!("OPTIONS:");
                println!("    -r, --root <DIR>          Directory to watch [default: ./file-server]");
                println!("    -i, --interval-ms <MS>    Poll interval in milliseconds [default: 1000]");
                println!("    -a, --audit-log <FILE>    Audit log file [default: audit.log]");
                println!("        --important <PREFIX>  Prefix for the important-files logger [default: important_stuff/]");
                println!("        --continue-on-error   Keep polling when a consumer fails");
                println!("    -h, --help                Print help information");
                std::process::exit(0);
            }
            arg => {
                eprintln!("error: unknown argument: {arg}");
                std::process::exit(1);
            }
        }
    }

    config
}

/// Stops the monitor only when an interrupt actually arrived.
fn on_ctrl_c(result: std::io::Result<()>, handle: &StopHandle) -> bool {
    match result {
        Ok(()) => {
            info!("interrupt received");
            handle.stop();
            true
        }
        Err(err) => {
            error!(error = %err, "failed to install ctrl-c handler, interrupt disabled");
            false
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = parse_args();

    let broker = Arc::new(Broker::new());
    broker.subscribe(Arc::new(ChangeLogger::new("FileChangeLogger")), "~");
    broker.subscribe(
        Arc::new(ChangeLogger::new("ImportantFileProcessor")),
        &format!("{}~", config.important_prefix),
    );
    broker.subscribe(Arc::new(AuditLog::new("AuditLogger", &config.audit_log)), "~");

    let watcher_cfg = WatcherConfig {
        root: config.root,
        interval: config.interval,
        on_consumer_error: if config.continue_on_error {
            LoopErrorPolicy::LogAndContinue
        } else {
            LoopErrorPolicy::Stop
        },
        ..WatcherConfig::default()
    };
    let mut monitor = FileMonitor::new(broker, watcher_cfg)?;

    let (handle, token) = stop::channel();
    thread::Builder::new()
        .name("treewatch-signal".to_string())
        .spawn(move || {
            let rt = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
                Ok(rt) => rt,
                Err(err) => {
                    error!(error = %err, "failed to start signal runtime");
                    return;
                }
            };
            on_ctrl_c(rt.block_on(signal::ctrl_c()), &handle);
        })?;

    monitor.start(&token)?;
    Ok(())
}
