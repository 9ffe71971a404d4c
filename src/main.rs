//! simctl-rs - Main Entry Point
//!
//! Command line front end for the simctl dispatcher and its extensions.
//! The process exit code mirrors the exit code of the external command.

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use simctl_rs::{
    LaunchOptions, ListCategory, ListOptions, SimCtl, SimctlConfig, SpawnOptions,
    StartOutcome, TailEvent,
};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Debug, Parser)]
#[command(
    name = "simctl-rs",
    version,
    about = "Drive iOS simulators through xcrun simctl",
    disable_help_subcommand = true
)]
struct Cli {
    /// Config file (defaults to the platform config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Pass --noxpc to simctl
    #[arg(long, global = true)]
    noxpc: bool,

    /// Do not echo command output
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum CategoryArg {
    Devices,
    Devicetypes,
    Runtimes,
    Pairs,
}

impl From<CategoryArg> for ListCategory {
    fn from(arg: CategoryArg) -> Self {
        match arg {
            CategoryArg::Devices => ListCategory::Devices,
            CategoryArg::Devicetypes => ListCategory::DeviceTypes,
            CategoryArg::Runtimes => ListCategory::Runtimes,
            CategoryArg::Pairs => ListCategory::Pairs,
        }
    }
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Check that simctl is installed and working
    Check,
    /// Show simctl help
    Help { subcommand: Option<String> },
    /// Create a new device
    Create {
        name: String,
        device_type_id: String,
        runtime_id: String,
    },
    /// Delete a device
    Delete { device: String },
    /// Erase a device's contents and settings
    Erase { device: String },
    /// Boot a device
    Boot { device: String },
    /// Shut a device down
    Shutdown { device: String },
    /// Rename a device
    Rename { device: String, name: String },
    /// Print an environment variable from a running device
    Getenv { device: String, variable_name: String },
    /// Open a URL in a device
    Openurl { device: String, url: String },
    /// Add a photo to a device's library
    Addphoto { device: String, path: String },
    /// Install an app on a device
    Install { device: String, path: String },
    /// Uninstall an app from a device
    Uninstall { device: String, app_identifier: String },
    /// Launch an app by bundle identifier
    Launch {
        #[arg(short, long)]
        wait_for_debugger: bool,
        device: String,
        app_identifier: String,
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        argv: Vec<String>,
    },
    /// Spawn a process on a device
    Spawn {
        #[arg(short, long)]
        wait_for_debugger: bool,
        #[arg(long)]
        arch: Option<String>,
        device: String,
        path_to_executable: String,
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        argv: Vec<String>,
    },
    /// List devices, device types, runtimes or pairs as JSON
    List {
        #[arg(value_enum)]
        category: Option<CategoryArg>,
    },
    /// Post a darwin notification on a device
    #[command(name = "notify_post")]
    NotifyPost { device: String, notification_name: String },
    /// Trigger iCloud sync on a device
    #[command(name = "icloud_sync")]
    IcloudSync { device: String },
    /// Print the major version of the active Xcode
    XcodeVersion,
    /// Report whether a device is booted
    Booted { udid: String },
    /// Boot a device and open Simulator.app
    Start { udid: String },
    /// Follow a device's system log
    Log {
        udid: String,
        /// Append lines to this file instead of printing them
        #[arg(long)]
        file: Option<PathBuf>,
    },
}

fn main() -> ExitCode {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("warn,simctl_rs=info")),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match run(cli) {
        Ok(code) => exit_code(code),
        Err(e) => {
            tracing::error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn exit_code(code: i32) -> ExitCode {
    match u8::try_from(code) {
        Ok(code) => ExitCode::from(code),
        Err(_) => ExitCode::FAILURE,
    }
}

fn load_config(cli: &Cli) -> anyhow::Result<SimctlConfig> {
    let mut config = match &cli.config {
        Some(path) => SimctlConfig::load(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => SimctlConfig::load_or_default(),
    };

    if cli.noxpc {
        config.noxpc = true;
    }
    if cli.quiet {
        config.silent = true;
    }
    Ok(config)
}

fn run(cli: Cli) -> anyhow::Result<i32> {
    let config = load_config(&cli)?;
    let quiet = config.silent;
    let simctl = SimCtl::new(config);
    tracing::debug!(noxpc = simctl.noxpc(), "dispatcher ready");

    let result = match cli.command {
        Commands::Check => {
            let result = simctl.check_prerequisites()?;
            if !result.success() || !quiet {
                print!("{}", result.output);
            }
            result
        }
        Commands::Help { subcommand } => simctl.help(subcommand.as_deref())?,
        Commands::Create {
            name,
            device_type_id,
            runtime_id,
        } => simctl.create(&name, &device_type_id, &runtime_id)?,
        Commands::Delete { device } => simctl.delete(&device)?,
        Commands::Erase { device } => simctl.erase(&device)?,
        Commands::Boot { device } => simctl.boot(&device)?,
        Commands::Shutdown { device } => simctl.shutdown(&device)?,
        Commands::Rename { device, name } => simctl.rename(&device, &name)?,
        Commands::Getenv {
            device,
            variable_name,
        } => simctl.getenv(&device, &variable_name)?,
        Commands::Openurl { device, url } => simctl.openurl(&device, &url)?,
        Commands::Addphoto { device, path } => simctl.addphoto(&device, &path)?,
        Commands::Install { device, path } => simctl.install(&device, &path)?,
        Commands::Uninstall {
            device,
            app_identifier,
        } => simctl.uninstall(&device, &app_identifier)?,
        Commands::Launch {
            wait_for_debugger,
            device,
            app_identifier,
            argv,
        } => {
            let options = LaunchOptions::new(device, app_identifier)
                .wait_for_debugger(wait_for_debugger)
                .args(argv);
            simctl.launch(&options)?
        }
        Commands::Spawn {
            wait_for_debugger,
            arch,
            device,
            path_to_executable,
            argv,
        } => {
            let mut options = SpawnOptions::new(device, path_to_executable)
                .wait_for_debugger(wait_for_debugger)
                .args(argv);
            options.arch = arch;
            simctl.spawn(&options)?
        }
        Commands::List { category } => {
            let category = category.map(ListCategory::from).unwrap_or_default();
            let result = simctl.list(ListOptions::new(category).with_silent(true))?;
            if !quiet {
                match &result.json {
                    Some(json) => println!("{}", serde_json::to_string_pretty(json)?),
                    None => print!("{}", result.combined_output()),
                }
            }
            result
        }
        Commands::NotifyPost {
            device,
            notification_name,
        } => simctl.notify_post(&device, &notification_name)?,
        Commands::IcloudSync { device } => simctl.icloud_sync(&device)?,
        Commands::XcodeVersion => {
            return match simctl.extensions().xcode_version() {
                Some(major) => {
                    println!("{}", major);
                    Ok(0)
                }
                None => Ok(1),
            };
        }
        Commands::Booted { udid } => {
            let booted = simctl.extensions().is_device_booted(&udid)?;
            println!("{}", booted);
            return Ok(if booted { 0 } else { 1 });
        }
        Commands::Start { udid } => {
            return match simctl.extensions().start(&udid)? {
                StartOutcome::AlreadyRunning => Ok(0),
                StartOutcome::Launched(result) => Ok(result.code),
                StartOutcome::Aborted(reason) => {
                    tracing::warn!("Simulator start aborted: {}", reason);
                    Ok(1)
                }
            };
        }
        Commands::Log { udid, file } => return follow_log(&simctl, &udid, file),
    };

    Ok(result.code)
}

fn follow_log(simctl: &SimCtl, udid: &str, file: Option<PathBuf>) -> anyhow::Result<i32> {
    let tail = simctl
        .extensions()
        .log(udid, file)
        .with_context(|| format!("starting log tail for {}", udid))?;
    tracing::info!("Following {}", tail.path().display());

    for event in tail.events().iter() {
        match event {
            TailEvent::Line(_) | TailEvent::Error(_) => {}
            TailEvent::Stopped => return Ok(0),
            TailEvent::Failed(_) => return Ok(1),
        }
    }

    Ok(0)
}
