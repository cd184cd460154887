//! hw-inventory - print what the OS knows about this machine's hardware
//!
//! Read-only: nothing here changes system state. Every command takes one
//! snapshot of sysfs (or WMI on Windows) and prints it as text or JSON.

use anyhow::{Context as _, Result};
use clap::{Parser, Subcommand};
use colored::*;
use serde::Serialize;
use std::path::PathBuf;

use hw_inventory::config::{Config, OutputFormat};
use hw_inventory::hardware::dmi::DmiInfo;
use hw_inventory::hardware::net::NetInfo;
use hw_inventory::hardware::{Node, SystemInfo, TopologyInfo};
use hw_inventory::Context;

/// hw-inventory - static hardware inventory
#[derive(Parser)]
#[command(name = "hw-inventory")]
#[command(version)]
#[command(about = "Report cache topology, DMI identifiers and network interfaces")]
struct Cli {
    /// Read sysfs below this directory instead of /
    #[arg(long, global = true)]
    chroot: Option<PathBuf>,

    /// Print JSON instead of text
    #[arg(long, global = true, default_value_t = false)]
    json: bool,

    /// Enable debug diagnostics (RUST_LOG still takes precedence)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Detect and display everything (default)
    Detect,

    /// Show the caches of one NUMA node
    Caches {
        /// NUMA node ID
        #[arg(short, long, default_value_t = 0)]
        node: u32,
    },

    /// Show every NUMA node with its caches
    Topology,

    /// Show DMI/SMBIOS identifiers
    Dmi,

    /// Show network interfaces
    Net,

    /// Manage the configuration file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the configuration file location
    Path,
    /// Print the effective configuration
    Show,
    /// Write a default configuration file if none exists
    Init,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load()?;

    init_tracing(&config, cli.verbose);

    let chroot = cli
        .chroot
        .clone()
        .unwrap_or_else(|| config.effective_chroot());
    let ctx = Context::with_chroot(&chroot);
    let format = if cli.json {
        OutputFormat::Json
    } else {
        config.output.format
    };

    match cli.command.unwrap_or(Commands::Detect) {
        Commands::Detect => {
            let info = SystemInfo::detect(&ctx);
            emit(format, &info, |info| info.display())?;
        }
        Commands::Caches { node } => {
            let node = Node::detect(&ctx, node)
                .with_context(|| format!("Failed to read caches of NUMA node {}", node))?;
            emit(format, &node, render_node)?;
        }
        Commands::Topology => {
            let topology = TopologyInfo::detect(&ctx).context("Failed to read NUMA topology")?;
            emit(format, &topology, |topology| {
                topology
                    .nodes
                    .iter()
                    .map(render_node)
                    .collect::<Vec<_>>()
                    .join("\n")
            })?;
        }
        Commands::Dmi => {
            let dmi = DmiInfo::detect(&ctx);
            emit(format, &dmi, render_dmi)?;
        }
        Commands::Net => {
            let net = NetInfo::detect(&ctx).context("Failed to list network interfaces")?;
            emit(format, &net, render_net)?;
        }
        Commands::Config { action } => match action {
            ConfigAction::Path => println!("{}", Config::config_path()?.display()),
            ConfigAction::Show => print!("{}", toml::to_string_pretty(&config)?),
            ConfigAction::Init => {
                Config::init()?;
                println!(
                    "{} {}",
                    "Configuration at".bright_green(),
                    Config::config_path()?.display()
                );
            }
        },
    }

    Ok(())
}

fn init_tracing(config: &Config, verbose: u8) {
    let default_level = if verbose > 0 {
        "debug"
    } else {
        config.logging.level.as_str()
    };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();
}

fn emit<T: Serialize>(format: OutputFormat, value: &T, render: impl Fn(&T) -> String) -> Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(value)?),
        OutputFormat::Text => println!("{}", render(value)),
    }
    Ok(())
}

fn render_node(node: &Node) -> String {
    let mut lines = vec![format!("{}", format!("node {}", node.id).bright_cyan().bold())];
    for cache in &node.caches {
        lines.push(format!("  {}", cache));
    }
    if node.caches.is_empty() {
        lines.push(format!("  {}", "no caches reported".bright_yellow()));
    }
    lines.join("\n")
}

fn render_dmi(dmi: &DmiInfo) -> String {
    let rows = [
        ("BIOS", format!("{} {} ({})", dmi.bios.vendor, dmi.bios.version, dmi.bios.date)),
        ("Baseboard", format!("{} {} {}", dmi.baseboard.vendor, dmi.baseboard.product, dmi.baseboard.version)),
        ("Chassis", format!("{} {} ({})", dmi.chassis.vendor, dmi.chassis.type_description, dmi.chassis.version)),
        ("Product", format!("{} {} {}", dmi.product.vendor, dmi.product.name, dmi.product.family)),
        ("Serial", dmi.product.serial_number.clone()),
        ("UUID", dmi.product.uuid.clone()),
    ];
    rows.iter()
        .map(|(label, value)| format!("{:<10} {}", label.bright_cyan(), value))
        .collect::<Vec<_>>()
        .join("\n")
}

fn render_net(net: &NetInfo) -> String {
    if net.nics.is_empty() {
        return "No network interfaces detected".bright_yellow().to_string();
    }
    net.nics
        .iter()
        .map(|nic| {
            let mut line = format!("{}", nic.name.bright_cyan());
            line.push_str(&format!(" mac={}", nic.mac_address.as_deref().unwrap_or("-")));
            line.push_str(&format!(" speed={}", nic.speed.as_deref().unwrap_or("-")));
            if let Some(ref duplex) = nic.duplex {
                line.push_str(&format!(" duplex={}", duplex));
            }
            if nic.is_virtual {
                line.push_str(&format!(" {}", "virtual".dimmed()));
            }
            let enabled = nic.capabilities.iter().filter(|c| c.is_enabled).count();
            if !nic.capabilities.is_empty() {
                line.push_str(&format!(" features={}/{}", enabled, nic.capabilities.len()));
            }
            line
        })
        .collect::<Vec<_>>()
        .join("\n")
}
