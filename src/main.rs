//! diskplan - storage layout planner
//!
//! Reads a scenario file describing disks and planned devices, computes the
//! best layout and prints the resulting device graph.

use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use diskplan::model::DeviceNode;
use diskplan::{plan_and_materialize, Scenario};

#[derive(Parser)]
#[command(name = "diskplan")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Plan a scenario and print the resulting layout
    Plan {
        /// Path to the scenario file
        scenario: String,

        /// Print the resulting device graph as JSON
        #[arg(long)]
        json: bool,
    },

    /// Validate a scenario file without planning it
    Validate {
        /// Path to the scenario file
        scenario: String,
    },

    /// Generate a sample scenario file
    GenerateScenario {
        /// Output path for the scenario file
        #[arg(short, long, default_value = "diskplan.toml")]
        output: String,
    },
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(filter)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Plan { scenario, json } => cmd_plan(&scenario, json)?,
        Commands::Validate { scenario } => cmd_validate(&scenario)?,
        Commands::GenerateScenario { output } => cmd_generate_scenario(&output)?,
    }

    Ok(())
}

fn describe_kind(node: &DeviceNode) -> String {
    use diskplan::model::DeviceKind;
    match &node.kind {
        DeviceKind::Disk => "disk".to_string(),
        DeviceKind::StrayBlock => "stray".to_string(),
        DeviceKind::Partition { ptype, id, .. } => format!("{} ({})", ptype, id_name(*id)),
        DeviceKind::Md { level, members, .. } => {
            format!("{} x{}", level, members.len())
        }
        DeviceKind::Bcache { caching, .. } => {
            if caching.is_some() {
                "bcache (cached)".to_string()
            } else {
                "bcache".to_string()
            }
        }
        DeviceKind::LvmVg { pvs, .. } => format!("vg x{}", pvs.len()),
        DeviceKind::LvmLv => "lv".to_string(),
    }
}

fn id_name(id: diskplan::model::PartitionId) -> &'static str {
    use diskplan::model::PartitionId;
    match id {
        PartitionId::Linux => "linux",
        PartitionId::Swap => "swap",
        PartitionId::Esp => "esp",
        PartitionId::Lvm => "lvm",
        PartitionId::Raid => "raid",
        PartitionId::BiosBoot => "bios_boot",
        PartitionId::Extended => "extended",
    }
}

fn cmd_plan(path: &str, json: bool) -> Result<()> {
    let scenario = Scenario::from_file(path)?;
    let graph = scenario.build_graph()?;
    let planned = scenario.build_planned()?;
    info!("planning scenario {}", path);

    let candidates: Vec<String> = scenario.disks.iter().map(|d| d.name.clone()).collect();
    let result = plan_and_materialize(&graph, &planned, &candidates)?;

    if json {
        let nodes: Vec<&DeviceNode> = result.graph.devices().collect();
        println!("{}", serde_json::to_string_pretty(&nodes)?);
        return Ok(());
    }

    println!(
        "{:<22} {:>12} {:<20} {:<8} {}",
        "DEVICE".bold(),
        "SIZE".bold(),
        "KIND".bold(),
        "FS".bold(),
        "MOUNT".bold()
    );
    println!("{}", "-".repeat(76));
    for node in result.graph.devices() {
        let fs = node
            .filesystem
            .as_ref()
            .map(|f| f.kind.to_string())
            .unwrap_or_else(|| "-".to_string());
        let mount = node
            .filesystem
            .as_ref()
            .and_then(|f| f.mount_point.clone())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:<22} {:>12} {:<20} {:<8} {}",
            node.name,
            node.size.to_string(),
            describe_kind(node),
            fs,
            mount
        );
    }

    let mount_only: Vec<&String> = result
        .devices
        .keys()
        .filter(|k| k.starts_with("nfs:") || k.starts_with("tmpfs:"))
        .collect();
    if !mount_only.is_empty() {
        println!();
        for key in mount_only {
            println!("{} {}", "mount".cyan(), key);
        }
    }

    Ok(())
}

fn cmd_validate(path: &str) -> Result<()> {
    let scenario = Scenario::from_file(path)?;
    scenario.build_graph()?;
    scenario.build_planned()?;
    println!("{} Scenario is valid", "✓".green());
    Ok(())
}

fn cmd_generate_scenario(output: &str) -> Result<()> {
    let sample = Scenario::sample();
    let content = toml::to_string_pretty(&sample)?;
    std::fs::write(output, content)?;
    println!("{} Sample scenario written to {}", "✓".green(), output);
    Ok(())
}
