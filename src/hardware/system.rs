//! System information aggregator

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sysinfo::System;

use super::dmi::DmiInfo;
use super::memory_cache::format_size;
use super::net::NetInfo;
use super::topology::TopologyInfo;
use crate::{log_warn, Context};

/// Point-in-time hardware snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemInfo {
    /// When the snapshot was taken
    pub collected_at: DateTime<Utc>,
    pub hostname: Option<String>,
    /// Operating system
    pub os: String,
    pub os_version: Option<String>,
    pub kernel_version: Option<String>,
    /// NUMA nodes and their caches
    pub topology: TopologyInfo,
    /// DMI records (Linux only)
    pub dmi: Option<DmiInfo>,
    pub net: NetInfo,
}

impl SystemInfo {
    /// Detect everything. A section that cannot be read is logged and left
    /// empty rather than failing the whole snapshot.
    pub fn detect(ctx: &Context) -> Self {
        let topology = TopologyInfo::detect(ctx).unwrap_or_else(|e| {
            log_warn!(ctx.logger(), "Cache topology unavailable: {}", e);
            TopologyInfo::default()
        });

        let net = NetInfo::detect(ctx).unwrap_or_else(|e| {
            log_warn!(ctx.logger(), "Network interfaces unavailable: {}", e);
            NetInfo::default()
        });

        let dmi = if cfg!(target_os = "linux") {
            Some(DmiInfo::detect(ctx))
        } else {
            None
        };

        SystemInfo {
            collected_at: Utc::now(),
            hostname: System::host_name(),
            os: System::name().unwrap_or_else(|| "Unknown".to_string()),
            os_version: System::os_version(),
            kernel_version: System::kernel_version(),
            topology,
            dmi,
            net,
        }
    }

    /// Display system info as formatted string
    pub fn display(&self) -> String {
        const WIDTH: usize = 62;
        let mut output = String::new();

        output.push_str(&format!("╔{}╗\n", "═".repeat(WIDTH)));
        output.push_str(&format!("║{:^WIDTH$}║\n", "HARDWARE INVENTORY"));
        output.push_str(&format!("╠{}╣\n", "═".repeat(WIDTH)));

        let format_line = |label: &str, content: &str| -> String {
            let content_width = WIDTH.saturating_sub(1);
            let text = format!("{}{}", label, content);
            let text: String = text.chars().take(content_width).collect();
            format!("║ {:<content_width$}║\n", text, content_width = content_width)
        };

        // Host section
        let os_str = match &self.os_version {
            Some(ver) => format!("{} {}", self.os, ver),
            None => self.os.clone(),
        };
        output.push_str(&format_line("Host:    ", self.hostname.as_deref().unwrap_or("unknown")));
        output.push_str(&format_line("OS:      ", &os_str));
        if let Some(ref kernel) = self.kernel_version {
            output.push_str(&format_line("Kernel:  ", kernel));
        }
        output.push_str(&format_line(
            "Taken:   ",
            &self.collected_at.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
        ));

        // DMI section
        if let Some(ref dmi) = self.dmi {
            output.push_str(&format!("╠{}╣\n", "═".repeat(WIDTH)));
            output.push_str(&format_line(
                "System:  ",
                &format!("{} {}", dmi.product.vendor, dmi.product.name),
            ));
            output.push_str(&format_line(
                "Board:   ",
                &format!("{} {}", dmi.baseboard.vendor, dmi.baseboard.product),
            ));
            output.push_str(&format_line(
                "BIOS:    ",
                &format!("{} {} ({})", dmi.bios.vendor, dmi.bios.version, dmi.bios.date),
            ));
            output.push_str(&format_line("Chassis: ", &dmi.chassis.type_description));
        }

        // Cache section
        output.push_str(&format!("╠{}╣\n", "═".repeat(WIDTH)));
        if self.topology.nodes.is_empty() {
            output.push_str(&format_line("Caches:  ", "not available"));
        }
        for node in &self.topology.nodes {
            output.push_str(&format_line(
                &format!("Node {}:  ", node.id),
                &format!("{} logical processors", node.logical_processors().len()),
            ));
            for cache in &node.caches {
                let size = cache
                    .size_bytes
                    .map(format_size)
                    .unwrap_or_else(|| "unknown size".to_string());
                output.push_str(&format_line(
                    "         ",
                    &format!(
                        "{:<4} {:>8}  x{} shared",
                        cache.label(),
                        size,
                        cache.logical_processors.len()
                    ),
                ));
            }
        }

        // Network section
        output.push_str(&format!("╠{}╣\n", "═".repeat(WIDTH)));
        if self.net.nics.is_empty() {
            output.push_str(&format_line("NICs:    ", "none detected"));
        }
        for nic in &self.net.nics {
            let mut details = nic.name.clone();
            if let Some(ref mac) = nic.mac_address {
                details.push_str(&format!(" | {}", mac));
            }
            if let Some(ref speed) = nic.speed {
                details.push_str(&format!(" | {}", speed));
            }
            if nic.is_virtual {
                details.push_str(" | virtual");
            }
            output.push_str(&format_line("NIC:     ", &details));
        }

        output.push_str(&format!("╚{}╝", "═".repeat(WIDTH)));

        output
    }
}
