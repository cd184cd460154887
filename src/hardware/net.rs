//! Network interface detection
//!
//! Detects NICs using:
//! - Linux: /sys/class/net, `ethtool <iface>` for link settings,
//!   `ethtool -k <iface>` for offload capabilities
//! - Windows: WMI `Win32_NetworkAdapter` via `wmic ... /format:csv`

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
#[cfg(target_os = "linux")]
use std::fs;
use std::process::Command;

use crate::error::Result;
#[cfg(target_os = "linux")]
use crate::error::Error;
use crate::{log_debug, Context};

/// Fields requested from `Win32_NetworkAdapter`
pub const WMIC_NIC_FIELDS: &str = "Description,DeviceID,Index,InterfaceIndex,MACAddress,Manufacturer,Name,NetConnectionID,ProductName,ServiceName,PhysicalAdapter,Speed";

/// One offload/feature flag as reported by `ethtool -k`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NicCapability {
    pub name: String,
    pub is_enabled: bool,
    pub can_enable: bool,
}

/// Network interface
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Nic {
    /// Interface name ("eth0") or connection name ("Ethernet 2")
    pub name: String,
    pub mac_address: Option<String>,
    /// Software-only device (loopback, bridge, tunnel, Hyper-V switch, ...)
    pub is_virtual: bool,
    /// Link speed such as "1000Mb/s"
    pub speed: Option<String>,
    pub duplex: Option<String>,
    pub supported_link_modes: Vec<String>,
    pub advertised_link_modes: Vec<String>,
    pub capabilities: Vec<NicCapability>,
}

impl Nic {
    fn named(name: impl Into<String>) -> Self {
        Nic {
            name: name.into(),
            mac_address: None,
            is_virtual: false,
            speed: None,
            duplex: None,
            supported_link_modes: Vec::new(),
            advertised_link_modes: Vec::new(),
            capabilities: Vec::new(),
        }
    }
}

/// All network interfaces
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetInfo {
    pub nics: Vec<Nic>,
}

impl NetInfo {
    /// Detect network interfaces (platform-specific)
    pub fn detect(ctx: &Context) -> Result<Self> {
        #[cfg(target_os = "linux")]
        let nics = detect_linux(ctx, &|args: &[&str]| run_tool(ctx, "ethtool", args))?;

        #[cfg(target_os = "windows")]
        let nics = detect_windows(ctx);

        #[cfg(not(any(target_os = "linux", target_os = "windows")))]
        let nics = {
            let _ = ctx;
            Vec::new()
        };

        Ok(NetInfo { nics })
    }
}

/// Run a diagnostic tool and return its stdout on success
fn run_tool(ctx: &Context, program: &str, args: &[&str]) -> Option<String> {
    let output = match Command::new(program).args(args).output() {
        Ok(output) => output,
        Err(e) => {
            log_debug!(ctx.logger(), "{} not available: {}", program, e);
            return None;
        }
    };

    if !output.status.success() {
        log_debug!(
            ctx.logger(),
            "{} {} exited with {}",
            program,
            args.join(" "),
            output.status
        );
        return None;
    }

    Some(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Walk /sys/class/net. `ethtool` receives the argument list and returns the
/// tool's stdout, or `None` when it is unavailable.
#[cfg(target_os = "linux")]
fn detect_linux(ctx: &Context, ethtool: &dyn Fn(&[&str]) -> Option<String>) -> Result<Vec<Nic>> {
    let net_root = &ctx.paths().sys_class_net;
    let entries = fs::read_dir(net_root).map_err(|e| Error::read_dir(net_root, e))?;

    let mut names = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| Error::read_dir(net_root, e))?;
        if let Some(name) = entry.file_name().to_str() {
            names.push(name.to_string());
        }
    }
    names.sort();

    let nics = names
        .into_iter()
        .map(|name| {
            let dev_path = net_root.join(&name);
            let mut nic = Nic::named(&name);

            nic.mac_address = fs::read_to_string(dev_path.join("address"))
                .ok()
                .map(|mac| mac.trim().to_string())
                .filter(|mac| !mac.is_empty() && mac != "00:00:00:00:00:00");

            // /sys/class/net entries are symlinks into the device tree; software
            // devices live under devices/virtual.
            nic.is_virtual = match fs::read_link(&dev_path) {
                Ok(target) => target.to_string_lossy().contains("devices/virtual/"),
                Err(_) => !dev_path.join("device").exists(),
            };

            if let Some(output) = ethtool(&[name.as_str()]) {
                apply_ethtool_settings(&mut nic, &parse_ethtool_settings(&output));
            }
            if let Some(output) = ethtool(&["-k", name.as_str()]) {
                nic.capabilities = parse_ethtool_features(&output);
            }

            nic
        })
        .collect();

    Ok(nics)
}

#[cfg(target_os = "windows")]
fn detect_windows(ctx: &Context) -> Vec<Nic> {
    let args = ["nic", "get", WMIC_NIC_FIELDS, "/format:csv"];
    match run_tool(ctx, "wmic", &args) {
        Some(output) => match parse_wmic_network_adapters(&output) {
            Ok(adapters) => nics_from_adapters(&adapters),
            Err(e) => {
                crate::log_warn!(ctx.logger(), "Unable to parse wmic output: {}", e);
                Vec::new()
            }
        },
        None => Vec::new(),
    }
}

/// Copy link settings from parsed `ethtool <iface>` output onto `nic`
pub fn apply_ethtool_settings(nic: &mut Nic, settings: &HashMap<String, Vec<String>>) {
    let first_known = |key: &str| {
        settings
            .get(key)
            .and_then(|values| values.first())
            .filter(|value| !value.starts_with("Unknown"))
            .cloned()
    };

    nic.speed = first_known("Speed");
    nic.duplex = first_known("Duplex");
    nic.supported_link_modes = settings
        .get("Supported link modes")
        .cloned()
        .unwrap_or_default();
    nic.advertised_link_modes = settings
        .get("Advertised link modes")
        .cloned()
        .unwrap_or_default();
}

/// Parse `ethtool <iface>` output into setting name -> whitespace-split values.
///
/// The header line is skipped. Continuation lines (no colon) extend the
/// previous setting. "Not reported" and "Unknown" values are dropped.
pub fn parse_ethtool_settings(output: &str) -> HashMap<String, Vec<String>> {
    let mut settings: HashMap<String, Vec<String>> = HashMap::new();
    let mut name = String::new();

    for line in output.lines().skip(1) {
        let fields: Vec<&str> = if line.contains(':') {
            let mut parts = line.split(':');
            name = parts.next().unwrap_or_default().trim().to_string();
            let value = parts
                .next()
                .unwrap_or_default()
                .trim()
                .trim_matches(|c| c == '[' || c == ']');
            if value == "Not reported" || value == "Unknown" {
                continue;
            }
            value.split_whitespace().collect()
        } else {
            line.trim()
                .trim_matches(|c| c == '[' || c == ']')
                .split_whitespace()
                .collect()
        };

        if fields.is_empty() {
            continue;
        }
        settings
            .entry(name.clone())
            .or_default()
            .extend(fields.into_iter().map(str::to_string));
    }

    settings
}

/// Parse `ethtool -k <iface>` output, e.g. `tx-checksum-ipv4: off [fixed]`
pub fn parse_ethtool_features(output: &str) -> Vec<NicCapability> {
    output
        .lines()
        .skip(1)
        .filter_map(|line| {
            let (name, state) = line.split_once(':')?;
            let state = state.trim();
            let is_enabled = match state.split_whitespace().next()? {
                "on" => true,
                "off" => false,
                _ => return None,
            };
            Some(NicCapability {
                name: name.trim().to_string(),
                is_enabled,
                can_enable: !state.contains("[fixed]"),
            })
        })
        .collect()
}

/// One row of `Win32_NetworkAdapter`
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Win32NetworkAdapter {
    #[serde(rename = "Description")]
    pub description: Option<String>,
    #[serde(rename = "DeviceID")]
    pub device_id: Option<String>,
    #[serde(rename = "Index", default, deserialize_with = "csv::invalid_option")]
    pub index: Option<u32>,
    #[serde(
        rename = "InterfaceIndex",
        default,
        deserialize_with = "csv::invalid_option"
    )]
    pub interface_index: Option<u32>,
    #[serde(rename = "MACAddress")]
    pub mac_address: Option<String>,
    #[serde(rename = "Manufacturer")]
    pub manufacturer: Option<String>,
    #[serde(rename = "Name")]
    pub name: Option<String>,
    #[serde(rename = "NetConnectionID")]
    pub net_connection_id: Option<String>,
    #[serde(rename = "ProductName")]
    pub product_name: Option<String>,
    #[serde(rename = "ServiceName")]
    pub service_name: Option<String>,
    /// "TRUE"/"FALSE" as printed by wmic
    #[serde(rename = "PhysicalAdapter")]
    pub physical_adapter: Option<String>,
    /// Bits per second
    #[serde(rename = "Speed", default, deserialize_with = "csv::invalid_option")]
    pub speed: Option<u64>,
}

impl Win32NetworkAdapter {
    /// Connection name when set, otherwise the adapter description
    pub fn device_name(&self) -> String {
        match self.net_connection_id.as_deref() {
            Some(id) if !id.trim().is_empty() => id.to_string(),
            _ => self.description.clone().unwrap_or_default(),
        }
    }

    /// Adapters that do not report `PhysicalAdapter` are treated as physical
    pub fn is_virtual(&self) -> bool {
        match self.physical_adapter.as_deref().map(str::trim) {
            Some(flag) if flag.eq_ignore_ascii_case("true") => false,
            Some(flag) if flag.eq_ignore_ascii_case("false") => true,
            _ => false,
        }
    }

    /// Nominal bandwidth as "NMb/s"
    pub fn speed_mbps(&self) -> Option<String> {
        self.speed.map(|bps| format!("{}Mb/s", bps / 1_000_000))
    }
}

/// Parse `wmic nic get ... /format:csv` output.
///
/// wmic emits a leading blank line and `\r\r\n` line endings; both are
/// normalized before the CSV reader sees the data.
pub fn parse_wmic_network_adapters(output: &str) -> std::result::Result<Vec<Win32NetworkAdapter>, csv::Error> {
    let cleaned = output
        .lines()
        .map(|line| line.trim_end_matches('\r'))
        .filter(|line| !line.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n");

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(cleaned.as_bytes());

    reader.deserialize().collect()
}

/// Map WMI adapter rows into NIC records
pub fn nics_from_adapters(adapters: &[Win32NetworkAdapter]) -> Vec<Nic> {
    adapters
        .iter()
        .map(|adapter| {
            let mut nic = Nic::named(adapter.device_name());
            nic.mac_address = adapter.mac_address.clone();
            nic.is_virtual = adapter.is_virtual();
            nic.speed = adapter.speed_mbps();
            nic
        })
        .collect()
}
