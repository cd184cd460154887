//! DMI/SMBIOS identifiers
//!
//! Linux publishes the firmware tables as one small text file per field under
//! /sys/class/dmi/id. Serial numbers and UUIDs are usually root-only; those
//! come back as "unknown" for unprivileged callers.

use serde::{Deserialize, Serialize};
use std::fs;

use crate::{log_warn, Context};

/// Placeholder for any field that could not be read
pub const UNKNOWN: &str = "unknown";

/// Read one DMI field, trimmed. Logs and returns [`UNKNOWN`] on failure.
pub fn item(ctx: &Context, name: &str) -> String {
    let path = ctx.paths().dmi_item(name);
    match fs::read_to_string(&path) {
        Ok(contents) => contents.trim().to_string(),
        Err(e) => {
            log_warn!(ctx.logger(), "Unable to read {}: {}", name, e);
            UNKNOWN.to_string()
        }
    }
}

/// BIOS information
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BiosInfo {
    pub vendor: String,
    pub version: String,
    pub date: String,
}

impl BiosInfo {
    pub fn detect(ctx: &Context) -> Self {
        BiosInfo {
            vendor: item(ctx, "bios_vendor"),
            version: item(ctx, "bios_version"),
            date: item(ctx, "bios_date"),
        }
    }
}

/// Baseboard (motherboard) information
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaseboardInfo {
    pub vendor: String,
    pub product: String,
    pub version: String,
    pub serial_number: String,
    pub asset_tag: String,
}

impl BaseboardInfo {
    pub fn detect(ctx: &Context) -> Self {
        BaseboardInfo {
            vendor: item(ctx, "board_vendor"),
            product: item(ctx, "board_name"),
            version: item(ctx, "board_version"),
            serial_number: item(ctx, "board_serial"),
            asset_tag: item(ctx, "board_asset_tag"),
        }
    }
}

/// Chassis information
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChassisInfo {
    pub vendor: String,
    /// Raw SMBIOS chassis type code (e.g. "3")
    pub chassis_type: String,
    /// Readable name of `chassis_type` (e.g. "Desktop")
    pub type_description: String,
    pub version: String,
    pub serial_number: String,
    pub asset_tag: String,
}

impl ChassisInfo {
    pub fn detect(ctx: &Context) -> Self {
        let chassis_type = item(ctx, "chassis_type");
        let type_description = chassis_type_description(&chassis_type).to_string();
        ChassisInfo {
            vendor: item(ctx, "chassis_vendor"),
            chassis_type,
            type_description,
            version: item(ctx, "chassis_version"),
            serial_number: item(ctx, "chassis_serial"),
            asset_tag: item(ctx, "chassis_asset_tag"),
        }
    }
}

/// Product (system) information
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductInfo {
    pub vendor: String,
    pub name: String,
    pub family: String,
    pub version: String,
    pub serial_number: String,
    pub uuid: String,
    pub sku: String,
}

impl ProductInfo {
    pub fn detect(ctx: &Context) -> Self {
        ProductInfo {
            vendor: item(ctx, "sys_vendor"),
            name: item(ctx, "product_name"),
            family: item(ctx, "product_family"),
            version: item(ctx, "product_version"),
            serial_number: item(ctx, "product_serial"),
            uuid: item(ctx, "product_uuid"),
            sku: item(ctx, "product_sku"),
        }
    }
}

/// All DMI records
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DmiInfo {
    pub bios: BiosInfo,
    pub baseboard: BaseboardInfo,
    pub chassis: ChassisInfo,
    pub product: ProductInfo,
}

impl DmiInfo {
    pub fn detect(ctx: &Context) -> Self {
        DmiInfo {
            bios: BiosInfo::detect(ctx),
            baseboard: BaseboardInfo::detect(ctx),
            chassis: ChassisInfo::detect(ctx),
            product: ProductInfo::detect(ctx),
        }
    }
}

/// SMBIOS 3.x chassis type names (DSP0134, table 17)
pub fn chassis_type_description(code: &str) -> &'static str {
    match code {
        "1" => "Other",
        "2" => "Unknown",
        "3" => "Desktop",
        "4" => "Low profile desktop",
        "5" => "Pizza box",
        "6" => "Mini tower",
        "7" => "Tower",
        "8" => "Portable",
        "9" => "Laptop",
        "10" => "Notebook",
        "11" => "Hand held",
        "12" => "Docking station",
        "13" => "All in one",
        "14" => "Sub notebook",
        "15" => "Space-saving",
        "16" => "Lunch box",
        "17" => "Main server chassis",
        "18" => "Expansion chassis",
        "19" => "SubChassis",
        "20" => "Bus Expansion chassis",
        "21" => "Peripheral chassis",
        "22" => "RAID chassis",
        "23" => "Rack mount chassis",
        "24" => "Sealed-case PC",
        "25" => "Multi-system chassis",
        "26" => "Compact PCI",
        "27" => "Advanced TCA",
        "28" => "Blade",
        "29" => "Blade enclosure",
        "30" => "Tablet",
        "31" => "Convertible",
        "32" => "Detachable",
        "33" => "IoT gateway",
        "34" => "Embedded PC",
        "35" => "Mini PC",
        "36" => "Stick PC",
        _ => UNKNOWN,
    }
}
