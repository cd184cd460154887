//! Memory cache topology detection
//!
//! Linux exposes the cache hierarchy per logical processor:
//!
//! ```text
//! /sys/devices/system/node/nodeN/cpuP/cache/indexI/{type,level,size,shared_cpu_map}
//! ```
//!
//! A cache shared by several processors is listed once under each of them.
//! The raw `shared_cpu_map` bitmap is identical in every copy, so
//! (level, type, bitmap) identifies one physical cache instance.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::Path;

use crate::error::{Error, Result};
use crate::{log_debug, log_warn, Context};

const KB: u64 = 1024;
const MB: u64 = 1024 * KB;
const GB: u64 = 1024 * MB;

/// Kind of data a cache holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemoryCacheType {
    Data,
    Instruction,
    Unified,
}

impl MemoryCacheType {
    /// Classify the payload of a sysfs `type` attribute (newline already stripped).
    /// Anything other than the two split-cache keywords is unified.
    pub fn from_sysfs(value: &str) -> Self {
        match value {
            "Data" => MemoryCacheType::Data,
            "Instruction" => MemoryCacheType::Instruction,
            _ => MemoryCacheType::Unified,
        }
    }

    /// Suffix used in the conventional "L1d"/"L1i"/"L2" labels
    fn label_suffix(&self) -> &'static str {
        match self {
            MemoryCacheType::Data => "d",
            MemoryCacheType::Instruction => "i",
            MemoryCacheType::Unified => "",
        }
    }
}

impl fmt::Display for MemoryCacheType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MemoryCacheType::Data => write!(f, "data"),
            MemoryCacheType::Instruction => write!(f, "instruction"),
            MemoryCacheType::Unified => write!(f, "unified"),
        }
    }
}

/// One physical cache instance and the logical processors sharing it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryCache {
    /// Cache depth, 1 being closest to the core. `None` if `level` was unreadable.
    pub level: Option<u8>,
    /// Data, instruction or unified
    #[serde(rename = "type")]
    pub cache_type: MemoryCacheType,
    /// Size in bytes. `None` if `size` was unreadable.
    pub size_bytes: Option<u64>,
    /// Logical processor IDs, ascending, no duplicates
    pub logical_processors: Vec<u32>,
}

impl MemoryCache {
    /// Short label such as "L1d", "L1i" or "L3"
    pub fn label(&self) -> String {
        match self.level {
            Some(level) => format!("L{}{}", level, self.cache_type.label_suffix()),
            None => format!("L?{}", self.cache_type.label_suffix()),
        }
    }
}

impl fmt::Display for MemoryCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let size = match self.size_bytes {
            Some(bytes) => format_size(bytes),
            None => "unknown size".to_string(),
        };
        let processors = self
            .logical_processors
            .iter()
            .map(|id| id.to_string())
            .collect::<Vec<_>>()
            .join(",");
        write!(
            f,
            "{} {} shared with logical processors: {}",
            self.label(),
            size,
            processors
        )
    }
}

/// Identity of a cache instance within one discovery pass
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct CacheKey {
    level: Option<u8>,
    cache_type: MemoryCacheType,
    shared_cpu_map: String,
}

/// Discover the distinct caches of every logical processor in `node_id`.
///
/// Fails if the node directory or any processor's `cache` directory cannot be
/// listed. Unreadable attributes inside an index directory are logged through
/// the context's logger and degrade that entry instead.
///
/// Records come back ordered by (level, type, sharing bitmap).
pub fn caches_for_node(ctx: &Context, node_id: u32) -> Result<Vec<MemoryCache>> {
    let paths = ctx.paths();
    let node_path = paths.node(node_id);
    let mut caches: BTreeMap<CacheKey, MemoryCache> = BTreeMap::new();

    let processors = list_numbered_entries(&node_path, parse_logical_processor_id)?;

    for &lp_id in &processors {
        let cache_path = paths.node_cpu_cache(node_id, lp_id);
        let indexes = list_numbered_entries(&cache_path, parse_cache_index)?;

        for index in indexes {
            let index_path = paths.node_cpu_cache_index(node_id, lp_id, index);

            let cache_type = match fs::read_to_string(index_path.join("type")) {
                Ok(raw) => MemoryCacheType::from_sysfs(strip_newline(&raw)),
                Err(e) => {
                    log_debug!(
                        ctx.logger(),
                        "Skipping {}: type unreadable: {}",
                        index_path.display(),
                        e
                    );
                    continue;
                }
            };
            let level = cache_level(ctx, &index_path);
            let size_bytes = cache_size_bytes(ctx, &index_path);

            let shared_cpu_map = match fs::read_to_string(index_path.join("shared_cpu_map")) {
                Ok(raw) => strip_newline(&raw).to_string(),
                Err(e) => {
                    log_debug!(
                        ctx.logger(),
                        "Skipping {}: shared_cpu_map unreadable: {}",
                        index_path.display(),
                        e
                    );
                    continue;
                }
            };

            let key = CacheKey {
                level,
                cache_type,
                shared_cpu_map,
            };
            caches
                .entry(key)
                .or_insert_with(|| MemoryCache {
                    level,
                    cache_type,
                    size_bytes,
                    logical_processors: Vec::new(),
                })
                .logical_processors
                .push(lp_id);
        }
    }

    log_debug!(
        ctx.logger(),
        "node{}: {} distinct caches across {} logical processors",
        node_id,
        caches.len(),
        processors.len()
    );

    Ok(caches
        .into_values()
        .map(|mut cache| {
            cache.logical_processors.sort_unstable();
            cache.logical_processors.dedup();
            cache
        })
        .collect())
}

/// Read `indexI/level`. Logs and returns `None` on failure.
fn cache_level(ctx: &Context, index_path: &Path) -> Option<u8> {
    let path = index_path.join("level");
    let raw = match fs::read_to_string(&path) {
        Ok(raw) => raw,
        Err(e) => {
            log_warn!(ctx.logger(), "Unable to read {}: {}", path.display(), e);
            return None;
        }
    };
    let level = parse_level(&raw);
    if level.is_none() {
        log_warn!(
            ctx.logger(),
            "Unable to parse cache level from {:?} in {}",
            raw,
            path.display()
        );
    }
    level
}

/// Read `indexI/size` and scale it to bytes. Logs and returns `None` on failure.
fn cache_size_bytes(ctx: &Context, index_path: &Path) -> Option<u64> {
    let path = index_path.join("size");
    let raw = match fs::read_to_string(&path) {
        Ok(raw) => raw,
        Err(e) => {
            log_warn!(ctx.logger(), "Unable to read {}: {}", path.display(), e);
            return None;
        }
    };
    let size = parse_size_bytes(&raw);
    if size.is_none() {
        log_warn!(
            ctx.logger(),
            "Unable to parse cache size from {:?} in {}",
            raw,
            path.display()
        );
    }
    size
}

/// List `dir` and keep the IDs `parse` extracts from entry names, ascending
fn list_numbered_entries(dir: &Path, parse: fn(&str) -> Option<u32>) -> Result<Vec<u32>> {
    let entries = fs::read_dir(dir).map_err(|e| Error::read_dir(dir, e))?;

    let mut ids = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| Error::read_dir(dir, e))?;
        let name = entry.file_name();
        if let Some(id) = name.to_str().and_then(parse) {
            ids.push(id);
        }
    }
    ids.sort_unstable();
    Ok(ids)
}

/// `cpu12` -> 12. The node-wide `cpumap` and `cpulist` files share the
/// prefix but are not processors.
fn parse_logical_processor_id(name: &str) -> Option<u32> {
    if name == "cpumap" || name == "cpulist" {
        return None;
    }
    numeric_suffix(name, "cpu")
}

/// `index3` -> 3
fn parse_cache_index(name: &str) -> Option<u32> {
    numeric_suffix(name, "index")
}

fn numeric_suffix(name: &str, prefix: &str) -> Option<u32> {
    let digits = name.strip_prefix(prefix)?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

fn strip_newline(raw: &str) -> &str {
    raw.strip_suffix('\n').unwrap_or(raw)
}

/// `"2\n"` -> 2
fn parse_level(raw: &str) -> Option<u8> {
    strip_newline(raw).parse().ok()
}

/// `"256K\n"` -> 262144
fn parse_size_bytes(raw: &str) -> Option<u64> {
    let kib: u64 = strip_newline(raw).strip_suffix('K')?.parse().ok()?;
    kib.checked_mul(KB)
}

/// Human-readable binary size, exact units only ("32 KB", "1 MB", "1536 KB")
pub fn format_size(bytes: u64) -> String {
    if bytes >= GB && bytes % GB == 0 {
        format!("{} GB", bytes / GB)
    } else if bytes >= MB && bytes % MB == 0 {
        format!("{} MB", bytes / MB)
    } else if bytes >= KB && bytes % KB == 0 {
        format!("{} KB", bytes / KB)
    } else {
        format!("{} B", bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::log::{LogLevel, MemoryLogger};
    use std::io;
    use std::path::PathBuf;
    use std::sync::Arc;
    use tempfile::TempDir;

    /// Fake sysfs tree rooted in a temp dir
    struct FakeSysfs {
        dir: TempDir,
    }

    impl FakeSysfs {
        fn new() -> Self {
            Self {
                dir: TempDir::new().unwrap(),
            }
        }

        fn node_path(&self, node: u32) -> PathBuf {
            self.dir
                .path()
                .join(format!("sys/devices/system/node/node{}", node))
        }

        /// Write one cache index with the given attribute files
        fn cache(&self, node: u32, cpu: u32, index: u32, attrs: &[(&str, &str)]) -> &Self {
            let index_path = self
                .node_path(node)
                .join(format!("cpu{}/cache/index{}", cpu, index));
            fs::create_dir_all(&index_path).unwrap();
            for (name, contents) in attrs {
                fs::write(index_path.join(name), contents).unwrap();
            }
            self
        }

        /// Full, well-formed cache index
        fn full_cache(
            &self,
            node: u32,
            cpu: u32,
            index: u32,
            cache_type: &str,
            level: &str,
            size: &str,
            map: &str,
        ) -> &Self {
            self.cache(
                node,
                cpu,
                index,
                &[
                    ("type", &format!("{}\n", cache_type)),
                    ("level", &format!("{}\n", level)),
                    ("size", &format!("{}\n", size)),
                    ("shared_cpu_map", &format!("{}\n", map)),
                ],
            )
        }

        fn file(&self, relative: &str, contents: &str) -> &Self {
            let path = self.dir.path().join(relative);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, contents).unwrap();
            self
        }

        fn context(&self) -> (Context, Arc<MemoryLogger>) {
            let logger = Arc::new(MemoryLogger::new());
            let ctx = Context::with_chroot(self.dir.path()).with_logger(logger.clone());
            (ctx, logger)
        }
    }

    fn find(caches: &[MemoryCache], cache_type: MemoryCacheType) -> Vec<&MemoryCache> {
        caches.iter().filter(|c| c.cache_type == cache_type).collect()
    }

    #[test]
    fn test_type_classification() {
        assert_eq!(MemoryCacheType::from_sysfs("Data"), MemoryCacheType::Data);
        assert_eq!(
            MemoryCacheType::from_sysfs("Instruction"),
            MemoryCacheType::Instruction
        );
        assert_eq!(MemoryCacheType::from_sysfs("Unified"), MemoryCacheType::Unified);
        assert_eq!(MemoryCacheType::from_sysfs("L3 cache"), MemoryCacheType::Unified);
        assert_eq!(MemoryCacheType::from_sysfs("data"), MemoryCacheType::Unified);
    }

    #[test]
    fn test_parse_size_bytes() {
        assert_eq!(parse_size_bytes("256K\n"), Some(256 * 1024));
        assert_eq!(parse_size_bytes("32K\n"), Some(32 * 1024));
        assert_eq!(parse_size_bytes("256\n"), None);
        assert_eq!(parse_size_bytes("K\n"), None);
        assert_eq!(parse_size_bytes(""), None);
    }

    #[test]
    fn test_parse_level() {
        assert_eq!(parse_level("1\n"), Some(1));
        assert_eq!(parse_level("3\n"), Some(3));
        assert_eq!(parse_level("three\n"), None);
        assert_eq!(parse_level("\n"), None);
    }

    #[test]
    fn test_logical_processor_filter() {
        assert_eq!(parse_logical_processor_id("cpu0"), Some(0));
        assert_eq!(parse_logical_processor_id("cpu127"), Some(127));
        assert_eq!(parse_logical_processor_id("cpumap"), None);
        assert_eq!(parse_logical_processor_id("cpulist"), None);
        assert_eq!(parse_logical_processor_id("cpu"), None);
        assert_eq!(parse_logical_processor_id("meminfo"), None);
        assert_eq!(parse_cache_index("index2"), Some(2));
        assert_eq!(parse_cache_index("uevent"), None);
    }

    #[test]
    fn test_two_processors_shared_data_private_instruction() {
        let sysfs = FakeSysfs::new();
        sysfs
            .full_cache(0, 0, 0, "Data", "1", "32K", "00000003")
            .full_cache(0, 0, 1, "Instruction", "1", "32K", "00000001")
            .full_cache(0, 1, 0, "Data", "1", "32K", "00000003")
            .full_cache(0, 1, 1, "Instruction", "1", "32K", "00000002");
        let (ctx, _) = sysfs.context();

        let caches = caches_for_node(&ctx, 0).unwrap();

        assert_eq!(caches.len(), 3);
        let data = find(&caches, MemoryCacheType::Data);
        assert_eq!(data.len(), 1);
        assert_eq!(data[0].logical_processors, vec![0, 1]);
        assert_eq!(data[0].level, Some(1));
        assert_eq!(data[0].size_bytes, Some(32 * 1024));

        let mut instruction: Vec<Vec<u32>> = find(&caches, MemoryCacheType::Instruction)
            .into_iter()
            .map(|c| c.logical_processors.clone())
            .collect();
        instruction.sort();
        assert_eq!(instruction, vec![vec![0], vec![1]]);
    }

    #[test]
    fn test_shared_cache_reported_by_many_processors_is_one_record() {
        let sysfs = FakeSysfs::new();
        for cpu in 0..4 {
            sysfs.full_cache(0, cpu, 3, "Unified", "3", "8192K", "0000000f");
        }
        let (ctx, _) = sysfs.context();

        let caches = caches_for_node(&ctx, 0).unwrap();

        assert_eq!(caches.len(), 1);
        assert_eq!(caches[0].logical_processors, vec![0, 1, 2, 3]);
        assert_eq!(caches[0].size_bytes, Some(8 * 1024 * 1024));
    }

    #[test]
    fn test_processor_list_sorted_and_unique() {
        let sysfs = FakeSysfs::new();
        for cpu in [10, 2, 7, 31] {
            sysfs.full_cache(0, cpu, 2, "Unified", "2", "1024K", "80000484");
        }
        let (ctx, _) = sysfs.context();

        let caches = caches_for_node(&ctx, 0).unwrap();

        assert_eq!(caches.len(), 1);
        assert_eq!(caches[0].logical_processors, vec![2, 7, 10, 31]);
        for cache in &caches {
            assert!(cache
                .logical_processors
                .windows(2)
                .all(|pair| pair[0] < pair[1]));
        }
    }

    #[test]
    fn test_level_and_type_separate_same_bitmap() {
        let sysfs = FakeSysfs::new();
        sysfs
            .full_cache(0, 0, 0, "Data", "1", "48K", "00000001")
            .full_cache(0, 0, 1, "Instruction", "1", "32K", "00000001")
            .full_cache(0, 0, 2, "Unified", "2", "2048K", "00000001");
        let (ctx, _) = sysfs.context();

        let caches = caches_for_node(&ctx, 0).unwrap();

        let labels: Vec<String> = caches.iter().map(|c| c.label()).collect();
        assert_eq!(labels, vec!["L1d", "L1i", "L2"]);
    }

    #[test]
    fn test_cpumap_and_cpulist_are_not_processors() {
        let sysfs = FakeSysfs::new();
        sysfs
            .full_cache(0, 0, 0, "Data", "1", "32K", "00000001")
            .file("sys/devices/system/node/node0/cpumap", "00000001\n")
            .file("sys/devices/system/node/node0/cpulist", "0\n")
            .file("sys/devices/system/node/node0/meminfo", "Node 0 MemTotal: 1 kB\n");
        let (ctx, _) = sysfs.context();

        let caches = caches_for_node(&ctx, 0).unwrap();

        assert_eq!(caches.len(), 1);
        assert_eq!(caches[0].logical_processors, vec![0]);
    }

    #[test]
    fn test_missing_size_degrades_to_unknown() {
        let sysfs = FakeSysfs::new();
        sysfs.cache(
            0,
            0,
            0,
            &[
                ("type", "Data\n"),
                ("level", "1\n"),
                ("shared_cpu_map", "00000001\n"),
            ],
        );
        let (ctx, logger) = sysfs.context();

        let caches = caches_for_node(&ctx, 0).unwrap();

        assert_eq!(caches.len(), 1);
        assert_eq!(caches[0].size_bytes, None);
        assert_eq!(caches[0].level, Some(1));
        let warnings = logger.messages_at_least(LogLevel::Warn);
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("size"));
    }

    #[test]
    fn test_unparsable_level_degrades_to_unknown() {
        let sysfs = FakeSysfs::new();
        sysfs.full_cache(0, 0, 0, "Unified", "two", "512K", "00000001");
        let (ctx, logger) = sysfs.context();

        let caches = caches_for_node(&ctx, 0).unwrap();

        assert_eq!(caches[0].level, None);
        assert_eq!(caches[0].size_bytes, Some(512 * 1024));
        assert_eq!(caches[0].label(), "L?");
        assert!(logger.messages_at_least(LogLevel::Warn)[0].contains("level"));
    }

    #[test]
    fn test_missing_type_or_bitmap_skips_entry() {
        let sysfs = FakeSysfs::new();
        sysfs
            .cache(0, 0, 0, &[("level", "1\n"), ("size", "32K\n"), ("shared_cpu_map", "1\n")])
            .cache(0, 0, 1, &[("type", "Instruction\n"), ("level", "1\n"), ("size", "32K\n")])
            .full_cache(0, 0, 2, "Unified", "2", "1024K", "00000001");
        let (ctx, logger) = sysfs.context();

        let caches = caches_for_node(&ctx, 0).unwrap();

        assert_eq!(caches.len(), 1);
        assert_eq!(caches[0].cache_type, MemoryCacheType::Unified);
        assert!(logger.messages_at_least(LogLevel::Warn).is_empty());
    }

    #[test]
    fn test_non_index_entries_in_cache_dir_ignored() {
        let sysfs = FakeSysfs::new();
        sysfs
            .full_cache(0, 0, 0, "Data", "1", "32K", "00000001")
            .file("sys/devices/system/node/node0/cpu0/cache/uevent", "");
        let (ctx, _) = sysfs.context();

        assert_eq!(caches_for_node(&ctx, 0).unwrap().len(), 1);
    }

    #[test]
    fn test_missing_node_is_fatal() {
        let sysfs = FakeSysfs::new();
        sysfs.full_cache(0, 0, 0, "Data", "1", "32K", "00000001");
        let (ctx, _) = sysfs.context();

        let err = caches_for_node(&ctx, 5).unwrap_err();
        assert_eq!(err.io_kind(), Some(io::ErrorKind::NotFound));
        assert!(err.to_string().contains("node5"));
    }

    #[test]
    fn test_missing_processor_cache_dir_is_fatal() {
        let sysfs = FakeSysfs::new();
        sysfs.full_cache(0, 0, 0, "Data", "1", "32K", "00000001");
        fs::create_dir_all(sysfs.node_path(0).join("cpu1")).unwrap();
        let (ctx, _) = sysfs.context();

        let err = caches_for_node(&ctx, 0).unwrap_err();
        assert!(matches!(err, Error::ReadDir { .. }));
        assert!(err.to_string().contains("cpu1"));
    }

    #[test]
    fn test_discovery_is_deterministic() {
        let sysfs = FakeSysfs::new();
        for cpu in 0..3 {
            sysfs
                .full_cache(0, cpu, 0, "Data", "1", "32K", &format!("{:08x}", 1 << cpu))
                .full_cache(0, cpu, 1, "Unified", "2", "1024K", "00000007");
        }
        let (ctx, _) = sysfs.context();

        let first = caches_for_node(&ctx, 0).unwrap();
        let second = caches_for_node(&ctx, 0).unwrap();

        assert_eq!(first, second);
        assert_eq!(first.len(), 4);
    }

    #[test]
    fn test_display_and_format_size() {
        let cache = MemoryCache {
            level: Some(1),
            cache_type: MemoryCacheType::Data,
            size_bytes: Some(32 * 1024),
            logical_processors: vec![0, 1],
        };
        assert_eq!(
            cache.to_string(),
            "L1d 32 KB shared with logical processors: 0,1"
        );
        assert_eq!(format_size(8 * 1024 * 1024), "8 MB");
        assert_eq!(format_size(1536 * 1024), "1536 KB");
        assert_eq!(format_size(512), "512 B");
    }

    #[test]
    fn test_serializes_type_field() {
        let cache = MemoryCache {
            level: Some(2),
            cache_type: MemoryCacheType::Unified,
            size_bytes: None,
            logical_processors: vec![4],
        };
        let json = serde_json::to_value(&cache).unwrap();
        assert_eq!(json["type"], "unified");
        assert!(json["size_bytes"].is_null());
    }
}
