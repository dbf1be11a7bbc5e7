//! Parsers for the pseudo-file and tool-output micro-formats.
//!
//! These are pure functions that parse raw text into structured values. They
//! never touch the filesystem, so each one is testable with string inputs.

use crate::collector::error::ParseError;
use crate::model::NicFeatures;
use std::collections::{BTreeMap, BTreeSet};
use std::str::FromStr;

/// One `key: value` block from `/proc/cpuinfo`, describing a logical processor.
pub type AttributeBlock = BTreeMap<String, String>;

/// Arbitrary-width bitmask decoded from a sysfs hex mask such as `cpumap`.
///
/// Words are stored least significant first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Bitmask {
    words: Vec<u32>,
}

impl Bitmask {
    /// Returns `true` if bit `index` is set.
    pub fn is_set(&self, index: usize) -> bool {
        self.words
            .get(index / 32)
            .is_some_and(|word| word & (1 << (index % 32)) != 0)
    }

    /// Returns the set bit positions in `[0, limit)`.
    ///
    /// Bits at or beyond `limit` are ignored even when set.
    pub fn positions(&self, limit: usize) -> BTreeSet<usize> {
        (0..limit).filter(|&i| self.is_set(i)).collect()
    }
}

/// Parses a hexadecimal bitmask.
///
/// Accepts a single hex string (optionally `0x` prefixed) of any length, or a
/// list of 32-bit words separated by `,` or `:` with the most significant word
/// first, as the kernel prints `cpumap` on large hosts:
/// `00000000,00000f0f`.
pub fn parse_hex_bitmask(content: &str) -> Result<Bitmask, ParseError> {
    let content = content.trim();
    let content = content
        .strip_prefix("0x")
        .or_else(|| content.strip_prefix("0X"))
        .unwrap_or(content);
    if content.is_empty() {
        return Err(ParseError::new("empty bitmask"));
    }

    let segments: Vec<&str> = content.split([',', ':']).collect();
    let mut words = Vec::new();

    if segments.len() > 1 {
        for segment in segments.iter().rev() {
            if segment.is_empty() || segment.len() > 8 {
                return Err(ParseError::new(format!(
                    "invalid bitmask word '{}'",
                    segment
                )));
            }
            words.push(parse_hex_word(segment)?);
        }
    } else {
        if !content.is_ascii() {
            return Err(ParseError::new(format!("invalid bitmask '{}'", content)));
        }
        let mut end = content.len();
        while end > 0 {
            let start = end.saturating_sub(8);
            words.push(parse_hex_word(&content[start..end])?);
            end = start;
        }
    }

    Ok(Bitmask { words })
}

fn parse_hex_word(word: &str) -> Result<u32, ParseError> {
    if !word.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(ParseError::new(format!("invalid hex word '{}'", word)));
    }
    u32::from_str_radix(word, 16)
        .map_err(|_| ParseError::new(format!("invalid hex word '{}'", word)))
}

/// Parses `/proc/cpuinfo` into one attribute block per logical processor.
///
/// Blocks are separated by blank lines. Every other line must contain a
/// `:`; keys and values are trimmed. A trailing block without a terminating
/// blank line is kept. Empty content yields no blocks.
pub fn parse_cpuinfo(content: &str) -> Result<Vec<AttributeBlock>, ParseError> {
    let mut blocks = Vec::new();
    let mut current = AttributeBlock::new();

    for (lineno, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            if !current.is_empty() {
                blocks.push(std::mem::take(&mut current));
            }
            continue;
        }

        let (key, value) = line.split_once(':').ok_or_else(|| {
            ParseError::new(format!("line {}: expected 'key: value', got '{}'", lineno + 1, line))
        })?;
        current.insert(key.trim().to_string(), value.trim().to_string());
    }

    if !current.is_empty() {
        blocks.push(current);
    }

    Ok(blocks)
}

/// Returns the value of a required key from an attribute block.
pub fn required<'a>(block: &'a AttributeBlock, key: &str) -> Result<&'a str, ParseError> {
    block
        .get(key)
        .map(String::as_str)
        .ok_or_else(|| ParseError::new(format!("missing key '{}'", key)))
}

/// Parses a single trimmed decimal value, as found in `size`, `core_id` and
/// `addr_assign_type`.
pub fn parse_decimal<T: FromStr>(content: &str) -> Result<T, ParseError> {
    let trimmed = content.trim();
    trimmed
        .parse()
        .map_err(|_| ParseError::new(format!("invalid decimal '{}'", trimmed)))
}

/// Parses a hex value without separators, as found in `block_size_bytes`.
pub fn parse_hex_u64(content: &str) -> Result<u64, ParseError> {
    let trimmed = content.trim();
    let digits = trimmed.strip_prefix("0x").unwrap_or(trimmed);
    u64::from_str_radix(digits, 16)
        .map_err(|_| ParseError::new(format!("invalid hex value '{}'", trimmed)))
}

/// Extracts the integer suffix of a `<prefix><N>` entry name such as `node1`
/// or `cpu12`. Returns `None` for names like `cpumap` or `cpulist`.
pub fn parse_indexed_name(name: &str, prefix: &str) -> Option<u32> {
    let suffix = name.strip_prefix(prefix)?;
    if suffix.is_empty() || !suffix.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    suffix.parse().ok()
}

/// Extracts `MemTotal` from `/proc/meminfo`, in bytes.
pub fn parse_meminfo_total(content: &str) -> Result<u64, ParseError> {
    for line in content.lines() {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        if key.trim() != "MemTotal" {
            continue;
        }
        let kib: u64 = value
            .split_whitespace()
            .next()
            .ok_or_else(|| ParseError::new("empty MemTotal"))
            .and_then(parse_decimal)?;
        return kib_to_bytes(kib);
    }
    Err(ParseError::new("missing MemTotal"))
}

/// Decodes a `hugepages-<size>kB` directory name into a page size in bytes.
pub fn parse_hugepage_size(name: &str) -> Result<u64, ParseError> {
    let kib = name
        .strip_prefix("hugepages-")
        .and_then(|rest| rest.strip_suffix("kB"))
        .ok_or_else(|| ParseError::new(format!("unexpected hugepage entry '{}'", name)))?;
    let kib: u64 = parse_decimal(kib)?;
    kib_to_bytes(kib)
}

/// Converts a kibibyte count to bytes, failing when it does not fit in `u64`.
pub fn kib_to_bytes(kib: u64) -> Result<u64, ParseError> {
    kib.checked_mul(1024)
        .ok_or_else(|| ParseError::new(format!("{} kB overflows a byte count", kib)))
}

/// Extracts the serial number from a `/dev/disk/by-id` link name.
///
/// The serial is the token between the first and second hyphen:
/// `scsi-3600508e000000000f8253aac9a1abd0c` yields
/// `3600508e000000000f8253aac9a1abd0c`. Names without a hyphen yield `None`.
pub fn serial_from_link_name(name: &str) -> Option<&str> {
    name.split('-').nth(1).filter(|serial| !serial.is_empty())
}

/// Parses `udevadm info --query=property` output (`KEY=VALUE` lines).
pub fn parse_udev_properties(content: &str) -> BTreeMap<String, String> {
    content
        .lines()
        .filter_map(|line| line.split_once('='))
        .map(|(key, value)| (key.trim().to_string(), value.trim().to_string()))
        .filter(|(key, _)| !key.is_empty())
        .collect()
}

/// Parses `ethtool -k <iface>` output.
///
/// The first line is a header and is skipped, as is any line that does not
/// split into exactly two `:`-delimited parts. A feature is enabled when its
/// state token is `on`; a trailing annotation such as `[fixed]` is ignored.
pub fn parse_feature_report(content: &str) -> NicFeatures {
    let mut features = NicFeatures::default();

    for line in content.lines().skip(1) {
        let parts: Vec<&str> = line.split(':').collect();
        if parts.len() != 2 {
            continue;
        }
        let name = parts[0].trim();
        if name.is_empty() {
            continue;
        }
        features.all.insert(name.to_string());
        if parts[1].split_whitespace().next() == Some("on") {
            features.enabled.insert(name.to_string());
        }
    }

    features
}
