//! The delimited grammar shared by both codec variants.
//!
//! Scalar lists store one `key|value` entry per stat, each entry terminated
//! by `,` (the trailing separator is part of the stored format). Sub-stat
//! lists store `key|value/count` entries (`count_step` where the variant
//! tracks roll steps) joined by `,`. Percent-based stats carry a `_percent`
//! suffix on the key in both forms.
//!
//! Decoding is the tolerant inverse: empty segments are ignored and
//! malformed entries are skipped, since upstream data sources are not fully
//! trusted. An absent column decodes to an empty mapping, not an error.

use tracing::debug;

use crate::types::{Property, SubStat};

pub(crate) const LOG_TARGET: &str = "irminsul::showcase::property";

const ENTRY_SEPARATOR: char = ',';
const FIELD_SEPARATOR: char = '|';
const ROLL_SEPARATOR: char = '/';
const STEP_SEPARATOR: char = '_';

fn encode_key(key: &str, percent: bool) -> String {
    if percent {
        format!("{key}_percent")
    } else {
        key.to_string()
    }
}

fn decode_key(raw: &str) -> (String, bool) {
    match raw.strip_suffix("_percent") {
        Some(key) => (key.to_string(), true),
        None => (raw.to_string(), false),
    }
}

/// Encode a single stat: `key|value`, no entry separator. Used for main
/// stats, which are one-per-column.
pub fn encode_property(property: &Property) -> String {
    format!(
        "{}{}{}",
        encode_key(&property.key, property.percent),
        FIELD_SEPARATOR,
        property.value
    )
}

/// Encode a scalar stat list: `key|value,key|value,` (trailing separator).
pub fn encode_properties(properties: &[Property]) -> String {
    let mut out = String::new();
    for property in properties {
        out.push_str(&encode_key(&property.key, property.percent));
        out.push(FIELD_SEPARATOR);
        out.push_str(&property.value.to_string());
        out.push(ENTRY_SEPARATOR);
    }
    out
}

/// Decode a scalar stat list. Malformed entries are skipped.
pub fn decode_properties(raw: &str) -> Vec<Property> {
    raw.split(ENTRY_SEPARATOR)
        .filter(|segment| !segment.is_empty())
        .filter_map(|segment| {
            let Some((key, value)) = segment.split_once(FIELD_SEPARATOR) else {
                debug!(target: LOG_TARGET, segment, "Skipping entry without a field separator.");
                return None;
            };
            let Ok(value) = value.parse::<f64>() else {
                debug!(target: LOG_TARGET, segment, "Skipping entry with a non-numeric value.");
                return None;
            };
            let (key, percent) = decode_key(key);
            Some(Property { key, value, percent })
        })
        .collect()
}

/// Encode a sub-stat list: `key|value/count` or `key|value/count_step`,
/// joined by the entry separator.
pub fn encode_sub_stats(sub_stats: &[SubStat]) -> String {
    let entries: Vec<String> = sub_stats
        .iter()
        .map(|stat| {
            let mut entry = format!(
                "{}{}{}{}{}",
                encode_key(&stat.key, stat.percent),
                FIELD_SEPARATOR,
                stat.value,
                ROLL_SEPARATOR,
                stat.count,
            );
            if let Some(step) = stat.step {
                entry.push(STEP_SEPARATOR);
                entry.push_str(&step.to_string());
            }
            entry
        })
        .collect();
    entries.join(&ENTRY_SEPARATOR.to_string())
}

/// Decode a sub-stat list. Malformed entries are skipped.
pub fn decode_sub_stats(raw: &str) -> Vec<SubStat> {
    raw.split(ENTRY_SEPARATOR)
        .filter(|segment| !segment.is_empty())
        .filter_map(|segment| {
            let Some((key, rest)) = segment.split_once(FIELD_SEPARATOR) else {
                debug!(target: LOG_TARGET, segment, "Skipping sub-stat without a field separator.");
                return None;
            };
            let Some((value, rolls)) = rest.split_once(ROLL_SEPARATOR) else {
                debug!(target: LOG_TARGET, segment, "Skipping sub-stat without roll metadata.");
                return None;
            };
            let Ok(value) = value.parse::<f64>() else {
                debug!(target: LOG_TARGET, segment, "Skipping sub-stat with a non-numeric value.");
                return None;
            };
            let (count, step) = match rolls.split_once(STEP_SEPARATOR) {
                Some((count, step)) => (count.parse().ok()?, Some(step.parse().ok()?)),
                None => (rolls.parse().ok()?, None),
            };
            let (key, percent) = decode_key(key);
            Some(SubStat { key, value, percent, count, step })
        })
        .collect()
}
