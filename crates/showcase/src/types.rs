use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

/// A decoded scalar stat: one `key|value` entry of a delimited list.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Property {
    pub key: String,
    pub value: f64,
    /// Whether the value is percentage-based. Carried in the encoded form as
    /// a `_percent` suffix on the key.
    pub percent: bool,
}

impl Property {
    pub fn new(key: impl Into<String>, value: f64, percent: bool) -> Self {
        Self { key: key.into(), value, percent }
    }
}

/// A decoded sub-stat with its upgrade-roll metadata.
///
/// `count` and `step` distinguish several rolls into the same stat from one
/// large roll, which downstream crit-value scoring depends on.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubStat {
    pub key: String,
    pub value: f64,
    pub percent: bool,
    pub count: u32,
    pub step: Option<u32>,
}

/// A skill/talent id paired with its leveled value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SkillLevel {
    pub id: i64,
    pub level: u32,
}

/// Account region, derived from the leading digit of a player UID.
/// The digit table differs per game and lives with each codec variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Region {
    Internal,
    Cn,
    Na,
    Eu,
    Asia,
    Tw,
    B,
    Unknown,
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Region::Internal => write!(f, "Internal"),
            Region::Cn => write!(f, "CN"),
            Region::Na => write!(f, "NA"),
            Region::Eu => write!(f, "EU"),
            Region::Asia => write!(f, "ASIA"),
            Region::Tw => write!(f, "TW"),
            Region::B => write!(f, "B"),
            Region::Unknown => write!(f, "Unknown"),
        }
    }
}

/// Crit score over decoded sub-stats: crit damage plus twice crit rate.
/// A derived display heuristic, not part of the stored fields.
pub fn crit_value(sub_stats: &[SubStat]) -> f64 {
    sub_stats
        .iter()
        .map(|s| match s.key.as_str() {
            "crit_dmg" => s.value,
            "crit_rate" => 2.0 * s.value,
            _ => 0.0,
        })
        .sum()
}

/// Showcase APIs are inconsistent about numeric identifiers: the same field
/// arrives as a JSON number in one payload and a quoted string in the next.
pub(crate) fn de_i64_lenient<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumOrStr {
        Num(i64),
        Str(String),
    }

    match NumOrStr::deserialize(deserializer)? {
        NumOrStr::Num(n) => Ok(n),
        NumOrStr::Str(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}
