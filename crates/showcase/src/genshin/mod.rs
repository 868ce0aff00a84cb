//! Genshin Impact showcase codec.
//!
//! Five artifact slots (flower, plume, sands, goblet, circlet), a weapon,
//! constellations, and sub-stat rolls that track count only. The digit
//! tables here are close to, but not the same as, the Star Rail ones; each
//! variant reproduces its own.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::{de_i64_lenient, Property, Region, SkillLevel, SubStat};

mod decode;
mod encode;

pub use decode::decode;
pub use encode::encode;

pub(crate) const LOG_TARGET: &str = "irminsul::showcase::genshin";

/// How many leading digits of a live artifact id the reference catalog
/// omits. Live ids prepend the set-tier digits to the catalog piece id
/// space.
pub(crate) const PIECE_ID_PREFIX_LEN: usize = 2;

/// Artifact slot, discriminated by the final digit of the live item id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Slot {
    Flower,
    Plume,
    Sands,
    Goblet,
    Circlet,
}

impl Slot {
    pub const ALL: [Slot; 5] =
        [Slot::Flower, Slot::Plume, Slot::Sands, Slot::Goblet, Slot::Circlet];

    /// Classify a live item id by its final digit.
    pub fn from_item_id(id: i64) -> Option<Self> {
        match id.rem_euclid(10) {
            1 => Some(Slot::Flower),
            2 => Some(Slot::Plume),
            3 => Some(Slot::Sands),
            4 => Some(Slot::Goblet),
            5 => Some(Slot::Circlet),
            _ => None,
        }
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Slot::Flower => write!(f, "flower"),
            Slot::Plume => write!(f, "plume"),
            Slot::Sands => write!(f, "sands"),
            Slot::Goblet => write!(f, "goblet"),
            Slot::Circlet => write!(f, "circlet"),
        }
    }
}

/// Map the leading UID digit to an account region.
pub fn region_from_uid(uid: &str) -> Region {
    match uid.chars().next() {
        Some('0') => Region::Internal,
        Some('1') | Some('2') | Some('3') => Region::Cn,
        Some('5') => Region::B,
        Some('6') => Region::Na,
        Some('7') => Region::Eu,
        Some('8') => Region::Asia,
        Some('9') => Region::Tw,
        _ => Region::Unknown,
    }
}

// -- Raw showcase API payload ------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct RawCharacter {
    #[serde(deserialize_with = "de_i64_lenient")]
    pub id: i64,
    pub level: u32,
    #[serde(default)]
    pub ascension: u32,
    /// Unlocked constellation count.
    #[serde(default)]
    pub constellation: u32,
    #[serde(default)]
    pub skills: Vec<RawSkill>,
    /// Final combat stats of the character.
    #[serde(default)]
    pub stats: Vec<RawProperty>,
    pub weapon: Option<RawWeapon>,
    #[serde(default)]
    pub artifacts: Vec<RawArtifact>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawSkill {
    #[serde(deserialize_with = "de_i64_lenient")]
    pub id: i64,
    pub level: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawProperty {
    pub field: String,
    pub value: f64,
    #[serde(default)]
    pub percent: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawWeapon {
    #[serde(deserialize_with = "de_i64_lenient")]
    pub id: i64,
    pub level: u32,
    #[serde(default)]
    pub refinement: u32,
    #[serde(default)]
    pub ascension: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawArtifact {
    #[serde(deserialize_with = "de_i64_lenient")]
    pub id: i64,
    #[serde(deserialize_with = "de_i64_lenient")]
    pub set_id: i64,
    #[serde(default)]
    pub level: u32,
    pub main_stat: Option<RawProperty>,
    #[serde(default)]
    pub sub_stats: Vec<RawSubStat>,
}

/// Genshin roll metadata carries a count but no step.
#[derive(Debug, Clone, Deserialize)]
pub struct RawSubStat {
    pub field: String,
    pub value: f64,
    #[serde(default)]
    pub percent: bool,
    #[serde(default = "one")]
    pub count: u32,
}

fn one() -> u32 {
    1
}

// -- Encoded storage row -----------------------------------------------------

/// The flat persisted form of one character's build. No per-slot rarity
/// column in this variant. Absent columns mean "not equipped".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EncodedBuildRow {
    pub avatar_id: i64,
    pub level: u32,
    pub ascension: u32,
    pub constellation: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skill_level: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stats: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub weapon_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weapon_level: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weapon_refinement: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weapon_ascension: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub flower_artifact_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flower_artifact_set_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flower_artifact_level: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flower_main_stat: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flower_sub_stats: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub plume_artifact_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plume_artifact_set_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plume_artifact_level: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plume_main_stat: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plume_sub_stats: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub sands_artifact_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sands_artifact_set_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sands_artifact_level: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sands_main_stat: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sands_sub_stats: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub goblet_artifact_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub goblet_artifact_set_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub goblet_artifact_level: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub goblet_main_stat: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub goblet_sub_stats: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub circlet_artifact_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub circlet_artifact_set_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub circlet_artifact_level: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub circlet_main_stat: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub circlet_sub_stats: Option<String>,
}

/// One artifact slot's columns, pulled out of (or written into) a row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SlotColumns {
    pub artifact_id: Option<i64>,
    pub set_id: Option<i64>,
    pub level: Option<u32>,
    pub main_stat: Option<String>,
    pub sub_stats: Option<String>,
}

impl SlotColumns {
    pub fn is_equipped(&self) -> bool {
        self.artifact_id.is_some()
    }
}

impl EncodedBuildRow {
    pub fn slot(&self, slot: Slot) -> SlotColumns {
        let (artifact_id, set_id, level, main_stat, sub_stats) = match slot {
            Slot::Flower => (
                self.flower_artifact_id,
                self.flower_artifact_set_id,
                self.flower_artifact_level,
                &self.flower_main_stat,
                &self.flower_sub_stats,
            ),
            Slot::Plume => (
                self.plume_artifact_id,
                self.plume_artifact_set_id,
                self.plume_artifact_level,
                &self.plume_main_stat,
                &self.plume_sub_stats,
            ),
            Slot::Sands => (
                self.sands_artifact_id,
                self.sands_artifact_set_id,
                self.sands_artifact_level,
                &self.sands_main_stat,
                &self.sands_sub_stats,
            ),
            Slot::Goblet => (
                self.goblet_artifact_id,
                self.goblet_artifact_set_id,
                self.goblet_artifact_level,
                &self.goblet_main_stat,
                &self.goblet_sub_stats,
            ),
            Slot::Circlet => (
                self.circlet_artifact_id,
                self.circlet_artifact_set_id,
                self.circlet_artifact_level,
                &self.circlet_main_stat,
                &self.circlet_sub_stats,
            ),
        };
        SlotColumns {
            artifact_id,
            set_id,
            level,
            main_stat: main_stat.clone(),
            sub_stats: sub_stats.clone(),
        }
    }

    pub(crate) fn set_slot(&mut self, slot: Slot, columns: SlotColumns) {
        let SlotColumns { artifact_id, set_id, level, main_stat, sub_stats } = columns;
        let targets = match slot {
            Slot::Flower => (
                &mut self.flower_artifact_id,
                &mut self.flower_artifact_set_id,
                &mut self.flower_artifact_level,
                &mut self.flower_main_stat,
                &mut self.flower_sub_stats,
            ),
            Slot::Plume => (
                &mut self.plume_artifact_id,
                &mut self.plume_artifact_set_id,
                &mut self.plume_artifact_level,
                &mut self.plume_main_stat,
                &mut self.plume_sub_stats,
            ),
            Slot::Sands => (
                &mut self.sands_artifact_id,
                &mut self.sands_artifact_set_id,
                &mut self.sands_artifact_level,
                &mut self.sands_main_stat,
                &mut self.sands_sub_stats,
            ),
            Slot::Goblet => (
                &mut self.goblet_artifact_id,
                &mut self.goblet_artifact_set_id,
                &mut self.goblet_artifact_level,
                &mut self.goblet_main_stat,
                &mut self.goblet_sub_stats,
            ),
            Slot::Circlet => (
                &mut self.circlet_artifact_id,
                &mut self.circlet_artifact_set_id,
                &mut self.circlet_artifact_level,
                &mut self.circlet_main_stat,
                &mut self.circlet_sub_stats,
            ),
        };
        *targets.0 = artifact_id;
        *targets.1 = set_id;
        *targets.2 = level;
        *targets.3 = main_stat;
        *targets.4 = sub_stats;
    }
}

// -- Static reference catalogs -----------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct CharacterEntry {
    pub id: i64,
    pub name: String,
    pub rarity: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WeaponEntry {
    pub id: i64,
    pub name: String,
    pub rarity: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ArtifactSetEntry {
    pub id: i64,
    pub name: String,
    pub pieces: Vec<ArtifactPieceEntry>,
}

/// Catalog piece ids omit the live id's set-tier prefix; resolution is a
/// suffix match, never string equality.
#[derive(Debug, Clone, Deserialize)]
pub struct ArtifactPieceEntry {
    pub id: String,
    pub name: String,
}

/// The static reference data decode joins against.
#[derive(Debug, Clone, Default)]
pub struct Catalogs {
    pub characters: HashMap<i64, CharacterEntry>,
    pub weapons: HashMap<i64, WeaponEntry>,
    pub artifact_sets: HashMap<i64, ArtifactSetEntry>,
}

// -- Decoded view model ------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct DecodedBuild {
    pub character: CharacterRef,
    pub level: u32,
    pub ascension: u32,
    pub constellations: u32,
    pub weapon: Option<WeaponRef>,
    pub skills: Vec<SkillLevel>,
    pub stats: Vec<Property>,
    pub artifacts: Vec<DecodedArtifact>,
    /// Resolved set id → equipped piece count, for 2pc/4pc bonus checks
    /// downstream. Counting only; no bonus policy here.
    pub sets: HashMap<i64, u32>,
    pub crit_value: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct CharacterRef {
    pub id: i64,
    pub name: String,
    pub rarity: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct WeaponRef {
    pub id: i64,
    pub name: String,
    pub rarity: u32,
    pub level: u32,
    pub refinement: u32,
    pub ascension: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct DecodedArtifact {
    pub slot: Slot,
    pub id: i64,
    pub set_id: i64,
    pub level: u32,
    /// `None` when the set id has no catalog entry.
    pub set_name: Option<String>,
    /// `None` when no catalog piece suffix-matches the item id.
    pub piece_name: Option<String>,
    pub main_stat: Vec<Property>,
    pub sub_stats: Vec<SubStat>,
    pub crit_value: f64,
}
