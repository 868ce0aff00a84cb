//! Honkai: Star Rail showcase codec.
//!
//! Six relic slots (head, hands, body, feet, planar sphere, link rope), a
//! light cone, eidolons, and sub-stat rolls that track both count and step.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::{de_i64_lenient, Property, Region, SkillLevel, SubStat};

mod decode;
mod encode;

pub use decode::decode;
pub use encode::encode;

pub(crate) const LOG_TARGET: &str = "irminsul::showcase::hsr";

/// How many leading digits of a live relic id the reference catalog omits.
/// Live ids prepend the rarity digit to the catalog piece id space.
pub(crate) const PIECE_ID_PREFIX_LEN: usize = 1;

/// Relic slot, discriminated by the final digit of the live item id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Slot {
    Head,
    Hands,
    Body,
    Feet,
    PlanarSphere,
    LinkRope,
}

impl Slot {
    pub const ALL: [Slot; 6] = [
        Slot::Head,
        Slot::Hands,
        Slot::Body,
        Slot::Feet,
        Slot::PlanarSphere,
        Slot::LinkRope,
    ];

    /// Classify a live item id by its final digit.
    pub fn from_item_id(id: i64) -> Option<Self> {
        match id.rem_euclid(10) {
            1 => Some(Slot::Head),
            2 => Some(Slot::Hands),
            3 => Some(Slot::Body),
            4 => Some(Slot::Feet),
            5 => Some(Slot::PlanarSphere),
            6 => Some(Slot::LinkRope),
            _ => None,
        }
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Slot::Head => write!(f, "head"),
            Slot::Hands => write!(f, "hands"),
            Slot::Body => write!(f, "body"),
            Slot::Feet => write!(f, "feet"),
            Slot::PlanarSphere => write!(f, "planar_sphere"),
            Slot::LinkRope => write!(f, "link_rope"),
        }
    }
}

/// Map the leading UID digit to an account region.
pub fn region_from_uid(uid: &str) -> Region {
    match uid.chars().next() {
        Some('1') | Some('2') => Region::Cn,
        Some('5') => Region::B,
        Some('6') => Region::Na,
        Some('7') => Region::Eu,
        Some('8') => Region::Asia,
        Some('9') => Region::Tw,
        _ => Region::Unknown,
    }
}

// -- Raw showcase API payload ------------------------------------------------

/// One character from the external showcase API. Fields the player has not
/// filled in (an empty slot, no light cone) are simply absent.
#[derive(Debug, Clone, Deserialize)]
pub struct RawCharacter {
    #[serde(deserialize_with = "de_i64_lenient")]
    pub id: i64,
    pub level: u32,
    #[serde(default)]
    pub promotion: u32,
    /// Unlocked eidolon count.
    #[serde(default)]
    pub rank: u32,
    #[serde(default)]
    pub skills: Vec<RawSkill>,
    /// Base stats of the character itself.
    #[serde(default)]
    pub attributes: Vec<RawProperty>,
    /// Stat additions contributed by equipment and traces.
    #[serde(default)]
    pub additions: Vec<RawProperty>,
    pub light_cone: Option<RawLightCone>,
    #[serde(default)]
    pub relics: Vec<RawRelic>,
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
pub struct RawLightCone {
    #[serde(deserialize_with = "de_i64_lenient")]
    pub id: i64,
    pub level: u32,
    /// Superimposition rank.
    #[serde(default)]
    pub rank: u32,
    #[serde(default)]
    pub promotion: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawRelic {
    #[serde(deserialize_with = "de_i64_lenient")]
    pub id: i64,
    #[serde(deserialize_with = "de_i64_lenient")]
    pub set_id: i64,
    #[serde(default)]
    pub level: u32,
    #[serde(default)]
    pub rarity: u32,
    pub main_affix: Option<RawProperty>,
    #[serde(default)]
    pub sub_affix: Vec<RawSubAffix>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawSubAffix {
    pub field: String,
    pub value: f64,
    #[serde(default)]
    pub percent: bool,
    #[serde(default = "one")]
    pub count: u32,
    pub step: Option<u32>,
}

fn one() -> u32 {
    1
}

// -- Encoded storage row -----------------------------------------------------

/// The flat persisted form of one character's build: one scalar column per
/// field, delimited strings for the stat lists. Absent columns mean "not
/// equipped", never "zeroed".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EncodedBuildRow {
    pub avatar_id: i64,
    pub level: u32,
    pub promotion: u32,
    pub rank: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skill_level: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attributes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub additions: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub light_cone_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub light_cone_level: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub light_cone_rank: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub light_cone_promotion: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub head_relic_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub head_relic_set_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub head_relic_level: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub head_relic_rarity: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub head_main_stat: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub head_sub_stats: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub hands_relic_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hands_relic_set_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hands_relic_level: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hands_relic_rarity: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hands_main_stat: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hands_sub_stats: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub body_relic_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body_relic_set_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body_relic_level: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body_relic_rarity: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body_main_stat: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body_sub_stats: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub feet_relic_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feet_relic_set_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feet_relic_level: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feet_relic_rarity: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feet_main_stat: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feet_sub_stats: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub planar_sphere_relic_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub planar_sphere_relic_set_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub planar_sphere_relic_level: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub planar_sphere_relic_rarity: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub planar_sphere_main_stat: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub planar_sphere_sub_stats: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub link_rope_relic_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link_rope_relic_set_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link_rope_relic_level: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link_rope_relic_rarity: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link_rope_main_stat: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link_rope_sub_stats: Option<String>,
}

/// One equipment slot's columns, pulled out of (or written into) a row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SlotColumns {
    pub relic_id: Option<i64>,
    pub set_id: Option<i64>,
    pub level: Option<u32>,
    pub rarity: Option<u32>,
    pub main_stat: Option<String>,
    pub sub_stats: Option<String>,
}

impl SlotColumns {
    /// A slot counts as equipped when its item id column is populated.
    pub fn is_equipped(&self) -> bool {
        self.relic_id.is_some()
    }
}

impl EncodedBuildRow {
    pub fn slot(&self, slot: Slot) -> SlotColumns {
        let (relic_id, set_id, level, rarity, main_stat, sub_stats) = match slot {
            Slot::Head => (
                self.head_relic_id,
                self.head_relic_set_id,
                self.head_relic_level,
                self.head_relic_rarity,
                &self.head_main_stat,
                &self.head_sub_stats,
            ),
            Slot::Hands => (
                self.hands_relic_id,
                self.hands_relic_set_id,
                self.hands_relic_level,
                self.hands_relic_rarity,
                &self.hands_main_stat,
                &self.hands_sub_stats,
            ),
            Slot::Body => (
                self.body_relic_id,
                self.body_relic_set_id,
                self.body_relic_level,
                self.body_relic_rarity,
                &self.body_main_stat,
                &self.body_sub_stats,
            ),
            Slot::Feet => (
                self.feet_relic_id,
                self.feet_relic_set_id,
                self.feet_relic_level,
                self.feet_relic_rarity,
                &self.feet_main_stat,
                &self.feet_sub_stats,
            ),
            Slot::PlanarSphere => (
                self.planar_sphere_relic_id,
                self.planar_sphere_relic_set_id,
                self.planar_sphere_relic_level,
                self.planar_sphere_relic_rarity,
                &self.planar_sphere_main_stat,
                &self.planar_sphere_sub_stats,
            ),
            Slot::LinkRope => (
                self.link_rope_relic_id,
                self.link_rope_relic_set_id,
                self.link_rope_relic_level,
                self.link_rope_relic_rarity,
                &self.link_rope_main_stat,
                &self.link_rope_sub_stats,
            ),
        };
        SlotColumns {
            relic_id,
            set_id,
            level,
            rarity,
            main_stat: main_stat.clone(),
            sub_stats: sub_stats.clone(),
        }
    }

    pub(crate) fn set_slot(&mut self, slot: Slot, columns: SlotColumns) {
        let SlotColumns { relic_id, set_id, level, rarity, main_stat, sub_stats } = columns;
        let targets = match slot {
            Slot::Head => (
                &mut self.head_relic_id,
                &mut self.head_relic_set_id,
                &mut self.head_relic_level,
                &mut self.head_relic_rarity,
                &mut self.head_main_stat,
                &mut self.head_sub_stats,
            ),
            Slot::Hands => (
                &mut self.hands_relic_id,
                &mut self.hands_relic_set_id,
                &mut self.hands_relic_level,
                &mut self.hands_relic_rarity,
                &mut self.hands_main_stat,
                &mut self.hands_sub_stats,
            ),
            Slot::Body => (
                &mut self.body_relic_id,
                &mut self.body_relic_set_id,
                &mut self.body_relic_level,
                &mut self.body_relic_rarity,
                &mut self.body_main_stat,
                &mut self.body_sub_stats,
            ),
            Slot::Feet => (
                &mut self.feet_relic_id,
                &mut self.feet_relic_set_id,
                &mut self.feet_relic_level,
                &mut self.feet_relic_rarity,
                &mut self.feet_main_stat,
                &mut self.feet_sub_stats,
            ),
            Slot::PlanarSphere => (
                &mut self.planar_sphere_relic_id,
                &mut self.planar_sphere_relic_set_id,
                &mut self.planar_sphere_relic_level,
                &mut self.planar_sphere_relic_rarity,
                &mut self.planar_sphere_main_stat,
                &mut self.planar_sphere_sub_stats,
            ),
            Slot::LinkRope => (
                &mut self.link_rope_relic_id,
                &mut self.link_rope_relic_set_id,
                &mut self.link_rope_relic_level,
                &mut self.link_rope_relic_rarity,
                &mut self.link_rope_main_stat,
                &mut self.link_rope_sub_stats,
            ),
        };
        *targets.0 = relic_id;
        *targets.1 = set_id;
        *targets.2 = level;
        *targets.3 = rarity;
        *targets.4 = main_stat;
        *targets.5 = sub_stats;
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
pub struct LightConeEntry {
    pub id: i64,
    pub name: String,
    pub rarity: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RelicSetEntry {
    pub id: i64,
    pub name: String,
    pub pieces: Vec<RelicPieceEntry>,
}

/// Catalog piece ids are a partial view of the live item id space (the
/// rarity prefix is absent), so resolution is a suffix match, never string
/// equality.
#[derive(Debug, Clone, Deserialize)]
pub struct RelicPieceEntry {
    pub id: String,
    pub name: String,
}

/// The static reference data decode joins against.
#[derive(Debug, Clone, Default)]
pub struct Catalogs {
    pub characters: HashMap<i64, CharacterEntry>,
    pub light_cones: HashMap<i64, LightConeEntry>,
    pub relic_sets: HashMap<i64, RelicSetEntry>,
}

// -- Decoded view model ------------------------------------------------------

/// The nested, render-ready reconstruction of a stored build.
#[derive(Debug, Clone, Serialize)]
pub struct DecodedBuild {
    pub character: CharacterRef,
    pub level: u32,
    pub promotion: u32,
    pub eidolons: u32,
    pub light_cone: Option<LightConeRef>,
    pub skills: Vec<SkillLevel>,
    pub attributes: Vec<Property>,
    pub additions: Vec<Property>,
    pub relics: Vec<DecodedRelic>,
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
pub struct LightConeRef {
    pub id: i64,
    pub name: String,
    pub rarity: u32,
    pub level: u32,
    pub rank: u32,
    pub promotion: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct DecodedRelic {
    pub slot: Slot,
    pub id: i64,
    pub set_id: i64,
    pub level: u32,
    pub rarity: u32,
    /// `None` when the set id has no catalog entry.
    pub set_name: Option<String>,
    /// `None` when no catalog piece suffix-matches the item id.
    pub piece_name: Option<String>,
    pub main_stat: Vec<Property>,
    pub sub_stats: Vec<SubStat>,
    pub crit_value: f64,
}
