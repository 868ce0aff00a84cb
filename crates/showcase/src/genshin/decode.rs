use std::collections::HashMap;

use tracing::{debug, warn};

use crate::error::Error;
use crate::property::{decode_properties, decode_sub_stats};
use crate::types::{crit_value, SkillLevel};

use super::{
    Catalogs, CharacterRef, DecodedArtifact, DecodedBuild, EncodedBuildRow, Slot, SlotColumns,
    WeaponRef, LOG_TARGET, PIECE_ID_PREFIX_LEN,
};

/// Reconstitute stored rows into render-ready builds, joined against the
/// static catalogs.
///
/// Length-preserving: one output per input row, `None` where the character
/// id has no catalog entry; any other unresolved reference nulls only the
/// affected sub-object.
pub fn decode(rows: &[EncodedBuildRow], catalogs: &Catalogs) -> Vec<Option<DecodedBuild>> {
    rows.iter().map(|row| decode_row(row, catalogs)).collect()
}

fn decode_row(row: &EncodedBuildRow, catalogs: &Catalogs) -> Option<DecodedBuild> {
    let Some(character) = catalogs.characters.get(&row.avatar_id) else {
        let e = Error::UnresolvedReference { kind: "character", id: row.avatar_id.to_string() };
        warn!(target: LOG_TARGET, error = %e, "Dropping row.");
        return None;
    };

    let weapon = row.weapon_id.and_then(|id| match catalogs.weapons.get(&id) {
        Some(entry) => Some(WeaponRef {
            id,
            name: entry.name.clone(),
            rarity: entry.rarity,
            level: row.weapon_level.unwrap_or_default(),
            refinement: row.weapon_refinement.unwrap_or_default(),
            ascension: row.weapon_ascension.unwrap_or_default(),
        }),
        None => {
            let e = Error::UnresolvedReference { kind: "weapon", id: id.to_string() };
            debug!(target: LOG_TARGET, error = %e, "Nulling weapon.");
            None
        }
    });

    let skills = row.skill_level.as_deref().map(decode_skills).unwrap_or_default();
    let stats = row.stats.as_deref().map(decode_properties).unwrap_or_default();

    let mut artifacts = Vec::new();
    let mut sets: HashMap<i64, u32> = HashMap::new();
    for slot in Slot::ALL {
        let columns = row.slot(slot);
        if !columns.is_equipped() {
            continue;
        }
        let artifact = decode_artifact(slot, columns, catalogs);
        *sets.entry(artifact.set_id).or_default() += 1;
        artifacts.push(artifact);
    }
    let total_crit_value = artifacts.iter().map(|artifact| artifact.crit_value).sum();

    Some(DecodedBuild {
        character: CharacterRef {
            id: character.id,
            name: character.name.clone(),
            rarity: character.rarity,
        },
        level: row.level,
        ascension: row.ascension,
        constellations: row.constellation,
        weapon,
        skills,
        stats,
        artifacts,
        sets,
        crit_value: total_crit_value,
    })
}

fn decode_skills(raw: &str) -> Vec<SkillLevel> {
    decode_properties(raw)
        .into_iter()
        .filter_map(|property| {
            let id = property.key.parse().ok()?;
            Some(SkillLevel { id, level: property.value as u32 })
        })
        .collect()
}

fn decode_artifact(slot: Slot, columns: SlotColumns, catalogs: &Catalogs) -> DecodedArtifact {
    let id = columns.artifact_id.unwrap_or_default();
    let set_id = columns.set_id.unwrap_or_default();
    let (set_name, piece_name) = resolve_piece(id, set_id, catalogs);

    let main_stat = match columns.main_stat.as_deref() {
        Some(raw) => {
            let properties = decode_properties(raw);
            if properties.is_empty() && !raw.is_empty() {
                let e = Error::MalformedField { column: "main_stat", raw: raw.to_string() };
                debug!(target: LOG_TARGET, slot = %slot, error = %e, "Treating as empty mapping.");
            }
            properties
        }
        None => Vec::new(),
    };
    let sub_stats = columns.sub_stats.as_deref().map(decode_sub_stats).unwrap_or_default();
    let artifact_crit_value = crit_value(&sub_stats);

    DecodedArtifact {
        slot,
        id,
        set_id,
        level: columns.level.unwrap_or_default(),
        set_name,
        piece_name,
        main_stat,
        sub_stats,
        crit_value: artifact_crit_value,
    }
}

/// Resolve the owning set and the specific piece for a live item id, by
/// suffix match against the catalog's shifted piece id space.
fn resolve_piece(
    item_id: i64,
    set_id: i64,
    catalogs: &Catalogs,
) -> (Option<String>, Option<String>) {
    let Some(set) = catalogs.artifact_sets.get(&set_id) else {
        debug!(target: LOG_TARGET, set_id, "Artifact set missing from catalog.");
        return (None, None);
    };

    let live_id = item_id.to_string();
    let suffix = live_id.get(PIECE_ID_PREFIX_LEN..).unwrap_or_default();
    let piece = set
        .pieces
        .iter()
        .find(|piece| !suffix.is_empty() && piece.id.ends_with(suffix));
    if piece.is_none() {
        debug!(target: LOG_TARGET, item_id, set_id, "No catalog piece matches item id suffix.");
    }

    (Some(set.name.clone()), piece.map(|piece| piece.name.clone()))
}
