use std::collections::HashMap;

use tracing::{debug, warn};

use crate::error::Error;
use crate::property::{decode_properties, decode_sub_stats};
use crate::types::{crit_value, SkillLevel};

use super::{
    Catalogs, CharacterRef, DecodedBuild, DecodedRelic, EncodedBuildRow, LightConeRef, Slot,
    SlotColumns, LOG_TARGET, PIECE_ID_PREFIX_LEN,
};

/// Reconstitute stored rows into render-ready builds, joined against the
/// static catalogs.
///
/// Length-preserving: one output per input row, `None` where the character
/// id has no catalog entry. Every other unresolved reference nulls only the
/// affected sub-object, and malformed columns decode to empty mappings;
/// nothing here raises.
pub fn decode(rows: &[EncodedBuildRow], catalogs: &Catalogs) -> Vec<Option<DecodedBuild>> {
    rows.iter().map(|row| decode_row(row, catalogs)).collect()
}

fn decode_row(row: &EncodedBuildRow, catalogs: &Catalogs) -> Option<DecodedBuild> {
    let Some(character) = catalogs.characters.get(&row.avatar_id) else {
        // A build for an unknown character is meaningless; callers filter
        // the null out.
        let e = Error::UnresolvedReference { kind: "character", id: row.avatar_id.to_string() };
        warn!(target: LOG_TARGET, error = %e, "Dropping row.");
        return None;
    };

    let light_cone = row.light_cone_id.and_then(|id| match catalogs.light_cones.get(&id) {
        Some(entry) => Some(LightConeRef {
            id,
            name: entry.name.clone(),
            rarity: entry.rarity,
            level: row.light_cone_level.unwrap_or_default(),
            rank: row.light_cone_rank.unwrap_or_default(),
            promotion: row.light_cone_promotion.unwrap_or_default(),
        }),
        None => {
            let e = Error::UnresolvedReference { kind: "light cone", id: id.to_string() };
            debug!(target: LOG_TARGET, error = %e, "Nulling light cone.");
            None
        }
    });

    let skills = row.skill_level.as_deref().map(decode_skills).unwrap_or_default();
    let attributes = row.attributes.as_deref().map(decode_properties).unwrap_or_default();
    let additions = row.additions.as_deref().map(decode_properties).unwrap_or_default();

    let mut relics = Vec::new();
    let mut sets: HashMap<i64, u32> = HashMap::new();
    for slot in Slot::ALL {
        let columns = row.slot(slot);
        if !columns.is_equipped() {
            continue;
        }
        let relic = decode_relic(slot, columns, catalogs);
        *sets.entry(relic.set_id).or_default() += 1;
        relics.push(relic);
    }
    let total_crit_value = relics.iter().map(|relic| relic.crit_value).sum();

    Some(DecodedBuild {
        character: CharacterRef {
            id: character.id,
            name: character.name.clone(),
            rarity: character.rarity,
        },
        level: row.level,
        promotion: row.promotion,
        eidolons: row.rank,
        light_cone,
        skills,
        attributes,
        additions,
        relics,
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

fn decode_relic(slot: Slot, columns: SlotColumns, catalogs: &Catalogs) -> DecodedRelic {
    let id = columns.relic_id.unwrap_or_default();
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
    let relic_crit_value = crit_value(&sub_stats);

    DecodedRelic {
        slot,
        id,
        set_id,
        level: columns.level.unwrap_or_default(),
        rarity: columns.rarity.unwrap_or_default(),
        set_name,
        piece_name,
        main_stat,
        sub_stats,
        crit_value: relic_crit_value,
    }
}

/// Resolve the owning set and the specific piece for a live item id.
///
/// Catalog piece ids omit the live id's rarity prefix, so the piece lookup
/// strips it and suffix-matches instead of comparing whole strings.
fn resolve_piece(
    item_id: i64,
    set_id: i64,
    catalogs: &Catalogs,
) -> (Option<String>, Option<String>) {
    let Some(set) = catalogs.relic_sets.get(&set_id) else {
        debug!(target: LOG_TARGET, set_id, "Relic set missing from catalog.");
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

#[cfg(test)]
mod tests {
    use super::super::{
        encode, CharacterEntry, LightConeEntry, RawCharacter, RelicPieceEntry, RelicSetEntry,
    };
    use super::*;

    fn catalogs() -> Catalogs {
        let mut catalogs = Catalogs::default();
        catalogs.characters.insert(
            1001,
            CharacterEntry { id: 1001, name: "March 7th".to_string(), rarity: 4 },
        );
        catalogs.characters.insert(
            1102,
            CharacterEntry { id: 1102, name: "Seele".to_string(), rarity: 5 },
        );
        catalogs.light_cones.insert(
            23010,
            LightConeEntry { id: 23010, name: "Before Dawn".to_string(), rarity: 5 },
        );
        catalogs.relic_sets.insert(
            104,
            RelicSetEntry {
                id: 104,
                name: "Hunter of Glacial Forest".to_string(),
                pieces: vec![
                    RelicPieceEntry { id: "1041".to_string(), name: "Hunter's Artaius Hood".to_string() },
                    RelicPieceEntry { id: "1044".to_string(), name: "Hunter's Soft Elkskin Boots".to_string() },
                ],
            },
        );
        catalogs
    }

    fn sample_character() -> RawCharacter {
        serde_json::from_value(serde_json::json!({
            "id": 1001,
            "level": 80,
            "promotion": 6,
            "rank": 2,
            "skills": [{"id": 5, "level": 8}, {"id": 6, "level": 10}],
            "attributes": [{"field": "hp", "value": 1058.4, "percent": false}],
            "additions": [{"field": "crit_rate", "value": 12.4, "percent": true}],
            "light_cone": {"id": 23010, "level": 80, "rank": 1, "promotion": 6},
            "relics": [
                {
                    "id": 61481,
                    "set_id": 104,
                    "level": 15,
                    "rarity": 5,
                    "main_affix": {"field": "hp", "value": 705.6, "percent": false},
                    "sub_affix": [
                        {"field": "crit_rate", "value": 5.8, "percent": true, "count": 2, "step": 1},
                        {"field": "crit_dmg", "value": 11.6, "percent": true, "count": 3, "step": 0}
                    ]
                },
                {
                    "id": 61484,
                    "set_id": 104,
                    "level": 15,
                    "rarity": 5,
                    "main_affix": {"field": "spd", "value": 25.032, "percent": false},
                    "sub_affix": [{"field": "atk", "value": 43.0, "percent": false, "count": 1, "step": 2}]
                }
            ]
        }))
        .unwrap()
    }

    #[test]
    fn round_trip_reproduces_every_numeric_field() {
        let raw = sample_character();
        let rows = encode(std::slice::from_ref(&raw));
        let decoded = decode(&rows, &catalogs());
        let build = decoded[0].as_ref().unwrap();

        assert_eq!(build.character.id, raw.id);
        assert_eq!(build.level, raw.level);
        assert_eq!(build.promotion, raw.promotion);
        assert_eq!(build.eidolons, raw.rank);

        let light_cone = build.light_cone.as_ref().unwrap();
        let raw_cone = raw.light_cone.as_ref().unwrap();
        assert_eq!(light_cone.id, raw_cone.id);
        assert_eq!(light_cone.level, raw_cone.level);
        assert_eq!(light_cone.rank, raw_cone.rank);

        assert_eq!(build.skills.len(), 2);
        assert_eq!(build.skills[0].id, 5);
        assert_eq!(build.skills[0].level, 8);
        assert_eq!(build.attributes[0].value, 1058.4);
        assert_eq!(build.additions[0].value, 12.4);
        assert!(build.additions[0].percent);

        assert_eq!(build.relics.len(), 2);
        let head = build.relics.iter().find(|r| r.slot == Slot::Head).unwrap();
        assert_eq!(head.id, 61481);
        assert_eq!(head.set_id, 104);
        assert_eq!(head.level, 15);
        assert_eq!(head.rarity, 5);
        assert_eq!(head.main_stat[0].value, 705.6);
        assert_eq!(head.sub_stats[0].value, 5.8);
        assert_eq!(head.sub_stats[0].count, 2);
        assert_eq!(head.sub_stats[0].step, Some(1));
        assert_eq!(head.sub_stats[1].count, 3);
    }

    #[test]
    fn catalog_names_are_joined_at_decode_time() {
        let rows = encode(&[sample_character()]);
        let decoded = decode(&rows, &catalogs());
        let build = decoded[0].as_ref().unwrap();

        assert_eq!(build.character.name, "March 7th");
        assert_eq!(build.light_cone.as_ref().unwrap().name, "Before Dawn");

        let head = build.relics.iter().find(|r| r.slot == Slot::Head).unwrap();
        assert_eq!(head.set_name.as_deref(), Some("Hunter of Glacial Forest"));
        assert_eq!(head.piece_name.as_deref(), Some("Hunter's Artaius Hood"));

        let feet = build.relics.iter().find(|r| r.slot == Slot::Feet).unwrap();
        assert_eq!(feet.piece_name.as_deref(), Some("Hunter's Soft Elkskin Boots"));
    }

    #[test]
    fn unknown_character_nulls_the_row_but_preserves_batch_length() {
        let mut stranger = sample_character();
        stranger.id = 9999;
        let rows = encode(&[sample_character(), stranger, sample_character()]);

        let decoded = decode(&rows, &catalogs());
        assert_eq!(decoded.len(), 3);
        assert!(decoded[0].is_some());
        assert!(decoded[1].is_none());
        assert!(decoded[2].is_some());
    }

    #[test]
    fn unknown_light_cone_nulls_only_that_field() {
        let mut raw = sample_character();
        raw.light_cone.as_mut().unwrap().id = 55555;
        let rows = encode(&[raw]);

        let build = decode(&rows, &catalogs())[0].clone().unwrap();
        assert!(build.light_cone.is_none());
        assert_eq!(build.relics.len(), 2);
    }

    #[test]
    fn unknown_set_keeps_the_relic_with_null_names() {
        let mut raw = sample_character();
        raw.relics[0].set_id = 777;
        let rows = encode(&[raw]);

        let build = decode(&rows, &catalogs())[0].clone().unwrap();
        let head = build.relics.iter().find(|r| r.slot == Slot::Head).unwrap();
        assert_eq!(head.set_name, None);
        assert_eq!(head.piece_name, None);
        // Numeric columns still round-trip.
        assert_eq!(head.set_id, 777);
        assert_eq!(head.sub_stats.len(), 2);
    }

    #[test]
    fn sets_mapping_counts_pieces_per_set() {
        let rows = encode(&[sample_character()]);
        let build = decode(&rows, &catalogs())[0].clone().unwrap();

        assert_eq!(build.sets.len(), 1);
        assert_eq!(build.sets[&104], 2);
    }

    #[test]
    fn crit_value_weights_rate_double() {
        let rows = encode(&[sample_character()]);
        let build = decode(&rows, &catalogs())[0].clone().unwrap();

        let head = build.relics.iter().find(|r| r.slot == Slot::Head).unwrap();
        assert!((head.crit_value - (11.6 + 2.0 * 5.8)).abs() < 1e-9);
        // The aggregate is the sum over slots; feet has no crit sub-stats.
        assert!((build.crit_value - head.crit_value).abs() < 1e-9);
    }

    #[test]
    fn malformed_columns_decode_to_empty_mappings() {
        let row = EncodedBuildRow {
            avatar_id: 1102,
            level: 80,
            skill_level: Some("not a stat list".to_string()),
            head_relic_id: Some(61481),
            head_relic_set_id: Some(104),
            head_main_stat: Some("|||".to_string()),
            head_sub_stats: Some("crit_rate|nope/x_y".to_string()),
            ..Default::default()
        };

        let build = decode(std::slice::from_ref(&row), &catalogs())[0].clone().unwrap();
        assert!(build.skills.is_empty());
        let head = &build.relics[0];
        assert!(head.main_stat.is_empty());
        assert!(head.sub_stats.is_empty());
        assert_eq!(head.crit_value, 0.0);
    }

    #[test]
    fn absent_columns_mean_slot_not_equipped() {
        let row = EncodedBuildRow { avatar_id: 1102, level: 70, ..Default::default() };
        let build = decode(std::slice::from_ref(&row), &catalogs())[0].clone().unwrap();

        assert!(build.relics.is_empty());
        assert!(build.sets.is_empty());
        assert!(build.skills.is_empty());
        assert_eq!(build.crit_value, 0.0);
    }
}
