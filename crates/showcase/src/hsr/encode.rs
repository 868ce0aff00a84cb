use tracing::warn;

use crate::property::{encode_properties, encode_property, encode_sub_stats};
use crate::types::{Property, SubStat};

use super::{
    EncodedBuildRow, RawCharacter, RawProperty, RawRelic, Slot, SlotColumns, LOG_TARGET,
};

/// Flatten each raw showcase character into its storage row.
///
/// Never fails on a well-formed payload: optional fields that are absent
/// upstream stay absent in the row, and a relic whose id classifies to no
/// slot is dropped with a warning.
pub fn encode(characters: &[RawCharacter]) -> Vec<EncodedBuildRow> {
    characters.iter().map(encode_character).collect()
}

fn encode_character(character: &RawCharacter) -> EncodedBuildRow {
    let mut row = EncodedBuildRow {
        avatar_id: character.id,
        level: character.level,
        promotion: character.promotion,
        rank: character.rank,
        ..Default::default()
    };

    if !character.skills.is_empty() {
        let skills: Vec<Property> = character
            .skills
            .iter()
            .map(|skill| Property::new(skill.id.to_string(), skill.level as f64, false))
            .collect();
        row.skill_level = Some(encode_properties(&skills));
    }
    if !character.attributes.is_empty() {
        row.attributes = Some(encode_properties(&to_properties(&character.attributes)));
    }
    if !character.additions.is_empty() {
        row.additions = Some(encode_properties(&to_properties(&character.additions)));
    }

    if let Some(light_cone) = &character.light_cone {
        row.light_cone_id = Some(light_cone.id);
        row.light_cone_level = Some(light_cone.level);
        row.light_cone_rank = Some(light_cone.rank);
        row.light_cone_promotion = Some(light_cone.promotion);
    }

    for relic in &character.relics {
        let Some(slot) = Slot::from_item_id(relic.id) else {
            warn!(
                target: LOG_TARGET,
                relic_id = relic.id,
                "Dropping relic with an unclassifiable id."
            );
            continue;
        };
        row.set_slot(slot, encode_relic(relic));
    }

    row
}

fn to_properties(raw: &[RawProperty]) -> Vec<Property> {
    raw.iter()
        .map(|p| Property::new(p.field.clone(), p.value, p.percent))
        .collect()
}

fn encode_relic(relic: &RawRelic) -> SlotColumns {
    let sub_stats: Vec<SubStat> = relic
        .sub_affix
        .iter()
        .map(|affix| SubStat {
            key: affix.field.clone(),
            value: affix.value,
            percent: affix.percent,
            count: affix.count,
            step: affix.step,
        })
        .collect();

    SlotColumns {
        relic_id: Some(relic.id),
        set_id: Some(relic.set_id),
        level: Some(relic.level),
        rarity: Some(relic.rarity),
        main_stat: relic
            .main_affix
            .as_ref()
            .map(|affix| encode_property(&Property::new(affix.field.clone(), affix.value, affix.percent))),
        sub_stats: if sub_stats.is_empty() {
            None
        } else {
            Some(encode_sub_stats(&sub_stats))
        },
    }
}

#[cfg(test)]
mod tests {
    use super::super::{RawLightCone, RawSkill, RawSubAffix};
    use super::*;

    #[test]
    fn concrete_character_encodes_to_documented_columns() {
        let character: RawCharacter = serde_json::from_value(serde_json::json!({
            "id": 1001,
            "level": 80,
            "relics": [{
                "id": "61484",
                "set_id": 104,
                "rarity": 5,
                "level": 15,
                "main_affix": {"field": "hp", "percent": false, "value": 2222},
                "sub_affix": [{"field": "atk", "percent": true, "value": 5.8, "count": 2, "step": 1}]
            }],
            "skills": [{"id": 5, "level": 8}]
        }))
        .unwrap();

        let rows = encode(&[character]);
        assert_eq!(rows.len(), 1);
        let row = &rows[0];

        assert_eq!(row.avatar_id, 1001);
        assert_eq!(row.level, 80);
        assert_eq!(row.feet_relic_id, Some(61484));
        assert_eq!(row.feet_relic_set_id, Some(104));
        assert_eq!(row.feet_relic_level, Some(15));
        assert_eq!(row.feet_relic_rarity, Some(5));
        assert_eq!(row.feet_main_stat.as_deref(), Some("hp|2222"));
        assert_eq!(row.feet_sub_stats.as_deref(), Some("atk_percent|5.8/2_1"));
        assert_eq!(row.skill_level.as_deref(), Some("5|8,"));
    }

    #[test]
    fn absent_optionals_are_omitted_not_zero_filled() {
        let character = RawCharacter {
            id: 1102,
            level: 70,
            promotion: 5,
            rank: 0,
            skills: vec![],
            attributes: vec![],
            additions: vec![],
            light_cone: None,
            relics: vec![],
        };

        let row = &encode(&[character])[0];
        assert_eq!(row.skill_level, None);
        assert_eq!(row.attributes, None);
        assert_eq!(row.light_cone_id, None);
        for slot in Slot::ALL {
            assert!(!row.slot(slot).is_equipped());
        }
    }

    #[test]
    fn light_cone_and_stat_lists_are_carried() {
        let character = RawCharacter {
            id: 1204,
            level: 80,
            promotion: 6,
            rank: 1,
            skills: vec![RawSkill { id: 1204001, level: 10 }],
            attributes: vec![RawProperty { field: "hp".into(), value: 1203.0, percent: false }],
            additions: vec![RawProperty { field: "crit_rate".into(), value: 17.4, percent: true }],
            light_cone: Some(RawLightCone { id: 23010, level: 80, rank: 1, promotion: 6 }),
            relics: vec![],
        };

        let row = &encode(&[character])[0];
        assert_eq!(row.light_cone_id, Some(23010));
        assert_eq!(row.light_cone_rank, Some(1));
        assert_eq!(row.attributes.as_deref(), Some("hp|1203,"));
        assert_eq!(row.additions.as_deref(), Some("crit_rate_percent|17.4,"));
    }

    #[test]
    fn relic_with_unmapped_suffix_is_dropped() {
        let character = RawCharacter {
            id: 1001,
            level: 80,
            promotion: 6,
            rank: 0,
            skills: vec![],
            attributes: vec![],
            additions: vec![],
            light_cone: None,
            relics: vec![RawRelic {
                id: 61489,
                set_id: 104,
                level: 15,
                rarity: 5,
                main_affix: None,
                sub_affix: vec![RawSubAffix {
                    field: "spd".into(),
                    value: 4.0,
                    percent: false,
                    count: 1,
                    step: Some(0),
                }],
            }],
        };

        let row = &encode(&[character])[0];
        for slot in Slot::ALL {
            assert!(!row.slot(slot).is_equipped());
        }
    }
}
