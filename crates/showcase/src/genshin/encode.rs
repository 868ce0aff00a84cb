use tracing::warn;

use crate::property::{encode_properties, encode_property, encode_sub_stats};
use crate::types::{Property, SubStat};

use super::{
    EncodedBuildRow, RawArtifact, RawCharacter, RawProperty, Slot, SlotColumns, LOG_TARGET,
};

/// Flatten each raw showcase character into its storage row.
pub fn encode(characters: &[RawCharacter]) -> Vec<EncodedBuildRow> {
    characters.iter().map(encode_character).collect()
}

fn encode_character(character: &RawCharacter) -> EncodedBuildRow {
    let mut row = EncodedBuildRow {
        avatar_id: character.id,
        level: character.level,
        ascension: character.ascension,
        constellation: character.constellation,
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
    if !character.stats.is_empty() {
        row.stats = Some(encode_properties(&to_properties(&character.stats)));
    }

    if let Some(weapon) = &character.weapon {
        row.weapon_id = Some(weapon.id);
        row.weapon_level = Some(weapon.level);
        row.weapon_refinement = Some(weapon.refinement);
        row.weapon_ascension = Some(weapon.ascension);
    }

    for artifact in &character.artifacts {
        let Some(slot) = Slot::from_item_id(artifact.id) else {
            warn!(
                target: LOG_TARGET,
                artifact_id = artifact.id,
                "Dropping artifact with an unclassifiable id."
            );
            continue;
        };
        row.set_slot(slot, encode_artifact(artifact));
    }

    row
}

fn to_properties(raw: &[RawProperty]) -> Vec<Property> {
    raw.iter()
        .map(|p| Property::new(p.field.clone(), p.value, p.percent))
        .collect()
}

fn encode_artifact(artifact: &RawArtifact) -> SlotColumns {
    let sub_stats: Vec<SubStat> = artifact
        .sub_stats
        .iter()
        .map(|stat| SubStat {
            key: stat.field.clone(),
            value: stat.value,
            percent: stat.percent,
            count: stat.count,
            // This variant's roll metadata has no step segment.
            step: None,
        })
        .collect();

    SlotColumns {
        artifact_id: Some(artifact.id),
        set_id: Some(artifact.set_id),
        level: Some(artifact.level),
        main_stat: artifact
            .main_stat
            .as_ref()
            .map(|stat| encode_property(&Property::new(stat.field.clone(), stat.value, stat.percent))),
        sub_stats: if sub_stats.is_empty() {
            None
        } else {
            Some(encode_sub_stats(&sub_stats))
        },
    }
}

#[cfg(test)]
mod tests {
    use super::super::{RawSkill, RawSubStat, RawWeapon};
    use super::*;

    #[test]
    fn artifacts_land_in_their_slot_columns() {
        let character: RawCharacter = serde_json::from_value(serde_json::json!({
            "id": "10000089",
            "level": 90,
            "ascension": 6,
            "constellation": 2,
            "skills": [{"id": 10891, "level": 9}],
            "weapon": {"id": 14509, "level": 90, "refinement": 1, "ascension": 6},
            "artifacts": [{
                "id": 21514,
                "set_id": 215,
                "level": 20,
                "main_stat": {"field": "hydro_dmg", "percent": true, "value": 46.6},
                "sub_stats": [
                    {"field": "crit_rate", "percent": true, "value": 7.0, "count": 2},
                    {"field": "em", "percent": false, "value": 40.0, "count": 1}
                ]
            }]
        }))
        .unwrap();

        let row = &encode(&[character])[0];
        assert_eq!(row.avatar_id, 10000089);
        assert_eq!(row.weapon_id, Some(14509));
        assert_eq!(row.goblet_artifact_id, Some(21514));
        assert_eq!(row.goblet_artifact_set_id, Some(215));
        assert_eq!(row.goblet_artifact_level, Some(20));
        assert_eq!(row.goblet_main_stat.as_deref(), Some("hydro_dmg_percent|46.6"));
        assert_eq!(
            row.goblet_sub_stats.as_deref(),
            Some("crit_rate_percent|7/2,em|40/1")
        );
        assert_eq!(row.skill_level.as_deref(), Some("10891|9,"));
    }

    #[test]
    fn absent_weapon_and_slots_stay_absent() {
        let character = RawCharacter {
            id: 10000002,
            level: 80,
            ascension: 5,
            constellation: 0,
            skills: vec![],
            stats: vec![],
            weapon: None,
            artifacts: vec![],
        };

        let row = &encode(&[character])[0];
        assert_eq!(row.weapon_id, None);
        assert_eq!(row.stats, None);
        for slot in Slot::ALL {
            assert!(!row.slot(slot).is_equipped());
        }
    }

    #[test]
    fn stats_and_skills_use_the_scalar_grammar() {
        let character = RawCharacter {
            id: 10000046,
            level: 90,
            ascension: 6,
            constellation: 1,
            skills: vec![RawSkill { id: 10461, level: 10 }, RawSkill { id: 10462, level: 13 }],
            stats: vec![RawProperty { field: "hp".into(), value: 13795.0, percent: false }],
            weapon: Some(RawWeapon { id: 11510, level: 90, refinement: 5, ascension: 6 }),
            artifacts: vec![RawArtifact {
                id: 21512,
                set_id: 215,
                level: 20,
                main_stat: None,
                sub_stats: vec![RawSubStat {
                    field: "atk".into(),
                    value: 5.8,
                    percent: true,
                    count: 2,
                }],
            }],
        };

        let row = &encode(&[character])[0];
        assert_eq!(row.skill_level.as_deref(), Some("10461|10,10462|13,"));
        assert_eq!(row.stats.as_deref(), Some("hp|13795,"));
        // No step segment in this variant's sub-stat grammar.
        assert_eq!(row.plume_sub_stats.as_deref(), Some("atk_percent|5.8/2"));
        assert_eq!(row.plume_main_stat, None);
    }
}
