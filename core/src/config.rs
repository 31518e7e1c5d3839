//! Reconciliation policy, loaded once at startup from a JSON document.
//!
//! The document uses the server mod's camelCase keys. Every switch has a
//! default so that partial documents load; `default_test()` is the policy
//! used by unit and integration tests.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct KeepConfig {
    /// Master switch. When off every session takes the default path.
    pub active: bool,
    /// Adopt the whole post-session inventory.
    pub keep_items_found_in_raid: bool,
    /// Graft the post-session protected container onto the pre-session inventory.
    pub keep_items_in_secure_container: bool,
    pub retain_found_in_raid_status: bool,
    pub save_vitality: bool,
    pub keep_quest_items: bool,
    pub killer_messages: bool,
    pub victim_messages: bool,
    pub use_sacred_amulet: bool,
    pub profile_saving: ProfileSaving,
    pub equipment_saving: EquipmentSaving,
}

impl Default for KeepConfig {
    fn default() -> Self {
        Self {
            active: true,
            keep_items_found_in_raid: false,
            keep_items_in_secure_container: true,
            retain_found_in_raid_status: false,
            save_vitality: false,
            keep_quest_items: true,
            killer_messages: true,
            victim_messages: true,
            use_sacred_amulet: false,
            profile_saving: ProfileSaving::default(),
            equipment_saving: EquipmentSaving::default(),
        }
    }
}

/// One switch per mergeable profile field.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct ProfileSaving {
    pub level: bool,
    pub experience: bool,
    pub skills: bool,
    pub encyclopedia: bool,
    pub quest_progress: bool,
    pub survivor_class: bool,
    pub stats: bool,
}

impl Default for ProfileSaving {
    fn default() -> Self {
        Self {
            level: true,
            experience: true,
            skills: true,
            encyclopedia: true,
            quest_progress: true,
            survivor_class: true,
            stats: true,
        }
    }
}

impl ProfileSaving {
    pub fn none() -> Self {
        Self {
            level: false,
            experience: false,
            skills: false,
            encyclopedia: false,
            quest_progress: false,
            survivor_class: false,
            stats: false,
        }
    }
}

/// Per-slot equipment retention. Loaded and exposed here; the equipment
/// handling that reads it lives with the inventory collaborator.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct EquipmentSaving(pub BTreeMap<String, bool>);

impl EquipmentSaving {
    pub const SLOTS: [&'static str; 15] = [
        "FirstPrimaryWeapon",
        "SecondPrimaryWeapon",
        "Holster",
        "Scabbard",
        "Backpack",
        "SecuredContainer",
        "TacticalVest",
        "ArmorVest",
        "Pockets",
        "Eyewear",
        "FaceCover",
        "Headwear",
        "Earpiece",
        "Dogtag",
        "ArmBand",
    ];

    /// Unknown slots are not saved.
    pub fn is_saved(&self, slot: &str) -> bool {
        self.0.get(slot).copied().unwrap_or(false)
    }

    pub fn unknown_slots(&self) -> Vec<&str> {
        self.0
            .keys()
            .map(String::as_str)
            .filter(|slot| !Self::SLOTS.contains(slot))
            .collect()
    }
}

impl KeepConfig {
    /// Load the policy document at `path`.
    /// In tests, use KeepConfig::default_test().
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
        let config: KeepConfig = serde_json::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Cannot parse {path}: {e}"))?;
        for slot in config.equipment_saving.unknown_slots() {
            log::warn!("config: equipmentSaving names unknown slot '{slot}'");
        }
        Ok(config)
    }

    /// Config with hardcoded defaults for use in tests: every profile field
    /// saved, protected container kept, nothing else retained.
    pub fn default_test() -> Self {
        Self {
            active: true,
            keep_items_found_in_raid: false,
            keep_items_in_secure_container: true,
            retain_found_in_raid_status: false,
            save_vitality: false,
            keep_quest_items: true,
            killer_messages: true,
            victim_messages: true,
            use_sacred_amulet: false,
            profile_saving: ProfileSaving::default(),
            equipment_saving: EquipmentSaving(
                EquipmentSaving::SLOTS
                    .iter()
                    .map(|slot| (slot.to_string(), *slot == "SecuredContainer"))
                    .collect(),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_document_falls_back_to_defaults() {
        let json = r#"{ "keepItemsFoundInRaid": true, "profileSaving": { "level": false } }"#;
        let config: KeepConfig = serde_json::from_str(json).unwrap();

        assert!(config.active);
        assert!(config.keep_items_found_in_raid);
        assert!(!config.profile_saving.level);
        assert!(config.profile_saving.skills, "unspecified switches keep their default");
    }

    #[test]
    fn equipment_saving_reads_slot_table() {
        let json = r#"{ "equipmentSaving": { "Backpack": true, "Holster": false, "Jetpack": true } }"#;
        let config: KeepConfig = serde_json::from_str(json).unwrap();

        assert!(config.equipment_saving.is_saved("Backpack"));
        assert!(!config.equipment_saving.is_saved("Holster"));
        assert!(!config.equipment_saving.is_saved("Headwear"));
        assert_eq!(config.equipment_saving.unknown_slots(), vec!["Jetpack"]);
    }

    #[test]
    fn shipped_policy_matches_test_policy() {
        let path = concat!(env!("CARGO_MANIFEST_DIR"), "/../config/config.json");
        let config = KeepConfig::load(path).unwrap();
        assert_eq!(config, KeepConfig::default_test());
    }
}
