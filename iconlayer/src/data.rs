//! Typed boundary structures for game payloads.
//!
//! The backend ships entities as open-ended JSON. This module pins down the
//! fields the image layer consumes; everything else stays in the raw payload
//! and is folded into player state by [`crate::merge`].

use serde::{Deserialize, Serialize};

/// Reference to a game icon by its server-side file path.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IconRef {
    /// Icon file path as the backend reports it, e.g. `crew_icons/cm_kirk`.
    pub file: String,
}

impl IconRef {
    pub fn new(file: impl Into<String>) -> Self {
        Self { file: file.into() }
    }
}

/// Crew member fields relevant to image resolution.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Crew {
    pub name: String,
    /// Head shot shown in list views.
    pub portrait: IconRef,
    /// Full-body render shown in detail views.
    pub full_body: IconRef,
}

/// Ship fields relevant to image resolution.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ship {
    pub name: String,
    pub icon: IconRef,
}

/// Item fields relevant to image resolution.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub name: String,
    /// Numeric rarity index into [`RARITY_NAMES`].
    pub rarity: usize,
    pub icon: IconRef,
}

/// Faction fields relevant to image resolution.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Faction {
    pub name: String,
    pub icon: IconRef,
}

/// Rarity display names indexed by the backend's numeric rarity.
///
/// Item wiki filenames embed the rarity name, so the spelling here must
/// match the wiki's conventions exactly.
pub const RARITY_NAMES: [&str; 6] = [
    "Basic",
    "Common",
    "Uncommon",
    "Rare",
    "Super Rare",
    "Legendary",
];

/// Returns the display name for a rarity index, if it is a known rarity.
pub fn rarity_name(rarity: usize) -> Option<&'static str> {
    RARITY_NAMES.get(rarity).copied()
}

/// Well-known sprites and the atlas bundle each one lives in.
///
/// An empty asset name means the sprite ships as a standalone bundle named
/// after the sprite itself rather than as a sub-sprite of a shared atlas.
const SPRITE_ATLAS: &[(&str, &str)] = &[
    ("mastery_highest_icon", "atlas_stt_icons"),
    ("mastery_medium_icon", "atlas_stt_icons"),
    ("mastery_lowest_icon", "atlas_stt_icons"),
    ("star_reward", "atlas_stt_icons"),
    ("star_reward_inactive", "atlas_stt_icons"),
    ("honor_currency", "atlas_stt_icons"),
    ("icon_command_skill", "atlas_stt_icons"),
    ("icon_diplomacy_skill", "atlas_stt_icons"),
    ("icon_engineering_skill", "atlas_stt_icons"),
    ("icon_medicine_skill", "atlas_stt_icons"),
    ("icon_science_skill", "atlas_stt_icons"),
    ("icon_security_skill", "atlas_stt_icons"),
    ("icon_shuttle_lg", "atlas_stt_icons"),
    ("node_icon", "atlas_stt_icons"),
    ("pe_currency_icon", "atlas_stt_icons"),
    ("pp_currency_icon", "atlas_stt_icons"),
    ("soft_currency_icon", "atlas_stt_icons"),
    ("victory_point_icon", "atlas_stt_icons"),
    ("energy_icon", "atlas_stt_icons"),
    ("cadet_icon", "atlas_stt_icons"),
    ("crew_icon", "atlas_stt_icons"),
    ("item_icon", "atlas_stt_icons"),
    ("ship_icon", "atlas_stt_icons"),
    ("shuttle_icon", "atlas_stt_icons"),
    ("event_icon", "atlas_stt_icons"),
    ("dilemma_icon", "atlas_stt_icons"),
    ("icon_antimatter", "atlas_stt_icons"),
    ("captain_xp_icon", "atlas_stt_icons"),
    ("images_currency_honor_currency_0", ""),
    ("images_currency_pe_currency_0", ""),
    ("images_currency_pp_currency_0", ""),
    ("images_currency_sc_currency_0", ""),
    ("images_icons_dilemma_icon", ""),
    ("images_voyages_voyage_bg", ""),
];

/// Returns the atlas asset name for a well-known sprite key.
///
/// `Some("")` means the sprite is a standalone bundle; `None` means the key
/// is not in the registry and the caller must supply the asset name itself.
pub fn atlas_for_sprite(sprite_name: &str) -> Option<&'static str> {
    SPRITE_ATLAS
        .iter()
        .find(|(key, _)| *key == sprite_name)
        .map(|(_, asset)| *asset)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rarity_name_known() {
        assert_eq!(rarity_name(0), Some("Basic"));
        assert_eq!(rarity_name(4), Some("Super Rare"));
        assert_eq!(rarity_name(5), Some("Legendary"));
    }

    #[test]
    fn test_rarity_name_out_of_range() {
        assert_eq!(rarity_name(6), None);
        assert_eq!(rarity_name(usize::MAX), None);
    }

    #[test]
    fn test_atlas_for_sprite() {
        assert_eq!(atlas_for_sprite("mastery_highest_icon"), Some("atlas_stt_icons"));
        assert_eq!(atlas_for_sprite("images_voyages_voyage_bg"), Some(""));
        assert_eq!(atlas_for_sprite("no_such_sprite"), None);
    }

    #[test]
    fn test_crew_deserializes_from_game_payload() {
        let crew: Crew = serde_json::from_value(serde_json::json!({
            "name": "Jean-Luc Picard",
            "portrait": { "file": "crew_icons/cm_picard_sm" },
            "full_body": { "file": "crew_full_body/cm_picard_full" }
        }))
        .unwrap();
        assert_eq!(crew.name, "Jean-Luc Picard");
        assert_eq!(crew.portrait.file, "crew_icons/cm_picard_sm");
    }
}
