use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Difficulty tier of a quest, assigned by its position in the roadmap.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub enum Difficulty {
    Novice,
    Explorer,
    Adventurer,
    Hero,
    Legend,
}

impl Difficulty {
    pub const ALL: [Difficulty; 5] = [
        Difficulty::Novice,
        Difficulty::Explorer,
        Difficulty::Adventurer,
        Difficulty::Hero,
        Difficulty::Legend,
    ];

    /// Tier for the 1-based quest number. The same thresholds rank an
    /// adventure by how many quests it has completed, so `0` maps to Novice.
    pub fn for_position(position: u32) -> Self {
        match position {
            0..=3 => Difficulty::Novice,
            4..=6 => Difficulty::Explorer,
            7..=9 => Difficulty::Adventurer,
            10..=12 => Difficulty::Hero,
            _ => Difficulty::Legend,
        }
    }

    pub fn xp(&self) -> u32 {
        match self {
            Difficulty::Novice => 100,
            Difficulty::Explorer => 200,
            Difficulty::Adventurer => 300,
            Difficulty::Hero => 500,
            Difficulty::Legend => 1000,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Novice => "Novice",
            Difficulty::Explorer => "Explorer",
            Difficulty::Adventurer => "Adventurer",
            Difficulty::Hero => "Hero",
            Difficulty::Legend => "Legend",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Difficulty {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Difficulty::ALL
            .into_iter()
            .find(|d| d.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("Unknown difficulty: {s}"))
    }
}

/// One weekly milestone of a roadmap.
///
/// `reward`, `difficulty` and `xp` are fixed when the quest is created and
/// stored as-is afterwards; only `completed` changes over a quest's lifetime.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Quest {
    pub number: u32,
    pub title: String,
    /// Milestone text exactly as the planner produced it, inline
    /// `[label](url)` links included.
    pub description: String,
    #[serde(default)]
    pub completed: bool,
    pub reward: String,
    pub difficulty: Difficulty,
    pub xp: u32,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct MonthAction {
    pub month: String,
    pub action: String,
}

/// A super goal together with its roadmap and progress, owned by one user.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Adventure {
    pub id: String,
    pub user_id: String,
    pub super_goal: String,
    pub created_at: String,
    #[serde(default)]
    pub monthly_actions: Vec<MonthAction>,
    #[serde(default)]
    pub quests: Vec<Quest>,
    #[serde(default)]
    pub completed_quests: Vec<u32>,
    #[serde(default, rename = "totalXP")]
    pub total_xp: u32,
}

impl Adventure {
    pub fn has_quests(&self) -> bool {
        !self.quests.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tiers_follow_fixed_thresholds() {
        let expected = [
            (1, Difficulty::Novice),
            (3, Difficulty::Novice),
            (4, Difficulty::Explorer),
            (6, Difficulty::Explorer),
            (7, Difficulty::Adventurer),
            (9, Difficulty::Adventurer),
            (10, Difficulty::Hero),
            (12, Difficulty::Hero),
            (13, Difficulty::Legend),
            (40, Difficulty::Legend),
        ];
        for (position, tier) in expected {
            assert_eq!(Difficulty::for_position(position), tier, "position {position}");
        }
        assert_eq!(Difficulty::for_position(0), Difficulty::Novice);
    }

    #[test]
    fn xp_per_tier() {
        let xp: Vec<u32> = Difficulty::ALL.iter().map(Difficulty::xp).collect();
        assert_eq!(xp, vec![100, 200, 300, 500, 1000]);
    }

    #[test]
    fn difficulty_parses_case_insensitively() {
        assert_eq!("hero".parse::<Difficulty>(), Ok(Difficulty::Hero));
        assert!("wizard".parse::<Difficulty>().is_err());
    }

    #[test]
    fn quest_without_completed_flag_defaults_to_false() {
        let quest: Quest = serde_json::from_str(
            r#"{"number":1,"title":"Week 1","description":"Start","reward":"r","difficulty":"Novice","xp":100}"#,
        )
        .unwrap();
        assert!(!quest.completed);
    }

    #[test]
    fn adventure_uses_camel_case_field_names() {
        let adventure = Adventure {
            id: "a".into(),
            user_id: "u".into(),
            super_goal: "Run a marathon".into(),
            created_at: "2024-01-01T00:00:00Z".into(),
            monthly_actions: vec![],
            quests: vec![],
            completed_quests: vec![],
            total_xp: 0,
        };
        let value = serde_json::to_value(&adventure).unwrap();
        assert_eq!(value["superGoal"], "Run a marathon");
        assert_eq!(value["userId"], "u");
        assert_eq!(value["totalXP"], 0);
    }
}
