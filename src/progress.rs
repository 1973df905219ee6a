//! Progress statistics over a quest list.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::types::{Adventure, Difficulty, Quest};

/// XP needed per adventurer level.
pub const XP_PER_LEVEL: u32 = 1000;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum QuestStatus {
    Completed,
    Current,
    Locked,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AdventureProgress {
    pub total_quests: usize,
    pub completed_count: usize,
    pub total_xp: u32,
    pub percent_complete: f64,
    /// First incomplete quest, or the last quest once all are done.
    pub current_index: Option<usize>,
}

/// Summarise a quest list; depends only on `completed` and `xp`.
pub fn aggregate(quests: &[Quest]) -> AdventureProgress {
    let completed = quests.iter().filter(|q| q.completed);
    let completed_count = completed.clone().count();
    let total_xp = completed.map(|q| q.xp).sum();
    let percent_complete = if quests.is_empty() {
        0.0
    } else {
        completed_count as f64 / quests.len() as f64 * 100.0
    };
    let current_index = quests
        .iter()
        .position(|q| !q.completed)
        .or_else(|| quests.len().checked_sub(1));

    AdventureProgress {
        total_quests: quests.len(),
        completed_count,
        total_xp,
        percent_complete,
        current_index,
    }
}

impl AdventureProgress {
    pub fn rounded_percent(&self) -> u32 {
        self.percent_complete.round() as u32
    }

    pub fn level(&self) -> u32 {
        self.total_xp / XP_PER_LEVEL + 1
    }

    pub fn is_finished(&self) -> bool {
        self.total_quests > 0 && self.completed_count == self.total_quests
    }

    pub fn status(&self, index: usize, quest: &Quest) -> QuestStatus {
        if quest.completed {
            QuestStatus::Completed
        } else if Some(index) == self.current_index {
            QuestStatus::Current
        } else {
            QuestStatus::Locked
        }
    }

    pub fn statuses(&self, quests: &[Quest]) -> Vec<QuestStatus> {
        quests
            .iter()
            .enumerate()
            .map(|(index, quest)| self.status(index, quest))
            .collect()
    }

    pub fn current_quest<'a>(&self, quests: &'a [Quest]) -> Option<&'a Quest> {
        self.current_index.and_then(|index| quests.get(index))
    }

    /// Next milestone line shown under the progress bar.
    pub fn headline(&self, quests: &[Quest]) -> String {
        if self.is_finished() {
            return "Quest Complete! You're a Legend!".to_string();
        }
        match self.current_quest(quests) {
            Some(quest) => format!("Next milestone: Week {} - {}", quest.number, quest.title),
            None => "No quests yet".to_string(),
        }
    }
}

/// One row of a user's adventure listing.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdventureSummary {
    pub id: String,
    pub super_goal: String,
    pub created_at: String,
    pub quest_count: usize,
    pub completed_count: usize,
    pub progress_percent: u32,
    #[serde(rename = "totalXP")]
    pub total_xp: u32,
    pub days_since_start: i64,
    pub rank: Difficulty,
    pub finished: bool,
}

impl AdventureSummary {
    pub fn new(adventure: &Adventure, now: DateTime<Utc>) -> Self {
        let progress = aggregate(&adventure.quests);
        Self {
            id: adventure.id.clone(),
            super_goal: adventure.super_goal.clone(),
            created_at: adventure.created_at.clone(),
            quest_count: progress.total_quests,
            completed_count: progress.completed_count,
            progress_percent: progress.rounded_percent(),
            total_xp: progress.total_xp,
            days_since_start: days_since(&adventure.created_at, now),
            rank: Difficulty::for_position(progress.completed_count as u32),
            finished: progress.is_finished(),
        }
    }
}

/// Whole days elapsed, rounded up. Unparseable timestamps count as zero.
fn days_since(created_at: &str, now: DateTime<Utc>) -> i64 {
    let Ok(start) = DateTime::parse_from_rfc3339(created_at) else {
        tracing::warn!(created_at, "unparseable adventure timestamp");
        return 0;
    };
    let elapsed = (now - start.with_timezone(&Utc)).num_seconds().abs();
    (elapsed + 86_399) / 86_400
}
