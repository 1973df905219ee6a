//! Plan → quest conversion.

use crate::plan::{NormalizedPlan, PlanResponse, StructuredPlan};
use crate::types::{Difficulty, Quest};

/// Rewards by quest position; quests past the last entry reuse it.
pub const REWARDS: [&str; 13] = [
    "Unlock basic skills and confidence",
    "Build momentum and habits",
    "Master fundamentals",
    "Develop advanced techniques",
    "Achieve breakthrough moments",
    "Reach intermediate level",
    "Overcome major challenges",
    "Demonstrate mastery",
    "Showcase expertise",
    "Become a role model",
    "Achieve expert status",
    "Reach legendary level",
    "Complete your transformation",
];

pub fn reward_for_quest(number: u32) -> &'static str {
    let index = (number.saturating_sub(1) as usize).min(REWARDS.len() - 1);
    REWARDS[index]
}

/// `Week_3` → `Week 3`. Every underscore becomes a space and the first
/// character of each word is upper-cased. Words are runs of ASCII letters and
/// digits; other characters pass through unchanged and split words.
pub fn format_week_title(week: &str) -> String {
    let mut title = String::with_capacity(week.len());
    let mut in_word = false;
    for ch in week.chars().map(|c| if c == '_' { ' ' } else { c }) {
        if ch.is_ascii_alphanumeric() {
            if in_word {
                title.push(ch);
            } else {
                title.push(ch.to_ascii_uppercase());
            }
            in_word = true;
        } else {
            title.push(ch);
            in_word = false;
        }
    }
    title
}

pub fn new_quest(number: u32, week: &str, milestone: &str) -> Quest {
    let difficulty = Difficulty::for_position(number);
    Quest {
        number,
        title: format_week_title(week),
        description: milestone.to_string(),
        completed: false,
        reward: reward_for_quest(number).to_string(),
        difficulty,
        xp: difficulty.xp(),
    }
}

pub fn quests_from_normalized(plan: &NormalizedPlan) -> Vec<Quest> {
    plan.weeks
        .iter()
        .zip(1u32..)
        .map(|(week, number)| new_quest(number, &week.week, &week.milestone))
        .collect()
}

/// Flatten a structured plan into quests numbered from 1 in week order.
pub fn plan_to_quests(plan: &StructuredPlan) -> Vec<Quest> {
    let quests = quests_from_normalized(&plan.normalize());
    tracing::debug!(count = quests.len(), "converted plan to quests");
    quests
}

impl PlanResponse {
    pub fn quests(&self) -> Vec<Quest> {
        plan_to_quests(&self.structured_plan)
    }
}
