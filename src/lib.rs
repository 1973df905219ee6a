pub mod cli;
pub mod error;
pub mod markdown;
pub mod metadata;
pub mod plan;
pub mod planner_client;
pub mod progress;
pub mod quests;
pub mod server;
pub mod storage;
pub mod types;

pub use plan::{NormalizedPlan, PlanResponse, StructuredPlan};
pub use progress::{AdventureProgress, AdventureSummary, QuestStatus, aggregate};
pub use quests::plan_to_quests;
pub use types::{Adventure, Difficulty, Quest};
