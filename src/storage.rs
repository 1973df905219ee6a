use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use ulid::Ulid;

use crate::plan::NormalizedPlan;
use crate::types::{Adventure, Quest};

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Adventure not found: {0}")]
    AdventureNotFound(String),
    #[error("Quest not found: {0}")]
    QuestNotFound(u32),
    #[error("Adventure belongs to another user")]
    Forbidden,
    #[error("Super goal cannot be empty")]
    EmptyGoal,
    #[error("Quest list does not match the stored roadmap: {0}")]
    QuestListMismatch(String),
}

#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct StorageData {
    pub adventures: HashMap<String, Adventure>,
}

/// Adventure records kept in memory and flushed to one JSON file.
///
/// Mutations never touch the disk; callers persist with [`Storage::save`] or
/// [`Storage::save_async`] once a change is complete.
pub struct Storage {
    storage_path: PathBuf,
    data: StorageData,
}

impl Storage {
    pub fn new(storage_path: impl Into<PathBuf>) -> Self {
        Self {
            storage_path: storage_path.into(),
            data: StorageData::default(),
        }
    }

    /// `~/.momentum90/adventures.json`, when a home directory exists.
    pub fn default_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".momentum90").join("adventures.json"))
    }

    pub fn path(&self) -> &Path {
        &self.storage_path
    }

    pub fn initialize(&mut self) -> Result<(), StorageError> {
        if let Some(data_dir) = self.storage_path.parent() {
            fs::create_dir_all(data_dir)?;
        }

        if self.storage_path.exists() {
            let mut file = File::open(&self.storage_path)?;
            let mut contents = String::new();
            file.read_to_string(&mut contents)?;
            self.data = serde_json::from_str(&contents)?;
            tracing::info!(
                path = %self.storage_path.display(),
                adventures = self.data.adventures.len(),
                "loaded adventure store"
            );
        } else {
            self.save()?;
        }

        Ok(())
    }

    pub fn snapshot_for_save(&self) -> (PathBuf, StorageData) {
        (self.storage_path.clone(), self.data.clone())
    }

    fn write_snapshot(storage_path: &Path, data: &StorageData) -> Result<(), StorageError> {
        if let Some(parent) = storage_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let temp = storage_path.with_extension("tmp");
        let mut f = File::create(&temp)?;
        let content = serde_json::to_string_pretty(data)?;
        f.write_all(content.as_bytes())?;
        f.sync_all()?;
        fs::rename(temp, storage_path)?;
        Ok(())
    }

    /// Persist the whole store through a temporary file and an atomic rename,
    /// so a reader never sees a partially written quest list.
    pub fn save(&self) -> Result<(), StorageError> {
        Self::write_snapshot(&self.storage_path, &self.data)
    }

    pub async fn save_snapshot_async(
        storage_path: PathBuf,
        data: StorageData,
    ) -> Result<(), StorageError> {
        tokio::task::spawn_blocking(move || Self::write_snapshot(&storage_path, &data))
            .await
            .map_err(|e| {
                StorageError::Io(std::io::Error::other(format!(
                    "spawn_blocking failed: {}",
                    e
                )))
            })?
    }

    pub async fn save_async(&self) -> Result<(), StorageError> {
        let (path, data) = self.snapshot_for_save();
        Storage::save_snapshot_async(path, data).await
    }

    pub fn create_adventure(
        &mut self,
        user_id: &str,
        super_goal: &str,
    ) -> Result<Adventure, StorageError> {
        let super_goal = super_goal.trim();
        if super_goal.is_empty() {
            return Err(StorageError::EmptyGoal);
        }
        let adventure = Adventure {
            id: Ulid::new().to_string(),
            user_id: user_id.to_string(),
            super_goal: super_goal.to_string(),
            created_at: Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true),
            monthly_actions: Vec::new(),
            quests: Vec::new(),
            completed_quests: Vec::new(),
            total_xp: 0,
        };
        self.data
            .adventures
            .insert(adventure.id.clone(), adventure.clone());
        tracing::info!(adventure_id = %adventure.id, user_id, "created adventure");
        Ok(adventure)
    }

    pub fn get_adventure(&self, id: &str, user_id: &str) -> Result<Adventure, StorageError> {
        self.owned(id, user_id).cloned()
    }

    /// All adventures of `user_id`, newest first.
    pub fn list_adventures(&self, user_id: &str) -> Vec<Adventure> {
        let mut adventures: Vec<Adventure> = self
            .data
            .adventures
            .values()
            .filter(|a| a.user_id == user_id)
            .cloned()
            .collect();
        // Fixed-width UTC timestamps sort chronologically as strings.
        adventures.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.cmp(&a.id))
        });
        adventures
    }

    pub fn update_super_goal(
        &mut self,
        id: &str,
        user_id: &str,
        super_goal: &str,
    ) -> Result<Adventure, StorageError> {
        let super_goal = super_goal.trim();
        if super_goal.is_empty() {
            return Err(StorageError::EmptyGoal);
        }
        let adventure = self.owned_mut(id, user_id)?;
        adventure.super_goal = super_goal.to_string();
        Ok(adventure.clone())
    }

    /// Store a freshly generated roadmap, replacing any previous one.
    pub fn attach_plan(
        &mut self,
        id: &str,
        user_id: &str,
        plan: &NormalizedPlan,
        quests: Vec<Quest>,
    ) -> Result<Adventure, StorageError> {
        let adventure = self.owned_mut(id, user_id)?;
        adventure.monthly_actions = plan.months.clone();
        replace_quests(adventure, quests);
        tracing::info!(adventure_id = id, quests = adventure.quests.len(), "attached plan");
        Ok(adventure.clone())
    }

    /// Save the completion state of a full quest list.
    ///
    /// The list must carry the stored quest numbers in the stored order. Only
    /// `completed` is taken from it; every other field keeps the value fixed
    /// when the roadmap was generated.
    pub fn save_progress(
        &mut self,
        id: &str,
        user_id: &str,
        quests: Vec<Quest>,
    ) -> Result<Adventure, StorageError> {
        let adventure = self.owned_mut(id, user_id)?;
        let merged = merge_completion(&adventure.quests, &quests)?;
        replace_quests(adventure, merged);
        Ok(adventure.clone())
    }

    pub fn set_quest_completion(
        &mut self,
        id: &str,
        user_id: &str,
        quest_number: u32,
        completed: bool,
    ) -> Result<Adventure, StorageError> {
        let current = self.owned(id, user_id)?;
        let mut quests = current.quests.clone();
        let quest = quests
            .iter_mut()
            .find(|q| q.number == quest_number)
            .ok_or(StorageError::QuestNotFound(quest_number))?;
        quest.completed = completed;
        self.save_progress(id, user_id, quests)
    }

    fn owned(&self, id: &str, user_id: &str) -> Result<&Adventure, StorageError> {
        let adventure = self
            .data
            .adventures
            .get(id)
            .ok_or_else(|| StorageError::AdventureNotFound(id.to_string()))?;
        if adventure.user_id != user_id {
            tracing::warn!(adventure_id = id, user_id, "rejected access to foreign adventure");
            return Err(StorageError::Forbidden);
        }
        Ok(adventure)
    }

    fn owned_mut(&mut self, id: &str, user_id: &str) -> Result<&mut Adventure, StorageError> {
        self.owned(id, user_id)?;
        self.data
            .adventures
            .get_mut(id)
            .ok_or_else(|| StorageError::AdventureNotFound(id.to_string()))
    }
}

fn merge_completion(stored: &[Quest], incoming: &[Quest]) -> Result<Vec<Quest>, StorageError> {
    if stored.len() != incoming.len() {
        return Err(StorageError::QuestListMismatch(format!(
            "expected {} quests, got {}",
            stored.len(),
            incoming.len()
        )));
    }
    stored
        .iter()
        .zip(incoming)
        .map(|(kept, update)| {
            if kept.number != update.number {
                return Err(StorageError::QuestListMismatch(format!(
                    "expected quest {} at this position, got {}",
                    kept.number, update.number
                )));
            }
            if kept.xp != update.xp || kept.difficulty != update.difficulty || kept.reward != update.reward {
                tracing::warn!(quest = kept.number, "ignoring changed quest metadata");
            }
            Ok(Quest {
                completed: update.completed,
                ..kept.clone()
            })
        })
        .collect()
}

fn replace_quests(adventure: &mut Adventure, quests: Vec<Quest>) {
    adventure.completed_quests = quests
        .iter()
        .filter(|q| q.completed)
        .map(|q| q.number)
        .collect();
    adventure.total_xp = quests.iter().filter(|q| q.completed).map(|q| q.xp).sum();
    adventure.quests = quests;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::StructuredPlan;
    use crate::quests::plan_to_quests;
    use serde_json::json;

    fn store() -> (tempfile::TempDir, Storage) {
        let dir = tempfile::tempdir().unwrap();
        let mut storage = Storage::new(dir.path().join("data").join("adventures.json"));
        storage.initialize().unwrap();
        (dir, storage)
    }

    fn plan() -> StructuredPlan {
        StructuredPlan::from_value(&json!({
            "Month_1": {
                "action": "Lay foundations",
                "weeks": { "Week_1": "a", "Week_2": "b", "Week_3": "c", "Week_4": "d" }
            }
        }))
    }

    #[test]
    fn initialize_creates_file() {
        let (_dir, storage) = store();
        assert!(storage.path().exists());
    }

    #[test]
    fn rejects_blank_goal() {
        let (_dir, mut storage) = store();
        assert!(matches!(
            storage.create_adventure("u1", "   "),
            Err(StorageError::EmptyGoal)
        ));
    }

    #[test]
    fn ownership_is_enforced() {
        let (_dir, mut storage) = store();
        let adventure = storage.create_adventure("u1", "Learn piano").unwrap();

        assert!(storage.get_adventure(&adventure.id, "u1").is_ok());
        assert!(matches!(
            storage.get_adventure(&adventure.id, "u2"),
            Err(StorageError::Forbidden)
        ));
        assert!(matches!(
            storage.set_quest_completion(&adventure.id, "u2", 1, true),
            Err(StorageError::Forbidden)
        ));
        assert!(matches!(
            storage.get_adventure("missing", "u1"),
            Err(StorageError::AdventureNotFound(_))
        ));
    }

    #[test]
    fn completion_recomputes_totals() {
        let (_dir, mut storage) = store();
        let adventure = storage.create_adventure("u1", "Run a marathon").unwrap();
        let plan = plan();
        storage
            .attach_plan(&adventure.id, "u1", &plan.normalize(), plan_to_quests(&plan))
            .unwrap();

        storage.set_quest_completion(&adventure.id, "u1", 1, true).unwrap();
        let updated = storage.set_quest_completion(&adventure.id, "u1", 4, true).unwrap();
        assert_eq!(updated.completed_quests, vec![1, 4]);
        assert_eq!(updated.total_xp, 300);
        assert_eq!(updated.monthly_actions[0].action, "Lay foundations");

        let reverted = storage.set_quest_completion(&adventure.id, "u1", 4, false).unwrap();
        assert_eq!(reverted.completed_quests, vec![1]);
        assert_eq!(reverted.total_xp, 100);

        assert!(matches!(
            storage.set_quest_completion(&adventure.id, "u1", 9, true),
            Err(StorageError::QuestNotFound(9))
        ));
    }

    fn with_roadmap(storage: &mut Storage) -> Adventure {
        let adventure = storage.create_adventure("u1", "Write a novel").unwrap();
        let plan = plan();
        storage
            .attach_plan(&adventure.id, "u1", &plan.normalize(), plan_to_quests(&plan))
            .unwrap()
    }

    #[test]
    fn save_progress_merges_completion_flags() {
        let (_dir, mut storage) = store();
        let adventure = with_roadmap(&mut storage);
        let mut quests = adventure.quests.clone();
        quests[1].completed = true;
        quests[3].completed = true;

        let saved = storage.save_progress(&adventure.id, "u1", quests).unwrap();
        assert_eq!(saved.quests.len(), 4);
        assert_eq!(saved.completed_quests, vec![2, 4]);
        assert_eq!(saved.total_xp, 300);
    }

    #[test]
    fn save_progress_rejects_partial_list() {
        let (_dir, mut storage) = store();
        let adventure = with_roadmap(&mut storage);
        let mut quests = adventure.quests.clone();
        quests.truncate(2);
        quests[1].completed = true;

        assert!(matches!(
            storage.save_progress(&adventure.id, "u1", quests),
            Err(StorageError::QuestListMismatch(_))
        ));
        let stored = storage.get_adventure(&adventure.id, "u1").unwrap();
        assert_eq!(stored.quests.len(), 4);
        assert!(stored.completed_quests.is_empty());
    }

    #[test]
    fn save_progress_rejects_duplicate_numbers() {
        let (_dir, mut storage) = store();
        let adventure = with_roadmap(&mut storage);
        let mut quests = adventure.quests.clone();
        quests[1].number = 1;

        assert!(matches!(
            storage.save_progress(&adventure.id, "u1", quests),
            Err(StorageError::QuestListMismatch(_))
        ));
    }

    #[test]
    fn save_progress_keeps_stored_xp() {
        let (_dir, mut storage) = store();
        let adventure = with_roadmap(&mut storage);
        let mut quests = adventure.quests.clone();
        quests[0].xp = 1_000_000;
        quests[0].reward = "Everything".to_string();
        quests[0].completed = true;

        let saved = storage.save_progress(&adventure.id, "u1", quests).unwrap();
        assert_eq!(saved.quests[0].xp, 100);
        assert_eq!(saved.quests[0].reward, "Unlock basic skills and confidence");
        assert_eq!(saved.total_xp, 100);
    }

    #[test]
    fn save_progress_cannot_add_quests_to_empty_roadmap() {
        let (_dir, mut storage) = store();
        let adventure = storage.create_adventure("u1", "Empty").unwrap();
        assert!(matches!(
            storage.save_progress(&adventure.id, "u1", plan_to_quests(&plan())),
            Err(StorageError::QuestListMismatch(_))
        ));
    }

    #[test]
    fn lists_only_own_adventures_newest_first() {
        let (_dir, mut storage) = store();
        let first = storage.create_adventure("u1", "First").unwrap();
        std::thread::sleep(std::time::Duration::from_millis(5));
        let second = storage.create_adventure("u1", "Second").unwrap();
        storage.create_adventure("u2", "Other").unwrap();

        let listed: Vec<String> = storage
            .list_adventures("u1")
            .into_iter()
            .map(|a| a.id)
            .collect();
        assert_eq!(listed, vec![second.id, first.id]);
    }

    #[test]
    fn update_goal() {
        let (_dir, mut storage) = store();
        let adventure = storage.create_adventure("u1", "Old").unwrap();
        let updated = storage.update_super_goal(&adventure.id, "u1", " New ").unwrap();
        assert_eq!(updated.super_goal, "New");
    }

    #[tokio::test]
    async fn save_async_round_trips_through_disk() {
        let (dir, mut storage) = store();
        let adventure = storage.create_adventure("u1", "Persist me").unwrap();
        storage.save_async().await.unwrap();

        let mut reopened = Storage::new(dir.path().join("data").join("adventures.json"));
        reopened.initialize().unwrap();
        let loaded = reopened.get_adventure(&adventure.id, "u1").unwrap();
        assert_eq!(loaded.super_goal, "Persist me");
        assert!(!dir.path().join("data").join("adventures.tmp").exists());
    }
}
