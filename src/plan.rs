//! Planning-service response shapes and their normalisation.
//!
//! The planner has returned two incompatible layouts over time. Both are
//! accepted at the boundary and reduced to one [`NormalizedPlan`] before any
//! quest is built. Parsing is lenient: anything that does not fit the
//! expected layout is dropped instead of failing the whole response.

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::types::MonthAction;

/// Month keys of the nested layout that carry weekly milestones.
pub const MONTH_KEY_PREFIX: &str = "Month_";

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct MonthEntry {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    pub weeks: IndexMap<String, String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct FlatPlan {
    pub monthly_actions: IndexMap<String, String>,
    pub weekly_milestones: IndexMap<String, String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum StructuredPlan {
    /// `{ "Month_1": { "action": ..., "weeks": { "Week_1": ... } } }`
    Nested(IndexMap<String, MonthEntry>),
    /// `{ "monthly_actions": {...}, "weekly_milestones": {...} }`
    Flat(FlatPlan),
}

impl Default for StructuredPlan {
    fn default() -> Self {
        StructuredPlan::Nested(IndexMap::new())
    }
}

impl StructuredPlan {
    /// Build a plan from an arbitrary JSON value, keeping key order.
    pub fn from_value(value: &Value) -> Self {
        let Some(root) = value.as_object() else {
            return StructuredPlan::default();
        };

        if root.contains_key("weekly_milestones") || root.contains_key("monthly_actions") {
            return StructuredPlan::Flat(FlatPlan {
                monthly_actions: text_entries(root.get("monthly_actions")),
                weekly_milestones: text_entries(root.get("weekly_milestones")),
            });
        }

        let months = root
            .iter()
            .filter_map(|(key, entry)| {
                let entry = entry.as_object()?;
                Some((key.clone(), month_entry(entry)))
            })
            .collect();
        StructuredPlan::Nested(months)
    }

    pub fn is_empty(&self) -> bool {
        match self {
            StructuredPlan::Nested(months) => months.is_empty(),
            StructuredPlan::Flat(flat) => {
                flat.monthly_actions.is_empty() && flat.weekly_milestones.is_empty()
            }
        }
    }

    /// Reduce either layout to months plus an ordered list of weeks.
    pub fn normalize(&self) -> NormalizedPlan {
        let mut normalized = NormalizedPlan::default();
        match self {
            StructuredPlan::Nested(months) => {
                for (month, entry) in months {
                    if !month.starts_with(MONTH_KEY_PREFIX) {
                        tracing::debug!(key = %month, "skipping non-month plan entry");
                        continue;
                    }
                    if let Some(action) = &entry.action {
                        normalized.months.push(MonthAction {
                            month: month.clone(),
                            action: action.clone(),
                        });
                    }
                    normalized
                        .weeks
                        .extend(entry.weeks.iter().map(|(week, milestone)| WeekMilestone {
                            month: Some(month.clone()),
                            week: week.clone(),
                            milestone: milestone.clone(),
                        }));
                }
            }
            StructuredPlan::Flat(flat) => {
                normalized.months = flat
                    .monthly_actions
                    .iter()
                    .map(|(month, action)| MonthAction {
                        month: month.clone(),
                        action: action.clone(),
                    })
                    .collect();
                normalized.weeks = flat
                    .weekly_milestones
                    .iter()
                    .map(|(week, milestone)| WeekMilestone {
                        month: None,
                        week: week.clone(),
                        milestone: milestone.clone(),
                    })
                    .collect();
            }
        }
        normalized
    }
}

impl<'de> Deserialize<'de> for StructuredPlan {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        Ok(StructuredPlan::from_value(&value))
    }
}

fn month_entry(entry: &Map<String, Value>) -> MonthEntry {
    MonthEntry {
        action: entry
            .get("action")
            .and_then(Value::as_str)
            .map(str::to_string),
        weeks: text_entries(entry.get("weeks")),
    }
}

fn text_entries(value: Option<&Value>) -> IndexMap<String, String> {
    value
        .and_then(Value::as_object)
        .map(|map| {
            map.iter()
                .filter_map(|(key, text)| Some((key.clone(), text.as_str()?.to_string())))
                .collect()
        })
        .unwrap_or_default()
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct WeekMilestone {
    pub month: Option<String>,
    pub week: String,
    pub milestone: String,
}

/// Canonical plan: monthly headlines and the weeks in chronological order.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct NormalizedPlan {
    pub months: Vec<MonthAction>,
    pub weeks: Vec<WeekMilestone>,
}

/// Envelope returned by the planning service's `generate-plan` endpoint.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct PlanResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub goal: String,
    #[serde(default)]
    pub structured_plan: StructuredPlan,
}
