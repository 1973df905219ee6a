use std::sync::Arc;

use rmcp::RoleServer;
use rmcp::{
    handler::server::{router::tool::ToolRouter, wrapper::Parameters},
    model::*,
    tool, tool_handler, tool_router,
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tokio::sync::Mutex;

use crate::error::{ServiceError, ServiceResult};
use crate::markdown::{Segment, segments};
use crate::plan::PlanResponse;
use crate::planner_client::PlanSource;
use crate::progress::{AdventureSummary, QuestStatus, aggregate};
use crate::quests::{REWARDS, quests_from_normalized};
use crate::storage::Storage;
use crate::types::{Adventure, Difficulty, Quest};

#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema)]
pub struct SubmitGoalArgs {
    pub user_id: String,
    pub super_goal: String,
}

#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema)]
pub struct PreviewArgs {
    pub goal: String,
}

#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema)]
pub struct AdventureArgs {
    pub user_id: String,
    pub adventure_id: String,
}

#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema)]
pub struct UserArgs {
    pub user_id: String,
}

#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema)]
pub struct ToggleArgs {
    pub user_id: String,
    pub adventure_id: String,
    pub quest_number: u32,
    pub completed: bool,
}

#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema)]
pub struct SaveProgressArgs {
    pub user_id: String,
    pub adventure_id: String,
    pub quests: Vec<Quest>,
}

#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema)]
pub struct UpdateGoalArgs {
    pub user_id: String,
    pub adventure_id: String,
    pub super_goal: String,
}

/// Quest as presented to clients: stored fields plus its roadmap status and
/// the description split into text and links.
#[derive(Serialize)]
struct QuestView<'a> {
    #[serde(flatten)]
    quest: &'a Quest,
    status: QuestStatus,
    segments: Vec<Segment<'a>>,
}

fn adventure_view(adventure: &Adventure) -> Value {
    let progress = aggregate(&adventure.quests);
    let quests: Vec<QuestView<'_>> = adventure
        .quests
        .iter()
        .enumerate()
        .map(|(index, quest)| QuestView {
            quest,
            status: progress.status(index, quest),
            segments: segments(&quest.description),
        })
        .collect();
    json!({
        "id": adventure.id,
        "superGoal": adventure.super_goal,
        "createdAt": adventure.created_at,
        "monthlyActions": adventure.monthly_actions,
        "quests": quests,
        "completedQuests": adventure.completed_quests,
        "totalXP": adventure.total_xp,
        "progress": {
            "completedCount": progress.completed_count,
            "totalQuests": progress.total_quests,
            "totalXP": progress.total_xp,
            "percentComplete": progress.percent_complete,
            "roundedPercent": progress.rounded_percent(),
            "currentIndex": progress.current_index,
            "level": progress.level(),
            "finished": progress.is_finished(),
            "headline": progress.headline(&adventure.quests),
        }
    })
}

fn rpc(err: impl Into<ServiceError>) -> ErrorData {
    let err: ServiceError = err.into();
    tracing::debug!(error = %err, "tool call failed");
    err.into()
}

pub struct AppState {
    storage: Mutex<Storage>,
    planner: Arc<dyn PlanSource>,
}

impl AppState {
    pub fn new(storage: Storage, planner: Arc<dyn PlanSource>) -> Self {
        Self {
            storage: Mutex::new(storage),
            planner,
        }
    }
}

#[derive(Clone)]
pub struct MomentumServer {
    pub tool_router: ToolRouter<MomentumServer>,
    state: Arc<AppState>,
}

impl MomentumServer {
    pub fn new(state: Arc<AppState>) -> Self {
        Self {
            tool_router: Self::tool_router(),
            state,
        }
    }

    async fn fetch_plan(&self, goal: String) -> ServiceResult<PlanResponse> {
        let planner = Arc::clone(&self.state.planner);
        tokio::task::spawn_blocking(move || planner.generate_plan(&goal))
            .await
            .map_err(|e| ServiceError::Other(format!("plan request task failed: {e}")))?
    }
}

#[tool_router]
impl MomentumServer {
    #[tool(description = "Start a new adventure from a super goal")]
    async fn submit_super_goal(
        &self,
        Parameters(args): Parameters<SubmitGoalArgs>,
    ) -> Result<CallToolResult, ErrorData> {
        let mut storage = self.state.storage.lock().await;
        let adventure = storage
            .create_adventure(&args.user_id, &args.super_goal)
            .map_err(rpc)?;
        storage.save_async().await.map_err(rpc)?;
        Ok(CallToolResult::structured(adventure_view(&adventure)))
    }

    #[tool(description = "Generate a 90-day roadmap for a goal without saving it")]
    async fn preview_plan(
        &self,
        Parameters(args): Parameters<PreviewArgs>,
    ) -> Result<CallToolResult, ErrorData> {
        let response = self.fetch_plan(args.goal).await.map_err(rpc)?;
        let normalized = response.structured_plan.normalize();
        let quests = quests_from_normalized(&normalized);
        Ok(CallToolResult::structured(json!({
            "goal": response.goal,
            "monthlyActions": normalized.months,
            "quests": quests,
        })))
    }

    #[tool(description = "Generate and store the quests of an adventure; existing quests are kept")]
    async fn generate_quests(
        &self,
        Parameters(args): Parameters<AdventureArgs>,
    ) -> Result<CallToolResult, ErrorData> {
        let adventure = {
            let storage = self.state.storage.lock().await;
            storage
                .get_adventure(&args.adventure_id, &args.user_id)
                .map_err(rpc)?
        };
        if adventure.has_quests() {
            tracing::debug!(adventure_id = %adventure.id, "adventure already has quests");
            return Ok(CallToolResult::structured(adventure_view(&adventure)));
        }

        let response = self
            .fetch_plan(adventure.super_goal.clone())
            .await
            .map_err(rpc)?;
        let normalized = response.structured_plan.normalize();
        let quests = quests_from_normalized(&normalized);
        if response.structured_plan.is_empty() {
            tracing::warn!(adventure_id = %adventure.id, "planning service returned an empty plan");
        } else if quests.is_empty() {
            tracing::warn!(adventure_id = %adventure.id, "plan contained no weekly milestones");
        }

        let mut storage = self.state.storage.lock().await;
        // The lock was released while the planner ran.
        let current = storage
            .get_adventure(&args.adventure_id, &args.user_id)
            .map_err(rpc)?;
        if current.has_quests() {
            tracing::info!(
                adventure_id = %current.id,
                "quests were stored while the plan was generated; keeping them"
            );
            return Ok(CallToolResult::structured(adventure_view(&current)));
        }
        let updated = storage
            .attach_plan(&args.adventure_id, &args.user_id, &normalized, quests)
            .map_err(rpc)?;
        storage.save_async().await.map_err(rpc)?;
        Ok(CallToolResult::structured(adventure_view(&updated)))
    }

    #[tool(description = "Get an adventure with its quests and progress")]
    async fn get_adventure(
        &self,
        Parameters(args): Parameters<AdventureArgs>,
    ) -> Result<CallToolResult, ErrorData> {
        let storage = self.state.storage.lock().await;
        let adventure = storage
            .get_adventure(&args.adventure_id, &args.user_id)
            .map_err(rpc)?;
        Ok(CallToolResult::structured(adventure_view(&adventure)))
    }

    #[tool(description = "List a user's adventures, newest first")]
    async fn list_adventures(
        &self,
        Parameters(args): Parameters<UserArgs>,
    ) -> Result<CallToolResult, ErrorData> {
        let storage = self.state.storage.lock().await;
        let now = chrono::Utc::now();
        let summaries: Vec<AdventureSummary> = storage
            .list_adventures(&args.user_id)
            .iter()
            .map(|adventure| AdventureSummary::new(adventure, now))
            .collect();
        Ok(CallToolResult::structured(json!({ "adventures": summaries })))
    }

    #[tool(description = "Mark a quest complete or incomplete")]
    async fn toggle_quest(
        &self,
        Parameters(args): Parameters<ToggleArgs>,
    ) -> Result<CallToolResult, ErrorData> {
        let mut storage = self.state.storage.lock().await;
        let adventure = storage
            .set_quest_completion(
                &args.adventure_id,
                &args.user_id,
                args.quest_number,
                args.completed,
            )
            .map_err(rpc)?;
        storage.save_async().await.map_err(rpc)?;
        tracing::info!(
            adventure_id = %args.adventure_id,
            quest = args.quest_number,
            completed = args.completed,
            "quest toggled"
        );

        let notification = if args.completed {
            json!({
                "title": "Weekly Goal Complete!",
                "description": "Another productive week in the books. Great work!",
            })
        } else {
            json!({
                "title": "Quest Status Updated",
                "description": "This quest has been returned to your active list.",
            })
        };
        let mut view = adventure_view(&adventure);
        view["notification"] = notification;
        Ok(CallToolResult::structured(view))
    }

    #[tool(description = "Replace an adventure's full quest list")]
    async fn save_progress(
        &self,
        Parameters(args): Parameters<SaveProgressArgs>,
    ) -> Result<CallToolResult, ErrorData> {
        let mut storage = self.state.storage.lock().await;
        let adventure = storage
            .save_progress(&args.adventure_id, &args.user_id, args.quests)
            .map_err(rpc)?;
        storage.save_async().await.map_err(rpc)?;
        Ok(CallToolResult::structured(adventure_view(&adventure)))
    }

    #[tool(description = "Change the super goal of an adventure")]
    async fn update_super_goal(
        &self,
        Parameters(args): Parameters<UpdateGoalArgs>,
    ) -> Result<CallToolResult, ErrorData> {
        let mut storage = self.state.storage.lock().await;
        let adventure = storage
            .update_super_goal(&args.adventure_id, &args.user_id, &args.super_goal)
            .map_err(rpc)?;
        storage.save_async().await.map_err(rpc)?;
        Ok(CallToolResult::structured(adventure_view(&adventure)))
    }
}

fn tiers_json() -> Value {
    json!(
        Difficulty::ALL
            .iter()
            .map(|tier| json!({ "difficulty": tier, "xp": tier.xp() }))
            .collect::<Vec<_>>()
    )
}

#[tool_handler]
impl rmcp::ServerHandler for MomentumServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2024_11_05,
            capabilities: ServerCapabilities::builder()
                .enable_tools()
                .enable_resources()
                .build(),
            server_info: Implementation::from_build_env(),
            instructions: Some(
                "Momentum 90: submit a super goal, generate its weekly quests, then toggle quests as they are completed"
                    .to_string(),
            ),
        }
    }

    async fn list_resources(
        &self,
        _request: Option<PaginatedRequestParam>,
        _ctx: rmcp::service::RequestContext<RoleServer>,
    ) -> Result<ListResourcesResult, ErrorData> {
        Ok(ListResourcesResult {
            resources: vec![
                RawResource::new("momentum://tiers", "Difficulty tiers").no_annotation(),
                RawResource::new("momentum://rewards", "Quest rewards").no_annotation(),
            ],
            next_cursor: None,
        })
    }

    async fn read_resource(
        &self,
        ReadResourceRequestParam { uri }: ReadResourceRequestParam,
        _ctx: rmcp::service::RequestContext<RoleServer>,
    ) -> Result<ReadResourceResult, ErrorData> {
        let body = match uri.as_str() {
            "momentum://tiers" => tiers_json(),
            "momentum://rewards" => json!(REWARDS),
            _ => {
                return Err(ErrorData::resource_not_found(
                    "Unknown resource URI",
                    Some(json!({ "uri": uri })),
                ));
            }
        };
        let text = serde_json::to_string_pretty(&body)
            .map_err(|e| ErrorData::internal_error(e.to_string(), None))?;
        Ok(ReadResourceResult {
            contents: vec![ResourceContents::text(text, uri)],
        })
    }

    async fn list_resource_templates(
        &self,
        _request: Option<PaginatedRequestParam>,
        _ctx: rmcp::service::RequestContext<RoleServer>,
    ) -> Result<ListResourceTemplatesResult, ErrorData> {
        Ok(ListResourceTemplatesResult {
            next_cursor: None,
            resource_templates: Vec::new(),
        })
    }
}
