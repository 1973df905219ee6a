use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::metadata::{PKG_DESCRIPTION, PKG_NAME, PKG_VERSION};
use crate::planner_client::PlannerConfig;
use crate::storage::Storage;
use crate::types::Difficulty;

pub const DEFAULT_PLANNER_URL: &str =
    "https://momentum90-backend-2-659784348393.northamerica-northeast2.run.app";

#[derive(Parser, Debug, Clone)]
#[command(name = PKG_NAME)]
#[command(version = PKG_VERSION)]
#[command(about = PKG_DESCRIPTION, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Start the MCP server
    Start(CommandArguments),
    /// Generate a roadmap for a goal and print its quests as JSON
    Plan(PlanArguments),
    /// Print the difficulty tiers, XP values and rewards
    Tiers {
        /// Only show one tier (novice, explorer, adventurer, hero, legend)
        #[arg(long)]
        tier: Option<Difficulty>,
    },
    /// Print version information
    Version,
}

#[derive(Args, Debug, Clone)]
pub struct PlannerArguments {
    /// Planning service base URL
    #[arg(long, env = "MOMENTUM_PLANNER_URL", default_value = DEFAULT_PLANNER_URL)]
    pub planner_url: String,

    /// Planning service API key
    #[arg(long, env = "MOMENTUM_API_KEY", default_value = "", hide_env_values = true)]
    pub api_key: String,
}

impl PlannerArguments {
    pub fn config(&self) -> PlannerConfig {
        PlannerConfig {
            base_url: self.planner_url.clone(),
            api_key: self.api_key.clone(),
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct PlanArguments {
    /// The super goal to plan for
    pub goal: String,

    #[command(flatten)]
    pub planner: PlannerArguments,
}

#[derive(Args, Debug, Clone)]
pub struct CommandArguments {
    #[command(flatten)]
    pub planner: PlannerArguments,

    /// Adventure store file (defaults to ~/.momentum90/adventures.json)
    #[arg(long, env = "MOMENTUM_DATA_FILE")]
    pub data_file: Option<PathBuf>,

    /// Enable stdio transport
    #[arg(long, env = "MCP_ENABLE_STDIO", default_value_t = true)]
    pub enable_stdio: bool,

    /// Enable streamable HTTP transport
    #[arg(long, env = "MCP_ENABLE_HTTP", default_value_t = false)]
    pub enable_http: bool,

    /// Streamable HTTP bind address
    #[arg(long, env = "MCP_HTTP_ADDR", default_value = "127.0.0.1:8080")]
    pub http_addr: String,
}

impl CommandArguments {
    pub fn default_settings() -> Self {
        Self {
            planner: PlannerArguments {
                planner_url: DEFAULT_PLANNER_URL.to_string(),
                api_key: String::new(),
            },
            data_file: None,
            enable_stdio: true,
            enable_http: false,
            http_addr: "127.0.0.1:8080".to_string(),
        }
    }

    pub fn data_file(&self) -> Result<PathBuf, String> {
        self.data_file
            .clone()
            .or_else(Storage::default_path)
            .ok_or_else(|| "No home directory found; set MOMENTUM_DATA_FILE".to_string())
    }

    /// Validate CLI/environment-derived arguments.
    pub fn validate(&self) -> Result<(), String> {
        if !self.enable_stdio && !self.enable_http {
            return Err("Enable at least one transport (stdio or http)".to_string());
        }
        if self.enable_http {
            self.http_addr
                .parse::<SocketAddr>()
                .map_err(|e| format!("Invalid MCP_HTTP_ADDR '{}': {e}", self.http_addr))?;
        }
        if self.planner.planner_url.trim().is_empty() {
            return Err("MOMENTUM_PLANNER_URL cannot be empty".to_string());
        }
        if self
            .data_file
            .as_ref()
            .is_some_and(|path| path.as_os_str().is_empty())
        {
            return Err("MOMENTUM_DATA_FILE cannot be empty".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(CommandArguments::default_settings().validate().is_ok());
    }

    #[test]
    fn needs_a_transport() {
        let mut args = CommandArguments::default_settings();
        args.enable_stdio = false;
        assert!(args.validate().is_err());
        args.enable_http = true;
        assert!(args.validate().is_ok());
    }

    #[test]
    fn rejects_bad_http_addr() {
        let mut args = CommandArguments::default_settings();
        args.enable_http = true;
        args.http_addr = "not-an-addr".to_string();
        let err = args.validate().unwrap_err();
        assert!(err.contains("MCP_HTTP_ADDR"));
    }

    #[test]
    fn explicit_data_file_wins() {
        let mut args = CommandArguments::default_settings();
        args.data_file = Some(PathBuf::from("/tmp/momentum.json"));
        assert_eq!(args.data_file().unwrap(), PathBuf::from("/tmp/momentum.json"));
    }

    #[test]
    fn parses_plan_command() {
        let cli = Cli::try_parse_from([
            "momentum90",
            "plan",
            "Run a marathon",
            "--api-key",
            "secret",
        ])
        .unwrap();
        match cli.command {
            Command::Plan(args) => {
                assert_eq!(args.goal, "Run a marathon");
                assert_eq!(args.planner.api_key, "secret");
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn tiers_filter_is_case_insensitive() {
        let cli = Cli::try_parse_from(["momentum90", "tiers", "--tier", "hero"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Tiers {
                tier: Some(Difficulty::Hero)
            }
        ));
        assert!(Cli::try_parse_from(["momentum90", "tiers", "--tier", "wizard"]).is_err());

        let all = Cli::try_parse_from(["momentum90", "tiers"]).unwrap();
        assert!(matches!(all.command, Command::Tiers { tier: None }));
    }
}
