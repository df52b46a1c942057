//! # gramflow
//!
//! Progress-tracked, rate-limited Instagram engagement driven by a delegated
//! browsing agent. The crate owns the bookkeeping, timing, prompts, and
//! orchestration loops; everything that touches the page — navigation, element
//! location, vision reasoning — is delegated to a [`BrowsingAgent`].
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use gramflow::{Config, Credentials, ProgressStore, TimingPolicy};
//!
//! # #[tokio::main]
//! # async fn main() -> gramflow::Result<()> {
//! let config = Config::load("engagement.yaml")?;
//! let credentials = Credentials::from_env()?;
//! let store = ProgressStore::new(&config.progress_file);
//! let timing = TimingPolicy::from_config(&config.timing);
//!
//! let (browser, page) = gramflow::browser::launch(&config.browser).await?;
//! let agent = gramflow::agent::LlmAgent::from_config(&config.agent, &page)?;
//!
//! gramflow::engage::ensure_logged_in(&agent, &credentials, config.agent.step_budget).await?;
//! let summary = gramflow::engage::feed::run(&agent, &config, &store, &timing).await?;
//! println!("engaged {} posts", summary.posts_engaged);
//! browser.close().await?;
//! # Ok(())
//! # }
//! ```

pub mod agent;
pub mod browser;
pub mod config;
pub mod engage;
pub mod outcome;
pub mod progress;
pub mod prompts;
pub mod timing;

pub use agent::{AgentStep, BrowsingAgent};
pub use config::{AgentConfig, BrowserConfig, Config, Credentials, Limits, TimingConfig};
pub use outcome::{EngagementKind, Outcome};
pub use progress::{ActionRecord, CollectedPost, Progress, ProgressStore};
pub use timing::{batch_schedule, TimingPolicy};

/// Result type for gramflow operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during config loading, persistence, or agent runs.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("yaml parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("browser error: {0}")]
    Browser(#[from] eoka::Error),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("missing credentials: {0}")]
    Credentials(String),

    #[error("agent error: {0}")]
    Agent(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_minimal_config() {
        let yaml = r#"
name: "Test"
"#;
        let config = Config::parse(yaml).unwrap();
        assert_eq!(config.name, "Test");
        assert!(!config.browser.headless);
        assert_eq!(config.limits.max_likes_per_day, 200);
        assert_eq!(config.limits.batches_per_day, 5);
        assert_eq!(config.timing.action_delay_secs, (3.0, 7.0));
        assert_eq!(config.timing.batch_delay_secs, (1800.0, 5400.0));
    }

    #[test]
    fn test_parse_full_config() {
        let yaml = r#"
name: "Wellness"
browser:
  headless: true
  user_agent: "Custom UA"
limits:
  max_follows_per_day: 50
  max_likes_per_day: 80
  max_comments_per_day: 20
  batches_per_day: 4
timing:
  action_delay_secs: [2.0, 5.0]
  batch_delay_secs: [600.0, 1200.0]
hashtags:
  - veganfitness
  - biohacking
competitors:
  - wellnesscoach
comment_templates:
  - "Great content!"
  - "Love this!"
progress_file: "wellness_progress.json"
"#;
        let config = Config::parse(yaml).unwrap();
        assert!(config.browser.headless);
        assert_eq!(config.browser.user_agent, Some("Custom UA".into()));
        assert_eq!(config.limits.max_follows_per_day, 50);
        assert_eq!(config.limits.batches_per_day, 4);
        assert_eq!(config.timing.action_delay_secs, (2.0, 5.0));
        assert_eq!(config.hashtags, vec!["veganfitness", "biohacking"]);
        assert_eq!(config.competitors, vec!["wellnesscoach"]);
        assert_eq!(config.comment_templates.len(), 2);
        assert_eq!(
            config.progress_file,
            std::path::PathBuf::from("wellness_progress.json")
        );
    }

    #[test]
    fn test_validation_missing_name() {
        let result = Config::parse("hashtags: [fitness]");
        assert!(result.is_err());
    }

    #[test]
    fn test_validation_empty_name() {
        let result = Config::parse("name: \"\"");
        assert!(result.is_err());
    }

    #[test]
    fn test_validation_inverted_delay_range() {
        let yaml = r#"
name: "Test"
timing:
  action_delay_secs: [7.0, 3.0]
"#;
        let result = Config::parse(yaml);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("action_delay"));
    }

    #[test]
    fn test_validation_zero_batches() {
        let yaml = r#"
name: "Test"
limits:
  batches_per_day: 0
"#;
        let result = Config::parse(yaml);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("batches_per_day"));
    }

    #[test]
    fn test_agent_config_defaults() {
        let config = Config::parse("name: \"Test\"").unwrap();
        assert_eq!(config.agent.api_key_env, "ANTHROPIC_API_KEY");
        assert_eq!(config.agent.step_budget, 15);
        assert!(!config.agent.model.is_empty());
    }

    #[test]
    fn test_load_example_config() {
        let config = Config::load("configs/example.yaml").unwrap();
        assert_eq!(config.name, "Example Engagement");
        assert!(!config.hashtags.is_empty());
        assert!(!config.comment_templates.is_empty());
    }
}
