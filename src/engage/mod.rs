//! Engagement flows built on top of the agent seam: session check and
//! login, and the like-then-comment treatment of a single post. The batch
//! loops in the submodules compose these.

pub mod daily;
pub mod explore;
pub mod feed;

use crate::agent::BrowsingAgent;
use crate::config::{Config, Credentials};
use crate::outcome::{self, EngagementKind, Outcome};
use crate::progress::{ActionRecord, Progress};
use crate::{prompts, Error, Result};
use chrono::Utc;
use rand::Rng;
use tracing::{debug, info, warn};

/// Verify the session, logging in if needed. A failed login is the one
/// condition that aborts the run: nothing downstream works without it.
pub async fn ensure_logged_in(
    agent: &dyn BrowsingAgent,
    credentials: &Credentials,
    step_budget: u32,
) -> Result<()> {
    let steps = agent.run(&prompts::verify_login(), step_budget).await?;
    if outcome::first_outcome(&steps) == Outcome::Success(EngagementKind::LoggedIn) {
        info!("session already active for {}", credentials.username);
        return Ok(());
    }

    info!("logging in as {}", credentials.username);
    // The task text contains the password; it must not reach the logs.
    let steps = agent
        .run(&prompts::login(credentials), step_budget)
        .await?;
    match outcome::first_outcome(&steps) {
        Outcome::Success(EngagementKind::LoggedIn) => Ok(()),
        Outcome::Failure(reason) => Err(Error::Agent(format!("login failed: {}", reason))),
        other => Err(Error::Agent(format!(
            "login could not be confirmed: {:?}",
            other
        ))),
    }
}

/// What a single post engagement ended up doing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PostEngagement {
    pub liked: bool,
    pub already_liked: bool,
    pub commented: bool,
}

impl PostEngagement {
    pub fn any(&self) -> bool {
        self.liked || self.already_liked || self.commented
    }
}

/// Like (and optionally comment on) one post, recording the outcome.
///
/// A target that already carries a record is skipped without invoking the
/// agent. Agent errors and unconfirmed outcomes are recorded against the
/// target and do not propagate; only the record itself knows they happened.
pub async fn engage_post(
    agent: &dyn BrowsingAgent,
    config: &Config,
    progress: &mut Progress,
    url: &str,
    with_comment: bool,
) -> Result<PostEngagement> {
    if progress.is_recorded(url) {
        debug!("skipping already-recorded post {}", url);
        return Ok(PostEngagement::default());
    }

    let budget = config.agent.step_budget;
    let mut record = ActionRecord::default();
    let mut result = PostEngagement::default();

    match agent.run(&prompts::like_post(url), budget).await {
        Ok(steps) => match outcome::first_outcome(&steps) {
            Outcome::Success(EngagementKind::Liked) => {
                record.liked = true;
                result.liked = true;
                progress.counters.likes += 1;
            }
            Outcome::Success(EngagementKind::AlreadyLiked) => {
                // Still consumes like quota: the post was opened and the
                // account's engagement with it is done.
                record.already_liked = true;
                result.already_liked = true;
                progress.counters.likes += 1;
            }
            Outcome::Failure(reason) => {
                warn!("like failed for {}: {}", url, reason);
                record.error = Some(reason);
            }
            other => {
                debug!("like unconfirmed for {}: {:?}", url, other);
                record.error = Some(format!("like unconfirmed: {:?}", other));
            }
        },
        Err(e) => {
            warn!("agent error liking {}: {}", url, e);
            record.error = Some(e.to_string());
        }
    }

    if with_comment && record.error.is_none() {
        let text = pick_template(&config.comment_templates);
        match agent
            .run(&prompts::comment_on_post(url, text.as_deref()), budget)
            .await
        {
            Ok(steps) => match outcome::first_outcome(&steps) {
                Outcome::Success(EngagementKind::Commented) => {
                    record.commented = true;
                    record.comment_text = text;
                    result.commented = true;
                    progress.counters.comments += 1;
                }
                other => {
                    debug!("comment unconfirmed for {}: {:?}", url, other);
                }
            },
            Err(e) => {
                warn!("agent error commenting on {}: {}", url, e);
            }
        }
    }

    record.timestamp = Some(Utc::now());
    progress.record(url, record);
    Ok(result)
}

/// A random comment template, or `None` when there are no templates and the
/// agent should compose its own.
fn pick_template(templates: &[String]) -> Option<String> {
    if templates.is_empty() {
        return None;
    }
    let idx = rand::rng().random_range(0..templates.len());
    Some(templates[idx].clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pick_template_empty_is_none() {
        assert_eq!(pick_template(&[]), None);
    }

    #[test]
    fn test_pick_template_draws_from_list() {
        let templates = vec!["a".to_string(), "b".to_string()];
        for _ in 0..20 {
            let picked = pick_template(&templates).unwrap();
            assert!(templates.contains(&picked));
        }
    }
}
