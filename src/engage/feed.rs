//! Home-feed workflow: discover the next unseen post, engage it, close it,
//! pause, repeat until the feed runs dry or the like cap is reached.

use crate::agent::BrowsingAgent;
use crate::config::Config;
use crate::outcome;
use crate::progress::ProgressStore;
use crate::timing::TimingPolicy;
use crate::{prompts, Result};
use tracing::{debug, info, warn};

/// How many discovery rounds in a row may yield an already-recorded post
/// before the run gives up on finding fresh content.
const MAX_CONSECUTIVE_KNOWN: u32 = 5;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FeedSummary {
    /// Posts where at least one action was confirmed.
    pub posts_engaged: u32,
    /// Posts skipped because a record already existed.
    pub posts_skipped: u32,
    /// Posts where nothing could be confirmed.
    pub posts_failed: u32,
}

pub async fn run(
    agent: &dyn BrowsingAgent,
    config: &Config,
    store: &ProgressStore,
    timing: &TimingPolicy,
) -> Result<FeedSummary> {
    let mut progress = store.load()?;
    let mut summary = FeedSummary::default();
    let mut consecutive_known = 0u32;
    let budget = config.agent.step_budget;

    info!("starting feed run ({} posts already visited)", progress.visited_posts.len());

    loop {
        if progress.counters.likes >= config.limits.max_likes_per_day {
            info!("daily like cap reached, stopping feed run");
            break;
        }

        let steps = match agent
            .run(&prompts::open_new_feed_post(&progress.visited_posts), budget)
            .await
        {
            Ok(steps) => steps,
            Err(e) => {
                warn!("agent error while discovering next post: {}", e);
                break;
            }
        };
        let Some(url) = outcome::extract_post_url(&steps) else {
            info!("no new post in the feed, stopping");
            break;
        };

        if progress.is_recorded(&url) {
            debug!("feed surfaced known post {}", url);
            progress.mark_visited(&url);
            summary.posts_skipped += 1;
            consecutive_known += 1;
            if consecutive_known >= MAX_CONSECUTIVE_KNOWN {
                info!("feed keeps surfacing known posts, stopping");
                break;
            }
            continue;
        }
        consecutive_known = 0;

        progress.mark_visited(&url);
        *progress
            .scroll_positions
            .entry("main_feed".to_string())
            .or_insert(0) += 1;
        store.save(&progress)?;

        let engagement = engage_one(agent, config, &mut progress, &url).await?;
        if engagement {
            summary.posts_engaged += 1;
        } else {
            summary.posts_failed += 1;
        }
        store.save(&progress)?;

        // Best effort; a stuck overlay just means the next discovery task
        // starts from an odd place.
        if let Err(e) = agent.run(&prompts::close_post(), budget).await {
            debug!("could not close post overlay: {}", e);
        }

        timing.between_actions().await;
    }

    info!(
        "feed run done: {} engaged, {} skipped, {} failed",
        summary.posts_engaged, summary.posts_skipped, summary.posts_failed
    );
    Ok(summary)
}

async fn engage_one(
    agent: &dyn BrowsingAgent,
    config: &Config,
    progress: &mut crate::progress::Progress,
    url: &str,
) -> Result<bool> {
    let engagement = super::engage_post(agent, config, progress, url, true).await?;
    Ok(engagement.any())
}
