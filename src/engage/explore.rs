//! Hashtag exploration: collect post URLs from configured hashtag pages,
//! then work through the collected backlog. Collection and engagement are
//! separate phases so an interrupted run keeps what it found.

use crate::agent::BrowsingAgent;
use crate::config::Config;
use crate::outcome;
use crate::progress::{CollectedPost, ProgressStore};
use crate::timing::TimingPolicy;
use crate::{prompts, Result};
use chrono::Utc;
use tracing::{info, warn};

/// Posts to collect per hashtag page in one pass.
const POSTS_PER_HASHTAG: usize = 12;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExploreSummary {
    pub hashtags_explored: u32,
    pub posts_collected: u32,
    pub posts_engaged: u32,
}

pub async fn run(
    agent: &dyn BrowsingAgent,
    config: &Config,
    store: &ProgressStore,
    timing: &TimingPolicy,
) -> Result<ExploreSummary> {
    let mut progress = store.load()?;
    let mut summary = ExploreSummary::default();
    let budget = config.agent.step_budget;

    // Phase 1: collect from hashtags not yet explored.
    for hashtag in &config.hashtags {
        if progress.has_explored(hashtag) {
            continue;
        }
        info!("collecting posts from #{}", hashtag);
        match agent
            .run(&prompts::collect_hashtag_posts(hashtag, POSTS_PER_HASHTAG), budget)
            .await
        {
            Ok(steps) => {
                let mut found = 0u32;
                for url in outcome::extract_post_urls(&steps) {
                    let known = progress.is_recorded(&url)
                        || progress.collected_posts.iter().any(|p| p.url == url);
                    if known {
                        continue;
                    }
                    progress.collected_posts.push(CollectedPost {
                        url,
                        source: hashtag.clone(),
                        hashtags: vec![hashtag.clone()],
                        collected_at: Utc::now(),
                    });
                    found += 1;
                }
                info!("collected {} new posts from #{}", found, hashtag);
                summary.posts_collected += found;
            }
            Err(e) => {
                warn!("agent error exploring #{}: {}", hashtag, e);
            }
        }
        // Explored either way; a flaky hashtag page is not worth retrying
        // every run.
        progress.mark_explored(hashtag);
        summary.hashtags_explored += 1;
        store.save(&progress)?;
        timing.between_actions().await;
    }

    // Phase 2: engage the backlog, oldest first.
    let backlog: Vec<String> = progress
        .collected_posts
        .iter()
        .map(|p| p.url.clone())
        .filter(|url| !progress.is_recorded(url))
        .collect();
    info!("{} collected posts awaiting engagement", backlog.len());

    for url in backlog {
        if progress.counters.likes >= config.limits.max_likes_per_day {
            info!("daily like cap reached, stopping exploration");
            break;
        }
        let engagement = super::engage_post(agent, config, &mut progress, &url, true).await?;
        if engagement.any() {
            summary.posts_engaged += 1;
        }
        store.save(&progress)?;
        timing.between_actions().await;
    }

    info!(
        "explore run done: {} hashtags, {} collected, {} engaged",
        summary.hashtags_explored, summary.posts_collected, summary.posts_engaged
    );
    Ok(summary)
}
