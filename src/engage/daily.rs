//! Daily orchestrator: spread the per-category caps across batches, discover
//! an audience from hashtags and competitor followers, then run
//! follow/like/comment batches with long pauses in between.

use crate::agent::BrowsingAgent;
use crate::config::{Config, Limits};
use crate::outcome::{self, EngagementKind, Outcome};
use crate::progress::{ActionRecord, Counters, Progress, ProgressStore};
use crate::timing::{self, TimingPolicy};
use crate::{prompts, Result};
use chrono::Utc;
use serde::Serialize;
use std::collections::VecDeque;
use tracing::{debug, info, warn};

/// Usernames to gather per hashtag during audience discovery.
const USERNAMES_PER_HASHTAG: usize = 10;
/// Usernames to gather per competitor followers list.
const USERNAMES_PER_COMPETITOR: usize = 20;
/// Posts to gather per hashtag for the like/comment pools.
const POSTS_PER_HASHTAG: usize = 12;

/// Action category, each with its own cap, counter, and target pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    Follows,
    Likes,
    Comments,
}

impl Category {
    fn cap(self, limits: &Limits) -> u32 {
        match self {
            Category::Follows => limits.max_follows_per_day,
            Category::Likes => limits.max_likes_per_day,
            Category::Comments => limits.max_comments_per_day,
        }
    }

    fn count(self, counters: &Counters) -> u32 {
        match self {
            Category::Follows => counters.follows,
            Category::Likes => counters.likes,
            Category::Comments => counters.comments,
        }
    }

    fn label(self) -> &'static str {
        match self {
            Category::Follows => "follows",
            Category::Likes => "likes",
            Category::Comments => "comments",
        }
    }
}

/// Per-category batch quotas for one day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DailyPlan {
    pub follows: Vec<u32>,
    pub likes: Vec<u32>,
    pub comments: Vec<u32>,
}

impl DailyPlan {
    pub fn from_limits(limits: &Limits) -> Self {
        let batches = limits.batches_per_day as usize;
        Self {
            follows: timing::batch_schedule(limits.max_follows_per_day, batches),
            likes: timing::batch_schedule(limits.max_likes_per_day, batches),
            comments: timing::batch_schedule(limits.max_comments_per_day, batches),
        }
    }

    fn quota(&self, category: Category, batch: usize) -> u32 {
        let schedule = match category {
            Category::Follows => &self.follows,
            Category::Likes => &self.likes,
            Category::Comments => &self.comments,
        };
        schedule.get(batch).copied().unwrap_or(0)
    }
}

/// Where the daily run currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BatchState {
    Idle,
    RunningBatch(usize),
    WaitingBetweenBatches(usize),
    Done,
}

/// Discovered targets for the day.
#[derive(Debug, Default)]
pub struct Audience {
    pub usernames: VecDeque<String>,
    pub like_posts: VecDeque<String>,
    pub comment_posts: VecDeque<String>,
}

/// What one category batch accomplished.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub confirmed: u32,
    pub failed: u32,
}

/// Daily totals, written as a dated JSON file at the end of the run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DailyStats {
    pub date: String,
    pub follows: u32,
    pub likes: u32,
    pub comments: u32,
    pub failures: u32,
    pub batches_run: u32,
}

pub async fn run(
    agent: &dyn BrowsingAgent,
    config: &Config,
    store: &ProgressStore,
    timing: &TimingPolicy,
) -> Result<DailyStats> {
    let mut progress = store.load()?;
    let plan = DailyPlan::from_limits(&config.limits);
    debug!(
        "daily plan: follows {:?}, likes {:?}, comments {:?}",
        plan.follows, plan.likes, plan.comments
    );

    let mut audience = discover_audience(agent, config, &progress, timing).await?;
    info!(
        "audience: {} usernames, {} like targets, {} comment targets",
        audience.usernames.len(),
        audience.like_posts.len(),
        audience.comment_posts.len()
    );
    store.save(&progress)?;

    let batches = config.limits.batches_per_day as usize;
    let mut stats = DailyStats {
        date: Utc::now().format("%Y-%m-%d").to_string(),
        ..Default::default()
    };
    let starting = progress.counters;

    let mut state = BatchState::Idle;
    loop {
        state = match state {
            BatchState::Idle => BatchState::RunningBatch(0),
            BatchState::RunningBatch(batch) => {
                info!("starting batch {}/{}", batch + 1, batches);
                for category in [Category::Follows, Category::Likes, Category::Comments] {
                    let quota = plan.quota(category, batch);
                    let targets = match category {
                        Category::Follows => &mut audience.usernames,
                        Category::Likes => &mut audience.like_posts,
                        Category::Comments => &mut audience.comment_posts,
                    };
                    let report = run_category_batch(
                        agent,
                        config,
                        store,
                        &mut progress,
                        timing,
                        category,
                        quota,
                        targets,
                    )
                    .await?;
                    stats.failures += report.failed;
                }
                stats.batches_run += 1;
                if batch + 1 >= batches
                    || !has_remaining_work(&audience, &progress.counters, &config.limits)
                {
                    BatchState::Done
                } else {
                    BatchState::WaitingBetweenBatches(batch)
                }
            }
            BatchState::WaitingBetweenBatches(batch) => {
                timing.between_batches().await;
                BatchState::RunningBatch(batch + 1)
            }
            BatchState::Done => break,
        };
    }

    stats.follows = progress.counters.follows - starting.follows;
    stats.likes = progress.counters.likes - starting.likes;
    stats.comments = progress.counters.comments - starting.comments;
    save_stats(config, &stats)?;
    info!(
        "daily run done: {} follows, {} likes, {} comments, {} failures",
        stats.follows, stats.likes, stats.comments, stats.failures
    );
    Ok(stats)
}

/// Run one category's share of a batch: pop targets until the quota is met,
/// the pool runs dry, or the daily cap is hit. Only confirmed actions count
/// toward the quota and the counters; failures are recorded and skipped.
/// Every outcome is saved to the store before the next target, so a crash
/// loses at most the in-flight one.
pub async fn run_category_batch(
    agent: &dyn BrowsingAgent,
    config: &Config,
    store: &ProgressStore,
    progress: &mut Progress,
    timing: &TimingPolicy,
    category: Category,
    quota: u32,
    targets: &mut VecDeque<String>,
) -> Result<BatchReport> {
    let cap = category.cap(&config.limits);
    let budget = config.agent.step_budget;
    let mut report = BatchReport::default();

    while report.confirmed < quota {
        if category.count(&progress.counters) >= cap {
            info!("daily {} cap reached", category.label());
            break;
        }
        let Some(target) = targets.pop_front() else {
            debug!("no more {} targets", category.label());
            break;
        };
        let key = match category {
            Category::Follows => format!("user:{}", target),
            Category::Likes | Category::Comments => target.clone(),
        };
        if progress.is_recorded(&key) {
            continue;
        }

        let comment_text = match category {
            Category::Comments => super::pick_template(&config.comment_templates),
            _ => None,
        };
        let task = match category {
            Category::Follows => prompts::follow_user(&target, true),
            Category::Likes => prompts::like_post(&target),
            Category::Comments => prompts::comment_on_post(&target, comment_text.as_deref()),
        };

        let mut record = ActionRecord::default();
        match agent.run(&task, budget).await {
            Ok(steps) => match (category, outcome::first_outcome(&steps)) {
                (Category::Follows, Outcome::Success(EngagementKind::Followed)) => {
                    record.followed = true;
                    progress.counters.follows += 1;
                    report.confirmed += 1;
                }
                (Category::Likes, Outcome::Success(EngagementKind::Liked)) => {
                    record.liked = true;
                    progress.counters.likes += 1;
                    report.confirmed += 1;
                }
                (Category::Likes, Outcome::Success(EngagementKind::AlreadyLiked)) => {
                    record.already_liked = true;
                    progress.counters.likes += 1;
                    report.confirmed += 1;
                }
                (Category::Comments, Outcome::Success(EngagementKind::Commented)) => {
                    record.commented = true;
                    record.comment_text = comment_text;
                    progress.counters.comments += 1;
                    report.confirmed += 1;
                }
                (_, other) => {
                    debug!("{} unconfirmed for {}: {:?}", category.label(), target, other);
                    record.error = Some(format!("unconfirmed: {:?}", other));
                    report.failed += 1;
                }
            },
            Err(e) => {
                warn!("agent error on {} for {}: {}", category.label(), target, e);
                record.error = Some(e.to_string());
                report.failed += 1;
            }
        }

        record.timestamp = Some(Utc::now());
        progress.record(key, record);
        store.save(progress)?;
        timing.between_actions().await;
    }

    Ok(report)
}

/// Gather usernames from hashtag authors and competitor followers, and post
/// URLs from hashtag pages, skipping anything already recorded.
async fn discover_audience(
    agent: &dyn BrowsingAgent,
    config: &Config,
    progress: &Progress,
    timing: &TimingPolicy,
) -> Result<Audience> {
    let budget = config.agent.step_budget;
    let mut audience = Audience::default();

    for hashtag in &config.hashtags {
        match agent
            .run(
                &prompts::collect_usernames_from_hashtag(hashtag, USERNAMES_PER_HASHTAG),
                budget,
            )
            .await
        {
            Ok(steps) => push_usernames(&mut audience.usernames, &steps, progress),
            Err(e) => warn!("audience discovery failed for #{}: {}", hashtag, e),
        }
        timing.between_actions().await;

        match agent
            .run(&prompts::collect_hashtag_posts(hashtag, POSTS_PER_HASHTAG), budget)
            .await
        {
            Ok(steps) => {
                // Alternate between the like and comment pools so the same
                // post is never targeted by both.
                for (i, url) in outcome::extract_post_urls(&steps).into_iter().enumerate() {
                    if progress.is_recorded(&url) {
                        continue;
                    }
                    let pool = if i % 2 == 0 {
                        &mut audience.like_posts
                    } else {
                        &mut audience.comment_posts
                    };
                    if !pool.contains(&url) {
                        pool.push_back(url);
                    }
                }
            }
            Err(e) => warn!("post discovery failed for #{}: {}", hashtag, e),
        }
        timing.between_actions().await;
    }

    for competitor in &config.competitors {
        match agent
            .run(
                &prompts::collect_usernames_from_followers(competitor, USERNAMES_PER_COMPETITOR),
                budget,
            )
            .await
        {
            Ok(steps) => push_usernames(&mut audience.usernames, &steps, progress),
            Err(e) => warn!("follower discovery failed for {}: {}", competitor, e),
        }
        timing.between_actions().await;
    }

    Ok(audience)
}

fn push_usernames(
    pool: &mut VecDeque<String>,
    steps: &[crate::agent::AgentStep],
    progress: &Progress,
) {
    for name in outcome::extract_usernames(steps) {
        if name.eq_ignore_ascii_case("collected") {
            continue;
        }
        let key = format!("user:{}", name);
        if !progress.is_recorded(&key) && !pool.contains(&name) {
            pool.push_back(name);
        }
    }
}

/// Whether any category still has both headroom under its cap and targets
/// left. When nothing can progress, the remaining inter-batch waits would
/// just burn hours doing nothing.
fn has_remaining_work(audience: &Audience, counters: &Counters, limits: &Limits) -> bool {
    [Category::Follows, Category::Likes, Category::Comments]
        .into_iter()
        .any(|category| {
            let pool = match category {
                Category::Follows => &audience.usernames,
                Category::Likes => &audience.like_posts,
                Category::Comments => &audience.comment_posts,
            };
            category.count(counters) < category.cap(limits) && !pool.is_empty()
        })
}

fn save_stats(config: &Config, stats: &DailyStats) -> Result<()> {
    std::fs::create_dir_all(&config.stats_dir)?;
    let path = config.stats_dir.join(format!("daily-stats-{}.json", stats.date));
    let json = serde_json::to_string_pretty(stats)?;
    std::fs::write(&path, json)?;
    info!("daily stats written to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan_covers_every_cap() {
        let limits = Limits {
            max_follows_per_day: 40,
            max_likes_per_day: 55,
            max_comments_per_day: 10,
            batches_per_day: 5,
        };
        let plan = DailyPlan::from_limits(&limits);
        assert_eq!(plan.follows.iter().sum::<u32>(), 40);
        assert_eq!(plan.likes.iter().sum::<u32>(), 55);
        assert_eq!(plan.comments.iter().sum::<u32>(), 10);
        assert_eq!(plan.follows.len(), 5);
    }

    #[test]
    fn test_quota_beyond_schedule_is_zero() {
        let plan = DailyPlan {
            follows: vec![2, 2],
            likes: vec![],
            comments: vec![1],
        };
        assert_eq!(plan.quota(Category::Follows, 1), 2);
        assert_eq!(plan.quota(Category::Follows, 7), 0);
        assert_eq!(plan.quota(Category::Likes, 0), 0);
    }

    #[test]
    fn test_no_remaining_work_when_pools_empty() {
        let limits = Limits::default();
        assert!(!has_remaining_work(
            &Audience::default(),
            &Counters::default(),
            &limits
        ));
    }

    #[test]
    fn test_remaining_work_respects_caps() {
        let mut audience = Audience::default();
        audience.usernames.push_back("alice".into());
        let limits = Limits {
            max_follows_per_day: 1,
            max_likes_per_day: 1,
            max_comments_per_day: 1,
            batches_per_day: 1,
        };
        let mut counters = Counters::default();
        assert!(has_remaining_work(&audience, &counters, &limits));
        counters.follows = 1;
        assert!(!has_remaining_work(&audience, &counters, &limits));
    }

    #[test]
    fn test_category_accessors_line_up() {
        let limits = Limits {
            max_follows_per_day: 1,
            max_likes_per_day: 2,
            max_comments_per_day: 3,
            batches_per_day: 1,
        };
        let counters = Counters {
            follows: 10,
            likes: 20,
            comments: 30,
        };
        assert_eq!(Category::Follows.cap(&limits), 1);
        assert_eq!(Category::Comments.cap(&limits), 3);
        assert_eq!(Category::Likes.count(&counters), 20);
    }
}
