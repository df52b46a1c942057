//! Direct browser scripting: stealth launch from config, plus the
//! mouse-driven like routine that bypasses element-index clicking (the
//! like glyph often swallows synthetic clicks).

use crate::config::BrowserConfig;
use crate::Result;
use eoka::{Browser, Page};
use tracing::debug;

/// Launch a stealth browser and an initial page from the config.
pub async fn launch(config: &BrowserConfig) -> Result<(Browser, Page)> {
    let stealth = eoka::StealthConfig {
        headless: config.headless,
        proxy: config.proxy.clone(),
        user_agent: config.user_agent.clone(),
        viewport_width: config.viewport.as_ref().map(|v| v.width).unwrap_or(1280),
        viewport_height: config.viewport.as_ref().map(|v| v.height).unwrap_or(800),
        ..Default::default()
    };

    debug!(
        "Launching browser (headless: {}, proxy: {:?})",
        config.headless, config.proxy
    );
    let browser = Browser::launch_with_config(stealth).await?;
    let page = browser.new_page("about:blank").await?;
    Ok((browser, page))
}

/// Result of the mouse-based like routine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LikeClick {
    /// The heart toggled to the unlike state after the click.
    Liked,
    /// The unlike state was already present; nothing to do.
    AlreadyLiked,
    /// No like glyph on the current view.
    NotFound,
    /// Clicked, but the state change could not be verified.
    Unconfirmed,
}

/// Locate the like button via its SVG glyph, returning the clickable
/// ancestor's selector and center coordinates. Takes the last match: on a
/// post view, earlier hearts belong to comments.
const FIND_LIKE_JS: &str = r#"(() => {
    const glyphs = [...document.querySelectorAll("svg[aria-label='Like']")];
    const target = glyphs.length
        ? glyphs[glyphs.length - 1]
        : document.querySelector("svg[aria-label*='Like'][width='24']");
    if (!target) return null;
    let el = target.closest("button, [role='button']") || target;
    const rect = el.getBoundingClientRect();
    if (!rect.width || !rect.height) return null;
    const path = [];
    let node = el;
    while (node && node !== document.body) {
        let selector = node.tagName.toLowerCase();
        if (node.id) {
            path.unshift('#' + node.id);
            break;
        }
        const siblings = Array.from(node.parentNode?.children || []);
        const index = siblings.indexOf(node) + 1;
        if (siblings.length > 1) selector += ':nth-child(' + index + ')';
        path.unshift(selector);
        node = node.parentNode;
    }
    return {
        x: rect.x + rect.width / 2,
        y: rect.y + rect.height / 2,
        selector: path.join(' > ')
    };
})()"#;

const UNLIKE_PRESENT_JS: &str = "!!document.querySelector(\"svg[aria-label*='Unlike']\")";

/// Whether the current post already shows the unlike (filled heart) state.
pub async fn is_already_liked(page: &Page) -> Result<bool> {
    Ok(page.evaluate(UNLIKE_PRESENT_JS).await?)
}

/// Like the post on the current view by moving the mouse to the heart and
/// clicking it, then verifying the unlike state appeared.
pub async fn like_with_mouse(page: &Page) -> Result<LikeClick> {
    if is_already_liked(page).await? {
        return Ok(LikeClick::AlreadyLiked);
    }

    let target: Option<serde_json::Value> = page.evaluate(FIND_LIKE_JS).await?;
    let Some(target) = target else {
        debug!("like_with_mouse: no like glyph found");
        return Ok(LikeClick::NotFound);
    };

    let x = target["x"].as_f64().unwrap_or(0.0);
    let y = target["y"].as_f64().unwrap_or(0.0);
    let selector = target["selector"].as_str().unwrap_or("").to_string();
    if selector.is_empty() {
        return Ok(LikeClick::NotFound);
    }

    debug!("like_with_mouse: heart at ({:.0}, {:.0})", x, y);
    page.session()
        .dispatch_mouse_event(eoka::cdp::MouseEventType::MouseMoved, x, y, None, None)
        .await?;
    page.wait(300).await;
    page.human_click(&selector).await?;
    page.wait(500).await;

    if page.evaluate(UNLIKE_PRESENT_JS).await? {
        return Ok(LikeClick::Liked);
    }
    // The glyph may have been swapped out before the check; treat a missing
    // Like glyph as a toggle too.
    let like_still_present: bool = page
        .evaluate("!!document.querySelector(\"svg[aria-label='Like']\")")
        .await?;
    if !like_still_present {
        Ok(LikeClick::Liked)
    } else {
        Ok(LikeClick::Unconfirmed)
    }
}
