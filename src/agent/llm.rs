//! LLM-backed implementation of [`BrowsingAgent`]: the model reasons, a
//! small tool set acts on the page. Task text goes in, ordered result
//! entries come out; the orchestration loops never see any of this.

use super::{AgentStep, BrowsingAgent};
use crate::browser::{self, LikeClick};
use crate::config::AgentConfig;
use crate::{Error, Result};
use async_trait::async_trait;
use eoka::Page;
use reqwest::Client;
use serde_json::{json, Value};
use tracing::{debug, warn};

const MESSAGES_URL: &str = "https://api.anthropic.com/v1/messages";
const API_VERSION: &str = "2023-06-01";
const MAX_RATE_LIMIT_RETRIES: u64 = 5;
const PAGE_TEXT_LIMIT: usize = 1500;
const TOOL_RESULT_LIMIT: usize = 4000;

const SYSTEM_PROMPT: &str = "You are a browser automation agent operating a real, logged-in \
browser session. Work through the task step by step using the tools. Rules:\n\
- To like an Instagram post you MUST use the like_post tool; clicking the heart \
any other way does not register.\n\
- Use report to surface any text the task asks you to extract or return.\n\
- When the task is complete (or clearly impossible), call done with the exact \
result phrase the task asks for.\n\
- Be concise: tool calls, minimal narration.";

/// Delegated agent backed by a messages-API model driving an `eoka` page.
pub struct LlmAgent<'p> {
    page: &'p Page,
    http: Client,
    api_key: String,
    model: String,
}

impl<'p> LlmAgent<'p> {
    /// Build from config; reads the API key from the configured env var and
    /// fails fast when it is missing.
    pub fn from_config(config: &AgentConfig, page: &'p Page) -> Result<Self> {
        Ok(Self {
            page,
            http: Client::new(),
            api_key: config.api_key()?,
            model: config.model.clone(),
        })
    }

    async fn call_api(&self, body: &Value) -> Result<Value> {
        for attempt in 0..MAX_RATE_LIMIT_RETRIES {
            let resp = self
                .http
                .post(MESSAGES_URL)
                .header("x-api-key", &self.api_key)
                .header("anthropic-version", API_VERSION)
                .header("content-type", "application/json")
                .json(body)
                .send()
                .await?;

            let status = resp.status();
            let json: Value = resp.json().await?;

            if status.as_u16() == 429 || json["error"]["type"] == "rate_limit_error" {
                let wait = (attempt + 1) * 5;
                warn!("model rate limited, waiting {}s", wait);
                tokio::time::sleep(std::time::Duration::from_secs(wait)).await;
                continue;
            }
            if let Some(err) = json.get("error") {
                return Err(Error::Agent(format!("model API error: {}", err)));
            }
            return Ok(json);
        }
        Err(Error::Agent("model rate limited after retries".into()))
    }
}

#[async_trait]
impl BrowsingAgent for LlmAgent<'_> {
    async fn run(&self, task: &str, step_budget: u32) -> Result<Vec<AgentStep>> {
        let mut messages: Vec<Value> = vec![json!({ "role": "user", "content": task })];
        let mut steps: Vec<AgentStep> = Vec::new();
        let mut actions_taken: u32 = 0;

        while actions_taken < step_budget {
            let body = json!({
                "model": self.model,
                "max_tokens": 1024,
                "system": SYSTEM_PROMPT,
                "tools": tool_definitions(),
                "messages": messages,
            });
            let resp = self.call_api(&body).await?;

            let content = resp["content"].as_array().cloned().unwrap_or_default();
            let tool_uses: Vec<Value> = content
                .iter()
                .filter(|b| b["type"] == "tool_use")
                .cloned()
                .collect();
            messages.push(json!({ "role": "assistant", "content": content }));
            if tool_uses.is_empty() {
                // End of the model's turn without an action: nudge once, then
                // let the budget run out naturally.
                if resp["stop_reason"] == "end_turn" {
                    messages.push(json!({
                        "role": "user",
                        "content": "Continue with the task. When finished, call done."
                    }));
                    actions_taken += 1;
                    continue;
                }
                break;
            }

            let mut tool_results = Vec::new();
            let mut finished = false;

            for tool_use in &tool_uses {
                let name = tool_use["name"].as_str().unwrap_or("");
                let id = tool_use["id"].as_str().unwrap_or("");
                let input = &tool_use["input"];
                actions_taken += 1;

                debug!("agent tool: {}", name);
                let (result, is_error) = match self.execute_tool(name, input).await {
                    Ok(r) => (r, false),
                    Err(e) => (format!("Error: {}", e), true),
                };
                let truncated = truncate(&result, TOOL_RESULT_LIMIT);

                match name {
                    "done" => {
                        steps.push(AgentStep::done(
                            input["result"].as_str().unwrap_or_default(),
                        ));
                        finished = true;
                    }
                    "report" | "extract" | "like_post" if !is_error => {
                        steps.push(AgentStep::text(truncated.clone()));
                    }
                    _ if is_error => {
                        steps.push(AgentStep::error(truncated.clone()));
                    }
                    _ => {}
                }

                tool_results.push(json!({
                    "type": "tool_result",
                    "tool_use_id": id,
                    "content": truncated,
                    "is_error": is_error,
                }));
            }

            if finished {
                break;
            }
            messages.push(json!({ "role": "user", "content": tool_results }));
        }

        Ok(steps)
    }
}

impl LlmAgent<'_> {
    async fn execute_tool(&self, name: &str, input: &Value) -> Result<String> {
        let page = self.page;
        match name {
            "navigate" => {
                let url = input["url"].as_str().unwrap_or("about:blank");
                page.goto(url).await?;
                page.wait(1500).await;
                Ok(format!("At: {}", page.url().await?))
            }
            "click_text" => {
                let text = input["text"].as_str().unwrap_or("");
                let selector = find_by_text(page, text).await?;
                match selector {
                    Some(sel) => {
                        page.click(&sel).await?;
                        page.wait(500).await;
                        Ok(format!("Clicked '{}'", text))
                    }
                    None => Ok(format!("No clickable element with text '{}'", text)),
                }
            }
            "fill" => {
                let selector = input["selector"].as_str().unwrap_or("");
                let value = input["value"].as_str().unwrap_or("");
                page.fill(selector, value).await?;
                Ok(format!("Filled {}", selector))
            }
            "press_key" => {
                let key = input["key"].as_str().unwrap_or("Enter");
                page.human().press_key(key).await?;
                Ok(format!("Pressed {}", key))
            }
            "scroll" => {
                let amount = input["pixels"].as_i64().unwrap_or(800);
                page.execute(&format!("window.scrollBy(0, {})", amount)).await?;
                page.wait(500).await;
                Ok(format!("Scrolled {}px", amount))
            }
            "wait" => {
                let ms = input["ms"].as_u64().unwrap_or(1000);
                page.wait(ms).await;
                Ok(format!("Waited {}ms", ms))
            }
            "page_text" => {
                let text = page.text().await?;
                Ok(text.chars().take(PAGE_TEXT_LIMIT).collect())
            }
            "current_url" => Ok(page.url().await?),
            "extract" => {
                let js = input["js"].as_str().unwrap_or("null");
                let wrapped = format!(
                    "(() => {{ try {{ const __r = (() => {{ {} }})(); \
                     if (__r === undefined || __r === null) return 'null'; \
                     return typeof __r === 'string' ? __r : JSON.stringify(__r); }} \
                     catch(e) {{ return 'Error: ' + e.message; }} }})()",
                    js
                );
                let result: String = page.evaluate(&wrapped).await?;
                Ok(result)
            }
            "report" => Ok(input["text"].as_str().unwrap_or_default().to_string()),
            "like_post" => match browser::like_with_mouse(page).await? {
                LikeClick::Liked => Ok("liked".into()),
                LikeClick::AlreadyLiked => Ok("already liked".into()),
                LikeClick::NotFound => Ok("failed: no like button found".into()),
                LikeClick::Unconfirmed => Ok("failed: like not confirmed".into()),
            },
            "done" => Ok(format!(
                "Done: {}",
                input["result"].as_str().unwrap_or_default()
            )),
            other => Err(Error::Agent(format!("unknown tool: {}", other))),
        }
    }
}

/// Find a clickable element containing the text, returning a CSS selector.
async fn find_by_text(page: &Page, text: &str) -> Result<Option<String>> {
    let js = FIND_BY_TEXT_JS.replace("__TEXT__", &serde_json::to_string(text).unwrap());
    Ok(page.evaluate(&js).await?)
}

const FIND_BY_TEXT_JS: &str = r#"(() => {
    const text = __TEXT__;
    const walker = document.createTreeWalker(document.body, NodeFilter.SHOW_ELEMENT, null);
    while (walker.nextNode()) {
        const el = walker.currentNode;
        if (el.textContent?.trim().toLowerCase().includes(text.toLowerCase())) {
            if (el.matches('a, button, input, select, [role="button"], [onclick]')) {
                if (el.id) return '#' + el.id;
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
                return path.join(' > ');
            }
        }
    }
    return null;
})()"#;

fn truncate(text: &str, limit: usize) -> String {
    if text.len() > limit {
        let mut end = limit;
        while !text.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}...[truncated]", &text[..end])
    } else {
        text.to_string()
    }
}

fn tool_definitions() -> Value {
    json!([
        {
            "name": "navigate",
            "description": "Navigate to a URL and wait for it to settle.",
            "input_schema": {
                "type": "object",
                "properties": { "url": { "type": "string" } },
                "required": ["url"]
            }
        },
        {
            "name": "click_text",
            "description": "Click the first clickable element whose text contains the given string.",
            "input_schema": {
                "type": "object",
                "properties": { "text": { "type": "string" } },
                "required": ["text"]
            }
        },
        {
            "name": "fill",
            "description": "Type a value into the element matching a CSS selector.",
            "input_schema": {
                "type": "object",
                "properties": {
                    "selector": { "type": "string" },
                    "value": { "type": "string" }
                },
                "required": ["selector", "value"]
            }
        },
        {
            "name": "press_key",
            "description": "Press a key (Enter, Tab, Escape, ArrowDown, ...).",
            "input_schema": {
                "type": "object",
                "properties": { "key": { "type": "string" } },
                "required": ["key"]
            }
        },
        {
            "name": "scroll",
            "description": "Scroll vertically by a pixel amount (negative scrolls up).",
            "input_schema": {
                "type": "object",
                "properties": { "pixels": { "type": "integer" } }
            }
        },
        {
            "name": "wait",
            "description": "Wait N milliseconds for content to load or settle.",
            "input_schema": {
                "type": "object",
                "properties": { "ms": { "type": "integer" } },
                "required": ["ms"]
            }
        },
        {
            "name": "page_text",
            "description": "Visible page text, truncated.",
            "input_schema": { "type": "object", "properties": {} }
        },
        {
            "name": "current_url",
            "description": "The current page URL.",
            "input_schema": { "type": "object", "properties": {} }
        },
        {
            "name": "extract",
            "description": "Run JavaScript in the page and return the result as text.",
            "input_schema": {
                "type": "object",
                "properties": { "js": { "type": "string" } },
                "required": ["js"]
            }
        },
        {
            "name": "report",
            "description": "Surface extracted text (URLs, usernames, captions) as a task result.",
            "input_schema": {
                "type": "object",
                "properties": { "text": { "type": "string" } },
                "required": ["text"]
            }
        },
        {
            "name": "like_post",
            "description": "Like the Instagram post on the current view via mouse interaction. \
                            The ONLY way to like a post. Reports 'liked', 'already liked', or failure.",
            "input_schema": { "type": "object", "properties": {} }
        },
        {
            "name": "done",
            "description": "Finish the task with the result phrase it asked for.",
            "input_schema": {
                "type": "object",
                "properties": { "result": { "type": "string" } },
                "required": ["result"]
            }
        }
    ])
}
