mod schema;

pub use schema::{AgentConfig, BrowserConfig, Config, Credentials, Limits, TimingConfig, Viewport};
