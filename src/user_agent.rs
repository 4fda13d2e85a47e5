//! User-Agent strings for page fetches, downloads and the headless browser.
//!
//! By default every request identifies the tool (RFC 9308). Sites that block
//! unknown clients can be handled with `user_agent = "random"`, which picks
//! one current desktop browser string per run.

use rand::seq::SliceRandom;

/// Project URL for User-Agent identification.
const PROJECT_UA_URL: &str = "https://github.com/fierce/webdl";

/// Config value that selects a random browser User-Agent.
pub const RANDOM_SETTING: &str = "random";

/// Desktop browser User-Agents used for `user_agent = "random"`.
const BROWSER_USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) \
     Chrome/131.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) \
     Chrome/131.0.0.0 Safari/537.36",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) \
     Chrome/131.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:133.0) Gecko/20100101 Firefox/133.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 14.7; rv:133.0) Gecko/20100101 Firefox/133.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) \
     Version/18.1 Safari/605.1.15",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) \
     Chrome/131.0.0.0 Safari/537.36 Edg/131.0.0.0",
];

/// Default User-Agent (identifies the tool).
#[must_use]
pub fn default_user_agent() -> String {
    let version = env!("CARGO_PKG_VERSION");
    format!("webdl/{version} (+{PROJECT_UA_URL})")
}

/// Picks one of the built-in desktop browser User-Agents.
#[must_use]
pub fn random_browser_user_agent() -> String {
    BROWSER_USER_AGENTS
        .choose(&mut rand::thread_rng())
        .map_or_else(default_user_agent, |ua| (*ua).to_string())
}

/// Turns the configured setting into the header value to send.
///
/// `None` or blank → default, `"random"` (any case) → random browser string,
/// anything else verbatim.
#[must_use]
pub fn resolve_user_agent(setting: Option<&str>) -> String {
    match setting.map(str::trim) {
        None | Some("") => default_user_agent(),
        Some(value) if value.eq_ignore_ascii_case(RANDOM_SETTING) => random_browser_user_agent(),
        Some(value) => value.to_string(),
    }
}
