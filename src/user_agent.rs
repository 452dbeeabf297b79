//! User-Agent strings and rotating provider identities.
//!
//! Document downloads identify the tool honestly. Search provider traffic goes
//! out under an [`Identity`] (browser User-Agent plus session cookie) that the
//! throttle controller replaces on a randomized schedule.

use rand::Rng;
use rand::seq::SliceRandom;

/// Project URL for User-Agent identification on document downloads.
const PROJECT_UA_URL: &str = "https://github.com/igsor/bibdl";

/// Length of the hex session identifier carried in the provider cookie.
const SESSION_ID_LEN: usize = 16;

/// Browser User-Agent pool used for provider identities.
const BROWSER_USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (X11; Linux x86_64; rv:128.0) Gecko/20100101 Firefox/128.0",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:127.0) Gecko/20100101 Firefox/127.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 14_5) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.5 Safari/605.1.15",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/126.0.0.0 Safari/537.36",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/125.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/126.0.0.0 Safari/537.36",
];

/// Default User-Agent for document downloads (identifies the tool).
#[must_use]
pub(crate) fn default_download_user_agent() -> String {
    let version = env!("CARGO_PKG_VERSION");
    format!("bibdl/{version} (bibliography-tool; +{PROJECT_UA_URL})")
}

/// Outbound signature presented to the search provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    user_agent: String,
    session_id: String,
}

impl Identity {
    /// Creates an identity from explicit parts.
    #[must_use]
    pub fn new(user_agent: impl Into<String>, session_id: impl Into<String>) -> Self {
        Self {
            user_agent: user_agent.into(),
            session_id: session_id.into(),
        }
    }

    /// Draws a fresh identity: random browser User-Agent and random session id.
    #[must_use]
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let user_agent = BROWSER_USER_AGENTS
            .choose(rng)
            .copied()
            .unwrap_or(BROWSER_USER_AGENTS[0]);
        let session_id: String = (0..SESSION_ID_LEN)
            .filter_map(|_| char::from_digit(rng.gen_range(0..16), 16))
            .collect();
        Self::new(user_agent, session_id)
    }

    /// User-Agent header value.
    #[must_use]
    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    /// Session identifier.
    #[must_use]
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Cookie header value carrying the session identifier.
    #[must_use]
    pub fn cookie_header(&self) -> String {
        format!("GSP=ID={}", self.session_id)
    }
}
