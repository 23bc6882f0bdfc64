use async_trait::async_trait;
use shared::{Platform, RawCounters};

mod gfg;
mod github;
mod leetcode;

pub use gfg::GfgConnector;
pub use github::GithubConnector;
pub use leetcode::LeetcodeConnector;

/// Errors a connector can surface to the sync orchestrator.
///
/// `EntityNotFound` (the username does not exist on the platform) is kept
/// apart from `Transport` so the caller can tell an actionable message from
/// a "try again later" one.
#[derive(Debug, thiserror::Error)]
pub enum ConnectorError {
    #[error("user not found on {platform}")]
    EntityNotFound { platform: Platform },
    #[error("failed to reach {platform}: {source}")]
    Transport {
        platform: Platform,
        #[source]
        source: anyhow::Error,
    },
}

impl ConnectorError {
    pub fn not_found(platform: Platform) -> Self {
        Self::EntityNotFound { platform }
    }

    pub fn transport(
        platform: Platform,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Transport {
            platform,
            source: anyhow::Error::new(source),
        }
    }
}

/// One external coding platform, reduced to a single capability: fetch the
/// raw activity counters for a username.
#[async_trait]
pub trait PlatformConnector: Send + Sync {
    fn platform(&self) -> Platform;

    async fn fetch(&self, username: &str) -> Result<RawCounters, ConnectorError>;
}

/// Registry of the per-platform connectors, built once at startup and
/// managed as Rocket state.
pub struct Connectors {
    github: GithubConnector,
    leetcode: LeetcodeConnector,
    gfg: GfgConnector,
}

impl Connectors {
    pub fn new(github_token: Option<String>) -> anyhow::Result<Self> {
        Ok(Self {
            github: GithubConnector::new(github_token)?,
            leetcode: LeetcodeConnector::new()?,
            gfg: GfgConnector::new()?,
        })
    }

    pub fn get(&self, platform: Platform) -> &dyn PlatformConnector {
        match platform {
            Platform::Github => &self.github,
            Platform::Leetcode => &self.leetcode,
            Platform::GeeksForGeeks => &self.gfg,
        }
    }
}
