use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Serialize;
use shared::{Platform, RawCounters, XpWeights};
use tracing::instrument;

use crate::api::{ConnectorError, PlatformConnector};
use crate::db::types::{PlatformAccountRecord, UserStatsRecord};

/// Errors surfaced by a user-triggered sync. `NotLinked` and the
/// connector's `EntityNotFound` are actionable; everything else maps to a
/// generic "try again" at the API boundary.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("no {platform} account linked")]
    NotLinked { platform: Platform },
    #[error(transparent)]
    Connector(#[from] ConnectorError),
    #[error("storage failure: {0}")]
    Storage(#[from] anyhow::Error),
}

/// What a successful sync returns to the caller.
#[derive(Debug, Clone, Serialize)]
pub struct SyncOutcome {
    pub platform: Platform,
    pub username: String,
    pub counters: RawCounters,
    pub xp: u32,
    pub total_xp: u32,
    pub level: u32,
}

/// Persistence seam for the orchestrator. `DB` is the production
/// implementation; tests swap in an in-memory one.
#[async_trait]
pub trait SyncStore: Send + Sync {
    async fn platform_account(
        &self,
        login: &str,
        platform: Platform,
    ) -> anyhow::Result<Option<PlatformAccountRecord>>;

    /// Overwrite one platform's counters/subtotal and recompute the user's
    /// total from the latest subtotals, all atomically.
    async fn apply_sync(
        &self,
        account: &PlatformAccountRecord,
        counters: &RawCounters,
        xp: u32,
        weights: &XpWeights,
        day: NaiveDate,
    ) -> anyhow::Result<UserStatsRecord>;
}

/// One user-triggered sync: account lookup, connector fetch, XP formula,
/// aggregator apply. On connector failure nothing is written and the error
/// goes back to the caller; the engine never retries on its own.
#[instrument(skip(store, connector, weights))]
pub async fn sync_platform<S: SyncStore + ?Sized>(
    store: &S,
    connector: &dyn PlatformConnector,
    login: &str,
    platform: Platform,
    weights: &XpWeights,
    day: NaiveDate,
) -> Result<SyncOutcome, SyncError> {
    let account = store
        .platform_account(login, platform)
        .await?
        .ok_or(SyncError::NotLinked { platform })?;

    let counters = connector.fetch(&account.username).await?;
    let xp = weights.xp_for(platform, &counters);

    let stats = store
        .apply_sync(&account, &counters, xp, weights, day)
        .await?;

    Ok(SyncOutcome {
        platform,
        username: account.username,
        counters,
        xp,
        total_xp: stats.total_xp.max(0) as u32,
        level: stats.level.max(1) as u32,
    })
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use super::*;

    /// In-memory stand-in for the Postgres store. `apply_sync` mirrors the
    /// production semantics: overwrite the platform subtotal, then recompute
    /// the total from the freshly stored subtotals.
    #[derive(Default)]
    struct MemoryStore {
        accounts: HashMap<(String, String), PlatformAccountRecord>,
        subtotals: Mutex<HashMap<i32, HashMap<String, u32>>>,
        applies: AtomicUsize,
    }

    impl MemoryStore {
        fn with_account(mut self, login: &str, platform: Platform, username: &str) -> Self {
            let id = self.accounts.len() as i32 + 1;
            self.accounts.insert(
                (login.to_string(), platform.to_string()),
                PlatformAccountRecord {
                    id,
                    user_id: 7,
                    platform: platform.to_string(),
                    username: username.to_string(),
                    profile_url: platform.profile_url(username),
                    last_synced: None,
                },
            );
            self
        }

        fn total_xp(&self, user_id: i32) -> u32 {
            self.subtotals
                .lock()
                .unwrap()
                .get(&user_id)
                .map(|by_platform| by_platform.values().sum())
                .unwrap_or(0)
        }
    }

    #[async_trait]
    impl SyncStore for MemoryStore {
        async fn platform_account(
            &self,
            login: &str,
            platform: Platform,
        ) -> anyhow::Result<Option<PlatformAccountRecord>> {
            Ok(self
                .accounts
                .get(&(login.to_string(), platform.to_string()))
                .cloned())
        }

        async fn apply_sync(
            &self,
            account: &PlatformAccountRecord,
            _counters: &RawCounters,
            xp: u32,
            weights: &XpWeights,
            _day: NaiveDate,
        ) -> anyhow::Result<UserStatsRecord> {
            self.applies.fetch_add(1, Ordering::SeqCst);
            let mut subtotals = self.subtotals.lock().unwrap();
            let by_platform = subtotals.entry(account.user_id).or_default();
            by_platform.insert(account.platform.clone(), xp);
            let total: u32 = by_platform.values().sum();

            Ok(UserStatsRecord {
                total_xp: total as i32,
                level: weights.level_for_xp(total) as i32,
                last_updated: chrono::Utc::now().naive_utc(),
            })
        }
    }

    struct StubConnector {
        platform: Platform,
        counters: Option<RawCounters>,
    }

    #[async_trait]
    impl PlatformConnector for StubConnector {
        fn platform(&self) -> Platform {
            self.platform
        }

        async fn fetch(&self, _username: &str) -> Result<RawCounters, ConnectorError> {
            self.counters
                .ok_or_else(|| ConnectorError::not_found(self.platform))
        }
    }

    fn today() -> NaiveDate {
        "2024-06-15".parse().unwrap()
    }

    #[tokio::test]
    async fn sync_applies_formula_and_totals() {
        let store = MemoryStore::default().with_account("alice", Platform::Github, "alice-gh");
        let connector = StubConnector {
            platform: Platform::Github,
            counters: Some(RawCounters::github(10, 50)),
        };
        let weights = XpWeights::default();

        let outcome = sync_platform(
            &store,
            &connector,
            "alice",
            Platform::Github,
            &weights,
            today(),
        )
        .await
        .unwrap();

        assert_eq!(outcome.xp, 400);
        assert_eq!(outcome.total_xp, 400);
        assert_eq!(outcome.level, 5);
        assert_eq!(outcome.username, "alice-gh");
    }

    #[tokio::test]
    async fn total_is_sum_of_latest_subtotals() {
        let store = MemoryStore::default()
            .with_account("alice", Platform::Github, "alice-gh")
            .with_account("alice", Platform::Leetcode, "alice-lc");
        let weights = XpWeights::default();

        let github = StubConnector {
            platform: Platform::Github,
            counters: Some(RawCounters::github(10, 50)),
        };
        let leetcode = StubConnector {
            platform: Platform::Leetcode,
            counters: Some(RawCounters::leetcode(30, 1300, 0)),
        };

        sync_platform(&store, &github, "alice", Platform::Github, &weights, today())
            .await
            .unwrap();
        let outcome = sync_platform(
            &store,
            &leetcode,
            "alice",
            Platform::Leetcode,
            &weights,
            today(),
        )
        .await
        .unwrap();

        // 400 from github, 300 from leetcode.
        assert_eq!(outcome.total_xp, 700);
        assert_eq!(store.total_xp(7), 700);

        // Re-syncing a platform overwrites its subtotal instead of
        // double-counting it.
        let github_again = StubConnector {
            platform: Platform::Github,
            counters: Some(RawCounters::github(12, 50)),
        };
        let outcome = sync_platform(
            &store,
            &github_again,
            "alice",
            Platform::Github,
            &weights,
            today(),
        )
        .await
        .unwrap();

        assert_eq!(outcome.xp, 430);
        assert_eq!(outcome.total_xp, 730);
        assert_eq!(store.total_xp(7), 730);
    }

    #[tokio::test]
    async fn concurrent_syncs_for_different_platforms_lose_nothing() {
        let store = MemoryStore::default()
            .with_account("alice", Platform::Github, "alice-gh")
            .with_account("alice", Platform::Leetcode, "alice-lc");
        let weights = XpWeights::default();

        let github = StubConnector {
            platform: Platform::Github,
            counters: Some(RawCounters::github(10, 50)),
        };
        let leetcode = StubConnector {
            platform: Platform::Leetcode,
            counters: Some(RawCounters::leetcode(30, 1300, 0)),
        };

        let (a, b) = tokio::join!(
            sync_platform(&store, &github, "alice", Platform::Github, &weights, today()),
            sync_platform(
                &store,
                &leetcode,
                "alice",
                Platform::Leetcode,
                &weights,
                today(),
            ),
        );
        a.unwrap();
        b.unwrap();

        // Whichever sync recomputes last must have seen the other's
        // subtotal; the store holds the lock across write-and-sum.
        assert_eq!(store.total_xp(7), 700);
        assert_eq!(store.applies.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn missing_account_is_not_linked() {
        let store = MemoryStore::default();
        let connector = StubConnector {
            platform: Platform::Leetcode,
            counters: Some(RawCounters::default()),
        };

        let result = sync_platform(
            &store,
            &connector,
            "bob",
            Platform::Leetcode,
            &XpWeights::default(),
            today(),
        )
        .await;

        assert!(matches!(
            result,
            Err(SyncError::NotLinked {
                platform: Platform::Leetcode
            })
        ));
        assert_eq!(store.applies.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn connector_failure_leaves_stats_untouched() {
        let store = MemoryStore::default().with_account("bob", Platform::Leetcode, "ghost");
        let connector = StubConnector {
            platform: Platform::Leetcode,
            counters: None,
        };

        let result = sync_platform(
            &store,
            &connector,
            "bob",
            Platform::Leetcode,
            &XpWeights::default(),
            today(),
        )
        .await;

        assert!(matches!(
            result,
            Err(SyncError::Connector(ConnectorError::EntityNotFound {
                platform: Platform::Leetcode
            }))
        ));
        assert_eq!(store.applies.load(Ordering::SeqCst), 0);
        assert_eq!(store.total_xp(7), 0);
    }
}
