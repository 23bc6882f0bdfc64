use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use shared::{Platform, RawCounters};
use tracing::instrument;

use super::{ConnectorError, PlatformConnector};

const LEETCODE_GRAPHQL: &str = "https://leetcode.com/graphql";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

// Unrated accounts sit at the contest-rating baseline.
const DEFAULT_RATING: u32 = 1300;

const STATS_QUERY: &str = r#"
query getUserProfile($username: String!) {
  matchedUser(username: $username) {
    submitStatsGlobal {
      acSubmissionNum {
        difficulty
        count
      }
    }
  }
  userContestRanking(username: $username) {
    rating
    attendedContestsCount
  }
}
"#;

/// LeetCode connector: a single query against the public GraphQL endpoint,
/// no credential required. A `null` matchedUser is a missing profile, which
/// is reported as `EntityNotFound` rather than a transport failure.
pub struct LeetcodeConnector {
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct StatsResponse {
    data: Option<StatsData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StatsData {
    matched_user: Option<MatchedUser>,
    user_contest_ranking: Option<ContestRanking>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MatchedUser {
    submit_stats_global: Option<SubmitStats>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SubmitStats {
    ac_submission_num: Vec<SubmissionBucket>,
}

#[derive(Debug, Deserialize)]
struct SubmissionBucket {
    difficulty: String,
    count: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ContestRanking {
    rating: Option<f64>,
    attended_contests_count: Option<u32>,
}

impl LeetcodeConnector {
    pub fn new() -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self { client })
    }
}

#[async_trait]
impl PlatformConnector for LeetcodeConnector {
    fn platform(&self) -> Platform {
        Platform::Leetcode
    }

    #[instrument(skip(self))]
    async fn fetch(&self, username: &str) -> Result<RawCounters, ConnectorError> {
        let response = self
            .client
            .post(LEETCODE_GRAPHQL)
            .header("Referer", "https://leetcode.com")
            .json(&serde_json::json!({
                "query": STATS_QUERY,
                "variables": { "username": username },
            }))
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| ConnectorError::transport(Platform::Leetcode, e))?;

        let body: StatsResponse = response
            .json()
            .await
            .map_err(|e| ConnectorError::transport(Platform::Leetcode, e))?;

        counters_from_response(body)
    }
}

fn counters_from_response(body: StatsResponse) -> Result<RawCounters, ConnectorError> {
    let user = body
        .data
        .and_then(|data| {
            data.matched_user
                .map(|user| (user, data.user_contest_ranking))
        })
        .ok_or_else(|| ConnectorError::not_found(Platform::Leetcode))?;

    let (user, ranking) = user;

    // The "All" bucket is the canonical solved count; the per-difficulty
    // buckets are ignored.
    let solved = user
        .submit_stats_global
        .map(|stats| stats.ac_submission_num)
        .unwrap_or_default()
        .iter()
        .find(|bucket| bucket.difficulty.eq_ignore_ascii_case("all"))
        .map(|bucket| bucket.count)
        .unwrap_or(0);

    let (rating, contests) = ranking
        .map(|r| {
            (
                r.rating.map(|x| x as u32).unwrap_or(DEFAULT_RATING),
                r.attended_contests_count.unwrap_or(0),
            )
        })
        .unwrap_or((DEFAULT_RATING, 0));

    Ok(RawCounters::leetcode(solved, rating, contests))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(body: &str) -> Result<RawCounters, ConnectorError> {
        counters_from_response(serde_json::from_str(body).unwrap())
    }

    #[test]
    fn full_profile() {
        let counters = parse(
            r#"{
                "data": {
                    "matchedUser": {
                        "submitStatsGlobal": {
                            "acSubmissionNum": [
                                { "difficulty": "All", "count": 321 },
                                { "difficulty": "Easy", "count": 200 },
                                { "difficulty": "Medium", "count": 100 },
                                { "difficulty": "Hard", "count": 21 }
                            ]
                        }
                    },
                    "userContestRanking": {
                        "rating": 1654.3,
                        "attendedContestsCount": 12
                    }
                }
            }"#,
        )
        .unwrap();

        assert_eq!(counters, RawCounters::leetcode(321, 1654, 12));
    }

    #[test]
    fn unknown_username_is_entity_not_found() {
        let result = parse(r#"{ "data": { "matchedUser": null, "userContestRanking": null } }"#);
        assert!(matches!(
            result,
            Err(ConnectorError::EntityNotFound {
                platform: Platform::Leetcode
            })
        ));
    }

    #[test]
    fn missing_contest_ranking_defaults_to_baseline() {
        let counters = parse(
            r#"{
                "data": {
                    "matchedUser": {
                        "submitStatsGlobal": {
                            "acSubmissionNum": [ { "difficulty": "All", "count": 5 } ]
                        }
                    },
                    "userContestRanking": null
                }
            }"#,
        )
        .unwrap();

        assert_eq!(counters, RawCounters::leetcode(5, 1300, 0));
    }
}
