use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use shared::{Platform, RawCounters};
use tracing::instrument;

use super::{ConnectorError, PlatformConnector};

const CONTRIBUTIONS_QUERY: &str = r#"
query($login: String!) {
  user(login: $login) {
    contributionsCollection {
      contributionCalendar {
        totalContributions
      }
    }
  }
}
"#;

const REPOS_PER_PAGE: u32 = 100;
// Hard stop for the repo pagination loop; 50 pages is 5000 repositories.
const MAX_REPO_PAGES: u32 = 50;

/// GitHub connector: REST pagination for the repository count plus one
/// GraphQL query for the rolling 365-day contribution total. The GraphQL
/// endpoint needs a bearer token; without one the contribution count
/// degrades to zero and the repo count still resolves.
pub struct GithubConnector {
    octocrab: octocrab::Octocrab,
    has_token: bool,
}

#[derive(Debug, Serialize)]
struct RepoPageParams {
    per_page: u32,
    page: u32,
}

#[derive(Debug, Deserialize)]
struct ContributionsResponse {
    data: Option<ContributionsData>,
}

#[derive(Debug, Deserialize)]
struct ContributionsData {
    user: Option<ContributionsUser>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ContributionsUser {
    contributions_collection: ContributionsCollection,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ContributionsCollection {
    contribution_calendar: ContributionCalendar,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ContributionCalendar {
    total_contributions: u32,
}

impl GithubConnector {
    pub fn new(token: Option<String>) -> anyhow::Result<Self> {
        let has_token = token.is_some();
        let mut builder = octocrab::Octocrab::builder();
        if let Some(token) = token {
            builder = builder.personal_token(token);
        }

        Ok(Self {
            octocrab: builder.build()?,
            has_token,
        })
    }

    #[instrument(skip(self))]
    async fn repo_count(&self, username: &str) -> Result<u32, ConnectorError> {
        let mut count = 0u32;
        for page in 1..=MAX_REPO_PAGES {
            let repos: Vec<serde_json::Value> = self
                .octocrab
                .get(
                    format!("/users/{username}/repos"),
                    Some(&RepoPageParams {
                        per_page: REPOS_PER_PAGE,
                        page,
                    }),
                )
                .await
                .map_err(map_github_error)?;

            count += repos.len() as u32;
            if repos.len() < REPOS_PER_PAGE as usize {
                break;
            }
        }

        Ok(count)
    }

    #[instrument(skip(self))]
    async fn contribution_count(&self, username: &str) -> Result<u32, ConnectorError> {
        let response: ContributionsResponse = self
            .octocrab
            .graphql(&serde_json::json!({
                "query": CONTRIBUTIONS_QUERY,
                "variables": { "login": username },
            }))
            .await
            .map_err(map_github_error)?;

        let user = response
            .data
            .and_then(|data| data.user)
            .ok_or_else(|| ConnectorError::not_found(Platform::Github))?;

        Ok(user
            .contributions_collection
            .contribution_calendar
            .total_contributions)
    }
}

#[async_trait]
impl PlatformConnector for GithubConnector {
    fn platform(&self) -> Platform {
        Platform::Github
    }

    async fn fetch(&self, username: &str) -> Result<RawCounters, ConnectorError> {
        let repos = self.repo_count(username).await?;

        let contributions = if self.has_token {
            self.contribution_count(username).await?
        } else {
            tracing::warn!("GITHUB_TOKEN not set, contribution count degrades to zero");
            0
        };

        Ok(RawCounters::github(repos, contributions))
    }
}

fn map_github_error(error: octocrab::Error) -> ConnectorError {
    match &error {
        octocrab::Error::GitHub { source, .. } if source.status_code.as_u16() == 404 => {
            ConnectorError::not_found(Platform::Github)
        }
        _ => ConnectorError::transport(Platform::Github, error),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contributions_response_parses() {
        let body = r#"{
            "data": {
                "user": {
                    "contributionsCollection": {
                        "contributionCalendar": { "totalContributions": 512 }
                    }
                }
            }
        }"#;

        let response: ContributionsResponse = serde_json::from_str(body).unwrap();
        let user = response.data.unwrap().user.unwrap();
        assert_eq!(
            user.contributions_collection
                .contribution_calendar
                .total_contributions,
            512
        );
    }

    #[test]
    fn missing_user_means_not_found() {
        let body = r#"{ "data": { "user": null } }"#;
        let response: ContributionsResponse = serde_json::from_str(body).unwrap();
        assert!(response.data.unwrap().user.is_none());
    }
}
