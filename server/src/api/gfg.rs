use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use shared::{Platform, RawCounters};
use tracing::instrument;

use super::{ConnectorError, PlatformConnector};

// Page loads can be slow; a timeout yields zeroed counters, never a hung
// request.
const PAGE_TIMEOUT: Duration = Duration::from_secs(30);

/// GeeksforGeeks connector: fetches the public profile page as
/// server-rendered HTML and reads the numbers that follow the
/// "Problems Solved" and "Coding Score" labels.
///
/// A missing label yields zero for that counter, not an error; partial
/// signals must not block the rest of the user's stats.
pub struct GfgConnector {
    client: reqwest::Client,
    tag_re: Regex,
    solved_re: Regex,
    score_re: Regex,
}

impl GfgConnector {
    pub fn new() -> anyhow::Result<Self> {
        let client = reqwest::Client::builder().timeout(PAGE_TIMEOUT).build()?;

        Ok(Self {
            client,
            tag_re: Regex::new(r"<[^>]+>")?,
            solved_re: Regex::new(r"(?i)Problems\s+Solved\s*[:\-]?\s*(\d+)")?,
            score_re: Regex::new(r"(?i)Coding\s+Score\s*[:\-]?\s*(\d+)")?,
        })
    }

    fn extract_counters(&self, html: &str, username: &str) -> RawCounters {
        let text = self.tag_re.replace_all(html, " ");

        let solved = first_number(&self.solved_re, &text);
        let score = first_number(&self.score_re, &text);

        if solved.is_none() && score.is_none() {
            tracing::warn!(username, "no recognizable counters on gfg profile page");
        } else if score.is_none() {
            tracing::warn!(username, "gfg coding score label missing, treating as 0");
        }

        RawCounters::gfg(solved.unwrap_or(0), score.unwrap_or(0))
    }
}

fn first_number(re: &Regex, text: &str) -> Option<u32> {
    re.captures(text)
        .and_then(|captures| captures.get(1))
        .and_then(|digits| digits.as_str().parse().ok())
}

#[async_trait]
impl PlatformConnector for GfgConnector {
    fn platform(&self) -> Platform {
        Platform::GeeksForGeeks
    }

    #[instrument(skip(self))]
    async fn fetch(&self, username: &str) -> Result<RawCounters, ConnectorError> {
        let url = format!("https://www.geeksforgeeks.org/profile/{username}/");

        let response = match self.client.get(&url).send().await {
            Ok(response) => response,
            Err(e) if e.is_timeout() => {
                tracing::warn!(username, "gfg page load timed out, returning zeroed counters");
                return Ok(RawCounters::default());
            }
            Err(e) => return Err(ConnectorError::transport(Platform::GeeksForGeeks, e)),
        };

        if response.status().as_u16() == 404 {
            return Err(ConnectorError::not_found(Platform::GeeksForGeeks));
        }
        let response = response
            .error_for_status()
            .map_err(|e| ConnectorError::transport(Platform::GeeksForGeeks, e))?;

        let html = match response.text().await {
            Ok(html) => html,
            Err(e) if e.is_timeout() => {
                tracing::warn!(username, "gfg page read timed out, returning zeroed counters");
                return Ok(RawCounters::default());
            }
            Err(e) => return Err(ConnectorError::transport(Platform::GeeksForGeeks, e)),
        };

        Ok(self.extract_counters(&html, username))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn connector() -> GfgConnector {
        GfgConnector::new().unwrap()
    }

    #[test]
    fn extracts_both_counters() {
        let html = r#"
            <div class="scoreCard">
              <span class="scoreCard_head_left--text">Coding Score</span>
              <span class="scoreCard_head_left--score">1460</span>
            </div>
            <div class="scoreCard">
              <span class="scoreCard_head_left--text">Problems Solved</span>
              <span class="scoreCard_head_left--score">382</span>
            </div>
        "#;

        let counters = connector().extract_counters(html, "someone");
        assert_eq!(counters, RawCounters::gfg(382, 1460));
    }

    #[test]
    fn missing_score_label_degrades_to_zero() {
        let html = "<span>Problems Solved</span><b>57</b>";
        let counters = connector().extract_counters(html, "someone");
        assert_eq!(counters, RawCounters::gfg(57, 0));
    }

    #[test]
    fn unrecognizable_page_yields_zeroes() {
        let counters = connector().extract_counters("<html><body>maintenance</body></html>", "x");
        assert_eq!(counters, RawCounters::default());
    }

    #[test]
    fn labels_are_case_insensitive_and_tolerate_separators() {
        let html = "PROBLEMS SOLVED: 12 ... coding score - 300";
        let counters = connector().extract_counters(html, "someone");
        assert_eq!(counters, RawCounters::gfg(12, 300));
    }
}
