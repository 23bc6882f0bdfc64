use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

pub use strum::IntoEnumIterator;

/// External coding platforms we can pull activity from.
///
/// The string form is the slug used in URLs and in the database
/// (`github`, `leetcode`, `gfg`).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Platform {
    Github,
    Leetcode,
    #[serde(rename = "gfg")]
    #[strum(serialize = "gfg")]
    GeeksForGeeks,
}

impl Platform {
    pub fn profile_url(&self, username: &str) -> String {
        match self {
            Platform::Github => format!("https://github.com/{username}"),
            Platform::Leetcode => format!("https://leetcode.com/u/{username}"),
            Platform::GeeksForGeeks => {
                format!("https://www.geeksforgeeks.org/profile/{username}")
            }
        }
    }
}

/// Raw activity counters returned by a platform connector.
///
/// Each platform only fills the fields it knows about; the rest stay zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawCounters {
    pub repos: u32,
    pub contributions: u32,
    pub solved: u32,
    pub score: u32,
    pub rating: u32,
    pub contests: u32,
}

impl RawCounters {
    pub fn github(repos: u32, contributions: u32) -> Self {
        Self {
            repos,
            contributions,
            ..Default::default()
        }
    }

    pub fn leetcode(solved: u32, rating: u32, contests: u32) -> Self {
        Self {
            solved,
            rating,
            contests,
            ..Default::default()
        }
    }

    pub fn gfg(solved: u32, score: u32) -> Self {
        Self {
            solved,
            score,
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn slug_roundtrip() {
        for platform in Platform::iter() {
            let slug = platform.to_string();
            assert_eq!(Platform::from_str(&slug).unwrap(), platform);
        }
        assert_eq!(Platform::GeeksForGeeks.to_string(), "gfg");
    }

    #[test]
    fn unknown_slug_is_rejected() {
        assert!(Platform::from_str("codeforces-v2").is_err());
    }
}
