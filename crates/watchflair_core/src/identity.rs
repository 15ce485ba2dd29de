/*
 * SPDX-FileCopyrightText: 2026 RedHunt07 - WatchFlair Project
 * SPDX-License-Identifier: AGPL-3.0-only
 */

use reqwest::Url;
use std::fmt;

const SITE_HOST: &str = "furaffinity.net";

/// Canonical, comparison-safe username: lowercase ASCII alphanumerics and hyphens only.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Identity(String);

/// Lowercases and strips every character that is not `-` or an ASCII alphanumeric.
pub fn normalize(raw: &str) -> String {
    raw.trim()
        .to_lowercase()
        .chars()
        .filter(|c| *c == '-' || c.is_ascii_alphanumeric())
        .collect()
}

impl Identity {
    /// Display names, text fields and already-canonical values all go through here.
    pub fn from_display(raw: &str) -> Option<Self> {
        let s = normalize(raw);
        if s.is_empty() {
            None
        } else {
            Some(Self(s))
        }
    }

    /// Username segment of a profile link such as `/user/raptor4694/` or
    /// `https://www.furaffinity.net/user/raptor4694`. Links to other hosts, and paths that only
    /// mention `/user/` further along, are not profile links.
    pub fn from_profile_link(href: &str) -> Option<Self> {
        let href = href.trim();
        let path = if href.starts_with('/') && !href.starts_with("//") {
            href.to_string()
        } else {
            let url = if href.starts_with("//") {
                Url::parse(&format!("https:{href}")).ok()?
            } else {
                Url::parse(href).ok()?
            };
            if !is_site_host(url.host_str()?) {
                return None;
            }
            url.path().to_string()
        };
        let rest = path.strip_prefix("/user/")?;
        let end = rest
            .find(|c: char| c == '/' || c == '?' || c == '#')
            .unwrap_or(rest.len());
        Self::from_display(&rest[..end])
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn is_site_host(host: &str) -> bool {
    let host = host.to_ascii_lowercase();
    host == SITE_HOST || host.ends_with(&format!(".{SITE_HOST}"))
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Identity {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_strips_and_lowercases() {
        assert_eq!(normalize("Foo_Bar!"), "foobar");
        assert_eq!(normalize("foobar"), "foobar");
        assert_eq!(normalize("  Mr. Fox-Tail  "), "mrfox-tail");
    }

    #[test]
    fn normalize_strips_every_run_not_just_the_first() {
        assert_eq!(normalize("a..b__c!!d"), "abcd");
        assert_eq!(normalize("~x~y~"), "xy");
    }

    #[test]
    fn normalize_is_idempotent() {
        for raw in ["Foo_Bar!", " ~Ünïcode Näme~ ", "-dash-", "", "12 34"] {
            let once = normalize(raw);
            assert_eq!(normalize(&once), once);
        }
    }

    #[test]
    fn empty_normalization_is_not_an_identity() {
        assert!(Identity::from_display("!!!").is_none());
        assert!(Identity::from_display("   ").is_none());
    }

    #[test]
    fn profile_links() {
        let id = |s: &str| Identity::from_profile_link(s).map(|i| i.to_string());
        assert_eq!(id("/user/raptor4694/").as_deref(), Some("raptor4694"));
        assert_eq!(id("/user/raptor4694").as_deref(), Some("raptor4694"));
        assert_eq!(
            id("https://www.furaffinity.net/user/some-one/?x=1").as_deref(),
            Some("some-one")
        );
        assert_eq!(id("/user/Alice#top").as_deref(), Some("alice"));
        assert_eq!(id("/view/12345/"), None);
        assert_eq!(id("/user/"), None);
        assert_eq!(id("//www.furaffinity.net/user/Bob/").as_deref(), Some("bob"));
    }

    #[test]
    fn only_site_profile_paths_count() {
        let id = |s: &str| Identity::from_profile_link(s).map(|i| i.to_string());
        assert_eq!(id("/login?next=/user/alice/"), None);
        assert_eq!(id("/view/1/#/user/alice/"), None);
        assert_eq!(id("https://example.org/user/alice/"), None);
        assert_eq!(id("https://evil-furaffinity.net/user/alice/"), None);
        assert_eq!(id("https://www.furaffinity.net/gallery/user/alice/"), None);
        assert_eq!(id("user/alice/"), None);
        assert_eq!(id("#"), None);
    }
}
