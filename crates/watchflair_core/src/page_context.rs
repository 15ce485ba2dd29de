/*
 * SPDX-FileCopyrightText: 2026 RedHunt07 - WatchFlair Project
 * SPDX-License-Identifier: AGPL-3.0-only
 */

use crate::dom::selector;
use crate::identity::Identity;
use reqwest::Url;
use scraper::Html;
use watchflair_protocol::{PageContext, PageType, Theme};

const CLASSIC_STATIC_PATH: &str = "/themes/classic";

/// A loaded page: where it came from and its parsed markup.
pub struct PageSnapshot {
    pub url: String,
    pub document: Html,
}

impl PageSnapshot {
    pub fn parse(url: &str, markup: &str) -> Self {
        Self {
            url: url.to_string(),
            document: Html::parse_document(markup),
        }
    }

    pub fn context(&self) -> PageContext {
        PageContext {
            theme: detect_theme(&self.document),
            page_type: classify_path(&site_path(&self.url)),
        }
    }

    /// The logged-in viewer, from the `#my-username` header link.
    pub fn active_user(&self) -> Option<Identity> {
        let sel = selector("a#my-username").ok()?;
        let link = self.document.select(&sel).next()?;
        if let Some(id) = link.value().attr("href").and_then(Identity::from_profile_link) {
            return Some(id);
        }
        let text = link.text().next()?;
        Identity::from_display(text)
    }

    /// Owner of a userpage, taken from the URL itself.
    pub fn page_owner(&self) -> Option<Identity> {
        let path = site_path(&self.url);
        let rest = path.strip_prefix("user/")?;
        Identity::from_profile_link(&format!("/user/{rest}"))
    }
}

pub fn detect_theme(doc: &Html) -> Theme {
    let classic = selector("body")
        .ok()
        .and_then(|sel| doc.select(&sel).next())
        .and_then(|body| body.value().attr("data-static-path"))
        .is_some_and(|p| p == CLASSIC_STATIC_PATH);
    if classic {
        Theme::Classic
    } else {
        Theme::Modern
    }
}

/// Site-relative path without the leading slash, e.g. `user/alice/`.
pub fn site_path(url: &str) -> String {
    match Url::parse(url) {
        Ok(u) => u.path().trim_start_matches('/').to_string(),
        Err(_) => {
            let path = url.split(|c: char| c == '?' || c == '#').next().unwrap_or_default();
            path.trim_start_matches('/').to_string()
        }
    }
}

pub fn classify_path(path: &str) -> PageType {
    if path.starts_with("user/") {
        PageType::Userpage
    } else if path.starts_with("journal/") {
        PageType::Journal
    } else if path.starts_with("msg/pms/") {
        PageType::Note
    } else {
        PageType::Other
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn theme_from_static_path() {
        let classic = Html::parse_document(r#"<html><body data-static-path="/themes/classic"></body></html>"#);
        let modern = Html::parse_document(r#"<html><body data-static-path="/themes/beta"></body></html>"#);
        let bare = Html::parse_document("<html><body></body></html>");
        assert_eq!(detect_theme(&classic), Theme::Classic);
        assert_eq!(detect_theme(&modern), Theme::Modern);
        assert_eq!(detect_theme(&bare), Theme::Modern);
    }

    #[test]
    fn page_types_by_prefix() {
        assert_eq!(classify_path("user/alice/"), PageType::Userpage);
        assert_eq!(classify_path("journal/123/"), PageType::Journal);
        assert_eq!(classify_path("msg/pms/1/55/"), PageType::Note);
        assert_eq!(classify_path("view/555/"), PageType::Other);
        assert_eq!(classify_path("journals/alice/"), PageType::Other);
        assert_eq!(classify_path(""), PageType::Other);
    }

    #[test]
    fn site_path_handles_urls_and_paths() {
        assert_eq!(site_path("https://www.furaffinity.net/user/alice/"), "user/alice/");
        assert_eq!(site_path("https://www.furaffinity.net/view/1/?upload-successful"), "view/1/");
        assert_eq!(site_path("/msg/pms/1/2/#message"), "msg/pms/1/2/");
    }

    #[test]
    fn context_is_deterministic() {
        let page = PageSnapshot::parse(
            "https://www.furaffinity.net/journal/42/",
            r#"<html><body data-static-path="/themes/classic"></body></html>"#,
        );
        let a = page.context();
        let b = page.context();
        assert_eq!(a, b);
        assert_eq!(
            a,
            PageContext {
                theme: Theme::Classic,
                page_type: PageType::Journal
            }
        );
    }

    #[test]
    fn active_user_from_href_or_text() {
        let by_href = PageSnapshot::parse(
            "https://www.furaffinity.net/view/1/",
            r#"<html><body><a id="my-username" href="/user/bob/">~Bob</a></body></html>"#,
        );
        assert_eq!(by_href.active_user().map(|i| i.to_string()).as_deref(), Some("bob"));

        let by_text = PageSnapshot::parse(
            "https://www.furaffinity.net/view/1/",
            r##"<html><body><a id="my-username" class="top-heading hideonmobile" href="#">~Bob_The.Fox</a></body></html>"##,
        );
        assert_eq!(by_text.active_user().map(|i| i.to_string()).as_deref(), Some("bobthefox"));

        let anonymous = PageSnapshot::parse("https://www.furaffinity.net/view/1/", "<html><body></body></html>");
        assert!(anonymous.active_user().is_none());
    }

    #[test]
    fn page_owner_from_url() {
        let page = PageSnapshot::parse("https://www.furaffinity.net/user/alice/", "");
        assert_eq!(page.page_owner().map(|i| i.to_string()).as_deref(), Some("alice"));
        let other = PageSnapshot::parse("https://www.furaffinity.net/view/1/", "");
        assert!(other.page_owner().is_none());
    }
}
