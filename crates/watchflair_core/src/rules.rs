/*
 * SPDX-FileCopyrightText: 2026 RedHunt07 - WatchFlair Project
 * SPDX-License-Identifier: AGPL-3.0-only
 */

//! Fixed extraction rule table, one rule set per (page type, theme).

use crate::dom::{selector, Placement};
use anyhow::{Context, Result};
use scraper::Selector;
use watchflair_protocol::{PageContext, PageType, Theme};

/// Where the raw author token of a matched element comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthorSource {
    /// The matched element is itself a profile link.
    OwnHref,
    /// First profile link below the element.
    LinkWithin(&'static str),
    /// Display text below the element, normalized.
    TextWithin(&'static str),
    /// Username segment of the page URL.
    PageOwner,
}

/// Node the marker is placed against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Anchor {
    Element,
    Within(&'static str),
}

#[derive(Debug, Clone, Copy)]
pub struct ExtractionRule {
    /// Role of the author, used in log lines.
    pub role: &'static str,
    pub element: &'static str,
    /// Tried in order until one yields an identity.
    pub author: &'static [AuthorSource],
    pub anchor: Anchor,
    pub placement: Placement,
    pub first_only: bool,
}

const PROFILE_LINK: &str = r#"a[href^="/user/"]"#;

const CLASSIC_COMMENTS: ExtractionRule = ExtractionRule {
    role: "Comment poster",
    element: ".container-comment",
    author: &[AuthorSource::LinkWithin(PROFILE_LINK)],
    anchor: Anchor::Within(".replyto-name"),
    placement: Placement::After,
    first_only: false,
};

const CLASSIC_SHOUTS: ExtractionRule = ExtractionRule {
    role: "Shout poster",
    element: r#"table#page-userpage>tbody>tr:nth-child(2)>td:nth-child(2)>table[id^="shout-"] div.from-header>a[href^="/user/"]"#,
    author: &[AuthorSource::OwnHref],
    anchor: Anchor::Element,
    placement: Placement::After,
    first_only: false,
};

const CLASSIC_PAGE_OWNER: ExtractionRule = ExtractionRule {
    role: "Page owner",
    element: "td.cat tbody>tr>td.addpad.lead",
    author: &[AuthorSource::PageOwner],
    anchor: Anchor::Within("br:last-child"),
    placement: Placement::Before,
    first_only: false,
};

const CLASSIC_SUBMISSION_OWNER: ExtractionRule = ExtractionRule {
    role: "Submission owner",
    element: r#".classic-submission-title.information>a[href^="/user/"]"#,
    author: &[AuthorSource::OwnHref],
    anchor: Anchor::Element,
    placement: Placement::After,
    first_only: false,
};

const CLASSIC_JOURNAL_OWNER: ExtractionRule = ExtractionRule {
    role: "Journal poster",
    element: r#".journal-title-box>a[href^="/user/"]"#,
    author: &[AuthorSource::OwnHref],
    anchor: Anchor::Element,
    placement: Placement::After,
    first_only: false,
};

const CLASSIC_NOTE_SENDER: ExtractionRule = ExtractionRule {
    role: "Note sender",
    element: r#".note-view-container .alt1.head>.title~em>a[href^="/user/"]"#,
    author: &[AuthorSource::OwnHref],
    anchor: Anchor::Element,
    placement: Placement::After,
    first_only: false,
};

const MODERN_COMMENT_AUTHOR: &[AuthorSource] = &[
    AuthorSource::LinkWithin(r#".comment_anchor~div>a[href^="/user/"]"#),
    AuthorSource::TextWithin(".comment_username"),
];

const MODERN_SHOUTS: ExtractionRule = ExtractionRule {
    role: "Shout poster",
    element: ".comment_container",
    author: MODERN_COMMENT_AUTHOR,
    anchor: Anchor::Within(".comment_username"),
    placement: Placement::After,
    first_only: false,
};

const MODERN_COMMENTS: ExtractionRule = ExtractionRule {
    role: "Comment poster",
    element: ".comment_container",
    author: MODERN_COMMENT_AUTHOR,
    anchor: Anchor::Within(".cell>a.inline+span"),
    placement: Placement::After,
    first_only: false,
};

const MODERN_PAGE_OWNER: ExtractionRule = ExtractionRule {
    role: "Page owner",
    element: ".user-profile-main",
    author: &[AuthorSource::LinkWithin(r#".user-nav-avatar-desktop>a[href^="/user/"]"#)],
    anchor: Anchor::Within(".username span[title]"),
    placement: Placement::After,
    first_only: false,
};

const MODERN_JOURNAL_OWNER: ExtractionRule = ExtractionRule {
    role: "Journal poster",
    ..MODERN_PAGE_OWNER
};

const MODERN_SUBMISSION_OWNER: ExtractionRule = ExtractionRule {
    role: "Submission owner",
    element: ".submission-id-sub-container",
    author: &[AuthorSource::LinkWithin(PROFILE_LINK)],
    anchor: Anchor::Element,
    placement: Placement::Append,
    first_only: false,
};

const MODERN_NOTE_SENDER: ExtractionRule = ExtractionRule {
    role: "Note sender",
    element: r#"#message .message-center-note-information.addresses>a[href^="/user/"]"#,
    author: &[AuthorSource::OwnHref],
    anchor: Anchor::Element,
    placement: Placement::After,
    first_only: true,
};

const CLASSIC_USERPAGE: &[ExtractionRule] = &[CLASSIC_SHOUTS, CLASSIC_PAGE_OWNER];
const CLASSIC_JOURNAL: &[ExtractionRule] = &[CLASSIC_COMMENTS, CLASSIC_SUBMISSION_OWNER, CLASSIC_JOURNAL_OWNER];
const CLASSIC_NOTE: &[ExtractionRule] = &[CLASSIC_NOTE_SENDER];
const CLASSIC_OTHER: &[ExtractionRule] = &[CLASSIC_COMMENTS, CLASSIC_SUBMISSION_OWNER];

const MODERN_USERPAGE: &[ExtractionRule] = &[MODERN_SHOUTS, MODERN_PAGE_OWNER];
const MODERN_JOURNAL: &[ExtractionRule] = &[MODERN_COMMENTS, MODERN_JOURNAL_OWNER];
const MODERN_NOTE: &[ExtractionRule] = &[MODERN_SUBMISSION_OWNER, MODERN_NOTE_SENDER];
const MODERN_OTHER: &[ExtractionRule] = &[MODERN_COMMENTS, MODERN_SUBMISSION_OWNER];

pub fn rules_for(ctx: PageContext) -> &'static [ExtractionRule] {
    match (ctx.theme, ctx.page_type) {
        (Theme::Classic, PageType::Userpage) => CLASSIC_USERPAGE,
        (Theme::Classic, PageType::Journal) => CLASSIC_JOURNAL,
        (Theme::Classic, PageType::Note) => CLASSIC_NOTE,
        (Theme::Classic, PageType::Other) => CLASSIC_OTHER,
        (Theme::Modern, PageType::Userpage) => MODERN_USERPAGE,
        (Theme::Modern, PageType::Journal) => MODERN_JOURNAL,
        (Theme::Modern, PageType::Note) => MODERN_NOTE,
        (Theme::Modern, PageType::Other) => MODERN_OTHER,
    }
}

#[derive(Debug)]
pub enum CompiledSource {
    OwnHref,
    LinkWithin(Selector),
    TextWithin(Selector),
    PageOwner,
}

#[derive(Debug)]
pub enum CompiledAnchor {
    Element,
    Within(Selector),
}

/// A rule with its selectors parsed, built once per page.
#[derive(Debug)]
pub struct CompiledRule {
    pub role: &'static str,
    pub element: Selector,
    pub author: Vec<CompiledSource>,
    pub anchor: CompiledAnchor,
    pub placement: Placement,
    pub first_only: bool,
}

impl ExtractionRule {
    pub fn compile(&self) -> Result<CompiledRule> {
        let author = self
            .author
            .iter()
            .map(|src| {
                Ok(match src {
                    AuthorSource::OwnHref => CompiledSource::OwnHref,
                    AuthorSource::LinkWithin(css) => CompiledSource::LinkWithin(selector(css)?),
                    AuthorSource::TextWithin(css) => CompiledSource::TextWithin(selector(css)?),
                    AuthorSource::PageOwner => CompiledSource::PageOwner,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        let anchor = match self.anchor {
            Anchor::Element => CompiledAnchor::Element,
            Anchor::Within(css) => CompiledAnchor::Within(selector(css)?),
        };
        Ok(CompiledRule {
            role: self.role,
            element: selector(self.element).with_context(|| format!("rule {:?}", self.role))?,
            author,
            anchor,
            placement: self.placement,
            first_only: self.first_only,
        })
    }
}

pub fn compile_rules(ctx: PageContext) -> Result<Vec<CompiledRule>> {
    rules_for(ctx).iter().map(ExtractionRule::compile).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all_contexts() -> Vec<PageContext> {
        let mut out = Vec::new();
        for theme in [Theme::Classic, Theme::Modern] {
            for page_type in [PageType::Userpage, PageType::Journal, PageType::Note, PageType::Other] {
                out.push(PageContext { theme, page_type });
            }
        }
        out
    }

    #[test]
    fn every_rule_compiles() {
        for ctx in all_contexts() {
            let compiled = compile_rules(ctx).unwrap();
            assert!(!compiled.is_empty(), "no rules for {ctx:?}");
        }
    }

    #[test]
    fn comments_are_not_scanned_on_notes() {
        for theme in [Theme::Classic, Theme::Modern] {
            let rules = rules_for(PageContext { theme, page_type: PageType::Note });
            assert!(rules.iter().all(|r| r.role != "Comment poster"));
        }
    }

    #[test]
    fn modern_userpage_anchors_on_username() {
        let rules = rules_for(PageContext {
            theme: Theme::Modern,
            page_type: PageType::Userpage,
        });
        assert_eq!(rules[0].anchor, Anchor::Within(".comment_username"));
    }
}
