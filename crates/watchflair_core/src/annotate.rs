/*
 * SPDX-FileCopyrightText: 2026 RedHunt07 - WatchFlair Project
 * SPDX-License-Identifier: AGPL-3.0-only
 */

use crate::dom::{self, graft_many, selector, wrap_many, Fragment, NodeHandle, Placement};
use crate::identity::Identity;
use crate::page_context::PageSnapshot;
use crate::rules::{compile_rules, CompiledAnchor, CompiledRule, CompiledSource};
use anyhow::{anyhow, Result};
use scraper::{ElementRef, Html, Node};
use std::collections::HashSet;
use tracing::{debug, info};
use watchflair_protocol::{PageContext, Theme};

pub const WATCHER_HTML_MODERN: &str = r#" <span class="font-small">[<i>Watches You</i>]</span>"#;
pub const WATCHER_HTML_CLASSIC: &str = r#" [<i>Watches You</i>]"#;
pub const DEFAULT_BLOCKED_STYLE: &str = "color: #808080;";

/// Marker markup per theme plus the wrapper used for blocked links.
#[derive(Debug, Clone)]
pub struct Markers {
    modern: Fragment,
    classic: Fragment,
    blocked_wrapper: Node,
}

impl Markers {
    pub fn new(modern_html: &str, classic_html: &str, blocked_style: &str) -> Result<Self> {
        let modern = Fragment::parse(modern_html);
        let classic = Fragment::parse(classic_html);
        if modern.is_empty() || classic.is_empty() {
            return Err(anyhow!("watcher marker markup must not be empty"));
        }
        let style = blocked_style.replace('&', "&amp;").replace('"', "&quot;");
        let blocked_wrapper = Fragment::parse(&format!(
            r#"<span class="watchflair-blocked" style="{style}"></span>"#
        ))
        .first_element()
        .ok_or_else(|| anyhow!("blocked wrapper did not parse"))?;
        Ok(Self {
            modern,
            classic,
            blocked_wrapper,
        })
    }

    pub fn for_theme(&self, theme: Theme) -> &Fragment {
        match theme {
            Theme::Modern => &self.modern,
            Theme::Classic => &self.classic,
        }
    }

    pub fn blocked_wrapper(&self) -> &Node {
        &self.blocked_wrapper
    }
}

impl Default for Markers {
    fn default() -> Self {
        Self {
            modern: Fragment::parse(WATCHER_HTML_MODERN),
            classic: Fragment::parse(WATCHER_HTML_CLASSIC),
            blocked_wrapper: Fragment::parse(&format!(
                r#"<span class="watchflair-blocked" style="{DEFAULT_BLOCKED_STYLE}"></span>"#
            ))
            .first_element()
            .unwrap_or(Node::Document),
        }
    }
}

/// An author-attributed region found on the page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkerPlan {
    pub role: &'static str,
    pub author: Identity,
    pub anchor: NodeHandle,
    pub placement: Placement,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    SelfAuthor,
    Watcher,
    Unrelated,
}

pub fn classify(author: &Identity, watchers: &HashSet<Identity>, active_user: &Identity) -> Classification {
    if author == active_user {
        Classification::SelfAuthor
    } else if watchers.contains(author) {
        Classification::Watcher
    } else {
        Classification::Unrelated
    }
}

/// Walks every rule and resolves each matched element to an author and an insertion point.
/// Elements missing either are skipped.
pub fn plan_markers(page: &PageSnapshot, rules: &[CompiledRule]) -> Vec<MarkerPlan> {
    let doc = &page.document;
    let mut found = Vec::new();
    let mut anchors = Vec::new();
    for rule in rules {
        let limit = if rule.first_only { 1 } else { usize::MAX };
        for el in doc.select(&rule.element).take(limit) {
            let Some(author) = resolve_author(page, el, &rule.author) else {
                debug!("{}: no author found, skipping", rule.role);
                continue;
            };
            let Some(anchor) = resolve_anchor(el, &rule.anchor) else {
                debug!("{}: '{author}' has no insertion point, skipping", rule.role);
                continue;
            };
            found.push((rule.role, author, rule.placement));
            anchors.push(anchor);
        }
    }
    found
        .into_iter()
        .zip(dom::handles_of(doc, &anchors))
        .filter_map(|((role, author, placement), handle)| {
            Some(MarkerPlan {
                role,
                author,
                anchor: handle?,
                placement,
            })
        })
        .collect()
}

fn resolve_author(page: &PageSnapshot, el: ElementRef<'_>, sources: &[CompiledSource]) -> Option<Identity> {
    sources.iter().find_map(|src| match src {
        CompiledSource::OwnHref => el.value().attr("href").and_then(Identity::from_profile_link),
        CompiledSource::LinkWithin(sel) => el
            .select(sel)
            .next()
            .and_then(|a| a.value().attr("href"))
            .and_then(Identity::from_profile_link),
        CompiledSource::TextWithin(sel) => el
            .select(sel)
            .next()
            .and_then(|t| Identity::from_display(&t.text().collect::<String>())),
        CompiledSource::PageOwner => page.page_owner(),
    })
}

fn resolve_anchor<'a>(el: ElementRef<'a>, anchor: &CompiledAnchor) -> Option<ElementRef<'a>> {
    match anchor {
        CompiledAnchor::Element => Some(el),
        CompiledAnchor::Within(sel) => el.select(sel).next(),
    }
}

/// Keeps the plans whose author watches the active user, logging each verdict.
pub fn select_watchers(
    plans: Vec<MarkerPlan>,
    watchers: &HashSet<Identity>,
    active_user: &Identity,
) -> Vec<MarkerPlan> {
    plans
        .into_iter()
        .filter(|plan| {
            let verdict = classify(&plan.author, watchers, active_user);
            match verdict {
                Classification::Watcher => debug!("{}: '{}' => watches you", plan.role, plan.author),
                Classification::Unrelated => debug!("{}: '{}' => does not watch you", plan.role, plan.author),
                Classification::SelfAuthor => debug!("{}: '{}' => yourself", plan.role, plan.author),
            }
            verdict == Classification::Watcher
        })
        .collect()
}

/// Text leaves of every profile link whose target is blocked (the viewer excepted).
pub fn blocked_link_leaves(doc: &Html, blocked: &HashSet<Identity>, active_user: &Identity) -> Result<Vec<NodeHandle>> {
    let sel = selector("a[href]")?;
    let links: Vec<_> = doc
        .select(&sel)
        .filter(|a| {
            a.value()
                .attr("href")
                .and_then(Identity::from_profile_link)
                .is_some_and(|target| &target != active_user && blocked.contains(&target))
        })
        .collect();
    Ok(dom::text_leaves(doc, &links))
}

/// Inserts `marker` at every planned anchor. Not idempotent.
pub fn render_markers(doc: &mut Html, plans: &[MarkerPlan], marker: &Fragment) -> Result<usize> {
    let anchors: Vec<_> = plans.iter().map(|p| (p.anchor, p.placement)).collect();
    graft_many(doc, &anchors, marker)?;
    Ok(plans.len())
}

/// Wraps every leaf in the blocked style. Not idempotent.
pub fn render_blocked(doc: &mut Html, leaves: &[NodeHandle], wrapper: &Node) -> Result<usize> {
    wrap_many(doc, leaves, wrapper)?;
    Ok(leaves.len())
}

/// Both passes in one go over an already-resolved context.
///
/// Calling this twice on the same page inserts every marker twice; [`AnnotatedPage`] is the
/// guarded entry point.
pub fn annotate(
    page: &mut PageSnapshot,
    context: PageContext,
    watchers: &HashSet<Identity>,
    blocked: &HashSet<Identity>,
    active_user: &Identity,
    markers: &Markers,
) -> Result<(usize, usize)> {
    let rules = compile_rules(context)?;
    let plans = select_watchers(plan_markers(page, &rules), watchers, active_user);
    let marked = render_markers(&mut page.document, &plans, markers.for_theme(context.theme))?;
    let leaves = blocked_link_leaves(&page.document, blocked, active_user)?;
    let dimmed = render_blocked(&mut page.document, &leaves, markers.blocked_wrapper())?;
    Ok((marked, dimmed))
}

/// A page being annotated during one load. Each pass runs at most once.
pub struct AnnotatedPage {
    page: PageSnapshot,
    context: PageContext,
    rules: Vec<CompiledRule>,
    markers: Markers,
    watchers_applied: bool,
    blocked_applied: bool,
}

impl AnnotatedPage {
    pub fn new(page: PageSnapshot, markers: Markers) -> Result<Self> {
        let context = page.context();
        info!("{:?} theme, {:?} page detected", context.theme, context.page_type);
        let rules = compile_rules(context)?;
        Ok(Self {
            page,
            context,
            rules,
            markers,
            watchers_applied: false,
            blocked_applied: false,
        })
    }

    pub fn context(&self) -> PageContext {
        self.context
    }

    pub fn page(&self) -> &PageSnapshot {
        &self.page
    }

    pub fn active_user(&self) -> Option<Identity> {
        self.page.active_user()
    }

    /// Returns the number of markers inserted, or `None` if the pass already ran.
    pub fn apply_watchers(&mut self, watchers: &HashSet<Identity>, active_user: &Identity) -> Result<Option<usize>> {
        if self.watchers_applied {
            debug!("watcher pass already applied, skipping");
            return Ok(None);
        }
        let plans = select_watchers(plan_markers(&self.page, &self.rules), watchers, active_user);
        let marker = self.markers.for_theme(self.context.theme);
        let marked = render_markers(&mut self.page.document, &plans, marker)?;
        self.watchers_applied = true;
        Ok(Some(marked))
    }

    /// Returns the number of text leaves restyled, or `None` if the pass already ran.
    pub fn apply_blocked(&mut self, blocked: &HashSet<Identity>, active_user: &Identity) -> Result<Option<usize>> {
        if self.blocked_applied {
            debug!("blocked pass already applied, skipping");
            return Ok(None);
        }
        let leaves = blocked_link_leaves(&self.page.document, blocked, active_user)?;
        let dimmed = render_blocked(&mut self.page.document, &leaves, self.markers.blocked_wrapper())?;
        self.blocked_applied = true;
        Ok(Some(dimmed))
    }

    pub fn html(&self) -> String {
        self.page.document.html()
    }
}
