/*
 * SPDX-FileCopyrightText: 2026 RedHunt07 - WatchFlair Project
 * SPDX-License-Identifier: AGPL-3.0-only
 */

//! Small helpers over the `scraper` tree: selector compilation, stable node handles and
//! in-place insertion of markup fragments.

use anyhow::{anyhow, Result};
use scraper::{ElementRef, Html, Node, Selector};
use std::collections::{HashMap, HashSet};

pub fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| anyhow!("invalid selector {css:?}: {e:?}"))
}

/// Position of a node in the document arena.
///
/// The arena only grows (inserted nodes are appended, detached nodes stay in place), so a
/// handle taken before a mutation still names the same node afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeHandle(usize);

impl NodeHandle {
    pub fn of(doc: &Html, el: ElementRef<'_>) -> Option<Self> {
        handles_of(doc, &[el]).pop().flatten()
    }
}

/// Handles for a batch of elements, in input order, from a single walk of the arena.
pub fn handles_of(doc: &Html, els: &[ElementRef<'_>]) -> Vec<Option<NodeHandle>> {
    let mut out = vec![None; els.len()];
    let mut wanted: HashMap<_, Vec<usize>> = HashMap::with_capacity(els.len());
    for (slot, el) in els.iter().enumerate() {
        wanted.entry(el.id()).or_default().push(slot);
    }
    for (pos, node) in doc.tree.nodes().enumerate() {
        if wanted.is_empty() {
            break;
        }
        if let Some(slots) = wanted.remove(&node.id()) {
            for slot in slots {
                out[slot] = Some(NodeHandle(pos));
            }
        }
    }
    out
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    After,
    Before,
    Append,
}

/// Parsed markup snippet, flattened in document order with parent indexes.
#[derive(Debug, Clone)]
pub struct Fragment {
    nodes: Vec<(Option<usize>, Node)>,
}

impl Fragment {
    pub fn parse(markup: &str) -> Self {
        let html = Html::parse_fragment(markup);
        let root = html.root_element();
        let mut ids = Vec::new();
        let mut nodes = Vec::new();
        for node in root.descendants().skip(1) {
            let parent = node
                .parent()
                .and_then(|p| ids.iter().position(|id| *id == p.id()));
            ids.push(node.id());
            nodes.push((parent, node.value().clone()));
        }
        Self { nodes }
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// First element of the fragment, used as a wrapper template.
    pub fn first_element(&self) -> Option<Node> {
        self.nodes
            .iter()
            .find(|(_, n)| n.is_element())
            .map(|(_, n)| n.clone())
    }
}

/// Inserts a copy of `fragment` relative to `anchor`. Not idempotent: every call adds nodes.
pub fn graft(doc: &mut Html, anchor: NodeHandle, placement: Placement, fragment: &Fragment) -> Result<()> {
    graft_many(doc, &[(anchor, placement)], fragment)
}

/// [`graft`] at several anchors, resolving every handle up front.
pub fn graft_many(doc: &mut Html, anchors: &[(NodeHandle, Placement)], fragment: &Fragment) -> Result<()> {
    let arena: Vec<_> = doc.tree.nodes().map(|n| n.id()).collect();
    for (anchor, placement) in anchors {
        let anchor_id = *arena
            .get(anchor.0)
            .ok_or_else(|| anyhow!("stale node handle {}", anchor.0))?;
        let mut created = Vec::with_capacity(fragment.nodes.len());
        let mut last_top = None;
        for (parent, value) in &fragment.nodes {
            let id = match parent {
                Some(p) => doc
                    .tree
                    .get_mut(created[*p])
                    .map(|mut n| n.append(value.clone()).id()),
                None => match placement {
                    Placement::After => {
                        let base = last_top.unwrap_or(anchor_id);
                        let id = doc
                            .tree
                            .get_mut(base)
                            .map(|mut n| n.insert_after(value.clone()).id());
                        last_top = id;
                        id
                    }
                    Placement::Before => doc
                        .tree
                        .get_mut(anchor_id)
                        .map(|mut n| n.insert_before(value.clone()).id()),
                    Placement::Append => doc
                        .tree
                        .get_mut(anchor_id)
                        .map(|mut n| n.append(value.clone()).id()),
                },
            };
            created.push(id.ok_or_else(|| anyhow!("node vanished during insertion"))?);
        }
    }
    Ok(())
}

/// Moves each node in `targets` into a fresh copy of `wrapper`, which takes its place.
pub fn wrap_many(doc: &mut Html, targets: &[NodeHandle], wrapper: &Node) -> Result<()> {
    let arena: Vec<_> = doc.tree.nodes().map(|n| n.id()).collect();
    for target in targets {
        let target_id = *arena
            .get(target.0)
            .ok_or_else(|| anyhow!("stale node handle {}", target.0))?;
        let value = doc
            .tree
            .get(target_id)
            .map(|n| n.value().clone())
            .ok_or_else(|| anyhow!("node vanished during wrap"))?;
        let wrapper_id = doc
            .tree
            .get_mut(target_id)
            .map(|mut n| n.insert_before(wrapper.clone()).id())
            .ok_or_else(|| anyhow!("node vanished during wrap"))?;
        if let Some(mut w) = doc.tree.get_mut(wrapper_id) {
            w.append(value);
        }
        if let Some(mut t) = doc.tree.get_mut(target_id) {
            t.detach();
        }
    }
    Ok(())
}

/// Non-blank text nodes below any of `els`, each at most once, in arena order.
pub fn text_leaves(doc: &Html, els: &[ElementRef<'_>]) -> Vec<NodeHandle> {
    let wanted: HashSet<_> = els
        .iter()
        .flat_map(|el| el.descendants())
        .filter(|n| n.value().as_text().is_some_and(|t| !t.trim().is_empty()))
        .map(|n| n.id())
        .collect();
    if wanted.is_empty() {
        return Vec::new();
    }
    doc.tree
        .nodes()
        .enumerate()
        .filter(|(_, n)| wanted.contains(&n.id()))
        .map(|(i, _)| NodeHandle(i))
        .collect()
}
