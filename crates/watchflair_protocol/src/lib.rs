/*
 * SPDX-FileCopyrightText: 2026 RedHunt07 - WatchFlair Project
 * SPDX-License-Identifier: AGPL-3.0-only
 */

use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Theme {
    Classic,
    Modern,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum PageType {
    Userpage,
    Journal,
    Note,
    Other,
}

/// Layout descriptor of one loaded page. Computed once, never mutated.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PageContext {
    pub theme: Theme,
    pub page_type: PageType,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum RelationKind {
    Watchers,
    Blocked,
}

impl RelationKind {
    /// Storage key segment, e.g. `{owner}.watchlist`.
    pub fn key_segment(self) -> &'static str {
        match self {
            RelationKind::Watchers => "watchlist",
            RelationKind::Blocked => "blocklist",
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct PassReport {
    pub applied: bool,
    pub list_size: usize,
    pub marked: usize,
    pub error: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AnnotationReport {
    pub context: PageContext,
    pub active_user: Option<String>,
    pub watchers: PassReport,
    pub blocked: PassReport,
}

impl AnnotationReport {
    pub fn new(context: PageContext) -> Self {
        Self {
            context,
            active_user: None,
            watchers: PassReport::default(),
            blocked: PassReport::default(),
        }
    }
}
