/*
 * SPDX-FileCopyrightText: 2026 RedHunt07 - WatchFlair Project
 * SPDX-License-Identifier: AGPL-3.0-only
 */

pub mod annotate;
pub mod config;
pub mod dom;
pub mod fetch;
pub mod identity;
pub mod net_metrics;
pub mod page_context;
pub mod relation_cache;
pub mod rules;
pub mod runtime;
pub mod store;
