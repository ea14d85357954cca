// Copyright 2026 Scraperun Contributors
// SPDX-License-Identifier: Apache-2.0

//! Scraperun library — declarative, schema-driven web extraction.
//!
//! A persisted tree of CSS selector records and an ordered list of page
//! actions are interpreted against one live browser page: selector records
//! become scoped DOM queries, action records become clicks, scrolls, and
//! convergence waits, and extraction produces a nested result map whose
//! shape mirrors the selector tree.
//!
//! The flow per action is: build the action's selector subtree ([`tree`]),
//! resolve it into live element handles ([`resolve`]), then either extract
//! data ([`extract`]) or drive the page ([`action`]) — all orchestrated in
//! order by [`job::JobRunner`].

pub mod action;
pub mod driver;
pub mod error;
pub mod extract;
pub mod job;
pub mod record;
pub mod resolve;
pub mod store;
pub mod tree;

pub use error::ScrapeError;
pub use extract::Value;
pub use job::JobRunner;
