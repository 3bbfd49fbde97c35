//! Shared harvest state
//!
//! - `InvalidCodeCache`: process-wide, codes confirmed to have no record
//! - `CandidateSet`: per area run, every code already fetched or queued
//! - `BaseIndex`: per area run, observed suffixes for each code base
//!
//! All membership checks are check-and-insert under one lock, so concurrent
//! workers never race on the same code.

use kiadb_common::{CodeBase, PlotCode};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Codes the detail service has confirmed invalid. Never shrinks.
#[derive(Debug, Default)]
pub struct InvalidCodeCache {
    codes: Mutex<HashSet<String>>,
}

impl InvalidCodeCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seen(&self, code: &str) -> bool {
        lock(&self.codes).contains(code)
    }

    /// Returns `true` if the code was not cached before.
    pub fn mark_invalid(&self, code: &str) -> bool {
        lock(&self.codes).insert(code.to_string())
    }

    pub fn len(&self) -> usize {
        lock(&self.codes).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Raw codes already observed or probed during one area run.
#[derive(Debug, Default)]
pub struct CandidateSet {
    codes: Mutex<HashSet<String>>,
}

impl CandidateSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `code`; `false` means some earlier step already claimed it.
    pub fn insert(&self, code: &str) -> bool {
        lock(&self.codes).insert(code.to_string())
    }

    pub fn snapshot(&self) -> HashSet<String> {
        lock(&self.codes).clone()
    }

    pub fn len(&self) -> usize {
        lock(&self.codes).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Observed suffixes per code base. Grows monotonically.
#[derive(Debug, Default)]
pub struct BaseIndex {
    bases: Mutex<BTreeMap<CodeBase, BTreeSet<u8>>>,
}

impl BaseIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, code: &PlotCode) {
        let (base, suffix) = code.decompose();
        lock(&self.bases).entry(base).or_default().insert(suffix);
    }

    pub fn snapshot(&self) -> BTreeMap<CodeBase, BTreeSet<u8>> {
        lock(&self.bases).clone()
    }

    pub fn len(&self) -> usize {
        lock(&self.bases).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Fresh per-area state handed to discovery and exploration.
#[derive(Debug, Default)]
pub struct AreaRunState {
    pub candidates: CandidateSet,
    pub bases: BaseIndex,
}

impl AreaRunState {
    pub fn new() -> Self {
        Self::default()
    }
}
