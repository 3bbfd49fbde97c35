//! Probe planning over the plot-code space
//!
//! Plots of one project are usually numbered in a contiguous run, so the
//! unseen neighbours of a known suffix are probed first, then the rest of
//! the base's suffix range.

use kiadb_common::{CodeBase, PlotCode, SUFFIX_LIMIT};
use std::collections::{BTreeMap, BTreeSet, HashSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbePhase {
    /// Within `radius` of an observed suffix.
    Neighborhood,
    /// Every remaining suffix of the base.
    Sweep,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Probe {
    pub code: PlotCode,
    pub phase: ProbePhase,
}

pub struct CodeSpaceExplorer {
    radius: u8,
    default_base: CodeBase,
}

impl CodeSpaceExplorer {
    pub fn new(radius: u8, default_base: CodeBase) -> Self {
        Self {
            radius,
            default_base,
        }
    }

    pub fn default_base(&self) -> &CodeBase {
        &self.default_base
    }

    /// Ordered probe list for every observed base, skipping codes in `exclude`.
    ///
    /// Falls back to the default base when nothing was observed. Each code
    /// appears at most once; the plan is bounded by `bases * 100`.
    pub fn plan(
        &self,
        bases: &BTreeMap<CodeBase, BTreeSet<u8>>,
        exclude: &HashSet<String>,
    ) -> Vec<Probe> {
        let fallback;
        let bases = if bases.is_empty() {
            tracing::warn!(
                "No code bases observed, using default base {}",
                self.default_base
            );
            fallback = BTreeMap::from([(self.default_base.clone(), BTreeSet::new())]);
            &fallback
        } else {
            bases
        };

        let mut plan = Vec::new();
        for (base, observed) in bases {
            self.plan_base(base, observed, exclude, &mut plan);
        }

        let neighbours = plan
            .iter()
            .filter(|p| p.phase == ProbePhase::Neighborhood)
            .count();
        tracing::info!(
            "Planned {} probes across {} base(s) ({} neighbourhood, {} sweep)",
            plan.len(),
            bases.len(),
            neighbours,
            plan.len() - neighbours
        );
        plan
    }

    fn plan_base(
        &self,
        base: &CodeBase,
        observed: &BTreeSet<u8>,
        exclude: &HashSet<String>,
        plan: &mut Vec<Probe>,
    ) {
        let mut covered = [false; SUFFIX_LIMIT as usize];

        for &suffix in observed {
            let low = suffix.saturating_sub(self.radius);
            let high = suffix.saturating_add(self.radius).min(SUFFIX_LIMIT - 1);
            for candidate in low..=high {
                self.push(base, candidate, ProbePhase::Neighborhood, exclude, &mut covered, plan);
            }
        }

        for candidate in 0..SUFFIX_LIMIT {
            self.push(base, candidate, ProbePhase::Sweep, exclude, &mut covered, plan);
        }
    }

    fn push(
        &self,
        base: &CodeBase,
        suffix: u8,
        phase: ProbePhase,
        exclude: &HashSet<String>,
        covered: &mut [bool],
        plan: &mut Vec<Probe>,
    ) {
        if covered[suffix as usize] {
            return;
        }
        covered[suffix as usize] = true;

        let Ok(code) = base.with_suffix(suffix) else {
            return;
        };
        if exclude.contains(code.as_str()) {
            return;
        }
        plan.push(Probe { code, phase });
    }
}
