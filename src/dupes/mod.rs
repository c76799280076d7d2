//! Duplicate Detection Engine.
//!
//! Two-stage, per fragment kind: exact-signature bucketing first, then
//! pairwise weighted similarity over whatever did not bucket together. The
//! pairwise stage is O(n²) and fans out over the rayon pool.

pub mod signature;
pub mod similarity;

use crate::analysis::{FileAnalysis, Fragment, FragmentKind};
use rayon::prelude::*;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::OnceLock;
use tracing::{debug, info};

/// Suggested refactoring for a duplicate group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefactorKind {
    ExtractMethod,
    ExtractComponent,
    Consolidate,
}

impl RefactorKind {
    pub fn display_name(&self) -> &'static str {
        match self {
            RefactorKind::ExtractMethod => "extract method",
            RefactorKind::ExtractComponent => "extract component",
            RefactorKind::Consolidate => "consolidate",
        }
    }
}

/// Estimated effort to consolidate a group
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Effort {
    Low,
    Medium,
    High,
}

impl Effort {
    fn from_complexity(complexity: f64) -> Self {
        if complexity < 8.0 {
            Effort::Low
        } else if complexity < 20.0 {
            Effort::Medium
        } else {
            Effort::High
        }
    }
}

/// A group of fragments judged similar above the threshold
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DuplicateMatch {
    pub members: Vec<Fragment>,
    pub kind: FragmentKind,

    /// Combined similarity score in [0, 1]; 1.0 for exact groups, the
    /// minimum pair score for near groups
    pub similarity: f64,

    /// Weighted structural token count of a representative member
    pub complexity: f64,

    /// `(occurrences - 1) * complexity`
    pub priority: f64,

    pub effort: Effort,
    pub suggestion: RefactorKind,
}

/// Finds exact and near duplicates across all analyzed files
pub struct DuplicateDetector {
    threshold: f64,
}

impl DuplicateDetector {
    pub fn new() -> Self {
        Self {
            threshold: similarity::NEAR_DUPLICATE_THRESHOLD,
        }
    }

    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    /// Run both stages over every fragment kind. Output is sorted by
    /// refactoring priority, descending.
    pub fn detect(&self, analyses: &[FileAnalysis]) -> Vec<DuplicateMatch> {
        let fragments: Vec<&Fragment> =
            analyses.iter().flat_map(|a| a.fragments.iter()).collect();

        info!("Duplicate scan over {} fragments", fragments.len());

        let mut matches = Vec::new();
        for kind in [
            FragmentKind::MethodBody,
            FragmentKind::StyleRule,
            FragmentKind::TemplateBlock,
        ] {
            let of_kind: Vec<&Fragment> =
                fragments.iter().copied().filter(|f| f.kind == kind).collect();
            matches.extend(self.detect_kind(kind, &of_kind));
        }

        // The same group is never reported twice
        let mut seen: HashSet<String> = HashSet::new();
        matches.retain(|m| seen.insert(group_key(m)));

        matches.sort_by(|a, b| {
            b.priority
                .partial_cmp(&a.priority)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        info!("Found {} duplicate groups", matches.len());
        matches
    }

    fn detect_kind(&self, kind: FragmentKind, fragments: &[&Fragment]) -> Vec<DuplicateMatch> {
        if fragments.len() < 2 {
            return Vec::new();
        }

        let signatures: Vec<u64> = fragments.iter().map(|f| signature::signature(f)).collect();
        let normalized: Vec<String> = fragments.iter().map(|f| signature::normalize(f)).collect();

        // Stage 1: exact-signature buckets
        let mut buckets: HashMap<u64, Vec<usize>> = HashMap::new();
        for (i, sig) in signatures.iter().enumerate() {
            buckets.entry(*sig).or_default().push(i);
        }

        let mut matches = Vec::new();
        for indices in buckets.values().filter(|v| v.len() > 1) {
            let members: Vec<Fragment> = indices.iter().map(|&i| fragments[i].clone()).collect();
            matches.push(self.build_match(kind, members, 1.0));
        }

        // Stage 2: pairwise scoring across buckets
        let pairs: Vec<(usize, usize)> = (0..fragments.len())
            .flat_map(|i| ((i + 1)..fragments.len()).map(move |j| (i, j)))
            .filter(|&(i, j)| signatures[i] != signatures[j])
            .collect();

        debug!("Scoring {} candidate pairs ({:?})", pairs.len(), kind);

        let scored: Vec<(usize, usize, f64)> = pairs
            .par_iter()
            .filter_map(|&(i, j)| {
                let score = match kind {
                    FragmentKind::MethodBody => similarity::method_similarity(
                        fragments[i],
                        fragments[j],
                        &normalized[i],
                        &normalized[j],
                    ),
                    FragmentKind::TemplateBlock => similarity::template_similarity(
                        fragments[i],
                        fragments[j],
                        &normalized[i],
                        &normalized[j],
                    ),
                    FragmentKind::StyleRule => {
                        similarity::style_similarity(&normalized[i], &normalized[j])
                    }
                };
                (score >= self.threshold && score < similarity::EXACT_CUTOFF)
                    .then_some((i, j, score))
            })
            .collect();

        // Merge qualifying pairs into connected groups; a group scores the
        // minimum of its pair scores
        let mut parent: Vec<usize> = (0..fragments.len()).collect();
        fn find(parent: &mut Vec<usize>, x: usize) -> usize {
            if parent[x] != x {
                let root = find(parent, parent[x]);
                parent[x] = root;
            }
            parent[x]
        }
        for &(i, j, _) in &scored {
            let (ri, rj) = (find(&mut parent, i), find(&mut parent, j));
            if ri != rj {
                parent[ri] = rj;
            }
        }

        let mut group_members: HashMap<usize, Vec<usize>> = HashMap::new();
        let mut group_score: HashMap<usize, f64> = HashMap::new();
        for &(i, j, score) in &scored {
            let root = find(&mut parent, i);
            group_members.entry(root).or_default().extend([i, j]);
            let entry = group_score.entry(root).or_insert(1.0);
            *entry = entry.min(score);
        }

        for (root, mut indices) in group_members {
            indices.sort_unstable();
            indices.dedup();
            let members: Vec<Fragment> = indices.iter().map(|&i| fragments[i].clone()).collect();
            let score = group_score[&root];
            matches.push(self.build_match(kind, members, score));
        }

        matches
    }

    fn build_match(&self, kind: FragmentKind, members: Vec<Fragment>, score: f64) -> DuplicateMatch {
        let complexity = complexity_score(&members[0]);
        let priority = (members.len().saturating_sub(1)) as f64 * complexity;
        let suggestion = match kind {
            FragmentKind::MethodBody if members.len() > 2 => RefactorKind::Consolidate,
            FragmentKind::MethodBody => RefactorKind::ExtractMethod,
            FragmentKind::TemplateBlock => RefactorKind::ExtractComponent,
            FragmentKind::StyleRule => RefactorKind::Consolidate,
        };

        DuplicateMatch {
            members,
            kind,
            similarity: score,
            complexity,
            priority,
            effort: Effort::from_complexity(complexity),
            suggestion,
        }
    }
}

impl Default for DuplicateDetector {
    fn default() -> Self {
        Self::new()
    }
}

/// Group identity: sorted member file paths and fragment names
fn group_key(m: &DuplicateMatch) -> String {
    let mut parts: Vec<String> = m
        .members
        .iter()
        .map(|f| format!("{}#{}", f.file.display(), f.name))
        .collect();
    parts.sort();
    parts.join("|")
}

/// Weighted count of structural tokens: elements, classes, control
/// directives, expressions
pub fn complexity_score(fragment: &Fragment) -> f64 {
    static ELEMENT_RE: OnceLock<Regex> = OnceLock::new();
    static DIRECTIVE_RE: OnceLock<Regex> = OnceLock::new();
    static EXPR_RE: OnceLock<Regex> = OnceLock::new();

    let element_re =
        ELEMENT_RE.get_or_init(|| Regex::new(r"<\w+").expect("static regex"));
    let directive_re = DIRECTIVE_RE.get_or_init(|| {
        Regex::new(r"\b(?:if|else|for|foreach|while|switch|match)\b|\{%|@(?:if|foreach|for)")
            .expect("static regex")
    });
    let expr_re = EXPR_RE
        .get_or_init(|| Regex::new(r"\$\w+|\{\{").expect("static regex"));

    let content = &fragment.content;
    let elements = element_re.find_iter(content).count() as f64;
    let classes = fragment.classes.len() as f64;
    let directives = directive_re.find_iter(content).count() as f64;
    let expressions = expr_re.find_iter(content).count() as f64;

    elements * 1.0 + classes * 0.5 + directives * 2.0 + expressions * 0.5
}
