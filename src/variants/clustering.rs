// Copyright 2016-2019 Johannes Köster, David Lähnemann.
// Licensed under the GNU GPLv3 license (https://opensource.org/licenses/GPL-3.0)
// This file may not be copied, modified, or distributed
// except according to those terms.

//! Grouping of raw calls into clusters that describe the same breakpoint
//! event.
//!
//! Two calls are related when their contig pairs agree on both ends (the
//! orientation in which the endpoints were reported may be swapped) and both
//! corresponding positions lie within a fixed tolerance. Relatedness is
//! closed transitively: the clusters are the connected components of the
//! relation, so a chain of pairwise matches joins one cluster even when its
//! outermost calls would not match directly.

use std::collections::HashMap;

use anyhow::Result;
use bio_types::genome::{self, AbstractLocus};
use itertools::Itertools;
use ordered_float::NotNan;
use petgraph::unionfind::UnionFind;
use rayon::prelude::*;

use crate::variants::table::VariantTable;
use crate::variants::table_cluster::VariantTableCluster;
use crate::variants::VariantCall;

/// Default window within which two breakpoint positions are considered to
/// describe the same event.
pub const DEFAULT_BP_TOLERANCE: u64 = 5;

/// Partitions a raw call table into clusters and derives the deduplicated
/// view.
#[derive(new, Debug, Clone, Copy)]
pub struct VariantClusterBuilder {
    bp_tolerance: u64,
}

impl Default for VariantClusterBuilder {
    fn default() -> Self {
        VariantClusterBuilder::new(DEFAULT_BP_TOLERANCE)
    }
}

/// A set of raw calls judged to describe the same underlying event.
#[derive(Debug, Clone, Getters, CopyGetters)]
pub struct Cluster {
    /// Raw row indices belonging to this cluster, ascending.
    #[getset(get = "pub")]
    row_indices: Vec<usize>,
    /// Raw row index of the call representing this cluster in the
    /// deduplicated view.
    #[getset(get_copy = "pub")]
    representative: usize,
}

impl VariantClusterBuilder {
    /// Consume `table` and partition its rows into clusters. The clusters
    /// form an exact partition: every raw row belongs to exactly one of
    /// them. Clusters are ordered by their smallest raw row index, so the
    /// result is reproducible for identical input.
    pub fn cluster(&self, table: VariantTable) -> Result<VariantTableCluster> {
        let clusters = table.with_calls(|calls| self.partition(calls));
        let representatives = table.with_calls(|calls| {
            clusters
                .iter()
                .map(|cluster| calls[cluster.representative()].clone())
                .collect_vec()
        });
        let clustered = VariantTable::new(table.column_names().to_vec(), representatives)?;
        let row_map = clusters
            .iter()
            .map(|cluster| cluster.row_indices().clone())
            .collect_vec();

        Ok(VariantTableCluster::new(table, clustered, row_map))
    }

    fn partition(&self, calls: &[VariantCall]) -> Vec<Cluster> {
        // Restrict pairwise comparison to calls sharing the canonical contig
        // pair. Bucket membership is disjoint, hence buckets can be examined
        // in parallel.
        let mut buckets: HashMap<(&str, &str), Vec<usize>> = HashMap::new();
        for (idx, call) in calls.iter().enumerate() {
            let (first, second) = call.canonical_loci();
            buckets
                .entry((first.contig(), second.contig()))
                .or_insert_with(Vec::new)
                .push(idx);
        }

        let edges: Vec<(usize, usize)> = buckets
            .into_iter()
            .map(|(_, bucket)| bucket)
            .collect_vec()
            .into_par_iter()
            .flat_map(|bucket| self.related_pairs(calls, bucket))
            .collect();

        let mut union_find = UnionFind::new(calls.len());
        for (a, b) in edges {
            union_find.union(a, b);
        }

        let mut components: HashMap<usize, Vec<usize>> = HashMap::new();
        for (idx, label) in union_find.into_labeling().into_iter().enumerate() {
            components.entry(label).or_insert_with(Vec::new).push(idx);
        }

        components
            .into_iter()
            .map(|(_, mut row_indices)| {
                row_indices.sort_unstable();
                let representative = self.select_representative(calls, &row_indices);
                Cluster {
                    row_indices,
                    representative,
                }
            })
            .sorted_by_key(|cluster| cluster.row_indices()[0])
            .collect_vec()
    }

    /// All related row pairs within one contig-pair bucket. Rows are sorted
    /// by canonical first position; any related pair differs by at most the
    /// tolerance there, so comparison stops once the window is exceeded.
    fn related_pairs(&self, calls: &[VariantCall], mut bucket: Vec<usize>) -> Vec<(usize, usize)> {
        bucket.sort_unstable_by_key(|&idx| {
            let (first, _) = calls[idx].canonical_loci();
            (first.pos(), idx)
        });

        let mut pairs = Vec::new();
        for (i, &a) in bucket.iter().enumerate() {
            let (first_a, _) = calls[a].canonical_loci();
            for &b in &bucket[i + 1..] {
                let (first_b, _) = calls[b].canonical_loci();
                if first_b.pos() > first_a.pos() + self.bp_tolerance {
                    break;
                }
                if self.related(&calls[a], &calls[b]) {
                    pairs.push((a, b));
                }
            }
        }
        pairs
    }

    /// Proximity test between two calls, considering both endpoint
    /// orientations.
    fn related(&self, a: &VariantCall, b: &VariantCall) -> bool {
        let near = |x: &genome::Locus, y: &genome::Locus| {
            x.contig() == y.contig()
                && x.pos().max(y.pos()) - x.pos().min(y.pos()) <= self.bp_tolerance
        };
        (near(a.locus1(), b.locus1()) && near(a.locus2(), b.locus2()))
            || (near(a.locus1(), b.locus2()) && near(a.locus2(), b.locus1()))
    }

    /// Deterministic representative: the call closest to the component
    /// centroid of canonical positions. Ties are broken by content (sample,
    /// canonical loci) before falling back to the raw index, so the choice
    /// is reproducible even when the raw input order changes.
    fn select_representative(&self, calls: &[VariantCall], row_indices: &[usize]) -> usize {
        let positions = |idx: usize| {
            let (first, second) = calls[idx].canonical_loci();
            (first.pos() as f64, second.pos() as f64)
        };
        let n = row_indices.len() as f64;
        let (sum1, sum2) = row_indices
            .iter()
            .map(|&idx| positions(idx))
            .fold((0.0, 0.0), |(acc1, acc2), (pos1, pos2)| {
                (acc1 + pos1, acc2 + pos2)
            });
        let (centroid1, centroid2) = (sum1 / n, sum2 / n);

        row_indices
            .iter()
            .copied()
            .min_by_key(|&idx| {
                let call = &calls[idx];
                let (pos1, pos2) = positions(idx);
                let distance = (pos1 - centroid1).abs() + (pos2 - centroid2).abs();
                let (first, second) = call.canonical_loci();
                (
                    NotNan::new(distance).unwrap(),
                    call.sample().clone(),
                    first.contig().to_owned(),
                    first.pos(),
                    second.contig().to_owned(),
                    second.pos(),
                    idx,
                )
            })
            .expect("bug: clusters are never empty")
    }
}
