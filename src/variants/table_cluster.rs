// Copyright 2016-2019 Johannes Köster, David Lähnemann.
// Licensed under the GNU GPLv3 license (https://opensource.org/licenses/GPL-3.0)
// This file may not be copied, modified, or distributed
// except according to those terms.

use std::collections::BTreeMap;

use anyhow::Result;

use crate::errors::Error;
use crate::variants::table::VariantTable;
use crate::variants::{Decision, PropertyValue};

/// The clustered (deduplicated) view over a table of raw calls, together
/// with the mapping back to the underlying rows.
///
/// Cluster membership is fixed at construction; re-clustering requires
/// building a new instance from a fresh raw table.
#[derive(Debug, Getters)]
pub struct VariantTableCluster {
    /// The original raw table. Read-only after clustering.
    #[getset(get = "pub")]
    unclustered_table: VariantTable,
    /// One row per cluster, derived from each cluster's representative.
    /// The decision column of this table is the unit of persistence.
    #[getset(get = "pub")]
    clustered_table: VariantTable,
    row_map: Vec<Vec<usize>>,
}

impl VariantTableCluster {
    pub(crate) fn new(
        unclustered_table: VariantTable,
        clustered_table: VariantTable,
        row_map: Vec<Vec<usize>>,
    ) -> Self {
        // the clusters must form an exact partition of the raw rows
        let mut seen = vec![false; unclustered_table.len()];
        for indices in &row_map {
            assert!(!indices.is_empty(), "bug: clusters are never empty");
            for &idx in indices {
                assert!(
                    idx < seen.len() && !seen[idx],
                    "bug: cluster map is not a partition of the raw table"
                );
                seen[idx] = true;
            }
        }
        assert!(
            seen.iter().all(|&covered| covered),
            "bug: cluster map omits raw rows"
        );
        assert_eq!(
            clustered_table.len(),
            row_map.len(),
            "bug: clustered table and cluster map disagree"
        );

        VariantTableCluster {
            unclustered_table,
            clustered_table,
            row_map,
        }
    }

    /// Raw row indices belonging to clustered row `index`, in raw-table
    /// order.
    pub fn related_indices(&self, index: usize) -> Result<&[usize]> {
        self.row_map
            .get(index)
            .map(|indices| indices.as_slice())
            .ok_or_else(|| {
                Error::OutOfRange {
                    index,
                    size: self.row_map.len(),
                }
                .into()
            })
    }

    /// Every raw call belonging to clustered row `index`, as records. This
    /// is what an external viewer uses to discover the concrete breakpoints
    /// behind a deduplicated event.
    pub fn related_calls(&self, index: usize) -> Result<Vec<BTreeMap<String, PropertyValue>>> {
        let indices = self.related_indices(index)?;
        Ok(self
            .unclustered_table
            .with_calls(|calls| indices.iter().map(|&idx| calls[idx].to_record()).collect()))
    }

    /// Record the reviewer verdict for clustered row `index`. Canonical
    /// mutation path for decisions.
    pub fn set_decision(&self, index: usize, decision: Decision) -> Result<()> {
        self.clustered_table.set_decision(index, decision)
    }
}

#[cfg(test)]
mod tests {
    use bio_types::genome;

    use super::*;
    use crate::variants::clustering::VariantClusterBuilder;
    use crate::variants::{
        VariantCall, VariantCallBuilder, DECISION_COLUMN, MANDATORY_COLUMNS, SAMPLE_COLUMN,
    };

    fn call(sample: &str, chrom1: &str, pos1: u64, chrom2: &str, pos2: u64) -> VariantCall {
        VariantCallBuilder::default()
            .sample(sample)
            .locus1(genome::Locus::new(chrom1.to_owned(), pos1))
            .locus2(genome::Locus::new(chrom2.to_owned(), pos2))
            .build()
            .unwrap()
    }

    fn cluster() -> VariantTableCluster {
        let table = VariantTable::new(
            MANDATORY_COLUMNS.iter().map(|c| (*c).to_owned()).collect(),
            vec![
                call("s1", "1", 100, "5", 100),
                call("s1", "2", 500, "3", 600),
                call("s2", "1", 102, "5", 101),
            ],
        )
        .unwrap();
        VariantClusterBuilder::new(5).cluster(table).unwrap()
    }

    #[test]
    fn test_related_calls() {
        let cluster = cluster();
        let related = cluster.related_calls(0).unwrap();
        assert_eq!(related.len(), 2);
        assert_eq!(
            related[0][SAMPLE_COLUMN],
            PropertyValue::String("s1".to_owned())
        );
        assert_eq!(
            related[1][SAMPLE_COLUMN],
            PropertyValue::String("s2".to_owned())
        );

        let err = cluster.related_calls(2).unwrap_err();
        assert_eq!(
            err.downcast_ref::<Error>(),
            Some(&Error::OutOfRange { index: 2, size: 2 })
        );
    }

    #[test]
    fn test_set_decision_visible_in_clustered_view() {
        let cluster = cluster();
        cluster.set_decision(0, Decision::Maybe).unwrap();
        assert_eq!(
            cluster.clustered_table().row(0).unwrap()[DECISION_COLUMN],
            PropertyValue::String("maybe".to_owned())
        );
        // the raw table is untouched
        assert_eq!(
            cluster.unclustered_table().row(0).unwrap()[DECISION_COLUMN],
            PropertyValue::String("unreviewed".to_owned())
        );
    }
}
