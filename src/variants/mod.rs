// Copyright 2016-2019 Johannes Köster, David Lähnemann.
// Licensed under the GNU GPLv3 license (https://opensource.org/licenses/GPL-3.0)
// This file may not be copied, modified, or distributed
// except according to those terms.

//! Data model for structural variant calls under review.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

use anyhow::Result;
use bio_types::genome::{self, AbstractLocus};
use derive_builder::Builder;
use itertools::Itertools;

use crate::errors::Error;

pub mod clustering;
pub mod table;
pub mod table_cluster;

pub use clustering::VariantClusterBuilder;
pub use table_cluster::VariantTableCluster;

pub const SAMPLE_COLUMN: &str = "sample";
pub const CHR1_COLUMN: &str = "chr1";
pub const BP1_COLUMN: &str = "bp1";
pub const CHR2_COLUMN: &str = "chr2";
pub const BP2_COLUMN: &str = "bp2";
pub const DECISION_COLUMN: &str = "decision";

lazy_static! {
    /// Columns every call table has to provide, in schema order.
    pub static ref MANDATORY_COLUMNS: Vec<&'static str> = vec![
        SAMPLE_COLUMN,
        CHR1_COLUMN,
        BP1_COLUMN,
        CHR2_COLUMN,
        BP2_COLUMN,
        DECISION_COLUMN,
    ];
}

/// Reviewer verdict recorded for a clustered variant event.
#[derive(
    Display,
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    EnumString,
    EnumIter,
    IntoStaticStr,
)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    #[strum(serialize = "unreviewed")]
    Unreviewed,
    #[strum(serialize = "accept")]
    Accept,
    #[strum(serialize = "decline")]
    Decline,
    #[strum(serialize = "maybe")]
    Maybe,
}

impl Default for Decision {
    fn default() -> Self {
        Decision::Unreviewed
    }
}

impl Decision {
    pub fn parse(value: &str) -> Result<Self> {
        value.parse().map_err(|_| {
            Error::InvalidDecision {
                value: value.to_owned(),
            }
            .into()
        })
    }
}

/// A single cell value. Multi-valued properties arrive pre-split from the
/// parser as lists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    Number(f64),
    String(String),
    NumberList(Vec<f64>),
    StringList(Vec<String>),
}

impl PropertyValue {
    pub fn as_str(&self) -> Option<&str> {
        if let PropertyValue::String(value) = self {
            Some(value)
        } else {
            None
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        if let PropertyValue::Number(value) = self {
            Some(*value)
        } else {
            None
        }
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            PropertyValue::Number(value) => write!(f, "{}", value),
            PropertyValue::String(value) => write!(f, "{}", value),
            PropertyValue::NumberList(values) => write!(f, "{}", values.iter().join(",")),
            PropertyValue::StringList(values) => write!(f, "{}", values.iter().join(",")),
        }
    }
}

/// One raw call emitted by an SV caller: a sample, two breakpoint endpoints
/// and an open-ended set of caller-specific properties. Immutable except for
/// the decision and explicitly updated properties.
#[derive(Debug, Clone, Builder, Getters, CopyGetters, Setters)]
pub struct VariantCall {
    #[builder(setter(into))]
    #[getset(get = "pub")]
    sample: String,
    #[getset(get = "pub")]
    locus1: genome::Locus,
    #[getset(get = "pub")]
    locus2: genome::Locus,
    #[builder(default)]
    #[getset(get = "pub")]
    properties: BTreeMap<String, PropertyValue>,
    #[builder(default)]
    #[getset(get_copy = "pub", set = "pub(crate)")]
    decision: Decision,
}

impl VariantCall {
    /// Breakpoints with the lower endpoint first, invariant under the
    /// orientation in which a caller reported them.
    pub fn canonical_loci(&self) -> (&genome::Locus, &genome::Locus) {
        if cmp_loci(&self.locus1, &self.locus2) != Ordering::Greater {
            (&self.locus1, &self.locus2)
        } else {
            (&self.locus2, &self.locus1)
        }
    }

    /// Content-derived key identifying the event this call describes.
    /// Stable across runs and raw input orderings; used to match persisted
    /// decisions to clusters.
    pub fn identity_key(&self) -> String {
        let (first, second) = self.canonical_loci();
        format!(
            "{}|{}:{}|{}:{}",
            self.sample,
            first.contig(),
            first.pos(),
            second.contig(),
            second.pos()
        )
    }

    pub fn property(&self, name: &str) -> Option<&PropertyValue> {
        self.properties.get(name)
    }

    pub(crate) fn set_property(&mut self, name: &str, value: PropertyValue) {
        self.properties.insert(name.to_owned(), value);
    }

    /// Render this call as a record mapping column names to values, as
    /// served to the surrounding API layer.
    pub fn to_record(&self) -> BTreeMap<String, PropertyValue> {
        let mut record = self.properties.clone();
        record.insert(
            SAMPLE_COLUMN.to_owned(),
            PropertyValue::String(self.sample.clone()),
        );
        record.insert(
            CHR1_COLUMN.to_owned(),
            PropertyValue::String(self.locus1.contig().to_owned()),
        );
        record.insert(
            BP1_COLUMN.to_owned(),
            PropertyValue::Number(self.locus1.pos() as f64),
        );
        record.insert(
            CHR2_COLUMN.to_owned(),
            PropertyValue::String(self.locus2.contig().to_owned()),
        );
        record.insert(
            BP2_COLUMN.to_owned(),
            PropertyValue::Number(self.locus2.pos() as f64),
        );
        record.insert(
            DECISION_COLUMN.to_owned(),
            PropertyValue::String(self.decision.to_string()),
        );
        record
    }
}

pub(crate) fn cmp_loci(a: &genome::Locus, b: &genome::Locus) -> Ordering {
    (a.contig(), a.pos()).cmp(&(b.contig(), b.pos()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call(sample: &str, chrom1: &str, pos1: u64, chrom2: &str, pos2: u64) -> VariantCall {
        VariantCallBuilder::default()
            .sample(sample)
            .locus1(genome::Locus::new(chrom1.to_owned(), pos1))
            .locus2(genome::Locus::new(chrom2.to_owned(), pos2))
            .build()
            .unwrap()
    }

    #[test]
    fn test_decision_roundtrip() {
        for value in &["unreviewed", "accept", "decline", "maybe"] {
            assert_eq!(Decision::parse(value).unwrap().to_string(), *value);
        }
        assert!(Decision::parse("yes").is_err());
    }

    #[test]
    fn test_identity_key_orientation_invariant() {
        let a = call("s1", "1", 100, "5", 200);
        let b = call("s1", "5", 200, "1", 100);
        assert_eq!(a.identity_key(), b.identity_key());
        assert_eq!(a.identity_key(), "s1|1:100|5:200");
    }

    #[test]
    fn test_record_contains_mandatory_columns() {
        let record = call("s1", "2", 10, "3", 20).to_record();
        for column in MANDATORY_COLUMNS.iter() {
            assert!(record.contains_key(*column));
        }
        assert_eq!(record[SAMPLE_COLUMN].as_str(), Some("s1"));
        assert_eq!(
            record[DECISION_COLUMN],
            PropertyValue::String("unreviewed".to_owned())
        );
    }
}
