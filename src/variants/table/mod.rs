// Copyright 2016-2019 Johannes Köster, David Lähnemann.
// Licensed under the GNU GPLv3 license (https://opensource.org/licenses/GPL-3.0)
// This file may not be copied, modified, or distributed
// except according to those terms.

//! Ordered, columnar storage of variant calls.

use std::collections::BTreeMap;
use std::sync::{RwLock, RwLockReadGuard};

use anyhow::Result;

use crate::errors::Error;
use crate::variants::{
    Decision, PropertyValue, VariantCall, BP1_COLUMN, BP2_COLUMN, CHR1_COLUMN, CHR2_COLUMN,
    DECISION_COLUMN, MANDATORY_COLUMNS, SAMPLE_COLUMN,
};

pub mod csv;
pub mod progress;

/// A table of variant calls sharing one column schema. Row indices are
/// positional and stable only for the lifetime of the instance.
///
/// All call data sits behind a single `RwLock`, so a cell write appears
/// atomic to concurrent readers and a whole-column snapshot reflects one
/// consistent point in time.
#[derive(Debug)]
pub struct VariantTable {
    column_names: Vec<String>,
    calls: RwLock<Vec<VariantCall>>,
}

impl VariantTable {
    /// Build a table over the given calls. `column_names` is the full schema
    /// including the mandatory columns; extension properties of each call
    /// are expected to agree with it.
    pub fn new(column_names: Vec<String>, calls: Vec<VariantCall>) -> Result<Self> {
        for mandatory in MANDATORY_COLUMNS.iter() {
            if !column_names.iter().any(|column| column == mandatory) {
                return Err(Error::MissingColumn {
                    name: (*mandatory).to_owned(),
                }
                .into());
            }
        }
        Ok(VariantTable {
            column_names,
            calls: RwLock::new(calls),
        })
    }

    fn read(&self) -> RwLockReadGuard<Vec<VariantCall>> {
        self.calls.read().expect("bug: table lock poisoned")
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Column names in schema order, including the decision column.
    pub fn column_names(&self) -> &[String] {
        &self.column_names
    }

    /// A clone of call `index`.
    pub fn call(&self, index: usize) -> Result<VariantCall> {
        let calls = self.read();
        calls.get(index).cloned().ok_or_else(|| {
            Error::OutOfRange {
                index,
                size: calls.len(),
            }
            .into()
        })
    }

    /// Row `index` as a record mapping column names to values.
    pub fn row(&self, index: usize) -> Result<BTreeMap<String, PropertyValue>> {
        Ok(self.call(index)?.to_record())
    }

    /// Rows `[from, to)`. Empty when `from >= to`; out-of-range bounds are
    /// rejected so that caller bugs surface early.
    pub fn row_range(&self, from: usize, to: usize) -> Result<Vec<BTreeMap<String, PropertyValue>>> {
        if from >= to {
            return Ok(Vec::new());
        }
        let calls = self.read();
        if to > calls.len() {
            return Err(Error::InvalidRange {
                from,
                to,
                size: calls.len(),
            }
            .into());
        }
        Ok(calls[from..to].iter().map(|call| call.to_record()).collect())
    }

    /// Set one cell. The decision column and caller-specific extension
    /// columns are writable; the typed core columns are not. This is the
    /// only generic mutation entry point.
    pub fn set_property(&self, index: usize, column: &str, value: PropertyValue) -> Result<()> {
        if !self.column_names.iter().any(|name| name == column) {
            return Err(Error::UnknownColumn {
                name: column.to_owned(),
            }
            .into());
        }
        let mut calls = self.calls.write().expect("bug: table lock poisoned");
        let size = calls.len();
        let call = calls
            .get_mut(index)
            .ok_or(Error::OutOfRange { index, size })?;
        match column {
            DECISION_COLUMN => {
                let decision = Decision::parse(&value.to_string())?;
                call.set_decision(decision);
            }
            SAMPLE_COLUMN | CHR1_COLUMN | BP1_COLUMN | CHR2_COLUMN | BP2_COLUMN => {
                return Err(Error::ImmutableColumn {
                    name: column.to_owned(),
                }
                .into());
            }
            _ => {
                call.set_property(column, value);
            }
        }
        Ok(())
    }

    /// Record the decision for row `index`. Canonical typed mutation path
    /// for reviewer verdicts.
    pub fn set_decision(&self, index: usize, decision: Decision) -> Result<()> {
        let mut calls = self.calls.write().expect("bug: table lock poisoned");
        let size = calls.len();
        let call = calls
            .get_mut(index)
            .ok_or(Error::OutOfRange { index, size })?;
        call.set_decision(decision);
        Ok(())
    }

    /// Consistent snapshot of the whole decision column.
    pub fn decisions(&self) -> Vec<Decision> {
        self.read().iter().map(|call| call.decision()).collect()
    }

    /// Run `f` over the call sequence under a single read lock.
    pub(crate) fn with_calls<T>(&self, f: impl FnOnce(&[VariantCall]) -> T) -> T {
        f(&self.read())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use bio_types::genome;

    use super::*;
    use crate::variants::VariantCallBuilder;

    fn call(sample: &str, chrom1: &str, pos1: u64, chrom2: &str, pos2: u64) -> VariantCall {
        VariantCallBuilder::default()
            .sample(sample)
            .locus1(genome::Locus::new(chrom1.to_owned(), pos1))
            .locus2(genome::Locus::new(chrom2.to_owned(), pos2))
            .build()
            .unwrap()
    }

    fn table() -> VariantTable {
        let mut columns: Vec<String> = MANDATORY_COLUMNS.iter().map(|c| (*c).to_owned()).collect();
        columns.push("caller".to_owned());
        VariantTable::new(
            columns,
            vec![
                call("s1", "1", 100, "5", 100),
                call("s1", "2", 500, "3", 600),
                call("s2", "1", 102, "5", 101),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_missing_mandatory_column() {
        let err = VariantTable::new(vec!["sample".to_owned()], Vec::new()).unwrap_err();
        assert_eq!(
            err.downcast_ref::<Error>(),
            Some(&Error::MissingColumn {
                name: "chr1".to_owned()
            })
        );
    }

    #[test]
    fn test_row_bounds() {
        let table = table();
        assert!(table.row(2).is_ok());
        let err = table.row(3).unwrap_err();
        assert_eq!(
            err.downcast_ref::<Error>(),
            Some(&Error::OutOfRange { index: 3, size: 3 })
        );
    }

    #[test]
    fn test_row_range() {
        let table = table();
        assert_eq!(table.row_range(1, 3).unwrap().len(), 2);
        // from >= to yields an empty range, even beyond the table
        assert!(table.row_range(2, 2).unwrap().is_empty());
        assert!(table.row_range(7, 3).unwrap().is_empty());
        let err = table.row_range(1, 4).unwrap_err();
        assert_eq!(
            err.downcast_ref::<Error>(),
            Some(&Error::InvalidRange {
                from: 1,
                to: 4,
                size: 3
            })
        );
    }

    #[test]
    fn test_set_property() {
        let table = table();
        table
            .set_property(0, DECISION_COLUMN, PropertyValue::String("accept".to_owned()))
            .unwrap();
        assert_eq!(
            table.row(0).unwrap()[DECISION_COLUMN],
            PropertyValue::String("accept".to_owned())
        );

        table
            .set_property(1, "caller", PropertyValue::String("delly".to_owned()))
            .unwrap();
        assert_eq!(
            table.row(1).unwrap()["caller"],
            PropertyValue::String("delly".to_owned())
        );

        let err = table
            .set_property(0, "qual", PropertyValue::Number(30.0))
            .unwrap_err();
        assert_eq!(
            err.downcast_ref::<Error>(),
            Some(&Error::UnknownColumn {
                name: "qual".to_owned()
            })
        );

        let err = table
            .set_property(0, SAMPLE_COLUMN, PropertyValue::String("s3".to_owned()))
            .unwrap_err();
        assert_eq!(
            err.downcast_ref::<Error>(),
            Some(&Error::ImmutableColumn {
                name: "sample".to_owned()
            })
        );

        let err = table
            .set_property(0, DECISION_COLUMN, PropertyValue::String("yes".to_owned()))
            .unwrap_err();
        assert_eq!(
            err.downcast_ref::<Error>(),
            Some(&Error::InvalidDecision {
                value: "yes".to_owned()
            })
        );
    }

    #[test]
    fn test_concurrent_reads_and_decision_writes() {
        let table = Arc::new(table());
        let mut handles = Vec::new();
        for index in 0..3 {
            let table = Arc::clone(&table);
            handles.push(thread::spawn(move || {
                table.set_decision(index, Decision::Accept).unwrap();
                // a concurrent reader never observes a torn cell
                let row = table.row(index).unwrap();
                assert!(row.contains_key(DECISION_COLUMN));
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }
        assert!(table
            .decisions()
            .iter()
            .all(|decision| *decision == Decision::Accept));
    }
}
