// Copyright 2016-2019 Johannes Köster, David Lähnemann.
// Licensed under the GNU GPLv3 license (https://opensource.org/licenses/GPL-3.0)
// This file may not be copied, modified, or distributed
// except according to those terms.

//! Reading and writing of delimited call tables.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::Result;
use bio_types::genome;
use itertools::Itertools;

use crate::errors::Error;
use crate::variants::table::VariantTable;
use crate::variants::{
    Decision, PropertyValue, VariantCallBuilder, BP1_COLUMN, BP2_COLUMN, CHR1_COLUMN, CHR2_COLUMN,
    DECISION_COLUMN, MANDATORY_COLUMNS, SAMPLE_COLUMN,
};

/// Reader for delimited text files of raw SV calls.
///
/// The mandatory columns have to be present; the decision column may be
/// omitted (it is then appended with default values) so that both caller
/// output and previously exported tables can be read. Any unparseable
/// breakpoint field aborts reading: silently dropping calls would corrupt
/// the review.
#[derive(new, Debug, Clone)]
pub struct CsvTableReader {
    path: PathBuf,
    delimiter: u8,
    collection_delimiter: char,
}

impl CsvTableReader {
    pub fn read_table(&self) -> Result<VariantTable> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(self.delimiter)
            .from_path(&self.path)?;

        let headers: Vec<String> = reader.headers()?.iter().map(|name| name.to_owned()).collect();
        for mandatory in MANDATORY_COLUMNS
            .iter()
            .filter(|column| **column != DECISION_COLUMN)
        {
            if !headers.iter().any(|header| header == mandatory) {
                return Err(Error::MissingColumn {
                    name: (*mandatory).to_owned(),
                }
                .into());
            }
        }
        let mut column_names = headers.clone();
        if !headers.iter().any(|header| header == DECISION_COLUMN) {
            column_names.push(DECISION_COLUMN.to_owned());
        }

        let mut calls = Vec::new();
        for (row, record) in reader.records().enumerate() {
            let record = record?;
            let mut builder = VariantCallBuilder::default();
            let mut properties = BTreeMap::new();
            let mut chrom1 = "";
            let mut pos1 = "";
            let mut chrom2 = "";
            let mut pos2 = "";
            for (column, value) in headers.iter().zip(record.iter()) {
                match column.as_str() {
                    SAMPLE_COLUMN => {
                        builder.sample(value);
                    }
                    CHR1_COLUMN => chrom1 = value,
                    BP1_COLUMN => pos1 = value,
                    CHR2_COLUMN => chrom2 = value,
                    BP2_COLUMN => pos2 = value,
                    DECISION_COLUMN => {
                        builder.decision(Decision::parse(value)?);
                    }
                    _ => {
                        properties.insert(column.clone(), self.parse_property(value));
                    }
                }
            }
            builder.locus1(parse_locus(row, CHR1_COLUMN, chrom1, BP1_COLUMN, pos1)?);
            builder.locus2(parse_locus(row, CHR2_COLUMN, chrom2, BP2_COLUMN, pos2)?);
            builder.properties(properties);
            calls.push(builder.build()?);
        }

        VariantTable::new(column_names, calls)
    }

    fn parse_property(&self, value: &str) -> PropertyValue {
        if value.contains(self.collection_delimiter) {
            let parts: Vec<&str> = value.split(self.collection_delimiter).collect();
            if let Ok(numbers) = parts.iter().map(|part| part.parse()).collect::<Result<Vec<f64>, _>>() {
                PropertyValue::NumberList(numbers)
            } else {
                PropertyValue::StringList(parts.iter().map(|part| (*part).to_owned()).collect())
            }
        } else if let Ok(number) = value.parse() {
            PropertyValue::Number(number)
        } else {
            PropertyValue::String(value.to_owned())
        }
    }
}

fn parse_locus(
    row: usize,
    chrom_column: &str,
    chrom: &str,
    pos_column: &str,
    pos: &str,
) -> Result<genome::Locus> {
    if chrom.is_empty() {
        return Err(Error::MalformedBreakpoint {
            row,
            column: chrom_column.to_owned(),
            value: chrom.to_owned(),
        }
        .into());
    }
    let pos: u64 = pos.parse().map_err(|_| Error::MalformedBreakpoint {
        row,
        column: pos_column.to_owned(),
        value: pos.to_owned(),
    })?;
    Ok(genome::Locus::new(chrom.to_owned(), pos))
}

/// Write `table` to a delimited text file, re-joining list-valued
/// properties with `collection_delimiter`.
pub fn write_table<P: AsRef<Path>>(
    table: &VariantTable,
    path: P,
    delimiter: u8,
    collection_delimiter: char,
) -> Result<()> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .from_path(path)?;
    writer.write_record(table.column_names())?;
    table.with_calls(|calls| -> Result<()> {
        for call in calls {
            let record = call.to_record();
            let row = table
                .column_names()
                .iter()
                .map(|column| {
                    record
                        .get(column)
                        .map(|value| format_value(value, collection_delimiter))
                        .unwrap_or_default()
                })
                .collect_vec();
            writer.write_record(&row)?;
        }
        Ok(())
    })?;
    writer.flush()?;
    Ok(())
}

fn format_value(value: &PropertyValue, collection_delimiter: char) -> String {
    let delimiter = collection_delimiter.to_string();
    match value {
        PropertyValue::NumberList(values) => values.iter().join(&delimiter),
        PropertyValue::StringList(values) => values.iter().join(&delimiter),
        value => value.to_string(),
    }
}
