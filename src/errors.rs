// Copyright 2016-2019 Johannes Köster, David Lähnemann.
// Licensed under the GNU GPLv3 license (https://opensource.org/licenses/GPL-3.0)
// This file may not be copied, modified, or distributed
// except according to those terms.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum Error {
    #[error("row index {index} is out of range for table with {size} rows")]
    OutOfRange { index: usize, size: usize },
    #[error("invalid row range {from}..{to} for table with {size} rows")]
    InvalidRange { from: usize, to: usize, size: usize },
    #[error("unknown column {name}")]
    UnknownColumn { name: String },
    #[error("column {name} cannot be modified after the table has been built")]
    ImmutableColumn { name: String },
    #[error("mandatory column {name} is missing from the given call table")]
    MissingColumn { name: String },
    #[error("invalid call record {row}: {column} value '{value}' cannot be interpreted as a breakpoint")]
    MalformedBreakpoint {
        row: usize,
        column: String,
        value: String,
    },
    #[error("invalid decision '{value}', expected one of unreviewed, accept, decline, maybe")]
    InvalidDecision { value: String },
    #[error("unable to read review progress from {path:?}: {msg}")]
    ProgressRead { path: PathBuf, msg: String },
    #[error("unable to write review progress to {path:?}: {msg}")]
    ProgressWrite { path: PathBuf, msg: String },
}
