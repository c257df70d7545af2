// Copyright 2016-2019 Johannes Köster, David Lähnemann.
// Licensed under the GNU GPLv3 license (https://opensource.org/licenses/GPL-3.0)
// This file may not be copied, modified, or distributed
// except according to those terms.

//! Persistence of reviewer decisions across sessions.
//!
//! Decisions are stored as a JSON object mapping the stable identity key of
//! each cluster's representative to the recorded decision. Keys are
//! content-derived, never positional: the clustered row order may change
//! between runs when the raw input order changes. The file is written to a
//! temporary sibling first and renamed into place, so a crash during save
//! leaves the previously saved state intact.

use std::collections::BTreeMap;
use std::fs;
use std::fs::File;
use std::path::PathBuf;

use anyhow::Result;
use itertools::Itertools;
use tempfile::NamedTempFile;

use crate::errors::Error;
use crate::variants::table_cluster::VariantTableCluster;
use crate::variants::Decision;

pub const PROGRESS_FILE_NAME: &str = "progress.json";

/// Loads and saves the decision column of a clustered table.
#[derive(new, Debug, Clone)]
pub struct ProgressManager {
    work_dir: PathBuf,
}

impl ProgressManager {
    pub fn progress_path(&self) -> PathBuf {
        self.work_dir.join(PROGRESS_FILE_NAME)
    }

    /// Apply previously saved decisions to `cluster`, matched by stable
    /// cluster identity. A missing progress file is not an error; the
    /// clustered table keeps its default decisions.
    pub fn load_progress(&self, cluster: &VariantTableCluster) -> Result<()> {
        let path = self.progress_path();
        if !path.exists() {
            return Ok(());
        }
        let file = File::open(&path).map_err(|e| Error::ProgressRead {
            path: path.clone(),
            msg: e.to_string(),
        })?;
        let saved: BTreeMap<String, Decision> =
            serde_json::from_reader(file).map_err(|e| Error::ProgressRead {
                path: path.clone(),
                msg: e.to_string(),
            })?;

        let clustered = cluster.clustered_table();
        let keys =
            clustered.with_calls(|calls| calls.iter().map(|call| call.identity_key()).collect_vec());
        for (index, key) in keys.iter().enumerate() {
            if let Some(&decision) = saved.get(key) {
                clustered.set_decision(index, decision)?;
            }
        }
        Ok(())
    }

    /// Write the current decision column, keyed by stable cluster identity.
    /// The snapshot is taken under a single read lock so it reflects one
    /// consistent point in time; saving unchanged decisions twice produces
    /// byte-identical files.
    pub fn save_progress(&self, cluster: &VariantTableCluster) -> Result<()> {
        let path = self.progress_path();

        fs::create_dir_all(&self.work_dir).map_err(|e| Error::ProgressWrite {
            path: path.clone(),
            msg: e.to_string(),
        })?;

        let decisions: BTreeMap<String, Decision> = cluster.clustered_table().with_calls(|calls| {
            calls
                .iter()
                .map(|call| (call.identity_key(), call.decision()))
                .collect()
        });

        let file = NamedTempFile::new_in(&self.work_dir).map_err(|e| Error::ProgressWrite {
            path: path.clone(),
            msg: e.to_string(),
        })?;
        serde_json::to_writer_pretty(file.as_file(), &decisions).map_err(|e| {
            Error::ProgressWrite {
                path: path.clone(),
                msg: e.to_string(),
            }
        })?;
        file.persist(&path).map_err(|e| Error::ProgressWrite {
            path: path.clone(),
            msg: e.to_string(),
        })?;
        Ok(())
    }
}
