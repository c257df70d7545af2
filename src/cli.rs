// Copyright 2016-2019 Johannes Köster, David Lähnemann.
// Licensed under the GNU GPLv3 license (https://opensource.org/licenses/GPL-3.0)
// This file may not be copied, modified, or distributed
// except according to those terms.

use std::path::PathBuf;

use anyhow::Result;
use itertools::Itertools;
use structopt::StructOpt;
use strum::IntoEnumIterator;

use crate::variants::clustering::VariantClusterBuilder;
use crate::variants::table::csv::{write_table, CsvTableReader};
use crate::variants::table::progress::ProgressManager;
use crate::variants::table_cluster::VariantTableCluster;
use crate::variants::Decision;

#[derive(Debug, StructOpt, Serialize, Deserialize, Clone)]
#[structopt(
    name = "viper",
    about = "Inspect and curate structural variant calls from delimited call tables."
)]
pub enum Viper {
    #[structopt(
        name = "cluster",
        about = "Cluster a table of raw SV calls into deduplicated events and export the clustered view."
    )]
    Cluster {
        #[structopt(parse(from_os_str), help = "Delimited text file with raw SV calls.")]
        calls: PathBuf,
        #[structopt(
            parse(from_os_str),
            long,
            help = "File the clustered table shall be written to."
        )]
        output: PathBuf,
        #[structopt(
            long,
            default_value = "5",
            help = "Maximum distance in bp between corresponding breakpoints of two calls describing the same event."
        )]
        bp_tolerance: u64,
        #[structopt(
            long,
            default_value = ",",
            help = "Field delimiter of the call table."
        )]
        csv_delimiter: char,
        #[structopt(
            long,
            default_value = ";",
            help = "Delimiter separating the entries of multi-valued properties."
        )]
        collection_delimiter: char,
        #[structopt(
            parse(from_os_str),
            long,
            help = "Directory with saved review progress to apply to the clustered view."
        )]
        work_dir: Option<PathBuf>,
    },
    #[structopt(
        name = "import-progress",
        about = "Seed the review progress store from a call table whose decision column is already populated."
    )]
    ImportProgress {
        #[structopt(
            parse(from_os_str),
            help = "Delimited text file with calls and recorded decisions."
        )]
        calls: PathBuf,
        #[structopt(
            parse(from_os_str),
            help = "Directory the review progress shall be stored in."
        )]
        work_dir: PathBuf,
        #[structopt(
            long,
            default_value = "5",
            help = "Maximum distance in bp between corresponding breakpoints of two calls describing the same event."
        )]
        bp_tolerance: u64,
        #[structopt(
            long,
            default_value = ",",
            help = "Field delimiter of the call table."
        )]
        csv_delimiter: char,
        #[structopt(
            long,
            default_value = ";",
            help = "Delimiter separating the entries of multi-valued properties."
        )]
        collection_delimiter: char,
    },
}

pub fn run(opt: Viper) -> Result<()> {
    match opt {
        Viper::Cluster {
            calls,
            output,
            bp_tolerance,
            csv_delimiter,
            collection_delimiter,
            work_dir,
        } => {
            let reader = CsvTableReader::new(calls, csv_delimiter as u8, collection_delimiter);
            let table = reader.read_table()?;
            let n_calls = table.len();

            let cluster = VariantClusterBuilder::new(bp_tolerance).cluster(table)?;
            info!(
                "clustered {} calls into {} events",
                n_calls,
                cluster.clustered_table().len()
            );

            if let Some(work_dir) = work_dir {
                ProgressManager::new(work_dir).load_progress(&cluster)?;
                info!("applied saved decisions: {}", decision_tally(&cluster));
            }

            write_table(
                cluster.clustered_table(),
                &output,
                csv_delimiter as u8,
                collection_delimiter,
            )?;
            info!("wrote clustered table to {:?}", output);

            Ok(())
        }
        Viper::ImportProgress {
            calls,
            work_dir,
            bp_tolerance,
            csv_delimiter,
            collection_delimiter,
        } => {
            let reader = CsvTableReader::new(calls, csv_delimiter as u8, collection_delimiter);
            let table = reader.read_table()?;

            let cluster = VariantClusterBuilder::new(bp_tolerance).cluster(table)?;
            ProgressManager::new(work_dir).save_progress(&cluster)?;
            info!(
                "saved decisions for {} events: {}",
                cluster.clustered_table().len(),
                decision_tally(&cluster)
            );

            Ok(())
        }
    }
}

fn decision_tally(cluster: &VariantTableCluster) -> String {
    let decisions = cluster.clustered_table().decisions();
    Decision::iter()
        .map(|decision| {
            format!(
                "{}={}",
                decision,
                decisions.iter().filter(|&&d| d == decision).count()
            )
        })
        .join(", ")
}
