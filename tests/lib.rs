// Copyright 2016-2019 Johannes Köster, David Lähnemann.
// Licensed under the GNU GPLv3 license (https://opensource.org/licenses/GPL-3.0)
// This file may not be copied, modified, or distributed
// except according to those terms.

use std::fs;
use std::path::Path;

use tempfile::tempdir;

use viper::variants::clustering::VariantClusterBuilder;
use viper::variants::table::csv::{write_table, CsvTableReader};
use viper::variants::table::progress::ProgressManager;
use viper::variants::table_cluster::VariantTableCluster;
use viper::variants::{Decision, PropertyValue, DECISION_COLUMN, SAMPLE_COLUMN};

const CALLS: &str = "sample,chr1,bp1,chr2,bp2,caller,genes\n\
                     s1,1,100,5,100,delly,BRCA1;TP53\n\
                     s1,2,500,3,600,delly,KRAS\n\
                     s2,1,102,5,101,lumpy,BRCA1\n\
                     s1,4,100,4,200,delly,EGFR\n\
                     s1,2,1000,2,1000,lumpy,MYC\n";

fn open_session(calls: &Path, work_dir: &Path) -> VariantTableCluster {
    let table = CsvTableReader::new(calls.to_path_buf(), b',', ';')
        .read_table()
        .unwrap();
    let cluster = VariantClusterBuilder::new(5).cluster(table).unwrap();
    ProgressManager::new(work_dir.to_path_buf())
        .load_progress(&cluster)
        .unwrap();
    cluster
}

#[test]
fn test_review_session() {
    let dir = tempdir().unwrap();
    let calls = dir.path().join("calls.csv");
    let work_dir = dir.path().join("work");
    fs::write(&calls, CALLS).unwrap();

    // first session: cluster, review, save
    let cluster = open_session(&calls, &work_dir);
    assert_eq!(cluster.unclustered_table().len(), 5);
    assert_eq!(cluster.clustered_table().len(), 4);

    let related = cluster.related_calls(0).unwrap();
    assert_eq!(related.len(), 2);
    assert_eq!(
        related[1][SAMPLE_COLUMN],
        PropertyValue::String("s2".to_owned())
    );

    cluster.set_decision(0, Decision::Accept).unwrap();
    cluster.set_decision(3, Decision::Decline).unwrap();
    ProgressManager::new(work_dir.clone())
        .save_progress(&cluster)
        .unwrap();

    // second session: decisions are restored by cluster identity
    let resumed = open_session(&calls, &work_dir);
    assert_eq!(
        resumed.clustered_table().decisions(),
        vec![
            Decision::Accept,
            Decision::Unreviewed,
            Decision::Unreviewed,
            Decision::Decline
        ]
    );

    // the exported clustered view carries the restored decisions
    let exported = dir.path().join("clustered.csv");
    write_table(resumed.clustered_table(), &exported, b',', ';').unwrap();
    let reread = CsvTableReader::new(exported, b',', ';')
        .read_table()
        .unwrap();
    assert_eq!(
        reread.row(0).unwrap()[DECISION_COLUMN],
        PropertyValue::String("accept".to_owned())
    );
}
