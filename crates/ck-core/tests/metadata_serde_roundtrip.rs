use std::collections::BTreeMap;

use ck_core::serde::{from_json_slice, to_pretty_json_string};
use ck_core::{
    ClusterMetadata, DFunctionMetadata, Metadata, RunProvenance, Sampling, ScanMetadata,
    SpointsMetadata,
};
use serde_json::json;

fn sample_metadata() -> Metadata {
    let mut values = BTreeMap::new();
    values.insert("CT".to_string(), vec![-1.0, 1.0]);
    values.insert("CSL".to_string(), vec![-0.5, 0.0, 0.5]);
    let mut md = Metadata {
        scan: Some(ScanMetadata {
            time: "Tue  4 Jun 2024 09:00".to_string(),
            spoints: SpointsMetadata {
                coeffs: vec!["CSL".to_string(), "CT".to_string()],
                values,
                scale: Some(5.0),
                eft: Some("WET".to_string()),
                basis: Some("flavio".to_string()),
                sampling: Sampling::Grid,
                ranges: None,
                noise: None,
            },
            dfunction: DFunctionMetadata {
                name: "polynomial".to_string(),
                doc: "toy".to_string(),
                kwargs: BTreeMap::new(),
                nbins: 4,
                binning: Some(vec![0.0, 0.25, 0.5, 0.75, 1.0]),
                normalize: Some(true),
            },
            provenance: RunProvenance::capture("abc"),
        }),
        ..Metadata::default()
    };
    let mut args = BTreeMap::new();
    args.insert("max_d".to_string(), json!(0.2));
    md.record_cluster(
        "cluster",
        ClusterMetadata {
            algorithm: "hierarchical".to_string(),
            cluster_args: args,
            n_clusters: 3,
            select_bpoints_args: None,
            time: "Tue  4 Jun 2024 09:01".to_string(),
        },
    );
    md
}

#[test]
fn pretty_json_roundtrip_is_lossless() {
    let md = sample_metadata();
    let text = to_pretty_json_string(&md).expect("serialize");
    let back: Metadata = from_json_slice(text.as_bytes()).expect("parse");
    assert_eq!(back, md);
}

#[test]
fn required_keys_are_present_even_when_unset() {
    let mut md = sample_metadata();
    if let Some(scan) = md.scan.as_mut() {
        scan.spoints.scale = None;
        scan.spoints.eft = None;
    }
    let value: serde_json::Value =
        serde_json::from_str(&to_pretty_json_string(&md).unwrap()).unwrap();
    let spoints = &value["scan"]["spoints"];
    for key in ["coeffs", "values", "scale", "eft", "basis", "sampling"] {
        assert!(spoints.get(key).is_some(), "missing scan.spoints.{key}");
    }
    for key in ["name", "doc", "kwargs", "nbins"] {
        assert!(value["scan"]["dfunction"].get(key).is_some());
    }
    let cluster = &value["cluster"]["cluster"];
    for key in ["cluster_args", "n_clusters", "select_bpoints_args"] {
        assert!(cluster.get(key).is_some(), "missing cluster.cluster.{key}");
    }
}
