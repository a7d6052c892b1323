//! Stress test: wide fan-out levels and many federations per statement.

use federated_metadata::chain::{
    build_chain, evaluate, ground, trusted_subtree, unpack, ChainDescriptor, ChainLevel,
    ChainMode, HopDescriptor,
};
use federated_metadata::policy::ClaimPolicy;
use federated_metadata::storage::{make_key_bundle, MetadataStore};
use federated_metadata::Operators;
use serde_json::{json, Map};

const ORG: &str = "https://org.example.org";
const RP: &str = "https://rp.example.org";

fn fo(i: usize) -> String {
    format!("https://fo-{i}.example.org")
}

fn wide(width: usize) -> ChainDescriptor {
    let roots: Vec<HopDescriptor> = (0..width)
        .map(|i| {
            let mut request = Map::new();
            request.insert("fo_index".into(), json!(i));
            HopDescriptor::new(ORG, fo(i)).with_request(request)
        })
        .collect();
    ChainDescriptor::new(vec![
        ChainLevel::FanOut(roots),
        HopDescriptor::new(RP, ORG).into(),
    ])
}

#[test]
fn stress_fan_out_100_federations() {
    let width = 100;
    let mut ids: Vec<String> = (0..width).map(fo).collect();
    ids.push(ORG.to_string());
    ids.push(RP.to_string());
    let bundle = make_key_bundle(&ids, 1);
    let ops = Operators::from_bundle(&bundle);

    let out = build_chain(&wide(width), &ops, &mut ChainMode::Embed).unwrap();
    let tree = ground(out[ORG].token().unwrap()).unwrap();
    assert_eq!(tree.nested.len(), width);
    assert_eq!(tree.root_keys().len(), width);

    let paths = evaluate(RP, &tree, &bundle, &ClaimPolicy::default()).unwrap();
    assert_eq!(paths.len(), width);
    for (i, path) in paths.iter().enumerate() {
        assert_eq!(path.fo, fo(i));
        assert_eq!(path.get("fo_index"), Some(&json!(i)));
    }
}

#[test]
fn stress_fan_out_indirect_and_pruned() {
    let width = 50;
    let mut ids: Vec<String> = (0..width).map(fo).collect();
    ids.push(ORG.to_string());
    ids.push(RP.to_string());
    let bundle = make_key_bundle(&ids, 1);
    let ops = Operators::from_bundle(&bundle);

    let dir = tempfile::tempdir().unwrap();
    let mut store = MetadataStore::open(dir.path()).unwrap();
    let out = build_chain(
        &wide(width),
        &ops,
        &mut ChainMode::Indirect {
            store: &mut store,
            base_uri: "https://mds.example.org",
        },
    )
    .unwrap();
    assert_eq!(store.len(), width + 1);

    let tree = unpack(out[ORG].as_str(), &store).unwrap();
    let even: Vec<String> = (0..width).step_by(2).map(fo).collect();
    let trusted = bundle.subset(&even).unwrap();
    let pruned = trusted_subtree(RP, &tree, &trusted).unwrap();
    let paths = evaluate(RP, &pruned, &trusted, &ClaimPolicy::default()).unwrap();
    assert_eq!(paths.len(), width / 2);
}
