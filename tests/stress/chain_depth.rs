//! Stress test: long linear chains in both modes, and the nesting limit.

use federated_metadata::chain::{
    build_chain, evaluate, ground, unpack, ChainDescriptor, ChainMode, HopDescriptor,
    MAX_CHAIN_DEPTH,
};
use federated_metadata::policy::ClaimPolicy;
use federated_metadata::storage::{make_key_bundle, KeyBundle, MetadataStore};
use federated_metadata::{FederationError, Operators};
use serde_json::{json, Map, Value};

fn node(i: usize) -> String {
    format!("https://node-{i}.example.org")
}

/// `depth` hops: node-i vouches for node-(i+1), each narrowing nothing.
fn linear(depth: usize) -> (ChainDescriptor, KeyBundle, Operators) {
    let ids: Vec<String> = (0..=depth).map(node).collect();
    let bundle = make_key_bundle(&ids, 1);
    let ops = Operators::from_bundle(&bundle);
    let mut request = Map::new();
    request.insert("scope".into(), json!(["openid"]));
    let hops = (0..depth)
        .map(|i| HopDescriptor::new(node(i + 1), node(i)).with_request(request.clone()))
        .collect();
    (ChainDescriptor::linear(hops), bundle, ops)
}

#[test]
fn stress_indirect_chain_at_depth_limit() {
    let (path, bundle, ops) = linear(MAX_CHAIN_DEPTH);
    let dir = tempfile::tempdir().unwrap();
    let mut store = MetadataStore::open(dir.path()).unwrap();
    let out = build_chain(
        &path,
        &ops,
        &mut ChainMode::Indirect {
            store: &mut store,
            base_uri: "https://mds.example.org",
        },
    )
    .expect("build should succeed");
    assert_eq!(store.len(), MAX_CHAIN_DEPTH);

    let leaf = &out[node(MAX_CHAIN_DEPTH - 1).as_str()];
    let tree = unpack(leaf.as_str(), &store).expect("unpack should succeed");
    assert_eq!(tree.depth(), MAX_CHAIN_DEPTH);

    let paths = evaluate(&node(MAX_CHAIN_DEPTH), &tree, &bundle, &ClaimPolicy::default())
        .expect("chain should verify");
    assert_eq!(paths.len(), 1);
    assert_eq!(paths[0].fo, node(0));
    assert_eq!(paths[0].signers.len(), MAX_CHAIN_DEPTH);
    assert_eq!(paths[0].get("scope"), Some(&json!(["openid"])));
}

#[test]
fn stress_chain_beyond_depth_limit() {
    let (path, _, ops) = linear(MAX_CHAIN_DEPTH + 1);
    let dir = tempfile::tempdir().unwrap();
    let mut store = MetadataStore::open(dir.path()).unwrap();
    let out = build_chain(
        &path,
        &ops,
        &mut ChainMode::Indirect {
            store: &mut store,
            base_uri: "",
        },
    )
    .unwrap();
    let leaf = &out[node(MAX_CHAIN_DEPTH).as_str()];
    assert!(matches!(
        unpack(leaf.as_str(), &store),
        Err(FederationError::Validation(_))
    ));
}

#[test]
fn stress_embedded_chain_depth_12() {
    let depth = 12;
    let (path, bundle, ops) = linear(depth);
    let out = build_chain(&path, &ops, &mut ChainMode::Embed).unwrap();
    let token = out[node(depth - 1).as_str()].token().unwrap();
    let tree = ground(token).unwrap();
    assert_eq!(tree.size(), depth);

    let paths = evaluate(&node(depth), &tree, &bundle, &ClaimPolicy::default()).unwrap();
    assert_eq!(paths[0].signers.first(), Some(&node(0)));
    assert_eq!(paths[0].signers.last(), Some(&node(depth - 1)));
}

#[test]
fn stress_narrowing_at_every_level() {
    let depth = 8;
    let ids: Vec<String> = (0..=depth).map(node).collect();
    let bundle = make_key_bundle(&ids, 1);
    let ops = Operators::from_bundle(&bundle);

    // Level i allows max_age <= 1000 - i.
    let hops = (0..depth)
        .map(|i| {
            let mut request = Map::new();
            request.insert("max_age".into(), Value::from(1000 - i as i64));
            HopDescriptor::new(node(i + 1), node(i)).with_request(request)
        })
        .collect();
    let out = build_chain(&ChainDescriptor::linear(hops), &ops, &mut ChainMode::Embed).unwrap();
    let tree = ground(out[node(depth - 1).as_str()].token().unwrap()).unwrap();
    let paths = evaluate(&node(depth), &tree, &bundle, &ClaimPolicy::default()).unwrap();
    assert_eq!(paths[0].get("max_age"), Some(&json!(1000 - (depth as i64 - 1))));
}
