//! Integration test: builder and resolver round trips.
//!
//! Chains built in embed mode and in indirect mode must ground to the same
//! claim tree, verify against the same key bundle and flatten to the same
//! effective claims.

use federated_metadata::chain::{
    build_chain, evaluate, ground, unpack, ChainDescriptor, ChainMode, HopDescriptor,
    StatementRef,
};
use federated_metadata::policy::ClaimPolicy;
use federated_metadata::storage::{make_key_bundle, KeyBundle, MetadataStore};
use federated_metadata::{FederationError, Operators};
use serde_json::{json, Map, Value};

const FO: &str = "https://swamid.sunet.se";
const ORG: &str = "https://sunet.se";
const RP: &str = "https://rp.sunet.se";

fn claims(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

fn three_hop_path() -> ChainDescriptor {
    ChainDescriptor::linear(vec![
        HopDescriptor::new(ORG, FO)
            .with_request(claims(json!({
                "scope": ["openid", "email", "phone"],
                "response_types": ["code", "id_token"],
                "token_endpoint_auth_method": "private_key_jwt"
            })))
            .with_signer_add(claims(json!({"federation_usage": "registration"}))),
        HopDescriptor::new(RP, ORG).with_request(claims(json!({
            "scope": ["openid", "email"],
            "contacts": ["ops@sunet.se"]
        }))),
        HopDescriptor::new(RP, RP).with_request(claims(json!({
            "redirect_uris": ["https://rp.sunet.se/cb"],
            "response_types": ["code"]
        }))),
    ])
}

fn setup() -> (KeyBundle, Operators) {
    let bundle = make_key_bundle(&[FO, ORG, RP], 1);
    let ops = Operators::from_bundle(&bundle);
    (bundle, ops)
}

#[test]
fn three_hop_leaf_is_keyed_by_middle_signer() {
    let (_, ops) = setup();
    let out = build_chain(&three_hop_path(), &ops, &mut ChainMode::Embed)
        .expect("embed build should succeed");

    let leaf = out[RP].token().expect("embed mode returns tokens");
    let leaf_ms = leaf.unfurl().unwrap();
    let nested = leaf_ms.metadata_statements().unwrap();
    assert_eq!(nested.len(), 1);
    assert!(nested.contains_key(ORG));

    let middle = nested[ORG].unfurl().unwrap();
    let root = middle.metadata_statements().unwrap();
    assert_eq!(root.len(), 1);
    let root_ms = root[FO].unfurl().unwrap();
    assert_eq!(root_ms.issuer(), Some(FO));
    assert_eq!(root_ms.get("federation_usage"), Some(&json!("registration")));
}

#[test]
fn embed_and_indirect_modes_agree() {
    let (bundle, ops) = setup();
    let dir = tempfile::tempdir().unwrap();
    let mut store = MetadataStore::open(dir.path()).unwrap();
    let policy = ClaimPolicy::default();

    let embedded = build_chain(&three_hop_path(), &ops, &mut ChainMode::Embed).unwrap();
    let indirect = build_chain(
        &three_hop_path(),
        &ops,
        &mut ChainMode::Indirect {
            store: &mut store,
            base_uri: "https://mds.sunet.se/ms",
        },
    )
    .unwrap();

    let StatementRef::Embedded(token) = &embedded[RP] else {
        panic!("embed mode must return the token");
    };
    let StatementRef::Uri(uri) = &indirect[RP] else {
        panic!("indirect mode must return a reference");
    };
    assert!(uri.starts_with("https://mds.sunet.se/ms/"));

    let a = ground(token).unwrap();
    let b = unpack(uri, &store).unwrap();
    assert_eq!(a.claim_tree(&policy), b.claim_tree(&policy));
    assert_eq!(a.depth(), 3);

    let claims_a = evaluate(RP, &a, &bundle, &policy).unwrap();
    let claims_b = evaluate(RP, &b, &bundle, &policy).unwrap();
    assert_eq!(claims_a, claims_b);
    assert_eq!(claims_a[0].get("scope"), Some(&json!(["openid", "email"])));
    assert_eq!(claims_a[0].get("response_types"), Some(&json!(["code"])));
    assert_eq!(
        claims_a[0].get("token_endpoint_auth_method"),
        Some(&json!("private_key_jwt"))
    );
}

#[test]
fn rebuilding_reuses_store_entries() {
    let (_, ops) = setup();
    let dir = tempfile::tempdir().unwrap();
    let mut store = MetadataStore::open(dir.path()).unwrap();
    let out = build_chain(
        &three_hop_path(),
        &ops,
        &mut ChainMode::Indirect {
            store: &mut store,
            base_uri: "",
        },
    )
    .unwrap();
    assert_eq!(store.len(), 3);

    // Re-adding the exact tokens already stored must not grow the store.
    let keys: Vec<String> = store.keys().cloned().collect();
    for key in &keys {
        let token = store.get(key).unwrap();
        assert_eq!(&store.add(&token).unwrap(), key);
    }
    assert_eq!(store.len(), 3);
    assert!(out[RP].as_str().starts_with('/'));
}

#[test]
fn unpack_of_unknown_reference_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let store = MetadataStore::open(dir.path()).unwrap();
    assert!(matches!(
        unpack("https://mds.sunet.se/ms/0123abcd", &store),
        Err(FederationError::NotFound(_))
    ));
}

#[test]
fn verification_needs_the_root_operator() {
    let (_, ops) = setup();
    let out = build_chain(&three_hop_path(), &ops, &mut ChainMode::Embed).unwrap();
    let tree = ground(out[RP].token().unwrap()).unwrap();
    let strangers = make_key_bundle(&["https://edugain.org"], 1);
    assert!(matches!(
        evaluate(RP, &tree, &strangers, &ClaimPolicy::default()),
        Err(FederationError::UnknownFederationOperator(fo)) if fo == FO
    ));
}
