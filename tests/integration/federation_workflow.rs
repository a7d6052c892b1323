//! Integration test: full federation workflow.
//!
//! Tests the complete lifecycle:
//! 1. Generate operator keys on disk
//! 2. Pre-sign statements for signers
//! 3. Assemble an entity from disk
//! 4. Issue a statement and evaluate it as a relying party
//! 5. Reject an escalating chain
//! 6. Reject a chain rooted in an expired statement

use federated_metadata::chain::{ChainDescriptor, HopDescriptor};
use federated_metadata::federation::{create_federation_entity, setup, SignerDefinitions};
use federated_metadata::policy::ClaimPolicy;
use federated_metadata::storage::{make_fs_key_bundle, make_key_bundle, KeyBundle};
use federated_metadata::{
    Context, FederationEntity, FederationError, InternalSigningService, JwtArgs, KeyStore,
    MetadataStatement, Operators, Signer, SigningService,
};
use indexmap::IndexMap;
use serde_json::{json, Map, Value};

const SWAMID: &str = "https://swamid.sunet.se";
const EDUGAIN: &str = "https://edugain.org";
const SUNET: &str = "https://sunet.se";
const RP: &str = "https://rp.sunet.se";

fn claims(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

fn definitions(rp_scope: Value) -> SignerDefinitions {
    let mut chains = IndexMap::new();
    chains.insert(
        SWAMID.to_string(),
        ChainDescriptor::linear(vec![
            HopDescriptor::new(SUNET, SWAMID)
                .with_request(claims(json!({"scope": ["openid", "email"]}))),
            HopDescriptor::new(RP, SUNET).with_request(claims(json!({ "scope": rp_scope }))),
        ]),
    );
    chains.insert(
        EDUGAIN.to_string(),
        ChainDescriptor::linear(vec![
            HopDescriptor::new(SUNET, EDUGAIN)
                .with_request(claims(json!({"scope": ["openid"]}))),
            HopDescriptor::new(RP, SUNET),
        ]),
    );
    let mut contexts = IndexMap::new();
    contexts.insert(Context::Registration, chains);
    let mut defs = SignerDefinitions::new();
    defs.insert(RP.to_string(), contexts);
    defs
}

#[test]
fn full_workflow_issue_and_evaluate() {
    // ── Step 1: Operator keys ───────────────────────────────────────────
    let home = tempfile::tempdir().unwrap();
    let fo_dir = home.path().join("fo_jwks");
    let ms_root = home.path().join("ms");
    let bundle = make_fs_key_bundle(&fo_dir, &[SWAMID, EDUGAIN, SUNET, RP], 1)
        .expect("key bundle should be created");
    let operators = Operators::from_bundle(bundle.bundle());

    // ── Step 2: Pre-sign statements ─────────────────────────────────────
    let signers = setup(&ms_root, &operators, &definitions(json!(["openid"])))
        .expect("setup should succeed");
    assert_eq!(
        signers[RP].federation_operators(Context::Registration).unwrap(),
        vec![EDUGAIN.to_string(), SWAMID.to_string()]
    );

    // ── Step 3: Entity from disk ────────────────────────────────────────
    let rp = create_federation_entity(
        RP,
        bundle.get(RP).unwrap().clone(),
        &ms_root,
        &fo_dir,
        &[SWAMID, EDUGAIN],
        ClaimPolicy::default(),
    )
    .expect("entity should be assembled");
    assert_eq!(rp.trusted_operators().len(), 2);

    // ── Step 4: Issue and evaluate ──────────────────────────────────────
    let mut request = MetadataStatement::new();
    request.insert("redirect_uris", json!(["https://rp.sunet.se/cb"]));
    let token = rp
        .issue_statement(&request, Context::Registration, SWAMID)
        .expect("issuing under a trusted FO should succeed");

    // A relying party trusting only SWAMID.
    let verifier_keys = KeyStore::generate("https://op.sunet.se", 1);
    let mut trusted = KeyBundle::new();
    trusted.set(SWAMID, bundle.get(SWAMID).unwrap().clone());
    let op_dir = tempfile::tempdir().unwrap();
    let op = federated_metadata::FederationEntity::new(
        "https://op.sunet.se",
        verifier_keys.clone(),
        federated_metadata::Signer::new(
            Box::new(InternalSigningService::new("https://op.sunet.se", verifier_keys)),
            op_dir.path(),
        )
        .unwrap(),
        trusted,
        ClaimPolicy::default(),
    );
    let paths = op.evaluate(&token).expect("chain should verify");
    assert_eq!(paths.len(), 1);
    assert_eq!(paths[0].fo, SWAMID);
    assert_eq!(paths[0].get("scope"), Some(&json!(["openid"])));
    assert_eq!(paths[0].signers, vec![SWAMID, SUNET, RP]);

    // ── Step 5: Unknown federation ──────────────────────────────────────
    assert!(matches!(
        rp.issue_statement(&request, Context::Registration, "https://incommon.org"),
        Err(FederationError::UnknownFederationOperator(_))
    ));
}

#[test]
fn escalating_scope_is_rejected() {
    let home = tempfile::tempdir().unwrap();
    let fo_dir = home.path().join("fo_jwks");
    let ms_root = home.path().join("ms");
    let bundle = make_fs_key_bundle(&fo_dir, &[SWAMID, EDUGAIN, SUNET, RP], 1).unwrap();
    let operators = Operators::from_bundle(bundle.bundle());
    setup(
        &ms_root,
        &operators,
        &definitions(json!(["openid", "email", "profile"])),
    )
    .unwrap();

    let rp = create_federation_entity(
        RP,
        bundle.get(RP).unwrap().clone(),
        &ms_root,
        &fo_dir,
        &[SWAMID],
        ClaimPolicy::default(),
    )
    .unwrap();
    let token = rp
        .issue_statement(&MetadataStatement::new(), Context::Registration, SWAMID)
        .unwrap();

    match rp.evaluate(&token) {
        Err(FederationError::PolicyEscalation { fo, claim, signer }) => {
            assert_eq!(fo, SWAMID);
            assert_eq!(claim, "scope");
            assert_eq!(signer, SUNET);
        }
        other => panic!("expected PolicyEscalation, got {other:?}"),
    }
}

#[test]
fn signed_bundle_distribution() {
    let fos = make_fs_key_bundle(tempfile::tempdir().unwrap().path(), &[SWAMID, EDUGAIN], 1)
        .unwrap()
        .into_bundle();
    let tool = InternalSigningService::new("https://tool.sunet.se", KeyStore::generate("https://tool.sunet.se", 1));
    let signed = fos.create_signed_bundle(&tool).unwrap();
    assert_eq!(
        signed.unfurl().unwrap().issuer(),
        Some(tool.issuer())
    );

    let mut received = KeyBundle::new();
    received.upload_signed_bundle(&signed, tool.keys()).unwrap();
    assert_eq!(received.ids(), vec![SWAMID.to_string(), EDUGAIN.to_string()]);
    assert!(received.get(SWAMID).unwrap().signing_key().is_err());
    assert!(matches!(
        received.get("https://unknown-fo"),
        Err(FederationError::UnknownFederationOperator(_))
    ));
}

#[test]
fn expired_operator_statement_is_rejected() {
    let bundle = make_key_bundle(&[SWAMID, SUNET], 1);
    let sunet_keys = bundle.get(SUNET).unwrap().clone();

    let swamid = InternalSigningService::new(SWAMID, bundle.get(SWAMID).unwrap().clone())
        .with_lifetime(-3600);
    let mut about_sunet = MetadataStatement::new();
    about_sunet.insert("scope", json!(["openid"]));
    about_sunet.set_signing_keys(&sunet_keys.export_public_jwks());
    let filed = swamid.sign(&about_sunet, &JwtArgs::default()).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let mut signer = Signer::new(
        Box::new(InternalSigningService::new(SUNET, sunet_keys.clone())),
        dir.path(),
    )
    .unwrap();
    signer.store(Context::Registration, SWAMID, &filed).unwrap();
    let sunet = FederationEntity::new(
        SUNET,
        sunet_keys,
        signer,
        bundle.subset(&[SWAMID]).unwrap(),
        ClaimPolicy::default(),
    );

    let token = sunet
        .issue_statement(&MetadataStatement::new(), Context::Registration, SWAMID)
        .expect("issuing does not check the filed statement's lifetime");
    match sunet.evaluate(&token) {
        Err(FederationError::Expired { issuer, exp }) => {
            assert_eq!(issuer, SWAMID);
            assert!(exp < federated_metadata::time::now_secs());
        }
        other => panic!("expected Expired, got {other:?}"),
    }
}
