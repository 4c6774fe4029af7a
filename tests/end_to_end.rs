// Manifold End-to-End Tests
//
// Coverage:
// - Stage → manifest → commit → delayed activate → dispatch, with a facet that echoes its caller
// - Concurrent staging of identical bytecode deploys exactly once
// - Code drift after activation blocks dispatch
// - Freeze keeps the active table serving while refusing changes
// - Manifest documents round-trip through disk and rebuild their root

use manifold::{
    keccak256, Address, CallContext, CallOutcome, Capability, ErrorKind, FeeSettings,
    Chain, InMemoryChain, Manifest, ManifestHeader, Protocol, ProtocolConfig, ProtocolEvent, Route,
    Selector, StaticCapabilities, H256,
};
use manifold_governance::GovernanceEvent;
use std::sync::Arc;
use std::thread;

const ECHO_CODE: &[u8] = &[0x33, 0x36, 0x60, 0x00, 0x52, 0x59, 0x60, 0x00, 0xf3];
const DELAY: u64 = 3_600;
const FEE: u128 = 100;
const T0: u64 = 1_700_000_000;

fn init_logs() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn admin() -> Address {
    Address::repeat_byte(0xad)
}

fn payer() -> Address {
    Address::repeat_byte(0x9a)
}

fn treasury() -> Address {
    Address::repeat_byte(0x7e)
}

fn dispatcher() -> Address {
    Address::repeat_byte(0xd1)
}

fn config() -> ProtocolConfig {
    ProtocolConfig {
        chain_id: 31_337,
        deployer: Address::repeat_byte(0xf0),
        namespace: "e2e.chunks".into(),
        activation_delay_secs: DELAY,
        fee: FeeSettings {
            amount: FEE,
            enabled: true,
            recipient: treasury(),
        },
        dispatcher: dispatcher(),
        ..ProtocolConfig::default()
    }
}

/// Echoes the caller and the address whose storage it runs against.
fn echo_caller(ctx: &mut CallContext<'_>) -> CallOutcome {
    let mut out = ctx.caller().as_bytes().to_vec();
    out.extend_from_slice(ctx.address().as_bytes());
    out.extend_from_slice(ctx.args());
    CallOutcome::Return(out)
}

fn protocol() -> Protocol<InMemoryChain, StaticCapabilities> {
    let mut chain = InMemoryChain::new(31_337);
    chain.register_program(ECHO_CODE, Arc::new(echo_caller));
    chain.fund(payer(), 1_000);
    Protocol::new(&config(), chain, StaticCapabilities::with_operator(admin())).unwrap()
}

fn echo_selector() -> Selector {
    Selector::from_signature("echoCaller(bytes)")
}

/// Stage the caller-echo facet and activate a single-route manifest for it.
fn activated() -> (Protocol<InMemoryChain, StaticCapabilities>, Manifest) {
    let mut p = protocol();
    let receipt = p.stage(&payer(), ECHO_CODE, FEE).unwrap();
    let route = Route::new(
        echo_selector(),
        receipt.chunk.deployed_address,
        receipt.chunk.content_hash,
    );
    let manifest = Manifest::build(
        ManifestHeader::new(Address::repeat_byte(0xf0), 31_337, None),
        vec![route],
    )
    .unwrap();

    p.commit_manifest(&admin(), &manifest, 1, T0).unwrap();
    p.activate(&admin(), T0 + DELAY).unwrap();
    (p, manifest)
}

#[test]
fn test_stage_commit_activate_dispatch() {
    init_logs();
    let mut p = protocol();

    let receipt = p.stage(&payer(), ECHO_CODE, FEE + 50).unwrap();
    assert!(receipt.deployed);
    assert_eq!(receipt.fee_charged, FEE);
    assert_eq!(receipt.chunk.content_hash, keccak256(ECHO_CODE));
    assert_eq!(p.chain().balance(&treasury()), FEE);
    assert_eq!(p.chain().balance(&payer()), 1_000 - FEE);

    let route = Route::new(
        echo_selector(),
        receipt.chunk.deployed_address,
        receipt.chunk.content_hash,
    );
    let manifest = Manifest::build(
        ManifestHeader::new(Address::repeat_byte(0xf0), 31_337, None),
        vec![route],
    )
    .unwrap();
    assert_eq!(manifest.root, manifold_crypto::leaf_hash(&route));

    p.commit_manifest(&admin(), &manifest, 1, T0).unwrap();
    assert_eq!(p.state().activatable_at(), Some(T0 + DELAY));

    // nothing routes before activation
    let proof = manifest.proofs().unwrap().remove(0);
    assert!(proof.siblings.is_empty());
    let err = p
        .dispatch(&Address::repeat_byte(0x42), echo_selector(), &echo_selector().0, &proof)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::StateConflict);

    let err = p.activate(&admin(), T0 + DELAY - 1).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::StateConflict);
    p.activate(&admin(), T0 + DELAY).unwrap();
    assert_eq!(p.state().active_root, manifest.root);

    let external = Address::repeat_byte(0x42);
    let mut calldata = echo_selector().0.to_vec();
    calldata.extend_from_slice(b"hello");
    let out = p
        .dispatch(&external, echo_selector(), &calldata, &proof)
        .unwrap();

    assert_eq!(&out[..20], external.as_bytes(), "facet must see the external caller");
    assert_ne!(&out[..20], dispatcher().as_bytes());
    assert_eq!(&out[20..40], dispatcher().as_bytes());
    assert_eq!(&out[40..], b"hello");

    let kinds: Vec<&str> = p
        .events()
        .iter()
        .map(|event| match event {
            ProtocolEvent::Staging(_) => "staging",
            ProtocolEvent::Governance(GovernanceEvent::RootCommitted { .. }) => "commit",
            ProtocolEvent::Governance(GovernanceEvent::RootActivated { .. }) => "activate",
            ProtocolEvent::Governance(_) => "other",
        })
        .collect();
    assert_eq!(kinds, vec!["staging", "commit", "activate"]);
}

#[test]
fn test_restaging_is_free_and_idempotent() {
    let mut p = protocol();
    let first = p.stage(&payer(), ECHO_CODE, FEE).unwrap();
    let second = p.stage(&payer(), ECHO_CODE, FEE).unwrap();

    assert!(first.deployed && !second.deployed);
    assert_eq!(first.chunk, second.chunk);
    assert_eq!(second.fee_charged, 0);
    assert_eq!(p.chain().deployments(), 1);
    assert_eq!(p.chain().balance(&treasury()), FEE);
}

#[test]
fn test_concurrent_staging_deploys_once() {
    init_logs();
    let shared = protocol().into_shared();

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let shared = Arc::clone(&shared);
            thread::spawn(move || shared.lock().stage(&payer(), ECHO_CODE, FEE).unwrap())
        })
        .collect();
    let receipts: Vec<_> = handles
        .into_iter()
        .map(|handle| handle.join().unwrap())
        .collect();

    assert_eq!(receipts.iter().filter(|r| r.deployed).count(), 1);
    let address = receipts[0].chunk.deployed_address;
    assert!(receipts.iter().all(|r| r.chunk.deployed_address == address));

    let p = shared.lock();
    assert_eq!(p.chain().deployments(), 1);
    assert_eq!(p.ledger().len(), 1);
    assert_eq!(p.chain().balance(&treasury()), FEE);
}

#[test]
fn test_code_drift_after_activation() {
    let (mut p, manifest) = activated();
    let proof = manifest.proofs().unwrap().remove(0);
    let facet = proof.route.facet;

    p.chain_mut().set_code(facet, vec![0xfe]);
    let err = p
        .dispatch(&Address::repeat_byte(0x42), echo_selector(), &echo_selector().0, &proof)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::IntegrityViolation);
}

#[test]
fn test_pause_and_freeze() {
    let (mut p, manifest) = activated();
    let proof = manifest.proofs().unwrap().remove(0);
    let user = Address::repeat_byte(0x42);

    p.pause(&admin()).unwrap();
    let err = p.dispatch(&user, echo_selector(), &echo_selector().0, &proof).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::StateConflict);
    p.unpause(&admin()).unwrap();

    p.freeze(&admin()).unwrap();
    let err = p.commit(&admin(), H256::repeat_byte(9), 2, T0 + DELAY).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::StateConflict);

    // the frozen table keeps serving
    assert!(p.dispatch(&user, echo_selector(), &echo_selector().0, &proof).is_ok());
    assert!(p.resolve(echo_selector(), &proof).is_ok());
}

#[test]
fn test_capabilities_gate_governance() {
    let mut p = protocol();
    let committer = Address::repeat_byte(0xc1);
    let mut access = StaticCapabilities::new();
    access.grant(committer, Capability::Commit);

    let mut restricted = Protocol::new(&config(), InMemoryChain::default(), access).unwrap();
    restricted.commit(&committer, H256::repeat_byte(1), 1, T0).unwrap();
    let err = restricted.activate(&committer, T0 + DELAY).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Unauthorized);

    let err = p.freeze(&committer).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Unauthorized);
}

#[test]
fn test_manifest_file_round_trip() {
    let (_, manifest) = activated();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("manifest.json");

    manifest.save(&path).unwrap();
    let loaded = Manifest::load(&path).unwrap();
    assert_eq!(loaded, manifest);
    assert_eq!(loaded.verify_root().unwrap().root(), manifest.root);
    assert_eq!(loaded.manifest_hash().unwrap(), manifest.manifest_hash().unwrap());

    let raw = std::fs::read_to_string(&path).unwrap();
    assert!(raw.contains("\"merkleRoot\""));
}

#[test]
fn test_config_file_and_environment_layers() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("manifold.toml");
    std::fs::write(
        &path,
        r#"
chain_id = 10
namespace = "from-file"
activation_delay_secs = 120

[fee]
amount = 7
enabled = true
recipient = "0x7e7e7e7e7e7e7e7e7e7e7e7e7e7e7e7e7e7e7e7e"
"#,
    )
    .unwrap();

    let loaded = ProtocolConfig::load(Some(&path)).unwrap();
    assert_eq!(loaded.chain_id, 10);
    assert_eq!(loaded.namespace, "from-file");
    assert_eq!(loaded.fee.amount, 7);
    assert_eq!(loaded.fee.recipient, treasury());
    assert_eq!(loaded.max_code_size, 24_576);

    std::env::set_var("MANIFOLD__ACTIVATION_DELAY_SECS", "600");
    let layered = ProtocolConfig::load(Some(&path));
    std::env::remove_var("MANIFOLD__ACTIVATION_DELAY_SECS");
    assert_eq!(layered.unwrap().activation_delay_secs, 600);

    std::fs::write(&path, "max_code_size = 0\n").unwrap();
    let err = ProtocolConfig::load(Some(&path)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidInput);
}
