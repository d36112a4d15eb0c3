// tests/key_tests.rs
use age::secrecy::ExposeSecret;
use age::x25519;
use sops_envelope::config::KeysConfig;
use sops_envelope::keys::age_key::parse_identities;
use sops_envelope::metadata::KeyGroup;
use sops_envelope::{
    AgeKeySource, DecryptOptions, DecryptionEngine, Format, KeyChain, KeySource, KeySourceError,
    Metadata, SopsError, StaticKeySource, StoreRegistry,
};
use tempfile::tempdir;

mod support;
use support::*;

const PLAIN: &str = r#"{"token": "t0k3n", "count": 3}"#;

fn age_template(recipient: &x25519::Recipient) -> Metadata {
    let entry = AgeKeySource::wrap_data_key(&data_key(), recipient).unwrap();
    Metadata {
        age: Some(vec![entry]),
        ..Metadata::default()
    }
}

fn age_engine(identity: x25519::Identity) -> DecryptionEngine {
    DecryptionEngine::new(
        StoreRegistry::default(),
        KeyChain::new().with(AgeKeySource::with_identities(vec![identity])),
    )
}

#[test]
fn test_age_wrapped_data_key_roundtrip() {
    let identity = x25519::Identity::generate();
    let envelope = seal_with(PLAIN, Format::Json, age_template(&identity.to_public()));

    let sealed: serde_json::Value = serde_json::from_slice(&envelope).unwrap();
    let entry = &sealed["sops"]["age"][0];
    assert_eq!(entry["recipient"], identity.to_public().to_string());
    assert!(entry["enc"]
        .as_str()
        .unwrap()
        .starts_with("-----BEGIN AGE ENCRYPTED FILE-----"));

    let cleartext = age_engine(identity)
        .decrypt(&envelope, Format::Json, &DecryptOptions::verified())
        .unwrap();
    let value: serde_json::Value = serde_json::from_slice(cleartext.expose_secret()).unwrap();
    assert_eq!(value["token"], "t0k3n");
}

#[test]
fn test_age_in_key_groups() {
    let identity = x25519::Identity::generate();
    let entry = AgeKeySource::wrap_data_key(&data_key(), &identity.to_public()).unwrap();
    let template = Metadata {
        key_groups: Some(vec![KeyGroup {
            age: Some(vec![entry]),
            ..KeyGroup::default()
        }]),
        ..Metadata::default()
    };
    let envelope = seal_with(PLAIN, Format::Json, template);

    assert!(age_engine(identity)
        .decrypt(&envelope, Format::Json, &DecryptOptions::verified())
        .is_ok());
}

#[test]
fn test_wrong_age_identity_lists_failure() {
    let owner = x25519::Identity::generate();
    let stranger = x25519::Identity::generate();
    let envelope = seal_with(PLAIN, Format::Json, age_template(&owner.to_public()));

    let err = age_engine(stranger)
        .decrypt(&envelope, Format::Json, &DecryptOptions::verified())
        .err()
        .expect("decrypt must fail");
    match err {
        SopsError::KeyResolution(message) => {
            assert!(message.starts_with("age: "), "{message}");
            assert!(message.contains(&owner.to_public().to_string()));
        }
        other => panic!("expected key resolution error, got {other:?}"),
    }
}

#[test]
fn test_age_source_without_age_descriptors() {
    let source = AgeKeySource::with_identities(vec![x25519::Identity::generate()]);
    let err = source.resolve(&Metadata::default()).err().expect("no descriptors");
    assert!(matches!(err, KeySourceError::NotApplicable("age")));
}

#[test]
fn test_key_chain_falls_through_to_next_source() {
    let envelope = seal(PLAIN, Format::Json);
    let keys = KeyChain::new()
        .with(AgeKeySource::with_identities(vec![]))
        .with(StaticKeySource::new(data_key()));
    let engine = DecryptionEngine::new(StoreRegistry::default(), keys);

    assert!(engine
        .decrypt(&envelope, Format::Json, &DecryptOptions::verified())
        .is_ok());
}

#[test]
fn test_key_chain_collects_every_failure() {
    let envelope = seal(PLAIN, Format::Json);
    let keys = KeyChain::new().with(AgeKeySource::with_identities(vec![]));
    let engine = DecryptionEngine::new(StoreRegistry::default(), keys);

    let err = engine
        .decrypt(&envelope, Format::Json, &DecryptOptions::verified())
        .err()
        .expect("no usable source");
    assert_eq!(
        err.to_string(),
        "failed to get the data key: age: no age key in metadata"
    );
}

#[test]
fn test_shamir_threshold_across_groups_is_unsupported() {
    let metadata = Metadata {
        shamir_threshold: Some(2),
        key_groups: Some(vec![KeyGroup::default(), KeyGroup::default()]),
        ..Metadata::default()
    };
    let chain = KeyChain::new().with(StaticKeySource::new(data_key()));

    let err = chain.resolve(&metadata).err().expect("unsupported");
    assert!(matches!(err, SopsError::KeyResolution(ref m) if m.contains("shamir")));
}

#[test]
fn test_multiple_key_groups_are_rejected_without_threshold() {
    for threshold in [None, Some(1)] {
        let metadata = Metadata {
            shamir_threshold: threshold,
            key_groups: Some(vec![KeyGroup::default(), KeyGroup::default()]),
            ..Metadata::default()
        };
        let chain = KeyChain::new().with(StaticKeySource::new(data_key()));

        let err = chain.resolve(&metadata).err().expect("unsupported");
        assert!(
            matches!(err, SopsError::KeyResolution(ref m) if m.contains("shamir")),
            "threshold {threshold:?}: {err:?}"
        );
    }
}

#[test]
fn test_single_key_group_is_resolved() {
    let metadata = Metadata {
        shamir_threshold: Some(1),
        key_groups: Some(vec![KeyGroup::default()]),
        ..Metadata::default()
    };
    let chain = KeyChain::new().with(StaticKeySource::new(data_key()));
    assert!(chain.resolve(&metadata).is_ok());
}

#[test]
fn test_identities_from_configured_file() {
    let identity = x25519::Identity::generate();
    let envelope = seal_with(PLAIN, Format::Json, age_template(&identity.to_public()));

    let dir = tempdir().unwrap();
    let contents = format!(
        "# created: today\n# public key: {}\n{}\n",
        identity.to_public(),
        identity.to_string().expose_secret()
    );
    let key_file = write_fixture(&dir, "keys.txt", contents.as_bytes());

    // variable names no other test touches
    let config = KeysConfig {
        age_key_file: Some(key_file),
        age_key_env: "SOPS_ENVELOPE_TEST_UNSET_KEY".into(),
        age_key_file_env: "SOPS_ENVELOPE_TEST_UNSET_KEY_FILE".into(),
    };
    let engine = DecryptionEngine::new(
        StoreRegistry::default(),
        KeyChain::new().with(AgeKeySource::new(config)),
    );

    assert!(engine
        .decrypt(&envelope, Format::Json, &DecryptOptions::verified())
        .is_ok());
}

#[test]
fn test_parse_identities_rejects_garbage() {
    assert!(parse_identities("\n# only comments\n\n").unwrap().is_empty());
    assert!(parse_identities("not-a-key").is_err());
    assert!(parse_identities("AGE-SECRET-KEY-1INVALID").is_err());
}
