// tests/engine_tests.rs
use serde_json::Value;
use sops_envelope::{
    DecryptOptions, DecryptionEngine, Format, KeyChain, Metadata, SopsError, StaticKeySource,
    StoreRegistry,
};

mod common;
mod support;
use support::*;

const SECRETS_JSON: &str = r#"{
    "user": "alice",
    "password": "hunter2",
    "port": 5432,
    "ratio": 0.25,
    "enabled": true,
    "nothing": null,
    "empty": "",
    "nested": {"token": "abc", "list": ["x", 1, false]},
    "note_unencrypted": "visible"
}"#;

fn decrypt_json(engine: &DecryptionEngine, envelope: &[u8]) -> sops_envelope::Result<Value> {
    let cleartext = engine.decrypt(envelope, Format::Json, &DecryptOptions::verified())?;
    Ok(serde_json::from_slice(cleartext.expose_secret()).expect("cleartext is json"))
}

fn envelope_json(envelope: &[u8]) -> Value {
    serde_json::from_slice(envelope).unwrap()
}

#[test]
fn test_json_roundtrip_verifies_mac() {
    common::setup();
    let envelope = seal(SECRETS_JSON, Format::Json);

    let decrypted = decrypt_json(&engine(), &envelope).unwrap();
    let expected: Value = serde_json::from_str(SECRETS_JSON).unwrap();
    assert_eq!(decrypted, expected);
}

#[test]
fn test_sealed_envelope_hides_values_and_keeps_unencrypted_suffix() {
    let envelope = envelope_json(&seal(SECRETS_JSON, Format::Json));

    let password = envelope["password"].as_str().unwrap();
    assert!(password.starts_with("ENC[AES256_GCM,data:"));
    assert!(password.ends_with(",type:str]"));
    assert!(envelope["port"].as_str().unwrap().ends_with(",type:int]"));
    assert!(envelope["ratio"].as_str().unwrap().ends_with(",type:float]"));
    assert!(envelope["enabled"].as_str().unwrap().ends_with(",type:bool]"));
    assert_eq!(envelope["nothing"], Value::Null);
    assert_eq!(envelope["empty"], Value::String(String::new()));
    assert_eq!(envelope["note_unencrypted"], "visible");

    let sops = &envelope["sops"];
    assert_eq!(sops["unencrypted_suffix"], "_unencrypted");
    assert!(sops["mac"].as_str().unwrap().starts_with("ENC[AES256_GCM,"));
    assert!(sops["lastmodified"].as_str().unwrap().ends_with('Z'));
}

#[test]
fn test_tampered_ciphertext_is_cipher_error() {
    let mut envelope = envelope_json(&seal(SECRETS_JSON, Format::Json));
    let tampered = tamper_ciphertext(envelope["password"].as_str().unwrap());
    envelope["password"] = Value::String(tampered);
    let bytes = serde_json::to_vec(&envelope).unwrap();

    let err = decrypt_json(&engine(), &bytes).unwrap_err();
    assert!(matches!(err, SopsError::Cipher(_)), "got {err:?}");
}

#[test]
fn test_swapped_ciphertexts_fail_authentication() {
    let mut envelope = envelope_json(&seal(SECRETS_JSON, Format::Json));
    let user = envelope["user"].clone();
    envelope["user"] = envelope["password"].clone();
    envelope["password"] = user;
    let bytes = serde_json::to_vec(&envelope).unwrap();

    // ciphertexts are bound to their key path
    let err = decrypt_json(&engine(), &bytes).unwrap_err();
    assert!(matches!(err, SopsError::Cipher(_)), "got {err:?}");
}

#[test]
fn test_modified_plaintext_leaf_is_integrity_error() {
    let mut envelope = envelope_json(&seal(SECRETS_JSON, Format::Json));
    envelope["note_unencrypted"] = Value::String("changed".into());
    let bytes = serde_json::to_vec(&envelope).unwrap();

    let err = decrypt_json(&engine(), &bytes).unwrap_err();
    match err {
        SopsError::Integrity { expected, computed } => {
            assert_ne!(expected, computed);
            assert_eq!(computed.len(), 128);
            assert!(computed.chars().all(|c| c.is_ascii_digit() || c.is_ascii_uppercase()));
        }
        other => panic!("expected integrity error, got {other:?}"),
    }
}

#[test]
fn test_ignore_mac_returns_cleartext_despite_mismatch() {
    let mut envelope = envelope_json(&seal(SECRETS_JSON, Format::Json));
    envelope["note_unencrypted"] = Value::String("changed".into());
    let bytes = serde_json::to_vec(&envelope).unwrap();

    let cleartext = engine()
        .decrypt(&bytes, Format::Json, &DecryptOptions::ignoring_mac())
        .unwrap();
    let decrypted: Value = serde_json::from_slice(cleartext.expose_secret()).unwrap();
    assert_eq!(decrypted["note_unencrypted"], "changed");
    assert_eq!(decrypted["password"], "hunter2");
}

#[test]
fn test_ignore_mac_skips_undecryptable_stored_mac() {
    let mut envelope = envelope_json(&seal(SECRETS_JSON, Format::Json));
    envelope["sops"]["mac"] = Value::String("ENC[AES256_GCM,garbage]".into());
    let bytes = serde_json::to_vec(&envelope).unwrap();

    assert!(engine()
        .decrypt(&bytes, Format::Json, &DecryptOptions::ignoring_mac())
        .is_ok());

    let err = decrypt_json(&engine(), &bytes).unwrap_err();
    assert!(err.to_string().contains("failed to decrypt original mac"));
}

#[test]
fn test_changed_lastmodified_breaks_mac() {
    let mut envelope = envelope_json(&seal(SECRETS_JSON, Format::Json));
    envelope["sops"]["lastmodified"] = Value::String("2001-01-01T00:00:00Z".into());
    let bytes = serde_json::to_vec(&envelope).unwrap();

    let err = decrypt_json(&engine(), &bytes).unwrap_err();
    assert!(matches!(err, SopsError::Cipher(_)), "got {err:?}");
}

#[test]
fn test_wrong_data_key_fails() {
    let envelope = seal(SECRETS_JSON, Format::Json);
    let err = decrypt_json(&engine_with_key(OTHER_KEY), &envelope).unwrap_err();
    assert!(matches!(err, SopsError::Cipher(_)), "got {err:?}");
}

#[test]
fn test_missing_metadata_is_parse_error() {
    let err = decrypt_json(&engine(), br#"{"user": "alice"}"#).unwrap_err();
    assert!(matches!(err, SopsError::Parse(_)), "got {err:?}");

    let err = decrypt_json(&engine(), b"not json at all").unwrap_err();
    assert!(matches!(err, SopsError::Parse(_)), "got {err:?}");
}

#[test]
fn test_empty_key_chain_is_key_resolution_error() {
    let envelope = seal(SECRETS_JSON, Format::Json);
    let engine = DecryptionEngine::new(StoreRegistry::default(), KeyChain::new());

    let err = decrypt_json(&engine, &envelope).unwrap_err();
    assert!(matches!(err, SopsError::KeyResolution(_)), "got {err:?}");
}

#[test]
fn test_encrypted_regex_only_encrypts_matching_keys() {
    let metadata = Metadata {
        encrypted_regex: Some("^pass".into()),
        ..Metadata::default()
    };
    let envelope = seal_with(
        r#"{"password": "p", "user": "u", "db": {"passphrase": "q"}}"#,
        Format::Json,
        metadata,
    );
    let sealed = envelope_json(&envelope);
    assert_eq!(sealed["user"], "u");
    assert!(sealed["password"].as_str().unwrap().starts_with("ENC["));
    assert!(sealed["db"]["passphrase"].as_str().unwrap().starts_with("ENC["));
    assert!(sealed["sops"].get("unencrypted_suffix").is_none());

    let decrypted = decrypt_json(&engine(), &envelope).unwrap();
    assert_eq!(decrypted["password"], "p");
    assert_eq!(decrypted["db"]["passphrase"], "q");
}

#[test]
fn test_encrypted_suffix_and_unencrypted_regex() {
    let suffix = Metadata {
        encrypted_suffix: Some("_secret".into()),
        ..Metadata::default()
    };
    let envelope = seal_with(r#"{"a_secret": "x", "b": "y"}"#, Format::Json, suffix);
    let sealed = envelope_json(&envelope);
    assert!(sealed["a_secret"].as_str().unwrap().starts_with("ENC["));
    assert_eq!(sealed["b"], "y");
    assert!(decrypt_json(&engine(), &envelope).is_ok());

    let regex = Metadata {
        unencrypted_regex: Some("^public".into()),
        ..Metadata::default()
    };
    let envelope = seal_with(r#"{"public_id": "x", "b": "y"}"#, Format::Json, regex);
    let sealed = envelope_json(&envelope);
    assert_eq!(sealed["public_id"], "x");
    assert!(sealed["b"].as_str().unwrap().starts_with("ENC["));
    assert!(decrypt_json(&engine(), &envelope).is_ok());
}

#[test]
fn test_more_than_one_rule_is_rejected() {
    let metadata = Metadata {
        encrypted_suffix: Some("_secret".into()),
        encrypted_regex: Some("^a".into()),
        ..Metadata::default()
    };
    let err = engine()
        .encrypt(b"{\"a\": 1}", Format::Json, &data_key(), metadata)
        .unwrap_err();
    assert!(matches!(err, SopsError::Parse(_)), "got {err:?}");
}

#[test]
fn test_mac_only_encrypted_ignores_plaintext_leaves() {
    let metadata = Metadata {
        mac_only_encrypted: Some(true),
        ..Metadata::default()
    };
    let mut envelope = envelope_json(&seal_with(SECRETS_JSON, Format::Json, metadata));
    envelope["note_unencrypted"] = Value::String("changed".into());
    let bytes = serde_json::to_vec(&envelope).unwrap();

    let decrypted = decrypt_json(&engine(), &bytes).unwrap();
    assert_eq!(decrypted["note_unencrypted"], "changed");
}

#[test]
fn test_yaml_roundtrip() {
    let plain = "name: alice\nport: 8080\nratio: 0.5\nenabled: false\nitems:\n- a\n- b\nnested:\n  token: xyz\n";
    let envelope = seal(plain, Format::Yaml);
    assert!(!String::from_utf8_lossy(&envelope).contains("alice"));

    let cleartext = engine()
        .decrypt(&envelope, Format::Yaml, &DecryptOptions::verified())
        .unwrap();
    let decrypted: serde_yaml::Value = serde_yaml::from_slice(cleartext.expose_secret()).unwrap();
    let expected: serde_yaml::Value = serde_yaml::from_str(plain).unwrap();
    assert_eq!(decrypted, expected);
}

#[test]
fn test_yaml_multi_document_roundtrip() {
    let plain = "a: 1\n---\nb: two\n";
    let envelope = seal(plain, Format::Yaml);

    let cleartext = engine()
        .decrypt(&envelope, Format::Yaml, &DecryptOptions::verified())
        .unwrap();
    let text = String::from_utf8(cleartext.expose_secret().clone()).unwrap();
    assert_eq!(text, "a: 1\n---\nb: two\n");
}

#[test]
fn test_dotenv_roundtrip_with_comments() {
    let plain = "# database\nDB_USER=admin\nDB_PASS=s3cret\nMULTI=line1\\nline2\n";
    let envelope = seal(plain, Format::Dotenv);
    let sealed = String::from_utf8(envelope.clone()).unwrap();
    assert!(!sealed.contains("s3cret"));
    assert!(!sealed.contains("database"));
    assert!(sealed.contains("sops_mac=ENC[AES256_GCM,"));

    let cleartext = engine()
        .decrypt(&envelope, Format::Dotenv, &DecryptOptions::verified())
        .unwrap();
    assert_eq!(cleartext.expose_secret().as_slice(), plain.as_bytes());
}

#[test]
fn test_dotenv_plaintext_comment_is_kept() {
    let envelope = seal_str("# note\nKEY=value\n", Format::Dotenv);
    let mut lines: Vec<&str> = envelope.lines().collect();
    assert!(lines[0].starts_with("#ENC[AES256_GCM,"));
    lines[0] = "#left in the clear";
    let patched = lines.join("\n");

    // comments are not authenticated, so the MAC still verifies
    let cleartext = engine()
        .decrypt(patched.as_bytes(), Format::Dotenv, &DecryptOptions::verified())
        .unwrap();
    assert_eq!(
        cleartext.expose_secret().as_slice(),
        b"#left in the clear\nKEY=value\n"
    );
}

#[test]
fn test_ini_roundtrip() {
    let plain = "[db]\nuser = admin\npass = secret\n\n[cache]\nttl = 60\n";
    let envelope = seal(plain, Format::Ini);
    let sealed = String::from_utf8(envelope.clone()).unwrap();
    assert!(sealed.contains("[sops]"));
    assert!(!sealed.contains("admin"));

    let cleartext = engine()
        .decrypt(&envelope, Format::Ini, &DecryptOptions::verified())
        .unwrap();
    let text = String::from_utf8(cleartext.expose_secret().clone()).unwrap();
    let reparsed = ini::Ini::load_from_str(&text).unwrap();
    assert_eq!(reparsed.get_from(Some("db"), "user"), Some("admin"));
    assert_eq!(reparsed.get_from(Some("db"), "pass"), Some("secret"));
    assert_eq!(reparsed.get_from(Some("cache"), "ttl"), Some("60"));
    assert!(reparsed.section(Some("sops")).is_none());
}

#[test]
fn test_ini_comments_are_dropped_but_mac_verifies() {
    let plain = "; rotated quarterly\n[db]\n# owner: platform\nuser = admin\n";
    let envelope = seal(plain, Format::Ini);

    let cleartext = engine()
        .decrypt(&envelope, Format::Ini, &DecryptOptions::verified())
        .unwrap();
    let text = String::from_utf8(cleartext.expose_secret().clone()).unwrap();
    assert!(text.contains("admin"));
    assert!(!text.contains("rotated quarterly"));
    assert!(!text.contains("owner: platform"));
}

#[test]
fn test_binary_roundtrip() {
    let plain = "opaque \u{1F512} payload\n";
    let envelope = seal(plain, Format::Binary);
    let sealed = envelope_json(&envelope);
    assert!(sealed["data"].as_str().unwrap().starts_with("ENC[AES256_GCM,"));

    let cleartext = engine()
        .decrypt(&envelope, Format::Binary, &DecryptOptions::verified())
        .unwrap();
    assert_eq!(cleartext.expose_secret().as_slice(), plain.as_bytes());
}

#[test]
fn test_static_key_from_hex() {
    let envelope = seal(SECRETS_JSON, Format::Json);
    let source = StaticKeySource::from_hex(&hex::encode(TEST_KEY)).unwrap();
    let engine = DecryptionEngine::new(StoreRegistry::default(), KeyChain::new().with(source));
    assert!(decrypt_json(&engine, &envelope).is_ok());

    assert!(StaticKeySource::from_hex("abcd").is_err());
    assert!(StaticKeySource::from_hex("zz").is_err());
}
