use did_connect::keys::{Identity, KeyStore, ED25519_ALGORITHM};
use did_connect::{did, KeyStoreError};

#[test]
fn saved_identity_loads_back() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let store = KeyStore::new(dir.path().join("keys"));
    let identity = Identity::generate("Tutor Bot", "https://agents.example/api/message")?;

    let path = store.save(&identity)?;

    let file_name = path.file_name().unwrap().to_string_lossy().into_owned();
    assert!(file_name.ends_with("_Tutor_Bot.json"), "{file_name}");
    let stored: serde_json::Value = serde_json::from_slice(&std::fs::read(&path)?)?;
    assert_eq!(stored["did"], identity.did.as_str());
    assert_eq!(stored["publicKey"], identity.public_key.as_str());
    assert_eq!(stored["metadata"]["name"], "Tutor Bot");
    assert!(stored["privateKey"].is_string());

    let loaded = store.load(&path)?;
    assert_eq!(loaded.did, identity.did);
    assert_eq!(loaded.signer.seed(), identity.signer.seed());

    let relative = store.load(file_name)?;
    assert_eq!(relative.did, identity.did);
    Ok(())
}

#[test]
fn reloaded_signer_mints_identifiers_for_the_same_key() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let store = KeyStore::new(dir.path());
    let original = Identity::generate("A", "https://x/api/message")?;
    let loaded = store.load(store.save(&original)?)?;

    let moved = Identity::from_signer(loaded.signer, loaded.metadata, "https://y/api/message")?;

    let decoded = did::decode(&moved.did)?;
    assert_eq!(decoded.algorithm, ED25519_ALGORITHM);
    assert_eq!(decoded.public_key, original.public_key);
    assert_eq!(decoded.endpoint, "https://y/api/message");
    Ok(())
}

#[test]
fn missing_or_corrupt_files_are_errors() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let store = KeyStore::new(dir.path());

    assert!(matches!(store.load("absent.json"), Err(KeyStoreError::Io(_))));

    let corrupt = dir.path().join("corrupt.json");
    std::fs::write(&corrupt, "{not json")?;
    assert!(matches!(
        store.load(&corrupt),
        Err(KeyStoreError::SerializationError(_))
    ));
    Ok(())
}
