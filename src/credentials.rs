//! Registry credentials, encrypted at rest with a per-installation AES-256-GCM key.

use crate::error::{Error, Result};
use crate::runtime::ImageRuntime;
use crate::storage::StateStore;
use aes_gcm::{
    aead::{Aead, AeadCore, KeyInit, OsRng},
    Aes256Gcm, Nonce,
};
use rand::RngCore;
use std::path::Path;
use tracing::{info, warn};

const NONCE_SIZE: usize = 12;
const KEY_SIZE: usize = 32;

/// Read the hex key at `path`, creating it (mode 0600 on Unix) when missing.
pub fn load_or_create_key(path: &Path) -> Result<String> {
    if path.exists() {
        let key = std::fs::read_to_string(path)?.trim().to_string();
        check_key(&key)?;
        return Ok(key);
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut bytes = [0u8; KEY_SIZE];
    rand::rngs::OsRng.fill_bytes(&mut bytes);
    let key = hex::encode(bytes);
    std::fs::write(path, &key)?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
    }
    info!(path = %path.display(), "created credential key");
    Ok(key)
}

fn cipher(key_hex: &str) -> Result<Aes256Gcm> {
    let key = check_key(key_hex)?;
    Aes256Gcm::new_from_slice(&key).map_err(|e| Error::Crypto(e.to_string()))
}

fn check_key(key_hex: &str) -> Result<Vec<u8>> {
    let key = hex::decode(key_hex).map_err(|e| Error::Crypto(format!("invalid hex key: {e}")))?;
    if key.len() != KEY_SIZE {
        return Err(Error::Crypto("key must be 32 bytes".into()));
    }
    Ok(key)
}

/// Hex of `nonce || ciphertext`.
pub fn encrypt(plain: &str, key_hex: &str) -> Result<String> {
    let cipher = cipher(key_hex)?;
    let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
    let ciphertext = cipher
        .encrypt(&nonce, plain.as_bytes())
        .map_err(|e| Error::Crypto(format!("encryption failed: {e}")))?;
    let mut out = nonce.to_vec();
    out.extend_from_slice(&ciphertext);
    Ok(hex::encode(out))
}

pub fn decrypt(cipher_hex: &str, key_hex: &str) -> Result<String> {
    let cipher = cipher(key_hex)?;
    let data = hex::decode(cipher_hex)
        .map_err(|e| Error::Crypto(format!("invalid hex ciphertext: {e}")))?;
    if data.len() < NONCE_SIZE {
        return Err(Error::Crypto("ciphertext too short".into()));
    }
    let (nonce, ciphertext) = data.split_at(NONCE_SIZE);
    let plain = cipher
        .decrypt(Nonce::from_slice(nonce), ciphertext)
        .map_err(|e| Error::Crypto(format!("decryption failed: {e}")))?;
    String::from_utf8(plain).map_err(|e| Error::Crypto(e.to_string()))
}

pub fn save(store: &mut StateStore, key_hex: &str, username: &str, password: &str) -> Result<()> {
    let sealed = encrypt(password, key_hex)?;
    store.save_credential(username, &sealed)
}

pub fn load(store: &StateStore, key_hex: &str) -> Result<Option<(String, String)>> {
    match store.get_credential()? {
        Some((user, sealed)) => Ok(Some((user, decrypt(&sealed, key_hex)?))),
        None => Ok(None),
    }
}

/// Log in with the cached credentials. Returns the username on success and
/// `None` when nothing is cached or the registry refused them.
pub fn login_cached(
    store: &StateStore,
    key_hex: &str,
    runtime: &dyn ImageRuntime,
    registry: &str,
) -> Result<Option<String>> {
    let Some((user, password)) = load(store, key_hex)? else {
        return Ok(None);
    };
    match runtime.login(&user, &password, registry) {
        Ok(()) => {
            info!(user = %user, registry, "logged in with cached credentials");
            Ok(Some(user))
        }
        Err(Error::Runtime { message, .. }) => {
            warn!(user = %user, %message, "cached registry credentials rejected");
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

/// Log in and cache the credentials once the registry accepts them.
pub fn login_and_save(
    store: &mut StateStore,
    key_hex: &str,
    runtime: &dyn ImageRuntime,
    registry: &str,
    username: &str,
    password: &str,
) -> Result<()> {
    runtime.login(username, password, registry)?;
    save(store, key_hex, username, password)?;
    info!(user = username, registry, "saved registry credentials");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::fake::FakeRuntime;

    const KEY: &str = "000102030405060708090a0b0c0d0e0f101112131415161718191a1b1c1d1e1f";
    const OTHER: &str = "f1e1d1c1b1a191817161514131211101f0e0d0c0b0a090807060504030201000";

    #[test]
    fn sealed_password_opens_only_with_its_key() {
        let sealed = encrypt("hunter2", KEY).unwrap();
        assert_ne!(sealed, "hunter2");
        assert_ne!(sealed, encrypt("hunter2", KEY).unwrap());
        assert_eq!(decrypt(&sealed, KEY).unwrap(), "hunter2");
        assert!(matches!(decrypt(&sealed, OTHER), Err(Error::Crypto(_))));
        assert!(decrypt("00ff", KEY).is_err());
        assert!(encrypt("x", "1234").is_err());
    }

    #[test]
    fn key_file_is_created_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("registry.key");
        let first = load_or_create_key(&path).unwrap();
        let second = load_or_create_key(&path).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.len(), KEY_SIZE * 2);
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = std::fs::metadata(&path).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o600);
        }
    }

    #[test]
    fn corrupt_key_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("registry.key");
        std::fs::write(&path, "zz").unwrap();
        assert!(matches!(load_or_create_key(&path), Err(Error::Crypto(_))));
    }

    #[test]
    fn stored_credentials_round_trip_through_ledger() {
        let mut store = StateStore::open_in_memory().unwrap();
        assert_eq!(load(&store, KEY).unwrap(), None);
        save(&mut store, KEY, "alice", "s3cret").unwrap();
        let (_, sealed) = store.get_credential().unwrap().unwrap();
        assert!(!sealed.contains("s3cret"));
        assert_eq!(
            load(&store, KEY).unwrap(),
            Some(("alice".to_string(), "s3cret".to_string()))
        );
    }

    #[test]
    fn cached_login_uses_stored_user() {
        let mut store = StateStore::open_in_memory().unwrap();
        let rt = FakeRuntime::new();
        assert_eq!(
            login_cached(&store, KEY, &rt, "https://index.docker.io/v1/").unwrap(),
            None
        );
        assert_eq!(rt.calls_to("login"), 0);

        login_and_save(&mut store, KEY, &rt, "https://index.docker.io/v1/", "alice", "pw").unwrap();
        let user = login_cached(&store, KEY, &rt, "https://index.docker.io/v1/").unwrap();
        assert_eq!(user.as_deref(), Some("alice"));
        assert_eq!(rt.calls_to("login"), 2);
    }

    #[test]
    fn failed_login_saves_nothing() {
        let mut store = StateStore::open_in_memory().unwrap();
        let rt = FakeRuntime::new();
        rt.unavailable.set(true);
        assert!(login_and_save(&mut store, KEY, &rt, "r", "alice", "pw").is_err());
        assert_eq!(store.get_credential().unwrap(), None);
    }
}
