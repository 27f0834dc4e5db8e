//! Encrypted on-disk persistence of the cookie store between runs.
//!
//! The store is serialized to JSON and sealed with ChaCha20-Poly1305 under a
//! key derived with Argon2 from the account password. A vault that cannot be
//! opened is reported as "no stored session" so the next run logs in again.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{anyhow, Context, Result};
use argon2::Argon2;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use chacha20poly1305::aead::{Aead, KeyInit};
use chacha20poly1305::{ChaCha20Poly1305, Key, Nonce};
use chrono::{DateTime, Utc};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use super::CookieStore;

/// Vault file name prefix in cache directory, followed by the login digest
const VAULT_FILE_PREFIX: &str = "cookies-";

/// Hex digits of the login digest kept in the file name
const LOGIN_DIGEST_LEN: usize = 16;

/// On-disk format version, bumped on incompatible changes
const VAULT_VERSION: u32 = 1;

const SALT_LEN: usize = 16;
const NONCE_LEN: usize = 12;
const KEY_LEN: usize = 32;

/// Key-value persistence for the cookie store across runs.
///
/// `secret` is the material the store may use to protect the cookies at rest
/// (the account password for `CookieVault`).
pub trait SessionStore {
    fn load(&self, secret: &str) -> Result<Option<CookieStore>>;
    fn save(&self, cookies: &CookieStore, secret: &str) -> Result<()>;
    fn clear(&self) -> Result<()>;
}

#[derive(Debug, Serialize, Deserialize)]
struct VaultFile {
    version: u32,
    saved_at: DateTime<Utc>,
    salt: String,
    nonce: String,
    ciphertext: String,
}

pub struct CookieVault {
    path: PathBuf,
}

impl CookieVault {
    /// Vault of one account. Logins are compared case-insensitively and
    /// never appear in the file name.
    pub fn for_login(cache_dir: &Path, login: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(login.trim().to_lowercase().as_bytes());
        let digest = format!("{:x}", hasher.finalize());

        Self {
            path: cache_dir.join(format!(
                "{}{}.json",
                VAULT_FILE_PREFIX,
                &digest[..LOGIN_DIGEST_LEN]
            )),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// When the vault was last written, without decrypting it.
    pub fn saved_at(&self) -> Result<Option<DateTime<Utc>>> {
        if !self.path.exists() {
            return Ok(None);
        }
        Ok(Some(self.read_file()?.saved_at))
    }

    fn read_file(&self) -> Result<VaultFile> {
        let contents = std::fs::read_to_string(&self.path).context("Failed to read cookie vault")?;
        serde_json::from_str(&contents).context("Failed to parse cookie vault")
    }

    fn derive_key(secret: &str, salt: &[u8]) -> Result<[u8; KEY_LEN]> {
        let mut key = [0u8; KEY_LEN];
        Argon2::default()
            .hash_password_into(secret.as_bytes(), salt, &mut key)
            .map_err(|e| anyhow!("Failed to derive vault key: {}", e))?;
        Ok(key)
    }

    fn seal(cookies: &CookieStore, secret: &str) -> Result<VaultFile> {
        let mut salt = [0u8; SALT_LEN];
        let mut nonce = [0u8; NONCE_LEN];
        let mut rng = rand::thread_rng();
        rng.fill_bytes(&mut salt);
        rng.fill_bytes(&mut nonce);

        let key = Self::derive_key(secret, &salt)?;
        let cipher = ChaCha20Poly1305::new(Key::from_slice(&key));
        let plaintext = cookies.to_json()?;
        let ciphertext = cipher
            .encrypt(Nonce::from_slice(&nonce), plaintext.as_slice())
            .map_err(|e| anyhow!("Failed to encrypt cookie vault: {}", e))?;

        Ok(VaultFile {
            version: VAULT_VERSION,
            saved_at: Utc::now(),
            salt: STANDARD.encode(salt),
            nonce: STANDARD.encode(nonce),
            ciphertext: STANDARD.encode(ciphertext),
        })
    }

    fn open(file: &VaultFile, secret: &str) -> Result<CookieStore> {
        if file.version != VAULT_VERSION {
            return Err(anyhow!("Unsupported cookie vault version {}", file.version));
        }
        let salt = STANDARD.decode(&file.salt).context("Invalid vault salt")?;
        let nonce = STANDARD.decode(&file.nonce).context("Invalid vault nonce")?;
        let ciphertext = STANDARD.decode(&file.ciphertext).context("Invalid vault ciphertext")?;
        if nonce.len() != NONCE_LEN {
            return Err(anyhow!("Invalid vault nonce length {}", nonce.len()));
        }

        let key = Self::derive_key(secret, &salt)?;
        let cipher = ChaCha20Poly1305::new(Key::from_slice(&key));
        let plaintext = cipher
            .decrypt(Nonce::from_slice(&nonce), ciphertext.as_slice())
            .map_err(|e| anyhow!("Failed to decrypt cookie vault: {}", e))?;

        CookieStore::from_json(&plaintext).context("Failed to parse decrypted cookie vault")
    }
}

impl SessionStore for CookieVault {
    fn load(&self, secret: &str) -> Result<Option<CookieStore>> {
        if !self.path.exists() {
            debug!(path = %self.path.display(), "No cookie vault found");
            return Ok(None);
        }

        let file = self.read_file()?;
        match Self::open(&file, secret) {
            Ok(cookies) => {
                debug!(count = cookies.len(), saved_at = %file.saved_at, "Cookie vault loaded");
                Ok(Some(cookies))
            }
            Err(e) => {
                // Password changed or file tampered with: start from scratch
                warn!(error = %e, "Ignoring unreadable cookie vault");
                Ok(None)
            }
        }
    }

    fn save(&self, cookies: &CookieStore, secret: &str) -> Result<()> {
        let file = Self::seal(cookies, secret)?;
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(&file)?;
        std::fs::write(&self.path, contents).context("Failed to write cookie vault")?;
        debug!(count = cookies.len(), path = %self.path.display(), "Cookie vault saved");
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        if self.path.exists() {
            std::fs::remove_file(&self.path).context("Failed to remove cookie vault")?;
        }
        Ok(())
    }
}

/// Process-local store, for tests and callers that do not persist.
/// Keeps the serialized form so a load goes through the same path as the vault.
#[derive(Default)]
pub struct MemorySessionStore {
    cookies: Mutex<Option<Vec<u8>>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemorySessionStore {
    fn load(&self, _secret: &str) -> Result<Option<CookieStore>> {
        let guard = self.cookies.lock().map_err(|_| anyhow!("Session store lock poisoned"))?;
        guard.as_deref().map(CookieStore::from_json).transpose()
    }

    fn save(&self, cookies: &CookieStore, _secret: &str) -> Result<()> {
        let mut guard = self.cookies.lock().map_err(|_| anyhow!("Session store lock poisoned"))?;
        *guard = Some(cookies.to_json()?);
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        let mut guard = self.cookies.lock().map_err(|_| anyhow!("Session store lock poisoned"))?;
        *guard = None;
        Ok(())
    }
}
