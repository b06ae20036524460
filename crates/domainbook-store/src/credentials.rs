//! Registered API users.
//!
//! Passwords are never stored. Each user keeps a random salt and an iterated
//! salted SHA-256 digest; the registry is a JSON file next to the table,
//! rewritten atomically under its own lock.

use crate::error::{Result, StoreError};
use crate::lock::TableLock;
use crate::paths;
use crate::table;
use domainbook_core::EmailAddress;
use getrandom::fill as fill_random;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

const HASH_ROUNDS: u32 = 10_000;
const SALT_BYTES: usize = 16;
const TOKEN_BYTES: usize = 32;

/// Registration and login for API users.
pub trait CredentialStore: Send + Sync {
    fn register(&self, email: &str, password: &str) -> Result<EmailAddress>;

    /// Fails `InvalidCredentials` for an unknown user or a wrong password
    /// alike.
    fn authenticate(&self, email: &str, password: &str) -> Result<EmailAddress>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct UserRecord {
    email: String,
    salt: String,
    password_hash: String,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct UsersFile {
    users: Vec<UserRecord>,
}

#[derive(Debug, Clone)]
pub struct FileCredentialStore {
    path: PathBuf,
    lock_path: PathBuf,
}

impl FileCredentialStore {
    pub fn new(path: PathBuf) -> Self {
        let lock_path = paths::lock_path_for(&path);
        Self { path, lock_path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<UsersFile> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(UsersFile::default()),
            Err(err) => return Err(err.into()),
        };
        serde_json::from_slice(&bytes).map_err(|source| StoreError::CorruptCredentials {
            path: self.path.clone(),
            source,
        })
    }

    fn persist(&self, users: &UsersFile) -> Result<()> {
        table::replace_atomically(&self.path, |file| {
            serde_json::to_writer_pretty(&mut *file, users).map_err(io::Error::from)?;
            Ok(())
        })
    }
}

impl CredentialStore for FileCredentialStore {
    fn register(&self, email: &str, password: &str) -> Result<EmailAddress> {
        let email = EmailAddress::parse(email)?;
        if password.is_empty() {
            return Err(StoreError::EmptyPassword);
        }

        let _guard = TableLock::acquire(&self.lock_path)?;
        let mut users = self.load()?;
        if users.users.iter().any(|user| user.email == email.as_str()) {
            return Err(StoreError::UserExists(email.into_string()));
        }

        let salt = random_hex(SALT_BYTES)?;
        let password_hash = hash_password(&salt, password);
        users.users.push(UserRecord {
            email: email.as_str().to_string(),
            salt,
            password_hash,
        });
        self.persist(&users)?;
        debug!(email = %email, users = users.users.len(), "user registered");
        Ok(email)
    }

    fn authenticate(&self, email: &str, password: &str) -> Result<EmailAddress> {
        let email = EmailAddress::parse(email).map_err(|_| StoreError::InvalidCredentials)?;
        let users = self.load()?;
        let Some(user) = users.users.iter().find(|user| user.email == email.as_str()) else {
            return Err(StoreError::InvalidCredentials);
        };
        let candidate = hash_password(&user.salt, password);
        if !constant_time_eq(candidate.as_bytes(), user.password_hash.as_bytes()) {
            return Err(StoreError::InvalidCredentials);
        }
        Ok(email)
    }
}

/// Byte comparison whose running time depends only on the lengths.
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// Fresh bearer token: 32 random bytes, hex encoded.
pub fn random_token() -> Result<String> {
    random_hex(TOKEN_BYTES)
}

/// Hex SHA-256 of `value`.
pub fn sha256_hex(value: &str) -> String {
    hex_encode(&Sha256::digest(value.as_bytes()))
}

fn hash_password(salt: &str, password: &str) -> String {
    let mut digest = Sha256::new()
        .chain_update(salt.as_bytes())
        .chain_update(password.as_bytes())
        .finalize();
    for _ in 1..HASH_ROUNDS {
        digest = Sha256::new()
            .chain_update(salt.as_bytes())
            .chain_update(digest)
            .finalize();
    }
    hex_encode(&digest)
}

fn random_hex(len: usize) -> Result<String> {
    let mut bytes = vec![0u8; len];
    fill_random(&mut bytes).map_err(|err| StoreError::Random(err.to_string()))?;
    Ok(hex_encode(&bytes))
}

fn hex_encode(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        out.push(nibble_hex(byte >> 4));
        out.push(nibble_hex(byte & 0x0f));
    }
    out
}

fn nibble_hex(nibble: u8) -> char {
    match nibble {
        0..=9 => char::from(b'0' + nibble),
        _ => char::from(b'a' + (nibble - 10)),
    }
}
