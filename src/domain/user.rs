// User account domain model
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// One account in the file-backed store. The password never leaves the store
/// unhashed; `password_hash` is SHA-256 hex.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserAccount {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    #[serde(default)]
    pub is_admin: bool,
}

impl UserAccount {
    pub fn new(username: &str, email: &str, password: &str, is_admin: bool) -> Self {
        Self {
            username: username.to_string(),
            email: email.to_string(),
            password_hash: hash_password(password),
            is_admin,
        }
    }

    pub fn check_password(&self, password: &str) -> bool {
        self.password_hash == hash_password(password)
    }
}

pub fn hash_password(password: &str) -> String {
    let digest = Sha256::digest(password.as_bytes());
    hex::encode(digest)
}
