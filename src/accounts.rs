//! Account store: operator accounts and credential checks.
//!
//! Credentials are stored either as legacy plaintext (as found in older
//! snapshots) or as `sha256$<salt>$<hex digest>`. Both verify through
//! [`AccountStore::authenticate`]; passwords set from this program are
//! always hashed.

use crate::error::{PosError, PosResult};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

const HASH_PREFIX: &str = "sha256$";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub enum Role {
    #[serde(rename = "kasir", alias = "cashier")]
    Cashier,
    #[serde(rename = "manager")]
    Manager,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cashier => "cashier",
            Self::Manager => "manager",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct User {
    pub username: String,
    pub password: String,
    pub role: Role,
}

impl User {
    pub fn new(username: &str, password: &str, role: Role) -> Self {
        Self {
            username: username.to_string(),
            password: password.to_string(),
            role,
        }
    }

    /// Check a candidate password against the stored credential
    pub fn verify(&self, candidate: &str) -> bool {
        match self.password.strip_prefix(HASH_PREFIX) {
            Some(rest) => match rest.split_once('$') {
                Some((salt, digest)) => salted_digest(salt, candidate) == digest,
                None => false,
            },
            None => self.password == candidate,
        }
    }

    pub fn is_hashed(&self) -> bool {
        self.password.starts_with(HASH_PREFIX)
    }
}

/// Encode a password with a fresh random salt
pub fn hash_password(password: &str) -> String {
    let salt = uuid::Uuid::new_v4().simple().to_string();
    format!("{}{}${}", HASH_PREFIX, salt, salted_digest(&salt, password))
}

fn salted_digest(salt: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccountStore {
    users: Vec<User>,
}

impl AccountStore {
    pub fn new(users: Vec<User>) -> Self {
        Self { users }
    }

    /// First-run accounts
    pub fn with_defaults() -> Self {
        Self::new(vec![
            User::new("kasir", "kasir123", Role::Cashier),
            User::new("manager", "manager123", Role::Manager),
        ])
    }

    pub fn users(&self) -> &[User] {
        &self.users
    }

    /// First account matching both username and password wins
    pub fn authenticate(&self, username: &str, password: &str) -> PosResult<&User> {
        self.users
            .iter()
            .find(|u| u.username == username && u.verify(password))
            .ok_or(PosError::AuthFailed)
    }

    /// Replace a user's credential with a salted hash
    pub fn set_password(&mut self, username: &str, new_password: &str) -> PosResult<()> {
        if new_password.is_empty() {
            return Err(PosError::InvalidCredential);
        }
        let user = self
            .users
            .iter_mut()
            .find(|u| u.username == username)
            .ok_or_else(|| PosError::NotFound(username.to_string()))?;
        user.password = hash_password(new_password);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_authenticate_defaults() {
        let store = AccountStore::with_defaults();
        let user = store.authenticate("kasir", "kasir123").unwrap();
        assert_eq!(user.role, Role::Cashier);
        let user = store.authenticate("manager", "manager123").unwrap();
        assert_eq!(user.role, Role::Manager);
    }

    #[test]
    fn test_wrong_password_fails() {
        let store = AccountStore::with_defaults();
        assert!(matches!(
            store.authenticate("kasir", "manager123"),
            Err(PosError::AuthFailed)
        ));
        assert!(matches!(
            store.authenticate("nobody", "kasir123"),
            Err(PosError::AuthFailed)
        ));
        assert!(matches!(
            store.authenticate("kasir", ""),
            Err(PosError::AuthFailed)
        ));
    }

    #[test]
    fn test_first_match_wins() {
        let store = AccountStore::new(vec![
            User::new("dup", "pw", Role::Cashier),
            User::new("dup", "pw", Role::Manager),
        ]);
        assert_eq!(store.authenticate("dup", "pw").unwrap().role, Role::Cashier);
    }

    #[test]
    fn test_hashed_password() {
        let hashed = hash_password("secret");
        assert!(hashed.starts_with("sha256$"));
        assert_ne!(hashed, hash_password("secret"));

        let user = User::new("a", &hashed, Role::Manager);
        assert!(user.is_hashed());
        assert!(user.verify("secret"));
        assert!(!user.verify("Secret"));
        assert!(!user.verify(&hashed));
    }

    #[test]
    fn test_malformed_hash_never_verifies() {
        let user = User::new("a", "sha256$nodigest", Role::Cashier);
        assert!(!user.verify("sha256$nodigest"));
        assert!(!user.verify("nodigest"));
    }

    #[test]
    fn test_set_password() {
        let mut store = AccountStore::with_defaults();
        store.set_password("kasir", "new-pass").unwrap();
        assert!(store.authenticate("kasir", "kasir123").is_err());
        assert!(store.authenticate("kasir", "new-pass").is_ok());
        assert!(store.users()[0].is_hashed());

        assert!(matches!(
            store.set_password("kasir", ""),
            Err(PosError::InvalidCredential)
        ));
        assert!(matches!(
            store.set_password("ghost", "x"),
            Err(PosError::NotFound(_))
        ));
    }

    #[test]
    fn test_role_wire_names() {
        let user: User =
            serde_json::from_str(r#"{"username":"a","password":"b","role":"cashier"}"#).unwrap();
        assert_eq!(user.role, Role::Cashier);
        let json = serde_json::to_string(&user).unwrap();
        assert!(json.contains(r#""role":"kasir""#));
    }
}
