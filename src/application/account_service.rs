// Account service - Single source of truth for credentials
use crate::domain::user::UserAccount;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Whole-file account persistence. The map is keyed by account id; every
/// mutation rewrites the file. Single-writer only; concurrent writers are out
/// of scope and would lose updates.
pub trait AccountStore: Send + Sync {
    fn load(&self) -> anyhow::Result<BTreeMap<String, UserAccount>>;
    fn save(&self, accounts: &BTreeMap<String, UserAccount>) -> anyhow::Result<()>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct AuthenticatedUser {
    pub id: String,
    pub username: String,
    pub is_admin: bool,
}

#[derive(Clone)]
pub struct AccountService {
    store: Arc<dyn AccountStore>,
}

impl AccountService {
    pub fn new(store: Arc<dyn AccountStore>) -> Self {
        Self { store }
    }

    /// Check credentials against the store. There is no hard-coded login
    /// path; bootstrap admins are seeded records like any other.
    pub fn authenticate(&self, email: &str, password: &str) -> anyhow::Result<Option<AuthenticatedUser>> {
        let accounts = self.store.load()?;
        for (id, account) in &accounts {
            if account.email == email && account.check_password(password) {
                return Ok(Some(AuthenticatedUser {
                    id: id.clone(),
                    username: account.username.clone(),
                    is_admin: account.is_admin,
                }));
            }
        }
        Ok(None)
    }

    pub fn list(&self) -> anyhow::Result<BTreeMap<String, UserAccount>> {
        self.store.load()
    }

    /// Add an account; rejects duplicate usernames or emails. Returns the new
    /// account id.
    pub fn add(
        &self,
        username: &str,
        email: &str,
        password: &str,
        is_admin: bool,
    ) -> anyhow::Result<Option<String>> {
        let mut accounts = self.store.load()?;
        let taken = accounts
            .values()
            .any(|a| a.username == username || a.email == email);
        if taken {
            return Ok(None);
        }
        let id = next_id(&accounts);
        accounts.insert(id.clone(), UserAccount::new(username, email, password, is_admin));
        self.store.save(&accounts)?;
        Ok(Some(id))
    }

    /// Partial update; `None` fields keep their current value. Returns false
    /// when the id is unknown or a new username/email collides.
    pub fn edit(
        &self,
        id: &str,
        username: Option<&str>,
        email: Option<&str>,
        password: Option<&str>,
        is_admin: Option<bool>,
    ) -> anyhow::Result<bool> {
        let mut accounts = self.store.load()?;
        let collides = accounts.iter().any(|(other_id, a)| {
            other_id != id
                && (username.is_some_and(|u| a.username == u)
                    || email.is_some_and(|e| a.email == e))
        });
        if collides {
            return Ok(false);
        }

        let Some(account) = accounts.get_mut(id) else {
            return Ok(false);
        };
        if let Some(username) = username {
            account.username = username.to_string();
        }
        if let Some(email) = email {
            account.email = email.to_string();
        }
        if let Some(password) = password {
            account.password_hash = crate::domain::user::hash_password(password);
        }
        if let Some(is_admin) = is_admin {
            account.is_admin = is_admin;
        }
        self.store.save(&accounts)?;
        Ok(true)
    }

    pub fn remove(&self, id: &str) -> anyhow::Result<bool> {
        let mut accounts = self.store.load()?;
        if accounts.remove(id).is_none() {
            return Ok(false);
        }
        self.store.save(&accounts)?;
        Ok(true)
    }
}

fn next_id(accounts: &BTreeMap<String, UserAccount>) -> String {
    let max = accounts
        .keys()
        .filter_map(|k| k.parse::<u64>().ok())
        .max()
        .unwrap_or(0);
    (max + 1).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// In-memory store; persistence itself is covered by the JSON store tests.
    #[derive(Default)]
    struct MemoryStore {
        accounts: Mutex<BTreeMap<String, UserAccount>>,
    }

    impl AccountStore for MemoryStore {
        fn load(&self) -> anyhow::Result<BTreeMap<String, UserAccount>> {
            Ok(self.accounts.lock().unwrap().clone())
        }

        fn save(&self, accounts: &BTreeMap<String, UserAccount>) -> anyhow::Result<()> {
            *self.accounts.lock().unwrap() = accounts.clone();
            Ok(())
        }
    }

    fn service() -> AccountService {
        AccountService::new(Arc::new(MemoryStore::default()))
    }

    #[test]
    fn test_add_then_authenticate() {
        let service = service();
        let id = service
            .add("ana", "ana@example.com", "s3cret", true)
            .unwrap()
            .unwrap();
        assert_eq!(id, "1");

        let user = service
            .authenticate("ana@example.com", "s3cret")
            .unwrap()
            .unwrap();
        assert_eq!(user.username, "ana");
        assert!(user.is_admin);

        assert!(service
            .authenticate("ana@example.com", "wrong")
            .unwrap()
            .is_none());
        assert!(service
            .authenticate("nobody@example.com", "s3cret")
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_add_rejects_duplicates() {
        let service = service();
        service.add("ana", "ana@example.com", "x", false).unwrap();
        assert!(service.add("ana", "other@example.com", "x", false).unwrap().is_none());
        assert!(service.add("other", "ana@example.com", "x", false).unwrap().is_none());
    }

    #[test]
    fn test_ids_are_monotonic() {
        let service = service();
        assert_eq!(service.add("a", "a@x", "p", false).unwrap().unwrap(), "1");
        assert_eq!(service.add("b", "b@x", "p", false).unwrap().unwrap(), "2");
        service.remove("1").unwrap();
        assert_eq!(service.add("c", "c@x", "p", false).unwrap().unwrap(), "3");
    }

    #[test]
    fn test_edit_partial_update() {
        let service = service();
        let id = service.add("ana", "ana@x", "old", false).unwrap().unwrap();

        assert!(service
            .edit(&id, None, None, Some("new"), Some(true))
            .unwrap());
        let user = service.authenticate("ana@x", "new").unwrap().unwrap();
        assert!(user.is_admin);
        assert!(service.authenticate("ana@x", "old").unwrap().is_none());

        assert!(!service.edit("99", Some("x"), None, None, None).unwrap());
    }

    #[test]
    fn test_edit_rejects_collision() {
        let service = service();
        service.add("ana", "ana@x", "p", false).unwrap();
        let id = service.add("bob", "bob@x", "p", false).unwrap().unwrap();
        assert!(!service.edit(&id, Some("ana"), None, None, None).unwrap());
        assert!(!service.edit(&id, None, Some("ana@x"), None, None).unwrap());
    }

    #[test]
    fn test_remove() {
        let service = service();
        let id = service.add("ana", "ana@x", "p", false).unwrap().unwrap();
        assert!(service.remove(&id).unwrap());
        assert!(!service.remove(&id).unwrap());
        assert!(service.authenticate("ana@x", "p").unwrap().is_none());
    }
}
