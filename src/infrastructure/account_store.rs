// JSON file account store
use crate::application::account_service::AccountStore;
use crate::domain::user::UserAccount;
use anyhow::Context;
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

/// Whole-file JSON persistence keyed by account id. First load with no file
/// present seeds the bootstrap admin accounts, so there is no separate
/// hard-coded login path anywhere.
pub struct JsonAccountStore {
    path: PathBuf,
}

impl JsonAccountStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn seed() -> BTreeMap<String, UserAccount> {
        BTreeMap::from([
            (
                "1".to_string(),
                UserAccount::new("admin", "admin@example.com", "admin123", true),
            ),
            (
                "2".to_string(),
                UserAccount::new("ddt", "ddt@ddt.com.br", "Tiburcio50", true),
            ),
        ])
    }
}

impl AccountStore for JsonAccountStore {
    fn load(&self) -> anyhow::Result<BTreeMap<String, UserAccount>> {
        if !self.path.exists() {
            let seeded = Self::seed();
            self.save(&seeded)?;
            return Ok(seeded);
        }
        let data = fs::read_to_string(&self.path)
            .with_context(|| format!("failed to read {}", self.path.display()))?;
        serde_json::from_str(&data)
            .with_context(|| format!("invalid account store at {}", self.path.display()))
    }

    fn save(&self, accounts: &BTreeMap<String, UserAccount>) -> anyhow::Result<()> {
        let data = serde_json::to_string_pretty(accounts)?;
        fs::write(&self.path, data)
            .with_context(|| format!("failed to write {}", self.path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_first_load_seeds_admins() {
        let dir = TempDir::new().unwrap();
        let store = JsonAccountStore::new(dir.path().join("users.json"));

        let accounts = store.load().unwrap();
        assert_eq!(accounts.len(), 2);
        assert!(accounts["1"].is_admin);
        assert!(accounts["2"].check_password("Tiburcio50"));
        assert!(dir.path().join("users.json").exists());
    }

    #[test]
    fn test_round_trip() {
        let dir = TempDir::new().unwrap();
        let store = JsonAccountStore::new(dir.path().join("users.json"));

        let mut accounts = store.load().unwrap();
        accounts.insert(
            "3".to_string(),
            UserAccount::new("ana", "ana@example.com", "pw", false),
        );
        store.save(&accounts).unwrap();

        let reloaded = store.load().unwrap();
        assert_eq!(reloaded, accounts);
    }

    #[test]
    fn test_invalid_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("users.json");
        fs::write(&path, "{ not json").unwrap();
        assert!(JsonAccountStore::new(path).load().is_err());
    }
}
