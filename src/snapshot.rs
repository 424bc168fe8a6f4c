//! JSON snapshot of accounts and catalog, loaded at startup and saved on exit.
//!
//! Layout:
//! ```json
//! {
//!   "users": [{"username": "...", "password": "...", "role": "kasir"}],
//!   "menus": [{"name": "...", "price": 3, "stock": 30, "total_sales": 0}],
//!   "daily_sales": {"2026-10-19": {"units": 4, "revenue": 40}}
//! }
//! ```
//! `daily_sales` is optional and omitted when empty.

use crate::accounts::{AccountStore, User};
use crate::catalog::{Catalog, DailyTally, MenuItem};
use crate::error::{PosError, PosResult};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Snapshot {
    #[serde(default)]
    pub users: Vec<User>,
    #[serde(default)]
    pub menus: Vec<MenuItem>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub daily_sales: BTreeMap<NaiveDate, DailyTally>,
}

/// How the snapshot was obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadSource {
    File,
    /// No file yet; first run
    Defaults,
    /// File exists but could not be read
    DefaultsUnreadable,
}

impl Snapshot {
    pub fn with_defaults() -> Self {
        Self::from_stores(&AccountStore::with_defaults(), &Catalog::with_defaults())
    }

    pub fn from_stores(accounts: &AccountStore, catalog: &Catalog) -> Self {
        Self {
            users: accounts.users().to_vec(),
            menus: catalog.items().to_vec(),
            daily_sales: catalog.daily().clone(),
        }
    }

    pub fn into_stores(self) -> (AccountStore, Catalog) {
        (
            AccountStore::new(self.users),
            Catalog::with_daily(self.menus, self.daily_sales),
        )
    }

    /// Load from `path`. A missing or unreadable file yields the defaults;
    /// a file that is present but malformed (bad JSON, wrong field types,
    /// invalid UTF-8) is a `CorruptSnapshot`.
    pub fn load(path: &Path) -> PosResult<(Self, LoadSource)> {
        let content = match std::fs::read(path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Ok((Self::with_defaults(), LoadSource::Defaults));
            }
            Err(e) => {
                eprintln!(
                    "Warning: cannot read {} ({}), starting from defaults",
                    path.display(),
                    e
                );
                return Ok((Self::with_defaults(), LoadSource::DefaultsUnreadable));
            }
        };

        let snapshot = Self::parse(&content).map_err(|source| PosError::CorruptSnapshot {
            path: path.to_path_buf(),
            source,
        })?;
        Ok((snapshot, LoadSource::File))
    }

    pub fn parse(content: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(content)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Overwrite `path` with this snapshot. Writes a sibling temp file first,
    /// then renames it into place.
    pub fn save(&self, path: &Path) -> PosResult<()> {
        let fail = |source: std::io::Error| PosError::PersistenceFailure {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(fail)?;
        }

        let mut tmp_name = path.as_os_str().to_owned();
        tmp_name.push(".tmp");
        let tmp_path = PathBuf::from(tmp_name);

        let json = self.to_json().map_err(|e| fail(e.into()))?;
        let write = || -> std::io::Result<()> {
            let mut file = std::fs::File::create(&tmp_path)?;
            file.write_all(json.as_bytes())?;
            file.write_all(b"\n")?;
            file.sync_all()?;
            std::fs::rename(&tmp_path, path)
        };

        write().map_err(|e| {
            let _ = std::fs::remove_file(&tmp_path);
            fail(e)
        })
    }
}

/// Where a session loaded from `path` may save.
///
/// A file that exists but could not be read is never overwritten; changes go
/// to a `.recovered` sibling instead.
pub fn save_target(path: &Path, source: LoadSource) -> PathBuf {
    match source {
        LoadSource::DefaultsUnreadable => {
            let mut name = path.as_os_str().to_owned();
            name.push(".recovered");
            PathBuf::from(name)
        }
        LoadSource::File | LoadSource::Defaults => path.to_path_buf(),
    }
}
