//! # Directory Adapter
//!
//! Read-only identity resolution. The engine uses it to turn a member code
//! into an account, to check the member's contact completeness before a
//! request, and to fetch display names for labels and listings. No other
//! account field is read.

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use famlink_core::{AccountCode, AccountId};

/// Full profile returned by a code lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountProfile {
    pub id: AccountId,
    pub code: AccountCode,
    pub display_name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    /// Dialling prefix that goes with `phone` (e.g. `+44`).
    #[serde(default)]
    pub country_code: Option<String>,
}

impl AccountProfile {
    /// Contact fields that are absent or blank, in a stable order.
    pub fn missing_contact_fields(&self) -> Vec<&'static str> {
        let blank = |v: &Option<String>| v.as_deref().map_or(true, |s| s.trim().is_empty());
        let mut missing = Vec::new();
        if blank(&self.email) {
            missing.push("email");
        }
        if blank(&self.phone) {
            missing.push("phone");
        }
        if blank(&self.country_code) {
            missing.push("country_code");
        }
        missing
    }

    pub fn summary(&self) -> AccountSummary {
        AccountSummary {
            id: self.id.clone(),
            code: self.code.clone(),
            display_name: self.display_name.clone(),
        }
    }
}

/// Identity returned by an id lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountSummary {
    pub id: AccountId,
    pub code: AccountCode,
    pub display_name: String,
}

/// Errors from directory lookups.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DirectoryError {
    /// No account matches the code or id.
    #[error("account not found: {0}")]
    NotFound(String),

    /// The directory could not be reached.
    #[error("directory unavailable: {reason}")]
    Unavailable {
        /// Human-readable reason for the failure.
        reason: String,
    },

    /// A seed file could not be read or parsed.
    #[error("invalid directory seed: {0}")]
    Seed(String),

    /// The code already belongs to a different account.
    #[error("account code {code} is already assigned to {owner}")]
    CodeTaken { code: AccountCode, owner: AccountId },
}

/// Identity resolution used by the linkage engine.
///
/// Implementations must be `Send + Sync` so they can be shared across
/// request handlers behind an `Arc`.
pub trait DirectoryAdapter: Send + Sync {
    /// Resolve an account by its shareable code.
    fn resolve_by_code(&self, code: &AccountCode) -> Result<AccountProfile, DirectoryError>;

    /// Resolve an account by its id.
    fn resolve_by_id(&self, id: &AccountId) -> Result<AccountSummary, DirectoryError>;

    /// Human-readable name of this adapter implementation.
    fn adapter_name(&self) -> &str;
}

// ─── In-memory directory ─────────────────────────────────────────────

#[derive(Debug, Default)]
struct Accounts {
    by_id: HashMap<AccountId, AccountProfile>,
    code_to_id: HashMap<AccountCode, AccountId>,
}

#[derive(Debug, Deserialize)]
struct SeedFile {
    #[serde(default)]
    accounts: Vec<AccountProfile>,
}

/// Directory backed by a process-local map.
///
/// Used for local development (seeded from a YAML file) and tests. Can be
/// switched into an outage mode where every lookup fails with
/// [`DirectoryError::Unavailable`].
#[derive(Debug, Clone, Default)]
pub struct InMemoryDirectory {
    accounts: Arc<RwLock<Accounts>>,
    outage: Arc<AtomicBool>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a directory from a list of profiles.
    pub fn with_accounts(
        profiles: impl IntoIterator<Item = AccountProfile>,
    ) -> Result<Self, DirectoryError> {
        let dir = Self::new();
        for profile in profiles {
            dir.insert(profile)?;
        }
        Ok(dir)
    }

    /// Parse a YAML seed document of the form `accounts: [ {id, code, ...} ]`.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, DirectoryError> {
        let seed: SeedFile =
            serde_yaml::from_str(yaml).map_err(|e| DirectoryError::Seed(e.to_string()))?;
        Self::with_accounts(seed.accounts).map_err(|e| DirectoryError::Seed(e.to_string()))
    }

    /// Load a YAML seed file.
    pub fn load_file(path: &Path) -> Result<Self, DirectoryError> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| DirectoryError::Seed(format!("{}: {e}", path.display())))?;
        let dir = Self::from_yaml_str(&raw)?;
        tracing::info!(path = %path.display(), accounts = dir.len(), "loaded directory seed");
        Ok(dir)
    }

    /// Add or replace an account.
    ///
    /// Refused with [`DirectoryError::CodeTaken`] if another account holds
    /// the profile's code.
    pub fn insert(&self, profile: AccountProfile) -> Result<(), DirectoryError> {
        let mut accounts = self.accounts.write();
        if let Some(owner) = accounts.code_to_id.get(&profile.code) {
            if owner != &profile.id {
                return Err(DirectoryError::CodeTaken {
                    code: profile.code.clone(),
                    owner: owner.clone(),
                });
            }
        }
        if let Some(previous) = accounts.by_id.get(&profile.id) {
            let old_code = previous.code.clone();
            accounts.code_to_id.remove(&old_code);
        }
        accounts
            .code_to_id
            .insert(profile.code.clone(), profile.id.clone());
        accounts.by_id.insert(profile.id.clone(), profile);
        Ok(())
    }

    /// Number of accounts.
    pub fn len(&self) -> usize {
        self.accounts.read().by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Simulate the directory being unreachable.
    pub fn set_outage(&self, down: bool) {
        self.outage.store(down, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<(), DirectoryError> {
        if self.outage.load(Ordering::SeqCst) {
            return Err(DirectoryError::Unavailable {
                reason: "in-memory directory is in outage mode".to_string(),
            });
        }
        Ok(())
    }
}

impl DirectoryAdapter for InMemoryDirectory {
    fn resolve_by_code(&self, code: &AccountCode) -> Result<AccountProfile, DirectoryError> {
        self.check_available()?;
        let accounts = self.accounts.read();
        accounts
            .code_to_id
            .get(code)
            .and_then(|id| accounts.by_id.get(id))
            .cloned()
            .ok_or_else(|| DirectoryError::NotFound(format!("code {code}")))
    }

    fn resolve_by_id(&self, id: &AccountId) -> Result<AccountSummary, DirectoryError> {
        self.check_available()?;
        self.accounts
            .read()
            .by_id
            .get(id)
            .map(AccountProfile::summary)
            .ok_or_else(|| DirectoryError::NotFound(format!("id {id}")))
    }

    fn adapter_name(&self) -> &str {
        "InMemoryDirectory"
    }
}
