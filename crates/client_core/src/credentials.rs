//! Locally persisted tokens and the cached principal.

use std::{
    fs,
    path::{Path, PathBuf},
    sync::Mutex,
};

use serde::{Deserialize, Serialize};
use shared::domain::{Principal, PrincipalKind};

use crate::error::ClientError;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredCredentials {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admin_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub employee_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_data: Option<Principal>,
}

fn usable(token: &Option<String>) -> Option<&str> {
    token.as_deref().map(str::trim).filter(|t| !t.is_empty())
}

impl StoredCredentials {
    /// Admin token wins; otherwise the employee token, then the generic user
    /// token, select the employee portal.
    pub fn resolve(&self) -> Option<SessionContext> {
        if let Some(token) = usable(&self.admin_token) {
            return Some(SessionContext::new(PrincipalKind::Admin, token));
        }
        usable(&self.employee_token)
            .or_else(|| usable(&self.user_token))
            .map(|token| SessionContext::new(PrincipalKind::Employee, token))
    }
}

/// Explicit auth context handed to every request.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionContext {
    pub kind: PrincipalKind,
    token: String,
}

impl SessionContext {
    pub fn new(kind: PrincipalKind, token: impl Into<String>) -> Self {
        Self {
            kind,
            token: token.into(),
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }
}

impl std::fmt::Debug for SessionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionContext")
            .field("kind", &self.kind)
            .field("token", &"<redacted>")
            .finish()
    }
}

pub trait CredentialStore: Send + Sync {
    fn load(&self) -> Result<StoredCredentials, ClientError>;
    fn store(&self, credentials: &StoredCredentials) -> Result<(), ClientError>;
    fn clear(&self) -> Result<(), ClientError>;

    fn cache_principal(&self, principal: &Principal) -> Result<(), ClientError> {
        let mut credentials = self.load()?;
        credentials.user_data = Some(principal.clone());
        self.store(&credentials)
    }
}

/// JSON document on disk. A missing file reads as "no credentials".
pub struct FileCredentialStore {
    path: PathBuf,
}

impl FileCredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CredentialStore for FileCredentialStore {
    fn load(&self) -> Result<StoredCredentials, ClientError> {
        match fs::read_to_string(&self.path) {
            Ok(raw) if raw.trim().is_empty() => Ok(StoredCredentials::default()),
            Ok(raw) => Ok(serde_json::from_str(&raw)?),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                Ok(StoredCredentials::default())
            }
            Err(err) => Err(err.into()),
        }
    }

    fn store(&self, credentials: &StoredCredentials) -> Result<(), ClientError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, serde_json::to_vec_pretty(credentials)?)?;
        Ok(())
    }

    fn clear(&self) -> Result<(), ClientError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

#[derive(Default)]
pub struct MemoryCredentialStore {
    inner: Mutex<StoredCredentials>,
}

impl MemoryCredentialStore {
    pub fn new(credentials: StoredCredentials) -> Self {
        Self {
            inner: Mutex::new(credentials),
        }
    }

    pub fn snapshot(&self) -> StoredCredentials {
        self.inner
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn load(&self) -> Result<StoredCredentials, ClientError> {
        Ok(self.snapshot())
    }

    fn store(&self, credentials: &StoredCredentials) -> Result<(), ClientError> {
        if let Ok(mut guard) = self.inner.lock() {
            *guard = credentials.clone();
        }
        Ok(())
    }

    fn clear(&self) -> Result<(), ClientError> {
        self.store(&StoredCredentials::default())
    }
}

pub fn default_credentials_path() -> Option<PathBuf> {
    dirs::data_local_dir().map(|base| base.join("session_desk").join("credentials.json"))
}

#[cfg(test)]
mod tests {
    use std::time::{SystemTime, UNIX_EPOCH};

    use super::*;

    fn creds(admin: Option<&str>, employee: Option<&str>, user: Option<&str>) -> StoredCredentials {
        StoredCredentials {
            admin_token: admin.map(str::to_string),
            employee_token: employee.map(str::to_string),
            user_token: user.map(str::to_string),
            user_data: None,
        }
    }

    #[test]
    fn admin_token_takes_precedence() {
        let ctx = creds(Some("adm"), Some("emp"), None)
            .resolve()
            .expect("context");
        assert_eq!(ctx.kind, PrincipalKind::Admin);
        assert_eq!(ctx.token(), "adm");
    }

    #[test]
    fn user_token_selects_employee() {
        let ctx = creds(None, Some("  "), Some("usr"))
            .resolve()
            .expect("context");
        assert_eq!(ctx.kind, PrincipalKind::Employee);
        assert_eq!(ctx.token(), "usr");
    }

    #[test]
    fn no_usable_token_resolves_nothing() {
        assert!(creds(Some(""), None, Some(" ")).resolve().is_none());
    }

    #[test]
    fn debug_output_hides_token() {
        let ctx = SessionContext::new(PrincipalKind::Admin, "secret-token");
        assert!(!format!("{ctx:?}").contains("secret-token"));
    }

    #[test]
    fn file_store_round_trips_and_clears() {
        let suffix = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock")
            .as_nanos();
        let root = std::env::temp_dir().join(format!("session_desk_creds_{suffix}"));
        let store = FileCredentialStore::new(root.join("nested").join("credentials.json"));

        assert_eq!(store.load().expect("empty load"), StoredCredentials::default());
        store
            .store(&creds(None, Some("emp"), None))
            .expect("store");
        assert_eq!(
            store.load().expect("load").employee_token.as_deref(),
            Some("emp")
        );

        store.clear().expect("clear");
        assert!(!store.path().exists());
        store.clear().expect("clearing twice is fine");

        fs::remove_dir_all(root).expect("cleanup");
    }
}
