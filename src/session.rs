//! Session identity persisted as a small cookie jar on disk.
//!
//! Three entries are kept, `userEmail`, `userRole` and `userName`, each with
//! its own 30-day expiry. Nothing is cached in memory: every getter reads the
//! jar again, so a screen always sees what is currently on disk.

use crate::error::SessionError;
use crate::models::Role;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use tracing::{info, warn};

pub const EMAIL_COOKIE: &str = "userEmail";
pub const ROLE_COOKIE: &str = "userRole";
pub const NAME_COOKIE: &str = "userName";

pub const COOKIE_TTL_DAYS: i64 = 30;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Cookie {
    pub value: String,
    pub path: String,
    pub same_site: String,
    pub expires: DateTime<Utc>,
}

impl Cookie {
    fn new(value: &str, now: DateTime<Utc>) -> Cookie {
        Cookie {
            value: value.to_string(),
            path: "/".to_string(),
            same_site: "Lax".to_string(),
            expires: now + Duration::days(COOKIE_TTL_DAYS),
        }
    }

    fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.expires > now
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct Jar {
    #[serde(default)]
    cookies: BTreeMap<String, Cookie>,
}

#[derive(Clone, Debug)]
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn new(path: impl Into<PathBuf>) -> SessionStore {
        SessionStore { path: path.into() }
    }

    /// Writes all three identity fields. A missing name is removed.
    pub fn set_identity(
        &self,
        email: &str,
        role: Role,
        name: Option<&str>,
    ) -> Result<(), SessionError> {
        let now = Utc::now();
        let mut jar = self.read_jar()?;
        jar.cookies
            .insert(EMAIL_COOKIE.to_string(), Cookie::new(email, now));
        jar.cookies
            .insert(ROLE_COOKIE.to_string(), Cookie::new(role.as_str(), now));
        match name {
            Some(name) => {
                jar.cookies
                    .insert(NAME_COOKIE.to_string(), Cookie::new(name, now));
            }
            None => {
                jar.cookies.remove(NAME_COOKIE);
            }
        }
        self.write_jar(&jar)?;
        info!(email, role = %role, "session identity stored");
        Ok(())
    }

    pub fn set_role(&self, role: Role) -> Result<(), SessionError> {
        self.set(ROLE_COOKIE, role.as_str())
    }

    pub fn set_name(&self, name: &str) -> Result<(), SessionError> {
        self.set(NAME_COOKIE, name)
    }

    pub fn email(&self) -> Option<String> {
        self.get(EMAIL_COOKIE)
    }

    pub fn role(&self) -> Option<Role> {
        self.get(ROLE_COOKIE).and_then(|role| Role::parse(&role))
    }

    pub fn name(&self) -> Option<String> {
        self.get(NAME_COOKIE)
    }

    pub fn is_authenticated(&self) -> bool {
        self.email().is_some()
    }

    pub fn is_admin(&self) -> bool {
        self.role() == Some(Role::Admin)
    }

    /// Drops all three fields at once. The caller navigates to login.
    pub fn clear(&self) -> Result<(), SessionError> {
        let mut jar = self.read_jar()?;
        for name in [EMAIL_COOKIE, ROLE_COOKIE, NAME_COOKIE] {
            jar.cookies.remove(name);
        }
        self.write_jar(&jar)?;
        info!("session cleared");
        Ok(())
    }

    fn set(&self, name: &str, value: &str) -> Result<(), SessionError> {
        let mut jar = self.read_jar()?;
        jar.cookies
            .insert(name.to_string(), Cookie::new(value, Utc::now()));
        self.write_jar(&jar)
    }

    fn get(&self, name: &str) -> Option<String> {
        let jar = match self.read_jar() {
            Ok(jar) => jar,
            Err(err) => {
                warn!(error = %err, "ignoring unreadable session file");
                return None;
            }
        };
        jar.cookies
            .get(name)
            .filter(|cookie| cookie.is_live(Utc::now()))
            .map(|cookie| cookie.value.clone())
    }

    fn read_jar(&self) -> Result<Jar, SessionError> {
        match fs::read_to_string(&self.path) {
            Ok(raw) => Ok(toml::from_str(&raw)?),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Jar::default()),
            Err(source) => Err(SessionError::Io {
                path: self.path.clone(),
                source,
            }),
        }
    }

    fn write_jar(&self, jar: &Jar) -> Result<(), SessionError> {
        let io_err = |source| SessionError::Io {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        let raw = toml::to_string(jar)?;
        fs::write(&self.path, raw).map_err(io_err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store() -> (TempDir, SessionStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path().join("session.toml"));
        (dir, store)
    }

    #[test]
    fn test_missing_file_reads_as_signed_out() {
        let (_dir, store) = store();
        assert_eq!(store.email(), None);
        assert_eq!(store.role(), None);
        assert!(!store.is_authenticated());
        assert!(!store.is_admin());
    }

    #[test]
    fn test_identity_round_trip() {
        let (_dir, store) = store();
        store
            .set_identity("ada@example.com", Role::Admin, Some("Ada"))
            .unwrap();
        assert_eq!(store.email().as_deref(), Some("ada@example.com"));
        assert_eq!(store.name().as_deref(), Some("Ada"));
        assert!(store.is_authenticated());
        assert!(store.is_admin());
    }

    #[test]
    fn test_authentication_ignores_role_and_name() {
        let (_dir, store) = store();
        store.set_identity("bo@example.com", Role::User, None).unwrap();
        assert!(store.is_authenticated());
        assert!(!store.is_admin());
        assert_eq!(store.name(), None);
    }

    #[test]
    fn test_clear_removes_every_field() {
        let (_dir, store) = store();
        store
            .set_identity("ada@example.com", Role::Admin, Some("Ada"))
            .unwrap();
        store.clear().unwrap();
        assert!(!store.is_authenticated());
        assert_eq!(store.role(), None);
        assert_eq!(store.name(), None);
    }

    #[test]
    fn test_cookie_attributes() {
        let (_dir, store) = store();
        store.set_identity("ada@example.com", Role::User, None).unwrap();
        let jar = store.read_jar().unwrap();
        let cookie = &jar.cookies[EMAIL_COOKIE];
        assert_eq!(cookie.path, "/");
        assert_eq!(cookie.same_site, "Lax");
        let ttl = cookie.expires - Utc::now();
        assert!(ttl > Duration::days(29) && ttl <= Duration::days(30));
    }

    #[test]
    fn test_expired_cookie_reads_as_absent() {
        let (_dir, store) = store();
        let mut jar = Jar::default();
        let mut cookie = Cookie::new("old@example.com", Utc::now());
        cookie.expires = Utc::now() - Duration::days(1);
        jar.cookies.insert(EMAIL_COOKIE.to_string(), cookie);
        store.write_jar(&jar).unwrap();
        assert!(!store.is_authenticated());
    }

    #[test]
    fn test_role_overwrite_keeps_email() {
        let (_dir, store) = store();
        store.set_identity("ada@example.com", Role::User, None).unwrap();
        store.set_role(Role::Admin).unwrap();
        store.set_name("Ada L").unwrap();
        assert!(store.is_admin());
        assert_eq!(store.email().as_deref(), Some("ada@example.com"));
        assert_eq!(store.name().as_deref(), Some("Ada L"));
    }

    #[test]
    fn test_garbage_file_reads_as_absent() {
        let (dir, store) = store();
        fs::write(dir.path().join("session.toml"), "not = [valid").unwrap();
        assert_eq!(store.email(), None);
    }
}
