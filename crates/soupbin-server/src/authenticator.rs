//! In-memory username/password/session-name authenticator.
//!
//! A username-to-password map, and a username-to-allowed-session-names set.
//! A login is accepted only if the session name is registered for the user
//! *and* the password matches.

use std::collections::{HashMap, HashSet};

use soupbin_core::Authenticator;

/// Authenticator backed by two in-memory maps, built once at startup.
#[derive(Debug, Default)]
pub struct InMemoryAuthenticator {
    passwords: HashMap<String, String>,
    sessions: HashMap<String, HashSet<String>>,
}

impl InMemoryAuthenticator {
    /// An authenticator with no registered users.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `password` for `user`, overwriting any existing password.
    pub fn add_user(&mut self, user: impl Into<String>, password: impl Into<String>) {
        self.passwords.insert(user.into(), password.into());
    }

    /// Permit `user` to log into `session`.
    pub fn add_session(&mut self, user: impl Into<String>, session: impl Into<String>) {
        self.sessions.entry(user.into()).or_default().insert(session.into());
    }

    /// The seed data used by the protocol's documented test scenarios:
    /// user `user1` / password `password1`, permitted to log into
    /// `session1`.
    #[must_use]
    pub fn with_default_test_user() -> Self {
        let mut authenticator = Self::new();
        authenticator.add_user("user1", "password1");
        authenticator.add_session("user1", "session1");
        authenticator
    }
}

impl Authenticator for InMemoryAuthenticator {
    fn authenticate(&self, user: &str, password: &str, session_name: &str) -> bool {
        let allowed = self.sessions.get(user).is_some_and(|sessions| sessions.contains(session_name));
        allowed && self.passwords.get(user).is_some_and(|expected| expected == password)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_registered_user_password_and_session() {
        let auth = InMemoryAuthenticator::with_default_test_user();
        assert!(auth.authenticate("user1", "password1", "session1"));
    }

    #[test]
    fn rejects_wrong_password() {
        let auth = InMemoryAuthenticator::with_default_test_user();
        assert!(!auth.authenticate("user1", "wrong", "session1"));
    }

    #[test]
    fn rejects_unregistered_session_name() {
        let auth = InMemoryAuthenticator::with_default_test_user();
        assert!(!auth.authenticate("user1", "password1", "other-session"));
    }

    #[test]
    fn rejects_unknown_user() {
        let auth = InMemoryAuthenticator::with_default_test_user();
        assert!(!auth.authenticate("nobody", "password1", "session1"));
    }
}
