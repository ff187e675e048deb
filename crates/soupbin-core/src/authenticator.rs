//! Authenticator contract.

/// Validates `(username, password, session-name)` triples.
///
/// Constructed once at process startup and shared read-only across every
/// server session thereafter; implementations need not be internally
/// mutable once sessions start running.
pub trait Authenticator: Send + Sync + 'static {
    /// Returns `true` iff `session_name` is registered for `user` and the
    /// recorded password equals `password`. Exact-match, case-sensitive.
    fn authenticate(&self, user: &str, password: &str, session_name: &str) -> bool;
}
