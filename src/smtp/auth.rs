//! Credential checks for `AUTH`.
//!
//! The default accepts anything, which is only suitable for a test sink. A
//! real deployment swaps in its own [`Authenticator`]; the session flow does
//! not change.

pub trait Authenticator: Send + Sync {
    fn verify(&self, username: &str, password: &str) -> bool;
}

/// Accepts every credential pair.
#[derive(Debug, Default, Clone, Copy)]
pub struct AcceptAll;

impl Authenticator for AcceptAll {
    fn verify(&self, _username: &str, _password: &str) -> bool {
        true
    }
}
