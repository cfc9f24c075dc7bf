//! Environment-derived defaults.

use nix::unistd::{Uid, User};

use crate::error::{ConfigError, ConfigResult};

/// Name of the invoking user: `USER` when set, otherwise the passwd entry of
/// the current uid.
///
/// # Errors
///
/// Returns [`ConfigError::UnknownUser`] when neither source yields a name.
pub fn current_user() -> ConfigResult<String> {
    resolve_user(std::env::var("USER").ok(), passwd_user)
}

fn passwd_user() -> Option<String> {
    User::from_uid(Uid::current())
        .ok()
        .flatten()
        .map(|user| user.name)
}

fn resolve_user(
    env_user: Option<String>,
    fallback: impl FnOnce() -> Option<String>,
) -> ConfigResult<String> {
    env_user
        .filter(|name| !name.is_empty())
        .or_else(fallback)
        .ok_or(ConfigError::UnknownUser)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_value_wins() {
        let user = resolve_user(Some("alice".into()), || Some("bob".into())).expect("user");
        assert_eq!(user, "alice");
    }

    #[test]
    fn empty_env_falls_back() {
        let user = resolve_user(Some(String::new()), || Some("bob".into())).expect("user");
        assert_eq!(user, "bob");
    }

    #[test]
    fn missing_everywhere_is_an_error() {
        assert!(matches!(
            resolve_user(None, || None),
            Err(ConfigError::UnknownUser)
        ));
    }
}
