use crate::auth::LocalState;
use crate::error::MentorError;
use crate::users::UserProfile;

/// Identity of whoever is using the app right now.
///
/// Set on login, cleared on logout; services only ever borrow it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AuthContext {
    user: Option<UserProfile>,
}

impl AuthContext {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn signed_in(profile: UserProfile) -> Self {
        Self {
            user: Some(profile),
        }
    }

    /// Picks up the snapshot left by a previous run.
    pub fn restore(state: &LocalState) -> Self {
        Self {
            user: state.current_user.clone(),
        }
    }

    pub fn login(&mut self, profile: UserProfile) {
        tracing::info!("Signed in as {}", profile.username);
        self.user = Some(profile);
    }

    pub fn logout(&mut self) {
        if let Some(user) = self.user.take() {
            tracing::info!("Signed out {}", user.username);
        }
    }

    pub fn current(&self) -> Option<&UserProfile> {
        self.user.as_ref()
    }

    pub fn is_signed_in(&self) -> bool {
        self.user.is_some()
    }

    pub fn require_user(&self) -> Result<&UserProfile, MentorError> {
        self.user
            .as_ref()
            .ok_or_else(|| MentorError::Unauthorized("not signed in".to_string()))
    }

    pub fn require_admin(&self) -> Result<&UserProfile, MentorError> {
        let user = self.require_user()?;
        if user.is_admin() {
            Ok(user)
        } else {
            Err(MentorError::Unauthorized(format!(
                "{} is not an admin",
                user.username
            )))
        }
    }

    /// Replaces the snapshot with fresher data for the same account.
    /// Id and role never change from the client side.
    pub fn refresh(&mut self, mut profile: UserProfile) {
        if let Some(ref current) = self.user {
            if current.id != profile.id {
                tracing::warn!("Ignoring profile refresh for a different user");
                return;
            }
            profile.role = current.role;
            profile.password = None;
        }
        self.user = Some(profile);
    }

    /// Writes the snapshot into local state.
    pub fn store_into(&self, state: &mut LocalState) {
        state.current_user = self.user.clone();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::users::UserRole;

    fn user(role: UserRole) -> UserProfile {
        UserProfile {
            id: "u1".into(),
            username: "zeynep".into(),
            role,
            ..Default::default()
        }
    }

    #[test]
    fn test_lifecycle() {
        let mut auth = AuthContext::anonymous();
        assert!(auth.require_user().is_err());

        auth.login(user(UserRole::User));
        assert_eq!(auth.require_user().unwrap().username, "zeynep");
        assert!(auth.require_admin().is_err());

        auth.logout();
        assert!(!auth.is_signed_in());
    }

    #[test]
    fn test_admin_check() {
        let auth = AuthContext::signed_in(user(UserRole::Admin));
        assert!(auth.require_admin().is_ok());
    }

    #[test]
    fn test_refresh_keeps_role() {
        let mut auth = AuthContext::signed_in(user(UserRole::User));
        let mut fresh = user(UserRole::Admin);
        fresh.name = "Zeynep".into();
        auth.refresh(fresh);

        let current = auth.current().unwrap();
        assert_eq!(current.role, UserRole::User);
        assert_eq!(current.name, "Zeynep");
    }

    #[test]
    fn test_restore_and_store() {
        let mut state = LocalState::default();
        let auth = AuthContext::signed_in(user(UserRole::User));
        auth.store_into(&mut state);

        let restored = AuthContext::restore(&state);
        assert_eq!(restored, auth);
    }
}
