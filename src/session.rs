use crate::authz::Principal;
use crate::errors::ConsoleError;
use crate::gateway::MutationGateway;
use crate::messages;
use crate::models::{LoginRequest, User};
use crate::notifications::{notify, NotificationBus, NotificationKind};

/// The signed-in operator.
///
/// Set on a successful login or restore, cleared on logout, and read everywhere
/// else. Views take `session.user()` as an explicit argument.
pub struct Session {
    user: Option<User>,
    notifications: NotificationBus,
}

impl Session {
    pub fn new(notifications: NotificationBus) -> Self {
        Self {
            user: None,
            notifications,
        }
    }

    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }

    pub fn principal(&self) -> Option<Principal> {
        self.user.as_ref().map(Principal::from_user)
    }

    /// Picks up an existing remote session. A missing session is not an error.
    pub async fn restore(&mut self, gateway: &dyn MutationGateway) -> bool {
        match gateway.current_user().await {
            Ok(user) => {
                tracing::info!(user_id = user.id, "session restored");
                self.user = Some(user);
                true
            }
            Err(ConsoleError::Auth(_)) => {
                tracing::debug!("no remote session");
                self.user = None;
                false
            }
            Err(err) => {
                tracing::warn!(kind = err.kind(), "failed to restore session: {}", err);
                self.user = None;
                false
            }
        }
    }

    pub async fn login(&mut self, gateway: &dyn MutationGateway, credentials: &LoginRequest) -> bool {
        match gateway.login(credentials).await {
            Ok(user) => {
                tracing::info!(user_id = user.id, "logged in");
                self.user = Some(user);
                true
            }
            Err(err) => {
                tracing::warn!(kind = err.kind(), "login failed: {}", err);
                notify(&self.notifications, NotificationKind::Error, messages::FAIL);
                false
            }
        }
    }

    /// Clears the local user even when the remote call fails.
    pub async fn logout(&mut self, gateway: &dyn MutationGateway) {
        let Some(user) = self.user.take() else {
            return;
        };
        if let Err(err) = gateway.logout(user.id).await {
            tracing::warn!(user_id = user.id, kind = err.kind(), "logout failed: {}", err);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::InMemoryGateway;
    use crate::notifications::{drain, init_notification_bus};

    #[tokio::test]
    async fn login_then_logout() {
        let gateway = InMemoryGateway::new();
        gateway.seed_user("ada@example.com", "pw", &[]).await;
        let (bus, _rx) = init_notification_bus();
        let mut session = Session::new(bus);

        let creds = LoginRequest { email: "ada@example.com".into(), password: "pw".into() };
        assert!(session.login(&gateway, &creds).await);
        assert!(session.is_authenticated());

        session.logout(&gateway).await;
        assert!(!session.is_authenticated());
        assert!(!session.restore(&gateway).await);
    }

    #[tokio::test]
    async fn failed_login_notifies_and_stays_signed_out() {
        let gateway = InMemoryGateway::new();
        let (bus, mut rx) = init_notification_bus();
        let mut session = Session::new(bus);

        let creds = LoginRequest { email: "nobody@example.com".into(), password: "x".into() };
        assert!(!session.login(&gateway, &creds).await);
        assert!(session.user().is_none());

        let got = drain(&mut rx);
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].key, messages::FAIL);
    }

    #[tokio::test]
    async fn logout_clears_user_even_when_remote_fails() {
        let gateway = InMemoryGateway::new();
        let user = gateway.seed_user("ada@example.com", "pw", &[]).await;
        gateway.set_session(Some(user.id)).await;
        let (bus, _rx) = init_notification_bus();
        let mut session = Session::new(bus);
        assert!(session.restore(&gateway).await);

        gateway.fail_next(ConsoleError::transport("offline")).await;
        session.logout(&gateway).await;
        assert!(session.user().is_none());
    }
}
