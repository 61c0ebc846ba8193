//! In-process identity session with a local account registry.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::adapters::live::id_gen::LiveIdGenerator;
use crate::error::AuthError;
use crate::ports::{
    AuthFuture, IdGenerator, Identity, IdentityListener, IdentitySession, IdentitySubscription,
};

/// Minimum accepted password length.
pub const MIN_PASSWORD_LEN: usize = 6;

struct Account {
    uid: String,
    password: String,
    display_name: Option<String>,
    email_verified: bool,
    verification_emails: u32,
}

impl Account {
    fn identity(&self, email: &str) -> Identity {
        Identity {
            uid: self.uid.clone(),
            email: Some(email.to_string()),
            display_name: self.display_name.clone(),
            email_verified: self.email_verified,
        }
    }
}

#[derive(Default)]
struct SessionState {
    accounts: HashMap<String, Account>,
    current: Option<Identity>,
    listeners: HashMap<u64, Arc<IdentityListener>>,
    next_listener: u64,
}

/// Identity session backed by an in-memory account map.
///
/// Listener callbacks run after the state change with the lock released.
pub struct LocalIdentitySession {
    state: Arc<Mutex<SessionState>>,
    id_gen: Box<dyn IdGenerator>,
}

impl LocalIdentitySession {
    /// A session with no accounts and nobody signed in.
    #[must_use]
    pub fn new() -> Self {
        Self::with_id_generator(Box::new(LiveIdGenerator::new()))
    }

    /// A session that assigns uids from `id_gen`.
    #[must_use]
    pub fn with_id_generator(id_gen: Box<dyn IdGenerator>) -> Self {
        Self { state: Arc::new(Mutex::new(SessionState::default())), id_gen }
    }

    /// A session already signed in as `identity`, without stored credentials.
    #[must_use]
    pub fn signed_in(identity: Identity) -> Self {
        let session = Self::new();
        session.lock().current = Some(identity);
        session
    }

    /// Replaces the current identity as if the provider had changed it,
    /// notifying listeners.
    pub fn replace_identity(&self, identity: Option<Identity>) {
        self.lock().current.clone_from(&identity);
        self.notify(identity);
    }

    /// Number of verification emails sent to `email`.
    #[must_use]
    pub fn verification_emails_sent(&self, email: &str) -> u32 {
        self.lock().accounts.get(email).map_or(0, |account| account.verification_emails)
    }

    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn notify(&self, identity: Option<Identity>) {
        let listeners: Vec<Arc<IdentityListener>> = self.lock().listeners.values().cloned().collect();
        for listener in listeners {
            listener(identity.clone());
        }
    }

    fn current_email(state: &SessionState) -> Result<String, AuthError> {
        state
            .current
            .as_ref()
            .and_then(|identity| identity.email.clone())
            .filter(|email| state.accounts.contains_key(email))
            .ok_or(AuthError::NotSignedIn)
    }
}

impl Default for LocalIdentitySession {
    fn default() -> Self {
        Self::new()
    }
}

fn check_password(password: &str) -> Result<(), AuthError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AuthError::WeakPassword(MIN_PASSWORD_LEN));
    }
    Ok(())
}

fn check_email(email: &str) -> Result<(), AuthError> {
    let valid = email
        .split_once('@')
        .is_some_and(|(local, domain)| !local.is_empty() && domain.contains('.'));
    if valid {
        Ok(())
    } else {
        Err(AuthError::InvalidEmail(email.to_string()))
    }
}

impl IdentitySession for LocalIdentitySession {
    fn current_identity(&self) -> Option<Identity> {
        self.lock().current.clone()
    }

    fn on_change(&self, listener: IdentityListener) -> IdentitySubscription {
        let key = {
            let mut state = self.lock();
            let key = state.next_listener;
            state.next_listener += 1;
            state.listeners.insert(key, Arc::new(listener));
            key
        };
        let state = Arc::downgrade(&self.state);
        IdentitySubscription::new(move || {
            if let Some(state) = state.upgrade() {
                state.lock().unwrap_or_else(PoisonError::into_inner).listeners.remove(&key);
            }
        })
    }

    fn sign_up<'a>(
        &'a self,
        email: &'a str,
        password: &'a str,
        display_name: &'a str,
    ) -> AuthFuture<'a, Identity> {
        Box::pin(async move {
            check_email(email)?;
            check_password(password)?;
            let identity = {
                let mut state = self.lock();
                if state.accounts.contains_key(email) {
                    return Err(AuthError::EmailInUse(email.to_string()));
                }
                let account = Account {
                    uid: self.id_gen.generate_id(),
                    password: password.to_string(),
                    display_name: Some(display_name.to_string()),
                    email_verified: false,
                    verification_emails: 1,
                };
                let identity = account.identity(email);
                state.accounts.insert(email.to_string(), account);
                state.current = Some(identity.clone());
                identity
            };
            tracing::info!(uid = %identity.uid, "account created");
            self.notify(Some(identity.clone()));
            Ok(identity)
        })
    }

    fn sign_in<'a>(&'a self, email: &'a str, password: &'a str) -> AuthFuture<'a, Identity> {
        Box::pin(async move {
            let identity = {
                let mut state = self.lock();
                let identity = state
                    .accounts
                    .get(email)
                    .filter(|account| account.password == password)
                    .map(|account| account.identity(email))
                    .ok_or(AuthError::InvalidCredentials)?;
                state.current = Some(identity.clone());
                identity
            };
            self.notify(Some(identity.clone()));
            Ok(identity)
        })
    }

    fn sign_out(&self) -> AuthFuture<'_, ()> {
        Box::pin(async move {
            self.lock().current = None;
            self.notify(None);
            Ok(())
        })
    }

    fn update_display_name<'a>(&'a self, display_name: &'a str) -> AuthFuture<'a, Identity> {
        Box::pin(async move {
            let mut state = self.lock();
            let current = state.current.as_mut().ok_or(AuthError::NotSignedIn)?;
            current.display_name = Some(display_name.to_string());
            let identity = current.clone();
            if let Some(email) = identity.email.as_deref() {
                if let Some(account) = state.accounts.get_mut(email) {
                    account.display_name = Some(display_name.to_string());
                }
            }
            Ok(identity)
        })
    }

    fn update_password<'a>(&'a self, current: &'a str, new: &'a str) -> AuthFuture<'a, ()> {
        Box::pin(async move {
            let mut state = self.lock();
            let email = Self::current_email(&state)?;
            let account = state.accounts.get_mut(&email).ok_or(AuthError::NotSignedIn)?;
            if account.password != current {
                return Err(AuthError::InvalidCredentials);
            }
            check_password(new)?;
            account.password = new.to_string();
            Ok(())
        })
    }

    fn send_verification_email(&self) -> AuthFuture<'_, ()> {
        Box::pin(async move {
            let mut state = self.lock();
            let email = Self::current_email(&state)?;
            if let Some(account) = state.accounts.get_mut(&email) {
                account.verification_emails += 1;
            }
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::SequentialIdGenerator;
    use std::sync::Mutex;

    fn session() -> LocalIdentitySession {
        LocalIdentitySession::with_id_generator(Box::new(SequentialIdGenerator::new("user")))
    }

    #[tokio::test]
    async fn sign_up_signs_in_and_sends_verification() {
        let session = session();
        let identity = session.sign_up("ada@example.com", "secret1", "Ada").await.unwrap();
        assert_eq!(identity.uid, "user-1");
        assert_eq!(identity.display_name.as_deref(), Some("Ada"));
        assert_eq!(session.current_identity(), Some(identity));
        assert_eq!(session.verification_emails_sent("ada@example.com"), 1);
    }

    #[tokio::test]
    async fn duplicate_and_weak_sign_ups_fail() {
        let session = session();
        session.sign_up("ada@example.com", "secret1", "Ada").await.unwrap();
        assert_eq!(
            session.sign_up("ada@example.com", "secret2", "Ada").await,
            Err(AuthError::EmailInUse("ada@example.com".into()))
        );
        assert_eq!(
            session.sign_up("bo@example.com", "123", "Bo").await,
            Err(AuthError::WeakPassword(MIN_PASSWORD_LEN))
        );
        assert_eq!(
            session.sign_up("not-an-email", "secret1", "Cy").await,
            Err(AuthError::InvalidEmail("not-an-email".into()))
        );
    }

    #[tokio::test]
    async fn listeners_see_sign_in_and_sign_out() {
        let session = session();
        session.sign_up("ada@example.com", "secret1", "Ada").await.unwrap();
        session.sign_out().await.unwrap();

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let _sub = session.on_change(Box::new(move |identity| {
            sink.lock().unwrap().push(identity.map(|i| i.uid));
        }));

        session.sign_in("ada@example.com", "secret1").await.unwrap();
        session.sign_out().await.unwrap();
        assert_eq!(*seen.lock().unwrap(), vec![Some("user-1".to_string()), None]);
    }

    #[tokio::test]
    async fn wrong_password_is_rejected() {
        let session = session();
        session.sign_up("ada@example.com", "secret1", "Ada").await.unwrap();
        assert_eq!(
            session.sign_in("ada@example.com", "nope").await,
            Err(AuthError::InvalidCredentials)
        );
    }

    #[tokio::test]
    async fn password_change_requires_current_password() {
        let session = session();
        session.sign_up("ada@example.com", "secret1", "Ada").await.unwrap();
        assert_eq!(
            session.update_password("wrong", "secret2").await,
            Err(AuthError::InvalidCredentials)
        );
        session.update_password("secret1", "secret2").await.unwrap();
        session.sign_out().await.unwrap();
        assert!(session.sign_in("ada@example.com", "secret2").await.is_ok());
    }

    #[tokio::test]
    async fn profile_operations_need_a_user() {
        let session = session();
        assert_eq!(session.update_display_name("X").await, Err(AuthError::NotSignedIn));
        assert_eq!(session.send_verification_email().await, Err(AuthError::NotSignedIn));
    }

    #[test]
    fn dropped_subscription_stops_notifications() {
        let session = LocalIdentitySession::signed_in(Identity::new("alice"));
        let calls = Arc::new(Mutex::new(0));
        let counter = Arc::clone(&calls);
        let sub = session.on_change(Box::new(move |_| *counter.lock().unwrap() += 1));
        session.replace_identity(None);
        drop(sub);
        session.replace_identity(Some(Identity::new("bob")));
        assert_eq!(*calls.lock().unwrap(), 1);
    }
}
