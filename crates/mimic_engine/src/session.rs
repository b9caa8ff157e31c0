//! Bearer-token session shared between the CLI and the orchestrator.
use std::sync::{Arc, Mutex, MutexGuard};

use mimic_logging::{mimic_debug, mimic_info};

use crate::api::AuthApi;
use crate::{ApiError, AuthError, AuthGrant, UserProfile};

pub type SessionCallback = Box<dyn Fn(Option<&Session>) + Send + Sync>;

/// Source of the current access token.
///
/// The orchestrator reads the token at the start of every backend call, so a
/// sign-out takes effect on the next request.
pub trait SessionProvider: Send + Sync {
    fn token(&self) -> Option<String>;

    /// Registers a listener for sign-in and sign-out.
    fn on_change(&self, callback: SessionCallback);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub token: String,
    pub user: Option<UserProfile>,
}

#[derive(Default)]
struct Inner {
    session: Option<Session>,
    listeners: Vec<Arc<dyn Fn(Option<&Session>) + Send + Sync>>,
}

#[derive(Default)]
pub struct SessionStore {
    inner: Mutex<Inner>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store already holding `token`, for callers that received it out of band.
    pub fn with_token(token: impl Into<String>) -> Self {
        let store = Self::new();
        store.lock().session = Some(Session {
            token: token.into(),
            user: None,
        });
        store
    }

    pub fn current(&self) -> Option<Session> {
        self.lock().session.clone()
    }

    pub fn user(&self) -> Option<UserProfile> {
        self.lock().session.as_ref().and_then(|s| s.user.clone())
    }

    pub fn set_session(&self, session: Session) {
        self.replace(Some(session));
    }

    pub fn clear(&self) {
        mimic_info!("session cleared");
        self.replace(None);
    }

    pub async fn sign_in(
        &self,
        auth: &dyn AuthApi,
        email: &str,
        password: &str,
    ) -> Result<UserProfile, AuthError> {
        let email = normalize_email(email);
        if email.is_empty() || password.is_empty() {
            return Err(AuthError::Invalid("email and password are required".into()));
        }

        let grant = auth.login(&email, password).await.map_err(|err| match err {
            ApiError::Unauthorized => AuthError::BadCredentials,
            other => AuthError::Api(other),
        })?;
        Ok(self.accept(grant))
    }

    pub async fn sign_up(
        &self,
        auth: &dyn AuthApi,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<UserProfile, AuthError> {
        let name = name.trim();
        let email = normalize_email(email);
        validate_signup(name, &email, password)?;

        let grant = auth.signup(name, &email, password).await?;
        Ok(self.accept(grant))
    }

    fn accept(&self, grant: AuthGrant) -> UserProfile {
        mimic_info!("signed in");
        let user = grant.user.clone();
        self.replace(Some(Session {
            token: grant.token,
            user: Some(grant.user),
        }));
        user
    }

    fn replace(&self, session: Option<Session>) {
        let listeners = {
            let mut inner = self.lock();
            inner.session = session.clone();
            inner.listeners.clone()
        };
        mimic_debug!("notifying {} session listener(s)", listeners.len());
        for listener in &listeners {
            listener(session.as_ref());
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl SessionProvider for SessionStore {
    fn token(&self) -> Option<String> {
        self.lock().session.as_ref().map(|s| s.token.clone())
    }

    fn on_change(&self, callback: SessionCallback) {
        self.lock().listeners.push(Arc::from(callback));
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn validate_signup(name: &str, email: &str, password: &str) -> Result<(), AuthError> {
    if name.chars().count() < 2 {
        return Err(AuthError::Invalid(
            "name must be at least 2 characters".into(),
        ));
    }
    let looks_like_email = email
        .split_once('@')
        .is_some_and(|(local, domain)| !local.is_empty() && domain.contains('.'));
    if !looks_like_email {
        return Err(AuthError::Invalid("email address is not valid".into()));
    }
    if password.chars().count() < 6 {
        return Err(AuthError::Invalid(
            "password must be at least 6 characters".into(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    use super::{validate_signup, Session, SessionProvider, SessionStore};
    use crate::api::AuthApi;
    use crate::{ApiError, AuthError, AuthGrant, UserProfile};

    struct FakeAuth {
        calls: Mutex<Vec<String>>,
        reject: bool,
    }

    impl FakeAuth {
        fn new(reject: bool) -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                reject,
            }
        }

        fn grant(email: &str, name: &str) -> AuthGrant {
            AuthGrant {
                token: "tok-1".into(),
                user: UserProfile {
                    id: Some("u1".into()),
                    name: name.into(),
                    email: email.into(),
                },
            }
        }
    }

    #[async_trait::async_trait]
    impl AuthApi for FakeAuth {
        async fn login(&self, email: &str, _password: &str) -> Result<AuthGrant, ApiError> {
            self.calls.lock().unwrap().push(format!("login {email}"));
            if self.reject {
                return Err(ApiError::Unauthorized);
            }
            Ok(Self::grant(email, "Ada"))
        }

        async fn signup(
            &self,
            name: &str,
            email: &str,
            _password: &str,
        ) -> Result<AuthGrant, ApiError> {
            self.calls.lock().unwrap().push(format!("signup {name} {email}"));
            Ok(Self::grant(email, name))
        }
    }

    #[test]
    fn signup_validation_rules() {
        assert!(validate_signup("Ada", "ada@example.com", "secret").is_ok());
        assert!(matches!(
            validate_signup("A", "ada@example.com", "secret"),
            Err(AuthError::Invalid(_))
        ));
        assert!(matches!(
            validate_signup("Ada", "ada.example.com", "secret"),
            Err(AuthError::Invalid(_))
        ));
        assert!(matches!(
            validate_signup("Ada", "ada@localhost", "secret"),
            Err(AuthError::Invalid(_))
        ));
        assert!(matches!(
            validate_signup("Ada", "ada@example.com", "12345"),
            Err(AuthError::Invalid(_))
        ));
    }

    #[tokio::test]
    async fn sign_in_normalizes_email_and_notifies_listeners() {
        let store = SessionStore::new();
        let auth = FakeAuth::new(false);
        let seen = Arc::new(AtomicUsize::new(0));
        let counter = seen.clone();
        store.on_change(Box::new(move |session: Option<&Session>| {
            if session.is_some() {
                counter.fetch_add(1, Ordering::SeqCst);
            }
        }));

        let user = store.sign_in(&auth, "  Ada@Example.COM ", "pw").await.unwrap();

        assert_eq!(user.email, "ada@example.com");
        assert_eq!(store.token().as_deref(), Some("tok-1"));
        assert_eq!(seen.load(Ordering::SeqCst), 1);
        assert_eq!(*auth.calls.lock().unwrap(), vec!["login ada@example.com"]);
    }

    #[tokio::test]
    async fn rejected_login_is_bad_credentials_and_keeps_session_empty() {
        let store = SessionStore::new();
        let auth = FakeAuth::new(true);
        let err = store.sign_in(&auth, "a@b.co", "pw").await.unwrap_err();
        assert_eq!(err, AuthError::BadCredentials);
        assert!(store.current().is_none());
    }

    #[tokio::test]
    async fn invalid_signup_never_reaches_backend() {
        let store = SessionStore::new();
        let auth = FakeAuth::new(false);
        let err = store.sign_up(&auth, "Ada", "nope", "secret").await.unwrap_err();
        assert!(matches!(err, AuthError::Invalid(_)));
        assert!(auth.calls.lock().unwrap().is_empty());

        let user = store.sign_up(&auth, " Ada ", "Ada@Example.com", "secret").await.unwrap();
        assert_eq!(user.name, "Ada");
        assert_eq!(*auth.calls.lock().unwrap(), vec!["signup Ada ada@example.com"]);
    }

    #[test]
    fn listener_can_read_the_store_back() {
        let store = Arc::new(SessionStore::new());
        let seen = Arc::new(Mutex::new(Vec::new()));
        let reader = Arc::downgrade(&store);
        let sink = seen.clone();
        store.on_change(Box::new(move |_: Option<&Session>| {
            if let Some(store) = reader.upgrade() {
                sink.lock().unwrap().push(store.token());
            }
        }));

        let worker = {
            let store = store.clone();
            std::thread::spawn(move || {
                store.set_session(Session {
                    token: "fresh".into(),
                    user: None,
                });
                store.clear();
            })
        };
        worker.join().unwrap();

        assert_eq!(*seen.lock().unwrap(), vec![Some("fresh".to_string()), None]);
    }

    #[test]
    fn clear_drops_token_and_reports_none() {
        let store = SessionStore::with_token("abc");
        let cleared = Arc::new(AtomicUsize::new(0));
        let counter = cleared.clone();
        store.on_change(Box::new(move |session: Option<&Session>| {
            if session.is_none() {
                counter.fetch_add(1, Ordering::SeqCst);
            }
        }));

        assert_eq!(store.token().as_deref(), Some("abc"));
        store.clear();
        assert_eq!(store.token(), None);
        assert_eq!(cleared.load(Ordering::SeqCst), 1);
    }
}
