use time::Duration;
use tracing::{debug, info, warn};

use crate::auth::{
    dto::PublicUser,
    error::AuthError,
    jwt::TokenService,
    password::PasswordHasher,
    repo::UserStore,
};

const REGISTER_FIELDS: &str = "name, email, and password";
const LOGIN_FIELDS: &str = "email and password";

/// Extracts the token from an `Authorization: Bearer <token>` header value.
pub fn bearer_token(header: Option<&str>) -> Result<&str, AuthError> {
    let token = header
        .and_then(|h| h.strip_prefix("Bearer "))
        .ok_or(AuthError::MissingOrMalformedHeader)?;

    if token.is_empty() || token.contains(char::is_whitespace) {
        return Err(AuthError::MissingOrMalformedHeader);
    }
    Ok(token)
}

/// Register, login and profile lookup over the user store.
pub struct AuthService {
    users: UserStore,
    hasher: PasswordHasher,
    tokens: TokenService,
    token_ttl: Duration,
    dummy_hash: String, // checked on unknown-email logins
}

impl AuthService {
    pub fn new(hasher: PasswordHasher, tokens: TokenService) -> anyhow::Result<Self> {
        let token_ttl = tokens.default_ttl();
        let dummy_hash = hasher.hash("keyturn-unknown-user")?;
        Ok(Self {
            users: UserStore::new(),
            hasher,
            tokens,
            token_ttl,
            dummy_hash,
        })
    }

    pub fn users(&self) -> &UserStore {
        &self.users
    }

    pub fn tokens(&self) -> &TokenService {
        &self.tokens
    }

    pub fn register(&self, name: &str, email: &str, password: &str) -> Result<PublicUser, AuthError> {
        if name.is_empty() || email.is_empty() || password.is_empty() {
            return Err(AuthError::MissingField {
                required: REGISTER_FIELDS,
            });
        }

        // Hash before taking the store lock.
        let hash = self.hasher.hash(password)?;
        let user = self.users.insert_if_absent(name, email, &hash).map_err(|e| {
            warn!(email = %email, "email already registered");
            AuthError::from(e)
        })?;

        info!(user_id = user.id, email = %user.email, "user registered");
        Ok(user.into())
    }

    pub fn login(&self, email: &str, password: &str) -> Result<String, AuthError> {
        if email.is_empty() || password.is_empty() {
            return Err(AuthError::MissingField {
                required: LOGIN_FIELDS,
            });
        }

        let Some(user) = self.users.find_by_email(email) else {
            let _ = self.hasher.verify(password, &self.dummy_hash);
            warn!(email = %email, "login unknown email");
            return Err(AuthError::InvalidCredentials);
        };

        if !self.hasher.verify(password, &user.password_hash)? {
            warn!(email = %email, user_id = user.id, "login invalid password");
            return Err(AuthError::InvalidCredentials);
        }

        let token = self.tokens.issue(user.id, &user.email, self.token_ttl)?;
        info!(user_id = user.id, email = %user.email, "user logged in");
        Ok(token)
    }

    /// Resolves the caller's profile from a raw `Authorization` header value.
    pub fn profile(&self, authorization: Option<&str>) -> Result<PublicUser, AuthError> {
        let token = bearer_token(authorization)?;
        let claims = self.tokens.verify(token)?;

        let user = self.users.find_by_id(claims.user_id).ok_or_else(|| {
            warn!(user_id = claims.user_id, "token references unknown user");
            AuthError::UserNotFound
        })?;

        debug!(user_id = user.id, "profile loaded");
        Ok(user.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{jwt::TokenError, password::cheap_hasher};
    use crate::config::JwtConfig;
    use std::sync::{Arc, Barrier};
    use time::OffsetDateTime;

    fn make_service() -> AuthService {
        let tokens = TokenService::new(&JwtConfig {
            secret: "test-secret".into(),
            ttl_minutes: 60,
        });
        AuthService::new(cheap_hasher(), tokens).expect("service")
    }

    fn bearer(token: &str) -> String {
        format!("Bearer {token}")
    }

    #[test]
    fn register_login_profile_roundtrip() {
        let svc = make_service();
        let created = svc.register("Ann", "ann@x.com", "pw123456").unwrap();
        assert_eq!(created.id, 1);
        assert_eq!(created.name, "Ann");

        let token = svc.login("ann@x.com", "pw123456").unwrap();
        let profile = svc.profile(Some(&bearer(&token))).unwrap();
        assert_eq!(profile, created);
    }

    #[test]
    fn register_requires_all_fields() {
        let svc = make_service();
        for (name, email, pw) in [
            ("", "ann@x.com", "pw"),
            ("Ann", "", "pw"),
            ("Ann", "ann@x.com", ""),
        ] {
            let err = svc.register(name, email, pw).unwrap_err();
            assert!(matches!(err, AuthError::MissingField { .. }), "{err:?}");
        }
        assert!(svc.users().is_empty());
    }

    #[test]
    fn register_twice_is_email_taken() {
        let svc = make_service();
        svc.register("Ann", "ann@x.com", "pw123456").unwrap();
        let err = svc.register("Ann", "ann@x.com", "other").unwrap_err();
        assert!(matches!(err, AuthError::EmailTaken));
        assert_eq!(svc.users().len(), 1);
    }

    #[test]
    fn concurrent_registration_has_single_winner() {
        const THREADS: usize = 8;
        let svc = Arc::new(make_service());
        let barrier = Arc::new(Barrier::new(THREADS));

        let results: Vec<_> = (0..THREADS)
            .map(|_| {
                let svc = Arc::clone(&svc);
                let barrier = Arc::clone(&barrier);
                std::thread::spawn(move || {
                    barrier.wait();
                    svc.register("Ann", "ann@x.com", "pw123456")
                })
            })
            .collect::<Vec<_>>()
            .into_iter()
            .map(|h| h.join().unwrap())
            .collect();

        let ok = results.iter().filter(|r| r.is_ok()).count();
        let taken = results
            .iter()
            .filter(|r| matches!(r, Err(AuthError::EmailTaken)))
            .count();
        assert_eq!(ok, 1);
        assert_eq!(taken, THREADS - 1);
        assert_eq!(svc.users().len(), 1);
    }

    #[test]
    fn password_hash_is_never_plaintext() {
        let svc = make_service();
        svc.register("Ann", "ann@x.com", "pw123456").unwrap();
        let stored = svc.users().find_by_email("ann@x.com").unwrap();
        assert_ne!(stored.password_hash, "pw123456");
        assert!(!stored.password_hash.contains("pw123456"));
    }

    #[test]
    fn wrong_password_and_unknown_email_look_the_same() {
        let svc = make_service();
        svc.register("Ann", "ann@x.com", "pw123456").unwrap();

        let wrong = svc.login("ann@x.com", "wrong").unwrap_err();
        let unknown = svc.login("bob@x.com", "pw123456").unwrap_err();
        assert!(matches!(wrong, AuthError::InvalidCredentials));
        assert!(matches!(unknown, AuthError::InvalidCredentials));
        assert_eq!(wrong.to_string(), unknown.to_string());
        assert_eq!(wrong.status_code(), unknown.status_code());
    }

    #[test]
    fn unknown_email_still_runs_password_verification() {
        let svc = make_service();
        svc.register("Ann", "ann@x.com", "pw123456").unwrap();

        let before = svc.hasher.verifications();
        assert!(matches!(
            svc.login("bob@x.com", "pw123456"),
            Err(AuthError::InvalidCredentials)
        ));
        assert_eq!(svc.hasher.verifications(), before + 1);

        assert!(matches!(
            svc.login("ann@x.com", "wrong"),
            Err(AuthError::InvalidCredentials)
        ));
        assert_eq!(svc.hasher.verifications(), before + 2);
    }

    #[test]
    fn dummy_hash_is_a_real_argon2_hash() {
        let svc = make_service();
        assert!(svc.dummy_hash.starts_with("$argon2id$"));
        assert!(!svc.hasher.verify("pw123456", &svc.dummy_hash).unwrap());
    }

    #[test]
    fn login_requires_fields() {
        let svc = make_service();
        assert!(matches!(
            svc.login("", "pw"),
            Err(AuthError::MissingField { .. })
        ));
        assert!(matches!(
            svc.login("ann@x.com", ""),
            Err(AuthError::MissingField { .. })
        ));
    }

    #[test]
    fn login_token_carries_user_identity() {
        let svc = make_service();
        let ann = svc.register("Ann", "ann@x.com", "pw123456").unwrap();
        let token = svc.login("ann@x.com", "pw123456").unwrap();
        let claims = svc.tokens().verify(&token).unwrap();
        assert_eq!(claims.user_id, ann.id);
        assert_eq!(claims.email, "ann@x.com");
        assert_eq!(claims.exp - claims.iat, 3600);
    }

    #[test]
    fn bearer_header_must_be_exact() {
        assert!(matches!(
            bearer_token(None),
            Err(AuthError::MissingOrMalformedHeader)
        ));
        for bad in ["", "Bearer", "Bearer ", "bearer abc", "Token abc", "Bearer a b", "Bearer  abc"] {
            assert!(
                matches!(bearer_token(Some(bad)), Err(AuthError::MissingOrMalformedHeader)),
                "{bad:?} should be rejected"
            );
        }
        assert_eq!(bearer_token(Some("Bearer abc.def.ghi")).unwrap(), "abc.def.ghi");
    }

    #[test]
    fn profile_rejects_missing_and_malformed_header() {
        let svc = make_service();
        assert!(matches!(
            svc.profile(None),
            Err(AuthError::MissingOrMalformedHeader)
        ));
        assert!(matches!(
            svc.profile(Some("Basic dXNlcjpwdw==")),
            Err(AuthError::MissingOrMalformedHeader)
        ));
    }

    #[test]
    fn profile_rejects_bad_and_expired_tokens() {
        let svc = make_service();
        let ann = svc.register("Ann", "ann@x.com", "pw123456").unwrap();

        let err = svc.profile(Some("Bearer not-a-token")).unwrap_err();
        assert!(matches!(err, AuthError::Unauthorized(TokenError::Invalid(_))));

        let stale = svc
            .tokens()
            .issue_at(
                OffsetDateTime::now_utc() - Duration::hours(2),
                ann.id,
                &ann.email,
                Duration::hours(1),
            )
            .unwrap();
        let err = svc.profile(Some(&bearer(&stale))).unwrap_err();
        assert!(matches!(err, AuthError::Unauthorized(TokenError::Expired)));
    }

    #[test]
    fn profile_for_unknown_user_is_not_found() {
        let svc = make_service();
        let ghost = svc
            .tokens()
            .issue(42, "ghost@x.com", Duration::hours(1))
            .unwrap();
        let err = svc.profile(Some(&bearer(&ghost))).unwrap_err();
        assert!(matches!(err, AuthError::UserNotFound));
    }

    #[test]
    fn corrupt_stored_hash_is_internal() {
        let svc = make_service();
        svc.users()
            .insert_if_absent("Ann", "ann@x.com", "garbage")
            .unwrap();
        let err = svc.login("ann@x.com", "pw123456").unwrap_err();
        assert!(matches!(err, AuthError::Internal(_)));
    }
}
