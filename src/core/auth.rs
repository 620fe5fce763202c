//! Authorization system
//!
//! - [`TokenService`] issues and verifies signed bearer tokens carrying the
//!   subject id and role
//! - [`AuthContext`] is the verified identity of a request (or anonymous)
//! - [`AuthPolicy`] decides whether a context may perform an operation

use crate::core::entity::{EntityKind, Role};
use crate::core::error::{
    AuthenticationError, AuthorizationError, DeliveryError, DeliveryResult, InternalError,
};
use crate::core::id::EntityId;
use axum::extract::{FromRef, FromRequestParts};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Authorization context extracted from a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthContext {
    /// Caller presented a valid token
    User { user_id: EntityId, role: Role },

    /// No token at all
    Anonymous,
}

impl AuthContext {
    pub fn is_admin(&self) -> bool {
        matches!(self, AuthContext::User { role: Role::Admin, .. })
    }

    pub fn user_id(&self) -> Option<EntityId> {
        match self {
            AuthContext::User { user_id, .. } => Some(*user_id),
            AuthContext::Anonymous => None,
        }
    }
}

impl From<CurrentUser> for AuthContext {
    fn from(user: CurrentUser) -> Self {
        AuthContext::User {
            user_id: user.user_id,
            role: user.role,
        }
    }
}

/// Authorization policy for an operation
#[derive(Debug, Clone)]
pub enum AuthPolicy {
    /// Public access (no auth required)
    Public,

    /// Any authenticated user
    Authenticated,

    /// Admin only
    AdminOnly,

    /// The user with this id, or an admin
    SelfOrAdmin(EntityId),

    /// Any of these users, or an admin
    ParticipantOrAdmin {
        entity: EntityKind,
        id: EntityId,
        participants: Vec<EntityId>,
    },
}

impl AuthPolicy {
    /// Check if auth context satisfies this policy
    pub fn check(&self, context: &AuthContext) -> bool {
        match self {
            AuthPolicy::Public => true,

            AuthPolicy::Authenticated => !matches!(context, AuthContext::Anonymous),

            AuthPolicy::AdminOnly => context.is_admin(),

            AuthPolicy::SelfOrAdmin(id) => context.is_admin() || context.user_id() == Some(*id),

            AuthPolicy::ParticipantOrAdmin { participants, .. } => {
                context.is_admin()
                    || context
                        .user_id()
                        .is_some_and(|caller| participants.contains(&caller))
            }
        }
    }

    /// Like [`check`](Self::check), but produces the error to return
    ///
    /// Anonymous callers get an authentication error; authenticated callers
    /// that lack rights get an authorization error.
    pub fn enforce(&self, context: &AuthContext) -> DeliveryResult<()> {
        if self.check(context) {
            return Ok(());
        }
        if matches!(context, AuthContext::Anonymous) {
            return Err(AuthenticationError::MissingToken.into());
        }
        let err = match self {
            AuthPolicy::AdminOnly => AuthorizationError::AdminRequired,
            AuthPolicy::SelfOrAdmin(id) => AuthorizationError::NotOwner {
                entity: EntityKind::User,
                id: *id,
            },
            AuthPolicy::ParticipantOrAdmin { entity, id, .. } => AuthorizationError::NotOwner {
                entity: *entity,
                id: *id,
            },
            AuthPolicy::Public | AuthPolicy::Authenticated => AuthorizationError::Forbidden {
                action: "operation not permitted".to_string(),
            },
        };
        Err(err.into())
    }
}

// =============================================================================
// Tokens
// =============================================================================

/// Payload of an identity token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject user id, decimal string
    pub sub: String,
    pub role: Role,
    pub iat: i64,
    pub exp: i64,
}

/// Issues and verifies HS256 identity tokens
#[derive(Clone)]
pub struct TokenService {
    encoding: Arc<EncodingKey>,
    decoding: Arc<DecodingKey>,
    ttl: Duration,
}

impl TokenService {
    pub fn new(secret: &str, ttl: Duration) -> Self {
        Self {
            encoding: Arc::new(EncodingKey::from_secret(secret.as_bytes())),
            decoding: Arc::new(DecodingKey::from_secret(secret.as_bytes())),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Issue a token valid from now
    pub fn issue(&self, user_id: EntityId, role: Role) -> DeliveryResult<String> {
        self.issue_at(user_id, role, Utc::now())
    }

    /// Issue a token as if signed at `issued_at`
    pub fn issue_at(
        &self,
        user_id: EntityId,
        role: Role,
        issued_at: DateTime<Utc>,
    ) -> DeliveryResult<String> {
        let claims = Claims {
            sub: user_id.to_string(),
            role,
            iat: issued_at.timestamp(),
            exp: (issued_at + self.ttl).timestamp(),
        };
        encode(&Header::default(), &claims, &self.encoding)
            .map_err(|e| DeliveryError::Internal(InternalError::Token(e.to_string())))
    }

    /// Verify signature and expiry; expiry is reported separately
    pub fn verify(&self, token: &str) -> Result<Claims, AuthenticationError> {
        let mut validation = Validation::default();
        validation.leeway = 0;
        decode::<Claims>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => AuthenticationError::ExpiredToken,
                _ => AuthenticationError::InvalidToken,
            })
    }

    /// Verify a token and turn it into an authenticated context
    pub fn authenticate(&self, token: &str) -> Result<AuthContext, AuthenticationError> {
        let claims = self.verify(token)?;
        let user_id = claims
            .sub
            .parse::<EntityId>()
            .map_err(|_| AuthenticationError::InvalidToken)?;
        Ok(AuthContext::User {
            user_id,
            role: claims.role,
        })
    }
}

// =============================================================================
// Extractors
// =============================================================================

/// Pull the bearer token out of the `Authorization` header
///
/// `Ok(None)` when the header is absent or carries an empty bearer token.
fn bearer_token(parts: &Parts) -> Result<Option<&str>, AuthenticationError> {
    let Some(header) = parts.headers.get(AUTHORIZATION) else {
        return Ok(None);
    };
    let value = header
        .to_str()
        .map_err(|_| AuthenticationError::InvalidToken)?;
    let token = value
        .strip_prefix("Bearer ")
        .or_else(|| value.strip_prefix("bearer "))
        .ok_or(AuthenticationError::InvalidToken)?
        .trim();
    Ok((!token.is_empty()).then_some(token))
}

/// Optional authentication: anonymous without a header, rejected on a bad token
impl<S> FromRequestParts<S> for AuthContext
where
    S: Send + Sync,
    TokenService: FromRef<S>,
{
    type Rejection = DeliveryError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match bearer_token(parts)? {
            None => Ok(AuthContext::Anonymous),
            Some(token) => Ok(TokenService::from_ref(state).authenticate(token)?),
        }
    }
}

/// Required authentication
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CurrentUser {
    pub user_id: EntityId,
    pub role: Role,
}

impl CurrentUser {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn context(&self) -> AuthContext {
        AuthContext::from(*self)
    }
}

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
    TokenService: FromRef<S>,
{
    type Rejection = DeliveryError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match AuthContext::from_request_parts(parts, state).await? {
            AuthContext::User { user_id, role } => Ok(CurrentUser { user_id, role }),
            AuthContext::Anonymous => Err(AuthenticationError::MissingToken.into()),
        }
    }
}

/// Required ADMIN authentication
///
/// Rejects before the body is read, so a client never learns whether a
/// payload it may not submit would have validated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdminUser(pub CurrentUser);

impl<S> FromRequestParts<S> for AdminUser
where
    S: Send + Sync,
    TokenService: FromRef<S>,
{
    type Rejection = DeliveryError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let user = CurrentUser::from_request_parts(parts, state).await?;
        AuthPolicy::AdminOnly.enforce(&user.context())?;
        Ok(AdminUser(user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(id: i64) -> AuthContext {
        AuthContext::User {
            user_id: EntityId::new(id),
            role: Role::Client,
        }
    }

    fn admin() -> AuthContext {
        AuthContext::User {
            user_id: EntityId::new(1),
            role: Role::Admin,
        }
    }

    #[test]
    fn test_policy_check() {
        assert!(AuthPolicy::Public.check(&AuthContext::Anonymous));
        assert!(!AuthPolicy::Authenticated.check(&AuthContext::Anonymous));
        assert!(AuthPolicy::Authenticated.check(&client(5)));
        assert!(!AuthPolicy::AdminOnly.check(&client(5)));
        assert!(AuthPolicy::AdminOnly.check(&admin()));
    }

    #[test]
    fn test_self_or_admin() {
        let policy = AuthPolicy::SelfOrAdmin(EntityId::new(5));
        assert!(policy.check(&client(5)));
        assert!(!policy.check(&client(6)));
        assert!(policy.check(&admin()));
    }

    #[test]
    fn test_participant_or_admin() {
        let policy = AuthPolicy::ParticipantOrAdmin {
            entity: EntityKind::Order,
            id: EntityId::new(10),
            participants: vec![EntityId::new(5), EntityId::new(7)],
        };
        assert!(policy.check(&client(7)));
        assert!(!policy.check(&client(8)));
        assert!(policy.check(&admin()));
    }

    #[test]
    fn test_enforce_distinguishes_anonymous_from_forbidden() {
        let anonymous = AuthPolicy::AdminOnly.enforce(&AuthContext::Anonymous);
        assert!(matches!(
            anonymous,
            Err(DeliveryError::Authentication(AuthenticationError::MissingToken))
        ));
        let client = AuthPolicy::AdminOnly.enforce(&client(2));
        assert!(matches!(
            client,
            Err(DeliveryError::Authorization(AuthorizationError::AdminRequired))
        ));
    }

    #[test]
    fn test_token_roundtrip() {
        let tokens = TokenService::new("test-secret", Duration::hours(8));
        let token = tokens.issue(EntityId::new(4_294_967_296), Role::Admin).unwrap();
        let ctx = tokens.authenticate(&token).unwrap();
        assert_eq!(
            ctx,
            AuthContext::User {
                user_id: EntityId::new(4_294_967_296),
                role: Role::Admin
            }
        );
    }

    #[test]
    fn test_expired_token_is_distinct_from_invalid() {
        let tokens = TokenService::new("test-secret", Duration::hours(8));
        let stale = tokens
            .issue_at(EntityId::new(1), Role::Client, Utc::now() - Duration::hours(9))
            .unwrap();
        assert_eq!(tokens.verify(&stale), Err(AuthenticationError::ExpiredToken));

        let other = TokenService::new("other-secret", Duration::hours(8));
        let forged = other.issue(EntityId::new(1), Role::Admin).unwrap();
        assert_eq!(tokens.verify(&forged), Err(AuthenticationError::InvalidToken));
        assert_eq!(tokens.verify("not.a.jwt"), Err(AuthenticationError::InvalidToken));
    }
}
