//! Authentication and rate limiting checkpoint for inbound gRPC calls.
//!
//! Every call that is not in the public-method set must present an
//! `authorization: Bearer <token>` metadata entry. The token is first run
//! through the per-credential rate limiter, then validated against the SSO
//! service; on success the verified identity and the raw token are bound
//! into the request extensions for downstream handlers.

pub mod chain;
pub mod context;

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use tonic::{Request, Response, Status};
use tracing::{debug, warn};
use warden_errors::AppResult;
use warden_ratelimiter::TokenBucket;

use crate::clients::sso;
use chain::{
    BoxMessage, CallInfo, MessageStream, StreamInterceptor, StreamNext, UnaryInterceptor,
    UnaryNext,
};
use context::{AccessToken, VerifiedIdentity};

/// Credential validation seam, implemented by [`sso::Client`] and stubbed in
/// tests.
#[async_trait]
pub trait CredentialValidator: Send + Sync {
    async fn validate(&self, access_token: &str) -> AppResult<VerifiedIdentity>;
}

#[async_trait]
impl CredentialValidator for sso::Client {
    async fn validate(&self, access_token: &str) -> AppResult<VerifiedIdentity> {
        let resp = self.validate_token(access_token).await?;

        Ok(VerifiedIdentity {
            user_id: resp.user_id,
            username: resp.username,
            email: resp.email,
            photo_url: resp.photo_url,
            role: sso::Role::try_from(resp.role).unwrap_or(sso::Role::Unspecified),
            app_id: resp.app_id,
            balance: resp.balance,
        })
    }
}

/// Authentication interceptor for unary and streaming calls.
pub struct AuthInterceptor {
    validator: Arc<dyn CredentialValidator>,
    limiter: Option<Arc<TokenBucket>>,
    /// Populated before serving traffic begins, read-only afterwards.
    public_methods: HashSet<String>,
}

impl AuthInterceptor {
    /// Creates the interceptor. Passing no limiter disables rate limiting
    /// entirely.
    pub fn new(validator: Arc<dyn CredentialValidator>, limiter: Option<Arc<TokenBucket>>) -> Self {
        Self {
            validator,
            limiter,
            public_methods: HashSet::new(),
        }
    }

    /// Registers fully-qualified method names exempt from authentication and
    /// rate limiting.
    pub fn with_public_methods<I, S>(mut self, methods: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.public_methods
            .extend(methods.into_iter().map(Into::into));
        self
    }

    fn is_public(&self, full_method: &str) -> bool {
        self.public_methods.contains(full_method)
    }

    /// Shared decision logic for both call shapes. Rejections short-circuit
    /// the call; on success the identity and raw token are bound into the
    /// request extensions.
    async fn authorize<T>(&self, request: &mut Request<T>, full_method: &str) -> Result<(), Status> {
        let access_token = match extract_access_token(request) {
            Ok(token) => token,
            Err(status) => {
                warn!(
                    method = full_method,
                    error = status.message(),
                    "failed to extract access token"
                );
                return Err(status);
            }
        };

        // limiter runs before validation so rejected calls never consume
        // sso capacity
        if let Some(limiter) = &self.limiter {
            let (allowed, remaining) = limiter.allow(&access_token);
            if !allowed {
                warn!(method = full_method, "rate limit exceeded");
                return Err(Status::resource_exhausted(
                    "rate limit exceeded, please try again later",
                ));
            }
            debug!(method = full_method, remaining, "rate limit check passed");
        }

        let identity = match self.validator.validate(&access_token).await {
            Ok(identity) => identity,
            Err(err) => {
                // transport failures and explicit rejections surface the same
                // status; the real cause stays in the log
                warn!(method = full_method, error = %err, "token validation failed");
                return Err(Status::unauthenticated("invalid or expired token"));
            }
        };

        debug!(
            method = full_method,
            user_id = identity.user_id,
            username = %identity.username,
            "user authenticated"
        );

        request.extensions_mut().insert(identity);
        request.extensions_mut().insert(AccessToken(access_token));

        Ok(())
    }
}

#[async_trait]
impl UnaryInterceptor for AuthInterceptor {
    async fn call(
        &self,
        mut request: Request<BoxMessage>,
        info: &CallInfo,
        next: UnaryNext<'_>,
    ) -> Result<Response<BoxMessage>, Status> {
        if self.is_public(info.full_method()) {
            return next.run(request).await;
        }

        self.authorize(&mut request, info.full_method()).await?;
        next.run(request).await
    }
}

#[async_trait]
impl StreamInterceptor for AuthInterceptor {
    async fn call(
        &self,
        mut request: Request<MessageStream>,
        info: &CallInfo,
        next: StreamNext<'_>,
    ) -> Result<Response<MessageStream>, Status> {
        if self.is_public(info.full_method()) {
            return next.run(request).await;
        }

        // the extensions bound here live on the stream's request envelope,
        // so every message observes the same identity
        self.authorize(&mut request, info.full_method()).await?;
        next.run(request).await
    }
}

/// Pulls the bearer token out of the call metadata. The sub-causes produce
/// distinct diagnostics but one external error code.
fn extract_access_token<T>(request: &Request<T>) -> Result<String, Status> {
    let Some(value) = request.metadata().get(sso::AUTHORIZATION_HEADER) else {
        return Err(Status::unauthenticated("missing authorization header"));
    };

    let header = value
        .to_str()
        .map_err(|_| Status::unauthenticated("authorization header is not valid ascii"))?;

    let Some(token) = header.strip_prefix(sso::BEARER_PREFIX) else {
        return Err(Status::unauthenticated(
            "invalid authorization format, expected 'Bearer <token>'",
        ));
    };

    Ok(token.to_owned())
}
