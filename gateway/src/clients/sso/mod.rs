//! SSO service client.
//!
//! Wraps the low-level gRPC clients behind one connection. The gatekeeper
//! itself only calls [`Client::validate_token`]; the sub-clients are exposed
//! for handlers that need other identity-domain operations (login, user
//! lookup, balance) over the same channel.

mod proto;

pub use proto::{
    AuthClient, GetBalanceRequest, GetBalanceResponse, GetUserRequest, GetUserResponse,
    LoginRequest, LoginResponse, RefreshTokenRequest, RefreshTokenResponse, Role,
    TransactionsClient, UserClient, ValidateTokenRequest, ValidateTokenResponse,
};

use std::time::Duration;

use tonic::metadata::MetadataValue;
use tonic::transport::{Channel, ClientTlsConfig, Endpoint};
use tonic::{Code, Request, Status};
use tracing::info;
use warden_errors::{AppError, AppResult};

/// Metadata key carrying the access token.
pub const AUTHORIZATION_HEADER: &str = "authorization";
/// Required bearer scheme prefix, exact case, single space.
pub const BEARER_PREFIX: &str = "Bearer ";

/// SSO client configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub address: String,
    /// Bounds connection setup and each call on the channel.
    pub timeout: Duration,
    /// Plaintext transport when true, TLS with system roots otherwise.
    pub insecure: bool,
}

/// Connected SSO client. Cheap to clone; all clones share one channel.
#[derive(Debug, Clone)]
pub struct Client {
    auth: AuthClient,
    user: UserClient,
    transactions: TransactionsClient,
}

impl Client {
    /// Connects to the SSO service. Setup is bounded by `config.timeout`;
    /// failures are returned without retry, the caller owns any retry policy.
    pub async fn connect(config: &Config) -> AppResult<Self> {
        let address = if config.address.contains("://") {
            config.address.clone()
        } else {
            format!("http://{}", config.address)
        };

        let mut endpoint = Endpoint::from_shared(address)
            .map_err(|e| AppError::validation(format!("invalid sso address: {e}")))?
            .connect_timeout(config.timeout)
            .timeout(config.timeout);

        if !config.insecure {
            endpoint = endpoint
                .tls_config(ClientTlsConfig::new().with_enabled_roots())
                .map_err(|e| AppError::internal(format!("sso tls setup failed: {e}")))?;
        }

        let channel = endpoint.connect().await.map_err(|e| {
            AppError::external_service(format!("failed to connect to sso service: {e}"))
        })?;

        info!(address = %config.address, "sso client connected");

        Ok(Self {
            auth: AuthClient::new(channel.clone()),
            user: UserClient::new(channel.clone()),
            transactions: TransactionsClient::new(channel),
        })
    }

    /// Validates an access token against the SSO service.
    ///
    /// The token is re-issued as outbound `authorization: Bearer <token>`
    /// metadata. Explicit rejections and transport failures come back as
    /// different [`AppError`] variants so callers can log the real cause.
    pub async fn validate_token(&self, access_token: &str) -> AppResult<ValidateTokenResponse> {
        let mut request = Request::new(ValidateTokenRequest::default());
        let header: MetadataValue<_> = format!("{BEARER_PREFIX}{access_token}")
            .parse()
            .map_err(|_| AppError::validation("access token is not valid metadata"))?;
        request.metadata_mut().insert(AUTHORIZATION_HEADER, header);

        let response = self
            .user
            .clone()
            .validate_token(request)
            .await
            .map_err(classify_status)?;

        Ok(response.into_inner())
    }

    /// Low-level Auth client for login/refresh operations.
    pub fn auth(&self) -> AuthClient {
        self.auth.clone()
    }

    /// Low-level User client.
    pub fn user(&self) -> UserClient {
        self.user.clone()
    }

    /// Low-level Transactions client.
    pub fn transactions(&self) -> TransactionsClient {
        self.transactions.clone()
    }

    /// Releases the client. The underlying connection is torn down once the
    /// last clone of the sub-clients is dropped.
    pub fn close(self) {
        info!("sso client closed");
    }
}

fn classify_status(status: Status) -> AppError {
    match status.code() {
        // the sso service rejected the token itself
        Code::Unauthenticated | Code::PermissionDenied | Code::InvalidArgument => {
            AppError::unauthenticated(format!("sso rejected token: {status}"))
        }
        _ => AppError::external_service(format!("sso validate call failed: {status}")),
    }
}
