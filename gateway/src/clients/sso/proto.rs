//! Wire bindings for the SSO service.
//!
//! The message structs and thin clients below mirror `sso/sso.proto` from
//! the SSO repository. They are maintained by hand on top of
//! [`tonic::client::Grpc`] so this crate builds without the proto tree or a
//! protoc installation.

use http::uri::PathAndQuery;
use tonic::client::Grpc;
use tonic::codec::ProstCodec;
use tonic::transport::Channel;
use tonic::{Request, Response, Status};

/// User role classification assigned by the SSO service.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum Role {
    Unspecified = 0,
    User = 1,
    Moderator = 2,
    Admin = 3,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct LoginRequest {
    #[prost(string, tag = "1")]
    pub username: String,
    #[prost(string, tag = "2")]
    pub password: String,
    #[prost(int32, tag = "3")]
    pub app_id: i32,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct LoginResponse {
    #[prost(string, tag = "1")]
    pub access_token: String,
    #[prost(string, tag = "2")]
    pub refresh_token: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RefreshTokenRequest {
    #[prost(string, tag = "1")]
    pub refresh_token: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RefreshTokenResponse {
    #[prost(string, tag = "1")]
    pub access_token: String,
    #[prost(string, tag = "2")]
    pub refresh_token: String,
}

/// The token travels in the `authorization` metadata, not in the body.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ValidateTokenRequest {}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ValidateTokenResponse {
    #[prost(int64, tag = "1")]
    pub user_id: i64,
    #[prost(string, tag = "2")]
    pub username: String,
    #[prost(string, tag = "3")]
    pub email: String,
    #[prost(string, tag = "4")]
    pub photo_url: String,
    #[prost(enumeration = "Role", tag = "5")]
    pub role: i32,
    #[prost(int32, tag = "6")]
    pub app_id: i32,
    #[prost(int64, tag = "7")]
    pub balance: i64,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GetUserRequest {
    #[prost(int64, tag = "1")]
    pub user_id: i64,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GetUserResponse {
    #[prost(int64, tag = "1")]
    pub user_id: i64,
    #[prost(string, tag = "2")]
    pub username: String,
    #[prost(string, tag = "3")]
    pub email: String,
    #[prost(string, tag = "4")]
    pub photo_url: String,
    #[prost(enumeration = "Role", tag = "5")]
    pub role: i32,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GetBalanceRequest {
    #[prost(int64, tag = "1")]
    pub user_id: i64,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GetBalanceResponse {
    #[prost(int64, tag = "1")]
    pub balance: i64,
}

async fn ready(grpc: &mut Grpc<Channel>) -> Result<(), Status> {
    grpc.ready()
        .await
        .map_err(|e| Status::unavailable(format!("sso service is not ready: {e}")))
}

/// Client for the SSO `Auth` service (credential-based authentication).
#[derive(Debug, Clone)]
pub struct AuthClient {
    inner: Grpc<Channel>,
}

impl AuthClient {
    pub fn new(channel: Channel) -> Self {
        Self {
            inner: Grpc::new(channel),
        }
    }

    pub async fn login(
        &mut self,
        request: Request<LoginRequest>,
    ) -> Result<Response<LoginResponse>, Status> {
        ready(&mut self.inner).await?;
        let codec: ProstCodec<LoginRequest, LoginResponse> = ProstCodec::default();
        self.inner
            .unary(request, PathAndQuery::from_static("/sso.Auth/Login"), codec)
            .await
    }

    pub async fn refresh_token(
        &mut self,
        request: Request<RefreshTokenRequest>,
    ) -> Result<Response<RefreshTokenResponse>, Status> {
        ready(&mut self.inner).await?;
        let codec: ProstCodec<RefreshTokenRequest, RefreshTokenResponse> = ProstCodec::default();
        self.inner
            .unary(
                request,
                PathAndQuery::from_static("/sso.Auth/RefreshToken"),
                codec,
            )
            .await
    }
}

/// Client for the SSO `User` service (token validation and user lookup).
#[derive(Debug, Clone)]
pub struct UserClient {
    inner: Grpc<Channel>,
}

impl UserClient {
    pub fn new(channel: Channel) -> Self {
        Self {
            inner: Grpc::new(channel),
        }
    }

    pub async fn validate_token(
        &mut self,
        request: Request<ValidateTokenRequest>,
    ) -> Result<Response<ValidateTokenResponse>, Status> {
        ready(&mut self.inner).await?;
        let codec: ProstCodec<ValidateTokenRequest, ValidateTokenResponse> = ProstCodec::default();
        self.inner
            .unary(
                request,
                PathAndQuery::from_static("/sso.User/ValidateToken"),
                codec,
            )
            .await
    }

    pub async fn get_user(
        &mut self,
        request: Request<GetUserRequest>,
    ) -> Result<Response<GetUserResponse>, Status> {
        ready(&mut self.inner).await?;
        let codec: ProstCodec<GetUserRequest, GetUserResponse> = ProstCodec::default();
        self.inner
            .unary(
                request,
                PathAndQuery::from_static("/sso.User/GetUser"),
                codec,
            )
            .await
    }
}

/// Client for the SSO `Transactions` service (balance operations).
#[derive(Debug, Clone)]
pub struct TransactionsClient {
    inner: Grpc<Channel>,
}

impl TransactionsClient {
    pub fn new(channel: Channel) -> Self {
        Self {
            inner: Grpc::new(channel),
        }
    }

    pub async fn get_balance(
        &mut self,
        request: Request<GetBalanceRequest>,
    ) -> Result<Response<GetBalanceResponse>, Status> {
        ready(&mut self.inner).await?;
        let codec: ProstCodec<GetBalanceRequest, GetBalanceResponse> = ProstCodec::default();
        self.inner
            .unary(
                request,
                PathAndQuery::from_static("/sso.Transactions/GetBalance"),
                codec,
            )
            .await
    }
}
