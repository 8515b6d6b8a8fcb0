//! Internal token validation service (`auth.AuthValidation`)
//!
//! gRPC on a separate listener (default port 50051) reachable only from
//! inside the cluster. Other services call `ValidateToken` once per request
//! to learn whether an access token is valid and for which user.
//!
//! Every outcome is an OK response; failures are reported in the `error`
//! field so callers never have to interpret transport status codes.

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;
use tokio::net::TcpListener;
use tonic::transport::Server;
use tonic::transport::server::TcpIncoming;
use tonic::{Request, Response, Status};

use auth_token::{TokenService, Verification};

use crate::metrics;

/// Generated client and server for `auth.AuthValidation`.
#[allow(dead_code)]
pub mod proto {
    include!(concat!(env!("OUT_DIR"), "/auth.AuthValidation.rs"));
}

use proto::auth_validation_server::{AuthValidation, AuthValidationServer};

const VALIDATE_TOKEN_ROUTE: &str = "/auth.AuthValidation/ValidateToken";

#[derive(Clone, PartialEq, prost::Message)]
pub struct ValidateTokenRequest {
    #[prost(string, tag = "1")]
    pub token: String,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct ValidateTokenResponse {
    #[prost(bool, tag = "1")]
    pub is_valid: bool,
    /// 0 when `is_valid` is false.
    #[prost(int32, tag = "2")]
    pub user_id: i32,
    /// Empty when valid, otherwise a stable failure code.
    #[prost(string, tag = "3")]
    pub error: String,
}

impl From<Verification> for ValidateTokenResponse {
    fn from(verification: Verification) -> Self {
        match verification {
            Verification::Valid { user_id } => Self {
                is_valid: true,
                user_id,
                error: String::new(),
            },
            Verification::Invalid(failure) => Self {
                is_valid: false,
                user_id: 0,
                error: failure.as_str().to_owned(),
            },
        }
    }
}

/// `AuthValidation` backed by a token service.
#[derive(Clone)]
pub struct ValidationService {
    tokens: Arc<TokenService>,
}

impl ValidationService {
    pub fn new(tokens: Arc<TokenService>) -> Self {
        Self { tokens }
    }
}

#[tonic::async_trait]
impl AuthValidation for ValidationService {
    async fn validate_token(
        &self,
        request: Request<ValidateTokenRequest>,
    ) -> Result<Response<ValidateTokenResponse>, Status> {
        let start = Instant::now();
        let verification = self.tokens.verify(&request.into_inner().token).await;

        metrics::record_validation(
            verification
                .failure()
                .map(|failure| failure.as_str())
                .unwrap_or("valid"),
        );
        metrics::record_request(VALIDATE_TOKEN_ROUTE, 200, start.elapsed().as_secs_f64());

        Ok(Response::new(verification.into()))
    }
}

/// Serve `AuthValidation` on `listener` until `shutdown` completes.
pub async fn serve(
    listener: TcpListener,
    tokens: Arc<TokenService>,
    shutdown: impl Future<Output = ()> + Send,
) -> anyhow::Result<()> {
    let incoming = TcpIncoming::from_listener(listener, true, None)
        .map_err(|e| anyhow::anyhow!("failed to prepare internal listener: {e}"))?;

    Server::builder()
        .add_service(AuthValidationServer::new(ValidationService::new(tokens)))
        .serve_with_incoming_shutdown(incoming, shutdown)
        .await
        .context("internal gRPC server failed")
}
