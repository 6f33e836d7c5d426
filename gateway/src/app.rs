//! Application supervisor. Wires the rate limiter, the SSO client and the
//! interceptor chain from configuration, with bounded startup retries for
//! the external dependency.

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};
use warden_bootstrap::{RetryConfig, with_retry_optional};
use warden_config::AppConfig;
use warden_errors::{AppError, AppResult};
use warden_ratelimiter::TokenBucket;

use crate::clients::sso;
use crate::interceptor::AuthInterceptor;
use crate::interceptor::chain::InterceptorChain;

pub struct App {
    chain: InterceptorChain,
    sso: Option<sso::Client>,
}

impl App {
    /// Builds the full request pipeline. Connecting to SSO is retried with
    /// a linearly growing delay; if every attempt fails the service comes up
    /// without authentication unless `sso.required` is set.
    pub async fn build(config: &AppConfig) -> AppResult<Self> {
        let limiter = if config.rate_limit.enabled {
            let limiter_config = warden_ratelimiter::Config {
                rate: config.rate_limit.rate,
                capacity: config.rate_limit.capacity,
                cleanup_interval: Duration::from_secs(config.rate_limit.cleanup_interval_secs),
            }
            .normalized();
            info!(
                rate = limiter_config.rate,
                capacity = limiter_config.capacity,
                "rate limiter enabled"
            );
            Some(Arc::new(TokenBucket::new(limiter_config)))
        } else {
            info!("rate limiter disabled");
            None
        };

        let sso_config = sso::Config {
            address: config.sso.address.clone(),
            timeout: config.sso.timeout(),
            insecure: config.sso.insecure,
        };
        let retry = RetryConfig::linear(config.sso.retries_count, Duration::from_secs(1));
        let sso = with_retry_optional(&retry, "sso connect", || sso::Client::connect(&sso_config))
            .await;

        if sso.is_none() && config.sso.required {
            return Err(AppError::external_service(format!(
                "sso service unavailable at {} and marked required",
                config.sso.address
            )));
        }

        let chain = match &sso {
            Some(client) => {
                let interceptor = AuthInterceptor::new(Arc::new(client.clone()), limiter)
                    .with_public_methods(config.public_methods.iter().cloned());
                InterceptorChain::new().with(Arc::new(interceptor))
            }
            None => {
                warn!("auth interceptor disabled - sso service not available");
                InterceptorChain::new()
            }
        };

        Ok(Self { chain, sso })
    }

    /// The interceptor pipeline every inbound call is dispatched through.
    pub fn chain(&self) -> &InterceptorChain {
        &self.chain
    }

    /// Releases held resources. The rate limiter's sweeper stops when the
    /// chain holding it is dropped.
    pub fn stop(self) {
        if let Some(client) = self.sso {
            client.close();
        }
        info!("application stopped");
    }
}
