//! Typed per-call authentication context.
//!
//! On successful authentication the interceptor binds the verified identity
//! and the raw access token into the request extensions under their own
//! types; handlers read them back through the accessors here. Two separate
//! entries because later stages may need to forward the original token to
//! other backend services without re-parsing transport metadata.

use tonic::Request;

use crate::clients::sso::Role;

/// Identity attributes returned by a successful token validation. Built
/// fresh per call and discarded with the request.
#[derive(Debug, Clone, PartialEq)]
pub struct VerifiedIdentity {
    pub user_id: i64,
    pub username: String,
    pub email: String,
    pub photo_url: String,
    pub role: Role,
    pub app_id: i32,
    pub balance: i64,
}

/// Raw bearer token exactly as the caller presented it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessToken(pub String);

impl AccessToken {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Returns the verified identity bound to this call, if authentication ran.
pub fn identity<T>(request: &Request<T>) -> Option<&VerifiedIdentity> {
    request.extensions().get::<VerifiedIdentity>()
}

/// Like [`identity`], for handlers only reachable behind the auth
/// interceptor. Absence is a wiring defect, not a runtime condition.
///
/// # Panics
///
/// Panics when no identity is bound to the request.
pub fn must_identity<T>(request: &Request<T>) -> &VerifiedIdentity {
    identity(request).expect("verified identity missing from request: auth interceptor did not run")
}

/// Returns the raw access token bound to this call, if authentication ran.
pub fn access_token<T>(request: &Request<T>) -> Option<&str> {
    request
        .extensions()
        .get::<AccessToken>()
        .map(AccessToken::as_str)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_identity() -> VerifiedIdentity {
        VerifiedIdentity {
            user_id: 7,
            username: "alice".to_string(),
            email: "alice@example.com".to_string(),
            photo_url: String::new(),
            role: Role::User,
            app_id: 1,
            balance: 100,
        }
    }

    #[test]
    fn accessors_read_back_bound_context() {
        let mut request = Request::new(());
        request.extensions_mut().insert(sample_identity());
        request
            .extensions_mut()
            .insert(AccessToken("tok1".to_string()));

        assert_eq!(identity(&request), Some(&sample_identity()));
        assert_eq!(must_identity(&request).username, "alice");
        assert_eq!(access_token(&request), Some("tok1"));
    }

    #[test]
    fn accessors_report_absence() {
        let request = Request::new(());
        assert!(identity(&request).is_none());
        assert!(access_token(&request).is_none());
    }

    #[test]
    #[should_panic(expected = "auth interceptor did not run")]
    fn must_identity_panics_when_absent() {
        let request = Request::new(());
        let _ = must_identity(&request);
    }
}
