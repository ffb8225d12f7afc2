/// Request Authentication Gate
///
/// Runs once per inbound request and resolves the presented credential to an
/// authenticated identity, or transparently refreshes an expired access
/// token, or proceeds unauthenticated. Never rejects the request itself;
/// handlers that require identity answer 401 when none was established.

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::header::{HeaderName, HeaderValue},
    Error, HttpMessage,
};
use futures::future::LocalBoxFuture;
use std::rc::Rc;
use std::sync::Arc;

use crate::auth::{
    bearer_token, cookie_value, refresh_token_cookie, AuthService, TokenStatus,
    ACCESS_TOKEN_COOKIE, REFRESH_TOKEN_COOKIE,
};

/// Identity established by the gate, read by handlers via request extensions
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub email: String,
    pub role: String,
}

pub struct AuthGate {
    auth: Arc<AuthService>,
}

impl AuthGate {
    pub fn new(auth: Arc<AuthService>) -> Self {
        Self { auth }
    }
}

impl<S, B> Transform<S, ServiceRequest> for AuthGate
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = AuthGateService<S>;
    type Future = std::future::Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        std::future::ready(Ok(AuthGateService {
            service: Rc::new(service),
            auth: self.auth.clone(),
        }))
    }
}

pub struct AuthGateService<S> {
    service: Rc<S>,
    auth: Arc<AuthService>,
}

impl<S, B> Service<ServiceRequest> for AuthGateService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);
        let auth = Arc::clone(&self.auth);

        Box::pin(async move {
            // Bearer header first, access token cookie as fallback
            let access_token = bearer_token(req.request())
                .or_else(|| cookie_value(req.request(), ACCESS_TOKEN_COOKIE));

            let Some(token) = access_token else {
                return service.call(req).await;
            };

            // A blacklisted token means explicit logout, not mere expiry;
            // no refresh attempt.
            if auth.blacklist().is_blacklisted(&token) {
                tracing::debug!("Blacklisted access token presented");
                return service.call(req).await;
            }

            match auth.codec().decode(&token) {
                TokenStatus::Valid(claims) => {
                    req.extensions_mut().insert(AuthenticatedUser {
                        email: claims.sub,
                        role: claims.role,
                    });
                    service.call(req).await
                }
                TokenStatus::Expired => {
                    let Some(refresh_token) = cookie_value(req.request(), REFRESH_TOKEN_COOKIE)
                    else {
                        return service.call(req).await;
                    };

                    // Exactly one silent refresh attempt; any failure
                    // degrades to an unauthenticated request.
                    match auth.refresh(&refresh_token).await {
                        Ok(tokens) => {
                            if let TokenStatus::Valid(claims) =
                                auth.codec().decode(&tokens.access_token)
                            {
                                tracing::debug!(email = %claims.sub, "Silent refresh succeeded");
                                req.extensions_mut().insert(AuthenticatedUser {
                                    email: claims.sub,
                                    role: claims.role,
                                });
                            }

                            let mut res = service.call(req).await?;
                            match HeaderValue::from_str(&tokens.access_token) {
                                Ok(value) => {
                                    res.headers_mut().insert(
                                        HeaderName::from_static("x-new-access-token"),
                                        value,
                                    );
                                }
                                Err(e) => {
                                    tracing::error!(error = %e, "New access token not header-safe");
                                }
                            }
                            if let Err(e) = res
                                .response_mut()
                                .add_cookie(&refresh_token_cookie(&tokens.refresh_token))
                            {
                                tracing::error!(error = %e, "Failed to attach rotated refresh cookie");
                            }
                            Ok(res)
                        }
                        Err(e) => {
                            tracing::debug!(error = %e, "Silent refresh failed");
                            service.call(req).await
                        }
                    }
                }
                TokenStatus::Invalid => {
                    tracing::debug!("Invalid access token presented");
                    service.call(req).await
                }
            }
        })
    }
}
