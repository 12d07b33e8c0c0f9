use axum::extract::Request;
use axum::response::{IntoResponse, Response};
use std::sync::Arc;
use tower::Layer;
use tower::Service;

use super::gate::AuthorizationGate;

/// Middleware layer that runs the authorization gate for one permission.
///
/// On success the verified [`DecodedPayload`](crate::DecodedPayload) is
/// inserted into the request extensions; on failure the JSON error response
/// is returned and the inner service is never called.
#[derive(Clone)]
pub struct RequirePermission {
    gate: AuthorizationGate,
    permission: Arc<str>,
}

impl RequirePermission {
    pub fn new(gate: AuthorizationGate, permission: impl Into<String>) -> Self {
        Self {
            gate,
            permission: Arc::from(permission.into()),
        }
    }

    pub fn permission(&self) -> &str {
        &self.permission
    }
}

impl<S> Layer<S> for RequirePermission {
    type Service = RequirePermissionMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RequirePermissionMiddleware {
            inner,
            gate: self.gate.clone(),
            permission: self.permission.clone(),
        }
    }
}

#[derive(Clone)]
pub struct RequirePermissionMiddleware<S> {
    inner: S,
    gate: AuthorizationGate,
    permission: Arc<str>,
}

impl<S> Service<Request> for RequirePermissionMiddleware<S>
where
    S: Service<Request, Response = Response> + Clone + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = Response;
    type Error = S::Error;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(
        &mut self,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut request: Request) -> Self::Future {
        // Keep the service that was polled ready; leave a fresh clone behind.
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);
        let gate = self.gate.clone();
        let permission = self.permission.clone();

        Box::pin(async move {
            let authorized = gate.authorize(request.headers(), &permission).await;
            match authorized {
                Ok(payload) => {
                    request.extensions_mut().insert(payload);
                    inner.call(request).await
                }
                Err(err) => Ok(err.into_response()),
            }
        })
    }
}
