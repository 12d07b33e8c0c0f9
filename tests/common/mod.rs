#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::http::StatusCode;
use axum::{routing::get, Json, Router};
use gnss_pep::AuthConfig;
use jsonwebtoken::{get_current_timestamp, Algorithm, EncodingKey, Header};
use serde_json::{json, Value};

pub const ISSUER_DOMAIN: &str = "idp.example";
pub const AUDIENCE: &str = "gnss";
pub const KID: &str = "K1";

pub const PRIMARY_KEY_PEM: &str = include_str!("../fixtures/primary_rsa.pem");
pub const PRIMARY_MODULUS: &str = include_str!("../fixtures/primary_rsa.modulus");
pub const SECONDARY_KEY_PEM: &str = include_str!("../fixtures/secondary_rsa.pem");
pub const SECONDARY_MODULUS: &str = include_str!("../fixtures/secondary_rsa.modulus");

pub const JWKS_PATH: &str = "/.well-known/jwks.json";

pub fn jwk(kid: &str, modulus: &str) -> Value {
    json!({
        "kty": "RSA",
        "kid": kid,
        "use": "sig",
        "alg": "RS256",
        "n": modulus,
        "e": "AQAB"
    })
}

pub fn jwks(keys: Vec<Value>) -> Value {
    json!({ "keys": keys })
}

/// Published key set with the primary key under `K1`.
pub fn primary_jwks() -> Value {
    jwks(vec![jwk(KID, PRIMARY_MODULUS)])
}

pub fn claims(permissions: &[&str]) -> Value {
    let now = get_current_timestamp() as i64;
    json!({
        "iss": format!("https://{}/", ISSUER_DOMAIN),
        "sub": "auth0|integration",
        "aud": AUDIENCE,
        "iat": now,
        "exp": now + 3600,
        "azp": "integration-client",
        "scope": "openid",
        "permissions": permissions,
    })
}

pub fn mint(private_key_pem: &str, kid: &str, claims: &Value) -> String {
    let mut header = Header::new(Algorithm::RS256);
    header.kid = Some(kid.to_string());
    let key = EncodingKey::from_rsa_pem(private_key_pem.as_bytes()).expect("fixture key");
    jsonwebtoken::encode(&header, claims, &key).expect("token")
}

pub fn mint_primary(claims: &Value) -> String {
    mint(PRIMARY_KEY_PEM, KID, claims)
}

/// Local JWKS endpoint whose document and hit count tests can inspect.
pub struct JwksServer {
    pub addr: SocketAddr,
    hits: Arc<AtomicUsize>,
}

impl JwksServer {
    pub fn url(&self) -> String {
        format!("http://{}{}", self.addr, JWKS_PATH)
    }

    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }

    /// Gate configuration pointing at this server.
    pub fn config(&self) -> AuthConfig {
        AuthConfig::new(ISSUER_DOMAIN, AUDIENCE)
            .with_jwks_url(self.url())
            .with_fetch_timeout(Duration::from_secs(5))
    }
}

pub async fn serve_jwks(document: Value) -> JwksServer {
    serve_jwks_with(StatusCode::OK, document, Duration::ZERO).await
}

pub async fn serve_jwks_with(status: StatusCode, document: Value, delay: Duration) -> JwksServer {
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = hits.clone();
    let app = Router::new().route(
        JWKS_PATH,
        get(move || {
            let document = document.clone();
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                (status, Json(document))
            }
        }),
    );

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let addr = listener.local_addr().expect("addr");
    tokio::spawn(async move {
        let _ = axum::serve(listener, app.into_make_service()).await;
    });

    JwksServer { addr, hits }
}

/// Address nothing is listening on.
pub async fn unused_addr() -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    listener.local_addr().expect("addr")
}

pub async fn read_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    serde_json::from_slice(&bytes).expect("json body")
}
