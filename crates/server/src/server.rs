use axum::{
    Router,
    extract::Request,
    http::StatusCode,
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
};
use axum_extra::headers::{Error as HeaderError, Header, HeaderMapExt};

use std::sync::Arc;

use crate::{accounts, requests, transfers};
use engine::Engine;

static USER_ID_HEADER: axum::http::HeaderName = axum::http::HeaderName::from_static("x-user-id");

#[derive(Clone)]
pub struct ServerState {
    pub engine: Arc<Engine>,
    /// Tokens granted to an account when it is opened.
    pub starting_grant: i64,
}

impl ServerState {
    pub fn new(engine: Engine, starting_grant: i64) -> Self {
        Self {
            engine: Arc::new(engine),
            starting_grant,
        }
    }
}

/// The user on whose behalf a request runs.
///
/// Authentication happens upstream; the gateway forwards the verified id in
/// the "x-user-id" header.
#[derive(Clone, Debug)]
pub struct ActingUser(pub String);

#[derive(Debug)]
struct UserIdHeader(String);

impl Header for UserIdHeader {
    fn name() -> &'static axum::http::HeaderName {
        &USER_ID_HEADER
    }

    fn decode<'i, I>(values: &mut I) -> Result<Self, HeaderError>
    where
        Self: Sized,
        I: Iterator<Item = &'i axum::http::HeaderValue>,
    {
        let value = values.next().ok_or_else(HeaderError::invalid)?;
        let Ok(value) = value.to_str() else {
            return Err(HeaderError::invalid());
        };
        let value = value.trim();
        if value.is_empty() {
            return Err(HeaderError::invalid());
        }

        Ok(UserIdHeader(value.to_string()))
    }

    fn encode<E: Extend<axum::http::HeaderValue>>(&self, values: &mut E) {
        match axum::http::HeaderValue::from_str(&self.0) {
            Ok(value) => values.extend(std::iter::once(value)),
            Err(_) => tracing::error!("failed to encode x-user-id header"),
        }
    }
}

async fn identify(mut request: Request, next: Next) -> Result<Response, StatusCode> {
    let Some(UserIdHeader(user_id)) = request.headers().typed_get::<UserIdHeader>() else {
        return Err(StatusCode::UNAUTHORIZED);
    };

    request.extensions_mut().insert(ActingUser(user_id));
    Ok(next.run(request).await)
}

/// All routes, behind the `x-user-id` identification layer.
pub fn router(state: ServerState) -> Router {
    Router::new()
        .route("/accounts", post(accounts::account_new))
        .route("/accounts/me", get(accounts::me))
        .route("/transfers", post(transfers::transfer_new))
        .route("/requests", post(requests::request_new))
        .route("/requests/incoming", get(requests::incoming))
        .route("/requests/outgoing", get(requests::outgoing))
        .route(
            "/requests/{id}",
            get(requests::get).put(requests::update_status),
        )
        .route_layer(middleware::from_fn(identify))
        .with_state(state)
}

pub async fn run_with_listener(
    state: ServerState,
    listener: tokio::net::TcpListener,
) -> Result<(), std::io::Error> {
    let addr = listener.local_addr()?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, router(state)).await
}
