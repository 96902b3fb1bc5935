//! HTTP handlers for the sign-in flow.

use crate::error::ApiError;
use crate::state::AppState;
use axum::extract::{Query, State};
use axum::response::Redirect;
use axum::routing::{get, post};
use axum::{Json, Router};
use cadence_identity_session::{CallbackParams, MemorySessionStore};
use serde::Serialize;
use tower_http::trace::TraceLayer;
use tower_sessions::{Session, SessionManagerLayer};

#[derive(Debug, Serialize)]
pub struct CurrentUser {
    pub id: u64,
    pub name: String,
    pub email: String,
}

#[derive(Debug, Serialize)]
pub struct LogoutResponse {
    pub logout_url: String,
}

pub fn app(state: AppState, sessions: SessionManagerLayer<MemorySessionStore>) -> Router {
    Router::new()
        .route("/login", get(login))
        .route("/callback", get(callback))
        .route("/me", get(me))
        .route("/logout", post(logout))
        .route("/ping", get(ping))
        .layer(sessions)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn login(State(state): State<AppState>, session: Session) -> Result<Redirect, ApiError> {
    let url = state.sessions.begin_login(&session).await?;
    Ok(Redirect::to(&url))
}

async fn callback(
    State(state): State<AppState>,
    session: Session,
    Query(params): Query<CallbackParams>,
) -> Result<Redirect, ApiError> {
    state.sessions.complete_callback(&session, params).await?;
    Ok(Redirect::to(&state.frontend_url))
}

async fn me(State(state): State<AppState>, session: Session) -> Result<Json<CurrentUser>, ApiError> {
    let user = state.authenticator.current_user(&session).await?;
    Ok(Json(CurrentUser {
        id: user.id,
        name: user.display_name,
        email: user.email,
    }))
}

async fn logout(
    State(state): State<AppState>,
    session: Session,
) -> Result<Json<LogoutResponse>, ApiError> {
    let logout_url = state.sessions.logout(&session).await?;
    Ok(Json(LogoutResponse { logout_url }))
}

async fn ping() -> &'static str {
    "pong"
}
