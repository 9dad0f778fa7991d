use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{patch, post},
    Json, Router,
};
use sqlx::pool::PoolConnection;
use sqlx::Postgres;
use tracing::{error, instrument};

use crate::{
    accounts::{
        dto::{
            CreateUserRequest, CreatedUser, LoginRequest, UserId, UserPatch, VerifiedEmail,
            VerifyEmailRequest,
        },
        errors::AccountError,
        repo::PgUserStore,
    },
    state::AppState,
};

type Rejection = (StatusCode, String);

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/users", post(create_user))
        .route("/users/login", post(login))
        .route("/users/verify-email", post(verify_email))
        .route("/users/:id", patch(update_user).delete(delete_user))
}

fn reject(e: AccountError) -> Rejection {
    (e.status(), e.to_string())
}

async fn connection(state: &AppState) -> Result<PoolConnection<Postgres>, Rejection> {
    state.db.acquire().await.map_err(|e| {
        error!(error = %e, "acquire connection failed");
        (StatusCode::SERVICE_UNAVAILABLE, "database unavailable".into())
    })
}

#[instrument(skip(state, payload))]
pub async fn create_user(
    State(state): State<AppState>,
    Json(payload): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<CreatedUser>), Rejection> {
    let mut conn = connection(&state).await?;
    let mut store = PgUserStore::new(&mut conn);
    let created = state
        .accounts
        .create(&mut store, &payload.name, &payload.email, &payload.password)
        .await
        .map_err(reject)?;
    Ok((StatusCode::CREATED, Json(created)))
}

#[instrument(skip(state, payload))]
pub async fn update_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<UserPatch>,
) -> Result<Json<UserId>, Rejection> {
    let mut conn = connection(&state).await?;
    let mut store = PgUserStore::new(&mut conn);
    let user = state
        .accounts
        .update(&mut store, &id, payload)
        .await
        .map_err(reject)?;
    Ok(Json(user))
}

#[instrument(skip(state))]
pub async fn delete_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<UserId>, Rejection> {
    let mut conn = connection(&state).await?;
    let mut store = PgUserStore::new(&mut conn);
    let user = state
        .accounts
        .delete(&mut store, &id)
        .await
        .map_err(reject)?;
    Ok(Json(user))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<UserId>, Rejection> {
    let mut conn = connection(&state).await?;
    let mut store = PgUserStore::new(&mut conn);
    let user = state
        .accounts
        .login(&mut store, &payload.name, &payload.password)
        .await
        .map_err(reject)?;
    Ok(Json(user))
}

#[instrument(skip(state, payload))]
pub async fn verify_email(
    State(state): State<AppState>,
    Json(payload): Json<VerifyEmailRequest>,
) -> Result<Json<VerifiedEmail>, Rejection> {
    let mut conn = connection(&state).await?;
    let mut store = PgUserStore::new(&mut conn);
    let verified = state
        .accounts
        .verify_email(&mut store, &payload.name, &payload.email)
        .await
        .map_err(reject)?;
    Ok(Json(verified))
}
