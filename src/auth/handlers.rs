use std::sync::Arc;

use axum::{
    extract::{FromRef, Path, Query, State},
    http::header,
    response::{IntoResponse, Redirect},
    routing::get,
    Json, Router,
};
use tracing::{info, instrument, warn};

use crate::{
    auth::{
        dto::{CallbackQuery, HomeResponse, PublicUser},
        services::find_or_create_user,
        session::{AuthUser, Session, SessionKeys},
    },
    error::AppError,
    oauth::{Provider, SocialProvider},
    state::AppState,
};

pub fn social_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/:provider/redirect", get(redirect))
        .route("/auth/:provider/callback", get(callback))
}

pub fn session_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/sign_out", get(sign_out))
        .route("/", get(home))
        .route("/me", get(get_me))
}

fn resolve_provider(state: &AppState, name: &str) -> Result<Arc<dyn SocialProvider>, AppError> {
    let provider: Provider = name.parse()?;
    state
        .providers
        .get(provider)
        .ok_or(AppError::ProviderNotEnabled(provider))
}

#[instrument(skip(state))]
pub async fn redirect(
    State(state): State<AppState>,
    Path(provider): Path<String>,
) -> Result<Redirect, AppError> {
    let provider = resolve_provider(&state, &provider)?;
    Ok(Redirect::to(&provider.authorization_url()))
}

#[instrument(skip(state, query))]
pub async fn callback(
    State(state): State<AppState>,
    Path(provider): Path<String>,
    Query(query): Query<CallbackQuery>,
) -> Result<impl IntoResponse, AppError> {
    let provider = resolve_provider(&state, &provider)?;

    let code = match query.code.filter(|c| !c.is_empty()) {
        Some(code) => code,
        None => {
            warn!(error = ?query.error, "callback without authorization code");
            return Err(AppError::MissingCode);
        }
    };

    let profile = provider.exchange_code(&code).await?;
    let resolved = find_or_create_user(state.users.as_ref(), &profile).await?;

    let keys = SessionKeys::from_ref(&state);
    let cookie = keys.login_cookie(resolved.user.id)?;

    info!(
        user_id = %resolved.user.id,
        provider = %provider.provider(),
        created = resolved.created,
        "user signed in"
    );
    Ok(([(header::SET_COOKIE, cookie)], Redirect::to("/")))
}

#[instrument(skip(state))]
pub async fn sign_out(State(state): State<AppState>, session: Session) -> impl IntoResponse {
    if let Some(user_id) = session.user_id {
        info!(%user_id, "user signed out");
    }
    let keys = SessionKeys::from_ref(&state);
    ([(header::SET_COOKIE, keys.logout_cookie())], Redirect::to("/"))
}

#[instrument(skip(state))]
pub async fn home(
    State(state): State<AppState>,
    session: Session,
) -> Result<Json<HomeResponse>, AppError> {
    let user = match session.user_id {
        Some(id) => state.users.find_by_id(id).await?,
        None => None,
    };
    Ok(Json(HomeResponse {
        authenticated: user.is_some(),
        user: user.map(PublicUser::from),
    }))
}

#[instrument(skip(state))]
pub async fn get_me(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<PublicUser>, AppError> {
    let user = state.users.find_by_id(user_id).await?.ok_or_else(|| {
        warn!(%user_id, "session refers to a missing user");
        AppError::Unauthorized
    })?;
    Ok(Json(user.into()))
}
