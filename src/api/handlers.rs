use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap},
    response::{Html, IntoResponse, Redirect, Response},
    Form,
};
use serde::Deserialize;
use zeroize::Zeroizing;

use super::{pages, session, AppState};
use crate::errors::AppError;
use crate::workflow::SubmissionForm;

pub async fn index(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Html<String> {
    pages::index(state.is_admin(&headers))
}

pub async fn submit(
    State(state): State<Arc<AppState>>,
    Form(form): Form<SubmissionForm>,
) -> Result<Redirect, AppError> {
    state.workflow.submit(form).await?;
    Ok(Redirect::to("/status"))
}

pub async fn status(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Html<String>, AppError> {
    let requests = state.workflow.list().await?;
    Ok(pages::status(&requests, state.is_admin(&headers)))
}

pub async fn approve(
    State(state): State<Arc<AppState>>,
    Path(token): Path<String>,
) -> Result<Html<String>, AppError> {
    let request = state.workflow.approve(&token).await?.request;
    Ok(pages::message(
        "Request Approved",
        &format!(
            "Request ID {} has been approved. The IT department has been notified.",
            request.id
        ),
    ))
}

pub async fn disapprove(
    State(state): State<Arc<AppState>>,
    Path(token): Path<String>,
) -> Result<Html<String>, AppError> {
    let request = state.workflow.disapprove(&token).await?;
    Ok(pages::message(
        "Request Disapproved",
        &format!("Request ID {} has been disapproved.", request.id),
    ))
}

/// The id arrives as text; anything that is not a number matches no request.
pub async fn delete_request(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Redirect, AppError> {
    match id.parse::<i64>() {
        Ok(id) => {
            state.workflow.delete(id).await?;
        }
        Err(_) => tracing::debug!(%id, "delete with non-numeric id ignored"),
    }
    Ok(Redirect::to("/status"))
}

pub async fn clear_all(State(state): State<Arc<AppState>>) -> Result<Redirect, AppError> {
    state.workflow.clear_all().await?;
    Ok(Redirect::to("/status"))
}

#[derive(Deserialize)]
pub struct LoginQuery {
    error: Option<String>,
}

pub async fn login_page(Query(q): Query<LoginQuery>) -> Html<String> {
    pages::login(q.error.is_some())
}

#[derive(Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    username: String,
    #[serde(default)]
    password: String,
}

pub async fn login(
    State(state): State<Arc<AppState>>,
    Form(form): Form<LoginForm>,
) -> Result<Response, AppError> {
    let failed = Redirect::to("/login?error=1").into_response();

    let (Some(expected_user), Some(hash)) = (
        state.config.admin_username.clone(),
        state.config.admin_password_hash.clone(),
    ) else {
        tracing::warn!("admin login attempted but ADMIN_USERNAME/ADMIN_PASSWORD_HASH are unset");
        return Ok(failed);
    };

    let username = form.username.clone();
    let password = Zeroizing::new(form.password);
    // argon2 verification is CPU-bound
    let ok = tokio::task::spawn_blocking(move || {
        session::credentials_match(&expected_user, &hash, &username, &password)
    })
    .await
    .map_err(anyhow::Error::from)?;

    if !ok {
        tracing::warn!(username = %form.username, "admin login failed");
        return Ok(failed);
    }

    let token = state.sessions.issue(&form.username)?;
    tracing::info!(username = %form.username, "admin logged in");
    Ok((
        [(header::SET_COOKIE, state.sessions.set_cookie(&token))],
        Redirect::to("/status"),
    )
        .into_response())
}

pub async fn logout(State(state): State<Arc<AppState>>) -> Response {
    (
        [(header::SET_COOKIE, state.sessions.clear_cookie())],
        Redirect::to("/"),
    )
        .into_response()
}
