use axum::{
    extract::{Form, State},
    response::{IntoResponse, Redirect, Response},
    routing::get,
    Router,
};
use bcrypt::verify;
use diesel::prelude::*;
use tera::Context;
use tower_sessions::Session;

use crate::{
    auth::{LoginError, LoginForm},
    model::User,
    schema::users,
    utils::{flash, is_logged_in, render_template, set_user_session, take_flashes},
    AppState,
};

pub async fn show_login_form(
    State(state): State<AppState>,
    session: Session,
) -> Result<Response, LoginError> {
    if is_logged_in(&session).await {
        return Ok(Redirect::to("/dashboard").into_response());
    }

    let mut context = Context::new();
    context.insert("title", "Login");
    context.insert("flashes", &take_flashes(&session).await);
    Ok(render_template(&state.templates, "login.html", context).into_response())
}

#[axum::debug_handler]
pub async fn handle_login(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<LoginForm>,
) -> Result<Response, LoginError> {
    let mut conn = state.pool.get()?;

    let user = users::table
        .filter(users::username.eq(&form.username))
        .first::<User>(&mut conn)
        .optional()?;

    if let Some(user) = user {
        if verify(&form.password, &user.password_hash)? {
            set_user_session(&session, user.id, &user.username).await?;
            return Ok(Redirect::to("/dashboard").into_response());
        }
    }

    log::warn!("Failed login attempt for username '{}'", form.username);
    flash(&session, "error", "Invalid username or password").await;

    let mut context = Context::new();
    context.insert("title", "Login");
    context.insert("flashes", &take_flashes(&session).await);
    Ok(render_template(&state.templates, "login.html", context).into_response())
}

#[axum::debug_handler]
pub async fn logout(session: Session) -> Result<Redirect, LoginError> {
    if !is_logged_in(&session).await {
        return Ok(Redirect::to("/login"));
    }

    session.flush().await?;
    flash(&session, "message", "You have been logged out.").await;
    Ok(Redirect::to("/login"))
}

pub fn auth_router(state: AppState) -> Router {
    Router::new()
        .route("/login", get(show_login_form).post(handle_login))
        .route("/logout", get(logout))
        .with_state(state)
}
