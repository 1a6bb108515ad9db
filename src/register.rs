use axum::{
    extract::{Form, State},
    response::{IntoResponse, Redirect, Response},
    routing::get,
    Router,
};
use bcrypt::{hash, DEFAULT_COST};
use diesel::dsl::exists;
use diesel::prelude::*;
use tera::Context;
use tower_sessions::Session;
use validator::Validate;

use crate::{
    auth::{SignupError, SignupForm},
    model::NewUser,
    schema::users,
    utils::{flash, is_logged_in, render_template, take_flashes},
    AppState,
};

pub async fn show_signup_form(
    State(state): State<AppState>,
    session: Session,
) -> Result<Response, SignupError> {
    if is_logged_in(&session).await {
        return Ok(Redirect::to("/dashboard").into_response());
    }

    Ok(signup_page(&state, &session).await)
}

#[axum::debug_handler]
pub async fn handle_signup(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<SignupForm>,
) -> Result<Response, SignupError> {
    if is_logged_in(&session).await {
        return Ok(Redirect::to("/dashboard").into_response());
    }

    if let Err(errors) = form.validate() {
        for (_, field_errors) in errors.field_errors() {
            for error in field_errors {
                if let Some(message) = &error.message {
                    flash(&session, "error", message).await;
                }
            }
        }
        return Ok(signup_page(&state, &session).await);
    }

    let mut conn = state.pool.get()?;

    let username_taken: bool = diesel::select(exists(
        users::table.filter(users::username.eq(&form.username)),
    ))
    .get_result(&mut conn)?;
    if username_taken {
        log::warn!("Signup attempt with existing username '{}'", form.username);
        flash(&session, "error", "Username already taken").await;
        return Ok(signup_page(&state, &session).await);
    }

    let email_taken: bool =
        diesel::select(exists(users::table.filter(users::email.eq(&form.email))))
            .get_result(&mut conn)?;
    if email_taken {
        log::warn!("Signup attempt with existing email '{}'", form.email);
        flash(&session, "error", "Email already registered").await;
        return Ok(signup_page(&state, &session).await);
    }

    let password_hash = hash(&form.password, DEFAULT_COST)?;

    diesel::insert_into(users::table)
        .values(&NewUser {
            username: &form.username,
            email: &form.email,
            password_hash: &password_hash,
        })
        .execute(&mut conn)?;

    log::info!("New user registered: {}", form.username);
    flash(&session, "message", "Signup successful! Please log in.").await;
    Ok(Redirect::to("/login").into_response())
}

async fn signup_page(state: &AppState, session: &Session) -> Response {
    let mut context = Context::new();
    context.insert("title", "Sign up");
    context.insert("flashes", &take_flashes(session).await);
    render_template(&state.templates, "signup.html", context).into_response()
}

pub fn auth_router(state: AppState) -> Router {
    Router::new()
        .route("/signup", get(show_signup_form).post(handle_signup))
        .with_state(state)
}
