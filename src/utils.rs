use axum::response::Html;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use tera::{Context, Tera};
use tower_sessions::Session;

use crate::model::User;
use crate::schema::users;

const FLASH_KEY: &str = "_flashes";

pub fn render_template(tera: &Tera, template_name: &str, context: Context) -> Html<String> {
    Html(
        tera.render(template_name, &context)
            .unwrap_or_else(|_| format!("Error rendering template: {}", template_name)),
    )
}

pub async fn set_user_session(
    session: &Session,
    user_id: i32,
    username: &str,
) -> Result<(), tower_sessions::session::Error> {
    session.insert("logged_in", true).await?;
    session.insert("user_id", user_id).await?;
    session.insert("username", username).await?;
    Ok(())
}

pub async fn is_logged_in(session: &Session) -> bool {
    session.get::<i32>("user_id").await.unwrap_or(None).is_some()
}

pub async fn get_current_user_id(session: &Session) -> Option<i32> {
    match session.get::<i32>("user_id").await {
        Ok(user_id) => user_id,
        Err(e) => {
            log::error!("Failed to read user_id from session: {}", e);
            None
        }
    }
}

/// Loads the authenticated user's row, or `None` when the session carries no
/// user or the row has gone away.
pub async fn current_user(conn: &mut SqliteConnection, session: &Session) -> Option<User> {
    let user_id = get_current_user_id(session).await?;

    match users::table.find(user_id).first::<User>(conn).optional() {
        Ok(Some(user)) => Some(user),
        Ok(None) => {
            log::warn!("Session references user {} which no longer exists", user_id);
            None
        }
        Err(e) => {
            log::error!("Failed to load user {}: {}", user_id, e);
            None
        }
    }
}

/// One-shot notice stored in the session and consumed on the next render.
#[derive(Debug, Serialize, Deserialize)]
pub struct FlashMessage {
    pub category: String,
    pub message: String,
}

pub async fn flash(session: &Session, category: &str, message: &str) {
    let mut flashes: Vec<FlashMessage> =
        session.get(FLASH_KEY).await.unwrap_or(None).unwrap_or_default();
    flashes.push(FlashMessage {
        category: category.to_string(),
        message: message.to_string(),
    });

    if let Err(e) = session.insert(FLASH_KEY, flashes).await {
        log::error!("Failed to store flash message: {}", e);
    }
}

pub async fn take_flashes(session: &Session) -> Vec<FlashMessage> {
    match session.remove::<Vec<FlashMessage>>(FLASH_KEY).await {
        Ok(Some(flashes)) => flashes,
        Ok(None) => Vec::new(),
        Err(e) => {
            log::error!("Failed to read flash messages: {}", e);
            Vec::new()
        }
    }
}
