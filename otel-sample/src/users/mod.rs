//! The users resource: one table, three routes.

mod dto;
pub mod entity;
mod handlers;

pub use dto::NewUser;
pub use entity::Model as User;
pub use handlers::{create_user, get_user, list_users};

use sea_orm::{ConnectionTrait, Schema};

use crate::database::{Db, DbError};
use crate::router::Router;

pub fn routes() -> Router {
    Router::new()
        .get("/users", list_users)
        .get("/users/:id", get_user)
        .post("/users", create_user)
}

/// Creates the `users` table if it does not exist yet.
pub async fn create_table(db: &Db) -> Result<(), DbError> {
    let backend = db.backend();
    let mut stmt = Schema::new(backend).create_table_from_entity(entity::Entity);
    stmt.if_not_exists();

    db.conn().execute(backend.build(&stmt)).await?;
    Ok(())
}
