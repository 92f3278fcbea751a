use http::StatusCode;
use sea_orm::{ActiveModelTrait, EntityTrait, QueryOrder};

use crate::database::{Db, DbError};
use crate::error::{Error, Result};
use crate::extract::{Json, Path};

use super::dto::NewUser;
use super::entity::{Column, Entity as User, Model};

const USER_NOT_FOUND: &str = "user not found";

/// `GET /users`
pub async fn list_users(db: Db) -> Result<Json<Vec<Model>>> {
    let users = User::find()
        .order_by_asc(Column::Id)
        .all(db.conn())
        .await
        .map_err(DbError)?;
    Ok(Json(users))
}

/// `GET /users/:id`
///
/// An id that is not an integer cannot name a stored user, so it is a 404
/// like any other unknown id.
pub async fn get_user(db: Db, id: Path<String>) -> Result<Json<Model>> {
    let id: i32 = id
        .into_inner()
        .parse()
        .map_err(|_| Error::not_found(USER_NOT_FOUND))?;

    let user = User::find_by_id(id)
        .one(db.conn())
        .await
        .map_err(DbError)?
        .ok_or_else(|| Error::not_found(USER_NOT_FOUND))?;
    Ok(Json(user))
}

/// `POST /users`
pub async fn create_user(db: Db, body: Json<NewUser>) -> Result<(StatusCode, Json<Model>)> {
    let user = body
        .into_inner()
        .into_active_model()
        .insert(db.conn())
        .await
        .map_err(DbError)?;

    tracing::debug!(user.id = user.id, "user created");
    Ok((StatusCode::CREATED, Json(user)))
}
