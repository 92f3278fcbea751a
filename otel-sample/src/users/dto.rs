use sea_orm::{ActiveValue, NotSet, Set};
use serde::{Deserialize, Serialize};

use super::entity::ActiveModel;

/// Body of `POST /users`. The id is assigned by the store unless given.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewUser {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i32>,
    pub name: String,
    pub email: String,
}

impl NewUser {
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            email: email.into(),
        }
    }

    pub fn into_active_model(self) -> ActiveModel {
        let id: ActiveValue<i32> = match self.id {
            Some(id) => Set(id),
            None => NotSet,
        };
        ActiveModel {
            id,
            name: Set(self.name),
            email: Set(self.email),
        }
    }
}
