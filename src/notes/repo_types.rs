use serde::Serialize;
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::auth::guard::Owned;

/// A note row. `owner_id` is written once, at insert.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Note {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub title: String,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl Owned for Note {
    fn owner_id(&self) -> Uuid {
        self.owner_id
    }
}

/// A todo row. Carries no owner of its own; access goes through the parent note.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Todo {
    pub id: Uuid,
    pub note_id: Uuid,
    pub title: String,
    pub completed: bool,
    pub created_at: OffsetDateTime,
}

/// Partial update of a todo; `None` leaves the field untouched.
#[derive(Debug, Clone, Default)]
pub struct TodoPatch {
    pub title: Option<String>,
    pub completed: Option<bool>,
}
