use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use super::repo_types::{Note, Todo};

/// Body of `POST /notes`. Owner fields sent by the client are ignored.
#[derive(Debug, Deserialize)]
pub struct CreateNoteRequest {
    pub title: String,
    #[serde(default)]
    pub todos: Vec<CreateTodoRequest>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateNoteRequest {
    pub title: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateTodoRequest {
    pub title: String,
    #[serde(default)]
    pub completed: bool,
}

#[derive(Debug, Deserialize)]
pub struct UpdateTodoRequest {
    pub title: Option<String>,
    pub completed: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct TodoResponse {
    pub id: Uuid,
    pub title: String,
    pub completed: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl From<Todo> for TodoResponse {
    fn from(t: Todo) -> Self {
        Self {
            id: t.id,
            title: t.title,
            completed: t.completed,
            created_at: t.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct NoteDetails {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub title: String,
    pub todos: Vec<TodoResponse>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl NoteDetails {
    pub fn new(note: Note, todos: Vec<Todo>) -> Self {
        Self {
            id: note.id,
            owner_id: note.owner_id,
            title: note.title,
            todos: todos.into_iter().map(TodoResponse::from).collect(),
            created_at: note.created_at,
            updated_at: note.updated_at,
        }
    }
}
