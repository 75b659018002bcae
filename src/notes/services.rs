use std::sync::Arc;

use axum::extract::FromRef;
use tracing::{debug, info};
use uuid::Uuid;

use super::{
    dto::{CreateTodoRequest, NoteDetails},
    repo::NoteStore,
    repo_types::{Note, Todo, TodoPatch},
};
use crate::{
    auth::guard::{authorize, ensure_owner, Access},
    error::AppError,
    state::AppState,
};

const MAX_TITLE_CHARS: usize = 255;

fn clean_title(raw: &str) -> Result<String, AppError> {
    let title = raw.trim();
    if title.is_empty() {
        return Err(AppError::BadRequest("Title must not be empty".into()));
    }
    if title.chars().count() > MAX_TITLE_CHARS {
        return Err(AppError::BadRequest("Title too long".into()));
    }
    Ok(title.to_string())
}

/// Note and todo operations on behalf of an authenticated subject.
///
/// Every read, update and delete goes through [`ensure_owner`]; todos are
/// checked against their parent note.
#[derive(Clone)]
pub struct NoteService {
    notes: Arc<dyn NoteStore>,
}

impl FromRef<AppState> for NoteService {
    fn from_ref(state: &AppState) -> Self {
        Self::new(state.notes.clone())
    }
}

impl NoteService {
    pub fn new(notes: Arc<dyn NoteStore>) -> Self {
        Self { notes }
    }

    async fn owned_note(&self, subject: Uuid, note_id: Uuid) -> Result<Note, AppError> {
        let note = self.notes.find_by_id(note_id).await?;
        ensure_owner(subject, note, "note")
    }

    async fn details(&self, note: Note) -> Result<NoteDetails, AppError> {
        let todos = self.notes.list_todos(note.id).await?;
        Ok(NoteDetails::new(note, todos))
    }

    pub async fn list_own(&self, subject: Uuid) -> Result<Vec<NoteDetails>, AppError> {
        let notes = self.notes.find_all_by_owner(subject).await?;
        let mut out = Vec::with_capacity(notes.len());
        for note in notes {
            out.push(self.details(note).await?);
        }
        Ok(out)
    }

    /// Listing by an explicit user id: only the user themselves may ask.
    pub async fn list_for_user(
        &self,
        subject: Uuid,
        user_id: Uuid,
    ) -> Result<Vec<NoteDetails>, AppError> {
        if authorize(subject, user_id) == Access::Denied {
            return Err(AppError::Forbidden);
        }
        self.list_own(subject).await
    }

    /// The owner is always the subject; there is no way to pass another one in.
    pub async fn create(
        &self,
        subject: Uuid,
        title: &str,
        todos: Vec<CreateTodoRequest>,
    ) -> Result<NoteDetails, AppError> {
        let title = clean_title(title)?;
        let todos = todos
            .into_iter()
            .map(|t| clean_title(&t.title).map(|title| (title, t.completed)))
            .collect::<Result<Vec<_>, _>>()?;

        let (note, created) = self.notes.create_with_todos(subject, &title, &todos).await?;
        info!(note_id = %note.id, owner_id = %subject, "note created");
        Ok(NoteDetails::new(note, created))
    }

    pub async fn get(&self, subject: Uuid, note_id: Uuid) -> Result<NoteDetails, AppError> {
        let note = self.owned_note(subject, note_id).await?;
        self.details(note).await
    }

    pub async fn rename(
        &self,
        subject: Uuid,
        note_id: Uuid,
        title: &str,
    ) -> Result<NoteDetails, AppError> {
        let title = clean_title(title)?;
        self.owned_note(subject, note_id).await?;
        let note = self
            .notes
            .update_title(note_id, &title)
            .await?
            .ok_or(AppError::NotFound("note"))?;
        debug!(%note_id, "note renamed");
        self.details(note).await
    }

    pub async fn delete(&self, subject: Uuid, note_id: Uuid) -> Result<(), AppError> {
        self.owned_note(subject, note_id).await?;
        if !self.notes.delete(note_id).await? {
            return Err(AppError::NotFound("note"));
        }
        info!(%note_id, "note deleted");
        Ok(())
    }

    pub async fn add_todo(
        &self,
        subject: Uuid,
        note_id: Uuid,
        title: &str,
        completed: bool,
    ) -> Result<Todo, AppError> {
        let title = clean_title(title)?;
        self.owned_note(subject, note_id).await?;
        Ok(self.notes.create_todo(note_id, &title, completed).await?)
    }

    pub async fn get_todo(
        &self,
        subject: Uuid,
        note_id: Uuid,
        todo_id: Uuid,
    ) -> Result<Todo, AppError> {
        self.owned_note(subject, note_id).await?;
        self.notes
            .find_todo(note_id, todo_id)
            .await?
            .ok_or(AppError::NotFound("todo"))
    }

    pub async fn update_todo(
        &self,
        subject: Uuid,
        note_id: Uuid,
        todo_id: Uuid,
        mut patch: TodoPatch,
    ) -> Result<Todo, AppError> {
        if let Some(title) = patch.title.as_deref() {
            patch.title = Some(clean_title(title)?);
        }
        self.owned_note(subject, note_id).await?;
        self.notes
            .update_todo(note_id, todo_id, &patch)
            .await?
            .ok_or(AppError::NotFound("todo"))
    }

    pub async fn delete_todo(
        &self,
        subject: Uuid,
        note_id: Uuid,
        todo_id: Uuid,
    ) -> Result<(), AppError> {
        self.owned_note(subject, note_id).await?;
        if !self.notes.delete_todo(note_id, todo_id).await? {
            return Err(AppError::NotFound("todo"));
        }
        Ok(())
    }
}
