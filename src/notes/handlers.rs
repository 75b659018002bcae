use axum::{
    extract::{Path, State},
    http::{header::LOCATION, HeaderMap, HeaderValue, StatusCode},
    routing::get,
    Json, Router,
};
use tracing::instrument;
use uuid::Uuid;

use super::{
    dto::{
        CreateNoteRequest, CreateTodoRequest, NoteDetails, TodoResponse, UpdateNoteRequest,
        UpdateTodoRequest,
    },
    repo_types::TodoPatch,
    services::NoteService,
};
use crate::{
    auth::extractors::AuthUser,
    error::{AppError, Disclosure},
    state::AppState,
};

pub fn note_routes() -> Router<AppState> {
    Router::new()
        .route("/notes", get(list_notes).post(create_note))
        .route("/notes/user/:user_id", get(list_user_notes))
        .route(
            "/notes/:id",
            get(get_note).put(update_note).delete(delete_note),
        )
}

pub fn todo_routes() -> Router<AppState> {
    Router::new()
        .route("/notes/:id/todos", axum::routing::post(create_todo))
        .route(
            "/notes/:id/todos/:todo_id",
            get(get_todo).put(update_todo).delete(delete_todo),
        )
}

#[instrument(skip(notes))]
pub async fn list_notes(
    State(notes): State<NoteService>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<Vec<NoteDetails>>, AppError> {
    Ok(Json(notes.list_own(user_id).await?))
}

#[instrument(skip(notes, policy))]
pub async fn list_user_notes(
    State(notes): State<NoteService>,
    State(policy): State<Disclosure>,
    AuthUser(user_id): AuthUser,
    Path(owner): Path<Uuid>,
) -> Result<Json<Vec<NoteDetails>>, AppError> {
    let list = notes
        .list_for_user(user_id, owner)
        .await
        .map_err(|e| policy.apply(e))?;
    Ok(Json(list))
}

#[instrument(skip(notes, body))]
pub async fn create_note(
    State(notes): State<NoteService>,
    AuthUser(user_id): AuthUser,
    Json(body): Json<CreateNoteRequest>,
) -> Result<(StatusCode, HeaderMap, Json<NoteDetails>), AppError> {
    let note = notes.create(user_id, &body.title, body.todos).await?;

    let mut headers = HeaderMap::new();
    if let Ok(loc) = HeaderValue::from_str(&format!("/api/notes/{}", note.id)) {
        headers.insert(LOCATION, loc);
    }
    Ok((StatusCode::CREATED, headers, Json(note)))
}

#[instrument(skip(notes, policy))]
pub async fn get_note(
    State(notes): State<NoteService>,
    State(policy): State<Disclosure>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<NoteDetails>, AppError> {
    let note = notes.get(user_id, id).await.map_err(|e| policy.apply(e))?;
    Ok(Json(note))
}

#[instrument(skip(notes, policy, body))]
pub async fn update_note(
    State(notes): State<NoteService>,
    State(policy): State<Disclosure>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateNoteRequest>,
) -> Result<Json<NoteDetails>, AppError> {
    let note = notes
        .rename(user_id, id, &body.title)
        .await
        .map_err(|e| policy.apply(e))?;
    Ok(Json(note))
}

#[instrument(skip(notes, policy))]
pub async fn delete_note(
    State(notes): State<NoteService>,
    State(policy): State<Disclosure>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    notes.delete(user_id, id).await.map_err(|e| policy.apply(e))?;
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(notes, policy, body))]
pub async fn create_todo(
    State(notes): State<NoteService>,
    State(policy): State<Disclosure>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
    Json(body): Json<CreateTodoRequest>,
) -> Result<(StatusCode, Json<TodoResponse>), AppError> {
    let todo = notes
        .add_todo(user_id, id, &body.title, body.completed)
        .await
        .map_err(|e| policy.apply(e))?;
    Ok((StatusCode::CREATED, Json(todo.into())))
}

#[instrument(skip(notes, policy))]
pub async fn get_todo(
    State(notes): State<NoteService>,
    State(policy): State<Disclosure>,
    AuthUser(user_id): AuthUser,
    Path((id, todo_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<TodoResponse>, AppError> {
    let todo = notes
        .get_todo(user_id, id, todo_id)
        .await
        .map_err(|e| policy.apply(e))?;
    Ok(Json(todo.into()))
}

#[instrument(skip(notes, policy, body))]
pub async fn update_todo(
    State(notes): State<NoteService>,
    State(policy): State<Disclosure>,
    AuthUser(user_id): AuthUser,
    Path((id, todo_id)): Path<(Uuid, Uuid)>,
    Json(body): Json<UpdateTodoRequest>,
) -> Result<Json<TodoResponse>, AppError> {
    let patch = TodoPatch {
        title: body.title,
        completed: body.completed,
    };
    let todo = notes
        .update_todo(user_id, id, todo_id, patch)
        .await
        .map_err(|e| policy.apply(e))?;
    Ok(Json(todo.into()))
}

#[instrument(skip(notes, policy))]
pub async fn delete_todo(
    State(notes): State<NoteService>,
    State(policy): State<Disclosure>,
    AuthUser(user_id): AuthUser,
    Path((id, todo_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, AppError> {
    notes
        .delete_todo(user_id, id, todo_id)
        .await
        .map_err(|e| policy.apply(e))?;
    Ok(StatusCode::NO_CONTENT)
}
