use anyhow::Context;
use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::repo_types::{Note, Todo, TodoPatch};

/// Persistence for notes and their todos. Performs no authorization.
#[async_trait]
pub trait NoteStore: Send + Sync {
    /// Inserts a note together with its initial todos. Either everything is
    /// stored or nothing is.
    async fn create_with_todos(
        &self,
        owner_id: Uuid,
        title: &str,
        todos: &[(String, bool)],
    ) -> anyhow::Result<(Note, Vec<Todo>)>;
    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<Note>>;
    async fn find_all_by_owner(&self, owner_id: Uuid) -> anyhow::Result<Vec<Note>>;
    async fn update_title(&self, id: Uuid, title: &str) -> anyhow::Result<Option<Note>>;
    /// Deletes the note and its todos. Returns whether a row was removed.
    async fn delete(&self, id: Uuid) -> anyhow::Result<bool>;

    async fn list_todos(&self, note_id: Uuid) -> anyhow::Result<Vec<Todo>>;
    async fn create_todo(&self, note_id: Uuid, title: &str, completed: bool) -> anyhow::Result<Todo>;
    async fn find_todo(&self, note_id: Uuid, todo_id: Uuid) -> anyhow::Result<Option<Todo>>;
    async fn update_todo(
        &self,
        note_id: Uuid,
        todo_id: Uuid,
        patch: &TodoPatch,
    ) -> anyhow::Result<Option<Todo>>;
    async fn delete_todo(&self, note_id: Uuid, todo_id: Uuid) -> anyhow::Result<bool>;
}

#[derive(Clone)]
pub struct PgNoteStore {
    db: PgPool,
}

impl PgNoteStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl NoteStore for PgNoteStore {
    async fn create_with_todos(
        &self,
        owner_id: Uuid,
        title: &str,
        todos: &[(String, bool)],
    ) -> anyhow::Result<(Note, Vec<Todo>)> {
        let mut tx = self.db.begin().await.context("begin note tx")?;

        let note = sqlx::query_as::<_, Note>(
            r#"
            INSERT INTO notes (id, owner_id, title)
            VALUES ($1, $2, $3)
            RETURNING id, owner_id, title, created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(owner_id)
        .bind(title)
        .fetch_one(&mut *tx)
        .await?;

        let mut created = Vec::with_capacity(todos.len());
        for (todo_title, completed) in todos {
            let todo = sqlx::query_as::<_, Todo>(
                r#"
                INSERT INTO todos (id, note_id, title, completed)
                VALUES ($1, $2, $3, $4)
                RETURNING id, note_id, title, completed, created_at
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(note.id)
            .bind(todo_title)
            .bind(*completed)
            .fetch_one(&mut *tx)
            .await?;
            created.push(todo);
        }

        tx.commit().await.context("commit note tx")?;
        Ok((note, created))
    }

    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<Note>> {
        let note = sqlx::query_as::<_, Note>(
            r#"
            SELECT id, owner_id, title, created_at, updated_at
            FROM notes
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        Ok(note)
    }

    async fn find_all_by_owner(&self, owner_id: Uuid) -> anyhow::Result<Vec<Note>> {
        let rows = sqlx::query_as::<_, Note>(
            r#"
            SELECT id, owner_id, title, created_at, updated_at
            FROM notes
            WHERE owner_id = $1
            ORDER BY created_at ASC
            "#,
        )
        .bind(owner_id)
        .fetch_all(&self.db)
        .await?;
        Ok(rows)
    }

    async fn update_title(&self, id: Uuid, title: &str) -> anyhow::Result<Option<Note>> {
        let note = sqlx::query_as::<_, Note>(
            r#"
            UPDATE notes
               SET title = $2, updated_at = now()
             WHERE id = $1
            RETURNING id, owner_id, title, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(title)
        .fetch_optional(&self.db)
        .await?;
        Ok(note)
    }

    async fn delete(&self, id: Uuid) -> anyhow::Result<bool> {
        let res = sqlx::query(r#"DELETE FROM notes WHERE id = $1"#)
            .bind(id)
            .execute(&self.db)
            .await?;
        Ok(res.rows_affected() > 0)
    }

    async fn list_todos(&self, note_id: Uuid) -> anyhow::Result<Vec<Todo>> {
        let rows = sqlx::query_as::<_, Todo>(
            r#"
            SELECT id, note_id, title, completed, created_at
              FROM todos
             WHERE note_id = $1
             ORDER BY created_at ASC
            "#,
        )
        .bind(note_id)
        .fetch_all(&self.db)
        .await?;
        Ok(rows)
    }

    async fn create_todo(&self, note_id: Uuid, title: &str, completed: bool) -> anyhow::Result<Todo> {
        let todo = sqlx::query_as::<_, Todo>(
            r#"
            INSERT INTO todos (id, note_id, title, completed)
            VALUES ($1, $2, $3, $4)
            RETURNING id, note_id, title, completed, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(note_id)
        .bind(title)
        .bind(completed)
        .fetch_one(&self.db)
        .await?;
        Ok(todo)
    }

    async fn find_todo(&self, note_id: Uuid, todo_id: Uuid) -> anyhow::Result<Option<Todo>> {
        let todo = sqlx::query_as::<_, Todo>(
            r#"
            SELECT id, note_id, title, completed, created_at
              FROM todos
             WHERE id = $1 AND note_id = $2
            "#,
        )
        .bind(todo_id)
        .bind(note_id)
        .fetch_optional(&self.db)
        .await?;
        Ok(todo)
    }

    async fn update_todo(
        &self,
        note_id: Uuid,
        todo_id: Uuid,
        patch: &TodoPatch,
    ) -> anyhow::Result<Option<Todo>> {
        let todo = sqlx::query_as::<_, Todo>(
            r#"
            UPDATE todos
               SET title = COALESCE($3, title),
                   completed = COALESCE($4, completed)
             WHERE id = $1 AND note_id = $2
            RETURNING id, note_id, title, completed, created_at
            "#,
        )
        .bind(todo_id)
        .bind(note_id)
        .bind(patch.title.as_deref())
        .bind(patch.completed)
        .fetch_optional(&self.db)
        .await?;
        Ok(todo)
    }

    async fn delete_todo(&self, note_id: Uuid, todo_id: Uuid) -> anyhow::Result<bool> {
        let res = sqlx::query(r#"DELETE FROM todos WHERE id = $1 AND note_id = $2"#)
            .bind(todo_id)
            .bind(note_id)
            .execute(&self.db)
            .await?;
        Ok(res.rows_affected() > 0)
    }
}
