//! In-process stores, used when no `DATABASE_URL` is configured and in tests.
//! Same contracts as the Postgres stores, including username uniqueness.

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{
    auth::{
        repo::UserStore,
        repo_types::{StoreError, User},
    },
    notes::{
        repo::NoteStore,
        repo_types::{Note, Todo, TodoPatch},
    },
};

#[derive(Default)]
pub struct MemoryUserStore {
    users: RwLock<Vec<User>>,
}

impl MemoryUserStore {
    #[cfg(test)]
    pub async fn len(&self) -> usize {
        self.users.read().await.len()
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn find_by_username(&self, username: &str) -> anyhow::Result<Option<User>> {
        let users = self.users.read().await;
        Ok(users.iter().find(|u| u.username == username).cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>> {
        let users = self.users.read().await;
        Ok(users.iter().find(|u| u.id == id).cloned())
    }

    async fn create(&self, username: &str, password_hash: &str) -> Result<User, StoreError> {
        // Check and insert under one write lock, like a unique index would.
        let mut users = self.users.write().await;
        if users.iter().any(|u| u.username == username) {
            return Err(StoreError::Duplicate);
        }
        let user = User {
            id: Uuid::new_v4(),
            username: username.to_string(),
            password_hash: password_hash.to_string(),
            created_at: OffsetDateTime::now_utc(),
        };
        users.push(user.clone());
        Ok(user)
    }
}

#[derive(Default)]
struct NoteTables {
    notes: Vec<Note>,
    todos: Vec<Todo>,
}

#[derive(Default)]
pub struct MemoryNoteStore {
    tables: RwLock<NoteTables>,
}

#[async_trait]
impl NoteStore for MemoryNoteStore {
    async fn create_with_todos(
        &self,
        owner_id: Uuid,
        title: &str,
        todos: &[(String, bool)],
    ) -> anyhow::Result<(Note, Vec<Todo>)> {
        let now = OffsetDateTime::now_utc();
        let note = Note {
            id: Uuid::new_v4(),
            owner_id,
            title: title.to_string(),
            created_at: now,
            updated_at: now,
        };
        let created: Vec<Todo> = todos
            .iter()
            .map(|(todo_title, completed)| Todo {
                id: Uuid::new_v4(),
                note_id: note.id,
                title: todo_title.clone(),
                completed: *completed,
                created_at: now,
            })
            .collect();

        let mut t = self.tables.write().await;
        t.notes.push(note.clone());
        t.todos.extend(created.iter().cloned());
        Ok((note, created))
    }

    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<Note>> {
        let t = self.tables.read().await;
        Ok(t.notes.iter().find(|n| n.id == id).cloned())
    }

    async fn find_all_by_owner(&self, owner_id: Uuid) -> anyhow::Result<Vec<Note>> {
        let t = self.tables.read().await;
        Ok(t.notes
            .iter()
            .filter(|n| n.owner_id == owner_id)
            .cloned()
            .collect())
    }

    async fn update_title(&self, id: Uuid, title: &str) -> anyhow::Result<Option<Note>> {
        let mut t = self.tables.write().await;
        Ok(t.notes.iter_mut().find(|n| n.id == id).map(|n| {
            n.title = title.to_string();
            n.updated_at = OffsetDateTime::now_utc();
            n.clone()
        }))
    }

    async fn delete(&self, id: Uuid) -> anyhow::Result<bool> {
        let mut t = self.tables.write().await;
        let before = t.notes.len();
        t.notes.retain(|n| n.id != id);
        let removed = t.notes.len() != before;
        if removed {
            t.todos.retain(|todo| todo.note_id != id);
        }
        Ok(removed)
    }

    async fn list_todos(&self, note_id: Uuid) -> anyhow::Result<Vec<Todo>> {
        let t = self.tables.read().await;
        Ok(t.todos
            .iter()
            .filter(|todo| todo.note_id == note_id)
            .cloned()
            .collect())
    }

    async fn create_todo(&self, note_id: Uuid, title: &str, completed: bool) -> anyhow::Result<Todo> {
        let mut t = self.tables.write().await;
        anyhow::ensure!(
            t.notes.iter().any(|n| n.id == note_id),
            "todo references missing note {}",
            note_id
        );
        let todo = Todo {
            id: Uuid::new_v4(),
            note_id,
            title: title.to_string(),
            completed,
            created_at: OffsetDateTime::now_utc(),
        };
        t.todos.push(todo.clone());
        Ok(todo)
    }

    async fn find_todo(&self, note_id: Uuid, todo_id: Uuid) -> anyhow::Result<Option<Todo>> {
        let t = self.tables.read().await;
        Ok(t.todos
            .iter()
            .find(|todo| todo.id == todo_id && todo.note_id == note_id)
            .cloned())
    }

    async fn update_todo(
        &self,
        note_id: Uuid,
        todo_id: Uuid,
        patch: &TodoPatch,
    ) -> anyhow::Result<Option<Todo>> {
        let mut t = self.tables.write().await;
        Ok(t.todos
            .iter_mut()
            .find(|todo| todo.id == todo_id && todo.note_id == note_id)
            .map(|todo| {
                if let Some(title) = &patch.title {
                    todo.title = title.clone();
                }
                if let Some(completed) = patch.completed {
                    todo.completed = completed;
                }
                todo.clone()
            }))
    }

    async fn delete_todo(&self, note_id: Uuid, todo_id: Uuid) -> anyhow::Result<bool> {
        let mut t = self.tables.write().await;
        let before = t.todos.len();
        t.todos
            .retain(|todo| !(todo.id == todo_id && todo.note_id == note_id));
        Ok(t.todos.len() != before)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn user_store_enforces_unique_usernames() {
        let store = MemoryUserStore::default();
        let alice = store.create("alice", "h").await.unwrap();
        assert!(matches!(
            store.create("alice", "h2").await,
            Err(StoreError::Duplicate)
        ));
        assert_eq!(store.find_by_id(alice.id).await.unwrap().unwrap().username, "alice");
        assert!(store.find_by_username("ALICE").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn deleting_a_note_drops_its_todos() {
        let store = MemoryNoteStore::default();
        let owner = Uuid::new_v4();
        let (note, todos) = store
            .create_with_todos(owner, "n", &[("t".to_string(), false)])
            .await
            .unwrap();
        let todo = &todos[0];
        assert_eq!(store.list_todos(note.id).await.unwrap().len(), 1);

        assert!(store.delete(note.id).await.unwrap());
        assert!(store.find_todo(note.id, todo.id).await.unwrap().is_none());
        assert!(!store.delete(note.id).await.unwrap());
    }

    #[tokio::test]
    async fn todo_requires_existing_note() {
        let store = MemoryNoteStore::default();
        assert!(store.create_todo(Uuid::new_v4(), "orphan", false).await.is_err());
    }
}
