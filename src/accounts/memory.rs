//! In-memory account store for repository tests.
//!
//! Transactions work on a staged copy of the tables: `commit` publishes it,
//! `rollback` (or drop) discards it. Every statement is logged and a single
//! statement kind can be made to fail once.

use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use uuid::Uuid;

use crate::accounts::{
    errors::StoreError,
    repo_types::{Credentials, UserChanges, UserField},
    store::{UserStore, UserTx},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Begin,
    Insert,
    FindId,
    Update,
    DeleteMessages,
    DeleteThreads,
    DeleteUser,
    FindCredentials,
    FindEmail,
    Commit,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredUser {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Default)]
pub struct Tables {
    pub users: Vec<StoredUser>,
    pub threads: Vec<Uuid>,      // owner ids
    pub thread_msgs: Vec<Uuid>,  // author ids
}

#[derive(Debug, Default)]
struct Inner {
    tables: Tables,
    log: Vec<Op>,
    commits: usize,
    rollbacks: usize,
    fail_on: Option<Op>,
}

#[derive(Clone, Default)]
pub struct MemoryUserStore {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().expect("memory store poisoned")
    }

    /// The next `op` fails with a backend error.
    pub fn fail_on(&self, op: Op) {
        self.lock().fail_on = Some(op);
    }

    pub fn tables(&self) -> Tables {
        self.lock().tables.clone()
    }

    pub fn seed_thread(&self, owner: Uuid, messages: usize) {
        let mut inner = self.lock();
        inner.tables.threads.push(owner);
        inner.tables.thread_msgs.extend(std::iter::repeat(owner).take(messages));
    }

    /// Statements issued so far, including `Begin` and `Commit`.
    pub fn log(&self) -> Vec<Op> {
        self.lock().log.clone()
    }

    pub fn commits(&self) -> usize {
        self.lock().commits
    }

    pub fn rollbacks(&self) -> usize {
        self.lock().rollbacks
    }

    fn record(&self, op: Op) -> Result<(), StoreError> {
        let mut inner = self.lock();
        inner.log.push(op);
        if inner.fail_on == Some(op) {
            inner.fail_on = None;
            return Err(StoreError::Backend(format!("injected failure on {op:?}")));
        }
        Ok(())
    }
}

fn parse_id(raw: &str) -> Result<Uuid, StoreError> {
    Uuid::parse_str(raw).map_err(|e| StoreError::Backend(format!("invalid user id: {e}")))
}

pub struct MemoryTx {
    store: MemoryUserStore,
    staged: Tables,
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn begin<'a>(&'a mut self) -> Result<Box<dyn UserTx + 'a>, StoreError> {
        self.record(Op::Begin)?;
        Ok(Box::new(MemoryTx {
            store: self.clone(),
            staged: self.tables(),
        }))
    }

    async fn find_credentials(&mut self, name: &str) -> Result<Option<Credentials>, StoreError> {
        self.record(Op::FindCredentials)?;
        Ok(self
            .tables()
            .users
            .into_iter()
            .find(|u| u.name == name)
            .map(|u| Credentials {
                id: u.id,
                password_hash: u.password,
            }))
    }

    async fn find_email_hash(&mut self, name: &str) -> Result<Option<String>, StoreError> {
        self.record(Op::FindEmail)?;
        Ok(self
            .tables()
            .users
            .into_iter()
            .find(|u| u.name == name)
            .map(|u| u.email))
    }
}

#[async_trait]
impl UserTx for MemoryTx {
    async fn insert_user(
        &mut self,
        name: &str,
        email_hash: &str,
        password_hash: &str,
    ) -> Result<(), StoreError> {
        self.store.record(Op::Insert)?;
        if self.staged.users.iter().any(|u| u.name == name) {
            return Err(StoreError::UniqueViolation(format!("name {name} exists")));
        }
        self.staged.users.push(StoredUser {
            id: Uuid::new_v4(),
            name: name.to_string(),
            email: email_hash.to_string(),
            password: password_hash.to_string(),
        });
        Ok(())
    }

    async fn find_id_by_name(&mut self, name: &str) -> Result<Option<Uuid>, StoreError> {
        self.store.record(Op::FindId)?;
        Ok(self.staged.users.iter().find(|u| u.name == name).map(|u| u.id))
    }

    async fn update_user(&mut self, id: &str, changes: &UserChanges) -> Result<u64, StoreError> {
        self.store.record(Op::Update)?;
        let id = parse_id(id)?;
        let Some(user) = self.staged.users.iter_mut().find(|u| u.id == id) else {
            return Ok(0);
        };
        for (field, value) in changes.iter() {
            let slot = match field {
                UserField::Name => &mut user.name,
                UserField::Email => &mut user.email,
                UserField::Password => &mut user.password,
            };
            *slot = value.to_string();
        }
        Ok(1)
    }

    async fn delete_thread_messages(&mut self, user_id: &str) -> Result<u64, StoreError> {
        self.store.record(Op::DeleteMessages)?;
        let user_id = parse_id(user_id)?;
        let before = self.staged.thread_msgs.len();
        self.staged.thread_msgs.retain(|owner| *owner != user_id);
        Ok((before - self.staged.thread_msgs.len()) as u64)
    }

    async fn delete_threads(&mut self, user_id: &str) -> Result<u64, StoreError> {
        self.store.record(Op::DeleteThreads)?;
        let user_id = parse_id(user_id)?;
        // thread_msgs references threads
        if self.staged.thread_msgs.contains(&user_id) {
            return Err(StoreError::Backend("thread_msgs still reference user".into()));
        }
        let before = self.staged.threads.len();
        self.staged.threads.retain(|owner| *owner != user_id);
        Ok((before - self.staged.threads.len()) as u64)
    }

    async fn delete_user(&mut self, id: &str) -> Result<u64, StoreError> {
        self.store.record(Op::DeleteUser)?;
        let id = parse_id(id)?;
        if self.staged.threads.contains(&id) {
            return Err(StoreError::Backend("threads still reference user".into()));
        }
        let before = self.staged.users.len();
        self.staged.users.retain(|u| u.id != id);
        Ok((before - self.staged.users.len()) as u64)
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        let MemoryTx { store, staged } = *self;
        store.record(Op::Commit)?;
        let mut inner = store.lock();
        inner.tables = staged;
        inner.commits += 1;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), StoreError> {
        self.store.lock().rollbacks += 1;
        Ok(())
    }
}
