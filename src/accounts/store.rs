use async_trait::async_trait;
use uuid::Uuid;

use crate::accounts::{
    errors::StoreError,
    repo_types::{Credentials, UserChanges},
};

/// Caller-owned connection to the account tables.
#[async_trait]
pub trait UserStore: Send {
    async fn begin<'a>(&'a mut self) -> Result<Box<dyn UserTx + 'a>, StoreError>;

    async fn find_credentials(&mut self, name: &str) -> Result<Option<Credentials>, StoreError>;

    async fn find_email_hash(&mut self, name: &str) -> Result<Option<String>, StoreError>;
}

/// Statements issued inside an open transaction.
///
/// Dropping a transaction without calling `commit` discards its writes.
#[async_trait]
pub trait UserTx: Send {
    async fn insert_user(
        &mut self,
        name: &str,
        email_hash: &str,
        password_hash: &str,
    ) -> Result<(), StoreError>;

    async fn find_id_by_name(&mut self, name: &str) -> Result<Option<Uuid>, StoreError>;

    /// Returns the number of rows touched.
    async fn update_user(&mut self, id: &str, changes: &UserChanges) -> Result<u64, StoreError>;

    async fn delete_thread_messages(&mut self, user_id: &str) -> Result<u64, StoreError>;

    async fn delete_threads(&mut self, user_id: &str) -> Result<u64, StoreError>;

    async fn delete_user(&mut self, id: &str) -> Result<u64, StoreError>;

    async fn commit(self: Box<Self>) -> Result<(), StoreError>;

    async fn rollback(self: Box<Self>) -> Result<(), StoreError>;
}
