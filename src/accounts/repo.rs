use async_trait::async_trait;
use sqlx::{Connection, PgConnection, Postgres, QueryBuilder, Transaction};
use uuid::Uuid;

use crate::accounts::{
    errors::StoreError,
    repo_types::{Credentials, UserChanges},
    store::{UserStore, UserTx},
};

/// Postgres-backed account store over a borrowed connection.
pub struct PgUserStore<'c> {
    conn: &'c mut PgConnection,
}

impl<'c> PgUserStore<'c> {
    pub fn new(conn: &'c mut PgConnection) -> Self {
        Self { conn }
    }
}

pub struct PgUserTx<'t> {
    tx: Transaction<'t, Postgres>,
}

fn parse_id(raw: &str) -> Result<Uuid, StoreError> {
    Uuid::parse_str(raw).map_err(|e| StoreError::Backend(format!("invalid user id: {e}")))
}

/// Builds `UPDATE users SET ... WHERE id = $n` over only the assigned columns.
pub(crate) fn update_statement(id: Uuid, changes: &UserChanges) -> QueryBuilder<'_, Postgres> {
    let mut qb = QueryBuilder::new("UPDATE users SET ");
    {
        let mut assignments = qb.separated(", ");
        for (field, value) in changes.iter() {
            assignments.push(field.column());
            assignments.push_unseparated(" = ");
            assignments.push_bind_unseparated(value);
        }
    }
    qb.push(" WHERE id = ");
    qb.push_bind(id);
    qb
}

#[async_trait]
impl<'c> UserStore for PgUserStore<'c> {
    async fn begin<'a>(&'a mut self) -> Result<Box<dyn UserTx + 'a>, StoreError> {
        let tx = self.conn.begin().await?;
        Ok(Box::new(PgUserTx { tx }))
    }

    async fn find_credentials(&mut self, name: &str) -> Result<Option<Credentials>, StoreError> {
        let row = sqlx::query_as::<_, Credentials>(
            r#"
            SELECT id, password
            FROM users
            WHERE name = $1
            "#,
        )
        .bind(name)
        .fetch_optional(&mut *self.conn)
        .await?;
        Ok(row)
    }

    async fn find_email_hash(&mut self, name: &str) -> Result<Option<String>, StoreError> {
        let email = sqlx::query_scalar::<_, String>(r#"SELECT email FROM users WHERE name = $1"#)
            .bind(name)
            .fetch_optional(&mut *self.conn)
            .await?;
        Ok(email)
    }
}

#[async_trait]
impl<'t> UserTx for PgUserTx<'t> {
    async fn insert_user(
        &mut self,
        name: &str,
        email_hash: &str,
        password_hash: &str,
    ) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO users (name, email, password)
            VALUES ($1, $2, $3)
            "#,
        )
        .bind(name)
        .bind(email_hash)
        .bind(password_hash)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn find_id_by_name(&mut self, name: &str) -> Result<Option<Uuid>, StoreError> {
        let id = sqlx::query_scalar::<_, Uuid>(r#"SELECT id FROM users WHERE name = $1"#)
            .bind(name)
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(id)
    }

    async fn update_user(&mut self, id: &str, changes: &UserChanges) -> Result<u64, StoreError> {
        let id = parse_id(id)?;
        let mut qb = update_statement(id, changes);
        let done = qb.build().execute(&mut *self.tx).await?;
        Ok(done.rows_affected())
    }

    async fn delete_thread_messages(&mut self, user_id: &str) -> Result<u64, StoreError> {
        let user_id = parse_id(user_id)?;
        let done = sqlx::query(r#"DELETE FROM thread_msgs WHERE id_user = $1"#)
            .bind(user_id)
            .execute(&mut *self.tx)
            .await?;
        Ok(done.rows_affected())
    }

    async fn delete_threads(&mut self, user_id: &str) -> Result<u64, StoreError> {
        let user_id = parse_id(user_id)?;
        let done = sqlx::query(r#"DELETE FROM threads WHERE user_id = $1"#)
            .bind(user_id)
            .execute(&mut *self.tx)
            .await?;
        Ok(done.rows_affected())
    }

    async fn delete_user(&mut self, id: &str) -> Result<u64, StoreError> {
        let id = parse_id(id)?;
        let done = sqlx::query(r#"DELETE FROM users WHERE id = $1"#)
            .bind(id)
            .execute(&mut *self.tx)
            .await?;
        Ok(done.rows_affected())
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), StoreError> {
        self.tx.rollback().await?;
        Ok(())
    }
}
