use std::{fmt::Display, sync::Arc};

use tracing::{debug, error, info, instrument, warn};

use crate::accounts::{
    dto::{CreatedUser, UserId, UserPatch, VerifiedEmail},
    errors::{AccountError, StoreError},
    password::SecretHasher,
    repo_types::{UserChanges, UserField},
    store::{UserStore, UserTx},
};

const CREATE_FAILED: &str = "error creating user";
const UPDATE_FAILED: &str = "error updating user";
const DELETE_FAILED: &str = "error deleting user";
const LOGIN_FAILED: &str = "error logging in";
const VERIFY_FAILED: &str = "error verifying email";

/// User account operations over a caller-supplied store connection.
///
/// Writes run in one transaction each; reads run without one.
#[derive(Clone)]
pub struct UserAccounts {
    hasher: Arc<dyn SecretHasher>,
}

fn db_error(failure: &'static str, cause: impl Display) -> AccountError {
    error!(error = %cause, "{failure}");
    AccountError::Database(failure)
}

/// Commits on `Ok`, rolls back on `Err`. Every write leaves its transaction through here.
async fn finish<T: Send>(
    tx: Box<dyn UserTx + '_>,
    result: Result<T, AccountError>,
    failure: &'static str,
) -> Result<T, AccountError> {
    match result {
        Ok(value) => {
            tx.commit().await.map_err(|e| db_error(failure, e))?;
            Ok(value)
        }
        Err(err) => {
            if let Err(e) = tx.rollback().await {
                error!(error = %e, "rollback failed");
            }
            Err(err)
        }
    }
}

async fn insert_user(
    tx: &mut (dyn UserTx + '_),
    name: &str,
    email_hash: &str,
    password_hash: &str,
) -> Result<uuid::Uuid, AccountError> {
    tx.insert_user(name, email_hash, password_hash)
        .await
        .map_err(|e| match e {
            StoreError::UniqueViolation(detail) => {
                warn!(%name, %detail, "duplicate user");
                AccountError::DuplicateEntry
            }
            e => db_error(CREATE_FAILED, e),
        })?;

    tx.find_id_by_name(name)
        .await
        .map_err(|e| db_error(CREATE_FAILED, e))?
        .ok_or_else(|| db_error(CREATE_FAILED, "inserted user not found by name"))
}

async fn apply_update(
    tx: &mut (dyn UserTx + '_),
    id: &str,
    changes: &UserChanges,
) -> Result<(), AccountError> {
    if id.is_empty() || changes.is_empty() {
        warn!("update with missing data");
        return Err(AccountError::MissingData);
    }
    let rows = tx
        .update_user(id, changes)
        .await
        .map_err(|e| db_error(UPDATE_FAILED, e))?;
    debug!(rows, "user row updated");
    Ok(())
}

async fn purge_user(tx: &mut (dyn UserTx + '_), id: &str) -> Result<(), AccountError> {
    // dependents first: thread_msgs -> threads -> users
    let messages = tx
        .delete_thread_messages(id)
        .await
        .map_err(|e| db_error(DELETE_FAILED, e))?;
    let threads = tx
        .delete_threads(id)
        .await
        .map_err(|e| db_error(DELETE_FAILED, e))?;
    let users = tx
        .delete_user(id)
        .await
        .map_err(|e| db_error(DELETE_FAILED, e))?;
    debug!(messages, threads, users, "user rows deleted");
    Ok(())
}

impl UserAccounts {
    pub fn new(hasher: Arc<dyn SecretHasher>) -> Self {
        Self { hasher }
    }

    async fn hash(&self, plain: &str) -> anyhow::Result<String> {
        let hasher = Arc::clone(&self.hasher);
        let plain = plain.to_owned();
        let hash = tokio::task::spawn_blocking(move || hasher.hash(&plain)).await??;
        Ok(hash)
    }

    async fn verify(&self, plain: &str, hash: &str) -> anyhow::Result<bool> {
        let hasher = Arc::clone(&self.hasher);
        let (plain, hash) = (plain.to_owned(), hash.to_owned());
        let ok = tokio::task::spawn_blocking(move || hasher.verify(&plain, &hash)).await??;
        Ok(ok)
    }

    /// Creates a user and returns its id alongside the plaintext input.
    #[instrument(skip(self, store, email, password))]
    pub async fn create(
        &self,
        store: &mut dyn UserStore,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<CreatedUser, AccountError> {
        if name.is_empty() || email.is_empty() || password.is_empty() {
            warn!("create with missing data");
            return Err(AccountError::MissingData);
        }

        let email_hash = self.hash(email).await.map_err(|e| db_error(CREATE_FAILED, e))?;
        let password_hash = self
            .hash(password)
            .await
            .map_err(|e| db_error(CREATE_FAILED, e))?;

        let mut tx = store.begin().await.map_err(|e| db_error(CREATE_FAILED, e))?;
        let result = insert_user(&mut *tx, name, &email_hash, &password_hash).await;
        let id = finish(tx, result, CREATE_FAILED).await?;

        info!(user_id = %id, "user created");
        Ok(CreatedUser {
            name: name.to_string(),
            email: email.to_string(),
            password: password.to_string(),
            id,
        })
    }

    /// Updates the fields present in `patch`. Empty strings count as absent.
    #[instrument(skip(self, store, patch))]
    pub async fn update(
        &self,
        store: &mut dyn UserStore,
        id: &str,
        patch: UserPatch,
    ) -> Result<UserId, AccountError> {
        let present = |v: Option<String>| v.filter(|s| !s.is_empty());

        let mut changes = UserChanges::new();
        if let Some(name) = present(patch.name) {
            changes.set(UserField::Name, name);
        }
        if let Some(email) = present(patch.email) {
            let hash = self.hash(&email).await.map_err(|e| db_error(UPDATE_FAILED, e))?;
            changes.set(UserField::Email, hash);
        }
        if let Some(password) = present(patch.password) {
            let hash = self
                .hash(&password)
                .await
                .map_err(|e| db_error(UPDATE_FAILED, e))?;
            changes.set(UserField::Password, hash);
        }

        let mut tx = store.begin().await.map_err(|e| db_error(UPDATE_FAILED, e))?;
        let result = apply_update(&mut *tx, id, &changes).await;
        finish(tx, result, UPDATE_FAILED).await?;

        info!("user updated");
        Ok(UserId { id: id.to_string() })
    }

    /// Deletes the user together with its threads and thread messages.
    #[instrument(skip(self, store))]
    pub async fn delete(&self, store: &mut dyn UserStore, id: &str) -> Result<UserId, AccountError> {
        if id.is_empty() {
            warn!("delete with missing data");
            return Err(AccountError::MissingData);
        }

        let mut tx = store.begin().await.map_err(|e| db_error(DELETE_FAILED, e))?;
        let result = purge_user(&mut *tx, id).await;
        finish(tx, result, DELETE_FAILED).await?;

        info!("user deleted");
        Ok(UserId { id: id.to_string() })
    }

    #[instrument(skip(self, store, password))]
    pub async fn login(
        &self,
        store: &mut dyn UserStore,
        name: &str,
        password: &str,
    ) -> Result<UserId, AccountError> {
        if name.is_empty() || password.is_empty() {
            warn!("login with missing data");
            return Err(AccountError::MissingData);
        }

        // An unknown name is reported like any other lookup failure.
        let credentials = store
            .find_credentials(name)
            .await
            .map_err(|e| db_error(LOGIN_FAILED, e))?
            .ok_or_else(|| db_error(LOGIN_FAILED, "no user with that name"))?;

        let ok = self
            .verify(password, &credentials.password_hash)
            .await
            .map_err(|e| db_error(LOGIN_FAILED, e))?;
        if !ok {
            warn!(user_id = %credentials.id, "login invalid password");
            return Err(AccountError::UserBadRequest("invalid password"));
        }

        info!(user_id = %credentials.id, "user logged in");
        Ok(UserId {
            id: credentials.id.to_string(),
        })
    }

    #[instrument(skip(self, store, email))]
    pub async fn verify_email(
        &self,
        store: &mut dyn UserStore,
        name: &str,
        email: &str,
    ) -> Result<VerifiedEmail, AccountError> {
        if name.is_empty() || email.is_empty() {
            warn!("verify email with missing data");
            return Err(AccountError::MissingData);
        }

        let email_hash = store
            .find_email_hash(name)
            .await
            .map_err(|e| db_error(VERIFY_FAILED, e))?
            .ok_or_else(|| db_error(VERIFY_FAILED, "no user with that name"))?;

        let ok = self
            .verify(email, &email_hash)
            .await
            .map_err(|e| db_error(VERIFY_FAILED, e))?;
        if !ok {
            warn!("email verification mismatch");
            return Err(AccountError::UserBadRequest("invalid email"));
        }

        info!("email verified");
        Ok(VerifiedEmail {
            email: email.to_string(),
            email_verified: true,
        })
    }
}
