//! PostgreSQL-backed `UserRepository` implementation using Diesel ORM.
//!
//! Accounts and their pending invites. Registration with an invite,
//! activation and deletion each run as one transaction; rating adjustments
//! are single in-place updates.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use diesel::prelude::*;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use mockable::Clock;
use tracing::{debug, info};
use uuid::Uuid;

use crate::domain::ports::{UserRepository, UserRepositoryError};
use crate::domain::{Invite, NewUser, User, UserId, hash_token};

use super::diesel_helpers::{
    Violation, bounded, log_diesel_error, map_basic_diesel_error, violation,
};
use super::models::{InviteRow, NewInviteRow, NewUserRow, UserRow};
use super::pool::{DbPool, PoolError};
use super::schema::{invites, users};
use super::transaction::{TxError, UnitOfWork, execute};

const USERNAME_CONSTRAINT: &str = "users_username_key";
const EMAIL_CONSTRAINT: &str = "users_email_key";

/// Diesel-backed implementation of the `UserRepository` port.
#[derive(Clone)]
pub struct DieselUserRepository {
    pool: DbPool,
    clock: Arc<dyn Clock>,
}

impl DieselUserRepository {
    /// Create a new repository with the given connection pool and clock.
    pub fn new(pool: DbPool, clock: Arc<dyn Clock>) -> Self {
        Self { pool, clock }
    }
}

/// Map pool errors to domain user repository errors.
fn map_pool_error(error: PoolError) -> UserRepositoryError {
    UserRepositoryError::connection(error.into_message())
}

/// Map Diesel errors to domain user repository errors.
///
/// Unique violations that slipped past the duplicate pre-check still surface
/// as the matching duplicate error.
fn map_diesel_error(error: diesel::result::Error) -> UserRepositoryError {
    let duplicate = match violation(&error) {
        Some(Violation::Unique(Some(EMAIL_CONSTRAINT))) => {
            Some(UserRepositoryError::duplicate_email())
        }
        Some(Violation::Unique(Some(USERNAME_CONSTRAINT))) => {
            Some(UserRepositoryError::duplicate_username())
        }
        _ => None,
    };
    if let Some(duplicate) = duplicate {
        log_diesel_error(&error);
        return duplicate;
    }
    map_basic_diesel_error(error, UserRepositoryError::query, UserRepositoryError::connection)
}

fn map_tx_error(error: TxError<UserRepositoryError>) -> UserRepositoryError {
    error.into_store_error(map_diesel_error)
}

/// Expiry instant for an invite issued at `now` that lives for `ttl`.
fn invite_expiry(now: DateTime<Utc>, ttl: Duration) -> Result<DateTime<Utc>, UserRepositoryError> {
    if ttl <= Duration::zero() {
        return Err(UserRepositoryError::query(format!(
            "invite lifetime must be positive, got {ttl}"
        )));
    }
    now.checked_add_signed(ttl)
        .ok_or_else(|| UserRepositoryError::query(format!("invite lifetime {ttl} is out of range")))
}

/// Look for accounts already holding the username or email.
///
/// Email wins when one row matches both.
async fn find_duplicate(
    conn: &mut AsyncPgConnection,
    username: &str,
    email: &str,
) -> Result<Option<UserRepositoryError>, diesel::result::Error> {
    let taken: Vec<String> = users::table
        .filter(users::username.eq(username).or(users::email.eq(email)))
        .select(users::email)
        .load(conn)
        .await?;

    Ok(if taken.iter().any(|existing| existing == email) {
        Some(UserRepositoryError::duplicate_email())
    } else if taken.is_empty() {
        None
    } else {
        Some(UserRepositoryError::duplicate_username())
    })
}

/// Fold one review score into a user's aggregate. Returns whether the user
/// exists.
pub(crate) async fn add_to_rating(
    conn: &mut AsyncPgConnection,
    user: Uuid,
    score: i32,
) -> QueryResult<bool> {
    let updated = diesel::update(users::table.find(user))
        .set((
            users::total_rating.eq(users::total_rating + i64::from(score)),
            users::rating_count.eq(users::rating_count + 1_i64),
        ))
        .execute(conn)
        .await?;
    Ok(updated > 0)
}

/// Take one review score back out of a user's aggregate. Returns `false`
/// when the user is missing or has no reviews counted.
pub(crate) async fn remove_from_rating(
    conn: &mut AsyncPgConnection,
    user: Uuid,
    score: i32,
) -> QueryResult<bool> {
    let updated = diesel::update(
        users::table
            .find(user)
            .filter(users::rating_count.gt(0_i64)),
    )
    .set((
        users::total_rating.eq(users::total_rating - i64::from(score)),
        users::rating_count.eq(users::rating_count - 1_i64),
    ))
    .execute(conn)
    .await?;
    Ok(updated > 0)
}

/// Owned insert payload; rows borrow from it.
struct PendingUser {
    id: Uuid,
    profile: serde_json::Value,
    now: DateTime<Utc>,
}

impl PendingUser {
    fn prepare(user: &NewUser, now: DateTime<Utc>) -> Result<Self, UserRepositoryError> {
        let profile = serde_json::to_value(&user.profile)
            .map_err(|err| UserRepositoryError::query(format!("profile encoding failed: {err}")))?;
        Ok(Self {
            id: *UserId::generate().as_uuid(),
            profile,
            now,
        })
    }

    fn row<'a>(&'a self, user: &'a NewUser) -> NewUserRow<'a> {
        NewUserRow {
            id: self.id,
            username: &user.username,
            email: &user.email,
            password_hash: &user.password_hash,
            role: user.role.as_str(),
            profile: &self.profile,
            is_active: false,
            created_at: self.now,
            updated_at: self.now,
        }
    }
}

struct CreateInvited<'a> {
    user: &'a NewUser,
    pending: PendingUser,
    token_hash: &'a str,
    expires_at: DateTime<Utc>,
}

#[async_trait]
impl UnitOfWork for CreateInvited<'_> {
    type Output = User;
    type Error = UserRepositoryError;

    async fn run(
        &self,
        conn: &mut AsyncPgConnection,
    ) -> Result<User, TxError<UserRepositoryError>> {
        let duplicate = find_duplicate(conn, &self.user.username, &self.user.email).await?;
        if let Some(duplicate) = duplicate {
            return Err(TxError::Aborted(duplicate));
        }

        let row: UserRow = diesel::insert_into(users::table)
            .values(&self.pending.row(self.user))
            .returning(UserRow::as_returning())
            .get_result(conn)
            .await?;

        diesel::insert_into(invites::table)
            .values(&NewInviteRow {
                user_id: row.id,
                token_hash: self.token_hash,
                created_at: self.pending.now,
                expires_at: self.expires_at,
            })
            .execute(conn)
            .await?;

        Ok(row.into_domain())
    }
}

struct Activate {
    token_hash: String,
    now: DateTime<Utc>,
}

#[async_trait]
impl UnitOfWork for Activate {
    type Output = User;
    type Error = UserRepositoryError;

    async fn run(
        &self,
        conn: &mut AsyncPgConnection,
    ) -> Result<User, TxError<UserRepositoryError>> {
        let invite: Option<Invite> = invites::table
            .filter(invites::token_hash.eq(&self.token_hash))
            .select(InviteRow::as_select())
            .first(conn)
            .await
            .optional()?
            .map(Invite::from);

        let Some(invite) = invite.filter(|invite| !invite.is_expired(self.now)) else {
            return Err(TxError::Aborted(UserRepositoryError::invite_not_found()));
        };
        let user_id = *invite.user_id.as_uuid();

        let activated: Option<UserRow> = diesel::update(users::table.find(user_id))
            .set((users::is_active.eq(true), users::updated_at.eq(self.now)))
            .returning(UserRow::as_returning())
            .get_result(conn)
            .await
            .optional()?;
        let Some(activated) = activated else {
            return Err(TxError::Aborted(UserRepositoryError::not_found()));
        };

        diesel::delete(invites::table.find(user_id))
            .execute(conn)
            .await?;

        Ok(activated.into_domain())
    }
}

struct DeleteUser {
    id: Uuid,
}

#[async_trait]
impl UnitOfWork for DeleteUser {
    type Output = ();
    type Error = UserRepositoryError;

    async fn run(&self, conn: &mut AsyncPgConnection) -> Result<(), TxError<UserRepositoryError>> {
        diesel::delete(invites::table.filter(invites::user_id.eq(self.id)))
            .execute(conn)
            .await?;
        let removed = diesel::delete(users::table.find(self.id))
            .execute(conn)
            .await?;
        if removed == 0 {
            return Err(TxError::Aborted(UserRepositoryError::not_found()));
        }
        Ok(())
    }
}

#[async_trait]
impl UserRepository for DieselUserRepository {
    async fn create(&self, user: &NewUser) -> Result<User, UserRepositoryError> {
        bounded(
            self.pool.query_timeout(),
            async {
                let mut conn = self.pool.get().await.map_err(map_pool_error)?;

                if let Some(duplicate) = find_duplicate(&mut conn, &user.username, &user.email)
                    .await
                    .map_err(map_diesel_error)?
                {
                    debug!(error = duplicate.kind(), "registration rejected");
                    return Err(duplicate);
                }

                let pending = PendingUser::prepare(user, self.clock.utc())?;
                let row: UserRow = diesel::insert_into(users::table)
                    .values(&pending.row(user))
                    .returning(UserRow::as_returning())
                    .get_result(&mut conn)
                    .await
                    .map_err(map_diesel_error)?;

                Ok(row.into_domain())
            },
            UserRepositoryError::timeout,
        )
        .await
    }

    async fn create_and_invite(
        &self,
        user: &NewUser,
        token_hash: &str,
        ttl: Duration,
    ) -> Result<User, UserRepositoryError> {
        bounded(
            self.pool.query_timeout(),
            async {
                let now = self.clock.utc();
                let unit = CreateInvited {
                    user,
                    pending: PendingUser::prepare(user, now)?,
                    token_hash,
                    expires_at: invite_expiry(now, ttl)?,
                };

                let mut conn = self.pool.get().await.map_err(map_pool_error)?;
                execute(&mut conn, &unit).await.map_err(map_tx_error)
            },
            UserRepositoryError::timeout,
        )
        .await
    }

    async fn activate(&self, raw_token: &str) -> Result<User, UserRepositoryError> {
        bounded(
            self.pool.query_timeout(),
            async {
                let unit = Activate {
                    token_hash: hash_token(raw_token),
                    now: self.clock.utc(),
                };
                let mut conn = self.pool.get().await.map_err(map_pool_error)?;
                let user = execute(&mut conn, &unit).await.map_err(map_tx_error)?;
                info!(user_id = %user.id, "account activated");
                Ok(user)
            },
            UserRepositoryError::timeout,
        )
        .await
    }

    async fn get_by_id(&self, id: &UserId) -> Result<User, UserRepositoryError> {
        bounded(
            self.pool.query_timeout(),
            async {
                let mut conn = self.pool.get().await.map_err(map_pool_error)?;

                let row: Option<UserRow> = users::table
                    .find(id.as_uuid())
                    .select(UserRow::as_select())
                    .first(&mut conn)
                    .await
                    .optional()
                    .map_err(map_diesel_error)?;

                row.map(UserRow::into_domain)
                    .ok_or_else(UserRepositoryError::not_found)
            },
            UserRepositoryError::timeout,
        )
        .await
    }

    async fn get_by_email(&self, email: &str) -> Result<User, UserRepositoryError> {
        bounded(
            self.pool.query_timeout(),
            async {
                let mut conn = self.pool.get().await.map_err(map_pool_error)?;

                let row: Option<UserRow> = users::table
                    .filter(users::email.eq(email))
                    .select(UserRow::as_select())
                    .first(&mut conn)
                    .await
                    .optional()
                    .map_err(map_diesel_error)?;

                row.map(UserRow::into_domain)
                    .ok_or_else(UserRepositoryError::not_found)
            },
            UserRepositoryError::timeout,
        )
        .await
    }

    async fn list_all(&self) -> Result<Vec<User>, UserRepositoryError> {
        bounded(
            self.pool.query_timeout(),
            async {
                let mut conn = self.pool.get().await.map_err(map_pool_error)?;

                let rows: Vec<UserRow> = users::table
                    .order((users::created_at.desc(), users::id.desc()))
                    .select(UserRow::as_select())
                    .load(&mut conn)
                    .await
                    .map_err(map_diesel_error)?;

                Ok(rows.into_iter().map(UserRow::into_domain).collect())
            },
            UserRepositoryError::timeout,
        )
        .await
    }

    async fn validate_usernames(
        &self,
        candidates: &[String],
    ) -> Result<Vec<String>, UserRepositoryError> {
        if candidates.is_empty() {
            return Ok(Vec::new());
        }

        bounded(
            self.pool.query_timeout(),
            async {
                let mut conn = self.pool.get().await.map_err(map_pool_error)?;

                let existing: HashSet<String> = users::table
                    .filter(users::username.eq_any(candidates))
                    .select(users::username)
                    .load::<String>(&mut conn)
                    .await
                    .map_err(map_diesel_error)?
                    .into_iter()
                    .collect();

                let mut seen = HashSet::new();
                Ok(candidates
                    .iter()
                    .filter(|name| existing.contains(*name) && seen.insert(name.as_str()))
                    .cloned()
                    .collect())
            },
            UserRepositoryError::timeout,
        )
        .await
    }

    async fn add_rating(&self, id: &UserId, score: i32) -> Result<(), UserRepositoryError> {
        bounded(
            self.pool.query_timeout(),
            async {
                let mut conn = self.pool.get().await.map_err(map_pool_error)?;

                if add_to_rating(&mut conn, *id.as_uuid(), score)
                    .await
                    .map_err(map_diesel_error)?
                {
                    Ok(())
                } else {
                    Err(UserRepositoryError::not_found())
                }
            },
            UserRepositoryError::timeout,
        )
        .await
    }

    async fn reduce_rating(&self, id: &UserId, score: i32) -> Result<(), UserRepositoryError> {
        bounded(
            self.pool.query_timeout(),
            async {
                let mut conn = self.pool.get().await.map_err(map_pool_error)?;

                if remove_from_rating(&mut conn, *id.as_uuid(), score)
                    .await
                    .map_err(map_diesel_error)?
                {
                    Ok(())
                } else {
                    Err(UserRepositoryError::no_rating_to_reduce())
                }
            },
            UserRepositoryError::timeout,
        )
        .await
    }

    async fn delete(&self, id: &UserId) -> Result<(), UserRepositoryError> {
        bounded(
            self.pool.query_timeout(),
            async {
                let unit = DeleteUser { id: *id.as_uuid() };
                let mut conn = self.pool.get().await.map_err(map_pool_error)?;
                execute(&mut conn, &unit).await.map_err(map_tx_error)
            },
            UserRepositoryError::timeout,
        )
        .await
    }

    async fn purge_expired_invites(&self, now: DateTime<Utc>) -> Result<u64, UserRepositoryError> {
        bounded(
            self.pool.query_timeout(),
            async {
                let mut conn = self.pool.get().await.map_err(map_pool_error)?;

                let removed = diesel::delete(invites::table.filter(invites::expires_at.le(now)))
                    .execute(&mut conn)
                    .await
                    .map_err(map_diesel_error)?;

                Ok(u64::try_from(removed).unwrap_or(u64::MAX))
            },
            UserRepositoryError::timeout,
        )
        .await
    }
}
