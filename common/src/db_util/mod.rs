//! Interfaces between the application code and database.

mod comparisons;
mod conversions;
mod phrases;

pub use comparisons::{get_all_comparisons, insert_comparison};
pub use phrases::{
    get_phrase_ids, get_phrases_by_ids, get_phrases_ranked, insert_phrase,
    update_phrase_rating_guarded,
};

use crate::error::{RankerError, Result};
use crate::store::{PhraseStore, sorted_by_phrase_id, validate_phrase_text};
use crate::{
    ComparisonRecord, NewComparison, PhraseRecord, RatingUpdate, StoreHealth, StoreSnapshot,
};

use chrono::{DateTime, Utc};
use diesel::connection::SimpleConnection;
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool, PooledConnection};
use diesel::result::DatabaseErrorKind;
use std::env;

pub type PgPool = Pool<ConnectionManager<PgConnection>>;
pub type PgPooledConnection = PooledConnection<ConnectionManager<PgConnection>>;

/// Default number of pooled connections.
pub const DEFAULT_POOL_SIZE: u32 = 10;

const SCHEMA_SQL: &str = "
CREATE TABLE IF NOT EXISTS phrases (
    id SERIAL PRIMARY KEY,
    text VARCHAR(255) NOT NULL,
    elo_rating DOUBLE PRECISION NOT NULL DEFAULT 1500,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now()
);
CREATE TABLE IF NOT EXISTS comparisons (
    id SERIAL PRIMARY KEY,
    phrase1_id INTEGER NOT NULL REFERENCES phrases(id),
    phrase2_id INTEGER NOT NULL REFERENCES phrases(id),
    winner_id INTEGER NOT NULL REFERENCES phrases(id),
    created_at TIMESTAMPTZ NOT NULL DEFAULT now()
);
CREATE INDEX IF NOT EXISTS phrases_elo_rating_idx ON phrases (elo_rating DESC, id ASC);
";

impl From<diesel::result::Error> for RankerError {
    fn from(err: diesel::result::Error) -> Self {
        RankerError::Store(err.to_string())
    }
}

impl From<diesel::ConnectionError> for RankerError {
    fn from(err: diesel::ConnectionError) -> Self {
        RankerError::Store(err.to_string())
    }
}

impl From<diesel::r2d2::PoolError> for RankerError {
    fn from(err: diesel::r2d2::PoolError) -> Self {
        RankerError::Store(err.to_string())
    }
}

/// A serialization failure means a concurrent transaction touched the same
/// row first; report it as stale so the caller recomputes and retries.
fn guarded_write_error(err: diesel::result::Error, phrase_id: u32) -> RankerError {
    match err {
        diesel::result::Error::DatabaseError(DatabaseErrorKind::SerializationFailure, _) => {
            RankerError::StaleRating { phrase_id }
        }
        other => other.into(),
    }
}

/// Read the database URL from the environment (or a `.env` file).
pub fn get_database_url() -> Result<String> {
    dotenvy::dotenv().ok();
    env::var("DATABASE_URL")
        .map_err(|_| RankerError::Store("DATABASE_URL environment variable is not set".to_string()))
}

/// Open a single unpooled connection. Used by scripts and scheduled jobs.
pub fn get_database_connection() -> Result<PgConnection> {
    let database_url = get_database_url()?;
    Ok(PgConnection::establish(&database_url)?)
}

/// Build a connection pool. Fails if no connection can be established.
pub fn get_database_pool(database_url: &str, max_size: u32) -> Result<PgPool> {
    let manager = ConnectionManager::<PgConnection>::new(database_url);
    Pool::builder()
        .max_size(max_size)
        .test_on_check_out(true)
        .build(manager)
        .map_err(|err| RankerError::Store(format!("could not build connection pool: {err}")))
}

pub fn get_pooled_database_connection(pool: &PgPool) -> Result<PgPooledConnection> {
    Ok(pool.get()?)
}

/// Create the tables if they do not exist yet.
pub fn initialize_schema(conn: &mut PgConnection) -> Result<()> {
    conn.batch_execute(SCHEMA_SQL)?;
    log::info!("Phrases and comparisons tables created or already exist");
    Ok(())
}

#[derive(QueryableByName)]
struct TableName {
    #[diesel(sql_type = diesel::sql_types::Text)]
    table_name: String,
}

/// Names of the tables in the public schema.
pub fn get_table_names(conn: &mut PgConnection) -> Result<Vec<String>> {
    let query = "SELECT table_name::text AS table_name
        FROM information_schema.tables
        WHERE table_schema = 'public'
        ORDER BY table_name;";
    let tables: Vec<TableName> = diesel::sql_query(query).load(conn)?;
    Ok(tables.into_iter().map(|t| t.table_name).collect())
}

/// Apply guarded rating writes in ascending id order. Must run inside a
/// transaction; the first refused write aborts it.
fn apply_guarded_updates(conn: &mut PgConnection, updates: &[RatingUpdate]) -> Result<()> {
    for update in sorted_by_phrase_id(updates) {
        let updated = update_phrase_rating_guarded(
            conn,
            update.phrase_id,
            update.previous_rating,
            update.new_rating,
        )?;
        if !updated {
            if get_phrases_by_ids(conn, &[update.phrase_id])?.is_empty() {
                return Err(RankerError::NotFound(update.phrase_id));
            }
            return Err(RankerError::StaleRating {
                phrase_id: update.phrase_id,
            });
        }
    }
    Ok(())
}

/// Write a comparison and both guarded rating updates in one transaction.
pub fn record_comparison_and_update_ratings(
    conn: &mut PgConnection,
    comparison: &NewComparison,
    updates: &[RatingUpdate; 2],
) -> Result<ComparisonRecord> {
    conn.transaction::<_, RankerError, _>(|conn| {
        apply_guarded_updates(conn, updates)?;
        insert_comparison(conn, comparison)
    })
}

/// Read every phrase and comparison in one repeatable-read transaction.
pub fn load_snapshot(conn: &mut PgConnection) -> Result<StoreSnapshot> {
    conn.build_transaction()
        .repeatable_read()
        .read_only()
        .run::<_, RankerError, _>(|conn| {
            Ok(StoreSnapshot {
                phrases: get_phrases_ranked(conn)?,
                comparisons: get_all_comparisons(conn)?,
            })
        })
}

/// Postgres-backed [`PhraseStore`] sharing one connection pool.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Build a pool for `database_url` and make sure the schema exists.
    pub fn connect(database_url: &str, pool_size: u32) -> Result<Self> {
        let pool = get_database_pool(database_url, pool_size)?;
        let mut conn = get_pooled_database_connection(&pool)?;
        initialize_schema(&mut conn)?;
        log::info!("Database pool created with {pool_size} connections");
        Ok(Self::new(pool))
    }

    fn conn(&self) -> Result<PgPooledConnection> {
        get_pooled_database_connection(&self.pool)
    }
}

impl PhraseStore for PgStore {
    fn insert_phrase(&self, text: &str) -> Result<PhraseRecord> {
        let text = validate_phrase_text(text)?;
        insert_phrase(&mut *self.conn()?, &text)
    }

    fn get_phrase_ids(&self) -> Result<Vec<u32>> {
        get_phrase_ids(&mut *self.conn()?)
    }

    fn get_phrases_by_ids(&self, ids: &[u32]) -> Result<Vec<PhraseRecord>> {
        get_phrases_by_ids(&mut *self.conn()?, ids)
    }

    fn record_comparison_and_update_ratings(
        &self,
        comparison: &NewComparison,
        updates: &[RatingUpdate; 2],
    ) -> Result<ComparisonRecord> {
        record_comparison_and_update_ratings(&mut *self.conn()?, comparison, updates)
    }

    fn get_phrases_ranked(&self) -> Result<Vec<PhraseRecord>> {
        get_phrases_ranked(&mut *self.conn()?)
    }

    fn get_comparisons(&self) -> Result<Vec<ComparisonRecord>> {
        get_all_comparisons(&mut *self.conn()?)
    }

    fn load_snapshot(&self) -> Result<StoreSnapshot> {
        load_snapshot(&mut *self.conn()?)
    }

    fn overwrite_ratings(&self, updates: &[RatingUpdate]) -> Result<()> {
        let mut pooled = self.conn()?;
        let conn: &mut PgConnection = &mut pooled;
        conn.transaction::<_, RankerError, _>(|conn| apply_guarded_updates(conn, updates))
    }

    fn health_check(&self) -> Result<StoreHealth> {
        let mut pooled = self.conn()?;
        let conn: &mut PgConnection = &mut pooled;
        diesel::sql_query("SELECT 1").execute(conn)?;
        let tables = get_table_names(conn)?;
        Ok(StoreHealth {
            connected: true,
            tables,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use diesel::result::Error as DieselError;

    fn assert_phrase_store<T: PhraseStore + Clone>() {}

    #[test]
    fn test_pg_store_is_a_phrase_store() {
        assert_phrase_store::<PgStore>();
    }

    #[test]
    fn test_serialization_failure_is_stale() {
        let err = DieselError::DatabaseError(
            DatabaseErrorKind::SerializationFailure,
            Box::new("could not serialize access due to concurrent update".to_string()),
        );
        assert_eq!(
            guarded_write_error(err, 4),
            RankerError::StaleRating { phrase_id: 4 }
        );
    }

    #[test]
    fn test_other_write_errors_are_store_errors() {
        let err = DieselError::DatabaseError(
            DatabaseErrorKind::ForeignKeyViolation,
            Box::new("violates foreign key constraint".to_string()),
        );
        assert!(matches!(guarded_write_error(err, 4), RankerError::Store(_)));
        assert!(matches!(
            guarded_write_error(DieselError::NotFound, 4),
            RankerError::Store(_)
        ));
    }
}
