use async_trait::async_trait;
use sqlx::{postgres::PgPoolOptions, types::Json, Executor, Pool, Postgres, Row};
use uuid::Uuid;

use super::{JobFilter, Store};
use crate::entities::{Job, LedgerEntry, Member, Session};
use crate::error::{conflict_error, invalid_field_error, not_found_error, Error};

pub struct PgStore {
    pool: Pool<Postgres>,
}

impl PgStore {
    #[tracing::instrument(name = "PgStore::new", skip(db_uri))]
    pub async fn new(db_uri: &str, max_connections: u32) -> Result<Self, Error> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(db_uri)
            .await?;

        // job service
        pool.execute("CREATE TABLE IF NOT EXISTS jobs (id UUID PRIMARY KEY, requester_id UUID NOT NULL, driver_id UUID, status VARCHAR NOT NULL, version INT8 NOT NULL, created_at TIMESTAMPTZ NOT NULL, data JSONB NOT NULL)")
            .await?;
        pool.execute("CREATE INDEX IF NOT EXISTS jobs_requester_idx ON jobs (requester_id)")
            .await?;
        pool.execute("CREATE INDEX IF NOT EXISTS jobs_driver_idx ON jobs (driver_id)")
            .await?;

        // member service
        pool.execute("CREATE TABLE IF NOT EXISTS members (id UUID PRIMARY KEY, email VARCHAR NOT NULL UNIQUE, status VARCHAR NOT NULL, password_hash VARCHAR NOT NULL, version INT8 NOT NULL, data JSONB NOT NULL)")
            .await?;

        // session service
        pool.execute("CREATE TABLE IF NOT EXISTS sessions (token UUID PRIMARY KEY, member_id UUID NOT NULL, expires_at TIMESTAMPTZ NOT NULL, data JSONB NOT NULL)")
            .await?;

        // settings (KV store)
        pool.execute("CREATE TABLE IF NOT EXISTS settings (key VARCHAR PRIMARY KEY, data JSONB NOT NULL)")
            .await?;

        Ok(Self { pool })
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .and_then(|db_err| db_err.code())
        .map(|code| code == "23505")
        .unwrap_or(false)
}

#[async_trait]
impl Store for PgStore {
    #[tracing::instrument(skip(self, job), fields(job_id = %job.id))]
    async fn insert_job(&self, job: &Job) -> Result<(), Error> {
        self.pool
            .execute(
                sqlx::query("INSERT INTO jobs (id, requester_id, driver_id, status, version, created_at, data) VALUES ($1, $2, $3, $4, $5, $6, $7)")
                    .bind(&job.id)
                    .bind(&job.requester_id)
                    .bind(&job.driver_id)
                    .bind(job.status.name())
                    .bind(job.version)
                    .bind(&job.created_at)
                    .bind(Json(job)),
            )
            .await?;

        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn find_job(&self, id: Uuid) -> Result<Option<Job>, Error> {
        let maybe_result = self
            .pool
            .fetch_optional(sqlx::query("SELECT data FROM jobs WHERE id = $1").bind(&id))
            .await?;

        match maybe_result {
            Some(result) => {
                let Json(job): Json<Job> = result.try_get("data")?;
                Ok(Some(job))
            }
            None => Ok(None),
        }
    }

    #[tracing::instrument(skip(self))]
    async fn list_jobs(&self, filter: JobFilter) -> Result<Vec<Job>, Error> {
        let query = match filter {
            JobFilter::All => sqlx::query("SELECT data FROM jobs ORDER BY created_at DESC"),
            JobFilter::RequestedBy(id) => {
                sqlx::query("SELECT data FROM jobs WHERE requester_id = $1 ORDER BY created_at DESC")
                    .bind(id)
            }
            JobFilter::VisibleToDriver(id) => sqlx::query(
                "SELECT data FROM jobs WHERE status = 'PENDING' OR driver_id = $1 ORDER BY created_at DESC",
            )
            .bind(id),
        };

        let results = self.pool.fetch_all(query).await?;

        let mut jobs = Vec::with_capacity(results.len());
        for result in results.iter() {
            let Json(job): Json<Job> = result.try_get("data")?;
            jobs.push(job);
        }

        Ok(jobs)
    }

    #[tracing::instrument(skip(self, job), fields(job_id = %job.id, version = job.version))]
    async fn update_job(&self, job: &mut Job) -> Result<(), Error> {
        let expected_version = job.version;
        job.version += 1;

        let result = self
            .pool
            .execute(
                sqlx::query("UPDATE jobs SET driver_id = $2, status = $3, version = $4, data = $5 WHERE id = $1 AND version = $6")
                    .bind(&job.id)
                    .bind(&job.driver_id)
                    .bind(job.status.name())
                    .bind(job.version)
                    .bind(Json(&*job))
                    .bind(expected_version),
            )
            .await;

        let rows_affected = match result {
            Ok(done) => done.rows_affected(),
            Err(err) => {
                job.version = expected_version;
                return Err(err.into());
            }
        };

        if rows_affected == 0 {
            job.version = expected_version;

            let exists = self.find_job(job.id).await?.is_some();
            if !exists {
                return Err(not_found_error());
            }

            tracing::warn!("job was modified concurrently");
            return Err(conflict_error());
        }

        Ok(())
    }

    #[tracing::instrument(skip(self, member), fields(member_id = %member.id))]
    async fn insert_member(&self, member: &Member) -> Result<(), Error> {
        let result = self
            .pool
            .execute(
                sqlx::query("INSERT INTO members (id, email, status, password_hash, version, data) VALUES ($1, $2, $3, $4, $5, $6)")
                    .bind(&member.id)
                    .bind(&member.email)
                    .bind(member.status.name())
                    .bind(&member.password_hash)
                    .bind(member.version)
                    .bind(Json(member)),
            )
            .await;

        match result {
            Ok(_) => Ok(()),
            Err(err) if is_unique_violation(&err) => Err(invalid_field_error("email")),
            Err(err) => Err(err.into()),
        }
    }

    #[tracing::instrument(skip(self))]
    async fn find_member(&self, id: Uuid) -> Result<Option<Member>, Error> {
        let maybe_result = self
            .pool
            .fetch_optional(
                sqlx::query("SELECT password_hash, data FROM members WHERE id = $1").bind(&id),
            )
            .await?;

        match maybe_result {
            Some(result) => {
                let Json(mut member): Json<Member> = result.try_get("data")?;
                member.password_hash = result.try_get("password_hash")?;
                Ok(Some(member))
            }
            None => Ok(None),
        }
    }

    #[tracing::instrument(skip(self))]
    async fn find_member_by_email(&self, email: &str) -> Result<Option<Member>, Error> {
        let maybe_result = self
            .pool
            .fetch_optional(
                sqlx::query("SELECT password_hash, data FROM members WHERE email = $1").bind(email),
            )
            .await?;

        match maybe_result {
            Some(result) => {
                let Json(mut member): Json<Member> = result.try_get("data")?;
                member.password_hash = result.try_get("password_hash")?;
                Ok(Some(member))
            }
            None => Ok(None),
        }
    }

    #[tracing::instrument(skip(self, member), fields(member_id = %member.id, version = member.version))]
    async fn update_member(&self, member: &mut Member) -> Result<(), Error> {
        let expected_version = member.version;
        member.version += 1;

        let result = self
            .pool
            .execute(
                sqlx::query("UPDATE members SET status = $2, password_hash = $3, version = $4, data = $5 WHERE id = $1 AND version = $6")
                    .bind(&member.id)
                    .bind(member.status.name())
                    .bind(&member.password_hash)
                    .bind(member.version)
                    .bind(Json(&*member))
                    .bind(expected_version),
            )
            .await;

        let rows_affected = match result {
            Ok(done) => done.rows_affected(),
            Err(err) => {
                member.version = expected_version;
                return Err(err.into());
            }
        };

        if rows_affected == 0 {
            member.version = expected_version;

            let exists = self.find_member(member.id).await?.is_some();
            if !exists {
                return Err(not_found_error());
            }

            tracing::warn!("member was modified concurrently");
            return Err(conflict_error());
        }

        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn apply_ledger(&self, id: Uuid, entry: LedgerEntry) -> Result<f64, Error> {
        // the row lock serializes concurrent money movements for one member
        let mut tx = self.pool.begin().await?;

        let maybe_result = tx
            .fetch_optional(
                sqlx::query("SELECT data FROM members WHERE id = $1 FOR UPDATE").bind(&id),
            )
            .await?;
        let result = maybe_result.ok_or_else(not_found_error)?;
        let Json(mut member): Json<Member> = result.try_get("data")?;

        let amount = member.apply_ledger(entry)?;
        member.version += 1;

        tx.execute(
            sqlx::query("UPDATE members SET version = $2, data = $3 WHERE id = $1")
                .bind(&id)
                .bind(member.version)
                .bind(Json(&member)),
        )
        .await?;

        tx.commit().await?;

        Ok(amount)
    }

    #[tracing::instrument(skip(self, session), fields(member_id = %session.member_id))]
    async fn insert_session(&self, session: &Session) -> Result<(), Error> {
        self.pool
            .execute(
                sqlx::query("INSERT INTO sessions (token, member_id, expires_at, data) VALUES ($1, $2, $3, $4)")
                    .bind(&session.token)
                    .bind(&session.member_id)
                    .bind(&session.expires_at)
                    .bind(Json(session)),
            )
            .await?;

        Ok(())
    }

    #[tracing::instrument(skip(self, token))]
    async fn find_session(&self, token: Uuid) -> Result<Option<Session>, Error> {
        let maybe_result = self
            .pool
            .fetch_optional(sqlx::query("SELECT data FROM sessions WHERE token = $1").bind(&token))
            .await?;

        match maybe_result {
            Some(result) => {
                let Json(session): Json<Session> = result.try_get("data")?;
                Ok(Some(session))
            }
            None => Ok(None),
        }
    }

    #[tracing::instrument(skip(self, token))]
    async fn delete_session(&self, token: Uuid) -> Result<bool, Error> {
        let result = self
            .pool
            .execute(sqlx::query("DELETE FROM sessions WHERE token = $1").bind(&token))
            .await?;

        Ok(result.rows_affected() > 0)
    }

    #[tracing::instrument(skip(self))]
    async fn load_setting(&self, key: &str) -> Result<Option<serde_json::Value>, Error> {
        let maybe_result = self
            .pool
            .fetch_optional(sqlx::query("SELECT data FROM settings WHERE key = $1").bind(key))
            .await?;

        match maybe_result {
            Some(result) => {
                let Json(value): Json<serde_json::Value> = result.try_get("data")?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    #[tracing::instrument(skip(self, value))]
    async fn save_setting(&self, key: &str, value: serde_json::Value) -> Result<(), Error> {
        self.pool
            .execute(
                sqlx::query("INSERT INTO settings (key, data) VALUES ($1, $2) ON CONFLICT (key) DO UPDATE SET data = EXCLUDED.data")
                    .bind(key)
                    .bind(Json(value)),
            )
            .await?;

        Ok(())
    }
}
