// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # PostgreSQL Relational Store
//!
//! `RelationalStore` over the `sessions`, `requirements`, `test_cases` and
//! `test_case_requirements` tables created by [`Database::ensure_schema`].
//! Requirement and test case ids are numbered per session through the `seq`
//! column.
//!
//! [`Database::ensure_schema`]: crate::infrastructure::db::Database::ensure_schema

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgConnection, PgPool, PgRow};
use sqlx::Row;
use std::collections::HashSet;

use crate::domain::session::{
    CoverageReport, NewTestCase, Requirement, RequirementStatus, RequirementUpdate, Session,
    SessionId, TestCaseRecord,
};
use crate::domain::stores::{AdapterError, RelationalStore};

pub struct PostgresRelationalStore {
    pool: PgPool,
}

impl PostgresRelationalStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn session_from_row(row: &PgRow) -> Result<Session, AdapterError> {
    Ok(Session {
        session_id: SessionId::new(row.try_get::<String, _>("session_id")?),
        user_id: row.try_get("user_id")?,
        project_name: row.try_get("project_name")?,
        user_prompt: row.try_get::<Option<String>, _>("user_prompt")?.unwrap_or_default(),
        status: row.try_get("status")?,
        created_at: row.try_get("created_at")?,
    })
}

fn requirement_from_row(row: &PgRow) -> Result<Requirement, AdapterError> {
    let status: String = row.try_get("status")?;
    Ok(Requirement {
        id: row.try_get("id")?,
        session_id: SessionId::new(row.try_get::<String, _>("session_id")?),
        original_content: row.try_get("original_content")?,
        edited_content: row.try_get("edited_content")?,
        requirement_type: row.try_get("requirement_type")?,
        priority: row.try_get("priority")?,
        status: RequirementStatus::parse(&status),
        version: row.try_get("version")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn test_case_from_row(row: &PgRow) -> Result<TestCaseRecord, AdapterError> {
    Ok(TestCaseRecord {
        id: row.try_get("id")?,
        session_id: SessionId::new(row.try_get::<String, _>("session_id")?),
        test_name: row.try_get("test_name")?,
        test_description: row.try_get::<Option<String>, _>("test_description")?.unwrap_or_default(),
        test_steps: row
            .try_get::<Option<serde_json::Value>, _>("test_steps")?
            .unwrap_or_default(),
        expected_results: row.try_get::<Option<String>, _>("expected_results")?.unwrap_or_default(),
        test_type: row.try_get::<Option<String>, _>("test_type")?.unwrap_or_default(),
        priority: row.try_get("priority")?,
        status: row.try_get("status")?,
        created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
        requirement_ids: row
            .try_get::<Option<Vec<String>>, _>("requirement_ids")?
            .unwrap_or_default(),
    })
}

/// Row lock taken before numbering; concurrent writers on one session queue here
const LOCK_SESSION: &str = "SELECT session_id FROM sessions WHERE session_id = $1 FOR UPDATE";

#[derive(Debug, Clone, Copy)]
enum Numbered {
    Requirements,
    TestCases,
}

impl Numbered {
    fn next_seq_query(self) -> &'static str {
        match self {
            Numbered::Requirements => "SELECT COALESCE(MAX(seq) + 1, 0) FROM requirements WHERE session_id = $1",
            Numbered::TestCases => "SELECT COALESCE(MAX(seq) + 1, 0) FROM test_cases WHERE session_id = $1",
        }
    }
}

/// First free `seq` for the session, read while holding the session row lock
/// for the rest of the transaction
async fn next_seq(conn: &mut PgConnection, numbered: Numbered, session_id: &SessionId) -> Result<i32, AdapterError> {
    let locked = sqlx::query(LOCK_SESSION)
        .bind(session_id.as_str())
        .fetch_optional(&mut *conn)
        .await?;
    if locked.is_none() {
        return Err(AdapterError::NotFound(format!("session {}", session_id)));
    }
    let seq = sqlx::query_scalar(numbered.next_seq_query())
        .bind(session_id.as_str())
        .fetch_one(&mut *conn)
        .await?;
    Ok(seq)
}

const REQUIREMENT_COLUMNS: &str = "id, session_id, original_content, edited_content, requirement_type, \
     priority, status, version, created_at, updated_at";

#[async_trait]
impl RelationalStore for PostgresRelationalStore {
    async fn create_session(&self, session: &Session) -> Result<(), AdapterError> {
        sqlx::query(
            r#"
            INSERT INTO sessions (session_id, user_id, project_name, user_prompt, status, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $6)
            "#,
        )
        .bind(session.session_id.as_str())
        .bind(&session.user_id)
        .bind(&session.project_name)
        .bind(&session.user_prompt)
        .bind(&session.status)
        .bind(session.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_session(&self, id: &SessionId) -> Result<Option<Session>, AdapterError> {
        let row = sqlx::query(
            "SELECT session_id, user_id, project_name, user_prompt, status, created_at FROM sessions WHERE session_id = $1",
        )
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(session_from_row).transpose()
    }

    async fn list_sessions_for_user(&self, user_id: &str) -> Result<Vec<Session>, AdapterError> {
        let rows = sqlx::query(
            r#"
            SELECT session_id, user_id, project_name, user_prompt, status, created_at
            FROM sessions
            WHERE user_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(session_from_row).collect()
    }

    async fn update_session_status(&self, id: &SessionId, status: &str) -> Result<(), AdapterError> {
        let result = sqlx::query("UPDATE sessions SET status = $1, updated_at = NOW() WHERE session_id = $2")
            .bind(status)
            .bind(id.as_str())
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AdapterError::NotFound(format!("session {}", id)));
        }
        Ok(())
    }

    async fn save_requirements(
        &self,
        session_id: &SessionId,
        contents: &[String],
        status: RequirementStatus,
    ) -> Result<Vec<Requirement>, AdapterError> {
        let mut tx = self.pool.begin().await?;
        let start = next_seq(&mut *tx, Numbered::Requirements, session_id).await?;

        let mut saved = Vec::with_capacity(contents.len());
        for (offset, content) in contents.iter().enumerate() {
            let seq = start + offset as i32;
            let row = sqlx::query(&format!(
                r#"
                INSERT INTO requirements (id, session_id, seq, original_content, status)
                VALUES ($1, $2, $3, $4, $5)
                RETURNING {}
                "#,
                REQUIREMENT_COLUMNS
            ))
            .bind(session_id.requirement_id(seq as usize))
            .bind(session_id.as_str())
            .bind(seq)
            .bind(content)
            .bind(status.as_str())
            .fetch_one(&mut *tx)
            .await?;
            saved.push(requirement_from_row(&row)?);
        }
        tx.commit().await?;
        Ok(saved)
    }

    async fn list_requirements(&self, session_id: &SessionId) -> Result<Vec<Requirement>, AdapterError> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM requirements WHERE session_id = $1 AND status <> 'deleted' ORDER BY seq",
            REQUIREMENT_COLUMNS
        ))
        .bind(session_id.as_str())
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(requirement_from_row).collect()
    }

    async fn update_requirement(
        &self,
        session_id: &SessionId,
        update: &RequirementUpdate,
    ) -> Result<Requirement, AdapterError> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE requirements
            SET edited_content = $1,
                status = CASE WHEN status = 'user_created' THEN status ELSE 'edited' END,
                version = version + 1,
                updated_at = NOW()
            WHERE id = $2 AND session_id = $3 AND status <> 'deleted'
            RETURNING {}
            "#,
            REQUIREMENT_COLUMNS
        ))
        .bind(&update.content)
        .bind(&update.requirement_id)
        .bind(session_id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => requirement_from_row(&row),
            None => Err(AdapterError::NotFound(format!("requirement {}", update.requirement_id))),
        }
    }

    async fn delete_requirement(&self, session_id: &SessionId, requirement_id: &str) -> Result<(), AdapterError> {
        let result = sqlx::query(
            r#"
            UPDATE requirements SET status = 'deleted', updated_at = NOW()
            WHERE id = $1 AND session_id = $2 AND status <> 'deleted'
            "#,
        )
        .bind(requirement_id)
        .bind(session_id.as_str())
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(AdapterError::NotFound(format!("requirement {}", requirement_id)));
        }
        Ok(())
    }

    async fn save_test_cases(
        &self,
        session_id: &SessionId,
        test_cases: &[NewTestCase],
    ) -> Result<Vec<TestCaseRecord>, AdapterError> {
        let mut tx = self.pool.begin().await?;
        let start = next_seq(&mut *tx, Numbered::TestCases, session_id).await?;

        let now = Utc::now();
        let mut saved = Vec::with_capacity(test_cases.len());
        for (offset, tc) in test_cases.iter().enumerate() {
            let seq = start + offset as i32;
            let id = session_id.test_case_id(seq as usize);
            sqlx::query(
                r#"
                INSERT INTO test_cases (
                    id, session_id, seq, test_name, test_description, test_steps,
                    expected_results, test_type, priority, created_at, updated_at
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $10)
                "#,
            )
            .bind(&id)
            .bind(session_id.as_str())
            .bind(seq)
            .bind(&tc.test_name)
            .bind(&tc.test_description)
            .bind(&tc.test_steps)
            .bind(&tc.expected_results)
            .bind(&tc.test_type)
            .bind(&tc.priority)
            .bind(now)
            .execute(&mut *tx)
            .await?;

            for requirement_id in &tc.requirement_ids {
                sqlx::query(
                    r#"
                    INSERT INTO test_case_requirements (test_case_id, requirement_id, coverage_type)
                    VALUES ($1, $2, 'direct')
                    ON CONFLICT DO NOTHING
                    "#,
                )
                .bind(&id)
                .bind(requirement_id)
                .execute(&mut *tx)
                .await?;
            }

            saved.push(TestCaseRecord {
                id,
                session_id: session_id.clone(),
                test_name: tc.test_name.clone(),
                test_description: tc.test_description.clone(),
                test_steps: tc.test_steps.clone(),
                expected_results: tc.expected_results.clone(),
                test_type: tc.test_type.clone(),
                priority: tc.priority.clone(),
                status: "active".to_string(),
                created_at: now,
                requirement_ids: tc.requirement_ids.clone(),
            });
        }
        tx.commit().await?;
        Ok(saved)
    }

    async fn list_test_cases(&self, session_id: &SessionId) -> Result<Vec<TestCaseRecord>, AdapterError> {
        let rows = sqlx::query(
            r#"
            SELECT t.id, t.session_id, t.test_name, t.test_description, t.test_steps,
                   t.expected_results, t.test_type, t.priority, t.status, t.created_at,
                   ARRAY_REMOVE(ARRAY_AGG(tcr.requirement_id ORDER BY tcr.requirement_id), NULL) AS requirement_ids
            FROM test_cases t
            LEFT JOIN test_case_requirements tcr ON t.id = tcr.test_case_id
            WHERE t.session_id = $1 AND t.status = 'active'
            GROUP BY t.id
            ORDER BY t.seq
            "#,
        )
        .bind(session_id.as_str())
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(test_case_from_row).collect()
    }

    async fn retire_test_cases(&self, session_id: &SessionId) -> Result<u64, AdapterError> {
        let result = sqlx::query(
            "UPDATE test_cases SET status = 'replaced', updated_at = NOW() WHERE session_id = $1 AND status = 'active'",
        )
        .bind(session_id.as_str())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    async fn coverage_report(&self, session_id: &SessionId) -> Result<CoverageReport, AdapterError> {
        let rows = sqlx::query(
            r#"
            SELECT r.id,
                   EXISTS (
                       SELECT 1 FROM test_case_requirements tcr
                       JOIN test_cases t ON t.id = tcr.test_case_id
                       WHERE tcr.requirement_id = r.id AND t.status = 'active'
                   ) AS covered
            FROM requirements r
            WHERE r.session_id = $1 AND r.status <> 'deleted'
            ORDER BY r.seq
            "#,
        )
        .bind(session_id.as_str())
        .fetch_all(&self.pool)
        .await?;

        let mut ids = Vec::with_capacity(rows.len());
        let mut linked = HashSet::new();
        for row in &rows {
            let id: String = row.try_get("id")?;
            if row.try_get::<bool, _>("covered")? {
                linked.insert(id.clone());
            }
            ids.push(id);
        }
        Ok(CoverageReport::compute(
            session_id,
            ids.iter().map(String::as_str),
            &linked,
        ))
    }

    async fn health_check(&self) -> Result<(), AdapterError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numbering_locks_the_session_row() {
        assert!(LOCK_SESSION.ends_with("FOR UPDATE"));
        assert!(LOCK_SESSION.contains("FROM sessions"));
        assert!(Numbered::Requirements.next_seq_query().contains("FROM requirements"));
        assert!(Numbered::TestCases.next_seq_query().contains("FROM test_cases"));
    }
}
