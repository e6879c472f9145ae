// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # PostgreSQL Connection Pool
//!
//! Wraps `sqlx::postgres::PgPool` in a thin `Database` newtype shared by the
//! relational and document store adapters. The pool connects lazily, so the
//! service starts even when the database is down; `/health` reports it.

use anyhow::{Context, Result};
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;
use tracing::info;

/// Tables used by the relational store and the JSONB document store
const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS sessions (
        session_id VARCHAR(255) PRIMARY KEY,
        user_id VARCHAR(255) NOT NULL,
        project_name VARCHAR(255),
        user_prompt TEXT,
        status VARCHAR(50) NOT NULL DEFAULT 'active',
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS requirements (
        id VARCHAR(255) PRIMARY KEY,
        session_id VARCHAR(255) NOT NULL REFERENCES sessions(session_id) ON DELETE CASCADE,
        seq INTEGER NOT NULL,
        original_content TEXT NOT NULL,
        edited_content TEXT,
        requirement_type VARCHAR(50) NOT NULL DEFAULT 'functional',
        priority VARCHAR(10) NOT NULL DEFAULT 'medium',
        status VARCHAR(20) NOT NULL DEFAULT 'active',
        version INTEGER NOT NULL DEFAULT 1,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS test_cases (
        id VARCHAR(255) PRIMARY KEY,
        session_id VARCHAR(255) NOT NULL REFERENCES sessions(session_id) ON DELETE CASCADE,
        seq INTEGER NOT NULL,
        test_name VARCHAR(255) NOT NULL,
        test_description TEXT,
        test_steps JSONB,
        expected_results TEXT,
        test_type VARCHAR(50),
        priority VARCHAR(10) NOT NULL DEFAULT 'medium',
        status VARCHAR(20) NOT NULL DEFAULT 'active',
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS test_case_requirements (
        test_case_id VARCHAR(255) NOT NULL REFERENCES test_cases(id) ON DELETE CASCADE,
        requirement_id VARCHAR(255) NOT NULL REFERENCES requirements(id) ON DELETE CASCADE,
        coverage_type VARCHAR(50) NOT NULL DEFAULT 'direct',
        PRIMARY KEY (test_case_id, requirement_id)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS documents (
        collection VARCHAR(255) NOT NULL,
        id VARCHAR(255) NOT NULL,
        body JSONB NOT NULL,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        PRIMARY KEY (collection, id)
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_sessions_user ON sessions(user_id)",
    "CREATE INDEX IF NOT EXISTS idx_requirements_session ON requirements(session_id)",
    "CREATE INDEX IF NOT EXISTS idx_test_cases_session ON test_cases(session_id)",
];

#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Build a lazily connecting pool; fails only on a malformed URL
    pub fn connect_lazy(connection_string: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(5))
            .connect_lazy(connection_string)
            .context("Invalid PostgreSQL connection string")?;

        Ok(Self { pool })
    }

    pub fn get_pool(&self) -> &PgPool {
        &self.pool
    }

    /// Create every table and index if missing
    pub async fn ensure_schema(&self) -> Result<()> {
        for statement in SCHEMA {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .context("Failed to apply schema statement")?;
        }
        info!("PostgreSQL schema is up to date");
        Ok(())
    }
}
