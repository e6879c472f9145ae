// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! `testgen seed`: load one sample session with linked test cases, a
//! traceability entry and ingested requirement text

use anyhow::{Context, Result};
use colored::Colorize;
use serde_json::json;
use tracing::warn;

use testgen_core::application::modules::{build_registry, data_ingestion, traceability};
use testgen_core::application::sessions;
use testgen_core::domain::module::ModuleId;
use testgen_core::domain::service_config::StoreBackend;
use testgen_core::domain::session::{NewTestCase, RequirementStatus};
use testgen_core::infrastructure::build_services;

use super::Overrides;

const SAMPLE_REQUIREMENTS: [&str; 3] = [
    "The system shall allow registered users to log in with email and password.",
    "The system shall lock an account after five consecutive failed login attempts.",
    "Users shall be able to reset a forgotten password through an emailed link.",
];

fn sample_test_case(name: &str, steps: &[&str], expected: &str, requirement_id: &str) -> NewTestCase {
    NewTestCase {
        test_name: name.to_string(),
        test_description: format!("Verify: {}", name.to_lowercase()),
        test_steps: json!(steps),
        expected_results: expected.to_string(),
        test_type: "functional".to_string(),
        priority: "high".to_string(),
        requirement_ids: vec![requirement_id.to_string()],
    }
}

pub async fn run(overrides: Overrides, user_id: &str) -> Result<()> {
    let config = overrides.load_config()?;
    if config.spec.relational.backend == StoreBackend::Memory {
        warn!("Relational store is in-memory; seeded data is discarded when this command exits");
    }

    let built = build_services(&config).context("Failed to initialize service adapters")?;
    if let Some(db) = &built.database {
        db.ensure_schema().await.context("Failed to create relational schema")?;
    }
    if let Some(db) = &built.document_database {
        db.ensure_schema().await.context("Failed to create document table")?;
    }
    let services = &built.registry;
    let modules = build_registry(services).context("Failed to register business modules")?;

    let session = sessions::create_session(
        services,
        user_id,
        Some("Sample Login Project".to_string()),
        Some("Generate test cases for the login feature".to_string()),
    )
    .await
    .context("Failed to create sample session")?;

    let contents: Vec<String> = SAMPLE_REQUIREMENTS.iter().map(|r| r.to_string()).collect();
    let requirements = services
        .relational
        .save_requirements(&session.session_id, &contents, RequirementStatus::Active)
        .await
        .context("Failed to store sample requirements")?;

    let test_cases: Vec<NewTestCase> = requirements
        .iter()
        .zip([
            (
                "Successful login",
                &["Open the login page", "Enter valid credentials", "Submit"][..],
                "User lands on the dashboard",
            ),
            (
                "Account lockout",
                &["Enter a wrong password five times", "Try the correct password"][..],
                "Account is locked and the user is told so",
            ),
            (
                "Password reset",
                &["Request a reset link", "Open the emailed link", "Set a new password"][..],
                "User can log in with the new password",
            ),
        ])
        .map(|(requirement, (name, steps, expected))| sample_test_case(name, steps, expected, &requirement.id))
        .collect();
    let saved = services
        .relational
        .save_test_cases(&session.session_id, &test_cases)
        .await
        .context("Failed to store sample test cases")?;

    modules
        .invoke(
            &ModuleId::new(traceability::ID),
            json!({"operation": "link", "user_story_id": 1001, "test_case_ids": [2001, 2002, 2003]}),
        )
        .await
        .context("Failed to record sample traceability links")?;

    modules
        .invoke(
            &ModuleId::new(data_ingestion::ID),
            json!({
                "operation": "embed_and_store",
                "texts": contents,
                "document_id": format!("{}_requirements", session.session_id),
                "metadata": {"document_type": "requirements", "session_id": session.session_id.to_string()},
            }),
        )
        .await
        .context("Failed to ingest sample requirements")?;

    println!("{}", "✓ Sample data loaded".green());
    println!("  Session: {}", session.session_id.to_string().bold());
    println!("  Requirements: {}", requirements.len());
    println!("  Test cases: {}", saved.len());
    println!("  Traceability: user story 1001 -> test cases 2001, 2002, 2003");
    Ok(())
}
