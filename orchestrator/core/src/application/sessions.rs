// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Session Use Cases
//!
//! Review and editing of generation sessions after the fact: requirement
//! edits, coverage, analytics, export and test case regeneration.

use chrono::Utc;
use serde_json::{json, Value};
use tracing::info;
use uuid::Uuid;

use crate::application::error::ServiceError;
use crate::application::modules::test_generation::{generator_text, to_new_test_cases};
use crate::application::services::ServiceRegistry;
use crate::application::text_processing::parse_test_cases;
use crate::domain::agent::TEST_CASE_GENERATOR;
use crate::domain::session::{Requirement, RequirementStatus, RequirementUpdate, Session, SessionId};

pub async fn create_session(
    services: &ServiceRegistry,
    user_id: &str,
    project_name: Option<String>,
    user_prompt: Option<String>,
) -> Result<Session, ServiceError> {
    let simple = Uuid::new_v4().simple().to_string();
    let session_id = SessionId::new(format!("session_{}", &simple[..12]));
    let mut session = Session::new(
        session_id,
        user_id,
        user_prompt.unwrap_or_else(|| "Session creation".to_string()),
    );
    session.project_name = Some(project_name.unwrap_or_else(|| "New Project".to_string()));
    session.status = "created".to_string();

    services.relational.create_session(&session).await?;
    info!(session_id = %session.session_id, user_id = %user_id, "Created session");
    Ok(session)
}

async fn require_session(services: &ServiceRegistry, session_id: &SessionId) -> Result<Session, ServiceError> {
    services
        .relational
        .find_session(session_id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("Session '{}' not found", session_id)))
}

pub async fn get_session(services: &ServiceRegistry, session_id: &SessionId) -> Result<Value, ServiceError> {
    let session = require_session(services, session_id).await?;
    let requirements = services.relational.list_requirements(session_id).await?;
    let test_cases = services.relational.list_test_cases(session_id).await?;
    let coverage = services.relational.coverage_report(session_id).await?;
    Ok(json!({
        "session": session,
        "requirements_count": requirements.len(),
        "test_cases_count": test_cases.len(),
        "coverage_percentage": coverage.coverage_percentage,
    }))
}

pub async fn list_user_sessions(services: &ServiceRegistry, user_id: &str) -> Result<Value, ServiceError> {
    let sessions = services.relational.list_sessions_for_user(user_id).await?;
    Ok(json!({
        "user_id": user_id,
        "total_count": sessions.len(),
        "sessions": sessions,
    }))
}

pub async fn list_requirements(services: &ServiceRegistry, session_id: &SessionId) -> Result<Value, ServiceError> {
    require_session(services, session_id).await?;
    let requirements = services.relational.list_requirements(session_id).await?;
    Ok(json!({
        "session_id": session_id,
        "total_count": requirements.len(),
        "requirements": requirements,
    }))
}

pub async fn add_requirement(
    services: &ServiceRegistry,
    session_id: &SessionId,
    content: &str,
) -> Result<Requirement, ServiceError> {
    let content = content.trim();
    if content.is_empty() {
        return Err(ServiceError::Validation("Requirement content is required".to_string()));
    }
    require_session(services, session_id).await?;
    let mut saved = services
        .relational
        .save_requirements(session_id, &[content.to_string()], RequirementStatus::UserCreated)
        .await?;
    saved
        .pop()
        .ok_or_else(|| ServiceError::Internal("requirement was not stored".to_string()))
}

pub async fn update_requirement(
    services: &ServiceRegistry,
    session_id: &SessionId,
    requirement_id: &str,
    content: &str,
) -> Result<Requirement, ServiceError> {
    let content = content.trim();
    if content.is_empty() {
        return Err(ServiceError::Validation("Requirement content is required".to_string()));
    }
    let update = RequirementUpdate {
        requirement_id: requirement_id.to_string(),
        content: content.to_string(),
    };
    Ok(services.relational.update_requirement(session_id, &update).await?)
}

pub async fn delete_requirement(
    services: &ServiceRegistry,
    session_id: &SessionId,
    requirement_id: &str,
) -> Result<Value, ServiceError> {
    services
        .relational
        .delete_requirement(session_id, requirement_id)
        .await?;
    Ok(json!({
        "status": "deleted",
        "requirement_id": requirement_id,
    }))
}

pub async fn list_test_cases(services: &ServiceRegistry, session_id: &SessionId) -> Result<Value, ServiceError> {
    require_session(services, session_id).await?;
    let test_cases = services.relational.list_test_cases(session_id).await?;
    Ok(json!({
        "session_id": session_id,
        "total_count": test_cases.len(),
        "test_cases": test_cases,
    }))
}

pub async fn coverage_report(services: &ServiceRegistry, session_id: &SessionId) -> Result<Value, ServiceError> {
    require_session(services, session_id).await?;
    let report = services.relational.coverage_report(session_id).await?;
    serde_json::to_value(report).map_err(|e| ServiceError::Internal(e.to_string()))
}

pub async fn analytics(services: &ServiceRegistry, session_id: &SessionId) -> Result<Value, ServiceError> {
    let session = require_session(services, session_id).await?;
    let requirements = services.relational.list_requirements(session_id).await?;
    let test_cases = services.relational.list_test_cases(session_id).await?;
    let coverage = services.relational.coverage_report(session_id).await?;

    let count = |status: RequirementStatus| requirements.iter().filter(|r| r.status == status).count();
    Ok(json!({
        "session_id": session_id,
        "status": session.status,
        "metrics": {
            "total_requirements": requirements.len(),
            "edited_requirements": count(RequirementStatus::Edited),
            "user_created_requirements": count(RequirementStatus::UserCreated),
            "total_test_cases": test_cases.len(),
            "coverage_percentage": coverage.coverage_percentage,
        },
    }))
}

pub async fn export(services: &ServiceRegistry, session_id: &SessionId) -> Result<Value, ServiceError> {
    let session = require_session(services, session_id).await?;
    let requirements = services.relational.list_requirements(session_id).await?;
    let test_cases = services.relational.list_test_cases(session_id).await?;
    Ok(json!({
        "session": session,
        "requirements": requirements,
        "test_cases": test_cases,
        "exported_at": Utc::now(),
    }))
}

/// Generate additional test cases for one requirement and link them to it
pub async fn regenerate_for_requirement(
    services: &ServiceRegistry,
    session_id: &SessionId,
    requirement_id: &str,
) -> Result<Value, ServiceError> {
    require_session(services, session_id).await?;
    let requirements = services.relational.list_requirements(session_id).await?;
    let requirement = requirements
        .iter()
        .find(|r| r.id == requirement_id)
        .ok_or_else(|| ServiceError::NotFound(format!("Requirement '{}' not found", requirement_id)))?;

    let prompt = format!(
        "Generate test cases for this requirement: {}",
        requirement.effective_content()
    );
    let response = services.agent.run(TEST_CASE_GENERATOR, &prompt).await?;
    let generated = parse_test_cases(&generator_text(&response));
    let saved = services
        .relational
        .save_test_cases(session_id, &to_new_test_cases(generated, &[requirement.id.clone()]))
        .await?;

    info!(session_id = %session_id, requirement_id = %requirement_id, test_cases = saved.len(), "Regenerated test cases");
    Ok(json!({
        "status": "regenerated",
        "requirement_id": requirement_id,
        "new_test_cases_count": saved.len(),
        "test_cases": saved,
    }))
}

/// Replace every active test case with a fresh generation over the current
/// (possibly edited) requirements
pub async fn regenerate_all(services: &ServiceRegistry, session_id: &SessionId) -> Result<Value, ServiceError> {
    require_session(services, session_id).await?;
    let requirements = services.relational.list_requirements(session_id).await?;
    if requirements.is_empty() {
        return Err(ServiceError::Validation(format!(
            "Session '{}' has no requirements",
            session_id
        )));
    }

    let texts: Vec<&str> = requirements.iter().map(Requirement::effective_content).collect();
    let prompt = format!("Generate test cases for these requirements: {}", texts.join("; "));
    let response = services.agent.run(TEST_CASE_GENERATOR, &prompt).await?;
    let generated = parse_test_cases(&generator_text(&response));

    let retired = services.relational.retire_test_cases(session_id).await?;
    let requirement_ids: Vec<String> = requirements.iter().map(|r| r.id.clone()).collect();
    let saved = services
        .relational
        .save_test_cases(session_id, &to_new_test_cases(generated, &requirement_ids))
        .await?;

    info!(session_id = %session_id, retired, test_cases = saved.len(), "Regenerated all test cases");
    Ok(json!({
        "status": "regenerated_all",
        "session_id": session_id,
        "replaced_test_cases_count": retired,
        "new_test_cases_count": saved.len(),
        "test_cases": saved,
    }))
}
