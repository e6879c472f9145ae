// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Test Generation Module
//!
//! Sends a [`TestGenerationRequest`] to the agent runtime, recovers the test
//! cases from the agent's text and records the run as a session with its
//! requirements and test cases.
//!
//! # Flow
//!
//! 1. Validate the request. Empty requirement text never reaches the agent.
//! 2. Reuse a cached agent response when one exists for the same inputs.
//! 3. Run the selected agent (configured default when the request names none).
//! 4. Parse test cases out of the `test_case_generator_agent` events, falling
//!    back to the whole response text.
//! 5. Persist a new session with its requirements and test cases. A failed
//!    write marks the session `error`.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::application::services::ServiceSettings;
use crate::application::text_processing::{extract_requirements, parse_test_cases, GeneratedTestCase};
use crate::domain::agent::{AgentGateway, AgentResponse, TEST_CASE_GENERATOR};
use crate::domain::generation::TestGenerationRequest;
use crate::domain::module::{BusinessModule, ModuleDescriptor, ModuleError, ModuleId};
use crate::domain::session::{NewTestCase, Requirement, RequirementStatus, Session, SessionId, TestCaseRecord};
use crate::domain::stores::{cache_key, AdapterError, CacheStore, RelationalStore};

pub const ID: &str = "test_generation";

const MAX_REQUIREMENTS: usize = 50;

pub struct TestGenerationModule {
    descriptor: ModuleDescriptor,
    agent: Arc<dyn AgentGateway>,
    relational: Arc<dyn RelationalStore>,
    cache: Arc<dyn CacheStore>,
    settings: ServiceSettings,
}

impl TestGenerationModule {
    pub fn new(
        agent: Arc<dyn AgentGateway>,
        relational: Arc<dyn RelationalStore>,
        cache: Arc<dyn CacheStore>,
        settings: &ServiceSettings,
    ) -> Self {
        Self {
            descriptor: ModuleDescriptor {
                id: ModuleId::new(ID),
                name: "Test Generation".to_string(),
                description: "Delegates test case generation to the agent runtime and records the session".to_string(),
                input_schema: json!({
                    "type": "object",
                    "required": ["requirements"],
                    "properties": {
                        "requirements": {"type": "string", "minLength": 1},
                        "coverage_level": {"enum": ["basic", "comprehensive"]},
                        "domain_context": {"type": "string"},
                        "software_context": {"type": "string"},
                        "user_id": {"type": "string", "minLength": 1},
                        "agent": {"type": "string", "minLength": 1}
                    }
                }),
                output_schema: json!({
                    "type": "object",
                    "required": ["session_id", "agent_response", "test_cases"],
                    "properties": {
                        "session_id": {"type": "string"},
                        "agent_response": {},
                        "test_cases": {"type": "array"},
                        "requirements": {"type": "array"},
                        "cached": {"type": "boolean"}
                    }
                }),
            },
            agent,
            relational,
            cache,
            settings: settings.clone(),
        }
    }
}

impl TestGenerationModule {
    /// Agent response cached for identical generation inputs. Read errors
    /// and unusable entries count as a miss.
    async fn cached_response(&self, key: &str) -> Option<AgentResponse> {
        match self.cache.get(key).await {
            Ok(Some(value)) => match AgentResponse::new(value) {
                Ok(response) => {
                    debug!(key = %key, "Agent response served from cache");
                    Some(response)
                }
                Err(_) => None,
            },
            Ok(None) => None,
            Err(e) => {
                warn!(error = %e, "Cache read failed, treating as miss");
                None
            }
        }
    }

    async fn persist(
        &self,
        session_id: &SessionId,
        requirement_text: &str,
        generated: Vec<GeneratedTestCase>,
    ) -> Result<(Vec<Requirement>, Vec<TestCaseRecord>), AdapterError> {
        let requirement_texts = extract_requirements(requirement_text, MAX_REQUIREMENTS);
        let requirements = self
            .relational
            .save_requirements(session_id, &requirement_texts, RequirementStatus::Active)
            .await?;
        let requirement_ids: Vec<String> = requirements.iter().map(|r| r.id.clone()).collect();

        let test_cases = self
            .relational
            .save_test_cases(session_id, &to_new_test_cases(generated, &requirement_ids))
            .await?;
        self.relational.update_session_status(session_id, "completed").await?;
        Ok((requirements, test_cases))
    }
}

/// Text the test case agent produced, or the whole response when no event is
/// attributed to it
pub fn generator_text(response: &AgentResponse) -> String {
    let own = response.text_from(TEST_CASE_GENERATOR);
    if own.trim().is_empty() {
        response.text()
    } else {
        own
    }
}

/// Attach requirement links to parsed test cases
pub fn to_new_test_cases(generated: Vec<GeneratedTestCase>, requirement_ids: &[String]) -> Vec<NewTestCase> {
    generated
        .into_iter()
        .map(|tc| NewTestCase {
            test_name: tc.test_name,
            test_description: tc.test_description,
            test_steps: tc.test_steps,
            expected_results: tc.expected_results,
            test_type: tc.test_type,
            priority: tc.priority,
            requirement_ids: requirement_ids.to_vec(),
        })
        .collect()
}

#[async_trait]
impl BusinessModule for TestGenerationModule {
    fn descriptor(&self) -> &ModuleDescriptor {
        &self.descriptor
    }

    async fn run(&self, payload: Value) -> Result<Value, ModuleError> {
        let request: TestGenerationRequest = serde_json::from_value(payload)?;
        request.validate()?;

        let agent = request
            .agent
            .clone()
            .unwrap_or_else(|| self.settings.default_agent.clone());
        let user_id = request
            .user_id
            .clone()
            .unwrap_or_else(|| self.settings.agent_user_id.clone());
        let coverage = request.coverage_level.to_string();
        let key = cache_key(
            "testgen",
            &[
                request.requirements.trim(),
                &coverage,
                request.domain_context.as_deref().unwrap_or(""),
                request.software_context.as_deref().unwrap_or(""),
                &agent,
            ],
        );

        let (response, cached) = match self.cached_response(&key).await {
            Some(response) => (response, true),
            None => {
                let response = self.agent.run(&agent, &request.to_prompt()).await?;
                if let Err(e) = self
                    .cache
                    .set(&key, response.as_value(), self.settings.cache_ttl_seconds)
                    .await
                {
                    warn!(error = %e, "Cache write failed");
                }
                (response, false)
            }
        };
        let generated = parse_test_cases(&generator_text(&response));

        let session = Session::new(SessionId::generate(&user_id, &agent), &user_id, request.requirements.trim());
        self.relational.create_session(&session).await?;

        let (requirements, test_cases) = match self.persist(&session.session_id, &request.requirements, generated).await {
            Ok(saved) => saved,
            Err(e) => {
                if let Err(status_err) = self.relational.update_session_status(&session.session_id, "error").await {
                    warn!(session_id = %session.session_id, error = %status_err, "Could not mark session as failed");
                }
                return Err(e.into());
            }
        };

        metrics::counter!("testgen_test_cases_generated_total", "coverage_level" => coverage.clone())
            .increment(test_cases.len() as u64);
        info!(
            session_id = %session.session_id,
            agent = %agent,
            requirements = requirements.len(),
            test_cases = test_cases.len(),
            "Generated test cases"
        );

        Ok(json!({
            "session_id": session.session_id,
            "agent": agent,
            "coverage_level": coverage,
            "agent_response": response.into_value(),
            "requirements": requirements,
            "test_cases": test_cases,
            "cached": cached,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::agent::GatewayError;
    use crate::domain::session::{CoverageReport, RequirementUpdate};
    use crate::infrastructure::cache::InMemoryCache;
    use crate::infrastructure::repositories::InMemoryRelationalStore;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct ScriptedGateway {
        calls: AtomicUsize,
        reply: Value,
    }

    #[async_trait]
    impl AgentGateway for ScriptedGateway {
        async fn run(&self, _agent: &str, _prompt: &str) -> Result<AgentResponse, GatewayError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            AgentResponse::new(self.reply.clone())
        }

        async fn health_check(&self) -> Result<(), GatewayError> {
            Ok(())
        }
    }

    fn events() -> Value {
        json!([
            {"author": "requirement_analyzer_agent", "content": {"parts": [{"text": "REQ-1: users log in"}]}},
            {"author": "test_case_generator_agent", "content": {"parts": [{"text":
                "```json\n[{\"test_id\": \"TC_FUNC_001\", \"test_name\": \"Valid login\", \"description\": \"Log in\", \"test_steps\": [\"open\", \"submit\"], \"expected_result\": \"dashboard\", \"priority\": \"high\"}]\n```"
            }]}}
        ])
    }

    fn module(reply: Value) -> (TestGenerationModule, Arc<ScriptedGateway>, Arc<InMemoryRelationalStore>) {
        let gateway = Arc::new(ScriptedGateway {
            calls: AtomicUsize::new(0),
            reply,
        });
        let relational = Arc::new(InMemoryRelationalStore::new());
        let module = TestGenerationModule::new(
            gateway.clone(),
            relational.clone(),
            Arc::new(InMemoryCache::new()),
            &ServiceSettings::default(),
        );
        (module, gateway, relational)
    }

    #[tokio::test]
    async fn test_generation_persists_session_and_links() {
        let (module, gateway, relational) = module(events());
        let out = module
            .run(json!({"requirements": "The user shall log in with a password.", "coverage_level": "basic"}))
            .await
            .unwrap();

        assert_eq!(gateway.calls.load(Ordering::SeqCst), 1);
        assert_eq!(out["cached"], false);
        assert_eq!(out["test_cases"][0]["test_name"], "Valid login");

        let session_id = SessionId::new(out["session_id"].as_str().unwrap());
        let stored = relational.list_test_cases(&session_id).await.unwrap();
        assert_eq!(stored.len(), 1);
        let report = relational.coverage_report(&session_id).await.unwrap();
        assert_eq!(report.total_requirements, 1);
        assert_eq!(report.coverage_percentage, 100.0);
    }

    #[tokio::test]
    async fn test_identical_request_is_served_from_cache() {
        let (module, gateway, _) = module(events());
        let payload = json!({"requirements": "The user shall log in."});
        module.run(payload.clone()).await.unwrap();
        let second = module.run(payload).await.unwrap();

        assert_eq!(second["cached"], true);
        assert_eq!(gateway.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_cached_response_still_records_a_session_per_user() {
        let (module, gateway, relational) = module(events());
        let alice = module
            .run(json!({"requirements": "The user shall log in.", "user_id": "alice"}))
            .await
            .unwrap();
        let bob = module
            .run(json!({"requirements": "The user shall log in.", "user_id": "bob"}))
            .await
            .unwrap();

        assert_eq!(gateway.calls.load(Ordering::SeqCst), 1);
        assert_eq!(bob["cached"], true);
        assert_ne!(alice["session_id"], bob["session_id"]);
        assert!(bob["session_id"].as_str().unwrap().starts_with("bob_"));
        assert_eq!(bob["test_cases"][0]["test_name"], "Valid login");

        let sessions = relational.list_sessions_for_user("bob").await.unwrap();
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].status, "completed");
        let stored = relational.list_test_cases(&sessions[0].session_id).await.unwrap();
        assert_eq!(stored.len(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_runs_for_one_user_get_distinct_sessions() {
        let (module, _, relational) = module(events());
        let (first, second) = tokio::join!(
            module.run(json!({"requirements": "Users can log in.", "user_id": "alice"})),
            module.run(json!({"requirements": "Users can log out.", "user_id": "alice"})),
        );
        let (first, second) = (first.unwrap(), second.unwrap());

        assert_ne!(first["session_id"], second["session_id"]);
        assert_eq!(relational.list_sessions_for_user("alice").await.unwrap().len(), 2);
    }

    /// Delegates to an in-memory store but refuses test case writes
    struct RejectingTestCases(InMemoryRelationalStore);

    #[async_trait]
    impl RelationalStore for RejectingTestCases {
        async fn create_session(&self, session: &Session) -> Result<(), AdapterError> {
            self.0.create_session(session).await
        }

        async fn find_session(&self, id: &SessionId) -> Result<Option<Session>, AdapterError> {
            self.0.find_session(id).await
        }

        async fn list_sessions_for_user(&self, user_id: &str) -> Result<Vec<Session>, AdapterError> {
            self.0.list_sessions_for_user(user_id).await
        }

        async fn update_session_status(&self, id: &SessionId, status: &str) -> Result<(), AdapterError> {
            self.0.update_session_status(id, status).await
        }

        async fn save_requirements(
            &self,
            session_id: &SessionId,
            contents: &[String],
            status: RequirementStatus,
        ) -> Result<Vec<Requirement>, AdapterError> {
            self.0.save_requirements(session_id, contents, status).await
        }

        async fn list_requirements(&self, session_id: &SessionId) -> Result<Vec<Requirement>, AdapterError> {
            self.0.list_requirements(session_id).await
        }

        async fn update_requirement(
            &self,
            session_id: &SessionId,
            update: &RequirementUpdate,
        ) -> Result<Requirement, AdapterError> {
            self.0.update_requirement(session_id, update).await
        }

        async fn delete_requirement(&self, session_id: &SessionId, requirement_id: &str) -> Result<(), AdapterError> {
            self.0.delete_requirement(session_id, requirement_id).await
        }

        async fn save_test_cases(
            &self,
            _session_id: &SessionId,
            _test_cases: &[NewTestCase],
        ) -> Result<Vec<TestCaseRecord>, AdapterError> {
            Err(AdapterError::ConnectionFailure("test_cases table unavailable".to_string()))
        }

        async fn list_test_cases(&self, session_id: &SessionId) -> Result<Vec<TestCaseRecord>, AdapterError> {
            self.0.list_test_cases(session_id).await
        }

        async fn retire_test_cases(&self, session_id: &SessionId) -> Result<u64, AdapterError> {
            self.0.retire_test_cases(session_id).await
        }

        async fn coverage_report(&self, session_id: &SessionId) -> Result<CoverageReport, AdapterError> {
            self.0.coverage_report(session_id).await
        }

        async fn health_check(&self) -> Result<(), AdapterError> {
            self.0.health_check().await
        }
    }

    #[tokio::test]
    async fn test_failed_persistence_marks_session_as_error() {
        let relational = Arc::new(RejectingTestCases(InMemoryRelationalStore::new()));
        let module = TestGenerationModule::new(
            Arc::new(ScriptedGateway {
                calls: AtomicUsize::new(0),
                reply: events(),
            }),
            relational.clone(),
            Arc::new(InMemoryCache::new()),
            &ServiceSettings::default(),
        );

        let err = module
            .run(json!({"requirements": "The user shall log in.", "user_id": "dana"}))
            .await
            .unwrap_err();
        assert!(matches!(err, ModuleError::Adapter(_)));

        let sessions = relational.list_sessions_for_user("dana").await.unwrap();
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].status, "error");
    }

    #[tokio::test]
    async fn test_blank_requirements_never_reach_agent() {
        let (module, gateway, _) = module(events());
        let err = module.run(json!({"requirements": "  \n "})).await.unwrap_err();
        assert!(matches!(err, ModuleError::InvalidInput(_)));
        assert_eq!(gateway.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_generator_text_falls_back_to_whole_response() {
        let response = AgentResponse::new(json!("TC_SEC_001 covers lockout")).unwrap();
        assert_eq!(generator_text(&response), "TC_SEC_001 covers lockout");
    }
}
