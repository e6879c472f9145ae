// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Module Registry
//!
//! Static dispatch table from [`ModuleId`] to [`BusinessModule`]. Built once at
//! startup, then shared read-only behind an `Arc`.
//!
//! `invoke` checks the payload against the module's declared input schema
//! before the module sees it; a schema-invalid payload never reaches `run`.

use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

use crate::application::error::ServiceError;
use crate::domain::module::{BusinessModule, ModuleDescriptor, ModuleError, ModuleId};

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Module '{0}' is already registered")]
    AlreadyRegistered(ModuleId),

    #[error("Module '{id}' declares an invalid input schema: {reason}")]
    InvalidSchema { id: ModuleId, reason: String },

    #[error("Unknown module '{0}'")]
    NotFound(ModuleId),

    #[error("Payload for module '{id}' failed validation: {}", .errors.join("; "))]
    ValidationFailure { id: ModuleId, errors: Vec<String> },

    #[error(transparent)]
    Module(#[from] ModuleError),
}

impl From<RegistryError> for ServiceError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::NotFound(_) => ServiceError::NotFound(err.to_string()),
            RegistryError::ValidationFailure { .. } => ServiceError::Validation(err.to_string()),
            RegistryError::AlreadyRegistered(_) | RegistryError::InvalidSchema { .. } => {
                ServiceError::Internal(err.to_string())
            }
            RegistryError::Module(inner) => inner.into(),
        }
    }
}

struct RegisteredModule {
    module: Arc<dyn BusinessModule>,
    validator: jsonschema::Validator,
}

#[derive(Default)]
pub struct ModuleRegistry {
    modules: BTreeMap<ModuleId, RegisteredModule>,
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a module under its descriptor id. Fails if the id is taken or the
    /// input schema does not compile.
    pub fn register(&mut self, module: Arc<dyn BusinessModule>) -> Result<(), RegistryError> {
        let descriptor = module.descriptor();
        let id = descriptor.id.clone();

        if self.modules.contains_key(&id) {
            return Err(RegistryError::AlreadyRegistered(id));
        }

        let validator = jsonschema::validator_for(&descriptor.input_schema).map_err(|e| {
            RegistryError::InvalidSchema {
                id: id.clone(),
                reason: e.to_string(),
            }
        })?;

        debug!(module = %id, "Registered business module");
        self.modules.insert(id, RegisteredModule { module, validator });
        Ok(())
    }

    pub fn descriptor(&self, id: &ModuleId) -> Option<&ModuleDescriptor> {
        self.modules.get(id).map(|m| m.module.descriptor())
    }

    /// Descriptors ordered by id
    pub fn list(&self) -> Vec<&ModuleDescriptor> {
        self.modules.values().map(|m| m.module.descriptor()).collect()
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    pub async fn invoke(&self, id: &ModuleId, payload: Value) -> Result<Value, RegistryError> {
        let entry = self
            .modules
            .get(id)
            .ok_or_else(|| RegistryError::NotFound(id.clone()))?;

        let errors: Vec<String> = entry
            .validator
            .iter_errors(&payload)
            .map(|e| e.to_string())
            .collect();
        if !errors.is_empty() {
            warn!(module = %id, errors = ?errors, "Rejected module payload");
            metrics::counter!("testgen_module_invocations_total", "module" => id.to_string(), "outcome" => "invalid")
                .increment(1);
            return Err(RegistryError::ValidationFailure {
                id: id.clone(),
                errors,
            });
        }

        let result = entry.module.run(payload).await;
        let outcome = if result.is_ok() { "ok" } else { "error" };
        metrics::counter!("testgen_module_invocations_total", "module" => id.to_string(), "outcome" => outcome)
            .increment(1);
        Ok(result?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct EchoModule {
        descriptor: ModuleDescriptor,
        calls: AtomicUsize,
    }

    impl EchoModule {
        fn new(id: &str) -> Self {
            Self {
                descriptor: ModuleDescriptor {
                    id: ModuleId::new(id),
                    name: "Echo".to_string(),
                    description: "Returns its input".to_string(),
                    input_schema: json!({
                        "type": "object",
                        "required": ["content"],
                        "properties": {"content": {"type": "string", "minLength": 1}}
                    }),
                    output_schema: json!({"type": "object"}),
                },
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl BusinessModule for EchoModule {
        fn descriptor(&self) -> &ModuleDescriptor {
            &self.descriptor
        }

        async fn run(&self, payload: Value) -> Result<Value, ModuleError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(json!({"echo": payload}))
        }
    }

    #[tokio::test]
    async fn test_duplicate_registration_fails() {
        let mut registry = ModuleRegistry::new();
        registry.register(Arc::new(EchoModule::new("echo"))).unwrap();
        let err = registry.register(Arc::new(EchoModule::new("echo"))).unwrap_err();
        assert!(matches!(err, RegistryError::AlreadyRegistered(id) if id.as_str() == "echo"));
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test]
    async fn test_invalid_payload_never_reaches_module() {
        let module = Arc::new(EchoModule::new("echo"));
        let mut registry = ModuleRegistry::new();
        registry.register(module.clone()).unwrap();

        for payload in [json!({}), json!({"content": ""}), json!({"content": 7}), json!("text")] {
            let err = registry.invoke(&ModuleId::new("echo"), payload).await.unwrap_err();
            assert!(matches!(err, RegistryError::ValidationFailure { .. }));
        }
        assert_eq!(module.calls.load(Ordering::SeqCst), 0);

        let out = registry
            .invoke(&ModuleId::new("echo"), json!({"content": "hi"}))
            .await
            .unwrap();
        assert_eq!(out["echo"]["content"], "hi");
        assert_eq!(module.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_unknown_module_is_not_found_for_any_payload() {
        let registry = ModuleRegistry::new();
        for payload in [json!(null), json!({"content": "x"})] {
            let err = registry.invoke(&ModuleId::new("missing"), payload).await.unwrap_err();
            assert!(matches!(err, RegistryError::NotFound(_)));
            assert_eq!(ServiceError::from(err).kind(), "NotFound");
        }
    }

    #[test]
    fn test_uncompilable_schema_is_rejected() {
        let mut module = EchoModule::new("broken");
        module.descriptor.input_schema = json!({"type": "string", "pattern": "(unclosed"});
        let mut registry = ModuleRegistry::new();
        assert!(matches!(
            registry.register(Arc::new(module)),
            Err(RegistryError::InvalidSchema { .. })
        ));
    }
}
