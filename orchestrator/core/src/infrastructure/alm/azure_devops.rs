// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Azure DevOps Adapter
//!
//! Work item REST calls behind [`AlmClient`]. Authentication is HTTP Basic
//! with an empty user name and a personal access token.
//!
//! | Operation | Request |
//! |---|---|
//! | test_connection | `GET /_apis/projects/{project}` |
//! | fetch_user_story | `GET /{project}/_apis/wit/workitems/{id}?$expand=relations` |
//! | create_test_case | `PATCH /{project}/_apis/wit/workitems/$Test%20Case`, then a `TestedBy-Reverse` relation |
//! | search_work_items | `POST /{project}/_apis/wit/wiql` |

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::domain::alm::{AlmClient, AlmError, CreatedTestCase, ProjectInfo, UserStory, WorkItemRef};
use crate::domain::test_case::TestCase;

const WORK_ITEM_API_VERSION: &str = "7.1-preview.3";
const WIQL_API_VERSION: &str = "7.1-preview.2";
const JSON_PATCH: &str = "application/json-patch+json";
const TESTED_BY_FORWARD: &str = "Microsoft.VSTS.Common.TestedBy-Forward";
const TESTED_BY_REVERSE: &str = "Microsoft.VSTS.Common.TestedBy-Reverse";

pub struct AzureDevOpsClient {
    client: reqwest::Client,
    /// `{base_url}/{organization}`
    org_url: String,
    project: String,
    auth_header: String,
}

impl AzureDevOpsClient {
    pub fn new(base_url: &str, organization: &str, project: &str, personal_access_token: &str) -> Self {
        let token = STANDARD.encode(format!(":{}", personal_access_token));
        info!(project = %project, "Azure DevOps client configured");
        Self {
            client: reqwest::Client::new(),
            org_url: format!("{}/{}", base_url.trim_end_matches('/'), organization),
            project: project.to_string(),
            auth_header: format!("Basic {}", token),
        }
    }

    fn work_item_url(&self, id: u64) -> String {
        format!("{}/{}/_apis/wit/workitems/{}", self.org_url, self.project, id)
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<Value, AlmError> {
        let response = request
            .header("Authorization", &self.auth_header)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| AlmError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(match status.as_u16() {
                401 | 403 => AlmError::Authentication(body),
                404 => AlmError::NotFound(body),
                code => AlmError::Api { status: code, body },
            });
        }

        response
            .json()
            .await
            .map_err(|e| AlmError::InvalidResponse(e.to_string()))
    }

    async fn link_to_story(&self, test_case_id: u64, user_story_id: u64) -> Result<(), AlmError> {
        let patch = json!([{
            "op": "add",
            "path": "/relations/-",
            "value": {
                "rel": TESTED_BY_REVERSE,
                "url": self.work_item_url(user_story_id),
                "attributes": {"comment": "Tests user story"}
            }
        }]);

        self.send(
            self.client
                .patch(self.work_item_url(test_case_id))
                .query(&[("api-version", WORK_ITEM_API_VERSION)])
                .header("Content-Type", JSON_PATCH)
                .body(patch.to_string()),
        )
        .await
        .map(|_| ())
    }

    /// JSON patch document for a new Test Case work item
    pub fn creation_patch(&self, test_case: &TestCase) -> Value {
        let mut ops = vec![
            json!({"op": "add", "path": "/fields/System.Title", "value": test_case.title}),
            json!({"op": "add", "path": "/fields/System.WorkItemType", "value": "Test Case"}),
            json!({"op": "add", "path": "/fields/Microsoft.VSTS.Common.Priority", "value": test_case.priority}),
            json!({"op": "add", "path": "/fields/System.AreaPath", "value": self.project}),
        ];
        if !test_case.steps.is_empty() {
            ops.push(json!({"op": "add", "path": "/fields/Microsoft.VSTS.TCM.Steps", "value": test_case.steps_xml()}));
        }
        if !test_case.description.is_empty() {
            ops.push(json!({"op": "add", "path": "/fields/System.Description", "value": test_case.description}));
        }
        Value::Array(ops)
    }

    /// WIQL title search; single quotes in user input are doubled
    pub fn wiql(&self, query: &str, work_item_types: &[String]) -> String {
        let escape = |s: &str| s.replace('\'', "''");
        let mut wiql = format!(
            "SELECT [System.Id], [System.Title], [System.State], [System.WorkItemType] FROM WorkItems \
             WHERE [System.TeamProject] = '{}' AND [System.Title] CONTAINS '{}'",
            escape(&self.project),
            escape(query)
        );
        if !work_item_types.is_empty() {
            let types: Vec<String> = work_item_types.iter().map(|t| format!("'{}'", escape(t))).collect();
            wiql.push_str(&format!(" AND [System.WorkItemType] IN ({})", types.join(", ")));
        }
        wiql.push_str(" ORDER BY [System.ChangedDate] DESC");
        wiql
    }
}

fn field_str(fields: &Value, name: &str) -> Option<String> {
    fields.get(name).and_then(Value::as_str).map(str::to_string)
}

/// Id at the end of a `.../workItems/{id}` relation URL (any casing)
fn work_item_id_from_url(url: &str) -> Option<u64> {
    url.to_ascii_lowercase()
        .rsplit_once("workitems/")
        .and_then(|(_, id)| id.split(['?', '/']).next())
        .and_then(|id| id.parse().ok())
}

#[async_trait]
impl AlmClient for AzureDevOpsClient {
    async fn test_connection(&self) -> Result<ProjectInfo, AlmError> {
        let project = self
            .send(
                self.client
                    .get(format!("{}/_apis/projects/{}", self.org_url, self.project))
                    .query(&[("api-version", "7.1")]),
            )
            .await?;

        Ok(ProjectInfo {
            id: field_str(&project, "id"),
            name: field_str(&project, "name"),
            description: field_str(&project, "description"),
            url: field_str(&project, "url"),
        })
    }

    async fn fetch_user_story(&self, user_story_id: u64) -> Result<UserStory, AlmError> {
        let item = self
            .send(
                self.client
                    .get(self.work_item_url(user_story_id))
                    .query(&[("$expand", "relations"), ("api-version", WORK_ITEM_API_VERSION)]),
            )
            .await?;

        let fields = item.get("fields").cloned().unwrap_or(Value::Null);
        let linked_test_case_ids = item
            .get("relations")
            .and_then(Value::as_array)
            .map(|relations| {
                relations
                    .iter()
                    .filter(|r| r.get("rel").and_then(Value::as_str) == Some(TESTED_BY_FORWARD))
                    .filter_map(|r| r.get("url").and_then(Value::as_str))
                    .filter_map(work_item_id_from_url)
                    .collect()
            })
            .unwrap_or_default();

        Ok(UserStory {
            id: user_story_id,
            title: field_str(&fields, "System.Title"),
            description: field_str(&fields, "System.Description").unwrap_or_default(),
            state: field_str(&fields, "System.State"),
            work_item_type: field_str(&fields, "System.WorkItemType"),
            assigned_to: fields
                .get("System.AssignedTo")
                .and_then(|a| a.get("displayName"))
                .and_then(Value::as_str)
                .map(str::to_string),
            priority: fields.get("Microsoft.VSTS.Common.Priority").cloned(),
            acceptance_criteria: field_str(&fields, "Microsoft.VSTS.Common.AcceptanceCriteria").unwrap_or_default(),
            tags: field_str(&fields, "System.Tags").unwrap_or_default(),
            linked_test_case_ids,
        })
    }

    async fn create_test_case(&self, user_story_id: u64, test_case: &TestCase) -> Result<CreatedTestCase, AlmError> {
        let created = self
            .send(
                self.client
                    .patch(format!("{}/{}/_apis/wit/workitems/$Test%20Case", self.org_url, self.project))
                    .query(&[("api-version", WORK_ITEM_API_VERSION)])
                    .header("Content-Type", JSON_PATCH)
                    .body(self.creation_patch(test_case).to_string()),
            )
            .await?;

        let test_case_id = created
            .get("id")
            .and_then(Value::as_u64)
            .ok_or_else(|| AlmError::InvalidResponse("created work item has no id".to_string()))?;

        let (link_success, link_warning) = match self.link_to_story(test_case_id, user_story_id).await {
            Ok(()) => (true, None),
            Err(e) => {
                warn!(test_case_id, user_story_id, error = %e, "Test case created but not linked");
                (false, Some(format!("Test case created but linking failed: {}", e)))
            }
        };

        info!(test_case_id, user_story_id, "Created test case work item");
        Ok(CreatedTestCase {
            test_case_id,
            title: created
                .get("fields")
                .and_then(|f| field_str(f, "System.Title"))
                .or_else(|| Some(test_case.title.clone())),
            user_story_id,
            url: field_str(&created, "url"),
            link_success,
            link_warning,
        })
    }

    async fn search_work_items(&self, query: &str, work_item_types: &[String]) -> Result<Vec<WorkItemRef>, AlmError> {
        let result = self
            .send(
                self.client
                    .post(format!("{}/{}/_apis/wit/wiql", self.org_url, self.project))
                    .query(&[("api-version", WIQL_API_VERSION)])
                    .json(&json!({"query": self.wiql(query, work_item_types)})),
            )
            .await?;

        Ok(result
            .get("workItems")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(|item| {
                        Some(WorkItemRef {
                            id: item.get("id")?.as_u64()?,
                            url: field_str(item, "url"),
                        })
                    })
                    .collect()
            })
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::test_case::TestStep;

    fn client() -> AzureDevOpsClient {
        AzureDevOpsClient::new("https://dev.azure.com/", "contoso", "Billing", "pat")
    }

    #[test]
    fn test_auth_header_encodes_empty_user() {
        // base64(":pat")
        assert_eq!(client().auth_header, "Basic OnBhdA==");
        assert_eq!(client().org_url, "https://dev.azure.com/contoso");
    }

    #[test]
    fn test_work_item_id_from_relation_url() {
        assert_eq!(
            work_item_id_from_url("https://dev.azure.com/contoso/_apis/wit/workItems/77"),
            Some(77)
        );
        assert_eq!(
            work_item_id_from_url("https://dev.azure.com/contoso/Billing/_apis/wit/workitems/77"),
            Some(77)
        );
        assert_eq!(work_item_id_from_url("https://x/_apis/wit/workitems/12?x=1"), Some(12));
        assert_eq!(work_item_id_from_url("https://x/_apis/projects/1"), None);
    }

    #[test]
    fn test_wiql_escapes_quotes_and_filters_types() {
        let wiql = client().wiql("O'Brien login", &["User Story".to_string(), "Bug".to_string()]);
        assert!(wiql.contains("CONTAINS 'O''Brien login'"));
        assert!(wiql.contains("[System.WorkItemType] IN ('User Story', 'Bug')"));
        assert!(wiql.ends_with("ORDER BY [System.ChangedDate] DESC"));
    }

    #[test]
    fn test_creation_patch_includes_steps_and_description() {
        let tc = TestCase {
            title: "Login works".to_string(),
            description: "Verify login".to_string(),
            steps: vec![TestStep {
                action: "Enter credentials".to_string(),
                expected: "Dashboard shown".to_string(),
            }],
            priority: 1,
        };
        let patch = client().creation_patch(&tc);
        let paths: Vec<&str> = patch
            .as_array()
            .unwrap()
            .iter()
            .map(|op| op["path"].as_str().unwrap())
            .collect();
        assert_eq!(
            paths,
            vec![
                "/fields/System.Title",
                "/fields/System.WorkItemType",
                "/fields/Microsoft.VSTS.Common.Priority",
                "/fields/System.AreaPath",
                "/fields/Microsoft.VSTS.TCM.Steps",
                "/fields/System.Description",
            ]
        );
        assert_eq!(patch[2]["value"], 1);
        assert_eq!(patch[3]["value"], "Billing");
    }
}
