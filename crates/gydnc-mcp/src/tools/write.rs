//! Write tool: create new entities or update existing ones.

use gydnc_core::{AppContext, Entity};
use serde::{Deserialize, Serialize};

use crate::error::{McpError, McpResult};

/// Operation selector for the write tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WriteOperation {
    /// Create a new entity; the alias must be unique in the target backend.
    Create,
    /// Update an existing entity; omitted fields are left unchanged.
    Update,
}

/// Parameters for the write tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WriteParams {
    /// Which write operation to perform.
    pub operation: WriteOperation,

    /// Target entity alias.
    pub alias: String,

    /// Title; defaults to the alias on create, unchanged on update.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// Description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Full replacement tag set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,

    /// Markdown body; a create without one gets a scaffold body.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,

    /// Explicit target backend. Without it, create follows the default
    /// backend rules and update discovers the containing backend.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backend: Option<String>,
}

/// Output of the write tool.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WriteOutput {
    /// Alias written.
    pub alias: String,
    /// Backend the entity was written to.
    pub backend: String,
    /// Content ID after the write.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cid: Option<String>,
    /// True for create, false for update.
    pub created: bool,
}

fn apply_fields(entity: &mut Entity, params: &WriteParams) {
    if let Some(title) = &params.title {
        entity.title = title.clone();
    }
    if let Some(description) = &params.description {
        entity.description = description.clone();
    }
    if let Some(tags) = &params.tags {
        entity.tags = tags.clone();
        entity.normalize_tags();
    }
    if let Some(body) = &params.body {
        entity.body = body.clone();
        entity.refresh_cid();
    }
}

/// Handle a write tool invocation.
pub fn handle_write(ctx: &AppContext, params: WriteParams) -> McpResult<WriteOutput> {
    if params.alias.is_empty() {
        return Err(McpError::InvalidParams("alias must not be empty".into()));
    }
    let service = ctx.entities();

    match params.operation {
        WriteOperation::Create => {
            let mut entity = Entity::new(&params.alias);
            apply_fields(&mut entity, &params);

            let backend = service.save(&entity, params.backend.as_deref())?;
            Ok(WriteOutput {
                alias: entity.alias,
                backend,
                cid: entity.cid,
                created: true,
            })
        },
        WriteOperation::Update => {
            let backend = match &params.backend {
                Some(backend) => backend.clone(),
                None => service.locate_for_update(&params.alias)?,
            };

            let fetched = service.get(&params.alias, Some(backend.as_str()))?;
            if let Some(parse_error) = fetched.parse_error {
                // A malformed document has no parsed frontmatter to merge
                // the update into.
                return Err(McpError::Core(parse_error));
            }

            let mut entity = fetched.entity;
            apply_fields(&mut entity, &params);
            entity.refresh_cid();

            let backend = service.overwrite(&entity, Some(backend.as_str()))?;
            Ok(WriteOutput {
                alias: entity.alias,
                backend,
                cid: entity.cid,
                created: false,
            })
        },
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use gydnc_core::{Config, config};
    use tempfile::TempDir;

    fn store() -> (AppContext, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let config_path = config::init(temp_dir.path(), false).unwrap();
        let (loaded, dir) = Config::load(&config_path).unwrap();
        (AppContext::new(loaded, dir), temp_dir)
    }

    fn create_params(alias: &str) -> WriteParams {
        WriteParams {
            operation: WriteOperation::Create,
            alias: alias.to_string(),
            title: None,
            description: None,
            tags: None,
            body: None,
            backend: None,
        }
    }

    #[test]
    fn test_create_scaffolds_missing_fields() {
        let (ctx, _temp_dir) = store();
        let output = handle_write(&ctx, create_params("my-new-guidance")).unwrap();

        assert!(output.created);
        assert_eq!(output.backend, config::INIT_BACKEND_NAME);

        let fetched = ctx.entities().get("my-new-guidance", None).unwrap();
        assert_eq!(fetched.entity.title, "my-new-guidance");
        assert!(fetched.entity.body.starts_with("# my-new-guidance"));
        assert_eq!(fetched.entity.cid, output.cid);
    }

    #[test]
    fn test_create_with_explicit_fields() {
        let (ctx, _temp_dir) = store();
        let params = WriteParams {
            title: Some("A Title".into()),
            description: Some("About things".into()),
            tags: Some(vec!["zeta".into(), "alpha".into()]),
            body: Some("# Body\n".into()),
            ..create_params("custom")
        };
        handle_write(&ctx, params).unwrap();

        let fetched = ctx.entities().get("custom", None).unwrap().entity;
        assert_eq!(fetched.title, "A Title");
        assert_eq!(fetched.description, "About things");
        assert_eq!(fetched.tags, vec!["alpha", "zeta"]);
        assert_eq!(fetched.body, "# Body\n");
    }

    #[test]
    fn test_create_duplicate_is_already_exists() {
        let (ctx, _temp_dir) = store();
        handle_write(&ctx, create_params("existing-guidance")).unwrap();

        let error = handle_write(&ctx, create_params("existing-guidance")).unwrap_err();
        assert_eq!(error.kind(), Some("entity-already-exists"));
        assert_eq!(error.error_code(), -32602);
    }

    #[test]
    fn test_update_leaves_omitted_fields_unchanged() {
        let (ctx, _temp_dir) = store();
        let params = WriteParams {
            title: Some("Original Title".into()),
            tags: Some(vec!["keep-me".into()]),
            body: Some("original body\n".into()),
            ..create_params("evolving")
        };
        handle_write(&ctx, params).unwrap();

        let update = WriteParams {
            operation: WriteOperation::Update,
            body: Some("revised body\n".into()),
            ..create_params("evolving")
        };
        let output = handle_write(&ctx, update).unwrap();
        assert!(!output.created);

        let fetched = ctx.entities().get("evolving", None).unwrap().entity;
        assert_eq!(fetched.title, "Original Title");
        assert_eq!(fetched.tags, vec!["keep-me"]);
        assert_eq!(fetched.body, "revised body\n");
    }

    #[test]
    fn test_update_missing_entity() {
        let (ctx, _temp_dir) = store();
        let update = WriteParams {
            operation: WriteOperation::Update,
            ..create_params("ghost")
        };
        let error = handle_write(&ctx, update).unwrap_err();
        assert_eq!(error.kind(), Some("entity-not-found"));
    }

    #[test]
    fn test_empty_alias_rejected() {
        let (ctx, _temp_dir) = store();
        let error = handle_write(&ctx, create_params("")).unwrap_err();
        assert_eq!(error.error_code(), -32602);
    }

    #[test]
    fn test_params_deserialize_from_json() {
        let params: WriteParams = serde_json::from_str(
            r#"{"operation": "update", "alias": "a/b", "tags": ["x"], "backend": "main"}"#,
        )
        .unwrap();
        assert_eq!(params.operation, WriteOperation::Update);
        assert_eq!(params.alias, "a/b");
        assert_eq!(params.backend.as_deref(), Some("main"));
    }
}
