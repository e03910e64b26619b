//! Read tool: list entities by tag filter, or fetch full documents.

use std::collections::BTreeMap;

use gydnc_core::{AppContext, Entity, TagFilter};
use serde::{Deserialize, Serialize};

use crate::error::{McpError, McpResult};

/// Operation selector for the read tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReadOperation {
    /// List entities across all backends, optionally tag-filtered.
    List,
    /// Fetch one or more entities in full.
    Get,
}

/// Parameters for the read tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadParams {
    /// Which read operation to perform.
    pub operation: ReadOperation,

    /// Tag-filter expression for `list` (e.g. `scope:* -deprecated`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter_tags: Option<String>,

    /// Alias prefix restriction for `list`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,

    /// Aliases to fetch for `get`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aliases: Option<Vec<String>>,
}

/// One entity in a `list` response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntitySummary {
    /// Entity alias.
    pub alias: String,
    /// Backend the listed version came from.
    pub backend: String,
    /// Title from frontmatter.
    pub title: String,
    /// Description from frontmatter.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
    /// Sorted tag set.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

/// One entity in a `get` response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityDocument {
    /// Entity alias.
    pub alias: String,
    /// Backend the document was read from.
    pub backend: String,
    /// Title from frontmatter.
    pub title: String,
    /// Description from frontmatter.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
    /// Sorted tag set.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    /// Markdown body.
    pub body: String,
    /// Content ID of the body.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cid: Option<String>,
    /// Set when the stored document was malformed; the body then carries
    /// the raw file contents.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parse_error: Option<String>,
}

/// Output of the read tool.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadOutput {
    /// Listed entities (`list` operation).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entities: Option<Vec<EntitySummary>>,

    /// Fetched documents (`get` operation).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub documents: Option<Vec<EntityDocument>>,

    /// Per-backend or per-alias failures, keyed by name. The usable part
    /// of the result is still returned.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub errors: BTreeMap<String, String>,
}

fn summarize(entity: Entity) -> EntitySummary {
    EntitySummary {
        alias: entity.alias,
        backend: entity.source_backend,
        title: entity.title,
        description: entity.description,
        tags: entity.tags,
    }
}

/// Handle a read tool invocation.
pub fn handle_read(ctx: &AppContext, params: ReadParams) -> McpResult<ReadOutput> {
    match params.operation {
        ReadOperation::List => {
            let filter = params
                .filter_tags
                .as_deref()
                .map(TagFilter::parse)
                .transpose()?;
            let prefix = params.prefix.unwrap_or_default();

            let merged = ctx.entities().list_merged(&prefix, filter.as_ref())?;
            let errors = merged
                .backend_errors
                .into_iter()
                .map(|(backend, e)| (backend, format!("{}: {e}", e.kind())))
                .collect();

            Ok(ReadOutput {
                entities: Some(merged.entities.into_iter().map(summarize).collect()),
                documents: None,
                errors,
            })
        },
        ReadOperation::Get => {
            let aliases = params.aliases.unwrap_or_default();
            if aliases.is_empty() {
                return Err(McpError::InvalidParams(
                    "get requires at least one alias".into(),
                ));
            }

            let service = ctx.entities();
            let mut documents = Vec::with_capacity(aliases.len());
            let mut errors = BTreeMap::new();
            for alias in aliases {
                match service.get(&alias, None) {
                    Ok(result) => documents.push(EntityDocument {
                        alias: result.entity.alias,
                        backend: result.entity.source_backend,
                        title: result.entity.title,
                        description: result.entity.description,
                        tags: result.entity.tags,
                        body: result.entity.body,
                        cid: result.entity.cid,
                        parse_error: result.parse_error.map(|e| e.to_string()),
                    }),
                    Err(e) => {
                        errors.insert(alias, format!("{}: {e}", e.kind()));
                    },
                }
            }

            Ok(ReadOutput {
                entities: None,
                documents: Some(documents),
                errors,
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

    fn seed(ctx: &AppContext, alias: &str, tags: &[&str]) {
        let mut entity = Entity::new(alias);
        entity.tags = tags.iter().map(ToString::to_string).collect();
        ctx.entities().save(&entity, None).unwrap();
    }

    #[test]
    fn test_list_empty_store() {
        let (ctx, _temp_dir) = store();
        let output = handle_read(
            &ctx,
            ReadParams {
                operation: ReadOperation::List,
                filter_tags: None,
                prefix: None,
                aliases: None,
            },
        )
        .unwrap();

        assert_eq!(output.entities.unwrap().len(), 0);
        assert!(output.documents.is_none());
        assert!(output.errors.is_empty());
    }

    #[test]
    fn test_list_with_filter() {
        let (ctx, _temp_dir) = store();
        seed(&ctx, "keep", &["scope:code"]);
        seed(&ctx, "drop", &["scope:code", "deprecated"]);

        let output = handle_read(
            &ctx,
            ReadParams {
                operation: ReadOperation::List,
                filter_tags: Some("scope:* -deprecated".into()),
                prefix: None,
                aliases: None,
            },
        )
        .unwrap();

        let entities = output.entities.unwrap();
        assert_eq!(entities.len(), 1);
        assert_eq!(entities[0].alias, "keep");
    }

    #[test]
    fn test_list_invalid_filter_is_invalid_params() {
        let (ctx, _temp_dir) = store();
        let error = handle_read(
            &ctx,
            ReadParams {
                operation: ReadOperation::List,
                filter_tags: Some("-".into()),
                prefix: None,
                aliases: None,
            },
        )
        .unwrap_err();
        assert_eq!(error.error_code(), -32602);
    }

    #[test]
    fn test_get_returns_documents_and_errors() {
        let (ctx, _temp_dir) = store();
        seed(&ctx, "present", &[]);

        let output = handle_read(
            &ctx,
            ReadParams {
                operation: ReadOperation::Get,
                filter_tags: None,
                prefix: None,
                aliases: Some(vec!["present".into(), "missing".into()]),
            },
        )
        .unwrap();

        let documents = output.documents.unwrap();
        assert_eq!(documents.len(), 1);
        assert_eq!(documents[0].alias, "present");
        assert!(documents[0].body.starts_with("# present"));
        assert!(documents[0].cid.is_some());

        assert_eq!(output.errors.len(), 1);
        assert!(output.errors["missing"].starts_with("entity-not-found"));
    }

    #[test]
    fn test_get_without_aliases_is_invalid_params() {
        let (ctx, _temp_dir) = store();
        let error = handle_read(
            &ctx,
            ReadParams {
                operation: ReadOperation::Get,
                filter_tags: None,
                prefix: None,
                aliases: None,
            },
        )
        .unwrap_err();
        assert_eq!(error.error_code(), -32602);
    }

    #[test]
    fn test_params_deserialize_from_json() {
        let params: ReadParams = serde_json::from_str(
            r#"{"operation": "list", "filterTags": "scope:*", "prefix": "must/"}"#,
        )
        .unwrap();
        assert_eq!(params.operation, ReadOperation::List);
        assert_eq!(params.filter_tags.as_deref(), Some("scope:*"));
        assert_eq!(params.prefix.as_deref(), Some("must/"));
    }
}
