//! 🏗️ Index lifecycle — exists, create, delete. The whole circle of life, minus the lion.
//!
//! These run once, before the first document moves, and only from the job driver.
//! Mid-run index surgery is not a thing gcx does.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::info;

use super::elasticsearch_client::ElasticsearchClient;

/// 🎛️ What to do about the target index before loading starts.
#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum IndexSetupMode {
    /// 🔒 The index must already exist. Anything else is a config problem.
    #[default]
    Require,
    /// 🌱 Create it from the mapping file if it isn't there yet.
    CreateIfMissing,
    /// 💣 Delete it if present, then create it fresh. Read that twice before enabling.
    Recreate,
}

#[derive(Debug, Deserialize, Clone)]
pub struct IndexSetupConfig {
    #[serde(default)]
    pub mode: IndexSetupMode,
    #[serde(default = "default_mapping_file")]
    pub mapping_file: PathBuf,
}

fn default_mapping_file() -> PathBuf {
    PathBuf::from("crates/gcx/mappings/address_v0_1.json")
}

impl Default for IndexSetupConfig {
    fn default() -> Self {
        Self {
            mode: IndexSetupMode::default(),
            mapping_file: default_mapping_file(),
        }
    }
}

impl ElasticsearchClient {
    /// 🔍 HEAD the index. 200 means yes, 404 means no, anything else means "we need to talk".
    pub async fn index_exists(&self, name: &str) -> Result<bool> {
        let index_url = self.url_for(name);
        let response = self
            .perform(|http| http.head(&index_url))
            .await
            .context(format!(
                "💀 Reached out to check if index '{}' exists. Got ghosted. Schrodinger's index: neither alive nor dead until the network cooperates.",
                name
            ))?;
        match response.status().as_u16() {
            200 => Ok(true),
            404 => Ok(false),
            other => anyhow::bail!(
                "💀 Asked whether index '{}' exists and got status {} instead of a yes or a no. Elasticsearch is being cryptic again.",
                name,
                other
            ),
        }
    }

    /// 🌱 PUT a new index with `mapping` as the body.
    ///
    /// Every whitespace character is stripped from the mapping first, including any
    /// inside JSON string values. Mappings don't carry spaces in their strings, and the
    /// cluster only needs the compact form.
    pub async fn create_index(&self, name: &str, mapping: &str) -> Result<()> {
        let compact: String = mapping.split_whitespace().collect();
        let create_url = self.url_for(&format!("{}?wait_for_active_shards=1", name));
        let response = self
            .perform(|http| {
                http.put(&create_url)
                    .header("Content-Type", "application/json")
                    .body(compact.clone())
            })
            .await
            .context(format!(
                "💀 Tried to create index '{}' and the request never came back.",
                name
            ))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!(
                "💀 Elasticsearch refused to create index '{}' with status {}. It said: '{}'. Usually that's the mapping. Sometimes it's an index that already exists. Occasionally it's Mercury in retrograde.",
                name,
                status,
                body
            );
        }
        info!("🌱 created index '{}'", name);
        Ok(())
    }

    pub async fn create_index_from_file(&self, name: &str, mapping_file: &Path) -> Result<()> {
        let mapping = tokio::fs::read_to_string(mapping_file)
            .await
            .context(format!(
                "💀 The mapping file '{}' could not be read. The index '{}' stays unborn.",
                mapping_file.display(),
                name
            ))?;
        self.create_index(name, &mapping).await
    }

    /// 🗑️ DELETE the index. No confirmation prompt. No undo. No regrets (hopefully).
    pub async fn delete_index(&self, name: &str) -> Result<()> {
        let index_url = self.url_for(name);
        let response = self
            .perform(|http| http.delete(&index_url))
            .await
            .context(format!(
                "💀 Tried to delete index '{}' and the request got lost on the way.",
                name
            ))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!(
                "💀 Elasticsearch would not delete index '{}': status {}, body '{}'.",
                name,
                status,
                body
            );
        }
        info!("🗑️ deleted index '{}'", name);
        Ok(())
    }

    /// 🎛️ Bring the target index into the state the setup mode asks for.
    pub async fn prepare_index(&self, name: &str, setup: &IndexSetupConfig) -> Result<()> {
        match setup.mode {
            IndexSetupMode::Require => {
                if !self.index_exists(name).await? {
                    anyhow::bail!(
                        "💀 Index '{}' does not exist and never has, as far as we can tell. We knocked. We waited. The door remained unanswered. Create it, or set index_setup.mode = \"create_if_missing\".",
                        name
                    );
                }
                info!("✅ index '{}' exists and is accepting visitors", name);
            }
            IndexSetupMode::CreateIfMissing => {
                if self.index_exists(name).await? {
                    info!("✅ index '{}' already exists, leaving it be", name);
                } else {
                    self.create_index_from_file(name, &setup.mapping_file).await?;
                }
            }
            IndexSetupMode::Recreate => {
                if self.index_exists(name).await? {
                    self.delete_index(name).await?;
                }
                self.create_index_from_file(name, &setup.mapping_file).await?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_string, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn the_one_where_existence_is_a_status_code() -> Result<()> {
        let the_server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .and(path("/address"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&the_server)
            .await;
        Mock::given(method("HEAD"))
            .and(path("/ghost"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&the_server)
            .await;
        Mock::given(method("HEAD"))
            .and(path("/forbidden"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&the_server)
            .await;

        let the_client = ElasticsearchClient::impatient(the_server.uri());
        assert!(the_client.index_exists("address").await?);
        assert!(!the_client.index_exists("ghost").await?);
        assert!(the_client.index_exists("forbidden").await.is_err());
        Ok(())
    }

    #[tokio::test]
    async fn the_one_where_the_mapping_loses_all_its_whitespace() -> Result<()> {
        let the_server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/address"))
            .and(query_param("wait_for_active_shards", "1"))
            .and(body_string(r#"{"mappings":{"properties":{"city":{"type":"keyword"}}}}"#))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&the_server)
            .await;

        let the_mapping = "{\n  \"mappings\": {\n    \"properties\": {\n      \"city\": { \"type\": \"keyword\" }\n    }\n  }\n}\n";
        ElasticsearchClient::impatient(the_server.uri())
            .create_index("address", the_mapping)
            .await?;
        Ok(())
    }

    #[tokio::test]
    async fn the_one_where_require_mode_refuses_a_missing_index() {
        let the_server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .and(path("/address"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&the_server)
            .await;

        let the_result = ElasticsearchClient::impatient(the_server.uri())
            .prepare_index("address", &IndexSetupConfig::default())
            .await;
        assert!(the_result.is_err());
    }

    #[tokio::test]
    async fn the_one_where_recreate_tears_down_and_rebuilds() -> Result<()> {
        let the_dir = tempfile::tempdir()?;
        let the_mapping_file = the_dir.path().join("mapping.json");
        tokio::fs::write(&the_mapping_file, "{ \"mappings\": {} }").await?;

        let the_server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .and(path("/address"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&the_server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/address"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&the_server)
            .await;
        Mock::given(method("PUT"))
            .and(path("/address"))
            .and(body_string(r#"{"mappings":{}}"#))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&the_server)
            .await;

        ElasticsearchClient::impatient(the_server.uri())
            .prepare_index(
                "address",
                &IndexSetupConfig {
                    mode: IndexSetupMode::Recreate,
                    mapping_file: the_mapping_file,
                },
            )
            .await?;
        Ok(())
    }

    #[tokio::test]
    async fn the_one_where_create_if_missing_leaves_an_existing_index_alone() -> Result<()> {
        let the_server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .and(path("/address"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&the_server)
            .await;
        Mock::given(method("PUT"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&the_server)
            .await;

        ElasticsearchClient::impatient(the_server.uri())
            .prepare_index(
                "address",
                &IndexSetupConfig {
                    mode: IndexSetupMode::CreateIfMissing,
                    mapping_file: PathBuf::from("/nope/never/read.json"),
                },
            )
            .await?;
        Ok(())
    }
}
