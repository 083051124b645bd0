//! Dropbox-backed [`BlobStore`] over the HTTP v2 API.
//!
//! Uses the `files/list_folder`, `files/upload`, `files/download` and
//! `files/delete_v2` endpoints with a bearer access token. Construction goes
//! through [`DropboxStore::login`], which fails when no token is available —
//! build commands never need one, sync commands always do.

use std::path::Path;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use sha2::{Digest, Sha256};
use tracing::{debug, error, info};

use crate::error::{BoxError, LoomError};
use crate::pathutils;
use crate::remote::{BlobStore, RemoteEntry, RemoteEntryKind};

const API_BASE: &str = "https://api.dropboxapi.com/2";
const CONTENT_BASE: &str = "https://content.dropboxapi.com/2";

pub struct DropboxStore {
    client: reqwest::Client,
    token: String,
}

impl DropboxStore {
    /// Single-flight login: resolve the access token (explicit argument wins
    /// over the environment) and build the HTTP client.
    pub fn login(token: Option<String>) -> Result<Self, LoomError> {
        let token = token
            .or_else(|| std::env::var(crate::load_config::ACCESS_TOKEN_VAR).ok())
            .ok_or(LoomError::MissingCredential)?;
        info!("Logged into remote blob store");
        Ok(Self {
            client: reqwest::Client::new(),
            token,
        })
    }

    async fn rpc(&self, endpoint: &str, body: serde_json::Value) -> Result<String, BoxError> {
        let url = format!("{API_BASE}/{endpoint}");
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .await?;
        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            error!(endpoint, %status, body = %text, "Remote API returned error");
            return Err(format!("remote API error at {endpoint}: {status}: {text}").into());
        }
        Ok(text)
    }
}

#[derive(Deserialize)]
struct ListFolderResponse {
    entries: Vec<ListEntry>,
    cursor: String,
    has_more: bool,
}

#[derive(Deserialize)]
struct ListEntry {
    #[serde(rename = ".tag")]
    tag: String,
    path_lower: String,
    size: Option<u64>,
}

#[async_trait]
impl BlobStore for DropboxStore {
    async fn list_folder(
        &self,
        remote_folder: &str,
        recursive: bool,
    ) -> Result<Vec<RemoteEntry>, BoxError> {
        let text = self
            .rpc(
                "files/list_folder",
                json!({ "path": remote_folder, "recursive": recursive }),
            )
            .await?;
        let mut page: ListFolderResponse = serde_json::from_str(&text)?;

        let mut entries = Vec::new();
        loop {
            for entry in page.entries.drain(..) {
                let kind = match entry.tag.as_str() {
                    "file" => RemoteEntryKind::File,
                    "folder" => RemoteEntryKind::Folder,
                    other => {
                        debug!(tag = other, path = %entry.path_lower, "Skipping unknown entry tag");
                        continue;
                    }
                };
                entries.push(RemoteEntry {
                    kind,
                    path: entry.path_lower,
                    size: entry.size,
                });
            }
            if !page.has_more {
                break;
            }
            let text = self
                .rpc(
                    "files/list_folder/continue",
                    json!({ "cursor": page.cursor }),
                )
                .await?;
            page = serde_json::from_str(&text)?;
        }
        info!(folder = remote_folder, count = entries.len(), "Listed remote folder");
        Ok(entries)
    }

    async fn upload(&self, local_path: &Path, remote_path: &str) -> Result<(), BoxError> {
        let content = std::fs::read(local_path)?;
        let content_hash = {
            let mut hasher = Sha256::new();
            hasher.update(&content);
            format!("{:x}", hasher.finalize())
        };
        debug!(
            local = %local_path.display(),
            remote = remote_path,
            size = content.len(),
            hash = %content_hash,
            "Uploading file"
        );

        let arg = json!({ "path": remote_path, "mode": "overwrite", "mute": true });
        let response = self
            .client
            .post(format!("{CONTENT_BASE}/files/upload"))
            .bearer_auth(&self.token)
            .header("Dropbox-API-Arg", arg.to_string())
            .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
            .body(content)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            error!(remote = remote_path, %status, body = %text, "Upload failed");
            return Err(format!("upload failed for {remote_path}: {status}: {text}").into());
        }
        info!(remote = remote_path, "Uploaded file");
        Ok(())
    }

    async fn download(&self, remote_path: &str, local_path: &Path) -> Result<(), BoxError> {
        let arg = json!({ "path": remote_path });
        let response = self
            .client
            .post(format!("{CONTENT_BASE}/files/download"))
            .bearer_auth(&self.token)
            .header("Dropbox-API-Arg", arg.to_string())
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            error!(remote = remote_path, %status, body = %text, "Download failed");
            return Err(format!("download failed for {remote_path}: {status}: {text}").into());
        }
        let bytes = response.bytes().await?;
        pathutils::ensure_parent_dir(local_path)?;
        std::fs::write(local_path, &bytes)?;
        info!(remote = remote_path, local = %local_path.display(), size = bytes.len(), "Downloaded file");
        Ok(())
    }

    async fn delete(&self, remote_path: &str) -> Result<(), BoxError> {
        self.rpc("files/delete_v2", json!({ "path": remote_path }))
            .await?;
        info!(remote = remote_path, "Deleted remote entry");
        Ok(())
    }
}
