/*!

Loads the objects of a step from YAML files, directories of YAML files, and remote URLs.

!*/

use crate::error::{self, Result};
use crate::object::{Document, ObjectIdentity};
use kube::core::DynamicObject;
use log::{debug, trace};
use serde::Deserialize;
use snafu::{ensure, ResultExt};
use std::path::{Path, PathBuf};

/// Only files with this extension are loaded from a directory.
const YAML_EXTENSION: &str = "yaml";

/// Decodes every YAML document in `text`. Empty documents are skipped. `origin` names the file or
/// URL the text came from for error messages.
pub fn decode_documents(text: &str, origin: &str) -> Result<Vec<Document>> {
    let mut documents = Vec::new();
    for document in serde_yaml::Deserializer::from_str(text) {
        let mut value = serde_json::Value::deserialize(document)
            .context(error::YamlDecodeSnafu { path: origin })?;
        if value.is_null() {
            continue;
        }
        // Expected objects often leave out `metadata`, which `DynamicObject` requires.
        if let Some(map) = value.as_object_mut() {
            map.entry("metadata")
                .or_insert_with(|| serde_json::Value::Object(Default::default()));
        }
        let object: DynamicObject = serde_json::from_value(value.clone())
            .context(error::ObjectDecodeSnafu { path: origin })?;
        ensure!(
            !object.api_version().is_empty() && !object.kind().is_empty(),
            error::TypeMetaSnafu { path: origin }
        );
        documents.push(Document {
            object,
            tree: value,
        });
    }
    Ok(documents)
}

/// Reads the YAML file at `path` and decodes its documents.
pub async fn load_file(path: &Path) -> Result<Vec<Document>> {
    trace!("loading objects from '{}'", path.display());
    let text = tokio::fs::read_to_string(path)
        .await
        .context(error::ReadFileSnafu { path })?;
    decode_documents(&text, &path.display().to_string())
}

/// Returns the files that `path` stands for: every `.yaml` file directly inside of it, in name order,
/// if it is a directory, and otherwise `path` itself.
pub async fn yaml_files(path: &Path) -> Result<Vec<PathBuf>> {
    let metadata = tokio::fs::metadata(path)
        .await
        .context(error::DirectoryReadSnafu { path })?;
    if !metadata.is_dir() {
        return Ok(vec![path.to_path_buf()]);
    }
    let mut files = Vec::new();
    let mut entries = tokio::fs::read_dir(path)
        .await
        .context(error::DirectoryReadSnafu { path })?;
    while let Some(entry) = entries
        .next_entry()
        .await
        .context(error::DirectoryReadSnafu { path })?
    {
        let file = entry.path();
        let is_file = entry
            .file_type()
            .await
            .context(error::DirectoryReadSnafu { path })?
            .is_file();
        if is_file && file.extension().map(|ext| ext == YAML_EXTENSION).unwrap_or_default() {
            files.push(file);
        }
    }
    files.sort();
    Ok(files)
}

/// Returns `true` if `s` is an `http` or `https` URL.
pub fn is_url(s: &str) -> bool {
    url::Url::parse(s)
        .map(|url| matches!(url.scheme(), "http" | "https"))
        .unwrap_or_default()
}

/// Downloads `url` and decodes the YAML objects it contains.
pub async fn load_url(url: &str) -> Result<Vec<Document>> {
    debug!("downloading objects from '{}'", url);
    let text = reqwest::get(url)
        .await
        .and_then(|response| response.error_for_status())
        .context(error::FetchSnafu { url })?
        .text()
        .await
        .context(error::FetchSnafu { url })?;
    decode_documents(&text, url)
}

/// Loads the objects that a path in a `TestStep` refers to. URLs are downloaded; anything else is a
/// file or directory relative to the step directory `dir`.
pub async fn objects_from_path(path: &str, dir: &Path) -> Result<Vec<Document>> {
    if is_url(path) {
        return load_url(path).await;
    }
    let mut objects = Vec::new();
    for file in yaml_files(&dir.join(path)).await? {
        objects.extend(load_file(&file).await?);
    }
    Ok(objects)
}
