//! OMERO.web wire types and the pure helpers built on them.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use limsync_core::{AnnotationPayload, ContainerId, ContainerKind, Error, ImageId, Result};

pub const OME_SCHEMA: &str = "http://www.openmicroscopy.org/Schemas/OME/2016-06";

/// Paged listing from `/api/v0/m/...`.
#[derive(Debug, Clone, Deserialize)]
pub struct ListResponse<T> {
    pub data: Vec<T>,
    #[serde(default)]
    pub meta: Option<ListMeta>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ListMeta {
    #[serde(rename = "totalCount")]
    pub total_count: usize,
}

/// A named model object (project, dataset, image, group).
#[derive(Debug, Clone, Deserialize)]
pub struct NamedObject {
    #[serde(rename = "@id")]
    pub id: i64,
    #[serde(rename = "Name", default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExperimenterObject {
    #[serde(rename = "@id")]
    pub id: i64,
    #[serde(rename = "omeName")]
    pub ome_name: String,
}

/// `GET /api/v0/token/`
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub data: String,
}

/// One entry of `GET /api/v0/servers/`.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerEntry {
    pub id: i64,
    pub host: String,
    pub port: u16,
    #[serde(default)]
    pub server: Option<String>,
}

/// `POST /api/v0/login/`
#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
}

/// `POST /api/v0/m/save/`
#[derive(Debug, Clone, Deserialize)]
pub struct SaveResponse {
    pub data: NamedObject,
}

/// `GET /webgateway/original_file_paths/{id}/`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OriginalFilePaths {
    #[serde(default)]
    pub repo: Vec<String>,
    #[serde(default)]
    pub client: Vec<String>,
}

/// `POST /webclient/annotate_map/`
#[derive(Debug, Clone, Deserialize)]
pub struct AnnotateMapResponse {
    #[serde(rename = "annId")]
    pub ann_id: i64,
}

/// Body for `POST /api/v0/m/save/` creating a container.
#[derive(Debug, Clone, Serialize)]
pub struct NewContainer<'a> {
    #[serde(rename = "@type")]
    pub object_type: String,
    #[serde(rename = "Name")]
    pub name: &'a str,
}

impl<'a> NewContainer<'a> {
    pub fn new(kind: ContainerKind, name: &'a str) -> Self {
        Self {
            object_type: format!("{}#{}", OME_SCHEMA, kind.as_str()),
            name,
        }
    }
}

/// Pick the login server entry matching `host:port`, or the only one.
pub fn select_server(servers: &[ServerEntry], host: &str, port: u16) -> Result<i64> {
    if let Some(entry) = servers
        .iter()
        .find(|s| s.host.eq_ignore_ascii_case(host) && s.port == port)
    {
        return Ok(entry.id);
    }
    match servers {
        [only] => Ok(only.id),
        [] => Err(Error::Config("OMERO.web lists no servers".into())),
        _ => Err(Error::Config(format!(
            "no OMERO.web server entry for {}:{} (available: {})",
            host,
            port,
            servers
                .iter()
                .map(|s| format!("{}:{}", s.host, s.port))
                .collect::<Vec<_>>()
                .join(", ")
        ))),
    }
}

/// Final path component, accepting either separator.
pub fn path_basename(path: &str) -> &str {
    path.rsplit(|c| c == '/' || c == '\\').next().unwrap_or(path)
}

/// Whether any imported file of an image is named exactly `name`.
pub fn paths_contain_filename(paths: &OriginalFilePaths, name: &str) -> bool {
    paths
        .client
        .iter()
        .chain(paths.repo.iter())
        .any(|p| path_basename(p) == name)
}

/// Ids of objects named exactly `name`, in listing order.
pub fn ids_named(objects: &[NamedObject], name: &str) -> Vec<ContainerId> {
    objects
        .iter()
        .filter(|o| o.name.as_deref() == Some(name))
        .map(|o| ContainerId(o.id))
        .collect()
}

/// `POST /webclient/api/links/` body putting `children` under `parent`.
pub fn links_body(
    parent_type: &str,
    parent: ContainerId,
    child_type: &str,
    children: &[i64],
) -> Value {
    let mut children_by_type = serde_json::Map::new();
    children_by_type.insert(child_type.to_string(), json!(children));
    let mut by_parent = serde_json::Map::new();
    by_parent.insert(parent.0.to_string(), Value::Object(children_by_type));
    let mut body = serde_json::Map::new();
    body.insert(parent_type.to_string(), Value::Object(by_parent));
    Value::Object(body)
}

/// Form fields for `POST /webclient/annotate_map/`.
pub fn annotate_map_form(
    target: &str,
    images: &[ImageId],
    payload: &AnnotationPayload,
    namespace: &str,
) -> Result<Vec<(String, String)>> {
    let pairs: Vec<[&str; 2]> = payload
        .iter()
        .map(|(k, v)| [k.as_str(), v.as_str()])
        .collect();

    let mut form: Vec<(String, String)> = images
        .iter()
        .map(|id| (target.to_string(), id.to_string()))
        .collect();
    form.push(("mapAnnotation".into(), serde_json::to_string(&pairs)?));
    form.push(("ns".into(), namespace.to_string()));
    Ok(form)
}
