//! Blocking OMERO.web client implementing [`ImageRepository`].

use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::header::REFERER;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

use crate::api::*;
use limsync_core::repository::check_parent;
use limsync_core::{
    AnnotationId, AnnotationPayload, AnnotationTarget, ConnectionConfig, ContainerId,
    ContainerKind, Error, Experimenter, Group, ImageId, ImageRepository, Result, ScopedSession,
    SessionToken,
};

const CSRF_HEADER: &str = "X-CSRFToken";
const PAGE_SIZE: usize = 200;

/// HTTP client for one OMERO.web deployment.
pub struct OmeroWebClient {
    http: Client,
    base_url: String,
}

impl OmeroWebClient {
    /// Create a client from configuration. Does not contact the server.
    pub fn new(config: &ConnectionConfig) -> Result<Self> {
        config.validate()?;
        let http = Client::builder()
            .cookie_store(true)
            .timeout(config.timeout())
            .build()
            .map_err(|e| Error::Http(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: config.web_url(),
        })
    }

    /// Log in as the admin account and narrow the session to the
    /// configured user and group.
    pub fn connect(config: &ConnectionConfig, password: &str) -> Result<(Self, ScopedSession)> {
        let client = Self::new(config)?;
        let session = client.login(config, password)?;
        Ok((client, session))
    }

    fn login(&self, config: &ConnectionConfig, password: &str) -> Result<ScopedSession> {
        let csrf = self.fetch_csrf()?;
        let servers: ListResponse<ServerEntry> = self.get_json("/api/v0/servers/", &[])?;
        let server = select_server(&servers.data, &config.server, config.port)?.to_string();

        debug!("POST /api/v0/login/ as {}", config.admin_user);
        let response = self
            .post(&csrf, "/api/v0/login/")
            .form(&[
                ("username", config.admin_user.as_str()),
                ("password", password),
                ("server", server.as_str()),
            ])
            .send()
            .map_err(|e| Error::Http(format!("Login request failed: {}", e)))?;

        if matches!(
            response.status(),
            StatusCode::FORBIDDEN | StatusCode::UNAUTHORIZED
        ) {
            let reason = Self::read_json::<LoginResponse>(response)
                .ok()
                .and_then(|r| r.message)
                .unwrap_or_else(|| "credentials rejected".into());
            return Err(Error::Auth(reason));
        }
        let login: LoginResponse = Self::read_json(Self::check(response)?)?;
        if !login.success {
            return Err(Error::Auth(
                login.message.unwrap_or_else(|| "login was not accepted".into()),
            ));
        }

        // The CSRF token rotates on login.
        let csrf = self.fetch_csrf()?;
        match self.resolve_scope(config) {
            Ok((user, group)) => {
                info!(
                    "Connected to {} as {} (user={} [{}], group={} [{}])",
                    self.base_url, config.admin_user, user.name, user.id, group.name, group.id
                );
                Ok(ScopedSession::new(user, group, SessionToken::new(csrf)))
            }
            Err(e) => {
                if let Err(close_err) = self.logout(&csrf) {
                    warn!("Failed to log out after scope error: {}", close_err);
                }
                Err(e)
            }
        }
    }

    fn resolve_scope(&self, config: &ConnectionConfig) -> Result<(Experimenter, Group)> {
        let groups: Vec<NamedObject> = self.list_all("/api/v0/m/experimentergroups/", &[])?;
        let group = groups
            .into_iter()
            .find(|g| g.name.as_deref() == Some(config.group.as_str()))
            .map(|g| Group {
                id: g.id,
                name: config.group.clone(),
            })
            .ok_or_else(|| Error::NotFound(format!("group '{}'", config.group)))?;

        let users: Vec<ExperimenterObject> = self.list_all("/api/v0/m/experimenters/", &[])?;
        let user = users
            .into_iter()
            .find(|u| u.ome_name == config.user)
            .map(|u| Experimenter {
                id: u.id,
                name: u.ome_name,
            })
            .ok_or_else(|| Error::NotFound(format!("user '{}'", config.user)))?;

        Ok((user, group))
    }

    fn fetch_csrf(&self) -> Result<String> {
        let token: TokenResponse = self.get_json("/api/v0/token/", &[])?;
        Ok(token.data)
    }

    fn logout(&self, csrf: &str) -> Result<()> {
        debug!("POST /webclient/logout/");
        self.send(self.post(csrf, "/webclient/logout/"))?;
        Ok(())
    }

    // ---------------------------------------------------------------
    // HTTP plumbing
    // ---------------------------------------------------------------

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn post(&self, csrf: &str, path: &str) -> RequestBuilder {
        self.http
            .post(self.url(path))
            .header(CSRF_HEADER, csrf)
            .header(REFERER, &self.base_url)
    }

    fn send(&self, request: RequestBuilder) -> Result<Response> {
        let response = request
            .send()
            .map_err(|e| Error::Http(format!("Request failed: {}", e)))?;
        Self::check(response)
    }

    fn check(response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let url = response.url().to_string();
        let body = response.text().unwrap_or_default();
        Err(Error::Http(format!("{} from {}: {}", status, url, body.trim())))
    }

    fn read_json<T: DeserializeOwned>(response: Response) -> Result<T> {
        let url = response.url().to_string();
        let body = response
            .text()
            .map_err(|e| Error::Http(format!("Failed to read response from {}: {}", url, e)))?;
        serde_json::from_str(&body)
            .map_err(|e| Error::Repository(format!("Malformed response from {}: {}", url, e)))
    }

    fn get_json<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> Result<T> {
        debug!("GET {}", path);
        let response = self.send(self.http.get(self.url(path)).query(query))?;
        Self::read_json(response)
    }

    /// Fetch every page of a `/api/v0/m/` listing.
    fn list_all<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> Result<Vec<T>> {
        let mut items = Vec::new();
        loop {
            let mut page_query = query.to_vec();
            page_query.push(("limit", PAGE_SIZE.to_string()));
            page_query.push(("offset", items.len().to_string()));

            let page: ListResponse<T> = self.get_json(path, &page_query)?;
            let fetched = page.data.len();
            items.extend(page.data);
            // Without a total, keep paging until the server runs dry.
            let done = match page.meta {
                Some(meta) => items.len() >= meta.total_count,
                None => false,
            };
            if fetched == 0 || done {
                break;
            }
        }
        Ok(items)
    }

    /// Images are filtered to the owning user.
    fn scope_query(session: &ScopedSession) -> Vec<(&'static str, String)> {
        vec![
            ("owner", session.user().id.to_string()),
            ("group", session.group().id.to_string()),
        ]
    }

    /// Containers are saved by the admin session, so they are looked up
    /// across the whole group rather than by owner.
    fn group_query(session: &ScopedSession) -> Vec<(&'static str, String)> {
        vec![("group", session.group().id.to_string())]
    }

    fn post_links(&self, session: &ScopedSession, body: serde_json::Value) -> Result<()> {
        debug!("POST /webclient/api/links/ {}", body);
        self.send(
            self.post(session.token().expose(), "/webclient/api/links/")
                .json(&body),
        )?;
        Ok(())
    }
}

impl ImageRepository for OmeroWebClient {
    fn orphan_images(&self, session: &ScopedSession) -> Result<Vec<ImageId>> {
        let mut query = Self::scope_query(session);
        query.push(("orphaned", "true".into()));
        let images: Vec<NamedObject> = self.list_all("/api/v0/m/images/", &query)?;
        info!(
            "Found {} orphan images owned by {} in group {}",
            images.len(),
            session.user().name,
            session.group().name
        );
        Ok(images.into_iter().map(|i| ImageId(i.id)).collect())
    }

    fn has_original_filename(
        &self,
        _session: &ScopedSession,
        image: ImageId,
        name: &str,
    ) -> Result<bool> {
        let paths: OriginalFilePaths =
            self.get_json(&format!("/webgateway/original_file_paths/{}/", image), &[])?;
        Ok(paths_contain_filename(&paths, name))
    }

    fn find_containers(
        &self,
        session: &ScopedSession,
        kind: ContainerKind,
        name: &str,
        parent: Option<ContainerId>,
    ) -> Result<Vec<ContainerId>> {
        check_parent(kind, parent)?;
        let path = match parent {
            Some(project) => format!("/api/v0/m/projects/{}/datasets/", project),
            None => "/api/v0/m/projects/".to_string(),
        };
        let objects: Vec<NamedObject> = self.list_all(&path, &Self::group_query(session))?;
        Ok(ids_named(&objects, name))
    }

    fn create_container(
        &self,
        session: &ScopedSession,
        kind: ContainerKind,
        name: &str,
        parent: Option<ContainerId>,
    ) -> Result<ContainerId> {
        check_parent(kind, parent)?;
        debug!("POST /api/v0/m/save/ {} '{}'", kind, name);
        let response = self.send(
            self.post(session.token().expose(), "/api/v0/m/save/")
                .query(&[("group", session.group().id.to_string())])
                .json(&NewContainer::new(kind, name)),
        )?;
        let saved: SaveResponse = Self::read_json(response)?;
        let id = ContainerId(saved.data.id);

        if let Some(project) = parent {
            let body = links_body("project", project, "dataset", &[id.0]);
            if let Err(e) = self.post_links(session, body) {
                return Err(Error::Repository(format!(
                    "{} {} '{}' was created but not linked under project {}: {}",
                    kind, id, name, project, e
                )));
            }
        }
        Ok(id)
    }

    fn link(&self, session: &ScopedSession, dataset: ContainerId, image: ImageId) -> Result<()> {
        self.post_links(session, links_body("dataset", dataset, "image", &[image.0]))
    }

    fn post_annotation(
        &self,
        session: &ScopedSession,
        kind: AnnotationTarget,
        targets: &[ImageId],
        payload: &AnnotationPayload,
        namespace: &str,
    ) -> Result<AnnotationId> {
        let form = annotate_map_form(kind.as_str(), targets, payload, namespace)?;
        debug!("POST /webclient/annotate_map/ for {} images", targets.len());
        let response = self.send(
            self.post(session.token().expose(), "/webclient/annotate_map/")
                .form(&form),
        )?;
        let created: AnnotateMapResponse = Self::read_json(response)?;
        Ok(AnnotationId(created.ann_id))
    }

    fn close(&self, session: &ScopedSession) -> Result<()> {
        self.logout(session.token().expose())?;
        info!("Closed session on {}", self.base_url);
        Ok(())
    }
}
