//! Client for the Nexus staging API used by Sonatype OSSRH.

use std::path::Path;
use std::time::Duration;
use async_trait::async_trait;
use log::{debug, info, warn};
use reqwest::header::CONTENT_TYPE;
use thiserror::Error;
use crate::artifact::{self, ArtifactName};
use crate::config::runtime::Credentials;

pub mod documents;
pub mod poll;

#[derive(Error, Debug)]
pub enum Error {
    #[error("{0}")]
    RemoteApi(String),

    #[error("no staging profile named {0}")]
    ProfileNotFound(String),

    #[error("staging repository {0} not listed under its profile")]
    RepositoryNotFound(String),

    #[error("code: {status}, body: {body}")]
    UnexpectedResponse {
        status: u16,
        body: String,
    },

    #[error("upload {path} failed with code {status}: {body}")]
    Upload {
        path: String,
        status: u16,
        body: String,
    },

    #[error("artifact: {0}")]
    Artifact(#[from] artifact::Error),

    #[error("reqwest: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("xpath: {0}")]
    XPath(#[from] sxd_xpath::Error),

    #[error(transparent)]
    IOError(#[from] std::io::Error),
}

/// URLs of the staging API, relative to the service root.
#[derive(Debug, Clone)]
pub struct Endpoints {
    base: String,
}

impl Endpoints {
    pub fn new(base: &str) -> Self {
        Self {
            base: base.trim_end_matches('/').to_string(),
        }
    }

    pub fn profiles(&self) -> String {
        format!("{}/service/local/staging/profiles", self.base)
    }

    /// `start`, `finish` or `release` on a profile.
    pub fn profile_action(&self, profile_id: &str, action: &str) -> String {
        format!("{}/{profile_id}/{action}", self.profiles())
    }

    pub fn profile_repositories(&self, profile_id: &str) -> String {
        format!("{}/service/local/staging/profile_repositories/{profile_id}", self.base)
    }

    /// `deployByRepositoryId/<repository>/<group/as/path>/<artifact>/<version>/<file>`
    pub fn deploy(&self, repository_id: &str, group_id: &str, name: &ArtifactName, file_name: &str) -> String {
        format!(
            "{}/service/local/staging/deployByRepositoryId/{repository_id}/{}/{}/{}/{file_name}",
            self.base,
            group_id.replace('.', "/"),
            name.artifact_id,
            name.version,
        )
    }
}

/// Lifecycle calls against one staging profile.
///
/// [`Client`] talks to the provider over HTTP; the release flow only sees
/// this trait.
#[async_trait]
pub trait Staging {
    async fn profile_id(&self, group_id: &str) -> Result<String, Error>;

    /// Open a new staging repository and return its id.
    async fn start(&self, profile_id: &str, description: &str) -> Result<String, Error>;

    /// PUT a file under its Maven coordinates in the staging repository.
    async fn upload(&self, repository_id: &str, group_id: &str, path: &Path) -> Result<(), Error>;

    /// Ask the provider to close the repository. Closing happens asynchronously.
    async fn finish(&self, profile_id: &str, repository_id: &str, description: &str) -> Result<(), Error>;

    async fn release(&self, profile_id: &str, repository_id: &str, description: &str) -> Result<(), Error>;

    async fn repository_status(&self, profile_id: &str, repository_id: &str) -> Result<String, Error>;
}

pub struct Client {
    http: reqwest::Client,
    endpoints: Endpoints,
    credentials: Credentials,
    strict_uploads: bool,
}

impl Client {
    pub fn new(endpoints: Endpoints, credentials: Credentials, timeout: Duration, strict_uploads: bool) -> Result<Self, Error> {
        Ok(Self {
            http: reqwest::Client::builder().timeout(timeout).build()?,
            endpoints,
            credentials,
            strict_uploads,
        })
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<(u16, String), Error> {
        let resp = request
            .basic_auth(&self.credentials.username, Some(&self.credentials.password))
            .send()
            .await?;
        let status = resp.status().as_u16();
        let body = resp.text().await?;
        Ok((status, body))
    }

    async fn get(&self, url: &str) -> Result<(u16, String), Error> {
        debug!("GET {url}");
        self.send(self.http.get(url)).await
    }

    async fn post_xml(&self, url: &str, body: String) -> Result<(u16, String), Error> {
        debug!("POST {url}");
        self.send(self.http.post(url).header(CONTENT_TYPE, "application/xml").body(body))
            .await
    }

    async fn promote_action(&self, profile_id: &str, action: &str, repository_id: &str, description: &str) -> Result<(), Error> {
        let request = documents::promote_request(Some(repository_id), description)?;
        let (status, body) = self
            .post_xml(&self.endpoints.profile_action(profile_id, action), request)
            .await?;
        documents::acknowledgement(status, &body)
    }
}

#[async_trait]
impl Staging for Client {
    async fn profile_id(&self, group_id: &str) -> Result<String, Error> {
        info!("Looking up staging profile for {group_id}");
        let (status, body) = self.get(&self.endpoints.profiles()).await?;
        let id = documents::profile_id(status, &body, group_id)?;
        info!("Found staging profile {id}");
        Ok(id)
    }

    async fn start(&self, profile_id: &str, description: &str) -> Result<String, Error> {
        info!("Opening staging repository");
        let request = documents::promote_request(None, description)?;
        let (status, body) = self
            .post_xml(&self.endpoints.profile_action(profile_id, "start"), request)
            .await?;
        let id = documents::staged_repository_id(status, &body)?;
        info!("Opened staging repository {id}");
        Ok(id)
    }

    /// Non-2xx responses are logged, and only fail the upload when strict
    /// uploads are enabled.
    async fn upload(&self, repository_id: &str, group_id: &str, path: &Path) -> Result<(), Error> {
        let name = ArtifactName::from_path(path)?;
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let url = self.endpoints.deploy(repository_id, group_id, &name, &file_name);
        debug!(
            "{file_name}: artifact {}, version {}, classifier {:?}, extension {}",
            name.artifact_id, name.version, name.classifier, name.extension
        );
        info!("Uploading {} to {url}", path.display());

        let contents = tokio::fs::read(path).await?;
        let (status, body) = self
            .send(
                self.http
                    .put(&url)
                    .header(CONTENT_TYPE, "application/octet-stream")
                    .body(contents),
            )
            .await?;

        if (200..300).contains(&status) {
            debug!("Uploaded {file_name} with code {status}");
            return Ok(());
        }

        warn!("Upload of {} failed with code {status}: {body}", path.display());
        if self.strict_uploads {
            return Err(Error::Upload {
                path: path.display().to_string(),
                status,
                body,
            });
        }
        Ok(())
    }

    async fn finish(&self, profile_id: &str, repository_id: &str, description: &str) -> Result<(), Error> {
        info!("Closing staging repository {repository_id}");
        self.promote_action(profile_id, "finish", repository_id, description).await
    }

    async fn release(&self, profile_id: &str, repository_id: &str, description: &str) -> Result<(), Error> {
        info!("Releasing staging repository {repository_id}");
        self.promote_action(profile_id, "release", repository_id, description).await
    }

    async fn repository_status(&self, profile_id: &str, repository_id: &str) -> Result<String, Error> {
        debug!("Fetching status of staging repository {repository_id}");
        let (status, body) = self
            .get(&self.endpoints.profile_repositories(profile_id))
            .await?;
        documents::repository_status(status, &body, repository_id)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};
    use super::*;

    // base64("deployer:hunter2")
    const AUTHORIZATION: &str = "Basic ZGVwbG95ZXI6aHVudGVyMg==";

    #[derive(Debug, Clone)]
    struct Request {
        method: String,
        path: String,
        headers: Vec<(String, String)>,
        body: Vec<u8>,
    }

    impl Request {
        fn header(&self, name: &str) -> Option<&str> {
            self.headers
                .iter()
                .find(|(key, _)| key.eq_ignore_ascii_case(name))
                .map(|(_, value)| value.as_str())
        }
    }

    async fn read_request(stream: &mut TcpStream) -> Request {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];
        loop {
            let read = stream.read(&mut chunk).await.unwrap();
            assert!(read > 0, "connection closed mid-request");
            buf.extend_from_slice(&chunk[..read]);

            let Some(end) = buf.windows(4).position(|w| w == b"\r\n\r\n") else {
                continue;
            };
            let head = String::from_utf8_lossy(&buf[..end]).into_owned();
            let mut lines = head.split("\r\n");
            let mut request_line = lines.next().unwrap().split(' ');
            let method = request_line.next().unwrap().to_string();
            let path = request_line.next().unwrap().to_string();
            let headers: Vec<(String, String)> = lines
                .filter_map(|line| line.split_once(':'))
                .map(|(key, value)| (key.trim().to_string(), value.trim().to_string()))
                .collect();
            let length = headers
                .iter()
                .find(|(key, _)| key.eq_ignore_ascii_case("content-length"))
                .map(|(_, value)| value.parse::<usize>().unwrap())
                .unwrap_or(0);

            if buf.len() >= end + 4 + length {
                return Request {
                    method,
                    path,
                    headers,
                    body: buf[end + 4..end + 4 + length].to_vec(),
                };
            }
        }
    }

    /// Answers one connection per scripted response, in order, and records
    /// every request it saw.
    async fn serve(responses: Vec<(u16, &'static str)>) -> (String, Arc<Mutex<Vec<Request>>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        let seen = Arc::new(Mutex::new(Vec::new()));
        let recorded = seen.clone();

        tokio::spawn(async move {
            for (status, body) in responses {
                let (mut stream, _) = listener.accept().await.unwrap();
                let request = read_request(&mut stream).await;
                recorded.lock().unwrap().push(request);
                let response = format!(
                    "HTTP/1.1 {status} Scripted\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                    body.len()
                );
                stream.write_all(response.as_bytes()).await.unwrap();
                stream.shutdown().await.unwrap();
            }
        });

        (base, seen)
    }

    fn client(base: &str, strict_uploads: bool) -> Client {
        Client::new(
            Endpoints::new(base),
            Credentials {
                username: "deployer".into(),
                password: "hunter2".into(),
            },
            Duration::from_secs(5),
            strict_uploads,
        )
        .unwrap()
    }

    fn artifact(dir: &tempfile::TempDir) -> std::path::PathBuf {
        let path = dir.path().join("connect.sdk-18.0.1.jar");
        std::fs::write(&path, b"jar bytes").unwrap();
        path
    }

    const NEXUS_ERROR: &str = "<nexus-error><errors><error><id>*</id><msg>Nope &amp; bad</msg></error></errors></nexus-error>";

    #[test]
    fn endpoint_urls() {
        let endpoints = Endpoints::new("https://oss.sonatype.org/");
        assert_eq!(endpoints.profiles(), "https://oss.sonatype.org/service/local/staging/profiles");
        assert_eq!(
            endpoints.profile_action("1a2b3c", "finish"),
            "https://oss.sonatype.org/service/local/staging/profiles/1a2b3c/finish"
        );
        assert_eq!(
            endpoints.profile_repositories("1a2b3c"),
            "https://oss.sonatype.org/service/local/staging/profile_repositories/1a2b3c"
        );
    }

    #[test]
    fn deploy_url_follows_maven_layout() {
        let endpoints = Endpoints::new("https://oss.sonatype.org");
        let file_name = "connect.sdk-18.0.1-sources.jar.sha1";
        let name = ArtifactName::parse(file_name).unwrap();
        assert_eq!(
            endpoints.deploy("comgithubcloudblue-1042", "com.github.cloudblue", &name, file_name),
            "https://oss.sonatype.org/service/local/staging/deployByRepositoryId/comgithubcloudblue-1042/com/github/cloudblue/connect.sdk/18.0.1/connect.sdk-18.0.1-sources.jar.sha1"
        );
    }

    #[tokio::test]
    async fn upload_puts_file_bytes_with_basic_auth() {
        let dir = tempfile::tempdir().unwrap();
        let (base, seen) = serve(vec![(201, "")]).await;

        client(&base, false)
            .upload("comgithubcloudblue-1042", "com.github.cloudblue", &artifact(&dir))
            .await
            .unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].method, "PUT");
        assert_eq!(
            seen[0].path,
            "/service/local/staging/deployByRepositoryId/comgithubcloudblue-1042/com/github/cloudblue/connect.sdk/18.0.1/connect.sdk-18.0.1.jar"
        );
        assert_eq!(seen[0].header("authorization"), Some(AUTHORIZATION));
        assert_eq!(seen[0].header("content-type"), Some("application/octet-stream"));
        assert_eq!(seen[0].body, b"jar bytes");
    }

    #[tokio::test]
    async fn failed_upload_is_tolerated_by_default() {
        let dir = tempfile::tempdir().unwrap();
        let (base, _) = serve(vec![(500, "boom")]).await;

        let result = client(&base, false)
            .upload("comgithubcloudblue-1042", "com.github.cloudblue", &artifact(&dir))
            .await;

        assert!(result.is_ok(), "{result:?}");
    }

    #[tokio::test]
    async fn failed_upload_is_fatal_when_strict() {
        let dir = tempfile::tempdir().unwrap();
        let (base, _) = serve(vec![(500, "boom")]).await;

        let result = client(&base, true)
            .upload("comgithubcloudblue-1042", "com.github.cloudblue", &artifact(&dir))
            .await;

        match result {
            Err(Error::Upload { status, body, .. }) => {
                assert_eq!(status, 500);
                assert_eq!(body, "boom");
            }
            other => panic!("expected Upload, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn lifecycle_calls_carry_credentials() {
        let (base, seen) = serve(vec![
            (200, "<stagingProfiles><data><stagingProfile><id>1a2b3c</id><name>com.github.cloudblue</name></stagingProfile></data></stagingProfiles>"),
            (201, "<promoteResponse><data><stagedRepositoryId>comgithubcloudblue-1042</stagedRepositoryId></data></promoteResponse>"),
            (201, ""),
            (200, "<stagingRepositories><data><stagingProfileRepository><repositoryId>comgithubcloudblue-1042</repositoryId><type>closed</type></stagingProfileRepository></data></stagingRepositories>"),
            (201, ""),
        ])
        .await;
        let client = client(&base, false);

        let profile = client.profile_id("com.github.cloudblue").await.unwrap();
        assert_eq!(profile, "1a2b3c");
        let repository = client.start(&profile, "connect.sdk upload").await.unwrap();
        assert_eq!(repository, "comgithubcloudblue-1042");
        client.finish(&profile, &repository, "connect.sdk upload").await.unwrap();
        assert_eq!(client.repository_status(&profile, &repository).await.unwrap(), "closed");
        client.release(&profile, &repository, "connect.sdk upload").await.unwrap();

        let seen = seen.lock().unwrap();
        let calls: Vec<(&str, &str)> = seen.iter().map(|r| (r.method.as_str(), r.path.as_str())).collect();
        assert_eq!(
            calls,
            [
                ("GET", "/service/local/staging/profiles"),
                ("POST", "/service/local/staging/profiles/1a2b3c/start"),
                ("POST", "/service/local/staging/profiles/1a2b3c/finish"),
                ("GET", "/service/local/staging/profile_repositories/1a2b3c"),
                ("POST", "/service/local/staging/profiles/1a2b3c/release"),
            ]
        );
        assert!(seen.iter().all(|r| r.header("authorization") == Some(AUTHORIZATION)));
        assert_eq!(seen[1].header("content-type"), Some("application/xml"));

        let finish = String::from_utf8(seen[2].body.clone()).unwrap();
        assert!(finish.contains("<stagedRepositoryId>comgithubcloudblue-1042</stagedRepositoryId>"), "{finish}");
    }

    #[tokio::test]
    async fn provider_errors_surface_from_start_and_finish() {
        let (base, _) = serve(vec![(400, NEXUS_ERROR), (400, NEXUS_ERROR)]).await;
        let client = client(&base, false);

        let start = client.start("1a2b3c", "connect.sdk upload").await;
        assert!(matches!(start, Err(Error::RemoteApi(ref msg)) if msg == "Nope & bad"), "{start:?}");

        let finish = client.finish("1a2b3c", "comgithubcloudblue-1042", "connect.sdk upload").await;
        assert!(matches!(finish, Err(Error::RemoteApi(ref msg)) if msg == "Nope & bad"), "{finish:?}");
    }
}
