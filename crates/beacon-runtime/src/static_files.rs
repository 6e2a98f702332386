//! Static file endpoint

use async_trait::async_trait;
use beacon_core::{Body, Endpoint, Error, Result};
use bytes::Bytes;
use http::header::{HeaderValue, ALLOW, CONTENT_LENGTH, CONTENT_TYPE};
use http::{Method, Request, Response, StatusCode};
use std::io;
use std::path::{Component, Path, PathBuf};
use tracing::debug;

/// Serves files below a site root
///
/// `/` and directory paths resolve to the index file. Paths that try to
/// leave the root, and files that cannot be read, are answered with 404.
#[derive(Debug, Clone)]
pub struct StaticFiles {
    root: PathBuf,
    index_file: String,
}

impl StaticFiles {
    /// Create an endpoint serving `root`
    pub fn new(root: impl Into<PathBuf>, index_file: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            index_file: index_file.into(),
        }
    }

    /// Site root
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map a request path onto the filesystem, `None` for paths outside the root
    pub fn resolve(&self, path: &str) -> Option<PathBuf> {
        let mut resolved = self.root.clone();

        for component in Path::new(path.trim_start_matches('/')).components() {
            match component {
                Component::Normal(segment) => resolved.push(segment),
                Component::CurDir => {}
                Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                    return None;
                }
            }
        }

        if path.is_empty() || path.ends_with('/') {
            resolved.push(&self.index_file);
        }

        Some(resolved)
    }

    async fn read(&self, file: PathBuf) -> io::Result<(PathBuf, Vec<u8>)> {
        let file = if tokio::fs::metadata(&file).await?.is_dir() {
            file.join(&self.index_file)
        } else {
            file
        };
        let contents = tokio::fs::read(&file).await?;
        Ok((file, contents))
    }
}

#[async_trait]
impl Endpoint for StaticFiles {
    async fn serve(&self, req: Request<Body>) -> Result<Response<Body>> {
        if req.method() != Method::GET && req.method() != Method::HEAD {
            return Response::builder()
                .status(StatusCode::METHOD_NOT_ALLOWED)
                .header(ALLOW, "GET, HEAD")
                .body(Body::from("Method Not Allowed"))
                .map_err(Error::from);
        }

        let path = req.uri().path();
        let Some(file) = self.resolve(path) else {
            debug!(path = %path, "Rejected path outside site root");
            return not_found();
        };

        let (file, contents) = match self.read(file).await {
            Ok(found) => found,
            Err(e) => {
                debug!(path = %path, error = %e, "File not served");
                return not_found();
            }
        };

        let length = contents.len();
        Response::builder()
            .status(StatusCode::OK)
            .header(CONTENT_TYPE, content_type(&file))
            .header(CONTENT_LENGTH, length)
            .body(Body::new(Bytes::from(contents)))
            .map_err(Error::from)
    }
}

fn not_found() -> Result<Response<Body>> {
    Response::builder()
        .status(StatusCode::NOT_FOUND)
        .header(CONTENT_TYPE, "text/plain; charset=utf-8")
        .body(Body::from("Not Found"))
        .map_err(Error::from)
}

/// Content type for a served file
///
/// Site asset types are fixed; anything else is guessed from the extension.
pub fn content_type(file: &Path) -> HeaderValue {
    let ext = file
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    let fixed = match ext.as_str() {
        "css" => Some("text/css"),
        "js" => Some("application/javascript"),
        "html" => Some("text/html; charset=utf-8"),
        "json" => Some("application/json"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "png" => Some("image/png"),
        "webp" => Some("image/webp"),
        "svg" => Some("image/svg+xml"),
        _ => None,
    };

    match fixed {
        Some(value) => HeaderValue::from_static(value),
        None => {
            let guessed = mime_guess::from_path(file).first_or_octet_stream();
            HeaderValue::from_str(guessed.as_ref())
                .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;
    use tempfile::TempDir;

    fn site() -> (TempDir, StaticFiles) {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("css")).unwrap();
        std::fs::create_dir_all(dir.path().join("blog")).unwrap();
        std::fs::write(dir.path().join("index.html"), "<html>home</html>").unwrap();
        std::fs::write(dir.path().join("blog/index.html"), "<html>blog</html>").unwrap();
        std::fs::write(dir.path().join("css/style.css"), "body{margin:0}").unwrap();
        let files = StaticFiles::new(dir.path(), "index.html");
        (dir, files)
    }

    async fn get(files: &StaticFiles, method: Method, uri: &str) -> Response<Body> {
        let req = Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::default())
            .unwrap();
        files.serve(req).await.unwrap()
    }

    async fn body_string(response: Response<Body>) -> String {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[test]
    fn test_resolve() {
        let files = StaticFiles::new("/srv/site", "index.html");
        assert_eq!(
            files.resolve("/"),
            Some(PathBuf::from("/srv/site/index.html"))
        );
        assert_eq!(
            files.resolve("/css/style.css"),
            Some(PathBuf::from("/srv/site/css/style.css"))
        );
        assert_eq!(
            files.resolve("/blog/"),
            Some(PathBuf::from("/srv/site/blog/index.html"))
        );
        assert_eq!(files.resolve("/../etc/passwd"), None);
        assert_eq!(files.resolve("/css/../../secret"), None);
    }

    #[test]
    fn test_content_types() {
        assert_eq!(content_type(Path::new("a/style.css")), "text/css");
        assert_eq!(content_type(Path::new("app.JS")), "application/javascript");
        assert_eq!(content_type(Path::new("index.html")), "text/html; charset=utf-8");
        assert_eq!(content_type(Path::new("hero.jpeg")), "image/jpeg");
        assert_eq!(content_type(Path::new("logo.svg")), "image/svg+xml");
        assert_eq!(content_type(Path::new("clip.mp4")), "video/mp4");
        assert_eq!(content_type(Path::new("blob")), "application/octet-stream");
    }

    #[tokio::test]
    async fn test_serves_index_for_root() {
        let (_dir, files) = site();
        let response = get(&files, Method::GET, "/").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[CONTENT_TYPE], "text/html; charset=utf-8");
        assert_eq!(response.headers()[CONTENT_LENGTH], "17");
        assert_eq!(body_string(response).await, "<html>home</html>");
    }

    #[tokio::test]
    async fn test_serves_directory_index() {
        let (_dir, files) = site();
        let response = get(&files, Method::GET, "/blog").await;
        assert_eq!(body_string(response).await, "<html>blog</html>");
    }

    #[tokio::test]
    async fn test_missing_and_escaping_paths() {
        let (_dir, files) = site();
        let missing = get(&files, Method::GET, "/nope.css").await;
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);

        let escaping = get(&files, Method::GET, "/../index.html").await;
        assert_eq!(escaping.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_method_not_allowed() {
        let (_dir, files) = site();
        let response = get(&files, Method::POST, "/").await;
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(response.headers()[ALLOW], "GET, HEAD");
    }

    #[tokio::test]
    async fn test_head_is_served() {
        let (_dir, files) = site();
        let response = get(&files, Method::HEAD, "/css/style.css").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[CONTENT_TYPE], "text/css");
    }
}
