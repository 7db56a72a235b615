//! Static web client serving.

use hyper::header::HeaderValue;
use hyper::StatusCode;
use percent_encoding::percent_decode_str;
use std::path::{Component, Path, PathBuf};
use tokio::fs;
use tracing::{debug, warn};

use super::protocol::{error_response, response, HttpResponse};

/// File served for directory requests.
pub const INDEX_FILE: &str = "index.html";

/// Map a request path onto a file under `root`.
///
/// Returns `None` for undecodable paths or paths escaping `root`.
pub fn resolve_path(root: &Path, request_path: &str) -> Option<PathBuf> {
    let decoded = percent_decode_str(request_path).decode_utf8().ok()?;
    let relative = Path::new(decoded.trim_start_matches('/'));

    let mut path = root.to_path_buf();
    for component in relative.components() {
        match component {
            Component::Normal(part) => path.push(part),
            Component::CurDir => {}
            _ => return None,
        }
    }
    Some(path)
}

/// Serve `request_path` from the web directory at `root`.
pub async fn serve_file(root: &Path, request_path: &str) -> HttpResponse {
    let Some(mut path) = resolve_path(root, request_path) else {
        warn!("rejected static path {}", request_path);
        return error_response(StatusCode::BAD_REQUEST, "invalid path");
    };

    match fs::metadata(&path).await {
        Ok(meta) if meta.is_dir() => path.push(INDEX_FILE),
        Ok(_) => {}
        Err(_) => return error_response(StatusCode::NOT_FOUND, "not found"),
    }

    match fs::read(&path).await {
        Ok(contents) => {
            let mime = mime_guess::from_path(&path).first_or_octet_stream();
            let content_type = HeaderValue::from_str(mime.as_ref())
                .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream"));
            debug!("serving {} ({} bytes)", path.display(), contents.len());
            response(StatusCode::OK, content_type, contents)
        }
        Err(e) => {
            debug!("failed to read {}: {}", path.display(), e);
            error_response(StatusCode::NOT_FOUND, "not found")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;
    use hyper::header::CONTENT_TYPE;

    fn web_root(name: &str) -> PathBuf {
        let root = std::env::temp_dir().join(format!("clicker-web-{}-{}", name, std::process::id()));
        std::fs::create_dir_all(root.join("css")).unwrap();
        std::fs::write(root.join(INDEX_FILE), "<html>clicker</html>").unwrap();
        std::fs::write(root.join("css/app.css"), "body {}").unwrap();
        root
    }

    #[test]
    fn test_resolve_path() {
        let root = Path::new("/srv/web");
        assert_eq!(resolve_path(root, "/"), Some(PathBuf::from("/srv/web")));
        assert_eq!(
            resolve_path(root, "/css/app%20v2.css"),
            Some(PathBuf::from("/srv/web/css/app v2.css"))
        );
        assert_eq!(resolve_path(root, "/../etc/passwd"), None);
        assert_eq!(resolve_path(root, "/css/%2e%2e/%2e%2e/secret"), None);
    }

    #[tokio::test]
    async fn test_serve_index() {
        let root = web_root("index");
        let response = serve_file(&root, "/").await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[CONTENT_TYPE], "text/html");
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], b"<html>clicker</html>");

        let _ = std::fs::remove_dir_all(root);
    }

    #[tokio::test]
    async fn test_serve_mime_type() {
        let root = web_root("mime");
        let response = serve_file(&root, "/css/app.css").await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[CONTENT_TYPE], "text/css");

        let _ = std::fs::remove_dir_all(root);
    }

    #[tokio::test]
    async fn test_missing_and_traversal() {
        let root = web_root("missing");

        assert_eq!(serve_file(&root, "/nope.js").await.status(), StatusCode::NOT_FOUND);
        assert_eq!(serve_file(&root, "/../secret").await.status(), StatusCode::BAD_REQUEST);

        let _ = std::fs::remove_dir_all(root);
    }
}
