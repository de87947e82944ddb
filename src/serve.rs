//! Preview server.
//!
//! A read-only static file server over the output directory, started after a
//! successful build. Built on `tiny_http`; one request at a time.
//!
//! Request resolution order:
//!
//! 1. Method other than `GET`/`HEAD` → 405
//! 2. Any `..` segment → 403
//! 3. Exact file match → the file, content type from its extension
//! 4. Directory with `index.html` → that file
//! 5. Directory without one → a generated listing
//! 6. Nothing found → 404

use crate::config::ServeConfig;
use crate::markdown::escape_html;
use crate::paths::extension_of;
use std::fs;
use std::io::{self, Cursor, Read};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tiny_http::{Header, Method, Request, Response, Server, StatusCode};

#[derive(Error, Debug)]
pub enum ServeError {
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    #[error("IO error serving {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// How a request URL maps onto the output directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolved {
    File(PathBuf),
    Listing { dir: PathBuf, request_path: String },
    Forbidden,
    NotFound,
    MethodNotAllowed,
}

/// Map a request onto `root` without touching the network.
pub fn resolve_request(root: &Path, method: &Method, url: &str) -> Resolved {
    if !matches!(method, Method::Get | Method::Head) {
        return Resolved::MethodNotAllowed;
    }

    let path_without_query = url.split(['?', '#']).next().unwrap_or_default();
    let decoded = urlencoding::decode(path_without_query)
        .map(std::borrow::Cow::into_owned)
        .unwrap_or_else(|_| path_without_query.to_string());

    let mut local_path = root.to_path_buf();
    let mut segments = Vec::new();
    for segment in decoded.split(['/', '\\']) {
        match segment {
            "" | "." => {}
            ".." => return Resolved::Forbidden,
            segment => {
                local_path.push(segment);
                segments.push(segment);
            }
        }
    }

    if local_path.is_file() {
        return Resolved::File(local_path);
    }
    if local_path.is_dir() {
        let index_path = local_path.join("index.html");
        if index_path.is_file() {
            return Resolved::File(index_path);
        }
        return Resolved::Listing {
            dir: local_path,
            request_path: segments.join("/"),
        };
    }
    Resolved::NotFound
}

/// A bound preview server.
pub struct PreviewServer {
    server: Server,
    root: PathBuf,
}

impl PreviewServer {
    /// Bind `host:port` from `config`. Requests are served from `root`.
    pub fn bind(config: &ServeConfig, root: impl Into<PathBuf>) -> Result<Self, ServeError> {
        let addr = format!("{}:{}", config.host, config.port);
        let server = Server::http(addr.as_str()).map_err(|source| ServeError::Bind {
            addr: addr.clone(),
            source,
        })?;
        Ok(Self {
            server,
            root: root.into(),
        })
    }

    /// The address actually bound, useful when port 0 was requested.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.server.server_addr().to_ip()
    }

    /// Serve requests until the process ends. Request errors are logged only.
    pub fn run(&self) {
        match self.local_addr() {
            Some(addr) => log::info!("serving {} at http://{addr}", self.root.display()),
            None => log::info!("serving {}", self.root.display()),
        }
        for request in self.server.incoming_requests() {
            if let Err(e) = handle_request(request, &self.root) {
                log::warn!("request error: {e}");
            }
        }
    }
}

fn handle_request(request: Request, root: &Path) -> Result<(), ServeError> {
    let resolved = resolve_request(root, request.method(), request.url());
    log::debug!("{} {} -> {resolved:?}", request.method(), request.url());

    let respond_err = |source| ServeError::Io {
        path: root.to_path_buf(),
        source,
    };
    match resolved {
        Resolved::File(path) => {
            let content = fs::read(&path).map_err(|source| ServeError::Io {
                path: path.clone(),
                source,
            })?;
            let response = with_header(
                Response::from_data(content),
                "Content-Type",
                guess_content_type(&path),
            );
            request.respond(response).map_err(respond_err)
        }
        Resolved::Listing { dir, request_path } => {
            let listing = directory_listing(&dir, &request_path).map_err(|source| {
                ServeError::Io {
                    path: dir.clone(),
                    source,
                }
            })?;
            let response = with_header(
                Response::from_string(listing),
                "Content-Type",
                "text/html; charset=utf-8",
            );
            request.respond(response).map_err(respond_err)
        }
        Resolved::Forbidden => request
            .respond(plain_status(403, "403 Forbidden"))
            .map_err(respond_err),
        Resolved::NotFound => request
            .respond(plain_status(404, "404 Not Found"))
            .map_err(respond_err),
        Resolved::MethodNotAllowed => {
            let response = with_header(
                plain_status(405, "405 Method Not Allowed"),
                "Allow",
                "GET, HEAD",
            );
            request.respond(response).map_err(respond_err)
        }
    }
}

fn with_header<R: Read>(mut response: Response<R>, field: &str, value: &str) -> Response<R> {
    // Static ASCII names and values; from_bytes only rejects non-ASCII.
    if let Ok(header) = Header::from_bytes(field, value) {
        response.add_header(header);
    }
    response
}

fn plain_status(code: u16, body: &str) -> Response<Cursor<Vec<u8>>> {
    with_header(
        Response::from_string(body).with_status_code(StatusCode(code)),
        "Content-Type",
        "text/plain; charset=utf-8",
    )
}

/// Content types for what a build can put in `public/`: rendered pages,
/// copied content, theme and project assets, transpiled scripts.
const CONTENT_TYPES: &[(&str, &str)] = &[
    (".html", "text/html; charset=utf-8"),
    (".htm", "text/html; charset=utf-8"),
    (".css", "text/css; charset=utf-8"),
    (".js", "text/javascript; charset=utf-8"),
    (".mjs", "text/javascript; charset=utf-8"),
    (".json", "application/json"),
    (".map", "application/json"),
    (".xml", "application/xml"),
    (".txt", "text/plain; charset=utf-8"),
    (".svg", "image/svg+xml"),
    (".png", "image/png"),
    (".jpg", "image/jpeg"),
    (".jpeg", "image/jpeg"),
    (".gif", "image/gif"),
    (".webp", "image/webp"),
    (".ico", "image/x-icon"),
    (".woff2", "font/woff2"),
    (".woff", "font/woff"),
    (".pdf", "application/pdf"),
];

/// Content type by the same extension rule the build uses (last dot of the
/// file name, case-insensitive). Unknown extensions, and dotfiles such as
/// `.nojekyll`, are served as `application/octet-stream`.
pub fn guess_content_type(path: &Path) -> &'static str {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy())
        .unwrap_or_default();
    let ext = extension_of(&name).to_ascii_lowercase();
    CONTENT_TYPES
        .iter()
        .find(|(known, _)| *known == ext)
        .map_or("application/octet-stream", |&(_, content_type)| content_type)
}

/// Plain HTML listing of `dir`. Directories first, each group sorted by name.
fn directory_listing(dir: &Path, request_path: &str) -> io::Result<String> {
    let mut entries = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().into_owned();
        let is_dir = fs::metadata(entry.path())?.is_dir();
        entries.push((!is_dir, name));
    }
    entries.sort();

    let base = if request_path.is_empty() {
        String::from("/")
    } else {
        format!("/{request_path}/")
    };
    let title = escape_html(&base);

    let mut html = format!(
        "<!DOCTYPE html>\n<html>\n<head><meta charset=\"utf-8\"><title>Index of {title}</title></head>\n<body>\n<h1>Index of {title}</h1>\n<ul>\n"
    );
    if !request_path.is_empty() {
        html.push_str("<li><a href=\"../\">../</a></li>\n");
    }
    for (is_file, name) in entries {
        let suffix = if is_file { "" } else { "/" };
        let href = format!("{base}{}{suffix}", urlencoding::encode(&name));
        html.push_str(&format!(
            "<li><a href=\"{}\">{}{suffix}</a></li>\n",
            escape_html(&href),
            escape_html(&name)
        ));
    }
    html.push_str("</ul>\n</body>\n</html>\n");
    Ok(html)
}
