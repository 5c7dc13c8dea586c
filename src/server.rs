//! Blocking HTTP server for the rendered landing page.
//!
//! The page is rendered once at bind time and served from memory at `/`
//! and `/index.html`. Requests are handled one at a time.

use std::net::SocketAddr;
use std::sync::Arc;
use std::thread::JoinHandle;

use tiny_http::{Header, Method, Request, Response, Server};

use crate::{page, Error, Result};

/// Server configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Address to bind; port `0` picks an ephemeral port
    pub addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: "127.0.0.1:5173".to_string(),
        }
    }
}

impl ServerConfig {
    /// Loopback on an ephemeral port, for tests and self-hosted checks
    pub fn ephemeral() -> Self {
        Self {
            addr: "127.0.0.1:0".to_string(),
        }
    }
}

pub struct LandingServer {
    server: Arc<Server>,
    site: Arc<Site>,
}

struct Site {
    page: String,
    html_type: Header,
    allow: Header,
}

impl LandingServer {
    pub fn bind(config: ServerConfig) -> Result<Self> {
        let page = page::render_page()?;
        let html_type = header("Content-Type", "text/html; charset=utf-8")?;
        let allow = header("Allow", "GET, HEAD")?;

        let server = Server::http(config.addr.as_str())
            .map_err(|e| Error::ServeError(format!("failed to bind {}: {}", config.addr, e)))?;
        log::info!("landing page bound to http://{}", server.server_addr());

        Ok(Self {
            server: Arc::new(server),
            site: Arc::new(Site {
                page,
                html_type,
                allow,
            }),
        })
    }

    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.server.server_addr().to_ip()
    }

    /// Root URL of the site, with a trailing slash
    pub fn base_url(&self) -> String {
        format!("http://{}/", self.server.server_addr())
    }

    /// Handle requests on the current thread until the server is unblocked.
    pub fn serve(self) -> Result<()> {
        for request in self.server.incoming_requests() {
            self.site.handle(request);
        }
        Ok(())
    }

    /// Move the request loop to a background thread.
    pub fn spawn(self) -> ServerHandle {
        let base_url = self.base_url();
        let server = self.server.clone();
        let thread = std::thread::spawn(move || {
            let _ = self.serve();
        });
        ServerHandle {
            base_url,
            server,
            thread: Some(thread),
        }
    }
}

impl Site {
    fn handle(&self, request: Request) {
        let path = request.url().split('?').next().unwrap_or("/").to_string();
        let method = request.method().clone();

        let (status, response) = match (&method, path.as_str()) {
            (Method::Get | Method::Head, "/" | "/index.html") => (
                200,
                Response::from_string(self.page.clone()).with_header(self.html_type.clone()),
            ),
            (Method::Get | Method::Head, _) => {
                (404, Response::from_string("Not Found").with_status_code(404))
            }
            _ => (
                405,
                Response::from_string("Method Not Allowed")
                    .with_status_code(405)
                    .with_header(self.allow.clone()),
            ),
        };

        log::debug!("{} {} -> {}", method, path, status);
        if let Err(e) = request.respond(response) {
            log::warn!("failed to respond to {} {}: {}", method, path, e);
        }
    }
}

fn header(name: &str, value: &str) -> Result<Header> {
    Header::from_bytes(name.as_bytes(), value.as_bytes())
        .map_err(|_| Error::ServeError(format!("invalid header {}: {}", name, value)))
}

/// A server running on a background thread. Dropping the handle stops it.
pub struct ServerHandle {
    base_url: String,
    server: Arc<Server>,
    thread: Option<JoinHandle<()>>,
}

impl ServerHandle {
    pub fn base_url(&self) -> String {
        self.base_url.clone()
    }

    /// Stop accepting requests and wait for the loop to exit.
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        self.server.unblock();
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

impl Drop for ServerHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn get(url: &str) -> reqwest::blocking::Response {
        reqwest::blocking::get(url).expect("request")
    }

    #[test]
    fn serves_page_at_root_and_index() {
        let handle = LandingServer::bind(ServerConfig::ephemeral()).unwrap().spawn();
        let expected = page::render_page().unwrap();

        for path in ["", "index.html", "?utm=1"] {
            let resp = get(&format!("{}{}", handle.base_url(), path));
            assert_eq!(resp.status(), 200);
            let ctype = resp.headers()["content-type"].to_str().unwrap().to_string();
            assert!(ctype.starts_with("text/html"));
            assert_eq!(resp.text().unwrap(), expected);
        }
        handle.shutdown();
    }

    #[test]
    fn unknown_paths_and_methods() {
        let handle = LandingServer::bind(ServerConfig::ephemeral()).unwrap().spawn();
        assert_eq!(get(&format!("{}missing", handle.base_url())).status(), 404);

        let resp = reqwest::blocking::Client::new()
            .post(handle.base_url())
            .send()
            .unwrap();
        assert_eq!(resp.status(), 405);
        assert_eq!(resp.headers()["allow"], "GET, HEAD");
    }

    #[test]
    fn bind_failure_is_a_serve_error() {
        let first = LandingServer::bind(ServerConfig::ephemeral()).unwrap();
        let taken = first.local_addr().unwrap();
        let second = LandingServer::bind(ServerConfig {
            addr: taken.to_string(),
        });
        assert!(matches!(second, Err(Error::ServeError(_))));
    }
}
