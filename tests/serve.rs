//! End-to-end tests for the static asset server
//!
//! Each test binds a real server on an ephemeral loopback port with a
//! temporary root directory and talks raw HTTP/1.1 to it.

use nocache_server::config::Config;
use nocache_server::error::StartupError;
use nocache_server::server::Server;
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;
use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::timeout;

const IO_TIMEOUT: Duration = Duration::from_secs(5);

struct TestServer {
    addr: SocketAddr,
    stop: oneshot::Sender<()>,
    handle: JoinHandle<()>,
}

impl TestServer {
    fn start(root: &Path) -> Self {
        Self::start_on(root, 0)
    }

    fn start_on(root: &Path, port: u16) -> Self {
        Self::start_with(&test_config(root, port))
    }

    fn start_with(config: &Config) -> Self {
        let server = Server::bind(config).expect("server should bind");
        let addr = server.local_addr().expect("bound address");
        let (stop, stopped) = oneshot::channel::<()>();
        let handle = tokio::spawn(server.run_until(async move {
            let _ = stopped.await;
        }));
        Self { addr, stop, handle }
    }

    async fn shutdown(self) {
        let _ = self.stop.send(());
        timeout(IO_TIMEOUT, self.handle)
            .await
            .expect("server should stop")
            .expect("server task should not panic");
    }
}

fn test_config(root: &Path, port: u16) -> Config {
    let mut config = Config::default();
    config.server.host = "127.0.0.1".to_string();
    config.server.port = port;
    config.server.root = root.to_path_buf();
    config.logging.access_log = false;
    config.performance.request_timeout = 5;
    config
}

/// A web bundle next to a file that must never be served
fn bundle() -> (TempDir, std::path::PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("build/web");
    std::fs::create_dir_all(root.join("assets/fonts")).unwrap();
    std::fs::write(root.join("index.html"), "<!DOCTYPE html><title>app</title>").unwrap();
    std::fs::write(root.join("main.dart.js"), "void main() {}").unwrap();
    std::fs::write(root.join("assets/data.bin"), (0u8..=255).collect::<Vec<_>>()).unwrap();
    std::fs::write(root.join("assets/fonts/Roboto.ttf"), "ttf").unwrap();
    std::fs::write(dir.path().join("secret.txt"), "TOP SECRET").unwrap();
    (dir, root)
}

struct RawResponse {
    status: u16,
    headers: Vec<(String, String)>,
    body: Vec<u8>,
}

impl RawResponse {
    fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    fn header_count(&self, name: &str) -> usize {
        self.headers.iter().filter(|(n, _)| n == name).count()
    }

    fn assert_no_cache(&self) {
        for (name, value) in [
            ("cache-control", "no-cache, no-store, must-revalidate"),
            ("pragma", "no-cache"),
            ("expires", "0"),
        ] {
            assert_eq!(self.header_count(name), 1, "{name} on {}", self.status);
            assert_eq!(self.header(name), Some(value), "{name} on {}", self.status);
        }
    }
}

fn parse_response(raw: &[u8]) -> RawResponse {
    let split = raw
        .windows(4)
        .position(|w| w == b"\r\n\r\n")
        .expect("response should contain a header terminator");
    let head = std::str::from_utf8(&raw[..split]).expect("headers should be ASCII");
    let mut lines = head.split("\r\n");

    let status = lines
        .next()
        .and_then(|line| line.split(' ').nth(1))
        .and_then(|code| code.parse().ok())
        .expect("status line");
    let headers = lines
        .filter_map(|line| line.split_once(':'))
        .map(|(n, v)| (n.trim().to_ascii_lowercase(), v.trim().to_string()))
        .collect();

    RawResponse {
        status,
        headers,
        body: raw[split + 4..].to_vec(),
    }
}

async fn send(addr: SocketAddr, request: &str) -> RawResponse {
    let mut stream = timeout(IO_TIMEOUT, TcpStream::connect(addr))
        .await
        .expect("connect timed out")
        .expect("connect");
    stream.write_all(request.as_bytes()).await.unwrap();

    let mut raw = Vec::new();
    timeout(IO_TIMEOUT, stream.read_to_end(&mut raw))
        .await
        .expect("read timed out")
        .expect("read");
    parse_response(&raw)
}

async fn request(addr: SocketAddr, method: &str, path: &str) -> RawResponse {
    send(
        addr,
        &format!("{method} {path} HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n"),
    )
    .await
}

async fn get(addr: SocketAddr, path: &str) -> RawResponse {
    request(addr, "GET", path).await
}

#[tokio::test]
async fn serves_file_bytes_with_no_cache_headers() {
    let (_dir, root) = bundle();
    let server = TestServer::start(&root);

    let response = get(server.addr, "/assets/data.bin").await;
    assert_eq!(response.status, 200);
    assert_eq!(response.body, (0u8..=255).collect::<Vec<_>>());
    assert_eq!(response.header("content-length"), Some("256"));
    assert_eq!(response.header("content-type"), Some("application/octet-stream"));
    assert!(response.header("last-modified").is_some());
    response.assert_no_cache();

    let response = get(server.addr, "/main.dart.js").await;
    assert_eq!(response.body, b"void main() {}");
    assert_eq!(
        response.header("content-type"),
        Some("text/javascript; charset=utf-8")
    );

    server.shutdown().await;
}

#[tokio::test]
async fn root_serves_index_html() {
    let (_dir, root) = bundle();
    let server = TestServer::start(&root);

    let response = get(server.addr, "/").await;
    assert_eq!(response.status, 200);
    assert_eq!(response.body, b"<!DOCTYPE html><title>app</title>");
    assert_eq!(response.header("content-type"), Some("text/html; charset=utf-8"));
    response.assert_no_cache();

    // Query strings do not affect resolution
    let response = get(server.addr, "/?v=42").await;
    assert_eq!(response.status, 200);

    server.shutdown().await;
}

#[tokio::test]
async fn no_cache_headers_come_last_in_stable_order() {
    let (_dir, root) = bundle();
    let server = TestServer::start(&root);

    for path in ["/", "/missing"] {
        let response = get(server.addr, path).await;
        let position = |name: &str| {
            response
                .headers
                .iter()
                .position(|(n, _)| n == name)
                .unwrap()
        };
        assert!(position("cache-control") < position("pragma"));
        assert!(position("pragma") < position("expires"));
    }

    server.shutdown().await;
}

#[tokio::test]
async fn missing_path_is_404_with_headers() {
    let (_dir, root) = bundle();
    let server = TestServer::start(&root);

    let response = get(server.addr, "/does/not/exist.js").await;
    assert_eq!(response.status, 404);
    response.assert_no_cache();

    // A file addressed like a directory
    let response = get(server.addr, "/main.dart.js/").await;
    assert_eq!(response.status, 404);
    response.assert_no_cache();

    server.shutdown().await;
}

#[tokio::test]
async fn traversal_never_leaves_root() {
    let (_dir, root) = bundle();
    let server = TestServer::start(&root);

    for path in [
        "/../secret.txt",
        "/assets/../../secret.txt",
        "/%2e%2e/secret.txt",
        "/assets/..%2F..%2Fsecret.txt",
        "/..%5Csecret.txt",
    ] {
        let response = get(server.addr, path).await;
        assert!(
            response.status == 403 || response.status == 404,
            "{path} -> {}",
            response.status
        );
        assert!(!String::from_utf8_lossy(&response.body).contains("TOP SECRET"));
        response.assert_no_cache();
    }

    server.shutdown().await;
}

#[cfg(unix)]
#[tokio::test]
async fn symlink_escaping_root_is_forbidden() {
    let (dir, root) = bundle();
    std::os::unix::fs::symlink(dir.path().join("secret.txt"), root.join("leak.txt")).unwrap();
    let server = TestServer::start(&root);

    let response = get(server.addr, "/leak.txt").await;
    assert_eq!(response.status, 403);
    assert!(!String::from_utf8_lossy(&response.body).contains("TOP SECRET"));
    response.assert_no_cache();

    server.shutdown().await;
}

#[cfg(unix)]
#[tokio::test]
async fn index_symlink_escaping_root_is_forbidden() {
    let (dir, root) = bundle();
    std::fs::create_dir(root.join("sub")).unwrap();
    std::os::unix::fs::symlink(dir.path().join("secret.txt"), root.join("sub/index.html"))
        .unwrap();
    let server = TestServer::start(&root);

    let response = get(server.addr, "/sub/").await;
    assert_eq!(response.status, 403);
    assert!(!String::from_utf8_lossy(&response.body).contains("TOP SECRET"));
    response.assert_no_cache();

    server.shutdown().await;
}

#[cfg(unix)]
#[tokio::test]
async fn unreadable_paths_are_403_with_headers() {
    use std::fs::{set_permissions, Permissions};
    use std::os::unix::fs::PermissionsExt;

    let (_dir, root) = bundle();
    std::fs::create_dir(root.join("private")).unwrap();
    std::fs::write(root.join("private/inner.js"), "hidden").unwrap();
    let locked_file = root.join("main.dart.js");
    let locked_dir = root.join("private");
    set_permissions(&locked_file, Permissions::from_mode(0o000)).unwrap();
    set_permissions(&locked_dir, Permissions::from_mode(0o000)).unwrap();
    // Privileged users read through permission bits
    if std::fs::read(&locked_file).is_ok() {
        set_permissions(&locked_dir, Permissions::from_mode(0o755)).unwrap();
        return;
    }
    let server = TestServer::start(&root);

    for path in ["/main.dart.js", "/private/inner.js"] {
        let response = get(server.addr, path).await;
        assert_eq!(response.status, 403, "{path}");
        response.assert_no_cache();
    }

    server.shutdown().await;
    set_permissions(&locked_dir, Permissions::from_mode(0o755)).unwrap();
}

#[tokio::test]
async fn directory_without_slash_redirects() {
    let (_dir, root) = bundle();
    let server = TestServer::start(&root);

    let response = get(server.addr, "/assets?lang=en").await;
    assert_eq!(response.status, 301);
    assert_eq!(response.header("location"), Some("/assets/?lang=en"));
    response.assert_no_cache();

    server.shutdown().await;
}

#[tokio::test]
async fn directory_without_index_is_listed() {
    let (_dir, root) = bundle();
    let server = TestServer::start(&root);

    let response = get(server.addr, "/assets/").await;
    assert_eq!(response.status, 200);
    let html = String::from_utf8(response.body.clone()).unwrap();
    assert!(html.contains("Directory listing for /assets/"));
    assert!(html.contains("<a href=\"data.bin\">data.bin</a>"));
    assert!(html.contains("<a href=\"fonts/\">fonts/</a>"));
    response.assert_no_cache();

    server.shutdown().await;
}

#[tokio::test]
async fn head_sends_headers_only() {
    let (_dir, root) = bundle();
    let server = TestServer::start(&root);

    let response = request(server.addr, "HEAD", "/assets/data.bin").await;
    assert_eq!(response.status, 200);
    assert_eq!(response.header("content-length"), Some("256"));
    assert!(response.body.is_empty());
    response.assert_no_cache();

    server.shutdown().await;
}

#[tokio::test]
async fn not_modified_keeps_headers() {
    let (_dir, root) = bundle();
    let server = TestServer::start(&root);

    let response = send(
        server.addr,
        "GET /main.dart.js HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\
         If-Modified-Since: Fri, 01 Jan 2999 00:00:00 GMT\r\n\r\n",
    )
    .await;
    assert_eq!(response.status, 304);
    assert!(response.body.is_empty());
    response.assert_no_cache();

    server.shutdown().await;
}

#[tokio::test]
async fn unsupported_method_is_501_with_headers() {
    let (_dir, root) = bundle();
    let server = TestServer::start(&root);

    let response = send(
        server.addr,
        "POST /index.html HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\
         Content-Length: 0\r\n\r\n",
    )
    .await;
    assert_eq!(response.status, 501);
    assert_eq!(response.header("allow"), Some("GET, HEAD"));
    response.assert_no_cache();

    server.shutdown().await;
}

#[tokio::test]
async fn concurrent_requests_get_their_own_file() {
    let (_dir, root) = bundle();
    let alpha = vec![b'a'; 256 * 1024];
    let beta = vec![b'b'; 192 * 1024];
    std::fs::write(root.join("alpha.txt"), &alpha).unwrap();
    std::fs::write(root.join("beta.txt"), &beta).unwrap();
    let server = TestServer::start(&root);

    let mut tasks = Vec::new();
    for i in 0..24 {
        let addr = server.addr;
        let (path, expected) = if i % 2 == 0 {
            ("/alpha.txt", alpha.clone())
        } else {
            ("/beta.txt", beta.clone())
        };
        tasks.push(tokio::spawn(async move {
            let response = get(addr, path).await;
            assert_eq!(response.status, 200);
            assert!(response.body == expected, "{path} got the wrong body");
            response.assert_no_cache();
        }));
    }
    for task in tasks {
        task.await.unwrap();
    }

    server.shutdown().await;
}

#[tokio::test]
async fn slow_reader_receives_whole_file_past_timeout() {
    let (_dir, root) = bundle();
    let payload: Vec<u8> = (0..32 * 1024 * 1024).map(|i: u32| (i % 251) as u8).collect();
    std::fs::write(root.join("canvaskit.wasm"), &payload).unwrap();
    let mut config = test_config(&root, 0);
    config.performance.request_timeout = 1;
    let server = TestServer::start_with(&config);

    let mut stream = TcpStream::connect(server.addr).await.unwrap();
    stream
        .write_all(b"GET /canvaskit.wasm HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
        .await
        .unwrap();
    // Stall past the timeout while the response is still being written
    tokio::time::sleep(Duration::from_millis(2500)).await;

    let mut raw = Vec::new();
    timeout(Duration::from_secs(10), stream.read_to_end(&mut raw))
        .await
        .expect("read timed out")
        .unwrap();
    let response = parse_response(&raw);
    assert_eq!(response.status, 200);
    assert_eq!(response.body.len(), payload.len());
    assert!(response.body == payload);

    server.shutdown().await;
}

#[tokio::test]
async fn silent_client_is_dropped_after_timeout() {
    let (_dir, root) = bundle();
    let mut config = test_config(&root, 0);
    config.performance.request_timeout = 1;
    let server = TestServer::start_with(&config);

    let mut stream = TcpStream::connect(server.addr).await.unwrap();
    let mut raw = Vec::new();
    // Either a clean close or a reset ends the read
    let _ = timeout(IO_TIMEOUT, stream.read_to_end(&mut raw))
        .await
        .expect("server should close an idle connection");

    server.shutdown().await;
}

#[tokio::test]
async fn restart_on_same_port_succeeds() {
    let (_dir, root) = bundle();
    let first = TestServer::start(&root);
    let addr = first.addr;

    // The server closes first, leaving its side of the socket in TIME_WAIT
    assert_eq!(get(addr, "/").await.status, 200);
    first.shutdown().await;

    let second = TestServer::start_on(&root, addr.port());
    assert_eq!(second.addr, addr);
    assert_eq!(get(addr, "/").await.status, 200);
    second.shutdown().await;
}

#[cfg(unix)]
#[tokio::test]
async fn port_held_by_live_server_is_a_bind_error() {
    let (_dir, root) = bundle();
    let server = TestServer::start(&root);

    let result = Server::bind(&test_config(&root, server.addr.port()));
    assert!(matches!(result, Err(StartupError::Bind { .. })));

    server.shutdown().await;
}

#[tokio::test]
async fn missing_root_is_a_startup_error() {
    let dir = tempfile::tempdir().unwrap();
    let result = Server::bind(&test_config(&dir.path().join("build/web"), 0));
    assert!(matches!(result, Err(StartupError::InvalidRoot { .. })));
}
