//! Tests de integración para el servidor de datos
//! tests/integration_test.rs
//!
//! Cada test levanta un servidor propio en un puerto efímero, con su raíz
//! en un directorio temporal, y habla con él por TCP.

use dataserver::config::Config;
use dataserver::server::Server;
use dataserver::tasks::TaskDescriptor;
use std::collections::HashSet;
use std::fs;
use std::io::{Read, Write};
use std::net::{SocketAddr, TcpStream};
use std::path::Path;
use std::thread;
use std::time::Duration;
use tempfile::TempDir;

/// Servidor corriendo en segundo plano sobre una raíz temporal
struct TestServer {
    addr: SocketAddr,
    root: TempDir,
}

impl TestServer {
    fn start(configure: impl FnOnce(&mut Config)) -> Self {
        let root = tempfile::tempdir().expect("tempdir");
        let mut config = Config {
            port: 0,
            root_dir: root.path().to_path_buf(),
            scan_interval_ms: 5,
            scan_max_polls: 2,
            ..Config::default()
        };
        configure(&mut config);

        let mut server = Server::new(config).expect("server");
        let addr = server.bind().expect("bind");
        thread::spawn(move || {
            let _ = server.run();
        });

        Self { addr, root }
    }

    fn root(&self) -> &Path {
        self.root.path()
    }

    fn send(&self, raw: &[u8]) -> Reply {
        let mut stream = TcpStream::connect(self.addr).expect("connect");
        stream.set_read_timeout(Some(Duration::from_secs(10))).unwrap();
        stream.write_all(raw).unwrap();
        stream.flush().unwrap();

        let mut buf = Vec::new();
        stream.read_to_end(&mut buf).unwrap();
        Reply::parse(&buf)
    }

    fn get(&self, target: &str) -> Reply {
        self.send(format!("GET {} HTTP/1.0\r\n\r\n", target).as_bytes())
    }

    fn get_task(&self) -> TaskDescriptor {
        let reply = self.get("/get_task");
        assert_eq!(reply.status, 200, "get_task failed: {}", reply.text());
        serde_json::from_slice(&reply.body).expect("descriptor JSON")
    }
}

struct Reply {
    status: u16,
    head: String,
    body: Vec<u8>,
}

impl Reply {
    fn parse(raw: &[u8]) -> Self {
        let split = raw
            .windows(4)
            .position(|w| w == b"\r\n\r\n")
            .expect("response head");
        let head = String::from_utf8_lossy(&raw[..split]).into_owned();
        let status = head
            .split_whitespace()
            .nth(1)
            .and_then(|s| s.parse().ok())
            .expect("status code");

        Self {
            status,
            head,
            body: raw[split + 4..].to_vec(),
        }
    }

    fn header(&self, name: &str) -> Option<String> {
        self.head.lines().find_map(|line| {
            let (key, value) = line.split_once(':')?;
            if key.trim().eq_ignore_ascii_case(name) {
                Some(value.trim().to_string())
            } else {
                None
            }
        })
    }

    fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

fn seed_input(server: &TestServer, names: &[&str]) {
    for name in names {
        fs::write(server.root().join("input").join(name), b"SIMPLE").unwrap();
    }
}

#[test]
fn test_task_round_trip() {
    let server = TestServer::start(|_| {});
    seed_input(&server, &["EUC_LE1_VIS-W-1-1_20270101T000000.0Z.fits"]);

    let task = server.get_task();
    assert!(task.task_id.starts_with("QDTsrv_"));
    assert_eq!(task.in_file, "EUC_LE1_VIS-W-1-1_20270101T000000.0Z.fits");
    assert_eq!(task.out_file, "EUC_QLA_LE1-VIS-W-1-1_20270101T000000.0Z.json");
    assert_eq!(task.log_file, "EUC_QLA_LE1-VIS-LOG-W-1-1_20270101T000000.0Z.log");
    assert_eq!(task.retrieve_path, "input");

    let reply = server.get(&format!("/end_task?task_id={}", task.task_id));
    assert_eq!(reply.status, 200);
    assert!(reply.body.is_empty());
    assert!(!server.root().join("input").join(&task.in_file).exists());
    assert!(server.root().join("processed").join(&task.in_file).exists());

    let again = server.get(&format!("/end_task?task_id={}", task.task_id));
    assert_eq!(again.status, 404);
}

#[test]
fn test_end_task_errors() {
    let server = TestServer::start(|_| {});

    assert_eq!(server.get("/end_task").status, 400);
    assert_eq!(server.get("/end_task?task_id=QDTsrv_20000101-000000").status, 404);
}

#[test]
fn test_exhausted_pool_is_503() {
    let server = TestServer::start(|_| {});

    let reply = server.get("/get_task");
    assert_eq!(reply.status, 503);
    assert_eq!(reply.header("Retry-After").as_deref(), Some("5"));
}

#[test]
fn test_open_task_file_is_not_reissued() {
    let server = TestServer::start(|_| {});
    seed_input(&server, &["only.fits"]);

    let first = server.get_task();
    assert_eq!(first.in_file, "only.fits");
    assert_eq!(server.get("/get_task").status, 503);

    let reply = server.get(&format!("/end_task?task_id={}", first.task_id));
    assert_eq!(reply.status, 200);
}

#[test]
fn test_trailing_slash_routes() {
    let server = TestServer::start(|_| {});
    seed_input(&server, &["a.fits"]);

    let reply = server.get("/get_task/");
    assert_eq!(reply.status, 200);
    assert_eq!(server.get("/info/").status, 200);
}

#[test]
fn test_synthetic_mode_batches() {
    let server = TestServer::start(|config| config.synthetic = true);

    let mut in_files = HashSet::new();
    for _ in 0..40 {
        let task = server.get_task();
        assert!(server.root().join("input").join(&task.in_file).is_file());
        assert!(in_files.insert(task.in_file));
    }
    assert!(in_files.iter().any(|f| f.starts_with("EUC_LE1_VIS-W-12000-1_")));
    assert!(in_files.iter().any(|f| f.starts_with("EUC_LE1_VIS-W-12039-4_")));

    // El lote siguiente continúa la numeración
    let next = server.get_task();
    assert!(next.in_file.starts_with("EUC_LE1_VIS-W-12040-1_"), "{}", next.in_file);
}

#[test]
fn test_concurrent_pollers_get_distinct_files() {
    let server = TestServer::start(|_| {});
    let names: Vec<String> = (0..8).map(|i| format!("f{}.fits", i)).collect();
    let refs: Vec<&str> = names.iter().map(String::as_str).collect();
    seed_input(&server, &refs);

    let addr = server.addr;
    let handles: Vec<_> = (0..8)
        .map(|_| {
            thread::spawn(move || {
                let mut stream = TcpStream::connect(addr).unwrap();
                stream.write_all(b"GET /get_task HTTP/1.0\r\n\r\n").unwrap();
                let mut buf = Vec::new();
                stream.read_to_end(&mut buf).unwrap();
                let reply = Reply::parse(&buf);
                assert_eq!(reply.status, 200);
                serde_json::from_slice::<TaskDescriptor>(&reply.body).unwrap()
            })
        })
        .collect();

    let tasks: Vec<TaskDescriptor> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    let files: HashSet<_> = tasks.iter().map(|t| t.in_file.clone()).collect();
    let ids: HashSet<_> = tasks.iter().map(|t| t.task_id.clone()).collect();
    assert_eq!(files.len(), 8);
    assert_eq!(ids.len(), 8);
}

#[test]
fn test_upload_hello() {
    let server = TestServer::start(|_| {});
    fs::create_dir(server.root().join("results")).unwrap();

    let body = "--B\r\nContent-Disposition: form-data; name=\"file\"; filename=\"a.txt\"\r\n\r\nHELLO\r\n--B--\r\n";
    let raw = format!(
        "POST /results HTTP/1.0\r\nContent-Type: multipart/form-data; boundary=B\r\nContent-Length: {}\r\n\r\n{}",
        body.len(),
        body
    );

    let reply = server.send(raw.as_bytes());
    assert_eq!(reply.status, 200);
    assert!(reply.text().contains("<strong>Success:</strong>"));
    assert_eq!(fs::read(server.root().join("results/a.txt")).unwrap(), b"HELLO");
}

#[test]
fn test_upload_without_boundary_creates_nothing() {
    let server = TestServer::start(|_| {});

    let body = "HELLO\r\n";
    let raw = format!(
        "POST / HTTP/1.0\r\nContent-Type: multipart/form-data; boundary=B\r\nContent-Length: {}\r\n\r\n{}",
        body.len(),
        body
    );

    let reply = server.send(raw.as_bytes());
    assert_eq!(reply.status, 200);
    assert!(reply.text().contains("<strong>Failed:</strong>"));
    assert!(!server.root().join("a.txt").exists());
}

#[test]
fn test_static_files_and_errors() {
    let server = TestServer::start(|_| {});
    fs::write(server.root().join("index.html"), b"<h1>QLA</h1>").unwrap();

    let index = server.get("/");
    assert_eq!(index.status, 200);
    assert_eq!(index.body, b"<h1>QLA</h1>");
    assert_eq!(index.header("Content-Type").as_deref(), Some("text/html"));

    let missing = server.get("/missing.fits");
    assert_eq!(missing.status, 500);
    assert!(missing.text().contains("Server access error."));
}

#[test]
fn test_head_and_common_headers() {
    let server = TestServer::start(|_| {});

    let reply = server.send(b"HEAD / HTTP/1.0\r\n\r\n");
    assert_eq!(reply.status, 200);
    assert!(reply.body.is_empty());
    assert_eq!(reply.header("Connection").as_deref(), Some("close"));
    assert!(reply.header("X-Request-Id").is_some());
    assert!(reply.header("Server").unwrap_or_default().starts_with("dataserver/"));
}

#[test]
fn test_metrics_include_task_counters() {
    let server = TestServer::start(|_| {});
    seed_input(&server, &["a.fits", "b.fits"]);

    let task = server.get_task();
    server.get(&format!("/end_task?task_id={}", task.task_id));

    let reply = server.get("/metrics");
    assert_eq!(reply.status, 200);
    let json: serde_json::Value = serde_json::from_slice(&reply.body).unwrap();
    assert_eq!(json["tasks"]["issued"], 1);
    assert_eq!(json["tasks"]["completed"], 1);
    assert_eq!(json["tasks"]["open_tasks"], 0);
    assert_eq!(json["tasks"]["pool_size"], 1);
    assert!(json["requests"]["total"].as_u64().unwrap_or(0) >= 2);
}
