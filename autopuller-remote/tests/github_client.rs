//! GitHubClient against a loopback HTTP stub.

use std::io::{BufRead, BufReader, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use autopuller_core::{cancellation, Cancellation, CiResult, CommitId, RemoteError, RemoteStateSource};
use autopuller_remote::GitHubClient;

// ---------------------------------------------------------------------------
// Stub server
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct Recorded {
    path: String,
    authorization: Option<String>,
}

struct Stub {
    prefix: String,
    requests: Arc<Mutex<Vec<Recorded>>>,
}

impl Stub {
    /// Serve `routes` (path suffix, status, body) until the test exits.
    fn serve(routes: Vec<(&'static str, u16, &'static str)>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
        let prefix = format!("http://{}/repos/", listener.local_addr().expect("addr"));
        let requests = Arc::new(Mutex::new(Vec::new()));

        let log = Arc::clone(&requests);
        thread::spawn(move || {
            for stream in listener.incoming().flatten() {
                handle(stream, &routes, &log);
            }
        });

        Self { prefix, requests }
    }

    fn requests(&self) -> Vec<Recorded> {
        self.requests.lock().unwrap().clone()
    }

    fn client(&self, token: Option<&str>) -> GitHubClient {
        GitHubClient::with_settings(
            &self.prefix,
            "acme/shop",
            "master",
            token.map(str::to_string),
            Duration::from_secs(5),
        )
    }
}

fn handle(
    stream: TcpStream,
    routes: &[(&'static str, u16, &'static str)],
    log: &Mutex<Vec<Recorded>>,
) {
    let mut reader = BufReader::new(stream.try_clone().expect("clone"));
    let mut request_line = String::new();
    if reader.read_line(&mut request_line).is_err() {
        return;
    }
    let path = request_line
        .split_whitespace()
        .nth(1)
        .unwrap_or_default()
        .to_string();

    let mut authorization = None;
    loop {
        let mut line = String::new();
        match reader.read_line(&mut line) {
            Ok(0) | Err(_) => break,
            Ok(_) if line == "\r\n" => break,
            Ok(_) => {
                if let Some((name, value)) = line.split_once(':') {
                    if name.eq_ignore_ascii_case("authorization") {
                        authorization = Some(value.trim().to_string());
                    }
                }
            }
        }
    }
    log.lock().unwrap().push(Recorded {
        path: path.clone(),
        authorization,
    });

    let (status, body) = routes
        .iter()
        .find(|(suffix, _, _)| path.ends_with(suffix))
        .map(|(_, status, body)| (*status, *body))
        .unwrap_or((404, r#"{"message":"Not Found"}"#));

    let mut stream = stream;
    let _ = write!(
        stream,
        "HTTP/1.1 {status} Stub\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    );
    let _ = stream.flush();
}

// ---------------------------------------------------------------------------
// Head commit
// ---------------------------------------------------------------------------

#[tokio::test]
async fn head_commit_reads_sha_and_sends_token() {
    let stub = Stub::serve(vec![(
        "/repos/acme/shop/commits/master",
        200,
        r#"{"sha": "0123456789abcdef", "commit": {"message": "fix"}}"#,
    )]);

    let head = stub
        .client(Some("s3cret"))
        .head_commit(&Cancellation::never())
        .await
        .expect("head");

    assert_eq!(head, CommitId::from("0123456789abcdef"));
    let requests = stub.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].path, "/repos/acme/shop/commits/master");
    assert_eq!(requests[0].authorization.as_deref(), Some("token s3cret"));
}

#[tokio::test]
async fn no_token_means_no_authorization_header() {
    let stub = Stub::serve(vec![("/commits/master", 200, r#"{"sha": "abc"}"#)]);
    stub.client(None)
        .head_commit(&Cancellation::never())
        .await
        .expect("head");
    assert_eq!(stub.requests()[0].authorization, None);
}

#[tokio::test]
async fn unauthorized_maps_to_auth_error() {
    let stub = Stub::serve(vec![("/commits/master", 401, r#"{"message":"Bad credentials"}"#)]);
    let err = stub
        .client(Some("expired"))
        .head_commit(&Cancellation::never())
        .await
        .unwrap_err();
    assert!(matches!(err, RemoteError::Auth { status: 401, .. }), "got: {err}");
}

#[tokio::test]
async fn unknown_branch_maps_to_not_found() {
    let stub = Stub::serve(vec![]);
    let err = stub
        .client(None)
        .head_commit(&Cancellation::never())
        .await
        .unwrap_err();
    assert!(matches!(err, RemoteError::NotFound { .. }), "got: {err}");
    assert!(err.to_string().contains("/commits/master"));
}

#[tokio::test]
async fn server_error_maps_to_http_status() {
    let stub = Stub::serve(vec![("/commits/master", 502, "{}")]);
    let err = stub
        .client(None)
        .head_commit(&Cancellation::never())
        .await
        .unwrap_err();
    assert!(matches!(err, RemoteError::HttpStatus { status: 502, .. }), "got: {err}");
}

#[tokio::test]
async fn malformed_or_empty_sha_is_a_decode_error() {
    let stub = Stub::serve(vec![
        ("/commits/master", 200, r#"{"sha": "   "}"#),
        ("/commits/broken", 200, "<html>rate limited</html>"),
    ]);
    let err = stub
        .client(None)
        .head_commit(&Cancellation::never())
        .await
        .unwrap_err();
    assert!(matches!(err, RemoteError::Decode { .. }), "got: {err}");

    let broken = GitHubClient::with_settings(
        &stub.prefix,
        "acme/shop",
        "broken",
        None,
        Duration::from_secs(5),
    );
    let err = broken.head_commit(&Cancellation::never()).await.unwrap_err();
    assert!(matches!(err, RemoteError::Decode { .. }), "got: {err}");
}

#[tokio::test]
async fn refused_connection_is_a_transport_error() {
    let port = {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
        listener.local_addr().expect("addr").port()
    };
    let client = GitHubClient::with_settings(
        &format!("http://127.0.0.1:{port}/repos/"),
        "acme/shop",
        "master",
        None,
        Duration::from_secs(5),
    );
    let err = client.head_commit(&Cancellation::never()).await.unwrap_err();
    assert!(matches!(err, RemoteError::Transport { .. }), "got: {err}");
}

// ---------------------------------------------------------------------------
// CI result
// ---------------------------------------------------------------------------

#[tokio::test]
async fn ci_result_maps_matching_conclusion() {
    let stub = Stub::serve(vec![(
        "/repos/acme/shop/actions/runs",
        200,
        r#"{"workflow_runs": [
            {"head_sha": "newer", "conclusion": "failure"},
            {"head_sha": "abc", "conclusion": "success"}
        ]}"#,
    )]);
    let client = stub.client(Some("k"));

    let result = client
        .ci_result(&"abc".into(), &Cancellation::never())
        .await
        .expect("ci");
    assert_eq!(result, CiResult::Success);

    let unknown = client
        .ci_result(&"zzz".into(), &Cancellation::never())
        .await
        .expect("ci");
    assert_eq!(unknown, CiResult::Pending);
}

#[tokio::test]
async fn ci_result_keeps_unrecognised_conclusions() {
    let stub = Stub::serve(vec![(
        "/actions/runs",
        200,
        r#"{"workflow_runs": [{"head_sha": "abc", "conclusion": "timed_out"}]}"#,
    )]);
    let result = stub
        .client(None)
        .ci_result(&"abc".into(), &Cancellation::never())
        .await
        .expect("ci");
    assert_eq!(result, CiResult::Other("timed_out".into()));
    assert!(!result.is_success());
}

// ---------------------------------------------------------------------------
// Change set
// ---------------------------------------------------------------------------

#[tokio::test]
async fn change_set_preserves_comparison_order() {
    let stub = Stub::serve(vec![(
        "/repos/acme/shop/compare/old...new",
        200,
        r#"{"status": "ahead", "files": [
            {"filename": "src/app.py", "status": "modified"},
            {"filename": "README.md", "status": "added"},
            {"filename": "docker-compose.yml", "status": "modified"}
        ]}"#,
    )]);
    let changes = stub
        .client(None)
        .change_set(&"old".into(), &"new".into(), &Cancellation::never())
        .await
        .expect("diff");
    assert_eq!(
        changes.iter().collect::<Vec<_>>(),
        vec!["src/app.py", "README.md", "docker-compose.yml"]
    );
}

#[tokio::test]
async fn change_set_without_files_is_empty() {
    let stub = Stub::serve(vec![("/compare/old...new", 200, r#"{"status": "identical"}"#)]);
    let changes = stub
        .client(None)
        .change_set(&"old".into(), &"new".into(), &Cancellation::never())
        .await
        .expect("diff");
    assert!(changes.is_empty());
}

// ---------------------------------------------------------------------------
// Cancellation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn cancel_interrupts_a_hanging_request() {
    // Accepts the connection at the kernel level but never answers.
    let silent = TcpListener::bind("127.0.0.1:0").expect("bind");
    let client = GitHubClient::with_settings(
        &format!("http://{}/repos/", silent.local_addr().expect("addr")),
        "acme/shop",
        "master",
        None,
        Duration::from_secs(2),
    );

    let (handle, signal) = cancellation();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        handle.cancel();
    });

    let started = Instant::now();
    let err = client.head_commit(&signal).await.unwrap_err();
    assert!(matches!(err, RemoteError::Cancelled), "got: {err}");
    assert!(started.elapsed() < Duration::from_secs(2));
}
