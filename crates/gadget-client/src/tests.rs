use super::*;

use std::io::Write;
use std::net::{SocketAddr, TcpListener};
use std::thread;
use std::time::{Duration, Instant};

use gadget_config::Config;
use gadget_protocol::{ErrorKind, FrameError, ProtocolError, Request, Response};
use gadgetd::{GadgetServer, ServerContext};
use rstest::{fixture, rstest};
use serde_json::json;

const TARGET: &str = "com.example.target";

struct RunningServer {
    server: GadgetServer,
    addr: SocketAddr,
}

impl RunningServer {
    fn client(&self) -> GadgetClient {
        GadgetClient::connect("127.0.0.1", self.addr.port()).expect("connect to server")
    }

    fn wait_for(&self, target: &str) {
        let deadline = Instant::now() + Duration::from_secs(2);
        while !self.server.registry().is_registered(target) {
            assert!(Instant::now() < deadline, "{target} never registered");
            std::thread::sleep(Duration::from_millis(10));
        }
    }

    fn attached_client(&self) -> GadgetClient {
        let mut client = self.client();
        client.connect_app(TARGET).expect("attach");
        self.wait_for(TARGET);
        client
    }

    fn run(&self, args: &[&str]) -> (ExitCode, String, String) {
        let port = self.addr.port().to_string();
        let argv = ["gadget", "--port", port.as_str()]
            .into_iter()
            .chain(args.iter().copied())
            .map(OsString::from);
        run_collecting(argv)
    }
}

fn run_collecting(args: impl IntoIterator<Item = OsString>) -> (ExitCode, String, String) {
    let mut stdout = Vec::new();
    let mut stderr = Vec::new();
    let code = run(args, &mut stdout, &mut stderr);
    (
        code,
        String::from_utf8(stdout).expect("stdout utf8"),
        String::from_utf8(stderr).expect("stderr utf8"),
    )
}

#[fixture]
fn server() -> RunningServer {
    let config = Config::default().with_targets([TARGET]);
    let server = GadgetServer::new(&config, ServerContext::from_config(&config));
    let addr = server.start_server(0).expect("start server");
    RunningServer { server, addr }
}

#[rstest]
fn lists_and_attaches(server: RunningServer) {
    let mut client = server.client();
    assert_eq!(client.list_apps().expect("list apps"), vec![TARGET.to_owned()]);
    assert_eq!(client.connect_app(TARGET).expect("attach"), TARGET);
    server.wait_for(TARGET);
}

#[rstest]
fn calls_report_remote_failures(server: RunningServer) {
    let mut client = server.client();
    let error = client
        .call("com.example.other", "nonexistentMethod", Vec::new())
        .expect_err("target is not attached");
    assert_eq!(error.remote_kind(), Some(ErrorKind::ServiceNotFound));

    let mut client = server.attached_client();
    let error = client
        .call(TARGET, "pushInt", vec![json!("seven")])
        .expect_err("wrong argument type");
    assert_eq!(error.remote_kind(), Some(ErrorKind::IllegalArgument));
}

#[rstest]
fn pipelined_requests_are_answered_in_order(server: RunningServer) {
    let mut client = server.attached_client();
    for value in ["a", "b", "c"] {
        client
            .send(&Request::call(TARGET, "pushString", vec![json!(value)]))
            .expect("send request");
    }
    let responses: Vec<Response> = (0..3)
        .map(|_| client.receive().expect("receive response"))
        .collect();
    assert_eq!(
        responses,
        vec![
            Response::Success(json!(0)),
            Response::Success(json!(1)),
            Response::Success(json!(2)),
        ]
    );
}

#[rstest]
fn stopped_server_closes_the_client(server: RunningServer) {
    let mut client = server.client();
    client.list_apps().expect("list apps");
    server.server.stop_server().expect("stop server");
    assert!(client.list_apps().is_err());
}

#[test]
fn oversized_response_frames_are_rejected() {
    let listener = TcpListener::bind(("127.0.0.1", 0)).expect("bind fake server");
    let port = listener.local_addr().expect("fake server address").port();
    let server = thread::spawn(move || {
        let (mut stream, _) = listener.accept().expect("accept client");
        stream
            .write_all(&[0xff, 0xff, 0xff, 0xff])
            .expect("write oversized prefix");
    });

    let mut client = GadgetClient::connect("127.0.0.1", port).expect("connect");
    let error = client.receive().expect_err("frame over ceiling");
    assert!(matches!(
        error,
        ClientError::Protocol(ProtocolError::Frame(FrameError::TooLarge { .. }))
    ));
    server.join().expect("fake server");
}

#[rstest]
fn cli_lists_apps_as_json(server: RunningServer) {
    let (code, stdout, stderr) = server.run(&["list-apps"]);
    assert_eq!(code, ExitCode::SUCCESS, "stderr: {stderr}");
    let payload: Value = serde_json::from_str(&stdout).expect("json output");
    assert_eq!(payload, json!([TARGET]));
}

#[rstest]
fn cli_calls_with_json_arguments(server: RunningServer) {
    server.attached_client();
    let (code, stdout, stderr) = server.run(&["call", TARGET, "pushInt", "5"]);
    assert_eq!(code, ExitCode::SUCCESS, "stderr: {stderr}");
    assert_eq!(stdout.trim(), "0");

    let (code, stdout, _) = server.run(&["call", TARGET, "getEntryPoints"]);
    assert_eq!(code, ExitCode::SUCCESS);
    let payload: Value = serde_json::from_str(&stdout).expect("json output");
    assert_eq!(payload, json!([5]));
}

#[rstest]
fn cli_reports_remote_failures(server: RunningServer) {
    let (code, stdout, stderr) = server.run(&["call", "com.example.other", "anything"]);
    assert_eq!(code, ExitCode::FAILURE);
    assert!(stdout.is_empty());
    assert!(stderr.contains("Service not found"), "stderr: {stderr}");
}

#[test]
fn cli_reports_connection_failures() {
    let port = {
        let listener = TcpListener::bind(("127.0.0.1", 0)).expect("reserve port");
        listener.local_addr().expect("reserved address").port()
    };
    let port = port.to_string();
    let (code, _, stderr) = run_collecting(
        ["gadget", "--port", port.as_str(), "list-apps"]
            .into_iter()
            .map(OsString::from),
    );
    assert_eq!(code, ExitCode::FAILURE);
    assert!(stderr.contains("failed to connect"), "stderr: {stderr}");
}

#[test]
fn missing_command_is_a_usage_error() {
    let (code, stdout, stderr) = run_collecting([OsString::from("gadget")]);
    assert_eq!(code, ExitCode::from(2));
    assert!(stdout.is_empty());
    assert!(stderr.contains("Usage"), "stderr: {stderr}");
}

#[rstest]
#[case("5", json!(5))]
#[case("[1, 2]", json!([1, 2]))]
#[case("\"quoted\"", json!("quoted"))]
#[case("true", json!(true))]
#[case("plain text", json!("plain text"))]
fn arguments_parse_as_json_or_text(#[case] raw: &str, #[case] expected: Value) {
    assert_eq!(parse_argument(raw), expected);
}
