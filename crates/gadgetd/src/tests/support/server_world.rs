//! Server test world: a running server plus the client sockets driving it.

use std::cell::RefCell;
use std::io::{self, Read};
use std::net::{SocketAddr, TcpStream};
use std::time::{Duration, Instant};

use gadget_config::Config;
use gadget_protocol::{Request, Response, read_message, write_message};

use crate::server::{GadgetServer, ServerContext};
use crate::transport::ListenerStopped;

const CLIENT_TIMEOUT: Duration = Duration::from_secs(5);

/// Scenario world shared across server steps.
#[derive(Default)]
pub struct ServerWorld {
    server: Option<GadgetServer>,
    addr: Option<SocketAddr>,
    client: Option<TcpStream>,
    extra_clients: Vec<TcpStream>,
    responses: Vec<Response>,
    stopped: Option<ListenerStopped>,
}

impl ServerWorld {
    /// Starts a server on a free loopback port offering `targets`.
    pub fn start(&mut self, targets: &[&str]) -> Result<(), String> {
        let config = Config::default()
            .with_listen_port(0)
            .with_targets(targets.iter().copied());
        let server = GadgetServer::new(&config, ServerContext::from_config(&config));
        let addr = server.start_server(0).map_err(|error| error.to_string())?;
        self.server = Some(server);
        self.addr = Some(addr);
        Ok(())
    }

    fn server(&self) -> Result<&GadgetServer, String> {
        self.server.as_ref().ok_or_else(|| "server not started".to_owned())
    }

    fn connect(&self) -> Result<TcpStream, String> {
        let addr = self.addr.ok_or("server not started")?;
        let stream = TcpStream::connect(addr).map_err(|error| error.to_string())?;
        stream
            .set_read_timeout(Some(CLIENT_TIMEOUT))
            .map_err(|error| error.to_string())?;
        Ok(stream)
    }

    fn client(&mut self) -> Result<&mut TcpStream, String> {
        if self.client.is_none() {
            self.client = Some(self.connect()?);
        }
        self.client.as_mut().ok_or_else(|| "client missing".to_owned())
    }

    /// Sends `request` on the primary client and records the response.
    pub fn send(&mut self, request: &Request) -> Result<(), String> {
        self.pipeline(std::slice::from_ref(request))
    }

    /// Writes every request before reading any response.
    pub fn pipeline(&mut self, requests: &[Request]) -> Result<(), String> {
        let client = self.client()?;
        for request in requests {
            write_message(&mut *client, request).map_err(|error| error.to_string())?;
        }
        let mut responses = Vec::with_capacity(requests.len());
        for _ in requests {
            let response: Response = read_message(&mut *client)
                .map_err(|error| error.to_string())?
                .ok_or("server closed the connection")?;
            responses.push(response);
        }
        self.responses.extend(responses);
        Ok(())
    }

    /// Opens `count` extra clients and waits until the server tracks them.
    pub fn connect_clients(&mut self, count: usize) -> Result<(), String> {
        for _ in 0..count {
            let mut client = self.connect()?;
            write_message(&mut client, &Request::list_apps("")).map_err(|error| error.to_string())?;
            let _: Option<Response> =
                read_message(&mut client).map_err(|error| error.to_string())?;
            self.extra_clients.push(client);
        }
        let expected = self.extra_clients.len() + usize::from(self.client.is_some());
        let server = self.server()?;
        if wait_until(|| server.live_connections() == expected) {
            Ok(())
        } else {
            Err(format!(
                "expected {expected} live connections, saw {}",
                server.live_connections()
            ))
        }
    }

    /// Stops the server and keeps the stop summary for later steps.
    pub fn stop(&mut self) -> Result<(), String> {
        let stopped = self
            .server()?
            .stop_server()
            .map_err(|error| error.to_string())?
            .ok_or("server was not running")?;
        self.stopped = Some(stopped);
        Ok(())
    }

    /// Summary of the last stop.
    pub fn stopped(&self) -> Result<ListenerStopped, String> {
        self.stopped.ok_or_else(|| "server was never stopped".to_owned())
    }

    /// Number of clients the scenario opened.
    #[must_use]
    pub fn client_count(&self) -> usize {
        self.extra_clients.len() + usize::from(self.client.is_some())
    }

    /// Restarts on the port used before the stop.
    pub fn restart(&mut self) -> Result<SocketAddr, String> {
        let port = self.addr.ok_or("server never started")?.port();
        let addr = self
            .server()?
            .start_server(port)
            .map_err(|error| error.to_string())?;
        self.addr = Some(addr);
        Ok(addr)
    }

    /// Checks that every extra client reads end of stream or a reset.
    ///
    /// A read that times out means the server left the socket open.
    pub fn clients_closed(&mut self) -> Result<(), String> {
        for client in &mut self.extra_clients {
            let mut buffer = [0_u8; 16];
            match client.read(&mut buffer) {
                Ok(0) => {}
                Err(error)
                    if matches!(
                        error.kind(),
                        io::ErrorKind::ConnectionReset | io::ErrorKind::ConnectionAborted
                    ) => {}
                Ok(read) => return Err(format!("client read {read} bytes after stop")),
                Err(error) => return Err(format!("client socket still open: {error}")),
            }
        }
        Ok(())
    }

    pub fn registry_eventually_contains(&self, target: &str) -> Result<bool, String> {
        let server = self.server()?;
        Ok(wait_until(|| server.registry().is_registered(target)))
    }

    #[must_use]
    pub fn responses(&self) -> &[Response] {
        &self.responses
    }

    pub fn last_response(&self) -> Result<&Response, String> {
        self.responses
            .last()
            .ok_or_else(|| "no response recorded".to_owned())
    }
}

fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(2);
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(10));
    }
    condition()
}

/// Default server world fixture.
#[must_use]
pub fn server_world() -> RefCell<ServerWorld> {
    RefCell::new(ServerWorld::default())
}
