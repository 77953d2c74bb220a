//! Blocking client for the gadget wire protocol.

use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;

use gadget_config::DEFAULT_MAX_FRAME_BYTES;
use gadget_protocol::{Request, Response, read_message_with_limit, write_message};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::ClientError;

/// Time allowed for establishing a connection.
pub const CONNECTION_TIMEOUT: Duration = Duration::from_secs(5);

/// Connection to a gadget server.
///
/// [`GadgetClient::send`] and [`GadgetClient::receive`] expose the raw
/// request/response stream so callers can pipeline; the server answers
/// requests on one connection strictly in the order they were sent.
#[derive(Debug)]
pub struct GadgetClient {
    stream: TcpStream,
}

impl GadgetClient {
    /// Connects to the server at `host:port`.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] when the address cannot be resolved or no
    /// resolved address accepts the connection.
    pub fn connect(host: &str, port: u16) -> Result<Self, ClientError> {
        let endpoint = format!("{host}:{port}");
        let addresses: Vec<SocketAddr> = (host, port)
            .to_socket_addrs()
            .map_err(|source| ClientError::Resolve {
                endpoint: endpoint.clone(),
                source,
            })?
            .collect();
        let mut last_error = None;
        for address in addresses {
            match TcpStream::connect_timeout(&address, CONNECTION_TIMEOUT) {
                Ok(stream) => return Ok(Self::from_stream(stream)),
                Err(error) => last_error = Some(error),
            }
        }
        Err(match last_error {
            Some(source) => ClientError::Connect { endpoint, source },
            None => ClientError::ResolveEmpty { endpoint },
        })
    }

    /// Wraps an established stream.
    #[must_use]
    pub fn from_stream(stream: TcpStream) -> Self {
        Self { stream }
    }

    /// Identifiers of the targets the server can attach to.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] on transport failures or a failed response.
    pub fn list_apps(&mut self) -> Result<Vec<String>, ClientError> {
        self.request_as(&Request::list_apps(""))
    }

    /// Asks the server to attach to `target`, returning the identifier once
    /// the attach has started. The target becomes callable when the attach
    /// completes.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] on transport failures or a failed response.
    pub fn connect_app(&mut self, target: &str) -> Result<String, ClientError> {
        self.request_as(&Request::connect_app(target))
    }

    /// Invokes `method` on `target` with positional JSON arguments.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Remote`] with the server's failure kind, or
    /// another [`ClientError`] on transport failures.
    pub fn call(
        &mut self,
        target: &str,
        method: &str,
        arguments: Vec<Value>,
    ) -> Result<Value, ClientError> {
        self.request(&Request::call(target, method, arguments))
    }

    /// Sends `request` and waits for its answer.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] on transport failures or a failed response.
    pub fn request(&mut self, request: &Request) -> Result<Value, ClientError> {
        self.send(request)?;
        self.receive()?.into_result().map_err(ClientError::Remote)
    }

    /// Writes one request frame without waiting.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Protocol`] when the frame cannot be written.
    pub fn send(&mut self, request: &Request) -> Result<(), ClientError> {
        write_message(&mut self.stream, request)?;
        Ok(())
    }

    /// Reads the next response frame.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Closed`] when the server closed the connection
    /// at a frame boundary, or [`ClientError::Protocol`] on other failures,
    /// including a frame announcing more than the default frame ceiling.
    pub fn receive(&mut self) -> Result<Response, ClientError> {
        read_message_with_limit(&mut self.stream, DEFAULT_MAX_FRAME_BYTES)?
            .ok_or(ClientError::Closed)
    }

    fn request_as<T: DeserializeOwned>(&mut self, request: &Request) -> Result<T, ClientError> {
        let payload = self.request(request)?;
        serde_json::from_value(payload).map_err(|source| ClientError::UnexpectedPayload {
            method: request.method().to_owned(),
            source,
        })
    }
}
