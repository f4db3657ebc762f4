// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

use crate::error::Error;
use crate::rpc::api_version::ApiVersion;
use crate::rpc::error::RpcError;
use crate::rpc::error::RpcError::ConnectionError;
use crate::rpc::frame::{AsyncMessageRead, AsyncMessageWrite, WriteError};
use crate::rpc::message::{
    ReadVersionedType, RequestBody, RequestHeader, ResponseHeader, WriteVersionedType,
};
use crate::rpc::transport::Transport;
use futures::future::BoxFuture;
use log::{debug, warn};
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::io::Cursor;
use std::ops::DerefMut;
use std::sync::Arc;
use std::sync::atomic::{AtomicI32, Ordering};
use std::task::Poll;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, BufStream, WriteHalf};
use tokio::sync::Mutex as AsyncMutex;
use tokio::sync::oneshot::{Sender, channel};
use tokio::task::JoinHandle;

pub type MessengerTransport = ServerConnectionInner<BufStream<Transport>>;

pub type ServerConnection = Arc<MessengerTransport>;

/// Pool of connections keyed by server address. A poisoned connection is
/// replaced on the next lookup.
#[derive(Debug)]
pub struct RpcClient {
    connections: RwLock<HashMap<String, ServerConnection>>,
    connect_timeout: Option<Duration>,
    max_message_size: usize,
}

impl Default for RpcClient {
    fn default() -> Self {
        Self::new()
    }
}

impl RpcClient {
    pub fn new() -> Self {
        RpcClient {
            connections: Default::default(),
            connect_timeout: None,
            max_message_size: usize::MAX,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    pub fn with_max_message_size(mut self, max_message_size: usize) -> Self {
        self.max_message_size = max_message_size;
        self
    }

    pub async fn get_connection(&self, address: &str) -> Result<ServerConnection, Error> {
        {
            let connections = self.connections.read();
            if let Some(conn) = connections.get(address).cloned() {
                if !conn.is_poisoned() {
                    return Ok(conn);
                }
            }
        }
        let new_server = self.connect(address).await?;
        {
            let mut connections = self.connections.write();
            if let Some(race_conn) = connections.get(address) {
                if !race_conn.is_poisoned() {
                    return Ok(race_conn.clone());
                }
            }

            connections.insert(address.to_owned(), new_server.clone());
        }
        Ok(new_server)
    }

    async fn connect(&self, address: &str) -> Result<ServerConnection, Error> {
        let transport = Transport::connect(address, self.connect_timeout)
            .await
            .map_err(|error| ConnectionError(format!("{address}: {error}")))?;
        debug!("Connected to {address}");

        let messenger =
            ServerConnectionInner::new(BufStream::new(transport), self.max_message_size);
        Ok(ServerConnection::new(messenger))
    }
}

#[derive(Debug)]
struct Response {
    header: ResponseHeader,
    data: Cursor<Vec<u8>>,
}

#[derive(Debug)]
struct ActiveRequest {
    channel: Sender<Result<Response, RpcError>>,
}

#[derive(Debug)]
enum ConnectionState {
    /// Requests that were registered or sent and still wait for their response, by request id.
    RequestMap(HashMap<i32, ActiveRequest>),

    /// The stream died; no further request can be processed.
    Poison(Arc<RpcError>),
}

impl ConnectionState {
    fn poison(&mut self, err: RpcError) -> Arc<RpcError> {
        match self {
            Self::RequestMap(map) => {
                let err = Arc::new(err);
                warn!("Connection poisoned, failing {} pending request(s): {err}", map.len());

                for (_request_id, active_request) in map.drain() {
                    // the caller may be gone already
                    active_request
                        .channel
                        .send(Err(RpcError::Poisoned(Arc::clone(&err))))
                        .ok();
                }
                *self = Self::Poison(Arc::clone(&err));
                err
            }
            Self::Poison(e) => Arc::clone(e),
        }
    }
}

/// One multiplexed connection. Responses are matched to requests by id, so
/// any number of requests may be in flight at once.
#[derive(Debug)]
pub struct ServerConnectionInner<RW> {
    stream_write: Arc<AsyncMutex<WriteHalf<RW>>>,

    request_id: AtomicI32,

    state: Arc<Mutex<ConnectionState>>,

    join_handle: JoinHandle<()>,
}

impl<RW> ServerConnectionInner<RW>
where
    RW: AsyncRead + AsyncWrite + Send + 'static,
{
    pub fn new(stream: RW, max_message_size: usize) -> Self {
        let (stream_read, stream_write) = tokio::io::split(stream);
        let state = Arc::new(Mutex::new(ConnectionState::RequestMap(HashMap::default())));
        let state_captured = Arc::clone(&state);

        let join_handle = tokio::spawn(async move {
            let mut stream_read = stream_read;
            loop {
                match stream_read.read_message(max_message_size).await {
                    Ok(msg) => {
                        // framing is intact, a bad header only affects this message
                        let mut cursor = Cursor::new(msg);
                        let header =
                            match ResponseHeader::read_versioned(&mut cursor, ApiVersion(0)) {
                                Ok(header) => header,
                                Err(err) => {
                                    warn!("Cannot read response header, ignoring message: {err}");
                                    continue;
                                }
                            };

                        let active_request = match state_captured.lock().deref_mut() {
                            ConnectionState::RequestMap(map) => {
                                match map.remove(&header.request_id) {
                                    Some(active_request) => active_request,
                                    None => {
                                        warn!(
                                            request_id:% = header.request_id;
                                            "Got response for unknown request",
                                        );
                                        continue;
                                    }
                                }
                            }
                            ConnectionState::Poison(_) => return,
                        };

                        active_request
                            .channel
                            .send(Ok(Response {
                                header,
                                data: cursor,
                            }))
                            .ok();
                    }
                    Err(e) => {
                        state_captured.lock().poison(RpcError::ReadMessageError(e));
                        return;
                    }
                }
            }
        });

        Self {
            stream_write: Arc::new(AsyncMutex::new(stream_write)),
            request_id: AtomicI32::new(0),
            state,
            join_handle,
        }
    }

    pub fn is_poisoned(&self) -> bool {
        let guard = self.state.lock();
        matches!(*guard, ConnectionState::Poison(_))
    }

    pub async fn request<R>(&self, msg: R) -> Result<R::ResponseBody, Error>
    where
        R: RequestBody + Send + WriteVersionedType<Vec<u8>>,
        R::ResponseBody: ReadVersionedType<Cursor<Vec<u8>>>,
    {
        let api_label = crate::metrics::api_key_label(R::API_KEY);
        let start = std::time::Instant::now();
        let record_completion_metrics = |label: &'static str, response_bytes: u64| {
            metrics::counter!(
                crate::metrics::CLIENT_RESPONSES_TOTAL,
                crate::metrics::LABEL_API_KEY => label
            )
            .increment(1);
            metrics::counter!(
                crate::metrics::CLIENT_BYTES_RECEIVED_TOTAL,
                crate::metrics::LABEL_API_KEY => label
            )
            .increment(response_bytes);
            metrics::histogram!(
                crate::metrics::CLIENT_REQUEST_LATENCY_MS,
                crate::metrics::LABEL_API_KEY => label
            )
            .record(start.elapsed().as_secs_f64() * 1000.0);
        };

        let request_id = self.request_id.fetch_add(1, Ordering::SeqCst) & 0x7FFFFFFF;
        let header = RequestHeader {
            request_api_key: R::API_KEY,
            request_api_version: R::REQUEST_VERSION,
            request_id,
        };

        let mut buf = Vec::new();
        header
            .write_versioned(&mut buf, ApiVersion(0))
            .map_err(RpcError::WriteMessageError)?;
        msg.write_versioned(&mut buf, R::REQUEST_VERSION)
            .map_err(RpcError::WriteMessageError)?;

        let (tx, rx) = channel();

        // remove the request again if we are cancelled before it was sent
        let cleanup_on_cancel =
            CleanupRequestStateOnCancel::new(Arc::clone(&self.state), request_id);

        match self.state.lock().deref_mut() {
            ConnectionState::RequestMap(map) => {
                map.insert(request_id, ActiveRequest { channel: tx });
            }
            ConnectionState::Poison(e) => return Err(RpcError::Poisoned(Arc::clone(e)).into()),
        }

        // decrements the in-flight gauge however this future ends
        let in_flight_guard = api_label.map(|label| {
            metrics::counter!(
                crate::metrics::CLIENT_REQUESTS_TOTAL,
                crate::metrics::LABEL_API_KEY => label
            )
            .increment(1);
            metrics::counter!(
                crate::metrics::CLIENT_BYTES_SENT_TOTAL,
                crate::metrics::LABEL_API_KEY => label
            )
            .increment(buf.len() as u64);
            metrics::gauge!(
                crate::metrics::CLIENT_REQUESTS_IN_FLIGHT,
                crate::metrics::LABEL_API_KEY => label
            )
            .increment(1.0);
            scopeguard::guard(label, |l| {
                metrics::gauge!(
                    crate::metrics::CLIENT_REQUESTS_IN_FLIGHT,
                    crate::metrics::LABEL_API_KEY => l
                )
                .decrement(1.0);
            })
        });

        let result = async {
            self.send_message(buf).await?;
            cleanup_on_cancel.message_sent();
            match rx.await {
                Ok(Ok(response)) => Ok(response),
                Ok(Err(e)) => Err(Error::from(e)),
                Err(e) => Err(Error::UnexpectedError {
                    message: "response channel closed before a response arrived".to_string(),
                    source: Some(Box::new(e)),
                }),
            }
        }
        .await;

        let response_bytes = match &result {
            Ok(response) => response.data.get_ref().len() as u64,
            Err(_) => 0,
        };
        drop(in_flight_guard);
        if let Some(label) = api_label {
            record_completion_metrics(label, response_bytes);
        }
        let mut response = result?;

        if let Some(error_response) = response.header.error_response {
            return Err(Error::KestrelAPIError {
                api_error: crate::rpc::ApiError::from(error_response),
            });
        }

        let body = R::ResponseBody::read_versioned(&mut response.data, R::REQUEST_VERSION)
            .map_err(RpcError::ReadMessageError)?;

        let read_bytes = response.data.position();
        let message_bytes = response.data.into_inner().len() as u64;
        if read_bytes != message_bytes {
            return Err(RpcError::TooMuchData {
                message_size: message_bytes,
                read: read_bytes,
                api_key: R::API_KEY,
                api_version: R::REQUEST_VERSION,
            }
            .into());
        }
        Ok(body)
    }

    async fn send_message(&self, msg: Vec<u8>) -> Result<(), RpcError> {
        match self.send_message_inner(msg).await {
            Ok(()) => Ok(()),
            Err(e) => {
                // framing might be out of sync now
                let mut state = self.state.lock();
                Err(RpcError::Poisoned(state.poison(e)))
            }
        }
    }

    async fn send_message_inner(&self, msg: Vec<u8>) -> Result<(), RpcError> {
        let mut stream_write = Arc::clone(&self.stream_write).lock_owned().await;

        // cancelling must not leave half a message on the wire
        let fut = CancellationSafeFuture::new(async move {
            stream_write.write_message(&msg).await?;
            stream_write.flush().await.map_err(WriteError::IO)?;
            Ok(())
        });

        fut.await
    }
}

impl<RW> Drop for ServerConnectionInner<RW> {
    fn drop(&mut self) {
        self.join_handle.abort();
    }
}

struct CancellationSafeFuture<F>
where
    F: Future + Send + 'static,
{
    /// `None` once the inner future completed. Boxed so it can be moved into a
    /// background task on drop.
    inner: Option<BoxFuture<'static, F::Output>>,
}

impl<F> CancellationSafeFuture<F>
where
    F: Future + Send + 'static,
{
    fn new(fut: F) -> Self {
        Self {
            inner: Some(Box::pin(fut)),
        }
    }
}

impl<F> Future for CancellationSafeFuture<F>
where
    F: Future + Send + 'static,
{
    type Output = F::Output;

    fn poll(
        mut self: std::pin::Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
    ) -> Poll<Self::Output> {
        let Some(inner) = self.inner.as_mut() else {
            return Poll::Pending;
        };

        match inner.as_mut().poll(cx) {
            Poll::Ready(res) => {
                self.inner = None;
                Poll::Ready(res)
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

impl<F> Drop for CancellationSafeFuture<F>
where
    F: Future + Send + 'static,
{
    fn drop(&mut self) {
        if let Some(fut) = self.inner.take() {
            if let Ok(handle) = tokio::runtime::Handle::try_current() {
                handle.spawn(async move {
                    let _ = fut.await;
                });
            } else {
                warn!("Tokio runtime not found during drop; background send cancelled.");
            }
        }
    }
}

/// Removes a registered request again when the caller is cancelled before the
/// request was sent.
struct CleanupRequestStateOnCancel {
    state: Arc<Mutex<ConnectionState>>,
    request_id: i32,
    message_sent: bool,
}

impl CleanupRequestStateOnCancel {
    /// Call [`message_sent`](Self::message_sent) once the request is on the wire.
    fn new(state: Arc<Mutex<ConnectionState>>, request_id: i32) -> Self {
        Self {
            state,
            request_id,
            message_sent: false,
        }
    }

    fn message_sent(mut self) {
        self.message_sent = true;
    }
}

impl Drop for CleanupRequestStateOnCancel {
    fn drop(&mut self) {
        if !self.message_sent {
            if let ConnectionState::RequestMap(map) = self.state.lock().deref_mut() {
                map.remove(&self.request_id);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::proto::ErrorResponse;
    use crate::rpc::ApiKey;
    use crate::rpc::frame::{ReadError, WriteError};
    use metrics_util::debugging::{DebugValue, DebuggingRecorder, Snapshotter};
    use prost::Message;
    use std::sync::OnceLock;
    use tokio::io::AsyncReadExt;

    struct TestWriteRequest;
    struct TestWriteResponse;

    impl RequestBody for TestWriteRequest {
        type ResponseBody = TestWriteResponse;
        const API_KEY: ApiKey = ApiKey::Write;
        const REQUEST_VERSION: ApiVersion = ApiVersion(0);
    }

    impl WriteVersionedType<Vec<u8>> for TestWriteRequest {
        fn write_versioned(&self, _w: &mut Vec<u8>, _v: ApiVersion) -> Result<(), WriteError> {
            Ok(())
        }
    }

    impl ReadVersionedType<Cursor<Vec<u8>>> for TestWriteResponse {
        fn read_versioned(_r: &mut Cursor<Vec<u8>>, _v: ApiVersion) -> Result<Self, ReadError> {
            Ok(TestWriteResponse)
        }
    }

    struct TestDdlRequest;

    impl RequestBody for TestDdlRequest {
        type ResponseBody = TestWriteResponse;
        const API_KEY: ApiKey = ApiKey::CreateTable;
        const REQUEST_VERSION: ApiVersion = ApiVersion(0);
    }

    impl WriteVersionedType<Vec<u8>> for TestDdlRequest {
        fn write_versioned(&self, _w: &mut Vec<u8>, _v: ApiVersion) -> Result<(), WriteError> {
            Ok(())
        }
    }

    /// Answers every request with an empty success response, or with an
    /// error response when `error` is set.
    async fn mock_server(mut stream: tokio::io::DuplexStream, error: Option<ErrorResponse>) {
        loop {
            let mut len_buf = [0u8; 4];
            if stream.read_exact(&mut len_buf).await.is_err() {
                return;
            }
            let len = i32::from_be_bytes(len_buf) as usize;

            let mut payload = vec![0u8; len];
            if stream.read_exact(&mut payload).await.is_err() {
                return;
            }

            // api_key(2) + api_version(2) + request_id(4)
            let request_id = i32::from_be_bytes([payload[4], payload[5], payload[6], payload[7]]);

            let mut resp = Vec::new();
            match &error {
                None => resp.push(0u8),
                Some(_) => resp.push(1u8),
            }
            resp.extend_from_slice(&request_id.to_be_bytes());
            if let Some(error) = &error {
                error.encode(&mut resp).expect("ErrorResponse encode");
            }

            let resp_len = (resp.len() as i32).to_be_bytes();
            if stream.write_all(&resp_len).await.is_err()
                || stream.write_all(&resp).await.is_err()
                || stream.flush().await.is_err()
            {
                return;
            }
        }
    }

    static TEST_SNAPSHOTTER: OnceLock<Snapshotter> = OnceLock::new();
    static TEST_LOCK: OnceLock<AsyncMutex<()>> = OnceLock::new();

    fn test_snapshotter() -> &'static Snapshotter {
        TEST_SNAPSHOTTER.get_or_init(|| {
            let recorder = DebuggingRecorder::new();
            let snapshotter = recorder.snapshotter();
            recorder
                .install()
                .expect("debugging recorder install should succeed in this test binary");
            snapshotter
        })
    }

    fn test_lock() -> &'static AsyncMutex<()> {
        TEST_LOCK.get_or_init(|| AsyncMutex::new(()))
    }

    fn counter(snapshotter: &Snapshotter, name: &str, label: &str) -> u64 {
        snapshotter
            .snapshot()
            .into_vec()
            .into_iter()
            .find_map(|(key, _, _, value)| {
                let has_label = key
                    .key()
                    .labels()
                    .any(|l| l.key() == crate::metrics::LABEL_API_KEY && l.value() == label);
                if key.key().name() != name || !has_label {
                    return None;
                }
                match value {
                    DebugValue::Counter(v) => Some(v),
                    _ => None,
                }
            })
            .unwrap_or(0)
    }

    fn in_flight(snapshotter: &Snapshotter, label: &str) -> f64 {
        snapshotter
            .snapshot()
            .into_vec()
            .into_iter()
            .find_map(|(key, _, _, value)| {
                let has_label = key
                    .key()
                    .labels()
                    .any(|l| l.key() == crate::metrics::LABEL_API_KEY && l.value() == label);
                if key.key().name() != crate::metrics::CLIENT_REQUESTS_IN_FLIGHT || !has_label {
                    return None;
                }
                match value {
                    DebugValue::Gauge(v) => Some(v.into_inner()),
                    _ => None,
                }
            })
            .unwrap_or(0.0)
    }

    #[tokio::test]
    async fn request_records_metrics_for_data_path_key() {
        let _test_guard = test_lock().lock().await;
        let snapshotter = test_snapshotter();

        let (client, server) = tokio::io::duplex(4096);
        tokio::spawn(mock_server(server, None));
        let conn = ServerConnectionInner::new(BufStream::new(client), usize::MAX);

        let requests_before = counter(snapshotter, crate::metrics::CLIENT_REQUESTS_TOTAL, "write");
        let responses_before =
            counter(snapshotter, crate::metrics::CLIENT_RESPONSES_TOTAL, "write");

        conn.request(TestWriteRequest).await.unwrap();
        conn.request(TestWriteRequest).await.unwrap();

        assert_eq!(
            counter(snapshotter, crate::metrics::CLIENT_REQUESTS_TOTAL, "write") - requests_before,
            2
        );
        assert_eq!(
            counter(snapshotter, crate::metrics::CLIENT_RESPONSES_TOTAL, "write")
                - responses_before,
            2
        );
        assert_eq!(in_flight(snapshotter, "write"), 0.0);
    }

    #[tokio::test]
    async fn request_skips_metrics_for_ddl_key() {
        let _test_guard = test_lock().lock().await;
        let snapshotter = test_snapshotter();

        let (client, server) = tokio::io::duplex(4096);
        tokio::spawn(mock_server(server, None));
        let conn = ServerConnectionInner::new(BufStream::new(client), usize::MAX);

        conn.request(TestDdlRequest).await.unwrap();

        let has_ddl_label = snapshotter.snapshot().into_vec().iter().any(|(key, _, _, _)| {
            key.key()
                .labels()
                .any(|l| l.key() == crate::metrics::LABEL_API_KEY && l.value() == "create_table")
        });
        assert!(!has_ddl_label, "ddl api keys must not appear in metrics");
    }

    #[tokio::test]
    async fn send_failure_poisons_connection() {
        let _test_guard = test_lock().lock().await;
        let snapshotter = test_snapshotter();

        let (client, server) = tokio::io::duplex(64);
        drop(server);
        let conn = ServerConnectionInner::new(BufStream::new(client), usize::MAX);

        let responses_before =
            counter(snapshotter, crate::metrics::CLIENT_RESPONSES_TOTAL, "write");
        let result = conn.request(TestWriteRequest).await;
        assert!(matches!(result, Err(Error::RpcError(RpcError::Poisoned(_)))));
        assert!(conn.is_poisoned());
        assert_eq!(
            counter(snapshotter, crate::metrics::CLIENT_RESPONSES_TOTAL, "write")
                - responses_before,
            1,
            "a failed request still counts as completed"
        );
        assert_eq!(in_flight(snapshotter, "write"), 0.0);

        let again = conn.request(TestWriteRequest).await;
        assert!(again.is_err());
    }

    #[tokio::test]
    async fn request_runs_on_spawned_task() {
        let _test_guard = test_lock().lock().await;

        let (client, server) = tokio::io::duplex(4096);
        tokio::spawn(mock_server(server, None));
        let conn = Arc::new(ServerConnectionInner::new(BufStream::new(client), usize::MAX));

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let conn = Arc::clone(&conn);
                tokio::spawn(async move { conn.request(TestWriteRequest).await })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }
        assert!(!conn.is_poisoned());
    }

    #[tokio::test]
    async fn error_response_becomes_api_error() {
        let _test_guard = test_lock().lock().await;

        let (client, server) = tokio::io::duplex(4096);
        tokio::spawn(mock_server(
            server,
            Some(ErrorResponse {
                error_code: crate::rpc::KestrelError::TableNotExist.code(),
                error_message: Some("table t does not exist".to_string()),
            }),
        ));
        let conn = ServerConnectionInner::new(BufStream::new(client), usize::MAX);

        let err = conn.request(TestWriteRequest).await.err().unwrap();
        match err {
            Error::KestrelAPIError { api_error } => {
                assert_eq!(api_error.code, 4);
                assert_eq!(api_error.message, "table t does not exist");
            }
            other => panic!("expected api error, got {other:?}"),
        }
        assert!(!conn.is_poisoned());
    }
}
