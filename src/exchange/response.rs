use std::fmt;
use std::sync::atomic::{AtomicU16, AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::Value;

use super::params::HeaderVec;
use crate::error::{ContainerError, Result};
use crate::ids::ResponseId;

#[derive(Default)]
struct Body {
    buffer: Vec<u8>,
    output: Vec<u8>,
    committed: bool,
}

struct ResponseInner {
    id: ResponseId,
    status: AtomicU16,
    headers: Mutex<HeaderVec>,
    body: Mutex<Body>,
    resets: AtomicUsize,
    flushes: AtomicUsize,
}

/// Shared handle over a buffered response.
///
/// Writes land in the buffer. [`flush_buffer`](Self::flush_buffer) moves the
/// buffer to the committed output; after that the buffer can no longer be
/// reset.
#[derive(Clone)]
pub struct Response {
    inner: Arc<ResponseInner>,
}

impl Default for Response {
    fn default() -> Self {
        Self::new()
    }
}

impl Response {
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(ResponseInner {
                id: ResponseId::new(),
                status: AtomicU16::new(200),
                headers: Mutex::new(HeaderVec::new()),
                body: Mutex::new(Body::default()),
                resets: AtomicUsize::new(0),
                flushes: AtomicUsize::new(0),
            }),
        }
    }

    #[must_use]
    pub fn id(&self) -> ResponseId {
        self.inner.id
    }

    #[must_use]
    pub fn status(&self) -> u16 {
        self.inner.status.load(Ordering::Relaxed)
    }

    pub fn set_status(&self, status: u16) {
        self.inner.status.store(status, Ordering::Relaxed);
    }

    /// Replace every header named `name` (case-insensitive) with one value.
    pub fn set_header(&self, name: &str, value: impl Into<String>) {
        let mut headers = self.inner.headers.lock();
        headers.retain(|(k, _)| !k.eq_ignore_ascii_case(name));
        headers.push((Arc::from(name), value.into()));
    }

    pub fn add_header(&self, name: &str, value: impl Into<String>) {
        self.inner.headers.lock().push((Arc::from(name), value.into()));
    }

    #[must_use]
    pub fn header(&self, name: &str) -> Option<String> {
        self.inner
            .headers
            .lock()
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.clone())
    }

    #[must_use]
    pub fn headers(&self) -> Vec<(String, String)> {
        self.inner
            .headers
            .lock()
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    pub fn write(&self, bytes: &[u8]) {
        self.inner.body.lock().buffer.extend_from_slice(bytes);
    }

    pub fn write_str(&self, text: &str) {
        self.write(text.as_bytes());
    }

    /// Serialize `value` into the buffer and set a JSON content type.
    pub fn write_json(&self, value: &Value) -> Result<()> {
        let bytes = serde_json::to_vec(value).map_err(anyhow::Error::from)?;
        self.set_header("content-type", "application/json");
        self.write(&bytes);
        Ok(())
    }

    /// Discard uncommitted output.
    ///
    /// Fails with [`ContainerError::Committed`] once the response has been
    /// flushed.
    pub fn reset_buffer(&self) -> Result<()> {
        let mut body = self.inner.body.lock();
        if body.committed {
            return Err(ContainerError::Committed(self.inner.id.to_string()));
        }
        body.buffer.clear();
        self.inner.resets.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Move buffered bytes to the committed output.
    pub fn flush_buffer(&self) {
        let mut body = self.inner.body.lock();
        let Body {
            buffer,
            output,
            committed,
        } = &mut *body;
        output.append(buffer);
        *committed = true;
        self.inner.flushes.fetch_add(1, Ordering::Relaxed);
    }

    #[must_use]
    pub fn is_committed(&self) -> bool {
        self.inner.body.lock().committed
    }

    /// Bytes written since the last flush or reset.
    #[must_use]
    pub fn buffered(&self) -> Vec<u8> {
        self.inner.body.lock().buffer.clone()
    }

    /// Committed output followed by anything still buffered.
    #[must_use]
    pub fn body(&self) -> Vec<u8> {
        let body = self.inner.body.lock();
        let mut all = body.output.clone();
        all.extend_from_slice(&body.buffer);
        all
    }

    #[must_use]
    pub fn body_string(&self) -> String {
        String::from_utf8_lossy(&self.body()).into_owned()
    }

    /// Number of successful [`reset_buffer`](Self::reset_buffer) calls.
    #[must_use]
    pub fn reset_count(&self) -> usize {
        self.inner.resets.load(Ordering::Relaxed)
    }

    /// Number of [`flush_buffer`](Self::flush_buffer) calls.
    #[must_use]
    pub fn flush_count(&self) -> usize {
        self.inner.flushes.load(Ordering::Relaxed)
    }

    /// True when both handles point at the same response.
    #[must_use]
    pub fn same(&self, other: &Response) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl PartialEq for Response {
    fn eq(&self, other: &Self) -> bool {
        self.same(other)
    }
}

impl Eq for Response {}

impl fmt::Debug for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Response")
            .field("id", &self.inner.id)
            .field("status", &self.status())
            .field("committed", &self.is_committed())
            .finish()
    }
}
