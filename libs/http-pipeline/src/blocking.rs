//! Synchronous facade over [`HttpPipeline`].
//!
//! [`BlockingHttpPipeline`] owns a dedicated current-thread tokio runtime and
//! drives every call to completion with `block_on`.
//!
//! Blocking on async work from inside an async executor can deadlock the
//! executor (the blocked worker may be the one the I/O needs) or panic
//! inside tokio. Every method therefore checks for an ambient runtime first
//! and returns [`HttpError::BlockingInAsyncContext`] instead. In async code
//! use [`HttpPipeline`] directly.

use crate::client::HttpPipeline;
use crate::error::HttpError;
use crate::request::TransportRequest;
use crate::response::HttpResponse;
use crate::settings::RequestSettings;
use bytes::Bytes;
use http::Method;
use std::future::Future;
use tokio::runtime::{Builder, Handle, Runtime};

/// Blocking HTTP pipeline for synchronous callers
///
/// Mirrors the verbs of [`HttpPipeline`]. Not for use inside a tokio runtime.
pub struct BlockingHttpPipeline {
    pipeline: HttpPipeline,
    runtime: Runtime,
}

impl BlockingHttpPipeline {
    /// Wrap `pipeline` with a fresh current-thread runtime
    ///
    /// # Errors
    /// Returns `HttpError::Runtime` if the runtime cannot be created.
    pub fn new(pipeline: HttpPipeline) -> Result<Self, HttpError> {
        let runtime = Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(HttpError::Runtime)?;
        Ok(Self { pipeline, runtime })
    }

    /// The wrapped async pipeline
    #[must_use]
    pub fn pipeline(&self) -> &HttpPipeline {
        &self.pipeline
    }

    fn block_on<F, T>(&self, future: F) -> Result<T, HttpError>
    where
        F: Future<Output = Result<T, HttpError>>,
    {
        if Handle::try_current().is_ok() {
            return Err(HttpError::BlockingInAsyncContext);
        }
        self.runtime.block_on(future)
    }

    /// Blocking [`HttpPipeline::execute`]
    ///
    /// # Errors
    /// `HttpError::BlockingInAsyncContext` inside a runtime, otherwise as the async call.
    pub fn execute(
        &self,
        method: Method,
        address: &str,
        settings: &RequestSettings,
    ) -> Result<HttpResponse, HttpError> {
        self.block_on(self.pipeline.execute(method, address, settings))
    }

    /// Blocking [`HttpPipeline::send_request`]
    ///
    /// # Errors
    /// `HttpError::BlockingInAsyncContext` inside a runtime, otherwise as the async call.
    pub fn send_request(&self, request: TransportRequest) -> Result<HttpResponse, HttpError> {
        self.block_on(self.pipeline.send_request(request))
    }

    /// Blocking [`HttpPipeline::get_as_bytes`]
    ///
    /// # Errors
    /// `HttpError::BlockingInAsyncContext` inside a runtime, otherwise as the async call.
    pub fn get_as_bytes(
        &self,
        address: &str,
        settings: &RequestSettings,
    ) -> Result<Bytes, HttpError> {
        self.block_on(self.pipeline.get_as_bytes(address, settings))
    }

    /// Blocking [`HttpPipeline::get`]
    ///
    /// # Errors
    /// `HttpError::BlockingInAsyncContext` inside a runtime, otherwise as the async call.
    pub fn get(&self, address: &str, settings: &RequestSettings) -> Result<String, HttpError> {
        self.block_on(self.pipeline.get(address, settings))
    }

    /// Blocking [`HttpPipeline::get_with`]
    ///
    /// # Errors
    /// `HttpError::BlockingInAsyncContext` inside a runtime, otherwise as the async call.
    pub fn get_with<F>(&self, address: &str, configure: F) -> Result<String, HttpError>
    where
        F: FnOnce(&mut RequestSettings) -> Result<(), HttpError>,
    {
        self.block_on(self.pipeline.get_with(address, configure))
    }

    /// Blocking [`HttpPipeline::post_as_bytes`]
    ///
    /// # Errors
    /// `HttpError::BlockingInAsyncContext` inside a runtime, otherwise as the async call.
    pub fn post_as_bytes(
        &self,
        address: &str,
        settings: &RequestSettings,
    ) -> Result<Bytes, HttpError> {
        self.block_on(self.pipeline.post_as_bytes(address, settings))
    }

    /// Blocking [`HttpPipeline::post`]
    ///
    /// # Errors
    /// `HttpError::BlockingInAsyncContext` inside a runtime, otherwise as the async call.
    pub fn post(&self, address: &str, settings: &RequestSettings) -> Result<String, HttpError> {
        self.block_on(self.pipeline.post(address, settings))
    }

    /// Blocking [`HttpPipeline::post_with`]
    ///
    /// # Errors
    /// `HttpError::BlockingInAsyncContext` inside a runtime, otherwise as the async call.
    pub fn post_with<F>(&self, address: &str, configure: F) -> Result<String, HttpError>
    where
        F: FnOnce(&mut RequestSettings) -> Result<(), HttpError>,
    {
        self.block_on(self.pipeline.post_with(address, configure))
    }

    /// Blocking [`HttpPipeline::put_as_bytes`]
    ///
    /// # Errors
    /// `HttpError::BlockingInAsyncContext` inside a runtime, otherwise as the async call.
    pub fn put_as_bytes(
        &self,
        address: &str,
        settings: &RequestSettings,
    ) -> Result<Bytes, HttpError> {
        self.block_on(self.pipeline.put_as_bytes(address, settings))
    }

    /// Blocking [`HttpPipeline::put`]
    ///
    /// # Errors
    /// `HttpError::BlockingInAsyncContext` inside a runtime, otherwise as the async call.
    pub fn put(&self, address: &str, settings: &RequestSettings) -> Result<String, HttpError> {
        self.block_on(self.pipeline.put(address, settings))
    }

    /// Blocking [`HttpPipeline::put_with`]
    ///
    /// # Errors
    /// `HttpError::BlockingInAsyncContext` inside a runtime, otherwise as the async call.
    pub fn put_with<F>(&self, address: &str, configure: F) -> Result<String, HttpError>
    where
        F: FnOnce(&mut RequestSettings) -> Result<(), HttpError>,
    {
        self.block_on(self.pipeline.put_with(address, configure))
    }

    /// Blocking [`HttpPipeline::patch_as_bytes`]
    ///
    /// # Errors
    /// `HttpError::BlockingInAsyncContext` inside a runtime, otherwise as the async call.
    pub fn patch_as_bytes(
        &self,
        address: &str,
        settings: &RequestSettings,
    ) -> Result<Bytes, HttpError> {
        self.block_on(self.pipeline.patch_as_bytes(address, settings))
    }

    /// Blocking [`HttpPipeline::patch`]
    ///
    /// # Errors
    /// `HttpError::BlockingInAsyncContext` inside a runtime, otherwise as the async call.
    pub fn patch(&self, address: &str, settings: &RequestSettings) -> Result<String, HttpError> {
        self.block_on(self.pipeline.patch(address, settings))
    }

    /// Blocking [`HttpPipeline::patch_with`]
    ///
    /// # Errors
    /// `HttpError::BlockingInAsyncContext` inside a runtime, otherwise as the async call.
    pub fn patch_with<F>(&self, address: &str, configure: F) -> Result<String, HttpError>
    where
        F: FnOnce(&mut RequestSettings) -> Result<(), HttpError>,
    {
        self.block_on(self.pipeline.patch_with(address, configure))
    }

    /// Blocking [`HttpPipeline::delete`]
    ///
    /// # Errors
    /// `HttpError::BlockingInAsyncContext` inside a runtime, otherwise as the async call.
    pub fn delete(&self, address: &str, settings: &RequestSettings) -> Result<(), HttpError> {
        self.block_on(self.pipeline.delete(address, settings))
    }

    /// Blocking [`HttpPipeline::delete_with`]
    ///
    /// # Errors
    /// `HttpError::BlockingInAsyncContext` inside a runtime, otherwise as the async call.
    pub fn delete_with<F>(&self, address: &str, configure: F) -> Result<(), HttpError>
    where
        F: FnOnce(&mut RequestSettings) -> Result<(), HttpError>,
    {
        self.block_on(self.pipeline.delete_with(address, configure))
    }

    /// Blocking [`HttpPipeline::send_as_bytes`]
    ///
    /// # Errors
    /// `HttpError::BlockingInAsyncContext` inside a runtime, otherwise as the async call.
    pub fn send_as_bytes(
        &self,
        address: &str,
        method: &str,
        settings: &RequestSettings,
    ) -> Result<Bytes, HttpError> {
        self.block_on(self.pipeline.send_as_bytes(address, method, settings))
    }

    /// Blocking [`HttpPipeline::send`]
    ///
    /// # Errors
    /// `HttpError::BlockingInAsyncContext` inside a runtime, otherwise as the async call.
    pub fn send(
        &self,
        address: &str,
        method: &str,
        settings: &RequestSettings,
    ) -> Result<String, HttpError> {
        self.block_on(self.pipeline.send(address, method, settings))
    }

    /// Blocking [`HttpPipeline::send_with`]
    ///
    /// # Errors
    /// `HttpError::BlockingInAsyncContext` inside a runtime, otherwise as the async call.
    pub fn send_with<F>(
        &self,
        address: &str,
        method: &str,
        configure: F,
    ) -> Result<String, HttpError>
    where
        F: FnOnce(&mut RequestSettings) -> Result<(), HttpError>,
    {
        self.block_on(self.pipeline.send_with(address, method, configure))
    }
}
