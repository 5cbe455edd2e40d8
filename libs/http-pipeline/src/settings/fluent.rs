use super::{ClientCertificate, RequestSettings};
use crate::body::{self, EncodedBody, MultipartFile};
use crate::error::HttpError;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use bytes::Bytes;
use serde::Serialize;
use std::time::Duration;

/// Fail with `MissingParameter` when `value` is empty or whitespace-only.
fn require(value: &str, name: &'static str) -> Result<(), HttpError> {
    if value.trim().is_empty() {
        return Err(HttpError::MissingParameter { name });
    }
    Ok(())
}

/// Validated, chainable mutators
///
/// Every mutator checks its arguments before touching the settings, so a
/// failed call leaves them exactly as they were. Calls chain with `?`:
///
/// ```rust,ignore
/// let mut settings = RequestSettings::new();
/// settings
///     .set_accept("application/json")?
///     .append_cookie("session", "abc")?
///     .set_timeout(Duration::from_secs(5))?;
/// ```
impl RequestSettings {
    /// Set a header, replacing any existing value with the same name
    ///
    /// # Errors
    /// Returns `HttpError::MissingParameter` if `name` or `value` is blank.
    pub fn append_header(&mut self, name: &str, value: &str) -> Result<&mut Self, HttpError> {
        require(name, "name")?;
        require(value, "value")?;
        self.headers.insert(name, value);
        Ok(self)
    }

    /// Set a cookie, replacing any existing cookie with the same name
    ///
    /// # Errors
    /// Returns `HttpError::MissingParameter` if `name` or `value` is blank.
    pub fn append_cookie(&mut self, name: &str, value: &str) -> Result<&mut Self, HttpError> {
        require(name, "name")?;
        require(value, "value")?;
        self.cookies.insert(name, value);
        Ok(self)
    }

    /// Set `Authorization: {scheme} {parameter}`
    ///
    /// # Errors
    /// Returns `HttpError::MissingParameter` if `scheme` or `parameter` is blank.
    pub fn set_authorization(
        &mut self,
        scheme: &str,
        parameter: &str,
    ) -> Result<&mut Self, HttpError> {
        require(scheme, "scheme")?;
        require(parameter, "parameter")?;
        self.append_header("Authorization", &format!("{scheme} {parameter}"))
    }

    /// Set basic authorization from a user name and password
    ///
    /// # Errors
    /// Returns `HttpError::MissingParameter` if `user_name` or `password` is blank.
    pub fn use_basic_authorization(
        &mut self,
        user_name: &str,
        password: &str,
    ) -> Result<&mut Self, HttpError> {
        require(user_name, "user_name")?;
        require(password, "password")?;
        let credentials = STANDARD.encode(format!("{user_name}:{password}"));
        self.set_authorization("Basic", &credentials)
    }

    /// Set bearer authorization
    ///
    /// # Errors
    /// Returns `HttpError::MissingParameter` if `token` is blank.
    pub fn use_bearer_authorization(&mut self, token: &str) -> Result<&mut Self, HttpError> {
        require(token, "token")?;
        self.set_authorization("Bearer", token)
    }

    /// Set the `Content-Type` header
    ///
    /// # Errors
    /// Returns `HttpError::MissingParameter` if `content_type` is blank.
    pub fn set_content_type(&mut self, content_type: &str) -> Result<&mut Self, HttpError> {
        require(content_type, "content_type")?;
        self.append_header("Content-Type", content_type)
    }

    /// Set the `Accept` header
    ///
    /// # Errors
    /// Returns `HttpError::MissingParameter` if `accept` is blank.
    pub fn set_accept(&mut self, accept: &str) -> Result<&mut Self, HttpError> {
        require(accept, "accept")?;
        self.append_header("Accept", accept)
    }

    /// Set the `Accept-Language` header
    ///
    /// # Errors
    /// Returns `HttpError::MissingParameter` if `accept_language` is blank.
    pub fn set_accept_language(&mut self, accept_language: &str) -> Result<&mut Self, HttpError> {
        require(accept_language, "accept_language")?;
        self.append_header("Accept-Language", accept_language)
    }

    /// Set the `Origin` header
    ///
    /// # Errors
    /// Returns `HttpError::MissingParameter` if `url` is blank.
    pub fn set_origin(&mut self, url: &str) -> Result<&mut Self, HttpError> {
        require(url, "url")?;
        self.append_header("Origin", url)
    }

    /// Set the `Referer` header
    ///
    /// # Errors
    /// Returns `HttpError::MissingParameter` if `url` is blank.
    pub fn set_referer(&mut self, url: &str) -> Result<&mut Self, HttpError> {
        require(url, "url")?;
        self.append_header("Referer", url)
    }

    /// Set `Cache-Control: no-store`
    ///
    /// # Errors
    /// Never fails; returns `Result` for uniform chaining.
    pub fn set_no_cache(&mut self) -> Result<&mut Self, HttpError> {
        self.append_header("Cache-Control", "no-store")
    }

    /// Set the body to the UTF-8 bytes of `request_body`
    ///
    /// Does not touch `Content-Type`.
    ///
    /// # Errors
    /// Returns `HttpError::MissingParameter` if `request_body` is blank.
    pub fn set_request_body(&mut self, request_body: &str) -> Result<&mut Self, HttpError> {
        require(request_body, "request_body")?;
        Ok(self.apply_body(body::encode_text(request_body)))
    }

    /// Set the body to raw bytes
    ///
    /// Does not touch `Content-Type`. An empty buffer is accepted; verbs that
    /// only attach non-empty bodies will then send none.
    ///
    /// # Errors
    /// Never fails; returns `Result` for uniform chaining.
    pub fn set_request_body_bytes(
        &mut self,
        bytes: impl Into<Bytes>,
    ) -> Result<&mut Self, HttpError> {
        self.request_body = Some(bytes.into());
        Ok(self)
    }

    /// Serialize `data` as JSON and set `Content-Type: application/json`
    ///
    /// # Errors
    /// Returns `HttpError::MissingParameter` if `data` serializes to `null`,
    /// or `HttpError::Json` if serialization fails.
    pub fn set_json_request_body<T: Serialize + ?Sized>(
        &mut self,
        data: &T,
    ) -> Result<&mut Self, HttpError> {
        let encoded = body::encode_json(data)?;
        Ok(self.apply_body(encoded))
    }

    /// Encode pairs as a URL-encoded form and set the matching `Content-Type`
    ///
    /// Order and duplicate keys are preserved.
    ///
    /// # Errors
    /// Returns `HttpError::FormEncode` if encoding fails.
    pub fn set_form_url_encoded_request_body<I, K, V>(
        &mut self,
        data: I,
    ) -> Result<&mut Self, HttpError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let encoded = body::encode_form_url_encoded(data)?;
        Ok(self.apply_body(encoded))
    }

    /// Encode text fields and files as `multipart/form-data`
    ///
    /// # Errors
    /// Returns `HttpError::FileRead` if any file cannot be read. The previous
    /// body and `Content-Type` are kept in that case.
    pub fn set_multipart_form_data_request_body<I, K, V>(
        &mut self,
        data: I,
        files: &[MultipartFile],
    ) -> Result<&mut Self, HttpError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let encoded = body::encode_multipart(data, files)?;
        Ok(self.apply_body(encoded))
    }

    /// Check the response status after the exchange
    ///
    /// With `throw_on_failure`, a non-2xx status fails the call with
    /// `HttpError::HttpStatus`; without it the failure is only logged.
    ///
    /// # Errors
    /// Never fails; returns `Result` for uniform chaining.
    pub fn ensure_success_status_code(
        &mut self,
        throw_on_failure: bool,
    ) -> Result<&mut Self, HttpError> {
        self.ensure_success_status_code = true;
        self.throw_on_non_success_status_code = throw_on_failure;
        Ok(self)
    }

    /// Append certificates presented for mutual TLS
    ///
    /// # Errors
    /// Never fails; returns `Result` for uniform chaining.
    pub fn use_client_certificates<I>(&mut self, certificates: I) -> Result<&mut Self, HttpError>
    where
        I: IntoIterator<Item = ClientCertificate>,
    {
        self.client_certificates.extend(certificates);
        Ok(self)
    }

    /// Ask the transport to authenticate with ambient credentials
    ///
    /// # Errors
    /// Never fails; returns `Result` for uniform chaining.
    pub fn use_default_credentials(&mut self, enabled: bool) -> Result<&mut Self, HttpError> {
        self.use_default_credentials = enabled;
        Ok(self)
    }

    /// Set the exchange timeout
    ///
    /// # Errors
    /// Never fails; returns `Result` for uniform chaining.
    pub fn set_timeout(&mut self, timeout: Duration) -> Result<&mut Self, HttpError> {
        self.timeout = Some(timeout);
        Ok(self)
    }

    /// Skip the request/response diagnostic events
    ///
    /// # Errors
    /// Never fails; returns `Result` for uniform chaining.
    pub fn suppress_logging(&mut self) -> Result<&mut Self, HttpError> {
        self.suppress_request_response_logging = true;
        Ok(self)
    }

    fn apply_body(&mut self, encoded: EncodedBody) -> &mut Self {
        if let Some(content_type) = encoded.content_type {
            self.headers.insert("Content-Type", content_type);
        }
        self.request_body = Some(encoded.bytes);
        self
    }
}
