//! Request body encoders.
//!
//! Each encoder produces the complete body in memory together with the
//! `Content-Type` it implies. Nothing is written into [`RequestSettings`]
//! until encoding has fully succeeded, so a failed encode leaves the
//! previous body untouched.
//!
//! [`RequestSettings`]: crate::RequestSettings

use crate::error::HttpError;
use bytes::{BufMut, Bytes, BytesMut};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Fixed boundary used for every `multipart/form-data` body.
pub const MULTIPART_BOUNDARY: &str = "-----6fd9070b8b1b5ba49564b8fff7b7784ea0cdf096";

/// Field name used for multipart files that carry no explicit name.
pub const DEFAULT_FILE_FIELD: &str = "file";

pub const JSON_CONTENT_TYPE: &str = "application/json";
pub const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

const TEXT_PART_CONTENT_TYPE: &str = "text/plain; charset=utf-8";
const FILE_PART_CONTENT_TYPE: &str = "application/octet-stream";

/// A fully encoded request body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedBody {
    /// Body bytes exactly as they go on the wire
    pub bytes: Bytes,
    /// `Content-Type` implied by the encoding, if any
    pub content_type: Option<String>,
}

/// A file to upload as one part of a `multipart/form-data` body
///
/// The part's filename is the final component of `path`. The field name
/// defaults to [`DEFAULT_FILE_FIELD`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultipartFile {
    field: Option<String>,
    path: PathBuf,
}

impl MultipartFile {
    /// File uploaded under the default `file` field
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            field: None,
            path: path.into(),
        }
    }

    /// File uploaded under an explicit field name
    ///
    /// A blank field name causes the file to be skipped during encoding.
    pub fn named(field: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            field: Some(field.into()),
            path: path.into(),
        }
    }

    /// Path the file is read from
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Field name the file is sent under, `None` if it will be skipped
    #[must_use]
    pub fn field(&self) -> Option<&str> {
        match self.field.as_deref() {
            None => Some(DEFAULT_FILE_FIELD),
            Some(name) if name.trim().is_empty() => None,
            Some(name) => Some(name),
        }
    }

    fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// Encode text as UTF-8 with no implied content type
#[must_use]
pub fn encode_text(text: &str) -> EncodedBody {
    EncodedBody {
        bytes: Bytes::copy_from_slice(text.as_bytes()),
        content_type: None,
    }
}

/// Serialize a value as a JSON body
///
/// # Errors
/// Returns `HttpError::MissingParameter` when the value serializes to JSON `null`,
/// or `HttpError::Json` when serialization fails.
pub fn encode_json<T: Serialize + ?Sized>(value: &T) -> Result<EncodedBody, HttpError> {
    let bytes = serde_json::to_vec(value)?;
    if bytes == b"null" {
        return Err(HttpError::MissingParameter { name: "data" });
    }
    Ok(EncodedBody {
        bytes: Bytes::from(bytes),
        content_type: Some(JSON_CONTENT_TYPE.to_owned()),
    })
}

/// Encode pairs as `application/x-www-form-urlencoded`
///
/// Pair order and duplicate keys are preserved.
///
/// # Errors
/// Returns `HttpError::FormEncode` if encoding fails.
pub fn encode_form_url_encoded<I, K, V>(pairs: I) -> Result<EncodedBody, HttpError>
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    let owned: Vec<(K, V)> = pairs.into_iter().collect();
    let fields: Vec<(&str, &str)> = owned
        .iter()
        .map(|(key, value)| (key.as_ref(), value.as_ref()))
        .collect();
    let encoded = serde_urlencoded::to_string(&fields)?;
    Ok(EncodedBody {
        bytes: Bytes::from(encoded),
        content_type: Some(FORM_CONTENT_TYPE.to_owned()),
    })
}

/// Encode text fields and files as `multipart/form-data`
///
/// Text fields come first, in order, followed by the files in order. Files
/// are read synchronously; any read failure aborts the whole encode.
///
/// # Errors
/// Returns `HttpError::FileRead` if a file cannot be read.
pub fn encode_multipart<I, K, V>(
    pairs: I,
    files: &[MultipartFile],
) -> Result<EncodedBody, HttpError>
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    let mut body = BytesMut::new();

    for (key, value) in pairs {
        write_part_header(&mut body, key.as_ref(), None, TEXT_PART_CONTENT_TYPE);
        body.put_slice(value.as_ref().as_bytes());
        body.put_slice(b"\r\n");
    }

    for file in files {
        let Some(field) = file.field() else {
            tracing::debug!(path = %file.path.display(), "skipping multipart file with blank field name");
            continue;
        };
        let contents = std::fs::read(&file.path).map_err(|source| HttpError::FileRead {
            path: file.path.clone(),
            source,
        })?;
        write_part_header(
            &mut body,
            field,
            Some(&file.file_name()),
            FILE_PART_CONTENT_TYPE,
        );
        body.put_slice(&contents);
        body.put_slice(b"\r\n");
    }

    body.put_slice(format!("--{MULTIPART_BOUNDARY}--\r\n").as_bytes());

    Ok(EncodedBody {
        bytes: body.freeze(),
        content_type: Some(multipart_content_type()),
    })
}

/// `Content-Type` value for multipart bodies produced by [`encode_multipart`]
#[must_use]
pub fn multipart_content_type() -> String {
    format!("multipart/form-data; boundary={MULTIPART_BOUNDARY}")
}

fn write_part_header(body: &mut BytesMut, name: &str, file_name: Option<&str>, content_type: &str) {
    body.put_slice(format!("--{MULTIPART_BOUNDARY}\r\n").as_bytes());
    let disposition = match file_name {
        Some(file_name) => format!(
            "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
            escape_quoted(name),
            escape_quoted(file_name)
        ),
        None => format!(
            "Content-Disposition: form-data; name=\"{}\"\r\n",
            escape_quoted(name)
        ),
    };
    body.put_slice(disposition.as_bytes());
    body.put_slice(format!("Content-Type: {content_type}\r\n\r\n").as_bytes());
}

// Quoted-string values in Content-Disposition cannot carry raw quotes or line breaks.
fn escape_quoted(value: &str) -> String {
    value
        .replace('"', "%22")
        .replace('\r', "%0D")
        .replace('\n', "%0A")
}
