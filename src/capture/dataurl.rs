//! RFC 2397 data URLs, the encoding used for images crossing the message
//! boundary (`captureTab` replies, `openEditor`, the editor `image` parameter).

use std::fmt;
use std::str::FromStr;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DataUrlError {
    #[error("missing 'data:' scheme")]
    MissingScheme,

    #[error("missing ',' separator")]
    MissingPayload,

    #[error("only base64 data URLs are supported")]
    NotBase64,

    #[error("invalid base64 payload: {0}")]
    Base64(String),
}

/// A decoded data URL: media type plus raw payload bytes.
#[derive(Clone, PartialEq, Eq)]
pub struct DataUrl {
    mime: String,
    data: Vec<u8>,
}

impl DataUrl {
    pub fn new(mime: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            mime: mime.into(),
            data,
        }
    }

    pub fn png(data: Vec<u8>) -> Self {
        Self::new("image/png", data)
    }

    pub fn mime(&self) -> &str {
        &self.mime
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn into_data(self) -> Vec<u8> {
        self.data
    }
}

impl FromStr for DataUrl {
    type Err = DataUrlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let rest = s
            .trim()
            .strip_prefix("data:")
            .ok_or(DataUrlError::MissingScheme)?;
        let (meta, payload) = rest.split_once(',').ok_or(DataUrlError::MissingPayload)?;
        let mime = meta.strip_suffix(";base64").ok_or(DataUrlError::NotBase64)?;
        let mime = if mime.is_empty() {
            "text/plain"
        } else {
            mime
        };

        let data = STANDARD
            .decode(payload)
            .map_err(|e| DataUrlError::Base64(e.to_string()))?;

        Ok(Self::new(mime, data))
    }
}

impl fmt::Display for DataUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "data:{};base64,{}", self.mime, STANDARD.encode(&self.data))
    }
}

impl fmt::Debug for DataUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataUrl")
            .field("mime", &self.mime)
            .field("bytes", &self.data.len())
            .finish()
    }
}
