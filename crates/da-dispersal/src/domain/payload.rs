//! # Payload and Blob
//!
//! A payload is the caller's opaque data. A blob is the symbol-aligned form the
//! dispersal backend accepts:
//!
//! ```text
//! | header (32 bytes)                           | symbol 1 | ... | symbol N | zero symbols |
//! | 0x00 | version | u32 BE length | 0x00 * 26  | 0x00 + 31 payload bytes each            |
//! ```
//!
//! Every symbol starts with a zero guard byte so it is always a valid field
//! element. The total number of symbols is padded to a power of two.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Size of one field-element symbol.
pub const BYTES_PER_SYMBOL: usize = 32;

/// Payload bytes carried by one symbol (the rest is the guard byte).
pub const BYTES_PER_CHUNK: usize = BYTES_PER_SYMBOL - 1;

/// The encoded payload header occupies exactly one symbol.
pub const HEADER_BYTES_LEN: usize = BYTES_PER_SYMBOL;

/// Encoded payload layout version.
pub const ENCODING_VERSION: u8 = 0x00;

/// Errors raised while converting between payloads and blobs.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PayloadError {
    /// Empty payloads are never dispersed.
    #[error("Payload is empty")]
    Empty,

    /// Payload length does not fit the 4-byte length header.
    #[error("Payload of {0} bytes exceeds the encodable length")]
    TooLarge(usize),

    /// Blob would exceed the configured maximum size.
    #[error("Blob of {symbols} symbols exceeds maximum of {max} symbols")]
    BlobTooLarge { symbols: usize, max: usize },

    /// The built-in conversion only produces coefficient-form blobs.
    #[error("Polynomial form '{0}' requires an external IFFT-capable encoder")]
    UnsupportedForm(PolynomialForm),

    /// Raw blob bytes are not a power-of-two number of symbols.
    #[error("Blob length {0} is not a power-of-two number of 32-byte symbols")]
    InvalidBlobLength(usize),

    /// A symbol does not start with the zero guard byte.
    #[error("Invalid guard byte 0x{found:02x} at offset {offset}")]
    InvalidGuardByte { offset: usize, found: u8 },

    /// Header carries an unknown layout version.
    #[error("Unsupported encoding version {0}")]
    UnsupportedVersion(u8),

    /// Padding must be all zeros.
    #[error("Non-zero padding byte 0x{found:02x} at offset {offset}")]
    InvalidPadding { offset: usize, found: u8 },

    /// Header claims more payload than the blob holds.
    #[error("Blob of {actual} bytes is too small for a claimed payload of {claimed} bytes")]
    Truncated { claimed: usize, actual: usize },
}

/// How the payload bytes are interpreted as a polynomial.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PolynomialForm {
    /// Payload symbols are polynomial coefficients (no transform needed).
    #[default]
    Coeff,
    /// Payload symbols are evaluations and must be IFFT'd into coefficients.
    Eval,
}

impl PolynomialForm {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Coeff => "coeff",
            Self::Eval => "eval",
        }
    }
}

impl fmt::Display for PolynomialForm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PolynomialForm {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "coeff" | "coefficient" => Ok(Self::Coeff),
            "eval" | "evaluation" => Ok(Self::Eval),
            other => Err(format!("unknown polynomial form: {other}")),
        }
    }
}

/// Opaque caller data. Immutable once constructed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payload(Vec<u8>);

impl Payload {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.0
    }

    /// Convert into a blob. Pure and CPU-bound.
    pub fn to_blob(&self, form: PolynomialForm, max_symbols: usize) -> Result<Blob, PayloadError> {
        if self.0.is_empty() {
            return Err(PayloadError::Empty);
        }
        if form != PolynomialForm::Coeff {
            return Err(PayloadError::UnsupportedForm(form));
        }

        let len = u32::try_from(self.0.len()).map_err(|_| PayloadError::TooLarge(self.0.len()))?;
        let chunks = self.0.len().div_ceil(BYTES_PER_CHUNK);
        let symbols = (1 + chunks).next_power_of_two();
        if symbols > max_symbols {
            return Err(PayloadError::BlobTooLarge {
                symbols,
                max: max_symbols,
            });
        }

        let mut data = vec![0u8; symbols * BYTES_PER_SYMBOL];
        data[1] = ENCODING_VERSION;
        data[2..6].copy_from_slice(&len.to_be_bytes());

        for (i, chunk) in self.0.chunks(BYTES_PER_CHUNK).enumerate() {
            let start = HEADER_BYTES_LEN + i * BYTES_PER_SYMBOL + 1;
            data[start..start + chunk.len()].copy_from_slice(chunk);
        }

        Ok(Blob { data })
    }
}

impl From<Vec<u8>> for Payload {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl From<&[u8]> for Payload {
    fn from(bytes: &[u8]) -> Self {
        Self(bytes.to_vec())
    }
}

/// Encoded, chunkable representation of a payload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Blob {
    data: Vec<u8>,
}

impl Blob {
    /// Wrap raw blob bytes received from elsewhere.
    pub fn from_bytes(data: Vec<u8>) -> Result<Self, PayloadError> {
        let len = data.len();
        if len < HEADER_BYTES_LEN
            || len % BYTES_PER_SYMBOL != 0
            || !(len / BYTES_PER_SYMBOL).is_power_of_two()
        {
            return Err(PayloadError::InvalidBlobLength(len));
        }
        Ok(Self { data })
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Number of 32-byte symbols.
    pub fn len_symbols(&self) -> usize {
        self.data.len() / BYTES_PER_SYMBOL
    }

    /// Recover the payload, validating every guard and padding byte.
    pub fn to_payload(&self) -> Result<Payload, PayloadError> {
        let data = &self.data;
        let header = &data[..HEADER_BYTES_LEN];

        if header[0] != 0x00 {
            return Err(PayloadError::InvalidGuardByte {
                offset: 0,
                found: header[0],
            });
        }
        if header[1] != ENCODING_VERSION {
            return Err(PayloadError::UnsupportedVersion(header[1]));
        }
        if let Some((i, &found)) = header[6..].iter().enumerate().find(|(_, b)| **b != 0) {
            return Err(PayloadError::InvalidPadding {
                offset: 6 + i,
                found,
            });
        }

        let len = u32::from_be_bytes([header[2], header[3], header[4], header[5]]) as usize;
        let chunks = len.div_ceil(BYTES_PER_CHUNK);
        let end = HEADER_BYTES_LEN + chunks * BYTES_PER_SYMBOL;
        if end > data.len() {
            return Err(PayloadError::Truncated {
                claimed: len,
                actual: data.len(),
            });
        }

        let mut payload = Vec::with_capacity(chunks * BYTES_PER_CHUNK);
        for (idx, symbol) in data[HEADER_BYTES_LEN..end]
            .chunks_exact(BYTES_PER_SYMBOL)
            .enumerate()
        {
            if symbol[0] != 0x00 {
                return Err(PayloadError::InvalidGuardByte {
                    offset: HEADER_BYTES_LEN + idx * BYTES_PER_SYMBOL,
                    found: symbol[0],
                });
            }
            payload.extend_from_slice(&symbol[1..]);
        }

        if let Some((i, &found)) = data[end..].iter().enumerate().find(|(_, b)| **b != 0) {
            return Err(PayloadError::InvalidPadding {
                offset: end + i,
                found,
            });
        }

        // Padding inside the last chunk
        if let Some((j, &found)) = payload[len..].iter().enumerate().find(|(_, b)| **b != 0) {
            let pos = len + j;
            return Err(PayloadError::InvalidPadding {
                offset: HEADER_BYTES_LEN
                    + (pos / BYTES_PER_CHUNK) * BYTES_PER_SYMBOL
                    + pos % BYTES_PER_CHUNK
                    + 1,
                found,
            });
        }

        payload.truncate(len);
        Ok(Payload(payload))
    }
}
