//! Lossless-first decoding of engine output.
//!
//! The engine writes whatever its console code page produces: UTF-8 on most
//! systems, GBK when built for a Chinese Windows locale. [`TextDecoder`] tries
//! an ordered chain of strict decoders and falls back to lossy UTF-8, so no
//! byte sequence can abort the pipeline.
//!
//! # Example
//!
//! ```
//! use trivialdb_shell_core::decode::decode_output;
//!
//! assert_eq!(decode_output(b"3 rows\n"), "3 rows\n");
//! assert_eq!(decode_output(b""), "");
//! // Invalid in UTF-8 and GBK, still decodes.
//! assert!(decode_output(&[0xff, 0xff, b'x']).ends_with('x'));
//! ```

use encoding_rs::{Encoding, GBK, UTF_8};
use tracing::debug;

use crate::error::{CoreError, Result};

/// Secondary encodings tried after UTF-8 when none are configured.
pub const DEFAULT_FALLBACK_LABELS: &[&str] = &["gbk"];

/// Ordered strict-decoder chain with a lossy UTF-8 tail.
#[derive(Debug, Clone)]
pub struct TextDecoder {
    chain: Vec<&'static Encoding>,
}

impl Default for TextDecoder {
    fn default() -> Self {
        Self {
            chain: vec![UTF_8, GBK],
        }
    }
}

impl TextDecoder {
    /// Builds a decoder that tries UTF-8 first, then each label in order.
    ///
    /// Labels follow the WHATWG encoding standard (`"gbk"`, `"shift_jis"`,
    /// `"windows-1252"`, ...). Duplicates are dropped.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::UnknownEncoding`] for an unrecognized label.
    pub fn with_fallbacks<S: AsRef<str>>(labels: &[S]) -> Result<Self> {
        let mut chain = vec![UTF_8];
        for label in labels {
            let label = label.as_ref();
            let encoding = Encoding::for_label(label.trim().as_bytes())
                .ok_or_else(|| CoreError::UnknownEncoding(label.to_string()))?;
            if !chain.contains(&encoding) {
                chain.push(encoding);
            }
        }
        Ok(Self { chain })
    }

    /// Names of the strict decoders, in the order they are attempted.
    pub fn encoding_names(&self) -> Vec<&'static str> {
        self.chain.iter().map(|encoding| encoding.name()).collect()
    }

    /// Decodes `bytes`, never failing.
    pub fn decode(&self, bytes: &[u8]) -> String {
        if bytes.is_empty() {
            return String::new();
        }
        for encoding in &self.chain {
            if let Some(text) = encoding.decode_without_bom_handling_and_without_replacement(bytes)
            {
                if *encoding != UTF_8 {
                    debug!(encoding = encoding.name(), "decoded output with fallback encoding");
                }
                return text.into_owned();
            }
        }
        debug!(len = bytes.len(), "no strict decoder accepted output, using lossy utf-8");
        String::from_utf8_lossy(bytes).into_owned()
    }
}

/// Decodes `bytes` with the default chain (UTF-8, GBK, lossy UTF-8).
pub fn decode_output(bytes: &[u8]) -> String {
    TextDecoder::default().decode(bytes)
}
