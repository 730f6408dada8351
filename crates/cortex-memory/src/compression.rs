// SPDX-FileCopyrightText: 2026 Cortex Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Size-adaptive compression of context payloads before persistence.
//!
//! The engine chooses a [`CompressionLevel`] from the serialized size of the
//! context data and hands the actual encoding to a [`Codec`]. Swapping the
//! codec never changes level selection.

use std::io::{Read, Write};
use std::sync::Arc;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use cortex_config::model::CompressionConfig;
use cortex_core::{
    CompressionLevel, Context, ContextData, ContextMetadata, ContextPayload, CortexError,
    StoredContext,
};
use flate2::Compression;
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use tracing::{debug, warn};

/// A reversible string codec parameterized by compression level.
///
/// `decode(encode(s, level), level) == s` must hold for every level.
/// [`CompressionLevel::Uncompressed`] never reaches a codec.
pub trait Codec: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    fn encode(&self, input: &str, level: CompressionLevel) -> Result<String, CortexError>;

    fn decode(&self, input: &str, level: CompressionLevel) -> Result<String, CortexError>;
}

/// zlib-framed DEFLATE, base64-armoured so the output is a JSON-safe string.
///
/// Levels 1-3 map to fast, default, and best compression.
#[derive(Debug, Default, Clone, Copy)]
pub struct DeflateCodec;

impl DeflateCodec {
    fn flate_level(level: CompressionLevel) -> Compression {
        match level {
            CompressionLevel::Uncompressed => Compression::none(),
            CompressionLevel::Light => Compression::fast(),
            CompressionLevel::Medium => Compression::default(),
            CompressionLevel::Heavy => Compression::best(),
        }
    }
}

fn codec_err(err: impl std::fmt::Display) -> CortexError {
    CortexError::Codec {
        message: err.to_string(),
    }
}

impl Codec for DeflateCodec {
    fn name(&self) -> &str {
        "deflate"
    }

    fn encode(&self, input: &str, level: CompressionLevel) -> Result<String, CortexError> {
        let mut encoder = ZlibEncoder::new(Vec::new(), Self::flate_level(level));
        encoder.write_all(input.as_bytes()).map_err(codec_err)?;
        let bytes = encoder.finish().map_err(codec_err)?;
        Ok(STANDARD.encode(bytes))
    }

    fn decode(&self, input: &str, _level: CompressionLevel) -> Result<String, CortexError> {
        let bytes = STANDARD.decode(input.trim()).map_err(codec_err)?;
        let mut decoded = String::new();
        ZlibDecoder::new(bytes.as_slice())
            .read_to_string(&mut decoded)
            .map_err(codec_err)?;
        Ok(decoded)
    }
}

/// Chooses a compression level by payload size and applies it.
#[derive(Clone)]
pub struct CompressionEngine {
    thresholds: CompressionConfig,
    codec: Arc<dyn Codec>,
}

impl std::fmt::Debug for CompressionEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompressionEngine")
            .field("thresholds", &self.thresholds)
            .field("codec", &self.codec.name())
            .finish()
    }
}

impl CompressionEngine {
    /// Creates an engine using [`DeflateCodec`].
    pub fn new(thresholds: &CompressionConfig) -> Self {
        Self::with_codec(thresholds, Arc::new(DeflateCodec))
    }

    pub fn with_codec(thresholds: &CompressionConfig, codec: Arc<dyn Codec>) -> Self {
        Self {
            thresholds: thresholds.clone(),
            codec,
        }
    }

    /// Level selected for a payload of `size` bytes.
    pub fn level_for_size(&self, size: usize) -> CompressionLevel {
        let t = &self.thresholds;
        if size < t.min_size {
            CompressionLevel::Uncompressed
        } else if size < t.level2_size {
            CompressionLevel::Light
        } else if size < t.level3_size {
            CompressionLevel::Medium
        } else {
            CompressionLevel::Heavy
        }
    }

    /// Encodes `data` at exactly `level`, without size-based fallback.
    ///
    /// Level 0 yields the plain JSON text.
    pub fn compress(&self, data: &ContextData, level: CompressionLevel) -> Result<String, CortexError> {
        let json = serde_json::to_string(data)?;
        if !level.is_compressed() {
            return Ok(json);
        }
        self.codec.encode(&json, level)
    }

    /// Inverse of [`compress`](Self::compress).
    ///
    /// Malformed input yields empty data and a warning, never an error.
    pub fn decompress(&self, encoded: &str, level: CompressionLevel) -> ContextData {
        let json = if level.is_compressed() {
            match self.codec.decode(encoded, level) {
                Ok(json) => json,
                Err(e) => {
                    warn!(codec = self.codec.name(), %level, error = %e, "failed to decode context payload, using empty data");
                    return ContextData::default();
                }
            }
        } else {
            encoded.to_string()
        };

        match serde_json::from_str(&json) {
            Ok(data) => data,
            Err(e) => {
                warn!(%level, error = %e, "decoded context payload is not valid context data, using empty data");
                ContextData::default()
            }
        }
    }

    /// Produces the persisted form of `context`, compressing its data when it
    /// is large enough and the encoding actually shrinks it.
    pub fn compress_if_needed(&self, context: &Context) -> Result<StoredContext, CortexError> {
        let json = serde_json::to_string(&context.data)?;
        let original_size = json.len();
        let level = self.level_for_size(original_size);

        let encoded = if level.is_compressed() {
            match self.codec.encode(&json, level) {
                Ok(encoded) if encoded.len() < original_size => Some(encoded),
                Ok(encoded) => {
                    debug!(
                        %level,
                        original_size,
                        encoded_size = encoded.len(),
                        "compression did not shrink payload, storing uncompressed"
                    );
                    None
                }
                Err(e) => {
                    warn!(codec = self.codec.name(), %level, error = %e, "compression failed, storing uncompressed");
                    None
                }
            }
        } else {
            None
        };

        let (payload, compression_level, compressed_size) = match encoded {
            Some(encoded) => {
                let size = encoded.len();
                metrics::histogram!("cortex_compression_ratio")
                    .record(size as f64 / original_size as f64);
                (ContextPayload::Encoded(encoded), level, size)
            }
            None => (
                ContextPayload::Plain(context.data.clone()),
                CompressionLevel::Uncompressed,
                original_size,
            ),
        };

        Ok(StoredContext {
            id: context.id.clone(),
            session_id: context.session_id.clone(),
            created: context.created,
            last_updated: context.last_updated,
            data: payload,
            metadata: ContextMetadata {
                compression_level,
                original_size,
                compressed_size,
                summary: context.metadata.summary.clone(),
            },
        })
    }

    /// Decodes a persisted context back into its in-memory form.
    pub fn restore(&self, stored: StoredContext) -> Context {
        let level = stored.metadata.compression_level;
        let data = match stored.data {
            ContextPayload::Plain(data) => data,
            ContextPayload::Encoded(blob) => self.decompress(&blob, level),
        };
        Context {
            id: stored.id,
            session_id: stored.session_id,
            created: stored.created,
            last_updated: stored.last_updated,
            data,
            metadata: stored.metadata,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cortex_core::{Interaction, Request, Response};
    use proptest::prelude::*;

    fn engine() -> CompressionEngine {
        CompressionEngine::new(&CompressionConfig::default())
    }

    fn context_with(content: &str, interactions: usize) -> Context {
        let mut context = Context::fresh("s1");
        for _ in 0..interactions {
            context.data.interactions.push(Interaction {
                timestamp: chrono::Utc::now(),
                request: Request::new(content),
                response: Response::new("ok"),
                summary: "summary".into(),
            });
        }
        context
    }

    /// A codec whose output is always larger than its input.
    struct InflatingCodec;

    impl Codec for InflatingCodec {
        fn name(&self) -> &str {
            "inflating"
        }
        fn encode(&self, input: &str, _: CompressionLevel) -> Result<String, CortexError> {
            Ok(format!("{input}{input}"))
        }
        fn decode(&self, input: &str, _: CompressionLevel) -> Result<String, CortexError> {
            Ok(input[..input.len() / 2].to_string())
        }
    }

    #[test]
    fn level_boundaries() {
        let e = engine();
        assert_eq!(e.level_for_size(0), CompressionLevel::Uncompressed);
        assert_eq!(e.level_for_size(999), CompressionLevel::Uncompressed);
        assert_eq!(e.level_for_size(1_000), CompressionLevel::Light);
        assert_eq!(e.level_for_size(9_999), CompressionLevel::Light);
        assert_eq!(e.level_for_size(10_000), CompressionLevel::Medium);
        assert_eq!(e.level_for_size(49_999), CompressionLevel::Medium);
        assert_eq!(e.level_for_size(50_000), CompressionLevel::Heavy);
    }

    #[test]
    fn small_context_is_left_plain() {
        let context = Context::fresh("s1");
        let stored = engine().compress_if_needed(&context).unwrap();
        assert_eq!(stored.metadata.compression_level, CompressionLevel::Uncompressed);
        assert_eq!(stored.metadata.compressed_size, stored.metadata.original_size);
        assert_eq!(stored.data, ContextPayload::Plain(context.data));
    }

    #[test]
    fn large_context_uses_heavy_level() {
        let context = context_with(&"x".repeat(60_000), 1);
        let stored = engine().compress_if_needed(&context).unwrap();
        assert_eq!(stored.metadata.compression_level, CompressionLevel::Heavy);
        assert!(stored.metadata.compressed_size < stored.metadata.original_size);
        assert!(matches!(stored.data, ContextPayload::Encoded(_)));
    }

    #[test]
    fn restore_inverts_compress_if_needed() {
        let e = engine();
        let context = context_with("some repeated request text ", 80);
        let stored = e.compress_if_needed(&context).unwrap();
        assert!(stored.metadata.compression_level.is_compressed());
        let restored = e.restore(stored);
        assert_eq!(restored.data, context.data);
    }

    #[test]
    fn non_shrinking_codec_falls_back_to_plain() {
        let e = CompressionEngine::with_codec(&CompressionConfig::default(), Arc::new(InflatingCodec));
        let context = context_with(&"y".repeat(5_000), 1);
        let stored = e.compress_if_needed(&context).unwrap();
        assert_eq!(stored.metadata.compression_level, CompressionLevel::Uncompressed);
        assert_eq!(stored.metadata.compressed_size, stored.metadata.original_size);
        assert!(matches!(stored.data, ContextPayload::Plain(_)));
    }

    #[test]
    fn corrupted_blob_decodes_to_empty_data() {
        let e = engine();
        assert_eq!(e.decompress("not base64 at all!", CompressionLevel::Heavy), ContextData::default());

        let valid_base64_garbage = STANDARD.encode(b"definitely not zlib");
        assert_eq!(e.decompress(&valid_base64_garbage, CompressionLevel::Light), ContextData::default());

        assert_eq!(e.decompress("{broken json", CompressionLevel::Uncompressed), ContextData::default());
    }

    #[test]
    fn stored_context_survives_json_round_trip() {
        let e = engine();
        let context = context_with(&"z".repeat(20_000), 1);
        let stored = e.compress_if_needed(&context).unwrap();
        let json = serde_json::to_string(&stored).unwrap();
        let parsed: StoredContext = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.metadata.compression_level, CompressionLevel::Medium);
        assert_eq!(e.restore(parsed).data, context.data);
    }

    proptest! {
        #[test]
        fn compress_round_trips_at_every_level(content in ".{0,400}", count in 0usize..30) {
            let e = engine();
            let data = context_with(&content, count).data;
            for level in CompressionLevel::ALL {
                let encoded = e.compress(&data, level).unwrap();
                prop_assert_eq!(&e.decompress(&encoded, level), &data);
            }
        }

        #[test]
        fn compressed_size_is_monotone(content in "[a-z ]{0,200}", count in 0usize..120) {
            let stored = engine().compress_if_needed(&context_with(&content, count)).unwrap();
            let meta = stored.metadata;
            if meta.compression_level.is_compressed() {
                prop_assert!(meta.compressed_size < meta.original_size);
            } else {
                prop_assert_eq!(meta.compressed_size, meta.original_size);
            }
        }
    }
}
