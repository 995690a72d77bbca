//! Algorithm selection.
//!
//! A [`CompressionAlgorithm`] is an immutable `{variant, window bits}` value
//! that maps to the parameters both codec directions are initialized with.
//! It is `Copy` and can be shared freely between any number of streams.
//!
//! | Variant       | Framing                       | Overhead |
//! |---------------|-------------------------------|----------|
//! | `RawDeflate`  | bare RFC 1951 blocks          | 0 bytes  |
//! | `Zlib`        | RFC 1950 header + Adler-32    | 6 bytes  |
//! | `Gzip`        | RFC 1952 header + CRC-32/size | 18 bytes |

use crate::compressor::Compressor;
use crate::decompressor::Decompressor;
use std::fmt;

/// Smallest history window the codec accepts (512 bytes).
pub const MIN_WINDOW_BITS: u8 = 9;

/// Largest history window the codec accepts (32 KiB).
pub const MAX_WINDOW_BITS: u8 = 15;

/// Header framing around the deflate blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Variant {
    /// Raw deflate blocks, no header or trailer.
    RawDeflate,
    /// Zlib framing.
    Zlib,
    /// Gzip framing.
    Gzip,
}

impl Variant {
    /// Every variant, in order of increasing framing.
    pub const ALL: [Variant; 3] = [Self::RawDeflate, Self::Zlib, Self::Gzip];

    /// Look a variant up by its short name, ignoring ASCII case.
    ///
    /// `raw` is accepted as an alias for `deflate`.
    pub fn from_name(name: &str) -> Option<Self> {
        if name.eq_ignore_ascii_case("raw") {
            return Some(Self::RawDeflate);
        }
        Self::ALL
            .into_iter()
            .find(|variant| variant.name().eq_ignore_ascii_case(name))
    }

    /// Short lowercase name.
    pub fn name(self) -> &'static str {
        match self {
            Self::RawDeflate => "deflate",
            Self::Zlib => "zlib",
            Self::Gzip => "gzip",
        }
    }

    /// Bytes of header and trailer the framing adds to a stream.
    pub fn wrapper_overhead(self) -> usize {
        match self {
            Self::RawDeflate => 0,
            Self::Zlib => 2 + 4,
            Self::Gzip => 10 + 8,
        }
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Parameters a codec context is initialized with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodecParams {
    /// Base-two logarithm of the history window.
    pub window_bits: u8,
    /// Framing expected or produced by the codec.
    pub header: Variant,
}

impl CodecParams {
    /// Whether the codec can be initialized with these parameters.
    pub fn is_valid(&self) -> bool {
        (MIN_WINDOW_BITS..=MAX_WINDOW_BITS).contains(&self.window_bits)
    }
}

/// A compression variant together with its window size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CompressionAlgorithm {
    variant: Variant,
    window_bits: u8,
}

impl CompressionAlgorithm {
    /// Raw deflate with a 32 KiB window.
    pub const RAW_DEFLATE: Self = Self::new(Variant::RawDeflate);

    /// Zlib with a 32 KiB window.
    pub const ZLIB: Self = Self::new(Variant::Zlib);

    /// Gzip with a 32 KiB window.
    pub const GZIP: Self = Self::new(Variant::Gzip);

    /// Create an algorithm with the largest window.
    pub const fn new(variant: Variant) -> Self {
        Self {
            variant,
            window_bits: MAX_WINDOW_BITS,
        }
    }

    /// Use a different window size, clamped to 9..=15.
    ///
    /// A decompressor must use a window at least as large as the one the
    /// data was compressed with.
    pub fn with_window_bits(self, window_bits: u8) -> Self {
        Self {
            window_bits: window_bits.clamp(MIN_WINDOW_BITS, MAX_WINDOW_BITS),
            ..self
        }
    }

    /// The framing variant.
    pub fn variant(&self) -> Variant {
        self.variant
    }

    /// Base-two logarithm of the history window.
    pub fn window_bits(&self) -> u8 {
        self.window_bits
    }

    /// Codec parameters for either direction.
    pub fn params(&self) -> CodecParams {
        CodecParams {
            window_bits: self.window_bits,
            header: self.variant,
        }
    }

    /// Upper bound on the compressed size of `input_len` bytes.
    ///
    /// Covers the worst case of stored blocks, one flush marker, bits left
    /// pending by an earlier partial flush, and the full header and trailer.
    /// The result is never smaller than what the codec can emit for that
    /// much input in a single step.
    pub fn deflate_bound(&self, input_len: usize) -> usize {
        const STORED_BLOCK_OVERHEAD: usize = 5;
        const FLUSH_OVERHEAD: usize = 8;

        input_len
            .saturating_add(input_len.saturating_add(7) >> 3)
            .saturating_add(input_len.saturating_add(63) >> 6)
            .saturating_add(STORED_BLOCK_OVERHEAD + FLUSH_OVERHEAD)
            .saturating_add(self.variant.wrapper_overhead())
    }

    /// Create a compressor for this algorithm.
    pub fn compressor(&self) -> Compressor {
        Compressor::new(*self)
    }

    /// Create a decompressor for this algorithm.
    pub fn decompressor(&self) -> Decompressor {
        Decompressor::new(*self)
    }
}

impl Default for CompressionAlgorithm {
    fn default() -> Self {
        Self::GZIP
    }
}

impl From<Variant> for CompressionAlgorithm {
    fn from(variant: Variant) -> Self {
        Self::new(variant)
    }
}

impl fmt::Display for CompressionAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (window bits {})", self.variant, self.window_bits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets() {
        assert_eq!(CompressionAlgorithm::RAW_DEFLATE.variant(), Variant::RawDeflate);
        assert_eq!(CompressionAlgorithm::ZLIB.variant(), Variant::Zlib);
        assert_eq!(CompressionAlgorithm::GZIP.variant(), Variant::Gzip);
        assert_eq!(CompressionAlgorithm::GZIP.window_bits(), 15);
        assert_eq!(CompressionAlgorithm::default(), CompressionAlgorithm::GZIP);
    }

    #[test]
    fn test_window_bits_clamping() {
        let algorithm = CompressionAlgorithm::ZLIB.with_window_bits(12);
        assert_eq!(algorithm.window_bits(), 12);
        assert_eq!(algorithm.variant(), Variant::Zlib);

        assert_eq!(CompressionAlgorithm::ZLIB.with_window_bits(4).window_bits(), 9);
        assert_eq!(CompressionAlgorithm::ZLIB.with_window_bits(31).window_bits(), 15);
    }

    #[test]
    fn test_params() {
        let params = CompressionAlgorithm::GZIP.with_window_bits(10).params();
        assert_eq!(params.window_bits, 10);
        assert_eq!(params.header, Variant::Gzip);
        assert!(params.is_valid());

        let bogus = CodecParams {
            window_bits: 7,
            header: Variant::RawDeflate,
        };
        assert!(!bogus.is_valid());
    }

    #[test]
    fn test_deflate_bound_grows_with_input() {
        let algorithm = CompressionAlgorithm::GZIP;
        let empty = algorithm.deflate_bound(0);
        assert!(empty >= Variant::Gzip.wrapper_overhead());

        let mut previous = empty;
        for len in [1, 16, 1024, 16_000, 1 << 20] {
            let bound = algorithm.deflate_bound(len);
            assert!(bound > len);
            assert!(bound >= previous);
            previous = bound;
        }
    }

    #[test]
    fn test_deflate_bound_saturates() {
        assert_eq!(CompressionAlgorithm::ZLIB.deflate_bound(usize::MAX), usize::MAX);
    }

    #[test]
    fn test_variant_names() {
        for variant in Variant::ALL {
            assert_eq!(Variant::from_name(variant.name()), Some(variant));
        }
        assert_eq!(Variant::from_name("GZIP"), Some(Variant::Gzip));
        assert_eq!(Variant::from_name("raw"), Some(Variant::RawDeflate));
        assert_eq!(Variant::from_name("brotli"), None);
    }

    #[test]
    fn test_display() {
        assert_eq!(Variant::Gzip.to_string(), "gzip");
        assert_eq!(
            CompressionAlgorithm::RAW_DEFLATE.to_string(),
            "deflate (window bits 15)"
        );
    }
}
