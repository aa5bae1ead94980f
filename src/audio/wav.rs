//! Canonical 44-byte RIFF/WAVE framing for raw PCM.
//!
//! Layout written by [`encode_wav`] (all integers little-endian):
//!
//! ```text
//! offset  size  field
//!      0     4  "RIFF"
//!      4     4  36 + data length
//!      8     4  "WAVE"
//!     12     4  "fmt "
//!     16     4  16 (fmt chunk size)
//!     20     2  1  (PCM)
//!     22     2  channels
//!     24     4  sample rate
//!     28     4  byte rate
//!     32     2  block align
//!     34     2  bits per sample
//!     36     4  "data"
//!     40     4  data length
//!     44     …  PCM samples
//! ```

use thiserror::Error;

use super::format::AudioFormat;

/// Size of the canonical header produced by [`encode_wav`].
pub const WAV_HEADER_LEN: usize = 44;

const FMT_CHUNK_SIZE: u32 = 16;
const FORMAT_TAG_PCM: u16 = 1;

// ---------------------------------------------------------------------------
// Encoding
// ---------------------------------------------------------------------------

/// Prepend a canonical WAV header describing `format` to `pcm`.
///
/// ```
/// use word_tts::audio::{encode_wav, AudioFormat, WAV_HEADER_LEN};
///
/// let wav = encode_wav(&[0u8; 480], AudioFormat::default());
/// assert_eq!(wav.len(), WAV_HEADER_LEN + 480);
/// assert_eq!(&wav[0..4], b"RIFF");
/// ```
pub fn encode_wav(pcm: &[u8], format: AudioFormat) -> Vec<u8> {
    let (chunk_size, data_len) = riff_sizes(pcm.len());
    let mut out = Vec::with_capacity(WAV_HEADER_LEN + pcm.len());

    out.extend_from_slice(b"RIFF");
    out.extend_from_slice(&chunk_size.to_le_bytes());
    out.extend_from_slice(b"WAVE");
    out.extend_from_slice(b"fmt ");
    out.extend_from_slice(&FMT_CHUNK_SIZE.to_le_bytes());
    out.extend_from_slice(&FORMAT_TAG_PCM.to_le_bytes());
    out.extend_from_slice(&format.channels.to_le_bytes());
    out.extend_from_slice(&format.sample_rate.to_le_bytes());
    out.extend_from_slice(&format.byte_rate().to_le_bytes());
    out.extend_from_slice(&format.block_align().to_le_bytes());
    out.extend_from_slice(&format.bits_per_sample.to_le_bytes());
    out.extend_from_slice(b"data");
    out.extend_from_slice(&data_len.to_le_bytes());
    out.extend_from_slice(pcm);

    out
}

/// `(RIFF chunk size, data length)` for a payload of `len` bytes.
///
/// Both fields are u32; payloads past 4 GiB saturate at `u32::MAX`.
fn riff_sizes(len: usize) -> (u32, u32) {
    let data_len = u32::try_from(len).unwrap_or(u32::MAX);
    let chunk_size = data_len.saturating_add((WAV_HEADER_LEN - 8) as u32);
    (chunk_size, data_len)
}

// ---------------------------------------------------------------------------
// Decoding
// ---------------------------------------------------------------------------

/// Errors returned by [`WavHeader::parse`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WavError {
    #[error("WAV data shorter than the 44-byte header ({0} bytes)")]
    TooShort(usize),

    #[error("missing {0:?} marker")]
    MissingMarker(&'static str),

    #[error("unsupported format tag {0} (only PCM is supported)")]
    NotPcm(u16),
}

/// Fields of a canonical 44-byte PCM WAV header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WavHeader {
    pub chunk_size: u32,
    pub format: AudioFormat,
    pub byte_rate: u32,
    pub block_align: u16,
    pub data_len: u32,
}

impl WavHeader {
    /// Read back a header written by [`encode_wav`].
    ///
    /// Only the canonical layout is understood; files with extra chunks
    /// between `fmt ` and `data` are rejected.
    pub fn parse(bytes: &[u8]) -> Result<Self, WavError> {
        if bytes.len() < WAV_HEADER_LEN {
            return Err(WavError::TooShort(bytes.len()));
        }

        for (offset, marker) in [(0, "RIFF"), (8, "WAVE"), (12, "fmt "), (36, "data")] {
            if &bytes[offset..offset + 4] != marker.as_bytes() {
                return Err(WavError::MissingMarker(marker));
            }
        }

        let tag = read_u16(bytes, 20);
        if tag != FORMAT_TAG_PCM {
            return Err(WavError::NotPcm(tag));
        }

        Ok(Self {
            chunk_size: read_u32(bytes, 4),
            format: AudioFormat {
                channels: read_u16(bytes, 22),
                sample_rate: read_u32(bytes, 24),
                bits_per_sample: read_u16(bytes, 34),
            },
            byte_rate: read_u32(bytes, 28),
            block_align: read_u16(bytes, 32),
            data_len: read_u32(bytes, 40),
        })
    }
}

fn read_u16(bytes: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes([bytes[offset], bytes[offset + 1]])
}

fn read_u32(bytes: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([
        bytes[offset],
        bytes[offset + 1],
        bytes[offset + 2],
        bytes[offset + 3],
    ])
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
