//! Audio framing — TTS content type → [`AudioFormat`] → WAV bytes.
//!
//! # Pipeline
//!
//! ```text
//! inlineData.mimeType ──▶ AudioFormat::from_mime_type
//!                                  │
//! inlineData.data (PCM) ───────────┴──▶ encode_wav ──▶ {id}_{variant}.wav
//! ```
//!
//! # Quick Start
//!
//! ```rust
//! use word_tts::audio::{encode_wav, AudioFormat, WavHeader};
//!
//! let format = AudioFormat::from_mime_type(Some("audio/L16;codec=pcm;rate=24000"));
//! let wav = encode_wav(&[0u8; 4_800], format);
//!
//! let header = WavHeader::parse(&wav).unwrap();
//! assert_eq!(header.data_len, 4_800);
//! ```

pub mod format;
pub mod wav;

pub use format::AudioFormat;
pub use wav::{encode_wav, WavError, WavHeader, WAV_HEADER_LEN};
