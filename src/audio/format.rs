//! Raw PCM format descriptor and MIME-type parsing.
//!
//! The TTS API returns headerless little-endian PCM together with an optional
//! content type such as `audio/L16;codec=pcm;rate=24000`.  [`AudioFormat`]
//! captures the three values needed to frame that payload as WAV.

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

/// Mono output unless the content type says otherwise.
pub const DEFAULT_CHANNELS: u16 = 1;
/// Sample rate used by the Gemini TTS models.
pub const DEFAULT_SAMPLE_RATE: u32 = 24_000;
/// 16-bit signed PCM.
pub const DEFAULT_BITS_PER_SAMPLE: u16 = 16;

// ---------------------------------------------------------------------------
// AudioFormat
// ---------------------------------------------------------------------------

/// Sample layout of a raw PCM buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioFormat {
    /// Number of interleaved channels (≥ 1).
    pub channels: u16,
    /// Samples per second per channel.
    pub sample_rate: u32,
    /// Bits per sample (e.g. 16 for `L16`).
    pub bits_per_sample: u16,
}

impl Default for AudioFormat {
    fn default() -> Self {
        Self {
            channels: DEFAULT_CHANNELS,
            sample_rate: DEFAULT_SAMPLE_RATE,
            bits_per_sample: DEFAULT_BITS_PER_SAMPLE,
        }
    }
}

impl AudioFormat {
    /// Parse a content type of the form `type/subtype;param=value;...`.
    ///
    /// * A subtype of `L<digits>` sets [`bits_per_sample`](Self::bits_per_sample).
    /// * A `rate=<digits>` parameter sets [`sample_rate`](Self::sample_rate).
    ///
    /// Missing, unparsable or zero values silently keep the defaults, as do
    /// values whose byte rate would not fit the 32-bit WAV header field; this
    /// function never fails.
    ///
    /// ```
    /// use word_tts::audio::AudioFormat;
    ///
    /// let fmt = AudioFormat::from_mime_type(Some("audio/L16;rate=24000"));
    /// assert_eq!(fmt.bits_per_sample, 16);
    /// assert_eq!(fmt.sample_rate, 24_000);
    /// assert_eq!(fmt.channels, 1);
    /// ```
    pub fn from_mime_type(mime_type: Option<&str>) -> Self {
        let mut format = Self::default();

        let Some(mime_type) = mime_type else {
            return format;
        };

        let mut parts = mime_type.split(';').map(str::trim);
        let essence = parts.next().unwrap_or_default();

        if let Some(subtype) = essence.split('/').nth(1) {
            if let Some(bits) = subtype
                .strip_prefix('L')
                .and_then(|digits| digits.parse::<u16>().ok())
                .filter(|bits| *bits > 0)
                .filter(|bits| {
                    wide_byte_rate(format.sample_rate, format.channels, *bits)
                        <= u64::from(u32::MAX)
                })
            {
                format.bits_per_sample = bits;
            }
        }

        for param in parts {
            let Some((key, value)) = param.split_once('=') else {
                continue;
            };
            if key.trim() != "rate" {
                continue;
            }
            match value.trim().parse::<u32>() {
                Ok(rate)
                    if rate > 0
                        && wide_byte_rate(rate, format.channels, format.bits_per_sample)
                            <= u64::from(u32::MAX) =>
                {
                    format.sample_rate = rate;
                }
                _ => log::debug!("ignoring sample rate {value:?} in {mime_type:?}"),
            }
        }

        format
    }

    /// Bytes per second: `sample_rate × channels × bits_per_sample / 8`,
    /// saturating at `u32::MAX`.
    pub fn byte_rate(&self) -> u32 {
        let wide = wide_byte_rate(self.sample_rate, self.channels, self.bits_per_sample);
        u32::try_from(wide).unwrap_or(u32::MAX)
    }

    /// Bytes per sample frame: `channels × bits_per_sample / 8`, saturating
    /// at `u16::MAX`.
    pub fn block_align(&self) -> u16 {
        let wide = u32::from(self.channels) * u32::from(self.bits_per_sample) / 8;
        u16::try_from(wide).unwrap_or(u16::MAX)
    }
}

// Cannot overflow: (2^32 - 1) × (2^16 - 1)² < 2^64.
fn wide_byte_rate(sample_rate: u32, channels: u16, bits_per_sample: u16) -> u64 {
    u64::from(sample_rate) * u64::from(channels) * u64::from(bits_per_sample) / 8
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn l16_with_rate() {
        let fmt = AudioFormat::from_mime_type(Some("audio/L16;rate=24000"));
        assert_eq!(
            fmt,
            AudioFormat {
                channels: 1,
                sample_rate: 24_000,
                bits_per_sample: 16
            }
        );
    }

    #[test]
    fn missing_mime_type_is_default() {
        assert_eq!(AudioFormat::from_mime_type(None), AudioFormat::default());
    }

    #[test]
    fn empty_mime_type_is_default() {
        assert_eq!(AudioFormat::from_mime_type(Some("")), AudioFormat::default());
    }

    #[test]
    fn other_bit_depth_and_rate() {
        let fmt = AudioFormat::from_mime_type(Some("audio/L24; codec=pcm; rate=48000"));
        assert_eq!(fmt.bits_per_sample, 24);
        assert_eq!(fmt.sample_rate, 48_000);
        assert_eq!(fmt.channels, 1);
    }

    #[test]
    fn non_pcm_subtype_keeps_default_bits() {
        let fmt = AudioFormat::from_mime_type(Some("audio/wav;rate=16000"));
        assert_eq!(fmt.bits_per_sample, 16);
        assert_eq!(fmt.sample_rate, 16_000);
    }

    #[test]
    fn garbage_values_fall_back() {
        let fmt = AudioFormat::from_mime_type(Some("audio/Lxx;rate=fast;rate"));
        assert_eq!(fmt, AudioFormat::default());

        let zero = AudioFormat::from_mime_type(Some("audio/L0;rate=0"));
        assert_eq!(zero, AudioFormat::default());
    }

    #[test]
    fn derived_rates() {
        let fmt = AudioFormat {
            channels: 2,
            sample_rate: 44_100,
            bits_per_sample: 16,
        };
        assert_eq!(fmt.byte_rate(), 176_400);
        assert_eq!(fmt.block_align(), 4);
    }

    #[test]
    fn large_rate_that_fits_is_kept() {
        // 300 MHz × 16 bit overflows u32 before the division by 8.
        let fmt = AudioFormat::from_mime_type(Some("audio/L16;rate=300000000"));
        assert_eq!(fmt.sample_rate, 300_000_000);
        assert_eq!(fmt.byte_rate(), 600_000_000);
    }

    #[test]
    fn rate_whose_byte_rate_overflows_keeps_default() {
        let fmt = AudioFormat::from_mime_type(Some("audio/L16;rate=4000000000"));
        assert_eq!(fmt, AudioFormat::default());

        let fmt = AudioFormat::from_mime_type(Some("audio/L65535;rate=4294967295"));
        assert_eq!(fmt.bits_per_sample, 65_535);
        assert_eq!(fmt.sample_rate, DEFAULT_SAMPLE_RATE);
    }

    #[test]
    fn extreme_fields_saturate_instead_of_panicking() {
        let fmt = AudioFormat {
            channels: u16::MAX,
            sample_rate: u32::MAX,
            bits_per_sample: u16::MAX,
        };
        assert_eq!(fmt.byte_rate(), u32::MAX);
        assert_eq!(fmt.block_align(), u16::MAX);
    }
}
