//! Audio codec adaptation
//!
//! Converts between the wire audio encoding and the canonical internal PCM16
//! sample buffer, and resamples when the synthesis rate differs from the
//! wire rate. Mu-law follows G.711: 8 kHz, 8 bits per sample, bias 0x84,
//! clip 32635.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use thiserror::Error;

/// Codec errors. A malformed frame is dropped and logged by the caller; it
/// never terminates the session.
#[derive(Error, Debug)]
pub enum CodecError {
    #[error("invalid base64 payload: {0}")]
    InvalidBase64(#[from] base64::DecodeError),

    #[error("odd PCM16 byte length: {0}")]
    OddByteLength(usize),

    #[error("empty payload")]
    Empty,
}

const MULAW_BIAS: i32 = 0x84;
const MULAW_CLIP: i32 = 32635;

/// Encode one PCM16 sample as a G.711 mu-law byte
pub fn linear_to_mulaw(sample: i16) -> u8 {
    let sign: u8 = if sample < 0 { 0x80 } else { 0 };
    let magnitude = (sample as i32).abs().min(MULAW_CLIP) + MULAW_BIAS;

    let mut exponent: u8 = 7;
    let mut mask = 0x4000;
    while exponent > 0 && magnitude & mask == 0 {
        exponent -= 1;
        mask >>= 1;
    }

    let mantissa = ((magnitude >> (exponent + 3)) & 0x0F) as u8;

    !(sign | (exponent << 4) | mantissa)
}

/// Decode one G.711 mu-law byte to a PCM16 sample
pub fn mulaw_to_linear(byte: u8) -> i16 {
    let byte = !byte;
    let sign = byte & 0x80;
    let exponent = (byte >> 4) & 0x07;
    let mantissa = (byte & 0x0F) as i32;

    let magnitude = (((mantissa << 3) + MULAW_BIAS) << exponent) - MULAW_BIAS;

    if sign != 0 {
        -(magnitude as i16)
    } else {
        magnitude as i16
    }
}

/// Wire audio encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireCodec {
    /// G.711 mu-law at 8 kHz (telephony default)
    Mulaw8k,
    /// Little-endian 16-bit PCM at the given rate
    Pcm16 { sample_rate: u32 },
}

impl WireCodec {
    /// Sample rate of the wire encoding in Hz
    pub fn sample_rate(&self) -> u32 {
        match self {
            WireCodec::Mulaw8k => 8000,
            WireCodec::Pcm16 { sample_rate } => *sample_rate,
        }
    }

    /// Decode raw wire bytes to PCM16 samples
    pub fn decode(&self, bytes: &[u8]) -> Result<Vec<i16>, CodecError> {
        if bytes.is_empty() {
            return Err(CodecError::Empty);
        }
        match self {
            WireCodec::Mulaw8k => Ok(bytes.iter().map(|&b| mulaw_to_linear(b)).collect()),
            WireCodec::Pcm16 { .. } => {
                if bytes.len() % 2 != 0 {
                    return Err(CodecError::OddByteLength(bytes.len()));
                }
                Ok(bytes
                    .chunks_exact(2)
                    .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
                    .collect())
            }
        }
    }

    /// Encode PCM16 samples to raw wire bytes
    pub fn encode(&self, samples: &[i16]) -> Vec<u8> {
        match self {
            WireCodec::Mulaw8k => samples.iter().map(|&s| linear_to_mulaw(s)).collect(),
            WireCodec::Pcm16 { .. } => samples.iter().flat_map(|s| s.to_le_bytes()).collect(),
        }
    }

    /// Decode a base64 media payload to PCM16 samples
    pub fn decode_payload(&self, payload: &str) -> Result<Vec<i16>, CodecError> {
        let bytes = BASE64.decode(payload)?;
        self.decode(&bytes)
    }

    /// Encode PCM16 samples to a base64 media payload
    pub fn encode_payload(&self, samples: &[i16]) -> String {
        BASE64.encode(self.encode(samples))
    }
}

/// Sample-rate conversion between the synthesis rate and the wire rate.
///
/// Uses an FFT-based sinc resampler; falls back to linear interpolation for
/// inputs too short to fill the filter.
pub struct Resampler {
    from_rate: u32,
    to_rate: u32,
}

impl Resampler {
    /// Create a new resampler
    pub fn new(from_rate: u32, to_rate: u32) -> Self {
        Self { from_rate, to_rate }
    }

    /// Resample PCM16 samples from `from_rate` to `to_rate`
    pub fn resample(&self, input: &[i16]) -> Vec<i16> {
        use rubato::{FftFixedIn, Resampler as RubatoResampler};

        if self.from_rate == self.to_rate || input.is_empty() {
            return input.to_vec();
        }

        // Too short for the FFT filter; interpolate directly
        if input.len() < 64 {
            return self.resample_linear(input);
        }

        let samples_f64: Vec<f64> = input.iter().map(|&s| s as f64 / 32768.0).collect();
        let chunk_size = input.len().min(1024);

        match FftFixedIn::<f64>::new(
            self.from_rate as usize,
            self.to_rate as usize,
            chunk_size,
            2, // sub_chunks
            1, // channels
        ) {
            Ok(mut resampler) => {
                let input_frames = vec![samples_f64];
                match resampler.process(&input_frames, None) {
                    Ok(output_frames) => output_frames[0]
                        .iter()
                        .map(|&s| (s * 32768.0).clamp(-32768.0, 32767.0) as i16)
                        .collect(),
                    Err(e) => {
                        tracing::warn!("Rubato processing failed: {}", e);
                        self.resample_linear(input)
                    }
                }
            }
            Err(e) => {
                tracing::warn!("Rubato init failed: {}", e);
                self.resample_linear(input)
            }
        }
    }

    /// Linear interpolation fallback
    fn resample_linear(&self, input: &[i16]) -> Vec<i16> {
        let ratio = self.to_rate as f64 / self.from_rate as f64;
        let output_len = (input.len() as f64 * ratio).ceil() as usize;
        let mut output = Vec::with_capacity(output_len);

        for i in 0..output_len {
            let src_idx = i as f64 / ratio;
            let idx_floor = src_idx.floor() as usize;
            let idx_ceil = (idx_floor + 1).min(input.len().saturating_sub(1));
            let frac = src_idx - idx_floor as f64;

            let sample =
                input[idx_floor] as f64 * (1.0 - frac) + input[idx_ceil] as f64 * frac;
            output.push(sample as i16);
        }

        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mulaw_silence() {
        // Silence encodes to 0xFF after complement
        assert_eq!(linear_to_mulaw(0), 0xFF);
        assert_eq!(mulaw_to_linear(0xFF), 0);
        // The negative-zero codeword also decodes to silence
        assert_eq!(mulaw_to_linear(0x7F), 0);
    }

    #[test]
    fn test_mulaw_roundtrip_tolerance() {
        for &original in &[0i16, 100, -100, 1000, -1000, 5000, -5000, 20000, -20000] {
            let decoded = mulaw_to_linear(linear_to_mulaw(original));
            let error = (decoded as i32 - original as i32).abs();
            // Quantization error grows with magnitude but stays within the
            // segment step size
            let bound = (original as i32).abs() / 16 + 16;
            assert!(
                error <= bound,
                "roundtrip {}: decoded {}, error {}",
                original,
                decoded,
                error
            );
        }
    }

    #[test]
    fn test_mulaw_extremes() {
        assert!(mulaw_to_linear(linear_to_mulaw(i16::MAX)) > 30000);
        assert!(mulaw_to_linear(linear_to_mulaw(-i16::MAX)) < -30000);
        // i16::MIN must not overflow
        assert!(mulaw_to_linear(linear_to_mulaw(i16::MIN)) < -30000);
    }

    #[test]
    fn test_mulaw_symmetry() {
        let pos = mulaw_to_linear(linear_to_mulaw(5000));
        let neg = mulaw_to_linear(linear_to_mulaw(-5000));
        assert_eq!(pos, -neg);
    }

    #[test]
    fn test_mulaw_decode_monotonic() {
        let mut prev = mulaw_to_linear(linear_to_mulaw(0));
        for i in (100..30000).step_by(500) {
            let decoded = mulaw_to_linear(linear_to_mulaw(i));
            assert!(decoded >= prev, "non-monotonic at {}", i);
            prev = decoded;
        }
    }

    #[test]
    fn test_pcm16_roundtrip_exact() {
        let codec = WireCodec::Pcm16 { sample_rate: 16000 };
        let samples = vec![0i16, 100, -100, i16::MAX, i16::MIN];
        let decoded = codec.decode(&codec.encode(&samples)).unwrap();
        assert_eq!(decoded, samples);
    }

    #[test]
    fn test_mulaw_payload_roundtrip() {
        let codec = WireCodec::Mulaw8k;
        let samples = vec![0i16, 500, -500, 8000, -8000];
        let payload = codec.encode_payload(&samples);
        let decoded = codec.decode_payload(&payload).unwrap();
        assert_eq!(decoded.len(), samples.len());
        for (d, s) in decoded.iter().zip(&samples) {
            assert!((d - s).abs() < 600, "decoded {} vs {}", d, s);
        }
    }

    #[test]
    fn test_decode_rejects_malformed() {
        let codec = WireCodec::Pcm16 { sample_rate: 8000 };
        assert!(matches!(
            codec.decode(&[1, 2, 3]),
            Err(CodecError::OddByteLength(3))
        ));
        assert!(matches!(codec.decode(&[]), Err(CodecError::Empty)));
        assert!(matches!(
            codec.decode_payload("not-valid-base64!!!"),
            Err(CodecError::InvalidBase64(_))
        ));
    }

    #[test]
    fn test_resampler_ratio() {
        let resampler = Resampler::new(16000, 8000);
        let input: Vec<i16> = (0..1600)
            .map(|i| ((i as f64 * 0.1).sin() * 5000.0) as i16)
            .collect();
        let output = resampler.resample(&input);
        // 2:1 downsample; FFT filter latency allows a small deficit
        assert!(
            (600..=800).contains(&output.len()),
            "expected ~800 samples, got {}",
            output.len()
        );
    }

    #[test]
    fn test_resampler_short_input_linear() {
        let resampler = Resampler::new(8000, 16000);
        let input: Vec<i16> = (0..32).map(|i| i * 100).collect();
        let output = resampler.resample(&input);
        assert_eq!(output.len(), 64);
    }

    #[test]
    fn test_resampler_identity() {
        let resampler = Resampler::new(8000, 8000);
        let input = vec![1i16, 2, 3];
        assert_eq!(resampler.resample(&input), input);
    }
}
