//! WAV framing helpers for the speech APIs
//!
//! The STT endpoint takes a WAV upload; the TTS endpoint may return either
//! raw PCM16 or WAV-wrapped audio depending on the codec it was asked for.

use std::io::Cursor;

use crate::SpeechError;

/// Wrap mono PCM16 samples in a WAV container
pub fn pcm_to_wav(samples: &[i16], sample_rate: u32) -> Result<Vec<u8>, SpeechError> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec)?;
        for &sample in samples {
            writer.write_sample(sample)?;
        }
        writer.finalize()?;
    }
    Ok(cursor.into_inner())
}

/// Decode a synthesized audio buffer to PCM16 samples.
///
/// Accepts either a WAV container (identified by its RIFF magic) or raw
/// little-endian PCM16.
pub fn decode_audio(bytes: &[u8]) -> Result<Vec<i16>, SpeechError> {
    if bytes.starts_with(b"RIFF") {
        let reader = hound::WavReader::new(Cursor::new(bytes))?;
        let samples: Result<Vec<i16>, _> = reader.into_samples::<i16>().collect();
        return Ok(samples?);
    }

    if bytes.len() % 2 != 0 {
        return Err(SpeechError::Payload(format!(
            "raw PCM payload has odd length {}",
            bytes.len()
        )));
    }
    Ok(bytes
        .chunks_exact(2)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wav_roundtrip() {
        let samples: Vec<i16> = (0..160).map(|i| (i * 100) as i16).collect();
        let wav = pcm_to_wav(&samples, 16000).unwrap();
        assert!(wav.starts_with(b"RIFF"));

        let decoded = decode_audio(&wav).unwrap();
        assert_eq!(decoded, samples);
    }

    #[test]
    fn test_raw_pcm_decode() {
        let samples = vec![100i16, -100, 0];
        let bytes: Vec<u8> = samples.iter().flat_map(|s| s.to_le_bytes()).collect();
        assert_eq!(decode_audio(&bytes).unwrap(), samples);
    }

    #[test]
    fn test_odd_raw_pcm_rejected() {
        assert!(decode_audio(&[1, 2, 3]).is_err());
    }
}
