//! WAV container encoder
//!
//! Builds canonical RIFF/WAVE buffers (44-byte header, interleaved 16-bit
//! little-endian PCM) from floating-point channel data. Used to synthesize
//! demonstration carriers without touching the filesystem.
//!
//! Quantization is asymmetric: negative samples scale by 32768 and
//! non-negative samples by 32767, then truncate toward zero. Carriers built
//! elsewhere with the same rule round-trip bit-for-bit through the backend.

use std::f32::consts::PI;

/// Size of the canonical RIFF/WAVE header in bytes
pub const WAV_HEADER_LEN: usize = 44;

const BITS_PER_SAMPLE: u16 = 16;
const BYTES_PER_SAMPLE: usize = 2;
const PCM_FORMAT: u16 = 1;
const FMT_CHUNK_LEN: u32 = 16;

/// Encoded WAV file. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WavContainer {
    bytes: Vec<u8>,
}

impl WavContainer {
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// Total length including the header
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Length of the PCM data section
    pub fn data_len(&self) -> usize {
        self.bytes.len() - WAV_HEADER_LEN
    }
}

impl AsRef<[u8]> for WavContainer {
    fn as_ref(&self) -> &[u8] {
        &self.bytes
    }
}

/// Quantize one sample to signed 16-bit PCM
pub fn quantize_sample(sample: f32) -> i16 {
    let s = sample.clamp(-1.0, 1.0);
    if s < 0.0 {
        (s * 32768.0) as i16
    } else {
        (s * 32767.0) as i16
    }
}

/// Encode channel data as a 16-bit PCM WAV container
///
/// `channels` holds one sample sequence per channel. Frames are interleaved
/// in channel order. Ragged input is truncated to the shortest channel.
pub fn encode_wav<C: AsRef<[f32]>>(channels: &[C], sample_rate: u32) -> WavContainer {
    let channel_count = channels.len();
    let frames = channels
        .iter()
        .map(|c| c.as_ref().len())
        .min()
        .unwrap_or(0);

    let data_len = frames * channel_count * BYTES_PER_SAMPLE;
    let block_align = channel_count * BYTES_PER_SAMPLE;
    let byte_rate = sample_rate as usize * block_align;

    let mut bytes = Vec::with_capacity(WAV_HEADER_LEN + data_len);

    // RIFF chunk descriptor
    bytes.extend_from_slice(b"RIFF");
    bytes.extend_from_slice(&((WAV_HEADER_LEN + data_len - 8) as u32).to_le_bytes());
    bytes.extend_from_slice(b"WAVE");

    // fmt sub-chunk
    bytes.extend_from_slice(b"fmt ");
    bytes.extend_from_slice(&FMT_CHUNK_LEN.to_le_bytes());
    bytes.extend_from_slice(&PCM_FORMAT.to_le_bytes());
    bytes.extend_from_slice(&(channel_count as u16).to_le_bytes());
    bytes.extend_from_slice(&sample_rate.to_le_bytes());
    bytes.extend_from_slice(&(byte_rate as u32).to_le_bytes());
    bytes.extend_from_slice(&(block_align as u16).to_le_bytes());
    bytes.extend_from_slice(&BITS_PER_SAMPLE.to_le_bytes());

    // data sub-chunk
    bytes.extend_from_slice(b"data");
    bytes.extend_from_slice(&(data_len as u32).to_le_bytes());

    for frame in 0..frames {
        for channel in channels {
            let sample = quantize_sample(channel.as_ref()[frame]);
            bytes.extend_from_slice(&sample.to_le_bytes());
        }
    }

    WavContainer { bytes }
}

/// Synthesize a mono sine tone
///
/// # Arguments
/// * `frequency_hz` - Tone frequency (e.g. 440.0 for A4)
/// * `duration_secs` - Length of the tone
/// * `sample_rate` - Samples per second
/// * `amplitude` - Peak amplitude, clamped to 0.0-1.0
pub fn sine_wave(frequency_hz: f32, duration_secs: f32, sample_rate: u32, amplitude: f32) -> Vec<f32> {
    let amplitude = amplitude.clamp(0.0, 1.0);
    let total = (sample_rate as f32 * duration_secs.max(0.0)).round() as usize;

    (0..total)
        .map(|i| {
            let t = i as f32 / sample_rate as f32;
            amplitude * (2.0 * PI * frequency_hz * t).sin()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn u32_at(bytes: &[u8], offset: usize) -> u32 {
        u32::from_le_bytes(bytes[offset..offset + 4].try_into().unwrap())
    }

    fn u16_at(bytes: &[u8], offset: usize) -> u16 {
        u16::from_le_bytes(bytes[offset..offset + 2].try_into().unwrap())
    }

    #[test]
    fn test_header_layout_stereo() {
        let left = vec![0.0f32; 10];
        let right = vec![0.0f32; 10];
        let wav = encode_wav(&[left, right], 48000);
        let b = wav.as_bytes();

        assert_eq!(&b[0..4], b"RIFF");
        assert_eq!(u32_at(b, 4), (b.len() - 8) as u32);
        assert_eq!(&b[8..12], b"WAVE");
        assert_eq!(&b[12..16], b"fmt ");
        assert_eq!(u32_at(b, 16), 16);
        assert_eq!(u16_at(b, 20), 1);
        assert_eq!(u16_at(b, 22), 2);
        assert_eq!(u32_at(b, 24), 48000);
        assert_eq!(u32_at(b, 28), 48000 * 2 * 2);
        assert_eq!(u16_at(b, 32), 4);
        assert_eq!(u16_at(b, 34), 16);
        assert_eq!(&b[36..40], b"data");
        assert_eq!(u32_at(b, 40), 40);
        assert_eq!(b.len(), 44 + 40);
    }

    #[test]
    fn test_length_matches_frames_and_channels() {
        for (channels, frames) in [(1usize, 0usize), (1, 7), (2, 5), (3, 100)] {
            let data: Vec<Vec<f32>> = (0..channels).map(|_| vec![0.25; frames]).collect();
            let wav = encode_wav(&data, 8000);
            assert_eq!(wav.len(), 44 + frames * channels * 2);
            assert_eq!(wav.data_len(), frames * channels * 2);
            assert_eq!(u32_at(wav.as_bytes(), 40) as usize, frames * channels * 2);
        }
    }

    #[test]
    fn test_empty_input_yields_valid_header() {
        let none: [Vec<f32>; 0] = [];
        let wav = encode_wav(&none, 44100);
        assert_eq!(wav.len(), WAV_HEADER_LEN);
        assert_eq!(u16_at(wav.as_bytes(), 22), 0);
        assert_eq!(u32_at(wav.as_bytes(), 40), 0);
        assert_eq!(u32_at(wav.as_bytes(), 4), 36);
    }

    #[test]
    fn test_quantization_is_asymmetric() {
        assert_eq!(quantize_sample(-1.0), -32768);
        assert_eq!(quantize_sample(1.0), 32767);
        assert_eq!(quantize_sample(0.0), 0);
        assert_eq!(quantize_sample(-0.0), 0);
        assert_eq!(quantize_sample(-0.5), -16384);
        assert_eq!(quantize_sample(0.5), 16383);
    }

    #[test]
    fn test_quantization_clamps_out_of_range() {
        assert_eq!(quantize_sample(3.5), 32767);
        assert_eq!(quantize_sample(-7.0), -32768);
    }

    #[test]
    fn test_samples_are_interleaved_le() {
        let wav = encode_wav(&[vec![1.0f32, 0.0], vec![-1.0f32, 0.5]], 8000);
        let pcm = &wav.as_bytes()[WAV_HEADER_LEN..];
        let samples: Vec<i16> = pcm
            .chunks_exact(2)
            .map(|c| i16::from_le_bytes([c[0], c[1]]))
            .collect();
        assert_eq!(samples, vec![32767, -32768, 0, 16383]);
    }

    #[test]
    fn test_ragged_channels_truncate_to_shortest() {
        let wav = encode_wav(&[vec![0.1f32; 6], vec![0.1f32; 4]], 8000);
        assert_eq!(wav.data_len(), 4 * 2 * 2);
    }

    #[test]
    fn test_sine_wave_length_and_range() {
        let tone = sine_wave(440.0, 1.0, 44100, 0.5);
        assert_eq!(tone.len(), 44100);
        assert!(tone.iter().all(|s| s.abs() <= 0.5 + f32::EPSILON));
        assert_eq!(tone[0], 0.0);
    }
}
