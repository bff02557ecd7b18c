//! PCM-to-WAV container framing.
//!
//! The speech service returns raw signed 16-bit little-endian mono PCM.
//! Playback software needs a self-describing container, so this module
//! prepends the standard 44-byte PCM WAV header and nothing else: no
//! resampling, no validation. Malformed upstream PCM (odd byte count, wrong
//! rate claim) is framed as-is.

/// Length in bytes of the standard PCM WAV header.
pub const WAV_HEADER_LEN: usize = 44;

/// Sample rate the speech service synthesizes at.
pub const SPEECH_SAMPLE_RATE: u32 = 24000;

const NUM_CHANNELS: u16 = 1;
const BITS_PER_SAMPLE: u16 = 16;

/// Frames raw 16-bit mono PCM into a complete WAV byte sequence.
pub fn frame_pcm(pcm: &[u8], sample_rate: u32) -> Vec<u8> {
    let data_size = pcm.len() as u32;
    let byte_rate = sample_rate * NUM_CHANNELS as u32 * 2;
    let block_align = NUM_CHANNELS * 2;

    let mut out = Vec::with_capacity(WAV_HEADER_LEN + pcm.len());

    // RIFF chunk
    out.extend_from_slice(b"RIFF");
    out.extend_from_slice(&(36 + data_size).to_le_bytes());
    out.extend_from_slice(b"WAVE");

    // fmt chunk
    out.extend_from_slice(b"fmt ");
    out.extend_from_slice(&16u32.to_le_bytes()); // chunk size for PCM
    out.extend_from_slice(&1u16.to_le_bytes()); // format tag: PCM
    out.extend_from_slice(&NUM_CHANNELS.to_le_bytes());
    out.extend_from_slice(&sample_rate.to_le_bytes());
    out.extend_from_slice(&byte_rate.to_le_bytes());
    out.extend_from_slice(&block_align.to_le_bytes());
    out.extend_from_slice(&BITS_PER_SAMPLE.to_le_bytes());

    // data chunk, payload unmodified
    out.extend_from_slice(b"data");
    out.extend_from_slice(&data_size.to_le_bytes());
    out.extend_from_slice(pcm);

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_is_exactly_44_bytes_with_correct_sizes() {
        let pcm = [0u8, 1, 2, 3, 4, 5];
        let wav = frame_pcm(&pcm, SPEECH_SAMPLE_RATE);

        assert_eq!(wav.len(), WAV_HEADER_LEN + pcm.len());
        assert_eq!(&wav[0..4], b"RIFF");
        assert_eq!(
            u32::from_le_bytes(wav[4..8].try_into().unwrap()),
            36 + pcm.len() as u32
        );
        assert_eq!(&wav[8..12], b"WAVE");
        assert_eq!(&wav[36..40], b"data");
        assert_eq!(
            u32::from_le_bytes(wav[40..44].try_into().unwrap()),
            pcm.len() as u32
        );
        assert_eq!(&wav[WAV_HEADER_LEN..], &pcm);
    }

    #[test]
    fn header_matches_standard_pcm_layout_byte_for_byte() {
        let pcm = [0x12u8, 0x34];
        let wav = frame_pcm(&pcm, 24000);

        let expected_header: [u8; WAV_HEADER_LEN] = [
            b'R', b'I', b'F', b'F', 38, 0, 0, 0, // RIFF size = 36 + 2
            b'W', b'A', b'V', b'E', //
            b'f', b'm', b't', b' ', 16, 0, 0, 0, // fmt chunk size
            1, 0, // PCM format tag
            1, 0, // mono
            0xC0, 0x5D, 0, 0, // 24000 Hz
            0x80, 0xBB, 0, 0, // byte rate 48000
            2, 0, // block align
            16, 0, // bits per sample
            b'd', b'a', b't', b'a', 2, 0, 0, 0, // data size
        ];
        assert_eq!(&wav[..WAV_HEADER_LEN], &expected_header);
    }

    #[test]
    fn framed_output_parses_under_an_independent_reader() {
        let samples: Vec<i16> = vec![0, 1000, -1000, i16::MAX, i16::MIN];
        let mut pcm = Vec::new();
        for s in &samples {
            pcm.extend_from_slice(&s.to_le_bytes());
        }

        let wav = frame_pcm(&pcm, SPEECH_SAMPLE_RATE);
        let reader = hound::WavReader::new(std::io::Cursor::new(wav)).unwrap();

        let spec = reader.spec();
        assert_eq!(spec.channels, 1);
        assert_eq!(spec.sample_rate, SPEECH_SAMPLE_RATE);
        assert_eq!(spec.bits_per_sample, 16);
        assert_eq!(spec.sample_format, hound::SampleFormat::Int);

        let decoded: Vec<i16> = reader.into_samples().map(|s| s.unwrap()).collect();
        assert_eq!(decoded, samples);
    }

    #[test]
    fn odd_byte_count_is_framed_as_is() {
        let pcm = [1u8, 2, 3];
        let wav = frame_pcm(&pcm, SPEECH_SAMPLE_RATE);
        assert_eq!(u32::from_le_bytes(wav[40..44].try_into().unwrap()), 3);
        assert_eq!(&wav[WAV_HEADER_LEN..], &pcm);
    }
}
