//! WAV encoding and decoding for PCM audio.

use crate::FormatError;
use og_engine::Frame;
use og_ir::WaveformSample;
use std::io::Write;

const WAVE_FORMAT_PCM: u16 = 1;

// --- Writing ---

pub fn write_wav(w: &mut impl Write, frames: &[Frame], sample_rate: u32) -> std::io::Result<()> {
    w.write_all(&frames_to_wav(frames, sample_rate))
}

/// Encode stereo 16-bit frames as a complete WAV file.
pub fn frames_to_wav(frames: &[Frame], sample_rate: u32) -> Vec<u8> {
    let num_channels: u16 = 2;
    let bits_per_sample: u16 = 16;
    let block_align = num_channels * (bits_per_sample / 8);
    let data_size = frames.len() as u32 * block_align as u32;

    let mut buf = Vec::with_capacity(44 + data_size as usize);
    buf.extend_from_slice(b"RIFF");
    buf.extend_from_slice(&(36 + data_size).to_le_bytes());
    buf.extend_from_slice(b"WAVE");

    buf.extend_from_slice(b"fmt ");
    buf.extend_from_slice(&16u32.to_le_bytes());
    buf.extend_from_slice(&WAVE_FORMAT_PCM.to_le_bytes());
    buf.extend_from_slice(&num_channels.to_le_bytes());
    buf.extend_from_slice(&sample_rate.to_le_bytes());
    buf.extend_from_slice(&(sample_rate * block_align as u32).to_le_bytes());
    buf.extend_from_slice(&block_align.to_le_bytes());
    buf.extend_from_slice(&bits_per_sample.to_le_bytes());

    buf.extend_from_slice(b"data");
    buf.extend_from_slice(&data_size.to_le_bytes());
    for frame in frames {
        buf.extend_from_slice(&frame.left.to_le_bytes());
        buf.extend_from_slice(&frame.right.to_le_bytes());
    }
    buf
}

// --- Reading ---

/// Contents of a `fmt ` chunk.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WaveFormat {
    pub format_tag: u16,
    pub channels: u16,
    pub sample_rate: u32,
    pub bits_per_sample: u16,
}

impl WaveFormat {
    /// Accept 8/16-bit PCM with the given maximum channel count.
    fn check(&self, max_channels: u16) -> Result<(), FormatError> {
        if self.format_tag != WAVE_FORMAT_PCM {
            return Err(FormatError::UnsupportedEncoding(self.format_tag));
        }
        if self.bits_per_sample != 8 && self.bits_per_sample != 16 {
            return Err(FormatError::UnsupportedBits(self.bits_per_sample));
        }
        if self.channels == 0 || self.channels > max_channels {
            return Err(FormatError::UnsupportedChannels(self.channels));
        }
        if self.sample_rate == 0 {
            return Err(FormatError::InvalidSampleRate(self.sample_rate));
        }
        Ok(())
    }

    /// Mono 8- or 16-bit PCM, the only layout the drum bank plays.
    pub fn check_mono_pcm(&self) -> Result<(), FormatError> {
        self.check(1)
    }

    fn frame_bytes(&self) -> usize {
        self.channels as usize * (self.bits_per_sample as usize / 8)
    }
}

/// A located PCM payload inside a larger buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PcmChunk {
    pub format: WaveFormat,
    /// Byte offset of the first sample
    pub data_offset: usize,
    /// Payload length in bytes, clipped to the buffer
    pub data_len: usize,
}

impl PcmChunk {
    /// Whole frames in the payload.
    pub fn frames(&self) -> usize {
        let bytes = self.format.frame_bytes();
        if bytes == 0 {
            0
        } else {
            self.data_len / bytes
        }
    }

    /// Decode into a mono buffer; stereo is averaged down.
    pub fn decode(&self, data: &[u8], name: &str) -> Result<WaveformSample, FormatError> {
        self.format.check(2)?;
        let end = (self.data_offset + self.data_len).min(data.len());
        let raw = data.get(self.data_offset..end).ok_or(FormatError::UnexpectedEof)?;
        let rate = self.format.sample_rate;
        let sample = match (self.format.bits_per_sample, self.format.channels) {
            (8, 1) => WaveformSample::from_pcm8(name, raw, rate),
            (8, _) => {
                let mono: Vec<u8> =
                    raw.chunks_exact(2).map(|c| ((c[0] as u16 + c[1] as u16) / 2) as u8).collect();
                WaveformSample::from_pcm8(name, &mono, rate)
            }
            (_, 1) => WaveformSample::from_pcm16(name, &read_16bit(raw), rate),
            _ => {
                let mono: Vec<i16> = read_16bit(raw)
                    .chunks_exact(2)
                    .map(|c| ((c[0] as i32 + c[1] as i32) / 2) as i16)
                    .collect();
                WaveformSample::from_pcm16(name, &mono, rate)
            }
        };
        Ok(sample)
    }
}

/// Walk the chunks following a `WAVE` tag at `pos`.
///
/// Expects a `fmt ` chunk before the `data` chunk; other chunks are skipped.
/// A data chunk that claims more bytes than remain is clipped. Returns the
/// located payload and the offset just past it.
pub fn read_wave_body(data: &[u8], mut pos: usize) -> Result<(PcmChunk, usize), FormatError> {
    let mut format: Option<WaveFormat> = None;

    while pos + 8 <= data.len() {
        let chunk_id = &data[pos..pos + 4];
        let chunk_size = read_u32_le(data, pos + 4) as usize;
        let body = pos + 8;

        if chunk_id == b"fmt " {
            if chunk_size < 16 || body + 16 > data.len() {
                return Err(FormatError::UnexpectedEof);
            }
            format = Some(WaveFormat {
                format_tag: read_u16_le(data, body),
                channels: read_u16_le(data, body + 2),
                sample_rate: read_u32_le(data, body + 4),
                bits_per_sample: read_u16_le(data, body + 14),
            });
        } else if chunk_id == b"data" {
            let format = format.ok_or(FormatError::MissingChunk("fmt "))?;
            let data_len = chunk_size.min(data.len() - body);
            let chunk = PcmChunk { format, data_offset: body, data_len };
            return Ok((chunk, body + data_len));
        }

        pos = body.saturating_add(chunk_size);
        if pos % 2 != 0 {
            pos += 1;
        }
    }

    Err(match format {
        Some(_) => FormatError::MissingChunk("data"),
        None => FormatError::MissingChunk("fmt "),
    })
}

/// Load a standalone WAV file into a mono buffer.
pub fn load_wav(data: &[u8], name: &str) -> Result<WaveformSample, FormatError> {
    if data.len() < 12 {
        return Err(FormatError::UnexpectedEof);
    }
    if &data[0..4] != b"RIFF" || &data[8..12] != b"WAVE" {
        return Err(FormatError::InvalidHeader);
    }
    let (chunk, _) = read_wave_body(data, 12)?;
    chunk.decode(data, name)
}

fn read_16bit(raw: &[u8]) -> Vec<i16> {
    raw.chunks_exact(2).map(|c| i16::from_le_bytes([c[0], c[1]])).collect()
}

fn read_u16_le(data: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes([data[offset], data[offset + 1]])
}

fn read_u32_le(data: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([data[offset], data[offset + 1], data[offset + 2], data[offset + 3]])
}

#[cfg(test)]
mod tests {
    use super::*;
    use og_ir::SampleKind;

    /// Build a minimal WAV file from raw parameters.
    fn make_wav(channels: u16, sample_rate: u32, bits: u16, pcm_data: &[u8]) -> Vec<u8> {
        let block_align = channels * (bits / 8);
        let byte_rate = sample_rate * block_align as u32;
        let data_size = pcm_data.len() as u32;

        let mut buf = Vec::new();
        buf.extend(b"RIFF");
        buf.extend(&(36 + data_size).to_le_bytes());
        buf.extend(b"WAVE");
        buf.extend(b"fmt ");
        buf.extend(&16u32.to_le_bytes());
        buf.extend(&1u16.to_le_bytes());
        buf.extend(&channels.to_le_bytes());
        buf.extend(&sample_rate.to_le_bytes());
        buf.extend(&byte_rate.to_le_bytes());
        buf.extend(&block_align.to_le_bytes());
        buf.extend(&bits.to_le_bytes());
        buf.extend(b"data");
        buf.extend(&data_size.to_le_bytes());
        buf.extend(pcm_data);
        buf
    }

    #[test]
    fn load_8bit_mono() {
        let wav = make_wav(1, 22050, 8, &[128, 255, 0, 192]);
        let sample = load_wav(&wav, "test").unwrap();
        assert_eq!(sample.sample_rate, 22050);
        assert_eq!(sample.kind, SampleKind::OneShot);
        assert_eq!(sample.data(), &[0.0, 127.0 / 128.0, -1.0, 0.5]);
    }

    #[test]
    fn load_16bit_mono() {
        let pcm: Vec<u8> =
            [0i16, 16384, -16384, -32768].iter().flat_map(|&v| v.to_le_bytes()).collect();
        let wav = make_wav(1, 44100, 16, &pcm);
        let sample = load_wav(&wav, "test16").unwrap();
        assert_eq!(sample.data(), &[0.0, 0.5, -0.5, -1.0]);
    }

    #[test]
    fn stereo_is_downmixed() {
        let pcm: Vec<u8> =
            [100i16, 200, -100, -300].iter().flat_map(|&v| v.to_le_bytes()).collect();
        let wav = make_wav(2, 44100, 16, &pcm);
        let sample = load_wav(&wav, "stereo").unwrap();
        assert_eq!(sample.len(), 2);
        assert_eq!(sample.frame(0), 150.0 / 32768.0);
        assert_eq!(sample.frame(1), -200.0 / 32768.0);
    }

    #[test]
    fn unknown_chunks_are_skipped() {
        let mut wav = make_wav(1, 8000, 8, &[128, 128]);
        // splice an odd-sized LIST chunk between fmt and data
        let data_at = wav.len() - 2 - 8;
        let extra = [b'L', b'I', b'S', b'T', 3, 0, 0, 0, 1, 2, 3, 0];
        wav.splice(data_at..data_at, extra);
        assert_eq!(load_wav(&wav, "list").unwrap().len(), 2);
    }

    #[test]
    fn oversized_data_chunk_is_clipped() {
        let mut wav = make_wav(1, 8000, 8, &[1, 2, 3]);
        let size_at = wav.len() - 3 - 4;
        wav[size_at..size_at + 4].copy_from_slice(&1000u32.to_le_bytes());
        let (chunk, end) = read_wave_body(&wav, 12).unwrap();
        assert_eq!(chunk.data_len, 3);
        assert_eq!(chunk.frames(), 3);
        assert_eq!(end, wav.len());
    }

    #[test]
    fn non_pcm_rejected() {
        let mut wav = make_wav(1, 8000, 8, &[1, 2]);
        wav[20..22].copy_from_slice(&3u16.to_le_bytes());
        assert!(matches!(load_wav(&wav, "float"), Err(FormatError::UnsupportedEncoding(3))));
    }

    #[test]
    fn zero_sample_rate_rejected() {
        let wav = make_wav(1, 0, 8, &[128, 255]);
        assert!(matches!(load_wav(&wav, "silent"), Err(FormatError::InvalidSampleRate(0))));
        let (chunk, _) = read_wave_body(&wav, 12).unwrap();
        assert!(matches!(chunk.format.check_mono_pcm(), Err(FormatError::InvalidSampleRate(0))));
    }

    #[test]
    fn data_before_fmt_rejected() {
        let mut body = Vec::new();
        body.extend(b"data");
        body.extend(&2u32.to_le_bytes());
        body.extend(&[0, 0]);
        assert!(matches!(read_wave_body(&body, 0), Err(FormatError::MissingChunk("fmt "))));
    }

    #[test]
    fn invalid_header_rejected() {
        assert!(matches!(load_wav(b"not a wav file", "bad"), Err(FormatError::InvalidHeader)));
        assert!(matches!(load_wav(&[0; 10], "short"), Err(FormatError::UnexpectedEof)));
    }

    #[test]
    fn written_wav_reads_back() {
        let frames = [Frame { left: 16384, right: -16384 }, Frame::silence()];
        let wav = frames_to_wav(&frames, 44100);
        assert_eq!(wav.len(), 44 + 8);
        let (chunk, _) = read_wave_body(&wav, 12).unwrap();
        assert_eq!(chunk.format.channels, 2);
        assert_eq!(chunk.format.sample_rate, 44100);
        assert_eq!(chunk.frames(), 2);

        let mut out = Vec::new();
        write_wav(&mut out, &frames, 44100).unwrap();
        assert_eq!(out, wav);
    }
}
