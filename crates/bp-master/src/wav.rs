//! WAV encoding for 16-bit PCM.

use std::io::Write;

use bp_engine::Frame;

/// Convert a mono float render to PCM frames.
pub fn mono_to_frames(samples: &[f32]) -> Vec<Frame> {
    samples.iter().map(|&s| Frame::from_sample(s)).collect()
}

/// Write `frames` as an interleaved 16-bit PCM file with `channels` channels.
///
/// One channel writes the left sample only; more than two repeat the left
/// sample after the stereo pair.
pub fn write_wav(
    w: &mut impl Write,
    frames: &[Frame],
    sample_rate: u32,
    channels: u16,
) -> std::io::Result<()> {
    let channels = channels.max(1);
    let bits_per_sample: u16 = 16;
    let block_align = channels * (bits_per_sample / 8);
    let data_size = frames.len() as u32 * block_align as u32;

    write_riff_header(w, data_size)?;
    write_fmt_chunk(w, channels, sample_rate, block_align, bits_per_sample)?;
    write_data_chunk(w, frames, channels, data_size)
}

fn write_riff_header(w: &mut impl Write, data_size: u32) -> std::io::Result<()> {
    w.write_all(b"RIFF")?;
    w.write_all(&(36 + data_size).to_le_bytes())?;
    w.write_all(b"WAVE")
}

fn write_fmt_chunk(
    w: &mut impl Write,
    channels: u16,
    sample_rate: u32,
    block_align: u16,
    bits_per_sample: u16,
) -> std::io::Result<()> {
    w.write_all(b"fmt ")?;
    w.write_all(&16u32.to_le_bytes())?;
    w.write_all(&1u16.to_le_bytes())?;
    w.write_all(&channels.to_le_bytes())?;
    w.write_all(&sample_rate.to_le_bytes())?;
    w.write_all(&(sample_rate * block_align as u32).to_le_bytes())?;
    w.write_all(&block_align.to_le_bytes())?;
    w.write_all(&bits_per_sample.to_le_bytes())
}

fn write_data_chunk(
    w: &mut impl Write,
    frames: &[Frame],
    channels: u16,
    data_size: u32,
) -> std::io::Result<()> {
    w.write_all(b"data")?;
    w.write_all(&data_size.to_le_bytes())?;
    for frame in frames {
        w.write_all(&frame.left.to_le_bytes())?;
        if channels >= 2 {
            w.write_all(&frame.right.to_le_bytes())?;
        }
        for _ in 2..channels {
            w.write_all(&frame.left.to_le_bytes())?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn u16_at(buf: &[u8], at: usize) -> u16 {
        u16::from_le_bytes([buf[at], buf[at + 1]])
    }

    fn samples_to_wav(samples: &[f32], sample_rate: u32, channels: u16) -> Vec<u8> {
        let mut buf = Vec::new();
        write_wav(&mut buf, &mono_to_frames(samples), sample_rate, channels).unwrap();
        buf
    }

    fn u32_at(buf: &[u8], at: usize) -> u32 {
        u32::from_le_bytes([buf[at], buf[at + 1], buf[at + 2], buf[at + 3]])
    }

    #[test]
    fn header_describes_stereo_pcm() {
        let wav = samples_to_wav(&[0.0; 100], 44100, 2);
        assert_eq!(&wav[0..4], b"RIFF");
        assert_eq!(&wav[8..12], b"WAVE");
        assert_eq!(&wav[12..16], b"fmt ");
        assert_eq!(u16_at(&wav, 20), 1);
        assert_eq!(u16_at(&wav, 22), 2);
        assert_eq!(u32_at(&wav, 24), 44100);
        assert_eq!(u32_at(&wav, 28), 44100 * 4);
        assert_eq!(u16_at(&wav, 32), 4);
        assert_eq!(u16_at(&wav, 34), 16);
        assert_eq!(&wav[36..40], b"data");
        assert_eq!(u32_at(&wav, 40), 400);
        assert_eq!(wav.len(), 44 + 400);
        assert_eq!(u32_at(&wav, 4) as usize, wav.len() - 8);
    }

    #[test]
    fn mono_file_has_one_sample_per_frame() {
        let wav = samples_to_wav(&[1.0, -1.0], 8000, 1);
        assert_eq!(u16_at(&wav, 22), 1);
        assert_eq!(wav.len(), 44 + 4);
        assert_eq!(i16::from_le_bytes([wav[44], wav[45]]), 32767);
        assert_eq!(i16::from_le_bytes([wav[46], wav[47]]), -32767);
    }

    #[test]
    fn stereo_duplicates_the_mono_signal() {
        let wav = samples_to_wav(&[0.5], 8000, 2);
        let left = i16::from_le_bytes([wav[44], wav[45]]);
        let right = i16::from_le_bytes([wav[46], wav[47]]);
        assert_eq!(left, right);
        assert_eq!(left, 16383);
    }
}
