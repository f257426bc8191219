//! YUV4MPEG2 (.y4m) reader and writer.
//!
//! Uncompressed, frame-exact container used as the video I/O boundary.
//! Only the `Cmono` (one plane) and `C444` (three full-resolution planes)
//! colourspaces are supported: subsampled layouts cannot carry the
//! per-pixel channel bytes the codecs operate on without loss. Planes are
//! interleaved per pixel for the codec layer and split back on write.

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::Path;

use anyhow::{Context, Result, bail};

use vvault::video::{ColorMode, Frame, FrameSink, FrameSource, VideoInfo};

const STREAM_MAGIC: &str = "YUV4MPEG2";
const FRAME_MAGIC: &str = "FRAME";

#[derive(Debug)]
pub struct Y4mReader<R: Read> {
    inner: R,
    info: VideoInfo,
    header_len: u64,
    frames_total: Option<u64>,
    frames_read: u64,
}

impl Y4mReader<BufReader<File>> {
    /// Opens a `.y4m` file; the frame count is derived from the file size
    /// so capacity checks need no scanning pass.
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
        let total_len = file.metadata()?.len();

        let mut reader = Self::new(BufReader::new(file))
            .with_context(|| format!("parsing {}", path.display()))?;

        reader.frames_total = derived_frame_count(
            total_len,
            reader.header_len,
            reader.info.frame_bytes() as u64,
        );
        Ok(reader)
    }
}

impl<R: Read> Y4mReader<R> {
    /// Parses the stream header from an already-open reader.
    ///
    /// Without a known byte length the frame count stays unknown, which
    /// rules the source out as an embed carrier but not as a decode input.
    pub fn new(mut inner: R) -> Result<Self> {
        let Some(header) = read_line(&mut inner)? else {
            bail!("empty stream");
        };

        let mut tokens = header.split_ascii_whitespace();
        if tokens.next() != Some(STREAM_MAGIC) {
            bail!("not a YUV4MPEG2 stream");
        }

        let mut width = None;
        let mut height = None;
        let mut rate = None;
        let mut colour = "420";
        for token in tokens {
            let Some((key, value)) = token.split_at_checked(1) else {
                continue;
            };
            match key {
                "W" => width = value.parse::<u32>().ok(),
                "H" => height = value.parse::<u32>().ok(),
                "F" => rate = parse_ratio(value),
                "C" => colour = value,
                _ => {} // interlacing, aspect, extensions
            }
        }

        let (Some(width), Some(height), Some(rate)) = (width, height, rate) else {
            bail!("stream header is missing geometry or rate");
        };
        if width == 0 || height == 0 || width > 32768 || height > 32768 {
            bail!("implausible frame geometry {width}x{height}");
        }
        let color = match colour {
            "mono" => ColorMode::Gray,
            "444" => ColorMode::Rgb,
            other => bail!(
                "unsupported colourspace C{other}; convert the carrier to C444 or Cmono first"
            ),
        };

        Ok(Self {
            inner,
            info: VideoInfo {
                width,
                height,
                rate,
                color,
            },
            header_len: header.len() as u64 + 1,
            frames_total: None,
            frames_read: 0,
        })
    }

    pub fn video_info(&self) -> VideoInfo {
        self.info
    }

    fn read_frame(&mut self) -> io::Result<Option<Frame>> {
        let Some(marker) = read_line(&mut self.inner)? else {
            return Ok(None);
        };
        if !marker.starts_with(FRAME_MAGIC) {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("expected frame marker, read {marker:?}"),
            ));
        }

        let plane_len = self.info.width as usize * self.info.height as usize;
        let channels = self.info.color.channels();

        let mut data = vec![0u8; plane_len * channels];
        if channels == 1 {
            self.inner.read_exact(&mut data)?;
        } else {
            let mut plane = vec![0u8; plane_len];
            for channel in 0..channels {
                self.inner.read_exact(&mut plane)?;
                for (pixel, &sample) in plane.iter().enumerate() {
                    data[pixel * channels + channel] = sample;
                }
            }
        }

        self.frames_read += 1;
        Ok(Some(Frame { data }))
    }
}

impl<R: Read> FrameSource for Y4mReader<R> {
    fn info(&self) -> VideoInfo {
        self.info
    }

    fn frame_count(&self) -> Option<u64> {
        self.frames_total
            .map(|total| total.saturating_sub(self.frames_read))
    }

    fn next_frame(&mut self) -> io::Result<Option<Frame>> {
        self.read_frame()
    }
}

pub struct Y4mWriter<W: Write> {
    writer: BufWriter<W>,
    info: VideoInfo,
    header_written: bool,
}

impl Y4mWriter<File> {
    pub fn create(path: &Path, info: VideoInfo) -> Result<Self> {
        let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
        Ok(Self::new(file, info))
    }
}

impl<W: Write> Y4mWriter<W> {
    pub fn new(writer: W, info: VideoInfo) -> Self {
        Self {
            writer: BufWriter::new(writer),
            info,
            header_written: false,
        }
    }

}

impl<W: Write> FrameSink for Y4mWriter<W> {
    fn write_frame(&mut self, frame: &Frame) -> io::Result<()> {
        if frame.data.len() != self.info.frame_bytes() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!(
                    "frame holds {} byte(s), stream expects {}",
                    frame.data.len(),
                    self.info.frame_bytes()
                ),
            ));
        }

        if !self.header_written {
            self.writer.write_all(stream_header(&self.info).as_bytes())?;
            self.header_written = true;
        }

        self.writer.write_all(FRAME_MAGIC.as_bytes())?;
        self.writer.write_all(b"\n")?;

        let channels = self.info.color.channels();
        if channels == 1 {
            self.writer.write_all(&frame.data)?;
        } else {
            for channel in 0..channels {
                for pixel in frame.data.chunks_exact(channels) {
                    self.writer.write_all(&[pixel[channel]])?;
                }
            }
        }

        Ok(())
    }

    fn finish(&mut self) -> io::Result<()> {
        // A zero-frame stream still gets its header.
        if !self.header_written {
            self.writer.write_all(stream_header(&self.info).as_bytes())?;
            self.header_written = true;
        }
        self.writer.flush()
    }
}

fn stream_header(info: &VideoInfo) -> String {
    let colour = match info.color {
        ColorMode::Gray => "mono",
        ColorMode::Rgb => "444",
    };
    format!(
        "{STREAM_MAGIC} W{} H{} F{}:{} Ip A1:1 C{colour}\n",
        info.width, info.height, info.rate.0, info.rate.1
    )
}

/// Frame count from the byte length of a regular file: every frame is the
/// 6-byte marker line plus a fixed plane payload.
fn derived_frame_count(total_len: u64, header_len: u64, frame_bytes: u64) -> Option<u64> {
    let body = total_len.checked_sub(header_len)?;
    let per_frame = (FRAME_MAGIC.len() as u64 + 1) + frame_bytes;
    (body % per_frame == 0).then(|| body / per_frame)
}

fn parse_ratio(value: &str) -> Option<(u32, u32)> {
    let (num, den) = value.split_once(':')?;
    Some((num.parse().ok()?, den.parse().ok()?))
}

fn read_line<R: Read>(reader: &mut R) -> io::Result<Option<String>> {
    let mut line = Vec::new();
    let mut byte = [0u8; 1];

    loop {
        match reader.read(&mut byte)? {
            0 if line.is_empty() => return Ok(None),
            0 => break,
            _ if byte[0] == b'\n' => break,
            _ => {
                if line.len() > 512 {
                    return Err(io::Error::new(
                        io::ErrorKind::InvalidData,
                        "header line exceeds 512 bytes",
                    ));
                }
                line.push(byte[0]);
            }
        }
    }

    String::from_utf8(line)
        .map(Some)
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidData, "header line is not UTF-8"))
}

#[cfg(test)]
use std::io::Cursor;

#[test]
fn mono_stream_round_trips() {
    let info = VideoInfo {
        width: 4,
        height: 2,
        rate: (30, 1),
        color: ColorMode::Gray,
    };

    let mut writer = Y4mWriter::new(Vec::new(), info);
    for value in [0u8, 255] {
        writer
            .write_frame(&Frame {
                data: vec![value; 8],
            })
            .unwrap();
    }
    writer.finish().unwrap();
    let bytes = writer.writer.into_inner().unwrap();

    let mut reader = Y4mReader::new(Cursor::new(&bytes[..])).unwrap();
    assert_eq!(reader.video_info(), info);
    assert_eq!(reader.next_frame().unwrap().unwrap().data, vec![0u8; 8]);
    assert_eq!(reader.next_frame().unwrap().unwrap().data, vec![255u8; 8]);
    assert!(reader.next_frame().unwrap().is_none());

    let header_len = stream_header(&info).len() as u64;
    assert_eq!(
        derived_frame_count(bytes.len() as u64, header_len, info.frame_bytes() as u64),
        Some(2)
    );
}

#[test]
fn colour_stream_interleaves_planes() {
    let info = VideoInfo {
        width: 2,
        height: 1,
        rate: (25, 1),
        color: ColorMode::Rgb,
    };

    // Two pixels: (1,2,3) and (4,5,6).
    let frame = Frame {
        data: vec![1, 2, 3, 4, 5, 6],
    };
    let mut writer = Y4mWriter::new(Vec::new(), info);
    writer.write_frame(&frame).unwrap();
    writer.finish().unwrap();
    let bytes = writer.writer.into_inner().unwrap();

    // Planar on the wire...
    let header_len = stream_header(&info).len();
    assert_eq!(&bytes[header_len + 6..], &[1, 4, 2, 5, 3, 6]);

    // ...interleaved again on read.
    let mut reader = Y4mReader::new(Cursor::new(&bytes[..])).unwrap();
    assert_eq!(reader.next_frame().unwrap().unwrap(), frame);
}

#[test]
fn files_round_trip_through_the_lsb_codec() {
    use vvault::process::lsb;

    let dir = tempfile::tempdir().unwrap();
    let carrier_path = dir.path().join("carrier.y4m");
    let produced_path = dir.path().join("produced.y4m");

    // A deterministic 6-frame C444 carrier.
    let info = VideoInfo {
        width: 8,
        height: 4,
        rate: (30, 1),
        color: ColorMode::Rgb,
    };
    let mut writer = Y4mWriter::create(&carrier_path, info).unwrap();
    for index in 0..6usize {
        let data = (0..info.frame_bytes())
            .map(|i| ((index * 53 + i * 11) % 256) as u8)
            .collect();
        writer.write_frame(&Frame { data }).unwrap();
    }
    writer.finish().unwrap();

    let payload = b"file-backed round trip";
    let mut source = Y4mReader::open(&carrier_path).unwrap();
    assert_eq!(source.frame_count(), Some(6));

    let mut sink = Y4mWriter::create(&produced_path, source.video_info()).unwrap();
    lsb::embed(&mut source, &mut sink, payload).unwrap();

    let mut produced = Y4mReader::open(&produced_path).unwrap();
    assert_eq!(produced.frame_count(), Some(6));
    assert_eq!(lsb::extract(&mut produced).unwrap(), payload);
}

#[test]
fn subsampled_carriers_are_rejected() {
    let stream = b"YUV4MPEG2 W4 H4 F30:1 Ip A1:1 C420\nFRAME\n";
    let err = Y4mReader::new(Cursor::new(&stream[..])).unwrap_err();
    assert!(err.to_string().contains("unsupported colourspace"));
}

#[test]
fn foreign_bytes_are_rejected() {
    let err = Y4mReader::new(Cursor::new(&b"RIFF....WAVE"[..])).unwrap_err();
    assert!(err.to_string().contains("not a YUV4MPEG2 stream"));
}
