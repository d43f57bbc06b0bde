//! Staged detector input audio.
//!
//! The Vesper server delivers recording samples in chunks of arbitrary
//! size, while the Nighthawk engine reads a single audio file. The stager
//! accumulates the chunks into a temporary mono 16-bit PCM WAV file that
//! is handed to the engine by path and deleted after the engine has
//! consumed it.

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use hound::{SampleFormat, WavSpec, WavWriter};
use tempfile::TempPath;

use crate::error::{Error, Result};

/// Append-only writer of staged detector input audio.
///
/// The backing file is created at construction, appended to by any number
/// of [`append`](Self::append) calls, and sealed exactly once before the
/// engine runs. The file is deleted when the stager is dropped, on every
/// exit path.
pub struct AudioStager {
    path: TempPath,
    writer: Option<WavWriter<BufWriter<File>>>,
}

impl AudioStager {
    /// Create a stager writing single-channel 16-bit PCM at the given
    /// sample rate.
    pub fn new(sample_rate: u32) -> Result<Self> {
        let file = tempfile::Builder::new()
            .prefix("vesper-nighthawk-")
            .suffix(".wav")
            .tempfile()
            .map_err(|e| Error::InputCreate { source: e })?;

        // The engine opens the file by path, so close our handle and keep
        // only the self-deleting path.
        let path = file.into_temp_path();

        let spec = WavSpec {
            channels: 1,
            sample_rate,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };

        let writer = WavWriter::create(&path, spec).map_err(|e| Error::InputWrite {
            path: path.to_path_buf(),
            source: e,
        })?;

        Ok(Self {
            path,
            writer: Some(writer),
        })
    }

    /// Append a chunk of samples.
    ///
    /// Samples are amplitudes in 16-bit scale; each is rounded to the
    /// nearest integer and saturated into `i16`. Chunk boundaries do not
    /// affect the staged content: appending a recording one sample at a
    /// time or all at once yields identical files.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InputSealed`] if called after [`seal`](Self::seal).
    pub fn append(&mut self, samples: &[f32]) -> Result<()> {
        let writer = self.writer.as_mut().ok_or(Error::InputSealed)?;

        for &sample in samples {
            #[allow(clippy::cast_possible_truncation)]
            let value = sample.round() as i16;
            writer.write_sample(value).map_err(|e| Error::InputWrite {
                path: self.path.to_path_buf(),
                source: e,
            })?;
        }

        Ok(())
    }

    /// Seal the staged audio, finalizing the WAV header. Further
    /// [`append`](Self::append) calls fail with [`Error::InputSealed`].
    pub fn seal(&mut self) -> Result<()> {
        let writer = self.writer.take().ok_or(Error::InputSealed)?;
        writer.finalize().map_err(|e| Error::InputWrite {
            path: self.path.to_path_buf(),
            source: e,
        })
    }

    /// Whether the staged audio has been sealed.
    #[must_use]
    pub fn is_sealed(&self) -> bool {
        self.writer.is_none()
    }

    /// Path of the staged audio file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}
