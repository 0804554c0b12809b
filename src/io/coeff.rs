//! Persisted Green's-function coefficients.
//!
//! File layout (`{dir}/{name}_coeff.dat`, little endian, no header):
//!
//! ```text
//! f64                 ground-state energy
//! (f64, f64) * count  complex coefficients, (i, j, h, {c, a, b}, step) row-major
//! ```
//!
//! A file whose element count differs from the expected one is stale and is
//! reported as absent.

use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use num_complex::Complex;
use tracing::{info, warn};

use crate::math::{CScalar, Scalar};

const WORD: usize = std::mem::size_of::<f64>();

/// Location of one model's coefficient file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoefficientStore {
    path: PathBuf,
}

impl CoefficientStore {
    /// Store for the model identity `name` inside `dir`.
    #[must_use]
    pub fn new(dir: impl AsRef<Path>, name: &str) -> Self {
        Self {
            path: dir.as_ref().join(format!("{name}_coeff.dat")),
        }
    }

    /// File path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the ground energy and `expected` coefficients.
    ///
    /// Returns `Ok(None)` when the file does not exist or holds a different
    /// number of coefficients.
    pub fn load(&self, expected: usize) -> io::Result<Option<(Scalar, Vec<CScalar>)>> {
        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err),
        };
        let mut bytes = Vec::new();
        BufReader::new(file).read_to_end(&mut bytes)?;
        if bytes.len() < WORD || (bytes.len() - WORD) % (2 * WORD) != 0 {
            warn!(path = %self.path.display(), bytes = bytes.len(), "discarding malformed coefficient file");
            return Ok(None);
        }
        let count = (bytes.len() - WORD) / (2 * WORD);
        if count != expected {
            warn!(path = %self.path.display(), count, expected, "discarding coefficient file of wrong length");
            return Ok(None);
        }

        let mut words = bytes.chunks_exact(WORD).map(|chunk| {
            let mut raw = [0u8; WORD];
            raw.copy_from_slice(chunk);
            f64::from_le_bytes(raw)
        });
        let gse = words.next().unwrap_or(Scalar::NAN);
        let mut data = Vec::with_capacity(count);
        while let (Some(re), Some(im)) = (words.next(), words.next()) {
            data.push(Complex::new(re, im));
        }
        info!(path = %self.path.display(), count, "loaded green function coefficients");
        Ok(Some((gse, data)))
    }

    /// Writes the ground energy and coefficients through a temporary file and a rename.
    pub fn save(&self, gse: Scalar, data: &[CScalar]) -> io::Result<()> {
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir)?;
        }
        let tmp = self.path.with_extension("dat.tmp");
        {
            let mut writer = BufWriter::new(File::create(&tmp)?);
            writer.write_all(&gse.to_le_bytes())?;
            for value in data {
                writer.write_all(&value.re.to_le_bytes())?;
                writer.write_all(&value.im.to_le_bytes())?;
            }
            writer.flush()?;
        }
        fs::rename(&tmp, &self.path)?;
        info!(path = %self.path.display(), count = data.len(), "saved green function coefficients");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch(tag: &str) -> PathBuf {
        std::env::temp_dir().join(format!("ed-physics-{tag}-{}", std::process::id()))
    }

    #[test]
    fn round_trip_is_bit_exact() {
        let dir = scratch("roundtrip");
        let store = CoefficientStore::new(&dir, "chain_t_-1");
        let data: Vec<CScalar> = (0..12).map(|k| Complex::new(k as f64 / 3.0, -0.1 * k as f64)).collect();
        store.save(-1.234_567_890_123, &data).expect("writable temp dir");

        let (gse, loaded) = store.load(data.len()).expect("readable").expect("present");
        assert_eq!(gse.to_bits(), (-1.234_567_890_123f64).to_bits());
        assert_eq!(loaded, data);
        assert!(store.path().ends_with("chain_t_-1_coeff.dat"));
        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn wrong_length_is_reported_absent() {
        let dir = scratch("length");
        let store = CoefficientStore::new(&dir, "m");
        store.save(0.5, &[Complex::new(1.0, 0.0); 4]).expect("writable temp dir");
        assert!(store.load(6).expect("readable").is_none());
        assert!(store.load(4).expect("readable").is_some());
        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn missing_file_is_absent() {
        let store = CoefficientStore::new(scratch("missing"), "nothing");
        assert!(store.load(1).expect("no io error").is_none());
    }
}
