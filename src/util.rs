//! Persistence helpers and the run time mesh.

use std::{fs, io, path::Path};

use bincode::{config, Decode, Encode};

pub fn save<T: Encode>(path: &Path, data: &T) -> io::Result<()> {
    let encoded = bincode::encode_to_vec(data, config::standard())
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    fs::write(path, encoded)
}

pub fn load<T: Decode<()>>(path: &Path) -> io::Result<T> {
    let bytes = fs::read(path)?;
    let (decoded, _) = bincode::decode_from_slice(&bytes, config::standard())
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    Ok(decoded)
}

/// Uniform time mesh from `start` to `end` in steps of `step`; the final
/// entry is clamped to `end`, so the last interval may be short.
pub fn linear_time_mesh(start: f64, step: f64, end: f64) -> Vec<f64> {
    let mut mesh = Vec::new();
    let mut t = start;
    while t < end {
        mesh.push(t);
        t += step;
    }
    mesh.push(end);
    mesh
}
