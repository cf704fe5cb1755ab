//! Compressed archive persistence for lookup tables.
//!
//! The on-disk format is an `.npz` archive: a zip container whose
//! members are `.npy` arrays, plus a JSON member for the projection
//! parameters (the legacy writer pickled those, which has no portable
//! equivalent). Layout detection works on member names so current and
//! legacy field sets can be dispatched by the callers.

use crate::types::GeoResult;
use ndarray::{ArrayBase, Data, Dimension};
use ndarray_npy::{ReadNpyExt, ReadableElement, WritableElement, WriteNpyExt};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

/// Reader for an `.npz` lookup-table archive.
pub struct NpzReader {
    archive: ZipArchive<BufReader<File>>,
}

impl NpzReader {
    pub fn open<P: AsRef<Path>>(path: P) -> GeoResult<Self> {
        let file = File::open(path.as_ref())?;
        let archive = ZipArchive::new(BufReader::new(file))?;
        Ok(Self { archive })
    }

    /// Whether the archive carries the named field (array or JSON).
    pub fn contains(&self, field: &str) -> bool {
        let npy = format!("{}.npy", field);
        let json = format!("{}.json", field);
        self.archive
            .file_names()
            .any(|name| name == npy || name == json)
    }

    /// Whether all named fields are present.
    pub fn contains_all(&self, fields: &[&str]) -> bool {
        fields.iter().all(|field| self.contains(field))
    }

    /// Read an array field of the given element type and dimension.
    pub fn array<A, D>(&mut self, field: &str) -> GeoResult<ndarray::Array<A, D>>
    where
        A: ReadableElement,
        D: Dimension,
    {
        let entry = self.archive.by_name(&format!("{}.npy", field))?;
        Ok(ndarray::Array::<A, D>::read_npy(entry)?)
    }

    /// Read a 0-dimensional scalar field.
    pub fn scalar(&mut self, field: &str) -> GeoResult<f64> {
        let arr: ndarray::Array0<f64> = self.array(field)?;
        Ok(arr.into_scalar())
    }

    /// Read and deserialize a JSON field.
    pub fn json<T: DeserializeOwned>(&mut self, field: &str) -> GeoResult<T> {
        let mut entry = self.archive.by_name(&format!("{}.json", field))?;
        let mut contents = String::new();
        entry.read_to_string(&mut contents)?;
        Ok(serde_json::from_str(&contents)?)
    }
}

/// Writer producing a deflate-compressed `.npz` archive.
pub struct NpzWriter {
    zip: ZipWriter<BufWriter<File>>,
}

impl NpzWriter {
    pub fn create<P: AsRef<Path>>(path: P) -> GeoResult<Self> {
        let file = File::create(path.as_ref())?;
        Ok(Self {
            zip: ZipWriter::new(BufWriter::new(file)),
        })
    }

    fn options() -> FileOptions {
        FileOptions::default().compression_method(CompressionMethod::Deflated)
    }

    pub fn add_array<A, S, D>(&mut self, field: &str, array: &ArrayBase<S, D>) -> GeoResult<()>
    where
        A: WritableElement,
        S: Data<Elem = A>,
        D: Dimension,
    {
        self.zip.start_file(format!("{}.npy", field), Self::options())?;
        array.write_npy(&mut self.zip)?;
        Ok(())
    }

    pub fn add_scalar(&mut self, field: &str, value: f64) -> GeoResult<()> {
        self.add_array(field, &ndarray::arr0(value))
    }

    pub fn add_json<T: Serialize>(&mut self, field: &str, value: &T) -> GeoResult<()> {
        self.zip
            .start_file(format!("{}.json", field), Self::options())?;
        let contents = serde_json::to_string_pretty(value)?;
        self.zip.write_all(contents.as_bytes())?;
        Ok(())
    }

    pub fn finish(mut self) -> GeoResult<()> {
        self.zip.finish()?;
        Ok(())
    }
}
