//! The on-disk binary cache format.
//!
//! ```text
//! offset  size  field
//!  0      4     magic      = 0x315A4353  ('S','C','Z','1')
//!  4      4     version    = 2 (int32)
//!  8      4     count      (int32)
//! 12      …     records
//! ```
//!
//! Each record: `path_len` (i32, >0) + UTF-8 path bytes + `own_size_bytes`
//! (i64) + `total_size_bytes` (i64) + `directory_lwt_utc` ticks (i64) +
//! `updated_utc` ticks (i64) + `check_rate` (f64, binary64). All integers
//! little-endian, independent of host.

use std::collections::HashMap;
use std::io::{self, BufReader, BufWriter, Read, Seek, SeekFrom, Write};

use thiserror::Error;

use crate::entry::{CacheEntry, CACHE_FORMAT_VERSION};
use crate::path_key::NormalizedPath;
use crate::ticks::{datetime_to_ticks, ticks_to_datetime};

pub const MAGIC: u32 = 0x315A_4353;

/// Byte offset of the `count` field, used for the reserve-and-patch write.
const COUNT_OFFSET: u64 = 8;

#[derive(Error, Debug)]
pub enum CodecError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),

    #[error("unrecognized cache header (magic or version mismatch)")]
    UnrecognizedHeader,

    #[error("truncated or malformed record")]
    Malformed,

    #[error("record path was not valid UTF-8")]
    InvalidUtf8,
}

pub type CodecResult<T> = Result<T, CodecError>;

/// Reads a cache file into an entry map. Returns an empty map (never an
/// error) when the header's magic or version don't match — "unknown
/// magic or version causes the loader to treat the file as empty. No
/// in-place migration is attempted."
pub fn read_store<R: Read>(reader: R) -> HashMap<NormalizedPath, CacheEntry> {
    match try_read_store(reader) {
        Ok(entries) => entries,
        Err(err) => {
            log::warn!("cache file unreadable, starting empty: {err}");
            HashMap::new()
        }
    }
}

fn try_read_store<R: Read>(reader: R) -> CodecResult<HashMap<NormalizedPath, CacheEntry>> {
    let mut reader = BufReader::new(reader);

    let magic = read_u32(&mut reader)?;
    let version = read_i32(&mut reader)?;
    if magic != MAGIC || version != CACHE_FORMAT_VERSION {
        return Err(CodecError::UnrecognizedHeader);
    }

    let count = read_i32(&mut reader)?;
    if count < 0 {
        return Err(CodecError::Malformed);
    }

    let mut entries = HashMap::with_capacity(count as usize);
    for _ in 0..count {
        let (path, entry) = read_record(&mut reader)?;
        entries.insert(path, entry);
    }

    Ok(entries)
}

fn read_record<R: Read>(reader: &mut R) -> CodecResult<(NormalizedPath, CacheEntry)> {
    let path_len = read_i32(reader)?;
    if path_len <= 0 {
        return Err(CodecError::Malformed);
    }

    let mut path_bytes = vec![0u8; path_len as usize];
    reader.read_exact(&mut path_bytes)?;
    let path_string = String::from_utf8(path_bytes).map_err(|_| CodecError::InvalidUtf8)?;
    let path = NormalizedPath::new(std::path::Path::new(&path_string)).ok_or(CodecError::Malformed)?;

    let own_size_bytes = read_i64(reader)? as u64;
    let total_size_bytes = read_i64(reader)? as u64;
    let directory_lwt_ticks = read_i64(reader)?;
    let updated_ticks = read_i64(reader)?;
    let check_rate = read_f64(reader)?;

    let entry = CacheEntry::new(
        own_size_bytes,
        total_size_bytes,
        ticks_to_datetime(directory_lwt_ticks),
        ticks_to_datetime(updated_ticks),
        check_rate,
    );

    Ok((path, entry))
}

/// Writes the header and one record per entry in `entries`, reserving the
/// `count` field up front and patching it once the final count is known —
/// avoids buffering the whole store in memory before writing.
pub fn write_store<W: Write + Seek>(
    writer: W,
    entries: impl Iterator<Item = (NormalizedPath, CacheEntry)>,
) -> CodecResult<()> {
    let mut writer = BufWriter::new(writer);

    writer.write_all(&MAGIC.to_le_bytes())?;
    writer.write_all(&CACHE_FORMAT_VERSION.to_le_bytes())?;
    writer.write_all(&0i32.to_le_bytes())?; // placeholder count

    let mut count: i32 = 0;
    for (path, entry) in entries {
        write_record(&mut writer, &path, &entry)?;
        count += 1;
    }

    writer.flush()?;
    writer.seek(SeekFrom::Start(COUNT_OFFSET))?;
    writer.write_all(&count.to_le_bytes())?;
    writer.flush()?;

    Ok(())
}

fn write_record<W: Write>(writer: &mut W, path: &NormalizedPath, entry: &CacheEntry) -> CodecResult<()> {
    let path_bytes = path.display_string().as_bytes();
    writer.write_all(&(path_bytes.len() as i32).to_le_bytes())?;
    writer.write_all(path_bytes)?;
    writer.write_all(&(entry.own_size_bytes as i64).to_le_bytes())?;
    writer.write_all(&(entry.total_size_bytes as i64).to_le_bytes())?;
    writer.write_all(&datetime_to_ticks(entry.directory_lwt_utc).to_le_bytes())?;
    writer.write_all(&datetime_to_ticks(entry.updated_utc).to_le_bytes())?;
    writer.write_all(&entry.check_rate.to_le_bytes())?;
    Ok(())
}

fn read_u32<R: Read>(reader: &mut R) -> io::Result<u32> {
    let mut buf = [0u8; 4];
    reader.read_exact(&mut buf)?;
    Ok(u32::from_le_bytes(buf))
}

fn read_i32<R: Read>(reader: &mut R) -> io::Result<i32> {
    let mut buf = [0u8; 4];
    reader.read_exact(&mut buf)?;
    Ok(i32::from_le_bytes(buf))
}

fn read_i64<R: Read>(reader: &mut R) -> io::Result<i64> {
    let mut buf = [0u8; 8];
    reader.read_exact(&mut buf)?;
    Ok(i64::from_le_bytes(buf))
}

fn read_f64<R: Read>(reader: &mut R) -> io::Result<f64> {
    let mut buf = [0u8; 8];
    reader.read_exact(&mut buf)?;
    Ok(f64::from_le_bytes(buf))
}
