//! Reproducible `tar.gz` of a pack directory.

use flate2::{Compression, GzBuilder};
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::Path;
use tar::{EntryType, Header};
use tracing::info;
use walkdir::WalkDir;

use super::PackError;

/// Every archive entry sits under this directory.
pub const ARCHIVE_ROOT: &str = "demo_pack";

const DIR_MODE: u32 = 0o755;
const FILE_MODE: u32 = 0o644;

fn fixed_header(entry_type: EntryType, mode: u32, size: u64) -> io::Result<Header> {
    let mut header = Header::new_gnu();
    header.set_entry_type(entry_type);
    header.set_mode(mode);
    header.set_size(size);
    header.set_uid(0);
    header.set_gid(0);
    header.set_mtime(0);
    header.set_username("")?;
    header.set_groupname("")?;
    Ok(header)
}

fn write_archive<W: Write>(pack_root: &Path, out: W) -> io::Result<W> {
    let gz = GzBuilder::new().mtime(0).write(out, Compression::default());
    let mut tar = tar::Builder::new(gz);

    let mut root_header = fixed_header(EntryType::Directory, DIR_MODE, 0)?;
    tar.append_data(&mut root_header, format!("{ARCHIVE_ROOT}/"), io::empty())?;

    for entry in WalkDir::new(pack_root).min_depth(1).sort_by_file_name() {
        let entry = entry.map_err(io::Error::from)?;
        let rel = entry
            .path()
            .strip_prefix(pack_root)
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
        let name = rel
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");

        if entry.file_type().is_dir() {
            let mut header = fixed_header(EntryType::Directory, DIR_MODE, 0)?;
            tar.append_data(&mut header, format!("{ARCHIVE_ROOT}/{name}/"), io::empty())?;
        } else if entry.file_type().is_file() {
            let data = fs::read(entry.path())?;
            let mut header = fixed_header(EntryType::Regular, FILE_MODE, data.len() as u64)?;
            tar.append_data(&mut header, format!("{ARCHIVE_ROOT}/{name}"), data.as_slice())?;
        }
    }

    tar.into_inner()?.finish()
}

/// Package `pack_root` into `out_path`. Identical directory contents give
/// identical archive bytes.
pub fn pack_to_tar_gz(pack_root: &Path, out_path: &Path) -> Result<(), PackError> {
    if let Some(parent) = out_path.parent() {
        fs::create_dir_all(parent).map_err(|e| PackError::io(parent, e))?;
    }
    let file = File::create(out_path).map_err(|e| PackError::io(out_path, e))?;
    let mut writer =
        write_archive(pack_root, BufWriter::new(file)).map_err(|e| PackError::io(pack_root, e))?;
    writer.flush().map_err(|e| PackError::io(out_path, e))?;

    info!("Archived {:?} -> {:?}", pack_root, out_path);
    Ok(())
}
