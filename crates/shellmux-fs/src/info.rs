//! File metadata parsed from `ls --full-time` output

use crate::{FsError, Result};
use chrono::{DateTime, Utc};
use std::path::Path;

/// Socket
pub const S_IFSOCK: u32 = 0o140000;
/// Symbolic link
pub const S_IFLNK: u32 = 0o120000;
/// Regular file
pub const S_IFREG: u32 = 0o100000;
/// Block device
pub const S_IFBLK: u32 = 0o060000;
/// Directory
pub const S_IFDIR: u32 = 0o040000;
/// Character device
pub const S_IFCHR: u32 = 0o020000;
/// Named pipe
pub const S_IFIFO: u32 = 0o010000;
/// Mask for the file type bits
pub const S_IFMT: u32 = 0o170000;

const S_ISUID: u32 = 0o4000;
const S_ISGID: u32 = 0o2000;
const S_ISVTX: u32 = 0o1000;

/// Metadata of one remote file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileInfo {
    /// Name as listed (a bare name for directory entries)
    pub name: String,
    /// Size in bytes, zero for devices
    pub size: u64,
    /// Unix mode: file type, special bits and permissions
    pub mode: u32,
    /// Last modification time
    pub modified: DateTime<Utc>,
    /// Whether this is a directory
    pub is_dir: bool,
    /// Target of a symbolic link
    pub link_target: Option<String>,
}

impl FileInfo {
    /// Permission and special bits without the file type
    pub fn permissions(&self) -> u32 {
        self.mode & 0o7777
    }

    /// File type bits, compare against the `S_IF*` constants
    pub fn file_type(&self) -> u32 {
        self.mode & S_IFMT
    }

    /// Whether this is a symbolic link
    pub fn is_symlink(&self) -> bool {
        self.file_type() == S_IFLNK
    }

    /// Whether this is a regular file
    pub fn is_file(&self) -> bool {
        self.file_type() == S_IFREG
    }

    /// Replace the listed name with its final path component
    pub(crate) fn into_base_name(mut self) -> Self {
        if let Some(base) = Path::new(&self.name).file_name() {
            self.name = base.to_string_lossy().into_owned();
        }
        self
    }
}

/// Parse one line of `TZ=UTC0 ls -l --full-time` output
///
/// ```text
/// -rw-r--r-- 1 user group 1234 2024-01-02 03:04:05.123456789 +0000 name
/// ```
///
/// Device entries carry `major, minor` in place of the size and are
/// reported with size zero. Owner and group names must not contain spaces.
pub fn parse_ls_line(line: &str) -> Result<FileInfo> {
    let mut rest = line.trim_end_matches(['\n', '\r']);

    let perms = next_field(&mut rest).ok_or_else(|| FsError::parse(line))?;
    let mode = parse_mode(perms).ok_or_else(|| FsError::parse(line))?;

    // links, owner, group
    for _ in 0..3 {
        next_field(&mut rest).ok_or_else(|| FsError::parse(line))?;
    }

    let size_field = next_field(&mut rest).ok_or_else(|| FsError::parse(line))?;
    let size = if size_field.ends_with(',') {
        next_field(&mut rest).ok_or_else(|| FsError::parse(line))?;
        0
    } else {
        size_field.parse().map_err(|_| FsError::parse(line))?
    };

    let date = next_field(&mut rest).ok_or_else(|| FsError::parse(line))?;
    let time = next_field(&mut rest).ok_or_else(|| FsError::parse(line))?;
    let zone = next_field(&mut rest).ok_or_else(|| FsError::parse(line))?;
    let modified = DateTime::parse_from_str(&format!("{} {} {}", date, time, zone), "%Y-%m-%d %H:%M:%S%.f %z")
        .map_err(|_| FsError::parse(line))?
        .with_timezone(&Utc);

    let listed = rest.strip_prefix(' ').unwrap_or(rest);
    if listed.is_empty() {
        return Err(FsError::parse(line));
    }

    let (name, link_target) = match listed.split_once(" -> ") {
        Some((name, target)) if mode & S_IFMT == S_IFLNK => (name, Some(target.to_string())),
        _ => (listed, None),
    };

    Ok(FileInfo {
        name: name.to_string(),
        size,
        mode,
        modified,
        is_dir: mode & S_IFMT == S_IFDIR,
        link_target,
    })
}

/// Split off the next whitespace-delimited field
fn next_field<'a>(rest: &mut &'a str) -> Option<&'a str> {
    let trimmed = rest.trim_start_matches(' ');
    let end = trimmed.find(' ').unwrap_or(trimmed.len());
    if end == 0 {
        return None;
    }
    let (field, remainder) = trimmed.split_at(end);
    *rest = remainder;
    Some(field)
}

/// Turn `drwxr-sr-t` style permissions into a unix mode
fn parse_mode(perms: &str) -> Option<u32> {
    let bytes = perms.as_bytes();
    if bytes.len() < 10 {
        return None;
    }

    let mut mode = match bytes[0] {
        b'-' => S_IFREG,
        b'd' => S_IFDIR,
        b'l' => S_IFLNK,
        b'c' => S_IFCHR,
        b'b' => S_IFBLK,
        b'p' => S_IFIFO,
        b's' => S_IFSOCK,
        _ => return None,
    };

    // owner, group, other
    let triads = [(6, S_ISUID, b's'), (3, S_ISGID, b's'), (0, S_ISVTX, b't')];
    for (i, (shift, special, marker)) in triads.into_iter().enumerate() {
        let chunk = &bytes[1 + i * 3..4 + i * 3];
        let mut bits = 0;
        match chunk[0] {
            b'r' => bits |= 0o4,
            b'-' => {}
            _ => return None,
        }
        match chunk[1] {
            b'w' => bits |= 0o2,
            b'-' => {}
            _ => return None,
        }
        match chunk[2] {
            b'x' => bits |= 0o1,
            b'-' => {}
            c if c == marker => {
                bits |= 0o1;
                mode |= special;
            }
            c if c == marker.to_ascii_uppercase() => mode |= special,
            _ => return None,
        }
        mode |= bits << shift;
    }

    Some(mode)
}
