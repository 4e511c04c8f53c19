//! Filesystem usage for fixed mount points plus container volumes.

use super::truncate_chars;
use crate::cache::{ReadContext, Source, SourceId};
use crate::error::Result;
use crate::subprocess::{is_permission_message, run_with_timeout};
use std::path::{Path, PathBuf};
use std::time::Duration;

const DEFAULT_MOUNTS: [&str; 2] = ["/", "/home"];
const DOCKER_SOCKET: &str = "/var/run/docker.sock";
const DOCKER_TIMEOUT: Duration = Duration::from_secs(3);
const MAX_VOLUMES: usize = 5;

/// What a [`DiskEntry`] describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiskKind {
    /// A mounted filesystem with known capacity.
    Disk,
    /// A container volume; only its size is known.
    DockerVolume,
}

/// One row of the disk panel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiskEntry {
    /// Mount point or volume name.
    pub mount: String,
    /// Human-readable used size.
    pub used: String,
    /// Human-readable capacity, empty for volumes.
    pub total: String,
    /// Used percentage, 0 for volumes.
    pub percent: u8,
    /// Entry kind.
    pub kind: DiskKind,
}

/// Collects filesystem entries, then container volumes when enabled.
#[derive(Debug)]
pub struct DiskSource {
    mounts: Vec<PathBuf>,
    docker_enabled: bool,
    docker_socket: PathBuf,
}

impl DiskSource {
    /// Watches `/` and `/home`; volumes are listed only if `docker_enabled`.
    pub fn new(docker_enabled: bool) -> Self {
        Self::with_mounts(DEFAULT_MOUNTS.iter().map(PathBuf::from).collect(), docker_enabled)
    }

    /// Watches the given mount points.
    pub fn with_mounts(mounts: Vec<PathBuf>, docker_enabled: bool) -> Self {
        Self { mounts, docker_enabled, docker_socket: PathBuf::from(DOCKER_SOCKET) }
    }

    fn docker_volumes(&self) -> Vec<DiskEntry> {
        if !self.docker_enabled || !self.docker_socket.exists() {
            return Vec::new();
        }
        let result = run_with_timeout("docker", &["system", "df", "-v"], DOCKER_TIMEOUT);
        match result.stdout_string() {
            Some(out) if !is_permission_message(out) && !result.mentions_permission_problem() => parse_volume_section(out),
            _ => Vec::new(),
        }
    }
}

impl Source for DiskSource {
    type Output = Vec<DiskEntry>;

    fn id(&self) -> SourceId {
        SourceId::Disk
    }

    fn read(&mut self, _ctx: &ReadContext) -> Result<Vec<DiskEntry>> {
        let mut entries: Vec<DiskEntry> = self.mounts.iter().filter_map(|m| filesystem_entry(m)).collect();
        entries.extend(self.docker_volumes());
        Ok(entries)
    }

    fn sentinel(&self) -> Vec<DiskEntry> {
        Vec::new()
    }

    fn deferred_at_startup(&self) -> bool {
        true
    }
}

/// Formats bytes with one decimal and a single-letter binary unit.
pub fn format_size(bytes: f64) -> String {
    let mut value = bytes;
    for unit in ["B", "K", "M", "G", "T"] {
        if value < 1024.0 {
            return if unit == "B" { format!("{value:.0}{unit}") } else { format!("{value:.1}{unit}") };
        }
        value /= 1024.0;
    }
    format!("{value:.1}P")
}

/// Used percentage from block counts, truncated.
pub fn used_percent(total_bytes: u64, free_bytes: u64) -> u8 {
    if total_bytes == 0 {
        return 0;
    }
    let used = total_bytes.saturating_sub(free_bytes);
    (used as f64 / total_bytes as f64 * 100.0) as u8
}

fn filesystem_entry(mount: &Path) -> Option<DiskEntry> {
    if !mount.exists() {
        return None;
    }
    let (total, free) = fs_stats(mount)?;
    Some(DiskEntry {
        mount: mount.display().to_string(),
        used: format_size(total.saturating_sub(free) as f64),
        total: format_size(total as f64),
        percent: used_percent(total, free),
        kind: DiskKind::Disk,
    })
}

/// Total and free bytes of the filesystem holding `path`.
#[cfg(target_os = "linux")]
fn fs_stats(path: &Path) -> Option<(u64, u64)> {
    use std::ffi::CString;
    use std::mem::MaybeUninit;
    use std::os::unix::ffi::OsStrExt;

    let path_cstr = CString::new(path.as_os_str().as_bytes()).ok()?;
    let mut stat = MaybeUninit::<libc::statvfs>::uninit();
    // SAFETY: statvfs is a POSIX syscall that initializes the stat buffer on success
    #[allow(unsafe_code)]
    let stat = unsafe {
        if libc::statvfs(path_cstr.as_ptr(), stat.as_mut_ptr()) != 0 {
            return None;
        }
        stat.assume_init()
    };
    let block_size = stat.f_frsize;
    Some((stat.f_blocks * block_size, stat.f_bfree * block_size))
}

#[cfg(not(target_os = "linux"))]
fn fs_stats(_path: &Path) -> Option<(u64, u64)> {
    None
}

/// Rows of the volumes section of `docker system df -v`, at most five.
pub fn parse_volume_section(output: &str) -> Vec<DiskEntry> {
    let mut volumes = Vec::new();
    let mut in_volumes = false;

    for line in output.lines() {
        if line.contains("VOLUME NAME") {
            in_volumes = true;
            continue;
        }
        if !in_volumes {
            continue;
        }
        if line.trim().is_empty() || line.starts_with("REPOSITORY") || line.starts_with("CONTAINER") {
            break;
        }
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() < 2 {
            continue;
        }
        let size = if parts.len() >= 3 { parts[parts.len() - 1] } else { "—" };
        volumes.push(DiskEntry {
            mount: truncate_chars(parts[0], 14),
            used: size.to_string(),
            total: String::new(),
            percent: 0,
            kind: DiskKind::DockerVolume,
        });
    }

    volumes.truncate(MAX_VOLUMES);
    volumes
}
