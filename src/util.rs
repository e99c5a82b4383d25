//! Working-directory lifecycle and subprocess execution with timeouts.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};
use std::thread;
use std::time::{Duration, Instant};

/// The default working-directory name. The process id keeps parallel
/// compilations from clobbering each other's temporary files.
pub fn default_workdir_name() -> String {
    format!("__workdir__.{}", std::process::id())
}

/// Scoped working directory: created fresh on construction, removed on
/// drop (including error paths) unless `keep` was requested.
#[derive(Debug)]
pub struct Workdir {
    path: PathBuf,
    keep: bool,
}

impl Workdir {
    /// Remove any stale file or directory at `path` and create it fresh.
    pub fn create(path: &Path, keep: bool) -> io::Result<Workdir> {
        if path.is_file() {
            fs::remove_file(path)?;
        } else if path.is_dir() {
            fs::remove_dir_all(path)?;
        }
        fs::create_dir_all(path)?;
        Ok(Workdir {
            path: path.to_path_buf(),
            keep,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for Workdir {
    fn drop(&mut self) {
        if !self.keep {
            let _ = fs::remove_dir_all(&self.path);
        }
    }
}

/// Run `cmd` to completion with a timeout, capturing stdout and stderr.
///
/// Returns `Ok(None)` when the timeout fires; the child is killed and
/// reaped before returning. External tool output here is small (a solver
/// verdict, a saturation status line), so output is collected after exit.
pub fn run_with_timeout(cmd: &mut Command, timeout: Duration) -> io::Result<Option<Output>> {
    cmd.stdin(Stdio::null()).stdout(Stdio::piped()).stderr(Stdio::piped());
    let mut child = cmd.spawn()?;
    let deadline = Instant::now() + timeout;
    loop {
        if child.try_wait()?.is_some() {
            return child.wait_with_output().map(Some);
        }
        if Instant::now() >= deadline {
            let _ = child.kill();
            let _ = child.wait();
            return Ok(None);
        }
        thread::sleep(Duration::from_millis(20));
    }
}
