//! Program lookup on the executable search path.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};

/// Resolve the program named by `argv[0]` the way a typical shell would.
///
/// Behavior:
/// - Absolute path: returns it if it is an executable file.
/// - Anything containing a `/` (`./foo`, `bin/sh`): resolved against `cwd`,
///   returned if it is an executable file. `PATH` is not consulted.
/// - Bare name: each directory of `search_paths` is tried in order; relative
///   entries are taken relative to `cwd`.
/// - Empty name: `None`.
pub fn find_program(search_paths: Option<&OsStr>, cwd: &Path, program: &str) -> Option<PathBuf> {
    if program.is_empty() {
        return None;
    }
    let path = Path::new(program);
    if path.is_absolute() {
        return is_executable(path).then(|| path.to_path_buf());
    }
    if program.contains('/') {
        let candidate = cwd.join(path);
        return is_executable(&candidate).then_some(candidate);
    }

    let search_paths = search_paths?;
    std::env::split_paths(search_paths)
        .map(|dir| {
            let dir = if dir.is_absolute() { dir } else { cwd.join(dir) };
            dir.join(program)
        })
        .find(|candidate| is_executable(candidate))
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}
