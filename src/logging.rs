use log::LevelFilter;
use simplelog::{ConfigBuilder, WriteLogger};
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};

/// ~/.local/share/cellsh/cellsh.log
pub fn default_log_path() -> Option<PathBuf> {
    let home = std::env::var_os("HOME")?;
    Some(Path::new(&home).join(".local/share/cellsh/cellsh.log"))
}

/// Route the `log` macros to an append-only file.
///
/// Best-effort: when the file cannot be opened or a logger is already
/// installed, the shell runs without a log. Returns whether logging is on.
pub fn init(level: LevelFilter, path: Option<&Path>) -> bool {
    if level == LevelFilter::Off {
        return false;
    }
    let Some(path) = path.map(Path::to_path_buf).or_else(default_log_path) else {
        return false;
    };
    if let Some(dir) = path.parent() {
        let _ = fs::create_dir_all(dir);
    }
    let Ok(file) = OpenOptions::new().create(true).append(true).open(&path) else {
        return false;
    };

    let config = ConfigBuilder::new()
        .set_time_format_rfc3339()
        .set_thread_level(LevelFilter::Off)
        .build();
    WriteLogger::init(level, config, file).is_ok()
}
