use esh::Shell;
use std::env;
use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;

/// Get home directory
pub(crate) fn dirs_home() -> Option<PathBuf> {
    env::var_os("HOME").map(PathBuf::from)
}

/// ~/.esh_history
pub(crate) fn history_path() -> Option<PathBuf> {
    dirs_home().map(|h| h.join(".esh_history"))
}

/// Run ~/.eshrc line by line if it exists
pub(crate) fn load_eshrc(shell: &mut Shell) {
    let rc_path = match dirs_home() {
        Some(home) => home.join(".eshrc"),
        None => return,
    };

    let file = match File::open(&rc_path) {
        Ok(f) => f,
        Err(_) => return,
    };

    log::debug!("loading {}", rc_path.display());
    shell.run_source(BufReader::new(file));
}
