use std::env;

/// Interactive prompt: `[HH:MM:SS] user@host cwd$ `
///
/// A non-zero `last_status` is shown before the directory, `$HOME` is
/// shortened to `~`, and root gets `#`.
pub(crate) fn render(last_status: i32) -> String {
    let time = chrono::Local::now().format("%H:%M:%S");
    let user = env::var("USER").unwrap_or_else(|_| unsafe { libc::geteuid() }.to_string());
    let host = hostname::get()
        .map(|h| h.to_string_lossy().to_string())
        .unwrap_or_default();
    let host = host.split('.').next().unwrap_or_default();

    let cwd = env::current_dir()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|_| "?".to_string());
    let cwd = abbreviate_home(&cwd, env::var("HOME").ok().as_deref());

    let status = if last_status != 0 {
        format!("{} ", last_status)
    } else {
        String::new()
    };
    let sigil = if unsafe { libc::geteuid() } == 0 { '#' } else { '$' };

    format!("[{}] {}@{} {}{}{} ", time, user, host, status, cwd, sigil)
}

fn abbreviate_home(cwd: &str, home: Option<&str>) -> String {
    match home.filter(|h| !h.is_empty() && *h != "/") {
        Some(home) if cwd == home => "~".to_string(),
        Some(home) => match cwd.strip_prefix(home) {
            Some(rest) if rest.starts_with('/') => format!("~{}", rest),
            _ => cwd.to_string(),
        },
        None => cwd.to_string(),
    }
}
