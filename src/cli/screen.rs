use log::{info, warn};
use tokio::process::Command;
use tokio::time::{Duration, timeout};

const CLEAR: (&str, &[&str]) = ("clear", &[]);
const CLS: (&str, &[&str]) = ("cmd", &["/c", "cls"]);

/// Program and arguments that clear the terminal here, if we know one.
pub fn clear_command() -> Option<(&'static str, &'static [&'static str])> {
    if cfg!(any(target_os = "linux", target_os = "macos")) {
        Some(CLEAR)
    } else if cfg!(windows) {
        Some(CLS)
    } else {
        None
    }
}

/// Best effort: any failure is logged and rendering carries on uncleared.
pub async fn clear_screen(limit: Duration) {
    let Some((program, args)) = clear_command() else {
        info!("Unsupported operating system for clearing the screen.");
        return;
    };

    let status = Command::new(program).args(args).kill_on_drop(true).status();
    match timeout(limit, status).await {
        Ok(Ok(s)) if s.success() => {}
        Ok(Ok(s)) => warn!("Error clearing the screen: {program} exited with {s}"),
        Ok(Err(e)) => warn!("Error clearing the screen: {e}"),
        Err(_) => warn!("Error clearing the screen: {program} timed out after {limit:?}"),
    }
}
