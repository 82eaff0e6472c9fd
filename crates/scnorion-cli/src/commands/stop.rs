//! `{agents,cert-manager,notifications} stop`: signals the running
//! worker recorded in `PIDFILE` to shut down gracefully, the same file
//! `scnorion_supervisor::pidfile` writes at startup and removes on a
//! clean exit.

use scnorion_supervisor::PIDFILE_NAME;

pub fn run() {
    let pid = match std::fs::read_to_string(PIDFILE_NAME) {
        Ok(contents) => contents.trim().to_owned(),
        Err(e) => {
            tracing::error!(error = %e, pidfile = PIDFILE_NAME, "could not read pidfile");
            std::process::exit(1);
        }
    };

    let status = std::process::Command::new("kill").arg("-TERM").arg(&pid).status();
    match status {
        Ok(status) if status.success() => tracing::info!(pid, "sent SIGTERM"),
        Ok(status) => {
            tracing::error!(pid, code = ?status.code(), "kill exited non-zero");
            std::process::exit(1);
        }
        Err(e) => {
            tracing::error!(error = %e, pid, "could not send SIGTERM");
            std::process::exit(1);
        }
    }
}
