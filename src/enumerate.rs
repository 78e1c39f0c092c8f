//! Lists the audio server's MIDI ports for the `ports` subcommand.
//! Adapted from the teacher's `enumerate::midi`/`enumerate::audio`
//! (including its stderr-suppression trick for noisy client libraries),
//! swapping `midir`/`cpal` for the `jack` crate this engine actually
//! talks to.

pub fn midi_ports() -> anyhow::Result<()> {
    let stderr_guard = suppress_stderr();

    let (client, _status) = jack::Client::new(
        "zynmidi-router-enumerate",
        jack::ClientOptions::NO_START_SERVER,
    )?;
    let ports = client.ports(None, Some("midi"), jack::PortFlags::empty());

    let _ = stderr_guard;

    println!("=== MIDI Ports ===");
    if ports.is_empty() {
        println!("  (none found)");
    }
    for port in &ports {
        println!("  {port}");
    }
    Ok(())
}

/// Temporarily redirect stderr to /dev/null to suppress JACK client spam
/// during connection. Returns a guard that restores stderr on drop. No-op
/// on non-Unix platforms.
#[cfg(unix)]
fn suppress_stderr() -> Option<StderrGuard> {
    use std::os::unix::io::AsRawFd;
    let devnull = std::fs::File::open("/dev/null").ok()?;
    let stderr_fd = std::io::stderr().as_raw_fd();
    let saved = unsafe { libc::dup(stderr_fd) };
    if saved < 0 {
        return None;
    }
    unsafe { libc::dup2(devnull.as_raw_fd(), stderr_fd) };
    Some(StderrGuard { saved_fd: saved })
}

#[cfg(unix)]
struct StderrGuard {
    saved_fd: i32,
}

#[cfg(unix)]
impl Drop for StderrGuard {
    fn drop(&mut self) {
        use std::os::unix::io::AsRawFd;
        let stderr_fd = std::io::stderr().as_raw_fd();
        unsafe {
            libc::dup2(self.saved_fd, stderr_fd);
            libc::close(self.saved_fd);
        }
    }
}

#[cfg(not(unix))]
fn suppress_stderr() -> Option<()> {
    None
}
