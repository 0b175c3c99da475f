use crate::config::FunctionSpec;
use crate::engine::invocation::build_invocation;
use crate::engine::{InvocationSpec, ParamBundle, ProcessFailure, ProcessOutcome, ProcessOutput};
use std::io::Read;
use std::process::{Child, Command, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

const POLL_INTERVAL: Duration = Duration::from_millis(10);

pub trait ProcessInvoker: Send + Sync {
    fn invoke(&self, spec: &FunctionSpec, params: &ParamBundle) -> ProcessOutcome;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ScriptRunner;

impl ProcessInvoker for ScriptRunner {
    fn invoke(&self, spec: &FunctionSpec, params: &ParamBundle) -> ProcessOutcome {
        let invocation = build_invocation(spec, params)?;
        info!(
            function = %spec.id,
            command = %invocation.command_form(),
            "executing function"
        );

        let outcome = run_invocation(&invocation);
        match &outcome {
            Ok(output) => info!(
                function = %spec.id,
                elapsed_ms = output.elapsed.as_millis() as u64,
                "function completed"
            ),
            Err(ProcessFailure::Timeout { timeout_seconds }) => warn!(
                function = %spec.id,
                timeout_seconds,
                "function timed out and was killed"
            ),
            Err(ProcessFailure::NonZeroExit { code, .. }) => warn!(
                function = %spec.id,
                exit_code = code,
                "function exited with nonzero status"
            ),
            Err(err) => error!(function = %spec.id, error = %err, "function could not be executed"),
        }
        outcome
    }
}

#[derive(Debug, Clone, Copy)]
enum Stream {
    Stdout,
    Stderr,
}

pub fn run_invocation(invocation: &InvocationSpec) -> ProcessOutcome {
    let path = invocation.program.display().to_string();

    let mut command = Command::new(&invocation.program);
    command
        .args(&invocation.args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        command.process_group(0);
    }

    let mut child = command.spawn().map_err(|source| ProcessFailure::Spawn {
        path: path.clone(),
        source,
    })?;

    let (Some(stdout), Some(stderr)) = (child.stdout.take(), child.stderr.take()) else {
        terminate(&mut child);
        return Err(ProcessFailure::Io {
            path,
            source: std::io::Error::other("missing output pipes"),
        });
    };
    let (sender, receiver) = mpsc::channel();
    spawn_reader(stdout, Stream::Stdout, sender.clone());
    spawn_reader(stderr, Stream::Stderr, sender);

    let start = Instant::now();
    let deadline = start + invocation.timeout;
    loop {
        match leader_exited(&mut child) {
            Ok(true) => break,
            Ok(false) => {
                if Instant::now() >= deadline {
                    terminate(&mut child);
                    // Partial output is discarded; the readers exit once the pipes close.
                    return Err(timed_out(invocation));
                }
                thread::sleep(POLL_INTERVAL);
            }
            Err(source) => {
                terminate(&mut child);
                return Err(ProcessFailure::Io { path, source });
            }
        }
    }
    let elapsed = start.elapsed();

    // The leader is not reaped yet, so its pid still names this process group.
    #[cfg(unix)]
    kill_process_group(child.id());
    let exit_status = child.wait().map_err(|source| ProcessFailure::Io {
        path: path.clone(),
        source,
    })?;

    let Some((stdout, stderr)) = collect_output(&receiver, deadline) else {
        warn!(
            program = %path,
            "output pipes held open past the timeout by a detached process"
        );
        return Err(timed_out(invocation));
    };

    if !exit_status.success() {
        return Err(ProcessFailure::NonZeroExit {
            code: exit_status.code().unwrap_or(-1),
            stderr: stderr.trim().to_string(),
        });
    }

    Ok(ProcessOutput {
        stdout,
        stderr,
        elapsed,
    })
}

fn timed_out(invocation: &InvocationSpec) -> ProcessFailure {
    ProcessFailure::Timeout {
        timeout_seconds: invocation.timeout.as_secs(),
    }
}

fn spawn_reader<R>(mut source: R, stream: Stream, sender: Sender<(Stream, String)>)
where
    R: Read + Send + 'static,
{
    thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = source.read_to_end(&mut buf);
        let _ = sender.send((stream, String::from_utf8_lossy(&buf).into_owned()));
    });
}

/// Waits for both streams to reach EOF, giving up at `deadline`. Returns `None` when a
/// process outside the killed group still holds a pipe open.
fn collect_output(
    receiver: &Receiver<(Stream, String)>,
    deadline: Instant,
) -> Option<(String, String)> {
    let mut stdout = None;
    let mut stderr = None;
    while stdout.is_none() || stderr.is_none() {
        let remaining = deadline.saturating_duration_since(Instant::now());
        match receiver.recv_timeout(remaining) {
            Ok((Stream::Stdout, text)) => stdout = Some(text),
            Ok((Stream::Stderr, text)) => stderr = Some(text),
            Err(RecvTimeoutError::Timeout) => return None,
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }
    Some((stdout.unwrap_or_default(), stderr.unwrap_or_default()))
}

/// Reports whether the script itself has exited, leaving it unreaped where the platform
/// allows so the group can still be signalled safely.
#[cfg(target_os = "linux")]
fn leader_exited(child: &mut Child) -> std::io::Result<bool> {
    use nix::sys::wait::{waitid, Id, WaitPidFlag, WaitStatus};
    use nix::unistd::Pid;

    let raw = i32::try_from(child.id()).map_err(std::io::Error::other)?;
    let flags = WaitPidFlag::WEXITED | WaitPidFlag::WNOHANG | WaitPidFlag::WNOWAIT;
    match waitid(Id::Pid(Pid::from_raw(raw)), flags) {
        Ok(WaitStatus::StillAlive) => Ok(false),
        Ok(_) => Ok(true),
        Err(errno) => Err(std::io::Error::from(errno)),
    }
}

#[cfg(not(target_os = "linux"))]
fn leader_exited(child: &mut Child) -> std::io::Result<bool> {
    child.try_wait().map(|status| status.is_some())
}

fn terminate(child: &mut Child) {
    #[cfg(unix)]
    kill_process_group(child.id());
    let _ = child.kill();
    let _ = child.wait();
}

#[cfg(unix)]
fn kill_process_group(pid: u32) {
    use nix::sys::signal::{killpg, Signal};
    use nix::unistd::Pid;

    let Ok(raw) = i32::try_from(pid) else {
        return;
    };
    let _ = killpg(Pid::from_raw(raw), Signal::SIGKILL);
}
