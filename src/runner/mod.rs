use crate::error::{Error, Result};
use log::{debug, info, warn};
use std::fs::File;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

#[cfg(unix)]
use std::os::unix::process::CommandExt;

/// Algorithm variant the runner synthesises with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Hier,
    Base,
}

impl Mode {
    pub fn as_flag(self) -> &'static str {
        match self {
            Mode::Hier => "hier",
            Mode::Base => "base",
        }
    }
}

/// One call of the external benchmark runner.
#[derive(Debug, Clone)]
pub struct Invocation {
    pub group: String,
    pub instance: String,
    pub mode: Mode,
    pub timeout: Duration,
    pub extra_args: Vec<String>,
}

impl Invocation {
    pub fn new(group: &str, instance: &str, mode: Mode, timeout: Duration) -> Self {
        Invocation {
            group: group.to_string(),
            instance: instance.to_string(),
            mode,
            timeout,
            extra_args: Vec::new(),
        }
    }

    pub fn with_args(mut self, args: &[String]) -> Self {
        self.extra_args.extend(args.iter().cloned());
        self
    }

    /// `<group> <instance> <mode> --timeout <secs> [extra...]`
    pub fn args(&self) -> Vec<String> {
        let mut args = vec![
            self.group.clone(),
            self.instance.clone(),
            self.mode.as_flag().to_string(),
            "--timeout".to_string(),
            self.timeout.as_secs().to_string(),
        ];
        args.extend(self.extra_args.iter().cloned());
        args
    }

    fn failure(&self, reason: impl ToString) -> Error {
        Error::RunInvocation {
            group: self.group.clone(),
            instance: self.instance.clone(),
            reason: reason.to_string(),
        }
    }
}

/// Something that can execute a benchmark and leave its output in a log.
///
/// `Ok` means only that the run ended; callers re-read the log to learn
/// whether it produced results.
pub trait Runner {
    fn run(&self, invocation: &Invocation, log_path: &Path) -> Result<()>;
}

/// Runs the benchmark script as a subprocess, blocking until it exits or is
/// killed.
#[derive(Debug, Clone)]
pub struct ScriptRunner {
    program: PathBuf,
    kill_grace: Duration,
    poll_interval: Duration,
}

impl ScriptRunner {
    pub fn new<P: AsRef<Path>>(program: P, kill_grace: Duration, poll_interval: Duration) -> Self {
        ScriptRunner {
            program: program.as_ref().to_path_buf(),
            kill_grace,
            poll_interval,
        }
    }

    fn spawn(&self, invocation: &Invocation, log_path: &Path) -> Result<Child> {
        let stdout = File::create(log_path)?;
        let stderr = stdout.try_clone()?;

        let mut cmd = Command::new(&self.program);
        cmd.args(invocation.args())
            .stdin(Stdio::null())
            .stdout(Stdio::from(stdout))
            .stderr(Stdio::from(stderr));

        // Own process group so a timeout takes the whole tree down.
        #[cfg(unix)]
        cmd.process_group(0);

        cmd.spawn().map_err(|e| invocation.failure(e))
    }
}

fn kill_tree(child: &mut Child) {
    #[cfg(unix)]
    unsafe {
        libc::kill(-(child.id() as i32), libc::SIGKILL);
    }
    #[cfg(not(unix))]
    let _ = child.kill();

    let _ = child.wait();
}

impl Runner for ScriptRunner {
    fn run(&self, invocation: &Invocation, log_path: &Path) -> Result<()> {
        info!("Running bench {}, {}", invocation.group, invocation.instance);
        debug!("{} {:?}", self.program.display(), invocation.args());

        let deadline = invocation.timeout + self.kill_grace;
        let start = Instant::now();
        let mut child = self.spawn(invocation, log_path)?;

        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) => {
                    if start.elapsed() > deadline {
                        kill_tree(&mut child);
                        return Err(Error::Timeout {
                            group: invocation.group.clone(),
                            instance: invocation.instance.clone(),
                            seconds: deadline.as_secs(),
                        });
                    }
                    thread::sleep(self.poll_interval);
                }
                Err(e) => {
                    kill_tree(&mut child);
                    return Err(invocation.failure(e));
                }
            }
        };

        if !status.success() {
            warn!(
                "bench {}, {} exited with {}",
                invocation.group, invocation.instance, status
            );
        }
        info!("Finished.");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn argument_order() {
        let inv = Invocation::new("fwt", "fwt-posts-3", Mode::Base, Duration::from_secs(240));
        assert_eq!(inv.args(), vec!["fwt", "fwt-posts-3", "base", "--timeout", "240"]);

        let flags = vec!["--loclearn".to_string(), "bayesian".to_string()];
        let inv = Invocation::new("g", "i", Mode::Hier, Duration::from_secs(120)).with_args(&flags);
        assert_eq!(
            inv.args(),
            vec!["g", "i", "hier", "--timeout", "120", "--loclearn", "bayesian"]
        );
    }
}
