//! Supervision of the bundled Node program in run mode.
//!
//! On every rebuild the running child is interrupted, given a grace period
//! to exit, killed if it overstays, and replaced by a fresh `node <artifact>`.
//! Two children never run at the same time.

use async_trait::async_trait;
use hearth_bundler::BuildResult;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use crate::dev::RebuildHandler;
use crate::error::{Result, SupervisorError};
use crate::logger::Logger;

/// How long an interrupted child gets before it is killed.
pub const DEFAULT_GRACE: Duration = Duration::from_secs(5);

/// A running child process.
#[async_trait]
pub trait SupervisedProcess: Send {
    /// Ask the process to stop (SIGINT on unix).
    fn interrupt(&mut self) -> std::io::Result<()>;

    /// Wait up to `grace` for the process to exit. Returns whether it did.
    async fn wait_for_exit(&mut self, grace: Duration) -> bool;

    /// Force the process down and reap it.
    async fn kill(&mut self) -> std::io::Result<()>;
}

/// Starts processes for an artifact.
pub trait Launcher: Send + Sync {
    type Process: SupervisedProcess;

    fn launch(&self, artifact: &Path) -> std::io::Result<Self::Process>;
}

/// Runs artifacts with `node`, sharing this process's stdio.
#[derive(Debug, Clone)]
pub struct NodeLauncher {
    program: String,
}

impl Default for NodeLauncher {
    fn default() -> Self {
        Self {
            program: "node".to_string(),
        }
    }
}

impl NodeLauncher {
    /// Launcher for a different Node-compatible runtime.
    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Launcher for NodeLauncher {
    type Process = tokio::process::Child;

    fn launch(&self, artifact: &Path) -> std::io::Result<Self::Process> {
        tokio::process::Command::new(&self.program)
            .arg(artifact)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
    }
}

#[async_trait]
impl SupervisedProcess for tokio::process::Child {
    #[cfg(unix)]
    fn interrupt(&mut self) -> std::io::Result<()> {
        use nix::sys::signal::{Signal, kill};
        use nix::unistd::Pid;

        // Already reaped: nothing to interrupt.
        let Some(pid) = self.id() else {
            return Ok(());
        };
        match kill(Pid::from_raw(pid as i32), Signal::SIGINT) {
            Ok(()) | Err(nix::errno::Errno::ESRCH) => Ok(()),
            Err(errno) => Err(std::io::Error::from(errno)),
        }
    }

    #[cfg(not(unix))]
    fn interrupt(&mut self) -> std::io::Result<()> {
        self.start_kill()
    }

    async fn wait_for_exit(&mut self, grace: Duration) -> bool {
        tokio::time::timeout(grace, self.wait()).await.is_ok()
    }

    async fn kill(&mut self) -> std::io::Result<()> {
        tokio::process::Child::kill(self).await
    }
}

/// Keeps exactly one child running the latest artifact.
pub struct ProcessSupervisor<L: Launcher> {
    launcher: L,
    artifact: PathBuf,
    current: Option<L::Process>,
    grace: Duration,
    logger: Logger,
}

impl<L: Launcher> ProcessSupervisor<L> {
    pub fn new(launcher: L, artifact: impl Into<PathBuf>, logger: Logger) -> Self {
        Self {
            launcher,
            artifact: artifact.into(),
            current: None,
            grace: DEFAULT_GRACE,
            logger,
        }
    }

    pub fn with_grace(mut self, grace: Duration) -> Self {
        self.grace = grace;
        self
    }

    pub fn artifact(&self) -> &Path {
        &self.artifact
    }

    pub fn is_running(&self) -> bool {
        self.current.is_some()
    }

    /// Stop the current child, if any, then start a new one.
    pub async fn restart(&mut self) -> Result<()> {
        self.stop().await?;

        tracing::debug!(artifact = %self.artifact.display(), "starting child");
        let child = self
            .launcher
            .launch(&self.artifact)
            .map_err(|source| SupervisorError::Spawn {
                artifact: self.artifact.clone(),
                source,
            })?;
        self.current = Some(child);
        Ok(())
    }

    /// Interrupt the current child and wait for it to go away.
    pub async fn stop(&mut self) -> Result<()> {
        let Some(mut child) = self.current.take() else {
            return Ok(());
        };

        child.interrupt().map_err(|source| SupervisorError::Signal {
            artifact: self.artifact.clone(),
            source,
        })?;

        if !child.wait_for_exit(self.grace).await {
            self.logger.warn(&format!(
                "{} did not exit within {}s, killing it",
                self.artifact.display(),
                self.grace.as_secs()
            ));
            if let Err(e) = child.kill().await {
                tracing::warn!(error = %e, "failed to kill child");
            }
        }
        Ok(())
    }
}

#[async_trait]
impl<L> RebuildHandler for ProcessSupervisor<L>
where
    L: Launcher,
    L::Process: Send,
{
    async fn on_rebuild(&mut self, result: &BuildResult) -> Result<()> {
        for diagnostic in &result.errors {
            self.logger.error(&diagnostic.to_string());
        }
        self.restart().await
    }

    async fn on_shutdown(&mut self) -> Result<()> {
        self.stop().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hearth_bundler::Diagnostic;
    use parking_lot::Mutex;
    use std::sync::Arc;

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Event {
        Launch(usize),
        Interrupt(usize),
        Kill(usize),
    }

    #[derive(Debug, Default, Clone)]
    struct Recorder {
        events: Arc<Mutex<Vec<Event>>>,
    }

    struct FakeProcess {
        id: usize,
        exits_on_interrupt: bool,
        recorder: Recorder,
    }

    #[async_trait]
    impl SupervisedProcess for FakeProcess {
        fn interrupt(&mut self) -> std::io::Result<()> {
            self.recorder.events.lock().push(Event::Interrupt(self.id));
            Ok(())
        }

        async fn wait_for_exit(&mut self, _grace: Duration) -> bool {
            self.exits_on_interrupt
        }

        async fn kill(&mut self) -> std::io::Result<()> {
            self.recorder.events.lock().push(Event::Kill(self.id));
            Ok(())
        }
    }

    struct FakeLauncher {
        recorder: Recorder,
        next_id: Mutex<usize>,
        exits_on_interrupt: bool,
        fail_spawn: bool,
    }

    impl FakeLauncher {
        fn new(recorder: Recorder) -> Self {
            Self {
                recorder,
                next_id: Mutex::new(0),
                exits_on_interrupt: true,
                fail_spawn: false,
            }
        }
    }

    impl Launcher for FakeLauncher {
        type Process = FakeProcess;

        fn launch(&self, _artifact: &Path) -> std::io::Result<FakeProcess> {
            if self.fail_spawn {
                return Err(std::io::Error::new(std::io::ErrorKind::NotFound, "node"));
            }
            let mut next = self.next_id.lock();
            *next += 1;
            self.recorder.events.lock().push(Event::Launch(*next));
            Ok(FakeProcess {
                id: *next,
                exits_on_interrupt: self.exits_on_interrupt,
                recorder: self.recorder.clone(),
            })
        }
    }

    #[tokio::test]
    async fn test_restart_interrupts_before_launch() {
        let recorder = Recorder::default();
        let mut supervisor =
            ProcessSupervisor::new(FakeLauncher::new(recorder.clone()), "/dist/server.js", Logger::silent());

        supervisor.on_rebuild(&BuildResult::default()).await.unwrap();
        supervisor.on_rebuild(&BuildResult::default()).await.unwrap();
        supervisor.on_rebuild(&BuildResult::default()).await.unwrap();

        assert_eq!(
            *recorder.events.lock(),
            vec![
                Event::Launch(1),
                Event::Interrupt(1),
                Event::Launch(2),
                Event::Interrupt(2),
                Event::Launch(3),
            ]
        );
        assert!(supervisor.is_running());
    }

    #[tokio::test]
    async fn test_restarts_even_with_build_errors() {
        let recorder = Recorder::default();
        let mut supervisor =
            ProcessSupervisor::new(FakeLauncher::new(recorder.clone()), "/dist/server.js", Logger::silent());

        let failed = BuildResult::failed(vec![Diagnostic::new("Unexpected token")]);
        supervisor.on_rebuild(&failed).await.unwrap();
        assert_eq!(*recorder.events.lock(), vec![Event::Launch(1)]);
    }

    #[tokio::test]
    async fn test_kills_child_that_ignores_interrupt() {
        let recorder = Recorder::default();
        let mut launcher = FakeLauncher::new(recorder.clone());
        launcher.exits_on_interrupt = false;
        let mut supervisor = ProcessSupervisor::new(launcher, "/dist/server.js", Logger::silent())
            .with_grace(Duration::from_millis(10));

        supervisor.restart().await.unwrap();
        supervisor.restart().await.unwrap();

        assert_eq!(
            *recorder.events.lock(),
            vec![
                Event::Launch(1),
                Event::Interrupt(1),
                Event::Kill(1),
                Event::Launch(2),
            ]
        );
    }

    #[tokio::test]
    async fn test_shutdown_stops_child() {
        let recorder = Recorder::default();
        let mut supervisor =
            ProcessSupervisor::new(FakeLauncher::new(recorder.clone()), "/dist/server.js", Logger::silent());

        supervisor.restart().await.unwrap();
        supervisor.on_shutdown().await.unwrap();
        assert!(!supervisor.is_running());
        assert_eq!(
            *recorder.events.lock(),
            vec![Event::Launch(1), Event::Interrupt(1)]
        );

        // Nothing left to stop.
        supervisor.on_shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_spawn_failure_is_fatal() {
        let mut launcher = FakeLauncher::new(Recorder::default());
        launcher.fail_spawn = true;
        let mut supervisor = ProcessSupervisor::new(launcher, "/dist/server.js", Logger::silent());

        let err = supervisor.restart().await.unwrap_err();
        assert!(matches!(
            err,
            crate::error::CliError::Supervisor(SupervisorError::Spawn { .. })
        ));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_node_launcher_interrupts_real_child() {
        // `sleep` stands in for node; SIGINT ends it immediately.
        let launcher = NodeLauncher::with_program("sleep");
        let mut supervisor = ProcessSupervisor::new(launcher, "30", Logger::silent())
            .with_grace(Duration::from_secs(5));

        supervisor.restart().await.unwrap();
        assert!(supervisor.is_running());
        supervisor.stop().await.unwrap();
        assert!(!supervisor.is_running());
    }
}
