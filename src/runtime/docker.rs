//! Docker CLI runtime - drives containers through the `docker` binary

use crate::core::ImageConfig;
use crate::runtime::{ContainerRuntime, OutputSink, OutputStream, RuntimeError};
use async_trait::async_trait;
use std::path::Path;
use std::process::{Output, Stdio};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::Command;
use tracing::{debug, info};

/// Configuration for the runtime client
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Path to the runtime executable.
    ///
    /// Defaults to "docker" (assumes it's on PATH). Any CLI compatible
    /// with docker's `run`/`exec`/`cp`/`rm`/`login` works.
    pub binary: String,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            binary: "docker".to_string(),
        }
    }
}

impl RuntimeConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_binary(mut self, binary: impl Into<String>) -> Self {
        self.binary = binary.into();
        self
    }
}

/// Runtime client that calls the docker CLI as a subprocess
#[derive(Debug, Clone)]
pub struct DockerCli {
    binary: String,
}

impl DockerCli {
    pub fn new(config: RuntimeConfig) -> Self {
        Self {
            binary: config.binary,
        }
    }

    /// Get the runtime executable path
    pub fn binary(&self) -> &str {
        &self.binary
    }

    fn command(&self, args: &[&str]) -> Command {
        debug!("{} {}", self.binary, args.join(" "));
        let mut command = Command::new(&self.binary);
        command.args(args).kill_on_drop(true);
        command
    }

    fn spawn_error(&self, source: std::io::Error) -> RuntimeError {
        RuntimeError::Spawn {
            program: self.binary.clone(),
            source,
        }
    }

    /// Run a command to completion and fail on a non-zero exit
    async fn run(&self, operation: &'static str, args: &[&str]) -> Result<Output, RuntimeError> {
        let output = self
            .command(args)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| self.spawn_error(e))?;
        check_status(operation, output)
    }
}

fn check_status(operation: &'static str, output: Output) -> Result<Output, RuntimeError> {
    if output.status.success() {
        return Ok(output);
    }
    Err(RuntimeError::CommandFailed {
        operation,
        code: output.status.code().unwrap_or(-1),
        stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
    })
}

/// Arguments for `docker run` of a step container
pub(crate) fn run_args(image: &ImageConfig) -> Vec<&str> {
    let mut args = vec!["run", "--detach", "--interactive", "--tty"];
    if let Some(user) = image.run_as_user.as_deref().filter(|u| !u.is_empty()) {
        args.extend(["--user", user]);
    }
    args.push(&image.name);
    args
}

#[async_trait]
impl ContainerRuntime for DockerCli {
    async fn run_detached(&self, image: &ImageConfig) -> Result<String, RuntimeError> {
        let output = self.run("docker run", &run_args(image)).await?;
        let id = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if id.is_empty() {
            return Err(RuntimeError::MissingContainerId);
        }
        Ok(id)
    }

    async fn make_dir(&self, container: &str, path: &str) -> Result<(), RuntimeError> {
        self.run("docker exec mkdir", &["exec", container, "mkdir", "-p", path])
            .await
            .map(|_| ())
    }

    async fn copy_into(
        &self,
        container: &str,
        source: &Path,
        destination: &str,
    ) -> Result<(), RuntimeError> {
        // Trailing `/.` copies the directory's contents, not the directory
        let source = format!("{}/.", source.display());
        let target = format!("{}:{}", container, destination);
        self.run("docker cp", &["cp", &source, &target]).await.map(|_| ())
    }

    async fn exec(
        &self,
        container: &str,
        workdir: &str,
        command: &str,
        sink: &OutputSink,
    ) -> Result<i32, RuntimeError> {
        let mut child = self
            .command(&["exec", "--workdir", workdir, container, "/bin/sh", "-c", command])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| self.spawn_error(e))?;

        let mut stdout = child.stdout.take().map(|s| BufReader::new(s).split(b'\n'));
        let mut stderr = child.stderr.take().map(|s| BufReader::new(s).split(b'\n'));

        while stdout.is_some() || stderr.is_some() {
            tokio::select! {
                line = next_line(&mut stdout), if stdout.is_some() => match line? {
                    Some(line) => sink(OutputStream::Stdout, &line),
                    None => stdout = None,
                },
                line = next_line(&mut stderr), if stderr.is_some() => match line? {
                    Some(line) => sink(OutputStream::Stderr, &line),
                    None => stderr = None,
                },
            }
        }

        let status = child.wait().await?;
        Ok(status.code().unwrap_or(-1))
    }

    async fn remove(&self, container: &str) -> Result<(), RuntimeError> {
        self.run("docker rm", &["rm", "--force", container]).await.map(|_| ())
    }

    async fn login(
        &self,
        registry: Option<&str>,
        username: &str,
        password: &str,
    ) -> Result<(), RuntimeError> {
        let mut args = vec!["login", "--username", username, "--password-stdin"];
        args.extend(registry);

        let mut child = self
            .command(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| self.spawn_error(e))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(password.as_bytes()).await?;
            // dropping stdin closes it so login can proceed
        }

        let output = check_status("docker login", child.wait_with_output().await?)?;
        let message = String::from_utf8_lossy(&output.stdout);
        if !message.trim().is_empty() {
            info!("{}", message.trim());
        }
        Ok(())
    }

    async fn logout(&self, registry: Option<&str>) -> Result<(), RuntimeError> {
        let mut args = vec!["logout"];
        args.extend(registry);

        let status = self
            .command(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .map_err(|e| self.spawn_error(e))?;

        if !status.success() {
            return Err(RuntimeError::CommandFailed {
                operation: "docker logout",
                code: status.code().unwrap_or(-1),
                stderr: String::new(),
            });
        }
        Ok(())
    }
}

type Lines<R> = tokio::io::Split<BufReader<R>>;

/// Next output line, decoded lossily so non-UTF-8 output never fails a command
async fn next_line<R>(lines: &mut Option<Lines<R>>) -> std::io::Result<Option<String>>
where
    R: tokio::io::AsyncRead + Unpin,
{
    let Some(lines) = lines else {
        return Ok(None);
    };
    Ok(lines.next_segment().await?.map(|raw| decode_line(&raw)))
}

fn decode_line(raw: &[u8]) -> String {
    let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
    String::from_utf8_lossy(raw).into_owned()
}
