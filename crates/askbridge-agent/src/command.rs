//! External command execution
//!
//! Runs the assistant CLI as a child process, streaming stdout to an optional
//! progress callback. On Windows the process runs through `cmd.exe /c` and
//! npm-installed commands are resolved from the usual Node.js locations,
//! since a server launched by another tool often inherits a minimal `PATH`.

use regex::Regex;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::OnceLock;
use std::time::Instant;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::Command;

/// Callback receiving each line of stdout as it arrives
pub type ProgressFn = dyn Fn(&str) + Send + Sync;

/// Node.js versions probed under nvm directories on Windows
#[cfg_attr(not(windows), allow(dead_code))]
const NODE_VERSIONS: &[&str] = &[
    "v24.12.0", "v22.21.1", "v22.12.0", "v20.18.0", "v20.10.0", "v18.20.0", "v18.19.0",
];

/// Errors that can occur while running a command
#[derive(Error, Debug)]
pub enum CommandError {
    /// The process could not be started
    #[error("Failed to spawn command: {0}")]
    Spawn(#[source] std::io::Error),

    /// Reading the process output failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The process exited unsuccessfully
    #[error("Command failed with exit code {}: {stderr}", .code.map_or_else(|| "unknown".to_string(), |c| c.to_string()))]
    Failed {
        /// Exit code, if the process exited normally
        code: Option<i32>,
        /// Trimmed stderr
        stderr: String,
    },

    /// The assistant reported an exhausted model quota
    #[error("Quota exceeded for {model} (status {status}, reason {reason})")]
    QuotaExceeded {
        /// Model named by the quota metric
        model: String,
        /// HTTP-style status code
        status: u16,
        /// Machine-readable reason
        reason: String,
    },
}

impl CommandError {
    /// Whether this failure is a quota error that a different model may avoid
    pub fn is_quota_exceeded(&self) -> bool {
        matches!(self, CommandError::QuotaExceeded { .. })
    }
}

fn quota_regexes() -> &'static (Regex, Regex, Regex) {
    static RE: OnceLock<(Regex, Regex, Regex)> = OnceLock::new();
    RE.get_or_init(|| {
        (
            Regex::new(r"Quota exceeded for quota metric '([^']+)'").expect("metric regex should compile"),
            Regex::new(r#"status["\s]*[:=]\s*(\d+)"#).expect("status regex should compile"),
            Regex::new(r#""reason":\s*"([^"]+)""#).expect("reason regex should compile"),
        )
    })
}

/// Recognize a quota exhaustion report in the CLI's stderr
pub fn detect_quota_error(stderr: &str) -> Option<CommandError> {
    if !stderr.contains("RESOURCE_EXHAUSTED") {
        return None;
    }

    let (metric_re, status_re, reason_re) = quota_regexes();
    let capture = |re: &Regex| {
        re.captures(stderr)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
    };

    Some(CommandError::QuotaExceeded {
        model: capture(metric_re).unwrap_or_else(|| "Unknown Model".to_string()),
        status: capture(status_re)
            .and_then(|s| s.parse().ok())
            .unwrap_or(429),
        reason: capture(reason_re).unwrap_or_else(|| "rateLimitExceeded".to_string()),
    })
}

/// Runs external commands
#[derive(Debug, Clone, Default)]
pub struct CommandExecutor {
    /// Working directory for spawned processes
    working_directory: Option<PathBuf>,
}

impl CommandExecutor {
    /// Create an executor that runs in the current directory
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an executor with a specific working directory
    pub fn with_working_directory(working_directory: impl Into<PathBuf>) -> Self {
        Self {
            working_directory: Some(working_directory.into()),
        }
    }

    /// Run `command` with `args`, returning trimmed stdout on success
    pub async fn run(
        &self,
        command: &str,
        args: &[String],
        progress: Option<&ProgressFn>,
    ) -> Result<String, CommandError> {
        let started = Instant::now();
        tracing::info!("Executing: {} {}", command, args.join(" "));

        let mut cmd = build_command(command, args);
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &self.working_directory {
            cmd.current_dir(dir);
        }

        let mut child = cmd.spawn().map_err(|e| {
            tracing::error!("Failed to spawn {}: {}", command, e);
            CommandError::Spawn(e)
        })?;

        let stderr_task = child.stderr.take().map(|mut stderr| {
            tokio::spawn(async move {
                let mut buf = Vec::new();
                let _ = stderr.read_to_end(&mut buf).await;
                String::from_utf8_lossy(&buf).into_owned()
            })
        });

        let mut stdout = String::new();
        if let Some(out) = child.stdout.take() {
            let mut lines = BufReader::new(out).lines();
            while let Some(line) = lines.next_line().await? {
                if let Some(progress) = progress {
                    progress(&line);
                }
                stdout.push_str(&line);
                stdout.push('\n');
            }
        }

        let status = child.wait().await?;
        let stderr = match stderr_task {
            Some(task) => task.await.unwrap_or_default(),
            None => String::new(),
        };
        let elapsed = started.elapsed();

        if status.success() {
            tracing::info!(
                "Command completed in {:.2}s ({} bytes of output)",
                elapsed.as_secs_f64(),
                stdout.len()
            );
            return Ok(stdout.trim().to_string());
        }

        tracing::error!(
            "Command failed after {:.2}s with exit code {:?}",
            elapsed.as_secs_f64(),
            status.code()
        );

        if let Some(quota) = detect_quota_error(&stderr) {
            tracing::error!("Assistant quota error: {}", quota);
            return Err(quota);
        }

        let stderr = stderr.trim();
        Err(CommandError::Failed {
            code: status.code(),
            stderr: if stderr.is_empty() {
                "Unknown error".to_string()
            } else {
                stderr.to_string()
            },
        })
    }
}

#[cfg(not(windows))]
fn build_command(command: &str, args: &[String]) -> Command {
    let mut cmd = Command::new(command);
    cmd.args(args);
    cmd
}

#[cfg(windows)]
fn build_command(command: &str, args: &[String]) -> Command {
    let env = |key: &str| std::env::var(key).ok();
    let shell = env("COMSPEC").unwrap_or_else(|| r"C:\Windows\System32\cmd.exe".to_string());
    let node_paths = windows_node_paths(&env);

    let target = if is_bare_command(command) {
        resolve_npm_command(command, &node_paths).unwrap_or_else(|| format!("{}.cmd", command))
    } else {
        command.to_string()
    };

    let mut cmd = Command::new(shell);
    cmd.arg("/c").arg(target).args(args);

    if !node_paths.is_empty() {
        let current = env("PATH").or_else(|| env("Path")).unwrap_or_default();
        let mut entries: Vec<String> = node_paths.iter().map(|p| p.display().to_string()).collect();
        entries.push(current);
        let path = entries.join(";");
        tracing::debug!("Prepending {} Node.js paths to PATH", node_paths.len());
        cmd.env("PATH", &path).env("Path", &path);
    }

    cmd
}

/// A command given by name only, to be looked up rather than run as a path
#[cfg_attr(not(windows), allow(dead_code))]
fn is_bare_command(command: &str) -> bool {
    !command.contains(['.', '\\', '/'])
}

/// Directories where npm global shims live on Windows, most specific first
#[cfg_attr(not(windows), allow(dead_code))]
fn windows_node_paths(env: &dyn Fn(&str) -> Option<String>) -> Vec<PathBuf> {
    let mut paths = Vec::new();
    let nvm_home = env("NVM_HOME");

    if let Some(symlink) = env("NVM_SYMLINK") {
        paths.push(PathBuf::from(symlink));
    }

    if let Some(home) = &nvm_home {
        paths.extend(NODE_VERSIONS.iter().map(|v| PathBuf::from(home).join(v)));
    }

    if let Some(app_data) = env("APPDATA") {
        paths.push(PathBuf::from(app_data).join("npm"));
    }

    if nvm_home.is_none() {
        if let Some(local) = env("LOCALAPPDATA") {
            let nvm_dir = PathBuf::from(local).join("nvm");
            paths.extend(NODE_VERSIONS.iter().map(|v| nvm_dir.join(v)));
        }
    }

    paths.push(PathBuf::from(r"C:\Program Files\nodejs"));
    paths.push(PathBuf::from(r"C:\Program Files (x86)\nodejs"));
    paths
}

/// Find `<command>.cmd` in one of `search_paths`
#[cfg_attr(not(windows), allow(dead_code))]
fn resolve_npm_command(command: &str, search_paths: &[PathBuf]) -> Option<String> {
    let file_name = format!("{}.cmd", command);
    search_paths
        .iter()
        .map(|dir| dir.join(&file_name))
        .find(|candidate| candidate.is_file())
        .map(|found| {
            tracing::debug!("Resolved {} to {}", command, found.display());
            found.display().to_string()
        })
}
