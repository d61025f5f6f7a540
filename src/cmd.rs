use std::io::Write;
use std::process::{Command, Output, Stdio};

use tracing::debug;

use crate::error::{DeployError, DeployResult};

/// Executes external programs on behalf of the pipeline.
///
/// Every cloud CLI, container CLI, `ssh` and `scp` invocation goes
/// through this trait. [`System`] spawns real processes; tests
/// substitute a recorder.
pub trait Runner {
    /// Run a command with extra environment variables and capture its
    /// output. Fails if the command returns a non-zero exit code.
    fn run_with_env(
        &self,
        program: &str,
        args: &[&str],
        env: &[(String, String)],
    ) -> DeployResult<String>;

    /// Run a command with stdin/stdout/stderr inherited.
    fn run_interactive_with_env(
        &self,
        program: &str,
        args: &[&str],
        env: &[(String, String)],
    ) -> DeployResult<()>;

    /// Run a command that reads its stdin from a byte slice.
    fn run_with_stdin_and_env(
        &self,
        program: &str,
        args: &[&str],
        stdin_data: &[u8],
        env: &[(String, String)],
    ) -> DeployResult<String>;

    /// Run a command for its exit status only. Spawn failures count
    /// as failure.
    fn succeeds_with_env(&self, program: &str, args: &[&str], env: &[(String, String)]) -> bool;

    fn run(&self, program: &str, args: &[&str]) -> DeployResult<String> {
        self.run_with_env(program, args, &[])
    }

    fn run_interactive(&self, program: &str, args: &[&str]) -> DeployResult<()> {
        self.run_interactive_with_env(program, args, &[])
    }

    fn run_with_stdin(
        &self,
        program: &str,
        args: &[&str],
        stdin_data: &[u8],
    ) -> DeployResult<String> {
        self.run_with_stdin_and_env(program, args, stdin_data, &[])
    }

    fn succeeds(&self, program: &str, args: &[&str]) -> bool {
        self.succeeds_with_env(program, args, &[])
    }
}

/// [`Runner`] backed by [`std::process::Command`].
#[derive(Debug, Default, Clone, Copy)]
pub struct System;

impl Runner for System {
    fn run_with_env(
        &self,
        program: &str,
        args: &[&str],
        env: &[(String, String)],
    ) -> DeployResult<String> {
        debug!(command = %format_command(program, args), "run");
        let output = spawn(program, args, env)?;
        captured(program, args, &output)
    }

    fn run_interactive_with_env(
        &self,
        program: &str,
        args: &[&str],
        env: &[(String, String)],
    ) -> DeployResult<()> {
        debug!(command = %format_command(program, args), "run interactive");
        let status = Command::new(program)
            .args(args)
            .envs(env_pairs(env))
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .map_err(|e| not_found_or_io(program, e))?;

        if status.success() {
            Ok(())
        } else {
            Err(DeployError::CommandFailed {
                command: format_command(program, args),
                status: Some(status),
            })
        }
    }

    fn run_with_stdin_and_env(
        &self,
        program: &str,
        args: &[&str],
        stdin_data: &[u8],
        env: &[(String, String)],
    ) -> DeployResult<String> {
        debug!(command = %format_command(program, args), "run with stdin");
        let mut child = Command::new(program)
            .args(args)
            .envs(env_pairs(env))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| not_found_or_io(program, e))?;

        if let Some(stdin) = &mut child.stdin {
            stdin.write_all(stdin_data)?;
        }
        drop(child.stdin.take());

        let output = child.wait_with_output()?;
        captured(program, args, &output)
    }

    fn succeeds_with_env(&self, program: &str, args: &[&str], env: &[(String, String)]) -> bool {
        debug!(command = %format_command(program, args), "probe");
        spawn(program, args, env).is_ok_and(|o| o.status.success())
    }
}

/// Render a command line for error messages and logs.
#[must_use]
pub fn format_command(program: &str, args: &[&str]) -> String {
    let mut parts = vec![program.to_string()];
    parts.extend(args.iter().map(|a| (*a).to_string()));
    parts.join(" ")
}

fn spawn(program: &str, args: &[&str], env: &[(String, String)]) -> DeployResult<Output> {
    Command::new(program)
        .args(args)
        .envs(env_pairs(env))
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .map_err(|e| not_found_or_io(program, e))
}

fn env_pairs(env: &[(String, String)]) -> impl Iterator<Item = (&str, &str)> {
    env.iter().map(|(k, v)| (k.as_str(), v.as_str()))
}

fn captured(program: &str, args: &[&str], output: &Output) -> DeployResult<String> {
    if output.status.success() {
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    } else {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        if !stderr.is_empty() {
            eprintln!("stderr: {stderr}");
        }
        Err(DeployError::CommandFailed {
            command: format_command(program, args),
            status: Some(output.status),
        })
    }
}

fn not_found_or_io(program: &str, e: std::io::Error) -> DeployError {
    if e.kind() == std::io::ErrorKind::NotFound {
        DeployError::CommandNotFound(program.to_string())
    } else {
        DeployError::Io(e)
    }
}
