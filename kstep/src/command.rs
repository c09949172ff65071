/*!

Runs the commands of a step: fixtures before the step's objects are applied and diagnostic
collectors after the step has failed.

!*/

use crate::env;
use crate::error::{self, Result};
use crate::logger::Logger;
use kstep_model::constants::ENV_NAMESPACE;
use kstep_model::Command;
use log::debug;
use snafu::{OptionExt, ResultExt};
use std::path::Path;
use std::process::Output;
use std::time::Duration;

/// Runs `commands` in order in the directory `dir`, stopping at the first one that fails.
pub async fn run_commands(
    logger: &dyn Logger,
    namespace: &str,
    commands: &[Command],
    dir: &Path,
    timeout: u64,
) -> Result<()> {
    for command in commands {
        run_command(logger, namespace, command, dir, timeout).await?;
    }
    Ok(())
}

/// Runs `command` in the directory `dir` and logs its output. `NAMESPACE` is set to `namespace` in
/// the environment of the command. `timeout` is the number of seconds the command may take unless
/// the command sets its own; zero means it may run indefinitely. A command that requests to run in
/// the background is run in the foreground.
pub async fn run_command(
    logger: &dyn Logger,
    namespace: &str,
    command: &Command,
    dir: &Path,
    timeout: u64,
) -> Result<()> {
    let text = command.text().to_string();
    let args = command_args(command, namespace)?;
    let (program, program_args) = args.split_first().context(error::CommandInvalidSnafu {
        command: &text,
        reason: "command is empty",
    })?;
    logger.log(&format!("running command: {:?}", args));

    let mut process = tokio::process::Command::new(program);
    process
        .args(program_args)
        .current_dir(dir)
        .env(ENV_NAMESPACE, namespace)
        .kill_on_drop(true);

    let seconds = if command.timeout > 0 {
        command.timeout
    } else {
        timeout
    };
    let output = if seconds > 0 {
        tokio::time::timeout(Duration::from_secs(seconds), process.output())
            .await
            .ok()
            .context(error::CommandTimeoutSnafu {
                command: &text,
                seconds,
            })?
    } else {
        process.output().await
    }
    .context(error::CommandSpawnSnafu { command: &text })?;

    if !command.skip_log_output {
        log_output(logger, &output);
    }
    if !output.status.success() {
        if command.ignore_failure {
            debug!("ignoring failure of {:?}: {}", text, output.status);
            return Ok(());
        }
        return error::CommandFailedSnafu {
            command: text,
            status: output.status,
        }
        .fail();
    }
    Ok(())
}

fn log_output(logger: &dyn Logger, output: &Output) {
    for stream in [&output.stdout, &output.stderr] {
        for line in String::from_utf8_lossy(stream).lines() {
            logger.log(line);
        }
    }
}

/// The program and arguments that `command` runs.
fn command_args(command: &Command, namespace: &str) -> Result<Vec<String>> {
    let invalid = |reason: &str| {
        error::CommandInvalidSnafu {
            command: command.text(),
            reason,
        }
        .fail()
    };
    match (command.command.is_empty(), command.script.is_empty()) {
        (false, false) => invalid("command and script can not be set in the same configuration"),
        (true, true) => invalid("command or script must be set"),
        (true, false) if command.namespaced => invalid("script can not be namespaced"),
        (true, false) => Ok(vec![
            "sh".to_string(),
            "-c".to_string(),
            command.script.clone(),
        ]),
        (false, true) => {
            let expanded = env::expand_with(&command.command, |name| {
                if name == ENV_NAMESPACE {
                    Some(namespace.to_string())
                } else {
                    std::env::var(name).ok()
                }
            });
            let mut args = match split_args(&expanded) {
                Ok(args) => args,
                Err(reason) => return invalid(reason),
            };
            if command.namespaced {
                args.push("--namespace".to_string());
                args.push(namespace.to_string());
            }
            Ok(args)
        }
    }
}

/// Splits `s` into arguments the way a POSIX shell would, honoring quotes and backslash escapes.
/// No other shell syntax is interpreted.
fn split_args(s: &str) -> std::result::Result<Vec<String>, &'static str> {
    shlex::split(s).ok_or("unterminated quote or trailing backslash")
}
