//! Running external programs.

use std::ffi::OsStr;
use std::io;
use std::process::{Command, Output};

use crate::error::{Error, Result};

/// Run `command` to completion, capturing its output.
///
/// A program that cannot be spawned because it does not exist becomes
/// [`Error::ToolNotFound`]; the exit status is left to the caller.
pub(crate) fn run(command: &mut Command) -> Result<Output> {
    let program = command.get_program().to_os_string();
    log::debug!("Running {:?}", command);

    command.output().map_err(|e| spawn_error(&program, e))
}

fn spawn_error(program: &OsStr, err: io::Error) -> Error {
    if err.kind() == io::ErrorKind::NotFound {
        Error::ToolNotFound(program.to_string_lossy().into_owned())
    } else {
        Error::Io(err)
    }
}

/// Trimmed stderr, or a description of the exit status when stderr is empty.
pub(crate) fn failure_message(output: &Output) -> String {
    let stderr = String::from_utf8_lossy(&output.stderr);
    let stderr = stderr.trim();
    if stderr.is_empty() {
        format!("exited with {}", output.status)
    } else {
        stderr.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_program() {
        let err = run(&mut Command::new("slidescan-no-such-program")).unwrap_err();
        match err {
            Error::ToolNotFound(name) => assert_eq!(name, "slidescan-no-such-program"),
            other => panic!("expected ToolNotFound, got {other:?}"),
        }
    }
}
