//! Helper around `std::process` for piping data through an external tool.

use std::ffi::OsString;
use std::io::{self, Write};
use std::path::Path;
use std::process::{Command, Output, Stdio};
use std::thread;

/// Runs `program` with `args`, feeding `input` on stdin and collecting
/// stdout and stderr.
///
/// Stdin is written from a helper thread so a tool that starts producing
/// output before reading all of its input cannot deadlock on full pipes.
/// The call blocks until the process exits.
pub fn run(program: &Path, args: &[OsString], input: Vec<u8>) -> io::Result<Output> {
    tracing::debug!(program = %program.display(), ?args, "Running command");

    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()?;

    let mut stdin = child
        .stdin
        .take()
        .ok_or_else(|| io::Error::other("cannot get standard input"))?;
    let writer = thread::spawn(move || stdin.write_all(&input));

    let output = child.wait_with_output()?;

    match writer.join() {
        Ok(Ok(())) => {}
        // The tool may exit without draining stdin; its exit status tells
        // the real story.
        Ok(Err(err)) if err.kind() == io::ErrorKind::BrokenPipe => {
            tracing::debug!("Command closed stdin early");
        }
        Ok(Err(err)) => return Err(err),
        Err(_) => return Err(io::Error::other("stdin writer thread panicked")),
    }

    tracing::debug!(status = %output.status, stdout = output.stdout.len(), "Command finished");
    Ok(output)
}
