use crate::session::Session;
use anyhow::{Context, Result};
use std::io::Write;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

pub const GREETING: &str = "¡Hola! Soy tu chatbot asistente. Escribe 'salir' para terminar.";
pub const PROMPT: &str = "\nTú: ";
pub const FAREWELL: &str = "¡Hasta luego!";
pub const SEARCHING: &str = "\n** Buscando en internet **";

/// Read queries line by line until the exit word or end of input.
///
/// Provider failures never leave this loop; console read/write errors do.
/// Input that is not valid UTF-8 is decoded lossily rather than rejected.
pub async fn run<R, W>(mut input: R, session: &mut Session<W>, exit_command: &str) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    writeln!(session.output_mut(), "{GREETING}")?;

    let mut turns = 0usize;
    loop {
        let out = session.output_mut();
        write!(out, "{PROMPT}")?;
        out.flush()?;

        let mut raw = Vec::new();
        let read = input
            .read_until(b'\n', &mut raw)
            .await
            .context("failed to read from console")?;
        if read == 0 {
            tracing::info!(session_id = %session.id(), turns, "repl.eof");
            writeln!(session.output_mut())?;
            writeln!(session.output_mut(), "{FAREWELL}")?;
            return Ok(());
        }

        // Terminals in legacy encodings still get a turn; bad bytes become U+FFFD.
        let line = String::from_utf8_lossy(&raw);
        let query = strip_line_ending(&line);
        if is_exit(query, exit_command) {
            tracing::info!(session_id = %session.id(), turns, "repl.exit");
            writeln!(session.output_mut(), "{FAREWELL}")?;
            return Ok(());
        }

        writeln!(session.output_mut(), "{SEARCHING}")?;
        session
            .run_turn(query)
            .await
            .context("console write failed during turn")?;
        turns += 1;
    }
}

fn strip_line_ending(line: &str) -> &str {
    line.strip_suffix('\n')
        .map(|l| l.strip_suffix('\r').unwrap_or(l))
        .unwrap_or(line)
}

fn is_exit(line: &str, exit_command: &str) -> bool {
    line.to_lowercase() == exit_command.to_lowercase()
}
