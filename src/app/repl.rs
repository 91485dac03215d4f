use crate::app::applier::apply;
use crate::app::models::Project;
use crate::app::parser::{parse_with, ParseMode};
use anyhow::Result;
use std::io::{BufRead, Cursor, Write};

const PROMPT: &str = "\nCFL > ";

/// One interactive session: pasted lines are buffered until `DONE`,
/// then parsed and applied as a single bundle. `EXIT` or end of input
/// ends the session.
pub struct Session<'a> {
    project: &'a Project,
    mode: ParseMode,
    buffer: Vec<String>,
    applied: usize,
}

impl<'a> Session<'a> {
    pub fn new(project: &'a Project, mode: ParseMode) -> Self {
        Self {
            project,
            mode,
            buffer: Vec::new(),
            applied: 0,
        }
    }

    /// Number of successful DONE turns so far.
    pub fn applied(&self) -> usize {
        self.applied
    }

    pub fn run<R: BufRead, W: Write>(&mut self, input: R, output: &mut W) -> Result<()> {
        writeln!(output, "\n💬 CFL REPL")?;
        writeln!(
            output,
            "Paste content, type \"DONE\" on its own line to apply. \"EXIT\" to quit."
        )?;
        write!(output, "{}", PROMPT)?;
        output.flush()?;

        for line in input.lines() {
            let line = line?;
            match line.trim().to_uppercase().as_str() {
                "EXIT" => break,
                "DONE" => {
                    self.flush_buffer(output)?;
                    write!(output, "{}", PROMPT)?;
                    output.flush()?;
                }
                _ => self.buffer.push(line),
            }
        }
        Ok(())
    }

    fn flush_buffer<W: Write>(&mut self, output: &mut W) -> Result<()> {
        if self.buffer.is_empty() {
            writeln!(output, "⚠️  Buffer is empty.")?;
            return Ok(());
        }

        let text = std::mem::take(&mut self.buffer).join("\n");
        let outcome = parse_with(Cursor::new(text), self.mode)
            .map_err(anyhow::Error::from)
            .and_then(|directives| apply(&directives, self.project));

        match outcome {
            Ok(report) => {
                self.applied += 1;
                writeln!(
                    output,
                    "✅ Success! ({} written, {} removed)",
                    report.written, report.removed
                )?;
            }
            Err(err) => {
                log::error!("Apply failed: {:#}", err);
                writeln!(output, "❌ {:#}", err)?;
            }
        }
        Ok(())
    }
}
