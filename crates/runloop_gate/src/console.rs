//! Console driver for the gate.
//!
//! Blocks on the reader until the reviewer gives one of the literal choices
//! and every required field. Generic over `BufRead`/`Write` so tests can
//! script the reviewer.

use crate::ticket::{GateResolution, GateResponse, GateTicket, HumanGate};
use crate::GateError;
use std::io::{BufRead, Write};
use tracing::debug;

/// The three literal choices offered at the prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateChoice {
    Accept,
    Override,
    Reject,
}

/// Map raw reviewer input to a choice. Anything unrecognised is `None`.
pub fn parse_choice(raw: &str) -> Option<GateChoice> {
    match raw.trim().to_lowercase().as_str() {
        "y" | "yes" => Some(GateChoice::Accept),
        "o" | "override" => Some(GateChoice::Override),
        "n" | "no" => Some(GateChoice::Reject),
        _ => None,
    }
}

/// Show the ticket and collect a decision, re-prompting as needed.
pub fn prompt_decision<R: BufRead, W: Write>(
    gate: &mut HumanGate,
    ticket: &GateTicket,
    input: &mut R,
    out: &mut W,
) -> Result<GateResolution, GateError> {
    writeln!(out, "\n--- HUMAN APPROVAL GATE (MANDATORY) ---")?;
    writeln!(out, "{}\n", ticket.prompt())?;

    loop {
        let raw = ask(input, out, "Approve? [y]=accept, [o]=override, [n]=reject: ")?;
        let response = match parse_choice(&raw) {
            Some(GateChoice::Accept) => {
                let notes = ask(input, out, "Notes (optional): ")?;
                GateResponse::Accept {
                    notes: (!notes.is_empty()).then_some(notes),
                }
            }
            Some(GateChoice::Override) => {
                let category = ask_required(
                    input,
                    out,
                    "Enter approved category: ",
                    "An override needs a category.",
                )?;
                let notes = ask_required(
                    input,
                    out,
                    "Notes (required): ",
                    "An override needs a justification.",
                )?;
                GateResponse::Override { category, notes }
            }
            Some(GateChoice::Reject) => {
                let notes = ask_required(
                    input,
                    out,
                    "Reason (required): ",
                    "A rejection needs a reason.",
                )?;
                GateResponse::Reject { notes }
            }
            None => {
                debug!(input = %raw, "unrecognised gate input");
                writeln!(out, "Invalid input. Use y, o, or n.")?;
                continue;
            }
        };

        match gate.resolve(&ticket.id, response) {
            Ok(resolution) => return Ok(resolution),
            Err(GateError::Decision(e)) => writeln!(out, "{}", e)?,
            Err(e) => return Err(e),
        }
    }
}

fn ask<R: BufRead, W: Write>(input: &mut R, out: &mut W, prompt: &str) -> Result<String, GateError> {
    write!(out, "{}", prompt)?;
    out.flush()?;
    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Err(GateError::InputClosed);
    }
    Ok(line.trim().to_string())
}

fn ask_required<R: BufRead, W: Write>(
    input: &mut R,
    out: &mut W,
    prompt: &str,
    refusal: &str,
) -> Result<String, GateError> {
    loop {
        let answer = ask(input, out, prompt)?;
        if !answer.is_empty() {
            return Ok(answer);
        }
        writeln!(out, "{}", refusal)?;
    }
}
