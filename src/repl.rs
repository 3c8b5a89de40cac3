use std::io::{BufRead, Write};

use log::debug;

use crate::client::PredictionApi;
use crate::error::FormError;
use crate::form::FormController;
use crate::presenter;

pub const HELP: &str = "\
commands:
  fields               show the form
  set <name> <value>   edit a field
  unset <name>         clear a field
  sample               load sample data into every field
  submit               validate and request a prediction
  latest               show the latest prediction
  history              show recent predictions
  clear                forget prediction history
  health               query backend health
  selftest             ask the backend to score its own sample
  help                 this text
  quit                 leave
";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Help,
    Fields,
    Set { name: String, value: String },
    Unset(String),
    Sample,
    Submit,
    Latest,
    History,
    Clear,
    Health,
    SelfTest,
    Quit,
    Nothing,
}

impl Command {
    pub fn parse(line: &str) -> Result<Command, String> {
        let mut parts = line.split_whitespace();
        let Some(head) = parts.next() else {
            return Ok(Command::Nothing);
        };
        let rest: Vec<&str> = parts.collect();

        let cmd = match (head.to_ascii_lowercase().as_str(), rest.as_slice()) {
            ("help" | "?", []) => Command::Help,
            ("fields" | "form", []) => Command::Fields,
            ("set", [name, value]) => Command::Set {
                name: name.to_string(),
                value: value.to_string(),
            },
            ("set", _) => return Err("usage: set <name> <value>".to_string()),
            ("unset", [name]) => Command::Unset(name.to_string()),
            ("unset", _) => return Err("usage: unset <name>".to_string()),
            ("sample", []) => Command::Sample,
            ("submit" | "predict", []) => Command::Submit,
            ("latest", []) => Command::Latest,
            ("history", []) => Command::History,
            ("clear", []) => Command::Clear,
            ("health", []) => Command::Health,
            ("selftest", []) => Command::SelfTest,
            ("quit" | "exit", []) => Command::Quit,
            (other, _) => return Err(format!("unknown command `{}` (try `help`)", other)),
        };
        Ok(cmd)
    }
}

/// Drives the form from line-oriented input until `quit` or end of input.
pub async fn run<A, R, W>(form: &mut FormController<A>, input: R, mut output: W) -> std::io::Result<()>
where
    A: PredictionApi,
    R: BufRead,
    W: Write,
{
    if let Err(e) = form.load_features().await {
        writeln!(output, "features unavailable: {}", e)?;
    }
    write!(output, "{}", presenter::render_form(form))?;

    for line in input.lines() {
        let line = line?;
        let command = match Command::parse(&line) {
            Ok(cmd) => cmd,
            Err(msg) => {
                writeln!(output, "{}", msg)?;
                continue;
            }
        };
        debug!("command: {:?}", command);
        if command == Command::Quit {
            break;
        }
        execute(form, command, &mut output).await?;
        output.flush()?;
    }
    Ok(())
}

async fn execute<A, W>(form: &mut FormController<A>, command: Command, output: &mut W) -> std::io::Result<()>
where
    A: PredictionApi,
    W: Write,
{
    match command {
        Command::Help => write!(output, "{}", HELP)?,
        Command::Fields => {
            if form.is_loading() {
                if let Err(e) = form.load_features().await {
                    writeln!(output, "features unavailable: {}", e)?;
                }
            }
            write!(output, "{}", presenter::render_form(form))?
        }
        Command::Set { name, value } => {
            if let Err(e) = form.set_field(&name, &value) {
                writeln!(output, "{}", e)?;
            }
        }
        Command::Unset(name) => {
            if let Err(e) = form.clear_field(&name) {
                writeln!(output, "{}", e)?;
            }
        }
        Command::Sample => match form.load_sample().await {
            Ok(0) => writeln!(output, "sample was empty, form unchanged")?,
            Ok(n) => {
                writeln!(output, "loaded sample into {} fields", n)?;
                write!(output, "{}", presenter::render_form(form))?;
            }
            Err(e) => writeln!(output, "could not load sample: {}", e)?,
        },
        Command::Submit => match form.submit().await.map(|_| ()) {
            Ok(()) => write!(output, "{}", presenter::render_latest(form.history()))?,
            Err(FormError::Validation(errors)) => {
                writeln!(output, "fix {} field(s) before submitting:", errors.len())?;
                for e in errors.iter() {
                    writeln!(output, "  {}: {}", e.field, e.message)?;
                }
            }
            Err(e) => writeln!(output, "prediction failed, try again: {}", e)?,
        },
        Command::Latest => write!(output, "{}", presenter::render_latest(form.history()))?,
        Command::History => write!(output, "{}", presenter::render_history(form.history()))?,
        Command::Clear => {
            form.clear_history();
            writeln!(output, "history cleared")?;
        }
        Command::Health => match form.api().check_health().await {
            Ok(status) => writeln!(output, "{}", status)?,
            Err(e) => writeln!(output, "health check failed: {}", e)?,
        },
        Command::SelfTest => match form.api().predict_sample().await {
            Ok(sample) => writeln!(
                output,
                "backend sample scored {} (sample_used={})",
                presenter::format_probability(sample.claim_probability),
                sample.sample_used
            )?,
            Err(e) => writeln!(output, "self-test failed: {}", e)?,
        },
        Command::Quit | Command::Nothing => {}
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_commands() {
        assert_eq!(Command::parse("  "), Ok(Command::Nothing));
        assert_eq!(Command::parse("SUBMIT"), Ok(Command::Submit));
        assert_eq!(
            Command::parse("set ps_ind_01 2"),
            Ok(Command::Set { name: "ps_ind_01".into(), value: "2".into() })
        );
        assert_eq!(Command::parse("unset a"), Ok(Command::Unset("a".into())));
        assert_eq!(Command::parse("exit"), Ok(Command::Quit));
    }

    #[test]
    fn rejects_bad_arity_and_unknown_words() {
        assert!(Command::parse("set a").is_err());
        assert!(Command::parse("unset").is_err());
        assert!(Command::parse("history now").is_err());
        assert!(Command::parse("dance").unwrap_err().contains("dance"));
    }
}
