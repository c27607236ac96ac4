use std::path::PathBuf;

use tokio::io::{AsyncBufReadExt, BufReader};
use voicestudio_appcore::{StudioService, commands};
use voicestudio_core::types::AudioKind;
use voicestudio_runtime::ipc::OpResponse;

const HELP: &str = "\
commands:
  list                    show the target gallery
  rescan                  rescan the images and voices folders
  select <name>           select a target by key or display name
  record                  start recording from the microphone
  save                    stop recording and save it
  load <path>             use an existing audio file as the source
  convert                 convert the source to the selected target
  play original|converted play a clip (stops the current one)
  stop                    stop playback
  status                  show the session state
  model                   wait for the model to finish loading
  quit                    exit";

#[derive(Debug, Clone, PartialEq, Eq)]
enum ShellCommand {
    Help,
    List,
    Rescan,
    Select(String),
    Record,
    Save,
    Load(PathBuf),
    Convert,
    Play(AudioKind),
    Stop,
    Status,
    Model,
    Quit,
}

fn parse(line: &str) -> Result<Option<ShellCommand>, String> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let (verb, rest) = match line.split_once(char::is_whitespace) {
        Some((verb, rest)) => (verb, rest.trim()),
        None => (line, ""),
    };

    let needs_arg = |what: &str| {
        if rest.is_empty() {
            Err(format!("usage: {verb} <{what}>"))
        } else {
            Ok(rest.to_string())
        }
    };

    let cmd = match verb.to_ascii_lowercase().as_str() {
        "help" | "?" => ShellCommand::Help,
        "list" | "ls" => ShellCommand::List,
        "rescan" => ShellCommand::Rescan,
        "select" => ShellCommand::Select(needs_arg("name")?),
        "record" | "rec" => ShellCommand::Record,
        "save" | "stop-recording" => ShellCommand::Save,
        "load" => ShellCommand::Load(PathBuf::from(needs_arg("path")?)),
        "convert" => ShellCommand::Convert,
        "play" => ShellCommand::Play(needs_arg("original|converted")?.parse()?),
        "stop" => ShellCommand::Stop,
        "status" => ShellCommand::Status,
        "model" => ShellCommand::Model,
        "quit" | "exit" | "q" => ShellCommand::Quit,
        other => return Err(format!("unknown command: {other} (try `help`)")),
    };
    Ok(Some(cmd))
}

fn print_response(resp: &OpResponse) {
    if resp.success {
        println!("ok: {}", resp.message);
    } else {
        println!("error: {}", resp.message);
    }
}

/// Reads commands from stdin until `quit` or end of input.
pub async fn run(svc: &StudioService) -> anyhow::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Some(line) = lines.next_line().await? {
        let cmd = match parse(&line) {
            Ok(Some(cmd)) => cmd,
            Ok(None) => continue,
            Err(msg) => {
                println!("{msg}");
                continue;
            }
        };

        match cmd {
            ShellCommand::Help => println!("{HELP}"),
            ShellCommand::List => {
                for t in svc.targets().await? {
                    let voice = if t.has_voice() { "voice" } else { "no voice" };
                    println!("  {:<20} {:<24} [{voice}]", t.id.as_str(), t.display_name);
                }
            }
            ShellCommand::Rescan => print_response(&commands::rescan_gallery(svc).await),
            ShellCommand::Select(name) => {
                print_response(&commands::select_target(svc, &name).await)
            }
            ShellCommand::Record => print_response(&commands::start_recording(svc).await),
            ShellCommand::Save => print_response(&commands::stop_recording(svc).await),
            ShellCommand::Load(path) => {
                print_response(&commands::load_source_file(svc, path).await)
            }
            ShellCommand::Convert => {
                // Conversion can take a while; keep the prompt responsive.
                println!("converting...");
                let svc = svc.clone();
                tokio::spawn(async move {
                    print_response(&commands::convert(&svc).await);
                });
            }
            ShellCommand::Play(kind) => print_response(&commands::play(svc, kind).await),
            ShellCommand::Stop => print_response(&commands::stop_playback(svc).await),
            ShellCommand::Status => {
                let status = svc.status().await?;
                println!("{}", serde_json::to_string_pretty(&status)?);
            }
            ShellCommand::Model => {
                if !svc.model_ready() {
                    println!("waiting for the model...");
                }
                print_response(&commands::load_model(svc).await);
            }
            ShellCommand::Quit => break,
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_commands_with_arguments() {
        assert_eq!(
            parse("select  Bob Smith ").unwrap(),
            Some(ShellCommand::Select("Bob Smith".into()))
        );
        assert_eq!(
            parse("load recordings/take 1.wav").unwrap(),
            Some(ShellCommand::Load(PathBuf::from("recordings/take 1.wav")))
        );
        assert_eq!(
            parse("PLAY Converted").unwrap(),
            Some(ShellCommand::Play(AudioKind::Converted))
        );
        assert_eq!(parse("q").unwrap(), Some(ShellCommand::Quit));
    }

    #[test]
    fn blank_lines_are_ignored() {
        assert_eq!(parse("   ").unwrap(), None);
    }

    #[test]
    fn reports_bad_input() {
        assert_eq!(parse("select").unwrap_err(), "usage: select <name>");
        assert!(parse("play both").unwrap_err().contains("unknown audio kind"));
        assert!(parse("dance").unwrap_err().starts_with("unknown command"));
    }
}
