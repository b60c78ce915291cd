//! Command implementations

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::Serialize;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::adapters::{ConsoleChannel, Delivery};
use crate::app::{AppContainer, DefaultAppContainer};
use crate::cli::args::{ChatArgs, ConvertArgs, OutputFormat, PresetsArgs, ProbeArgs};
use crate::config::AppConfig;
use crate::domain::model::{Attachment, ChatId, CropPlan, FileRef, MessageRef, RequesterId};
use crate::domain::rules::TransformPlanner;
use crate::ports::{Envelope, InboundCommand};
use crate::presets::{QualityPresetRegistry, CHOICE_PREFIX};

/// Suffix appended to the input stem when no output path is given
const OUTPUT_SUFFIX: &str = "_circle.mp4";

/// Convert a single file without asking for a preset
pub async fn convert_command(config: &AppConfig, args: ConvertArgs) -> Result<()> {
    if !args.input.is_file() {
        anyhow::bail!("Input file not found: {}", args.input.display());
    }
    let output = args
        .output
        .clone()
        .unwrap_or_else(|| default_output_path(&args.input));

    info!(
        "Converting {} -> {} (preset {})",
        args.input.display(),
        output.display(),
        config.default_preset
    );

    let channel = Arc::new(ConsoleChannel::new(Delivery::File(output.clone())));
    let container = DefaultAppContainer::new(config, channel);
    let attachment = local_attachment(&args.input).await?;

    container
        .circle_interactor()
        .handle(Envelope {
            requester: RequesterId::new("local"),
            chat: ChatId::new("local"),
            message: MessageRef::new("in1"),
            command: InboundCommand::Upload(Some(attachment)),
        })
        .await
        .with_context(|| format!("Failed to convert {}", args.input.display()))?;

    info!("Circle written to {}", output.display());
    Ok(())
}

/// Interactive session reading one command per stdin line
pub async fn chat_command(config: &AppConfig, args: ChatArgs) -> Result<()> {
    tokio::fs::create_dir_all(&args.out_dir)
        .await
        .with_context(|| format!("Cannot create {}", args.out_dir.display()))?;

    let channel = Arc::new(ConsoleChannel::new(Delivery::Directory(args.out_dir.clone())));
    let container = DefaultAppContainer::new(config, channel);
    let cancel = CancellationToken::new();
    let maintenance = container.start_maintenance(cancel.clone());
    let interactor = container.circle_interactor();

    let requester = RequesterId::new(args.user.as_str());
    let chat = ChatId::new(args.user.as_str());
    let mut in_flight = JoinSet::new();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut received = 0u64;

    info!("Chat session started for {}", requester);

    while let Some(line) = lines.next_line().await? {
        let command = match parse_chat_line(&line) {
            ChatLine::Empty => continue,
            ChatLine::Quit => break,
            ChatLine::Upload(path) => match local_attachment(&path).await {
                Ok(attachment) => InboundCommand::Upload(Some(attachment)),
                Err(e) => {
                    warn!("{:#}", e);
                    InboundCommand::Upload(None)
                }
            },
            ChatLine::Command(command) => command,
        };

        received += 1;
        let envelope = Envelope {
            requester: requester.clone(),
            chat: chat.clone(),
            message: MessageRef::new(format!("in{}", received)),
            command,
        };
        // Commands that only touch the selection store run in input order;
        // encodes run in the background.
        if !starts_encode(&envelope.command, config.interactive) {
            if let Err(e) = interactor.handle(envelope).await {
                debug!("Command finished with error: {}", e);
            }
            continue;
        }
        let interactor = Arc::clone(&interactor);
        in_flight.spawn(async move {
            if let Err(e) = interactor.handle(envelope).await {
                debug!("Command finished with error: {}", e);
            }
        });
    }

    while let Some(joined) = in_flight.join_next().await {
        if let Err(e) = joined {
            warn!("Command task failed: {}", e);
        }
    }

    cancel.cancel();
    if let Err(e) = maintenance.await {
        warn!("Maintenance task failed: {}", e);
    }
    info!("Chat session ended after {} commands", received);
    Ok(())
}

/// Print the preset table
pub fn presets_command(args: PresetsArgs) -> Result<()> {
    let registry = QualityPresetRegistry::global();
    let presets: Vec<_> = registry.iter().collect();

    match args.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&presets)?),
        OutputFormat::Yaml => print!("{}", serde_yaml::to_string(&presets)?),
        OutputFormat::Text => {
            println!(
                "{:<10} {:<26} {:>6} {:>4} {:>9} {:>7} {:>8}",
                "KEY", "LABEL", "SIZE", "CRF", "MAXRATE", "AUDIO", "TIMEOUT"
            );
            for p in presets {
                let marker = if p.key == registry.default_preset().key {
                    " (default)"
                } else {
                    ""
                };
                println!(
                    "{:<10} {:<26} {:>6} {:>4} {:>8}k {:>6}k {:>7}s{}",
                    p.key,
                    p.label,
                    p.output_size,
                    p.crf,
                    p.max_bitrate_kbps,
                    p.audio_bitrate_kbps,
                    p.timeout_budget.as_secs(),
                    marker
                );
            }
        }
    }
    Ok(())
}

/// Probe summary with the crop the pipeline would apply
#[derive(Debug, Serialize)]
pub struct ProbeReport {
    pub file: PathBuf,
    pub width: u32,
    pub height: u32,
    pub has_audio: bool,
    pub duration_secs: Option<f64>,
    pub crop: CropPlan,
}

/// Probe a file and print what the pipeline would do with it
pub async fn probe_command(config: &AppConfig, args: ProbeArgs) -> Result<()> {
    if !args.input.is_file() {
        anyhow::bail!("Input file not found: {}", args.input.display());
    }

    let channel = Arc::new(ConsoleChannel::new(Delivery::Directory(PathBuf::from("."))).quiet(true));
    let container = DefaultAppContainer::new(config, channel);
    let facts = container.probe_port().probe(&args.input).await?;

    let report = ProbeReport {
        file: args.input.clone(),
        width: facts.dimensions.width,
        height: facts.dimensions.height,
        has_audio: facts.has_audio,
        duration_secs: facts.duration.map(|d| d.as_secs_f64()),
        crop: TransformPlanner::plan(facts.dimensions),
    };

    match args.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Yaml => print!("{}", serde_yaml::to_string(&report)?),
        OutputFormat::Text => {
            println!("File:     {}", report.file.display());
            println!("Video:    {}x{}", report.width, report.height);
            println!("Audio:    {}", if report.has_audio { "yes" } else { "no" });
            match report.duration_secs {
                Some(secs) => println!("Duration: {:.3}s", secs),
                None => println!("Duration: unknown"),
            }
            println!(
                "Crop:     {}x{} at ({}, {})",
                report.crop.size, report.crop.size, report.crop.x_offset, report.crop.y_offset
            );
        }
    }
    Ok(())
}

/// One parsed line of a chat session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatLine {
    Empty,
    Quit,
    Upload(PathBuf),
    Command(InboundCommand),
}

/// Map a stdin line onto an inbound command
pub fn parse_chat_line(line: &str) -> ChatLine {
    let line = line.trim();
    if line.is_empty() {
        return ChatLine::Empty;
    }

    let (head, rest) = match line.split_once(char::is_whitespace) {
        Some((head, rest)) => (head, rest.trim()),
        None => (line, ""),
    };

    match head {
        "/quit" | "/exit" => ChatLine::Quit,
        "/start" => ChatLine::Command(InboundCommand::Start),
        "/help" => ChatLine::Command(InboundCommand::Help),
        "/upload" if rest.is_empty() => ChatLine::Command(InboundCommand::Upload(None)),
        "/upload" => ChatLine::Upload(PathBuf::from(rest)),
        "/choose" => ChatLine::Command(InboundCommand::PresetChoice(rest.to_string())),
        _ if rest.is_empty() && head.starts_with(CHOICE_PREFIX) => {
            ChatLine::Command(InboundCommand::PresetChoice(head.to_string()))
        }
        _ => ChatLine::Command(InboundCommand::Text(line.to_string())),
    }
}

/// Whether handling `command` runs a transcode
pub fn starts_encode(command: &InboundCommand, interactive: bool) -> bool {
    match command {
        InboundCommand::PresetChoice(_) => true,
        InboundCommand::Upload(_) => !interactive,
        _ => false,
    }
}

/// Describe a local file as an upload attachment
pub async fn local_attachment(path: &Path) -> Result<Attachment> {
    let metadata = tokio::fs::metadata(path)
        .await
        .with_context(|| format!("Cannot read {}", path.display()))?;
    if !metadata.is_file() {
        anyhow::bail!("Not a file: {}", path.display());
    }
    Ok(Attachment {
        file: FileRef::new(path.to_string_lossy()),
        size_bytes: metadata.len(),
        file_name: path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned()),
    })
}

/// `<dir>/<stem>_circle.mp4` next to the input
pub fn default_output_path(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    input.with_file_name(format!("{}{}", stem, OUTPUT_SUFFIX))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_commands() {
        assert_eq!(parse_chat_line("   "), ChatLine::Empty);
        assert_eq!(parse_chat_line("/quit"), ChatLine::Quit);
        assert_eq!(parse_chat_line("/start"), ChatLine::Command(InboundCommand::Start));
        assert_eq!(parse_chat_line("/help"), ChatLine::Command(InboundCommand::Help));
        assert_eq!(
            parse_chat_line("/upload  clips/my video.mov "),
            ChatLine::Upload(PathBuf::from("clips/my video.mov"))
        );
        assert_eq!(
            parse_chat_line("/upload"),
            ChatLine::Command(InboundCommand::Upload(None))
        );
    }

    #[test]
    fn test_parse_preset_choices() {
        assert_eq!(
            parse_chat_line("/choose quality"),
            ChatLine::Command(InboundCommand::PresetChoice("quality".to_string()))
        );
        assert_eq!(
            parse_chat_line("q_fast"),
            ChatLine::Command(InboundCommand::PresetChoice("q_fast".to_string()))
        );
        assert_eq!(
            parse_chat_line("q_fast please"),
            ChatLine::Command(InboundCommand::Text("q_fast please".to_string()))
        );
    }

    #[test]
    fn test_only_encoding_commands_leave_the_input_loop() {
        let upload = InboundCommand::Upload(None);
        assert!(!starts_encode(&upload, true));
        assert!(starts_encode(&upload, false));
        assert!(starts_encode(&InboundCommand::PresetChoice("q_fast".to_string()), true));
        assert!(!starts_encode(&InboundCommand::Start, false));
        assert!(!starts_encode(&InboundCommand::Text("hi".to_string()), true));
    }

    #[test]
    fn test_default_output_path() {
        assert_eq!(
            default_output_path(Path::new("/videos/holiday.mov")),
            PathBuf::from("/videos/holiday_circle.mp4")
        );
        assert_eq!(
            default_output_path(Path::new("clip")),
            PathBuf::from("clip_circle.mp4")
        );
    }

    #[tokio::test]
    async fn test_local_attachment_reads_size_and_name() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Clip.MOV");
        std::fs::write(&path, vec![0u8; 1234]).unwrap();

        let attachment = local_attachment(&path).await.unwrap();
        assert_eq!(attachment.size_bytes, 1234);
        assert_eq!(attachment.extension().as_deref(), Some("mov"));
        assert!(local_attachment(dir.path()).await.is_err());
        assert!(local_attachment(&dir.path().join("missing.mp4")).await.is_err());
    }
}
