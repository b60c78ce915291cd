//! Shared helpers for the integration tests

#![allow(dead_code)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tempfile::TempDir;

use circle_clip::adapters::{ConsoleChannel, Delivery};
use circle_clip::app::DefaultAppContainer;
use circle_clip::domain::model::{Attachment, ChatId, FileRef, MessageRef, RequesterId};
use circle_clip::ports::{Envelope, InboundCommand};
use circle_clip::AppConfig;

/// ffprobe report for a 1920x1080 source with audio, 8 seconds long
pub const LANDSCAPE_PROBE_JSON: &str = r#"{
  "streams": [
    { "index": 0, "codec_type": "video", "width": 1920, "height": 1080 },
    { "index": 1, "codec_type": "audio", "sample_rate": "48000", "channels": 2 }
  ],
  "format": { "duration": "8.000000" }
}"#;

/// Write an executable shell script
pub fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    path
}

/// ffprobe stand-in printing a fixed report
pub fn probe_stub(dir: &Path, json: &str) -> PathBuf {
    write_script(dir, "ffprobe", &format!("cat <<'JSON'\n{}\nJSON", json))
}

/// ffmpeg stand-in that logs its arguments and writes the last one
pub fn encoder_stub(dir: &Path, log: &Path) -> PathBuf {
    write_script(
        dir,
        "ffmpeg",
        &format!(
            "echo \"$@\" >> '{}'\nfor last; do :; done\nprintf 'circle' > \"$last\"",
            log.display()
        ),
    )
}

/// ffmpeg stand-in that exits non-zero with a diagnostic
pub fn failing_encoder_stub(dir: &Path) -> PathBuf {
    write_script(
        dir,
        "ffmpeg",
        "echo '[libx264] broken input' >&2\nexit 1",
    )
}

/// ffmpeg stand-in that records its pid and then hangs
pub fn hanging_encoder_stub(dir: &Path, pid_file: &Path) -> PathBuf {
    write_script(
        dir,
        "ffmpeg",
        &format!("echo $$ > '{}'\nexec sleep 30", pid_file.display()),
    )
}

/// Scratch area holding tool stubs, the job root and delivered clips
pub struct Sandbox {
    pub dir: TempDir,
}

impl Sandbox {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("bin")).unwrap();
        fs::create_dir_all(dir.path().join("jobs")).unwrap();
        Self { dir }
    }

    pub fn bin(&self) -> PathBuf {
        self.dir.path().join("bin")
    }

    pub fn jobs(&self) -> PathBuf {
        self.dir.path().join("jobs")
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    /// Write a source clip of `len` bytes
    pub fn source(&self, name: &str, len: usize) -> PathBuf {
        let path = self.path(name);
        fs::write(&path, vec![7u8; len]).unwrap();
        path
    }

    pub fn config(&self, ffmpeg: PathBuf, ffprobe: PathBuf) -> AppConfig {
        AppConfig {
            ffmpeg_path: ffmpeg,
            ffprobe_path: ffprobe,
            temp_root: self.jobs(),
            interactive: false,
            max_concurrent_jobs: 2,
            ..AppConfig::default()
        }
    }

    pub fn jobs_are_empty(&self) -> bool {
        fs::read_dir(self.jobs()).unwrap().count() == 0
    }
}

/// Container wired to a quiet console channel
pub fn container(config: &AppConfig, delivery: Delivery) -> (DefaultAppContainer, Arc<ConsoleChannel>) {
    let channel = Arc::new(ConsoleChannel::new(delivery).quiet(true));
    let container = DefaultAppContainer::new(config, channel.clone());
    (container, channel)
}

pub fn envelope(command: InboundCommand) -> Envelope {
    Envelope {
        requester: RequesterId::new("tester"),
        chat: ChatId::new("tester"),
        message: MessageRef::new("in1"),
        command,
    }
}

pub fn upload(path: &Path) -> InboundCommand {
    let size_bytes = fs::metadata(path).unwrap().len();
    InboundCommand::Upload(Some(Attachment {
        file: FileRef::new(path.to_string_lossy()),
        size_bytes,
        file_name: path.file_name().map(|n| n.to_string_lossy().into_owned()),
    }))
}
