//! Local message channel backed by the terminal and the filesystem
//!
//! File references are local paths. Finished clips are copied to a fixed
//! output file or into a delivery directory.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use tracing::debug;

use crate::domain::model::{ChatId, CircleMeta, FileRef, MessageRef};
use crate::error::{CircleError, CircleResult};
use crate::ports::MessageChannel;
use crate::presets::PresetOption;

/// Where delivered clips end up
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    /// Every clip overwrites this file
    File(PathBuf),
    /// Clips are numbered `circle-<n>.mp4` inside this directory
    Directory(PathBuf),
}

/// Clip handed over through [`MessageChannel::send_circle`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveredClip {
    pub path: PathBuf,
    pub meta: CircleMeta,
}

/// Message channel that prints to stdout and copies files locally
pub struct ConsoleChannel {
    delivery: Delivery,
    next_message: AtomicU64,
    next_clip: AtomicU64,
    delivered: Mutex<Vec<DeliveredClip>>,
    quiet: bool,
}

impl ConsoleChannel {
    pub fn new(delivery: Delivery) -> Self {
        Self {
            delivery,
            next_message: AtomicU64::new(1),
            next_clip: AtomicU64::new(1),
            delivered: Mutex::new(Vec::new()),
            quiet: false,
        }
    }

    /// Suppress status lines on stdout
    pub fn quiet(mut self, quiet: bool) -> Self {
        self.quiet = quiet;
        self
    }

    /// Clips delivered so far, oldest first
    pub fn delivered(&self) -> Vec<DeliveredClip> {
        self.delivered
            .lock()
            .map(|clips| clips.clone())
            .unwrap_or_default()
    }

    fn next_ref(&self) -> MessageRef {
        MessageRef::new(format!("m{}", self.next_message.fetch_add(1, Ordering::Relaxed)))
    }

    fn print(&self, line: &str) {
        if !self.quiet {
            println!("{}", line);
        }
    }

    /// Reserve the path for the next clip; numbers are never handed out twice
    fn destination(&self) -> PathBuf {
        match &self.delivery {
            Delivery::File(path) => path.clone(),
            Delivery::Directory(dir) => {
                let number = self.next_clip.fetch_add(1, Ordering::Relaxed);
                dir.join(format!("circle-{}.mp4", number))
            }
        }
    }
}

fn channel_error(message: String) -> CircleError {
    CircleError::Channel { message }
}

#[async_trait]
impl MessageChannel for ConsoleChannel {
    async fn send_text(&self, _chat: &ChatId, text: &str) -> CircleResult<MessageRef> {
        self.print(text);
        Ok(self.next_ref())
    }

    async fn update_status(
        &self,
        _chat: &ChatId,
        message: &MessageRef,
        text: &str,
    ) -> CircleResult<()> {
        self.print(&format!("[{}] {}", message, text));
        Ok(())
    }

    async fn offer_presets(
        &self,
        _chat: &ChatId,
        prompt: &str,
        options: &[PresetOption],
    ) -> CircleResult<MessageRef> {
        self.print(prompt);
        for option in options {
            self.print(&format!("  {:<10} {}", option.data, option.label));
        }
        Ok(self.next_ref())
    }

    async fn download(&self, file: &FileRef, destination: &Path) -> CircleResult<()> {
        let source = Path::new(file.as_str());
        tokio::fs::copy(source, destination).await.map_err(|e| {
            channel_error(format!("Cannot fetch {}: {}", source.display(), e))
        })?;
        debug!("Fetched {} into {}", source.display(), destination.display());
        Ok(())
    }

    async fn send_circle(
        &self,
        _chat: &ChatId,
        clip: &Path,
        meta: CircleMeta,
        _reply_to: Option<&MessageRef>,
    ) -> CircleResult<()> {
        let destination = self.destination();
        if let Some(parent) = destination.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::copy(clip, &destination).await.map_err(|e| {
            channel_error(format!("Cannot write {}: {}", destination.display(), e))
        })?;
        self.print(&format!(
            "Circle clip saved to {} ({}s, {}x{})",
            destination.display(),
            meta.duration_secs,
            meta.length,
            meta.length
        ));
        if let Ok(mut clips) = self.delivered.lock() {
            clips.push(DeliveredClip {
                path: destination,
                meta,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chat() -> ChatId {
        ChatId::new("local")
    }

    #[tokio::test]
    async fn test_message_refs_are_distinct() {
        let channel = ConsoleChannel::new(Delivery::Directory(PathBuf::from("."))).quiet(true);
        let first = channel.send_text(&chat(), "hello").await.unwrap();
        let second = channel.send_text(&chat(), "again").await.unwrap();
        assert_ne!(first, second);
    }

    #[tokio::test]
    async fn test_download_copies_local_file() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("source.mp4");
        std::fs::write(&source, b"video").unwrap();
        let channel = ConsoleChannel::new(Delivery::Directory(dir.path().to_path_buf())).quiet(true);

        let dest = dir.path().join("input.mp4");
        channel
            .download(&FileRef::new(source.to_string_lossy()), &dest)
            .await
            .unwrap();
        assert_eq!(std::fs::read(&dest).unwrap(), b"video");
    }

    #[tokio::test]
    async fn test_download_of_missing_file_is_a_channel_error() {
        let dir = tempfile::tempdir().unwrap();
        let channel = ConsoleChannel::new(Delivery::Directory(dir.path().to_path_buf())).quiet(true);
        let result = channel
            .download(&FileRef::new("/no/such/file.mp4"), &dir.path().join("x.mp4"))
            .await;
        assert!(matches!(result, Err(CircleError::Channel { .. })));
    }

    #[tokio::test]
    async fn test_directory_delivery_numbers_clips() {
        let dir = tempfile::tempdir().unwrap();
        let clip = dir.path().join("circle.mp4");
        std::fs::write(&clip, b"circle").unwrap();
        let out = dir.path().join("out");
        let channel = ConsoleChannel::new(Delivery::Directory(out.clone())).quiet(true);
        let meta = CircleMeta {
            duration_secs: 8,
            length: 320,
        };

        channel.send_circle(&chat(), &clip, meta, None).await.unwrap();
        channel.send_circle(&chat(), &clip, meta, None).await.unwrap();

        let delivered = channel.delivered();
        assert_eq!(delivered.len(), 2);
        assert_eq!(delivered[0].path, out.join("circle-1.mp4"));
        assert_eq!(delivered[1].path, out.join("circle-2.mp4"));
        assert!(delivered[1].path.exists());
    }

    #[tokio::test]
    async fn test_concurrent_deliveries_get_distinct_files() {
        let dir = tempfile::tempdir().unwrap();
        let first = dir.path().join("a.mp4");
        let second = dir.path().join("b.mp4");
        std::fs::write(&first, b"first").unwrap();
        std::fs::write(&second, b"second").unwrap();
        let out = dir.path().join("out");
        let channel = ConsoleChannel::new(Delivery::Directory(out.clone())).quiet(true);
        let meta = CircleMeta {
            duration_secs: 3,
            length: 240,
        };

        let (chat_a, chat_b) = (chat(), chat());
        let (a, b) = tokio::join!(
            channel.send_circle(&chat_a, &first, meta, None),
            channel.send_circle(&chat_b, &second, meta, None)
        );
        a.unwrap();
        b.unwrap();

        let mut paths: Vec<PathBuf> = channel.delivered().into_iter().map(|c| c.path).collect();
        paths.sort();
        assert_eq!(paths, vec![out.join("circle-1.mp4"), out.join("circle-2.mp4")]);

        let mut contents: Vec<Vec<u8>> = paths.iter().map(|p| std::fs::read(p).unwrap()).collect();
        contents.sort();
        assert_eq!(contents, vec![b"first".to_vec(), b"second".to_vec()]);
    }

    #[tokio::test]
    async fn test_file_delivery_uses_fixed_path() {
        let dir = tempfile::tempdir().unwrap();
        let clip = dir.path().join("circle.mp4");
        std::fs::write(&clip, b"circle").unwrap();
        let target = dir.path().join("result.mp4");
        let channel = ConsoleChannel::new(Delivery::File(target.clone())).quiet(true);
        let meta = CircleMeta {
            duration_secs: 1,
            length: 240,
        };

        channel.send_circle(&chat(), &clip, meta, None).await.unwrap();
        assert_eq!(std::fs::read(&target).unwrap(), b"circle");
        assert_eq!(channel.delivered()[0].meta, meta);
    }
}
