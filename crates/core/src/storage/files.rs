//! Moving file bytes between peers.
use std::path::Path;
use std::path::PathBuf;

use async_trait::async_trait;
use tokio::io::AsyncRead;
use tokio::io::AsyncWriteExt;

use crate::consts::RECEIVED_FILE_PREFIX;
use crate::dht::FileId;
use crate::dht::PeerId;
use crate::error::Error;
use crate::error::Result;
use crate::message::types::ControlMessage;
use crate::message::types::Transfer;
use crate::message::ControlClient;

/// Byte copy of file variants, kept behind a trait so the control protocol does not
/// care where files live.
#[async_trait]
pub trait FileTransfer: Send + Sync {
    /// Send `<file>.<ext>` to `peer`. Returns false when there is no such file here.
    async fn send_file(&self, file: FileId, ext: &str, peer: PeerId) -> Result<bool>;

    /// Store the payload of an incoming transfer, returns the number of bytes written.
    async fn accept_file(
        &self,
        filename: &str,
        reader: &mut (dyn AsyncRead + Send + Unpin),
    ) -> Result<u64>;
}

/// Files in a local directory, received files are prefixed with `received_`.
#[derive(Clone, Debug)]
pub struct DiskFileTransfer {
    dir: PathBuf,
    client: ControlClient,
}

impl DiskFileTransfer {
    /// Serve files out of `dir`.
    pub fn new(dir: impl AsRef<Path>, client: ControlClient) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
            client,
        }
    }

    /// Directory files are read from and written to.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path an incoming transfer named `filename` is written to.
    pub fn received_path(&self, filename: &str) -> Result<PathBuf> {
        validate_filename(filename)?;
        Ok(self
            .dir
            .join(format!("{}{}", RECEIVED_FILE_PREFIX, filename)))
    }
}

/// Filenames travel in a header, never accept anything that leaves the directory.
fn validate_filename(filename: &str) -> Result<()> {
    if filename.is_empty()
        || filename.contains('/')
        || filename.contains('\\')
        || filename.contains("..")
    {
        return Err(Error::InvalidFilename(filename.to_string()));
    }
    Ok(())
}

#[async_trait]
impl FileTransfer for DiskFileTransfer {
    async fn send_file(&self, file: FileId, ext: &str, peer: PeerId) -> Result<bool> {
        let filename = format!("{}.{}", file, ext);
        let path = self.dir.join(&filename);
        let mut source = match tokio::fs::File::open(&path).await {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("No {} to send, skipped", path.display());
                return Ok(false);
            }
            Err(e) => return Err(e.into()),
        };

        let mut stream = self.client.connect(peer).await?;
        let header = ControlMessage::Transfer(Transfer {
            file,
            filename: filename.clone(),
        });
        stream.write_all(&header.to_frame()).await?;
        let sent = tokio::io::copy(&mut source, &mut stream).await?;
        stream.shutdown().await?;
        tracing::info!("Sent {} ({} bytes) to peer {}", filename, sent, peer);
        Ok(true)
    }

    async fn accept_file(
        &self,
        filename: &str,
        reader: &mut (dyn AsyncRead + Send + Unpin),
    ) -> Result<u64> {
        let path = self.received_path(filename)?;
        let mut target = tokio::fs::File::create(&path).await?;
        let written = tokio::io::copy(reader, &mut target).await?;
        target.flush().await?;
        tracing::info!("Received {}", path.display());
        Ok(written)
    }
}
