//! Configuration file of a peer process, stored as yaml.
use std::fs;
use std::io;
use std::net::IpAddr;
use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

use ringpeer_core::consts::DEFAULT_BASE_PORT;
use ringpeer_core::consts::DEFAULT_FILE_VARIANTS;
use ringpeer_core::consts::DEFAULT_IO_TIMEOUT_MS;
use ringpeer_core::dht::AddressBook;
use ringpeer_core::peer::PeerBuilder;
use serde::Deserialize;
use serde::Serialize;

use crate::error::Error;
use crate::error::Result;
use crate::util::ensure_parent_dir;
use crate::util::expand_home;

pub const DEFAULT_CONFIG_LOCATION: &str = "~/.ringpeer/config.yaml";
pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_STORAGE_DIR: &str = ".";

/// Settings shared by every peer of a ring. Missing fields fall back to defaults.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub host: String,
    pub heartbeat_base_port: u16,
    pub control_base_port: u16,
    pub io_timeout_ms: u64,
    pub storage_dir: String,
    pub file_variants: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            heartbeat_base_port: DEFAULT_BASE_PORT,
            control_base_port: DEFAULT_BASE_PORT,
            io_timeout_ms: DEFAULT_IO_TIMEOUT_MS,
            storage_dir: DEFAULT_STORAGE_DIR.to_string(),
            file_variants: DEFAULT_FILE_VARIANTS
                .iter()
                .map(|ext| ext.to_string())
                .collect(),
        }
    }
}

impl Config {
    pub fn write_fs<P>(&self, path: P) -> Result<PathBuf>
    where P: AsRef<Path> {
        let path = expand_home(path)?;
        ensure_parent_dir(&path)?;
        let f =
            fs::File::create(path.as_path()).map_err(|e| Error::CreateFileError(e.to_string()))?;
        let f_writer = io::BufWriter::new(f);
        serde_yaml::to_writer(f_writer, self)?;
        Ok(path)
    }

    pub fn read_fs<P>(path: P) -> Result<Config>
    where P: AsRef<Path> {
        let path = expand_home(path)?;
        tracing::debug!("Read config from: {:?}", path);
        let f = fs::File::open(path).map_err(|e| Error::OpenFileError(e.to_string()))?;
        let f_rdr = io::BufReader::new(f);
        Ok(serde_yaml::from_reader(f_rdr)?)
    }

    /// Like [Config::read_fs], but a missing file yields the defaults.
    pub fn load_or_default<P>(path: P) -> Result<Config>
    where P: AsRef<Path> {
        let expanded = expand_home(path.as_ref())?;
        if !expanded.exists() {
            tracing::debug!("No config at {:?}, using defaults", expanded);
            return Ok(Config::default());
        }
        Self::read_fs(expanded)
    }

    pub fn addresses(&self) -> Result<AddressBook> {
        let host: IpAddr = self
            .host
            .parse()
            .map_err(|_| Error::InvalidHost(self.host.clone()))?;
        Ok(AddressBook::new(
            host,
            self.heartbeat_base_port,
            self.control_base_port,
        ))
    }

    pub fn io_timeout(&self) -> Duration {
        Duration::from_millis(self.io_timeout_ms)
    }

    pub fn storage_dir(&self) -> Result<PathBuf> {
        expand_home(&self.storage_dir)
    }

    /// Apply every setting to a peer builder.
    pub fn apply(&self, builder: PeerBuilder) -> Result<PeerBuilder> {
        Ok(builder
            .addresses(self.addresses()?)
            .io_timeout(self.io_timeout())
            .storage_dir(self.storage_dir()?)
            .file_variants(self.file_variants.clone()))
    }
}
