//! SSH/SFTP backed sessions

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use russh::client::{self, Handle};
use russh::{ChannelMsg, Disconnect};
use russh_keys::key::PublicKey;
use russh_sftp::client::SftpSession;
use sha2::{Digest, Sha256};
use tokio::fs;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, warn};

use crate::errors::DeployError;
use crate::models::credential::Credential;
use crate::models::role::Role;
use crate::remote::{CommandOutput, Connector, RemoteSession, TransferReceipt, MAX_PACKET};
use crate::storage::settings::SshSettings;

/// Prefix OpenSSH tools put in front of SHA-256 fingerprints
const SHA256_PREFIX: &str = "SHA256:";

/// Host key policy for one connection
struct HostKeyCheck {
    address: String,
    pinned: Option<String>,
}

impl HostKeyCheck {
    /// Whether the server's key is acceptable for this host
    fn accepts(&self, server_public_key: &PublicKey) -> bool {
        let fingerprint = server_public_key.fingerprint();
        let Some(pinned) = &self.pinned else {
            warn!(
                "Accepting unpinned host key for {} ({}{})",
                self.address, SHA256_PREFIX, fingerprint
            );
            return true;
        };

        let expected = pinned.trim();
        let expected = expected.strip_prefix(SHA256_PREFIX).unwrap_or(expected);
        if expected == fingerprint {
            return true;
        }
        warn!(
            "Host key mismatch for {}: pinned {}, server presented {}{}",
            self.address, pinned, SHA256_PREFIX, fingerprint
        );
        false
    }
}

#[async_trait]
impl client::Handler for HostKeyCheck {
    type Error = russh::Error;

    async fn check_server_key(
        &mut self,
        server_public_key: &PublicKey,
    ) -> Result<bool, Self::Error> {
        Ok(self.accepts(server_public_key))
    }
}

/// Session against one host, reconnecting for every call
pub struct SshSession {
    credential: Credential,
    port: u16,
    pinned_key: Option<String>,
}

impl SshSession {
    pub fn new(credential: Credential, port: u16, pinned_key: Option<String>) -> Self {
        Self {
            credential,
            port,
            pinned_key,
        }
    }

    async fn connect(&self) -> Result<Handle<HostKeyCheck>, DeployError> {
        let target = self.credential.target();
        debug!("Connecting to {}:{}", target, self.port);

        let config = Arc::new(client::Config::default());
        let handler = HostKeyCheck {
            address: self.credential.address.clone(),
            pinned: self.pinned_key.clone(),
        };

        let mut handle = client::connect(
            config,
            (self.credential.address.as_str(), self.port),
            handler,
        )
        .await
        .map_err(|e| DeployError::ConnectionError(format!("{}:{}: {}", target, self.port, e)))?;

        let authenticated = handle
            .authenticate_password(self.credential.user.clone(), self.credential.secret())
            .await
            .map_err(|e| DeployError::AuthError(format!("{}: {}", target, e)))?;
        if !authenticated {
            return Err(DeployError::AuthError(format!("password rejected for {}", target)));
        }

        Ok(handle)
    }

    async fn disconnect(&self, handle: Handle<HostKeyCheck>) {
        if let Err(e) = handle
            .disconnect(Disconnect::ByApplication, "", "en")
            .await
        {
            debug!("Disconnect from {} failed: {}", self.credential.address, e);
        }
    }

    /// Open the SFTP subsystem; a refusal is a transfer failure
    async fn open_sftp(handle: &Handle<HostKeyCheck>) -> Result<SftpSession, DeployError> {
        let channel = handle
            .channel_open_session()
            .await
            .map_err(sftp_refused)?;
        channel
            .request_subsystem(true, "sftp")
            .await
            .map_err(sftp_refused)?;
        Ok(SftpSession::new(channel.into_stream()).await?)
    }

    async fn upload(
        &self,
        handle: &Handle<HostKeyCheck>,
        source: &Path,
        destination: &str,
    ) -> Result<TransferReceipt, DeployError> {
        let local_err =
            |e: std::io::Error| DeployError::TransferError(format!("{}: {}", source.display(), e));
        let mut local = fs::File::open(source).await.map_err(local_err)?;
        let expected = local.metadata().await.map_err(local_err)?.len();

        let sftp = Self::open_sftp(handle).await?;
        let mut remote = sftp.create(destination).await?;
        let (bytes, sha256) = stream(&mut local, &mut remote)
            .await
            .map_err(|e| DeployError::TransferError(format!("{}: {}", destination, e)))?;

        if bytes != expected {
            return Err(DeployError::TransferError(format!(
                "short copy to {}: {} of {} bytes",
                destination, bytes, expected
            )));
        }

        Ok(TransferReceipt {
            remote_path: destination.to_string(),
            bytes,
            sha256,
        })
    }

    async fn fetch(
        &self,
        handle: &Handle<HostKeyCheck>,
        source: &str,
        destination: &Path,
    ) -> Result<TransferReceipt, DeployError> {
        let sftp = Self::open_sftp(handle).await?;
        let mut remote = sftp.open(source).await?;
        let mut local = fs::File::create(destination).await.map_err(|e| {
            DeployError::TransferError(format!("{}: {}", destination.display(), e))
        })?;
        let (bytes, sha256) = stream(&mut remote, &mut local)
            .await
            .map_err(|e| DeployError::TransferError(format!("{}: {}", source, e)))?;

        Ok(TransferReceipt {
            remote_path: source.to_string(),
            bytes,
            sha256,
        })
    }

    async fn exec(
        &self,
        handle: &Handle<HostKeyCheck>,
        command: &str,
    ) -> Result<CommandOutput, DeployError> {
        let mut channel = handle.channel_open_session().await?;
        channel.exec(true, command).await?;

        let mut stdout = Vec::new();
        let mut stderr = Vec::new();
        let mut exit_status = None;
        while let Some(msg) = channel.wait().await {
            match msg {
                ChannelMsg::Data { ref data } => stdout.extend_from_slice(data),
                ChannelMsg::ExtendedData { ref data, ext: 1 } => stderr.extend_from_slice(data),
                ChannelMsg::ExitStatus { exit_status: code } => exit_status = Some(code),
                _ => {}
            }
        }

        Ok(CommandOutput {
            stdout: String::from_utf8_lossy(&stdout).into_owned(),
            stderr: String::from_utf8_lossy(&stderr).into_owned(),
            exit_status,
        })
    }
}

fn sftp_refused(err: russh::Error) -> DeployError {
    DeployError::TransferError(format!("sftp subsystem unavailable: {}", err))
}

/// Copy `reader` into `writer` in `MAX_PACKET` chunks, hashing as it goes
async fn stream<R, W>(reader: &mut R, writer: &mut W) -> std::io::Result<(u64, String)>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut buf = vec![0u8; MAX_PACKET];
    let mut hasher = Sha256::new();
    let mut bytes = 0u64;

    loop {
        let n = reader.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        writer.write_all(&buf[..n]).await?;
        hasher.update(&buf[..n]);
        bytes += n as u64;
    }
    writer.shutdown().await?;

    Ok((bytes, format!("{:x}", hasher.finalize())))
}

#[async_trait]
impl RemoteSession for SshSession {
    async fn transfer(&self, source: &Path, destination: &str) -> Result<TransferReceipt, DeployError> {
        let handle = self.connect().await?;
        let result = self.upload(&handle, source, destination).await;
        self.disconnect(handle).await;
        result
    }

    async fn run(&self, command: &str) -> Result<CommandOutput, DeployError> {
        let handle = self.connect().await?;
        let result = self.exec(&handle, command).await;
        self.disconnect(handle).await;
        result
    }

    async fn download(&self, source: &str, destination: &Path) -> Result<TransferReceipt, DeployError> {
        let handle = self.connect().await?;
        let result = self.fetch(&handle, source, destination).await;
        self.disconnect(handle).await;
        result
    }
}

/// Connector producing [`SshSession`]s
#[derive(Debug, Clone, Default)]
pub struct SshConnector {
    port: u16,
    pinned_host_keys: HashMap<String, String>,
}

impl SshConnector {
    pub fn new(settings: &SshSettings) -> Self {
        Self {
            port: settings.port,
            pinned_host_keys: settings.pinned_host_keys.clone(),
        }
    }
}

impl Connector for SshConnector {
    fn session(&self, role: Role, credential: &Credential) -> Arc<dyn RemoteSession> {
        debug!("Preparing {} session for {}", role, credential.target());
        Arc::new(SshSession::new(
            credential.clone(),
            self.port,
            self.pinned_host_keys.get(&credential.address).cloned(),
        ))
    }
}
