//! Key material of one project.

use tracing::warn;

use proseline_core::{DiscoveryKey, Keypair, PublicKey, ReadKey, ReplicationKey, WriteSeed};
use proseline_seal::{InvitationSecrets, OpenedInvitation};

use crate::error::Result;

/// The secrets a peer holds for a project.
///
/// A peer holding only the replication key is a relay and does not need a
/// `ProjectKeys` at all; see [`LogBook::relay`](crate::LogBook::relay).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectKeys {
    replication_key: ReplicationKey,
    read_key: ReadKey,
    project_public_key: PublicKey,
    write_seed: Option<WriteSeed>,
    title: Option<String>,
}

impl ProjectKeys {
    /// Fresh keys for a new project, with write access.
    pub fn generate(title: Option<String>) -> Self {
        let write_seed = WriteSeed::generate();
        Self {
            replication_key: ReplicationKey::generate(),
            read_key: ReadKey::generate(),
            project_public_key: Keypair::from_write_seed(&write_seed).public_key(),
            write_seed: Some(write_seed),
            title,
        }
    }

    /// Keys received in an invitation.
    pub fn from_secrets(secrets: InvitationSecrets) -> Self {
        Self {
            replication_key: secrets.replication_key,
            read_key: secrets.read_key,
            project_public_key: secrets.project_public_key,
            write_seed: secrets.write_seed,
            title: secrets.title,
        }
    }

    /// Keys from an opened invitation.
    ///
    /// A write seed that did not open fails the call. A title that did not
    /// open is dropped.
    pub fn from_invitation(opened: OpenedInvitation) -> Result<Self> {
        let title = match opened.title {
            Some(Ok(title)) => Some(title),
            Some(Err(e)) => {
                warn!(reason = %e, "dropping invitation title");
                None
            }
            None => None,
        };
        Ok(Self {
            replication_key: opened.replication_key,
            read_key: opened.read_key,
            project_public_key: opened.project_public_key,
            write_seed: opened.write_seed.transpose()?,
            title,
        })
    }

    pub fn replication_key(&self) -> &ReplicationKey {
        &self.replication_key
    }

    pub fn read_key(&self) -> &ReadKey {
        &self.read_key
    }

    pub fn project_public_key(&self) -> PublicKey {
        self.project_public_key
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    pub fn discovery_key(&self) -> DiscoveryKey {
        self.replication_key.discovery_key()
    }

    pub fn can_write(&self) -> bool {
        self.write_seed.is_some()
    }

    /// The project keypair, when this peer may write.
    pub fn project_keypair(&self) -> Option<Keypair> {
        self.write_seed.as_ref().map(Keypair::from_write_seed)
    }

    /// Secrets to invite another peer with. Write access is passed on only
    /// when asked for and held.
    pub fn invitation_secrets(&self, grant_write: bool) -> InvitationSecrets {
        InvitationSecrets {
            replication_key: self.replication_key.clone(),
            project_public_key: self.project_public_key,
            read_key: self.read_key.clone(),
            write_seed: self.write_seed.clone().filter(|_| grant_write),
            title: self.title.clone(),
        }
    }
}
