//! Invitations: the bundle of secrets one device sends another to grant
//! access to a project.
//!
//! Each secret is encrypted independently under the invitation key with
//! its own nonce, so a corrupt optional field never hides the required
//! ones. The replication key travels in clear or sealed, per deployment.

use serde_json::{Map, Value};

use proseline_core::json;
use proseline_core::{
    BinaryEncoding, CryptoProvider, InvitationKey, Keypair, Nonce, PublicKey, ReadKey,
    ReplicationKey, StandardCrypto, ValidationError, ValidationReason, WriteSeed, MAC_LEN,
};

use crate::error::{Result, SealError};

/// Ciphertext of one secret plus its nonce.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SealedField {
    pub ciphertext: Vec<u8>,
    pub nonce: Nonce,
}

impl SealedField {
    fn to_json(&self, encoding: BinaryEncoding) -> Value {
        let mut object = Map::new();
        object.insert("ciphertext".into(), encoding.encode(&self.ciphertext).into());
        object.insert("nonce".into(), self.nonce.encode(encoding).into());
        Value::Object(object)
    }

    /// Parse a sealed field whose plaintext is `plaintext_len` bytes, or
    /// any non-empty length when `None`.
    fn from_json(
        value: &Value,
        field: &str,
        plaintext_len: Option<usize>,
        encoding: BinaryEncoding,
    ) -> Result<Self> {
        let object = json::as_object(value, field)?;
        json::deny_unknown(object, &["ciphertext", "nonce"])?;
        let nonce = Nonce(json::bytes::<24>(object, "nonce", encoding)?);
        let ciphertext = json::var_bytes(object, "ciphertext", encoding)?;

        let actual = ciphertext.len();
        let ok = match plaintext_len {
            Some(len) => actual == len + MAC_LEN,
            None => actual > MAC_LEN,
        };
        if !ok {
            let min = plaintext_len.unwrap_or(1) + MAC_LEN;
            return Err(ValidationError::new(
                field,
                ValidationReason::Length {
                    min: encoding.encoded_len(min),
                    max: plaintext_len.map(|len| encoding.encoded_len(len + MAC_LEN)),
                    actual: encoding.encoded_len(actual),
                },
            )
            .into());
        }
        Ok(Self { ciphertext, nonce })
    }
}

/// How an invitation carries the replication key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplicationKeyField {
    Clear(ReplicationKey),
    Sealed(SealedField),
}

/// An encoded invitation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invitation {
    pub replication_key: ReplicationKeyField,
    /// Lets readers verify project signatures without the write seed.
    pub project_public_key: PublicKey,
    pub read_key: SealedField,
    pub write_seed: Option<SealedField>,
    pub title: Option<SealedField>,
}

const INVITATION_FIELDS: [&str; 5] = [
    "replicationKey",
    "projectPublicKey",
    "readKey",
    "writeSeed",
    "title",
];

impl Invitation {
    fn sealed_fields(&self) -> impl Iterator<Item = (&'static str, &SealedField)> + '_ {
        let replication = match &self.replication_key {
            ReplicationKeyField::Sealed(sealed) => Some(("replicationKey", sealed)),
            ReplicationKeyField::Clear(_) => None,
        };
        replication
            .into_iter()
            .chain(Some(("readKey", &self.read_key)))
            .chain(self.write_seed.as_ref().map(|s| ("writeSeed", s)))
            .chain(self.title.as_ref().map(|s| ("title", s)))
    }

    pub fn to_json(&self, encoding: BinaryEncoding) -> Value {
        let mut object = Map::new();
        let replication = match &self.replication_key {
            ReplicationKeyField::Clear(key) => key.encode(encoding).into(),
            ReplicationKeyField::Sealed(sealed) => sealed.to_json(encoding),
        };
        object.insert("replicationKey".into(), replication);
        object.insert(
            "projectPublicKey".into(),
            self.project_public_key.encode(encoding).into(),
        );
        object.insert("readKey".into(), self.read_key.to_json(encoding));
        if let Some(seed) = &self.write_seed {
            object.insert("writeSeed".into(), seed.to_json(encoding));
        }
        if let Some(title) = &self.title {
            object.insert("title".into(), title.to_json(encoding));
        }
        Value::Object(object)
    }

    /// Parse and structurally validate an invitation.
    pub fn from_json(value: &Value, encoding: BinaryEncoding) -> Result<Self> {
        let object = json::as_object(value, "$")?;
        json::deny_unknown(object, &INVITATION_FIELDS)?;

        let replication_key = match json::required(object, "replicationKey")? {
            Value::String(text) => ReplicationKeyField::Clear(
                ReplicationKey::decode(encoding, text).map_err(|e| {
                    ValidationError::new("replicationKey", ValidationReason::Encoding(e))
                })?,
            ),
            other => ReplicationKeyField::Sealed(SealedField::from_json(
                other,
                "replicationKey",
                Some(ReplicationKey::LEN),
                encoding,
            )?),
        };
        let project_public_key = PublicKey(json::bytes::<32>(object, "projectPublicKey", encoding)?);
        let read_key = SealedField::from_json(
            json::required(object, "readKey")?,
            "readKey",
            Some(ReadKey::LEN),
            encoding,
        )?;
        let optional = |field: &str, len: Option<usize>| -> Result<Option<SealedField>> {
            object
                .get(field)
                .map(|value| SealedField::from_json(value, field, len, encoding))
                .transpose()
        };
        let write_seed = optional("writeSeed", Some(WriteSeed::LEN))?;
        let title = optional("title", None)?;

        let invitation = Self {
            replication_key,
            project_public_key,
            read_key,
            write_seed,
            title,
        };
        invitation.check_nonces()?;
        Ok(invitation)
    }

    fn check_nonces(&self) -> Result<()> {
        let mut seen = Vec::with_capacity(4);
        for (field, sealed) in self.sealed_fields() {
            if seen.contains(&sealed.nonce) {
                return Err(ValidationError::new(field, ValidationReason::Duplicate).into());
            }
            seen.push(sealed.nonce);
        }
        Ok(())
    }
}

/// Plaintext contents of an invitation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvitationSecrets {
    pub replication_key: ReplicationKey,
    pub project_public_key: PublicKey,
    pub read_key: ReadKey,
    pub write_seed: Option<WriteSeed>,
    pub title: Option<String>,
}

/// Result of opening an invitation.
///
/// Optional fields decrypt independently: a corrupt title still yields
/// the keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenedInvitation {
    pub replication_key: ReplicationKey,
    pub project_public_key: PublicKey,
    pub read_key: ReadKey,
    pub write_seed: Option<Result<WriteSeed>>,
    pub title: Option<Result<String>>,
}

impl OpenedInvitation {
    /// All fields, failing on the first optional field that did not open.
    pub fn into_secrets(self) -> Result<InvitationSecrets> {
        Ok(InvitationSecrets {
            replication_key: self.replication_key,
            project_public_key: self.project_public_key,
            read_key: self.read_key,
            write_seed: self.write_seed.transpose()?,
            title: self.title.transpose()?,
        })
    }
}

/// Creates and opens invitations.
#[derive(Debug, Clone, Copy, Default)]
pub struct InvitationCodec<C = StandardCrypto> {
    crypto: C,
    seal_replication_key: bool,
}

impl InvitationCodec {
    pub fn new(seal_replication_key: bool) -> Self {
        Self::with_crypto(StandardCrypto, seal_replication_key)
    }
}

impl<C: CryptoProvider> InvitationCodec<C> {
    pub fn with_crypto(crypto: C, seal_replication_key: bool) -> Self {
        Self {
            crypto,
            seal_replication_key,
        }
    }

    /// Encrypt each secret under `key` with a fresh nonce.
    pub fn create_invitation(
        &self,
        secrets: &InvitationSecrets,
        key: &InvitationKey,
    ) -> Result<Invitation> {
        if secrets.title.as_deref() == Some("") {
            return Err(ValidationError::new(
                "title",
                ValidationReason::Length {
                    min: 1,
                    max: None,
                    actual: 0,
                },
            )
            .into());
        }
        if let Some(seed) = &secrets.write_seed {
            if Keypair::from_write_seed(seed).public_key() != secrets.project_public_key {
                return Err(SealError::Mismatch {
                    field: "projectPublicKey",
                });
            }
        }

        let mut used = Vec::with_capacity(4);
        let mut seal = |plaintext: &[u8]| -> Result<SealedField> {
            let nonce = loop {
                let nonce = Nonce::generate();
                if !used.contains(&nonce) {
                    break nonce;
                }
            };
            used.push(nonce);
            let ciphertext = self
                .crypto
                .seal(key.as_bytes(), &nonce, plaintext)
                .map_err(|e| SealError::Encrypt(e.to_string()))?;
            Ok(SealedField { ciphertext, nonce })
        };

        let replication_key = if self.seal_replication_key {
            ReplicationKeyField::Sealed(seal(secrets.replication_key.as_bytes())?)
        } else {
            ReplicationKeyField::Clear(secrets.replication_key.clone())
        };
        let read_key = seal(secrets.read_key.as_bytes())?;
        let write_seed = match &secrets.write_seed {
            Some(seed) => Some(seal(seed.as_bytes())?),
            None => None,
        };
        let title = match &secrets.title {
            Some(title) => Some(seal(title.as_bytes())?),
            None => None,
        };

        Ok(Invitation {
            replication_key,
            project_public_key: secrets.project_public_key,
            read_key,
            write_seed,
            title,
        })
    }

    /// Decrypt an invitation. Required fields fail the whole call; optional
    /// fields report their own result.
    pub fn open_invitation(
        &self,
        invitation: &Invitation,
        key: &InvitationKey,
    ) -> Result<OpenedInvitation> {
        let replication_key = match &invitation.replication_key {
            ReplicationKeyField::Clear(key) => key.clone(),
            ReplicationKeyField::Sealed(sealed) => {
                ReplicationKey::from_bytes(self.open_key(sealed, key, "replicationKey")?)
            }
        };
        let read_key = ReadKey::from_bytes(self.open_key(&invitation.read_key, key, "readKey")?);

        let write_seed = invitation.write_seed.as_ref().map(|sealed| {
            let seed = WriteSeed::from_bytes(self.open_key(sealed, key, "writeSeed")?);
            if Keypair::from_write_seed(&seed).public_key() != invitation.project_public_key {
                return Err(SealError::Mismatch {
                    field: "projectPublicKey",
                });
            }
            Ok(seed)
        });
        let title = invitation.title.as_ref().map(|sealed| {
            let bytes = self.open(sealed, key, "title")?;
            String::from_utf8(bytes).map_err(|e| SealError::Malformed(e.to_string()))
        });

        Ok(OpenedInvitation {
            replication_key,
            project_public_key: invitation.project_public_key,
            read_key,
            write_seed,
            title,
        })
    }

    fn open(&self, sealed: &SealedField, key: &InvitationKey, field: &'static str) -> Result<Vec<u8>> {
        self.crypto
            .open(key.as_bytes(), &sealed.nonce, &sealed.ciphertext)
            .map_err(|_| SealError::Decrypt { field })
    }

    fn open_key(
        &self,
        sealed: &SealedField,
        key: &InvitationKey,
        field: &'static str,
    ) -> Result<[u8; 32]> {
        self.open(sealed, key, field)?
            .try_into()
            .map_err(|_| SealError::Malformed(format!("`{field}` is not 32 bytes")))
    }
}
