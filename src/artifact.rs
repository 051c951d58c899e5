//! Compiled artifact: the decision table plus everything a host needs to use it
//!
//! The artifact is a plain value; rendering it to bytes is a separate, final
//! step. A SHA-256 fingerprint over the encoder, output slots and entries is
//! stored alongside and checked on every load.

use crate::encoding::Encoder;
use crate::error::{CompileError, Result};
use crate::lookup::NoDataMode;
use crate::table::{DecisionTable, Entry, Slot};
use crate::variable::ProblemId;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};

/// Version of the artifact layout this build reads and writes
pub const FORMAT_VERSION: u32 = 1;

/// On-disk encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactFormat {
    /// Pretty-printed JSON (default)
    #[default]
    Json,
    /// MessagePack with named fields
    #[value(name = "msgpack")]
    #[serde(alias = "msgpack")]
    MessagePack,
}

impl ArtifactFormat {
    pub fn extension(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::MessagePack => "msgpack",
        }
    }

    /// Guess the format from a file extension, defaulting to JSON
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some("msgpack") | Some("mpk") => Self::MessagePack,
            _ => Self::Json,
        }
    }
}

/// Lookup artifact for one problem
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Artifact {
    pub format_version: u32,
    pub compiler_version: String,
    pub problem: ProblemId,
    pub slices: usize,
    pub no_data_mode: NoDataMode,
    pub table: DecisionTable,
    /// Hex SHA-256 of the canonical JSON of encoder, outputs and entries
    pub fingerprint: String,
}

#[derive(Serialize)]
struct Fingerprinted<'a> {
    encoder: &'a Encoder,
    outputs: &'a [Slot],
    entries: &'a [Entry],
}

impl Artifact {
    pub fn new(table: DecisionTable, slices: usize, no_data_mode: NoDataMode) -> Result<Self> {
        table.validate()?;
        let fingerprint = fingerprint(&table)?;
        Ok(Self {
            format_version: FORMAT_VERSION,
            compiler_version: env!("CARGO_PKG_VERSION").to_string(),
            problem: table.problem,
            slices,
            no_data_mode,
            table,
            fingerprint,
        })
    }

    /// Check the format version, the table's structure and the fingerprint
    ///
    /// A matching fingerprint only proves the bytes are unchanged, so the
    /// strides, size and entry count are checked independently of it.
    pub fn verify(&self) -> Result<()> {
        if self.format_version != FORMAT_VERSION {
            return Err(CompileError::UnsupportedArtifactVersion {
                found: self.format_version,
                supported: FORMAT_VERSION,
            });
        }
        self.table.validate()?;
        let computed = fingerprint(&self.table)?;
        if computed != self.fingerprint {
            return Err(CompileError::FingerprintMismatch {
                expected: self.fingerprint.clone(),
                computed,
            });
        }
        Ok(())
    }

    pub fn file_name(&self, format: ArtifactFormat) -> String {
        format!("problem_{}.{}", self.problem, format.extension())
    }

    pub fn to_bytes(&self, format: ArtifactFormat) -> Result<Vec<u8>> {
        match format {
            ArtifactFormat::Json => Ok(serde_json::to_vec_pretty(self)?),
            ArtifactFormat::MessagePack => Ok(rmp_serde::to_vec_named(self)?),
        }
    }

    /// Decode and verify
    pub fn from_bytes(bytes: &[u8], format: ArtifactFormat) -> Result<Self> {
        let artifact: Self = match format {
            ArtifactFormat::Json => serde_json::from_slice(bytes)?,
            ArtifactFormat::MessagePack => rmp_serde::from_slice(bytes)?,
        };
        artifact.verify()?;
        Ok(artifact)
    }

    /// Write into `dir` as `problem_<id>.<ext>`, creating `dir` if needed
    pub fn write_to(&self, dir: &Path, format: ArtifactFormat) -> Result<PathBuf> {
        fs::create_dir_all(dir)?;
        let path = dir.join(self.file_name(format));
        fs::write(&path, self.to_bytes(format)?)?;
        Ok(path)
    }

    pub fn read_from(path: &Path) -> Result<Self> {
        let bytes = fs::read(path)?;
        Self::from_bytes(&bytes, ArtifactFormat::from_path(path))
    }
}

fn fingerprint(table: &DecisionTable) -> Result<String> {
    let canonical = serde_json::to_vec(&Fingerprinted {
        encoder: &table.encoder,
        outputs: &table.outputs,
        entries: &table.entries,
    })?;
    Ok(hex::encode(Sha256::digest(&canonical)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::fixtures::two_input_table;
    use crate::variable::Value;
    use tempfile::TempDir;

    fn artifact() -> Artifact {
        Artifact::new(two_input_table(), 10, NoDataMode::Return).unwrap()
    }

    #[test]
    fn test_fingerprint_is_stable_hex() {
        let a = artifact();
        let b = artifact();
        assert_eq!(a.fingerprint, b.fingerprint);
        assert_eq!(a.fingerprint.len(), 64);
        assert!(a.fingerprint.chars().all(|c| c.is_ascii_hexdigit()));
        a.verify().unwrap();
    }

    #[test]
    fn test_tampered_entry_is_rejected() {
        let mut a = artifact();
        a.table.entries[1] = Entry::Outputs {
            values: vec![Value::Discrete(99)],
            score: 0.0,
        };
        assert!(matches!(
            a.verify(),
            Err(CompileError::FingerprintMismatch { .. })
        ));
    }

    /// Edit the serialized artifact, then re-sign it so only structure can fail
    fn resigned(edit: impl FnOnce(&mut serde_json::Value)) -> Artifact {
        let mut json = serde_json::to_value(artifact()).unwrap();
        edit(&mut json);
        let mut a: Artifact = serde_json::from_value(json).unwrap();
        a.fingerprint = fingerprint(&a.table).unwrap();
        a
    }

    #[test]
    fn test_resigned_stride_is_rejected() {
        let a = resigned(|json| {
            json["table"]["encoder"]["axes"][0]["stride"] = (usize::MAX / 2).into();
        });
        assert!(matches!(a.verify(), Err(CompileError::MalformedTable(_))));
        assert!(crate::lookup::Lookup::from_artifact(a).is_err());
    }

    #[test]
    fn test_resigned_entry_count_is_rejected() {
        let a = resigned(|json| {
            json["table"]["entries"].as_array_mut().unwrap().truncate(4);
        });
        assert!(matches!(a.verify(), Err(CompileError::MalformedTable(_))));

        let bytes = a.to_bytes(ArtifactFormat::MessagePack).unwrap();
        assert!(matches!(
            Artifact::from_bytes(&bytes, ArtifactFormat::MessagePack),
            Err(CompileError::MalformedTable(_))
        ));
    }

    #[test]
    fn test_resigned_size_is_rejected() {
        let a = resigned(|json| {
            json["table"]["encoder"]["size"] = 40.into();
        });
        assert!(a.verify().is_err());
    }

    #[test]
    fn test_inconsistent_table_is_not_packaged() {
        let mut table = two_input_table();
        table.entries.truncate(3);
        assert!(matches!(
            Artifact::new(table, 10, NoDataMode::Return),
            Err(CompileError::MalformedTable(_))
        ));
    }

    #[test]
    fn test_unknown_version_is_rejected() {
        let mut a = artifact();
        a.format_version = FORMAT_VERSION + 1;
        assert!(matches!(
            a.verify(),
            Err(CompileError::UnsupportedArtifactVersion { found: 2, supported: 1 })
        ));
    }

    #[test]
    fn test_json_bytes_decode_to_same_artifact() {
        let a = artifact();
        let bytes = a.to_bytes(ArtifactFormat::Json).unwrap();
        assert_eq!(Artifact::from_bytes(&bytes, ArtifactFormat::Json).unwrap(), a);
    }

    #[test]
    fn test_msgpack_is_smaller_than_json() {
        let a = artifact();
        let json = a.to_bytes(ArtifactFormat::Json).unwrap();
        let packed = a.to_bytes(ArtifactFormat::MessagePack).unwrap();
        assert!(packed.len() < json.len());
        assert_eq!(
            Artifact::from_bytes(&packed, ArtifactFormat::MessagePack).unwrap(),
            a
        );
    }

    #[test]
    fn test_write_and_read_back() {
        let dir = TempDir::new().unwrap();
        let a = artifact();
        let path = a
            .write_to(&dir.path().join("out"), ArtifactFormat::MessagePack)
            .unwrap();
        assert!(path.ends_with("problem_7.msgpack"));
        assert_eq!(Artifact::read_from(&path).unwrap(), a);
    }

    #[test]
    fn test_garbage_is_an_error_not_a_panic() {
        assert!(Artifact::from_bytes(b"{not json", ArtifactFormat::Json).is_err());
        assert!(Artifact::from_bytes(&[0xc1, 0x00], ArtifactFormat::MessagePack).is_err());
    }

    #[test]
    fn test_format_from_path() {
        assert_eq!(
            ArtifactFormat::from_path(Path::new("a/problem_1.msgpack")),
            ArtifactFormat::MessagePack
        );
        assert_eq!(
            ArtifactFormat::from_path(Path::new("problem_1.json")),
            ArtifactFormat::Json
        );
    }
}
