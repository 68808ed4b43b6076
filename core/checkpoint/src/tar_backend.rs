//! `tar` checkpoint backend, used when a thread's workspace is not a git
//! repository. A snapshot is a tar archive of the working directory plus
//! a manifest listing each entry and its sha256 digest.

use crate::error::CheckpointError;
use crate::error::checkpoint_error::IoSnafu;
use runloop_protocol::CheckpointBackend;
use serde::Deserialize;
use serde::Serialize;
use sha2::Digest;
use sha2::Sha256;
use snafu::ResultExt;
use std::path::Path;
use std::path::PathBuf;
use walkdir::WalkDir;

const IGNORED_TOP_LEVEL: &[&str] = &[".git"];

#[derive(Debug, Serialize, Deserialize)]
pub struct TarManifest {
    pub entries: Vec<TarManifestEntry>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TarManifestEntry {
    pub path: String,
    pub sha256: String,
}

fn should_skip(entry: &walkdir::DirEntry, root: &Path) -> bool {
    let rel = entry.path().strip_prefix(root).unwrap_or(entry.path());
    rel.components()
        .next()
        .map(|c| IGNORED_TOP_LEVEL.contains(&c.as_os_str().to_string_lossy().as_ref()))
        .unwrap_or(false)
}

/// Archive `workdir` into `archive_path`, writing a parallel manifest to
/// `manifest_path`.
pub async fn snapshot(
    workdir: &Path,
    archive_path: &Path,
    manifest_path: &Path,
) -> Result<CheckpointBackend, CheckpointError> {
    let workdir = workdir.to_path_buf();
    let archive_path_owned = archive_path.to_path_buf();
    let manifest_path_owned = manifest_path.to_path_buf();

    tokio::task::spawn_blocking(move || -> Result<(), CheckpointError> {
        let archive_file = std::fs::File::create(&archive_path_owned).context(IoSnafu {
            path: archive_path_owned.clone(),
        })?;
        let mut builder = tar::Builder::new(archive_file);
        let mut entries = Vec::new();

        for entry in WalkDir::new(&workdir).into_iter().filter_entry(|e| !should_skip(e, &workdir)) {
            let entry = entry.map_err(|err| CheckpointError::Io {
                path: workdir.clone(),
                source: std::io::Error::other(err),
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            let rel_path = entry.path().strip_prefix(&workdir).unwrap_or(entry.path());
            let bytes = std::fs::read(entry.path()).context(IoSnafu {
                path: entry.path().to_path_buf(),
            })?;
            let digest = format!("{:x}", Sha256::digest(&bytes));
            builder
                .append_path_with_name(entry.path(), rel_path)
                .context(IoSnafu {
                    path: entry.path().to_path_buf(),
                })?;
            entries.push(TarManifestEntry {
                path: rel_path.to_string_lossy().into_owned(),
                sha256: digest,
            });
        }
        builder.finish().context(IoSnafu {
            path: archive_path_owned.clone(),
        })?;

        let manifest = TarManifest { entries };
        let manifest_json = serde_json::to_vec_pretty(&manifest).expect("manifest serializes");
        std::fs::write(&manifest_path_owned, manifest_json).context(IoSnafu {
            path: manifest_path_owned.clone(),
        })?;
        Ok(())
    })
    .await
    .expect("snapshot task panicked")?;

    Ok(CheckpointBackend::Tar {
        archive_path: archive_path.to_string_lossy().into_owned(),
        manifest_path: manifest_path.to_string_lossy().into_owned(),
    })
}

/// Unpack `archive_path` into `workdir`, overwriting existing files.
pub async fn restore(workdir: &Path, archive_path: &Path) -> Result<(), CheckpointError> {
    let workdir = workdir.to_path_buf();
    let archive_path = archive_path.to_path_buf();
    tokio::task::spawn_blocking(move || -> Result<(), CheckpointError> {
        let archive_file = std::fs::File::open(&archive_path).context(IoSnafu {
            path: archive_path.clone(),
        })?;
        let mut archive = tar::Archive::new(archive_file);
        archive.unpack(&workdir).context(IoSnafu { path: workdir.clone() })?;
        Ok(())
    })
    .await
    .expect("restore task panicked")
}

pub fn archive_path_for(checkpoints_root: &Path, checkpoint_id: &str) -> PathBuf {
    checkpoints_root.join(format!("{checkpoint_id}.tar"))
}

pub fn manifest_path_for(checkpoints_root: &Path, checkpoint_id: &str) -> PathBuf {
    checkpoints_root.join(format!("{checkpoint_id}.manifest.json"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn snapshot_and_restore_round_trip() {
        let workdir = tempfile::tempdir().unwrap();
        let checkpoints = tempfile::tempdir().unwrap();
        tokio::fs::write(workdir.path().join("a.txt"), "hello").await.unwrap();
        tokio::fs::create_dir(workdir.path().join("sub")).await.unwrap();
        tokio::fs::write(workdir.path().join("sub/b.txt"), "world").await.unwrap();

        let archive_path = archive_path_for(checkpoints.path(), "cp1");
        let manifest_path = manifest_path_for(checkpoints.path(), "cp1");
        let backend = snapshot(workdir.path(), &archive_path, &manifest_path).await.unwrap();
        let CheckpointBackend::Tar { .. } = backend else {
            panic!("expected tar backend");
        };

        let manifest: TarManifest = serde_json::from_slice(&std::fs::read(&manifest_path).unwrap()).unwrap();
        assert_eq!(manifest.entries.len(), 2);

        tokio::fs::write(workdir.path().join("a.txt"), "mutated").await.unwrap();
        restore(workdir.path(), &archive_path).await.unwrap();
        let restored = tokio::fs::read_to_string(workdir.path().join("a.txt")).await.unwrap();
        assert_eq!(restored, "hello");
    }
}
