/* STATIC Proxy (AGPL-3.0)

Copyright (C) 2025 - 404 Contributors

This program is free software: you can redistribute it and/or modify
it under the terms of the GNU Affero General Public License as published by
the Free Software Foundation, either version 3 of the License, or
(at your option) any later version.

This program is distributed in the hope that it will be useful,
but WITHOUT ANY WARRANTY; without even the implied warranty of
MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
GNU Affero General Public License for more details.

You should have received a copy of the GNU Affero General Public License
along with this program.  If not, see <https://www.gnu.org/licenses/>.

*/

use std::path::{Path, PathBuf};

use crate::utils::error::{InjectError, InjectResult};

const ARTIFACT_EXTENSION: &str = "html";

/// Which side of an artifact pair a file holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactRole {
    Original,
    Modified,
}

impl ArtifactRole {
    pub fn tag(self) -> &'static str {
        match self {
            ArtifactRole::Original => "original",
            ArtifactRole::Modified => "modified",
        }
    }
}

/// Locations of one written artifact pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    pub original: PathBuf,
    pub modified: PathBuf,
}

/// Flat directory of `{role}_{sequence}.html` files.
///
/// The directory is expected to exist already; the store never creates it. Files are keyed
/// by sequence number, so concurrent writers with distinct numbers never touch the same path.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    dir: PathBuf,
}

impl ArtifactStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, sequence: u64, role: ArtifactRole) -> PathBuf {
        self.dir
            .join(format!("{}_{}.{}", role.tag(), sequence, ARTIFACT_EXTENSION))
    }

    /// Writes the original body, then the modified one.
    ///
    /// The first failure aborts the pair; an original already on disk is removed again so a
    /// sequence number never ends up with only half of its pair.
    pub async fn write_pair(
        &self,
        sequence: u64,
        original: &str,
        modified: &str,
    ) -> InjectResult<ArtifactPaths> {
        let paths = ArtifactPaths {
            original: self.path_for(sequence, ArtifactRole::Original),
            modified: self.path_for(sequence, ArtifactRole::Modified),
        };
        Self::write_one(&paths.original, original).await?;
        if let Err(err) = Self::write_one(&paths.modified, modified).await {
            if let Err(remove_err) = tokio::fs::remove_file(&paths.original).await {
                tracing::warn!(
                    path = %paths.original.display(),
                    error = %remove_err,
                    "failed to remove unpaired original artifact"
                );
            }
            return Err(err);
        }
        Ok(paths)
    }

    async fn write_one(path: &Path, contents: &str) -> InjectResult<()> {
        tokio::fs::write(path, contents.as_bytes())
            .await
            .map_err(|source| InjectError::StorageWrite {
                path: path.to_path_buf(),
                source,
            })
    }

    /// Highest sequence number already present in the directory, if any.
    ///
    /// Used to resume numbering after a restart instead of overwriting the previous run.
    pub async fn highest_sequence(&self) -> InjectResult<Option<u64>> {
        let mut entries = tokio::fs::read_dir(&self.dir).await?;
        let mut highest: Option<u64> = None;
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            let Some(sequence) = name.to_str().and_then(parse_artifact_name) else {
                continue;
            };
            highest = Some(highest.map_or(sequence, |current| current.max(sequence)));
        }
        Ok(highest)
    }
}

fn parse_artifact_name(name: &str) -> Option<u64> {
    let stem = name.strip_suffix(ARTIFACT_EXTENSION)?.strip_suffix('.')?;
    [ArtifactRole::Original, ArtifactRole::Modified]
        .iter()
        .find_map(|role| stem.strip_prefix(role.tag())?.strip_prefix('_'))
        .and_then(|digits| digits.parse().ok())
}
