/*
 Copyright (c) 2025 Mark Hughes

 This program is free software: you can redistribute it and/or modify
 it under the terms of the GNU Affero General Public License as published by
 the Free Software Foundation, either version 3 of the License, or
 (at your option) any later version.

 This program is distributed in the hope that it will be useful,
 but WITHOUT ANY WARRANTY; without even the implied warranty of
 MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
 GNU Affero General Public License for more details.

 You should have received a copy of the GNU Affero General Public License
 along with this program. If not, see <https://www.gnu.org/licenses/>.
*/

use std::io::Write;
use std::path::Path;

use color_eyre::{eyre::eyre, Result};
use log::info;

use deltaweb::delta::EngineKind;

/// Write a patch from `base` to `target`
pub(crate) fn handle_diff(
    base: &Path,
    target: &Path,
    engine: EngineKind,
    output: Option<&Path>,
) -> Result<()> {
    let base_content = read(base)?;
    let target_content = read(target)?;
    let patch = engine.new_engine().encode(&base_content, &target_content)?;
    info!(
        "{engine} patch is {} bytes for a {} byte target",
        patch.len(),
        target_content.len()
    );
    write(output, &patch)
}

/// Write the result of applying `patch` to `base`
pub(crate) fn handle_patch(
    base: &Path,
    patch: &Path,
    engine: EngineKind,
    output: Option<&Path>,
) -> Result<()> {
    let base_content = read(base)?;
    let patch_content = read(patch)?;
    let target = engine.new_engine().apply(&base_content, &patch_content)?;
    info!(
        "{engine} patch of {} bytes produced {} bytes",
        patch_content.len(),
        target.len()
    );
    write(output, &target)
}

fn read(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).map_err(|e| eyre!("failed to read {}: {e}", path.display()))
}

fn write(output: Option<&Path>, content: &[u8]) -> Result<()> {
    match output {
        Some(path) => std::fs::write(path, content)
            .map_err(|e| eyre!("failed to write {}: {e}", path.display())),
        None => Ok(std::io::stdout().write_all(content)?),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diff_then_patch_rebuilds_the_target() {
        let dir = tempfile::tempdir().expect("tempdir");
        let base = dir.path().join("base.html");
        let target = dir.path().join("target.html");
        let patch = dir.path().join("patch");
        let rebuilt = dir.path().join("rebuilt.html");
        std::fs::write(&base, "<ul><li>one</li><li>two</li></ul>").expect("write");
        std::fs::write(&target, "<ul><li>one</li><li>two</li><li>three</li></ul>").expect("write");

        for engine in [EngineKind::Vcdiff, EngineKind::DiffJson] {
            handle_diff(&base, &target, engine, Some(&patch)).expect("diff");
            handle_patch(&base, &patch, engine, Some(&rebuilt)).expect("patch");
            assert_eq!(
                std::fs::read(&rebuilt).expect("read"),
                std::fs::read(&target).expect("read")
            );
        }
    }

    #[test]
    fn missing_files_are_reported() {
        let dir = tempfile::tempdir().expect("tempdir");
        let missing = dir.path().join("missing");
        assert!(handle_diff(&missing, &missing, EngineKind::Vcdiff, None).is_err());
    }
}
