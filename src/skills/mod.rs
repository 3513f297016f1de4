//! Skill directories installed before a run.
//!
//! A skill is an immediate subdirectory of the skills root that contains a
//! `SKILL.md` file. Selected skills are copied verbatim into a target
//! directory the inner agent can see.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::error::SkillError;

/// Marker file that identifies a skill directory.
pub const SKILL_MARKER: &str = "SKILL.md";

/// Which skills to install.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SkillFilter {
    /// Every discovered skill.
    #[default]
    All,
    /// Only these exact names. An empty set selects nothing.
    Only(BTreeSet<String>),
}

impl SkillFilter {
    /// Parses a comma-separated selection.
    ///
    /// `None` selects everything, an empty string selects nothing, otherwise
    /// each comma-separated entry is trimmed and blank entries are dropped.
    pub fn parse(raw: Option<&str>) -> Self {
        match raw {
            None => SkillFilter::All,
            Some(list) => SkillFilter::Only(
                list.split(',')
                    .map(str::trim)
                    .filter(|name| !name.is_empty())
                    .map(str::to_string)
                    .collect(),
            ),
        }
    }

    pub fn allows(&self, name: &str) -> bool {
        match self {
            SkillFilter::All => true,
            SkillFilter::Only(names) => names.contains(name),
        }
    }
}

/// A discovered skill directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Skill {
    pub name: String,
    pub path: PathBuf,
}

/// Lists skills under `root` that pass `filter`, sorted by name.
///
/// A missing or non-directory root yields no skills.
pub fn discover_skills(root: &Path, filter: &SkillFilter) -> Result<Vec<Skill>, SkillError> {
    if !root.is_dir() {
        debug!(root = %root.display(), "Skills directory not present");
        return Ok(Vec::new());
    }

    let mut skills = Vec::new();
    for entry in fs::read_dir(root)? {
        let entry = entry?;
        let path = entry.path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()).map(str::to_string) else {
            continue;
        };

        if name.starts_with('.') || !path.is_dir() || !path.join(SKILL_MARKER).is_file() {
            continue;
        }
        if !filter.allows(&name) {
            continue;
        }

        skills.push(Skill { name, path });
    }

    skills.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(skills)
}

/// Copies selected skills into `target/<name>` and returns what was installed.
///
/// `target` is only created when at least one skill is selected.
pub fn install_skills(
    root: &Path,
    filter: &SkillFilter,
    target: &Path,
) -> Result<Vec<Skill>, SkillError> {
    let skills = discover_skills(root, filter)?;
    if skills.is_empty() {
        info!(root = %root.display(), "No skills selected");
        return Ok(skills);
    }

    fs::create_dir_all(target)?;
    for skill in &skills {
        let destination = target.join(&skill.name);
        copy_tree(&skill.path, &destination).map_err(|e| SkillError::CopyFailed {
            name: skill.name.clone(),
            reason: e.to_string(),
        })?;
        debug!(skill = %skill.name, destination = %destination.display(), "Installed skill");
    }

    info!(
        count = skills.len(),
        target = %target.display(),
        "Installed skills"
    );
    Ok(skills)
}

fn copy_tree(source: &Path, destination: &Path) -> Result<(), SkillError> {
    for entry in WalkDir::new(source).follow_links(true) {
        let entry = entry?;
        let relative = entry
            .path()
            .strip_prefix(source)
            .map_err(|e| SkillError::CopyFailed {
                name: source.display().to_string(),
                reason: e.to_string(),
            })?;
        let target = destination.join(relative);

        if entry.file_type().is_dir() {
            fs::create_dir_all(&target)?;
        } else {
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}
