//! `{$var}` path templates and the git branch variable.

use anyhow::Result;
use std::collections::BTreeMap;
use std::path::Path;

use crate::error::Error;
use crate::runtime::Runtime;

/// Replace every `{$name}` in `template` with its value from `vars`.
/// A variable without a value is a configuration error.
pub fn render_template(template: &str, vars: &BTreeMap<&str, String>) -> Result<String> {
    let mut rendered = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find("{$") {
        rendered.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = after.find('}') else {
            return Err(Error::config(format!("Unterminated variable in {:?}", template)).into());
        };

        let name = &after[..end];
        let value = vars.get(name).ok_or_else(|| {
            Error::config(format!(
                "Unknown or unavailable variable {{${}}} in {:?}",
                name, template
            ))
        })?;
        rendered.push_str(value);
        rest = &after[end + 1..];
    }

    rendered.push_str(rest);
    Ok(rendered)
}

/// Name of the branch checked out in `project_dir`, read from `.git/HEAD`.
/// `None` when the directory is not a git checkout or HEAD is detached.
#[tracing::instrument(skip(runtime))]
pub fn current_branch<R: Runtime>(runtime: &R, project_dir: &Path) -> Option<String> {
    let dot_git = project_dir.join(".git");

    let git_dir = if runtime.is_dir(&dot_git) {
        dot_git
    } else {
        // Worktrees and submodules use a `.git` file pointing elsewhere
        let pointer = runtime.read_to_string(&dot_git).ok()?;
        let target = pointer.trim().strip_prefix("gitdir:")?.trim();
        project_dir.join(target)
    };

    let head = runtime.read_to_string(&git_dir.join("HEAD")).ok()?;
    head.trim()
        .strip_prefix("ref: refs/heads/")
        .map(|branch| branch.to_string())
}
