//! Workspace discovery and argument interpretation.

use std::path::{Path, PathBuf};

use jadep_core::{Error, Label, Result};
use jadep_loader::{load_rules, Loader};

/// Returns the workspace directory jadep should operate in, and the
/// working directory relative to it.
///
/// With an explicit flag, the directory must contain a WORKSPACE file and
/// the relative working directory is empty. Otherwise the search walks up
/// from the current working directory.
pub fn workspace(workspace_flag: Option<&Path>) -> Result<(PathBuf, String)> {
    if let Some(dir) = workspace_flag {
        let dir = dir
            .canonicalize()
            .map_err(|e| Error::config(format!("couldn't make {} absolute: {e}", dir.display())))?;
        if !has_workspace_file(&dir) {
            return Err(Error::config(format!(
                "directory {} has no file named WORKSPACE",
                dir.display()
            )));
        }
        return Ok((dir, String::new()));
    }

    let cwd = std::env::current_dir()
        .map_err(|e| Error::config(format!("couldn't get working directory: {e}")))?;
    let mut dir = cwd.as_path();
    loop {
        if has_workspace_file(dir) {
            let rel = cwd
                .strip_prefix(dir)
                .map(|p| p.to_string_lossy().into_owned())
                .unwrap_or_default();
            return Ok((dir.to_path_buf(), rel));
        }
        match dir.parent() {
            Some(parent) => dir = parent,
            None => {
                return Err(Error::config(format!(
                    "couldn't find a parent of {} that has a WORKSPACE file",
                    cwd.display()
                )))
            }
        }
    }
}

fn has_workspace_file(dir: &Path) -> bool {
    dir.join("WORKSPACE").exists() || dir.join("WORKSPACE.bazel").exists()
}

/// Returns the files to parse for `arg`.
///
/// If `arg` is a label, the rule is loaded and its `srcs` returned as
/// paths under `workspace_dir`. Otherwise `arg` names a file, resolved
/// against the working directory.
pub async fn files_to_parse(
    arg: &str,
    workspace_dir: &Path,
    rel_working_dir: &str,
    loader: &dyn Loader,
) -> Result<Vec<PathBuf>> {
    let Ok(label) = Label::parse_absolute(arg) else {
        // Not a label, must be a file.
        let path = Path::new(arg);
        if path.is_absolute() {
            return Ok(vec![path.to_path_buf()]);
        }
        return Ok(vec![workspace_dir.join(rel_working_dir).join(path)]);
    };

    let (rules, _) = load_rules(loader, std::slice::from_ref(&label)).await?;
    let rule = rules
        .get(&label)
        .ok_or_else(|| Error::load(format!("rule not found: {label}")))?;
    let mut result = Vec::new();
    for src in rule.string_list("srcs") {
        match Label::parse_relative(&rule.pkg_name, src) {
            Ok(src_label) => {
                let (pkg, name) = src_label.split();
                result.push(workspace_dir.join(pkg).join(name));
            }
            Err(_) => {
                tracing::warn!("Illegal label {src:?} in srcs attribute, skipping.");
            }
        }
    }
    Ok(result)
}

/// Makes a file argument relative to the workspace root.
pub fn workspace_relative(
    arg: &str,
    workspace_dir: &Path,
    rel_working_dir: &str,
) -> Result<String> {
    let path = Path::new(arg);
    if path.is_absolute() {
        let rel = path.strip_prefix(workspace_dir).map_err(|_| {
            Error::invalid_input(format!(
                "{arg:?} is not a relative path nor in a subdirectory of {}",
                workspace_dir.display()
            ))
        })?;
        return Ok(rel.to_string_lossy().into_owned());
    }
    let joined = Path::new(rel_working_dir).join(path);
    Ok(joined.to_string_lossy().into_owned())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use jadep_loader::testing::{java_library, pkg, FakeLoader};
    use std::sync::Arc;

    #[test]
    fn test_workspace_flag_requires_workspace_file() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(workspace(Some(tmp.path())).is_err());
        std::fs::write(tmp.path().join("WORKSPACE"), "").unwrap();
        let (dir, rel) = workspace(Some(tmp.path())).unwrap();
        assert_eq!(dir, tmp.path().canonicalize().unwrap());
        assert_eq!(rel, "");
    }

    #[tokio::test]
    async fn test_files_to_parse_plain_file() {
        let loader = Arc::new(FakeLoader::new());
        let files = files_to_parse("Foo.java", Path::new("/ws"), "java/com", &loader)
            .await
            .unwrap();
        assert_eq!(files, vec![PathBuf::from("/ws/java/com/Foo.java")]);
    }

    #[tokio::test]
    async fn test_files_to_parse_label() {
        let mut fake = FakeLoader::new();
        fake.add_package(
            "x",
            pkg(vec![java_library("x", "Foo", &["Foo.java", "sub/Bar.java"], &[], &[])]),
        );
        let loader = Arc::new(fake);
        let mut files = files_to_parse("//x:Foo", Path::new("/ws"), "", &loader)
            .await
            .unwrap();
        files.sort();
        assert_eq!(
            files,
            vec![
                PathBuf::from("/ws/x/Foo.java"),
                PathBuf::from("/ws/x/sub/Bar.java")
            ]
        );
    }

    #[tokio::test]
    async fn test_files_to_parse_missing_rule() {
        let loader = Arc::new(FakeLoader::new());
        assert!(files_to_parse("//x:Nope", Path::new("/ws"), "", &loader)
            .await
            .is_err());
    }

    #[test]
    fn test_workspace_relative() {
        assert_eq!(
            workspace_relative("Foo.java", Path::new("/ws"), "java/com").unwrap(),
            "java/com/Foo.java"
        );
        assert_eq!(
            workspace_relative("/ws/java/Foo.java", Path::new("/ws"), "").unwrap(),
            "java/Foo.java"
        );
        assert!(workspace_relative("/elsewhere/Foo.java", Path::new("/ws"), "").is_err());
    }
}
