//! Editing BUILD files through buildozer.
//!
//! The actual rewriting is delegated to a buildozer binary; this crate
//! shapes the commands and knows how to address rules that were produced
//! by macros.

#![deny(warnings)]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]

use async_trait::async_trait;
use std::path::PathBuf;
use tracing::debug;

use jadep_core::{Error, Label, Result, Rule};

/// Edits BUILD files.
#[async_trait]
pub trait BuildEditor: Send + Sync {
    /// Creates `rule` in its package's BUILD file, with its `srcs`.
    /// Idempotent: creating an existing rule is not an error.
    async fn new_rule(&self, rule: &Rule) -> Result<()>;

    /// Appends `labels` to the `deps` attribute of `rule`.
    async fn add_deps(&self, rule: &Rule, labels: &[Label]) -> Result<()>;
}

/// Returns a token buildozer can use to address a rule.
///
/// When a rule is instantiated directly, its reference equals its label.
/// When it comes from a macro with a `generator_name`, the reference is a
/// label-shaped string using that name; otherwise it is `//pkg:%<line>`
/// with the line where the macro starts.
pub fn buildozer_ref(rule: &Rule) -> Result<String> {
    if !rule.attrs.contains_key("generator_function") {
        // Not a macro.
        return Ok(rule.label().to_string());
    }
    let name = match rule.str_attr("generator_name", "") {
        "" => {
            let location = rule.str_attr("generator_location", "");
            let mut parts = location.split(':');
            let (Some(_), Some(line), None) = (parts.next(), parts.next(), parts.next()) else {
                return Err(Error::editor(format!(
                    "expected rule's generator_location ({location:?}) to have exactly one colon"
                )));
            };
            format!("%{line}")
        }
        name => name.to_string(),
    };
    Ok(format!("//{}:{name}", rule.pkg_name))
}

/// A [`BuildEditor`] that shells out to a buildozer binary.
pub struct BuildozerEditor {
    workspace_root: PathBuf,
    executable: String,
}

impl BuildozerEditor {
    pub fn new(workspace_root: impl Into<PathBuf>, executable: impl Into<String>) -> BuildozerEditor {
        BuildozerEditor {
            workspace_root: workspace_root.into(),
            executable: executable.into(),
        }
    }

    /// Runs one buildozer command line, tolerating the given exit codes.
    /// Code 3 means "command was a no-op", which several callers accept.
    async fn exec(&self, args: &[String], allowed_codes: &[i32]) -> Result<()> {
        debug!("buildozer {:?}", args);
        let output = tokio::process::Command::new(&self.executable)
            .arg(format!("--root_dir={}", self.workspace_root.display()))
            .arg("-quiet")
            .arg("-k")
            .args(args)
            .output()
            .await
            .map_err(|e| Error::editor(format!("failed to run {}: {e}", self.executable)))?;

        let code = output.status.code().unwrap_or(-1);
        if allowed_codes.contains(&code) {
            return Ok(());
        }
        Err(Error::editor(format!(
            "buildozer returned {code}, want one of {allowed_codes:?}, while executing {args:?}: {}",
            String::from_utf8_lossy(&output.stderr)
        )))
    }
}

#[async_trait]
impl BuildEditor for BuildozerEditor {
    async fn new_rule(&self, rule: &Rule) -> Result<()> {
        let build_file = self
            .workspace_root
            .join(&rule.pkg_name)
            .join("BUILD");
        if tokio::fs::metadata(&build_file).await.is_err() {
            tokio::fs::write(&build_file, b"")
                .await
                .map_err(|e| Error::editor(format!("error writing {}: {e}", build_file.display())))?;
        }

        self.exec(
            &[
                format!("new {} {}", rule.kind, rule.name()),
                format!("//{}:__pkg__", rule.pkg_name),
            ],
            &[0],
        )
        .await?;
        self.exec(
            &[
                format!("add srcs {}", rule.string_list("srcs").join(" ")),
                format!("//{}:{}", rule.pkg_name, rule.name()),
            ],
            &[0],
        )
        .await
    }

    async fn add_deps(&self, rule: &Rule, labels: &[Label]) -> Result<()> {
        if labels.is_empty() {
            return Ok(());
        }
        let reference = buildozer_ref(rule)?;
        let deps = labels
            .iter()
            .map(|l| l.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        self.exec(&[format!("add deps {deps}"), reference], &[0, 3])
            .await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use jadep_core::AttrValue;

    fn rule_with(attrs: Vec<(&str, AttrValue)>) -> Rule {
        Rule::new(
            "java_library",
            "x",
            "foo",
            attrs.into_iter().map(|(k, v)| (k.to_string(), v)).collect(),
        )
    }

    #[test]
    fn test_ref_plain_rule_is_label() {
        assert_eq!(buildozer_ref(&rule_with(vec![])).unwrap(), "//x:foo");
    }

    #[test]
    fn test_ref_macro_with_generator_name() {
        let rule = rule_with(vec![
            ("generator_function", AttrValue::String("my_macro".to_string())),
            ("generator_name", AttrValue::String("gen".to_string())),
        ]);
        assert_eq!(buildozer_ref(&rule).unwrap(), "//x:gen");
    }

    #[test]
    fn test_ref_macro_without_generator_name_uses_line() {
        let rule = rule_with(vec![
            ("generator_function", AttrValue::String("my_macro".to_string())),
            ("generator_location", AttrValue::String("x/BUILD:42".to_string())),
        ]);
        assert_eq!(buildozer_ref(&rule).unwrap(), "//x:%42");
    }

    #[test]
    fn test_ref_macro_with_bad_location_fails() {
        let rule = rule_with(vec![
            ("generator_function", AttrValue::String("my_macro".to_string())),
            ("generator_location", AttrValue::String("no-line".to_string())),
        ]);
        assert!(buildozer_ref(&rule).is_err());
    }
}
