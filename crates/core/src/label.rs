//! Bazel label handling.
//!
//! A [`Label`] identifies a target, e.g. `//java/com/foo:bar` or
//! `@repo//pkg:name`. Labels are stored in canonical absolute form, so the
//! package and target name can always be recovered with [`Label::split`].

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt::{self, Display};

use crate::error::{Error, Result};

/// A rule's label, e.g. `//foo:bar`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Label(String);

impl Label {
    /// Parses a label string in absolute form, such as `//aaa/bbb:ccc` or
    /// `//aaa/bbb`. A label without an explicit name takes the last package
    /// segment as its name. Bazel tolerates labels starting with more than
    /// two slashes, so extra leading slashes are trimmed.
    pub fn parse_absolute(s: &str) -> Result<Label> {
        if !s.starts_with("//") && !s.starts_with('@') {
            return Err(Error::label(format!(
                "absolute label must start with // or @, {s:?} is neither"
            )));
        }
        if !s.contains("//") {
            return Err(Error::label(format!("invalid label {s:?}")));
        }
        let s = s.trim_start_matches('/');

        let (pkg, name) = match s.find(':') {
            // "//foo/bar:wiz"
            Some(i) => (&s[..i], &s[i + 1..]),
            // "//foo/bar"
            None => (s, s.rsplit('/').next().unwrap_or(s)),
        };
        if pkg.matches("//").count() > 1 {
            return Err(Error::label(format!(
                "package name {pkg:?} contains '//' more than once"
            )));
        }
        if name.contains("//") {
            return Err(Error::label(format!("target name {name:?} contains '//'")));
        }
        if name.contains(':') {
            return Err(Error::label(format!("target name {name:?} contains ':'")));
        }

        if pkg.starts_with('@') {
            Ok(Label(format!("{pkg}:{name}")))
        } else {
            Ok(Label(format!("//{pkg}:{name}")))
        }
    }

    /// Parses a label, not necessarily absolute, relative to a package.
    ///
    /// If the label is absolute, for instance `//a/b` or `//a/b:c`, the
    /// result is the same as [`Label::parse_absolute`]. If the label is
    /// relative, for instance `:foo` or `bar.java`, it names a target in
    /// `pkg`.
    pub fn parse_relative(pkg: &str, s: &str) -> Result<Label> {
        if s.starts_with("//") || s.starts_with('@') {
            return Label::parse_absolute(s);
        }
        if pkg.matches("//").count() > 1 {
            return Err(Error::label(format!(
                "package name {pkg:?} contains '//' more than once"
            )));
        }
        if s.is_empty() {
            return Err(Error::label("empty label"));
        }
        if matches!(s.find(':'), Some(i) if i > 0) {
            return Err(Error::label(format!(
                "label {s:?} doesn't start with // or @, but also contains a colon"
            )));
        }
        let s = s.strip_prefix(':').unwrap_or(s);
        if pkg.starts_with('@') {
            Ok(Label(format!("{pkg}:{s}")))
        } else {
            Ok(Label(format!("//{pkg}:{s}")))
        }
    }

    /// Splits the label into its package name and target name parts.
    /// Example: `//foo:bar` → `("foo", "bar")`; `@r//p:n` → `("@r//p", "n")`;
    /// `//a/b` → `("a/b", "b")`.
    pub fn split(&self) -> (&str, &str) {
        let s = self.0.strip_prefix("//").unwrap_or(&self.0);
        match s.find(':') {
            Some(i) => (&s[..i], &s[i + 1..]),
            None => (s, s.rsplit('/').next().unwrap_or(s)),
        }
    }

    /// The label's package name part.
    pub fn pkg(&self) -> &str {
        self.split().0
    }

    /// The label's target name part.
    pub fn name(&self) -> &str {
        self.split().1
    }

    /// The label as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Builds a label directly from a package and target name. The caller
    /// guarantees both parts are well formed.
    pub(crate) fn from_parts(pkg: &str, name: &str) -> Label {
        if pkg.starts_with('@') {
            Label(format!("{pkg}:{name}"))
        } else {
            Label(format!("//{pkg}:{name}"))
        }
    }
}

impl Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<Label> for String {
    fn from(l: Label) -> String {
        l.0
    }
}

impl Serialize for Label {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Label {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Label::parse_absolute(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_absolute() {
        let cases = [
            ("//foo/bar:wiz", "//foo/bar:wiz"),
            ("//foo/bar", "//foo/bar:bar"),
            ("//foo", "//foo:foo"),
            ("///foo/bar:wiz", "//foo/bar:wiz"),
            ("@r//p:n", "@r//p:n"),
            ("@r//p", "@r//p:p"),
        ];
        for (input, want) in cases {
            let got = Label::parse_absolute(input).unwrap();
            assert_eq!(got.as_str(), want, "input: {input}");
        }
    }

    #[test]
    fn test_parse_absolute_rejects() {
        for input in ["foo:bar", "foo", "@r:n", "//a:b:c", "//a//b//c:d"] {
            assert!(
                Label::parse_absolute(input).is_err(),
                "expected error for {input}"
            );
        }
    }

    #[test]
    fn test_parse_relative() {
        let cases = [
            (("x", "//foo:bar"), "//foo:bar"),
            (("x", ":foo"), "//x:foo"),
            (("x", "foo.java"), "//x:foo.java"),
            (("", "foo.java"), "//:foo.java"),
            (("@r//p", "foo"), "@r//p:foo"),
        ];
        for ((pkg, s), want) in cases {
            let got = Label::parse_relative(pkg, s).unwrap();
            assert_eq!(got.as_str(), want, "input: ({pkg}, {s})");
        }
    }

    #[test]
    fn test_parse_relative_rejects() {
        assert!(Label::parse_relative("x", "").is_err());
        assert!(Label::parse_relative("x", "a:b").is_err());
        assert!(Label::parse_relative("a//b//c", "foo").is_err());
    }

    #[test]
    fn test_split() {
        let cases = [
            ("//foo:bar", ("foo", "bar")),
            ("//a/b", ("a/b", "b")),
            ("@r//p:n", ("@r//p", "n")),
        ];
        for (input, want) in cases {
            let label = Label(input.to_string());
            assert_eq!(label.split(), want, "input: {input}");
        }
    }

    #[test]
    fn test_split_parse_roundtrip() {
        for input in ["//foo/bar:wiz", "//foo/bar", "//a", "@r//p:n"] {
            let label = Label::parse_absolute(input).unwrap();
            let (pkg, name) = label.split();
            let reparsed = if pkg.starts_with('@') {
                Label::parse_absolute(&format!("{pkg}:{name}")).unwrap()
            } else {
                Label::parse_absolute(&format!("//{pkg}:{name}")).unwrap()
            };
            assert_eq!(label, reparsed, "input: {input}");
        }
    }

    #[test]
    fn test_serde_roundtrip() {
        let label = Label::parse_absolute("//foo:bar").unwrap();
        let json = serde_json::to_string(&label).unwrap();
        assert_eq!(json, "\"//foo:bar\"");
        let parsed: Label = serde_json::from_str(&json).unwrap();
        assert_eq!(label, parsed);
    }
}
