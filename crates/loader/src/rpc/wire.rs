//! Wire messages for the package-server protocol.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

use jadep_core::{Label, Package, PackageGroup, Rule};

/// A request frame. Serialised as e.g.
/// `{"method":"load","params":{...}}` or `{"method":"version"}`.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "method", content = "params", rename_all = "snake_case")]
pub enum Request {
    Load(LoadRequest),
    Version,
    Shutdown,
}

/// A reply frame: exactly one of `ok` or `error` is present.
#[derive(Debug, Serialize, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub struct Reply<T> {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ok: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Asks the server to interpret BUILD files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadRequest {
    pub workspace_dir: String,
    pub install_base: String,
    pub output_base: String,
    pub packages: Vec<String>,
    /// Rule kinds to send back; empty means all.
    #[serde(default)]
    pub rule_kinds_to_serialize: Vec<String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct LoadResponse {
    #[serde(default)]
    pub pkgs: HashMap<String, PkgProto>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct PkgProto {
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub default_visibility: Vec<String>,
    /// Base file name → owning rule name ("" for source files).
    #[serde(default)]
    pub files: HashMap<String, String>,
    #[serde(default)]
    pub rules: HashMap<String, RuleProto>,
    #[serde(default)]
    pub package_groups: HashMap<String, PackageGroupProto>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct RuleProto {
    pub kind: String,
    /// Line in the BUILD file where the rule starts.
    #[serde(default)]
    pub position: Option<u32>,
    #[serde(default)]
    pub attributes: HashMap<String, AttributeProto>,
}

/// The tagged attribute union of the wire contract: the most specific
/// representable form of each attribute.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributeProto {
    S(String),
    I(i32),
    B(bool),
    ListOfStrings(Vec<String>),
    Unknown(bool),
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct PackageGroupProto {
    #[serde(default)]
    pub package_specs: Vec<String>,
    #[serde(default)]
    pub includes: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct VersionResponse {
    pub version: String,
}

/// Materialises packages from a load reply.
pub fn deserialize_packages(response: LoadResponse) -> HashMap<String, Arc<Package>> {
    let mut result = HashMap::new();
    for (pkg_name, proto) in response.pkgs {
        let default_visibility = proto
            .default_visibility
            .iter()
            .filter_map(|l| Label::parse_absolute(l).ok())
            .collect();

        let rules = proto
            .rules
            .into_iter()
            .map(|(rule_name, rule_proto)| {
                let attrs = rule_proto
                    .attributes
                    .into_iter()
                    .map(|(attr_name, attr)| (attr_name, materialize_attr(attr)))
                    .collect();
                let rule = Rule {
                    kind: rule_proto.kind,
                    pkg_name: pkg_name.clone(),
                    attrs,
                };
                (rule_name, Arc::new(rule))
            })
            .collect();

        let package_groups = proto
            .package_groups
            .into_iter()
            .map(|(group_name, group)| {
                let includes = group
                    .includes
                    .iter()
                    .filter_map(|l| Label::parse_absolute(l).ok())
                    .collect();
                (
                    group_name,
                    PackageGroup {
                        specs: group.package_specs,
                        includes,
                    },
                )
            })
            .collect();

        let path = if proto.path.is_empty() {
            pkg_name.clone()
        } else {
            proto.path
        };
        result.insert(
            pkg_name,
            Arc::new(Package {
                path,
                default_visibility,
                files: proto.files,
                rules,
                package_groups,
            }),
        );
    }
    result
}

fn materialize_attr(attr: AttributeProto) -> jadep_core::AttrValue {
    use jadep_core::AttrValue;
    match attr {
        AttributeProto::S(s) => AttrValue::String(s),
        AttributeProto::I(i) => AttrValue::Int(i),
        AttributeProto::B(b) => AttrValue::Bool(b),
        AttributeProto::ListOfStrings(v) => AttrValue::ListOfStrings(v),
        AttributeProto::Unknown(_) => AttrValue::Unknown,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_request_framing() {
        let req = Request::Load(LoadRequest {
            workspace_dir: "/ws".to_string(),
            install_base: String::new(),
            output_base: String::new(),
            packages: vec!["x".to_string()],
            rule_kinds_to_serialize: vec![],
        });
        let json = serde_json::to_string(&req).unwrap();
        assert!(json.starts_with(r#"{"method":"load","params":{"#), "{json}");

        let version = serde_json::to_string(&Request::Version).unwrap();
        assert_eq!(version, r#"{"method":"version"}"#);
    }

    #[test]
    fn test_deserialize_packages() {
        let json = r#"{
            "pkgs": {
                "x": {
                    "default_visibility": ["//visibility:public"],
                    "files": {"Foo.java": ""},
                    "rules": {
                        "Foo": {
                            "kind": "java_library",
                            "attributes": {
                                "srcs": {"list_of_strings": ["Foo.java"]},
                                "testonly": {"b": false},
                                "deps": {"unknown": true}
                            }
                        }
                    },
                    "package_groups": {
                        "clients": {"package_specs": ["x/..."], "includes": ["//y:g"]}
                    }
                }
            }
        }"#;
        let response: LoadResponse = serde_json::from_str(json).unwrap();
        let pkgs = deserialize_packages(response);
        let pkg = &pkgs["x"];
        assert_eq!(pkg.path, "x");
        let rule = &pkg.rules["Foo"];
        assert_eq!(rule.kind, "java_library");
        assert_eq!(rule.label().as_str(), "//x:Foo");
        assert_eq!(rule.string_list("srcs"), ["Foo.java"]);
        assert!(!rule.bool_attr("testonly", true));
        assert_eq!(rule.attrs["deps"], jadep_core::AttrValue::Unknown);
        let group = &pkg.package_groups["clients"];
        assert_eq!(group.specs, ["x/..."]);
        assert_eq!(group.includes[0].as_str(), "//y:g");
    }
}
