// SPDX-License-Identifier: MIT

//! Decides whether a package needs its dependencies installed and its
//! `prepare` script run before it can be packed.

use crate::descriptor::PackageDescriptor;
use crate::manifest::PackageManifest;

/// True iff the package declares a non-empty `prepare` script.
pub fn should_prepare(descriptor: &PackageDescriptor) -> bool {
    descriptor
        .prepare_script()
        .is_some_and(|script| !script.is_empty())
}

/// Human readable reason handed to the installer.
pub fn reason_label(descriptor: &PackageDescriptor, manifest: &PackageManifest) -> String {
    format!(
        "preparing gitdep package {} from {}",
        descriptor.name, manifest.resolved
    )
}

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use serde_json::{Map, Value};

    use super::*;

    fn descriptor(scripts: &[(&str, &str)]) -> PackageDescriptor {
        PackageDescriptor {
            name: "widget".to_string(),
            version: None,
            scripts: Value::Object(
                scripts
                    .iter()
                    .map(|(k, v)| (k.to_string(), Value::from(*v)))
                    .collect::<Map<_, _>>(),
            ),
        }
    }

    #[rstest]
    #[case::no_scripts(&[], false)]
    #[case::other_scripts(&[("test", "jest"), ("build", "tsc")], false)]
    #[case::empty_prepare(&[("prepare", "")], false)]
    #[case::prepare(&[("prepare", "npm run build")], true)]
    #[case::whitespace_prepare(&[("prepare", " ")], true)]
    fn prepare_decision(#[case] scripts: &[(&str, &str)], #[case] expected: bool) {
        assert_eq!(should_prepare(&descriptor(scripts)), expected);
    }

    #[test]
    fn label_names_package_and_origin() {
        let manifest = PackageManifest::new("widget", "git+https://example.com/widget.git#abc123");
        assert_eq!(
            reason_label(&descriptor(&[]), &manifest),
            "preparing gitdep package widget from git+https://example.com/widget.git#abc123"
        );
    }
}
