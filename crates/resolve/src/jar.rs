//! Lists top-level class names in JAR files.

use std::fs::File;
use std::path::Path;

use jadep_core::{ClassName, Error, Result};

/// Returns the Java class names in the JAR at `file_name`. Only top-level
/// classes are returned: inner classes (`$` in the entry name) and
/// `package-info` pseudo-classes are skipped.
pub fn list_classes(file_name: &Path) -> Result<Vec<ClassName>> {
    let file = File::open(file_name)
        .map_err(|e| Error::invalid_input(format!("error opening {}: {e}", file_name.display())))?;
    let mut archive = zip::ZipArchive::new(file)
        .map_err(|e| Error::invalid_input(format!("error reading {}: {e}", file_name.display())))?;

    let mut result = Vec::new();
    for i in 0..archive.len() {
        let entry = archive
            .by_index(i)
            .map_err(|e| Error::invalid_input(format!("error reading {}: {e}", file_name.display())))?;
        let name = entry.name();
        if name.contains('$') || name.ends_with("/package-info.class") {
            continue;
        }
        let Some(stem) = name.strip_suffix(".class") else {
            continue;
        };
        result.push(ClassName::new(stem.replace('/', ".")));
    }
    Ok(result)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::FileOptions;

    fn write_jar(path: &Path, entries: &[&str]) {
        let file = File::create(path).unwrap();
        let mut writer = zip::ZipWriter::new(file);
        for entry in entries {
            writer.start_file(*entry, FileOptions::default()).unwrap();
            writer.write_all(b"\xca\xfe\xba\xbe").unwrap();
        }
        writer.finish().unwrap();
    }

    // Scenario E5: inner classes, non-class entries and package-info are
    // excluded; the rest map slash-to-dot.
    #[test]
    fn test_list_classes() {
        let tmp = tempfile::tempdir().unwrap();
        let jar = tmp.path().join("test.jar");
        write_jar(
            &jar,
            &[
                "com/foo/Bar.class",
                "com/foo/Bar$Inner.class",
                "META-INF/MANIFEST.MF",
                "com/google/common/truth/package-info.class",
                "com/Zoo.class",
            ],
        );

        let mut classes = list_classes(&jar).unwrap();
        classes.sort();
        assert_eq!(
            classes,
            vec![ClassName::from("com.Zoo"), ClassName::from("com.foo.Bar")]
        );
    }

    #[test]
    fn test_missing_jar_is_an_error() {
        assert!(list_classes(Path::new("/does/not/exist.jar")).is_err());
    }
}
