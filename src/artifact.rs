use std::ffi::OsString;
use std::path::{Path, PathBuf};
use serde::Deserialize;
use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum Error {
    #[error("{0}: not a file name")]
    NoFileName(String),

    #[error("{0}: expected <artifact>-<version>[-classifier].<ext>")]
    NoVersionComponent(String),

    #[error("{0}: version component holds no numeric segments")]
    NoVersion(String),
}

/// Coordinates derived from a Maven artifact file name.
///
/// The packaging step produces names of the form
/// `<artifact>-<version>[-classifier].<ext>`, optionally followed by
/// companion suffixes such as `.asc` or `.md5`:
///
/// | file name                            | artifact id   | version  | classifier | extension |
/// |--------------------------------------|---------------|----------|------------|-----------|
/// | `connect.sdk-18.0.1.jar`             | `connect.sdk` | `18.0.1` |            | `jar`     |
/// | `connect.sdk-18.0.1.pom`             | `connect.sdk` | `18.0.1` |            | `pom`     |
/// | `connect.sdk-18.0.1-sources.jar`     | `connect.sdk` | `18.0.1` | `sources`  | `jar`     |
/// | `connect.sdk-18.0.1-javadoc.jar.asc` | `connect.sdk` | `18.0.1` | `javadoc`  | `jar.asc` |
///
/// The artifact id is everything before the first `-`, so artifact ids
/// must not contain dashes. The version is made of the purely numeric
/// `.`-separated segments of the component after that dash; qualifiers
/// such as `-SNAPSHOT` are read as classifiers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactName {
    pub artifact_id: String,
    pub version: String,
    pub classifier: Option<String>,
    pub extension: String,
}

impl ArtifactName {
    pub fn parse(file_name: &str) -> Result<Self, Error> {
        let (artifact_id, rest) = file_name
            .split_once('-')
            .ok_or_else(|| Error::NoVersionComponent(file_name.to_string()))?;

        let (version_component, classified) = match rest.split_once('-') {
            Some((version, classified)) => (version, Some(classified)),
            None => (rest, None),
        };

        let is_numeric = |s: &&str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
        let version = version_component
            .split('.')
            .filter(is_numeric)
            .collect::<Vec<_>>()
            .join(".");
        if version.is_empty() {
            return Err(Error::NoVersion(file_name.to_string()));
        }

        let (classifier, extension) = match classified {
            Some(classified) => match classified.split_once('.') {
                Some((classifier, extension)) => (Some(classifier.to_string()), extension.to_string()),
                None => (Some(classified.to_string()), String::new()),
            },
            None => (
                None,
                version_component
                    .split('.')
                    .filter(|s| !is_numeric(s))
                    .collect::<Vec<_>>()
                    .join("."),
            ),
        };

        Ok(Self {
            artifact_id: artifact_id.to_string(),
            version,
            classifier,
            extension,
        })
    }

    pub fn from_path(path: &Path) -> Result<Self, Error> {
        let file_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| Error::NoFileName(path.display().to_string()))?;
        Self::parse(file_name)
    }
}

/// Side-files uploaded next to every artifact.
#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Companion {
    /// ASCII-armoured detached signature.
    Asc,
    Md5,
    Sha1,
}

impl Companion {
    pub fn extension(self) -> &'static str {
        match self {
            Companion::Asc => "asc",
            Companion::Md5 => "md5",
            Companion::Sha1 => "sha1",
        }
    }

    /// `<path>.<extension>`, next to the original file.
    pub fn path_for(self, path: &Path) -> PathBuf {
        let mut companion = OsString::from(path.as_os_str());
        companion.push(".");
        companion.push(self.extension());
        PathBuf::from(companion)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parsed(file_name: &str) -> (String, String, Option<String>, String) {
        let name = ArtifactName::parse(file_name).unwrap();
        (name.artifact_id, name.version, name.classifier, name.extension)
    }

    #[test]
    fn plain_jar() {
        assert_eq!(
            parsed("connect.sdk-18.0.1.jar"),
            ("connect.sdk".into(), "18.0.1".into(), None, "jar".into())
        );
    }

    #[test]
    fn descriptor() {
        assert_eq!(
            parsed("connect.sdk-18.0.1.pom"),
            ("connect.sdk".into(), "18.0.1".into(), None, "pom".into())
        );
    }

    #[test]
    fn classified_archives() {
        assert_eq!(
            parsed("connect.sdk-18.0.1-sources.jar"),
            ("connect.sdk".into(), "18.0.1".into(), Some("sources".into()), "jar".into())
        );
        assert_eq!(
            parsed("connect.sdk-18.0.1-javadoc.jar"),
            ("connect.sdk".into(), "18.0.1".into(), Some("javadoc".into()), "jar".into())
        );
    }

    #[test]
    fn companions_keep_coordinates() {
        for base in [
            "connect.sdk-18.0.1.jar",
            "connect.sdk-18.0.1.pom",
            "connect.sdk-18.0.1-sources.jar",
            "connect.sdk-18.0.1-javadoc.jar",
        ] {
            for companion in [Companion::Asc, Companion::Md5, Companion::Sha1] {
                let file_name = format!("{base}.{}", companion.extension());
                let name = ArtifactName::parse(&file_name).unwrap();
                assert_eq!(name.artifact_id, "connect.sdk", "{file_name}");
                assert_eq!(name.version, "18.0.1", "{file_name}");
                assert!(name.extension.ends_with(companion.extension()), "{file_name}");
            }
        }
    }

    #[test]
    fn from_path_uses_file_name_only() {
        let name = ArtifactName::from_path(Path::new("_build/java-out/connect.sdk-18.0.1.jar")).unwrap();
        assert_eq!(name.artifact_id, "connect.sdk");
        assert_eq!(name.version, "18.0.1");
    }

    #[test]
    fn rejects_unversioned_names() {
        assert_eq!(
            ArtifactName::parse("README.md"),
            Err(Error::NoVersionComponent("README.md".into()))
        );
        assert_eq!(
            ArtifactName::parse("connect.sdk-latest.jar"),
            Err(Error::NoVersion("connect.sdk-latest.jar".into()))
        );
    }

    #[test]
    fn companion_paths() {
        let jar = Path::new("_build/java/connect.sdk-18.0.1.jar");
        assert_eq!(Companion::Asc.path_for(jar), Path::new("_build/java/connect.sdk-18.0.1.jar.asc"));
        assert_eq!(Companion::Md5.path_for(jar), Path::new("_build/java/connect.sdk-18.0.1.jar.md5"));
        assert_eq!(Companion::Sha1.path_for(jar), Path::new("_build/java/connect.sdk-18.0.1.jar.sha1"));
    }
}
