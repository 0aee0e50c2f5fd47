//! Shared test fixtures: in-memory wheel/sdist builders and sample upstream
//! JSON payloads, used across `pypisync-core`'s component tests.

use std::io::Write;
use std::path::Path;

use rattler_digest::{Digest, Sha256};

/// Builds a minimal wheel at `path` containing a single dist-info METADATA
/// member with the given `Requires-Dist` lines, returning its SHA-256 hex
/// digest.
pub fn write_wheel(path: &Path, project: &str, version: &str, requires_dist: &[&str]) -> String {
    let metadata = render_metadata(project, version, requires_dist);
    let file = std::fs::File::create(path).expect("create wheel file");
    let mut zip = zip::ZipWriter::new(file);
    zip.start_file(
        format!("{project}-{version}.dist-info/METADATA"),
        zip::write::FileOptions::default(),
    )
    .expect("start dist-info member");
    zip.write_all(metadata.as_bytes()).expect("write metadata");
    zip.finish().expect("finish wheel archive");
    hash_file(path)
}

/// Builds a minimal `.tar.gz` sdist at `path` containing a top-level
/// `PKG-INFO` member, returning its SHA-256 hex digest.
pub fn write_sdist(path: &Path, project: &str, version: &str, requires_dist: &[&str]) -> String {
    let metadata = render_metadata(project, version, requires_dist);
    let file = std::fs::File::create(path).expect("create sdist file");
    let encoder = flate2::write::GzEncoder::new(file, flate2::Compression::default());
    let mut builder = tar::Builder::new(encoder);

    let mut header = tar::Header::new_gnu();
    header.set_size(metadata.len() as u64);
    header.set_mode(0o644);
    header.set_cksum();
    builder
        .append_data(
            &mut header,
            format!("{project}-{version}/PKG-INFO"),
            metadata.as_bytes(),
        )
        .expect("append PKG-INFO");
    builder.into_inner().expect("finish tar").finish().expect("finish gzip");
    hash_file(path)
}

fn render_metadata(project: &str, version: &str, requires_dist: &[&str]) -> String {
    let mut text = format!("Metadata-Version: 2.1\nName: {project}\nVersion: {version}\n");
    for req in requires_dist {
        text.push_str(&format!("Requires-Dist: {req}\n"));
    }
    text.push('\n');
    text
}

fn hash_file(path: &Path) -> String {
    let bytes = std::fs::read(path).expect("read back written artifact");
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    format!("{:x}", hasher.finalize())
}

/// A sample `<endpoint>/pypi/<name>/json` payload, matching the schema
/// `index::json_types::RawProjectInfo` deserializes.
pub fn sample_project_info_json(project: &str, versions: &[(&str, &str, &str)]) -> String {
    let mut releases = serde_json::Map::new();
    for (version, filename, sha256) in versions {
        let artifact = serde_json::json!({
            "url": format!("https://example.com/packages/{filename}"),
            "filename": filename,
            "yanked": false,
            "digests": { "sha256": sha256 },
        });
        releases
            .entry(version.to_string())
            .or_insert_with(|| serde_json::Value::Array(Vec::new()))
            .as_array_mut()
            .unwrap()
            .push(artifact);
    }
    serde_json::json!({
        "info": { "name": project },
        "releases": releases,
    })
    .to_string()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn written_wheel_has_readable_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("demo-1.0-py3-none-any.whl");
        let hash = write_wheel(&path, "demo", "1.0", &["click (>=7)"]);
        assert_eq!(hash.len(), 64);
        assert!(path.exists());
    }

    #[test]
    fn sample_json_round_trips_through_serde() {
        let text = sample_project_info_json("demo", &[("1.0", "demo-1.0.tar.gz", "abcd")]);
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["info"]["name"], "demo");
        assert_eq!(value["releases"]["1.0"][0]["filename"], "demo-1.0.tar.gz");
    }
}
