//! Artifact metadata reader (C4): given a downloaded artifact on disk,
//! return its declared `Requires-Dist` lines. Parsing failures are reported
//! as `Error::MetadataError` and the driver treats that as "no dependencies"
//! (§7).

use std::fs::File;
use std::io::Read;
use std::path::Path;

use tracing::warn;

use crate::error::{Error, Result};
use crate::rfc822ish::RFC822ish;

/// Returns the raw `Requires-Dist` strings declared by the artifact at
/// `path`. Never fails: on any error this logs and returns an empty list, per
/// §4.4/§7 (`MetadataError` is always recovered at the call site, so this
/// function absorbs it directly rather than pushing the match onto callers).
pub fn read_requires_dist(path: &Path) -> Vec<String> {
    match read_requires_dist_fallible(path) {
        Ok(reqs) => reqs,
        Err(e) => {
            warn!(artifact = %path.display(), error = %e, "failed to read artifact metadata");
            Vec::new()
        }
    }
}

fn read_requires_dist_fallible(path: &Path) -> Result<Vec<String>> {
    let name = path.to_string_lossy().to_lowercase();
    let metadata_text = if name.ends_with(".whl") {
        read_wheel_metadata(path)?
    } else if name.ends_with(".tar.gz") || name.ends_with(".tgz") {
        read_targz_pkginfo(path)?
    } else if name.ends_with(".zip") {
        read_zip_pkginfo(path)?
    } else {
        return Err(metadata_error(path, "unsupported artifact suffix"));
    };

    let parsed = RFC822ish::parse(&metadata_text)
        .map_err(|e| metadata_error(path, &format!("malformed metadata: {e}")))?;
    Ok(parsed.get_all("requires-dist").to_vec())
}

fn metadata_error(path: &Path, reason: &str) -> Error {
    Error::MetadataError {
        artifact: path.display().to_string(),
        reason: reason.to_owned(),
    }
}

fn read_wheel_metadata(path: &Path) -> Result<String> {
    let file = File::open(path)?;
    let mut zip = zip::ZipArchive::new(file)
        .map_err(|e| metadata_error(path, &format!("not a valid wheel zip: {e}")))?;

    let member_name = (0..zip.len())
        .map(|i| zip.by_index(i).map(|f| f.name().to_owned()))
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| metadata_error(path, &format!("corrupt zip entry: {e}")))?
        .into_iter()
        .find(|n| n.ends_with(".dist-info/METADATA"))
        .ok_or_else(|| metadata_error(path, "no *.dist-info/METADATA member"))?;

    let mut entry = zip
        .by_name(&member_name)
        .map_err(|e| metadata_error(path, &format!("failed to open {member_name}: {e}")))?;
    let mut text = String::new();
    entry.read_to_string(&mut text)?;
    Ok(text)
}

fn read_targz_pkginfo(path: &Path) -> Result<String> {
    let file = File::open(path)?;
    let decoder = flate2::read::GzDecoder::new(file);
    let mut archive = tar::Archive::new(decoder);
    for entry in archive
        .entries()
        .map_err(|e| metadata_error(path, &format!("corrupt tar: {e}")))?
    {
        let mut entry = entry.map_err(|e| metadata_error(path, &format!("corrupt tar entry: {e}")))?;
        let entry_path = entry
            .path()
            .map_err(|e| metadata_error(path, &format!("bad path in tar entry: {e}")))?
            .to_path_buf();
        if entry_path.file_name().map(|n| n == "PKG-INFO").unwrap_or(false) {
            let mut text = String::new();
            entry.read_to_string(&mut text)?;
            return Ok(text);
        }
    }
    // Legacy sdists before metadata 2.1 may ship no PKG-INFO at all; treat
    // this as "no declared dependencies" rather than an error.
    Ok(String::new())
}

fn read_zip_pkginfo(path: &Path) -> Result<String> {
    let file = File::open(path)?;
    let mut zip = zip::ZipArchive::new(file)
        .map_err(|e| metadata_error(path, &format!("not a valid sdist zip: {e}")))?;

    let member_name = (0..zip.len())
        .map(|i| zip.by_index(i).map(|f| f.name().to_owned()))
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| metadata_error(path, &format!("corrupt zip entry: {e}")))?
        .into_iter()
        .find(|n| n.ends_with("/PKG-INFO") || n == "PKG-INFO");

    let Some(member_name) = member_name else {
        return Ok(String::new());
    };

    let mut entry = zip
        .by_name(&member_name)
        .map_err(|e| metadata_error(path, &format!("failed to open {member_name}: {e}")))?;
    let mut text = String::new();
    entry.read_to_string(&mut text)?;
    Ok(text)
}

#[cfg(test)]
mod test {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn named_temp_file(suffix: &str) -> NamedTempFile {
        tempfile::Builder::new()
            .suffix(suffix)
            .tempfile()
            .unwrap()
    }

    fn write_wheel_with_metadata(metadata: &str) -> NamedTempFile {
        let file = named_temp_file(".whl");
        {
            let mut zip = zip::ZipWriter::new(file.reopen().unwrap());
            zip.start_file(
                "demo-1.0.dist-info/METADATA",
                zip::write::FileOptions::default(),
            )
            .unwrap();
            zip.write_all(metadata.as_bytes()).unwrap();
            zip.finish().unwrap();
        }
        file
    }

    #[test]
    fn reads_requires_dist_from_wheel() {
        let metadata = "Metadata-Version: 2.1\nName: demo\nRequires-Dist: click (>=7)\nRequires-Dist: requests\n\n";
        let file = write_wheel_with_metadata(metadata);
        let reqs = read_requires_dist(file.path());
        assert_eq!(reqs, vec!["click (>=7)".to_owned(), "requests".to_owned()]);
    }

    #[test]
    fn unreadable_file_yields_empty_list() {
        let file = named_temp_file(".whl");
        let reqs = read_requires_dist(file.path());
        assert!(reqs.is_empty());
    }

    #[test]
    fn unsupported_suffix_yields_empty_list() {
        let file = named_temp_file(".txt");
        let reqs = read_requires_dist(file.path());
        assert!(reqs.is_empty());
    }
}
