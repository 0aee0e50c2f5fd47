//! Simple-index emitter (C8): writes one PEP 503-style `index.html` per
//! mirrored project.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use pypisync_core::package_name::NormalizedPackageName;
use pypisync_core::types::MirrorPackage;

/// Writes `<root>/simple/<normalized-name>/index.html` for every project in
/// `downloaded`, each listing its artifacts in sorted local-path order.
pub fn emit(root: &Path, downloaded: &std::collections::HashSet<MirrorPackage>) -> io::Result<()> {
    let mut by_project: BTreeMap<NormalizedPackageName, Vec<&MirrorPackage>> = BTreeMap::new();
    for package in downloaded {
        by_project
            .entry(package.project.normalize())
            .or_default()
            .push(package);
    }

    for (name, mut packages) in by_project {
        packages.sort_by(|a, b| a.local_path.cmp(&b.local_path));
        let project_dir = root.join("simple").join(name.as_str());
        fs::create_dir_all(&project_dir)?;
        let html = render(name.as_str(), &project_dir, &packages);
        fs::write(project_dir.join("index.html"), html)?;
    }
    Ok(())
}

fn render(name: &str, project_dir: &Path, packages: &[&MirrorPackage]) -> String {
    let mut links = String::new();
    for package in packages {
        let Some(local_path) = &package.local_path else {
            continue;
        };
        let Some(sha256) = &package.sha256 else {
            continue;
        };
        let relpath = relative_path(project_dir, local_path);
        let basename = local_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        links.push_str(&format!(
            "<a href=\"{relpath}#sha256={sha256}\">{basename}</a><br/>\n"
        ));
    }
    format!(
        "<!DOCTYPE html>\n<html><head><title>Links for {name}</title></head><body>\n<h1>Links for {name}</h1>\n{links}</body></html>\n"
    )
}

/// Relative path from `from` (a directory) to `to` (a file), assuming both
/// share a common ancestor -- true here since both descend from the same
/// destination root.
fn relative_path(from: &Path, to: &Path) -> String {
    let from_components: Vec<_> = from.components().collect();
    let to_components: Vec<_> = to.components().collect();

    let common = from_components
        .iter()
        .zip(to_components.iter())
        .take_while(|(a, b)| a == b)
        .count();

    let mut relative = PathBuf::new();
    for _ in common..from_components.len() {
        relative.push("..");
    }
    for component in &to_components[common..] {
        relative.push(component);
    }
    relative.to_string_lossy().replace('\\', "/")
}

#[cfg(test)]
mod test {
    use super::*;
    use pypisync_core::package_name::PackageName;
    use std::collections::HashSet;

    fn pkg(project: &str, version: &str, local_path: &str, sha256: &str) -> MirrorPackage {
        MirrorPackage {
            project: PackageName::from(project),
            version: version.to_owned(),
            url: None,
            local_path: Some(PathBuf::from(local_path)),
            sha256: Some(sha256.to_owned()),
        }
    }

    #[test]
    fn relative_path_crosses_into_packages_tree() {
        let from = Path::new("/dest/simple/demo");
        let to = Path::new("/dest/packages/ab/cd/ef/demo-1.0.whl");
        assert_eq!(relative_path(from, to), "../../packages/ab/cd/ef/demo-1.0.whl");
    }

    #[test]
    fn emit_writes_one_file_per_project_sorted_by_local_path() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        let mut downloaded = HashSet::new();
        downloaded.insert(pkg(
            "demo",
            "2.0",
            &root.join("packages/bb/b-2.0.whl").to_string_lossy(),
            "bbbb",
        ));
        downloaded.insert(pkg(
            "demo",
            "1.0",
            &root.join("packages/aa/a-1.0.whl").to_string_lossy(),
            "aaaa",
        ));

        emit(root, &downloaded).unwrap();

        let html = fs::read_to_string(root.join("simple/demo/index.html")).unwrap();
        let a_pos = html.find("a-1.0.whl").unwrap();
        let b_pos = html.find("b-2.0.whl").unwrap();
        assert!(a_pos < b_pos);
        assert!(html.contains("#sha256=aaaa"));
        assert!(html.contains("Links for demo"));
    }
}
