use pypisync_core::metadata::read_requires_dist;

#[test]
fn reads_requires_dist_from_a_built_wheel() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("demo-1.0-py3-none-any.whl");
    test_utils::write_wheel(&path, "demo", "1.0", &["click (>=7)", "requests; extra == \"http\""]);

    let reqs = read_requires_dist(&path);
    assert_eq!(
        reqs,
        vec![
            "click (>=7)".to_owned(),
            "requests; extra == \"http\"".to_owned(),
        ]
    );
}

#[test]
fn reads_requires_dist_from_a_built_sdist() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("demo-1.0.tar.gz");
    test_utils::write_sdist(&path, "demo", "1.0", &["six"]);

    let reqs = read_requires_dist(&path);
    assert_eq!(reqs, vec!["six".to_owned()]);
}
