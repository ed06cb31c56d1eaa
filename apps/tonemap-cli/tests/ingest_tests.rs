use std::fs;

use tonemap_cli::ingest::{json_files, load_items};

#[test]
fn loads_single_file_with_either_id_key() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let path = tmp.path().join("export.json");
    fs::write(
        &path,
        r#"[
            {"id": "1", "text": "first", "createdAt": "2024-01-02T03:04:05Z"},
            {"tweetId": "2", "text": "second", "createdAt": "Wed Oct 10 20:19:24 +0000 2018", "scored": true}
        ]"#,
    )?;
    let items = load_items(&path)?;
    assert_eq!(items.len(), 2);
    assert_eq!(items[0].id, "1");
    assert_eq!(items[1].id, "2");
    assert_eq!(items[1].created_at.to_rfc3339(), "2018-10-10T20:19:24+00:00");
    assert!(items.iter().all(|i| !i.embedded && !i.scored));
    Ok(())
}

#[test]
fn walks_directories_in_path_order() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    fs::create_dir(tmp.path().join("nested"))?;
    fs::write(tmp.path().join("b.json"), r#"[{"id": "b", "text": "", "createdAt": "2024-01-01T00:00:00Z"}]"#)?;
    fs::write(tmp.path().join("a.json"), r#"[{"id": "a", "createdAt": "2024-01-01T00:00:00Z"}]"#)?;
    fs::write(tmp.path().join("nested/c.JSON"), r#"[{"id": "c", "text": "x", "createdAt": "2024-01-01T00:00:00Z"}]"#)?;
    fs::write(tmp.path().join("notes.txt"), "ignored")?;

    assert_eq!(json_files(tmp.path()).len(), 3);
    let ids: Vec<String> = load_items(tmp.path())?.into_iter().map(|i| i.id).collect();
    assert_eq!(ids, vec!["a", "b", "c"]);
    Ok(())
}

#[test]
fn malformed_file_names_the_path() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let path = tmp.path().join("broken.json");
    fs::write(&path, "{not json")?;
    let err = load_items(&path).unwrap_err();
    assert!(format!("{err:#}").contains("broken.json"));
    Ok(())
}
