use std::fs;
use std::path::{Path, PathBuf};

use framekit_transfer::{MemoryStore, ObjectStore, download_prefix, upload_directory};
use walkdir::WalkDir;

fn files_under(root: &Path) -> Vec<(PathBuf, Vec<u8>)> {
    let mut files: Vec<_> = WalkDir::new(root)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .map(|e| {
            let rel = e.path().strip_prefix(root).unwrap().to_path_buf();
            (rel, fs::read(e.path()).unwrap())
        })
        .collect();
    files.sort();
    files
}

#[tokio::test]
async fn single_file_lands_under_prefix() {
    let dir = tempfile::tempdir().unwrap();
    fs::create_dir_all(dir.path().join("a")).unwrap();
    fs::write(dir.path().join("a").join("b.png"), b"\x89PNG fake").unwrap();

    let store = MemoryStore::new();
    let report = upload_directory(&store, dir.path(), "ds/").await.unwrap();

    assert!(report.is_success());
    assert_eq!(store.list_keys("").await.unwrap(), vec!["ds/a/b.png"]);
    assert_eq!(store.get_object("ds/a/b.png").await.unwrap(), b"\x89PNG fake");
    assert_eq!(store.content_type("ds/a/b.png").as_deref(), Some("image/png"));
}

#[tokio::test]
async fn upload_then_download_reproduces_tree() {
    let src = tempfile::tempdir().unwrap();
    let task = src.path().join("maze_task").join("maze_0001");
    fs::create_dir_all(&task).unwrap();
    fs::write(task.join("first_frame.png"), [1u8, 2, 3]).unwrap();
    fs::write(task.join("final_frame.png"), [4u8, 5, 6]).unwrap();
    fs::write(task.join("prompt.txt"), "go to the exit").unwrap();
    fs::write(task.join("ground_truth.mp4"), vec![7u8; 64]).unwrap();
    fs::create_dir_all(src.path().join("empty_dir")).unwrap();

    let store = MemoryStore::new();
    let up = upload_directory(&store, src.path(), "runs/v1").await.unwrap();
    assert_eq!(up.succeeded, 4);
    assert!(up.is_success());
    assert_eq!(
        store.content_type("runs/v1/maze_task/maze_0001/prompt.txt").as_deref(),
        Some("text/plain")
    );

    let dst = tempfile::tempdir().unwrap();
    let out = dst.path().join("restored");
    let down = download_prefix(&store, "runs/v1", &out).await.unwrap();
    assert_eq!(down.succeeded, 4);
    assert!(down.is_success());

    assert_eq!(files_under(src.path()), files_under(&out));
    assert!(!out.join("empty_dir").exists());
}

#[tokio::test]
async fn download_ignores_objects_outside_prefix() {
    let store = MemoryStore::new();
    store.put_object("keep/x.txt", b"x".to_vec(), "text/plain").await.unwrap();
    store.put_object("keeper/y.txt", b"y".to_vec(), "text/plain").await.unwrap();

    let dir = tempfile::tempdir().unwrap();
    let report = download_prefix(&store, "keep", dir.path()).await.unwrap();

    assert_eq!(report.succeeded, 1);
    assert_eq!(files_under(dir.path()), vec![(PathBuf::from("x.txt"), b"x".to_vec())]);
}

#[cfg(unix)]
#[tokio::test]
async fn punctuated_file_names_survive_round_trip() {
    let src = tempfile::tempdir().unwrap();
    fs::write(src.path().join("run:01.txt"), b"colon").unwrap();
    fs::write(src.path().join("back\\slash.txt"), b"backslash").unwrap();

    let store = MemoryStore::new();
    let up = upload_directory(&store, src.path(), "ds").await.unwrap();
    assert_eq!(up.succeeded, 2);
    assert!(up.is_success());

    let dst = tempfile::tempdir().unwrap();
    let down = download_prefix(&store, "ds", dst.path()).await.unwrap();
    assert_eq!(down.succeeded, 2);
    assert!(down.is_success(), "{:?}", down.failed);
    assert_eq!(files_under(src.path()), files_under(dst.path()));
}
