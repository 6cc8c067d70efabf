use std::io::ErrorKind;
use std::path::Path;

use deferred::io::{self, Encoding, FileSystem, IoService};
use deferred::Error;

#[deferred::test]
async fn reads_whole_file() -> anyhow::Result<()> {
    let manifest = io::read_all(concat!(env!("CARGO_MANIFEST_DIR"), "/Cargo.toml"), Encoding::Utf8).await?;
    assert!(manifest.contains("[package]"));
    Ok(())
}

#[deferred::test]
async fn missing_file_rejects_with_not_found() -> anyhow::Result<()> {
    let err = FileSystem
        .read_all(Path::new("does/not/exist.txt"), Encoding::default())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Io(_)));
    assert_eq!(err.io_kind(), Some(ErrorKind::NotFound));
    Ok(())
}

#[deferred::test]
async fn read_failures_can_be_recovered() -> anyhow::Result<()> {
    let text = io::read_all("does/not/exist.txt", Encoding::Utf8Lossy)
        .catch(|err| match err.io_kind() {
            Some(ErrorKind::NotFound) => Ok(String::new()),
            _ => Err(err),
        })
        .await?;
    assert!(text.is_empty());
    Ok(())
}
