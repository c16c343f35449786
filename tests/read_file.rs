use std::{
    io::{self, Write},
    path::PathBuf,
};

use await_callback::{
    Completion, Sink, Wait,
    fs::{self, FsValue, read_file},
    invoke, wrap,
};
use futures::channel::oneshot;
use tempfile::{NamedTempFile, TempDir};

fn fixture(contents: &[u8]) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents).unwrap();
    file.flush().unwrap();
    file
}

#[tokio::test(flavor = "multi_thread")]
async fn read_file_delivers_exact_contents() {
    let contents = b"line one\nline two\n\x00\xffbinary tail".to_vec();
    let file = fixture(&contents);

    let (tx, rx) = oneshot::channel();
    invoke(read_file, file.path().to_path_buf(), move |result| {
        let _ = tx.send(result);
    })
    .await
    .unwrap();

    let values = rx.await.unwrap().unwrap();
    assert_eq!(values, vec![FsValue::Bytes(contents)]);
}

#[tokio::test(flavor = "multi_thread")]
async fn read_file_reports_missing_path_without_value() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("nope.nope");

    let (tx, rx) = oneshot::channel();
    wrap(read_file)
        .call(missing, move |result| {
            let _ = tx.send(result);
        })
        .await
        .unwrap();

    let err = rx.await.unwrap().unwrap_err();
    assert_eq!(err.kind(), io::ErrorKind::NotFound);
}

#[tokio::test(flavor = "multi_thread")]
async fn closing_twice_reports_error_through_sink() {
    let file = fixture(b"short");
    let procedure = |path: PathBuf, sink: Sink<FsValue, io::Error>, wait: Wait<FsValue>| async move {
        let opened = wait.until(|| fs::open(&path, sink.callback())).await;
        let Some(FsValue::File(file)) = opened.into_single() else {
            return Completion::Error(io::Error::other("open failed"));
        };
        wait.until(|| fs::close(&file, sink.callback())).await;
        assert!(file.is_closed());
        wait.until(|| fs::close(&file, sink.callback())).await;
        match sink.take_err() {
            Some(err) => Completion::from(sink.error_result(err)),
            None => Completion::Value(FsValue::Count(0)),
        }
    };

    let (tx, rx) = oneshot::channel();
    invoke(procedure, file.path().to_path_buf(), move |result| {
        let _ = tx.send(result);
    })
    .await
    .unwrap();

    let err = rx.await.unwrap().unwrap_err();
    assert!(err.to_string().contains("closed"), "Unexpected error: {err}");
}

#[test]
fn read_file_on_smol() {
    let file = fixture(b"read from smol");
    let reader = wrap(read_file).label("read_file");

    let (tx, rx) = oneshot::channel();
    smol::block_on(async {
        reader
            .call(file.path().to_path_buf(), move |result| {
                let _ = tx.send(result);
            })
            .await
            .unwrap();
        let values = rx.await.unwrap().unwrap();
        assert_eq!(values, vec![FsValue::Bytes(b"read from smol".to_vec())]);
    });
}

#[test]
fn read_empty_file_on_block_on() {
    let file = fixture(b"");

    let (tx, rx) = oneshot::channel();
    futures_lite::future::block_on(async {
        invoke(read_file, file.path().to_path_buf(), move |result| {
            let _ = tx.send(result);
        })
        .await
        .unwrap();
        let values = rx.await.unwrap().unwrap();
        assert_eq!(values, vec![FsValue::Bytes(Vec::new())]);
    });
}
