//! Callback-style file primitives and a procedure built on them.
//!
//! Each primitive runs its blocking work on a shared thread pool and reports
//! back through a `(error, values...)` callback, the shape a [`Sink`] accepts.
//! [`read_file`] drives them in sequence from one linear procedure.

use std::{
    fmt,
    fs::File,
    io::{self, Read, Seek, SeekFrom},
    path::{Path, PathBuf},
    sync::{Arc, OnceLock},
};

use futures::executor::{ThreadPool, ThreadPoolBuilder};
use parking_lot::Mutex;
use tracing::trace;

use crate::{Completion, Sink, Wait};

static THREAD_POOL: OnceLock<ThreadPool> = OnceLock::new();

/// A value produced by one of the file primitives.
#[derive(Clone, Debug, PartialEq)]
pub enum FsValue {
    /// An open file.
    File(FileHandle),

    /// File size in bytes.
    Size(u64),

    /// Number of bytes transferred.
    Count(usize),

    /// Bytes read from a file.
    Bytes(Vec<u8>),
}

/// A shareable handle to an open file. Closing it affects every clone.
#[derive(Clone)]
pub struct FileHandle(Arc<Mutex<Option<File>>>);

impl FileHandle {
    fn new(file: File) -> Self {
        Self(Arc::new(Mutex::new(Some(file))))
    }

    /// Returns `true` once the file has been closed.
    pub fn is_closed(&self) -> bool {
        self.0.lock().is_none()
    }

    fn with<R>(&self, op: impl FnOnce(&mut File) -> io::Result<R>) -> io::Result<R> {
        let mut file = self.0.lock();
        match file.as_mut() {
            Some(file) => op(file),
            None => Err(closed()),
        }
    }
}

impl PartialEq for FileHandle {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for FileHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileHandle")
            .field("closed", &self.is_closed())
            .finish()
    }
}

fn closed() -> io::Error {
    io::Error::other("file handle is closed")
}

fn thread_pool() -> io::Result<&'static ThreadPool> {
    if let Some(pool) = THREAD_POOL.get() {
        return Ok(pool);
    }
    let pool = ThreadPoolBuilder::new()
        .pool_size(4)
        .name_prefix("await-callback-fs-")
        .create()?;
    Ok(THREAD_POOL.get_or_init(|| pool))
}

// Runs `work` on the pool and reports its outcome through `callback`.
fn dispatch<W, C>(op: &'static str, work: W, callback: C)
where
    W: FnOnce() -> io::Result<Vec<FsValue>> + Send + 'static,
    C: FnOnce(Option<io::Error>, Vec<FsValue>) + Send + 'static,
{
    let deliver = move |result: io::Result<Vec<FsValue>>| {
        trace!(op, ok = result.is_ok(), "file operation finished");
        match result {
            Ok(values) => callback(None, values),
            Err(err) => callback(Some(err), Vec::new()),
        }
    };
    match thread_pool() {
        Ok(pool) => pool.spawn_ok(async move { deliver(work()) }),
        Err(err) => deliver(Err(err)),
    }
}

/// Opens `path` for reading. Calls back with `(err, [File])`.
pub fn open<C>(path: impl AsRef<Path>, callback: C)
where
    C: FnOnce(Option<io::Error>, Vec<FsValue>) + Send + 'static,
{
    let path = path.as_ref().to_path_buf();
    dispatch(
        "open",
        move || Ok(vec![FsValue::File(FileHandle::new(File::open(path)?))]),
        callback,
    );
}

/// Reads the size of `file`. Calls back with `(err, [Size])`.
pub fn fstat<C>(file: &FileHandle, callback: C)
where
    C: FnOnce(Option<io::Error>, Vec<FsValue>) + Send + 'static,
{
    let file = file.clone();
    dispatch(
        "fstat",
        move || {
            let size = file.with(|f| f.metadata())?.len();
            Ok(vec![FsValue::Size(size)])
        },
        callback,
    );
}

/// Reads up to `len` bytes of `file` starting at `position`.
/// Calls back with `(err, [Count, Bytes])`.
pub fn read<C>(file: &FileHandle, len: usize, position: u64, callback: C)
where
    C: FnOnce(Option<io::Error>, Vec<FsValue>) + Send + 'static,
{
    let file = file.clone();
    dispatch(
        "read",
        move || {
            let bytes = file.with(|f| {
                f.seek(SeekFrom::Start(position))?;
                let mut bytes = Vec::with_capacity(len);
                f.take(len as u64).read_to_end(&mut bytes)?;
                Ok(bytes)
            })?;
            Ok(vec![FsValue::Count(bytes.len()), FsValue::Bytes(bytes)])
        },
        callback,
    );
}

/// Closes `file`. Calls back with `(err, [])`.
pub fn close<C>(file: &FileHandle, callback: C)
where
    C: FnOnce(Option<io::Error>, Vec<FsValue>) + Send + 'static,
{
    let file = file.clone();
    dispatch(
        "close",
        move || match file.0.lock().take() {
            Some(_) => Ok(Vec::new()),
            None => Err(closed()),
        },
        callback,
    );
}

fn unexpected(op: &str) -> Completion<FsValue, io::Error> {
    Completion::Error(io::Error::new(
        io::ErrorKind::InvalidData,
        format!("unexpected result from {op}"),
    ))
}

/// Reads the whole file at `path`, completing with its bytes.
///
/// Opens, stats, reads and closes the file, returning the first error any of
/// those steps reports. Fails if fewer bytes were read than the file's size.
///
/// # Example
/// ```
/// # use await_callback::{fs::{read_file, FsValue}, invoke};
/// # async {
/// invoke(read_file, "Cargo.toml".into(), |result: Result<Vec<FsValue>, std::io::Error>| {
///     match result {
///         Ok(values) => println!("{values:?}"),
///         Err(err) => eprintln!("error reading file: {err}"),
///     }
/// })
/// .await
/// .unwrap();
/// # };
/// ```
pub async fn read_file(
    path: PathBuf,
    sink: Sink<FsValue, io::Error>,
    wait: Wait<FsValue>,
) -> Completion<FsValue, io::Error> {
    let opened = wait.until(|| open(&path, sink.callback())).await;
    if let Some(err) = sink.take_err() {
        return Completion::Error(err);
    }
    let Some(FsValue::File(file)) = opened.into_single() else {
        return unexpected("open");
    };

    let stats = wait.until(|| fstat(&file, sink.callback())).await;
    if let Some(err) = sink.take_err() {
        return Completion::Error(err);
    }
    let Some(FsValue::Size(size)) = stats.into_single() else {
        return unexpected("fstat");
    };
    let size = match usize::try_from(size) {
        Ok(size) => size,
        Err(err) => return Completion::Error(io::Error::other(err)),
    };

    let read_back = wait.until(|| read(&file, size, 0, sink.callback())).await;
    if let Some(err) = sink.take_err() {
        return Completion::Error(err);
    }
    let mut values = read_back.into_vec().into_iter();
    let (Some(FsValue::Count(count)), Some(FsValue::Bytes(bytes))) = (values.next(), values.next())
    else {
        return unexpected("read");
    };
    if count != size {
        return sink
            .error_result(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("read {count} of {size} bytes"),
            ))
            .into();
    }

    wait.until(|| close(&file, sink.callback())).await;
    if let Some(err) = sink.take_err() {
        return Completion::Error(err);
    }

    Completion::Value(FsValue::Bytes(bytes))
}
