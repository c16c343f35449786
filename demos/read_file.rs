use std::path::PathBuf;

use await_callback::{
    fs::{FsValue, read_file},
    wrap,
};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let file_name = std::env::args()
        .nth(1)
        .unwrap_or_else(|| file!().to_string());
    let reader = wrap(read_file).label("read_file");

    let name = file_name.clone();
    let outcome = reader
        .call(PathBuf::from(file_name), move |result| match result {
            Ok(values) => {
                for value in values {
                    if let FsValue::Bytes(bytes) = value {
                        println!("{}", String::from_utf8_lossy(&bytes));
                    }
                }
            }
            Err(err) => println!("error reading file '{name}': {err}"),
        })
        .await;

    if let Err(fault) = outcome {
        eprintln!("{fault}");
    }
}
