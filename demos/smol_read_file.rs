use std::path::PathBuf;

use await_callback::{
    fs::{FsValue, read_file},
    invoke,
};
use macro_rules_attribute::apply;
use smol_macros::{Executor, main};

#[apply(main!)]
async fn main(ex: &Executor<'_>) {
    let file_name = std::env::args()
        .nth(1)
        .unwrap_or_else(|| file!().to_string());

    let name = file_name.clone();
    let invocation = invoke(read_file, PathBuf::from(file_name), move |result| match result {
        Ok(values) => {
            let size: usize = values
                .iter()
                .map(|value| match value {
                    FsValue::Bytes(bytes) => bytes.len(),
                    _ => 0,
                })
                .sum();
            println!("read {size} bytes from '{name}'");
        }
        Err(err) => println!("error reading file '{name}': {err}"),
    });

    if let Err(fault) = ex.spawn(invocation).await {
        eprintln!("{fault}");
    }
}
