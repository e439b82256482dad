//! Mock version of std::fs::File;
#![allow(dead_code)]

use mockall::mock;

use std::{
    env::temp_dir,
    io::{self, Write},
    path::PathBuf,
};

use rand::distr::{Alphanumeric, SampleString};

mock! {
    pub File {}
    impl Write for File {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize>;
        fn flush(&mut self) -> io::Result<()>;
    }
}

/// A fresh path in the temporary directory.
pub fn temp_csv_path() -> PathBuf {
    let file_name = Alphanumeric.sample_string(&mut rand::rng(), 16);
    temp_dir().join(format!("{}.csv", file_name))
}
