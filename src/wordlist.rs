use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};

use crate::error::{Result, ScanError};

/// 按行惰性读取的字典
///
/// 每行去掉首尾空白后作为一个候选子域名，空行不过滤。
///
/// 读取是阻塞的 `std::io`，调度器每批只取 `batch_size` 行。字典放在慢速
/// 网络文件系统上时，读取会阻塞当前的tokio工作线程。
pub struct Wordlist<R = BufReader<File>> {
    path: PathBuf,
    lines: io::Lines<R>,
}

impl Wordlist {
    /// 打开字典文件，失败时返回配置类错误
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path).map_err(|source| ScanError::Wordlist {
            path: path.clone(),
            source,
        })?;
        Ok(Wordlist::from_reader(path, BufReader::new(file)))
    }
}

impl<R: BufRead> Wordlist<R> {
    /// 从任意 `BufRead` 读取，`path` 只用于错误信息
    pub fn from_reader(path: PathBuf, reader: R) -> Self {
        Wordlist {
            path,
            lines: reader.lines(),
        }
    }

    /// 字典文件路径
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl<R: BufRead> Iterator for Wordlist<R> {
    type Item = io::Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        self.lines
            .next()
            .map(|line| line.map(|word| word.trim().to_string()))
    }
}
