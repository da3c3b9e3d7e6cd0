//! 内容哈希 - 与远程服务的 content_hash 逐位兼容
//!
//! 输入按 4 MiB 分块，每块单独做 SHA-256，再对所有块摘要的拼接做一次
//! SHA-256，结果为小写十六进制。

use sha2::{Digest, Sha256};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use tracing::debug;

/// 分块大小（字节）
pub const BLOCK_SIZE: usize = 4 * 1024 * 1024;

/// 流式内容哈希器
pub struct ContentHasher {
    block: Sha256,
    block_len: usize,
    digests: Vec<u8>,
}

impl ContentHasher {
    pub fn new() -> Self {
        Self {
            block: Sha256::new(),
            block_len: 0,
            digests: Vec::new(),
        }
    }

    pub fn update(&mut self, mut data: &[u8]) {
        while !data.is_empty() {
            let take = (BLOCK_SIZE - self.block_len).min(data.len());
            self.block.update(&data[..take]);
            self.block_len += take;
            data = &data[take..];

            if self.block_len == BLOCK_SIZE {
                self.finish_block();
            }
        }
    }

    fn finish_block(&mut self) {
        let block = std::mem::replace(&mut self.block, Sha256::new());
        self.digests.extend_from_slice(&block.finalize());
        self.block_len = 0;
    }

    pub fn finalize(mut self) -> String {
        if self.block_len > 0 {
            self.finish_block();
        }
        format!("{:x}", Sha256::digest(&self.digests))
    }
}

impl Default for ContentHasher {
    fn default() -> Self {
        Self::new()
    }
}

/// 计算内存数据的内容哈希
pub fn content_hash_bytes(data: &[u8]) -> String {
    let mut hasher = ContentHasher::new();
    hasher.update(data);
    hasher.finalize()
}

/// 从读取器计算内容哈希
pub fn content_hash_reader<R: Read>(mut reader: R) -> io::Result<String> {
    let mut hasher = ContentHasher::new();
    let mut buffer = vec![0u8; 64 * 1024];

    loop {
        let n = match reader.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        hasher.update(&buffer[..n]);
    }

    Ok(hasher.finalize())
}

/// 计算本地文件的内容哈希，读取失败返回 None（调用方视为"未知，需要重新同步"）
pub async fn content_hash_file(path: &Path) -> Option<String> {
    let path: PathBuf = path.to_path_buf();

    let result = tokio::task::spawn_blocking(move || {
        let file = std::fs::File::open(&path)?;
        content_hash_reader(io::BufReader::new(file))
    })
    .await;

    match result {
        Ok(Ok(hash)) => Some(hash),
        Ok(Err(e)) => {
            debug!("计算哈希失败: {}", e);
            None
        }
        Err(e) => {
            debug!("哈希任务异常: {}", e);
            None
        }
    }
}
