//! 错误类型
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// 致命错误：出现即终止整个运行
#[derive(Debug, Error)]
pub enum FilterError {
    #[error("failed to read scope file {path}")]
    ScopeFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("scope contains no usable ranges ({rejected} line(s) rejected)")]
    EmptyScope { rejected: usize },
    #[error("failed to start the DNS resolver")]
    Resolver(#[source] std::io::Error),
    #[error("failed to write output")]
    Output(#[from] std::io::Error),
}

/// 范围文件中单行解析失败（可恢复：该行被丢弃，运行继续）
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("line {line_no}: invalid range {line:?}: {reason}")]
pub struct ScopeLineError {
    pub line_no: usize,
    pub line: String,
    pub reason: String,
}

/// 单个 token 的解析失败（可恢复：视为不命中）
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ResolveError {
    #[error("lookup of {host} failed: {reason}")]
    Lookup { host: String, reason: String },
    #[error("lookup of {host} returned no addresses")]
    NoAddresses { host: String },
    #[error("lookup of {host} timed out after {after:?}")]
    Timeout { host: String, after: Duration },
}
