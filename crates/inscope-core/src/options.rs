//! 过滤选项与统计信息（模块）
use std::time::Duration;

/// 默认 worker 数量（解析是 IO 密集型，远大于 CPU 核数也合理）
pub const DEFAULT_WORKERS: usize = 40;

/// 命中项输出格式
/// - Plain：每行一个 token，verbose 时附带命中地址与网段。
/// - Json：每行一个 JSON 对象（token / address / network）。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Plain,
    Json,
}

/// 过滤选项
#[derive(Debug, Clone)]
pub struct FilterOptions {
    /// 并发 worker 数；0 会被提升为 1（见 `worker_count`）
    pub workers: usize,
    /// 详细模式：输出命中细节，并以 warn 级别报告解析失败
    pub verbose: bool,
    /// 输出格式
    pub format: OutputFormat,
    /// 单次解析超时；None 表示不设上限
    pub resolve_timeout: Option<Duration>,
}

impl Default for FilterOptions {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            verbose: false,
            format: OutputFormat::Plain,
            resolve_timeout: None,
        }
    }
}

impl FilterOptions {
    /// 实际使用的 worker 数，至少为 1（零个 worker 会让队列永远无人消费）
    pub fn worker_count(&self) -> usize {
        if self.workers == 0 {
            tracing::warn!("worker count 0 is not usable, running with 1 worker");
            return 1;
        }
        self.workers
    }
}

/// 过滤统计信息（便于 CLI 打印，也用于校验“无丢失”）
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FilterStats {
    /// 从输入读取的 token 数
    pub tokens_read: usize,
    /// 完成分类的 token 数（正常结束时应等于 tokens_read）
    pub tokens_classified: usize,
    pub matches: usize,
    pub resolution_failures: usize,
    /// 既不是地址、主机名也不是 URL 的 token
    pub unrecognized: usize,
}
