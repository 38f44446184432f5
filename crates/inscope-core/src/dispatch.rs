//! 过滤主流程与并发调度
//!
//! 线程模型：
//! - 1 个生产者线程：逐行读取输入，送入有界 token 队列（容量为 worker 数的 4 倍，worker 忙时生产者阻塞，不会预读整个输入）；
//! - N 个 worker：从队列取 token → classify → 把结果送往 writer；
//! - 调用线程充当唯一的 writer：统计、输出命中、报告解析失败。
//! 队列关闭且排空后 worker 退出；所有 worker 退出后结果通道关闭，运行结束。
use std::io::{BufRead, Write};

use crossbeam_channel::{self as channel, Receiver, Sender};
use tracing::{debug, error, trace, warn};

use crate::classify::{classify, Classification, TokenKind};
use crate::error::FilterError;
use crate::lines::read_line_lossy;
use crate::options::{FilterOptions, FilterStats};
use crate::output::write_match;
use crate::resolve::Resolve;
use crate::scope::ScopeSet;

/// 每个 worker 对应的 token 队列容量
const QUEUE_PER_WORKER: usize = 4;

/// 从 `input` 逐行读取 token，将范围内的命中写入 `out`
/// 输出顺序与输入顺序无关；返回时每个读入的 token 都已被分类恰好一次。
///
/// 写 `out` 失败时运行中止并返回 `FilterError::Output`。但生产者可能正阻塞在读取上，
/// 函数要等它读到下一行或 EOF 才返回；对空闲的交互式 stdin 这意味着会一直等待。
pub fn filter_and_write<R>(
    input: R,
    out: &mut dyn Write,
    scope: &ScopeSet,
    resolver: &dyn Resolve,
    opts: &FilterOptions,
) -> Result<FilterStats, FilterError>
where
    R: BufRead + Send,
{
    let workers = opts.worker_count();
    debug!(workers, ranges = scope.len(), "starting filter");

    let mut stats = FilterStats::default();
    let mut write_err: Option<std::io::Error> = None;

    std::thread::scope(|s| {
        let (token_tx, token_rx) = channel::bounded::<String>(workers.saturating_mul(QUEUE_PER_WORKER));
        let (result_tx, result_rx) = channel::unbounded::<Classification>();

        let producer = s.spawn(move || read_tokens(input, token_tx));

        for _ in 0..workers {
            let token_rx = token_rx.clone();
            let result_tx = result_tx.clone();
            s.spawn(move || work(&token_rx, &result_tx, scope, resolver));
        }
        // 只保留 worker 手里的端点，这样它们全部退出后 result_rx 才会收到关闭信号
        drop(token_rx);
        drop(result_tx);

        while let Ok(c) = result_rx.recv() {
            stats.tokens_classified += 1;
            record(&mut stats, &c, opts.verbose);
            if c.is_match() {
                stats.matches += 1;
                if let Err(e) = write_match(out, &c, opts.format, opts.verbose) {
                    // 输出已不可用：丢弃接收端，worker 的下一次 send 失败后自行退出
                    write_err = Some(e);
                    break;
                }
            }
        }
        drop(result_rx);

        stats.tokens_read = producer.join().unwrap_or_else(|p| std::panic::resume_unwind(p));
    });

    if let Some(e) = write_err {
        return Err(FilterError::Output(e));
    }
    out.flush()?;

    debug!(?stats, "filter finished");
    Ok(stats)
}

/// worker 循环：直到队列关闭且为空
fn work(tokens: &Receiver<String>, results: &Sender<Classification>, scope: &ScopeSet, resolver: &dyn Resolve) {
    for token in tokens.iter() {
        let c = classify(&token, scope, resolver);
        if results.send(c).is_err() {
            break;
        }
    }
}

/// 生产者：逐行读取，返回成功入队的 token 数
/// 读取出错时停止生产，已入队的 token 照常处理
fn read_tokens<R: BufRead>(mut input: R, tx: Sender<String>) -> usize {
    let mut queued = 0usize;
    let mut buf = Vec::new();
    loop {
        match read_line_lossy(&mut input, &mut buf) {
            Ok(Some(line)) => {
                // 队列满时在此阻塞
                if tx.send(line).is_err() {
                    break;
                }
                queued += 1;
            }
            Ok(None) => break,
            Err(e) => {
                error!(error = %e, "reading input failed, no further tokens will be queued");
                break;
            }
        }
    }
    // tx 在此处被丢弃，队列关闭
    queued
}

/// 统计并报告单个结果的非命中原因
fn record(stats: &mut FilterStats, c: &Classification, verbose: bool) {
    if let Some(e) = &c.error {
        stats.resolution_failures += 1;
        if verbose {
            warn!(token = %c.token, "{e}");
        } else {
            debug!(token = %c.token, "{e}");
        }
    } else if c.kind == TokenKind::Unrecognized {
        stats.unrecognized += 1;
        trace!(token = %c.token, "not an address, hostname or url");
    }
}
