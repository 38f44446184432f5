use anyhow::{Context, Result};
use clap::Parser;
use inscope_core::{filter_and_write, load_scope_file, FilterOptions, OutputFormat, SystemResolver, DEFAULT_WORKERS};
use std::io::{self, BufReader, BufWriter};
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;

/// 命令行入口（基于 clap）
/// 从标准输入逐行读取 IP / 主机名 / URL，只输出落在给定网段内的条目
#[derive(Parser, Debug)]
#[command(name = "inscope", version, about = "Filter hosts, IPs and URLs down to those inside a set of CIDR ranges")]
struct Cli {
    /// 范围文件：每行一个 CIDR
    #[arg(short = 'c', long = "cidrs")]
    cidrs: PathBuf,

    /// 并发 worker 数（0 按 1 处理）
    #[arg(short = 't', long, default_value_t = DEFAULT_WORKERS)]
    threads: usize,

    /// 输出命中地址与网段，并报告解析失败
    #[arg(short, long)]
    verbose: bool,

    /// 以 JSON Lines 输出命中项
    #[arg(long)]
    json: bool,

    /// 单次 DNS 解析超时（秒）；0 表示只用系统 DNS 配置中的超时
    #[arg(long, default_value_t = 0)]
    timeout: u64,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    // 初始化日志（写 stderr，stdout 只留给命中项）
    init_tracing(cli.verbose);

    let scope = load_scope_file(&cli.cidrs).with_context(|| format!("load scope from {}", cli.cidrs.display()))?;
    info!(ranges = scope.len(), threads = cli.threads, "scope loaded");

    let opts = FilterOptions {
        workers: cli.threads,
        verbose: cli.verbose,
        format: if cli.json { OutputFormat::Json } else { OutputFormat::Plain },
        resolve_timeout: parse_timeout(cli.timeout),
    };
    let resolver = SystemResolver::new(opts.resolve_timeout).context("start DNS resolver")?;

    // StdinLock 不能跨线程移动，生产者线程持有的是带缓冲的 Stdin
    let stdin = BufReader::new(io::stdin());
    let mut out = BufWriter::new(io::stdout().lock());
    let stats = filter_and_write(stdin, &mut out, &scope, &resolver, &opts).context("filter input")?;

    info!(
        tokens = stats.tokens_read,
        matches = stats.matches,
        resolution_failures = stats.resolution_failures,
        unrecognized = stats.unrecognized,
        "filter finished"
    );
    Ok(())
}

fn init_tracing(verbose: bool) {
    use tracing_subscriber::{EnvFilter, FmtSubscriber};
    // 支持通过环境变量 RUST_LOG 覆盖等级；--verbose 默认 debug
    let default = if verbose { "debug" } else { "info" };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let subscriber = FmtSubscriber::builder().with_env_filter(env_filter).with_writer(io::stderr).finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}

/// 解析超时参数：0 表示不额外限制
fn parse_timeout(secs: u64) -> Option<Duration> {
    (secs > 0).then(|| Duration::from_secs(secs))
}
