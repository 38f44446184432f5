//! 地址解析（系统解析器 + 内存表）
use std::collections::HashMap;
use std::net::IpAddr;
use std::time::Duration;

use hickory_resolver::config::{ResolverConfig, ResolverOpts};
use hickory_resolver::error::{ResolveError as DnsError, ResolveErrorKind};
use hickory_resolver::proto::error::ProtoErrorKind;
use hickory_resolver::system_conf::read_system_conf;
use hickory_resolver::TokioAsyncResolver;
use tokio::runtime::Runtime;
use tracing::{debug, warn};

use crate::error::{FilterError, ResolveError};

/// 主机名 → 地址列表。实现必须可在多个 worker 间共享。
pub trait Resolve: Send + Sync {
    fn resolve(&self, host: &str) -> Result<Vec<IpAddr>, ResolveError>;
}

/// DNS 解析器（hickory-resolver），读取系统配置（resolv.conf + hosts 文件），单次尝试，不重试
///
/// worker 是普通线程：共享一个 tokio 运行时，各自 `block_on` 自己的查询，查询之间互不阻塞。
pub struct SystemResolver {
    runtime: Runtime,
    resolver: TokioAsyncResolver,
    /// 整次查询上限（超时后查询 future 被丢弃，不残留线程）；None 时只受 hickory 自身的单次超时约束
    timeout: Option<Duration>,
    /// hickory 单次查询超时（用于报告 hickory 自身的超时）
    query_timeout: Duration,
}

impl SystemResolver {
    /// 使用系统 DNS 配置；读取失败时退回 hickory 默认配置
    pub fn new(timeout: Option<Duration>) -> Result<Self, FilterError> {
        let (config, opts) = match read_system_conf() {
            Ok(conf) => conf,
            Err(e) => {
                warn!(error = %e, "reading system DNS configuration failed, using defaults");
                (ResolverConfig::default(), ResolverOpts::default())
            }
        };
        Self::build(config, opts, timeout)
    }

    /// 使用指定的上游配置（hosts 文件仍然生效）
    pub fn with_config(config: ResolverConfig, timeout: Option<Duration>) -> Result<Self, FilterError> {
        Self::build(config, ResolverOpts::default(), timeout)
    }

    fn build(config: ResolverConfig, mut opts: ResolverOpts, timeout: Option<Duration>) -> Result<Self, FilterError> {
        opts.attempts = 1;
        // 整次查询的上限由外层 tokio::time::timeout 保证；hickory 的单次超时不得比它更早触发
        if let Some(t) = timeout {
            opts.timeout = opts.timeout.max(t);
        }
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .thread_name("inscope-dns")
            .enable_all()
            .build()
            .map_err(FilterError::Resolver)?;
        let resolver = {
            let _guard = runtime.enter();
            TokioAsyncResolver::tokio(config, opts.clone())
        };
        debug!(query_timeout = ?opts.timeout, ?timeout, "dns resolver ready");
        Ok(Self { runtime, resolver, timeout, query_timeout: opts.timeout })
    }

    fn map_error(&self, host: &str, e: DnsError) -> ResolveError {
        let after = self.timeout.unwrap_or(self.query_timeout);
        match e.kind() {
            ResolveErrorKind::NoRecordsFound { .. } => ResolveError::NoAddresses { host: host.to_string() },
            ResolveErrorKind::Timeout => ResolveError::Timeout { host: host.to_string(), after },
            ResolveErrorKind::Proto(p) if matches!(p.kind(), ProtoErrorKind::Timeout) => {
                ResolveError::Timeout { host: host.to_string(), after }
            }
            _ => ResolveError::Lookup { host: host.to_string(), reason: e.to_string() },
        }
    }
}

impl Resolve for SystemResolver {
    fn resolve(&self, host: &str) -> Result<Vec<IpAddr>, ResolveError> {
        let lookup = self.runtime.block_on(async {
            let query = self.resolver.lookup_ip(host);
            match self.timeout {
                Some(after) => match tokio::time::timeout(after, query).await {
                    Ok(res) => res.map_err(|e| self.map_error(host, e)),
                    Err(_) => Err(ResolveError::Timeout { host: host.to_string(), after }),
                },
                None => query.await.map_err(|e| self.map_error(host, e)),
            }
        })?;

        // A 与 AAAA 记录可能经 CNAME 重复出现，保序去重
        let mut ips: Vec<IpAddr> = Vec::new();
        for ip in lookup.iter() {
            if !ips.contains(&ip) {
                ips.push(ip);
            }
        }
        if ips.is_empty() {
            return Err(ResolveError::NoAddresses { host: host.to_string() });
        }
        Ok(ips)
    }
}

/// 内存解析表（测试与离线运行用）。主机名不区分大小写，忽略末尾的点。
#[derive(Debug, Clone, Default)]
pub struct StaticResolver {
    table: HashMap<String, Vec<IpAddr>>,
}

impl StaticResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, host: &str, addrs: impl IntoIterator<Item = IpAddr>) -> &mut Self {
        self.table.insert(normalize(host), addrs.into_iter().collect());
        self
    }
}

impl Resolve for StaticResolver {
    fn resolve(&self, host: &str) -> Result<Vec<IpAddr>, ResolveError> {
        match self.table.get(&normalize(host)) {
            Some(addrs) if !addrs.is_empty() => Ok(addrs.clone()),
            Some(_) => Err(ResolveError::NoAddresses { host: host.to_string() }),
            None => Err(ResolveError::Lookup { host: host.to_string(), reason: "no such host".into() }),
        }
    }
}

fn normalize(host: &str) -> String {
    host.trim_end_matches('.').to_ascii_lowercase()
}
