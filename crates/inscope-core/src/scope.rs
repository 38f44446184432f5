//! 范围集合：启动时构建，之后只读
use std::fs::File;
use std::io::BufReader;
use std::net::IpAddr;
use std::path::Path;

use ipnetwork::IpNetwork;
use tracing::{debug, warn};

use crate::error::{FilterError, ScopeLineError};
use crate::lines::read_line_lossy;

/// 有序网段集合。构建完成后不可修改，可被任意多个线程并发只读访问。
#[derive(Debug, Clone, Default)]
pub struct ScopeSet {
    ranges: Vec<IpNetwork>,
}

/// 构建结果：成功的集合 + 被拒绝的行
#[derive(Debug)]
pub struct ScopeBuild {
    pub scope: ScopeSet,
    pub rejected: Vec<ScopeLineError>,
}

impl ScopeSet {
    /// 逐行解析网段（CIDR，IPv4/IPv6 均可；无前缀的单地址视为 /32 或 /128）
    /// - 空行与 `#` 开头的行直接跳过
    /// - 解析失败的行总是以 warn 报告并丢弃，其余行照常加载
    pub fn build<I, S>(lines: I) -> ScopeBuild
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut ranges = Vec::new();
        let mut rejected = Vec::new();

        for (idx, raw) in lines.into_iter().enumerate() {
            let line = raw.as_ref().trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            match line.parse::<IpNetwork>() {
                Ok(net) => ranges.push(net),
                Err(e) => {
                    let err = ScopeLineError { line_no: idx + 1, line: line.to_string(), reason: e.to_string() };
                    warn!("{err}");
                    rejected.push(err);
                }
            }
        }

        debug!(ranges = ranges.len(), rejected = rejected.len(), "scope built");
        ScopeBuild { scope: ScopeSet { ranges }, rejected }
    }

    /// 查询地址是否落在任一网段内；按源文件顺序，首个命中者胜出。
    /// IPv4 映射的 IPv6 地址（::ffff:a.b.c.d）同时按其 IPv4 形式比较。
    pub fn contains(&self, addr: IpAddr) -> Option<&IpNetwork> {
        let mapped = match addr {
            IpAddr::V6(v6) => v6.to_ipv4_mapped().map(IpAddr::V4),
            IpAddr::V4(_) => None,
        };
        self.ranges
            .iter()
            .find(|net| net.contains(addr) || mapped.is_some_and(|m| net.contains(m)))
    }

    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &IpNetwork> {
        self.ranges.iter()
    }
}

/// 从文件加载范围集合
/// 一个可用网段都没有时视为配置错误（否则整次运行注定零命中）
pub fn load_scope_file(path: &Path) -> Result<ScopeSet, FilterError> {
    let file_err = |source| FilterError::ScopeFile { path: path.to_path_buf(), source };
    let mut reader = BufReader::new(File::open(path).map_err(file_err)?);

    // 非 UTF-8 的行按有损解码保留下来，由 build 当作无效网段报告
    let mut lines = Vec::new();
    let mut buf = Vec::new();
    while let Some(line) = read_line_lossy(&mut reader, &mut buf).map_err(file_err)? {
        lines.push(line);
    }

    let ScopeBuild { scope, rejected } = ScopeSet::build(&lines);
    if scope.is_empty() {
        return Err(FilterError::EmptyScope { rejected: rejected.len() });
    }
    Ok(scope)
}
