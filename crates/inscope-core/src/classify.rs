//! token 分类与范围判定
//!
//! 分派规则（确定且完备，每个 token 只落入一个分支）：
//! 1. 字面 IP 地址 → 直接比较，不解析；
//! 2. 含 `://` → 按 URL 解析，取 host；
//! 3. 符合主机名语法 → 解析；
//! 4. 含 `/`、`:` 或 `?` → 视为省略 scheme 的 URL（补 `http://` 后解析）；
//! 5. 其余 → 无法识别，不命中，也不报告。
use std::net::IpAddr;
use std::sync::OnceLock;

use ipnetwork::IpNetwork;
use regex::Regex;
use serde::Serialize;
use url::{Host, Url};

use crate::error::ResolveError;
use crate::resolve::Resolve;
use crate::scope::ScopeSet;

/// token 类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Address,
    Hostname,
    Url,
    Unrecognized,
}

/// 命中细节：哪个地址落在了哪个网段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScopeMatch {
    pub address: IpAddr,
    pub network: IpNetwork,
}

/// 单个 token 的分类结果（仅在处理该 token 期间存在）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub token: String,
    pub kind: TokenKind,
    /// 参与比较的地址：字面地址本身，或解析得到的全部地址
    pub resolved: Vec<IpAddr>,
    pub matched: Option<ScopeMatch>,
    /// 解析失败原因（视为不命中）
    pub error: Option<ResolveError>,
}

impl Classification {
    pub fn is_match(&self) -> bool {
        self.matched.is_some()
    }
}

/// 待比较的目标
enum Target {
    Addr(IpAddr),
    Host(String),
}

/// 对单个 token 分类并判定是否在范围内。
/// 范围集合显式传入，函数本身无状态：同一输入重复调用结果一致。
pub fn classify(token: &str, scope: &ScopeSet, resolver: &dyn Resolve) -> Classification {
    let token = token.trim();
    let (kind, target) = parse_target(token);
    let mut out = Classification { token: token.to_string(), kind, resolved: Vec::new(), matched: None, error: None };

    let addrs = match target {
        None => return out,
        Some(Target::Addr(addr)) => vec![addr],
        Some(Target::Host(host)) => match resolver.resolve(&host) {
            Ok(addrs) => addrs,
            Err(e) => {
                out.error = Some(e);
                return out;
            }
        },
    };

    // 任一地址在范围内即命中
    out.matched = addrs
        .iter()
        .find_map(|&address| scope.contains(address).map(|network| ScopeMatch { address, network: *network }));
    out.resolved = addrs;
    out
}

fn parse_target(token: &str) -> (TokenKind, Option<Target>) {
    if let Ok(addr) = token.parse::<IpAddr>() {
        return (TokenKind::Address, Some(Target::Addr(addr)));
    }
    if token.contains("://") {
        return url_target(token);
    }
    if is_hostname(token) {
        return (TokenKind::Hostname, Some(Target::Host(token.to_string())));
    }
    if token.contains(['/', ':', '?']) {
        return url_target(&format!("http://{token}"));
    }
    (TokenKind::Unrecognized, None)
}

/// 从 URL 中取出 host；host 缺失或不是合法主机名时视为无法识别
fn url_target(s: &str) -> (TokenKind, Option<Target>) {
    let target = Url::parse(s).ok().and_then(|url| match url.host()? {
        Host::Ipv4(v4) => Some(Target::Addr(IpAddr::V4(v4))),
        Host::Ipv6(v6) => Some(Target::Addr(IpAddr::V6(v6))),
        Host::Domain(d) if is_hostname(d) => Some(Target::Host(d.to_string())),
        Host::Domain(_) => None,
    });
    match target {
        Some(t) => (TokenKind::Url, Some(t)),
        None => (TokenKind::Unrecognized, None),
    }
}

fn hostname_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        let label = r"[A-Za-z0-9_](?:[A-Za-z0-9_-]{0,61}[A-Za-z0-9_])?";
        Regex::new(&format!(r"^{label}(?:\.{label})*$")).expect("hostname pattern")
    })
}

/// 主机名语法检查
/// - 总长 1..=253（可带末尾的点），每个 label 1..=63，字符为字母、数字、`_`、`-`
/// - label 不以 `-` 开头或结尾
/// - 最后一个 label 不能全是数字（避免 `1.2.3` 之类被当作数字地址的写法送去解析）
pub fn is_hostname(s: &str) -> bool {
    let name = s.strip_suffix('.').unwrap_or(s);
    if name.is_empty() || name.len() > 253 || !hostname_regex().is_match(name) {
        return false;
    }
    let last = name.rsplit('.').next().unwrap_or(name);
    !last.bytes().all(|b| b.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolve::{StaticResolver, SystemResolver};

    fn ip(s: &str) -> IpAddr {
        s.parse().unwrap()
    }

    fn scope(cidr: &str) -> ScopeSet {
        ScopeSet::build([cidr]).scope
    }

    fn resolver() -> StaticResolver {
        let mut r = StaticResolver::new();
        r.insert("one.one.one.one", [ip("1.1.1.1"), ip("1.0.0.1"), ip("2606:4700:4700::1111")]);
        r.insert("mixed.example.com", [ip("203.0.113.9"), ip("192.168.2.7")]);
        r
    }

    #[test]
    fn literal_ip_in_scope() {
        let c = classify("192.168.2.55", &scope("192.168.2.0/24"), &resolver());
        assert_eq!(c.kind, TokenKind::Address);
        assert!(c.is_match());
        assert_eq!(c.matched.unwrap().network.to_string(), "192.168.2.0/24");
    }

    #[test]
    fn literal_ip_out_of_scope() {
        let c = classify("192.168.2.55", &scope("192.168.2.22/32"), &resolver());
        assert_eq!(c.kind, TokenKind::Address);
        assert!(!c.is_match());
    }

    #[test]
    fn literal_ipv6() {
        let c = classify("2001:db8::1", &scope("2001:db8::/32"), &resolver());
        assert_eq!(c.kind, TokenKind::Address);
        assert!(c.is_match());
    }

    #[test]
    fn hostname_in_and_out_of_scope() {
        let r = resolver();
        let hit = classify("one.one.one.one", &scope("1.1.1.1/32"), &r);
        assert_eq!(hit.kind, TokenKind::Hostname);
        assert_eq!(hit.matched.unwrap().address, ip("1.1.1.1"));

        let miss = classify("one.one.one.one", &scope("1.0.0.2/32"), &r);
        assert!(!miss.is_match());
        assert_eq!(miss.resolved.len(), 3);
    }

    #[test]
    fn url_in_and_out_of_scope() {
        let r = resolver();
        let hit = classify("https://one.one.one.one", &scope("1.1.1.1/32"), &r);
        assert_eq!(hit.kind, TokenKind::Url);
        assert!(hit.is_match());
        assert!(!classify("https://one.one.one.one", &scope("8.8.8.8/32"), &r).is_match());
    }

    #[test]
    fn url_behaves_like_its_host() {
        let r = resolver();
        for cidr in ["1.1.1.1/32", "8.8.8.8/32", "2606:4700::/32", "192.168.2.0/24"] {
            let s = scope(cidr);
            for host in ["one.one.one.one", "mixed.example.com", "unknown.example.com"] {
                let direct = classify(host, &s, &r);
                for url in [format!("https://{host}/path?q=1"), format!("http://user@{host}:8080"), format!("{host}:443")] {
                    let via_url = classify(&url, &s, &r);
                    assert_eq!(via_url.matched, direct.matched, "{url} vs {host} in {cidr}");
                    assert_eq!(via_url.resolved, direct.resolved);
                }
            }
        }
    }

    #[test]
    fn url_with_literal_host_skips_resolution() {
        let c = classify("http://[2001:db8::5]:8443/", &scope("2001:db8::/64"), &StaticResolver::new());
        assert_eq!(c.kind, TokenKind::Url);
        assert!(c.is_match());
        assert!(c.error.is_none());

        let c = classify("10.1.2.3:22", &scope("10.0.0.0/8"), &StaticResolver::new());
        assert_eq!(c.kind, TokenKind::Url);
        assert!(c.is_match());
    }

    #[test]
    fn any_resolved_address_is_enough() {
        let c = classify("mixed.example.com", &scope("192.168.2.0/24"), &resolver());
        let m = c.matched.unwrap();
        assert_eq!(m.address, ip("192.168.2.7"));
    }

    #[test]
    fn resolution_failure_is_a_non_match() {
        let c = classify("nope.example.com", &scope("0.0.0.0/0"), &resolver());
        assert_eq!(c.kind, TokenKind::Hostname);
        assert!(!c.is_match());
        assert!(matches!(c.error, Some(ResolveError::Lookup { .. })));
    }

    #[test]
    fn noise_is_unrecognized_without_error() {
        let s = scope("0.0.0.0/0");
        for token in ["", "   ", "hello world", "not a host!", "-leading.example.com", "a:b", "http://", "1.2.3", "@@@"] {
            let c = classify(token, &s, &resolver());
            assert_eq!(c.kind, TokenKind::Unrecognized, "{token:?}");
            assert!(!c.is_match());
            assert!(c.error.is_none());
        }
    }

    #[test]
    fn classification_is_idempotent() {
        let s = scope("1.1.1.1/32");
        let r = resolver();
        for token in ["one.one.one.one", "https://one.one.one.one", "1.1.1.1", "junk token"] {
            assert_eq!(classify(token, &s, &r), classify(token, &s, &r));
        }
    }

    #[test]
    fn surrounding_whitespace_is_ignored() {
        let c = classify("  192.168.2.55\t", &scope("192.168.2.0/24"), &resolver());
        assert_eq!(c.token, "192.168.2.55");
        assert!(c.is_match());
    }

    #[test]
    fn hostname_grammar() {
        assert!(is_hostname("example.com"));
        assert!(is_hostname("example.com."));
        assert!(is_hostname("localhost"));
        assert!(is_hostname("_dmarc.example.com"));
        assert!(is_hostname("xn--bcher-kva.example"));
        assert!(!is_hostname("exa mple.com"));
        assert!(!is_hostname("-bad.example.com"));
        assert!(!is_hostname("bad-.example.com"));
        assert!(!is_hostname("a..b"));
        assert!(!is_hostname("1.2.3.4"));
        assert!(!is_hostname(&format!("{}.com", "a".repeat(64))));
        assert!(!is_hostname(&format!("{}a", "a.".repeat(127))));
        assert!(!is_hostname("https://example.com"));
    }

    #[test]
    #[ignore = "requires network access"]
    fn real_resolver_scenarios() {
        let r = SystemResolver::new(None).unwrap();
        assert!(classify("one.one.one.one", &scope("1.1.1.1/32"), &r).is_match());
        assert!(!classify("https://one.one.one.one", &scope("8.8.8.8/32"), &r).is_match());
    }
}
