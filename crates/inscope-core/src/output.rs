//! 命中项输出（与判定逻辑分离）
use std::io::{self, Write};

use serde::Serialize;

use crate::classify::{Classification, TokenKind};
use crate::options::OutputFormat;

/// JSON 输出项（每行一个对象）
#[derive(Debug, Clone, Serialize)]
pub struct OutputItem<'a> {
    pub token: &'a str,
    pub kind: TokenKind,
    pub address: String,
    pub network: String,
}

/// 写出一条命中；不命中的分类结果直接忽略
/// - Plain：`token`，verbose 时追加 `[address in network]`（字面地址省略 address）
/// - Json：始终包含命中地址与网段
pub fn write_match(out: &mut dyn Write, c: &Classification, format: OutputFormat, verbose: bool) -> io::Result<()> {
    let Some(m) = c.matched else { return Ok(()) };

    match format {
        OutputFormat::Plain if !verbose => writeln!(out, "{}", c.token),
        OutputFormat::Plain if c.kind == TokenKind::Address => writeln!(out, "{} [in {}]", c.token, m.network),
        OutputFormat::Plain => writeln!(out, "{} [{} in {}]", c.token, m.address, m.network),
        OutputFormat::Json => {
            let item = OutputItem {
                token: &c.token,
                kind: c.kind,
                address: m.address.to_string(),
                network: m.network.to_string(),
            };
            serde_json::to_writer(&mut *out, &item)?;
            writeln!(out)
        }
    }
}
