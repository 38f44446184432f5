//! 按行读取（字节级，非 UTF-8 内容有损替换），输入流与范围文件共用
use std::io::{self, BufRead};

/// 读取下一行并去掉行尾的 `\n` / `\r\n`；到达末尾返回 None
/// 非法 UTF-8 替换为 U+FFFD，这一行依然会交给调用方处理
pub(crate) fn read_line_lossy<R: BufRead + ?Sized>(input: &mut R, buf: &mut Vec<u8>) -> io::Result<Option<String>> {
    buf.clear();
    if input.read_until(b'\n', buf)? == 0 {
        return Ok(None);
    }
    Ok(Some(String::from_utf8_lossy(strip_line_ending(buf)).into_owned()))
}

fn strip_line_ending(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}
