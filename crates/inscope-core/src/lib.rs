//! 范围过滤核心库
//!
//! 设计要点：
//! - 范围集合（ScopeSet）启动时一次性构建，之后只读，所有 worker 共享引用，无需加锁。
//! - 分类（classify）只做判定并返回结构化结果，不做任何输出；输出由单线程 writer 负责。
//! - 解析器通过 `Resolve` trait 注入，测试可使用内存表，无需真实网络。
//! - 单生产者 + N 个 worker + 单 writer，通道由 crossbeam-channel 提供；token 队列有界，输入按需读取；输出顺序不保证。

mod error;
mod options;
mod lines;
mod scope;
mod resolve;
mod classify;
mod output;
mod dispatch;

pub use error::{FilterError, ResolveError, ScopeLineError};
pub use options::{FilterOptions, FilterStats, OutputFormat, DEFAULT_WORKERS};
pub use scope::{load_scope_file, ScopeBuild, ScopeSet};
pub use resolve::{Resolve, StaticResolver, SystemResolver};
pub use classify::{classify, is_hostname, Classification, ScopeMatch, TokenKind};
pub use output::{write_match, OutputItem};
pub use dispatch::filter_and_write;
