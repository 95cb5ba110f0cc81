//! 全局错误类型定义
//! 仅出现在指纹库加载与 CLI 层；信号提取与检测引擎内部只降级、不报错

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RswappalyzerError {
    // 指纹数据相关错误
    #[error("远程数据源 {url} 返回状态码 {status}")]
    RemoteStatus { url: String, status: u16 },
    #[error("指纹表 {source_name} 不是 JSON 对象")]
    TableShape { source_name: String },
    #[error("快照 {0} 不含任何技术指纹")]
    EmptySnapshot(PathBuf),

    // 网络相关错误
    #[error("网络请求失败：{0}")]
    HttpError(#[from] reqwest::Error),
    #[error("URL解析失败：{0}")]
    UrlError(#[from] url::ParseError),

    // 序列化/反序列化错误
    #[error("JSON解析失败：{0}")]
    JsonError(#[from] serde_json::Error),
    #[error("快照编码失败：{0}")]
    SnapshotEncode(#[from] rmp_serde::encode::Error),
    #[error("快照解码失败：{0}")]
    SnapshotDecode(#[from] rmp_serde::decode::Error),

    // 基础错误
    #[error("IO操作失败：{0}")]
    IoError(#[from] std::io::Error),
}

// 全局Result类型
pub type RswResult<T> = Result<T, RswappalyzerError>;
