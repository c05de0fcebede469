use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Invalid repository URL '{url}': {reason}")]
    InvalidRepoUrl { url: String, reason: String },

    #[error("Unsupported language '{0}': only golang is supported in this version")]
    UnsupportedLanguage(String),

    #[error("Invalid repo name '{name}': {reason}")]
    InvalidRepoName { name: String, reason: String },

    #[error("設定ファイルの読み込みに失敗しました: {path}\n理由: {message}")]
    ConfigLoad { path: PathBuf, message: String },

    #[error("無効な設定: {0}")]
    InvalidConfig(String),

    #[error("IO エラー: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, CoreError>;
