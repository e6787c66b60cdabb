use thiserror::Error;

#[derive(Error, Debug)]
pub enum SeichiError {
    #[error("設定エラー: {0}")]
    Config(String),

    #[error("ファイルが見つかりません: {0}")]
    FileNotFound(String),

    #[error("作品フォルダが見つかりません: {0}")]
    FolderNotFound(String),

    #[error("候補データが不正: {0}")]
    InvalidCandidate(String),

    #[error("カタログの読み込みに失敗: {0}")]
    CatalogLoad(String),

    #[error("カタログの保存に失敗: {0}")]
    CatalogSave(String),

    #[error("API呼び出しエラー: {0}")]
    ApiCall(String),

    #[error("APIレスポンスのパースに失敗: {0}")]
    ApiParse(String),

    #[error("JSON解析エラー: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("IOエラー: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, SeichiError>;
