use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "seichi-updater")]
#[command(about = "アニメ聖地巡礼データベースの照合・マージツール", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// 詳細ログを出力
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// 候補JSONをカタログへ照合・マージ
    Reconcile {
        /// スクレイパーが出力した候補JSONファイル
        #[arg(required = true)]
        input: PathBuf,

        /// データディレクトリ（作品フォルダとindex.json）
        #[arg(short, long)]
        base_dir: Option<PathBuf>,

        /// ルートディレクトリ（ルート側index.jsonとapiid.json）
        #[arg(short, long)]
        root_dir: Option<PathBuf>,

        /// 処理する候補数の上限
        #[arg(short, long)]
        max_anime: Option<usize>,

        /// 実行時間の上限（分）
        #[arg(long)]
        budget_minutes: Option<u64>,

        /// ドライラン（変更を適用せずプレビュー）
        #[arg(long)]
        dry_run: bool,
    },

    /// 中文タイトルをbgm.tvで補完
    Names {
        /// データディレクトリ
        #[arg(short, long)]
        base_dir: Option<PathBuf>,

        /// ルートディレクトリ
        #[arg(short, long)]
        root_dir: Option<PathBuf>,

        /// 実行時間の上限（分）
        #[arg(long)]
        budget_minutes: Option<u64>,
    },

    /// 巡礼点の座標から地域タグを補完
    Region {
        /// データディレクトリ
        #[arg(short, long)]
        base_dir: Option<PathBuf>,

        /// ルートディレクトリ
        #[arg(short, long)]
        root_dir: Option<PathBuf>,

        /// 既に地域タグがある作品も付け直す
        #[arg(short, long)]
        force: bool,

        /// 並行に処理する作品数
        #[arg(short, long, default_value = "5")]
        workers: usize,

        /// 実行時間の上限（分）
        #[arg(long)]
        budget_minutes: Option<u64>,
    },

    /// 作品フォルダの内容からindex.jsonを再構築
    Index {
        /// データディレクトリ
        #[arg(short, long)]
        base_dir: Option<PathBuf>,

        /// ルートディレクトリ
        #[arg(short, long)]
        root_dir: Option<PathBuf>,
    },

    /// 設定を表示/編集
    Config {
        /// 設定を表示
        #[arg(long)]
        show: bool,

        /// データディレクトリを設定
        #[arg(long)]
        set_base_dir: Option<String>,

        /// API呼び出し間隔（ミリ秒）を設定
        #[arg(long)]
        set_rate_limit_ms: Option<u64>,
    },
}
