use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "photo-chat")]
#[command(about = "写真をアップロードしてAIと会話するプロフィール別セッションCLI", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// 詳細ログを出力
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// バックエンドURL（設定ファイルより優先）
    #[arg(long, global = true)]
    pub backend_url: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// プロフィール管理
    Profiles {
        #[command(subcommand)]
        action: ProfileAction,
    },

    /// アクティブなプロフィールの写真
    Photos {
        #[command(subcommand)]
        action: PhotoAction,
    },

    /// 写真をアップロードして会話用に選択
    Upload {
        /// 画像ファイルのパス
        #[arg(required = true)]
        path: PathBuf,

        /// アップロード後すぐにチャットを開始
        #[arg(long)]
        chat: bool,
    },

    /// 選択中の写真についてチャット（メッセージ省略で対話モード）
    Chat {
        /// 送信するメッセージ
        message: Option<String>,

        /// 対話モードで発言ごとに年間レビューを更新して表示
        #[arg(long)]
        review: bool,
    },

    /// 年間レビューを表示
    Review,

    /// 会話から蓄積された知識グラフを表示
    Graph,

    /// 現在のセッション状態を表示
    Status,

    /// アップロードのお題を表示
    Fortune {
        /// お題の番号（省略時はランダム）
        index: Option<usize>,
    },

    /// バックエンドの疎通確認
    Ping,

    /// 設定を表示/編集
    Config {
        /// バックエンドURLを設定
        #[arg(long = "set-backend-url")]
        set_backend_url: Option<String>,

        /// 設定を表示
        #[arg(long)]
        show: bool,
    },
}

#[derive(Subcommand)]
pub enum ProfileAction {
    /// 一覧（アクティブなものに印）
    List,

    /// 作成してアクティブにする
    Create {
        name: Option<String>,
    },

    /// 削除
    Delete {
        name: Option<String>,

        /// 確認をスキップ
        #[arg(short, long)]
        yes: bool,
    },

    /// アクティブにする（省略時は一覧から選択）
    Select {
        name: Option<String>,
    },

    /// アクティブなプロフィールを解除
    Deselect,
}

#[derive(Subcommand)]
pub enum PhotoAction {
    /// アップロード済みの写真一覧
    List,

    /// 既存の写真を会話用に選択（省略時は一覧から選択）
    Select {
        filename: Option<String>,
    },
}
