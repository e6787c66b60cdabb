//! 実行コンテキスト
//!
//! 1回の実行で共有する状態（HTTPクライアント、設定、レート制限の
//! 時計、サーキットブレーカー、実行期限）をまとめて持つ。
//! グローバル変数は使わず、必要な処理へ `Arc<RunContext>` で渡す。

use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

use crate::config::Config;
use crate::error::{Result, SeichiError};

/// 連続失敗で外部API呼び出しを打ち切るブレーカー
///
/// 成功でカウンタをリセットし、閾値に達したら以降の呼び出しを
/// 全て拒否する。アトミックなので複数ワーカーから共有できる。
#[derive(Debug)]
pub struct CircuitBreaker {
    consecutive_failures: AtomicU32,
    threshold: u32,
}

impl CircuitBreaker {
    pub fn new(threshold: u32) -> Self {
        Self {
            consecutive_failures: AtomicU32::new(0),
            threshold,
        }
    }

    pub fn is_open(&self) -> bool {
        self.consecutive_failures.load(Ordering::Relaxed) >= self.threshold
    }

    pub fn record_success(&self) {
        self.consecutive_failures.store(0, Ordering::Relaxed);
    }

    pub fn record_failure(&self) {
        self.consecutive_failures.fetch_add(1, Ordering::Relaxed);
    }
}

/// 実行全体で共有する状態
pub struct RunContext {
    pub config: Config,
    client: reqwest::Client,
    /// 直近のAPI呼び出し時刻。レート制限に使う
    last_call: Mutex<Option<Instant>>,
    pub breaker: CircuitBreaker,
    /// 実行期限。超過したら新しい作業を始めない
    deadline: Option<Instant>,
}

impl RunContext {
    pub fn new(config: Config, budget_minutes: Option<u64>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .user_agent(concat!("seichi-updater/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| SeichiError::ApiCall(format!("HTTPクライアントの初期化に失敗: {e}")))?;

        let breaker = CircuitBreaker::new(config.max_consecutive_failures);
        let deadline = budget_minutes.map(|m| Instant::now() + Duration::from_secs(m * 60));

        Ok(Self {
            config,
            client,
            last_call: Mutex::new(None),
            breaker,
            deadline,
        })
    }

    /// 実行期限を過ぎているか。期限なしなら常に false
    pub fn deadline_exceeded(&self) -> bool {
        self.deadline.map_or(false, |d| Instant::now() >= d)
    }

    /// 直近の呼び出しから最小間隔が空くまで待つ
    pub async fn throttle(&self) {
        let interval = Duration::from_millis(self.config.rate_limit_ms);
        let mut last = self.last_call.lock().await;
        if let Some(at) = *last {
            let elapsed = at.elapsed();
            if elapsed < interval {
                tokio::time::sleep(interval - elapsed).await;
            }
        }
        *last = Some(Instant::now());
    }

    /// JSONを返すAPIをレート制限・リトライ・ブレーカー込みで呼ぶ
    ///
    /// 一時エラー（接続失敗・タイムアウト・5xx・429）は指数バックオフで
    /// 再試行する。それ以外のHTTPエラーは即座に失敗とする。
    /// 最終的な成否をブレーカーに記録する。
    pub async fn get_json(&self, url: &str) -> Result<serde_json::Value> {
        if self.breaker.is_open() {
            return Err(SeichiError::ApiCall(
                "連続失敗が多すぎるためAPI呼び出しを停止中".into(),
            ));
        }

        let mut last_error = String::new();
        for attempt in 1..=self.config.max_retries {
            self.throttle().await;

            match self.client.get(url).send().await {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        let value = response.json::<serde_json::Value>().await.map_err(|e| {
                            SeichiError::ApiParse(format!("{url}: {e}"))
                        })?;
                        self.breaker.record_success();
                        return Ok(value);
                    }
                    if status.is_server_error() || status.as_u16() == 429 {
                        last_error = format!("HTTP {status}");
                    } else {
                        // 4xx は再試行しても変わらない
                        self.breaker.record_failure();
                        return Err(SeichiError::ApiCall(format!("{url}: HTTP {status}")));
                    }
                }
                Err(e) => {
                    last_error = e.to_string();
                }
            }

            if attempt < self.config.max_retries {
                // 1秒, 2秒, 4秒… の指数バックオフ
                let backoff = Duration::from_secs(1u64 << (attempt - 1));
                tokio::time::sleep(backoff).await;
            }
        }

        self.breaker.record_failure();
        Err(SeichiError::ApiCall(format!(
            "{url}: {}回試行して失敗 ({last_error})",
            self.config.max_retries
        )))
    }
}
