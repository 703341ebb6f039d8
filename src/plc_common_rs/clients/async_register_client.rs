//! 非同期ホスト向けのレジスタ操作ディスパッチャ
//!
//! 各操作はブロッキングスレッドプール上で実行する。書き込みは1つの
//! `tokio::sync::Mutex` で直列化し、共有バイトの読み出し→書き込みが
//! 他のタスクの書き込みと交差しないようにする。読み出しはロックを取らない。

use crate::plc_common_rs::clients::register_client::RegisterClient;
use crate::plc_common_rs::clients::transport::Connector;
use crate::plc_common_rs::register::core::exceptions::{RegisterError, RegisterResult};
use crate::plc_common_rs::register::types::field_value::FieldValueSet;
use crate::plc_common_rs::register::types::verification::VerificationResult;
use crate::plc_common_rs::register::types::write_intent::{PidMode, WriteIntent};
use async_trait::async_trait;
use log::debug;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

#[async_trait]
pub trait AsyncRegisterOps {
    async fn read_process_state(&self) -> RegisterResult<FieldValueSet>;
    async fn write_boolean_group(&self, intent: WriteIntent) -> RegisterResult<VerificationResult>;
    async fn write_buttons(&self, start: bool, stop: bool, emergency_stop: bool) -> RegisterResult<VerificationResult>;
    async fn write_scalar_and_flag(&self, setpoint: i64, confirm: bool) -> RegisterResult<VerificationResult>;
    async fn write_pid_mode_group(&self, intent: WriteIntent) -> RegisterResult<VerificationResult>;
    async fn write_pid_mode(&self, mode: PidMode) -> RegisterResult<VerificationResult>;
    async fn get_stats(&self) -> DispatchStats;
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DispatchStats {
    pub reads: usize,
    pub writes: usize,
    pub confirmed: usize,
    /// 不一致はないが検証を省略した書き込みを含む
    pub unverified: usize,
    pub mismatches: usize,
    pub errors: usize,
}

pub struct SerializedRegisterClient<C: Connector> {
    inner: Arc<RegisterClient<C>>,
    write_lock: Arc<Mutex<()>>,
    stats: Arc<RwLock<DispatchStats>>,
}

impl<C: Connector> Clone for SerializedRegisterClient<C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            write_lock: Arc::clone(&self.write_lock),
            stats: Arc::clone(&self.stats),
        }
    }
}

impl<C> SerializedRegisterClient<C>
where
    C: Connector + Send + Sync + 'static,
{
    pub fn new(client: RegisterClient<C>) -> Self {
        Self {
            inner: Arc::new(client),
            write_lock: Arc::new(Mutex::new(())),
            stats: Arc::new(RwLock::new(DispatchStats::default())),
        }
    }

    pub fn client(&self) -> &RegisterClient<C> {
        &self.inner
    }

    async fn dispatch_read(&self) -> RegisterResult<FieldValueSet> {
        let inner = Arc::clone(&self.inner);
        let result = tokio::task::spawn_blocking(move || inner.read_process_state())
            .await
            .map_err(|e| RegisterError::Dispatch(e.to_string()))
            .and_then(|r| r);

        let mut stats = self.stats.write().await;
        stats.reads += 1;
        if result.is_err() {
            stats.errors += 1;
        }
        result
    }

    async fn dispatch_write<F>(&self, op: F) -> RegisterResult<VerificationResult>
    where
        F: FnOnce(&RegisterClient<C>) -> RegisterResult<VerificationResult> + Send + 'static,
    {
        // ガードはブロッキング処理の中で保持する（呼び出し側が待機を
        // 取り消しても、実行中の書き込みが終わるまで次の書き込みは始まらない）
        let guard = Arc::clone(&self.write_lock).lock_owned().await;
        debug!("書き込みロックを取得しました");
        let inner = Arc::clone(&self.inner);
        let result = tokio::task::spawn_blocking(move || {
            let _guard = guard;
            op(&inner)
        })
        .await
        .map_err(|e| RegisterError::Dispatch(e.to_string()))
        .and_then(|r| r);

        let mut stats = self.stats.write().await;
        stats.writes += 1;
        match &result {
            Ok(VerificationResult::Confirmed) => stats.confirmed += 1,
            Ok(VerificationResult::Unverified(_)) => stats.unverified += 1,
            Ok(VerificationResult::Mismatch { .. }) => stats.mismatches += 1,
            Err(_) => stats.errors += 1,
        }
        result
    }
}

#[async_trait]
impl<C> AsyncRegisterOps for SerializedRegisterClient<C>
where
    C: Connector + Send + Sync + 'static,
{
    async fn read_process_state(&self) -> RegisterResult<FieldValueSet> {
        self.dispatch_read().await
    }

    async fn write_boolean_group(&self, intent: WriteIntent) -> RegisterResult<VerificationResult> {
        self.dispatch_write(move |client| client.write_boolean_group(&intent)).await
    }

    async fn write_buttons(&self, start: bool, stop: bool, emergency_stop: bool) -> RegisterResult<VerificationResult> {
        self.dispatch_write(move |client| client.write_buttons(start, stop, emergency_stop))
            .await
    }

    async fn write_scalar_and_flag(&self, setpoint: i64, confirm: bool) -> RegisterResult<VerificationResult> {
        self.dispatch_write(move |client| client.write_scalar_and_flag(setpoint, confirm))
            .await
    }

    async fn write_pid_mode_group(&self, intent: WriteIntent) -> RegisterResult<VerificationResult> {
        self.dispatch_write(move |client| client.write_pid_mode_group(&intent)).await
    }

    async fn write_pid_mode(&self, mode: PidMode) -> RegisterResult<VerificationResult> {
        self.dispatch_write(move |client| client.write_pid_mode(mode)).await
    }

    async fn get_stats(&self) -> DispatchStats {
        self.stats.read().await.clone()
    }
}
