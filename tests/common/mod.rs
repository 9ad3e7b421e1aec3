//! Брокер-двойник, записывающий каждый вызов.

#![allow(dead_code)]

use std::sync::{
    atomic::{AtomicBool, AtomicUsize, Ordering},
    Arc,
};

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;

use burrow::{
    channel::MessageProperties, BrokerChannel, BrokerClientError, BrokerConnection, DeliveryTag,
};

/// Вызов брокера, как его увидел двойник.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Publish {
        exchange: String,
        routing_key: String,
        body: Vec<u8>,
    },
    Ack(u64),
    Nack(u64, bool),
    Reject(u64, bool),
    Close,
}

#[derive(Default)]
pub struct Recorder {
    pub calls: Mutex<Vec<Call>>,
    pub channels_opened: AtomicUsize,
    /// Если задано, все операции канала (кроме close) завершаются этой ошибкой.
    pub fail_with: Mutex<Option<BrokerClientError>>,
    /// Если `true`, открытие канала и все операции канала (включая close)
    /// никогда не завершаются.
    pub hang: AtomicBool,
}

impl Recorder {
    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    pub fn opened(&self) -> usize {
        self.channels_opened.load(Ordering::SeqCst)
    }

    pub fn fail_with(
        &self,
        err: BrokerClientError,
    ) {
        *self.fail_with.lock() = Some(err);
    }

    pub fn hang(&self) {
        self.hang.store(true, Ordering::SeqCst);
    }

    async fn stall_if_hanging(&self) {
        if self.hang.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
    }

    async fn record(
        &self,
        call: Call,
    ) -> Result<(), BrokerClientError> {
        self.calls.lock().push(call);
        self.stall_if_hanging().await;
        match self.fail_with.lock().clone() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

pub struct RecordingConnection {
    pub recorder: Arc<Recorder>,
    pub open: AtomicBool,
}

pub struct RecordingChannel {
    id: u16,
    recorder: Arc<Recorder>,
}

impl RecordingConnection {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            recorder: Arc::new(Recorder::default()),
            open: AtomicBool::new(true),
        })
    }

    /// Канал вне соединения, для регистрации в реестре напрямую.
    pub fn channel(recorder: &Arc<Recorder>) -> Arc<RecordingChannel> {
        Arc::new(RecordingChannel {
            id: 1,
            recorder: recorder.clone(),
        })
    }
}

#[async_trait]
impl BrokerConnection for RecordingConnection {
    async fn open_channel(&self) -> Result<Arc<dyn BrokerChannel>, BrokerClientError> {
        if !self.is_open() {
            return Err(BrokerClientError::ConnectionClosed);
        }
        self.recorder.stall_if_hanging().await;
        // Небольшая задержка, чтобы конкурентные первые вызовы пересеклись.
        tokio::task::yield_now().await;
        let n = self.recorder.channels_opened.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(Arc::new(RecordingChannel {
            id: n as u16,
            recorder: self.recorder.clone(),
        }))
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BrokerChannel for RecordingChannel {
    fn id(&self) -> u16 {
        self.id
    }

    async fn basic_publish(
        &self,
        exchange: &str,
        routing_key: &str,
        _properties: Option<&MessageProperties>,
        body: Bytes,
    ) -> Result<(), BrokerClientError> {
        self.recorder.record(Call::Publish {
            exchange: exchange.to_string(),
            routing_key: routing_key.to_string(),
            body: body.to_vec(),
        })
        .await
    }

    async fn ack(
        &self,
        tag: DeliveryTag,
    ) -> Result<(), BrokerClientError> {
        self.recorder.record(Call::Ack(tag.value())).await
    }

    async fn nack(
        &self,
        tag: DeliveryTag,
        requeue: bool,
    ) -> Result<(), BrokerClientError> {
        self.recorder.record(Call::Nack(tag.value(), requeue)).await
    }

    async fn reject(
        &self,
        tag: DeliveryTag,
        requeue: bool,
    ) -> Result<(), BrokerClientError> {
        self.recorder.record(Call::Reject(tag.value(), requeue)).await
    }

    async fn close(&self) -> Result<(), BrokerClientError> {
        self.recorder.calls.lock().push(Call::Close);
        self.recorder.stall_if_hanging().await;
        Ok(())
    }
}

/// Количество файлов в каталоге.
pub fn file_count(dir: &std::path::Path) -> usize {
    std::fs::read_dir(dir).map(|it| it.count()).unwrap_or(0)
}
