//! CLI burrow
//!
//! `demo` прогоняет полный цикл публикация → получение → действие над
//! доставкой на брокере в памяти процесса с загруженными настройками.
//! `decode` разрешает ссылку на файл нагрузки и печатает её содержимое.

use std::{path::PathBuf, sync::Arc, time::Duration};

use anyhow::{bail, Context, Result};
use burrow::{
    broker::{ExchangeKind, QueueOptions},
    channel::publish_named,
    init_logging, ChannelHandle, DeliveryAction, DeliveryDispatcher, MemoryBroker, Payload,
    Publisher, ResourceRegistry, Settings,
};
use clap::{Parser, Subcommand};
use tracing::info;

/// Очередь демо, если в настройках она не задана.
const DEMO_QUEUE: &str = "burrow.demo";

#[derive(Parser)]
#[command(name = "burrow")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Publish tokens to a broker and acknowledge deliveries", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Путь к TOML-файлу настроек
    #[arg(short, long, env = "BURROW_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Публикует сообщения в брокер в памяти, получает их и применяет
    /// действие над доставкой
    Demo {
        /// Текст сообщения
        #[arg(short, long, default_value = "hello from burrow")]
        message: String,
        /// Количество сообщений
        #[arg(short = 'n', long, default_value_t = 3)]
        count: usize,
        /// Действие над доставкой (перекрывает настройки)
        #[arg(short, long)]
        action: Option<DeliveryAction>,
    },
    /// Декодирует тело сообщения (например, имя файла нагрузки)
    Decode {
        /// Тело сообщения
        reference: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = Settings::load(cli.config.as_deref()).context("failed to load settings")?;
    let logging = init_logging(&settings.logging)?;

    let result = match cli.command {
        Commands::Demo {
            message,
            count,
            action,
        } => demo(&settings, &message, count, action).await,
        Commands::Decode { reference } => decode(&settings, &reference),
    };

    logging.shutdown();
    result
}

async fn demo(
    settings: &Settings,
    message: &str,
    count: usize,
    action: Option<DeliveryAction>,
) -> Result<()> {
    let publisher_cfg = &settings.publisher;
    let queue = if publisher_cfg.queue.is_empty() {
        DEMO_QUEUE
    } else {
        publisher_cfg.queue.as_str()
    };

    let broker = MemoryBroker::new();
    broker.declare_queue(queue, QueueOptions::default());
    if !publisher_cfg.exchange.is_empty() {
        broker.declare_exchange(&publisher_cfg.exchange, ExchangeKind::Direct)?;
        broker.bind_queue(&publisher_cfg.exchange, queue, queue)?;
    }

    let registry = ResourceRegistry::new();
    let timeout = settings.broker.operation_timeout();
    let publisher = Publisher::builder()
        .exchange(&publisher_cfg.exchange)
        .queue(queue)
        .channel_name(&publisher_cfg.channel_name)
        .converter(publisher_cfg.converter.build())
        .op_timeout(timeout)
        .build(Arc::new(broker.connect()));
    info!(info = %publisher.quick_info(), "Publisher ready");

    for i in 0..count {
        let token = Payload::Text(format!("{message} #{}", i + 1));
        publisher.publish(&registry, &token).await?;
    }
    publisher.wrap_up(&registry).await;

    let consumer = broker.connect().open_memory_channel()?;
    let delivery_cfg = &settings.delivery;
    publish_named(
        &registry,
        Arc::new(ChannelHandle::new(
            &delivery_cfg.channel_name,
            consumer.clone(),
            timeout,
        )),
    );
    let dispatcher =
        DeliveryDispatcher::new(&delivery_cfg.channel_name, action.unwrap_or(delivery_cfg.action));
    info!(info = %dispatcher.quick_info(), "Delivery dispatcher ready");
    let decoder = publisher_cfg.converter.build_decoder();

    for _ in 0..count {
        let Some(delivery) = consumer.consume(queue, Duration::from_secs(1)).await? else {
            bail!("expected {count} messages in '{queue}', queue drained early");
        };
        let payload = decoder.decode(&delivery.body)?;
        println!("{} {}", delivery.tag, payload.to_json());
        dispatcher.perform_action(&registry, delivery.tag).await?;
    }

    if let Some(handle) = burrow::channel::lookup_named(&registry, &delivery_cfg.channel_name) {
        handle.close().await;
    }
    println!("{}", serde_json::to_string_pretty(&broker.stats())?);
    Ok(())
}

fn decode(
    settings: &Settings,
    reference: &str,
) -> Result<()> {
    let decoder = settings.publisher.converter.build_decoder();
    let payload = decoder
        .decode(reference.as_bytes())
        .with_context(|| format!("failed to decode '{reference}'"))?;
    println!("{}", serde_json::to_string_pretty(&payload.to_json())?);
    Ok(())
}
