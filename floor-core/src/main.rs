use floor_core::core::TaskKind;
use floor_core::{Delivery, EventFilter, FloorState, setup_environment};
use futures::StreamExt;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. 设置环境 (dotenv, 配置, 日志)
    let config = setup_environment()?;
    tracing::info!(environment = %config.environment, work_dir = %config.work_dir, "Floor core starting...");

    // 2. 初始化核心状态 (启动审计 worker)
    let (state, mut tasks) = FloorState::initialize(&config).await?;

    // 3. 可选：跟踪某个餐厅的事件流
    if let Ok(restaurant_id) = std::env::var("TAIL_RESTAURANT_ID") {
        let stream = state
            .subscribe("tail", EventFilter::restaurant(restaurant_id.clone()))
            .into_stream();
        let shutdown = tasks.shutdown_token();
        tasks.spawn("event_tail", TaskKind::Listener, async move {
            tokio::pin!(stream);
            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    delivery = stream.next() => match delivery {
                        Some(Delivery::Event(event)) => match serde_json::to_string(&event) {
                            Ok(json) => tracing::info!(restaurant_id = %restaurant_id, event = %json, "Event"),
                            Err(e) => tracing::warn!(error = %e, "Unserializable event"),
                        },
                        Some(Delivery::Resync { missed }) => {
                            tracing::warn!(missed, "Tail lagged, events skipped");
                        }
                        None => break,
                    },
                }
            }
        });
        tracing::info!("Tailing events");
    }

    tracing::info!("Floor core ready, press Ctrl-C to stop");
    tokio::signal::ctrl_c().await?;

    // 4. Graceful shutdown (排空审计队列)
    tracing::info!("Shutdown signal received");
    drop(state);
    tasks.shutdown().await;
    Ok(())
}
