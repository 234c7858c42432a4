use crate::tracing_setup::tracing_init;
use async_value::{AsyncStore, AsyncValue, Recompute, WhenOptions};
use futures_signals::signal::SignalExt;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::time::sleep;
use tracing::{info, warn};

mod tracing_setup;

#[derive(Error, Debug)]
#[error("weather service unavailable for {0}")]
struct Unavailable(&'static str);

async fn fetch_temperature(city: &'static str, fail: bool) -> Result<i32, Unavailable> {
    sleep(Duration::from_millis(100)).await;
    if fail {
        Err(Unavailable(city))
    } else {
        Ok(city.len() as i32 * 3)
    }
}

fn render(value: &AsyncValue<i32>) -> String {
    value.when_with(
        WhenOptions::default(),
        |temperature| {
            if value.is_refreshing() {
                format!("{temperature}°C (refreshing)")
            } else {
                format!("{temperature}°C")
            }
        },
        |error, _| match value.value_or_none() {
            Some(stale) => format!("error: {error} (last known {stale}°C)"),
            None => format!("error: {error}"),
        },
        || "loading...".to_string(),
    )
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_init()?;

    let store = Arc::new(AsyncStore::<i32>::new(AsyncValue::loading()));

    let view_store = store.clone();
    let view = tokio::spawn(async move {
        view_store
            .to_signal()
            .for_each(|state| {
                info!("  View | {}", render(&state));
                async {}
            })
            .await;
    });

    info!("==========================================");
    warn!("A. first load shows a spinner");
    store.execute(Recompute::Reload, fetch_temperature("Paris", false))?;
    sleep(Duration::from_millis(300)).await;

    info!("==========================================");
    warn!("B. a dependency changed: spinner again, the old value is kept underneath");
    store.reload(fetch_temperature("Amsterdam", false))?;
    sleep(Duration::from_millis(50)).await;
    let state = store.await_state().await?;
    info!("  Main | reloading: {}, value kept: {:?}", state.is_reloading(), state.value_or_none());
    sleep(Duration::from_millis(250)).await;

    info!("==========================================");
    warn!("C. explicit refresh keeps showing data, then fails and retains it");
    store.refresh(fetch_temperature("Amsterdam", true))?;
    sleep(Duration::from_millis(300)).await;

    info!("==========================================");
    warn!("D. a slow refresh is abandoned after its deadline");
    store.execute_with_timeout(
        Recompute::Refresh,
        async {
            sleep(Duration::from_secs(5)).await;
            Ok::<i32, Unavailable>(0)
        },
        Duration::from_millis(100),
    )?;
    sleep(Duration::from_millis(300)).await;

    let state = store.await_state().await?;
    info!("  Main | final state: {}", render(&state));
    info!("  Main | without history: {}", render(&state.unwrap_previous()));

    view.abort();
    info!("  Main | Finish");
    Ok(())
}
