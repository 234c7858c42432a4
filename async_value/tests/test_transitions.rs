use async_value::{guard, AsyncValue, CapturedError, Recompute, StackTrace, WhenOptions};
use common::{FetchError, Provider};

mod common;

fn render(value: &AsyncValue<u64>) -> String {
    value.when(
        |count| format!("count {count}"),
        |error, _| format!("failed: {error}"),
        || "spinner".to_string(),
    )
}

#[test]
fn test_data_properties() {
    let value = AsyncValue::data(3_u64);
    assert!(value.has_value());
    assert_eq!(value.value(), Ok(Some(&3)));
    assert!(!value.is_loading());
    assert!(!value.has_error());
}

#[test]
fn test_error_properties() {
    let trace = StackTrace::disabled();
    let value = AsyncValue::<u64>::fail(FetchError("offline"), trace.clone());
    assert!(value.has_error());
    assert_eq!(
        value.error().and_then(|e| e.downcast_ref::<FetchError>()),
        Some(&FetchError("offline"))
    );
    assert_eq!(value.stack_trace(), Some(&trace));
    assert!(!value.has_value());

    let raised: CapturedError = value.value().unwrap_err();
    assert_eq!(raised.to_string(), "offline");
    assert!(raised.stack_trace().ptr_eq(&trace));
}

#[test]
fn test_provider_lifecycle() {
    let mut provider = Provider::<u64>::new();
    assert_eq!(render(provider.current()), "spinner");

    provider.complete(Ok::<_, FetchError>(1));
    assert_eq!(render(provider.current()), "count 1");

    // A watched dependency changed: the spinner shows, the value is still there.
    provider.start(false);
    assert_eq!(provider.current().recompute(), Some(Recompute::Reload));
    assert_eq!(render(provider.current()), "spinner");
    assert_eq!(provider.current().value_or_none(), Some(&1));

    provider.complete(Ok::<_, FetchError>(2));
    assert_eq!(render(provider.current()), "count 2");

    // An explicit refresh keeps showing the old count.
    provider.start(true);
    assert_eq!(provider.current().recompute(), Some(Recompute::Refresh));
    assert_eq!(render(provider.current()), "count 2");

    provider.complete(Err::<u64, _>(FetchError("offline")));
    assert_eq!(render(provider.current()), "failed: offline");
    assert_eq!(provider.current().value_or_none(), Some(&2));
    assert_eq!(
        provider
            .current()
            .when_with(WhenOptions::default().skip_error(true), |c| *c, |_, _| 0, || 0),
        2
    );

    // Stripping the history forgets the retained count.
    let unwrapped = provider.current().clone().unwrap_previous();
    assert!(!unwrapped.has_value());
    assert!(unwrapped.has_error());
}

#[test]
fn test_provider_change_detection() {
    let mut provider = Provider::<u64>::new();

    // A first-time reload over a plain loading state changes nothing.
    provider.start(false);
    assert_eq!(provider.notifications(), 0);

    provider.complete(Ok::<_, FetchError>(1));
    assert_eq!(provider.notifications(), 1);

    // Same data again is structurally equal.
    provider.complete(Ok::<_, FetchError>(1));
    assert_eq!(provider.notifications(), 1);

    provider.start(true);
    assert_eq!(provider.notifications(), 2);
}

#[tokio::test]
async fn test_guard_feeds_provider() {
    let mut provider = Provider::<u64>::new();
    let fetched: AsyncValue<u64> = guard(async { Ok::<_, FetchError>(42_u64) }).await;
    provider.complete(fetched);
    assert_eq!(provider.current(), &AsyncValue::data(42));

    provider.start(false);
    let failed: AsyncValue<u64> = guard(async { Err::<u64, _>(FetchError("timeout")) }).await;
    provider.complete(failed);
    assert!(provider.current().has_error());
    assert!(provider.current().stack_trace().is_some());
    assert_eq!(provider.current().value_or_none(), Some(&42));
}
