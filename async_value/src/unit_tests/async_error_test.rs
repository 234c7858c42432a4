use crate::unit_tests::TestFailure;
use crate::{CapturedError, ComputationError, SharedError, StackTrace};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

fn hash_of<H: Hash>(value: &H) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

#[test]
fn test_shared_error_identity() {
    let error = SharedError::new(TestFailure("offline"));
    let clone = error.clone();
    assert_eq!(error, clone);
    assert_eq!(hash_of(&error), hash_of(&clone));

    // Same content, different allocation.
    let other = SharedError::new(TestFailure("offline"));
    assert_ne!(error, other);
    assert!(!error.ptr_eq(&other));
}

#[test]
fn test_shared_error_downcast() {
    let error: SharedError = TestFailure("offline").into();
    assert!(error.is::<TestFailure>());
    assert_eq!(error.downcast_ref::<TestFailure>(), Some(&TestFailure("offline")));
    assert!(error.downcast_ref::<ComputationError>().is_none());
    assert_eq!(error.to_string(), "test failure: offline");
    assert_eq!(error.as_error().to_string(), "test failure: offline");
}

#[test]
fn test_shared_error_msg_and_boxed() {
    let error = SharedError::msg("connection reset");
    assert_eq!(error.to_string(), "connection reset");
    assert_eq!(
        error.downcast_ref::<ComputationError>(),
        Some(&ComputationError::Message("connection reset".to_string()))
    );

    let boxed: Box<dyn std::error::Error + Send + Sync> = Box::new(TestFailure("boxed"));
    let error = SharedError::from_boxed(boxed);
    assert_eq!(error.downcast_ref::<TestFailure>(), Some(&TestFailure("boxed")));
}

#[test]
fn test_stack_trace_identity() {
    let trace = StackTrace::disabled();
    assert!(!trace.is_captured());
    assert_eq!(trace, trace.clone());
    assert_ne!(trace, StackTrace::disabled());
    assert_eq!(hash_of(&trace), hash_of(&trace.clone()));
}

#[test]
fn test_stack_trace_force_capture() {
    let trace = StackTrace::force_capture();
    // Unsupported platforms report an empty trace instead.
    if trace.is_captured() {
        assert!(!trace.to_string().is_empty());
    }
}

#[test]
fn test_captured_error_parts() {
    let error = SharedError::new(TestFailure("offline"));
    let trace = StackTrace::disabled();
    let captured = CapturedError::new(error.clone(), trace.clone());

    assert_eq!(captured.error(), &error);
    assert_eq!(captured.stack_trace(), &trace);
    assert_eq!(captured.to_string(), "test failure: offline");
    assert_eq!(captured, captured.clone());

    let (error_part, trace_part) = captured.into_parts();
    assert!(error_part.ptr_eq(&error));
    assert!(trace_part.ptr_eq(&trace));
}

#[test]
fn test_captured_error_capture() {
    let captured = CapturedError::capture(TestFailure("now"));
    assert_eq!(captured.error().downcast_ref::<TestFailure>(), Some(&TestFailure("now")));
}

#[test]
fn test_computation_error_methods() {
    let message = ComputationError::Message("message".to_string());
    assert!(message.is_message());
    assert!(!message.is_panicked());
    assert!(!message.is_cancelled());
    assert!(!message.is_timeout());

    let panicked = ComputationError::Panicked("boom".to_string());
    assert!(!panicked.is_message());
    assert!(panicked.is_panicked());
    assert_eq!(panicked.to_string(), "computation panicked: boom");

    let cancelled = ComputationError::Cancelled;
    assert!(cancelled.is_cancelled());
    assert!(!cancelled.is_timeout());
    assert_eq!(cancelled.to_string(), "Task was cancelled!");

    let timeout = ComputationError::Timeout;
    assert!(timeout.is_timeout());
    assert!(!timeout.is_cancelled());
    assert_eq!(timeout.to_string(), "deadline has elapsed!");
}

#[test]
fn test_computation_error_from_panic_payload() {
    let error = ComputationError::from_panic(Box::new("static message"));
    assert_eq!(error, ComputationError::Panicked("static message".to_string()));

    let error = ComputationError::from_panic(Box::new("owned message".to_string()));
    assert_eq!(error, ComputationError::Panicked("owned message".to_string()));

    let error = ComputationError::from_panic(Box::new(7_u8));
    assert_eq!(error, ComputationError::Panicked("Box<dyn Any>".to_string()));
}
