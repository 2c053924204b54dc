//! Declarative macros for ergonomic effect construction
//!
//! These macros reduce boilerplate when creating `Effect` variants inside reducers.

/// Create an `Effect::Future` from an async block
///
/// # Example
///
/// ```rust,ignore
/// use classbook_core::async_effect;
///
/// async_effect! {
///     let receipt = gateway.settle(attempt).await;
///     Some(WorkflowAction::SettlementFinished { receipt })
/// }
/// ```
#[macro_export]
macro_rules! async_effect {
    ($($body:tt)*) => {
        $crate::effect::Effect::Future(
            ::std::boxed::Box::pin(async move { $($body)* })
        )
    };
}

/// Create an `Effect::Delay` for scheduling delayed actions
///
/// # Example
///
/// ```rust,ignore
/// use classbook_core::delay;
/// use std::time::Duration;
///
/// delay! {
///     duration: Duration::from_secs(5),
///     action: WorkflowAction::ResetAfterSuccess { cycle: 1 }
/// }
/// ```
#[macro_export]
macro_rules! delay {
    (
        duration: $duration:expr,
        action: $action:expr
    ) => {
        $crate::effect::Effect::Delay {
            duration: $duration,
            action: ::std::boxed::Box::new($action),
        }
    };
}

/// Create an `Effect::Cancellable` wrapping another effect
///
/// # Example
///
/// ```rust,ignore
/// use classbook_core::{cancellable, delay};
///
/// cancellable! {
///     id: RESET_TIMER,
///     effect: delay! { duration: dwell, action: WorkflowAction::ResetAfterSuccess { cycle } }
/// }
/// ```
#[macro_export]
macro_rules! cancellable {
    (
        id: $id:expr,
        effect: $effect:expr
    ) => {
        $crate::effect::Effect::Cancellable {
            id: $id,
            effect: ::std::boxed::Box::new($effect),
        }
    };
}
