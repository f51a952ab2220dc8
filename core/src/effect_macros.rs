//! Declarative macro for effect construction
//!
//! Wraps an async block handed to the runtime as an `Effect::Future`.

/// Create an `Effect::Future` from an async block
///
/// # Example
///
/// ```rust,ignore
/// use seatflow_core::async_effect;
///
/// async_effect! {
///     let response = gateway.pay(price).await.ok()?;
///     Some(PaymentAction::BankAnswered { response })
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
