//! Balanced invoker: pick, call, report.

use std::future::Future;

use crate::error::{CallError, Outcome};
use crate::invoke::{CallContext, Invoker};
use crate::load_balancer::picker::Picker;

/// Sends a request over a concrete connection handle.
pub trait Transport<H, Req>: Send + Sync {
    type Response: Send;

    fn call(
        &self,
        handle: &H,
        request: &Req,
        ctx: &CallContext,
    ) -> impl Future<Output = Result<Self::Response, CallError>> + Send;
}

/// Invoker that routes every attempt through the pinned connection of a target.
///
/// Each invocation picks afresh, so when wrapped in a retry layer a retried
/// attempt lands on whatever the balancer pinned after the previous failure.
///
/// The call races the context: cancellation or an expired deadline ends it
/// with a failure against the picked connection, so a hung server loses its pin.
#[derive(Debug, Clone)]
pub struct BalancedInvoker<T, H> {
    picker: Picker<H>,
    transport: T,
}

impl<T, H> BalancedInvoker<T, H> {
    pub fn new(picker: Picker<H>, transport: T) -> Self {
        Self { picker, transport }
    }
}

impl<T, H, Req> Invoker<Req> for BalancedInvoker<T, H>
where
    T: Transport<H, Req>,
    H: Clone + Send + Sync + 'static,
    Req: Sync,
{
    type Response = T::Response;
    type Error = CallError;

    async fn invoke(&self, request: &Req, ctx: &CallContext) -> Result<T::Response, CallError> {
        ctx.check()?;
        let (selection, done) = self.picker.pick()?.into_parts();

        let result = tokio::select! {
            result = self.transport.call(&selection.handle, request, ctx) => result,
            err = ctx.done() => Err(err),
        };
        if let Err(e) = &result {
            tracing::debug!(address = %selection.address, error = %e, "Call failed");
        }

        done.complete(Outcome::from_result(&result));
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::time::Instant;

    use crate::load_balancer::address::Address;
    use crate::load_balancer::balancer::PinnedBalancer;

    /// Handles carry a flag telling the fake transport to overload.
    struct FlagTransport;

    impl Transport<bool, ()> for FlagTransport {
        type Response = ();

        async fn call(&self, overloaded: &bool, _: &(), _: &CallContext) -> Result<(), CallError> {
            if *overloaded {
                Err(CallError::Overloaded("shedding".into()))
            } else {
                Ok(())
            }
        }
    }

    #[tokio::test]
    async fn test_overload_fails_over_on_next_invoke() {
        let lb = PinnedBalancer::with_seed("svc", 1);
        lb.mark_ready(Address::new("a"), true);
        lb.mark_ready(Address::new("b"), false);
        let invoker = BalancedInvoker::new(lb.picker(), FlagTransport);
        let ctx = CallContext::new();

        let first = invoker.invoke(&(), &ctx).await;
        assert!(matches!(first, Err(CallError::Overloaded(_))));
        assert_eq!(lb.pinned().unwrap().address.as_str(), "b");

        assert!(invoker.invoke(&(), &ctx).await.is_ok());
    }

    /// Never answers.
    struct HangingTransport;

    impl Transport<bool, ()> for HangingTransport {
        type Response = ();

        async fn call(&self, _: &bool, _: &(), _: &CallContext) -> Result<(), CallError> {
            std::future::pending().await
        }
    }

    fn two_ready() -> PinnedBalancer<bool> {
        let lb = PinnedBalancer::with_seed("svc", 1);
        lb.mark_ready(Address::new("a"), false);
        lb.mark_ready(Address::new("b"), false);
        lb
    }

    fn ticks(lb: &PinnedBalancer<bool>) -> Vec<(String, u64)> {
        let mut ticks: Vec<_> = lb
            .snapshot()
            .into_iter()
            .map(|r| (r.address.to_string(), r.last_failure_tick))
            .collect();
        ticks.sort();
        ticks
    }

    #[tokio::test(start_paused = true)]
    async fn test_timed_out_call_deprioritizes_hung_server() {
        let lb = two_ready();
        let invoker = BalancedInvoker::new(lb.picker(), HangingTransport);

        let timed_out =
            tokio::time::timeout(Duration::from_secs(1), invoker.invoke(&(), &CallContext::new())).await;
        assert!(timed_out.is_err());

        assert_eq!(lb.pinned().unwrap().address.as_str(), "b");
        assert_eq!(ticks(&lb), vec![("a".to_string(), 1), ("b".to_string(), 0)]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_ends_hanging_call() {
        let lb = two_ready();
        let invoker = BalancedInvoker::new(lb.picker(), HangingTransport);
        let ctx = CallContext::new().with_deadline(Instant::now() + Duration::from_millis(200));

        let result = invoker.invoke(&(), &ctx).await;
        assert_eq!(result, Err(CallError::DeadlineExceeded));
        assert_eq!(lb.pinned().unwrap().address.as_str(), "b");
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_ends_hanging_call() {
        let lb = two_ready();
        let invoker = BalancedInvoker::new(lb.picker(), HangingTransport);
        let ctx = CallContext::new();
        let cancel = ctx.cancel.clone();

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            cancel.cancel();
        });

        let result = invoker.invoke(&(), &ctx).await;
        assert_eq!(result, Err(CallError::Cancelled));
        assert_eq!(ticks(&lb), vec![("a".to_string(), 1), ("b".to_string(), 0)]);
    }

    #[tokio::test]
    async fn test_cancelled_before_start_skips_pick() {
        let lb = two_ready();
        let invoker = BalancedInvoker::new(lb.picker(), FlagTransport);
        let ctx = CallContext::new();
        ctx.cancel.cancel();

        assert_eq!(invoker.invoke(&(), &ctx).await, Err(CallError::Cancelled));
        assert_eq!(ticks(&lb), vec![("a".to_string(), 0), ("b".to_string(), 0)]);
    }

    #[tokio::test]
    async fn test_unavailable_surfaces_immediately() {
        let lb: PinnedBalancer<bool> = PinnedBalancer::with_seed("svc", 1);
        let invoker = BalancedInvoker::new(lb.picker(), FlagTransport);

        let result = invoker.invoke(&(), &CallContext::new()).await;
        assert!(matches!(result, Err(CallError::Unavailable(_))));
    }
}
