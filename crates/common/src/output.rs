//! Asynchronous resource outputs
//!
//! An [`Output`] is a value that only becomes known once the resource graph
//! engine has created the resource it belongs to. Outputs are cheap to clone
//! and every clone observes the same resolution.

use futures::channel::oneshot;
use futures::future::{self, BoxFuture, FutureExt, Shared, TryFutureExt};
use std::fmt;
use std::future::Future;
use thiserror::Error;

/// Error carried by an output that failed to resolve
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct OutputError {
    message: String,
}

impl OutputError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

type OutputFuture<T> = Shared<BoxFuture<'static, Result<T, OutputError>>>;

/// A value that becomes available once its owning resource is materialized
pub struct Output<T> {
    inner: OutputFuture<T>,
}

/// Completes a pending [`Output`]
pub struct Resolver<T> {
    sender: oneshot::Sender<Result<T, OutputError>>,
}

impl<T> Clone for Output<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T> fmt::Debug for Output<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Output(..)")
    }
}

impl<T> Output<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn from_future<F>(future: F) -> Self
    where
        F: Future<Output = Result<T, OutputError>> + Send + 'static,
    {
        Self {
            inner: future.boxed().shared(),
        }
    }

    /// An output whose value is already known
    pub fn known(value: T) -> Self {
        Self::from_future(future::ready(Ok(value)))
    }

    /// An output that will never resolve successfully
    pub fn failed(message: impl Into<String>) -> Self {
        Self::from_future(future::ready(Err(OutputError::new(message))))
    }

    /// Create an unresolved output together with the handle that completes it
    ///
    /// Dropping the resolver without using it fails the output.
    pub fn pending() -> (Resolver<T>, Self) {
        let (sender, receiver) = oneshot::channel();
        let output = Self::from_future(receiver.map(|received| match received {
            Ok(result) => result,
            Err(oneshot::Canceled) => Err(OutputError::new(
                "resource was dropped before its outputs were resolved",
            )),
        }));
        (Resolver { sender }, output)
    }

    /// Project the eventual value through a pure function
    pub fn apply<U, F>(&self, f: F) -> Output<U>
    where
        U: Clone + Send + Sync + 'static,
        F: FnOnce(T) -> U + Send + 'static,
    {
        Output::from_future(self.inner.clone().map_ok(f))
    }

    /// Project the eventual value through a function that may fail
    pub fn try_apply<U, F>(&self, f: F) -> Output<U>
    where
        U: Clone + Send + Sync + 'static,
        F: FnOnce(T) -> Result<U, OutputError> + Send + 'static,
    {
        Output::from_future(self.inner.clone().map(|result| result.and_then(f)))
    }

    /// Wait for both outputs
    pub fn zip<U>(&self, other: &Output<U>) -> Output<(T, U)>
    where
        U: Clone + Send + Sync + 'static,
    {
        Output::from_future(future::try_join(self.inner.clone(), other.inner.clone()))
    }

    /// Join an ordered collection of outputs
    ///
    /// The result keeps the order of the input, regardless of the order in
    /// which the individual outputs resolve. The first failure fails the join.
    pub fn all<I>(outputs: I) -> Output<Vec<T>>
    where
        I: IntoIterator<Item = Output<T>>,
    {
        let futures: Vec<_> = outputs.into_iter().map(|output| output.inner).collect();
        Output::from_future(future::try_join_all(futures))
    }

    /// Lift an optional output into an output of an option
    pub fn optional(output: Option<&Output<T>>) -> Output<Option<T>> {
        match output {
            Some(output) => output.apply(Some),
            None => Output::known(None),
        }
    }

    /// Wait for the value
    pub async fn resolve(&self) -> Result<T, OutputError> {
        self.inner.clone().await
    }

    /// The value, if it can be produced without waiting
    pub fn now(&self) -> Option<Result<T, OutputError>> {
        self.inner.clone().now_or_never()
    }
}

impl<T> Resolver<T> {
    pub fn resolve(self, value: T) {
        // The output may have been dropped already; nobody is waiting then.
        let _ = self.sender.send(Ok(value));
    }

    pub fn reject(self, error: OutputError) {
        let _ = self.sender.send(Err(error));
    }
}

/// Project every value of an ordered mapping through an output-producing
/// function and recombine the results into one output of the same mapping
pub fn output_from_map<K, V, U, I, F>(entries: I, mut f: F) -> Output<Vec<(K, U)>>
where
    K: Clone + Send + Sync + 'static,
    U: Clone + Send + Sync + 'static,
    I: IntoIterator<Item = (K, V)>,
    F: FnMut(V) -> Output<U>,
{
    let (keys, outputs): (Vec<K>, Vec<Output<U>>) =
        entries.into_iter().map(|(key, value)| (key, f(value))).unzip();

    Output::all(outputs).apply(move |values| keys.into_iter().zip(values).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::executor::block_on;

    #[test]
    fn test_known_output_resolves_immediately() {
        let output = Output::known(42);
        assert_eq!(output.now(), Some(Ok(42)));
    }

    #[test]
    fn test_apply_waits_for_resolution() {
        let (resolver, output) = Output::<String>::pending();
        let upper = output.apply(|s| s.to_uppercase());

        assert!(upper.now().is_none());
        resolver.resolve("arn".to_string());
        assert_eq!(upper.now(), Some(Ok("ARN".to_string())));
    }

    #[test]
    fn test_all_keeps_declaration_order() {
        let (first_resolver, first) = Output::<u32>::pending();
        let (second_resolver, second) = Output::<u32>::pending();
        let joined = Output::all(vec![first, second]);

        second_resolver.resolve(2);
        assert!(joined.now().is_none());
        first_resolver.resolve(1);

        assert_eq!(block_on(joined.resolve()), Ok(vec![1, 2]));
    }

    #[test]
    fn test_failure_propagates_through_join() {
        let (resolver, pending) = Output::<u32>::pending();
        let joined = Output::all(vec![Output::known(1), pending]);

        resolver.reject(OutputError::new("create failed"));
        let err = block_on(joined.resolve()).unwrap_err();
        assert_eq!(err.message(), "create failed");
    }

    #[test]
    fn test_dropped_resolver_fails_output() {
        let (resolver, output) = Output::<u32>::pending();
        drop(resolver);
        assert!(block_on(output.resolve()).is_err());
    }

    #[test]
    fn test_try_apply_error() {
        let output = Output::known(-1i64).try_apply(|n| {
            u32::try_from(n).map_err(|_| OutputError::new("negative"))
        });
        assert_eq!(output.now(), Some(Err(OutputError::new("negative"))));
    }

    #[test]
    fn test_optional() {
        assert_eq!(Output::<u8>::optional(None).now(), Some(Ok(None)));
        let some = Output::known(3u8);
        assert_eq!(Output::optional(Some(&some)).now(), Some(Ok(Some(3))));
    }

    #[test]
    fn test_output_from_map() {
        let (resolver, pending) = Output::<String>::pending();
        let entries = vec![("a".to_string(), Output::known("x".to_string())), ("b".to_string(), pending)];

        let mapped = output_from_map(entries, |value| value.apply(|v| format!("{}!", v)));
        resolver.resolve("y".to_string());

        assert_eq!(
            block_on(mapped.resolve()).unwrap(),
            vec![
                ("a".to_string(), "x!".to_string()),
                ("b".to_string(), "y!".to_string())
            ]
        );
    }
}
