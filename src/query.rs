//! Poll-based async cells for the UI.
//!
//! Network work runs in spawned tasks and reports back through oneshot
//! channels; views call `poll()` from their tick handler and re-render when
//! the state changes. `Query<T>` owns a refetchable loader; `Action<T>` runs
//! one-shot mutations and hands the result over exactly once.

use std::future::Future;
use std::pin::Pin;
use tokio::sync::oneshot;

/// The state of a query.
#[derive(Debug, Clone)]
pub enum QueryState<T> {
  /// Not started
  Idle,
  /// A fetch task is in flight
  Loading,
  /// Last fetch succeeded
  Success(T),
  /// Last fetch failed
  Error(String),
}

impl<T> QueryState<T> {
  pub fn is_loading(&self) -> bool {
    matches!(self, QueryState::Loading)
  }

  pub fn data(&self) -> Option<&T> {
    match self {
      QueryState::Success(data) => Some(data),
      _ => None,
    }
  }

  pub fn error(&self) -> Option<&str> {
    match self {
      QueryState::Error(e) => Some(e),
      _ => None,
    }
  }
}

type BoxFuture<T> = Pin<Box<dyn Future<Output = Result<T, String>> + Send>>;
type LoaderFn<T> = Box<dyn Fn() -> BoxFuture<T> + Send>;

/// Refetchable async load with loading/success/error state.
pub struct Query<T> {
  state: QueryState<T>,
  loader: LoaderFn<T>,
  receiver: Option<oneshot::Receiver<Result<T, String>>>,
}

impl<T: Send + 'static> Query<T> {
  /// Create an idle query around a loader closure. Nothing runs until
  /// `fetch()` is called.
  pub fn new<F, Fut>(loader: F) -> Self
  where
    F: Fn() -> Fut + Send + 'static,
    Fut: Future<Output = Result<T, String>> + Send + 'static,
  {
    Self {
      state: QueryState::Idle,
      loader: Box::new(move || Box::pin(loader())),
      receiver: None,
    }
  }

  pub fn state(&self) -> &QueryState<T> {
    &self.state
  }

  pub fn data(&self) -> Option<&T> {
    self.state.data()
  }

  pub fn is_loading(&self) -> bool {
    self.state.is_loading()
  }

  pub fn error(&self) -> Option<&str> {
    self.state.error()
  }

  /// Start loading unless a fetch is already in flight.
  pub fn fetch(&mut self) {
    if self.state.is_loading() {
      return;
    }
    self.spawn();
  }

  /// Start a fresh load, discarding any in-flight result.
  pub fn refetch(&mut self) {
    self.receiver = None;
    self.spawn();
  }

  /// Poll the in-flight task. Returns `true` when the state changed.
  pub fn poll(&mut self) -> bool {
    let Some(receiver) = &mut self.receiver else {
      return false;
    };

    match receiver.try_recv() {
      Ok(Ok(data)) => {
        self.state = QueryState::Success(data);
        self.receiver = None;
        true
      }
      Ok(Err(error)) => {
        self.state = QueryState::Error(error);
        self.receiver = None;
        true
      }
      Err(oneshot::error::TryRecvError::Empty) => false,
      Err(oneshot::error::TryRecvError::Closed) => {
        self.state = QueryState::Error("Fetch task dropped".to_string());
        self.receiver = None;
        true
      }
    }
  }

  fn spawn(&mut self) {
    let (tx, rx) = oneshot::channel();
    self.receiver = Some(rx);
    self.state = QueryState::Loading;

    let future = (self.loader)();
    tokio::spawn(async move {
      let _ = tx.send(future.await);
    });
  }
}

/// A one-shot mutation runner. Unlike `Query`, the result is handed to the
/// caller exactly once and no state is retained afterwards.
pub struct Action<T> {
  receiver: Option<oneshot::Receiver<Result<T, String>>>,
}

impl<T: Send + 'static> Action<T> {
  pub fn idle() -> Self {
    Self { receiver: None }
  }

  pub fn is_running(&self) -> bool {
    self.receiver.is_some()
  }

  /// Spawn the mutation. A previous in-flight result, if any, is discarded.
  pub fn start<Fut>(&mut self, future: Fut)
  where
    Fut: Future<Output = Result<T, String>> + Send + 'static,
  {
    let (tx, rx) = oneshot::channel();
    self.receiver = Some(rx);

    tokio::spawn(async move {
      let _ = tx.send(future.await);
    });
  }

  /// Poll for completion. Returns the result once, then goes back to idle.
  pub fn poll(&mut self) -> Option<Result<T, String>> {
    let receiver = self.receiver.as_mut()?;

    match receiver.try_recv() {
      Ok(result) => {
        self.receiver = None;
        Some(result)
      }
      Err(oneshot::error::TryRecvError::Empty) => None,
      Err(oneshot::error::TryRecvError::Closed) => {
        self.receiver = None;
        Some(Err("Mutation task dropped".to_string()))
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::time::Duration;

  #[tokio::test]
  async fn test_query_success() {
    let mut query = Query::new(|| async { Ok::<_, String>(vec![1, 2, 3]) });
    assert!(matches!(query.state(), QueryState::Idle));

    query.fetch();
    assert!(query.is_loading());

    tokio::time::sleep(Duration::from_millis(10)).await;
    assert!(query.poll());
    assert_eq!(query.data(), Some(&vec![1, 2, 3]));
  }

  #[tokio::test]
  async fn test_query_error() {
    let mut query: Query<i32> = Query::new(|| async { Err("backend unavailable".to_string()) });
    query.fetch();

    tokio::time::sleep(Duration::from_millis(10)).await;
    assert!(query.poll());
    assert_eq!(query.error(), Some("backend unavailable"));
  }

  #[tokio::test]
  async fn test_fetch_while_loading_is_noop() {
    let mut query = Query::new(|| async {
      tokio::time::sleep(Duration::from_millis(100)).await;
      Ok::<_, String>(1)
    });

    query.fetch();
    query.fetch();
    assert!(query.is_loading());
  }

  #[tokio::test]
  async fn test_refetch_discards_pending_result() {
    let counter = std::sync::Arc::new(std::sync::atomic::AtomicU32::new(0));
    let counter_clone = counter.clone();

    let mut query = Query::new(move || {
      let counter = counter_clone.clone();
      async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        Ok::<_, String>(counter.fetch_add(1, std::sync::atomic::Ordering::SeqCst))
      }
    });

    query.fetch();
    tokio::time::sleep(Duration::from_millis(10)).await;
    query.refetch();
    tokio::time::sleep(Duration::from_millis(100)).await;

    query.poll();
    // Only the second task's result is delivered.
    assert_eq!(query.data(), Some(&1));
  }

  #[tokio::test]
  async fn test_action_delivers_result_once() {
    let mut action: Action<i32> = Action::idle();
    assert!(!action.is_running());

    action.start(async { Ok(7) });
    assert!(action.is_running());

    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(action.poll(), Some(Ok(7)));
    assert_eq!(action.poll(), None);
    assert!(!action.is_running());
  }

  #[tokio::test]
  async fn test_action_surfaces_errors() {
    let mut action: Action<i32> = Action::idle();
    action.start(async { Err("denied".to_string()) });

    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(action.poll(), Some(Err("denied".to_string())));
  }
}
