// Connection Port (Interface)
// Opaque handle to a database link, owned by a single run

use crate::error::Result;
use async_trait::async_trait;

/// Database connection handle
///
/// Produced unopened by the configuration's connection factory, opened by
/// the runner under the connect retry strategy, and closed by the runner on
/// every exit path.
///
/// Implementations:
/// - SqliteHandle (infra-sqlite)
#[async_trait]
pub trait Connection: Send {
    /// Open the link
    ///
    /// May be called several times on the same handle when earlier attempts
    /// failed. Opening an already open handle is a no-op.
    async fn open(&mut self) -> Result<()>;

    /// Close the link
    ///
    /// Must tolerate handles that were never opened or failed to open.
    async fn close(&mut self) -> Result<()>;

    /// Whether the handle currently holds an open link
    fn is_open(&self) -> bool;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use crate::error::AppError;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    #[derive(Default)]
    struct ProbeState {
        created: usize,
        open_calls: usize,
        close_calls: usize,
        dropped: usize,
        scripted_open_errors: VecDeque<AppError>,
        fail_every_open: Option<String>,
        open_delay: Duration,
    }

    /// Shared view over every MockConnection produced by its factory
    ///
    /// Handles are moved into the runner, so tests observe them through the
    /// probe instead.
    #[derive(Clone, Default)]
    pub struct MockConnectionProbe {
        state: Arc<Mutex<ProbeState>>,
    }

    impl MockConnectionProbe {
        pub fn new() -> Self {
            Self::default()
        }

        /// Factory closure suitable for `Configuration::builder`
        pub fn factory(&self) -> impl Fn(&str) -> Option<MockConnection> + Send + Sync + 'static {
            let probe = self.clone();
            move |_connection_string: &str| Some(probe.create())
        }

        fn create(&self) -> MockConnection {
            self.state.lock().unwrap().created += 1;
            MockConnection {
                probe: self.clone(),
                open: false,
            }
        }

        /// The next opens fail with these errors, in order
        pub fn fail_next_opens(&self, errors: impl IntoIterator<Item = AppError>) {
            self.state
                .lock()
                .unwrap()
                .scripted_open_errors
                .extend(errors);
        }

        /// Every open fails with `AppError::Connection(message)`
        pub fn fail_every_open(&self, message: impl Into<String>) {
            self.state.lock().unwrap().fail_every_open = Some(message.into());
        }

        /// Every open sleeps this long before completing
        pub fn set_open_delay(&self, delay: Duration) {
            self.state.lock().unwrap().open_delay = delay;
        }

        pub fn handles_created(&self) -> usize {
            self.state.lock().unwrap().created
        }

        pub fn open_calls(&self) -> usize {
            self.state.lock().unwrap().open_calls
        }

        pub fn close_calls(&self) -> usize {
            self.state.lock().unwrap().close_calls
        }

        pub fn dropped(&self) -> usize {
            self.state.lock().unwrap().dropped
        }
    }

    /// Mock connection handle
    pub struct MockConnection {
        probe: MockConnectionProbe,
        open: bool,
    }

    #[async_trait]
    impl Connection for MockConnection {
        async fn open(&mut self) -> Result<()> {
            let (delay, outcome) = {
                let mut state = self.probe.state.lock().unwrap();
                state.open_calls += 1;
                let outcome = match state.scripted_open_errors.pop_front() {
                    Some(err) => Err(err),
                    None => match &state.fail_every_open {
                        Some(message) => Err(AppError::Connection(message.clone())),
                        None => Ok(()),
                    },
                };
                (state.open_delay, outcome)
            };

            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }

            outcome?;
            self.open = true;
            Ok(())
        }

        async fn close(&mut self) -> Result<()> {
            self.probe.state.lock().unwrap().close_calls += 1;
            self.open = false;
            Ok(())
        }

        fn is_open(&self) -> bool {
            self.open
        }
    }

    impl Drop for MockConnection {
        fn drop(&mut self) {
            if let Ok(mut state) = self.probe.state.lock() {
                state.dropped += 1;
            }
        }
    }
}
