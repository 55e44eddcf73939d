//! Continuous watches
//!
//! [`Client::eternal_watch`] turns repeated long polls into an infinite [`Stream`] of
//! changes. Exactly one watch request is outstanding at a time, and the next one is only
//! issued when the consumer asks for the next event. After every event the watch resumes
//! at `modified_index + 1`, so no change is delivered twice and none that happened between
//! two polls is lost (as long as the store still remembers it).

use std::ops::ControlFlow;

use futures::stream::{self, Stream};
use tracing::debug;

use crate::client::Client;
use crate::error::{Error, Result};
use crate::executor::Executor;
use crate::options::WatchOptions;
use crate::types::KeyResponse;

impl<E: Executor> Client<E> {
    /// Watch `key` forever, starting at `index` or at the next change.
    ///
    /// The stream never ends by itself. It yields the first error it meets (a timeout,
    /// a transport failure, a cleared index) and then terminates. Dropping the stream
    /// cancels the watch in flight.
    ///
    /// # Example
    /// ```rust,no_run
    /// # use etcd_keys_client::Client;
    /// use futures::StreamExt;
    ///
    /// # #[tokio::main]
    /// # async fn main() -> Result<(), etcd_keys_client::Error> {
    /// # let client = Client::new("http://127.0.0.1:2379")?;
    /// let changes = client.eternal_watch("/config", None);
    /// futures::pin_mut!(changes);
    /// while let Some(change) = changes.next().await {
    ///     let change = change?;
    ///     println!("{:?} {:?}", change.action, change.value());
    /// }
    /// # Ok(())
    /// # }
    /// ```
    pub fn eternal_watch<'a>(
        &'a self,
        key: &'a str,
        index: Option<u64>,
    ) -> impl Stream<Item = Result<KeyResponse>> + Send + 'a {
        stream::try_unfold(index, move |index| async move {
            let response = self.watch_from(key, index).await?;
            let next = resume_index(&response);
            Ok::<_, Error>(Some((response, Some(next))))
        })
    }

    /// Watch `key` forever, handing every change to `handler` in arrival order.
    ///
    /// The handler stops the loop by returning [`ControlFlow::Break`]; its value is
    /// returned. No watch is issued after a break. Watch errors end the loop and are
    /// returned unchanged.
    pub async fn eternal_watch_with<B, F>(
        &self,
        key: &str,
        index: Option<u64>,
        mut handler: F,
    ) -> Result<B>
    where
        F: FnMut(KeyResponse) -> ControlFlow<B>,
    {
        let mut index = index;
        loop {
            let change = self.watch_from(key, index).await?;
            index = Some(resume_index(&change));
            if let ControlFlow::Break(value) = handler(change) {
                return Ok(value);
            }
        }
    }

    async fn watch_from(&self, key: &str, index: Option<u64>) -> Result<KeyResponse> {
        debug!("watching {} from index {:?}", key, index);
        self.watch(
            key,
            WatchOptions {
                index,
                ..Default::default()
            },
        )
        .await
    }
}

/// Index the next watch resumes at, one past the change just delivered
fn resume_index(change: &KeyResponse) -> u64 {
    change.node.modified_index.saturating_add(1)
}
