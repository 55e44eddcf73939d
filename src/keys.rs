//! Key operations
//!
//! Reads, writes, deletes and conditional mutations of keys and directories. Each call
//! issues exactly one request; nothing is retried and only [`Client::exists`] interprets
//! an error.

use serde_json::Value;

use crate::client::Client;
use crate::error::{Error, Result};
use crate::executor::Executor;
use crate::options::{
    CreateOptions, DeleteOptions, GetOptions, SetValue, TtlOption, WatchOptions,
};
use crate::request;
use crate::types::KeyResponse;

impl<E: Executor> Client<E> {
    /// Read a key or directory
    ///
    /// # Example
    /// ```rust,no_run
    /// # use etcd_keys_client::{Client, GetOptions};
    /// # #[tokio::main]
    /// # async fn main() -> Result<(), etcd_keys_client::Error> {
    /// # let client = Client::new("http://127.0.0.1:2379")?;
    /// let response = client.get("/config/theme", GetOptions::default()).await?;
    /// println!("theme = {:?}", response.value());
    /// # Ok(())
    /// # }
    /// ```
    pub async fn get(&self, key: &str, opts: GetOptions) -> Result<KeyResponse> {
        self.dispatch(request::get(self.paths(), key, opts)).await
    }

    /// Write a key, or create a directory when `value` is [`SetValue::Directory`].
    ///
    /// `opts` may be `()`, a [`SetOptions`](crate::SetOptions) or a [`TtlOption`]. Whatever
    /// preconditions it carries are sent; none are added.
    ///
    /// # Example
    /// ```rust,no_run
    /// # use etcd_keys_client::{Client, SetOptions, SetValue};
    /// # #[tokio::main]
    /// # async fn main() -> Result<(), etcd_keys_client::Error> {
    /// # let client = Client::new("http://127.0.0.1:2379")?;
    /// client.set("/config/theme", "dark", ()).await?;
    /// client.set("/session/abc", "user-1", SetOptions::with_ttl(3600)).await?;
    /// client.set("/jobs", SetValue::directory(None), ()).await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn set(
        &self,
        key: &str,
        value: impl Into<SetValue>,
        opts: impl Into<TtlOption>,
    ) -> Result<KeyResponse> {
        self.dispatch(request::set(self.paths(), key, value.into(), opts.into()))
            .await
    }

    /// [`set`](Self::set) for loosely shaped arguments.
    ///
    /// `value` is a scalar or a mapping (directory creation); `opts` is a mapping, null or a
    /// non-negative integer ttl. Anything else fails with [`Error::InvalidArgument`] before a
    /// request is issued.
    pub async fn set_json(&self, key: &str, value: Value, opts: Value) -> Result<KeyResponse> {
        let opts = TtlOption::try_from(opts)?;
        let value = SetValue::try_from(value)?;
        self.set(key, value, opts).await
    }

    /// Delete a key or directory
    pub async fn delete(&self, key: &str, opts: DeleteOptions) -> Result<KeyResponse> {
        self.dispatch(request::delete(self.paths(), key, opts)).await
    }

    /// Replace the value only if it currently equals `prev_value`
    #[doc(alias = "test_and_set")]
    pub async fn compare_and_swap(
        &self,
        key: &str,
        value: &str,
        prev_value: &str,
        ttl: Option<u64>,
    ) -> Result<KeyResponse> {
        self.dispatch(request::compare_and_swap(
            self.paths(),
            key,
            value,
            prev_value,
            ttl,
        ))
        .await
    }

    /// Create a key that must not exist yet. Fails with [`Error::NodeExist`] otherwise.
    pub async fn create(&self, key: &str, opts: CreateOptions) -> Result<KeyResponse> {
        self.dispatch(request::create(self.paths(), key, opts)).await
    }

    /// [`create`](Self::create) for loosely shaped options; `opts` must be a mapping.
    pub async fn create_json(&self, key: &str, opts: Value) -> Result<KeyResponse> {
        let opts = CreateOptions::try_from(opts)?;
        self.create(key, opts).await
    }

    /// Overwrite a key that must already exist.
    ///
    /// The store reports a missing key as [`Error::KeyNotFound`].
    pub async fn update(&self, key: &str, value: &str, ttl: Option<u64>) -> Result<KeyResponse> {
        self.dispatch(request::update(self.paths(), key, value, ttl))
            .await
    }

    /// Add `value` under a new, monotonically named key inside `dir`
    pub async fn create_in_order(
        &self,
        dir: &str,
        value: &str,
        ttl: Option<u64>,
    ) -> Result<KeyResponse> {
        self.dispatch(request::create_in_order(self.paths(), dir, value, ttl))
            .await
    }

    /// Check whether a key exists.
    ///
    /// Only a "key not found" answer reads as `false`; every other error is returned.
    #[doc(alias = "exist")]
    #[doc(alias = "has_key")]
    #[doc(alias = "key")]
    pub async fn exists(&self, key: &str) -> Result<bool> {
        match self.get(key, GetOptions::default()).await {
            Ok(_) => Ok(true),
            Err(Error::KeyNotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Wait for the next change of `key`, or for the change at `opts.index` if the store
    /// still remembers it.
    ///
    /// Blocks until a change arrives or the timeout (`opts.timeout`, else the client's read
    /// timeout) elapses. Timeouts are returned as [`Error::Timeout`], not retried.
    pub async fn watch(&self, key: &str, opts: WatchOptions) -> Result<KeyResponse> {
        self.dispatch(request::watch(self.paths(), key, opts, self.read_timeout()))
            .await
    }
}
