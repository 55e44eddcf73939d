//! Request shaping for key operations
//!
//! Each function turns caller arguments into a [`KeyRequest`]: method, path and the exact
//! set of wire fields. Preconditions are attached here and nowhere else:
//!
//! * `set` forwards whichever of `prevExist`/`prevValue`/`prevIndex` the caller supplied
//! * `create` always sends `prevExist=false`
//! * `update` always sends `prevExist=true`
//! * `compare_and_swap` always sends `prevValue`
//!
//! Every other operation never carries a precondition it was not given.

use std::time::Duration;

use hyper::Method;

use crate::options::{
    CreateOptions, DeleteOptions, GetOptions, SetOptions, SetValue, TtlOption, WatchOptions,
};
use crate::path::PathBuilder;

/// Ordered wire fields of a request
pub type Params = Vec<(&'static str, String)>;

/// A fully shaped request, ready for an [`Executor`](crate::Executor)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyRequest {
    /// HTTP method
    pub method: Method,
    /// Path below the endpoint, e.g. `/v2/keys/foo`
    pub path: String,
    /// Wire fields; query string for GET/DELETE, form body for PUT/POST
    pub params: Params,
    /// Per-request timeout override
    pub timeout: Option<Duration>,
}

impl KeyRequest {
    fn new(method: Method, path: String, params: Params) -> Self {
        Self {
            method,
            path,
            params,
            timeout: None,
        }
    }

    /// GET without fields, for endpoints outside the keys namespace
    pub(crate) fn plain_get(path: String) -> Self {
        Self::new(Method::GET, path, Params::new())
    }

    /// Value of a wire field, if present
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| *k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Names of the wire fields, in order
    pub fn param_names(&self) -> Vec<&'static str> {
        self.params.iter().map(|(k, _)| *k).collect()
    }
}

fn push<T: ToString>(params: &mut Params, name: &'static str, value: Option<T>) {
    if let Some(value) = value {
        params.push((name, value.to_string()));
    }
}

fn push_set_fields(params: &mut Params, fields: SetOptions) {
    push(params, "ttl", fields.ttl);
    push(params, "dir", fields.dir);
    push(params, "prevExist", fields.prev_exist);
    push(params, "prevValue", fields.prev_value);
    push(params, "prevIndex", fields.prev_index);
}

/// GET `key`
pub fn get(paths: &PathBuilder, key: &str, opts: GetOptions) -> KeyRequest {
    let mut params = Params::new();
    push(&mut params, "recursive", opts.recursive);
    push(&mut params, "sorted", opts.sorted);
    push(&mut params, "quorum", opts.quorum);
    KeyRequest::new(Method::GET, paths.key(key), params)
}

/// PUT `key`. A [`SetValue::Directory`] value supplies the fields itself and `opts` is not used.
pub fn set(paths: &PathBuilder, key: &str, value: SetValue, opts: TtlOption) -> KeyRequest {
    let mut params = Params::new();
    match value {
        SetValue::Directory(fields) => push_set_fields(&mut params, fields),
        SetValue::Scalar(value) => {
            params.push(("value", value));
            push_set_fields(&mut params, opts.into_fields());
        }
    }
    KeyRequest::new(Method::PUT, paths.key(key), params)
}

/// DELETE `key`
pub fn delete(paths: &PathBuilder, key: &str, opts: DeleteOptions) -> KeyRequest {
    let mut params = Params::new();
    push(&mut params, "recursive", opts.recursive);
    push(&mut params, "dir", opts.dir);
    push(&mut params, "prevValue", opts.prev_value);
    push(&mut params, "prevIndex", opts.prev_index);
    KeyRequest::new(Method::DELETE, paths.key(key), params)
}

/// PUT `key` guarded by `prevValue`
pub fn compare_and_swap(
    paths: &PathBuilder,
    key: &str,
    value: &str,
    prev_value: &str,
    ttl: Option<u64>,
) -> KeyRequest {
    let mut params = vec![
        ("value", value.to_string()),
        ("prevValue", prev_value.to_string()),
    ];
    push(&mut params, "ttl", ttl);
    KeyRequest::new(Method::PUT, paths.key(key), params)
}

/// PUT `key` with `prevExist=false`
pub fn create(paths: &PathBuilder, key: &str, opts: CreateOptions) -> KeyRequest {
    let mut params = vec![("prevExist", false.to_string())];
    push(&mut params, "value", opts.value);
    push(&mut params, "ttl", opts.ttl);
    push(&mut params, "dir", opts.dir);
    KeyRequest::new(Method::PUT, paths.key(key), params)
}

/// PUT `key` with `prevExist=true`
pub fn update(paths: &PathBuilder, key: &str, value: &str, ttl: Option<u64>) -> KeyRequest {
    let mut params = vec![
        ("value", value.to_string()),
        ("prevExist", true.to_string()),
    ];
    push(&mut params, "ttl", ttl);
    KeyRequest::new(Method::PUT, paths.key(key), params)
}

/// POST into `dir`; the store picks the key
pub fn create_in_order(paths: &PathBuilder, dir: &str, value: &str, ttl: Option<u64>) -> KeyRequest {
    let mut params = vec![("value", value.to_string())];
    push(&mut params, "ttl", ttl);
    KeyRequest::new(Method::POST, paths.key(dir), params)
}

/// Long-poll GET on `key`. `default_timeout` applies when `opts.timeout` is unset.
pub fn watch(
    paths: &PathBuilder,
    key: &str,
    opts: WatchOptions,
    default_timeout: Duration,
) -> KeyRequest {
    let mut params = vec![("wait", true.to_string())];
    push(&mut params, "waitIndex", opts.index);
    push(&mut params, "recursive", opts.recursive);
    push(&mut params, "consistent", opts.consistent);
    let mut request = KeyRequest::new(Method::GET, paths.key(key), params);
    request.timeout = Some(opts.timeout.unwrap_or(default_timeout));
    request
}
