//! Recording executor for unit tests

use std::collections::VecDeque;
use std::future::Future;
use std::sync::{Arc, Mutex};

use hyper::StatusCode;

use crate::error::{Error, Result};
use crate::executor::{Executor, RawResponse};
use crate::request::KeyRequest;

#[derive(Default)]
struct State {
    requests: Vec<KeyRequest>,
    responses: VecDeque<Result<RawResponse>>,
}

/// Captures every request and answers with scripted responses, in order
#[derive(Clone, Default)]
pub(crate) struct MockExecutor {
    state: Arc<Mutex<State>>,
}

impl MockExecutor {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&self, response: Result<RawResponse>) {
        self.state.lock().unwrap().responses.push_back(response);
    }

    pub(crate) fn push_ok(&self, status: StatusCode, body: &'static str) {
        self.push(Ok(RawResponse::new(status, body)));
    }

    /// A successful key response whose node sits at `index`
    pub(crate) fn push_event(&self, action: &str, key: &str, value: &str, index: u64) {
        let body = format!(
            r#"{{"action":"{}","node":{{"key":"{}","value":"{}","modifiedIndex":{},"createdIndex":{}}}}}"#,
            action, key, value, index, index
        );
        self.push(Ok(RawResponse::new(StatusCode::OK, body)));
    }

    pub(crate) fn push_store_error(&self, status: StatusCode, code: u64, message: &'static str) {
        let body = format!(
            r#"{{"errorCode":{},"message":"{}","cause":"/","index":1}}"#,
            code, message
        );
        self.push(Ok(RawResponse::new(status, body)));
    }

    pub(crate) fn requests(&self) -> Vec<KeyRequest> {
        self.state.lock().unwrap().requests.clone()
    }

    pub(crate) fn request_count(&self) -> usize {
        self.state.lock().unwrap().requests.len()
    }
}

impl Executor for MockExecutor {
    fn execute(&self, request: KeyRequest) -> impl Future<Output = Result<RawResponse>> + Send {
        let response = {
            let mut state = self.state.lock().unwrap();
            state.requests.push(request);
            state
                .responses
                .pop_front()
                .unwrap_or_else(|| Err(Error::Connection("no scripted response".to_string())))
        };
        async move { response }
    }
}
