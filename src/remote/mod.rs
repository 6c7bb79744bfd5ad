pub mod envelope;
pub mod http;

use crate::error::CallError;
use serde_json::Value;
use std::time::Duration;

pub use http::HttpApi;

pub trait RemoteApi {
    fn call(&self, url: &str, payload: &Value, timeout: Duration) -> Result<Value, CallError>;
}

impl<T: RemoteApi + ?Sized> RemoteApi for &T {
    fn call(&self, url: &str, payload: &Value, timeout: Duration) -> Result<Value, CallError> {
        (**self).call(url, payload, timeout)
    }
}
