use serde::Serialize;

/// The canonical response envelope.
///
/// Every response the gateway produces locally has this shape; `success`
/// responses carry `data` and a null `error`, failures carry a non-null
/// `error` and null `data`. `status` always matches the HTTP status code.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub message: Option<String>,
    pub data: Option<T>,
    pub error: Option<String>,
    pub status: u16,
}

impl<T> ApiResponse<T> {
    pub fn success(message: impl Into<String>, data: Option<T>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            data,
            error: None,
            status: 200,
        }
    }

    pub fn failure(status: u16, message: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
            data: None,
            error: Some(error.into()),
            status,
        }
    }
}
