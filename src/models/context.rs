use uuid::Uuid;

/// Request-scoped identity, passed explicitly through the service layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    /// Authenticated user issuing the request
    pub user_id: i64,
    pub request_id: String,
}

impl RequestContext {
    pub fn new(user_id: i64) -> Self {
        Self {
            user_id,
            request_id: Uuid::new_v4().to_string(),
        }
    }

    pub fn owns(&self, owner_id: i64) -> bool {
        self.user_id == owner_id
    }
}
