/// Request details a [`ContextProvider`] may expose for the current event.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestInfo {
    pub url: Option<String>,
    pub http_method: Option<String>,
    pub server: Option<String>,
    pub referrer: Option<String>,
    pub user_agent: Option<String>,
}

impl RequestInfo {
    pub fn is_empty(&self) -> bool {
        self.url.is_none()
            && self.http_method.is_none()
            && self.server.is_none()
            && self.referrer.is_none()
            && self.user_agent.is_none()
    }
}

/// Read-only view of the execution context an event was emitted in.
///
/// Every accessor is optional; processors apply their own defaults when a
/// value is unavailable. Hosts implement this for whatever holds their
/// current site, user and request.
pub trait ContextProvider: Send + Sync {
    fn site_id(&self) -> Option<u64> {
        None
    }

    fn site_name(&self) -> Option<String> {
        None
    }

    /// Acting user. `Some(0)` and `None` both mean "not authenticated".
    fn user_id(&self) -> Option<u64> {
        None
    }

    fn user_name(&self) -> Option<String> {
        None
    }

    /// Client network address, if one can be resolved.
    fn remote_addr(&self) -> Option<String> {
        None
    }

    fn request(&self) -> Option<RequestInfo> {
        None
    }
}

/// Provider that resolves nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyContext;

impl ContextProvider for EmptyContext {}

/// Provider holding fixed values, e.g. for a single-site service or tests.
#[derive(Debug, Clone, Default)]
pub struct StaticContext {
    site_id: Option<u64>,
    site_name: Option<String>,
    user_id: Option<u64>,
    user_name: Option<String>,
    remote_addr: Option<String>,
    request: Option<RequestInfo>,
}

impl StaticContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_site(mut self, id: u64, name: impl Into<String>) -> Self {
        self.site_id = Some(id);
        self.site_name = Some(name.into());
        self
    }

    pub fn with_user(mut self, id: u64, name: impl Into<String>) -> Self {
        self.user_id = Some(id);
        self.user_name = Some(name.into());
        self
    }

    pub fn with_remote_addr(mut self, addr: impl Into<String>) -> Self {
        self.remote_addr = Some(addr.into());
        self
    }

    pub fn with_request(mut self, request: RequestInfo) -> Self {
        self.request = Some(request);
        self
    }
}

impl ContextProvider for StaticContext {
    fn site_id(&self) -> Option<u64> {
        self.site_id
    }

    fn site_name(&self) -> Option<String> {
        self.site_name.clone()
    }

    fn user_id(&self) -> Option<u64> {
        self.user_id
    }

    fn user_name(&self) -> Option<String> {
        self.user_name.clone()
    }

    fn remote_addr(&self) -> Option<String> {
        self.remote_addr.clone()
    }

    fn request(&self) -> Option<RequestInfo> {
        self.request.clone()
    }
}
