use crossrank::{BackendKind, ReadinessGate, RerankService};

#[derive(Clone)]
pub struct HandlerState {
    pub service: RerankService,

    pub device: String,

    pub backend_kind: BackendKind,

    pub normalize_default: bool,
}

impl HandlerState {
    pub fn new(
        service: RerankService,
        device: String,
        backend_kind: BackendKind,
        normalize_default: bool,
    ) -> Self {
        Self {
            service,
            device,
            backend_kind,
            normalize_default,
        }
    }

    pub fn gate(&self) -> &ReadinessGate {
        self.service.gate()
    }

    /// Resolves a request's optional `normalize` flag.
    pub fn normalize(&self, requested: Option<bool>) -> bool {
        requested.unwrap_or(self.normalize_default)
    }
}
