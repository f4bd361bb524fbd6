use crate::ServiceSpec;

/// What the caller asked the engine to do with a spec.
///
/// Determined by the route the request arrived on, never by the payload's shape.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ServiceRequestKind {
    Create,
    Update { id: String, version: u64 },
}

/// A service spec on its way through the pipeline, tagged with its intent.
#[derive(Clone, Debug, PartialEq)]
pub struct ServiceRequest {
    pub kind: ServiceRequestKind,
    pub spec: ServiceSpec,
}

impl ServiceRequest {
    pub fn create(spec: ServiceSpec) -> Self {
        Self {
            kind: ServiceRequestKind::Create,
            spec,
        }
    }

    pub fn update(id: impl Into<String>, version: u64, spec: ServiceSpec) -> Self {
        Self {
            kind: ServiceRequestKind::Update {
                id: id.into(),
                version,
            },
            spec,
        }
    }

    pub fn is_create(&self) -> bool {
        matches!(self.kind, ServiceRequestKind::Create)
    }
}
