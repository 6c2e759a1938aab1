use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("route template `{template}` must start with `/`")]
    RouteTemplate { template: String },
    #[error("duplicate node identifier `{id}`")]
    DuplicateNode { id: String },
    #[error("domain validation failed: {message}")]
    Validation { message: String },
}

impl DomainError {
    pub fn route_template(template: impl Into<String>) -> Self {
        Self::RouteTemplate {
            template: template.into(),
        }
    }

    pub fn duplicate_node(id: impl Into<String>) -> Self {
        Self::DuplicateNode { id: id.into() }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }
}
