use thiserror::Error;

use crate::model::NodeKey;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomError {
    #[error("unknown node {0:?}")]
    UnknownNode(NodeKey),
    #[error("node {0:?} is not an element")]
    NotAnElement(NodeKey),
    #[error("node {0:?} holds no character data")]
    NotCharacterData(NodeKey),
    #[error("hierarchy request rejected: {0}")]
    HierarchyRequest(String),
    #[error("element {0:?} already hosts a shadow root")]
    ShadowRootExists(NodeKey),
}

pub type DomResult<T> = Result<T, DomError>;
