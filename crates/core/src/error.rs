use hvn_uuid::VisitId;

#[derive(Debug, thiserror::Error)]
pub enum VisitError {
    #[error("unknown visit type: {0}")]
    UnknownVisitType(String),
    #[error("visit not found: {0}")]
    NotFound(VisitId),
    #[error("visit {0} is signed and locked")]
    Locked(VisitId),
    #[error("visit {0} was already signed")]
    AlreadyLocked(VisitId),
    #[error("no visit is open")]
    NoOpenVisit,
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("invalid visit id: {0}")]
    InvalidVisitId(#[from] hvn_uuid::VisitIdError),
    #[error("checklist error: {0}")]
    Checklist(checklist::ChecklistError),
    #[error("failed to create visit directory: {0}")]
    DirCreation(std::io::Error),
    #[error("failed to read visit file: {0}")]
    FileRead(std::io::Error),
    #[error("failed to write visit file: {0}")]
    FileWrite(std::io::Error),
}

impl From<checklist::ChecklistError> for VisitError {
    fn from(err: checklist::ChecklistError) -> Self {
        match err {
            // Preserve the error kind: a schema/template lookup miss stays distinct from
            // translation failures so callers can recover by choosing a different visit.
            checklist::ChecklistError::UnknownVisitType(name) => VisitError::UnknownVisitType(name),
            other => VisitError::Checklist(other),
        }
    }
}

pub type VisitResult<T> = std::result::Result<T, VisitError>;
