// Defines a small set of standard error codes based on the error codes defined in the
// gRPC spec. https://grpc.github.io/grpc/core/md_doc_statuscodes.html
// Custom errors can use these codes in order to allow for generic handling.
use std::error::Error;

#[derive(PartialEq, Debug, Clone, Copy)]
pub enum ErrorCodes {
    // OK is returned on success, we use "Success" since Ok is a keyword in Rust.
    Success = 0,
    // UNKNOWN indicates an unknown error.
    Unknown = 2,
    // INVALID_ARGUMENT indicates client specified an invalid argument.
    InvalidArgument = 3,
    // NOT_FOUND means some requested entity was not found.
    NotFound = 5,
    // FAILED_PRECONDITION indicates operation was rejected because the system is not in a
    // state required for the operation's execution.
    FailedPrecondition = 9,
    // INTERNAL errors are internal errors.
    Internal = 13,
    // DATA_LOSS indicates unrecoverable data loss or corruption.
    DataLoss = 15,
}

impl ErrorCodes {
    pub fn name(&self) -> &'static str {
        match self {
            ErrorCodes::InvalidArgument => "InvalidArgumentError",
            ErrorCodes::NotFound => "NotFoundError",
            ErrorCodes::FailedPrecondition => "FailedPreconditionError",
            ErrorCodes::Internal => "InternalError",
            ErrorCodes::DataLoss => "DataLossError",
            _ => "LopqError",
        }
    }
}

pub trait LopqError: Error + Send {
    fn code(&self) -> ErrorCodes;
    fn boxed(self) -> Box<dyn LopqError>
    where
        Self: Sized + 'static,
    {
        Box::new(self)
    }
}

impl Error for Box<dyn LopqError> {}

impl LopqError for Box<dyn LopqError> {
    fn code(&self) -> ErrorCodes {
        self.as_ref().code()
    }
}
