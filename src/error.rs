use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum Error {
    #[error("telemetry record extends past the end of the action")]
    Incomplete,
    #[error("telemetry field is not valid text")]
    Malformed,
}

pub type Result<O, E = Error> = std::result::Result<O, E>;
